use std::collections::HashSet;
use std::time::Duration;

use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Mod, Scope, SearchEntry};
use log::{debug, trace, warn};

use crate::directory::{
    Attributes, ChangeOp, ChangeSet, DirectoryClient, DirectoryEntry, DirectoryError, DomainScope,
    EntryKind,
};
use crate::ldap::{dn, filter};

const PAGE_SIZE: i32 = 100;

const DOMAIN_OBJECT_CLASSES: &[&str] = &["mailDomain"];
const USER_OBJECT_CLASSES: &[&str] = &["inetOrgPerson", "shadowAccount", "amavisAccount", "mailUser"];

/// Connection settings of one directory endpoint. When a tunnel is in
/// play, `host` and `port` already point at its local end.
#[derive(Debug, Clone)]
pub struct LdapEndpoint {
    pub host: String,
    pub port: u16,
    pub use_ssl: bool,
    pub bind_dn: String,
    pub bind_password: String,
    pub base_dn: Option<String>,
    pub connect_timeout: Duration,
}

/// A bound LDAP connection implementing [`DirectoryClient`].
pub struct LdapDirectory {
    ldap: Ldap,
    base_dn: String,
}

impl LdapDirectory {
    pub async fn connect(endpoint: &LdapEndpoint) -> Result<Self, DirectoryError> {
        let scheme = if endpoint.use_ssl { "ldaps" } else { "ldap" };
        let url = format!("{scheme}://{}:{}", endpoint.host, endpoint.port);
        debug!("connecting to {url}");
        let settings = LdapConnSettings::new().set_conn_timeout(endpoint.connect_timeout);
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|err| DirectoryError::Connect(err.to_string()))?;
        ldap3::drive!(conn);
        ldap.simple_bind(&endpoint.bind_dn, &endpoint.bind_password)
            .await
            .map_err(|err| DirectoryError::Bind(err.to_string()))?
            .success()
            .map_err(|err| DirectoryError::Bind(err.to_string()))?;
        let base_dn = endpoint
            .base_dn
            .clone()
            .unwrap_or_else(|| dn::base_from_bind_dn(&endpoint.bind_dn));
        debug!("bound as {}, base {base_dn}", endpoint.bind_dn);
        Ok(Self { ldap, base_dn })
    }

    pub async fn disconnect(&mut self) {
        if let Err(err) = self.ldap.unbind().await {
            warn!("directory unbind failed: {err}");
        }
    }

    async fn collect_entries(
        &mut self,
        kind: EntryKind,
        filter: &str,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        let key_attr = match kind {
            EntryKind::Domain => "domainName",
            EntryKind::User => "mail",
        };
        let adapters: Vec<Box<dyn Adapter<_, _>>> = vec![
            Box::new(EntriesOnly::new()),
            Box::new(PagedResults::new(PAGE_SIZE)),
        ];
        let mut search = self
            .ldap
            .streaming_search_with(
                adapters,
                &self.base_dn,
                Scope::Subtree,
                filter,
                kind.read_attrs(),
            )
            .await
            .map_err(operation_error)?;

        let mut entries = Vec::new();
        while let Some(entry) = search.next().await.map_err(operation_error)? {
            let entry = SearchEntry::construct(entry);
            trace!("found {}", entry.dn);
            let attributes = to_attributes(entry.attrs);
            let Some(key) = attributes
                .get(key_attr)
                .and_then(|values| values.first())
                .cloned()
            else {
                warn!("skipping entry without {key_attr}");
                continue;
            };
            entries.push(DirectoryEntry::new(kind, key, attributes));
        }
        search
            .finish()
            .await
            .success()
            .map_err(operation_error)?;
        Ok(entries)
    }

    fn entry_dn(&self, kind: EntryKind, key: &str) -> Result<String, DirectoryError> {
        match kind {
            EntryKind::Domain => Ok(dn::domain(&self.base_dn, key)),
            EntryKind::User => dn::user(&self.base_dn, key).ok_or_else(|| {
                DirectoryError::Operation(format!("{key} is not a mail address"))
            }),
        }
    }

    /// Freshly created domains get the standard organizational units so
    /// user records have a place to land. Creation failures are logged
    /// and tolerated; the units may exist already.
    async fn add_default_groups(&mut self, domain_name: &str) {
        for group in dn::DEFAULT_GROUPS {
            let dn = dn::group(&self.base_dn, domain_name, group);
            let attrs = vec![
                ("objectClass".to_string(), once("organizationalUnit")),
                ("ou".to_string(), once(group)),
            ];
            let outcome = match self.ldap.add(&dn, attrs).await {
                Ok(result) => result.success().map(|_| ()).map_err(operation_error),
                Err(err) => Err(operation_error(err)),
            };
            if let Err(err) = outcome {
                warn!("creating {dn} failed: {err}");
            }
        }
    }
}

impl DirectoryClient for LdapDirectory {
    async fn search_domains(
        &mut self,
        scope: &DomainScope,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        let filter = match scope {
            DomainScope::All => filter::all_domains(),
            DomainScope::Domain(name) => filter::one_domain(name),
        };
        self.collect_entries(EntryKind::Domain, &filter).await
    }

    async fn search_users(
        &mut self,
        scope: &DomainScope,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        let filter = match scope {
            DomainScope::All => filter::all_users(),
            DomainScope::Domain(name) => filter::users_of_domain(name),
        };
        self.collect_entries(EntryKind::User, &filter).await
    }

    async fn find(
        &mut self,
        kind: EntryKind,
        key: &str,
    ) -> Result<Option<Attributes>, DirectoryError> {
        let filter = match kind {
            EntryKind::Domain => filter::one_domain(key),
            EntryKind::User => filter::one_user(key),
        };
        let (entries, _) = self
            .ldap
            .search(&self.base_dn, Scope::Subtree, &filter, kind.read_attrs())
            .await
            .map_err(operation_error)?
            .success()
            .map_err(operation_error)?;
        Ok(entries
            .into_iter()
            .next()
            .map(|entry| to_attributes(SearchEntry::construct(entry).attrs)))
    }

    async fn add(
        &mut self,
        kind: EntryKind,
        key: &str,
        attributes: &Attributes,
    ) -> Result<(), DirectoryError> {
        let dn = self.entry_dn(kind, key)?;
        let object_classes = match kind {
            EntryKind::Domain => DOMAIN_OBJECT_CLASSES,
            EntryKind::User => USER_OBJECT_CLASSES,
        };
        let mut attrs: Vec<(String, HashSet<String>)> = vec![(
            "objectClass".to_string(),
            object_classes.iter().map(ToString::to_string).collect(),
        )];
        for (attribute, values) in attributes {
            if values.is_empty() || attribute == "objectClass" {
                continue;
            }
            attrs.push((attribute.clone(), values.iter().cloned().collect()));
        }
        debug!("adding {dn}");
        self.ldap
            .add(&dn, attrs)
            .await
            .map_err(operation_error)?
            .success()
            .map_err(operation_error)?;
        if kind == EntryKind::Domain {
            self.add_default_groups(key).await;
        }
        Ok(())
    }

    async fn modify(
        &mut self,
        kind: EntryKind,
        key: &str,
        changes: &ChangeSet,
    ) -> Result<(), DirectoryError> {
        let dn = self.entry_dn(kind, key)?;
        let mods: Vec<Mod<String>> = changes
            .iter()
            .map(|change| {
                let attribute = change.attribute().to_string();
                let values: HashSet<String> = change.values().iter().cloned().collect();
                match change.op() {
                    ChangeOp::Add => Mod::Add(attribute, values),
                    ChangeOp::Replace => Mod::Replace(attribute, values),
                    ChangeOp::Delete => Mod::Delete(attribute, HashSet::new()),
                }
            })
            .collect();
        debug!("modifying {dn} ({} changes)", changes.len());
        self.ldap
            .modify(&dn, mods)
            .await
            .map_err(operation_error)?
            .success()
            .map_err(operation_error)?;
        Ok(())
    }
}

fn operation_error(err: ldap3::LdapError) -> DirectoryError {
    DirectoryError::Operation(err.to_string())
}

fn to_attributes(attrs: std::collections::HashMap<String, Vec<String>>) -> Attributes {
    attrs
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .collect()
}

fn once(value: &str) -> HashSet<String> {
    HashSet::from([value.to_string()])
}
