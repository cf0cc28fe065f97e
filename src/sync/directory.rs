use jiff::Zoned;
use log::{debug, error, info};

use crate::directory::{
    DirectoryClient, DirectoryError, DomainScope, EntryKind, is_valid_address, split_address,
};
use crate::reconcile::{DecisionPolicy, SyncDecision, decide, storage_attributes};

/// Knobs of the directory phase.
#[derive(Debug, Clone)]
pub struct DirectoryOptions {
    pub domain_policy: DecisionPolicy,
    pub delete_missing: bool,
    /// Storage root on the destination, e.g. `/var/vmail/vmail1`. Required
    /// for user creation, unused otherwise.
    pub storage_base: String,
}

/// Counters of one directory phase. Per-entry write failures are counted,
/// not propagated; only connection-level trouble aborts the phase.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryReport {
    pub added: u64,
    pub modified: u64,
    pub unchanged: u64,
    pub errors: u64,
}

impl DirectoryReport {
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

pub async fn sync_domains<S: DirectoryClient, D: DirectoryClient>(
    source: &mut S,
    destination: &mut D,
    scope: &DomainScope,
    options: &DirectoryOptions,
) -> Result<DirectoryReport, DirectoryError> {
    let entries = source.search_domains(scope).await?;
    info!("{} source domains in scope", entries.len());
    let mut report = DirectoryReport::default();
    for entry in entries {
        let existing = destination.find(EntryKind::Domain, entry.key()).await?;
        let decision = decide(
            EntryKind::Domain,
            entry.attributes(),
            existing.as_ref(),
            options.domain_policy,
            options.delete_missing,
        );
        apply(destination, EntryKind::Domain, entry.key(), decision, &mut report).await;
    }
    info!(
        "domain sync done: {} added, {} modified, {} unchanged, {} errors",
        report.added, report.modified, report.unchanged, report.errors
    );
    Ok(report)
}

/// `user_filter` narrows the domain-scoped listing down to one exact
/// address; `None` takes every user in scope.
pub async fn sync_users<S: DirectoryClient, D: DirectoryClient>(
    source: &mut S,
    destination: &mut D,
    scope: &DomainScope,
    user_filter: Option<&str>,
    options: &DirectoryOptions,
) -> Result<DirectoryReport, DirectoryError> {
    let entries = source.search_users(scope).await?;
    info!("{} source users in scope", entries.len());
    let mut report = DirectoryReport::default();
    for entry in entries {
        let key = entry.key();
        if user_filter.is_some_and(|filter| filter != key) {
            continue;
        }
        if !is_valid_address(key) {
            error!("{key}: not a valid mail address, skipped");
            report.errors += 1;
            continue;
        }
        let existing = destination.find(EntryKind::User, key).await?;
        let mut decision = decide(
            EntryKind::User,
            entry.attributes(),
            existing.as_ref(),
            DecisionPolicy::Consistent,
            options.delete_missing,
        );
        if let SyncDecision::Add(attributes) = &mut decision {
            if options.storage_base.is_empty() {
                error!("{key}: no storage base directory configured, cannot create");
                report.errors += 1;
                continue;
            }
            let (local, _) = split_address(key).unwrap_or((key, ""));
            let created = Zoned::now();
            for (name, value) in storage_attributes(&options.storage_base, local, &created) {
                attributes.insert(name.to_string(), vec![value]);
            }
        }
        apply(destination, EntryKind::User, key, decision, &mut report).await;
    }
    info!(
        "user sync done: {} added, {} modified, {} unchanged, {} errors",
        report.added, report.modified, report.unchanged, report.errors
    );
    Ok(report)
}

async fn apply<D: DirectoryClient>(
    destination: &mut D,
    kind: EntryKind,
    key: &str,
    decision: SyncDecision,
    report: &mut DirectoryReport,
) {
    match decision {
        SyncDecision::None => {
            debug!("{key}: up to date");
            report.unchanged += 1;
        }
        SyncDecision::Add(attributes) => match destination.add(kind, key, &attributes).await {
            Ok(()) => {
                info!("{key}: created");
                report.added += 1;
            }
            Err(err) => {
                error!("{key}: create failed: {err}");
                report.errors += 1;
            }
        },
        SyncDecision::Modify(changes) if changes.is_empty() => {
            debug!("{key}: nothing to modify");
            report.unchanged += 1;
        }
        SyncDecision::Modify(changes) => match destination.modify(kind, key, &changes).await {
            Ok(()) => {
                info!("{key}: updated ({changes})");
                report.modified += 1;
            }
            Err(err) => {
                error!("{key}: update failed: {err}");
                report.errors += 1;
            }
        },
        SyncDecision::Error(reason) => {
            error!("{key}: {reason}");
            report.errors += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use assertables::*;

    use crate::directory::{Attributes, ChangeSet, DirectoryEntry};
    use crate::reconcile::DecisionPolicy;

    use super::*;

    #[derive(Default)]
    struct MemoryDirectory {
        domains: BTreeMap<String, Attributes>,
        users: BTreeMap<String, Attributes>,
        modified: Vec<(EntryKind, String, ChangeSet)>,
    }

    impl MemoryDirectory {
        fn with_domain(mut self, name: &str, attributes: Attributes) -> Self {
            self.domains.insert(name.to_string(), attributes);
            self
        }

        fn with_user(mut self, mail: &str, attributes: Attributes) -> Self {
            self.users.insert(mail.to_string(), attributes);
            self
        }

        fn table(&self, kind: EntryKind) -> &BTreeMap<String, Attributes> {
            match kind {
                EntryKind::Domain => &self.domains,
                EntryKind::User => &self.users,
            }
        }
    }

    impl DirectoryClient for MemoryDirectory {
        async fn search_domains(
            &mut self,
            _scope: &DomainScope,
        ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
            Ok(self
                .domains
                .iter()
                .map(|(key, attrs)| DirectoryEntry::new(EntryKind::Domain, key, attrs.clone()))
                .collect())
        }

        async fn search_users(
            &mut self,
            _scope: &DomainScope,
        ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
            Ok(self
                .users
                .iter()
                .map(|(key, attrs)| DirectoryEntry::new(EntryKind::User, key, attrs.clone()))
                .collect())
        }

        async fn find(
            &mut self,
            kind: EntryKind,
            key: &str,
        ) -> Result<Option<Attributes>, DirectoryError> {
            Ok(self.table(kind).get(key).cloned())
        }

        async fn add(
            &mut self,
            kind: EntryKind,
            key: &str,
            attributes: &Attributes,
        ) -> Result<(), DirectoryError> {
            match kind {
                EntryKind::Domain => self.domains.insert(key.to_string(), attributes.clone()),
                EntryKind::User => self.users.insert(key.to_string(), attributes.clone()),
            };
            Ok(())
        }

        async fn modify(
            &mut self,
            kind: EntryKind,
            key: &str,
            changes: &ChangeSet,
        ) -> Result<(), DirectoryError> {
            self.modified.push((kind, key.to_string(), changes.clone()));
            Ok(())
        }
    }

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), vec![value.to_string()]))
            .collect()
    }

    fn options() -> DirectoryOptions {
        DirectoryOptions {
            domain_policy: DecisionPolicy::Consistent,
            delete_missing: false,
            storage_base: "/var/vmail/vmail1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_user_is_created_with_storage_attributes() {
        let mut source = MemoryDirectory::default()
            .with_user("j.doe@example.com", attrs(&[("mail", "j.doe@example.com")]));
        let mut destination = MemoryDirectory::default();

        let report = sync_users(&mut source, &mut destination, &DomainScope::All, None, &options())
            .await
            .unwrap();

        assert_eq!(1, report.added);
        assert_eq!(0, report.errors);
        let created = assert_some!(destination.users.get("j.doe@example.com"));
        let home = assert_some!(created.get("homeDirectory"));
        assert_starts_with!(home[0], "/var/vmail/vmail1/j/d/o/j.doe-");
        let store = assert_some!(created.get("mailMessageStore"));
        assert_starts_with!(store[0], "vmail1/j/d/o/j.doe-");
        assert_eq!(
            &vec!["/var/vmail".to_string()],
            assert_some!(created.get("storageBaseDirectory"))
        );
    }

    #[tokio::test]
    async fn test_invalid_address_is_counted_not_created() {
        let mut source =
            MemoryDirectory::default().with_user("not-an-address", attrs(&[("cn", "broken")]));
        let mut destination = MemoryDirectory::default();

        let report = sync_users(&mut source, &mut destination, &DomainScope::All, None, &options())
            .await
            .unwrap();

        assert_eq!(1, report.errors);
        assert_eq!(0, report.added);
        assert!(destination.users.is_empty());
    }

    #[tokio::test]
    async fn test_missing_storage_base_blocks_user_creation() {
        let mut source = MemoryDirectory::default()
            .with_user("j.doe@example.com", attrs(&[("mail", "j.doe@example.com")]));
        let mut destination = MemoryDirectory::default();
        let options = DirectoryOptions {
            storage_base: String::new(),
            ..options()
        };

        let report = sync_users(&mut source, &mut destination, &DomainScope::All, None, &options)
            .await
            .unwrap();

        assert_eq!(1, report.errors);
        assert!(destination.users.is_empty());
    }

    #[tokio::test]
    async fn test_changed_domain_is_modified_under_consistent_policy() {
        let mut source = MemoryDirectory::default()
            .with_domain("example.com", attrs(&[("cn", "new name")]));
        let mut destination = MemoryDirectory::default()
            .with_domain("example.com", attrs(&[("cn", "old name")]));

        let report = sync_domains(&mut source, &mut destination, &DomainScope::All, &options())
            .await
            .unwrap();

        assert_eq!(1, report.modified);
        assert_eq!(1, destination.modified.len());
    }

    #[tokio::test]
    async fn test_legacy_policy_never_writes_modifications() {
        let mut source = MemoryDirectory::default()
            .with_domain("example.com", attrs(&[("cn", "new name")]));
        let mut destination = MemoryDirectory::default()
            .with_domain("example.com", attrs(&[("cn", "old name")]));
        let options = DirectoryOptions {
            domain_policy: DecisionPolicy::LegacyInverted,
            ..options()
        };

        let report = sync_domains(&mut source, &mut destination, &DomainScope::All, &options)
            .await
            .unwrap();

        assert_eq!(0, report.modified);
        assert!(destination.modified.is_empty());
        assert_eq!(1, report.unchanged);
    }

    #[tokio::test]
    async fn test_identical_domain_is_left_alone() {
        let shared = attrs(&[("cn", "same")]);
        let mut source = MemoryDirectory::default().with_domain("example.com", shared.clone());
        let mut destination = MemoryDirectory::default().with_domain("example.com", shared);

        let report = sync_domains(&mut source, &mut destination, &DomainScope::All, &options())
            .await
            .unwrap();

        assert_eq!(1, report.unchanged);
        assert_eq!(0, report.modified);
        assert!(destination.modified.is_empty());
    }
}
