use std::collections::BTreeMap;

use crate::directory::attrs::{DOMAIN_SYNC_ATTRS, USER_STORAGE_ATTRS, USER_SYNC_ATTRS};

/// Attribute name to one or more string values, ordered by name so diffs
/// and changesets come out deterministic.
pub type Attributes = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Domain,
    User,
}

impl EntryKind {
    /// Attributes eligible for synchronization for this kind.
    pub fn sync_attrs(self) -> &'static [&'static str] {
        match self {
            EntryKind::Domain => DOMAIN_SYNC_ATTRS,
            EntryKind::User => USER_SYNC_ATTRS,
        }
    }

    /// All attributes worth reading from the backend, including the
    /// storage attributes that are synthesized rather than synced.
    pub fn read_attrs(self) -> Vec<&'static str> {
        match self {
            EntryKind::Domain => DOMAIN_SYNC_ATTRS.to_vec(),
            EntryKind::User => {
                let mut attrs = USER_SYNC_ATTRS.to_vec();
                attrs.extend_from_slice(USER_STORAGE_ATTRS);
                attrs
            }
        }
    }
}

/// A domain or user record, addressed by its natural key (domain name or
/// mail address).
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    kind: EntryKind,
    key: String,
    attributes: Attributes,
}

impl DirectoryEntry {
    pub fn new(kind: EntryKind, key: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            kind,
            key: key.into(),
            attributes,
        }
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

fn is_local_char(c: char) -> bool {
    c.is_alphanumeric() || "-.+=/&#_".contains(c)
}

/// Whether `candidate` looks like a deliverable mail address. Gates every
/// user-level directory write.
pub fn is_valid_address(candidate: &str) -> bool {
    let Some((local, domain)) = candidate.trim().split_once('@') else {
        return false;
    };
    let local_ok = local
        .starts_with(|c: char| c.is_alphanumeric() || c == '-' || c == '#' || c == '_')
        && local.chars().all(is_local_char);
    if !local_ok {
        return false;
    }

    let domain_ok = domain.starts_with(|c: char| c.is_alphanumeric() || c == '-')
        && domain
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '.');
    if !domain_ok {
        return false;
    }
    // The last label acts as the TLD: ascii, 2 to 15 characters.
    match domain.rsplit_once('.') {
        Some((name, tld)) => {
            !name.is_empty()
                && (2..=15).contains(&tld.len())
                && tld.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        }
        None => false,
    }
}

/// Split a mail address into local part and domain.
pub fn split_address(mail: &str) -> Option<(&str, &str)> {
    let (local, domain) = mail.split_once('@')?;
    if local.is_empty() || domain.is_empty() {
        None
    } else {
        Some((local, domain))
    }
}
