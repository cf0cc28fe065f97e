use thiserror::Error;

use crate::directory::{Attributes, ChangeSet, DirectoryEntry, EntryKind};

/// Which part of the directory tree a search covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainScope {
    All,
    Domain(String),
}

impl DomainScope {
    pub fn from_filter(filter: &str) -> Self {
        if filter == "*" {
            DomainScope::All
        } else {
            DomainScope::Domain(filter.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("directory connection failed: {0}")]
    Connect(String),
    #[error("directory bind failed: {0}")]
    Bind(String),
    #[error("directory operation failed: {0}")]
    Operation(String),
    #[error("tunnel setup failed: {0}")]
    Tunnel(String),
}

/// Contract the reconcilers consume. One implementation speaks LDAP; tests
/// substitute an in-memory double.
pub trait DirectoryClient {
    /// Enabled mail domains within scope, in backend iteration order.
    async fn search_domains(
        &mut self,
        scope: &DomainScope,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError>;

    /// Enabled mail users within scope, in backend iteration order.
    async fn search_users(
        &mut self,
        scope: &DomainScope,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError>;

    /// Look up a single entry by natural key, restricted to the allow-listed
    /// attributes for `kind`. `Ok(None)` means the entry does not exist.
    async fn find(
        &mut self,
        kind: EntryKind,
        key: &str,
    ) -> Result<Option<Attributes>, DirectoryError>;

    async fn add(
        &mut self,
        kind: EntryKind,
        key: &str,
        attributes: &Attributes,
    ) -> Result<(), DirectoryError>;

    async fn modify(
        &mut self,
        kind: EntryKind,
        key: &str,
        changes: &ChangeSet,
    ) -> Result<(), DirectoryError>;
}
