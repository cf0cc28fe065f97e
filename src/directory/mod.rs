mod attrs;
mod changes;
mod client;
mod entry;

pub use changes::AttributeChange;
pub use changes::ChangeOp;
pub use changes::ChangeSet;
pub use client::DirectoryClient;
pub use client::DirectoryError;
pub use client::DomainScope;
pub use entry::Attributes;
pub use entry::DirectoryEntry;
pub use entry::EntryKind;
pub use entry::is_valid_address;
pub use entry::split_address;
