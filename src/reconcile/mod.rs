mod attribute;
mod maildir;
mod mailbox;
mod session;

pub use attribute::DecisionPolicy;
pub use attribute::SyncDecision;
pub use attribute::decide;
pub use attribute::diff_attributes;
pub use maildir::derive_maildir_path;
pub use maildir::storage_attributes;
pub use mailbox::FolderOutcome;
pub use mailbox::sync_folder;
pub use session::AgeFilter;
pub use session::Flag;
pub use session::FlagSet;
pub use session::Folder;
pub use session::FolderBuilder;
pub use session::MailSession;
pub use session::MessageHeader;
pub use session::SessionError;
pub use session::format_flags;
