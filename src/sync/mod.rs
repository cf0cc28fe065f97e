mod directory;
mod mail;
mod orchestrator;
mod report;

pub use directory::DirectoryOptions;
pub use directory::DirectoryReport;
pub use directory::sync_domains;
pub use directory::sync_users;
pub use mail::UserMailOutcome;
pub use mail::logout_quietly;
pub use mail::sync_user_mail;
pub use orchestrator::run_users;
pub use report::MailSyncReport;
pub use report::UserSyncResult;
pub use report::format_elapsed;
