use std::time::Duration;

use log::{error, info};

use crate::reconcile::FolderOutcome;
use crate::sync::UserMailOutcome;

/// Outcome of one user's mailbox replication, successful or not.
#[derive(Debug)]
pub struct UserSyncResult {
    user: String,
    outcome: FolderOutcome,
    folders: u64,
    folder_errors: u64,
    elapsed: Duration,
    error: Option<String>,
}

impl UserSyncResult {
    pub fn completed(user: String, mail: UserMailOutcome, elapsed: Duration) -> Self {
        Self {
            user,
            outcome: mail.outcome,
            folders: mail.folders,
            folder_errors: mail.folder_errors,
            elapsed,
            error: None,
        }
    }

    pub fn failed(user: String, error: String, elapsed: Duration) -> Self {
        Self {
            user,
            outcome: FolderOutcome::default(),
            folders: 0,
            folder_errors: 0,
            elapsed,
            error: Some(error),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn outcome(&self) -> &FolderOutcome {
        &self.outcome
    }
}

/// All per-user results of one mail phase, in the order the users were
/// scheduled.
#[derive(Debug)]
pub struct MailSyncReport {
    results: Vec<UserSyncResult>,
}

impl MailSyncReport {
    pub fn new(results: Vec<UserSyncResult>) -> Self {
        Self { results }
    }

    pub fn results(&self) -> &[UserSyncResult] {
        &self.results
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|result| {
            result.error.is_some()
                || result.folder_errors > 0
                || result.outcome.message_errors() > 0
        })
    }

    pub fn log_summary(&self) {
        let mut total = FolderOutcome::default();
        let mut failed = 0_u64;
        for result in &self.results {
            match &result.error {
                Some(error) => {
                    failed += 1;
                    error!(
                        "{}: sync failed after {}: {error}",
                        result.user,
                        format_elapsed(result.elapsed)
                    );
                }
                None => {
                    total.absorb(&result.outcome);
                    info!(
                        "{}: {} folders, {} messages appended ({} bytes), {} flag updates, {} message errors, {} folder errors, took {}",
                        result.user,
                        result.folders,
                        result.outcome.appended(),
                        result.outcome.appended_bytes(),
                        result.outcome.flags_updated(),
                        result.outcome.message_errors(),
                        result.folder_errors,
                        format_elapsed(result.elapsed)
                    );
                }
            }
        }
        info!(
            "mail sync done: {} users ({failed} failed), {} messages appended ({} bytes), {} flag updates",
            self.results.len(),
            total.appended(),
            total.appended_bytes(),
            total.flags_updated()
        );
    }
}

/// Render a duration as `H:MM:SS.mmm`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_ms = elapsed.as_millis();
    let ms = total_ms % 1000;
    let secs = (total_ms / 1000) % 60;
    let mins = (total_ms / 60_000) % 60;
    let hours = total_ms / 3_600_000;
    format!("{hours}:{mins:02}:{secs:02}.{ms:03}")
}
