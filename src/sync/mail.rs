use log::{info, warn};

use crate::reconcile::{AgeFilter, FolderOutcome, MailSession, SessionError, sync_folder};

/// Aggregated counters of one user's pass over all folders.
#[derive(Debug, Default, Clone, Copy)]
pub struct UserMailOutcome {
    pub outcome: FolderOutcome,
    pub folders: u64,
    pub folder_errors: u64,
}

/// Replicate every selectable folder of `user` from source to destination.
/// Folder order follows the source listing. A folder-level rejection is
/// logged and the pass moves on; fatal session errors abort the user.
///
/// Both sessions must be freshly connected and not yet authenticated.
pub async fn sync_user_mail<S: MailSession, D: MailSession>(
    user: &str,
    source: &mut S,
    destination: &mut D,
    filter: &AgeFilter,
) -> Result<UserMailOutcome, SessionError> {
    source.login(user).await?;
    destination.login(user).await?;

    let folders = source.list_folders().await?;
    info!("{user}: {} folders on source", folders.len());

    let mut total = UserMailOutcome::default();
    for folder in &folders {
        match sync_folder(user, source, destination, folder, filter).await {
            Ok(outcome) => {
                if folder.selectable() {
                    total.folders += 1;
                }
                total.outcome.absorb(&outcome);
            }
            Err(err) if !err.is_fatal() => {
                warn!("{user}: folder {} skipped: {err}", folder.name());
                total.folder_errors += 1;
            }
            Err(err) => return Err(err),
        }
    }
    Ok(total)
}

/// Best-effort logout of both ends once a user is done, whatever the
/// outcome of the pass was.
pub async fn logout_quietly<S: MailSession, D: MailSession>(
    user: &str,
    source: &mut S,
    destination: &mut D,
) {
    if let Err(err) = source.logout().await {
        warn!("{user}: source logout failed: {err}");
    }
    if let Err(err) = destination.logout().await {
        warn!("{user}: destination logout failed: {err}");
    }
}
