use std::collections::HashMap;
use std::collections::hash_map::Entry;

use log::{debug, trace, warn};

use crate::reconcile::session::{AgeFilter, FlagSet, Folder, MailSession, SessionError};

/// Counters for one folder pass. Aggregated per user by the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct FolderOutcome {
    appended: u64,
    appended_bytes: u64,
    flags_updated: u64,
    message_errors: u64,
}

impl FolderOutcome {
    pub fn absorb(&mut self, other: &FolderOutcome) {
        self.appended += other.appended;
        self.appended_bytes += other.appended_bytes;
        self.flags_updated += other.flags_updated;
        self.message_errors += other.message_errors;
    }

    pub fn appended(&self) -> u64 {
        self.appended
    }

    pub fn appended_bytes(&self) -> u64 {
        self.appended_bytes
    }

    pub fn flags_updated(&self) -> u64 {
        self.flags_updated
    }

    pub fn message_errors(&self) -> u64 {
        self.message_errors
    }
}

#[derive(Debug)]
struct MessageRecord {
    id: u32,
    flags: FlagSet,
    size: u64,
}

/// Replicate one folder from source to destination by Message-ID and merge
/// flag state onto messages both sides already have. Messages present only
/// in the destination are left untouched.
pub async fn sync_folder<S: MailSession, D: MailSession>(
    user: &str,
    source: &mut S,
    destination: &mut D,
    folder: &Folder,
    filter: &AgeFilter,
) -> Result<FolderOutcome, SessionError> {
    let name = folder.name();
    if !folder.selectable() {
        debug!("{user}: skipping non-selectable folder {name}");
        return Ok(FolderOutcome::default());
    }

    // Creating an already existing folder is a routine rejection.
    if let Err(err) = destination.create_folder(name).await {
        if err.is_fatal() {
            return Err(err);
        }
        trace!("{user}: create {name}: {err}");
    }

    source.select_folder(name, true).await?;
    if let Err(err) = destination.select_folder(name, false).await {
        close_quietly(source, user, name).await;
        return Err(err);
    }

    let result = replicate(user, source, destination, name, filter).await;

    close_quietly(source, user, name).await;
    close_quietly(destination, user, name).await;
    result
}

async fn replicate<S: MailSession, D: MailSession>(
    user: &str,
    source: &mut S,
    destination: &mut D,
    name: &str,
    filter: &AgeFilter,
) -> Result<FolderOutcome, SessionError> {
    let mut outcome = FolderOutcome::default();

    debug!("{user}: collecting destination message ids in {name}");
    let mut dst_by_id = HashMap::new();
    scan(destination, filter, &mut outcome, |record, message_id| {
        // Destination-only duplicates follow the same rule as the source:
        // a differently sized resend replaces the stored entry.
        match dst_by_id.entry(message_id) {
            Entry::Occupied(mut slot) => {
                let stored: &MessageRecord = slot.get();
                if stored.size != record.size {
                    slot.insert(record);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }
    })
    .await?;

    debug!("{user}: collecting source message ids in {name}");
    let mut src_by_id = HashMap::new();
    scan(source, filter, &mut outcome, |record, message_id| {
        match src_by_id.entry(message_id) {
            Entry::Occupied(mut slot) => {
                let stored: &MessageRecord = slot.get();
                if stored.size != record.size {
                    slot.insert(record);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }
    })
    .await?;

    debug!(
        "{user}: reconciling {name}, source {} destination {}",
        src_by_id.len(),
        dst_by_id.len()
    );

    for (message_id, record) in &src_by_id {
        match dst_by_id.get(message_id) {
            None => {
                let body = match source.fetch_body(record.id).await {
                    Ok(body) => body,
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) => {
                        warn!("{user}: fetching {message_id} from {name} failed: {err}");
                        outcome.message_errors += 1;
                        continue;
                    }
                };
                match append_with_fallback(destination, name, &body, &record.flags).await {
                    Ok(()) => {
                        outcome.appended += 1;
                        outcome.appended_bytes += record.size;
                    }
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) => {
                        warn!("{user}: appending {message_id} to {name} failed: {err}");
                        outcome.message_errors += 1;
                    }
                }
            }
            Some(existing) => match destination.store_flags(existing.id, &record.flags).await {
                Ok(()) => outcome.flags_updated += 1,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!("{user}: updating flags of {message_id} in {name} failed: {err}");
                    outcome.message_errors += 1;
                }
            },
        }
    }

    debug!(
        "{user}: {name} done, appended {} ({} bytes), flags updated {}, errors {}",
        outcome.appended, outcome.appended_bytes, outcome.flags_updated, outcome.message_errors
    );
    Ok(outcome)
}

/// Walk the selected folder and hand every keyed message to `store`.
/// Messages without a Message-ID cannot be matched and count as errors.
async fn scan<S: MailSession>(
    session: &mut S,
    filter: &AgeFilter,
    outcome: &mut FolderOutcome,
    mut store: impl FnMut(MessageRecord, String),
) -> Result<(), SessionError> {
    let ids = session.search_messages(filter).await?;
    for id in ids {
        let header = match session.fetch_header(id).await {
            Ok(header) => header,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!("fetching header of message {id} failed: {err}");
                outcome.message_errors += 1;
                continue;
            }
        };
        let Some(message_id) = header.message_id().clone() else {
            warn!("message {id} carries no Message-ID header, skipping");
            outcome.message_errors += 1;
            continue;
        };
        store(
            MessageRecord {
                id,
                flags: header.flags().clone(),
                size: header.size(),
            },
            message_id,
        );
    }
    Ok(())
}

/// Append with source flags; on a rejection retry once without flags.
async fn append_with_fallback<D: MailSession>(
    destination: &mut D,
    folder: &str,
    body: &[u8],
    flags: &FlagSet,
) -> Result<(), SessionError> {
    match destination.append(folder, body, Some(flags)).await {
        Ok(()) => Ok(()),
        Err(err) if err.is_fatal() => Err(err),
        Err(err) => {
            debug!("append with flags rejected ({err}), retrying without");
            destination.append(folder, body, None).await
        }
    }
}

async fn close_quietly<S: MailSession>(session: &mut S, user: &str, name: &str) {
    if let Err(err) = session.close_folder().await {
        debug!("{user}: closing {name}: {err}");
    }
}
