use std::sync::Arc;
use std::time::Instant;

use log::debug;
use tokio::sync::Semaphore;

use crate::reconcile::SessionError;
use crate::sync::report::UserSyncResult;
use crate::sync::{MailSyncReport, UserMailOutcome};

/// Run one mail task per user with at most `max_concurrent` running at a
/// time. Results come back in the order the users were given, regardless
/// of completion order. A panicking or failing task becomes a failed
/// result instead of taking the run down.
pub async fn run_users<F, Fut>(
    users: Vec<String>,
    max_concurrent: usize,
    task: F,
) -> MailSyncReport
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<UserMailOutcome, SessionError>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    debug!(
        "scheduling {} users, {} at a time",
        users.len(),
        max_concurrent.max(1)
    );

    let mut handles = Vec::with_capacity(users.len());
    for user in users {
        let semaphore = Arc::clone(&semaphore);
        let fut = task(user.clone());
        let handle = tokio::spawn(async move {
            // The semaphore is never closed, so acquisition cannot fail.
            let _permit = semaphore.acquire_owned().await;
            let start = Instant::now();
            (fut.await, start.elapsed())
        });
        handles.push((user, handle));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (user, handle) in handles {
        let result = match handle.await {
            Ok((Ok(outcome), elapsed)) => UserSyncResult::completed(user, outcome, elapsed),
            Ok((Err(err), elapsed)) => UserSyncResult::failed(user, err.to_string(), elapsed),
            Err(join_error) => UserSyncResult::failed(
                user,
                format!("task aborted: {join_error}"),
                std::time::Duration::ZERO,
            ),
        };
        results.push(result);
    }
    MailSyncReport::new(results)
}
