use anyhow::Result;
use log::{info, warn};

use crate::Args;
use crate::cli::directory;
use crate::config::Config;
use crate::directory::{DirectoryClient as _, DomainScope};
use crate::imap::{ImapEndpoint, ImapSession};
use crate::reconcile::{AgeFilter, SessionError};
use crate::sync::{UserMailOutcome, logout_quietly, run_users, sync_user_mail};

/// Replicate mailbox content for every resolved user. Returns whether any
/// user failed or had message-level errors.
pub async fn run(
    args: &Args,
    config: &Config,
    domain_filter: Option<&str>,
    user_filter: Option<&str>,
) -> Result<bool> {
    let users = resolve_users(config, domain_filter, user_filter).await?;
    if users.is_empty() {
        warn!("no users to sync");
        return Ok(false);
    }
    info!("syncing mailboxes of {} users", users.len());

    let filter = AgeFilter {
        min_days: args.min_age,
        max_days: args.max_age,
    };
    let connect_timeout = config.sync().connect_timeout();
    let operation_timeout = config.sync().operation_timeout();
    let source_endpoint = config
        .imap()
        .source()
        .endpoint(connect_timeout, operation_timeout);
    let destination_endpoint = config
        .imap()
        .destination()
        .endpoint(connect_timeout, operation_timeout);

    let report = run_users(users, config.sync().max_concurrent_users(), move |user| {
        sync_one_user(
            user,
            source_endpoint.clone(),
            destination_endpoint.clone(),
            filter,
        )
    })
    .await;
    report.log_summary();
    Ok(report.has_failures())
}

async fn sync_one_user(
    user: String,
    source_endpoint: ImapEndpoint,
    destination_endpoint: ImapEndpoint,
    filter: AgeFilter,
) -> Result<UserMailOutcome, SessionError> {
    info!("{user}: starting mailbox sync");
    let mut source = ImapSession::connect(&source_endpoint).await?;
    let mut destination = ImapSession::connect(&destination_endpoint).await?;
    let result = sync_user_mail(&user, &mut source, &mut destination, &filter).await;
    logout_quietly(&user, &mut source, &mut destination).await;
    result
}

/// The users whose mailboxes get replicated: an exact `-u` filter wins,
/// otherwise the source directory is asked for every user in the domain
/// scope.
async fn resolve_users(
    config: &Config,
    domain_filter: Option<&str>,
    user_filter: Option<&str>,
) -> Result<Vec<String>> {
    if let Some(user) = user_filter.filter(|filter| *filter != "*") {
        return Ok(vec![user.to_string()]);
    }
    let scope = DomainScope::from_filter(domain_filter.unwrap_or("*"));
    let (mut source, _tunnel) =
        directory::connect(config.ldap().source(), config.sync().connect_timeout()).await?;
    let entries = source.search_users(&scope).await?;
    source.disconnect().await;
    Ok(entries
        .into_iter()
        .map(|entry| entry.key().to_string())
        .collect())
}
