use std::time::Duration;

use anyhow::Result;
use log::info;

use crate::config::{Config, LdapSettings};
use crate::directory::{DirectoryError, DomainScope};
use crate::ldap::LdapDirectory;
use crate::sync::{DirectoryOptions, sync_domains, sync_users};
use crate::tunnel::SshTunnel;

/// Run the requested directory phases over one source and one destination
/// connection. Returns whether any entry-level errors were counted.
pub async fn run(
    config: &Config,
    domain_filter: Option<&str>,
    user_filter: Option<&str>,
) -> Result<bool> {
    let connect_timeout = config.sync().connect_timeout();
    let (mut source, _source_tunnel) =
        connect(config.ldap().source(), connect_timeout).await?;
    let (mut destination, _destination_tunnel) =
        connect(config.ldap().destination(), connect_timeout).await?;

    let options = DirectoryOptions {
        domain_policy: config.sync().domain_decision(),
        delete_missing: config.sync().delete_destination_attrs(),
        storage_base: config.sync().storage_base_directory().clone(),
    };

    // A user-only run still walks users of every domain.
    let domain_scope = DomainScope::from_filter(domain_filter.unwrap_or("*"));
    let mut had_errors = false;

    if let Some(filter) = domain_filter {
        info!("syncing domain records ({filter})");
        let report = sync_domains(
            &mut source,
            &mut destination,
            &DomainScope::from_filter(filter),
            &options,
        )
        .await?;
        had_errors |= report.has_errors();
    }

    if let Some(filter) = user_filter {
        info!("syncing user records ({filter})");
        let exact = (filter != "*").then_some(filter);
        let report =
            sync_users(&mut source, &mut destination, &domain_scope, exact, &options).await?;
        had_errors |= report.has_errors();
    }

    source.disconnect().await;
    destination.disconnect().await;
    Ok(had_errors)
}

/// Connect one configured directory endpoint, standing up its tunnel
/// first when one is configured. The tunnel must outlive the connection.
pub async fn connect(
    settings: &LdapSettings,
    connect_timeout: Duration,
) -> Result<(LdapDirectory, Option<SshTunnel>), DirectoryError> {
    let (host, port, tunnel) = match settings.tunnel() {
        Some(tunnel_config) => {
            let tunnel = SshTunnel::open(
                &tunnel_config.settings(),
                settings.host(),
                settings.port(),
                connect_timeout,
            )
            .await?;
            let port = tunnel.local_port();
            ("127.0.0.1".to_string(), port, Some(tunnel))
        }
        None => (settings.host().to_string(), settings.port(), None),
    };
    let endpoint = settings.endpoint(host, port, connect_timeout);
    let directory = LdapDirectory::connect(&endpoint).await?;
    Ok((directory, tunnel))
}
