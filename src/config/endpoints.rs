use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::imap::{ImapEndpoint, Security};
use crate::ldap::LdapEndpoint;
use crate::tunnel::TunnelSettings;

/// One directory endpoint as configured. `base_dn` may be left out; it is
/// then derived from the bind DN's `dc=` components.
#[derive(Debug, Deserialize)]
pub struct LdapSettings {
    host: String,
    #[serde(default = "default_ldap_port")]
    port: u16,
    #[serde(default)]
    use_ssl: bool,
    bind_dn: String,
    bind_password: String,
    base_dn: Option<String>,
    tunnel: Option<TunnelConfig>,
}

impl LdapSettings {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn tunnel(&self) -> Option<&TunnelConfig> {
        self.tunnel.as_ref()
    }

    /// Endpoint to connect to. When a tunnel is up, `host` and `port`
    /// override the configured ones with the forward's local end.
    pub fn endpoint(
        &self,
        host: String,
        port: u16,
        connect_timeout: Duration,
    ) -> LdapEndpoint {
        LdapEndpoint {
            host,
            port,
            use_ssl: self.use_ssl,
            bind_dn: self.bind_dn.clone(),
            bind_password: self.bind_password.clone(),
            base_dn: self.base_dn.clone(),
            connect_timeout,
        }
    }
}

/// Jump-host settings of one directory endpoint.
#[derive(Debug, Deserialize)]
pub struct TunnelConfig {
    host: String,
    #[serde(default = "default_ssh_port")]
    port: u16,
    user: String,
    key_file: Option<PathBuf>,
}

impl TunnelConfig {
    pub fn settings(&self) -> TunnelSettings {
        TunnelSettings {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            key_file: self.key_file.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecurityMode {
    #[default]
    Tls,
    Plain,
}

/// One mailbox endpoint as configured. Authentication happens through the
/// master account, per user.
#[derive(Debug, Deserialize)]
pub struct ImapSettings {
    host: String,
    #[serde(default = "default_imap_port")]
    port: u16,
    #[serde(default)]
    security: SecurityMode,
    /// Skip certificate verification.
    #[serde(default)]
    insecure: bool,
    master_user: String,
    master_password: String,
}

impl ImapSettings {
    pub fn endpoint(
        &self,
        connect_timeout: Duration,
        operation_timeout: Duration,
    ) -> ImapEndpoint {
        let security = match self.security {
            SecurityMode::Tls => Security::Tls {
                insecure: self.insecure,
            },
            SecurityMode::Plain => Security::Plain,
        };
        ImapEndpoint {
            host: self.host.clone(),
            port: self.port,
            security,
            master_user: self.master_user.clone(),
            master_password: self.master_password.clone(),
            connect_timeout,
            operation_timeout,
        }
    }
}

fn default_ldap_port() -> u16 {
    389
}

fn default_ssh_port() -> u16 {
    22
}

fn default_imap_port() -> u16 {
    993
}
