use ::std::env;
use std::{
    fs::read_to_string,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use derive_getters::Getters;
use serde::Deserialize;

use crate::config::endpoints::{ImapSettings, LdapSettings};
use crate::reconcile::DecisionPolicy;

/// Source and destination of one protocol.
#[derive(Debug, Deserialize, Getters)]
pub struct EndpointPair<T> {
    source: T,
    destination: T,
}

#[derive(Debug, Deserialize, Getters)]
pub struct SyncSettings {
    #[serde(default = "default_concurrency")]
    #[getter(skip)]
    max_concurrent_users: usize,
    #[serde(default)]
    storage_base_directory: String,
    /// Delete destination-only attributes on modify. Off by default; the
    /// migration is meant to be non-destructive.
    #[serde(default)]
    #[getter(skip)]
    delete_destination_attrs: bool,
    #[serde(default)]
    #[getter(skip)]
    domain_decision: DecisionPolicy,
    /// Exit non-zero when any user task fails.
    #[serde(default)]
    #[getter(skip)]
    fail_on_user_error: bool,
    #[serde(default = "default_connect_timeout_secs")]
    #[getter(skip)]
    connect_timeout_secs: u64,
    #[serde(default = "default_operation_timeout_secs")]
    #[getter(skip)]
    operation_timeout_secs: u64,
}

impl SyncSettings {
    pub fn max_concurrent_users(&self) -> usize {
        self.max_concurrent_users
    }

    pub fn delete_destination_attrs(&self) -> bool {
        self.delete_destination_attrs
    }

    pub fn domain_decision(&self) -> DecisionPolicy {
        self.domain_decision
    }

    pub fn fail_on_user_error(&self) -> bool {
        self.fail_on_user_error
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Getters)]
pub struct Config {
    ldap: EndpointPair<LdapSettings>,
    imap: EndpointPair<ImapSettings>,
    #[serde(default)]
    sync: SyncSettings,
}

impl Config {
    pub fn load_from_file(file: Option<PathBuf>) -> Self {
        let config_file = file.unwrap_or_else(default_location);
        let config_contents =
            read_to_string(config_file).expect("config file should be readable");
        toml::from_str(&config_contents).expect("config should be parseable")
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_concurrent_users: default_concurrency(),
            storage_base_directory: String::new(),
            delete_destination_attrs: false,
            domain_decision: DecisionPolicy::default(),
            fail_on_user_error: false,
            connect_timeout_secs: default_connect_timeout_secs(),
            operation_timeout_secs: default_operation_timeout_secs(),
        }
    }
}

fn default_location() -> PathBuf {
    let mut config_dir = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        PathBuf::from_str(&config_home).expect("XDG_CONFIG_HOME should be a parseable path")
    } else {
        let mut config_home = PathBuf::from_str(&env::var("HOME").expect("HOME should be set"))
            .expect("HOME should be a parseable path");
        config_home.push(".config");
        config_home
    };
    config_dir.push(env!("CARGO_PKG_NAME"));
    config_dir.push("config.toml");

    config_dir
}

fn default_concurrency() -> usize {
    4
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_operation_timeout_secs() -> u64 {
    120
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [ldap.source]
        host = "old-ldap.example.com"
        bind_dn = "cn=Manager,dc=example,dc=com"
        bind_password = "secret"

        [ldap.source.tunnel]
        host = "jump.example.com"
        user = "migrator"

        [ldap.destination]
        host = "new-ldap.example.com"
        port = 636
        use_ssl = true
        bind_dn = "cn=Manager,dc=example,dc=com"
        bind_password = "secret"
        base_dn = "o=domains,dc=example,dc=com"

        [imap.source]
        host = "old-mail.example.com"
        security = "plain"
        port = 143
        master_user = "master"
        master_password = "secret"

        [imap.destination]
        host = "new-mail.example.com"
        insecure = true
        master_user = "master"
        master_password = "secret"

        [sync]
        max_concurrent_users = 8
        storage_base_directory = "/var/vmail/vmail1"
        domain_decision = "legacy-inverted"
    "#;

    #[test]
    fn test_sample_config_parses() {
        let config: Config = toml::from_str(SAMPLE).unwrap();

        assert_eq!("old-ldap.example.com", config.ldap().source().host());
        assert_eq!(389, config.ldap().source().port());
        assert!(config.ldap().source().tunnel().is_some());
        assert!(config.ldap().destination().tunnel().is_none());
        assert_eq!(8, config.sync().max_concurrent_users());
        assert_eq!("/var/vmail/vmail1", config.sync().storage_base_directory());
        assert_eq!(
            crate::reconcile::DecisionPolicy::LegacyInverted,
            config.sync().domain_decision()
        );
        let imap = config
            .imap()
            .source()
            .endpoint(Duration::from_secs(1), Duration::from_secs(2));
        assert_eq!(143, imap.port);
        assert_eq!(crate::imap::Security::Plain, imap.security);
    }

    #[test]
    fn test_sync_section_is_optional() {
        let minimal = SAMPLE
            .split("[sync]")
            .next()
            .unwrap();
        let config: Config = toml::from_str(minimal).unwrap();

        assert_eq!(4, config.sync().max_concurrent_users());
        assert!(!config.sync().fail_on_user_error());
        assert_eq!(Duration::from_secs(30), config.sync().connect_timeout());
    }
}
