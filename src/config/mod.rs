mod endpoints;
mod settings;

pub use endpoints::ImapSettings;
pub use endpoints::LdapSettings;
pub use endpoints::SecurityMode;
pub use endpoints::TunnelConfig;
pub use settings::Config;
pub use settings::EndpointPair;
pub use settings::SyncSettings;
