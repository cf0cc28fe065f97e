mod client;
mod dn;
mod filter;

pub use client::{LdapDirectory, LdapEndpoint};
