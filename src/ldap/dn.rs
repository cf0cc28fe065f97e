//! Distinguished-name layout of the iRedMail tree. Everything hangs off
//! `o=domains,<dc components>`.

use ldap3::dn_escape;

use crate::directory::split_address;

/// Organizational units every freshly created domain carries.
pub const DEFAULT_GROUPS: &[&str] = &["Users", "Groups", "Aliases", "Externals"];

/// Derive the search base from a bind DN when the configuration leaves it
/// out: keep the `dc=` components and root them under `o=domains`.
pub fn base_from_bind_dn(bind_dn: &str) -> String {
    let mut base = String::from("o=domains");
    for component in bind_dn.split(',') {
        if component.trim_start().starts_with("dc=") {
            base.push(',');
            base.push_str(component.trim());
        }
    }
    base
}

pub fn domain(base: &str, name: &str) -> String {
    format!("domainName={},{base}", dn_escape(name))
}

pub fn group(base: &str, domain_name: &str, group_name: &str) -> String {
    format!("ou={},{}", dn_escape(group_name), domain(base, domain_name))
}

/// DN of a user record, or `None` when `mail` is not a full address.
pub fn user(base: &str, mail: &str) -> Option<String> {
    let (_, domain_name) = split_address(mail)?;
    Some(format!(
        "mail={},ou=Users,{}",
        dn_escape(mail),
        domain(base, domain_name)
    ))
}

#[cfg(test)]
mod tests {
    use assertables::*;

    use super::*;

    #[test]
    fn test_base_from_bind_dn_keeps_dc_components() {
        assert_eq!(
            "o=domains,dc=example,dc=com",
            base_from_bind_dn("cn=Manager,dc=example,dc=com")
        );
    }

    #[test]
    fn test_base_from_bind_dn_without_dc_components() {
        assert_eq!("o=domains", base_from_bind_dn("cn=admin"));
    }

    #[test]
    fn test_user_dn_nests_under_the_domain() {
        let dn = assert_some!(user("o=domains,dc=example,dc=com", "j.doe@example.com"));
        assert_eq!(
            "mail=j.doe@example.com,ou=Users,domainName=example.com,o=domains,dc=example,dc=com",
            dn
        );
    }

    #[test]
    fn test_user_dn_requires_a_full_address() {
        assert_none!(user("o=domains", "not-an-address"));
    }

    #[test]
    fn test_group_dn() {
        assert_eq!(
            "ou=Users,domainName=example.com,o=domains",
            group("o=domains", "example.com", "Users")
        );
    }
}
