//! Search filters for the iRedMail directory schema. Disabled domains and
//! users never match, and neither do accounts without mail service.

use ldap3::ldap_escape;

pub fn all_domains() -> String {
    "(&(objectClass=mailDomain)(!(accountStatus=disabled))(enabledService=mail))".to_string()
}

pub fn one_domain(domain: &str) -> String {
    format!(
        "(&(objectClass=mailDomain)(!(accountStatus=disabled))(enabledService=mail)(domainName={}))",
        ldap_escape(domain)
    )
}

pub fn all_users() -> String {
    "(&(objectClass=mailUser)(!(domainStatus=disabled))(enabledService=mail))".to_string()
}

pub fn users_of_domain(domain: &str) -> String {
    format!(
        "(&(objectClass=mailUser)(!(domainStatus=disabled))(enabledService=mail)(mail=*@{}))",
        ldap_escape(domain)
    )
}

pub fn one_user(mail: &str) -> String {
    format!(
        "(&(objectClass=mailUser)(!(domainStatus=disabled))(enabledService=mail)(mail={}))",
        ldap_escape(mail)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_domain_interpolates_the_name() {
        assert_eq!(
            "(&(objectClass=mailDomain)(!(accountStatus=disabled))(enabledService=mail)(domainName=example.com))",
            one_domain("example.com")
        );
    }

    #[test]
    fn test_filter_metacharacters_are_escaped() {
        let filter = one_user("a*b@example.com");
        assert!(filter.contains("mail=a\\2ab@example.com"));
    }
}
