//! Attribute allow-lists per entry kind. Only these attributes ever
//! participate in a diff or land in a changeset.

pub const DOMAIN_SYNC_ATTRS: &[&str] = &[
    "domainName",
    "domainPendingAliasName",
    "domainAliasName",
    "cn",
    "description",
    "accountStatus",
    "domainBackupMX",
    "domainAdmin",
    "mtaTransport",
    "enabledService",
    "domainRecipientBccAddress",
    "domainSenderBccAddress",
    "senderRelayHost",
    "disclaimer",
    "domainCurrentQuotaSize",
    "accountSetting",
];

pub const USER_SYNC_ATTRS: &[&str] = &[
    "mail",
    "cn",
    "sn",
    "uid",
    "accountStatus",
    "mailQuota",
    "employeeNumber",
    "title",
    "senderRelayHost",
    "shadowAddress",
    "mailForwardingAddress",
    "memberOfGroup",
    "enabledService",
    "disabledService",
    "domainGlobalAdmin",
    "shadowLastChange",
    "givenName",
    "mobile",
    "telephoneNumber",
    "preferredLanguage",
    "userRecipientBccAddress",
    "userSenderBccAddress",
    "mtaTransport",
    "accountSetting",
    "allowNets",
    "street",
    "postalCode",
    "postalAddress",
];

/// Synthesized on user creation, never diffed against the source.
pub const USER_STORAGE_ATTRS: &[&str] =
    &["storageBaseDirectory", "mailMessageStore", "homeDirectory"];
