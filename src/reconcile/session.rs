use std::collections::BTreeSet;
use std::fmt::Write as _;

use derive_builder::Builder;
use derive_getters::Getters;
use thiserror::Error;

/// Message state markers replicated between backends. Transient markers the
/// server manages on its own never make it past [`Flag::parse`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Flag {
    Seen,
    Answered,
    Flagged,
    Deleted,
    Draft,
    /// Keyword or uncommon system flag, stored verbatim.
    Other(String),
}

const TRANSIENT_FLAGS: &[&str] = &["recent", "nonjunk", "junk"];

impl Flag {
    /// Parse a protocol flag token. Returns `None` for transient,
    /// server-managed markers.
    pub fn parse(raw: &str) -> Option<Self> {
        let token = raw.trim();
        if token.is_empty() {
            return None;
        }
        let bare = token.trim_start_matches('\\');
        if TRANSIENT_FLAGS
            .iter()
            .any(|transient| bare.eq_ignore_ascii_case(transient))
        {
            return None;
        }
        let flag = match bare.to_ascii_lowercase().as_str() {
            "seen" => Flag::Seen,
            "answered" => Flag::Answered,
            "flagged" => Flag::Flagged,
            "deleted" => Flag::Deleted,
            "draft" => Flag::Draft,
            _ => Flag::Other(token.to_string()),
        };
        Some(flag)
    }

    pub fn as_imap(&self) -> &str {
        match self {
            Flag::Seen => "\\Seen",
            Flag::Answered => "\\Answered",
            Flag::Flagged => "\\Flagged",
            Flag::Deleted => "\\Deleted",
            Flag::Draft => "\\Draft",
            Flag::Other(raw) => raw,
        }
    }
}

pub type FlagSet = BTreeSet<Flag>;

/// Render a flag set as a parenthesized protocol list.
pub fn format_flags(flags: &FlagSet) -> String {
    let mut out = String::from("(");
    for (i, flag) in flags.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{}", flag.as_imap());
    }
    out.push(')');
    out
}

/// One folder as reported by the mailbox backend's listing.
#[derive(Debug, Clone, Builder, Getters)]
pub struct Folder {
    name: String,
    #[builder(default)]
    delimiter: Option<String>,
    #[builder(default = "true")]
    #[getter(skip)]
    selectable: bool,
}

impl Folder {
    pub fn selectable_named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            delimiter: None,
            selectable: true,
        }
    }

    pub fn selectable(&self) -> bool {
        self.selectable
    }
}

/// Identity-bearing header data of one message.
#[derive(Debug, Clone, Getters)]
pub struct MessageHeader {
    message_id: Option<String>,
    flags: FlagSet,
    #[getter(skip)]
    size: u64,
}

impl MessageHeader {
    pub fn new(message_id: Option<String>, flags: FlagSet, size: u64) -> Self {
        Self {
            message_id,
            flags,
            size,
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Age window restricting which messages participate in reconciliation,
/// in whole days relative to now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgeFilter {
    pub min_days: Option<u32>,
    pub max_days: Option<u32>,
}

impl AgeFilter {
    pub fn is_empty(&self) -> bool {
        self.min_days.is_none() && self.max_days.is_none()
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("connecting to {host}:{port} failed: {reason}")]
    Connect {
        host: String,
        port: u16,
        reason: String,
    },
    #[error("{operation} timed out")]
    Timeout { operation: String },
    #[error("authentication failed for {user}")]
    Auth { user: String },
    #[error("server rejected {command}: {information}")]
    Rejected {
        command: String,
        information: String,
    },
    #[error("unexpected protocol data: {0}")]
    Protocol(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Whether the session is beyond recovery. A plain protocol rejection
    /// only affects the current folder; everything else poisons the task.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SessionError::Rejected { .. })
    }
}

/// Contract of the mailbox backend, consumed per (user, folder). One
/// implementation speaks IMAP; tests substitute scripted doubles.
pub trait MailSession {
    async fn login(&mut self, user: &str) -> Result<(), SessionError>;
    async fn list_folders(&mut self) -> Result<Vec<Folder>, SessionError>;
    async fn select_folder(&mut self, folder: &str, read_only: bool)
    -> Result<(), SessionError>;
    async fn close_folder(&mut self) -> Result<(), SessionError>;
    async fn create_folder(&mut self, folder: &str) -> Result<(), SessionError>;
    /// Message identifiers in the selected folder matching `filter`.
    async fn search_messages(&mut self, filter: &AgeFilter) -> Result<Vec<u32>, SessionError>;
    async fn fetch_header(&mut self, id: u32) -> Result<MessageHeader, SessionError>;
    async fn fetch_body(&mut self, id: u32) -> Result<Vec<u8>, SessionError>;
    async fn append(
        &mut self,
        folder: &str,
        body: &[u8],
        flags: Option<&FlagSet>,
    ) -> Result<(), SessionError>;
    async fn store_flags(&mut self, id: u32, flags: &FlagSet) -> Result<(), SessionError>;
    async fn logout(&mut self) -> Result<(), SessionError>;
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("\\Seen", Some(Flag::Seen))]
    #[case("\\ANSWERED", Some(Flag::Answered))]
    #[case("\\Recent", None)]
    #[case("\\NonJunk", None)]
    #[case("Junk", None)]
    #[case("$Forwarded", Some(Flag::Other("$Forwarded".to_string())))]
    #[case("\\MDNSent", Some(Flag::Other("\\MDNSent".to_string())))]
    fn test_flag_parse_filters_transient_markers(#[case] raw: &str, #[case] expected: Option<Flag>) {
        assert_eq!(expected, Flag::parse(raw));
    }

    #[rstest]
    fn test_format_flags_renders_parenthesized_list() {
        let flags: FlagSet = [Flag::Seen, Flag::Answered].into_iter().collect();
        assert_eq!("(\\Seen \\Answered)", format_flags(&flags));
        assert_eq!("()", format_flags(&FlagSet::new()));
    }
}
