use std::time::Duration;

use imap_proto::{AttributeValue, MailboxDatum, Response};
use log::{debug, trace};

use crate::imap::connection::{Connection, Security};
use crate::imap::{message_id, search};
use crate::reconcile::{
    AgeFilter, Flag, FlagSet, Folder, FolderBuilder, MailSession, MessageHeader, SessionError,
    format_flags,
};

/// Connection settings of one IMAP endpoint.
#[derive(Debug, Clone)]
pub struct ImapEndpoint {
    pub host: String,
    pub port: u16,
    pub security: Security,
    pub master_user: String,
    pub master_password: String,
    pub connect_timeout: Duration,
    pub operation_timeout: Duration,
}

/// A live IMAP connection implementing [`MailSession`]. Users authenticate
/// through the configured master account, so no per-user credentials are
/// needed.
pub struct ImapSession {
    connection: Connection,
    master_user: String,
    master_password: String,
}

impl ImapSession {
    pub async fn connect(endpoint: &ImapEndpoint) -> Result<Self, SessionError> {
        let connection = Connection::open(
            &endpoint.host,
            endpoint.port,
            endpoint.security,
            endpoint.connect_timeout,
            endpoint.operation_timeout,
        )
        .await?;
        Ok(Self {
            connection,
            master_user: endpoint.master_user.clone(),
            master_password: endpoint.master_password.clone(),
        })
    }
}

impl MailSession for ImapSession {
    async fn login(&mut self, user: &str) -> Result<(), SessionError> {
        let login = if self.master_user.is_empty() {
            user.to_string()
        } else {
            format!("{user}*{}", self.master_user)
        };
        debug!("LOGIN {login} <password>");
        let command = format!(
            "LOGIN {} {}",
            quote(&login),
            quote(&self.master_password)
        );
        match self.connection.send(&command).await?.accept("LOGIN") {
            Ok(_) => Ok(()),
            Err(SessionError::Rejected { .. }) => Err(SessionError::Auth {
                user: user.to_string(),
            }),
            Err(err) => Err(err),
        }
    }

    async fn list_folders(&mut self) -> Result<Vec<Folder>, SessionError> {
        let outcome = self
            .connection
            .send("LIST \"\" \"*\"")
            .await?
            .accept("LIST")?;
        let mut folders = Vec::new();
        for response in &outcome.untagged {
            if let Response::MailboxData(MailboxDatum::List {
                flags,
                delimiter,
                name,
                ..
            }) = response.parsed()
            {
                let selectable = !flags
                    .iter()
                    .any(|flag| flag.trim_start_matches('\\').eq_ignore_ascii_case("noselect"));
                let folder = FolderBuilder::default()
                    .name(name.to_string())
                    .delimiter(delimiter.as_ref().map(ToString::to_string))
                    .selectable(selectable)
                    .build()
                    .map_err(|err| SessionError::Protocol(err.to_string()))?;
                trace!("listed folder {:?}", folder.name());
                folders.push(folder);
            }
        }
        Ok(folders)
    }

    async fn select_folder(
        &mut self,
        folder: &str,
        read_only: bool,
    ) -> Result<(), SessionError> {
        let verb = if read_only { "EXAMINE" } else { "SELECT" };
        let command = format!("{verb} {}", quote(folder));
        self.connection.send(&command).await?.accept(verb)?;
        Ok(())
    }

    // UNSELECT instead of CLOSE so deleted-but-unexpunged messages on the
    // destination stay untouched.
    async fn close_folder(&mut self) -> Result<(), SessionError> {
        self.connection.send("UNSELECT").await?.accept("UNSELECT")?;
        Ok(())
    }

    async fn create_folder(&mut self, folder: &str) -> Result<(), SessionError> {
        let command = format!("CREATE {}", quote(folder));
        self.connection.send(&command).await?.accept("CREATE")?;
        Ok(())
    }

    async fn search_messages(&mut self, filter: &AgeFilter) -> Result<Vec<u32>, SessionError> {
        let command = format!("SEARCH {}", search::search_criteria(filter, search::today()));
        let outcome = self.connection.send(&command).await?.accept("SEARCH")?;
        let mut ids = Vec::new();
        for response in &outcome.untagged {
            if let Response::MailboxData(MailboxDatum::Search(found)) = response.parsed() {
                ids.extend_from_slice(found);
            }
        }
        Ok(ids)
    }

    async fn fetch_header(&mut self, id: u32) -> Result<MessageHeader, SessionError> {
        let command =
            format!("FETCH {id} (BODY.PEEK[HEADER.FIELDS (MESSAGE-ID)] FLAGS RFC822.SIZE)");
        let outcome = self.connection.send(&command).await?.accept("FETCH")?;
        let mut parsed_id = None;
        let mut flags = FlagSet::new();
        let mut size = 0;
        let mut seen_fetch = false;
        for response in &outcome.untagged {
            let Response::Fetch(_, attributes) = response.parsed() else {
                continue;
            };
            seen_fetch = true;
            for attribute in attributes {
                match attribute {
                    AttributeValue::Flags(raw_flags) => {
                        flags = raw_flags.iter().filter_map(|raw| Flag::parse(raw)).collect();
                    }
                    AttributeValue::Rfc822Size(n) => size = u64::from(*n),
                    AttributeValue::BodySection {
                        data: Some(data), ..
                    } => parsed_id = message_id::parse_message_id(data),
                    _ => {}
                }
            }
        }
        if !seen_fetch {
            return Err(SessionError::Protocol(format!(
                "no fetch data for message {id}"
            )));
        }
        Ok(MessageHeader::new(parsed_id, flags, size))
    }

    async fn fetch_body(&mut self, id: u32) -> Result<Vec<u8>, SessionError> {
        let command = format!("FETCH {id} (RFC822)");
        let outcome = self.connection.send(&command).await?.accept("FETCH")?;
        for response in &outcome.untagged {
            let Response::Fetch(_, attributes) = response.parsed() else {
                continue;
            };
            for attribute in attributes {
                if let AttributeValue::Rfc822(Some(data)) = attribute {
                    return Ok(data.to_vec());
                }
            }
        }
        Err(SessionError::Protocol(format!(
            "no body data for message {id}"
        )))
    }

    async fn append(
        &mut self,
        folder: &str,
        body: &[u8],
        flags: Option<&FlagSet>,
    ) -> Result<(), SessionError> {
        let command = match flags.filter(|flags| !flags.is_empty()) {
            Some(flags) => format!(
                "APPEND {} {} {{{}}}",
                quote(folder),
                format_flags(flags),
                body.len()
            ),
            None => format!("APPEND {} {{{}}}", quote(folder), body.len()),
        };
        self.connection
            .send_with_literal(&command, body)
            .await?
            .accept("APPEND")?;
        Ok(())
    }

    async fn store_flags(&mut self, id: u32, flags: &FlagSet) -> Result<(), SessionError> {
        if flags.is_empty() {
            return Ok(());
        }
        let command = format!("STORE {id} +FLAGS {}", format_flags(flags));
        self.connection.send(&command).await?.accept("STORE")?;
        Ok(())
    }

    async fn logout(&mut self) -> Result<(), SessionError> {
        self.connection.send("LOGOUT").await?.accept("LOGOUT")?;
        Ok(())
    }
}

/// Quote a string for use in a command, escaping backslashes and quotes.
fn quote(raw: &str) -> String {
    format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::plain("INBOX", "\"INBOX\"")]
    #[case::space("Sent Items", "\"Sent Items\"")]
    #[case::quote("a\"b", "\"a\\\"b\"")]
    #[case::backslash("a\\b", "\"a\\\\b\"")]
    fn test_quote(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(expected, quote(raw));
    }
}
