use std::time::Duration;

use futures::{SinkExt as _, StreamExt as _};
use log::{debug, trace};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_native_tls::{TlsConnector, TlsStream, native_tls};
use tokio_util::codec::Framed;
use tokio_util::either::Either;

use crate::imap::codec::{ImapCodec, Outgoing, ResponseData};
use crate::imap::tag_generator::TagGenerator;
use crate::reconcile::SessionError;

/// Transport security of the mailbox connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Security {
    /// Implicit TLS on connect. `insecure` skips certificate verification.
    Tls { insecure: bool },
    Plain,
}

type ImapStream = Framed<Either<TlsStream<TcpStream>, TcpStream>, ImapCodec>;

/// All responses one command produced: the untagged data lines and the
/// final tagged completion.
pub struct CommandOutcome {
    pub untagged: Vec<ResponseData>,
    pub done: ResponseData,
}

impl CommandOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(
            self.done.parsed(),
            imap_proto::Response::Done {
                status: imap_proto::Status::Ok,
                ..
            }
        )
    }

    pub fn information(&self) -> String {
        match self.done.parsed() {
            imap_proto::Response::Done {
                information: Some(information),
                ..
            } => information.to_string(),
            _ => String::new(),
        }
    }

    /// Turn a non-OK completion into a [`SessionError::Rejected`].
    pub fn accept(self, command: &str) -> Result<Self, SessionError> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(SessionError::Rejected {
                command: command.to_string(),
                information: self.information(),
            })
        }
    }
}

pub struct Connection {
    stream: ImapStream,
    tag_generator: TagGenerator,
    operation_timeout: Duration,
}

impl Connection {
    pub async fn open(
        host: &str,
        port: u16,
        security: Security,
        connect_timeout: Duration,
        operation_timeout: Duration,
    ) -> Result<Self, SessionError> {
        debug!("connecting to {host}:{port}");
        let connect_error = |reason: String| SessionError::Connect {
            host: host.to_string(),
            port,
            reason,
        };
        let tcp = timeout(connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| SessionError::Timeout {
                operation: format!("connect to {host}:{port}"),
            })?
            .map_err(|err| connect_error(err.to_string()))?;

        let stream = match security {
            Security::Tls { insecure } => {
                let mut builder = native_tls::TlsConnector::builder();
                if insecure {
                    builder.danger_accept_invalid_certs(true);
                }
                let tls = builder
                    .build()
                    .map_err(|err| connect_error(err.to_string()))?;
                let tls = TlsConnector::from(tls);
                let stream = timeout(connect_timeout, tls.connect(host, tcp))
                    .await
                    .map_err(|_| SessionError::Timeout {
                        operation: format!("tls handshake with {host}:{port}"),
                    })?
                    .map_err(|err| connect_error(err.to_string()))?;
                Either::Left(stream)
            }
            Security::Plain => Either::Right(tcp),
        };

        let mut stream = Framed::new(stream, ImapCodec::default());
        let greeting = timeout(operation_timeout, stream.next())
            .await
            .map_err(|_| SessionError::Timeout {
                operation: "greeting".to_string(),
            })?
            .ok_or_else(|| connect_error("connection closed before greeting".to_string()))?
            .map_err(SessionError::Io)?;
        trace!("greeting = {:?}", greeting.parsed());

        Ok(Self {
            stream,
            tag_generator: TagGenerator::default(),
            operation_timeout,
        })
    }

    pub async fn send(&mut self, command: &str) -> Result<CommandOutcome, SessionError> {
        self.do_send(command, None).await
    }

    /// Send a command carrying one literal, e.g. an APPEND payload. The
    /// payload goes out once the server requests continuation.
    pub async fn send_with_literal(
        &mut self,
        command: &str,
        payload: &[u8],
    ) -> Result<CommandOutcome, SessionError> {
        self.do_send(command, Some(payload)).await
    }

    async fn do_send(
        &mut self,
        command: &str,
        mut literal: Option<&[u8]>,
    ) -> Result<CommandOutcome, SessionError> {
        let tag = self.tag_generator.next();
        self.stream
            .send(Outgoing {
                tag: tag.as_bytes(),
                data: command.as_bytes(),
            })
            .await?;

        let verb = command.split_whitespace().next().unwrap_or("command");
        let mut untagged = Vec::new();
        loop {
            let response = timeout(self.operation_timeout, self.stream.next())
                .await
                .map_err(|_| SessionError::Timeout {
                    operation: verb.to_string(),
                })?
                .ok_or_else(|| {
                    SessionError::Protocol(format!("connection closed during {verb}"))
                })?
                .map_err(SessionError::Io)?;

            enum Kind {
                Continuation,
                Done,
                Untagged,
            }
            let kind = match response.parsed() {
                imap_proto::Response::Continue { .. } => Kind::Continuation,
                imap_proto::Response::Done { .. } => Kind::Done,
                _ => Kind::Untagged,
            };
            match kind {
                Kind::Continuation => {
                    let Some(payload) = literal.take() else {
                        return Err(SessionError::Protocol(format!(
                            "unexpected continuation request during {verb}"
                        )));
                    };
                    self.stream
                        .send(Outgoing {
                            tag: b"",
                            data: payload,
                        })
                        .await?;
                }
                Kind::Done => {
                    let done_tag = response
                        .request_id()
                        .expect("done responses always carry a tag");
                    if done_tag.0 != tag {
                        return Err(SessionError::Protocol(format!(
                            "response tag {} does not match request tag {tag}",
                            done_tag.0
                        )));
                    }
                    return Ok(CommandOutcome {
                        untagged,
                        done: response,
                    });
                }
                Kind::Untagged => untagged.push(response),
            }
        }
    }
}
