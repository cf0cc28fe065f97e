mod codec;
mod connection;
mod message_id;
mod search;
mod session;
mod tag_generator;

pub use connection::Security;
pub use session::{ImapEndpoint, ImapSession};
