//! # postern-imap
//!
//! An IMAP4rev1 (RFC 3501) client protocol engine: response tokenizer,
//! command channel, mailbox-state tracking and literal streaming.
//!
//! ## Features
//!
//! - **Runtime lifecycle**: `NotConnected` → `Connected` → `Authenticated`
//!   → `Selected`, with `Closed` as the terminal state; commands invalid in
//!   the current state are rejected before anything is written
//! - **One command in flight**: every command method takes `&mut self`; a
//!   tagged response with any other tag is a protocol violation
//! - **Mailbox state**: EXISTS/RECENT/EXPUNGE/FLAGS and SELECT response
//!   codes keep [`MailboxStatus`] current, with EXPUNGE renumbering applied
//!   through [`state::SequenceCache`]
//! - **Literal streaming**: large body sections can be read straight off the
//!   socket ([`fetch::LiteralStream`]) or in ranged chunks
//!   ([`fetch::PartialFetch`])
//! - **TLS via rustls**: implicit TLS and STARTTLS without OpenSSL
//! - **Session**: a shared connection with NOOP keepalive, one-shot
//!   reconnection, a cached mailbox listing and broadcast events
//!
//! ## Quick Start
//!
//! ```ignore
//! use postern_imap::{Config, Connection, FetchAddress, Mailbox, Security};
//!
//! #[tokio::main]
//! async fn main() -> postern_imap::Result<()> {
//!     let config = Config::builder("imap.example.com")
//!         .security(Security::Implicit)
//!         .build();
//!     let mut conn = Connection::open(&config).await?;
//!     conn.login("user@example.com", "password").await?;
//!
//!     for entry in conn.list("", "*").await? {
//!         println!("{}", entry.mailbox);
//!     }
//!
//!     let status = conn.select(&Mailbox::inbox()).await?;
//!     println!("{} messages", status.exists);
//!
//!     if let Some(header) = conn.fetch_header(1).await? {
//!         println!("{}", String::from_utf8_lossy(&header));
//!     }
//!
//!     let mut body = conn.stream_section(1, &FetchAddress::whole()).await?;
//!     let bytes = body.read_to_end().await?;
//!     body.finish().await?;
//!     println!("{} bytes", bytes.len());
//!
//!     conn.logout().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`command`]: IMAP commands and their wire encoding
//! - [`connection`]: Streams, the connection, and the session
//! - [`fetch`]: Section addresses, FETCH results, streaming
//! - [`handler`]: Unsolicited event callbacks
//! - [`mutf7`]: Modified UTF-7 mailbox names
//! - [`parser`]: Lexer, response parser and tokenizer
//! - [`state`]: Mailbox counters and sequence renumbering
//! - [`types`]: Core IMAP types (flags, mailboxes, sequences, etc.)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod fetch;
pub mod handler;
pub mod mutf7;
pub mod parser;
pub mod state;
pub mod types;

pub use command::{
    Command, FetchAttribute, SearchCriteria, StatusAttribute, StoreAction, TagGenerator,
};
pub use connection::{
    Config, ConfigBuilder, Connection, ConnectionState, ImapStream, Security, Session,
    SessionConfig, SessionEvent, TcpConnector,
};
pub use error::{Error, Result};
pub use fetch::{FetchAddress, LiteralStream, MessageStatus, PartialFetch, Part};
pub use handler::ResponseHandler;
pub use parser::{Response, ResponseParser, ResponseTokenizer};
pub use state::{MailboxEvent, MailboxState, SequenceCache};
pub use types::{
    Capability, Flag, Flags, ListEntry, Mailbox, MailboxAttribute, MailboxStatus, SequenceSet,
    Tag,
};

/// IMAP protocol version spoken.
pub const IMAP_VERSION: &str = "IMAP4rev1";
