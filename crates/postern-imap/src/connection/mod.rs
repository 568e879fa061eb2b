//! IMAP connection management.
//!
//! This module provides connection handling for IMAP servers, including:
//! - Configuration (host, port, security mode, deadlines)
//! - TLS/plaintext stream abstraction with STARTTLS upgrade
//! - Framed I/O for IMAP protocol
//! - The connection itself, with its runtime lifecycle
//! - A shared session with keepalive checkout and reconnection

mod client;
mod config;
mod framed;
mod session;
mod stream;

pub use client::{Connection, ConnectionState};
pub use config::{Config, ConfigBuilder, Security};
pub use framed::{FramedStream, MAX_LINE_LENGTH, MAX_LITERAL_SIZE};
pub use session::{
    Checkout, Connector, ListingCache, Session, SessionConfig, SessionEvent, TcpConnector,
};
pub use stream::{ImapStream, tls_connector};
