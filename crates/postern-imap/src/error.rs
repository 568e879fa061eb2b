//! Error types for the IMAP engine.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during IMAP operations.
///
/// Variants fall into two groups. Fatal errors (transport, protocol, BYE,
/// deadline expiry) leave the connection `Closed`; it must be discarded.
/// Command failures (`No`, `Bad`) and local state rejections leave the
/// connection usable.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Malformed server data.
    #[error("Protocol error at position {position}: {message}")]
    Parse {
        /// Byte position where the error occurred.
        position: usize,
        /// Description of what went wrong.
        message: String,
    },

    /// A tagged completion arrived for a tag that is not in flight.
    #[error("Unexpected tag {received} (expected {expected})")]
    UnexpectedTag {
        /// Tag of the command in flight.
        expected: String,
        /// Tag the server sent.
        received: String,
    },

    /// The server rejected the command with NO.
    #[error("{command} failed: NO {}{text}", code_prefix(.code.as_deref()))]
    No {
        /// Command name, e.g. `SELECT`.
        command: &'static str,
        /// Human-readable text from the server.
        text: String,
        /// Response code, e.g. `TRYCREATE`, when present.
        code: Option<String>,
    },

    /// The server rejected the command with BAD.
    #[error("{command} rejected: BAD {}{text}", code_prefix(.code.as_deref()))]
    Bad {
        /// Command name.
        command: &'static str,
        /// Human-readable text from the server.
        text: String,
        /// Response code, when present.
        code: Option<String>,
    },

    /// Server sent BYE (disconnecting).
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// The configured I/O deadline expired.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The operation is not valid in the current connection state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The connection is closed or could not be re-established.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Protocol violation or unexpected data.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

fn code_prefix(code: Option<&str>) -> String {
    code.map(|c| format!("[{c}] ")).unwrap_or_default()
}

impl Error {
    /// Returns true if the connection must be discarded after this error.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::No { .. } | Self::Bad { .. } | Self::InvalidState(_)
        )
    }

    /// Returns true if the error means the server or transport went away.
    #[must_use]
    pub const fn is_disconnect(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Bye(_) | Self::Timeout(_) | Self::ConnectionClosed
        )
    }

    /// Returns the server's response code for NO/BAD failures.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::No { code, .. } | Self::Bad { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
