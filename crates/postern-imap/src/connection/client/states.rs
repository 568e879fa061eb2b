//! Connection lifecycle states.

use std::fmt;

use crate::types::Mailbox;

/// Where a connection is in the IMAP lifecycle.
///
/// ```text
/// NotConnected --greeting OK--> Connected --LOGIN--> Authenticated
///      |                                               |   ^
///      +--------------greeting PREAUTH-----------------+   | CLOSE
///                                                      SELECT/EXAMINE
///                                                          v   |
///                                                         Selected
/// any --LOGOUT, BYE, transport failure--> Closed
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Socket open, greeting not read yet.
    #[default]
    NotConnected,
    /// Greeting read; not authenticated.
    Connected,
    /// Logged in, no mailbox selected.
    Authenticated,
    /// A mailbox is selected.
    Selected {
        /// The selected mailbox.
        mailbox: Mailbox,
        /// Opened with EXAMINE.
        read_only: bool,
    },
    /// Terminal. The socket is gone.
    Closed,
}

impl ConnectionState {
    /// Returns true once LOGIN succeeded or the greeting was PREAUTH.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated | Self::Selected { .. })
    }

    /// Returns the selected mailbox, if any.
    #[must_use]
    pub const fn mailbox(&self) -> Option<&Mailbox> {
        match self {
            Self::Selected { mailbox, .. } => Some(mailbox),
            _ => None,
        }
    }

    /// Returns true for the terminal state.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => f.write_str("not connected"),
            Self::Connected => f.write_str("not authenticated"),
            Self::Authenticated => f.write_str("authenticated"),
            Self::Selected {
                mailbox,
                read_only: true,
            } => write!(f, "examining {mailbox}"),
            Self::Selected { mailbox, .. } => write!(f, "selected {mailbox}"),
            Self::Closed => f.write_str("closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_send<T: Send>() {}
    fn _assert_sync<T: Sync>() {}

    #[test]
    fn test_state_is_send_sync() {
        _assert_send::<ConnectionState>();
        _assert_sync::<ConnectionState>();
    }

    #[test]
    fn test_selected_accessors() {
        let state = ConnectionState::Selected {
            mailbox: Mailbox::inbox(),
            read_only: false,
        };
        assert!(state.is_authenticated());
        assert_eq!(state.mailbox(), Some(&Mailbox::inbox()));
        assert_eq!(state.to_string(), "selected INBOX");
    }

    #[test]
    fn test_lifecycle_predicates() {
        assert_eq!(ConnectionState::default(), ConnectionState::NotConnected);
        assert!(!ConnectionState::Connected.is_authenticated());
        assert!(ConnectionState::Authenticated.is_authenticated());
        assert!(ConnectionState::Closed.is_closed());
        assert_eq!(ConnectionState::Authenticated.mailbox(), None);
        assert_eq!(
            ConnectionState::Selected {
                mailbox: Mailbox::new("Archive"),
                read_only: true
            }
            .to_string(),
            "examining Archive"
        );
    }
}
