//! IMAP command builder.
//!
//! Each [`Command`] encodes to one tagged command line. APPEND data, and any
//! string a quoted string cannot carry (CR, LF or 8-bit text), goes out as a
//! `{n}` literal: the line is split after each announcement and the rest is
//! sent once the server asks for it.

mod serialize;
mod tag_generator;
mod types;

use crate::mutf7;
use crate::types::{Flag, Mailbox, SequenceSet};

pub use tag_generator::TagGenerator;
pub use types::{FetchAttribute, SearchCriteria, StatusAttribute, StoreAction};

use serialize::{
    Wire, needs_literal, write_astring, write_fetch_items, write_flag_list, write_mailbox,
    write_search_criteria, write_store_action,
};

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Any state
    /// CAPABILITY command.
    Capability,
    /// NOOP command.
    Noop,
    /// LOGOUT command.
    Logout,

    // Not authenticated
    /// STARTTLS command.
    StartTls,
    /// LOGIN command.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },

    // Authenticated
    /// SELECT command.
    Select {
        /// Mailbox to select.
        mailbox: Mailbox,
    },
    /// EXAMINE command (read-only SELECT).
    Examine {
        /// Mailbox to examine.
        mailbox: Mailbox,
    },
    /// CREATE command.
    Create {
        /// Mailbox to create.
        mailbox: Mailbox,
    },
    /// DELETE command.
    Delete {
        /// Mailbox to delete.
        mailbox: Mailbox,
    },
    /// RENAME command.
    Rename {
        /// Current mailbox name.
        from: Mailbox,
        /// New mailbox name.
        to: Mailbox,
    },
    /// SUBSCRIBE command.
    Subscribe {
        /// Mailbox to subscribe.
        mailbox: Mailbox,
    },
    /// UNSUBSCRIBE command.
    Unsubscribe {
        /// Mailbox to unsubscribe.
        mailbox: Mailbox,
    },
    /// LIST command.
    List {
        /// Reference name.
        reference: String,
        /// Mailbox pattern.
        pattern: String,
    },
    /// LSUB command.
    Lsub {
        /// Reference name.
        reference: String,
        /// Mailbox pattern.
        pattern: String,
    },
    /// STATUS command.
    Status {
        /// Mailbox name.
        mailbox: Mailbox,
        /// Status items to request.
        items: Vec<StatusAttribute>,
    },
    /// APPEND command.
    Append {
        /// Target mailbox.
        mailbox: Mailbox,
        /// Flags to set on the new message.
        flags: Vec<Flag>,
        /// RFC 822 message bytes.
        message: Vec<u8>,
    },

    // Selected
    /// CHECK command.
    Check,
    /// CLOSE command.
    Close,
    /// EXPUNGE command.
    Expunge,
    /// SEARCH command.
    Search {
        /// `CHARSET` of the text arguments, such as `UTF-8`.
        charset: Option<String>,
        /// Criteria that must all match.
        criteria: Vec<SearchCriteria>,
    },
    /// FETCH command.
    Fetch {
        /// Messages to fetch.
        sequence: SequenceSet,
        /// Items to fetch.
        items: Vec<FetchAttribute>,
    },
    /// STORE command.
    Store {
        /// Messages to update.
        sequence: SequenceSet,
        /// Flag change.
        action: StoreAction,
        /// Suppress the untagged FETCH echo.
        silent: bool,
    },
    /// COPY command.
    Copy {
        /// Messages to copy.
        sequence: SequenceSet,
        /// Target mailbox.
        mailbox: Mailbox,
    },
}

impl Command {
    /// Returns the command name, as used in logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Noop => "NOOP",
            Self::Logout => "LOGOUT",
            Self::StartTls => "STARTTLS",
            Self::Login { .. } => "LOGIN",
            Self::Select { .. } => "SELECT",
            Self::Examine { .. } => "EXAMINE",
            Self::Create { .. } => "CREATE",
            Self::Delete { .. } => "DELETE",
            Self::Rename { .. } => "RENAME",
            Self::Subscribe { .. } => "SUBSCRIBE",
            Self::Unsubscribe { .. } => "UNSUBSCRIBE",
            Self::List { .. } => "LIST",
            Self::Lsub { .. } => "LSUB",
            Self::Status { .. } => "STATUS",
            Self::Append { .. } => "APPEND",
            Self::Check => "CHECK",
            Self::Close => "CLOSE",
            Self::Expunge => "EXPUNGE",
            Self::Search { .. } => "SEARCH",
            Self::Fetch { .. } => "FETCH",
            Self::Store { .. } => "STORE",
            Self::Copy { .. } => "COPY",
        }
    }

    /// Returns the complete wire form, literals included.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> Vec<u8> {
        self.encode(tag).concat()
    }

    /// Encodes the command as segments split after each literal
    /// announcement. The first segment is sent right away; each later one
    /// waits for a continuation request.
    #[must_use]
    pub fn encode(&self, tag: &str) -> Vec<Vec<u8>> {
        let mut wire = Wire::new(tag, self.name());
        let buf = wire.buf();

        match self {
            Self::Capability
            | Self::Noop
            | Self::Logout
            | Self::StartTls
            | Self::Check
            | Self::Close
            | Self::Expunge => {}

            Self::Login { username, password } => {
                buf.push(b' ');
                wire.astring(username);
                wire.buf().push(b' ');
                wire.astring(password);
            }

            Self::Select { mailbox }
            | Self::Examine { mailbox }
            | Self::Create { mailbox }
            | Self::Delete { mailbox }
            | Self::Subscribe { mailbox }
            | Self::Unsubscribe { mailbox } => {
                buf.push(b' ');
                write_mailbox(buf, mailbox);
            }

            Self::Rename { from, to } => {
                buf.push(b' ');
                write_mailbox(buf, from);
                buf.push(b' ');
                write_mailbox(buf, to);
            }

            Self::List { reference, pattern } | Self::Lsub { reference, pattern } => {
                buf.push(b' ');
                write_astring(buf, &mutf7::encode(reference));
                buf.push(b' ');
                write_astring(buf, &mutf7::encode(pattern));
            }

            Self::Status { mailbox, items } => {
                buf.push(b' ');
                write_mailbox(buf, mailbox);
                buf.extend_from_slice(b" (");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        buf.push(b' ');
                    }
                    buf.extend_from_slice(item.as_str().as_bytes());
                }
                buf.push(b')');
            }

            Self::Append {
                mailbox,
                flags,
                message,
            } => {
                buf.push(b' ');
                write_mailbox(buf, mailbox);
                if !flags.is_empty() {
                    buf.push(b' ');
                    write_flag_list(buf, flags);
                }
                buf.push(b' ');
                wire.literal(message);
            }

            Self::Search { charset, criteria } => {
                if let Some(charset) = charset {
                    buf.extend_from_slice(b" CHARSET ");
                    write_astring(buf, charset);
                }
                for c in criteria {
                    wire.buf().push(b' ');
                    write_search_criteria(&mut wire, c);
                }
            }

            Self::Fetch { sequence, items } => {
                buf.push(b' ');
                buf.extend_from_slice(sequence.to_string().as_bytes());
                buf.push(b' ');
                write_fetch_items(buf, items);
            }

            Self::Store {
                sequence,
                action,
                silent,
            } => {
                buf.push(b' ');
                buf.extend_from_slice(sequence.to_string().as_bytes());
                buf.push(b' ');
                write_store_action(buf, action, *silent);
            }

            Self::Copy { sequence, mailbox } => {
                buf.push(b' ');
                buf.extend_from_slice(sequence.to_string().as_bytes());
                buf.push(b' ');
                write_mailbox(buf, mailbox);
            }
        }

        wire.finish()
    }

    /// Returns the command line for logging, with credentials masked and
    /// without the trailing CRLF.
    #[must_use]
    pub fn log_line(&self, tag: &str) -> String {
        if let Self::Login { username, .. } = self {
            if needs_literal(username) {
                return format!("{tag} LOGIN {{{}}} ****", username.len());
            }
            let mut buf = Vec::new();
            write_astring(&mut buf, username);
            return format!("{tag} LOGIN {} ****", String::from_utf8_lossy(&buf));
        }
        let line = self.encode(tag).into_iter().next().unwrap_or_default();
        String::from_utf8_lossy(&line)
            .trim_end_matches(['\r', '\n'])
            .to_string()
    }
}
