//! Mailbox types.

use super::Flags;

/// Mailbox name, held decoded (UTF-8).
///
/// Conversion to and from modified UTF-7 happens at the wire boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mailbox(pub String);

impl Mailbox {
    /// Creates a mailbox name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The INBOX mailbox.
    #[must_use]
    pub fn inbox() -> Self {
        Self("INBOX".to_string())
    }

    /// Returns the mailbox name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this names INBOX, which is case-insensitive.
    #[must_use]
    pub fn is_inbox(&self) -> bool {
        self.0.eq_ignore_ascii_case("INBOX")
    }

    /// Compares two names the way the server does (INBOX case-insensitive).
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        (self.is_inbox() && other.is_inbox()) || self.0 == other.0
    }
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Mailbox {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Mailbox counters and flags.
///
/// Filled from SELECT/EXAMINE (and kept current while selected) or, as a
/// subset, from STATUS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailboxStatus {
    /// Number of messages in the mailbox.
    pub exists: u32,
    /// Number of recent messages.
    pub recent: u32,
    /// Sequence number of the first unseen message (`[UNSEEN n]`).
    pub first_unseen: Option<u32>,
    /// Number of unseen messages (STATUS `UNSEEN`).
    pub unseen: Option<u32>,
    /// UIDVALIDITY value.
    pub uid_validity: Option<u32>,
    /// Next UID to be assigned.
    pub uid_next: Option<u32>,
    /// Flags defined for this mailbox.
    pub flags: Flags,
    /// Flags that can be stored permanently.
    pub permanent_flags: Flags,
    /// True when selected with write access (`[READ-WRITE]`).
    pub read_write: bool,
}

/// One LIST or LSUB entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    /// Mailbox attributes.
    pub attributes: Vec<MailboxAttribute>,
    /// Hierarchy delimiter; `None` for a flat namespace (`NIL`).
    pub delimiter: Option<char>,
    /// Decoded mailbox name.
    pub mailbox: Mailbox,
}

impl ListEntry {
    /// Returns true if the mailbox can be selected.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        !self.attributes.contains(&MailboxAttribute::NoSelect)
    }
}

/// Mailbox attributes from RFC 3501 LIST responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MailboxAttribute {
    /// Child mailboxes cannot exist.
    NoInferiors,
    /// Mailbox cannot be selected.
    NoSelect,
    /// Mailbox is marked as interesting.
    Marked,
    /// Mailbox has no new messages.
    Unmarked,
    /// Attribute from an extension, kept verbatim.
    Other(String),
}

impl MailboxAttribute {
    /// Parses a mailbox attribute atom.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "\\NOINFERIORS" => Self::NoInferiors,
            "\\NOSELECT" => Self::NoSelect,
            "\\MARKED" => Self::Marked,
            "\\UNMARKED" => Self::Unmarked,
            _ => Self::Other(s.to_string()),
        }
    }
}
