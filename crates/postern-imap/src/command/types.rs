//! Command argument types.

use crate::fetch::FetchAddress;
use crate::types::{Flag, SequenceSet};

/// STATUS data items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusAttribute {
    /// Number of messages.
    Messages,
    /// Number of recent messages.
    Recent,
    /// Next UID.
    UidNext,
    /// UIDVALIDITY.
    UidValidity,
    /// Number of unseen messages.
    Unseen,
}

impl StatusAttribute {
    /// Every attribute RFC 3501 defines.
    pub const ALL: [Self; 5] = [
        Self::Messages,
        Self::Recent,
        Self::UidNext,
        Self::UidValidity,
        Self::Unseen,
    ];

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Messages => "MESSAGES",
            Self::Recent => "RECENT",
            Self::UidNext => "UIDNEXT",
            Self::UidValidity => "UIDVALIDITY",
            Self::Unseen => "UNSEEN",
        }
    }
}

/// A FETCH data item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// `FLAGS`
    Flags,
    /// `UID`
    Uid,
    /// `INTERNALDATE`
    InternalDate,
    /// `RFC822.SIZE`
    Rfc822Size,
    /// `ENVELOPE`
    Envelope,
    /// `BODYSTRUCTURE`
    BodyStructure,
    /// `BODY[...]` or, with `peek`, `BODY.PEEK[...]`.
    Section {
        /// Part and optional byte range.
        address: FetchAddress,
        /// Leave `\Seen` untouched.
        peek: bool,
    },
}

impl FetchAttribute {
    /// Fetches a body section without setting `\Seen`.
    #[must_use]
    pub const fn peek(address: FetchAddress) -> Self {
        Self::Section {
            address,
            peek: true,
        }
    }
}

/// How STORE changes the flag set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    /// `FLAGS`: replace.
    Replace(Vec<Flag>),
    /// `+FLAGS`: add.
    Add(Vec<Flag>),
    /// `-FLAGS`: remove.
    Remove(Vec<Flag>),
}

impl StoreAction {
    pub(super) fn item(&self) -> &'static str {
        match self {
            Self::Replace(_) => "FLAGS",
            Self::Add(_) => "+FLAGS",
            Self::Remove(_) => "-FLAGS",
        }
    }

    pub(super) fn flags(&self) -> &[Flag] {
        match self {
            Self::Replace(f) | Self::Add(f) | Self::Remove(f) => f,
        }
    }
}

/// SEARCH criteria (RFC 3501 §6.4.4).
///
/// Dates are `d-Mon-yyyy`, as in `1-Feb-1994`. Several criteria side by side
/// must all match; use [`SearchCriteria::And`] for that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    /// All messages.
    All,
    /// `\Answered` is set.
    Answered,
    /// `\Deleted` is set.
    Deleted,
    /// `\Draft` is set.
    Draft,
    /// `\Flagged` is set.
    Flagged,
    /// Recent and not seen.
    New,
    /// `\Seen` is set.
    Seen,
    /// `\Deleted` is not set.
    Undeleted,
    /// `\Seen` is not set.
    Unseen,
    /// Keyword flag is set.
    Keyword(String),
    /// Messages in a sequence set.
    Sequence(SequenceSet),
    /// Subject contains text.
    Subject(String),
    /// From contains text.
    From(String),
    /// To contains text.
    To(String),
    /// Body contains text.
    Body(String),
    /// Header or body contains text.
    Text(String),
    /// Header field contains a value.
    Header(String, String),
    /// Internal date on or after a date.
    Since(String),
    /// Internal date before a date.
    Before(String),
    /// Internal date within a day.
    On(String),
    /// Larger than a size in bytes.
    Larger(u32),
    /// Smaller than a size in bytes.
    Smaller(u32),
    /// Every criterion matches.
    And(Vec<Self>),
    /// Either criterion matches.
    Or(Box<Self>, Box<Self>),
    /// The criterion does not match.
    Not(Box<Self>),
}
