//! Selected-mailbox state derived from untagged responses.
//!
//! Counters change only through [`MailboxState::apply`] (untagged data) and
//! [`MailboxState::apply_completion`] (the tagged SELECT/EXAMINE code), and
//! only between [`MailboxState::begin`] and [`MailboxState::reset`].
//! EXPUNGE renumbers every later message down by one; [`SequenceCache`]
//! applies that rule to caller-side maps keyed by sequence number.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use crate::parser::response::flags_from;
use crate::parser::{Keyword, ResponseCode, Untagged, Value};
use crate::types::{Flags, MailboxStatus};

/// A state change caused by one untagged response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailboxEvent {
    /// Message count changed. `added` holds the sequence numbers that became
    /// visible; it is empty when the count did not grow.
    Exists {
        /// New message count.
        count: u32,
        /// Newly visible sequence numbers.
        added: RangeInclusive<u32>,
    },
    /// Recent count changed.
    Recent(u32),
    /// Defined flags changed.
    Flags(Flags),
    /// A message was removed; later messages moved down by one.
    Expunged(u32),
    /// UIDVALIDITY differs from the value seen before; cached UIDs are stale.
    UidValidityChanged {
        /// Previous value.
        old: u32,
        /// Current value.
        new: u32,
    },
}

/// Counters and flags of the selected mailbox.
#[derive(Debug, Clone, Default)]
pub struct MailboxState {
    status: MailboxStatus,
    open: bool,
}

impl MailboxState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current counters.
    #[must_use]
    pub const fn status(&self) -> &MailboxStatus {
        &self.status
    }

    /// Forgets everything, as when no mailbox is selected. Untagged data is
    /// ignored until the next [`begin`](Self::begin).
    pub fn reset(&mut self) {
        self.status = MailboxStatus::default();
        self.open = false;
    }

    /// Starts tracking a mailbox that is being selected.
    pub fn begin(&mut self) {
        self.status = MailboxStatus::default();
        self.open = true;
    }

    /// Returns true while a mailbox is selected or being selected.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// Records the access mode when the completion carried no
    /// READ-WRITE or READ-ONLY code.
    pub(crate) fn set_read_write(&mut self, read_write: bool) {
        self.status.read_write = read_write;
    }

    /// Applies one untagged response. Does nothing when no mailbox is open.
    pub fn apply(&mut self, response: &Untagged) -> Option<MailboxEvent> {
        if !self.open {
            return None;
        }
        match (&response.keyword, response.count) {
            (Keyword::Exists, Some(count)) => {
                let before = self.status.exists;
                self.status.exists = count;
                Some(MailboxEvent::Exists {
                    count,
                    added: before.saturating_add(1)..=count,
                })
            }
            (Keyword::Recent, Some(count)) => {
                self.status.recent = count;
                Some(MailboxEvent::Recent(count))
            }
            (Keyword::Expunge, Some(seq)) => {
                self.status.exists = self.status.exists.saturating_sub(1);
                self.status.first_unseen = match self.status.first_unseen {
                    Some(u) if u > seq => Some(u - 1),
                    Some(u) if u == seq => None,
                    other => other,
                };
                Some(MailboxEvent::Expunged(seq))
            }
            (Keyword::Flags, _) => {
                let flags = flags_from(response.code.first());
                self.status.flags = flags.clone();
                Some(MailboxEvent::Flags(flags))
            }
            (Keyword::Ok, _) => self.apply_code(response.response_code()?),
            _ => None,
        }
    }

    /// Applies the code of a successful SELECT or EXAMINE completion.
    pub fn apply_completion(&mut self, code: &[Value]) -> Option<MailboxEvent> {
        self.apply_code(ResponseCode::from_values(code)?)
    }

    fn apply_code(&mut self, code: ResponseCode) -> Option<MailboxEvent> {
        match code {
            ResponseCode::Unseen(n) => self.status.first_unseen = Some(n),
            ResponseCode::UidNext(n) => self.status.uid_next = Some(n),
            ResponseCode::PermanentFlags(flags) => self.status.permanent_flags = flags,
            ResponseCode::ReadWrite => self.status.read_write = true,
            ResponseCode::ReadOnly => self.status.read_write = false,
            ResponseCode::UidValidity(new) => {
                let old = self.status.uid_validity.replace(new);
                if let Some(old) = old.filter(|&old| old != new) {
                    return Some(MailboxEvent::UidValidityChanged { old, new });
                }
            }
            _ => {}
        }
        None
    }
}

/// A caller-side map from sequence number to cached data that follows the
/// server's renumbering.
#[derive(Debug, Clone)]
pub struct SequenceCache<T> {
    entries: BTreeMap<u32, T>,
}

impl<T> Default for SequenceCache<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> SequenceCache<T> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Caches a value for a sequence number.
    pub fn insert(&mut self, seq: u32, value: T) -> Option<T> {
        self.entries.insert(seq, value)
    }

    /// Returns the value cached for a sequence number.
    #[must_use]
    pub fn get(&self, seq: u32) -> Option<&T> {
        self.entries.get(&seq)
    }

    /// Returns the number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes `seq` and moves every later entry down by one.
    pub fn expunge(&mut self, seq: u32) -> Option<T> {
        let later = self.entries.split_off(&seq.saturating_add(1));
        let removed = self.entries.remove(&seq);
        self.entries
            .extend(later.into_iter().map(|(n, value)| (n - 1, value)));
        removed
    }

    /// Drops entries beyond the given message count.
    pub fn truncate(&mut self, count: u32) {
        self.entries.retain(|&seq, _| seq <= count);
    }

    /// Drops everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Applies a mailbox event: renumbers on expunge, clears on a
    /// UIDVALIDITY change, truncates when the count shrinks.
    pub fn apply(&mut self, event: &MailboxEvent) {
        match event {
            MailboxEvent::Expunged(seq) => {
                self.expunge(*seq);
            }
            MailboxEvent::UidValidityChanged { .. } => self.clear(),
            MailboxEvent::Exists { count, .. } => self.truncate(*count),
            MailboxEvent::Recent(_) | MailboxEvent::Flags(_) => {}
        }
    }

    /// Iterates entries in sequence order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.entries.iter().map(|(n, v)| (*n, v))
    }
}
