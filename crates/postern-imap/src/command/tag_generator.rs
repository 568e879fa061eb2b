//! IMAP command tag generator.
//!
//! Tags pair each command with its tagged completion. A connection owns one
//! generator for its whole lifetime, so tags are never reused.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{Error, Result};
use crate::types::Tag;

/// Tag generator for IMAP commands.
///
/// Generates strictly increasing tags in the format `A0001`, `A0002`, and so
/// on. Counters past 9999 simply grow wider (`A10000`).
#[derive(Debug)]
pub struct TagGenerator {
    counter: AtomicU32,
    prefix: char,
}

impl TagGenerator {
    /// Creates a tag generator with the given prefix.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self {
            counter: AtomicU32::new(1),
            prefix,
        }
    }

    /// Generates the next tag.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` once the counter is exhausted; the
    /// connection has to be replaced at that point.
    pub fn next(&self) -> Result<Tag> {
        let n = self
            .counter
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_add(1))
            .map_err(|_| Error::Protocol("tag counter exhausted".to_string()))?;
        Ok(Tag(format!("{}{:04}", self.prefix, n)))
    }

    /// Returns the counter value the next tag will carry.
    #[must_use]
    pub fn peek(&self) -> u32 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('A')
    }
}
