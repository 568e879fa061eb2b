//! Unsolicited response handler.
//!
//! IMAP servers may send EXISTS, EXPUNGE, FETCH, FLAGS, alerts and BYE at
//! any time, interleaved with the replies to whatever command is in flight.
//! The connection applies each one to its mailbox state first and then
//! reports it through a [`ResponseHandler`].
//!
//! # Example
//!
//! ```
//! use postern_imap::handler::ResponseHandler;
//!
//! struct AlertPrinter;
//!
//! impl ResponseHandler for AlertPrinter {
//!     fn on_alert(&mut self, text: &str) {
//!         eprintln!("server alert: {text}");
//!     }
//! }
//! ```

use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex, PoisonError};

use crate::fetch::MessageStatus;
use crate::types::Flags;

/// Receives unsolicited server events. Every method defaults to a no-op.
pub trait ResponseHandler: Send {
    /// Message count changed. `added` lists newly visible sequence numbers.
    fn on_exists(&mut self, count: u32, added: RangeInclusive<u32>) {
        let _ = (count, added);
    }

    /// Recent count changed.
    fn on_recent(&mut self, count: u32) {
        let _ = count;
    }

    /// A message was expunged. Later sequence numbers have moved down by one.
    fn on_expunge(&mut self, seq: u32) {
        let _ = seq;
    }

    /// The mailbox's defined flags changed.
    fn on_flags(&mut self, flags: &Flags) {
        let _ = flags;
    }

    /// FETCH data arrived, solicited or not (flag changes by other clients
    /// arrive this way).
    fn on_fetch(&mut self, message: &MessageStatus) {
        let _ = message;
    }

    /// An `[ALERT]` response code. The text must be shown to the user.
    fn on_alert(&mut self, text: &str) {
        let _ = text;
    }

    /// The server is closing the connection.
    fn on_bye(&mut self, text: &str) {
        let _ = text;
    }

    /// UIDVALIDITY changed; cached UIDs for the mailbox are invalid.
    fn on_uid_validity_changed(&mut self, old: u32, new: u32) {
        let _ = (old, new);
    }

    /// A CREATE, DELETE or RENAME on this connection succeeded, so any
    /// cached mailbox listing is stale.
    fn on_mailboxes_changed(&mut self) {}

    /// The connection is gone (BYE, transport or protocol failure, deadline
    /// expiry, or an abandoned literal stream).
    fn on_disconnect(&mut self, reason: &str) {
        let _ = reason;
    }
}

/// A handler that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl ResponseHandler for NoopHandler {}

/// A handler that logs events with `tracing`; the connection's default.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ResponseHandler for LoggingHandler {
    fn on_exists(&mut self, count: u32, _added: RangeInclusive<u32>) {
        tracing::debug!(count, "EXISTS");
    }

    fn on_recent(&mut self, count: u32) {
        tracing::debug!(count, "RECENT");
    }

    fn on_expunge(&mut self, seq: u32) {
        tracing::debug!(seq, "EXPUNGE");
    }

    fn on_flags(&mut self, flags: &Flags) {
        tracing::debug!(flags = %flags.to_list_string(), "FLAGS");
    }

    fn on_alert(&mut self, text: &str) {
        tracing::warn!(text, "ALERT");
    }

    fn on_bye(&mut self, text: &str) {
        tracing::info!(text, "BYE");
    }

    fn on_uid_validity_changed(&mut self, old: u32, new: u32) {
        tracing::info!(old, new, "UIDVALIDITY changed");
    }

    fn on_mailboxes_changed(&mut self) {
        tracing::debug!("mailbox hierarchy changed");
    }

    fn on_disconnect(&mut self, reason: &str) {
        tracing::info!(reason, "disconnected");
    }
}

/// An event recorded by [`CollectingHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsolicitedEvent {
    /// EXISTS with the newly visible range.
    Exists(u32, RangeInclusive<u32>),
    /// RECENT.
    Recent(u32),
    /// EXPUNGE.
    Expunge(u32),
    /// FLAGS.
    Flags(Flags),
    /// FETCH for a sequence number.
    Fetch(u32),
    /// `[ALERT]` text.
    Alert(String),
    /// BYE text.
    Bye(String),
    /// UIDVALIDITY change.
    UidValidityChanged(u32, u32),
    /// Connection lost.
    Disconnect(String),
}

/// A handler that records events in a shared list.
///
/// Clones share the list, so a test can keep one clone and hand the other
/// to a connection.
#[derive(Debug, Default, Clone)]
pub struct CollectingHandler {
    events: Arc<Mutex<Vec<UnsolicitedEvent>>>,
}

impl CollectingHandler {
    /// Creates a handler with an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes every event recorded so far.
    #[must_use]
    pub fn take(&self) -> Vec<UnsolicitedEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn push(&self, event: UnsolicitedEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl ResponseHandler for CollectingHandler {
    fn on_exists(&mut self, count: u32, added: RangeInclusive<u32>) {
        self.push(UnsolicitedEvent::Exists(count, added));
    }

    fn on_recent(&mut self, count: u32) {
        self.push(UnsolicitedEvent::Recent(count));
    }

    fn on_expunge(&mut self, seq: u32) {
        self.push(UnsolicitedEvent::Expunge(seq));
    }

    fn on_flags(&mut self, flags: &Flags) {
        self.push(UnsolicitedEvent::Flags(flags.clone()));
    }

    fn on_fetch(&mut self, message: &MessageStatus) {
        self.push(UnsolicitedEvent::Fetch(message.seq()));
    }

    fn on_alert(&mut self, text: &str) {
        self.push(UnsolicitedEvent::Alert(text.to_string()));
    }

    fn on_bye(&mut self, text: &str) {
        self.push(UnsolicitedEvent::Bye(text.to_string()));
    }

    fn on_uid_validity_changed(&mut self, old: u32, new: u32) {
        self.push(UnsolicitedEvent::UidValidityChanged(old, new));
    }

    fn on_disconnect(&mut self, reason: &str) {
        self.push(UnsolicitedEvent::Disconnect(reason.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_handler() {
        let mut handler = NoopHandler;
        handler.on_exists(100, 1..=100);
        handler.on_expunge(1);
        handler.on_bye("goodbye");
        handler.on_alert("important!");
    }

    #[test]
    fn test_collecting_handler_shares_events() {
        let handler = CollectingHandler::new();
        let mut boxed: Box<dyn ResponseHandler> = Box::new(handler.clone());

        boxed.on_exists(50, 49..=50);
        boxed.on_recent(5);
        boxed.on_alert("Test alert");

        assert_eq!(
            handler.take(),
            vec![
                UnsolicitedEvent::Exists(50, 49..=50),
                UnsolicitedEvent::Recent(5),
                UnsolicitedEvent::Alert("Test alert".to_string()),
            ]
        );
        assert!(handler.take().is_empty());
    }
}
