//! Per-message FETCH data.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::parser::response::flags_from;
use crate::parser::{Keyword, Untagged, Value};
use crate::types::Flags;

use super::FetchAddress;

/// The data items one untagged FETCH returned for one message.
///
/// Item names are kept upper-case; section items drop any `<origin>`
/// suffix, so `BODY[2]<0>` is stored as `BODY[2]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageStatus {
    seq: u32,
    items: BTreeMap<String, Value>,
}

impl MessageStatus {
    /// Creates a status with no items.
    #[must_use]
    pub fn new(seq: u32) -> Self {
        Self {
            seq,
            items: BTreeMap::new(),
        }
    }

    /// Builds the status from an untagged FETCH.
    ///
    /// Accepts both the parenthesized item list and the legacy bare form
    /// (`* 3 FETCH FLAGS (\Seen)`). Returns `None` for other responses.
    #[must_use]
    pub fn from_fetch(response: &Untagged) -> Option<Self> {
        if response.keyword != Keyword::Fetch {
            return None;
        }
        let seq = response.count?;
        let items = match response.code.as_slice() {
            [Value::List(items)] => items.as_slice(),
            bare => bare,
        };

        let mut status = Self::new(seq);
        let mut pairs = items.chunks_exact(2);
        for pair in pairs.by_ref() {
            if let Some(name) = pair[0].as_str() {
                status.items.insert(normalize_key(name), pair[1].clone());
            }
        }
        if !pairs.remainder().is_empty() {
            tracing::debug!(seq, "FETCH item without a value ignored");
        }
        Some(status)
    }

    /// Returns the message sequence number.
    #[must_use]
    pub const fn seq(&self) -> u32 {
        self.seq
    }

    /// Returns a raw item by name (`"UID"`, `"BODY[HEADER]"`, ...).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.items.get(&normalize_key(name))
    }

    /// Iterates items in name order.
    pub fn items(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns true if no items were returned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the message flags.
    #[must_use]
    pub fn flags(&self) -> Option<Flags> {
        self.items
            .get("FLAGS")
            .map(|list| flags_from(Some(list)))
    }

    /// Returns the UID.
    #[must_use]
    pub fn uid(&self) -> Option<u32> {
        self.items.get("UID").and_then(Value::as_number)
    }

    /// Returns the RFC 822 size in bytes.
    #[must_use]
    pub fn rfc822_size(&self) -> Option<u32> {
        self.items.get("RFC822.SIZE").and_then(Value::as_number)
    }

    /// Returns the internal date string as sent by the server.
    #[must_use]
    pub fn internal_date(&self) -> Option<&str> {
        self.items.get("INTERNALDATE").and_then(Value::as_str)
    }

    /// Returns the bytes of a fetched section. `NIL` yields `None`.
    #[must_use]
    pub fn body(&self, address: &FetchAddress) -> Option<Bytes> {
        self.items
            .get(&address.response_key())
            .and_then(Value::to_bytes)
    }

    /// Returns the header bytes (`BODY[HEADER]` or `RFC822.HEADER`).
    #[must_use]
    pub fn header(&self) -> Option<Bytes> {
        self.body(&FetchAddress::header()).or_else(|| {
            self.items
                .get("RFC822.HEADER")
                .and_then(Value::to_bytes)
        })
    }

    /// Returns the `BODYSTRUCTURE` list, unparsed.
    #[must_use]
    pub fn body_structure(&self) -> Option<&[Value]> {
        self.items
            .get("BODYSTRUCTURE")
            .or_else(|| self.items.get("BODY"))
            .and_then(Value::as_list)
    }

    /// Returns the `ENVELOPE` list, unparsed.
    #[must_use]
    pub fn envelope(&self) -> Option<&[Value]> {
        self.items.get("ENVELOPE").and_then(Value::as_list)
    }

    /// Adds items from another FETCH for the same message; later values win.
    pub fn merge(&mut self, other: Self) {
        self.items.extend(other.items);
    }
}

/// Upper-cases an item name and strips a trailing `<origin>`.
pub(crate) fn normalize_key(name: &str) -> String {
    let name = match name.rfind(']') {
        Some(close) if name[close + 1..].starts_with('<') => &name[..=close],
        _ => name,
    };
    name.to_ascii_uppercase()
}
