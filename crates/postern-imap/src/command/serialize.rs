//! Command serialization helpers.

use crate::mutf7;
use crate::types::{Flag, Mailbox};

use super::types::{FetchAttribute, SearchCriteria, StoreAction};

/// A command split at its literals.
///
/// Every segment but the last ends with a `{n}` announcement; the next one
/// starts with the literal bytes and may only be sent after the server's
/// continuation.
#[derive(Debug)]
pub struct Wire {
    segments: Vec<Vec<u8>>,
    current: Vec<u8>,
}

impl Wire {
    /// Starts a command line with its tag and name.
    pub fn new(tag: &str, name: &str) -> Self {
        let mut current = Vec::with_capacity(64);
        current.extend_from_slice(tag.as_bytes());
        current.push(b' ');
        current.extend_from_slice(name.as_bytes());
        Self {
            segments: Vec::new(),
            current,
        }
    }

    /// The segment being written.
    pub fn buf(&mut self) -> &mut Vec<u8> {
        &mut self.current
    }

    /// Writes an astring, as a literal when quoting cannot carry it.
    pub fn astring(&mut self, s: &str) {
        if needs_literal(s) {
            self.literal(s.as_bytes());
        } else {
            write_astring(&mut self.current, s);
        }
    }

    /// Announces `data` as a literal and starts the next segment with it.
    pub fn literal(&mut self, data: &[u8]) {
        self.current
            .extend_from_slice(format!("{{{}}}\r\n", data.len()).as_bytes());
        self.segments.push(std::mem::take(&mut self.current));
        self.current.extend_from_slice(data);
    }

    /// Terminates the command and returns its segments.
    pub fn finish(mut self) -> Vec<Vec<u8>> {
        self.current.extend_from_slice(b"\r\n");
        self.segments.push(self.current);
        self.segments
    }
}

/// Writes an astring: a bare atom when possible, a quoted string otherwise.
pub fn write_astring(buf: &mut Vec<u8>, s: &str) {
    if s.is_empty() || s.bytes().any(needs_quoting) {
        buf.push(b'"');
        for b in s.bytes() {
            if b == b'"' || b == b'\\' {
                buf.push(b'\\');
            }
            buf.push(b);
        }
        buf.push(b'"');
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

/// Returns true if `s` cannot travel as a quoted string. Quoted strings hold
/// 7-bit text without CR or LF.
pub fn needs_literal(s: &str) -> bool {
    s.bytes().any(|b| b == b'\r' || b == b'\n' || b >= 0x80)
}

/// Writes a mailbox name, encoded as modified UTF-7.
pub fn write_mailbox(buf: &mut Vec<u8>, mailbox: &Mailbox) {
    write_astring(buf, &mutf7::encode(mailbox.as_str()));
}

/// Returns true if the byte cannot appear in an atom.
const fn needs_quoting(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']'
    ) || b < 0x20
        || b >= 0x7F
}

/// Writes a parenthesized flag list.
pub fn write_flag_list(buf: &mut Vec<u8>, flags: &[Flag]) {
    buf.push(b'(');
    for (i, flag) in flags.iter().enumerate() {
        if i > 0 {
            buf.push(b' ');
        }
        buf.extend_from_slice(flag.as_str().as_bytes());
    }
    buf.push(b')');
}

/// Writes FETCH items, parenthesized when there is more than one.
pub fn write_fetch_items(buf: &mut Vec<u8>, items: &[FetchAttribute]) {
    if let [single] = items {
        write_fetch_attribute(buf, single);
        return;
    }
    buf.push(b'(');
    for (i, attr) in items.iter().enumerate() {
        if i > 0 {
            buf.push(b' ');
        }
        write_fetch_attribute(buf, attr);
    }
    buf.push(b')');
}

/// Writes a single FETCH attribute.
pub fn write_fetch_attribute(buf: &mut Vec<u8>, attr: &FetchAttribute) {
    match attr {
        FetchAttribute::Flags => buf.extend_from_slice(b"FLAGS"),
        FetchAttribute::Uid => buf.extend_from_slice(b"UID"),
        FetchAttribute::InternalDate => buf.extend_from_slice(b"INTERNALDATE"),
        FetchAttribute::Rfc822Size => buf.extend_from_slice(b"RFC822.SIZE"),
        FetchAttribute::Envelope => buf.extend_from_slice(b"ENVELOPE"),
        FetchAttribute::BodyStructure => buf.extend_from_slice(b"BODYSTRUCTURE"),
        FetchAttribute::Section { address, peek } => {
            if *peek {
                buf.extend_from_slice(b"BODY.PEEK");
                buf.extend_from_slice(address.section_spec().as_bytes());
            } else {
                buf.extend_from_slice(address.to_string().as_bytes());
            }
        }
    }
}

/// Writes a STORE data item and its flag list.
pub fn write_store_action(buf: &mut Vec<u8>, action: &StoreAction, silent: bool) {
    buf.extend_from_slice(action.item().as_bytes());
    if silent {
        buf.extend_from_slice(b".SILENT");
    }
    buf.push(b' ');
    write_flag_list(buf, action.flags());
}

/// Writes SEARCH criteria. Text arguments may become literals.
pub fn write_search_criteria(wire: &mut Wire, criteria: &SearchCriteria) {
    let (name, text) = match criteria {
        SearchCriteria::All => ("ALL", None),
        SearchCriteria::Answered => ("ANSWERED", None),
        SearchCriteria::Deleted => ("DELETED", None),
        SearchCriteria::Draft => ("DRAFT", None),
        SearchCriteria::Flagged => ("FLAGGED", None),
        SearchCriteria::New => ("NEW", None),
        SearchCriteria::Seen => ("SEEN", None),
        SearchCriteria::Undeleted => ("UNDELETED", None),
        SearchCriteria::Unseen => ("UNSEEN", None),
        SearchCriteria::Keyword(s) => ("KEYWORD", Some(s)),
        SearchCriteria::Subject(s) => ("SUBJECT", Some(s)),
        SearchCriteria::From(s) => ("FROM", Some(s)),
        SearchCriteria::To(s) => ("TO", Some(s)),
        SearchCriteria::Body(s) => ("BODY", Some(s)),
        SearchCriteria::Text(s) => ("TEXT", Some(s)),
        SearchCriteria::Since(date) => ("SINCE", Some(date)),
        SearchCriteria::Before(date) => ("BEFORE", Some(date)),
        SearchCriteria::On(date) => ("ON", Some(date)),
        SearchCriteria::Sequence(set) => {
            wire.buf().extend_from_slice(set.to_string().as_bytes());
            return;
        }
        SearchCriteria::Larger(size) => {
            wire.buf().extend_from_slice(format!("LARGER {size}").as_bytes());
            return;
        }
        SearchCriteria::Smaller(size) => {
            wire.buf().extend_from_slice(format!("SMALLER {size}").as_bytes());
            return;
        }
        SearchCriteria::Header(field, value) => {
            wire.buf().extend_from_slice(b"HEADER ");
            wire.astring(field);
            wire.buf().push(b' ');
            wire.astring(value);
            return;
        }
        SearchCriteria::And(all) => {
            wire.buf().push(b'(');
            for (i, c) in all.iter().enumerate() {
                if i > 0 {
                    wire.buf().push(b' ');
                }
                write_search_criteria(wire, c);
            }
            wire.buf().push(b')');
            return;
        }
        SearchCriteria::Or(a, b) => {
            wire.buf().extend_from_slice(b"OR ");
            write_search_criteria(wire, a);
            wire.buf().push(b' ');
            write_search_criteria(wire, b);
            return;
        }
        SearchCriteria::Not(c) => {
            wire.buf().extend_from_slice(b"NOT ");
            write_search_criteria(wire, c);
            return;
        }
    };
    wire.buf().extend_from_slice(name.as_bytes());
    if let Some(text) = text {
        wire.buf().push(b' ');
        wire.astring(text);
    }
}
