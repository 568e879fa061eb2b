//! IMAP modified UTF-7 (RFC 3501 §5.1.3) for mailbox names.
//!
//! Printable US-ASCII stands for itself except `&`, which is written `&-`.
//! Any other run of characters is UTF-16BE, base64-encoded with `,` in place
//! of `/` and no padding, between `&` and `-`.

use base64::Engine;
use base64::alphabet;
use base64::engine::{GeneralPurpose, general_purpose};

use crate::error::{Error, Result};

const MUTF7: GeneralPurpose = GeneralPurpose::new(&alphabet::IMAP_MUTF7, general_purpose::NO_PAD);

const fn is_direct(c: char) -> bool {
    matches!(c, '\x20'..='\x7e')
}

/// Encodes a mailbox name for the wire.
#[must_use]
pub fn encode(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut shifted: Vec<u16> = Vec::new();

    for c in name.chars() {
        if is_direct(c) {
            flush(&mut out, &mut shifted);
            if c == '&' {
                out.push_str("&-");
            } else {
                out.push(c);
            }
        } else {
            let mut units = [0u16; 2];
            shifted.extend_from_slice(c.encode_utf16(&mut units));
        }
    }
    flush(&mut out, &mut shifted);
    out
}

fn flush(out: &mut String, shifted: &mut Vec<u16>) {
    if shifted.is_empty() {
        return;
    }
    let bytes: Vec<u8> = shifted.iter().flat_map(|u| u.to_be_bytes()).collect();
    out.push('&');
    out.push_str(&MUTF7.encode(bytes));
    out.push('-');
    shifted.clear();
}

/// Decodes a mailbox name received from the server.
///
/// # Errors
///
/// Returns `Error::Parse` for an unterminated shift sequence, invalid base64,
/// or a sequence that is not valid UTF-16.
pub fn decode(name: &str) -> Result<String> {
    let mut out = String::with_capacity(name.len());
    let mut rest = name;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let Some(dash) = after.find('-') else {
            return Err(invalid(name.len() - after.len(), "unterminated shift sequence"));
        };
        if dash == 0 {
            out.push('&');
        } else {
            let position = name.len() - after.len();
            let bytes = MUTF7
                .decode(&after[..dash])
                .map_err(|e| invalid(position, &e.to_string()))?;
            if bytes.len() % 2 != 0 {
                return Err(invalid(position, "odd number of UTF-16 bytes"));
            }
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            let decoded =
                String::from_utf16(&units).map_err(|e| invalid(position, &e.to_string()))?;
            out.push_str(&decoded);
        }
        rest = &after[dash + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn invalid(position: usize, message: &str) -> Error {
    Error::Parse {
        position,
        message: format!("invalid modified UTF-7: {message}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn ascii_passes_through() {
        assert_eq!(encode("INBOX/Sent Items"), "INBOX/Sent Items");
        assert_eq!(decode("INBOX/Sent Items").unwrap(), "INBOX/Sent Items");
    }

    #[test]
    fn ampersand_is_escaped() {
        assert_eq!(encode("Tom & Jerry"), "Tom &- Jerry");
        assert_eq!(decode("Tom &- Jerry").unwrap(), "Tom & Jerry");
    }

    #[test]
    fn rfc3501_example() {
        let name = "~peter/mail/\u{53f0}\u{5317}/\u{65e5}\u{672c}\u{8a9e}";
        let wire = "~peter/mail/&U,BTFw-/&ZeVnLIqe-";
        assert_eq!(encode(name), wire);
        assert_eq!(decode(wire).unwrap(), name);
    }

    #[test]
    fn accented_latin() {
        assert_eq!(encode("Entw\u{fc}rfe"), "Entw&APw-rfe");
        assert_eq!(decode("Entw&APw-rfe").unwrap(), "Entw\u{fc}rfe");
    }

    #[test]
    fn unterminated_shift_is_an_error() {
        assert!(decode("Entw&APw").is_err());
        assert!(decode("&Jjo!-").is_err());
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(name in "\\PC{0,24}") {
            prop_assert_eq!(decode(&encode(&name)).unwrap(), name);
        }
    }
}
