//! Typed response codes (`[UIDNEXT 42]`, `[ALERT]`, ...).

use crate::types::{Capability, Flag, Flags};

use super::Value;

/// A response code carried in square brackets before resp-text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// Text must be shown to the user.
    Alert,
    /// Capability list.
    Capability(Vec<Capability>),
    /// Error parsing a message on the server.
    Parse,
    /// Flags the client can change permanently.
    PermanentFlags(Flags),
    /// Mailbox is selected read-only.
    ReadOnly,
    /// Mailbox is selected read-write.
    ReadWrite,
    /// Target mailbox does not exist but can be created.
    TryCreate,
    /// Predicted next UID.
    UidNext(u32),
    /// UIDVALIDITY of the mailbox.
    UidValidity(u32),
    /// First unseen message.
    Unseen(u32),
    /// Any other code, rendered back to text.
    Other(String),
}

impl ResponseCode {
    /// Interprets the contents of a `[...]` code.
    ///
    /// Returns `None` for an empty code.
    #[must_use]
    pub fn from_values(values: &[Value]) -> Option<Self> {
        let (name, args) = values.split_first()?;
        let Some(name) = name.as_str() else {
            return Some(Self::Other(render(values)));
        };
        let number = || args.first().and_then(Value::as_number);

        let code = match name.to_ascii_uppercase().as_str() {
            "ALERT" => Self::Alert,
            "PARSE" => Self::Parse,
            "READ-ONLY" => Self::ReadOnly,
            "READ-WRITE" => Self::ReadWrite,
            "TRYCREATE" => Self::TryCreate,
            "CAPABILITY" => Self::Capability(
                args.iter()
                    .filter_map(Value::as_str)
                    .map(Capability::parse)
                    .collect(),
            ),
            "PERMANENTFLAGS" => Self::PermanentFlags(flags_from(args.first())),
            "UIDNEXT" => number().map_or_else(|| Self::Other(render(values)), Self::UidNext),
            "UIDVALIDITY" => {
                number().map_or_else(|| Self::Other(render(values)), Self::UidValidity)
            }
            "UNSEEN" => number().map_or_else(|| Self::Other(render(values)), Self::Unseen),
            _ => Self::Other(render(values)),
        };
        Some(code)
    }
}

/// Builds a flag set from a parenthesized flag list.
#[must_use]
pub fn flags_from(list: Option<&Value>) -> Flags {
    list.and_then(Value::as_list)
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_str)
        .map(Flag::parse)
        .collect()
}

/// Renders code values back to their textual form, e.g. `UIDNEXT 42`.
#[must_use]
pub fn render(values: &[Value]) -> String {
    struct Joined<'a>(&'a [Value]);

    impl std::fmt::Display for Joined<'_> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            super::value::write_joined(f, self.0)
        }
    }

    Joined(values).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atoms(items: &[&str]) -> Vec<Value> {
        items.iter().map(|s| Value::Atom((*s).to_string())).collect()
    }

    #[test]
    fn numeric_codes() {
        assert_eq!(
            ResponseCode::from_values(&atoms(&["UIDVALIDITY", "3857529045"])),
            Some(ResponseCode::UidValidity(3_857_529_045))
        );
        assert_eq!(
            ResponseCode::from_values(&atoms(&["UNSEEN", "17"])),
            Some(ResponseCode::Unseen(17))
        );
    }

    #[test]
    fn permanent_flags() {
        let values = vec![
            Value::Atom("PERMANENTFLAGS".into()),
            Value::List(atoms(&["\\Deleted", "\\Seen", "\\*"])),
        ];
        let Some(ResponseCode::PermanentFlags(flags)) = ResponseCode::from_values(&values) else {
            panic!("expected PERMANENTFLAGS");
        };
        assert!(flags.contains(&Flag::MayCreate));
        assert_eq!(flags.len(), 3);
    }

    #[test]
    fn unknown_code_is_rendered() {
        assert_eq!(
            ResponseCode::from_values(&atoms(&["APPENDUID", "38505", "3955"])),
            Some(ResponseCode::Other("APPENDUID 38505 3955".to_string()))
        );
        assert_eq!(ResponseCode::from_values(&[]), None);
    }

    #[test]
    fn malformed_number_falls_back() {
        assert_eq!(
            ResponseCode::from_values(&atoms(&["UIDNEXT", "soon"])),
            Some(ResponseCode::Other("UIDNEXT soon".to_string()))
        );
    }
}
