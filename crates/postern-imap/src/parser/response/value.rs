//! Structured values of a response's data section.

use bytes::Bytes;

/// One element of a response's data, possibly a nested list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Bare atom or number, including `NIL`.
    Atom(String),
    /// Quoted string, unescaped.
    Quoted(String),
    /// Literal payload, exactly as many bytes as announced.
    Literal(Bytes),
    /// Parenthesized or bracketed list.
    List(Vec<Value>),
}

impl Value {
    /// Returns the text of an atom or quoted string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Atom(s) | Self::Quoted(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the raw bytes of a string-like value.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Atom(s) | Self::Quoted(s) => Some(s.as_bytes()),
            Self::Literal(b) => Some(b),
            Self::List(_) => None,
        }
    }

    /// Returns the payload of a string-like value as `Bytes`.
    #[must_use]
    pub fn to_bytes(&self) -> Option<Bytes> {
        match self {
            Self::Literal(b) => Some(b.clone()),
            Self::Quoted(s) => Some(Bytes::copy_from_slice(s.as_bytes())),
            Self::Atom(s) if !s.eq_ignore_ascii_case("NIL") => {
                Some(Bytes::copy_from_slice(s.as_bytes()))
            }
            _ => None,
        }
    }

    /// Returns the items of a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Parses an atom as a decimal number.
    #[must_use]
    pub fn as_number(&self) -> Option<u32> {
        match self {
            Self::Atom(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Returns true for the atom `NIL`.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Atom(s) if s.eq_ignore_ascii_case("NIL"))
    }

    /// Returns the first literal in this value, searching lists depth-first.
    #[must_use]
    pub fn find_literal(&self) -> Option<&Bytes> {
        match self {
            Self::Literal(b) => Some(b),
            Self::List(items) => items.iter().find_map(Self::find_literal),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Atom(s) => f.write_str(s),
            Self::Quoted(s) => write!(f, "{s:?}"),
            Self::Literal(b) => write!(f, "{{{}}}", b.len()),
            Self::List(items) => {
                f.write_str("(")?;
                write_joined(f, items)?;
                f.write_str(")")
            }
        }
    }
}

/// Writes values separated by single spaces.
pub(crate) fn write_joined(f: &mut std::fmt::Formatter<'_>, items: &[Value]) -> std::fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        let v = Value::Atom("42".into());
        assert_eq!(v.as_number(), Some(42));
        assert_eq!(v.as_str(), Some("42"));
        assert!(Value::Atom("nil".into()).is_nil());
        assert!(!Value::Quoted("NIL".into()).is_nil());
        assert_eq!(Value::Atom("NIL".into()).to_bytes(), None);
    }

    #[test]
    fn finds_nested_literal() {
        let v = Value::List(vec![
            Value::Atom("UID".into()),
            Value::List(vec![Value::Literal(Bytes::from_static(b"abc"))]),
        ]);
        assert_eq!(v.find_literal().map(|b| &b[..]), Some(&b"abc"[..]));
    }

    #[test]
    fn display() {
        let v = Value::List(vec![
            Value::Atom("FLAGS".into()),
            Value::List(vec![Value::Atom("\\Seen".into())]),
            Value::Literal(Bytes::from_static(b"hello")),
        ]);
        assert_eq!(v.to_string(), "(FLAGS (\\Seen) {5})");
    }
}
