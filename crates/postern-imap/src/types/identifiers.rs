//! Command tags.

/// IMAP command tag.
///
/// Every command carries a tag and its completion response echoes it. Tags
/// produced by [`TagGenerator`](crate::command::TagGenerator) are a fixed
/// prefix followed by a zero-padded decimal counter (`A0001`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(pub String);

impl Tag {
    /// Creates a tag from a string.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the trailing decimal counter of the tag, if any.
    #[must_use]
    pub fn counter(&self) -> Option<u64> {
        let digits_at = self
            .0
            .bytes()
            .rposition(|b| !b.is_ascii_digit())
            .map_or(0, |i| i + 1);
        self.0[digits_at..].parse().ok()
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Tag {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}
