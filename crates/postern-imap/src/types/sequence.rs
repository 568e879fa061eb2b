//! Sequence sets for message ranges.

/// A set of message sequence numbers as sent in FETCH, STORE, and COPY.
///
/// Sequence numbers are 1-based; constructors reject 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceSet {
    /// Single sequence number.
    Single(u32),
    /// Inclusive range.
    Range(u32, u32),
    /// From a sequence number to the last message (`n:*`).
    RangeFrom(u32),
    /// Every message (`1:*`).
    All,
    /// Comma-joined union of other sets.
    Set(Vec<Self>),
}

impl SequenceSet {
    /// Creates a set holding one sequence number.
    #[must_use]
    pub fn single(n: u32) -> Option<Self> {
        (n > 0).then_some(Self::Single(n))
    }

    /// Creates an inclusive range.
    #[must_use]
    pub fn range(start: u32, end: u32) -> Option<Self> {
        (start > 0 && end > 0).then_some(Self::Range(start, end))
    }

    /// Creates an open-ended range `start:*`.
    #[must_use]
    pub fn range_from(start: u32) -> Option<Self> {
        (start > 0).then_some(Self::RangeFrom(start))
    }

    /// Returns the set covering exactly `n`, if it is a single message.
    #[must_use]
    pub const fn as_single(&self) -> Option<u32> {
        match self {
            Self::Single(n) => Some(*n),
            _ => None,
        }
    }
}

impl std::fmt::Display for SequenceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(n) => write!(f, "{n}"),
            Self::Range(start, end) => write!(f, "{start}:{end}"),
            Self::RangeFrom(start) => write!(f, "{start}:*"),
            Self::All => write!(f, "1:*"),
            Self::Set(items) => {
                let s: Vec<_> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", s.join(","))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_rejected() {
        assert!(SequenceSet::single(0).is_none());
        assert!(SequenceSet::range(0, 4).is_none());
        assert!(SequenceSet::range(4, 0).is_none());
        assert!(SequenceSet::range_from(0).is_none());
    }

    #[test]
    fn display_forms() {
        assert_eq!(SequenceSet::range_from(7).unwrap().to_string(), "7:*");
        let set = SequenceSet::Set(vec![
            SequenceSet::single(1).unwrap(),
            SequenceSet::range(3, 5).unwrap(),
        ]);
        assert_eq!(set.to_string(), "1,3:5");
    }

    #[test]
    fn as_single() {
        assert_eq!(SequenceSet::single(9).unwrap().as_single(), Some(9));
        assert_eq!(SequenceSet::All.as_single(), None);
    }
}
