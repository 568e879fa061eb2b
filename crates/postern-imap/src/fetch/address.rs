//! Body section addresses and their wire encoding.

/// Which part of a message a section fetch selects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Part {
    /// The whole message (`BODY[]`).
    #[default]
    Whole,
    /// The top-level header (`BODY[HEADER]`).
    Header,
    /// A 1-based MIME part path. A trailing `0` selects that part's header.
    Path(Vec<u32>),
}

/// A part selector plus an optional byte range.
///
/// ```
/// use postern_imap::fetch::FetchAddress;
///
/// assert_eq!(FetchAddress::whole().to_string(), "BODY[]");
/// assert_eq!(FetchAddress::header().to_string(), "BODY[HEADER]");
/// assert_eq!(
///     FetchAddress::part(&[2]).with_range(10, 20).to_string(),
///     "BODY[2]<10.20>"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FetchAddress {
    /// Part selector.
    pub part: Part,
    /// `(offset, length)` in bytes.
    pub range: Option<(u32, u32)>,
}

impl FetchAddress {
    /// Addresses the whole message.
    #[must_use]
    pub const fn whole() -> Self {
        Self {
            part: Part::Whole,
            range: None,
        }
    }

    /// Addresses the message header.
    #[must_use]
    pub const fn header() -> Self {
        Self {
            part: Part::Header,
            range: None,
        }
    }

    /// Addresses a part by its path. `[]` is the whole message and `[0]`
    /// is the header.
    #[must_use]
    pub fn part(path: &[u32]) -> Self {
        let part = match path {
            [] => Part::Whole,
            [0] => Part::Header,
            _ => Part::Path(path.to_vec()),
        };
        Self { part, range: None }
    }

    /// Restricts the address to `length` bytes starting at `offset`.
    #[must_use]
    pub const fn with_range(mut self, offset: u32, length: u32) -> Self {
        self.range = Some((offset, length));
        self
    }

    /// Returns the section text between the brackets.
    #[must_use]
    pub fn section(&self) -> String {
        match &self.part {
            Part::Whole => String::new(),
            Part::Header => "HEADER".to_string(),
            Part::Path(path) => {
                let mut components: Vec<String> = path.iter().map(ToString::to_string).collect();
                if path.last() == Some(&0) {
                    components.pop();
                    components.push("HEADER".to_string());
                }
                components.join(".")
            }
        }
    }

    /// Returns `[section]` plus the `<offset.length>` suffix, if any.
    #[must_use]
    pub fn section_spec(&self) -> String {
        let mut spec = format!("[{}]", self.section());
        if let Some((offset, length)) = self.range {
            spec.push_str(&format!("<{offset}.{length}>"));
        }
        spec
    }

    /// Returns the item name the server uses for this section in FETCH
    /// responses, with any range origin stripped.
    #[must_use]
    pub fn response_key(&self) -> String {
        format!("BODY[{}]", self.section())
    }
}

impl std::fmt::Display for FetchAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BODY{}", self.section_spec())
    }
}
