//! IMAP response parser.
//!
//! Turns one framed response into a [`Response`]. Status responses (OK, NO,
//! BAD, PREAUTH, BYE) are split into an optional bracketed code and free
//! text. Every other untagged response keeps its data as a tree of
//! [`Value`]s so that callers can interpret FETCH, LIST, STATUS and so on
//! without the parser knowing each shape. Unknown keywords still parse.

#![allow(clippy::missing_errors_doc)]

mod code;
mod value;

pub use code::{ResponseCode, flags_from, render};
pub use value::Value;

use bytes::Bytes;

use crate::parser::lexer::{Lexer, Token};
use crate::types::Tag;
use crate::Result;

/// Maximum nesting depth of parenthesized lists.
const MAX_DEPTH: usize = 64;

/// Completion status of a tagged response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command succeeded.
    Ok,
    /// Command failed.
    No,
    /// Command was malformed or not valid in the current state.
    Bad,
}

impl Status {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::No => "NO",
            Self::Bad => "BAD",
        }
    }
}

/// Keyword of an untagged response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyword {
    /// `OK` status or notice.
    Ok,
    /// `NO` warning.
    No,
    /// `BAD` error.
    Bad,
    /// `PREAUTH` greeting.
    PreAuth,
    /// `BYE`: the server is closing the connection.
    Bye,
    /// `CAPABILITY` data.
    Capability,
    /// `FLAGS` data.
    Flags,
    /// `LIST` data.
    List,
    /// `LSUB` data.
    Lsub,
    /// `STATUS` data.
    Status,
    /// `SEARCH` data.
    Search,
    /// `n EXISTS`.
    Exists,
    /// `n RECENT`.
    Recent,
    /// `n EXPUNGE`.
    Expunge,
    /// `n FETCH (...)`.
    Fetch,
    /// Anything else, kept verbatim.
    Other(String),
}

impl Keyword {
    /// Parses a keyword atom, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "OK" => Self::Ok,
            "NO" => Self::No,
            "BAD" => Self::Bad,
            "PREAUTH" => Self::PreAuth,
            "BYE" => Self::Bye,
            "CAPABILITY" => Self::Capability,
            "FLAGS" => Self::Flags,
            "LIST" => Self::List,
            "LSUB" => Self::Lsub,
            "STATUS" => Self::Status,
            "SEARCH" => Self::Search,
            "EXISTS" => Self::Exists,
            "RECENT" => Self::Recent,
            "EXPUNGE" => Self::Expunge,
            "FETCH" => Self::Fetch,
            _ => Self::Other(s.to_string()),
        }
    }

    /// Returns true for keywords followed by resp-text.
    #[must_use]
    pub const fn is_status(&self) -> bool {
        matches!(
            self,
            Self::Ok | Self::No | Self::Bad | Self::PreAuth | Self::Bye
        )
    }
}

/// An untagged (`*`) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Untagged {
    /// Response keyword.
    pub keyword: Keyword,
    /// Count prefix, as in `* 4 EXISTS`.
    pub count: Option<u32>,
    /// Bracketed code contents for status responses; the data values for
    /// everything else.
    pub code: Vec<Value>,
    /// Human-readable text, for status responses and unparseable data.
    pub text: Option<String>,
}

impl Untagged {
    /// Returns the first literal payload carried by the response.
    #[must_use]
    pub fn literal(&self) -> Option<&Bytes> {
        self.code.iter().find_map(Value::find_literal)
    }

    /// Interprets the bracketed code of a status response.
    #[must_use]
    pub fn response_code(&self) -> Option<ResponseCode> {
        if self.keyword.is_status() {
            ResponseCode::from_values(&self.code)
        } else {
            None
        }
    }

    /// Returns the text, or an empty string.
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

/// A parsed IMAP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Tagged response (command completion).
    Tagged {
        /// The command tag.
        tag: Tag,
        /// Completion status.
        status: Status,
        /// Bracketed code contents.
        code: Vec<Value>,
        /// Human-readable text.
        text: String,
    },
    /// Untagged response (server data).
    Untagged(Untagged),
    /// Continuation request.
    Continuation {
        /// Text following `+`.
        text: String,
    },
}

/// Response parser.
pub struct ResponseParser;

impl ResponseParser {
    /// Parses one complete response (line plus literals).
    pub fn parse(input: &Bytes) -> Result<Response> {
        let mut lexer = Lexer::new(input);

        let prefix = match lexer.next_token()? {
            Token::Atom(prefix) => prefix,
            token => return Err(lexer.error(&format!("Expected *, + or tag, got {token:?}"))),
        };

        match prefix.as_ref() {
            "+" => {
                lexer.skip_space();
                Ok(Response::Continuation {
                    text: lexer.rest_of_line().into_owned(),
                })
            }
            "*" => Self::parse_untagged(&mut lexer, input).map(Response::Untagged),
            tag => {
                let tag = Tag::new(tag);
                Self::expect_space(&mut lexer)?;
                let status = match lexer.next_token()? {
                    Token::Atom(s) if s.eq_ignore_ascii_case("OK") => Status::Ok,
                    Token::Atom(s) if s.eq_ignore_ascii_case("NO") => Status::No,
                    Token::Atom(s) if s.eq_ignore_ascii_case("BAD") => Status::Bad,
                    token => {
                        return Err(lexer.error(&format!("Expected OK, NO or BAD, got {token:?}")));
                    }
                };
                let (code, text) = Self::parse_resp_text(&mut lexer, input);
                Ok(Response::Tagged {
                    tag,
                    status,
                    code,
                    text,
                })
            }
        }
    }

    fn parse_untagged(lexer: &mut Lexer<'_>, input: &Bytes) -> Result<Untagged> {
        Self::expect_space(lexer)?;
        let first = match lexer.next_token()? {
            Token::Atom(s) => s.into_owned(),
            token => return Err(lexer.error(&format!("Expected keyword, got {token:?}"))),
        };

        let (count, keyword) = if first.bytes().all(|b| b.is_ascii_digit()) {
            let count: u32 = first
                .parse()
                .map_err(|_| lexer.error("Message count out of range"))?;
            Self::expect_space(lexer)?;
            match lexer.next_token()? {
                Token::Atom(s) => (Some(count), Keyword::parse(&s)),
                token => return Err(lexer.error(&format!("Expected keyword, got {token:?}"))),
            }
        } else {
            (None, Keyword::parse(&first))
        };

        if keyword.is_status() {
            let (code, text) = Self::parse_resp_text(lexer, input);
            return Ok(Untagged {
                keyword,
                count,
                code,
                text: Some(text),
            });
        }

        let data_start = lexer.position();
        match Self::parse_values(lexer, input, Close::Line, 0) {
            Ok(code) => Ok(Untagged {
                keyword,
                count,
                code,
                text: None,
            }),
            Err(e) if matches!(keyword, Keyword::Other(_)) => {
                tracing::debug!(error = %e, "keeping unparseable untagged data as text");
                let mut raw = Lexer::new(&input[data_start..]);
                raw.skip_space();
                Ok(Untagged {
                    keyword,
                    count,
                    code: Vec::new(),
                    text: Some(raw.rest_of_line().into_owned()),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Parses `[SP] ["[" code "]" SP] text`. A code that does not tokenize
    /// is kept as a single atom.
    fn parse_resp_text(lexer: &mut Lexer<'_>, input: &Bytes) -> (Vec<Value>, String) {
        lexer.skip_space();
        let mut code = Vec::new();

        if lexer.peek() == Some(b'[') {
            let start = lexer.position();
            let _ = lexer.next_token();
            match Self::parse_values(lexer, input, Close::Bracket, 0) {
                Ok(values) => code = values,
                Err(_) => {
                    let body = &input[start + 1..];
                    let line_end = body
                        .iter()
                        .position(|&b| b == b'\r' || b == b'\n')
                        .unwrap_or(body.len());
                    let Some(close) = body[..line_end].iter().position(|&b| b == b']') else {
                        let inner = String::from_utf8_lossy(&body[..line_end]);
                        code.push(Value::Atom(inner.into_owned()));
                        return (code, String::new());
                    };
                    let inner = String::from_utf8_lossy(&body[..close]);
                    code.push(Value::Atom(inner.into_owned()));
                    let mut rest = Lexer::new(&body[close + 1..]);
                    rest.skip_space();
                    return (code, rest.rest_of_line().into_owned());
                }
            }
            lexer.skip_space();
        }

        (code, lexer.rest_of_line().into_owned())
    }

    fn parse_values(
        lexer: &mut Lexer<'_>,
        input: &Bytes,
        close: Close,
        depth: usize,
    ) -> Result<Vec<Value>> {
        if depth > MAX_DEPTH {
            return Err(lexer.error("Lists nested too deeply"));
        }
        let mut values = Vec::new();

        loop {
            match lexer.next_token()? {
                Token::Space => {}
                Token::Atom(s) => values.push(Value::Atom(s.into_owned())),
                Token::Quoted(s) => values.push(Value::Quoted(s)),
                Token::Literal(data) => values.push(Value::Literal(input.slice_ref(data))),
                Token::LParen => values.push(Value::List(Self::parse_values(
                    lexer,
                    input,
                    Close::Paren,
                    depth + 1,
                )?)),
                Token::LBracket => values.push(Value::List(Self::parse_values(
                    lexer,
                    input,
                    Close::Bracket,
                    depth + 1,
                )?)),
                Token::RParen if close == Close::Paren => return Ok(values),
                Token::RBracket if close == Close::Bracket => return Ok(values),
                Token::Crlf | Token::Eof if close == Close::Line => return Ok(values),
                token => return Err(lexer.error(&format!("Unexpected {token:?}"))),
            }
        }
    }

    fn expect_space(lexer: &mut Lexer<'_>) -> Result<()> {
        if lexer.skip_space() {
            Ok(())
        } else {
            Err(lexer.error("Expected space"))
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Close {
    Paren,
    Bracket,
    Line,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(input: &'static [u8]) -> Response {
        ResponseParser::parse(&Bytes::from_static(input)).unwrap()
    }

    fn untagged(input: &'static [u8]) -> Untagged {
        match parse(input) {
            Response::Untagged(u) => u,
            other => panic!("expected untagged, got {other:?}"),
        }
    }

    #[test]
    fn test_tagged_ok() {
        let Response::Tagged {
            tag,
            status,
            code,
            text,
        } = parse(b"A1 OK LOGIN completed\r\n")
        else {
            panic!("expected tagged");
        };
        assert_eq!(tag.as_str(), "A1");
        assert_eq!(status, Status::Ok);
        assert!(code.is_empty());
        assert_eq!(text, "LOGIN completed");
    }

    #[test]
    fn test_tagged_with_code() {
        let Response::Tagged { code, text, .. } =
            parse(b"A0003 OK [READ-WRITE] SELECT completed\r\n")
        else {
            panic!("expected tagged");
        };
        assert_eq!(
            ResponseCode::from_values(&code),
            Some(ResponseCode::ReadWrite)
        );
        assert_eq!(text, "SELECT completed");
    }

    #[test]
    fn test_exists_count_is_decimal() {
        let u = untagged(b"* 4 EXISTS\r\n");
        assert_eq!(u.keyword, Keyword::Exists);
        assert_eq!(u.count, Some(4));
        let u = untagged(b"* 19 RECENT\r\n");
        assert_eq!(u.count, Some(19));
    }

    #[test]
    fn test_untagged_ok_with_nested_code() {
        let u = untagged(b"* OK [PERMANENTFLAGS (\\Deleted \\Seen \\*)] Limited\r\n");
        assert_eq!(u.keyword, Keyword::Ok);
        assert_eq!(u.text(), "Limited");
        let Some(ResponseCode::PermanentFlags(flags)) = u.response_code() else {
            panic!("expected PERMANENTFLAGS");
        };
        assert_eq!(flags.len(), 3);
    }

    #[test]
    fn test_fetch_with_literal() {
        let u = untagged(b"* 1 FETCH (FLAGS (\\Seen) BODY[] {5}\r\nhello)\r\n");
        assert_eq!(u.keyword, Keyword::Fetch);
        assert_eq!(u.count, Some(1));
        assert_eq!(u.literal().map(|b| &b[..]), Some(&b"hello"[..]));
        let items = u.code[0].as_list().unwrap();
        assert_eq!(items[0], Value::Atom("FLAGS".into()));
        assert_eq!(items[2], Value::Atom("BODY[]".into()));
    }

    #[test]
    fn test_literal_may_contain_line_breaks_and_brackets() {
        let u = untagged(b"* 2 FETCH (BODY[HEADER] {8}\r\na)\r\n]b\r\n UID 9)\r\n");
        assert_eq!(u.literal().map(|b| &b[..]), Some(&b"a)\r\n]b\r\n"[..]));
        let items = u.code[0].as_list().unwrap();
        assert_eq!(items[3].as_number(), Some(9));
    }

    #[test]
    fn test_list_response() {
        let u = untagged(b"* LIST (\\Noselect) \"/\" \"Sent Items\"\r\n");
        assert_eq!(u.keyword, Keyword::List);
        assert_eq!(u.code.len(), 3);
        assert_eq!(u.code[1], Value::Quoted("/".into()));
        assert_eq!(u.code[2].as_str(), Some("Sent Items"));
    }

    #[test]
    fn test_continuation() {
        let Response::Continuation { text } = parse(b"+ Ready for literal data\r\n") else {
            panic!("expected continuation");
        };
        assert_eq!(text, "Ready for literal data");
        let Response::Continuation { text } = parse(b"+\r\n") else {
            panic!("expected continuation");
        };
        assert!(text.is_empty());
    }

    #[test]
    fn test_unknown_keyword_is_forward_compatible() {
        let u = untagged(b"* XWEIRD {stuff} ((\r\n");
        assert_eq!(u.keyword, Keyword::Other("XWEIRD".into()));
        assert_eq!(u.text(), "{stuff} ((");
        let u = untagged(b"* ID (\"name\" \"Dovecot\")\r\n");
        assert_eq!(u.keyword, Keyword::Other("ID".into()));
        assert_eq!(u.code.len(), 1);
    }

    #[test]
    fn test_malformed_code_kept_as_text() {
        let u = untagged(b"* OK [WEIRD {x] hello\r\n");
        assert_eq!(u.code, vec![Value::Atom("WEIRD {x".into())]);
        assert_eq!(u.text(), "hello");
    }

    #[test]
    fn test_malformed_code_with_invalid_utf8() {
        let u = untagged(b"* OK [{x \xff\xff\xff] still here\r\n");
        assert_eq!(u.code.len(), 1);
        assert!(u.code[0].as_str().unwrap().starts_with("{x "));
        assert_eq!(u.text(), "still here");

        let u = untagged(b"* OK [{x \xff\xff\r\n");
        assert_eq!(u.code.len(), 1);
        assert!(u.text().is_empty());
    }

    #[test]
    fn test_bad_status_is_rejected() {
        assert!(ResponseParser::parse(&Bytes::from_static(b"A1 MAYBE fine\r\n")).is_err());
        assert!(ResponseParser::parse(&Bytes::from_static(b"* 1 FETCH (BODY[] {x}\r\n")).is_err());
    }
}
