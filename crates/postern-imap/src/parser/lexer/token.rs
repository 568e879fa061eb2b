//! IMAP token types.

use std::borrow::Cow;

/// Token types produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Atom, including numbers, `NIL`, `*`, `+`, flags such as `\Seen`, and
    /// FETCH item names with an attached section such as `BODY[1.2]<0>`.
    Atom(Cow<'a, str>),
    /// Quoted string, unescaped.
    Quoted(String),
    /// Literal payload (`{n}\r\n` followed by n bytes).
    Literal(&'a [u8]),
    /// Opening parenthesis.
    LParen,
    /// Closing parenthesis.
    RParen,
    /// Opening bracket.
    LBracket,
    /// Closing bracket.
    RBracket,
    /// Space character.
    Space,
    /// Line ending.
    Crlf,
    /// End of input.
    Eof,
}
