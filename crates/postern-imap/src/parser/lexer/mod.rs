//! IMAP lexer for tokenizing server responses.
//!
//! Works over one complete response as delivered by the framed reader: the
//! response line plus every literal it announces.

#![allow(clippy::missing_errors_doc)]

mod token;

pub use token::Token;

use std::borrow::Cow;

use crate::{Error, Result};

/// IMAP lexer state.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Returns the current position in the input.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Peeks at the current byte without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Reads the next token.
    pub fn next_token(&mut self) -> Result<Token<'a>> {
        let Some(byte) = self.peek() else {
            return Ok(Token::Eof);
        };

        match byte {
            b'\r' if self.peek_at(1) == Some(b'\n') => {
                self.pos += 2;
                Ok(Token::Crlf)
            }
            b'\n' => {
                self.pos += 1;
                Ok(Token::Crlf)
            }
            b' ' => {
                self.pos += 1;
                Ok(Token::Space)
            }
            b'(' => {
                self.pos += 1;
                Ok(Token::LParen)
            }
            b')' => {
                self.pos += 1;
                Ok(Token::RParen)
            }
            b'[' => {
                self.pos += 1;
                Ok(Token::LBracket)
            }
            b']' => {
                self.pos += 1;
                Ok(Token::RBracket)
            }
            b'"' => self.read_quoted(),
            b'{' => self.read_literal(),
            _ if is_atom_char(byte) => Ok(self.read_atom()),
            _ => Err(self.error(&format!("Unexpected character: {byte:#04x}"))),
        }
    }

    /// Reads a quoted string token.
    fn read_quoted(&mut self) -> Result<Token<'a>> {
        self.pos += 1;
        let mut result = Vec::new();

        loop {
            match self.advance() {
                Some(b'"') => break,
                Some(b'\\') => match self.advance() {
                    Some(c @ (b'"' | b'\\')) => result.push(c),
                    Some(c) => {
                        // Lenient: keep unknown escapes verbatim.
                        result.push(b'\\');
                        result.push(c);
                    }
                    None => return Err(self.error("Unexpected end of input in quoted string")),
                },
                Some(b'\r' | b'\n') | None => {
                    return Err(self.error("Unterminated quoted string"));
                }
                Some(c) => result.push(c),
            }
        }

        let s = String::from_utf8(result)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());
        Ok(Token::Quoted(s))
    }

    /// Reads `{n}\r\n` and then exactly n bytes.
    fn read_literal(&mut self) -> Result<Token<'a>> {
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|b| b != b'}') {
            self.pos += 1;
        }
        let digits = &self.input[start..self.pos];
        if self.advance() != Some(b'}') {
            return Err(self.error("Unterminated literal length"));
        }
        if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
            return Err(self.error(&format!(
                "Non-numeric literal length: {}",
                String::from_utf8_lossy(digits)
            )));
        }
        let size: usize = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| self.error("Literal length out of range"))?;

        match (self.advance(), self.peek()) {
            (Some(b'\r'), Some(b'\n')) => self.pos += 1,
            (Some(b'\n'), _) => {}
            _ => return Err(self.error("Expected CRLF after literal length")),
        }

        let end = self
            .pos
            .checked_add(size)
            .filter(|&end| end <= self.input.len())
            .ok_or_else(|| self.error("Literal shorter than its declared length"))?;
        let data = &self.input[self.pos..end];
        self.pos = end;
        Ok(Token::Literal(data))
    }

    /// Reads an atom. A `[` directly after atom characters starts a section
    /// that runs to the matching `]`, optionally followed by `<origin>`.
    fn read_atom(&mut self) -> Token<'a> {
        let start = self.pos;
        while self.peek().is_some_and(is_atom_char) {
            self.pos += 1;
        }

        if self.peek() == Some(b'[') {
            let mut depth = 0usize;
            while let Some(b) = self.peek() {
                if b == b'\r' || b == b'\n' {
                    break;
                }
                self.pos += 1;
                match b {
                    b'[' => depth += 1,
                    b']' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
            }
            if self.peek() == Some(b'<') {
                let partial_start = self.pos;
                self.pos += 1;
                while self.peek().is_some_and(|b| b.is_ascii_digit() || b == b'.') {
                    self.pos += 1;
                }
                if self.peek() == Some(b'>') {
                    self.pos += 1;
                } else {
                    self.pos = partial_start;
                }
            }
        }

        Token::Atom(String::from_utf8_lossy(&self.input[start..self.pos]))
    }

    /// Returns the rest of the current line (without the line ending) and
    /// consumes it together with the line ending.
    pub fn rest_of_line(&mut self) -> Cow<'a, str> {
        let start = self.pos;
        let mut end = start;
        while let Some(b) = self.input.get(end) {
            if *b == b'\n' {
                break;
            }
            end += 1;
        }
        self.pos = (end + 1).min(self.input.len());
        let line = &self.input[start..end];
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        String::from_utf8_lossy(line)
    }

    /// Consumes a single space if present.
    pub fn skip_space(&mut self) -> bool {
        if self.peek() == Some(b' ') {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Creates a parse error at the current position.
    pub fn error(&self, message: &str) -> Error {
        Error::Parse {
            position: self.pos,
            message: message.to_string(),
        }
    }
}

/// Returns true if the byte can appear in an atom.
///
/// Wider than RFC 3501 `ATOM-CHAR`: `\`, `*`, `%` and `+` are accepted so
/// that flags (`\*`), response prefixes and mailbox names lex as one token,
/// and 8-bit bytes are tolerated.
#[must_use]
pub const fn is_atom_char(b: u8) -> bool {
    !matches!(b, b'(' | b')' | b'{' | b' ' | b'"' | b'[' | b']') && b > 0x1F && b != 0x7F
}
