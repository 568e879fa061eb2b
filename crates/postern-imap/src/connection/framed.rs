//! Framed I/O for IMAP protocol.
//!
//! IMAP uses CRLF-terminated lines with embedded literals (`{n}\r\n` followed
//! by exactly n bytes). A response is complete once a line ends without a
//! literal announcement. Reading can also stop right after an announcement
//! so the literal itself can be streamed to a caller.

#![allow(clippy::missing_errors_doc)]

use std::io;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{Error, Result};

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum line length to prevent memory exhaustion.
pub const MAX_LINE_LENGTH: usize = 1024 * 1024; // 1 MiB

/// Maximum literal size to prevent memory exhaustion.
pub const MAX_LITERAL_SIZE: usize = 100 * 1024 * 1024; // 100 MiB

/// Framed connection for IMAP protocol.
///
/// Handles line-based reading with literal support and buffered writing.
pub struct FramedStream<S> {
    reader: BufReader<S>,
    write_buffer: BytesMut,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new framed stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            write_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
        }
    }

    /// Reads a complete response including every embedded literal.
    ///
    /// Returns `None` when the server closed the connection cleanly between
    /// responses.
    pub async fn read_response(&mut self) -> Result<Option<Bytes>> {
        let Some((head, literal)) = self.read_head().await? else {
            return Ok(None);
        };
        match literal {
            Some(len) => self.read_rest(head, len).await.map(Some),
            None => Ok(Some(head.freeze())),
        }
    }

    /// Reads the first line of a response.
    ///
    /// If it ends with a literal announcement, the announced length is
    /// returned and the literal bytes are left unread.
    pub async fn read_head(&mut self) -> Result<Option<(BytesMut, Option<usize>)>> {
        let mut head = BytesMut::new();
        if !self.read_line(&mut head).await? {
            return Ok(None);
        }
        let literal = literal_length(&head)?;
        Ok(Some((head, literal)))
    }

    /// Completes a response whose head announced a literal of `len` bytes:
    /// reads the literal, the line after it, and any further literals.
    pub async fn read_rest(&mut self, mut response: BytesMut, mut len: usize) -> Result<Bytes> {
        loop {
            let start = response.len();
            response.resize(start + len, 0);
            self.reader.read_exact(&mut response[start..]).await?;
            tracing::trace!(bytes = len, "read literal");

            if !self.read_line(&mut response).await? {
                return Err(unexpected_eof());
            }
            match literal_length(&response)? {
                Some(next) => len = next,
                None => return Ok(response.freeze()),
            }
        }
    }

    /// Reads up to `buf.len()` literal bytes directly from the stream.
    ///
    /// End of stream is an error: a literal's declared length must be
    /// delivered in full.
    pub async fn read_some(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = self.reader.read(buf).await?;
        if n == 0 {
            return Err(unexpected_eof());
        }
        Ok(n)
    }

    /// Appends one LF-terminated line to `out`.
    ///
    /// Returns `false` on a clean end of stream before any byte of the line.
    async fn read_line(&mut self, out: &mut BytesMut) -> Result<bool> {
        let start = out.len();
        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                if out.len() == start {
                    return Ok(false);
                }
                return Err(unexpected_eof());
            }

            if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                out.extend_from_slice(&buf[..=pos]);
                self.reader.consume(pos + 1);
                return Ok(true);
            }

            let len = buf.len();
            out.extend_from_slice(buf);
            self.reader.consume(len);

            if out.len() - start > MAX_LINE_LENGTH {
                return Err(Error::Protocol("line too long".to_string()));
            }
        }
    }

    /// Writes a command line to the stream.
    pub async fn write_command(&mut self, data: &[u8]) -> Result<()> {
        self.write_buffer.clear();
        self.write_buffer.extend_from_slice(data);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buffer).await?;
        stream.flush().await?;

        Ok(())
    }

    /// Writes raw data to the stream (for literals).
    pub async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(data).await?;
        stream.flush().await?;

        Ok(())
    }

    /// Shuts down the write half of the stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.reader.get_mut().shutdown().await?;
        Ok(())
    }

    /// Returns true if bytes the server sent are still buffered unread.
    #[must_use]
    pub fn has_buffered(&self) -> bool {
        !self.reader.buffer().is_empty()
    }

    /// Consumes the framed stream and returns the inner stream.
    ///
    /// Buffered but unread data is lost.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }
}

fn unexpected_eof() -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "connection closed mid-response",
    ))
}

/// Returns the literal length announced at the end of a response line.
///
/// Matches a trailing `{123}` before the line ending. A brace group holding
/// anything other than digits is not an announcement; the parser reports it.
fn literal_length(line: &[u8]) -> Result<Option<usize>> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let Some(inner) = line.strip_suffix(b"}") else {
        return Ok(None);
    };
    let Some(open) = inner.iter().rposition(|&b| b == b'{') else {
        return Ok(None);
    };
    let digits = &inner[open + 1..];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Ok(None);
    }

    let len = std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(usize::MAX);
    if len > MAX_LITERAL_SIZE {
        return Err(Error::Protocol(format!(
            "literal too large: {len} bytes (max {MAX_LITERAL_SIZE})"
        )));
    }
    Ok(Some(len))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[test]
    fn test_literal_length() {
        assert_eq!(literal_length(b"BODY {123}\r\n").unwrap(), Some(123));
        assert_eq!(literal_length(b"{0}\r\n").unwrap(), Some(0));
        assert_eq!(literal_length(b"{999999}\n").unwrap(), Some(999_999));
        assert_eq!(literal_length(b"no literal\r\n").unwrap(), None);
        assert_eq!(literal_length(b"wrong {abc}\r\n").unwrap(), None);
        assert_eq!(literal_length(b"{} \r\n").unwrap(), None);
        assert!(literal_length(b"{104857601}\r\n").is_err());
    }

    #[tokio::test]
    async fn test_read_simple_line() {
        let mock = Builder::new().read(b"* OK ready\r\n").build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap().unwrap();
        assert_eq!(&response[..], b"* OK ready\r\n");
        assert!(framed.read_response().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_with_literal() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY[] {5}\r\n")
            .read(b"hel")
            .read(b"lo)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap().unwrap();
        assert_eq!(&response[..], b"* 1 FETCH (BODY[] {5}\r\nhello)\r\n");
    }

    #[tokio::test]
    async fn test_literal_containing_crlf_and_second_literal() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY[1] {4}\r\n{2}\n BODY[2] {3}\r\nab\n)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap().unwrap();
        assert_eq!(
            &response[..],
            b"* 1 FETCH (BODY[1] {4}\r\n{2}\n BODY[2] {3}\r\nab\n)\r\n"
        );
    }

    #[tokio::test]
    async fn test_line_split_across_reads() {
        let mock = Builder::new().read(b"A0001 OK do").read(b"ne\r").read(b"\n").build();
        let mut framed = FramedStream::new(mock);
        let response = framed.read_response().await.unwrap().unwrap();
        assert_eq!(&response[..], b"A0001 OK done\r\n");
    }

    #[tokio::test]
    async fn test_eof_mid_literal_is_an_error() {
        let mock = Builder::new().read(b"* 1 FETCH (BODY[] {10}\r\nabc").build();
        let mut framed = FramedStream::new(mock);
        let err = framed.read_response().await.unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[tokio::test]
    async fn test_head_then_streamed_literal() {
        let mock = Builder::new().read(b"* 3 FETCH (BODY[] {6}\r\nabcdef)\r\n").build();
        let mut framed = FramedStream::new(mock);

        let (head, len) = framed.read_head().await.unwrap().unwrap();
        assert_eq!(&head[..], b"* 3 FETCH (BODY[] {6}\r\n");
        assert_eq!(len, Some(6));

        let mut buf = [0u8; 4];
        let n = framed.read_some(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &b"abcdef"[..n]);
    }

    #[tokio::test]
    async fn test_write_command() {
        let mock = Builder::new().write(b"A0001 NOOP\r\n").build();
        let mut framed = FramedStream::new(mock);
        framed.write_command(b"A0001 NOOP\r\n").await.unwrap();
    }

    #[tokio::test]
    async fn test_literal_size_validation() {
        let header = format!("* 1 FETCH (BODY[] {{{}}}\r\n", MAX_LITERAL_SIZE + 1);
        let mock = Builder::new().read(header.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let err = framed.read_response().await.unwrap_err();
        assert!(err.to_string().contains("literal too large"));
    }

    #[tokio::test]
    async fn test_line_length_limit() {
        let long_line = "A".repeat(MAX_LINE_LENGTH + 100);
        let mock = Builder::new().read(long_line.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let err = framed.read_response().await.unwrap_err();
        assert!(err.to_string().contains("line too long"));
    }
}
