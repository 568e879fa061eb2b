//! Response tokenizer: one [`Response`] per call, checked against the tag in
//! flight.

#![allow(clippy::missing_errors_doc)]

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::connection::FramedStream;
use crate::types::Tag;
use crate::{Error, Result};

use super::response::{Response, ResponseParser};

/// Longest prefix of a response written to debug logs.
const LOG_PREFIX: usize = 200;

/// Reads structured responses off a framed stream.
///
/// Tracks the tag of the one command allowed in flight. A tagged response
/// carrying any other tag is a protocol violation.
pub struct ResponseTokenizer<S> {
    framed: FramedStream<S>,
    in_flight: Option<Tag>,
}

impl<S> ResponseTokenizer<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a stream.
    pub fn new(stream: S) -> Self {
        Self {
            framed: FramedStream::new(stream),
            in_flight: None,
        }
    }

    /// Sets the tag whose completion is expected next.
    pub fn begin(&mut self, tag: Tag) {
        self.in_flight = Some(tag);
    }

    /// Clears the in-flight tag after its completion was read.
    pub fn end(&mut self) {
        self.in_flight = None;
    }

    /// Returns the tag in flight.
    #[must_use]
    pub const fn in_flight(&self) -> Option<&Tag> {
        self.in_flight.as_ref()
    }

    /// Reads the next response.
    ///
    /// Returns `None` on a clean end of stream between responses.
    pub async fn next(&mut self) -> Result<Option<Response>> {
        match self.framed.read_response().await? {
            Some(raw) => self.parse(&raw).map(Some),
            None => Ok(None),
        }
    }

    /// Reads the first line of the next response, leaving an announced
    /// literal unread.
    pub async fn next_head(&mut self) -> Result<Option<(BytesMut, Option<usize>)>> {
        self.framed.read_head().await
    }

    /// Completes a response started with [`next_head`](Self::next_head).
    pub async fn finish_head(&mut self, head: BytesMut, literal: Option<usize>) -> Result<Response> {
        let raw = match literal {
            Some(len) => self.framed.read_rest(head, len).await?,
            None => head.freeze(),
        };
        self.parse(&raw)
    }

    /// Parses one raw response and checks its tag.
    pub fn parse(&self, raw: &Bytes) -> Result<Response> {
        tracing::debug!(response = %loggable(raw), "S:");
        let response = ResponseParser::parse(raw)?;

        if let Response::Tagged { tag, .. } = &response {
            match &self.in_flight {
                Some(expected) if expected == tag => {}
                expected => {
                    return Err(Error::UnexpectedTag {
                        expected: expected
                            .as_ref()
                            .map_or_else(|| "none".to_string(), ToString::to_string),
                        received: tag.to_string(),
                    });
                }
            }
        }
        Ok(response)
    }

    /// Returns the framed stream for writes and direct literal reads.
    pub fn framed(&mut self) -> &mut FramedStream<S> {
        &mut self.framed
    }

    /// Returns the underlying stream, dropping any buffered input.
    pub fn into_inner(self) -> S {
        self.framed.into_inner()
    }
}

/// Renders the first line of a response for logs.
fn loggable(raw: &[u8]) -> String {
    let line = raw.split(|&b| b == b'\n').next().unwrap_or_default();
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let shown = &line[..line.len().min(LOG_PREFIX)];
    let mut s = String::from_utf8_lossy(shown).into_owned();
    if line.len() > LOG_PREFIX || raw.len() > line.len() + 2 {
        s.push_str(" ...");
    }
    s
}
