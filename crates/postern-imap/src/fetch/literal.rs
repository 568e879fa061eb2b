//! Streaming access to one literal of a FETCH response.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::Result;
use crate::connection::Connection;

use super::MessageStatus;

const DRAIN_CHUNK: usize = 8192;

/// The body of a section fetch, read straight off the socket.
///
/// Holds the connection exclusively: no other command can be issued until
/// [`finish`](Self::finish) has consumed the rest of the response. Dropping
/// the stream before that leaves the connection closed, since the unread
/// bytes would otherwise be taken for the next response.
pub struct LiteralStream<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    connection: &'a mut Connection<S>,
    seq: u32,
    len: usize,
    remaining: usize,
    /// Response line that announced the literal; `None` once completed.
    head: Option<BytesMut>,
    /// Section bytes that arrived inline, as a quoted string.
    inline: Bytes,
    completed: Option<MessageStatus>,
}

impl<'a, S> LiteralStream<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(connection: &'a mut Connection<S>, seq: u32, head: BytesMut, len: usize) -> Self {
        Self {
            connection,
            seq,
            len,
            remaining: len,
            head: Some(head),
            inline: Bytes::new(),
            completed: None,
        }
    }

    /// A stream for a fetch that finished without a literal. `inline` holds
    /// the section if the server sent it as a quoted string; it is empty for
    /// `NIL` or an absent section.
    pub(crate) fn completed(
        connection: &'a mut Connection<S>,
        message: MessageStatus,
        inline: Bytes,
    ) -> Self {
        Self {
            connection,
            seq: message.seq(),
            len: inline.len(),
            remaining: inline.len(),
            head: None,
            inline,
            completed: Some(message),
        }
    }

    /// Returns the message sequence number.
    #[must_use]
    pub const fn seq(&self) -> u32 {
        self.seq
    }

    /// Returns the declared length of the literal.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true for an empty or absent section.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of bytes not read yet.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.remaining
    }

    /// Reads up to `buf.len()` bytes. Returns 0 once the literal is
    /// exhausted.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = buf.len().min(self.remaining);
        if self.head.is_none() {
            buf[..want].copy_from_slice(&self.inline.split_to(want));
            self.remaining -= want;
            return Ok(want);
        }
        let n = self.connection.read_literal(&mut buf[..want]).await?;
        self.remaining -= n;
        Ok(n)
    }

    /// Reads everything that is left.
    pub async fn read_to_end(&mut self) -> Result<Bytes> {
        let mut out = BytesMut::zeroed(self.remaining);
        let mut filled = 0;
        while filled < out.len() {
            filled += self.read(&mut out[filled..]).await?;
        }
        Ok(out.freeze())
    }

    /// Discards unread bytes, reads the rest of the response and the
    /// command completion, and releases the connection.
    ///
    /// The returned status carries the other items of the FETCH. A section
    /// that arrived as a literal appears empty there.
    pub async fn finish(mut self) -> Result<MessageStatus> {
        let mut scratch = [0u8; DRAIN_CHUNK];
        while self.remaining > 0 {
            self.read(&mut scratch).await?;
        }

        match self.head.take() {
            Some(head) => self.connection.finish_stream(head, self.seq).await,
            None => Ok(self
                .completed
                .take()
                .unwrap_or_else(|| MessageStatus::new(self.seq))),
        }
    }
}

impl<S> Drop for LiteralStream<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn drop(&mut self) {
        if self.head.is_some() {
            tracing::warn!(
                seq = self.seq,
                remaining = self.remaining,
                "literal stream dropped before completion"
            );
            self.connection
                .invalidate("literal stream dropped before completion");
        }
    }
}

impl<S> std::fmt::Debug for LiteralStream<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiteralStream")
            .field("seq", &self.seq)
            .field("len", &self.len)
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio_test::io::{Builder, Mock};

    use super::*;
    use crate::connection::ConnectionState;
    use crate::fetch::FetchAddress;
    use crate::types::Mailbox;
    use crate::Error;

    fn selecting() -> Builder {
        let mut builder = Builder::new();
        builder
            .read(b"* PREAUTH ready\r\n")
            .write(b"A0001 SELECT INBOX\r\n")
            .read(b"* 2 EXISTS\r\nA0001 OK [READ-WRITE] done\r\n");
        builder
    }

    async fn selected(mock: Mock) -> Connection<Mock> {
        let mut conn = Connection::connect(mock).await.unwrap();
        conn.select(&Mailbox::inbox()).await.unwrap();
        conn
    }

    #[tokio::test]
    async fn test_stream_then_finish() {
        let mock = selecting()
            .write(b"A0002 FETCH 1 BODY.PEEK[1]\r\n")
            .read(b"* 1 FETCH (UID 9 BODY[1] {11}\r\n")
            .read(b"hello world FLAGS (\\Seen))\r\n")
            .read(b"A0002 OK FETCH completed\r\n")
            .write(b"A0003 NOOP\r\n")
            .read(b"A0003 OK\r\n")
            .build();
        let mut conn = selected(mock).await;

        let mut stream = conn
            .stream_section(1, &FetchAddress::part(&[1]))
            .await
            .unwrap();
        assert_eq!(stream.len(), 11);

        let mut first = [0u8; 5];
        let n = stream.read(&mut first).await.unwrap();
        assert!(n > 0 && n <= 5);
        let rest = stream.read_to_end().await.unwrap();
        assert_eq!(stream.remaining(), 0);

        let mut body = first[..n].to_vec();
        body.extend_from_slice(&rest);
        assert_eq!(body, b"hello world");

        let message = stream.finish().await.unwrap();
        assert_eq!(message.uid(), Some(9));
        assert!(message.flags().unwrap().is_seen());

        conn.noop().await.unwrap();
        assert!(!conn.is_closed());
    }

    #[tokio::test]
    async fn test_finish_drains_unread_bytes() {
        let mock = selecting()
            .write(b"A0002 FETCH 2 BODY.PEEK[]\r\n")
            .read(b"* 2 FETCH (BODY[] {6}\r\nabcdef)\r\nA0002 OK\r\n")
            .build();
        let mut conn = selected(mock).await;

        let stream = conn.stream_section(2, &FetchAddress::whole()).await.unwrap();
        let message = stream.finish().await.unwrap();
        assert_eq!(message.seq(), 2);
        assert!(matches!(conn.state(), ConnectionState::Selected { .. }));
    }

    #[tokio::test]
    async fn test_drop_before_drain_closes_connection() {
        let mock = selecting()
            .write(b"A0002 FETCH 1 BODY.PEEK[]\r\n")
            .read(b"* 1 FETCH (BODY[] {5}\r\n")
            .build();
        let mut conn = selected(mock).await;

        let stream = conn.stream_section(1, &FetchAddress::whole()).await.unwrap();
        drop(stream);

        assert!(conn.is_closed());
        assert!(matches!(conn.noop().await, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_nil_section_completes_immediately() {
        let mock = selecting()
            .write(b"A0002 FETCH 1 BODY.PEEK[3]\r\n")
            .read(b"* 1 FETCH (BODY[3] NIL)\r\nA0002 OK\r\n")
            .build();
        let mut conn = selected(mock).await;

        let mut stream = conn
            .stream_section(1, &FetchAddress::part(&[3]))
            .await
            .unwrap();
        assert!(stream.is_empty());
        assert_eq!(stream.read_to_end().await.unwrap().len(), 0);
        drop(stream);

        assert!(!conn.is_closed());
    }

    #[tokio::test]
    async fn test_quoted_section_is_served_from_the_response() {
        let mock = selecting()
            .write(b"A0002 FETCH 1 BODY.PEEK[1]\r\n")
            .read(b"* 1 FETCH (BODY[1] \"hello\")\r\nA0002 OK\r\n")
            .build();
        let mut conn = selected(mock).await;

        let mut stream = conn
            .stream_section(1, &FetchAddress::part(&[1]))
            .await
            .unwrap();
        assert_eq!(stream.len(), 5);

        let mut first = [0u8; 2];
        assert_eq!(stream.read(&mut first).await.unwrap(), 2);
        assert_eq!(&first, b"he");
        assert_eq!(&stream.read_to_end().await.unwrap()[..], b"llo");
        assert_eq!(stream.remaining(), 0);
        assert_eq!(stream.finish().await.unwrap().seq(), 1);
        assert!(!conn.is_closed());
    }

    #[tokio::test]
    async fn test_other_message_literal_is_buffered() {
        let mock = selecting()
            .write(b"A0002 FETCH 1 BODY.PEEK[HEADER]\r\n")
            .read(b"* 2 FETCH (BODY[HEADER] {3}\r\nxyz)\r\n")
            .read(b"* 1 FETCH (BODY[HEADER] {4}\r\nabcd)\r\nA0002 OK\r\n")
            .build();
        let mut conn = selected(mock).await;

        let mut stream = conn.stream_section(1, &FetchAddress::header()).await.unwrap();
        assert_eq!(stream.len(), 4);
        assert_eq!(&stream.read_to_end().await.unwrap()[..], b"abcd");
        let message = stream.finish().await.unwrap();
        assert_eq!(message.seq(), 1);
    }
}
