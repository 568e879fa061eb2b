//! Chunked download of large body sections.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::Result;
use crate::connection::Connection;

use super::FetchAddress;

/// Bytes requested per ranged fetch unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: u32 = 5000;

/// Reads a body section through successive `BODY.PEEK[part]<offset.size>`
/// fetches.
///
/// The section is complete once the server returns fewer bytes than asked
/// for. Each chunk is a full command, so the connection is free between
/// chunks.
pub struct PartialFetch<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    connection: &'a mut Connection<S>,
    seq: u32,
    address: FetchAddress,
    chunk_size: u32,
    offset: u32,
    done: bool,
}

impl<'a, S> PartialFetch<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(connection: &'a mut Connection<S>, seq: u32, address: FetchAddress) -> Self {
        Self {
            connection,
            seq,
            address,
            chunk_size: DEFAULT_CHUNK_SIZE,
            offset: 0,
            done: false,
        }
    }

    /// Sets the chunk size. Zero is treated as one byte.
    #[must_use]
    pub fn chunk_size(mut self, size: u32) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Returns the number of bytes received so far.
    #[must_use]
    pub const fn offset(&self) -> u32 {
        self.offset
    }

    /// Returns true once the last chunk was read.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.done
    }

    /// Fetches the next chunk. Returns `None` after the last one.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if self.done {
            return Ok(None);
        }

        let address = self
            .address
            .clone()
            .with_range(self.offset, self.chunk_size);
        let chunk = self
            .connection
            .fetch_section(self.seq, &address)
            .await?
            .unwrap_or_default();

        let received = u32::try_from(chunk.len()).unwrap_or(u32::MAX);
        self.offset = self.offset.saturating_add(received);
        if received < self.chunk_size {
            self.done = true;
        }
        tracing::trace!(seq = self.seq, offset = self.offset, bytes = received, "partial chunk");

        Ok((!chunk.is_empty()).then_some(chunk))
    }

    /// Fetches every remaining chunk and joins them.
    pub async fn read_all(mut self) -> Result<Bytes> {
        let mut out = BytesMut::new();
        while let Some(chunk) = self.next_chunk().await? {
            out.extend_from_slice(&chunk);
        }
        Ok(out.freeze())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio_test::io::Builder;

    use super::*;
    use crate::types::Mailbox;

    #[tokio::test]
    async fn test_chunks_until_short_read() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A0001 SELECT INBOX\r\n")
            .read(b"* 1 EXISTS\r\nA0001 OK done\r\n")
            .write(b"A0002 FETCH 1 BODY.PEEK[2]<0.4>\r\n")
            .read(b"* 1 FETCH (BODY[2]<0> {4}\r\nabcd)\r\nA0002 OK\r\n")
            .write(b"A0003 FETCH 1 BODY.PEEK[2]<4.4>\r\n")
            .read(b"* 1 FETCH (BODY[2]<4> {4}\r\nefgh)\r\nA0003 OK\r\n")
            .write(b"A0004 FETCH 1 BODY.PEEK[2]<8.4>\r\n")
            .read(b"* 1 FETCH (BODY[2]<8> {2}\r\nij)\r\nA0004 OK\r\n")
            .build();
        let mut conn = Connection::connect(mock).await.unwrap();
        conn.select(&Mailbox::inbox()).await.unwrap();

        let body = conn
            .partial(1, FetchAddress::part(&[2]))
            .chunk_size(4)
            .read_all()
            .await
            .unwrap();
        assert_eq!(&body[..], b"abcdefghij");
    }

    #[tokio::test]
    async fn test_exact_multiple_ends_on_empty_chunk() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A0001 SELECT INBOX\r\n")
            .read(b"* 1 EXISTS\r\nA0001 OK done\r\n")
            .write(b"A0002 FETCH 1 BODY.PEEK[]<0.3>\r\n")
            .read(b"* 1 FETCH (BODY[]<0> {3}\r\nabc)\r\nA0002 OK\r\n")
            .write(b"A0003 FETCH 1 BODY.PEEK[]<3.3>\r\n")
            .read(b"* 1 FETCH (BODY[]<3> \"\")\r\nA0003 OK\r\n")
            .build();
        let mut conn = Connection::connect(mock).await.unwrap();
        conn.select(&Mailbox::inbox()).await.unwrap();

        let mut partial = conn.partial(1, FetchAddress::whole()).chunk_size(3);
        assert_eq!(&partial.next_chunk().await.unwrap().unwrap()[..], b"abc");
        assert!(!partial.is_done());
        assert_eq!(partial.next_chunk().await.unwrap(), None);
        assert!(partial.is_done());
        assert_eq!(partial.offset(), 3);
    }
}
