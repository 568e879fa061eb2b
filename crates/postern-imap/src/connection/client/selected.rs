//! Operations for the selected state.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{info, trace};

use super::{Connection, ConnectionState, deadline};
use crate::command::{Command, FetchAttribute, SearchCriteria, StoreAction};
use crate::fetch::{FetchAddress, LiteralStream, MessageStatus, PartialFetch, normalize_key};
use crate::parser::{Keyword, Response, Untagged};
use crate::types::{Flags, Mailbox, SequenceSet};
use crate::{Error, Result};

const NEEDS_MAILBOX: &str = "command needs a selected mailbox";

/// How a streamed section fetch began.
enum StreamStart {
    /// The section literal is next on the wire.
    Literal { head: BytesMut, len: usize },
    /// The command completed without a literal for the section.
    Done(MessageStatus),
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn require_selected(&self) -> Result<()> {
        self.require(|s| matches!(s, ConnectionState::Selected { .. }), NEEDS_MAILBOX)
    }

    /// Sends CHECK.
    pub async fn check(&mut self) -> Result<()> {
        self.require_selected()?;
        self.execute(&Command::Check).await.map(|_| ())
    }

    /// Closes the mailbox, silently expunging deleted messages, and returns
    /// to the authenticated state.
    pub async fn close(&mut self) -> Result<()> {
        self.require_selected()?;
        self.execute(&Command::Close).await?;
        self.state = ConnectionState::Authenticated;
        self.mailbox.reset();
        info!("mailbox closed");
        Ok(())
    }

    /// Permanently removes messages flagged `\Deleted`.
    ///
    /// Returns the expunged sequence numbers in server order. Each number is
    /// relative to the mailbox after the previous removal.
    pub async fn expunge(&mut self) -> Result<Vec<u32>> {
        self.require_selected()?;
        let done = self.execute(&Command::Expunge).await?;
        Ok(done
            .data
            .iter()
            .filter(|u| u.keyword == Keyword::Expunge)
            .filter_map(|u| u.count)
            .collect())
    }

    /// Searches the mailbox. Criteria are ANDed together.
    ///
    /// Returns the matching sequence numbers in server order.
    pub async fn search(
        &mut self,
        charset: Option<&str>,
        criteria: &[SearchCriteria],
    ) -> Result<Vec<u32>> {
        self.require_selected()?;
        let done = self
            .execute(&Command::Search {
                charset: charset.map(str::to_string),
                criteria: criteria.to_vec(),
            })
            .await?;

        let mut found = Vec::new();
        for value in done
            .data
            .iter()
            .filter(|u| u.keyword == Keyword::Search)
            .flat_map(|u| &u.code)
        {
            let seq = value
                .as_number()
                .ok_or_else(|| Error::Protocol(format!("bad SEARCH result: {value:?}")))?;
            found.push(seq);
        }
        Ok(found)
    }

    /// Fetches data items. One entry per message, in the order the server
    /// first mentioned it.
    pub async fn fetch(
        &mut self,
        sequence: &SequenceSet,
        items: &[FetchAttribute],
    ) -> Result<Vec<MessageStatus>> {
        self.require_selected()?;
        let done = self
            .execute(&Command::Fetch {
                sequence: sequence.clone(),
                items: items.to_vec(),
            })
            .await?;
        Ok(collect_messages(&done.data))
    }

    /// Fetches one body section without setting `\Seen`.
    ///
    /// Returns `None` when the server reported the section as `NIL` or
    /// omitted it.
    pub async fn fetch_section(&mut self, seq: u32, address: &FetchAddress) -> Result<Option<Bytes>> {
        self.require_selected()?;
        let done = self.execute(&section_command(seq, address)?).await?;
        Ok(message_for(seq, &done.data).body(address))
    }

    /// Fetches the header of a message.
    pub async fn fetch_header(&mut self, seq: u32) -> Result<Option<Bytes>> {
        self.fetch_section(seq, &FetchAddress::header()).await
    }

    /// Alters flags. Returns the flags the server reported per message.
    ///
    /// Both `* n FETCH (FLAGS (...))` and the legacy `* n FETCH FLAGS (...)`
    /// are accepted. With `silent`, servers usually report nothing.
    pub async fn store(
        &mut self,
        sequence: &SequenceSet,
        action: StoreAction,
        silent: bool,
    ) -> Result<Vec<(u32, Flags)>> {
        self.require_selected()?;
        let done = self
            .execute(&Command::Store {
                sequence: sequence.clone(),
                action,
                silent,
            })
            .await?;
        Ok(collect_messages(&done.data)
            .iter()
            .filter_map(|m| Some((m.seq(), m.flags()?)))
            .collect())
    }

    /// Copies messages to another mailbox.
    pub async fn copy(&mut self, sequence: &SequenceSet, mailbox: &Mailbox) -> Result<()> {
        self.require_selected()?;
        self.execute(&Command::Copy {
            sequence: sequence.clone(),
            mailbox: mailbox.clone(),
        })
        .await
        .map(|_| ())
    }

    /// Fetches one body section and hands its literal out as a stream.
    ///
    /// The stream borrows the connection until [`LiteralStream::finish`].
    /// Dropping it earlier closes the connection.
    pub async fn stream_section(
        &mut self,
        seq: u32,
        address: &FetchAddress,
    ) -> Result<LiteralStream<'_, S>> {
        self.require_selected()?;
        let command = section_command(seq, address)?;
        let result = self.start_stream(&command, seq, address).await;
        match result {
            Ok(StreamStart::Literal { head, len }) => Ok(LiteralStream::new(self, seq, head, len)),
            Ok(StreamStart::Done(message)) => {
                let inline = message.body(address).unwrap_or_default();
                Ok(LiteralStream::completed(self, message, inline))
            }
            Err(e) => {
                self.tokenizer.end();
                Err(self.fail(e))
            }
        }
    }

    /// Reads a body section in ranged chunks.
    pub fn partial(&mut self, seq: u32, address: FetchAddress) -> PartialFetch<'_, S> {
        PartialFetch::new(self, seq, address)
    }

    async fn start_stream(
        &mut self,
        command: &Command,
        seq: u32,
        address: &FetchAddress,
    ) -> Result<StreamStart> {
        self.send(command).await?;

        let timeout = self.io_timeout;
        let key = address.response_key();
        let mut data = Vec::new();
        loop {
            let Some((head, literal)) = deadline(timeout, self.tokenizer.next_head()).await? else {
                return Err(self.bye.take().map_or(Error::ConnectionClosed, Error::Bye));
            };
            if let Some(len) = literal
                && announces(&head, seq, &key)
            {
                trace!(bytes = len, "streaming literal");
                return Ok(StreamStart::Literal { head, len });
            }

            match deadline(timeout, self.tokenizer.finish_head(head, literal)).await? {
                Response::Untagged(u) => self.dispatch(u, &mut data),
                Response::Tagged {
                    status, code, text, ..
                } => {
                    let done = self.complete(command.name(), status, code, text, data)?;
                    self.tokenizer.end();
                    return Ok(StreamStart::Done(message_for(seq, &done.data)));
                }
                Response::Continuation { text } => {
                    return Err(Error::Protocol(format!(
                        "unexpected continuation during FETCH: {text}"
                    )));
                }
            }
        }
    }

    /// Reads raw literal bytes of a streamed section.
    pub(crate) async fn read_literal(&mut self, buf: &mut [u8]) -> Result<usize> {
        let timeout = self.io_timeout;
        let result = deadline(timeout, self.tokenizer.framed().read_some(buf)).await;
        result.map_err(|e| self.fail(e))
    }

    /// Completes a streamed FETCH once its literal was consumed.
    ///
    /// `head` is the response line that announced the literal. The streamed
    /// section shows up empty in the returned status.
    pub(crate) async fn finish_stream(&mut self, head: BytesMut, seq: u32) -> Result<MessageStatus> {
        let result = self.finish_stream_inner(head, seq).await;
        self.tokenizer.end();
        result.map_err(|e| self.fail(e))
    }

    async fn finish_stream_inner(&mut self, mut head: BytesMut, seq: u32) -> Result<MessageStatus> {
        let open = head
            .iter()
            .rposition(|&b| b == b'{')
            .ok_or_else(|| Error::Protocol("literal announcement lost".to_string()))?;
        head.truncate(open);
        head.extend_from_slice(b"{0}\r\n");

        let timeout = self.io_timeout;
        let raw = deadline(timeout, self.tokenizer.framed().read_rest(head, 0)).await?;
        let mut data = Vec::new();
        match self.tokenizer.parse(&raw)? {
            Response::Untagged(u) => self.dispatch(u, &mut data),
            other => {
                return Err(Error::Protocol(format!(
                    "streamed literal ended in {other:?}"
                )));
            }
        }

        let done = self.drain("FETCH", data).await?;
        Ok(message_for(seq, &done.data))
    }
}

fn section_command(seq: u32, address: &FetchAddress) -> Result<Command> {
    let sequence = SequenceSet::single(seq).ok_or_else(|| {
        Error::InvalidState("message sequence numbers start at 1".to_string())
    })?;
    Ok(Command::Fetch {
        sequence,
        items: vec![FetchAttribute::peek(address.clone())],
    })
}

/// Returns true if `head` is a FETCH for `seq` that ends by announcing the
/// literal of `key`.
fn announces(head: &[u8], seq: u32, key: &str) -> bool {
    let line = String::from_utf8_lossy(head);
    let mut words = line.split(' ');
    let (Some("*"), Some(number), Some(keyword)) = (words.next(), words.next(), words.next())
    else {
        return false;
    };
    if number.parse::<u32>() != Ok(seq) || !keyword.eq_ignore_ascii_case("FETCH") {
        return false;
    }
    let Some(open) = line.rfind('{') else {
        return false;
    };
    let item = line[..open]
        .trim_end()
        .rsplit([' ', '('])
        .next()
        .unwrap_or_default();
    normalize_key(item) == key
}

/// Merges FETCH responses per message, keeping first-seen order.
fn collect_messages(data: &[Untagged]) -> Vec<MessageStatus> {
    let mut messages: Vec<MessageStatus> = Vec::new();
    for message in data.iter().filter_map(MessageStatus::from_fetch) {
        match messages.iter_mut().find(|m| m.seq() == message.seq()) {
            Some(existing) => existing.merge(message),
            None => messages.push(message),
        }
    }
    messages
}

fn message_for(seq: u32, data: &[Untagged]) -> MessageStatus {
    collect_messages(data)
        .into_iter()
        .find(|m| m.seq() == seq)
        .unwrap_or_else(|| MessageStatus::new(seq))
}
