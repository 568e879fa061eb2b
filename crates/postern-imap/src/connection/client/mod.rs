//! IMAP client connection.
//!
//! One socket, one command in flight. The lifecycle is tracked at runtime in
//! [`ConnectionState`]:
//!
//! - `NotConnected`: socket open, greeting not read
//! - `Connected`: greeting read, not authenticated
//! - `Authenticated`: after LOGIN or a PREAUTH greeting
//! - `Selected`: after SELECT/EXAMINE
//! - `Closed`: after LOGOUT, BYE, or any transport or protocol failure
//!
//! Commands that are not valid in the current state are rejected before
//! anything is written.

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod not_authenticated;
mod selected;
mod states;

use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, trace, warn};

pub use self::states::ConnectionState;
use crate::command::{Command, TagGenerator};
use crate::fetch::MessageStatus;
use crate::handler::{LoggingHandler, ResponseHandler};
use crate::parser::response::render;
use crate::parser::{Keyword, Response, ResponseCode, ResponseTokenizer, Status, Untagged, Value};
use crate::state::{MailboxEvent, MailboxState};
use crate::types::{Capability, Mailbox, MailboxStatus};
use crate::{Error, Result};

/// An IMAP connection.
///
/// Every command method takes `&mut self`, so a command and the drain of its
/// responses can never interleave with another command.
pub struct Connection<S> {
    pub(crate) tokenizer: ResponseTokenizer<S>,
    tags: TagGenerator,
    state: ConnectionState,
    mailbox: MailboxState,
    capabilities: Vec<Capability>,
    handler: Box<dyn ResponseHandler>,
    io_timeout: Option<Duration>,
    bye: Option<String>,
    last_rejection: Option<String>,
}

impl<S> std::fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("tags", &self.tags)
            .field("state", &self.state)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// A command that completed with OK.
#[derive(Debug)]
pub(crate) struct Completion {
    /// Bracketed code of the tagged response.
    pub code: Vec<Value>,
    /// Text of the tagged response.
    pub text: String,
    /// Untagged responses received while the command ran.
    pub data: Vec<Untagged>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a freshly opened stream. The greeting is still unread.
    pub fn new(stream: S) -> Self {
        Self {
            tokenizer: ResponseTokenizer::new(stream),
            tags: TagGenerator::default(),
            state: ConnectionState::NotConnected,
            mailbox: MailboxState::new(),
            capabilities: Vec::new(),
            handler: Box::new(LoggingHandler),
            io_timeout: None,
            bye: None,
            last_rejection: None,
        }
    }

    /// Wraps a stream and reads the server greeting.
    pub async fn connect(stream: S) -> Result<Self> {
        let mut connection = Self::new(stream);
        connection.greet().await?;
        Ok(connection)
    }

    /// Sets the deadline applied to every read and write.
    ///
    /// Expiry is fatal, like a BYE.
    #[must_use]
    pub const fn with_io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Installs the handler that receives unsolicited events.
    pub fn set_handler(&mut self, handler: impl ResponseHandler + 'static) {
        self.handler = Box::new(handler);
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Returns true once the connection can no longer be used.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Returns the selected mailbox, if any.
    #[must_use]
    pub const fn selected(&self) -> Option<&Mailbox> {
        self.state.mailbox()
    }

    /// Returns the counters of the selected mailbox.
    #[must_use]
    pub const fn mailbox_status(&self) -> &MailboxStatus {
        self.mailbox.status()
    }

    /// Returns the capabilities last advertised by the server.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Checks if the server advertised a capability.
    #[must_use]
    pub fn has_capability(&self, cap: &Capability) -> bool {
        self.capabilities.contains(cap)
    }

    /// Returns the server text of the last NO reported as `false` by a
    /// mailbox management command.
    #[must_use]
    pub fn last_rejection(&self) -> Option<&str> {
        self.last_rejection.as_deref()
    }

    /// Reads the server greeting.
    ///
    /// `OK` leads to `Connected`, `PREAUTH` to `Authenticated`; `BYE` means
    /// the server refused the connection.
    pub async fn greet(&mut self) -> Result<()> {
        if self.state != ConnectionState::NotConnected {
            return Err(Error::InvalidState(format!(
                "greeting already read (connection is {})",
                self.state
            )));
        }
        let result = self.read_greeting().await;
        result.map_err(|e| self.fail(e))
    }

    async fn read_greeting(&mut self) -> Result<()> {
        let Response::Untagged(greeting) = self.read().await? else {
            return Err(Error::Protocol("greeting must be untagged".to_string()));
        };
        self.note_code(greeting.response_code(), greeting.text());

        match greeting.keyword {
            Keyword::Ok => {
                info!(greeting = greeting.text(), "connected");
                self.state = ConnectionState::Connected;
                Ok(())
            }
            Keyword::PreAuth => {
                info!(greeting = greeting.text(), "connected, preauthenticated");
                self.state = ConnectionState::Authenticated;
                Ok(())
            }
            Keyword::Bye => {
                let text = greeting.text().to_string();
                warn!(%text, "server refused connection");
                self.handler.on_bye(&text);
                Err(Error::Bye(text))
            }
            other => Err(Error::Protocol(format!("unexpected greeting: {other:?}"))),
        }
    }

    /// Sends CAPABILITY and returns the refreshed list.
    pub async fn capability(&mut self) -> Result<Vec<Capability>> {
        self.execute(&Command::Capability).await?;
        Ok(self.capabilities.clone())
    }

    /// Sends NOOP. Pending unsolicited updates are dispatched on the way.
    pub async fn noop(&mut self) -> Result<()> {
        self.execute(&Command::Noop).await.map(|_| ())
    }

    /// Sends LOGOUT and releases the socket.
    ///
    /// The connection ends `Closed` whatever happens on the wire; the
    /// server's BYE or an already dead socket are not errors here.
    pub async fn logout(&mut self) -> Result<()> {
        if self.state.is_closed() {
            return Ok(());
        }
        let result = self.execute(&Command::Logout).await;

        let timeout = self.io_timeout;
        if let Err(e) = deadline(timeout, self.tokenizer.framed().shutdown()).await {
            debug!(error = %e, "shutdown after LOGOUT failed");
        }
        self.invalidate("logged out");
        info!("logged out");

        match result {
            Ok(_) | Err(Error::Bye(_) | Error::ConnectionClosed) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Runs one command to its tagged completion.
    ///
    /// Fatal failures leave the connection `Closed`.
    pub(crate) async fn execute(&mut self, command: &Command) -> Result<Completion> {
        match self.state {
            ConnectionState::Closed => return Err(Error::ConnectionClosed),
            ConnectionState::NotConnected => {
                return Err(Error::InvalidState("greeting not read yet".to_string()));
            }
            _ => {}
        }
        let result = self.run(command).await;
        self.tokenizer.end();
        result.map_err(|e| self.fail(e))
    }

    async fn run(&mut self, command: &Command) -> Result<Completion> {
        let literals = self.send(command).await?;

        let timeout = self.io_timeout;
        let mut data = Vec::new();
        for segment in literals {
            loop {
                match self.read().await? {
                    Response::Continuation { .. } => break,
                    Response::Untagged(u) => self.dispatch(u, &mut data),
                    Response::Tagged {
                        status, code, text, ..
                    } => return self.complete(command.name(), status, code, text, data),
                }
            }
            trace!(bytes = segment.len(), "sending literal");
            deadline(timeout, self.tokenizer.framed().write_raw(&segment)).await?;
        }

        self.drain(command.name(), data).await
    }

    /// Allocates a tag and writes the command line.
    ///
    /// Returns the segments that still have to wait for a continuation
    /// request, each starting with literal bytes.
    pub(crate) async fn send(&mut self, command: &Command) -> Result<Vec<Vec<u8>>> {
        let tag = self.tags.next()?;
        debug!(command = %command.log_line(tag.as_str()), "C:");
        let mut segments = command.encode(tag.as_str()).into_iter();
        let line = segments.next().unwrap_or_default();
        self.tokenizer.begin(tag);

        let timeout = self.io_timeout;
        deadline(timeout, self.tokenizer.framed().write_command(&line)).await?;
        Ok(segments.collect())
    }

    /// Reads until the tagged completion, dispatching untagged responses.
    pub(crate) async fn drain(
        &mut self,
        command: &'static str,
        mut data: Vec<Untagged>,
    ) -> Result<Completion> {
        loop {
            match self.read().await? {
                Response::Untagged(u) => self.dispatch(u, &mut data),
                Response::Tagged {
                    status, code, text, ..
                } => return self.complete(command, status, code, text, data),
                Response::Continuation { text } => {
                    return Err(Error::Protocol(format!(
                        "unexpected continuation during {command}: {text}"
                    )));
                }
            }
        }
    }

    /// Reads one response under the I/O deadline.
    async fn read(&mut self) -> Result<Response> {
        let timeout = self.io_timeout;
        match deadline(timeout, self.tokenizer.next()).await? {
            Some(response) => Ok(response),
            None => Err(self.bye.take().map_or(Error::ConnectionClosed, Error::Bye)),
        }
    }

    fn complete(
        &mut self,
        command: &'static str,
        status: Status,
        code: Vec<Value>,
        text: String,
        data: Vec<Untagged>,
    ) -> Result<Completion> {
        self.note_code(ResponseCode::from_values(&code), &text);

        if command != "LOGOUT"
            && let Some(reason) = self.bye.take()
        {
            return Err(Error::Bye(reason));
        }

        let code_text = (!code.is_empty()).then(|| render(&code));
        match status {
            Status::Ok => Ok(Completion { code, text, data }),
            Status::No => {
                warn!(command, %text, "command failed");
                Err(Error::No {
                    command,
                    text,
                    code: code_text,
                })
            }
            Status::Bad => {
                warn!(command, %text, "command rejected");
                Err(Error::Bad {
                    command,
                    text,
                    code: code_text,
                })
            }
        }
    }

    /// Applies one untagged response and hands it to the handler.
    pub(crate) fn dispatch(&mut self, response: Untagged, data: &mut Vec<Untagged>) {
        if let Some(event) = self.mailbox.apply(&response) {
            match event {
                MailboxEvent::Exists { count, added } => self.handler.on_exists(count, added),
                MailboxEvent::Recent(count) => self.handler.on_recent(count),
                MailboxEvent::Flags(flags) => self.handler.on_flags(&flags),
                MailboxEvent::Expunged(seq) => self.handler.on_expunge(seq),
                MailboxEvent::UidValidityChanged { old, new } => {
                    self.handler.on_uid_validity_changed(old, new);
                }
            }
        }

        match &response.keyword {
            Keyword::Bye => {
                warn!(text = response.text(), "server sent BYE");
                self.handler.on_bye(response.text());
                self.bye = Some(response.text().to_string());
            }
            Keyword::Capability => {
                self.capabilities = response
                    .code
                    .iter()
                    .filter_map(Value::as_str)
                    .map(Capability::parse)
                    .collect();
            }
            Keyword::Ok => self.note_code(response.response_code(), response.text()),
            Keyword::No | Keyword::Bad => {
                warn!(text = response.text(), "server warning");
                self.note_code(response.response_code(), response.text());
            }
            Keyword::Fetch => {
                if let Some(message) = MessageStatus::from_fetch(&response) {
                    self.handler.on_fetch(&message);
                }
            }
            _ => {}
        }

        data.push(response);
    }

    fn note_code(&mut self, code: Option<ResponseCode>, text: &str) {
        match code {
            Some(ResponseCode::Alert) => self.handler.on_alert(text),
            Some(ResponseCode::Capability(caps)) => self.capabilities = caps,
            _ => {}
        }
    }

    /// Closes the connection for good if `error` is fatal.
    pub(crate) fn fail(&mut self, error: Error) -> Error {
        if error.is_fatal() {
            self.invalidate(&error.to_string());
        }
        error
    }

    /// Moves to `Closed`, forgets the mailbox and notifies the handler once.
    pub(crate) fn invalidate(&mut self, reason: &str) {
        if self.state.is_closed() {
            return;
        }
        debug!(%reason, "connection invalidated");
        self.state = ConnectionState::Closed;
        self.mailbox.reset();
        self.tokenizer.end();
        self.handler.on_disconnect(reason);
    }

    /// Checks that the current state allows an operation.
    pub(crate) fn require(
        &self,
        allowed: impl FnOnce(&ConnectionState) -> bool,
        needs: &str,
    ) -> Result<()> {
        if self.state.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        if allowed(&self.state) {
            Ok(())
        } else {
            Err(Error::InvalidState(format!(
                "{needs} (connection is {})",
                self.state
            )))
        }
    }
}

/// Runs `io` under an optional deadline; expiry becomes [`Error::Timeout`].
pub(crate) async fn deadline<T>(
    limit: Option<Duration>,
    io: impl Future<Output = Result<T>>,
) -> Result<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, io)
            .await
            .map_err(|_| Error::Timeout(limit))?,
        None => io.await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use tokio_test::io::{Builder, Mock};

    use super::*;
    use crate::handler::{CollectingHandler, UnsolicitedEvent};

    const GREETING: &[u8] = b"* OK [CAPABILITY IMAP4rev1 STARTTLS AUTH=PLAIN] ready\r\n";

    async fn connected(mock: Mock) -> (Connection<Mock>, CollectingHandler) {
        let mut conn = Connection::connect(mock).await.unwrap();
        let events = CollectingHandler::new();
        conn.set_handler(events.clone());
        (conn, events)
    }

    #[tokio::test]
    async fn test_greeting_ok_reads_capabilities() {
        let mock = Builder::new().read(GREETING).build();
        let (conn, _) = connected(mock).await;

        assert_eq!(conn.state(), &ConnectionState::Connected);
        assert!(conn.has_capability(&Capability::StartTls));
        assert!(conn.has_capability(&Capability::Auth("PLAIN".to_string())));
    }

    #[tokio::test]
    async fn test_greeting_preauth() {
        let mock = Builder::new().read(b"* PREAUTH welcome back\r\n").build();
        let conn = Connection::connect(mock).await.unwrap();
        assert_eq!(conn.state(), &ConnectionState::Authenticated);
    }

    #[tokio::test]
    async fn test_greeting_bye_refuses() {
        let mock = Builder::new().read(b"* BYE too many connections\r\n").build();
        let mut conn = Connection::new(mock);
        let err = conn.greet().await.unwrap_err();

        assert!(matches!(err, Error::Bye(ref text) if text == "too many connections"));
        assert!(conn.is_closed());
    }

    #[tokio::test]
    async fn test_command_before_greeting_writes_nothing() {
        let mock = Builder::new().build();
        let mut conn = Connection::new(mock);
        assert!(matches!(conn.noop().await, Err(Error::InvalidState(_))));
        assert_eq!(conn.state(), &ConnectionState::NotConnected);
    }

    #[tokio::test]
    async fn test_noop_dispatches_unsolicited() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A0001 SELECT INBOX\r\n")
            .read(b"A0001 OK [READ-WRITE] SELECT completed\r\n")
            .write(b"A0002 NOOP\r\n")
            .read(b"* 3 EXISTS\r\n* 1 RECENT\r\n* 2 FETCH (FLAGS (\\Seen))\r\n")
            .read(b"A0002 OK NOOP completed\r\n")
            .build();
        let (mut conn, events) = connected(mock).await;
        conn.select(&crate::types::Mailbox::inbox()).await.unwrap();

        conn.noop().await.unwrap();

        assert_eq!(conn.mailbox_status().exists, 3);
        assert_eq!(
            events.take(),
            vec![
                UnsolicitedEvent::Exists(3, 1..=3),
                UnsolicitedEvent::Recent(1),
                UnsolicitedEvent::Fetch(2),
            ]
        );
    }

    #[tokio::test]
    async fn test_counters_ignored_without_mailbox() {
        let mock = Builder::new()
            .read(GREETING)
            .write(b"A0001 NOOP\r\n")
            .read(b"* 3 EXISTS\r\n* 1 RECENT\r\n* 2 FETCH (FLAGS (\\Seen))\r\n")
            .read(b"A0001 OK NOOP completed\r\n")
            .build();
        let (mut conn, events) = connected(mock).await;

        conn.noop().await.unwrap();

        assert_eq!(conn.mailbox_status().exists, 0);
        assert_eq!(conn.mailbox_status().recent, 0);
        assert_eq!(events.take(), vec![UnsolicitedEvent::Fetch(2)]);
    }

    #[tokio::test]
    async fn test_capability_refresh() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 CAPABILITY\r\n")
            .read(b"* CAPABILITY IMAP4rev1 LOGINDISABLED\r\n")
            .read(b"A0001 OK done\r\n")
            .build();
        let (mut conn, _) = connected(mock).await;

        let caps = conn.capability().await.unwrap();
        assert_eq!(caps, vec![Capability::Imap4Rev1, Capability::LoginDisabled]);
    }

    #[tokio::test]
    async fn test_tags_increase_per_command() {
        let mock = Builder::new()
            .read(GREETING)
            .write(b"A0001 NOOP\r\n")
            .read(b"A0001 OK\r\n")
            .write(b"A0002 NOOP\r\n")
            .read(b"A0002 OK\r\n")
            .build();
        let (mut conn, _) = connected(mock).await;

        conn.noop().await.unwrap();
        conn.noop().await.unwrap();
    }

    #[tokio::test]
    async fn test_unrelated_tag_is_fatal() {
        let mock = Builder::new()
            .read(GREETING)
            .write(b"A0001 NOOP\r\n")
            .read(b"A0007 OK NOOP completed\r\n")
            .build();
        let (mut conn, events) = connected(mock).await;

        let err = conn.noop().await.unwrap_err();
        assert!(matches!(err, Error::UnexpectedTag { .. }));
        assert!(conn.is_closed());
        assert!(matches!(
            events.take().as_slice(),
            [UnsolicitedEvent::Disconnect(_)]
        ));

        // Nothing more is written once closed.
        assert!(matches!(conn.noop().await, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_eof_mid_command_closes() {
        let mock = Builder::new().read(GREETING).write(b"A0001 NOOP\r\n").build();
        let (mut conn, _) = connected(mock).await;

        assert!(matches!(conn.noop().await, Err(Error::ConnectionClosed)));
        assert!(conn.is_closed());
    }

    #[tokio::test]
    async fn test_bye_during_command_is_disconnect() {
        let mock = Builder::new()
            .read(GREETING)
            .write(b"A0001 NOOP\r\n")
            .read(b"* BYE autologout; idle for too long\r\n")
            .build();
        let (mut conn, events) = connected(mock).await;

        let err = conn.noop().await.unwrap_err();
        assert!(matches!(err, Error::Bye(ref text) if text == "autologout; idle for too long"));
        assert!(err.is_disconnect());
        assert!(conn.is_closed());

        let events = events.take();
        assert!(events.contains(&UnsolicitedEvent::Bye(
            "autologout; idle for too long".to_string()
        )));
        assert!(matches!(events.last(), Some(UnsolicitedEvent::Disconnect(_))));
    }

    #[tokio::test]
    async fn test_no_is_recoverable_and_keeps_text() {
        let mock = Builder::new()
            .read(GREETING)
            .write(b"A0001 NOOP\r\n")
            .read(b"A0001 NO [ALERT] mailbox over quota\r\n")
            .write(b"A0002 NOOP\r\n")
            .read(b"A0002 OK\r\n")
            .build();
        let (mut conn, events) = connected(mock).await;

        let err = conn.noop().await.unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(err.code(), Some("ALERT"));
        assert_eq!(
            err.to_string(),
            "NOOP failed: NO [ALERT] mailbox over quota"
        );
        assert_eq!(
            events.take(),
            vec![UnsolicitedEvent::Alert("mailbox over quota".to_string())]
        );

        conn.noop().await.unwrap();
        assert_eq!(conn.state(), &ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_bad_is_distinct_from_no() {
        let mock = Builder::new()
            .read(GREETING)
            .write(b"A0001 NOOP\r\n")
            .read(b"A0001 BAD command unknown or arguments invalid\r\n")
            .build();
        let (mut conn, _) = connected(mock).await;

        let err = conn.noop().await.unwrap_err();
        assert!(matches!(err, Error::Bad { command: "NOOP", .. }));
        assert!(!conn.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_io_deadline_expiry_is_fatal() {
        let mock = Builder::new()
            .read(GREETING)
            .write(b"A0001 NOOP\r\n")
            .wait(Duration::from_secs(60))
            .build();
        let conn = Connection::connect(mock).await.unwrap();
        let mut conn = conn.with_io_timeout(Some(Duration::from_secs(5)));

        let err = conn.noop().await.unwrap_err();
        assert!(matches!(err, Error::Timeout(d) if d == Duration::from_secs(5)));
        assert!(conn.is_closed());
    }

    #[tokio::test]
    async fn test_logout_always_closes() {
        let mock = Builder::new()
            .read(GREETING)
            .write(b"A0001 LOGOUT\r\n")
            .read(b"* BYE logging out\r\nA0001 OK LOGOUT completed\r\n")
            .build();
        let (mut conn, _) = connected(mock).await;

        conn.logout().await.unwrap();
        assert!(conn.is_closed());
        conn.logout().await.unwrap();
    }

    #[tokio::test]
    async fn test_logout_without_completion_still_closes() {
        let mock = Builder::new()
            .read(GREETING)
            .write(b"A0001 LOGOUT\r\n")
            .read(b"* BYE logging out\r\n")
            .build();
        let (mut conn, _) = connected(mock).await;

        conn.logout().await.unwrap();
        assert!(conn.is_closed());
    }
}
