//! Shared IMAP session with keepalive checkout and automatic reconnection.
//!
//! A [`Session`] owns at most one live [`Connection`] behind an async mutex.
//! Callers never hold the connection directly; they [`checkout`] it, which
//! locks, checks the connection with NOOP, and reconnects once with the
//! cached credentials if NOOP fails. The guard holds the lock, so no two
//! tasks can interleave commands.
//!
//! The session also keeps the mailbox listing, invalidated on BYE, on
//! disconnects, on EXPUNGE, and on any successful CREATE/DELETE/RENAME, even
//! one sent through a [`Checkout`], and broadcasts unsolicited events as [`SessionEvent`]s.
//!
//! ## Example
//!
//! ```ignore
//! use postern_imap::connection::{Config, Session, SessionConfig, TcpConnector};
//! use postern_imap::types::Mailbox;
//!
//! let connector = TcpConnector::new(Config::new("imap.example.com"));
//! let session = Session::new(connector, SessionConfig::new("user", "password"));
//!
//! let folders = session.folders().await?;
//! let mut conn = session.checkout_mailbox(&Mailbox::inbox()).await?;
//! let header = conn.fetch_header(1).await?;
//! ```
//!
//! [`checkout`]: Session::checkout

use std::future::Future;
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard, broadcast};
use tracing::{info, warn};

use super::{Config, Connection, ImapStream};
use crate::fetch::MessageStatus;
use crate::handler::ResponseHandler;
use crate::types::{Flags, ListEntry, Mailbox};
use crate::{Error, Result};

/// Events buffered per subscriber before the oldest are dropped.
const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Opens authenticated-ready connections for a [`Session`].
pub trait Connector: Send + Sync {
    /// Transport of the connections produced.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Opens a connection and reads its greeting.
    fn connect(&self) -> impl Future<Output = Result<Connection<Self::Stream>>> + Send;
}

/// Connects over TCP as described by a [`Config`], including TLS or
/// STARTTLS.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    config: Config,
}

impl TcpConnector {
    /// Creates a connector.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl Connector for TcpConnector {
    type Stream = ImapStream;

    async fn connect(&self) -> Result<Connection<ImapStream>> {
        Connection::open(&self.config).await
    }
}

/// Credentials and event settings for a [`Session`].
#[derive(Clone)]
pub struct SessionConfig {
    /// Username for LOGIN.
    pub username: String,
    /// Password for LOGIN.
    pub password: String,
    /// Capacity of the event channel.
    pub event_capacity: usize,
}

impl SessionConfig {
    /// Creates a configuration with the given credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Sets the event channel capacity.
    #[must_use]
    pub const fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("username", &self.username)
            .field("password", &"****")
            .field("event_capacity", &self.event_capacity)
            .finish()
    }
}

/// An unsolicited event observed by the session's connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Message count changed; `added` are the new sequence numbers.
    Exists {
        /// New message count.
        count: u32,
        /// Newly visible sequence numbers.
        added: RangeInclusive<u32>,
    },
    /// Recent count changed.
    Recent(u32),
    /// A message was expunged; later sequence numbers moved down by one.
    Expunged(u32),
    /// The mailbox's defined flags changed.
    Flags(Flags),
    /// FETCH data arrived.
    Fetch(MessageStatus),
    /// `[ALERT]` text that must be shown to the user.
    Alert(String),
    /// The server said BYE.
    Bye(String),
    /// UIDVALIDITY changed.
    UidValidityChanged {
        /// Previous value.
        old: u32,
        /// New value.
        new: u32,
    },
    /// The connection was lost, or could not be re-established.
    Disconnected(String),
    /// A new connection replaced a failed one.
    Reconnected,
}

/// The cached result of `LIST "" "*"`.
#[derive(Debug, Default)]
pub struct ListingCache {
    entries: StdMutex<Option<Vec<ListEntry>>>,
}

impl ListingCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached listing.
    #[must_use]
    pub fn get(&self) -> Option<Vec<ListEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the cached listing.
    pub fn store(&self, entries: Vec<ListEntry>) {
        *self.entries.lock().unwrap_or_else(PoisonError::into_inner) = Some(entries);
    }

    /// Drops the cached listing.
    pub fn invalidate(&self) {
        *self.entries.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Returns true while a listing is cached.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Forwards connection events to subscribers and keeps the listing honest.
struct SessionHandler {
    events: broadcast::Sender<SessionEvent>,
    listing: Arc<ListingCache>,
}

impl SessionHandler {
    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl ResponseHandler for SessionHandler {
    fn on_exists(&mut self, count: u32, added: RangeInclusive<u32>) {
        self.emit(SessionEvent::Exists { count, added });
    }

    fn on_recent(&mut self, count: u32) {
        self.emit(SessionEvent::Recent(count));
    }

    fn on_expunge(&mut self, seq: u32) {
        self.listing.invalidate();
        self.emit(SessionEvent::Expunged(seq));
    }

    fn on_flags(&mut self, flags: &Flags) {
        self.emit(SessionEvent::Flags(flags.clone()));
    }

    fn on_fetch(&mut self, message: &MessageStatus) {
        self.emit(SessionEvent::Fetch(message.clone()));
    }

    fn on_alert(&mut self, text: &str) {
        warn!(alert = text, "server alert");
        self.emit(SessionEvent::Alert(text.to_string()));
    }

    fn on_bye(&mut self, text: &str) {
        self.listing.invalidate();
        self.emit(SessionEvent::Bye(text.to_string()));
    }

    fn on_uid_validity_changed(&mut self, old: u32, new: u32) {
        self.emit(SessionEvent::UidValidityChanged { old, new });
    }

    fn on_mailboxes_changed(&mut self) {
        self.listing.invalidate();
    }

    fn on_disconnect(&mut self, reason: &str) {
        self.listing.invalidate();
        self.emit(SessionEvent::Disconnected(reason.to_string()));
    }
}

/// Exclusive access to the session's connection.
pub type Checkout<'a, S> = MappedMutexGuard<'a, Connection<S>>;

/// A shared, self-healing connection.
pub struct Session<C: Connector> {
    connector: C,
    config: SessionConfig,
    connection: Mutex<Option<Connection<C::Stream>>>,
    listing: Arc<ListingCache>,
    events: broadcast::Sender<SessionEvent>,
}

impl<C: Connector> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("listing_cached", &self.listing.is_cached())
            .finish_non_exhaustive()
    }
}

impl<C: Connector> Session<C> {
    /// Creates a session. Nothing is connected until the first checkout.
    #[must_use]
    pub fn new(connector: C, config: SessionConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            connector,
            config,
            connection: Mutex::new(None),
            listing: Arc::new(ListingCache::new()),
            events,
        }
    }

    /// Subscribes to unsolicited events.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Returns the mailbox listing cache.
    #[must_use]
    pub fn listing(&self) -> &ListingCache {
        &self.listing
    }

    /// Locks the connection and makes sure it is alive.
    ///
    /// Connects and logs in when there is no connection. Otherwise sends
    /// NOOP; if that fails, reconnects exactly once. A failed reconnect
    /// invalidates the listing, emits [`SessionEvent::Disconnected`] and
    /// returns [`Error::ConnectionClosed`].
    ///
    /// # Errors
    ///
    /// Returns the connect or LOGIN error on first use, and
    /// `ConnectionClosed` when a reconnect fails.
    pub async fn checkout(&self) -> Result<Checkout<'_, C::Stream>> {
        let mut guard = self.connection.lock().await;

        let keepalive = match guard.as_mut() {
            Some(connection) => Some(connection.noop().await),
            None => None,
        };
        match keepalive {
            None => *guard = Some(self.establish().await?),
            Some(Ok(())) => {}
            Some(Err(e)) => {
                warn!(error = %e, "keepalive failed, reconnecting");
                *guard = None;
                match self.establish().await {
                    Ok(connection) => {
                        *guard = Some(connection);
                        info!("reconnected");
                        self.emit(SessionEvent::Reconnected);
                    }
                    Err(e) => {
                        warn!(error = %e, "reconnect failed");
                        self.listing.invalidate();
                        self.emit(SessionEvent::Disconnected(e.to_string()));
                        return Err(Error::ConnectionClosed);
                    }
                }
            }
        }

        MutexGuard::try_map(guard, Option::as_mut).map_err(|_| Error::ConnectionClosed)
    }

    /// Checks out the connection with `mailbox` selected.
    ///
    /// # Errors
    ///
    /// Returns checkout errors and SELECT failures.
    pub async fn checkout_mailbox(&self, mailbox: &Mailbox) -> Result<Checkout<'_, C::Stream>> {
        let mut connection = self.checkout().await?;
        connection.select(mailbox).await?;
        Ok(connection)
    }

    /// Returns every mailbox, from the cache when possible.
    ///
    /// # Errors
    ///
    /// Returns checkout and LIST errors.
    pub async fn folders(&self) -> Result<Vec<ListEntry>> {
        if let Some(entries) = self.listing.get() {
            return Ok(entries);
        }
        let entries = self.checkout().await?.list("", "*").await?;
        self.listing.store(entries.clone());
        Ok(entries)
    }

    /// Creates a mailbox and invalidates the listing.
    ///
    /// # Errors
    ///
    /// Returns checkout errors and fatal command errors.
    pub async fn create(&self, mailbox: &Mailbox) -> Result<bool> {
        let created = self.checkout().await?.create(mailbox).await;
        self.listing.invalidate();
        created
    }

    /// Deletes a mailbox and invalidates the listing.
    ///
    /// # Errors
    ///
    /// Returns checkout errors and fatal command errors.
    pub async fn delete(&self, mailbox: &Mailbox) -> Result<bool> {
        let deleted = self.checkout().await?.delete(mailbox).await;
        self.listing.invalidate();
        deleted
    }

    /// Renames a mailbox and invalidates the listing.
    ///
    /// # Errors
    ///
    /// Returns checkout errors and fatal command errors.
    pub async fn rename(&self, from: &Mailbox, to: &Mailbox) -> Result<bool> {
        let renamed = self.checkout().await?.rename(from, to).await;
        self.listing.invalidate();
        renamed
    }

    /// Logs out and drops the connection. The next checkout reconnects.
    ///
    /// # Errors
    ///
    /// Returns LOGOUT errors other than the server closing the connection.
    pub async fn close(&self) -> Result<()> {
        let connection = self.connection.lock().await.take();
        self.listing.invalidate();
        match connection {
            Some(mut connection) => connection.logout().await,
            None => Ok(()),
        }
    }

    async fn establish(&self) -> Result<Connection<C::Stream>> {
        let mut connection = self.connector.connect().await?;
        connection.set_handler(SessionHandler {
            events: self.events.clone(),
            listing: Arc::clone(&self.listing),
        });
        if !connection.state().is_authenticated() {
            connection
                .login(&self.config.username, &self.config.password)
                .await?;
        }
        info!(username = %self.config.username, "session established");
        Ok(connection)
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}
