//! Operations for a connection that has not authenticated yet.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::info;

use super::{Connection, ConnectionState};
use crate::command::Command;
use crate::connection::{Config, ImapStream, Security};
use crate::parser::ResponseTokenizer;
use crate::types::Capability;
use crate::{Error, Result};

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Authenticates with LOGIN.
    ///
    /// Refused locally when the server advertises `LOGINDISABLED`.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        self.require(
            |s| matches!(s, ConnectionState::Connected),
            "LOGIN needs an unauthenticated connection",
        )?;
        if self.has_capability(&Capability::LoginDisabled) {
            return Err(Error::InvalidState(
                "server advertises LOGINDISABLED".to_string(),
            ));
        }

        self.execute(&Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        })
        .await?;

        self.state = ConnectionState::Authenticated;
        info!(username, "logged in");
        Ok(())
    }
}

impl Connection<ImapStream> {
    /// Opens a connection as described by `config`: TCP, implicit TLS or
    /// STARTTLS, then the greeting.
    pub async fn open(config: &Config) -> Result<Self> {
        let stream = ImapStream::connect(config).await?;
        let connection = Self::connect(stream)
            .await?
            .with_io_timeout(config.io_timeout);

        match config.security {
            Security::StartTls => connection.starttls(&config.host).await,
            Security::None | Security::Implicit => Ok(connection),
        }
    }

    /// Upgrades a plaintext connection with STARTTLS.
    ///
    /// Cached capabilities are dropped; the server may advertise different
    /// ones over TLS.
    pub async fn starttls(mut self, host: &str) -> Result<Self> {
        self.require(
            |s| matches!(s, ConnectionState::Connected),
            "STARTTLS needs an unauthenticated connection",
        )?;
        self.execute(&Command::StartTls).await?;
        if self.tokenizer.framed().has_buffered() {
            self.invalidate("plaintext data after STARTTLS");
            return Err(Error::Protocol(
                "server sent plaintext data after STARTTLS".to_string(),
            ));
        }

        let Self {
            tokenizer,
            tags,
            state,
            mailbox,
            handler,
            io_timeout,
            last_rejection,
            ..
        } = self;
        let stream = tokenizer.into_inner().upgrade_to_tls(host).await?;
        info!(host, "TLS established via STARTTLS");

        Ok(Self {
            tokenizer: ResponseTokenizer::new(stream),
            tags,
            state,
            mailbox,
            capabilities: Vec::new(),
            handler,
            io_timeout,
            bye: None,
            last_rejection,
        })
    }
}
