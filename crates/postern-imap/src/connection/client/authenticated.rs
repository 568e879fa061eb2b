//! Operations for an authenticated connection: mailbox selection, mailbox
//! management, listing, STATUS and APPEND.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use super::{Connection, ConnectionState};
use crate::command::{Command, StatusAttribute};
use crate::mutf7;
use crate::parser::{Keyword, Untagged, Value};
use crate::types::{Flag, ListEntry, Mailbox, MailboxAttribute, MailboxStatus};
use crate::{Error, Result};

const NEEDS_LOGIN: &str = "command needs an authenticated connection";

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Selects a mailbox for read-write access.
    pub async fn select(&mut self, mailbox: &Mailbox) -> Result<MailboxStatus> {
        self.open_mailbox(mailbox, false).await
    }

    /// Selects a mailbox read-only.
    pub async fn examine(&mut self, mailbox: &Mailbox) -> Result<MailboxStatus> {
        self.open_mailbox(mailbox, true).await
    }

    async fn open_mailbox(&mut self, mailbox: &Mailbox, read_only: bool) -> Result<MailboxStatus> {
        self.require(ConnectionState::is_authenticated, NEEDS_LOGIN)?;

        if let ConnectionState::Selected {
            mailbox: current,
            read_only: current_mode,
        } = &self.state
            && current.same_as(mailbox)
            && *current_mode == read_only
        {
            debug!(%mailbox, "already selected");
            return Ok(self.mailbox.status().clone());
        }

        let previous_state = self.state.clone();
        let previous_mailbox = self.mailbox.clone();
        self.mailbox.begin();

        let command = if read_only {
            Command::Examine {
                mailbox: mailbox.clone(),
            }
        } else {
            Command::Select {
                mailbox: mailbox.clone(),
            }
        };

        match self.execute(&command).await {
            Ok(done) => {
                self.mailbox.set_read_write(!read_only);
                self.mailbox.apply_completion(&done.code);
                self.state = ConnectionState::Selected {
                    mailbox: mailbox.clone(),
                    read_only,
                };
                let status = self.mailbox.status();
                info!(
                    %mailbox,
                    exists = status.exists,
                    read_write = status.read_write,
                    "mailbox selected"
                );
                Ok(status.clone())
            }
            Err(e) if !e.is_fatal() => {
                self.state = previous_state;
                self.mailbox = previous_mailbox;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Creates a mailbox. Returns `false` if the server said NO.
    pub async fn create(&mut self, mailbox: &Mailbox) -> Result<bool> {
        self.manage(Command::Create {
            mailbox: mailbox.clone(),
        })
        .await
    }

    /// Deletes a mailbox. Returns `false` if the server said NO.
    pub async fn delete(&mut self, mailbox: &Mailbox) -> Result<bool> {
        self.manage(Command::Delete {
            mailbox: mailbox.clone(),
        })
        .await
    }

    /// Renames a mailbox. Returns `false` if the server said NO.
    pub async fn rename(&mut self, from: &Mailbox, to: &Mailbox) -> Result<bool> {
        self.manage(Command::Rename {
            from: from.clone(),
            to: to.clone(),
        })
        .await
    }

    /// Subscribes to a mailbox. Returns `false` if the server said NO.
    pub async fn subscribe(&mut self, mailbox: &Mailbox) -> Result<bool> {
        self.manage(Command::Subscribe {
            mailbox: mailbox.clone(),
        })
        .await
    }

    /// Unsubscribes from a mailbox. Returns `false` if the server said NO.
    pub async fn unsubscribe(&mut self, mailbox: &Mailbox) -> Result<bool> {
        self.manage(Command::Unsubscribe {
            mailbox: mailbox.clone(),
        })
        .await
    }

    /// Runs a mailbox management command, mapping NO to `false`.
    ///
    /// The server text of the refusal is kept in
    /// [`last_rejection`](Self::last_rejection).
    async fn manage(&mut self, command: Command) -> Result<bool> {
        self.require(ConnectionState::is_authenticated, NEEDS_LOGIN)?;
        match self.execute(&command).await {
            Ok(_) => {
                self.last_rejection = None;
                if matches!(
                    command,
                    Command::Create { .. } | Command::Delete { .. } | Command::Rename { .. }
                ) {
                    self.handler.on_mailboxes_changed();
                }
                Ok(true)
            }
            Err(Error::No { text, .. }) => {
                self.last_rejection = Some(text);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Lists mailboxes matching `pattern` under `reference`.
    ///
    /// Empty arguments are sent as `""`.
    pub async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListEntry>> {
        self.require(ConnectionState::is_authenticated, NEEDS_LOGIN)?;
        let done = self
            .execute(&Command::List {
                reference: reference.to_string(),
                pattern: pattern.to_string(),
            })
            .await?;
        Ok(list_entries(&done.data, &Keyword::List))
    }

    /// Lists subscribed mailboxes matching `pattern` under `reference`.
    pub async fn lsub(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListEntry>> {
        self.require(ConnectionState::is_authenticated, NEEDS_LOGIN)?;
        let done = self
            .execute(&Command::Lsub {
                reference: reference.to_string(),
                pattern: pattern.to_string(),
            })
            .await?;
        Ok(list_entries(&done.data, &Keyword::Lsub))
    }

    /// Queries counters of a mailbox without selecting it.
    ///
    /// Only the requested items are filled in.
    pub async fn status(
        &mut self,
        mailbox: &Mailbox,
        items: &[StatusAttribute],
    ) -> Result<MailboxStatus> {
        self.require(ConnectionState::is_authenticated, NEEDS_LOGIN)?;
        let done = self
            .execute(&Command::Status {
                mailbox: mailbox.clone(),
                items: items.to_vec(),
            })
            .await?;

        let mut status = MailboxStatus::default();
        for response in done.data.iter().filter(|u| u.keyword == Keyword::Status) {
            let Some(pairs) = response.code.get(1).and_then(Value::as_list) else {
                continue;
            };
            for pair in pairs.chunks_exact(2) {
                let (Some(name), Some(value)) = (pair[0].as_str(), pair[1].as_number()) else {
                    continue;
                };
                match name.to_ascii_uppercase().as_str() {
                    "MESSAGES" => status.exists = value,
                    "RECENT" => status.recent = value,
                    "UIDNEXT" => status.uid_next = Some(value),
                    "UIDVALIDITY" => status.uid_validity = Some(value),
                    "UNSEEN" => status.unseen = Some(value),
                    other => debug!(item = other, "ignoring STATUS item"),
                }
            }
        }
        Ok(status)
    }

    /// Appends a message to a mailbox.
    ///
    /// The message is sent as a literal once the server asks for it. A NO
    /// carrying `[TRYCREATE]` means the mailbox does not exist.
    pub async fn append(&mut self, mailbox: &Mailbox, flags: &[Flag], message: &[u8]) -> Result<()> {
        self.require(ConnectionState::is_authenticated, NEEDS_LOGIN)?;
        self.execute(&Command::Append {
            mailbox: mailbox.clone(),
            flags: flags.to_vec(),
            message: message.to_vec(),
        })
        .await?;
        Ok(())
    }
}

/// Collects LIST or LSUB entries in server order.
fn list_entries(data: &[Untagged], keyword: &Keyword) -> Vec<ListEntry> {
    data.iter()
        .filter(|u| &u.keyword == keyword)
        .filter_map(list_entry)
        .collect()
}

fn list_entry(response: &Untagged) -> Option<ListEntry> {
    let [attributes, delimiter, name, ..] = response.code.as_slice() else {
        debug!(?response, "malformed list entry");
        return None;
    };

    let attributes = attributes
        .as_list()?
        .iter()
        .filter_map(Value::as_str)
        .map(MailboxAttribute::parse)
        .collect();
    let delimiter = if delimiter.is_nil() {
        None
    } else {
        delimiter.as_str().and_then(|d| d.chars().next())
    };

    let raw = String::from_utf8_lossy(name.as_bytes()?).into_owned();
    let decoded = mutf7::decode(&raw).unwrap_or_else(|e| {
        debug!(name = %raw, error = %e, "mailbox name is not modified UTF-7");
        raw.clone()
    });

    Some(ListEntry {
        attributes,
        delimiter,
        mailbox: Mailbox::new(decoded),
    })
}
