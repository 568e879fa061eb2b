#![allow(clippy::doc_markdown)]
//! Example: list folders and stream the newest INBOX message.
//!
//! ## Running
//!
//! ```bash
//! IMAP_HOST=imap.example.com IMAP_USER=me@example.com IMAP_PASSWORD=secret \
//!     RUST_LOG=postern_imap=debug \
//!     cargo run --package postern-imap --example fetch_inbox
//! ```

use std::env;
use std::time::Duration;

use postern_imap::{Config, FetchAddress, Mailbox, Session, SessionConfig, TcpConnector};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fetch_inbox=info,postern_imap=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let host = env::var("IMAP_HOST")?;
    let user = env::var("IMAP_USER")?;
    let password = env::var("IMAP_PASSWORD")?;

    let config = Config::builder(host)
        .connect_timeout(Duration::from_secs(15))
        .io_timeout(Duration::from_secs(60))
        .build();
    let session = Session::new(TcpConnector::new(config), SessionConfig::new(user, password));

    for entry in session.folders().await? {
        info!(mailbox = %entry.mailbox, selectable = entry.is_selectable(), "folder");
    }

    {
        let mut inbox = session.checkout_mailbox(&Mailbox::inbox()).await?;
        let newest = inbox.mailbox_status().exists;
        if newest == 0 {
            info!("INBOX is empty");
        } else {
            if let Some(header) = inbox.fetch_header(newest).await? {
                println!("{}", String::from_utf8_lossy(&header));
            }

            let mut body = inbox.stream_section(newest, &FetchAddress::whole()).await?;
            let mut chunk = [0u8; 4096];
            let mut total = 0;
            loop {
                let n = body.read(&mut chunk).await?;
                if n == 0 {
                    break;
                }
                total += n;
            }
            body.finish().await?;
            info!(seq = newest, bytes = total, "streamed newest message");
        }
    }

    session.close().await?;
    Ok(())
}
