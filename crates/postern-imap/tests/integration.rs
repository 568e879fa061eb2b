//! Integration tests for the IMAP client.
//!
//! These tests script a whole server conversation with a mock stream and
//! drive it through the public API only.

#![allow(clippy::unwrap_used)]

use std::sync::Mutex as StdMutex;

use tokio_test::io::{Builder, Mock};

use postern_imap::connection::Connector;
use postern_imap::handler::{CollectingHandler, UnsolicitedEvent};
use postern_imap::{
    Capability, Connection, ConnectionState, Error, FetchAddress, FetchAttribute, Flag, Mailbox,
    Result, SequenceCache, SequenceSet, Session, SessionConfig, SessionEvent, StoreAction,
};

#[tokio::test]
async fn test_full_mailbox_conversation() {
    let mock = Builder::new()
        .read(b"* OK [CAPABILITY IMAP4rev1 STARTTLS AUTH=PLAIN] Dovecot ready.\r\n")
        .write(b"A0001 LOGIN alice secret\r\n")
        .read(b"A0001 OK [CAPABILITY IMAP4rev1 IDLE] Logged in\r\n")
        .write(b"A0002 LIST \"\" \"*\"\r\n")
        .read(b"* LIST (\\HasNoChildren) \"/\" INBOX\r\n")
        .read(b"* LIST (\\HasNoChildren) \"/\" Archive\r\n")
        .read(b"A0002 OK LIST completed\r\n")
        .write(b"A0003 SELECT INBOX\r\n")
        .read(b"* FLAGS (\\Answered \\Seen \\Deleted)\r\n* 3 EXISTS\r\n* 1 RECENT\r\n")
        .read(b"* OK [UIDVALIDITY 42] UIDs valid\r\n* OK [UIDNEXT 7] Predicted next UID\r\n")
        .read(b"A0003 OK [READ-WRITE] SELECT completed\r\n")
        .write(b"A0004 FETCH 1:3 (FLAGS UID)\r\n")
        .read(b"* 1 FETCH (FLAGS (\\Seen) UID 4)\r\n")
        .read(b"* 2 FETCH (FLAGS () UID 5)\r\n")
        .read(b"* 3 FETCH (FLAGS (\\Deleted) UID 6)\r\n")
        .read(b"A0004 OK FETCH completed\r\n")
        .write(b"A0005 FETCH 2 BODY.PEEK[]\r\n")
        .read(b"* 2 FETCH (BODY[] {11}\r\nHello world)\r\nA0005 OK FETCH completed\r\n")
        .write(b"A0006 STORE 2 +FLAGS (\\Seen)\r\n")
        .read(b"* 2 FETCH (FLAGS (\\Seen))\r\nA0006 OK STORE completed\r\n")
        .write(b"A0007 EXPUNGE\r\n")
        .read(b"* 3 EXPUNGE\r\nA0007 OK EXPUNGE completed\r\n")
        .write(b"A0008 LOGOUT\r\n")
        .read(b"* BYE Logging out\r\nA0008 OK Logout completed\r\n")
        .build();

    let mut conn = Connection::connect(mock).await.unwrap();
    assert_eq!(conn.state(), &ConnectionState::Connected);
    assert!(conn.has_capability(&Capability::StartTls));

    conn.login("alice", "secret").await.unwrap();
    assert!(conn.state().is_authenticated());
    assert!(!conn.has_capability(&Capability::StartTls));

    let folders = conn.list("", "*").await.unwrap();
    let names: Vec<_> = folders.iter().map(|e| e.mailbox.as_str()).collect();
    assert_eq!(names, ["INBOX", "Archive"]);
    assert_eq!(folders[0].delimiter, Some('/'));

    let status = conn.select(&Mailbox::inbox()).await.unwrap();
    assert_eq!(status.exists, 3);
    assert_eq!(status.recent, 1);
    assert_eq!(status.uid_validity, Some(42));
    assert_eq!(status.uid_next, Some(7));
    assert!(status.read_write);

    let messages = conn
        .fetch(
            &SequenceSet::range(1, 3).unwrap(),
            &[FetchAttribute::Flags, FetchAttribute::Uid],
        )
        .await
        .unwrap();
    let uids: Vec<_> = messages.iter().map(|m| m.uid()).collect();
    assert_eq!(uids, [Some(4), Some(5), Some(6)]);

    let mut body = conn.stream_section(2, &FetchAddress::whole()).await.unwrap();
    assert_eq!(body.len(), 11);
    assert_eq!(&body.read_to_end().await.unwrap()[..], b"Hello world");
    assert_eq!(body.finish().await.unwrap().seq(), 2);

    let updated = conn
        .store(
            &SequenceSet::single(2).unwrap(),
            StoreAction::Add(vec![Flag::Seen]),
            false,
        )
        .await
        .unwrap();
    assert_eq!(updated.len(), 1);
    assert!(updated[0].1.is_seen());

    assert_eq!(conn.expunge().await.unwrap(), vec![3]);
    assert_eq!(conn.mailbox_status().exists, 2);

    conn.logout().await.unwrap();
    assert!(conn.is_closed());
    assert!(matches!(conn.noop().await, Err(Error::ConnectionClosed)));
}

#[tokio::test]
async fn test_unsolicited_updates_during_fetch() {
    let mock = Builder::new()
        .read(b"* PREAUTH IMAP4rev1 server ready\r\n")
        .write(b"A0001 SELECT INBOX\r\n")
        .read(b"* 4 EXISTS\r\nA0001 OK [READ-WRITE] SELECT completed\r\n")
        .write(b"A0002 FETCH 1:* FLAGS\r\n")
        .read(b"* 1 FETCH (FLAGS (\\Seen))\r\n")
        .read(b"* 2 EXPUNGE\r\n")
        .read(b"* 4 EXISTS\r\n")
        .read(b"* 2 FETCH (FLAGS ())\r\n")
        .read(b"A0002 OK FETCH completed\r\n")
        .build();

    let mut conn = Connection::connect(mock).await.unwrap();
    conn.select(&Mailbox::inbox()).await.unwrap();

    let mut subjects = SequenceCache::new();
    for seq in 1..=4 {
        subjects.insert(seq, format!("subject {seq}"));
    }
    let events = CollectingHandler::new();
    conn.set_handler(events.clone());

    let messages = conn
        .fetch(&SequenceSet::All, &[FetchAttribute::Flags])
        .await
        .unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(conn.mailbox_status().exists, 4);

    for event in events.take() {
        match event {
            UnsolicitedEvent::Expunge(seq) => {
                subjects.expunge(seq);
            }
            UnsolicitedEvent::Exists(count, _) => subjects.truncate(count),
            _ => {}
        }
    }
    assert_eq!(subjects.len(), 3);
    assert_eq!(subjects.get(2).map(String::as_str), Some("subject 3"));
    assert_eq!(subjects.get(3).map(String::as_str), Some("subject 4"));
}

/// Hands out one scripted stream.
struct OneShot(StdMutex<Option<Mock>>);

impl Connector for OneShot {
    type Stream = Mock;

    async fn connect(&self) -> Result<Connection<Mock>> {
        let mock = self.0.lock().unwrap().take();
        match mock {
            Some(mock) => Connection::connect(mock).await,
            None => Err(Error::ConnectionClosed),
        }
    }
}

#[tokio::test]
async fn test_session_lifecycle() {
    let mock = Builder::new()
        .read(b"* OK ready\r\n")
        .write(b"A0001 LOGIN alice secret\r\n")
        .read(b"A0001 OK Logged in\r\n")
        .write(b"A0002 LIST \"\" \"*\"\r\n")
        .read(b"* LIST () \"/\" INBOX\r\n* LIST () \"/\" Sent\r\nA0002 OK\r\n")
        .write(b"A0003 NOOP\r\n")
        .read(b"A0003 OK\r\n")
        .write(b"A0004 SELECT INBOX\r\n")
        .read(b"* 2 EXISTS\r\nA0004 OK [READ-WRITE] SELECT completed\r\n")
        .write(b"A0005 NOOP\r\n")
        .read(b"* 1 EXPUNGE\r\nA0005 OK\r\n")
        .write(b"A0006 LOGOUT\r\n")
        .read(b"* BYE\r\nA0006 OK\r\n")
        .build();

    let session = Session::new(
        OneShot(StdMutex::new(Some(mock))),
        SessionConfig::new("alice", "secret"),
    );
    let mut events = session.subscribe_events();

    assert_eq!(session.folders().await.unwrap().len(), 2);
    assert!(session.listing().is_cached());
    assert_eq!(session.folders().await.unwrap().len(), 2);

    {
        let mut inbox = session.checkout_mailbox(&Mailbox::inbox()).await.unwrap();
        inbox.noop().await.unwrap();
        assert_eq!(inbox.mailbox_status().exists, 1);
    }
    assert!(!session.listing().is_cached());

    session.close().await.unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(seen.contains(&SessionEvent::Expunged(1)));
    assert!(
        seen.iter()
            .any(|e| matches!(e, SessionEvent::Disconnected(_)))
    );
}
