//! Backend module.
//!
//! This module exposes the backend and session traits, and the fetch
//! procedure built on top of them: open a session, select the folder,
//! search the matching messages, fetch and parse them one by one.

use log::{debug, trace, warn};

use crate::{backend::imap::Result, Limits, MailConfig, ParsedMessage, RawMessage};

/// Opens authenticated sessions on a mail server.
pub trait Backend {
    type Session: MailSession;

    fn connect(&self, config: &MailConfig) -> Result<Self::Session>;
}

/// Represents an authenticated session on a mail server.
pub trait MailSession {
    fn select_folder(&mut self, folder: &str) -> Result<()>;
    /// Searches the uids of the messages matching the query, in
    /// ascending order.
    fn search_uids(&mut self, query: &str) -> Result<Vec<u32>>;
    fn fetch_message(&mut self, uid: u32) -> Result<RawMessage>;
    fn close_folder(&mut self) -> Result<()>;
    fn logout(&mut self) -> Result<()>;
}

/// Fetches and parses the messages of the configured folder.
///
/// Connection, login, selection and search errors abort the fetch.
/// A message that cannot be fetched or parsed is logged and skipped.
pub fn fetch<B: Backend>(
    backend: &B,
    config: &MailConfig,
    limits: &Limits,
) -> Result<Vec<ParsedMessage>> {
    let mut session = backend.connect(config)?;
    let msgs = fetch_messages(&mut session, config, limits);

    if let Err(err) = session.logout() {
        warn!("{}", err);
        debug!("{:?}", err);
    }

    msgs
}

/// Fetches and parses the messages of the configured folder using an
/// already opened session. The folder is always closed once selected.
pub fn fetch_messages<S: MailSession>(
    session: &mut S,
    config: &MailConfig,
    limits: &Limits,
) -> Result<Vec<ParsedMessage>> {
    session.select_folder(&config.folder)?;
    let msgs = fetch_selected(session, config, limits);

    if let Err(err) = session.close_folder() {
        warn!("{}", err);
        debug!("{:?}", err);
    }

    msgs
}

fn fetch_selected<S: MailSession>(
    session: &mut S,
    config: &MailConfig,
    limits: &Limits,
) -> Result<Vec<ParsedMessage>> {
    let query = config.search_query();
    let uids = session.search_uids(query)?;
    debug!("found {} {} messages in {}", uids.len(), query, config.folder);
    trace!("uids: {:?}", uids);

    let mut msgs = Vec::with_capacity(uids.len());

    for uid in uids {
        let raw = match session.fetch_message(uid) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("skipping message {}: {}", uid, err);
                debug!("{:?}", err);
                continue;
            }
        };

        match ParsedMessage::from_raw(&raw, limits) {
            Ok(msg) => {
                debug!("{}", msg);
                msgs.push(msg);
            }
            Err(err) => {
                warn!("skipping message {}: {}", uid, err);
                debug!("{:?}", err);
            }
        }
    }

    Ok(msgs)
}

#[cfg(test)]
mod tests {
    use std::io;

    use crate::{backend::imap::Error, Limits, MailConfig, RawMessage};

    use super::*;

    #[derive(Default)]
    struct Session {
        uids: Vec<u32>,
        queries: Vec<String>,
        closed: bool,
    }

    impl MailSession for Session {
        fn select_folder(&mut self, _folder: &str) -> Result<()> {
            Ok(())
        }

        fn search_uids(&mut self, query: &str) -> Result<Vec<u32>> {
            self.queries.push(query.to_owned());
            Ok(self.uids.clone())
        }

        fn fetch_message(&mut self, uid: u32) -> Result<RawMessage> {
            if uid == 2 {
                let err = io::Error::new(io::ErrorKind::Other, "gone");
                return Err(Error::FetchMsgError(imap::Error::Io(err), uid));
            }
            Ok(RawMessage::new(
                uid,
                format!("From: a@b.c\r\nTo: d@e.f\r\nSubject: {}\r\n\r\nhi", uid),
            ))
        }

        fn close_folder(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }

        fn logout(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_fetch_skips_failed_messages() {
        let mut session = Session {
            uids: vec![1, 2, 3],
            ..Session::default()
        };
        let config = MailConfig {
            folder: "Inbox".into(),
            ..MailConfig::default()
        };

        let msgs = fetch_messages(&mut session, &config, &Limits::default()).unwrap();

        let uids: Vec<_> = msgs.iter().map(|msg| msg.uid.as_str()).collect();
        assert_eq!(vec!["1", "3"], uids);
        assert_eq!(vec!["UNSEEN"], session.queries);
        assert!(session.closed);
    }
}
