#![allow(dead_code)]

use std::{
    collections::HashSet,
    io,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use mailbot::{
    backend::{Error, Result},
    Backend, ClientConfig, Database, DbConfig, Limits, MailConfig, MailSession, RawMessage,
};

/// Represents the mailbox shared between a backend and its sessions.
#[derive(Default)]
pub struct Mailbox {
    pub messages: Vec<(u32, Vec<u8>)>,
    pub seen: HashSet<u32>,
    pub broken: HashSet<u32>,
    pub connect_error: Option<fn(&MailConfig) -> Error>,
    pub select_error: bool,
    pub queries: Vec<String>,
    pub connections: usize,
    pub closings: usize,
}

/// Serves messages from memory instead of an IMAP server.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    mailbox: Arc<Mutex<Mailbox>>,
}

impl MemoryBackend {
    pub fn with_messages<M: Into<Vec<u8>>>(messages: Vec<M>) -> Self {
        let backend = Self::default();
        backend.mailbox().messages = messages
            .into_iter()
            .zip(1..)
            .map(|(msg, uid)| (uid, msg.into()))
            .collect();
        backend
    }

    pub fn mailbox(&self) -> MutexGuard<Mailbox> {
        self.mailbox.lock().unwrap()
    }
}

impl Backend for MemoryBackend {
    type Session = MemorySession;

    fn connect(&self, config: &MailConfig) -> Result<Self::Session> {
        let mut mailbox = self.mailbox();
        if let Some(connect_error) = mailbox.connect_error {
            return Err(connect_error(config));
        }
        mailbox.connections += 1;

        Ok(MemorySession {
            mailbox: self.mailbox.clone(),
        })
    }
}

pub struct MemorySession {
    mailbox: Arc<Mutex<Mailbox>>,
}

impl MailSession for MemorySession {
    fn select_folder(&mut self, folder: &str) -> Result<()> {
        if self.mailbox.lock().unwrap().select_error {
            let err = imap::Error::Io(io::Error::new(io::ErrorKind::Other, "no such folder"));
            return Err(Error::SelectFolderError(err, folder.to_owned()));
        }
        Ok(())
    }

    fn search_uids(&mut self, query: &str) -> Result<Vec<u32>> {
        let mut mailbox = self.mailbox.lock().unwrap();
        mailbox.queries.push(query.to_owned());
        let uids = mailbox
            .messages
            .iter()
            .map(|(uid, _)| *uid)
            .filter(|uid| query == "ALL" || !mailbox.seen.contains(uid))
            .collect();
        Ok(uids)
    }

    fn fetch_message(&mut self, uid: u32) -> Result<RawMessage> {
        let mut mailbox = self.mailbox.lock().unwrap();
        if mailbox.broken.contains(&uid) {
            let err = imap::Error::Io(io::Error::new(io::ErrorKind::Other, "broken message"));
            return Err(Error::FetchMsgError(err, uid));
        }
        let raw = mailbox
            .messages
            .iter()
            .find(|(id, _)| *id == uid)
            .map(|(_, raw)| raw.clone())
            .ok_or(Error::FindMsgError(uid))?;
        mailbox.seen.insert(uid);
        Ok(RawMessage::new(uid, raw))
    }

    fn close_folder(&mut self) -> Result<()> {
        self.mailbox.lock().unwrap().closings += 1;
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        Ok(())
    }
}

pub fn client_config(name: &str, db_dir: &Path) -> ClientConfig {
    ClientConfig {
        name: name.into(),
        mail: MailConfig {
            host: "mail.y.com".into(),
            port: 993,
            ssl: true,
            user: "support@y.com".into(),
            password: Some("password".into()),
            folder: "Inbox".into(),
            ..MailConfig::default()
        },
        db: DbConfig {
            host: Some(db_dir.to_string_lossy().to_string()),
            user: "mailbot".into(),
            name: "asterisk".into(),
            ..DbConfig::default()
        },
        interval: None,
        limits: Limits::default(),
    }
}

pub fn count(db: &Database, table: &str) -> i64 {
    db.connection()
        .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })
        .unwrap()
}
