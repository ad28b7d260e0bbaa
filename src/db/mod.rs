//! Database module.
//!
//! This module owns the connection to the contact-center database a
//! client records its emails into. One connection is opened per
//! cycle, so the last inserted row id always belongs to the current
//! client.

use log::{debug, trace};
use rusqlite::{Connection, Transaction};
use std::{path::PathBuf, result};
use thiserror::Error;

use crate::DbConfig;

const CREATE_LEADS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS vicidial_list (
        lead_id    INTEGER PRIMARY KEY AUTOINCREMENT,
        email      TEXT,
        first_name TEXT,
        last_name  TEXT
    )
";

const CREATE_LEADS_INDEX: &str = "
    CREATE INDEX IF NOT EXISTS vicidial_list_email
    ON vicidial_list (email)
";

const CREATE_GROUPS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS vicidial_inbound_groups (
        group_id TEXT NOT NULL,
        email    TEXT
    )
";

const CREATE_EMAILS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS vicidial_email_list (
        email_row_id              INTEGER PRIMARY KEY AUTOINCREMENT,
        lead_id                   INTEGER NOT NULL,
        protocol                  TEXT    NOT NULL,
        email_date                DATETIME,
        email_to                  TEXT,
        email_from                TEXT,
        email_from_name           TEXT,
        subject                   TEXT,
        mime_type                 TEXT,
        content_type              TEXT,
        content_transfer_encoding TEXT,
        x_mailer                  TEXT,
        sender_ip                 TEXT,
        message                   TEXT,
        email_account_id          TEXT,
        group_id                  TEXT,
        status                    TEXT,
        direction                 TEXT
    )
";

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot open database {1}")]
    OpenDatabaseError(#[source] rusqlite::Error, PathBuf),
    #[error("cannot create database schema")]
    CreateSchemaError(#[source] rusqlite::Error),
    #[error("cannot begin database transaction")]
    BeginTransactionError(#[source] rusqlite::Error),
    #[error("cannot commit database transaction")]
    CommitTransactionError(#[source] rusqlite::Error),
    #[error("cannot close database")]
    CloseDatabaseError(#[source] rusqlite::Error),
}

pub type Result<T> = result::Result<T, Error>;

/// Wraps one connection to the database of a client.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens the database described by the given config, creating the
    /// missing tables.
    pub fn open(config: &DbConfig) -> Result<Self> {
        let path = config.path();
        debug!(
            "opening database {} as {} on {}",
            config.name,
            config.user,
            path.display()
        );

        let conn =
            Connection::open(&path).map_err(|err| Error::OpenDatabaseError(err, path.clone()))?;
        Self::from_connection(conn)
    }

    /// Opens a private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|err| Error::OpenDatabaseError(err, PathBuf::from(":memory:")))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        trace!("creating database schema");
        for stmt in [
            CREATE_LEADS_TABLE,
            CREATE_LEADS_INDEX,
            CREATE_GROUPS_TABLE,
            CREATE_EMAILS_TABLE,
        ] {
            conn.execute(stmt, []).map_err(Error::CreateSchemaError)?;
        }
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Begins a transaction. Dropping it without committing rolls it
    /// back.
    pub fn transaction(&mut self) -> Result<Transaction<'_>> {
        self.conn
            .transaction()
            .map_err(Error::BeginTransactionError)
    }

    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, err)| Error::CloseDatabaseError(err))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use crate::DbConfig;

    use super::*;

    #[test]
    fn test_open_creates_schema_once() {
        let dir = tempdir().unwrap();
        let config = DbConfig {
            host: Some(dir.path().to_string_lossy().to_string()),
            user: "mailbot".into(),
            name: "asterisk".into(),
            ..DbConfig::default()
        };

        let db = Database::open(&config).unwrap();
        db.connection()
            .execute(
                "INSERT INTO vicidial_inbound_groups (group_id, email) VALUES ('SALES', 'a@b.c')",
                [],
            )
            .unwrap();
        db.close().unwrap();

        assert!(dir.path().join("asterisk.sqlite").is_file());

        let db = Database::open(&config).unwrap();
        let count: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM vicidial_inbound_groups", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(1, count);
    }

    #[test]
    fn test_uncommitted_transaction_rolls_back() {
        let mut db = Database::open_in_memory().unwrap();

        {
            let tx = db.transaction().unwrap();
            tx.execute("INSERT INTO vicidial_list (email) VALUES ('a@b.c')", [])
                .unwrap();
        }

        let count: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM vicidial_list", [], |row| row.get(0))
            .unwrap();
        assert_eq!(0, count);
    }
}
