//! Job module.
//!
//! A job runs the cycles of one client: fetch the new messages of its
//! mailbox, then record each of them in its database.

use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::fmt;

use crate::{
    backend, db, lead, record, Backend, ClientConfig, Database, EmailRecord, ParsedMessage,
};

use super::{Error, Result};

/// Counts what happened to the messages of one cycle.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct CycleReport {
    /// Messages fetched and parsed.
    pub fetched: usize,
    /// Messages recorded in the database.
    pub persisted: usize,
    /// Messages whose recording failed and was rolled back.
    pub failed: usize,
    /// Messages ignored because they have no sender.
    pub skipped: usize,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} fetched, {} persisted, {} failed, {} skipped",
            self.fetched, self.persisted, self.failed, self.skipped
        )
    }
}

/// Represents the error of one message, which never stops the cycle.
#[derive(Debug, thiserror::Error)]
enum PersistError {
    #[error(transparent)]
    LeadError(#[from] lead::Error),
    #[error(transparent)]
    RecordError(#[from] record::Error),
    #[error(transparent)]
    DbError(#[from] db::Error),
}

impl PersistError {
    fn statement(&self) -> Option<&'static str> {
        match self {
            Self::LeadError(err) => err.statement(),
            Self::RecordError(err) => Some(err.statement()),
            Self::DbError(_) => None,
        }
    }
}

pub struct Job<B: Backend> {
    config: ClientConfig,
    backend: B,
}

impl<B: Backend> Job<B> {
    pub fn new(config: ClientConfig, backend: B) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Runs one cycle. Returns `None` when the cycle was aborted by a
    /// mail or database error, which are logged. Only fatal mail
    /// errors are returned.
    pub fn run_cycle(&self) -> Result<Option<CycleReport>> {
        let name = &self.config.name;
        debug!("starting cycle of client {}", name);

        let msgs = match backend::fetch(&self.backend, &self.config.mail, &self.config.limits) {
            Ok(msgs) => msgs,
            Err(err) if err.is_fatal() => return Err(Error::FatalMailError(err, name.clone())),
            Err(err) => {
                log_abort(name, &err);
                if let Some(hint) = err.hint() {
                    error!("{}", hint);
                }
                return Ok(None);
            }
        };

        let mut report = CycleReport {
            fetched: msgs.len(),
            ..CycleReport::default()
        };

        if !msgs.is_empty() {
            let mut db = match Database::open(&self.config.db) {
                Ok(db) => db,
                Err(err) => {
                    log_abort(name, &err);
                    return Ok(None);
                }
            };

            for msg in &msgs {
                self.process(&mut db, msg, &mut report);
            }

            if let Err(err) = db.close() {
                warn!("{}", err);
                debug!("{:?}", err);
            }
        }

        info!("client {}: {}", name, report);
        Ok(Some(report))
    }

    fn process(&self, db: &mut Database, msg: &ParsedMessage, report: &mut CycleReport) {
        if msg.from.is_none() {
            warn!("skipping message {}: sender address is missing", msg.uid);
            report.skipped += 1;
            return;
        }

        match persist(db, msg) {
            Ok(id) => {
                debug!("recorded message {} as email {}", msg.uid, id);
                report.persisted += 1;
            }
            Err(err) => {
                error!("{}", err);
                if let Some(stmt) = err.statement() {
                    error!("failed statement: {}", stmt.trim());
                }
                debug!("{:?}", err);
                report.failed += 1;
            }
        }
    }
}

/// Records the message in its own transaction, rolled back on error.
fn persist(db: &mut Database, msg: &ParsedMessage) -> std::result::Result<i64, PersistError> {
    let tx = db.transaction()?;
    let id = insert(&tx, msg)?;
    tx.commit().map_err(db::Error::CommitTransactionError)?;
    Ok(id)
}

fn insert(conn: &Connection, msg: &ParsedMessage) -> std::result::Result<i64, PersistError> {
    let resolution = lead::resolve(conn, msg)?;
    let id = EmailRecord::new(msg, &resolution).insert(conn)?;
    Ok(id)
}

fn log_abort<E: std::error::Error>(name: &str, err: &E) {
    error!("aborting cycle of client {}: {}", name, err);
    debug!("{:?}", err);
}
