//! Email record module.
//!
//! An email record is the row appended to `vicidial_email_list` for
//! each processed message. Records are never updated.

use log::{debug, warn};
use rusqlite::{params, Connection};
use std::result;
use thiserror::Error;

use crate::{ParsedMessage, Resolution};

pub const PROTOCOL: &str = "IMAP";
pub const ACCOUNT: &str = "MAILBOT";
pub const STATUS: &str = "NEW";
pub const DIRECTION: &str = "INBOUND";

/// Stands for the date of messages whose date could not be parsed.
pub const DATE_SENTINEL: &str = "1970-01-01 00:00:00";
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const INSERT_EMAIL: &str = "
    INSERT INTO vicidial_email_list (
        lead_id,
        protocol,
        email_date,
        email_to,
        email_from,
        email_from_name,
        subject,
        mime_type,
        content_type,
        content_transfer_encoding,
        x_mailer,
        sender_ip,
        message,
        email_account_id,
        group_id,
        status,
        direction
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
";

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot insert email record of message {1}")]
    InsertEmailError(#[source] rusqlite::Error, String),
}

impl Error {
    /// Gets the statement that failed.
    pub fn statement(&self) -> &'static str {
        match self {
            Self::InsertEmailError(..) => INSERT_EMAIL,
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Represents one `vicidial_email_list` row. Values missing from the
/// message are stored as `NULL`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EmailRecord<'a> {
    pub uid: &'a str,
    pub lead_id: i64,
    pub protocol: &'static str,
    pub email_date: String,
    pub email_to: Option<&'a str>,
    pub email_from: Option<&'a str>,
    pub email_from_name: Option<&'a str>,
    pub subject: Option<&'a str>,
    pub mime_type: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub content_transfer_encoding: Option<&'a str>,
    pub x_mailer: Option<&'a str>,
    pub sender_ip: Option<&'a str>,
    pub message: &'a str,
    pub email_account_id: &'static str,
    pub group_id: &'a str,
    pub status: &'static str,
    pub direction: &'static str,
}

impl<'a> EmailRecord<'a> {
    pub fn new(msg: &'a ParsedMessage, resolution: &'a Resolution) -> Self {
        let email_date = match msg.date {
            Some(date) => date.format(DATE_FORMAT).to_string(),
            None => {
                warn!(
                    "message {} has no valid date, using {}",
                    msg.uid, DATE_SENTINEL
                );
                DATE_SENTINEL.to_owned()
            }
        };

        Self {
            uid: &msg.uid,
            lead_id: resolution.lead_id,
            protocol: PROTOCOL,
            email_date,
            email_to: msg.recipient_addr(),
            email_from: msg.sender_addr(),
            email_from_name: msg.sender_name(),
            subject: msg.subject.as_deref(),
            mime_type: msg.mime_type.as_deref(),
            content_type: msg.content_type.as_deref(),
            content_transfer_encoding: msg.transfer_encoding.as_deref(),
            x_mailer: msg.mailer.as_deref(),
            sender_ip: msg.sender_ip.as_deref(),
            message: &msg.body,
            email_account_id: ACCOUNT,
            group_id: &resolution.group,
            status: STATUS,
            direction: DIRECTION,
        }
    }

    /// Appends the record to the email list. Returns the id of the
    /// inserted row.
    pub fn insert(&self, conn: &Connection) -> Result<i64> {
        conn.execute(
            INSERT_EMAIL,
            params![
                self.lead_id,
                self.protocol,
                self.email_date,
                self.email_to,
                self.email_from,
                self.email_from_name,
                self.subject,
                self.mime_type,
                self.content_type,
                self.content_transfer_encoding,
                self.x_mailer,
                self.sender_ip,
                self.message,
                self.email_account_id,
                self.group_id,
                self.status,
                self.direction,
            ],
        )
        .map_err(|err| Error::InsertEmailError(err, self.uid.to_owned()))?;

        let id = conn.last_insert_rowid();
        debug!("inserted email record {} for message {}", id, self.uid);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::{Database, Mailbox, ParsedMessage, Resolution};

    use super::*;

    fn msg() -> ParsedMessage {
        ParsedMessage {
            uid: "7".into(),
            from: Some(Mailbox::new(Some("Jane Doe"), "jane@x.com")),
            to: Some(Mailbox::new_nameless("support@y.com")),
            subject: Some("It's \"broken\"".into()),
            date: Some(Utc.with_ymd_and_hms(2017, 6, 22, 19, 2, 33).unwrap()),
            body: "Robert'); DROP TABLE vicidial_list; --".into(),
            content_type: Some("text/plain".into()),
            ..ParsedMessage::default()
        }
    }

    fn resolution() -> Resolution {
        Resolution {
            lead_id: 3,
            group: "SALES".into(),
        }
    }

    #[test]
    fn test_insert() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection();
        let (msg, resolution) = (msg(), resolution());

        EmailRecord::new(&msg, &resolution).insert(conn).unwrap();

        let row: (i64, String, String, String, String, Option<String>, String, String, String, String, String) = conn
            .query_row(
                "SELECT lead_id, protocol, email_date, email_from, email_from_name, x_mailer, subject, message, group_id, status, direction FROM vicidial_email_list",
                [],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                        row.get(9)?,
                        row.get(10)?,
                    ))
                },
            )
            .unwrap();

        assert_eq!(3, row.0);
        assert_eq!("IMAP", row.1);
        assert_eq!("2017-06-22 19:02:33", row.2);
        assert_eq!("jane@x.com", row.3);
        assert_eq!("Jane Doe", row.4);
        assert_eq!(None, row.5);
        assert_eq!("It's \"broken\"", row.6);
        assert_eq!("Robert'); DROP TABLE vicidial_list; --", row.7);
        assert_eq!("SALES", row.8);
        assert_eq!("NEW", row.9);
        assert_eq!("INBOUND", row.10);
    }

    #[test]
    fn test_missing_date_uses_sentinel() {
        let msg = ParsedMessage {
            date: None,
            errors: true,
            ..msg()
        };
        let resolution = resolution();

        let record = EmailRecord::new(&msg, &resolution);
        assert_eq!(DATE_SENTINEL, record.email_date);
    }
}
