//! Lead module.
//!
//! This module maps a message to the lead of its sender, creating the
//! lead on first sighting, and to the inbound group of its recipient.

use log::debug;
use rusqlite::{Connection, OptionalExtension};
use std::result;
use thiserror::Error;

use crate::{Mailbox, ParsedMessage};

pub const UNKNOWN_GROUP: &str = "Unknown";
pub const UNKNOWN_NAME: &str = "UNKNOWN";

pub const SELECT_LEAD: &str = "SELECT lead_id FROM vicidial_list WHERE email = ?";
pub const INSERT_LEAD: &str =
    "INSERT INTO vicidial_list (email, first_name, last_name) VALUES (?, ?, ?)";
pub const SELECT_GROUP: &str = "SELECT group_id FROM vicidial_inbound_groups WHERE email = ?";

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot resolve lead of message {0}: sender address is missing")]
    MissingSenderError(String),
    #[error("cannot find lead of {1}")]
    SelectLeadError(#[source] rusqlite::Error, String),
    #[error("cannot create lead for {1}")]
    InsertLeadError(#[source] rusqlite::Error, String),
    #[error("cannot find inbound group of {1}")]
    SelectGroupError(#[source] rusqlite::Error, String),
}

impl Error {
    /// Gets the statement that failed, if any.
    pub fn statement(&self) -> Option<&'static str> {
        match self {
            Self::MissingSenderError(_) => None,
            Self::SelectLeadError(..) => Some(SELECT_LEAD),
            Self::InsertLeadError(..) => Some(INSERT_LEAD),
            Self::SelectGroupError(..) => Some(SELECT_GROUP),
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Represents the lead and the inbound group a message belongs to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Resolution {
    pub lead_id: i64,
    pub group: String,
}

/// Resolves the lead and the inbound group of the given message. The
/// lead table is only written when the sender was never seen before.
pub fn resolve(conn: &Connection, msg: &ParsedMessage) -> Result<Resolution> {
    let sender = msg
        .from
        .as_ref()
        .ok_or_else(|| Error::MissingSenderError(msg.uid.clone()))?;

    let lead_id = resolve_lead(conn, sender)?;
    let group = resolve_group(conn, msg.recipient_addr())?;

    Ok(Resolution { lead_id, group })
}

/// Finds the lead matching exactly the sender address, or creates a
/// new one named after the sender display name.
pub fn resolve_lead(conn: &Connection, sender: &Mailbox) -> Result<i64> {
    let addr = sender.addr.as_str();

    let lead_id: Option<i64> = conn
        .query_row(SELECT_LEAD, [addr], |row| row.get(0))
        .optional()
        .map_err(|err| Error::SelectLeadError(err, addr.to_owned()))?;

    if let Some(lead_id) = lead_id {
        debug!("matched lead {} to {}", lead_id, addr);
        return Ok(lead_id);
    }

    debug!("cannot find lead for {}, creating it", addr);
    let (first_name, last_name) = split_name(sender.name.as_deref());
    conn.execute(INSERT_LEAD, [addr, first_name.as_str(), last_name.as_str()])
        .map_err(|err| Error::InsertLeadError(err, addr.to_owned()))?;
    let lead_id = conn.last_insert_rowid();
    debug!("created lead {} for {}", lead_id, addr);

    Ok(lead_id)
}

/// Finds the inbound group of the recipient address. Unmapped and
/// missing recipients belong to the [`UNKNOWN_GROUP`].
pub fn resolve_group(conn: &Connection, recipient: Option<&str>) -> Result<String> {
    let recipient = match recipient {
        Some(recipient) => recipient,
        None => return Ok(UNKNOWN_GROUP.to_owned()),
    };

    let group: Option<String> = conn
        .query_row(SELECT_GROUP, [recipient], |row| row.get(0))
        .optional()
        .map_err(|err| Error::SelectGroupError(err, recipient.to_owned()))?;
    let group = group.unwrap_or_else(|| UNKNOWN_GROUP.to_owned());
    debug!("inbound group of {} is {}", recipient, group);

    Ok(group)
}

/// Splits a display name into a first name (the first word) and a
/// last name (the other words). Missing parts are [`UNKNOWN_NAME`].
pub fn split_name(name: Option<&str>) -> (String, String) {
    let mut words = name.unwrap_or_default().split_whitespace();

    let first_name = words.next().unwrap_or(UNKNOWN_NAME).to_owned();
    let last_name = words.collect::<Vec<_>>().join(" ");
    let last_name = if last_name.is_empty() {
        UNKNOWN_NAME.to_owned()
    } else {
        last_name
    };

    (first_name, last_name)
}
