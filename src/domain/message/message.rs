use chrono::{DateTime, TimeZone, Utc};
use log::{trace, warn};
use mailparse::{MailHeaderMap, ParsedMail};
use std::{fmt, result};
use thiserror::Error;

use crate::{Limits, Mailbox};

pub const NO_CONTENT: &str = "*** NO MESSAGE CONTENT ***";

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot parse message {1}")]
    ParseMsgError(#[source] mailparse::MailParseError, String),
}

pub type Result<T> = result::Result<T, Error>;

/// Represents a message as fetched from the mailbox: its unique id
/// and its raw RFC822 content.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RawMessage {
    pub uid: String,
    pub raw: Vec<u8>,
}

impl RawMessage {
    pub fn new<U: ToString, R: Into<Vec<u8>>>(uid: U, raw: R) -> Self {
        Self {
            uid: uid.to_string(),
            raw: raw.into(),
        }
    }
}

/// Represents the fields extracted from a [`RawMessage`]. Fields that
/// may legitimately be missing from a message are optional. `errors`
/// is set whenever the sender, the recipient or the date could not be
/// parsed.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ParsedMessage {
    pub uid: String,
    pub from: Option<Mailbox>,
    pub to: Option<Mailbox>,
    pub subject: Option<String>,
    pub date: Option<DateTime<Utc>>,
    /// Represents the text of the first sub-part, or a placeholder.
    pub body: String,
    /// Tells if the message is multipart. `None` when the content type
    /// is missing or unknown.
    pub multipart: Option<bool>,
    pub mime_type: Option<String>,
    /// Represents the content type, parameters stripped.
    pub content_type: Option<String>,
    pub transfer_encoding: Option<String>,
    pub mailer: Option<String>,
    pub sender_ip: Option<String>,
    pub errors: bool,
}

impl ParsedMessage {
    /// Extracts the fields of the given raw message. Only a message
    /// that cannot be parsed at all is an error, missing or malformed
    /// fields set the `errors` flag instead.
    pub fn from_raw(raw: &RawMessage, limits: &Limits) -> Result<Self> {
        let uid = &raw.uid;
        let parsed = mailparse::parse_mail(&raw.raw)
            .map_err(|err| Error::ParseMsgError(err, uid.to_owned()))?;
        let headers = &parsed.headers;

        for header in headers.iter() {
            trace!("message {} {}: {}", uid, header.get_key(), header.get_value());
        }

        let mut errors = false;

        let to = headers
            .get_first_header("To")
            .and_then(Mailbox::from_header)
            .map(|mbox| mbox.truncate(limits));
        if to.is_none() {
            warn!("cannot parse recipient of message {}", uid);
            errors = true;
        }

        let from = headers
            .get_first_header("From")
            .and_then(Mailbox::from_header)
            .map(|mbox| mbox.truncate(limits));
        if from.is_none() {
            warn!(
                "cannot parse sender {:?} of message {}",
                headers.get_first_value("From"),
                uid
            );
            errors = true;
        }

        let date = parse_date(headers.get_first_value("Date"));
        if date.is_none() {
            warn!(
                "cannot parse date {:?} of message {}",
                headers.get_first_value("Date"),
                uid
            );
            errors = true;
        }

        let subject = headers
            .get_first_value("Subject")
            .filter(|subject| !subject.is_empty())
            .map(|subject| limits.truncate_subject(&subject));

        let ctype = headers.get_first_value("Content-Type");
        let multipart = match ctype.as_ref().map(|ctype| ctype.to_lowercase()) {
            Some(ctype) if ctype.starts_with("text/plain") => Some(false),
            Some(ctype)
                if ctype.starts_with("multipart/mixed")
                    || ctype.starts_with("multipart/alternative") =>
            {
                Some(true)
            }
            Some(ctype) => {
                warn!("message {} has unknown content type {}", uid, ctype);
                None
            }
            None => {
                warn!("message {} has no content type", uid);
                None
            }
        };

        let content_type = ctype.and_then(|ctype| {
            ctype
                .split(';')
                .next()
                .map(|ctype| ctype.trim().to_owned())
                .filter(|ctype| !ctype.is_empty())
        });

        Ok(Self {
            uid: uid.to_owned(),
            from,
            to,
            subject,
            date,
            body: first_part_body(uid, &parsed),
            multipart,
            mime_type: headers.get_first_value("Mime-Type"),
            content_type,
            transfer_encoding: headers.get_first_value("Content-Transfer-Encoding"),
            mailer: headers.get_first_value("X-Mailer"),
            sender_ip: headers.get_first_value("Sender-IP"),
            errors,
        })
    }

    pub fn sender_addr(&self) -> Option<&str> {
        self.from.as_ref().map(|from| from.addr.as_str())
    }

    pub fn sender_name(&self) -> Option<&str> {
        self.from.as_ref().and_then(|from| from.name.as_deref())
    }

    pub fn recipient_addr(&self) -> Option<&str> {
        self.to.as_ref().map(|to| to.addr.as_str())
    }
}

impl fmt::Display for ParsedMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let show = |mbox: &Option<Mailbox>| {
            mbox.as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| String::from("?"))
        };
        write!(
            f,
            "message {} from: {} to: {} date: {} subject: {}",
            self.uid,
            show(&self.from),
            show(&self.to),
            self.date
                .map(|date| date.to_rfc3339())
                .unwrap_or_else(|| String::from("?")),
            self.subject.as_deref().unwrap_or_default(),
        )
    }
}

/// Parses the date header as RFC 2822 first, then leniently.
fn parse_date(date: Option<String>) -> Option<DateTime<Utc>> {
    let date = date?;
    let date = date.trim();

    if let Ok(date) = DateTime::parse_from_rfc2822(date) {
        return Some(date.with_timezone(&Utc));
    }

    // the lenient parser gives the epoch back on garbage, a real epoch
    // date goes through the RFC 2822 parser above
    match mailparse::dateparse(date).ok()? {
        0 => None,
        timestamp => Utc.timestamp_opt(timestamp, 0).single(),
    }
}

/// Gets the text of the first sub-part of the message. Messages
/// without sub-part get a placeholder.
fn first_part_body(uid: &str, parsed: &ParsedMail) -> String {
    match parsed.subparts.first() {
        None => NO_CONTENT.to_owned(),
        Some(part) => match part.get_body() {
            Ok(body) => body,
            Err(err) => {
                warn!("cannot get body of message {}: {}", uid, err);
                NO_CONTENT.to_owned()
            }
        },
    }
}
