//! Client config module.
//!
//! This module contains the representation of one client job: a
//! mailbox to poll and the database to record its emails into.

use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

use crate::{
    config::{Error, Result},
    process,
};

pub const DEFAULT_DB_USER: &str = "mailbot";
pub const DEFAULT_DB_NAME: &str = "asterisk";
pub const DEFAULT_MAIL_HOST: &str = "mail.lcn.com";
pub const DEFAULT_MAIL_PORT: u16 = 993;
pub const DEFAULT_MAIL_SSL: bool = true;
pub const DEFAULT_MAIL_INSECURE: bool = false;
pub const DEFAULT_MAIL_FOLDER: &str = "Inbox";
pub const DEFAULT_CHECKALL: bool = false;
pub const DEFAULT_INTERVAL: u64 = 60;
pub const DEFAULT_SUBJECT_LIMIT: usize = 200;
pub const DEFAULT_NAME_LIMIT: usize = 80;

/// Represents one client section as found in a config file. Every
/// option is optional, defaults are applied by
/// [`ClientConfig::from_section`].
#[derive(Debug, Default, Clone, Eq, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientSection {
    pub dbhost: Option<String>,
    pub dbuser: Option<String>,
    pub dbpassword: Option<String>,
    pub dbport: Option<u16>,
    pub dbname: Option<String>,
    pub mailhost: Option<String>,
    pub mailport: Option<u16>,
    pub mailssl: Option<bool>,
    pub mailinsecure: Option<bool>,
    pub mailuser: Option<String>,
    pub mailpassword: Option<String>,
    pub mailpasswordcmd: Option<String>,
    pub mailfolder: Option<String>,
    pub checkall: Option<bool>,
    pub interval: Option<u64>,
    pub subjectlimit: Option<usize>,
    pub namelimit: Option<usize>,
}

/// Represents the mailbox side of a client job.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct MailConfig {
    /// Represents the IMAP server host.
    pub host: String,
    /// Represents the IMAP server port.
    pub port: u16,
    /// Enables TLS. Only disabled against local test servers.
    pub ssl: bool,
    /// Trusts any certificate.
    pub insecure: bool,
    /// Represents the IMAP login, which is the email address.
    pub user: String,
    /// Represents the IMAP password.
    pub password: Option<String>,
    /// Represents the command printing the IMAP password.
    pub password_cmd: Option<String>,
    /// Represents the folder to poll.
    pub folder: String,
    /// Fetches all emails instead of unseen ones only.
    pub checkall: bool,
}

impl MailConfig {
    /// Gets the IMAP password, running the password command when no
    /// plain password is configured.
    pub fn passwd(&self) -> Result<String> {
        if let Some(passwd) = self.password.as_ref() {
            return Ok(passwd.to_owned());
        }

        let cmd = self
            .password_cmd
            .as_ref()
            .ok_or_else(|| Error::GetPasswdMissingError(self.user.clone()))?;
        let passwd = process::run(cmd).map_err(Error::GetPasswdError)?;
        let passwd = passwd
            .lines()
            .next()
            .filter(|passwd| !passwd.is_empty())
            .ok_or(Error::GetPasswdEmptyError)?;

        Ok(passwd.to_owned())
    }

    /// Returns `true` when neither a password nor a password command
    /// is configured.
    pub fn lacks_passwd(&self) -> bool {
        self.password.is_none() && self.password_cmd.is_none()
    }

    /// Gets the IMAP search query matching the fetch mode.
    pub fn search_query(&self) -> &'static str {
        if self.checkall {
            "ALL"
        } else {
            "UNSEEN"
        }
    }
}

/// Represents the database side of a client job.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct DbConfig {
    /// Represents the directory holding the database.
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: String,
    pub password: Option<String>,
    pub name: String,
}

impl DbConfig {
    /// Gets the database file path: `<name>.sqlite`, inside the host
    /// directory when one is given.
    pub fn path(&self) -> PathBuf {
        let file = format!("{}.sqlite", self.name);

        match self.host.as_ref() {
            Some(host) => {
                let dir = shellexpand::full(host)
                    .map(|dir| dir.to_string())
                    .unwrap_or_else(|_| host.to_owned());
                PathBuf::from(dir).join(file)
            }
            None => PathBuf::from(file),
        }
    }
}

/// Represents the maximum lengths (in chars) of the parsed fields.
/// `None` disables truncation.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Limits {
    pub subject: Option<usize>,
    pub name: Option<usize>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            subject: Some(DEFAULT_SUBJECT_LIMIT),
            name: Some(DEFAULT_NAME_LIMIT),
        }
    }
}

impl Limits {
    pub const UNLIMITED: Limits = Limits {
        subject: None,
        name: None,
    };

    /// Builds limits from raw options, where 0 means unlimited.
    pub fn new(subject: usize, name: usize) -> Self {
        let limit = |max: usize| if max == 0 { None } else { Some(max) };
        Self {
            subject: limit(subject),
            name: limit(name),
        }
    }

    pub fn truncate_subject(&self, subject: &str) -> String {
        truncate(subject, self.subject)
    }

    /// Truncates display names and addresses.
    pub fn truncate_name(&self, name: &str) -> String {
        truncate(name, self.name)
    }
}

fn truncate(value: &str, max: Option<usize>) -> String {
    match max {
        Some(max) => value.chars().take(max).collect(),
        None => value.to_owned(),
    }
}

/// Represents one client job: poll one mailbox, record its emails in
/// one database.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct ClientConfig {
    /// Represents the section name, used in logs.
    pub name: String,
    pub mail: MailConfig,
    pub db: DbConfig,
    /// Represents the time between two cycles. `None` runs a single
    /// cycle.
    pub interval: Option<Duration>,
    pub limits: Limits,
}

impl ClientConfig {
    /// Builds a client config from a config file section, applying
    /// defaults and checking required options.
    pub fn from_section<N: ToString>(name: N, section: ClientSection) -> Result<Self> {
        let name = name.to_string();

        let user = section
            .mailuser
            .filter(|user| !user.is_empty())
            .ok_or_else(|| Error::MissingOptionError(name.clone(), "mailuser"))?;

        let mail = MailConfig {
            host: section
                .mailhost
                .unwrap_or_else(|| DEFAULT_MAIL_HOST.to_owned()),
            port: section.mailport.unwrap_or(DEFAULT_MAIL_PORT),
            ssl: section.mailssl.unwrap_or(DEFAULT_MAIL_SSL),
            insecure: section.mailinsecure.unwrap_or(DEFAULT_MAIL_INSECURE),
            user,
            password: section.mailpassword,
            password_cmd: section.mailpasswordcmd,
            folder: section
                .mailfolder
                .unwrap_or_else(|| DEFAULT_MAIL_FOLDER.to_owned()),
            checkall: section.checkall.unwrap_or(DEFAULT_CHECKALL),
        };

        let db = DbConfig {
            host: section.dbhost,
            port: section.dbport,
            user: section.dbuser.unwrap_or_else(|| DEFAULT_DB_USER.to_owned()),
            password: section.dbpassword,
            name: section.dbname.unwrap_or_else(|| DEFAULT_DB_NAME.to_owned()),
        };

        let interval = match section.interval.unwrap_or(DEFAULT_INTERVAL) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let limits = Limits::new(
            section.subjectlimit.unwrap_or(DEFAULT_SUBJECT_LIMIT),
            section.namelimit.unwrap_or(DEFAULT_NAME_LIMIT),
        );

        Ok(Self {
            name,
            mail,
            db,
            interval,
            limits,
        })
    }
}
