//! Config module.
//!
//! This module contains everything related to the configuration: one
//! or more TOML files, each made of named sections. The `[logging]`
//! section configures logging, every other section describes one
//! client job.

pub mod client;
pub use client::*;

pub mod logging;
pub use logging::*;

use log::{debug, trace};
use std::{env, fs, io, path::PathBuf, result, str::FromStr};
use thiserror::Error;

use crate::process;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot expand config path {1}")]
    ExpandPathError(#[source] shellexpand::LookupError<env::VarError>, String),
    #[error("cannot parse config path pattern {1}")]
    ParsePathPatternError(#[source] glob::PatternError, String),
    #[error("cannot read config path")]
    ReadPathError(#[source] glob::GlobError),
    #[error("cannot find any config file matching {0}")]
    FindConfigFileError(String),
    #[error("cannot read config file {1}")]
    ReadConfigFileError(#[source] io::Error, PathBuf),
    #[error("cannot parse config file {1}")]
    ParseConfigFileError(#[source] toml::de::Error, PathBuf),
    #[error("cannot parse config")]
    ParseConfigError(#[source] toml::de::Error),
    #[error("cannot parse config section {1}")]
    ParseSectionError(#[source] toml::de::Error, String),
    #[error("cannot find any client section in config")]
    FindClientSectionError,
    #[error("cannot find option {1} in config section {0}")]
    MissingOptionError(String, &'static str),
    #[error("cannot parse size {0}")]
    ParseSizeError(String),
    #[error("cannot rotate log file: no log file given")]
    RotateWithoutLogfileError,

    #[error("cannot get mail password of {0}: no password nor password command given")]
    GetPasswdMissingError(String),
    #[error("cannot get mail password")]
    GetPasswdError(#[source] process::Error),
    #[error("cannot get mail password: password is empty")]
    GetPasswdEmptyError,
}

pub type Result<T> = result::Result<T, Error>;

/// Represents the whole configuration.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Config {
    pub logging: LoggingConfig,
    pub clients: Vec<ClientConfig>,
}

impl Config {
    /// Loads the configuration from the files matching the given
    /// shell patterns. Sections of later files override sections of
    /// the same name in earlier files.
    pub fn from_paths<P: AsRef<str>>(patterns: &[P]) -> Result<Self> {
        let mut sections = toml::Table::new();

        for path in expand_paths(patterns)? {
            debug!("reading config file {:?}", path);
            let content = fs::read_to_string(&path)
                .map_err(|err| Error::ReadConfigFileError(err, path.clone()))?;
            let table: toml::Table = toml::from_str(&content)
                .map_err(|err| Error::ParseConfigFileError(err, path.clone()))?;
            sections.extend(table);
        }

        Self::from_sections(sections)
    }

    /// Builds the configuration from already parsed sections.
    pub fn from_sections(sections: toml::Table) -> Result<Self> {
        let mut config = Self::default();

        for (name, section) in sections {
            trace!("config section {}: {:?}", name, section);

            if name == LOGGING_SECTION {
                let section: LoggingSection = section
                    .try_into()
                    .map_err(|err| Error::ParseSectionError(err, name.clone()))?;
                config.logging = LoggingConfig::try_from(section)?;
                continue;
            }

            let section: ClientSection = section
                .try_into()
                .map_err(|err| Error::ParseSectionError(err, name.clone()))?;
            config.clients.push(ClientConfig::from_section(name, section)?);
        }

        if config.clients.is_empty() {
            return Err(Error::FindClientSectionError);
        }

        Ok(config)
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(content: &str) -> Result<Self> {
        let sections = toml::from_str(content).map_err(Error::ParseConfigError)?;
        Self::from_sections(sections)
    }
}

/// Expands the given shell patterns (`~`, environment variables and
/// globs) into the list of matching paths.
pub fn expand_paths<P: AsRef<str>>(patterns: &[P]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        let pattern = pattern.as_ref();
        let expanded = shellexpand::full(pattern)
            .map_err(|err| Error::ExpandPathError(err, pattern.to_owned()))?;
        let entries = glob::glob(&expanded)
            .map_err(|err| Error::ParsePathPatternError(err, pattern.to_owned()))?;
        for entry in entries {
            paths.push(entry.map_err(Error::ReadPathError)?);
        }
    }

    if paths.is_empty() {
        let patterns = patterns
            .iter()
            .map(|pattern| pattern.as_ref())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(Error::FindConfigFileError(patterns));
    }

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use std::{fs, time::Duration};

    use super::*;

    #[test]
    fn test_from_str() {
        let config: Config = r#"
            [logging]
            verbose = true
            logfile = "mailbot"
            maxbytes = "10K"

            [sales]
            mailuser = "sales@localhost"
            mailpassword = "password"
            dbhost = "/tmp"
            interval = 0

            [support]
            mailuser = "support@localhost"
            mailhost = "imap.localhost"
            mailfolder = "Support"
            checkall = true
            dbname = "crm"
            dbport = 3306
        "#
        .parse()
        .unwrap();

        assert!(config.logging.verbose);
        assert_eq!(10 << 10, config.logging.max_bytes);
        assert_eq!(2, config.clients.len());

        let sales = config.clients.iter().find(|c| c.name == "sales").unwrap();
        assert_eq!("sales@localhost", sales.mail.user);
        assert_eq!(Some("password".into()), sales.mail.password);
        assert_eq!(None, sales.interval);
        assert_eq!(PathBuf::from("/tmp/asterisk.sqlite"), sales.db.path());

        let support = config.clients.iter().find(|c| c.name == "support").unwrap();
        assert_eq!("imap.localhost", support.mail.host);
        assert_eq!("Support", support.mail.folder);
        assert!(support.mail.checkall);
        assert_eq!("crm", support.db.name);
        assert_eq!(Some(3306), support.db.port);
        assert_eq!(Some(Duration::from_secs(60)), support.interval);
    }

    #[test]
    fn test_unknown_option() {
        let res = r#"
            [support]
            mailuser = "support@localhost"
            mailsever = "typo.localhost"
        "#
        .parse::<Config>();

        assert!(matches!(res, Err(Error::ParseSectionError(_, name)) if name == "support"));
    }

    #[test]
    fn test_logging_only() {
        let res = "[logging]\nverbose = false\n".parse::<Config>();
        assert!(matches!(res, Err(Error::FindClientSectionError)));
    }

    #[test]
    fn test_from_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.conf"),
            "[sales]\nmailuser = \"sales@localhost\"\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("b.conf"),
            "[sales]\nmailuser = \"other@localhost\"\n[support]\nmailuser = \"support@localhost\"\n",
        )
        .unwrap();
        fs::write(dir.path().join("ignored.txt"), "not toml at all [").unwrap();

        let pattern = dir.path().join("*.conf").to_string_lossy().to_string();
        let config = Config::from_paths(&[pattern]).unwrap();

        assert_eq!(2, config.clients.len());
        let sales = config.clients.iter().find(|c| c.name == "sales").unwrap();
        assert_eq!("other@localhost", sales.mail.user);
    }

    #[test]
    fn test_from_paths_without_match() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = dir.path().join("*.conf").to_string_lossy().to_string();

        let res = Config::from_paths(&[pattern]);
        assert!(matches!(res, Err(Error::FindConfigFileError(_))));
    }
}
