//! Logging config module.
//!
//! This module contains the representation of the reserved
//! `[logging]` section.

use serde::Deserialize;
use std::path::PathBuf;

use crate::config::{Error, Result};

pub const LOGGING_SECTION: &str = "logging";
pub const DEFAULT_BACKUP_COUNT: usize = 5;

/// Represents a size option, either a plain number of bytes or a
/// string with a binary suffix like `10M`.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Size {
    Bytes(u64),
    Text(String),
}

/// Represents the `[logging]` section as found in a config file.
#[derive(Debug, Default, Clone, Eq, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    pub verbose: Option<bool>,
    pub logfile: Option<String>,
    pub rotate: Option<bool>,
    pub backupcount: Option<usize>,
    pub maxbytes: Option<Size>,
}

/// Represents the logging configuration, built once at start-up.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LoggingConfig {
    /// Logs at debug level instead of info level.
    pub verbose: bool,
    /// Represents the log file stem, `.log` is appended.
    pub logfile: Option<PathBuf>,
    /// Rolls the log file over at start-up.
    pub rotate: bool,
    /// Represents the number of rolled over log files to keep.
    pub backup_count: usize,
    /// Represents the size a log file can reach before being rolled
    /// over. 0 never rolls over on size.
    pub max_bytes: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            logfile: None,
            rotate: false,
            backup_count: DEFAULT_BACKUP_COUNT,
            max_bytes: 0,
        }
    }
}

impl LoggingConfig {
    /// Gets the path of the log file.
    pub fn logfile_path(&self) -> Option<PathBuf> {
        self.logfile.as_ref().map(|stem| {
            let mut path = stem.clone().into_os_string();
            path.push(".log");
            PathBuf::from(path)
        })
    }
}

impl TryFrom<LoggingSection> for LoggingConfig {
    type Error = Error;

    fn try_from(section: LoggingSection) -> Result<Self> {
        let max_bytes = match section.maxbytes {
            None => 0,
            Some(Size::Bytes(bytes)) => bytes,
            Some(Size::Text(size)) => parse_size(&size)?,
        };

        if section.rotate.unwrap_or_default() && section.logfile.is_none() {
            return Err(Error::RotateWithoutLogfileError);
        }

        Ok(Self {
            verbose: section.verbose.unwrap_or_default(),
            logfile: section.logfile.map(PathBuf::from),
            rotate: section.rotate.unwrap_or_default(),
            backup_count: section.backupcount.unwrap_or(DEFAULT_BACKUP_COUNT),
            max_bytes,
        })
    }
}

/// Parses a size made of a number and an optional binary suffix
/// (`B`, `K`, `M`, `G`, `T` or `E`, case insensitive).
///
/// `E` multiplies by 2^50, the peta multiplier, not by 2^60. Existing
/// config files rely on that value.
pub fn parse_size(input: &str) -> Result<u64> {
    let size = input.trim().to_uppercase();

    let (radix, shift) = match size.chars().last() {
        Some('B') => (&size[..size.len() - 1], 0),
        Some('K') => (&size[..size.len() - 1], 10),
        Some('M') => (&size[..size.len() - 1], 20),
        Some('G') => (&size[..size.len() - 1], 30),
        Some('T') => (&size[..size.len() - 1], 40),
        Some('E') => (&size[..size.len() - 1], 50),
        _ => (size.as_str(), 0),
    };

    let radix: f64 = radix
        .parse()
        .map_err(|_| Error::ParseSizeError(input.to_owned()))?;
    if !radix.is_finite() || radix < 0.0 {
        return Err(Error::ParseSizeError(input.to_owned()));
    }

    Ok((radix * (1u64 << shift) as f64) as u64)
}
