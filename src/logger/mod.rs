//! Logger module.
//!
//! The logger is built from a [`LoggingConfig`] and installed once,
//! at start-up. Records go to the standard error and, when a log file
//! is configured, to a rotating log file. `RUST_LOG` overrides the
//! configured level.

mod file;

use env_logger::{Builder, Target};
use log::LevelFilter;
use std::{io, io::Write, path::PathBuf, result};
use thiserror::Error;

use crate::LoggingConfig;

use self::file::Tee;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot open log file {1}")]
    OpenLogFileError(#[source] io::Error, PathBuf),
    #[error("cannot rotate log file {1}")]
    RotateLogFileError(#[source] io::Error, PathBuf),
    #[error("cannot install logger")]
    InitLoggerError(#[source] log::SetLoggerError),
}

pub type Result<T> = result::Result<T, Error>;

/// Builds the logger matching the given config and installs it as
/// the global logger.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let level = if config.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = Builder::new();
    builder
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{}: {}: {}",
                buf.timestamp_seconds(),
                record.level(),
                record.args()
            )
        });

    if let Some(path) = config.logfile_path() {
        let mut file = file::open(&path, config.max_bytes, config.backup_count)
            .map_err(|err| Error::OpenLogFileError(err, path.clone()))?;
        if config.rotate {
            file.rotate()
                .map_err(|err| Error::RotateLogFileError(err, path.clone()))?;
        }
        builder.target(Target::Pipe(Box::new(Tee { file })));
    }

    builder.try_init().map_err(Error::InitLoggerError)
}
