pub(crate) mod process;

pub mod utils;
pub use utils::mask;

pub mod logger;

pub mod config;
pub use config::{ClientConfig, Config, DbConfig, Limits, LoggingConfig, MailConfig};

pub mod domain;
pub use domain::*;

pub mod backend;
pub use backend::{Backend, ImapBackend, MailSession};

pub mod db;
pub use db::Database;

pub mod job;
pub use job::{CycleReport, Job, Runner};
