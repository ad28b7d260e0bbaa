//! Job module.
//!
//! This module drives the client jobs: one cycle per client and the
//! runner repeating them over time.

pub mod job;
pub use job::*;

pub mod runner;
pub use runner::*;

use std::result;
use thiserror::Error;

use crate::backend;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot run cycle of client {1}")]
    FatalMailError(#[source] backend::Error, String),
}

pub type Result<T> = result::Result<T, Error>;
