//! Message module.
//!
//! This module contains everything related to the messages fetched
//! from the mailbox and the fields extracted from them.

mod mailbox;
pub use mailbox::*;

mod message;
pub use message::*;
