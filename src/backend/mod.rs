mod backend;
pub mod imap;

pub use self::backend::{fetch, fetch_messages, Backend, MailSession};
pub use self::imap::{Error, ImapBackend, ImapSession, ImapSessionStream, Result};
