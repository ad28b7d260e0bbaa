pub mod message;
pub use message::{Mailbox, ParsedMessage, RawMessage};

pub mod lead;
pub use lead::Resolution;

pub mod record;
pub use record::EmailRecord;
