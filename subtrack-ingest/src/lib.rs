//! subtrack-ingest: statement and email ingestion producing normalized
//! transactions for the classification pipeline.

pub mod document;
pub mod email;
pub mod mailbox;
pub mod statement;

pub use document::{Page, StatementDocument, Table};
pub use mailbox::{Mailbox, fetch_mailbox};
