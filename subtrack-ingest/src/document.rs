//! Decoded document structures handed to the statement parser.
//!
//! PDF decoding itself happens upstream; the core only sees pages of
//! extracted text plus whatever table structures the extractor recognized.

/// A recognized table: rows of cell strings, first row assumed to be the
/// header.
pub type Table = Vec<Vec<String>>;

/// One extracted page of a paginated statement.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub text: String,
    pub tables: Vec<Table>,
}

/// A paginated statement document.
#[derive(Debug, Clone, Default)]
pub struct StatementDocument {
    pub pages: Vec<Page>,
}
