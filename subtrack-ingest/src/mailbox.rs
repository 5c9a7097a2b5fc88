//! Mailbox collaborator surface.
//!
//! Connection and auth handling live outside the core; the parser only
//! consumes select/search/fetch and treats any failure as "no results".

use anyhow::Result;
use subtrack_core::Transaction;
use tracing::{debug, warn};

use crate::email;

/// The three operations the core needs from a remote mailbox session.
pub trait Mailbox {
    fn select(&mut self, folder: &str) -> Result<()>;
    /// Returns message ids in mailbox order (oldest first).
    fn search(&mut self, criteria: &str) -> Result<Vec<String>>;
    fn fetch(&mut self, id: &str) -> Result<Vec<u8>>;
}

/// Fetch and parse up to `limit` messages, newest first, optionally filtered
/// by sender. A failure on one message skips it; a session-level failure
/// returns an empty result rather than propagating.
pub fn fetch_mailbox(
    mailbox: &mut dyn Mailbox,
    folder: &str,
    sender_filter: Option<&str>,
    limit: usize,
) -> Vec<Transaction> {
    match fetch_inner(mailbox, folder, sender_filter, limit) {
        Ok(txns) => txns,
        Err(err) => {
            warn!("mailbox fetch failed: {err:#}");
            Vec::new()
        }
    }
}

fn fetch_inner(
    mailbox: &mut dyn Mailbox,
    folder: &str,
    sender_filter: Option<&str>,
    limit: usize,
) -> Result<Vec<Transaction>> {
    mailbox.select(folder)?;

    let criteria = match sender_filter {
        Some(sender) => format!("(FROM \"{sender}\")"),
        None => "ALL".to_string(),
    };
    let ids = mailbox.search(&criteria)?;

    let start = ids.len().saturating_sub(limit);
    let mut out = Vec::new();
    for id in ids[start..].iter().rev() {
        let raw = match mailbox.fetch(id) {
            Ok(raw) => raw,
            Err(err) => {
                debug!("skipping message {id}: {err:#}");
                continue;
            }
        };
        match email::parse_message(&raw) {
            Ok(txns) => out.extend(txns),
            Err(err) => debug!("skipping unparseable message {id}: {err:#}"),
        }
    }
    Ok(out)
}
