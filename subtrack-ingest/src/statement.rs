//! Bank statement parsing.
//!
//! Two document shapes: paginated documents (structured tables first, free
//! text fallback with a running current date) and flat CSV exports with
//! header-driven column detection. A failure on one row or line never aborts
//! the document.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveTime};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use subtrack_core::{Source, Transaction, normalize};
use tracing::debug;

use crate::document::{StatementDocument, Table};

/// Header keywords classifying a column, matched by substring on the
/// lowercased header.
const DATE_COLUMNS: [&str; 3] = ["date", "posted", "transaction"];
const DESCRIPTION_COLUMNS: [&str; 5] = ["description", "memo", "merchant", "details", "payee"];
const AMOUNT_COLUMNS: [&str; 3] = ["amount", "debit", "credit"];

/// Boilerplate lines (headers, totals, summaries) that never contain a
/// transaction.
const SKIP_KEYWORDS: [&str; 13] = [
    "Relevé",
    "Généré le",
    "Transactions du compte",
    "Date",
    "Description",
    "Argent sortant",
    "Argent entrant",
    "Solde",
    "Résumé",
    "COMPTE",
    "TOTAL",
    "Renvoyé",
    "Page",
];

/// Amounts at or below this are treated as extraction noise.
const AMOUNT_EPSILON: f64 = 0.01;

// Plain numeric D/M/Y style, or a day + French month abbreviation + year.
fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)\d{1,2}[.\s]+(janv|févr|mars|avr|mai|juin|juil|août|sept|oct|nov|déc)",
            r"[.\s]+\d{2,4}|\d{1,2}[/-]\d{1,2}[/-]\d{2,4}"
        ))
        .expect("invalid date regex")
    })
}

fn amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"€?\s*\d+[.,]\d+").expect("invalid amount regex"))
}

fn trailing_amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+\d+[.,]\d+\s*$").expect("invalid trailing amount regex"))
}

fn column_matches(header: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| header.contains(k))
}

/// Parse a paginated statement document: per page, structured tables first,
/// free-text scanning as the fallback.
pub fn parse_document(doc: &StatementDocument) -> Vec<Transaction> {
    let mut out = Vec::new();
    for page in &doc.pages {
        if !page.tables.is_empty() {
            for table in &page.tables {
                out.extend(parse_table(table));
            }
        } else {
            out.extend(parse_text(&page.text));
        }
    }
    out
}

/// Parse a recognized table. The first row is the header; a row is emitted
/// only when a description and a non-zero amount were both resolved.
pub fn parse_table(table: &Table) -> Vec<Transaction> {
    let mut out = Vec::new();
    if table.len() < 2 {
        return out;
    }

    let headers: Vec<String> = table[0].iter().map(|h| h.to_lowercase()).collect();

    for row in &table[1..] {
        if row.iter().filter(|c| !c.trim().is_empty()).count() < 2 {
            continue;
        }

        let mut date = None;
        let mut description: Option<&str> = None;
        let mut amount = 0.0;

        for (i, header) in headers.iter().enumerate() {
            let Some(cell) = row.get(i) else { continue };
            let value = cell.trim();
            if value.is_empty() {
                continue;
            }
            // First matching column wins; the keyword sets overlap
            // ("Transaction Details" matches both date and description)
            if date.is_none() && column_matches(header, &DATE_COLUMNS) {
                date = Some(normalize::parse_date_or_now(value));
            }
            if description.is_none() && column_matches(header, &DESCRIPTION_COLUMNS) {
                description = Some(value);
            }
            if amount == 0.0 && column_matches(header, &AMOUNT_COLUMNS) {
                amount = normalize::parse_amount(value);
            }
        }

        let Some(description) = description else { continue };
        if amount == 0.0 {
            continue;
        }
        let date = date.unwrap_or_else(|| Local::now().naive_local());
        out.push(Transaction::new(
            date,
            description,
            amount.abs(),
            Source::BankStatement,
        ));
    }

    out
}

/// Parse free statement text line by line. A date line updates the running
/// current date; a currency-amount line combined with an established date
/// emits one transaction.
pub fn parse_text(text: &str) -> Vec<Transaction> {
    let mut out = Vec::new();
    let mut current_date: Option<NaiveDate> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if SKIP_KEYWORDS.iter().any(|kw| line.contains(kw)) {
            continue;
        }

        if let Some(m) = date_re().find(line) {
            if let Some(d) = normalize::parse_date(m.as_str()) {
                current_date = Some(d);
            }
        }

        let (Some(m), Some(date)) = (amount_re().find(line), current_date) else {
            continue;
        };
        let amount = normalize::parse_amount(m.as_str()).abs();
        if amount <= AMOUNT_EPSILON {
            continue;
        }

        // Description is the text before the currency symbol, minus any
        // trailing amount-like tokens.
        let desc = match line.split_once('€') {
            Some((before, _)) => before.trim(),
            None => line,
        };
        let desc = trailing_amount_re().replace(desc, "");
        out.push(Transaction::new(
            date.and_time(NaiveTime::MIN),
            desc.trim(),
            amount,
            Source::BankStatement,
        ));
    }

    out
}

/// Parse a flat CSV statement export. Columns are detected from header
/// keywords; rows that fail to parse are skipped individually.
pub fn parse_csv(path: impl AsRef<Path>) -> Result<Vec<Transaction>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path.as_ref())
        .with_context(|| format!("opening {}", path.as_ref().display()))?;

    let headers: Vec<String> = rdr
        .headers()
        .context("reading csv header")?
        .iter()
        .map(|h| h.to_lowercase())
        .collect();
    let date_idx = headers.iter().position(|h| column_matches(h, &DATE_COLUMNS));
    let desc_idx = headers
        .iter()
        .position(|h| column_matches(h, &DESCRIPTION_COLUMNS));
    let amount_idx = headers
        .iter()
        .position(|h| column_matches(h, &AMOUNT_COLUMNS));

    let mut out = Vec::new();
    for result in rdr.records() {
        let record = match result {
            Ok(r) => r,
            Err(err) => {
                debug!("skipping malformed csv row: {err}");
                continue;
            }
        };

        let description = desc_idx.and_then(|i| record.get(i)).unwrap_or("").trim();
        let amount = amount_idx
            .and_then(|i| record.get(i))
            .map(normalize::parse_amount)
            .unwrap_or(0.0);
        if amount == 0.0 {
            continue;
        }
        let date = date_idx
            .and_then(|i| record.get(i))
            .map(normalize::parse_date_or_now)
            .unwrap_or_else(|| Local::now().naive_local());

        out.push(Transaction::new(
            date,
            description,
            amount.abs(),
            Source::BankStatement,
        ));
    }

    Ok(out)
}
