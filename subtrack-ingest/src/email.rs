//! Transaction extraction from notification emails.
//!
//! Subject and body are decoded (multipart bodies concatenated, HTML parts
//! reduced to visible text, attachments skipped), then phrase-anchored amount
//! patterns are run over the combined text. Each detected amount becomes one
//! transaction dated from the message timestamp.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime};
use mailparse::{DispositionType, MailHeaderMap, ParsedMail, parse_mail};
use regex::Regex;
use scraper::Html;
use std::sync::OnceLock;
use subtrack_core::{Source, Transaction};

/// Phrase-anchored amount patterns, tried in priority order. Every match is
/// a candidate amount.
const CHARGE_PATTERNS: [&str; 4] = [
    r"(?i)charged\s+[\$£€]?(\d+[.,]?\d*)",
    r"(?i)payment\s+of\s+[\$£€]?(\d+[.,]?\d*)",
    r"(?i)[\$£€](\d+[.,]?\d*)\s+(?:was|has been)",
    r"(?i)amount[:\s]+[\$£€]?(\d+[.,]?\d*)",
];

/// Boilerplate lead-ins stripped before the merchant tokens.
const MERCHANT_LEAD_INS: [&str; 3] = [
    r"(?i)RECEIPT\s+FROM\s+",
    r"(?i)PAYMENT\s+(?:RECEIPT|CONFIRMATION)\s+FROM\s+",
    r"(?i)CHARGE\s+(?:FROM|AT)\s+",
];

/// Bounds for the loose fallback pattern: plausible consumer-transaction
/// magnitudes only.
const FALLBACK_MIN: f64 = 1.0;
const FALLBACK_MAX: f64 = 10000.0;

fn charge_res() -> &'static Vec<Regex> {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        CHARGE_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("invalid charge pattern"))
            .collect()
    })
}

fn lead_in_res() -> &'static Vec<Regex> {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        MERCHANT_LEAD_INS
            .iter()
            .map(|p| Regex::new(p).expect("invalid lead-in pattern"))
            .collect()
    })
}

fn loose_amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\$£€]?\s*(\d+[.,]?\d*)").expect("invalid amount regex"))
}

/// Parse one raw RFC822 message into transactions. Returns an empty vec when
/// the message contains no recognizable amount.
pub fn parse_message(raw: &[u8]) -> Result<Vec<Transaction>> {
    let mail = parse_mail(raw).context("parsing mime message")?;

    let subject = mail.headers.get_first_value("Subject").unwrap_or_default();
    let body = extract_body(&mail);
    let date = message_date(&mail);
    let text = format!("{subject}\n{body}");

    let merchant = extract_merchant(&subject, &body);

    let mut amounts = Vec::new();
    for re in charge_res() {
        for caps in re.captures_iter(&text) {
            if let Some(amount) = captured_amount(&caps[1]) {
                if amount > 0.01 {
                    amounts.push(amount);
                }
            }
        }
    }

    // No phrase-anchored match: if a merchant was identified anyway, accept
    // at most one amount in a plausible range.
    if amounts.is_empty() && !merchant.is_empty() {
        for caps in loose_amount_re().captures_iter(&text) {
            if let Some(amount) = captured_amount(&caps[1]) {
                if (FALLBACK_MIN..=FALLBACK_MAX).contains(&amount) {
                    amounts.push(amount);
                    break;
                }
            }
        }
    }

    let description = format!("{merchant} - {subject}");
    Ok(amounts
        .into_iter()
        .map(|amount| {
            let mut t = Transaction::new(date, description.clone(), amount, Source::Email);
            t.merchant = merchant.clone();
            t
        })
        .collect())
}

fn captured_amount(group: &str) -> Option<f64> {
    group.replace(',', "").parse().ok()
}

/// Message timestamp in the sender's local time, falling back to "now" when
/// missing or unparseable. Keeping the header's own offset keeps the
/// calendar date stable for senders far from UTC.
fn message_date(mail: &ParsedMail) -> NaiveDateTime {
    let header = mail.headers.get_first_value("Date");
    header
        .as_deref()
        .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
        .map(|dt| dt.naive_local())
        .or_else(|| {
            // dateparse is more lenient but loses the offset
            header
                .as_deref()
                .and_then(|d| mailparse::dateparse(d).ok())
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .map(|dt| dt.naive_utc())
        })
        .unwrap_or_else(|| Local::now().naive_local())
}

/// Walk the message parts, preferring plain text and stripping markup from
/// HTML parts. Attachment parts are skipped.
fn extract_body(mail: &ParsedMail) -> String {
    if mail.subparts.is_empty() {
        let ctype = mail.ctype.mimetype.to_lowercase();
        let raw = mail.get_body().unwrap_or_default();
        return if ctype == "text/html" { html_to_text(&raw) } else { raw };
    }
    let mut body = String::new();
    collect_parts(mail, &mut body);
    body
}

fn collect_parts(part: &ParsedMail, body: &mut String) {
    for sub in &part.subparts {
        if !sub.subparts.is_empty() {
            collect_parts(sub, body);
            continue;
        }
        if sub.get_content_disposition().disposition == DispositionType::Attachment {
            continue;
        }
        let ctype = sub.ctype.mimetype.to_lowercase();
        if ctype == "text/plain" {
            if let Ok(text) = sub.get_body() {
                body.push_str(&text);
            }
        } else if ctype == "text/html" {
            if let Ok(html) = sub.get_body() {
                body.push_str(&html_to_text(&html));
            }
        }
    }
}

fn html_to_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    doc.root_element().text().collect::<Vec<_>>().join(" ")
}

/// Merchant label from subject + body: strip boilerplate lead-ins, keep the
/// first 3 tokens; fall back to the first 30 characters of the subject.
fn extract_merchant(subject: &str, body: &str) -> String {
    let mut text = format!("{subject} {body}").to_uppercase();
    for re in lead_in_res() {
        text = re.replace_all(&text, "").into_owned();
    }
    let words: Vec<&str> = text.split_whitespace().take(3).collect();
    if words.is_empty() {
        subject.chars().take(30).collect()
    } else {
        words.join(" ")
    }
}
