//! Defensive parsing of model output.
//!
//! The response is untrusted text expected to contain a JSON array aligned
//! positionally with the input batch. Ordered fallback chain: direct array,
//! wrapped object, array embedded in surrounding text, then give up (the
//! caller falls back to rules).

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;

/// One positional classification entry from the service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchEntry {
    #[serde(default)]
    pub is_membership: bool,
    #[serde(default)]
    pub membership_type: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

fn array_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\[.*\]").expect("invalid array regex"))
}

/// Extract classification entries from free-form response text. `None` when
/// no parse succeeds.
pub fn extract_entries(content: &str) -> Option<Vec<BatchEntry>> {
    if let Ok(value) = serde_json::from_str::<Value>(content) {
        match value {
            Value::Array(_) => {
                if let Ok(entries) = serde_json::from_value(value) {
                    return Some(entries);
                }
            }
            Value::Object(mut map) => {
                if let Some(inner) = map.remove("transactions") {
                    if let Ok(entries) = serde_json::from_value(inner) {
                        return Some(entries);
                    }
                }
            }
            _ => {}
        }
    }

    // JSON array buried in surrounding prose
    let embedded = array_re().find(content)?;
    serde_json::from_str(embedded.as_str()).ok()
}
