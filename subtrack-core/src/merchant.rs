//! Merchant-name normalization: derive a stable, de-noised grouping key from
//! a free-text transaction description.

use regex::Regex;
use std::sync::OnceLock;

fn long_digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4,}").expect("invalid digits regex"))
}

fn ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("invalid ws regex"))
}

// Embedded day/month tokens like "21 DÉC." or "8 JUIL."
fn date_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\d+\s+[A-ZÀÂÆÇÉÈÊËÎÏÔŒÙÛÜŸ]+\.?\s*").expect("invalid date token regex")
    })
}

fn leading_abbrev_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-ZÀÂÆÇÉÈÊËÎÏÔŒÙÛÜŸ]+\.\s*").expect("invalid abbrev regex")
    })
}

fn digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("invalid digit regex"))
}

/// Normalize a description into a short merchant label: uppercase, mask
/// card/reference numbers (4+ digit runs), collapse whitespace, keep the
/// first 3 tokens. Falls back to the first 30 characters of the original
/// description when nothing remains. Idempotent.
pub fn normalize_merchant(description: &str) -> String {
    let upper = description.to_uppercase();
    let stripped = long_digits_re().replace_all(&upper, "");
    let collapsed = ws_re().replace_all(&stripped, " ");
    let words: Vec<&str> = collapsed.trim().split(' ').filter(|w| !w.is_empty()).take(3).collect();
    if words.is_empty() {
        description.chars().take(30).collect()
    } else {
        words.join(" ")
    }
}

/// Category-cleanup variant of merchant normalization: additionally strips a
/// leading "day + accented-uppercase month" token and any remaining digit
/// runs, so "21 DÉC. NETFLIX 99" and "8 JANV. NETFLIX" group together.
pub fn clean_category(merchant: &str) -> String {
    let upper = merchant.to_uppercase();
    let no_dates = date_token_re().replace_all(&upper, "");
    let no_abbrev = leading_abbrev_re().replace(&no_dates, "");
    let no_digits = digits_re().replace_all(&no_abbrev, "");
    no_digits.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks_long_digit_runs() {
        assert_eq!(normalize_merchant("PAYPAL *SPOTIFY 1234567890"), "PAYPAL *SPOTIFY");
        // Short digit groups survive
        assert_eq!(normalize_merchant("H-E-B #455"), "H-E-B #455");
    }

    #[test]
    fn test_keeps_first_three_tokens() {
        assert_eq!(
            normalize_merchant("basic fit france sarl paris"),
            "BASIC FIT FRANCE"
        );
    }

    #[test]
    fn test_fallback_when_nothing_remains() {
        assert_eq!(normalize_merchant("12345678"), "12345678");
        assert_eq!(normalize_merchant(""), "");
    }

    #[test]
    fn test_idempotent() {
        let once = normalize_merchant("Netflix.com 4029357733 Amsterdam NL");
        let twice = normalize_merchant(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_clean_category_strips_date_tokens() {
        assert_eq!(clean_category("21 DÉC. NETFLIX"), "NETFLIX");
        assert_eq!(clean_category("8 JUIL. BASIC FIT"), "BASIC FIT");
        assert_eq!(clean_category("NETFLIX 99"), "NETFLIX");
    }

    #[test]
    fn test_clean_category_strips_leading_abbreviation() {
        assert_eq!(clean_category("SARL. ACME GYM"), "ACME GYM");
    }
}
