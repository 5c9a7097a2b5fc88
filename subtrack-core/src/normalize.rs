//! Date and amount normalization for heterogeneous, locale-sensitive
//! statement and email formats.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};

/// French month abbreviations mapped to English month names.
///
/// Longest abbreviations first so that e.g. "juil" is tried before shorter
/// prefixes and "févr" wins over "fév".
const FRENCH_MONTHS: [(&str, &str); 13] = [
    ("janv", "january"),
    ("févr", "february"),
    ("mars", "march"),
    ("juin", "june"),
    ("juil", "july"),
    ("août", "august"),
    ("sept", "september"),
    ("fév", "february"),
    ("avr", "april"),
    ("mai", "may"),
    ("oct", "october"),
    ("nov", "november"),
    ("déc", "december"),
];

const DATE_FORMATS: [&str; 10] = [
    "%d/%m/%Y",
    "%d/%m/%y",
    "%d-%m-%Y",
    "%d-%m-%y",
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d %B %Y",
    "%d %B %y",
    "%d %b %Y",
    "%d %b %y",
];

/// Rewrite a French month abbreviation to its English month name, leaving
/// anything else untouched. The result is lowercased.
fn rewrite_french_months(s: &str) -> String {
    let lower = s.to_lowercase();
    for (fr, en) in FRENCH_MONTHS {
        if lower.contains(fr) {
            return lower.replace(fr, en);
        }
    }
    lower
}

/// Parse a date string in any of the supported numeric or worded forms.
/// Returns `None` rather than failing when nothing matches.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    // "21 déc. 2024" -> "21 december 2024"
    let rewritten = rewrite_french_months(trimmed).replace('.', " ");
    let cleaned = rewritten.split_whitespace().collect::<Vec<_>>().join(" ");

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(&cleaned, fmt) {
            return Some(d);
        }
    }
    None
}

/// Parse a date string, resolving anything unparseable to "now".
pub fn parse_date_or_now(raw: &str) -> NaiveDateTime {
    match parse_date(raw) {
        Some(d) => d.and_time(NaiveTime::MIN),
        None => Local::now().naive_local(),
    }
}

/// Parse an amount string into a float.
///
/// Strips currency symbols and whitespace, and accepts both decimal
/// conventions: `"€ 12,50"` -> 12.50 and `"$1,234.56"` -> 1234.56. Returns
/// 0.0 when the remainder is not a number; sign is preserved.
pub fn parse_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return 0.0;
    }

    let normalized = if cleaned.contains(',') && cleaned.contains('.') {
        // Comma is a thousands separator
        cleaned.replace(',', "")
    } else if let Some(idx) = cleaned.rfind(',') {
        // A single comma followed by two digits is a decimal separator
        if cleaned.len() - idx - 1 == 2 && cleaned.matches(',').count() == 1 {
            cleaned.replace(',', ".")
        } else {
            cleaned.replace(',', "")
        }
    } else {
        cleaned
    };

    normalized.parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_comma_decimal() {
        assert_eq!(parse_amount("€ 12,50"), 12.50);
        assert_eq!(parse_amount("9,99"), 9.99);
    }

    #[test]
    fn test_amount_comma_thousands() {
        assert_eq!(parse_amount("$1,234.56"), 1234.56);
        assert_eq!(parse_amount("1,234"), 1234.0);
        assert_eq!(parse_amount("1,234,567.89"), 1234567.89);
    }

    #[test]
    fn test_amount_sign_and_garbage() {
        assert_eq!(parse_amount("-15.00"), -15.00);
        assert_eq!(parse_amount("£ 3.99"), 3.99);
        assert_eq!(parse_amount("n/a"), 0.0);
        assert_eq!(parse_amount(""), 0.0);
    }

    #[test]
    fn test_french_date_matches_english() {
        let fr = parse_date("21 déc. 2024").unwrap();
        let en = parse_date("21 december 2024").unwrap();
        assert_eq!(fr, en);
        assert_eq!(fr, NaiveDate::from_ymd_opt(2024, 12, 21).unwrap());
    }

    #[test]
    fn test_french_abbreviation_lengths() {
        // "juil" must not be eaten by a shorter prefix
        assert_eq!(
            parse_date("8 juil. 2024"),
            NaiveDate::from_ymd_opt(2024, 7, 8)
        );
        assert_eq!(
            parse_date("3 févr. 2025"),
            NaiveDate::from_ymd_opt(2025, 2, 3)
        );
        assert_eq!(parse_date("1 fév 2025"), NaiveDate::from_ymd_opt(2025, 2, 1));
    }

    #[test]
    fn test_numeric_formats() {
        assert_eq!(parse_date("21/12/2024"), NaiveDate::from_ymd_opt(2024, 12, 21));
        assert_eq!(parse_date("21-12-24"), NaiveDate::from_ymd_opt(2024, 12, 21));
        assert_eq!(parse_date("2024-12-21"), NaiveDate::from_ymd_opt(2024, 12, 21));
    }

    #[test]
    fn test_unparseable_date_falls_back_to_now() {
        let before = Local::now().naive_local();
        let got = parse_date_or_now("not a date");
        let after = Local::now().naive_local();
        assert!(got >= before && got <= after);
    }
}
