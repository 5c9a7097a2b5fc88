//! Rule-based membership classification: keyword tables over the uppercased
//! description + merchant text.

use subtrack_core::{Frequency, MembershipType, Transaction, clean_category};

/// Keywords marking a transaction as a likely membership/subscription:
/// generic recurrence terms plus well-known brand and domain terms.
const MEMBERSHIP_KEYWORDS: [&str; 27] = [
    "SUBSCRIPTION",
    "MEMBERSHIP",
    "MONTHLY",
    "ANNUAL",
    "RECURRING",
    "NETFLIX",
    "SPOTIFY",
    "AMAZON PRIME",
    "ADOBE",
    "MICROSOFT 365",
    "MICROSOFT",
    "CURSOR",
    "APPLE",
    "GYM",
    "FITNESS",
    "GOLF",
    "TENNIS",
    "YOGI",
    "PILATES",
    "OFFICE",
    "SOFTWARE",
    "SAAS",
    "CLOUD",
    "NEWS",
    "TIMES",
    "JOURNAL",
    "MAGAZINE",
];

// Type buckets, checked in priority order; anything else is Services.
const SPORT_KEYWORDS: [&str; 7] = ["GYM", "FITNESS", "GOLF", "TENNIS", "YOGI", "PILATES", "SPORT"];
const STREAMING_KEYWORDS: [&str; 6] = [
    "NETFLIX",
    "SPOTIFY",
    "DISNEY",
    "HULU",
    "PRIME VIDEO",
    "STREAMING",
];
const SOFTWARE_KEYWORDS: [&str; 7] = [
    "ADOBE",
    "MICROSOFT",
    "OFFICE",
    "SOFTWARE",
    "SAAS",
    "CURSOR",
    "APPLE",
];
const NEWS_KEYWORDS: [&str; 4] = ["NEWS", "TIMES", "JOURNAL", "MAGAZINE"];

/// Outcome of classifying one transaction with the keyword rules.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub is_membership: bool,
    pub membership_type: Option<MembershipType>,
    pub frequency: Option<Frequency>,
    pub category: String,
}

fn any_keyword(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// Classify a single transaction.
pub fn classify_single(txn: &Transaction) -> RuleOutcome {
    let text = format!(
        "{} {}",
        txn.description.to_uppercase(),
        txn.merchant.to_uppercase()
    );

    let cleaned = clean_category(&txn.merchant);
    let category = if !cleaned.is_empty() {
        cleaned
    } else if let Some(first) = txn.description.split_whitespace().next() {
        first.to_uppercase()
    } else {
        "Unknown".to_string()
    };

    if !any_keyword(&text, &MEMBERSHIP_KEYWORDS) {
        return RuleOutcome {
            is_membership: false,
            membership_type: None,
            frequency: None,
            category,
        };
    }

    let membership_type = if any_keyword(&text, &SPORT_KEYWORDS) {
        MembershipType::Sport
    } else if any_keyword(&text, &STREAMING_KEYWORDS) {
        MembershipType::Streaming
    } else if any_keyword(&text, &SOFTWARE_KEYWORDS) {
        MembershipType::Software
    } else if any_keyword(&text, &NEWS_KEYWORDS) {
        MembershipType::News
    } else {
        MembershipType::Services
    };

    let frequency = if text.contains("MONTHLY") || text.contains("MONTH") {
        Frequency::Monthly
    } else if text.contains("YEARLY") || text.contains("ANNUAL") || text.contains("YEAR") {
        Frequency::Yearly
    } else if text.contains("WEEKLY") || text.contains("WEEK") {
        Frequency::Weekly
    } else {
        // Default assumption for keyword-only matches
        Frequency::Monthly
    };

    RuleOutcome {
        is_membership: true,
        membership_type: Some(membership_type),
        frequency: Some(frequency),
        category,
    }
}

/// Apply the rule outcome to a transaction in place.
pub fn apply(txn: &mut Transaction) {
    let outcome = classify_single(txn);
    txn.is_membership = outcome.is_membership;
    txn.membership_type = outcome.membership_type;
    txn.frequency = outcome.frequency;
    txn.category = outcome.category;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use subtrack_core::Source;

    fn txn(description: &str) -> Transaction {
        let date: NaiveDateTime = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_time(NaiveTime::MIN);
        Transaction::new(date, description, 15.0, Source::BankStatement)
    }

    #[test]
    fn test_streaming_brand() {
        let out = classify_single(&txn("NETFLIX 4029357733 AMSTERDAM"));
        assert!(out.is_membership);
        assert_eq!(out.membership_type, Some(MembershipType::Streaming));
        assert_eq!(out.frequency, Some(Frequency::Monthly));
        assert_eq!(out.category, "NETFLIX AMSTERDAM");
    }

    #[test]
    fn test_sport_beats_streaming_priority() {
        // A gym with "streaming" in its marketing text still buckets as Sport
        let out = classify_single(&txn("GYM STREAMING CLASSES MEMBERSHIP"));
        assert_eq!(out.membership_type, Some(MembershipType::Sport));
    }

    #[test]
    fn test_yearly_frequency_keyword() {
        let out = classify_single(&txn("ACME TIMES ANNUAL SUBSCRIPTION"));
        assert!(out.is_membership);
        assert_eq!(out.membership_type, Some(MembershipType::News));
        assert_eq!(out.frequency, Some(Frequency::Yearly));
    }

    #[test]
    fn test_services_fallback_bucket() {
        let out = classify_single(&txn("VAULT STORAGE RECURRING"));
        assert_eq!(out.membership_type, Some(MembershipType::Services));
    }

    #[test]
    fn test_non_membership() {
        let out = classify_single(&txn("CARREFOUR PARIS 75011"));
        assert!(!out.is_membership);
        assert!(out.membership_type.is_none());
        assert!(out.frequency.is_none());
        assert_eq!(out.category, "CARREFOUR PARIS");
    }

    #[test]
    fn test_category_strips_embedded_date() {
        let out = classify_single(&txn("21 DÉC. NETFLIX"));
        assert_eq!(out.category, "NETFLIX");
    }
}
