//! Transaction record types shared across the ingestion and classification
//! stages.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a transaction was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    #[serde(rename = "bank_statement")]
    BankStatement,
    #[serde(rename = "email")]
    Email,
}

/// Membership category buckets, assigned in priority order by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MembershipType {
    Sport,
    Streaming,
    Software,
    News,
    Services,
}

impl MembershipType {
    /// Lenient parse for labels coming back from the classification service.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sport" | "sports" => Some(Self::Sport),
            "streaming" => Some(Self::Streaming),
            "software" => Some(Self::Software),
            "news" => Some(Self::News),
            "services" | "service" => Some(Self::Services),
            _ => None,
        }
    }
}

impl fmt::Display for MembershipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Sport => "Sport",
            Self::Streaming => "Streaming",
            Self::Software => "Software",
            Self::News => "News",
            Self::Services => "Services",
        };
        write!(f, "{label}")
    }
}

/// Payment cadence of a membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    Monthly,
    Weekly,
    Yearly,
    Quarterly,
    #[serde(rename = "Bi-annual")]
    BiAnnual,
}

impl Frequency {
    /// Lenient parse for labels coming back from the classification service.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "month" => Some(Self::Monthly),
            "weekly" | "week" => Some(Self::Weekly),
            "yearly" | "annual" | "year" => Some(Self::Yearly),
            "quarterly" => Some(Self::Quarterly),
            "bi-annual" | "biannual" | "semi-annual" => Some(Self::BiAnnual),
            _ => None,
        }
    }

    /// Multiplier turning an average payment amount into a monthly figure.
    pub fn monthly_factor(self) -> f64 {
        match self {
            Self::Monthly => 1.0,
            Self::Weekly => 4.33,
            Self::Yearly => 1.0 / 12.0,
            Self::Quarterly => 1.0 / 3.0,
            Self::BiAnnual => 1.0 / 6.0,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Monthly => "Monthly",
            Self::Weekly => "Weekly",
            Self::Yearly => "Yearly",
            Self::Quarterly => "Quarterly",
            Self::BiAnnual => "Bi-annual",
        };
        write!(f, "{label}")
    }
}

/// A single normalized transaction.
///
/// Created by the statement/email parsers, enriched in place by the
/// classifier, and dropped from the output unless it survives as a
/// membership. Aggregates (`monthly_cost`, `total_paid`) are attached last;
/// no stage revises `amount`, `date`, or `merchant` afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDateTime,
    pub description: String,
    /// Non-negative magnitude; zero-amount candidates are never emitted.
    pub amount: f64,
    /// Normalized short label derived from `description`, used as the
    /// grouping key for frequency and cost analysis.
    pub merchant: String,
    pub source: Source,
    pub is_membership: bool,
    pub membership_type: Option<MembershipType>,
    pub frequency: Option<Frequency>,
    /// Cleaned merchant label used as the cost-aggregation key. Empty until
    /// the classifier runs.
    pub category: String,
    pub monthly_cost: Option<f64>,
    pub total_paid: Option<f64>,
}

impl Transaction {
    /// Build an unclassified transaction, deriving `merchant` from the
    /// description.
    pub fn new(
        date: NaiveDateTime,
        description: impl Into<String>,
        amount: f64,
        source: Source,
    ) -> Self {
        let description = description.into().trim().to_string();
        let merchant = crate::merchant::normalize_merchant(&description);
        Self {
            date,
            description,
            amount,
            merchant,
            source,
            is_membership: false,
            membership_type: None,
            frequency: None,
            category: String::new(),
            monthly_cost: None,
            total_paid: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_new_derives_merchant_and_trims() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 21)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let t = Transaction::new(date, "  NETFLIX.COM 12345678 Amsterdam  ", 15.0, Source::Email);
        assert_eq!(t.description, "NETFLIX.COM 12345678 Amsterdam");
        assert_eq!(t.merchant, "NETFLIX.COM AMSTERDAM");
        assert!(!t.is_membership);
        assert!(t.membership_type.is_none());
    }

    #[test]
    fn test_frequency_parse_and_factor() {
        assert_eq!(Frequency::parse("Monthly"), Some(Frequency::Monthly));
        assert_eq!(Frequency::parse("annual"), Some(Frequency::Yearly));
        assert_eq!(Frequency::parse("Bi-annual"), Some(Frequency::BiAnnual));
        assert_eq!(Frequency::parse("whenever"), None);
        assert_eq!(Frequency::Yearly.monthly_factor(), 1.0 / 12.0);
        assert_eq!(Frequency::Weekly.monthly_factor(), 4.33);
    }

    #[test]
    fn test_frequency_serde_labels() {
        assert_eq!(serde_json::to_string(&Frequency::BiAnnual).unwrap(), "\"Bi-annual\"");
        assert_eq!(serde_json::to_string(&Frequency::Monthly).unwrap(), "\"Monthly\"");
    }

    #[test]
    fn test_membership_type_parse() {
        assert_eq!(MembershipType::parse("Streaming"), Some(MembershipType::Streaming));
        assert_eq!(MembershipType::parse(" sport "), Some(MembershipType::Sport));
        assert_eq!(MembershipType::parse("Groceries"), None);
    }
}
