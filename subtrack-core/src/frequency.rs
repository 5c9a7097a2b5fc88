//! Payment-cadence analysis over membership-flagged transactions.

use crate::transaction::Transaction;
use std::collections::HashMap;
use std::fmt;

/// Named cadence classes, bucketed from the average day-gap between
/// consecutive payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Monthly,
    Quarterly,
    BiAnnual,
    Yearly,
    Weekly,
    /// Average gap outside every named range.
    EveryNDays(i64),
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cadence::Monthly => write!(f, "Monthly"),
            Cadence::Quarterly => write!(f, "Quarterly"),
            Cadence::BiAnnual => write!(f, "Bi-annual"),
            Cadence::Yearly => write!(f, "Yearly"),
            Cadence::Weekly => write!(f, "Weekly"),
            Cadence::EveryNDays(n) => write!(f, "Every {n} days"),
        }
    }
}

/// Per-category cadence statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct CadenceStats {
    pub cadence: Cadence,
    pub avg_interval_days: f64,
    pub count: usize,
    pub total_amount: f64,
    pub avg_amount: f64,
}

/// Bucket an average day-gap into a named cadence. Ranges are inclusive and
/// fixed; gaps outside every range become "Every N days" with N rounded.
pub fn classify_interval(avg_days: f64) -> Cadence {
    if (25.0..=35.0).contains(&avg_days) {
        Cadence::Monthly
    } else if (85.0..=95.0).contains(&avg_days) {
        Cadence::Quarterly
    } else if (360.0..=370.0).contains(&avg_days) {
        Cadence::Yearly
    } else if (175.0..=185.0).contains(&avg_days) {
        Cadence::BiAnnual
    } else if (7.0..=9.0).contains(&avg_days) {
        Cadence::Weekly
    } else {
        Cadence::EveryNDays(avg_days.round() as i64)
    }
}

/// Compute per-category payment-interval statistics over the records already
/// flagged as memberships. Categories with fewer than 2 observations are
/// omitted: a single payment carries no cadence information.
pub fn analyze(transactions: &[Transaction]) -> HashMap<String, CadenceStats> {
    let mut by_category: HashMap<String, Vec<(chrono::NaiveDateTime, f64)>> = HashMap::new();
    for t in transactions.iter().filter(|t| t.is_membership) {
        by_category
            .entry(t.category.clone())
            .or_default()
            .push((t.date, t.amount));
    }

    let mut out = HashMap::new();
    for (category, mut payments) in by_category {
        if payments.len() < 2 {
            continue;
        }
        payments.sort_by_key(|(date, _)| *date);

        let gaps: Vec<i64> = payments
            .windows(2)
            .map(|w| (w[1].0.date() - w[0].0.date()).num_days())
            .collect();
        let avg_interval = gaps.iter().sum::<i64>() as f64 / gaps.len() as f64;

        let total: f64 = payments.iter().map(|(_, amount)| amount).sum();
        let count = payments.len();
        out.insert(
            category,
            CadenceStats {
                cadence: classify_interval(avg_interval),
                avg_interval_days: avg_interval,
                count,
                total_amount: total,
                avg_amount: total / count as f64,
            },
        );
    }
    out
}
