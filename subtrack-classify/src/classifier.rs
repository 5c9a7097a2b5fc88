//! Two-tier membership classification.
//!
//! Either strategy enriches every transaction in place; post-processing then
//! demotes single-occurrence categories, keeps only memberships, and attaches
//! monthly-cost aggregates. Batches are issued strictly in order and any
//! service failure degrades that batch alone to the rule-based path.

use std::collections::HashMap;
use subtrack_core::{Frequency, MembershipType, Transaction, clean_category};
use tracing::warn;

use crate::llm::{self, LlmConfig};
use crate::response;
use crate::rules;

/// Transactions per classification request.
pub const BATCH_SIZE: usize = 20;

const SYSTEM_PROMPT: &str = "You are a financial transaction classifier. Analyze transactions \
     and classify them accurately. Always respond with valid JSON only.";

/// Classification strategy, fixed at construction by configuration.
#[derive(Debug, Clone)]
pub enum Strategy {
    RuleBased,
    ModelAssisted(LlmConfig),
}

pub struct MembershipClassifier {
    strategy: Strategy,
}

impl MembershipClassifier {
    pub fn new(strategy: Strategy) -> Self {
        Self { strategy }
    }

    pub fn rule_based() -> Self {
        Self::new(Strategy::RuleBased)
    }

    /// Human-readable description of the active back-end.
    pub fn model_info(&self) -> String {
        match &self.strategy {
            Strategy::RuleBased => "Pattern matching (rule-based)".to_string(),
            Strategy::ModelAssisted(cfg) => {
                format!("{} ({})", cfg.model, cfg.provider.label())
            }
        }
    }

    /// Classify a batch of transactions, returning ONLY the records that
    /// survive as memberships, with cost aggregates attached.
    pub fn classify(&self, mut transactions: Vec<Transaction>) -> Vec<Transaction> {
        match &self.strategy {
            Strategy::RuleBased => {
                for txn in &mut transactions {
                    rules::apply(txn);
                }
            }
            Strategy::ModelAssisted(cfg) => {
                let context = merchant_frequency_context(&transactions);
                let mut start = 0;
                while start < transactions.len() {
                    let end = (start + BATCH_SIZE).min(transactions.len());
                    classify_batch(cfg, &context, &mut transactions[start..end]);
                    start = end;
                }
            }
        }

        filter_one_time_payments(&mut transactions);

        let mut memberships: Vec<Transaction> = transactions
            .into_iter()
            .filter(|t| t.is_membership)
            .collect();
        add_monthly_costs(&mut memberships);
        memberships
    }
}

/// Frequency table of the ten most common normalized merchants across the
/// whole input set, included in every batch prompt for disambiguation.
fn merchant_frequency_context(transactions: &[Transaction]) -> String {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for t in transactions {
        let cleaned = clean_category(&t.merchant);
        if !cleaned.is_empty() {
            *counts.entry(cleaned).or_insert(0) += 1;
        }
    }
    if counts.is_empty() {
        return String::new();
    }

    let mut sorted: Vec<(String, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut out = format!(
        "\nMerchant frequency across ALL {} transactions:\n",
        transactions.len()
    );
    for (merchant, count) in sorted.into_iter().take(10) {
        out.push_str(&format!("- {merchant}: {count} occurrence(s)\n"));
    }
    out
}

fn build_prompt(batch: &[Transaction], context: &str) -> String {
    let mut list = String::new();
    for t in batch {
        let desc: String = t.description.chars().take(50).collect();
        list.push_str(&format!(
            "- {}: ${:.2} on {} ({})\n",
            t.merchant,
            t.amount,
            t.date.format("%Y-%m-%d"),
            desc
        ));
    }

    format!(
        "Identify ONLY recurring membership/subscription payments from the \
         transactions below.\n\n\
         {context}\
         For each transaction:\n\
         - is_membership: true ONLY if the merchant appears several times with \
         a similar amount and a similar date in the month\n\
         - membership_type: Sport/Software/Streaming/News/Services\n\
         - frequency: Monthly/Weekly/Yearly based on date gaps\n\
         - category: Clean merchant name (remove dates)\n\n\
         Transactions:\n{list}\n\
         Return a JSON array matching the input order:\n\
         [{{\"is_membership\": boolean, \"membership_type\": string|null, \
         \"frequency\": string|null, \"category\": string}}]\n"
    )
}

fn classify_batch(cfg: &LlmConfig, context: &str, batch: &mut [Transaction]) {
    let prompt = build_prompt(batch, context);
    match llm::chat_complete(cfg, SYSTEM_PROMPT, &prompt) {
        Ok(content) => apply_model_content(batch, &content),
        Err(err) => {
            warn!("model classification failed, falling back to rules: {err:#}");
            for txn in batch.iter_mut() {
                rules::apply(txn);
            }
        }
    }
}

/// Merge response text into the batch. Unparseable responses degrade the
/// whole batch to rules; responses shorter than the batch are padded
/// per-transaction with the single-item rule classifier.
fn apply_model_content(batch: &mut [Transaction], content: &str) {
    let Some(entries) = response::extract_entries(content) else {
        warn!("model returned no parseable JSON, falling back to rules");
        for txn in batch.iter_mut() {
            rules::apply(txn);
        }
        return;
    };

    for (i, txn) in batch.iter_mut().enumerate() {
        match entries.get(i) {
            Some(entry) => {
                txn.is_membership = entry.is_membership;
                txn.membership_type = entry
                    .membership_type
                    .as_deref()
                    .and_then(MembershipType::parse);
                txn.frequency = entry.frequency.as_deref().and_then(Frequency::parse);
                txn.category = match entry.category.as_deref() {
                    Some(c) if !c.is_empty() => c.to_string(),
                    _ => txn.merchant.clone(),
                };
                if txn.is_membership {
                    // Membership records always leave with a type and frequency
                    txn.membership_type.get_or_insert(MembershipType::Services);
                    txn.frequency.get_or_insert(Frequency::Monthly);
                }
            }
            None => rules::apply(txn),
        }
    }
}

/// Demote every category observed exactly once: a single payment is evidence
/// against recurrence regardless of what the keyword or model pass said.
fn filter_one_time_payments(transactions: &mut [Transaction]) {
    let group_key = |t: &Transaction| {
        let key = clean_category(&t.merchant);
        if key.is_empty() { "Unknown".to_string() } else { key }
    };

    let mut counts: HashMap<String, usize> = HashMap::new();
    for t in transactions.iter().filter(|t| t.is_membership) {
        *counts.entry(group_key(t)).or_insert(0) += 1;
    }

    for t in transactions.iter_mut() {
        if t.is_membership && counts.get(&group_key(t)) == Some(&1) {
            t.is_membership = false;
            t.membership_type = None;
            t.frequency = None;
        }
    }
}

/// Attach `monthly_cost` and `total_paid` to every record, grouped by
/// category: mean amount converted to a monthly figure by the group's
/// frequency.
fn add_monthly_costs(memberships: &mut [Transaction]) {
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, t) in memberships.iter().enumerate() {
        groups.entry(t.category.clone()).or_default().push(i);
    }

    for indices in groups.into_values() {
        let total: f64 = indices.iter().map(|&i| memberships[i].amount).sum();
        let avg = total / indices.len() as f64;
        let frequency = memberships[indices[0]].frequency.unwrap_or(Frequency::Monthly);
        let monthly = (avg * frequency.monthly_factor() * 100.0).round() / 100.0;

        for &i in &indices {
            memberships[i].monthly_cost = Some(monthly);
            memberships[i].total_paid = Some(total);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use subtrack_core::Source;

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_time(NaiveTime::MIN)
    }

    fn txn(description: &str, date: NaiveDateTime, amount: f64) -> Transaction {
        Transaction::new(date, description, amount, Source::BankStatement)
    }

    #[test]
    fn test_one_time_payment_demoted() {
        let mut txns = vec![
            txn("NETFLIX", day(2024, 1, 5), 15.0),
            txn("NETFLIX", day(2024, 2, 5), 15.0),
            txn("RANDOM SHOP SOFTWARE", day(2024, 1, 10), 49.0),
        ];
        for t in &mut txns {
            rules::apply(t);
        }
        assert!(txns.iter().all(|t| t.is_membership));

        filter_one_time_payments(&mut txns);
        assert!(txns[0].is_membership);
        assert!(txns[1].is_membership);
        assert!(!txns[2].is_membership);
        assert!(txns[2].membership_type.is_none());
        assert!(txns[2].frequency.is_none());
    }

    #[test]
    fn test_monthly_cost_conversion() {
        let mut yearly = txn("ACME TIMES ANNUAL", day(2024, 1, 1), 120.0);
        rules::apply(&mut yearly);
        let mut yearly2 = yearly.clone();
        yearly2.date = day(2025, 1, 1);
        let mut memberships = vec![yearly, yearly2];
        add_monthly_costs(&mut memberships);
        assert_eq!(memberships[0].monthly_cost, Some(10.0));
        assert_eq!(memberships[0].total_paid, Some(240.0));

        let mut weekly = txn("GYM WEEKLY PASS", day(2024, 1, 1), 10.0);
        rules::apply(&mut weekly);
        let mut memberships = vec![weekly];
        add_monthly_costs(&mut memberships);
        assert_eq!(memberships[0].monthly_cost, Some(43.30));
    }

    #[test]
    fn test_non_json_response_degrades_to_rules() {
        let mut model_batch = vec![
            txn("NETFLIX", day(2024, 1, 5), 15.0),
            txn("CARREFOUR PARIS", day(2024, 1, 6), 82.0),
        ];
        let mut rule_batch = model_batch.clone();

        apply_model_content(&mut model_batch, "Sorry, I cannot help with that.");
        for t in &mut rule_batch {
            rules::apply(t);
        }
        assert_eq!(model_batch, rule_batch);
    }

    #[test]
    fn test_short_response_padded_with_rules() {
        let mut batch = vec![
            txn("SOME SHOP", day(2024, 1, 5), 12.0),
            txn("SPOTIFY", day(2024, 1, 6), 9.99),
        ];
        let content = r#"[{"is_membership": false, "membership_type": null,
            "frequency": null, "category": "SOME SHOP"}]"#;
        apply_model_content(&mut batch, content);

        assert!(!batch[0].is_membership);
        // Second entry missing: rule classifier fills it
        assert!(batch[1].is_membership);
        assert_eq!(batch[1].membership_type, Some(MembershipType::Streaming));
    }

    #[test]
    fn test_membership_entry_backfills_type_and_frequency() {
        let mut batch = vec![txn("ACME CLUB", day(2024, 1, 5), 30.0)];
        let content = r#"[{"is_membership": true, "membership_type": null,
            "frequency": null, "category": "ACME CLUB"}]"#;
        apply_model_content(&mut batch, content);
        assert!(batch[0].is_membership);
        assert_eq!(batch[0].membership_type, Some(MembershipType::Services));
        assert_eq!(batch[0].frequency, Some(Frequency::Monthly));
    }

    #[test]
    fn test_merchant_frequency_context_top_entries() {
        let mut txns = Vec::new();
        for i in 0..3 {
            txns.push(txn("NETFLIX", day(2024, 1 + i, 5), 15.0));
        }
        txns.push(txn("CARREFOUR PARIS", day(2024, 1, 6), 82.0));

        let context = merchant_frequency_context(&txns);
        assert!(context.contains("across ALL 4 transactions"));
        assert!(context.contains("- NETFLIX: 3 occurrence(s)"));
        assert!(context.contains("- CARREFOUR PARIS: 1 occurrence(s)"));
    }

    #[test]
    fn test_model_info_labels() {
        assert_eq!(
            MembershipClassifier::rule_based().model_info(),
            "Pattern matching (rule-based)"
        );
    }
}
