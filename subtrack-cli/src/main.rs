use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use subtrack_classify::{MembershipClassifier, Strategy, select_provider};
use subtrack_core::{Transaction, frequency};
use subtrack_ingest::{email, statement};
use tracing::warn;

mod config;

#[derive(Parser, Debug)]
#[command(
    name = "subtrack",
    version,
    about = "Find recurring membership payments in statements and emails"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a CSV bank statement export and report memberships
    Statement {
        /// Path to the CSV export
        file: PathBuf,

        /// Force rule-based classification even if a provider is configured
        #[arg(long)]
        no_ai: bool,

        /// Print the surviving records as JSON instead of a report
        #[arg(long)]
        json: bool,
    },

    /// Parse one or more raw email files (.eml) and report memberships
    Email {
        /// Paths to raw RFC822 message files
        files: Vec<PathBuf>,

        #[arg(long)]
        no_ai: bool,

        #[arg(long)]
        json: bool,
    },

    /// Write a default config to ~/.subtrack/config.toml
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Statement { file, no_ai, json } => {
            let txns = statement::parse_csv(&file)?;
            classify_and_report(txns, no_ai, json)?;
        }

        Command::Email { files, no_ai, json } => {
            let txns = parse_email_files(&files)?;
            classify_and_report(txns, no_ai, json)?;
        }

        Command::InitConfig => {
            config::init_config()?;
        }
    }

    Ok(())
}

/// Read and parse raw message files. One unparseable message skips that
/// file, the same policy the mailbox fetch loop applies per message.
fn parse_email_files(files: &[PathBuf]) -> Result<Vec<Transaction>> {
    let mut txns = Vec::new();
    for path in files {
        let raw = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        match email::parse_message(&raw) {
            Ok(parsed) => txns.extend(parsed),
            Err(err) => warn!("skipping {}: {err:#}", path.display()),
        }
    }
    Ok(txns)
}

fn build_classifier(no_ai: bool) -> Result<MembershipClassifier> {
    let cfg = config::load_config()?;
    if !cfg.llm.use_ai || no_ai {
        return Ok(MembershipClassifier::rule_based());
    }
    let settings = config::provider_settings(&cfg);
    match select_provider(&settings) {
        Some(llm) => Ok(MembershipClassifier::new(Strategy::ModelAssisted(llm))),
        None => {
            println!("No classification provider configured; using rules");
            Ok(MembershipClassifier::rule_based())
        }
    }
}

fn classify_and_report(txns: Vec<Transaction>, no_ai: bool, json: bool) -> Result<()> {
    let parsed = txns.len();
    let classifier = build_classifier(no_ai)?;
    println!("Classifier: {}", classifier.model_info());

    let memberships = classifier.classify(txns);

    if json {
        println!("{}", serde_json::to_string_pretty(&memberships)?);
        return Ok(());
    }

    println!(
        "{} transactions parsed, {} membership payments detected\n",
        parsed,
        memberships.len()
    );
    print_summary(&memberships);
    print_frequency_analysis(&memberships);
    Ok(())
}

/// Per-category summary: type, frequency, estimated monthly cost, total paid.
fn print_summary(memberships: &[Transaction]) {
    if memberships.is_empty() {
        println!("No recurring memberships found.");
        return;
    }

    // BTreeMap for stable output order
    let mut by_category: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
    for t in memberships {
        by_category.entry(t.category.as_str()).or_default().push(t);
    }

    println!("Memberships by category:");
    let mut monthly_total = 0.0;
    for (category, group) in &by_category {
        let first = group[0];
        let type_label = first
            .membership_type
            .map(|t| t.to_string())
            .unwrap_or_default();
        let freq_label = first
            .frequency
            .map(|f| f.to_string())
            .unwrap_or_default();
        let monthly = first.monthly_cost.unwrap_or(0.0);
        let total = first.total_paid.unwrap_or(0.0);
        monthly_total += monthly;
        println!(
            "  {category}: {type_label} / {freq_label} — ${monthly:.2}/month ({} payments, ${total:.2} total)",
            group.len()
        );
    }
    println!("  Estimated monthly total: ${monthly_total:.2}\n");
}

fn print_frequency_analysis(memberships: &[Transaction]) {
    let stats = frequency::analyze(memberships);
    if stats.is_empty() {
        return;
    }

    let ordered: BTreeMap<_, _> = stats.iter().collect();
    println!("Payment cadence:");
    for (category, s) in ordered {
        println!(
            "  {category}: {} (avg {:.1} days, {} payments, avg ${:.2})",
            s.cadence, s.avg_interval_days, s.count, s.avg_amount
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_unparseable_email_file_is_skipped() {
        let mut good = tempfile::NamedTempFile::new().unwrap();
        write!(
            good,
            "From: billing@example.com\r\n\
             Date: Sat, 21 Dec 2024 10:30:00 +0000\r\n\
             Subject: Receipt from Shop\r\n\
             Content-Type: text/plain\r\n\r\n\
             You were charged 5.99\r\n"
        )
        .unwrap();
        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, "this is not an email at all\r\n\r\n").unwrap();
        good.flush().unwrap();
        bad.flush().unwrap();

        let files = vec![bad.path().to_path_buf(), good.path().to_path_buf()];
        let txns = parse_email_files(&files).unwrap();
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].amount, 5.99);
    }

    #[test]
    fn test_missing_email_file_is_error() {
        let files = vec![PathBuf::from("/no/such/message.eml")];
        assert!(parse_email_files(&files).is_err());
    }
}
