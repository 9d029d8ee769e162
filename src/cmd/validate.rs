//! Validate command - surface ledger issues without calculating anything

use crate::cmd::LedgerArgs;
use crate::validation::{validate, ValidationError};
use clap::Args;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    #[command(flatten)]
    ledger: LedgerArgs,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// JSON output structure
#[derive(Debug, Serialize)]
struct ValidationOutput {
    asset: String,
    issue_count: usize,
    issues: Vec<ValidationIssue>,
}

#[derive(Debug, Serialize)]
struct ValidationIssue {
    #[serde(flatten)]
    error: ValidationError,
    message: String,
}

impl ValidateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let asset = self.ledger.asset();
        let ledger = self.ledger.read()?;
        let issues = validate(&ledger, self.ledger.tolerance).err().unwrap_or_default();

        if self.json {
            self.print_json(&asset, &issues)?;
        } else {
            self.print_text(&asset, &issues);
        }

        // Exit with code 1 if issues found
        if !issues.is_empty() {
            std::process::exit(1);
        }
        Ok(())
    }

    fn print_text(&self, asset: &str, issues: &[ValidationError]) {
        println!();
        println!("VALIDATION RESULTS ({})", asset);
        println!();

        if issues.is_empty() {
            println!("\u{2713} No issues found.");
        } else {
            println!("\u{26A0} {} issue(s) found:", issues.len());
            println!();

            for (i, issue) in issues.iter().enumerate() {
                println!("  {}. [{}] row {}", i + 1, issue.title(), issue.row());
                println!("     {}", issue);
                println!();
            }
        }
    }

    fn print_json(&self, asset: &str, issues: &[ValidationError]) -> anyhow::Result<()> {
        let output = ValidationOutput {
            asset: asset.to_string(),
            issue_count: issues.len(),
            issues: issues
                .iter()
                .map(|e| ValidationIssue {
                    error: e.clone(),
                    message: e.to_string(),
                })
                .collect(),
        };

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}
