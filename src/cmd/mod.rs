pub mod calculate;
pub mod new;
pub mod summary;
pub mod validate;

use crate::ledger::{self, Ledger, Side};
use crate::tax::{Annotation, FifoMatcher, ONE_SATOSHI};
use crate::validation;
use anyhow::Context;
use clap::Args;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;

/// Options shared by every command that reads a ledger
#[derive(Args, Debug)]
pub struct LedgerArgs {
    /// Ledger CSV file for a single asset (or "-" for stdin)
    #[arg(short, long)]
    pub ledger: PathBuf,

    /// Asset symbol used in notes, defaults to the ledger file name
    #[arg(short, long)]
    pub asset: Option<String>,

    /// Quantity differences up to this are treated as zero
    #[arg(long, default_value_t = ONE_SATOSHI)]
    pub tolerance: f64,
}

impl LedgerArgs {
    pub fn asset(&self) -> String {
        match self.asset {
            Some(ref asset) => asset.clone(),
            None if self.reads_stdin() => "ASSET".to_string(),
            None => ledger::asset_label(&self.ledger),
        }
    }

    /// Read the ledger CSV (or stdin with "-")
    pub fn read(&self) -> anyhow::Result<Ledger> {
        if self.reads_stdin() {
            let stdin = io::stdin();
            let mut buffer = Vec::new();
            stdin.lock().read_to_end(&mut buffer)?;
            if buffer.is_empty() {
                anyhow::bail!("No input received. Provide a ledger file or pipe it to stdin.");
            }
            Ledger::read_csv(buffer.as_slice())
        } else {
            let file = File::open(&self.ledger)
                .with_context(|| format!("Failed to open ledger {}", self.ledger.display()))?;
            Ledger::read_csv(BufReader::new(file))
                .with_context(|| format!("Failed to read ledger {}", self.ledger.display()))
        }
    }

    fn reads_stdin(&self) -> bool {
        self.ledger.as_os_str() == "-"
    }
}

/// Validate the ledger then recalculate its FIFO cost basis in place
pub fn run_fifo(ledger: &mut Ledger, asset: &str, tolerance: f64) -> anyhow::Result<Vec<Annotation>> {
    if let Err(errors) = validation::validate(ledger, tolerance) {
        let issues: Vec<String> = errors.iter().map(|e| format!("  {}", e)).collect();
        anyhow::bail!(
            "Ledger failed validation with {} issue(s):\n{}",
            errors.len(),
            issues.join("\n")
        );
    }

    ledger.clear_calculated();
    let mut lots = ledger.orders(Side::Acquired);
    let sales = ledger.orders(Side::Disposed);
    log::info!("Detected {} purchases of {}.", lots.len(), asset);
    log::info!("Detected {} sales of {}.", sales.len(), asset);

    let annotations = FifoMatcher::new(asset)
        .with_tolerance(tolerance)
        .run(ledger, &mut lots, &sales)?;
    Ok(annotations)
}
