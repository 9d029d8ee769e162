//! Calculate command - recompute status, cost basis and gain/loss for a ledger

use crate::cmd::{run_fifo, LedgerArgs};
use crate::tax::notes;
use anyhow::Context;
use clap::Args;
use std::fs::File;
use std::io;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct CalculateCommand {
    #[command(flatten)]
    ledger: LedgerArgs,

    /// Write the calculated ledger here instead of stdout
    #[arg(short, long, conflicts_with = "in_place")]
    output: Option<PathBuf>,

    /// Overwrite the input ledger with the calculated one
    #[arg(long)]
    in_place: bool,

    /// Write cell notes (sold lots, splits) to this CSV file
    #[arg(short, long)]
    notes: Option<PathBuf>,
}

impl CalculateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let asset = self.ledger.asset();
        let mut ledger = self.ledger.read()?;
        let annotations = run_fifo(&mut ledger, &asset, self.ledger.tolerance)?;

        let output = if self.in_place {
            if self.ledger.ledger.as_os_str() == "-" {
                anyhow::bail!("--in-place needs a ledger file, not stdin");
            }
            Some(&self.ledger.ledger)
        } else {
            self.output.as_ref()
        };

        match output {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                ledger.write_csv(file)?;
                log::info!("Wrote {} rows to {}", ledger.len(), path.display());
            }
            None => ledger.write_csv(io::stdout().lock())?,
        }

        if let Some(ref path) = self.notes {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            notes::write_csv(&annotations, file)?;
            log::info!("Wrote {} notes to {}", annotations.len(), path.display());
        }

        log::info!(
            "Last calculation succeeded {}",
            chrono::Local::now().format("%B %d, %Y %H:%M")
        );
        Ok(())
    }
}
