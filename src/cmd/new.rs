//! New command - start a ledger for a newly tracked asset

use crate::ledger::Ledger;
use anyhow::Context;
use clap::Args;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct NewCommand {
    /// Asset symbol, used as the ledger file name (e.g. BTC)
    asset: String,

    /// Directory to create the ledger in
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Replace an existing ledger with an empty one
    #[arg(long)]
    force: bool,
}

impl NewCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let path = create_ledger(&self.dir, &self.asset, self.force)?;
        log::info!("Created ledger {}", path.display());
        println!("{}", path.display());
        Ok(())
    }
}

/// Write a header-only ledger for `asset` into `dir`, returning its path
pub fn create_ledger(dir: &Path, asset: &str, force: bool) -> anyhow::Result<PathBuf> {
    let asset = asset.trim();
    if asset.is_empty() || asset.contains(['/', '\\']) {
        anyhow::bail!("Invalid asset name '{}'", asset);
    }

    let path = dir.join(format!("{}.csv", asset));
    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    let file = options.open(&path).with_context(|| {
        format!(
            "Failed to create {} (use --force to replace an existing ledger)",
            path.display()
        )
    })?;

    Ledger::new(Vec::new()).write_csv(file)?;
    Ok(path)
}
