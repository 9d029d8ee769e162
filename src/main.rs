mod cmd;
mod ledger;
mod orders;
mod tax;
mod validation;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "hodlc", version, about = "US capital gains cost basis using FIFO tax lots")]
struct Opts {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recalculate status, cost basis and gain/loss for a ledger
    Calculate(cmd::calculate::CalculateCommand),
    /// Check a ledger for issues that would prevent a calculation
    Validate(cmd::validate::ValidateCommand),
    /// Short-term and long-term totals after calculation
    Summary(cmd::summary::SummaryCommand),
    /// Start an empty ledger for a newly tracked asset
    New(cmd::new::NewCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opts = Opts::parse();
    match opts.command {
        Command::Calculate(calculate) => calculate.exec(),
        Command::Validate(validate) => validate.exec(),
        Command::Summary(summary) => summary.exec(),
        Command::New(new) => new.exec(),
    }
}
