//! Summary command - short-term and long-term totals for a ledger

use crate::cmd::{run_fifo, LedgerArgs};
use crate::ledger::{format_cents, Ledger, Status};
use crate::tax::Term;
use chrono::{Datelike, NaiveDate};
use clap::Args;
use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct SummaryCommand {
    #[command(flatten)]
    ledger: LedgerArgs,

    /// Only include sales made in this calendar year
    #[arg(short, long)]
    year: Option<i32>,

    /// Output as JSON instead of formatted tables
    #[arg(long)]
    json: bool,
}

/// A sale row after calculation
#[derive(Debug, Clone, Serialize)]
struct Disposal {
    row: usize,
    date: NaiveDate,
    term: Term,
    quantity: f64,
    proceeds: f64,
    cost_basis: f64,
    gain_loss: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
struct TermTotals {
    disposal_count: usize,
    proceeds: String,
    cost_basis: String,
    gain_loss: String,
}

#[derive(Debug, Serialize)]
struct SummaryOutput {
    asset: String,
    year: String,
    short_term: TermTotals,
    long_term: TermTotals,
    disposals: Vec<Disposal>,
}

#[derive(Debug, Clone, Tabled)]
struct DisposalRow {
    #[tabled(rename = "Row")]
    row: usize,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Term")]
    term: String,
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Proceeds")]
    proceeds: String,
    #[tabled(rename = "Cost Basis")]
    cost_basis: String,
    #[tabled(rename = "Gain/Loss")]
    gain_loss: String,
}

#[derive(Debug, Clone, Tabled)]
struct TotalsRow {
    #[tabled(rename = "Term")]
    term: String,
    #[tabled(rename = "Sales")]
    disposal_count: usize,
    #[tabled(rename = "Proceeds")]
    proceeds: String,
    #[tabled(rename = "Cost Basis")]
    cost_basis: String,
    #[tabled(rename = "Gain/Loss")]
    gain_loss: String,
}

impl SummaryCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let asset = self.ledger.asset();
        let mut ledger = self.ledger.read()?;
        run_fifo(&mut ledger, &asset, self.ledger.tolerance)?;

        let disposals: Vec<Disposal> = disposals(&ledger)
            .filter(|d| self.year.is_none_or(|y| d.date.year() == y))
            .collect();
        let short_term = totals(&disposals, Term::ShortTerm);
        let long_term = totals(&disposals, Term::LongTerm);
        let year_str = self.year.map_or("All Years".to_string(), |y| y.to_string());

        if self.json {
            let output = SummaryOutput {
                asset,
                year: year_str,
                short_term,
                long_term,
                disposals,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!();
        println!("CAPITAL GAINS SUMMARY ({}, {})", year_str, asset);
        println!();

        if disposals.is_empty() {
            println!("No sales found matching filters");
            return Ok(());
        }

        let rows: Vec<DisposalRow> = disposals
            .iter()
            .map(|d| DisposalRow {
                row: d.row,
                date: d.date.format("%Y-%m-%d").to_string(),
                term: d.term.to_string(),
                quantity: format_quantity(d.quantity),
                proceeds: format_usd(d.proceeds),
                cost_basis: format_usd(d.cost_basis),
                gain_loss: format_usd(d.gain_loss),
            })
            .collect();
        println!("{}", right_aligned(Table::new(rows)));
        println!();

        let totals = [(Term::ShortTerm, short_term), (Term::LongTerm, long_term)]
            .into_iter()
            .map(|(term, t)| TotalsRow {
                term: term.to_string(),
                disposal_count: t.disposal_count,
                proceeds: t.proceeds,
                cost_basis: t.cost_basis,
                gain_loss: t.gain_loss,
            });
        println!("TOTALS");
        println!("{}", right_aligned(Table::new(totals)));
        Ok(())
    }
}

fn disposals(ledger: &Ledger) -> impl Iterator<Item = Disposal> + '_ {
    ledger
        .rows()
        .iter()
        .enumerate()
        .filter_map(move |(index, row)| {
            let term = match row.status {
                Status::ShortTerm => Term::ShortTerm,
                Status::LongTerm => Term::LongTerm,
                _ => return None,
            };
            Some(Disposal {
                row: ledger.row_number(index),
                date: row.date?,
                term,
                quantity: row.disposed_quantity,
                proceeds: row.disposed_value,
                cost_basis: row.cost_basis,
                gain_loss: row.gain_loss,
            })
        })
}

fn totals(disposals: &[Disposal], term: Term) -> TermTotals {
    let matching: Vec<_> = disposals.iter().filter(|d| d.term == term).collect();
    TermTotals {
        disposal_count: matching.len(),
        proceeds: format_cents(matching.iter().map(|d| d.proceeds).sum()),
        cost_basis: format_cents(matching.iter().map(|d| d.cost_basis).sum()),
        gain_loss: format_cents(matching.iter().map(|d| d.gain_loss).sum()),
    }
}

fn right_aligned(mut table: Table) -> String {
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string()
}

fn format_usd(amount: f64) -> String {
    let cents = format_cents(amount);
    match cents.strip_prefix('-') {
        Some(abs) => format!("-${}", abs),
        None => format!("${}", cents),
    }
}

fn format_quantity(quantity: f64) -> String {
    let s = format!("{:.8}", quantity);
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerRow;

    fn sale(d: &str, status: Status, proceeds: f64, cost_basis: f64) -> LedgerRow {
        let date = NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap();
        LedgerRow {
            status,
            cost_basis,
            gain_loss: proceeds - cost_basis,
            ..LedgerRow::disposal(date, 1.0, proceeds)
        }
    }

    #[test]
    fn totals_are_grouped_by_term() {
        let ledger = Ledger::new(vec![
            LedgerRow::default(),
            sale("2018-03-01", Status::LongTerm, 2000.0, 1000.0),
            sale("2018-03-01", Status::ShortTerm, 500.0, 1000.0),
            sale("2018-04-01", Status::ShortTerm, 1500.0, 1000.0),
        ]);

        let all: Vec<_> = disposals(&ledger).collect();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].row, 2);

        let short_term = totals(&all, Term::ShortTerm);
        assert_eq!(short_term.disposal_count, 2);
        assert_eq!(short_term.proceeds, "2000.00");
        assert_eq!(short_term.cost_basis, "2000.00");
        assert_eq!(short_term.gain_loss, "0.00");

        let long_term = totals(&all, Term::LongTerm);
        assert_eq!(long_term.disposal_count, 1);
        assert_eq!(long_term.gain_loss, "1000.00");
    }

    #[test]
    fn usd_amounts_keep_sign_outside_symbol() {
        assert_eq!(format_usd(-14.414), "-$14.41");
        assert_eq!(format_usd(69.666), "$69.67");
        assert_eq!(format_quantity(0.30000000000000004), "0.3");
        assert_eq!(format_quantity(2.0), "2");
    }
}
