use crate::orders::{extract_orders, Order};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::io::{Read, Write};
use std::ops::{Index, IndexMut};
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("invalid date '{value}' on row {row}")]
    InvalidDate { row: usize, value: String },
    #[error("invalid status '{value}' on row {row}")]
    InvalidStatus { row: usize, value: String },
}

/// Calculated status of a ledger row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Blank,
    /// Percentage of an acquired lot consumed by sales so far
    Sold(u32),
    ShortTerm,
    LongTerm,
}

impl Status {
    /// Lot status for the consumed fraction, rounded to the nearest whole percent
    pub fn sold_fraction(fraction: f64) -> Self {
        Status::Sold((fraction * 100.0).round().max(0.0) as u32)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Blank => Ok(()),
            Status::Sold(percent) => write!(f, "{}% Sold", percent),
            Status::ShortTerm => write!(f, "Short-term"),
            Status::LongTerm => write!(f, "Long-term"),
        }
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Ok(Status::Blank),
            "Short-term" => Ok(Status::ShortTerm),
            "Long-term" => Ok(Status::LongTerm),
            other => other
                .strip_suffix("% Sold")
                .and_then(|percent| percent.parse().ok())
                .map(Status::Sold)
                .ok_or_else(|| other.to_string()),
        }
    }
}

/// Sheet columns of the ledger, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Date,
    Category,
    AcquiredQuantity,
    AcquiredValue,
    DisposedQuantity,
    DisposedValue,
    Status,
    CostBasis,
    GainLoss,
    Notes,
}

impl Column {
    pub const ALL: [Column; 10] = [
        Column::Date,
        Column::Category,
        Column::AcquiredQuantity,
        Column::AcquiredValue,
        Column::DisposedQuantity,
        Column::DisposedValue,
        Column::Status,
        Column::CostBasis,
        Column::GainLoss,
        Column::Notes,
    ];

    /// CSV header name
    pub fn header(self) -> &'static str {
        match self {
            Column::Date => "date",
            Column::Category => "category",
            Column::AcquiredQuantity => "acquired_quantity",
            Column::AcquiredValue => "acquired_value",
            Column::DisposedQuantity => "disposed_quantity",
            Column::DisposedValue => "disposed_value",
            Column::Status => "status",
            Column::CostBasis => "cost_basis",
            Column::GainLoss => "gain_loss",
            Column::Notes => "notes",
        }
    }

    pub fn letter(self) -> char {
        match self {
            Column::Date => 'A',
            Column::Category => 'B',
            Column::AcquiredQuantity => 'C',
            Column::AcquiredValue => 'D',
            Column::DisposedQuantity => 'E',
            Column::DisposedValue => 'F',
            Column::Status => 'G',
            Column::CostBasis => 'H',
            Column::GainLoss => 'I',
            Column::Notes => 'J',
        }
    }
}

/// A1-style cell address, e.g. `E4`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub column: Column,
    pub row: usize,
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column.letter(), self.row)
    }
}

impl Serialize for CellRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Which side of the ledger an order is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Acquired,
    Disposed,
}

/// One line of the asset ledger
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerRow {
    pub date: Option<NaiveDate>,
    pub category: String,
    pub acquired_quantity: f64,
    pub acquired_value: f64,
    pub disposed_quantity: f64,
    pub disposed_value: f64,
    pub status: Status,
    pub cost_basis: f64,
    pub gain_loss: f64,
    pub notes: String,
}

impl LedgerRow {
    #[cfg(test)]
    pub fn acquisition(date: NaiveDate, quantity: f64, value: f64) -> Self {
        LedgerRow {
            date: Some(date),
            acquired_quantity: quantity,
            acquired_value: value,
            ..Default::default()
        }
    }

    pub fn disposal(date: NaiveDate, quantity: f64, value: f64) -> Self {
        LedgerRow {
            date: Some(date),
            disposed_quantity: quantity,
            disposed_value: value,
            ..Default::default()
        }
    }

    /// `(quantity, value)` recorded on one side of the row
    pub fn side(&self, side: Side) -> (f64, f64) {
        match side {
            Side::Acquired => (self.acquired_quantity, self.acquired_value),
            Side::Disposed => (self.disposed_quantity, self.disposed_value),
        }
    }
}

/// Ordered, insertable sequence of ledger rows.
///
/// Rows are addressed by their current position. `first_row` is the sheet row
/// number of position 0, used when rows are referred to in notes.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    rows: Vec<LedgerRow>,
    first_row: usize,
}

impl Ledger {
    pub fn new(rows: Vec<LedgerRow>) -> Self {
        Ledger { rows, first_row: 1 }
    }

    pub fn with_first_row(mut self, first_row: usize) -> Self {
        self.first_row = first_row;
        self
    }

    pub fn rows(&self) -> &[LedgerRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Sheet row number of the row at `index`
    pub fn row_number(&self, index: usize) -> usize {
        index + self.first_row
    }

    pub fn cell(&self, column: Column, index: usize) -> CellRef {
        CellRef {
            column,
            row: self.row_number(index),
        }
    }

    /// Insert `row` directly after `index`, shifting every later row down by one.
    /// Returns the position of the new row.
    pub fn insert_after(&mut self, index: usize, row: LedgerRow) -> usize {
        self.rows.insert(index + 1, row);
        index + 1
    }

    /// Number of rows up to and including the last row that carries a date
    pub fn last_row_with_data(&self) -> usize {
        self.rows
            .iter()
            .rposition(|row| row.date.is_some())
            .map_or(0, |index| index + 1)
    }

    /// Reset the status, cost basis and gain columns ahead of a recalculation
    pub fn clear_calculated(&mut self) {
        for row in &mut self.rows {
            row.status = Status::Blank;
            row.cost_basis = 0.0;
            row.gain_loss = 0.0;
        }
    }

    pub fn dates(&self) -> Vec<Option<NaiveDate>> {
        self.rows.iter().map(|row| row.date).collect()
    }

    pub fn pairs(&self, side: Side) -> Vec<(f64, f64)> {
        self.rows.iter().map(|row| row.side(side)).collect()
    }

    /// Acquisitions or disposals of the ledger, in row order
    pub fn orders(&self, side: Side) -> Vec<Order> {
        extract_orders(&self.dates(), self.last_row_with_data(), &self.pairs(side))
    }

    /// Read a ledger from CSV. The header line is sheet row 1.
    pub fn read_csv<R: Read>(reader: R) -> anyhow::Result<Ledger> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut rows = Vec::new();
        for (index, result) in rdr.deserialize::<LedgerRecord>().enumerate() {
            let record = result?;
            rows.push(record.into_row(index + 2)?);
        }
        Ok(Ledger::new(rows).with_first_row(2))
    }

    /// Write the ledger as CSV. The header line is always written, so an empty ledger
    /// gives a blank template.
    pub fn write_csv<W: Write>(&self, writer: W) -> anyhow::Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        wtr.write_record(Column::ALL.iter().map(|column| column.header()))?;
        for row in &self.rows {
            wtr.serialize(LedgerCsvRecord::from(row))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl Index<usize> for Ledger {
    type Output = LedgerRow;

    fn index(&self, index: usize) -> &LedgerRow {
        &self.rows[index]
    }
}

impl IndexMut<usize> for Ledger {
    fn index_mut(&mut self, index: usize) -> &mut LedgerRow {
        &mut self.rows[index]
    }
}

/// Asset label for a ledger file: the file name with any parenthesised parts removed,
/// so `BTC (Coinbase).csv` is labelled `BTC`
pub fn asset_label(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut label = String::with_capacity(stem.len());
    let mut depth = 0usize;
    for c in stem.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => label.push(c),
            _ => {}
        }
    }
    label.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// CSV record format for a ledger row
#[derive(Debug, Clone, Default, Deserialize)]
struct LedgerRecord {
    #[serde(default)]
    date: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    acquired_quantity: Option<f64>,
    #[serde(default)]
    acquired_value: Option<f64>,
    #[serde(default)]
    disposed_quantity: Option<f64>,
    #[serde(default)]
    disposed_value: Option<f64>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    cost_basis: Option<f64>,
    #[serde(default)]
    gain_loss: Option<f64>,
    #[serde(default)]
    notes: String,
}

impl LedgerRecord {
    fn into_row(self, row: usize) -> Result<LedgerRow, LedgerError> {
        let date = parse_date(&self.date).map_err(|value| LedgerError::InvalidDate { row, value })?;
        let status = self
            .status
            .parse()
            .map_err(|value| LedgerError::InvalidStatus { row, value })?;
        Ok(LedgerRow {
            date,
            category: self.category,
            acquired_quantity: self.acquired_quantity.unwrap_or_default(),
            acquired_value: self.acquired_value.unwrap_or_default(),
            disposed_quantity: self.disposed_quantity.unwrap_or_default(),
            disposed_value: self.disposed_value.unwrap_or_default(),
            status,
            cost_basis: self.cost_basis.unwrap_or_default(),
            gain_loss: self.gain_loss.unwrap_or_default(),
            notes: self.notes,
        })
    }
}

/// CSV output record, zero amounts are left blank
#[derive(Debug, Serialize)]
struct LedgerCsvRecord {
    date: String,
    category: String,
    acquired_quantity: String,
    acquired_value: String,
    disposed_quantity: String,
    disposed_value: String,
    status: String,
    cost_basis: String,
    gain_loss: String,
    notes: String,
}

impl From<&LedgerRow> for LedgerCsvRecord {
    fn from(row: &LedgerRow) -> Self {
        let calculated = row.date.is_some() || row.status != Status::Blank;
        LedgerCsvRecord {
            date: row
                .date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            category: row.category.clone(),
            acquired_quantity: format_amount(row.acquired_quantity),
            acquired_value: format_amount(row.acquired_value),
            disposed_quantity: format_amount(row.disposed_quantity),
            disposed_value: format_amount(row.disposed_value),
            status: row.status.to_string(),
            cost_basis: if calculated { format_cents(row.cost_basis) } else { String::new() },
            gain_loss: if calculated { format_cents(row.gain_loss) } else { String::new() },
            notes: row.notes.clone(),
        }
    }
}

/// Parse a `YYYY-MM-DD` (or `YYYY/MM/DD`) date; blank cells have no date
fn parse_date(s: &str) -> Result<Option<NaiveDate>, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .map(Some)
        .map_err(|_| s.to_string())
}

fn format_amount(amount: f64) -> String {
    if amount == 0.0 {
        String::new()
    } else {
        amount.to_string()
    }
}

pub fn format_cents(amount: f64) -> String {
    let rounded = format!("{:.2}", amount);
    // avoid "-0.00" for tiny negative residues
    if rounded == "-0.00" {
        "0.00".to_string()
    } else {
        rounded
    }
}
