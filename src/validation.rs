//! Pre-flight checks run before the cost basis calculation

use crate::ledger::{Column, Ledger};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ValidationError {
    #[error("Missing Date: row {row} has an amount but no date.")]
    MissingDate { row: usize },
    #[error("Date Out of Order: row {row} ({date}) is earlier than row {previous_row} ({previous_date}).")]
    DateOutOfOrder {
        row: usize,
        date: NaiveDate,
        previous_row: usize,
        previous_date: NaiveDate,
    },
    #[error("Negative Quantity: row {row} has a negative quantity in column {column}.")]
    NegativeQuantity { row: usize, column: char },
    #[error("Negative Value: row {row} has a negative value in column {column}.")]
    NegativeValue { row: usize, column: char },
    #[error("Buy and Sell on Same Row: row {row} has both an acquired and a disposed quantity.")]
    BuyAndSellOnSameRow { row: usize },
    #[error("Coin Oversold: row {row} ({date}) sells {shortfall:.8} more than is held.")]
    Oversold {
        row: usize,
        date: NaiveDate,
        shortfall: f64,
    },
}

impl ValidationError {
    pub fn title(&self) -> &'static str {
        match self {
            ValidationError::MissingDate { .. } => "Missing Date",
            ValidationError::DateOutOfOrder { .. } => "Date Out of Order",
            ValidationError::NegativeQuantity { .. } => "Negative Quantity",
            ValidationError::NegativeValue { .. } => "Negative Value",
            ValidationError::BuyAndSellOnSameRow { .. } => "Buy and Sell on Same Row",
            ValidationError::Oversold { .. } => "Coin Oversold",
        }
    }

    /// Sheet row number the issue was found on
    pub fn row(&self) -> usize {
        match *self {
            ValidationError::MissingDate { row }
            | ValidationError::DateOutOfOrder { row, .. }
            | ValidationError::NegativeQuantity { row, .. }
            | ValidationError::NegativeValue { row, .. }
            | ValidationError::BuyAndSellOnSameRow { row }
            | ValidationError::Oversold { row, .. } => row,
        }
    }
}

/// Check that a ledger can be handed to the matcher.
///
/// Every issue is collected rather than stopping at the first. The running balance is
/// reset after an oversell is reported so one bad sale is not repeated on every later row.
pub fn validate(ledger: &Ledger, tolerance: f64) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut previous: Option<(usize, NaiveDate)> = None;
    let mut balance = 0.0;

    for (index, entry) in ledger.rows()[..ledger.last_row_with_data()].iter().enumerate() {
        let row = ledger.row_number(index);
        let amounts = [
            (Column::AcquiredQuantity, entry.acquired_quantity),
            (Column::AcquiredValue, entry.acquired_value),
            (Column::DisposedQuantity, entry.disposed_quantity),
            (Column::DisposedValue, entry.disposed_value),
        ];
        let has_amounts = amounts.iter().any(|(_, amount)| *amount != 0.0);

        let date = match entry.date {
            Some(date) => date,
            None => {
                if has_amounts {
                    errors.push(ValidationError::MissingDate { row });
                }
                continue;
            }
        };

        if let Some((previous_row, previous_date)) = previous {
            if date < previous_date {
                errors.push(ValidationError::DateOutOfOrder {
                    row,
                    date,
                    previous_row,
                    previous_date,
                });
            }
        }
        previous = Some((row, date));

        for (column, amount) in amounts {
            if amount < 0.0 {
                let column_letter = column.letter();
                errors.push(match column {
                    Column::AcquiredQuantity | Column::DisposedQuantity => {
                        ValidationError::NegativeQuantity {
                            row,
                            column: column_letter,
                        }
                    }
                    _ => ValidationError::NegativeValue {
                        row,
                        column: column_letter,
                    },
                });
            }
        }

        if entry.acquired_quantity > 0.0 && entry.disposed_quantity > 0.0 {
            errors.push(ValidationError::BuyAndSellOnSameRow { row });
        }

        balance += entry.acquired_quantity.max(0.0) - entry.disposed_quantity.max(0.0);
        if balance < -tolerance {
            errors.push(ValidationError::Oversold {
                row,
                date,
                shortfall: -balance,
            });
            balance = 0.0;
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerRow;
    use crate::tax::ONE_SATOSHI;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn row(d: &str, acquired: (f64, f64), disposed: (f64, f64)) -> LedgerRow {
        LedgerRow {
            date: Some(date(d)),
            acquired_quantity: acquired.0,
            acquired_value: acquired.1,
            disposed_quantity: disposed.0,
            disposed_value: disposed.1,
            ..Default::default()
        }
    }

    fn sheet(rows: Vec<LedgerRow>) -> Ledger {
        let mut all = vec![LedgerRow::default(), LedgerRow::default()];
        all.extend(rows);
        Ledger::new(all)
    }

    #[test]
    fn valid_ledger_passes() {
        let ledger = sheet(vec![
            row("2017-01-01", (1.0, 1000.0), (0.0, 0.0)),
            row("2017-01-02", (1.0, 1000.0), (0.0, 0.0)),
            row("2017-01-02", (0.0, 0.0), (2.0, 2000.0)),
        ]);
        assert_eq!(validate(&ledger, ONE_SATOSHI), Ok(()));
    }

    #[test]
    fn dates_out_of_order() {
        let ledger = sheet(vec![
            row("2017-01-01", (1.0, 1000.0), (0.0, 0.0)),
            row("2017-01-02", (1.0, 1000.0), (0.0, 0.0)),
            row("2017-01-02", (0.0, 0.0), (0.5, 2000.0)),
            row("2017-01-01", (0.0, 0.0), (1.0, 2000.0)),
        ]);

        let errors = validate(&ledger, ONE_SATOSHI).unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].title(), "Date Out of Order");
        assert_eq!(errors[0].row(), 6);
        assert_eq!(
            errors[0].to_string(),
            "Date Out of Order: row 6 (2017-01-01) is earlier than row 5 (2017-01-02)."
        );
    }

    #[test]
    fn coin_oversold() {
        let ledger = sheet(vec![
            row("2017-01-01", (1.0, 1000.0), (0.0, 0.0)),
            row("2017-01-02", (1.0, 1000.0), (0.0, 0.0)),
            row("2017-01-03", (0.0, 0.0), (0.5, 2000.0)),
            row("2017-01-04", (0.0, 0.0), (2.0, 2000.0)),
        ]);

        let errors = validate(&ledger, ONE_SATOSHI).unwrap_err();

        assert_eq!(
            errors,
            vec![ValidationError::Oversold {
                row: 6,
                date: date("2017-01-04"),
                shortfall: 0.5
            }]
        );
        assert_eq!(
            errors[0].to_string(),
            "Coin Oversold: row 6 (2017-01-04) sells 0.50000000 more than is held."
        );
    }

    #[test]
    fn oversell_within_tolerance_is_accepted() {
        let ledger = sheet(vec![
            row("2021-01-01", (0.7, 700.0), (0.0, 0.0)),
            row("2021-02-01", (0.1, 100.0), (0.0, 0.0)),
            row("2021-03-01", (0.0, 0.0), (0.8, 1600.0)),
        ]);
        assert_eq!(validate(&ledger, ONE_SATOSHI), Ok(()));
    }

    #[test]
    fn buy_and_sell_on_same_row() {
        let ledger = sheet(vec![
            row("2017-01-01", (1.0, 1000.0), (0.0, 0.0)),
            row("2017-01-02", (1.0, 1000.0), (0.5, 0.0)),
            row("2017-01-03", (0.0, 0.0), (0.5, 2000.0)),
        ]);

        let errors = validate(&ledger, ONE_SATOSHI).unwrap_err();

        assert_eq!(errors, vec![ValidationError::BuyAndSellOnSameRow { row: 4 }]);
    }

    #[test]
    fn negative_amounts_name_the_column() {
        let ledger = sheet(vec![
            row("2017-01-01", (1.0, -1000.0), (0.0, 0.0)),
            row("2017-01-02", (0.0, 0.0), (-0.5, 100.0)),
        ]);

        let errors = validate(&ledger, ONE_SATOSHI).unwrap_err();

        assert_eq!(
            errors,
            vec![
                ValidationError::NegativeValue { row: 3, column: 'D' },
                ValidationError::NegativeQuantity { row: 4, column: 'E' },
            ]
        );
    }

    #[test]
    fn undated_amounts_are_reported() {
        let mut undated = row("2017-01-02", (1.0, 10.0), (0.0, 0.0));
        undated.date = None;
        let ledger = sheet(vec![
            row("2017-01-01", (1.0, 1000.0), (0.0, 0.0)),
            undated,
            row("2017-01-03", (0.0, 0.0), (0.5, 2000.0)),
        ]);

        let errors = validate(&ledger, ONE_SATOSHI).unwrap_err();

        assert_eq!(errors, vec![ValidationError::MissingDate { row: 4 }]);
    }

    #[test]
    fn every_issue_is_collected() {
        let ledger = sheet(vec![
            row("2017-01-02", (1.0, 1000.0), (0.0, 0.0)),
            row("2017-01-01", (0.0, 0.0), (2.0, 2000.0)),
            row("2017-01-03", (0.0, 0.0), (0.5, 2000.0)),
        ]);

        let errors = validate(&ledger, ONE_SATOSHI).unwrap_err();
        let titles: Vec<_> = errors.iter().map(|e| e.title()).collect();

        assert_eq!(titles, vec!["Date Out of Order", "Coin Oversold", "Coin Oversold"]);
    }
}
