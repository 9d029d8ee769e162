use chrono::NaiveDate;

/// A single acquisition or disposal, compacted out of the ledger
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Order {
    pub date: NaiveDate,
    pub quantity: f64,
    pub value: f64,
    /// Current position of the source row in the ledger
    pub row: usize,
}

/// Compact one side of a sparse ledger into a dense list of orders.
///
/// Only the first `row_count` rows are considered. A row contributes an order if its
/// quantity is strictly positive; blank, header and other-side rows are skipped.
pub fn extract_orders(
    dates: &[Option<NaiveDate>],
    row_count: usize,
    pairs: &[(f64, f64)],
) -> Vec<Order> {
    dates
        .iter()
        .zip(pairs)
        .take(row_count)
        .enumerate()
        .filter(|(_, (_, (quantity, _)))| *quantity > 0.0)
        .filter_map(|(row, (date, &(quantity, value)))| match date {
            Some(date) => Some(Order {
                date: *date,
                quantity,
                value,
                row,
            }),
            None => {
                log::warn!("Skipping undated order of {} on row index {}", quantity, row);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> Option<NaiveDate> {
        Some(NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap())
    }

    #[test]
    fn compacts_positive_quantities_in_row_order() {
        let dates = vec![
            None,
            None,
            date("2017-01-01"),
            date("2017-01-02"),
            date("2017-01-03"),
            date("2017-01-04"),
        ];
        let pairs = vec![
            (0.0, 0.0),
            (0.0, 0.0),
            (1.0, 1000.0),
            (0.0, 0.0),
            (0.5, 600.0),
            (2.0, 1500.0),
        ];

        let orders = extract_orders(&dates, dates.len(), &pairs);

        assert_eq!(orders.len(), 3);
        assert_eq!(orders[0].row, 2);
        assert_eq!(orders[0].quantity, 1.0);
        assert_eq!(orders[0].value, 1000.0);
        assert_eq!(orders[1].row, 4);
        assert_eq!(orders[1].date, date("2017-01-03").unwrap());
        assert_eq!(orders[2].row, 5);
    }

    #[test]
    fn respects_row_count() {
        let dates = vec![date("2017-01-01"), date("2017-01-02")];
        let pairs = vec![(1.0, 10.0), (1.0, 20.0)];

        let orders = extract_orders(&dates, 1, &pairs);

        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].value, 10.0);
    }

    #[test]
    fn negative_and_zero_quantities_are_skipped() {
        let dates = vec![date("2017-01-01"), date("2017-01-02")];
        let pairs = vec![(-1.0, 10.0), (0.0, 20.0)];

        assert!(extract_orders(&dates, 2, &pairs).is_empty());
    }

    #[test]
    fn empty_ledger_has_no_orders() {
        assert!(extract_orders(&[], 0, &[]).is_empty());
    }

    #[test]
    fn undated_rows_are_skipped() {
        let dates = vec![None, date("2017-01-02")];
        let pairs = vec![(1.0, 10.0), (1.0, 20.0)];

        let orders = extract_orders(&dates, 2, &pairs);

        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].row, 1);
    }
}
