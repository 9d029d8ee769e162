use crate::ledger::CellRef;
use chrono::NaiveDate;
use serde::Serialize;
use std::io::Write;

/// Note text to attach to a ledger cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub cell: CellRef,
    pub text: String,
}

/// Which lots a sale consumed, e.g. "Sold lots from row 3 on 2017-01-01 to row 5 on 2017-03-01."
pub fn sold_lots_note(
    start_row: usize,
    start_date: NaiveDate,
    end_row: usize,
    end_date: NaiveDate,
) -> String {
    if start_row == end_row {
        format!("Sold lot from row {} on {}.", end_row, end_date.format("%Y-%m-%d"))
    } else {
        format!(
            "Sold lots from row {} on {} to row {} on {}.",
            start_row,
            start_date.format("%Y-%m-%d"),
            end_row,
            end_date.format("%Y-%m-%d")
        )
    }
}

/// Records the original amounts of a sale split across the long-term boundary
pub fn split_note(quantity: f64, asset: &str, value: f64, row: usize) -> String {
    format!(
        "Originally {:.8} {} was sold for ${:.2} and split into rows {} and {}.",
        quantity,
        asset,
        value,
        row,
        row + 1
    )
}

/// Write annotations to CSV
pub fn write_csv<W: Write>(annotations: &[Annotation], writer: W) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for annotation in annotations {
        wtr.serialize(annotation)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Column;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn single_lot_note() {
        let d = date("2017-01-01");
        assert_eq!(sold_lots_note(3, d, 3, d), "Sold lot from row 3 on 2017-01-01.");
    }

    #[test]
    fn lot_range_note() {
        assert_eq!(
            sold_lots_note(4, date("2018-02-01"), 8, date("2018-03-02")),
            "Sold lots from row 4 on 2018-02-01 to row 8 on 2018-03-02."
        );
    }

    #[test]
    fn split_note_formats_original_amounts() {
        assert_eq!(
            split_note(829.14, "BTC", 151.26, 28),
            "Originally 829.14000000 BTC was sold for $151.26 and split into rows 28 and 29."
        );
        assert_eq!(
            split_note(2.0, "ASSET", 4000.0, 5),
            "Originally 2.00000000 ASSET was sold for $4000.00 and split into rows 5 and 6."
        );
    }

    #[test]
    fn annotations_csv_uses_cell_addresses() {
        let annotations = vec![Annotation {
            cell: CellRef {
                column: Column::DisposedQuantity,
                row: 4,
            },
            text: "Sold lot from row 3 on 2017-01-01.".to_string(),
        }];

        let mut out = Vec::new();
        write_csv(&annotations, &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "cell,text\nE4,Sold lot from row 3 on 2017-01-01.\n"
        );
    }
}
