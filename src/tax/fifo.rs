//! FIFO tax-lot matching.
//!
//! Lots and sales are walked in parallel. A single lot cursor is shared by every sale,
//! so lots are consumed strictly oldest first across the whole ledger. When the lots
//! behind one sale straddle the one-year boundary the sale is split into a long-term
//! row and a newly inserted short-term row.

use super::notes::{sold_lots_note, split_note, Annotation};
use super::term::{is_after, term_boundary, Term};
use crate::ledger::{Column, Ledger, LedgerRow, Status};
use crate::orders::Order;

/// Smallest fractional unit (1e-8), quantity differences up to this are treated as zero
pub const ONE_SATOSHI: f64 = 0.000_000_01;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MatchError {
    #[error("sale on row {row} still needs {remaining} units after all lots were consumed")]
    InsufficientLots { row: usize, remaining: f64 },
}

/// Match `sales` against `lots` with the default tolerance.
///
/// See [`FifoMatcher::run`].
#[cfg(test)]
pub fn match_lots(
    asset: &str,
    ledger: &mut Ledger,
    lots: &mut [Order],
    sales: &[Order],
) -> Result<Vec<Annotation>, MatchError> {
    FifoMatcher::new(asset).run(ledger, lots, sales)
}

/// FIFO cost basis calculator for a single asset ledger
#[derive(Debug, Clone)]
pub struct FifoMatcher<'a> {
    asset: &'a str,
    tolerance: f64,
}

impl<'a> FifoMatcher<'a> {
    pub fn new(asset: &'a str) -> Self {
        FifoMatcher {
            asset,
            tolerance: ONE_SATOSHI,
        }
    }

    /// Override the quantity tolerance, e.g. for assets with a different minimum unit
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Consume `lots` in order to cover `sales`, writing status, cost basis and gain/loss
    /// into `ledger`.
    ///
    /// Both order lists must be in ledger row order and the ledger must already be
    /// validated. Rows may be inserted into the ledger when a sale is split, in which case
    /// the `row` of every affected lot is moved along with it. Returns the notes to attach
    /// to ledger cells.
    pub fn run(
        &self,
        ledger: &mut Ledger,
        lots: &mut [Order],
        sales: &[Order],
    ) -> Result<Vec<Annotation>, MatchError> {
        if sales.is_empty() {
            if let Some(first) = lots.first() {
                ledger[first.row].status = Status::Sold(0);
            }
            return Ok(Vec::new());
        }

        let cursor = LotCursor::start(lots);
        let mut run = MatchRun {
            asset: self.asset,
            tolerance: self.tolerance,
            ledger,
            lots,
            cursor,
            shift: 0,
            annotations: Vec::new(),
        };
        for sale in sales {
            run.sell(sale)?;
        }
        Ok(run.annotations)
    }
}

/// Next lot with quantity left to sell. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LotCursor {
    index: usize,
    remaining: f64,
}

impl LotCursor {
    fn start(lots: &[Order]) -> Self {
        LotCursor {
            index: 0,
            remaining: lots.first().map_or(0.0, |lot| lot.quantity),
        }
    }

    fn advance(&mut self, lots: &[Order]) {
        self.index += 1;
        self.remaining = lots.get(self.index).map_or(0.0, |lot| lot.quantity);
    }
}

/// Running totals for the sale currently being matched
#[derive(Debug)]
struct SaleState {
    remaining: f64,
    total_quantity: f64,
    total_cost: f64,
    /// Fraction of the sale reported on the long-term row
    split_factor: f64,
    term_split: bool,
    /// Set when a split left nothing worth a second row
    suppressed: bool,
    /// First lot to mention in the next sold-lot note
    first_lot: usize,
}

impl SaleState {
    fn new(sale: &Order, first_lot: usize) -> Self {
        SaleState {
            remaining: sale.quantity,
            total_quantity: 0.0,
            total_cost: 0.0,
            split_factor: 0.0,
            term_split: false,
            suppressed: false,
            first_lot,
        }
    }

    fn accumulate(&mut self, lot: &Order, quantity: f64) {
        self.total_quantity += quantity;
        self.total_cost += lot.value * (quantity / lot.quantity);
    }

    /// Average cost per unit of the lots folded in so far, or the unit cost of `lot`
    /// when nothing has been folded yet
    fn average_cost(&self, lot: &Order) -> f64 {
        if self.total_quantity == 0.0 {
            lot.value / lot.quantity
        } else {
            self.total_cost / self.total_quantity
        }
    }
}

struct MatchRun<'a, 'l> {
    asset: &'a str,
    tolerance: f64,
    ledger: &'l mut Ledger,
    lots: &'l mut [Order],
    cursor: LotCursor,
    /// Rows inserted so far, sale rows sit this far below their extracted position
    shift: usize,
    annotations: Vec<Annotation>,
}

impl MatchRun<'_, '_> {
    fn sell(&mut self, sale: &Order) -> Result<(), MatchError> {
        let mut state = SaleState::new(sale, self.cursor.index);

        while let Some(lot) = self.lots.get(self.cursor.index).copied() {
            let lot_index = self.cursor.index;

            if state.remaining <= self.cursor.remaining {
                if (state.remaining - self.cursor.remaining).abs() <= self.tolerance {
                    self.ledger[lot.row].status = Status::Sold(100);
                    self.cursor.advance(self.lots);
                } else {
                    self.cursor.remaining -= state.remaining;
                    self.ledger[lot.row].status =
                        Status::sold_fraction(1.0 - self.cursor.remaining / lot.quantity);
                }
                log::debug!(
                    "Sale row {} takes {} from lot row {}",
                    self.ledger.row_number(sale.row + self.shift),
                    state.remaining,
                    self.ledger.row_number(lot.row)
                );
                let consumed = state.remaining;
                self.finish_sale(sale, &mut state, lot_index, consumed);
                return Ok(());
            }

            // this lot is used up and the sale needs more
            let this_term = term_boundary(lot.date);
            let next_term = self
                .lots
                .get(lot_index + 1)
                .map_or(sale.date, |next| term_boundary(next.date));
            let lot_remaining = self.cursor.remaining;
            log::debug!(
                "Sale row {} takes remaining {} from lot row {}",
                self.ledger.row_number(sale.row + self.shift),
                lot_remaining,
                self.ledger.row_number(lot.row)
            );
            state.accumulate(&lot, lot_remaining);

            if is_after(sale.date, this_term) && is_after(next_term, sale.date) {
                self.split_sale(sale, &mut state, lot_index);
            }

            state.remaining -= lot_remaining;
            self.ledger[lot.row].status = Status::Sold(100);
            self.cursor.advance(self.lots);
        }

        // Lots ran out. Absorb rounding residue on the last lot, anything else is an oversell.
        match self.cursor.index.checked_sub(1) {
            Some(last) if state.remaining.abs() <= self.tolerance => {
                // a dust sale can start with the cursor already past the last lot
                state.first_lot = state.first_lot.min(last);
                self.finish_sale(sale, &mut state, last, 0.0);
                Ok(())
            }
            _ => Err(MatchError::InsufficientLots {
                row: self.ledger.row_number(sale.row + self.shift),
                remaining: state.remaining,
            }),
        }
    }

    /// Post the result of a sale once the lot at `lot_index` covers the rest of it
    fn finish_sale(
        &mut self,
        sale: &Order,
        state: &mut SaleState,
        lot_index: usize,
        consumed: f64,
    ) {
        let row = sale.row + self.shift;

        let lot = self.lots[lot_index];
        if !state.term_split {
            self.ledger[row].status = Term::classify(sale.date, lot.date).into();
        }

        if state.suppressed {
            return;
        }

        state.accumulate(&lot, consumed);
        let remaining_share = 1.0 - state.split_factor;
        let cost_basis = sale.quantity * state.average_cost(&lot) * remaining_share;
        let gain_loss = sale.value * remaining_share - cost_basis;

        let entry = &mut self.ledger[row];
        entry.cost_basis = cost_basis;
        entry.gain_loss = gain_loss;
        self.annotate_sold_lots(row, state.first_lot, lot_index);
    }

    /// Report the long-term part of a sale on its own row and move the short-term
    /// remainder onto a new row directly below it
    fn split_sale(&mut self, sale: &Order, state: &mut SaleState, lot_index: usize) {
        state.term_split = true;
        state.split_factor = state.total_quantity / sale.quantity;

        let lot = self.lots[lot_index];
        let cost_basis = sale.quantity * state.average_cost(&lot) * state.split_factor;
        let gain_loss = sale.value * state.split_factor - cost_basis;

        let row = sale.row + self.shift;
        let original = self.ledger[row].clone();
        let long_term = &mut self.ledger[row];
        long_term.disposed_quantity = original.disposed_quantity * state.split_factor;
        long_term.disposed_value = original.disposed_value * state.split_factor;
        long_term.status = Status::LongTerm;
        long_term.cost_basis = cost_basis;
        long_term.gain_loss = gain_loss;
        self.annotate_sold_lots(row, state.first_lot, lot_index);

        let short_share = 1.0 - state.split_factor;
        if original.disposed_quantity * short_share >= self.tolerance {
            let text = split_note(
                original.disposed_quantity,
                self.asset,
                original.disposed_value,
                self.ledger.row_number(row),
            );
            let short_term = LedgerRow {
                category: original.category.clone(),
                status: Status::ShortTerm,
                ..LedgerRow::disposal(
                    sale.date,
                    original.disposed_quantity * short_share,
                    original.disposed_value * short_share,
                )
            };
            let inserted = self.ledger.insert_after(row, short_term);
            self.shift += 1;
            log::debug!(
                "Split sale row {} at the long-term boundary, short-term part on row {}",
                self.ledger.row_number(row),
                self.ledger.row_number(inserted)
            );

            self.annotate(Column::Date, row, text.clone());
            self.annotate(Column::Date, inserted, text);

            for lot in self.lots.iter_mut().filter(|lot| lot.row >= inserted) {
                lot.row += 1;
            }
            state.first_lot = lot_index + 1;
        } else {
            // already split on a previous run
            state.suppressed = true;
        }

        state.total_quantity = 0.0;
        state.total_cost = 0.0;
    }

    fn annotate_sold_lots(&mut self, row: usize, first_lot: usize, last_lot: usize) {
        let first = self.lots[first_lot];
        let last = self.lots[last_lot];
        let text = sold_lots_note(
            self.ledger.row_number(first.row),
            first.date,
            self.ledger.row_number(last.row),
            last.date,
        );
        self.annotate(Column::DisposedQuantity, row, text);
    }

    fn annotate(&mut self, column: Column, row: usize, text: String) {
        self.annotations.push(Annotation {
            cell: self.ledger.cell(column, row),
            text,
        });
    }
}
