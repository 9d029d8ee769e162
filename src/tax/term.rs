use crate::ledger::Status;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt;

/// Holding period classification for a disposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Term {
    ShortTerm,
    LongTerm,
}

impl Term {
    /// Long-term only if the sale falls after the first anniversary of the lot date
    pub fn classify(sale_date: NaiveDate, lot_date: NaiveDate) -> Self {
        if is_after(sale_date, term_boundary(lot_date)) {
            Term::LongTerm
        } else {
            Term::ShortTerm
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            Term::ShortTerm => "Short-term",
            Term::LongTerm => "Long-term",
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl From<Term> for Status {
    fn from(term: Term) -> Self {
        match term {
            Term::ShortTerm => Status::ShortTerm,
            Term::LongTerm => Status::LongTerm,
        }
    }
}

/// Date one calendar year after `lot_date`.
///
/// A 29 February lot date rolls over to 1 March when the following year is not a leap year.
pub fn term_boundary(lot_date: NaiveDate) -> NaiveDate {
    let year = lot_date.year() + 1;
    NaiveDate::from_ymd_opt(year, lot_date.month(), lot_date.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
        .unwrap_or(NaiveDate::MAX)
}

/// Whether `date` falls on a later day than `boundary`
pub fn is_after(date: NaiveDate, boundary: NaiveDate) -> bool {
    (date - boundary).num_days() > 0
}
