use serde::{Deserialize, Serialize};

use stockhouse_core::{DomainError, DomainResult, ensure_within_limit};

use crate::period::Period;

/// Fitting tries and closed sales of one employee in one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesTally {
    pub username: String,
    pub period: Period,
    pub tries: i64,
    pub sales: i64,
}

/// Classic and deluxe overtime units of one employee in one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeTally {
    pub username: String,
    pub period: Period,
    pub classic: i64,
    pub deluxe: i64,
}

/// Add a signed increment; corrections may be negative but the counter may not.
fn bump(counter: i64, increment: i64, what: &str) -> DomainResult<i64> {
    let next = counter
        .checked_add(increment)
        .ok_or_else(|| DomainError::invalid_quantity(format!("{what} out of range")))?;
    ensure_within_limit(next, what)?;
    if next < 0 {
        return Err(DomainError::invalid_quantity(format!(
            "{what} cannot drop below zero (current {counter}, change {increment})"
        )));
    }
    Ok(next)
}

fn ensure_some(a: i64, b: i64) -> DomainResult<()> {
    if a == 0 && b == 0 {
        return Err(DomainError::invalid_quantity("nothing to record"));
    }
    Ok(())
}

impl SalesTally {
    pub fn new(username: impl Into<String>, period: Period) -> Self {
        Self {
            username: username.into(),
            period,
            tries: 0,
            sales: 0,
        }
    }

    /// Apply increments atomically: on error the tally is unchanged.
    pub fn record(&mut self, tries: i64, sales: i64) -> DomainResult<()> {
        ensure_some(tries, sales)?;
        let next_tries = bump(self.tries, tries, "tries")?;
        let next_sales = bump(self.sales, sales, "sales")?;
        self.tries = next_tries;
        self.sales = next_sales;
        Ok(())
    }
}

impl OvertimeTally {
    pub fn new(username: impl Into<String>, period: Period) -> Self {
        Self {
            username: username.into(),
            period,
            classic: 0,
            deluxe: 0,
        }
    }

    pub fn record(&mut self, classic: i64, deluxe: i64) -> DomainResult<()> {
        ensure_some(classic, deluxe)?;
        let next_classic = bump(self.classic, classic, "classic overtime")?;
        let next_deluxe = bump(self.deluxe, deluxe, "deluxe overtime")?;
        self.classic = next_classic;
        self.deluxe = next_deluxe;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn march() -> Period {
        Period::new(2024, 3).unwrap()
    }

    #[test]
    fn sales_record_accumulates() {
        let mut t = SalesTally::new("jana", march());
        t.record(5, 2).unwrap();
        t.record(3, 0).unwrap();
        assert_eq!((t.tries, t.sales), (8, 2));
    }

    #[test]
    fn correction_below_zero_is_rejected_without_partial_update() {
        let mut t = SalesTally::new("jana", march());
        t.record(5, 2).unwrap();
        let err = t.record(-1, -3).unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity(_)));
        assert_eq!((t.tries, t.sales), (5, 2));

        t.record(-1, -1).unwrap();
        assert_eq!((t.tries, t.sales), (4, 1));
    }

    #[test]
    fn counters_stay_within_quantity_limit() {
        let mut t = OvertimeTally::new("petr", march());
        t.record(stockhouse_core::MAX_QUANTITY, 1).unwrap();
        let err = t.record(1, 0).unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity(_)));
        assert_eq!(t.classic, stockhouse_core::MAX_QUANTITY);
    }

    #[test]
    fn empty_record_is_rejected() {
        let mut t = OvertimeTally::new("petr", march());
        assert!(t.record(0, 0).is_err());
        t.record(2, 1).unwrap();
        assert_eq!((t.classic, t.deluxe), (2, 1));
    }
}
