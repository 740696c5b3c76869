//! Bounds on stored quantities and counters.

use crate::error::{DomainError, DomainResult};

/// Largest quantity a single stock entry, transfer line, count or tally
/// counter may hold. Totals over any realistic number of entries stay well
/// inside `i64`.
pub const MAX_QUANTITY: i64 = i32::MAX as i64;

/// Reject a value (a quantity or a signed change) whose magnitude exceeds
/// [`MAX_QUANTITY`].
pub fn ensure_within_limit(value: i64, what: &str) -> DomainResult<i64> {
    if value.unsigned_abs() > MAX_QUANTITY as u64 {
        return Err(DomainError::invalid_quantity(format!(
            "{what} {value} exceeds the limit of {MAX_QUANTITY}"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_symmetric_and_inclusive() {
        assert_eq!(ensure_within_limit(MAX_QUANTITY, "quantity").unwrap(), MAX_QUANTITY);
        assert_eq!(ensure_within_limit(-MAX_QUANTITY, "delta").unwrap(), -MAX_QUANTITY);
        assert!(ensure_within_limit(MAX_QUANTITY + 1, "quantity").is_err());
        assert!(matches!(
            ensure_within_limit(i64::MIN, "delta"),
            Err(DomainError::InvalidQuantity(_))
        ));
    }
}
