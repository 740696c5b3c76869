//! Inventory count: observed quantities for one warehouse, reconciled against
//! the ledger as inventory-correction adjustments.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use stockhouse_catalog::Size;
use stockhouse_core::{DomainError, DomainResult, ProductId, Warehouse, ensure_within_limit};

use crate::stock::StockKey;

/// Difference between the ledger and an observed count for one key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountDelta {
    pub key: StockKey,
    pub old: i64,
    pub new: i64,
    pub delta: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCount {
    warehouse: Warehouse,
    observed: BTreeMap<(ProductId, Size), i64>,
}

impl InventoryCount {
    pub fn new(warehouse: Warehouse) -> Self {
        Self {
            warehouse,
            observed: BTreeMap::new(),
        }
    }

    pub fn warehouse(&self) -> Warehouse {
        self.warehouse
    }

    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }

    /// Record an observed quantity; a later record for the same key replaces it.
    pub fn record(&mut self, product_id: ProductId, size: Size, quantity: i64) -> DomainResult<()> {
        if quantity < 0 {
            return Err(DomainError::invalid_quantity(format!(
                "counted quantity cannot be negative (got {quantity})"
            )));
        }
        ensure_within_limit(quantity, "counted quantity")?;
        self.observed.insert((product_id, size), quantity);
        Ok(())
    }

    pub fn observed(&self) -> impl Iterator<Item = (StockKey, i64)> + '_ {
        self.observed
            .iter()
            .map(|((product_id, size), q)| (StockKey::new(*product_id, self.warehouse, *size), *q))
    }

    /// Keys whose observed quantity differs from `current`. Unrecorded keys are
    /// left alone.
    pub fn preview(&self, current: impl Fn(&StockKey) -> i64) -> Vec<CountDelta> {
        self.observed()
            .filter_map(|(key, new)| {
                let old = current(&key);
                (old != new).then_some(CountDelta {
                    key,
                    old,
                    new,
                    delta: new - old,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn preview_reports_only_changed_keys() {
        let p = ProductId::new();
        let mut count = InventoryCount::new(Warehouse::Ostrava);
        count.record(p, Size::from_raw(38), 4).unwrap();
        count.record(p, Size::from_raw(40), 2).unwrap();
        count.record(p, Size::from_raw(41), 0).unwrap();

        let ledger: HashMap<StockKey, i64> = [
            (StockKey::new(p, Warehouse::Ostrava, Size::from_raw(38)), 6),
            (StockKey::new(p, Warehouse::Ostrava, Size::from_raw(40)), 2),
        ]
        .into_iter()
        .collect();

        let deltas = count.preview(|k| ledger.get(k).copied().unwrap_or(0));
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].old, 6);
        assert_eq!(deltas[0].new, 4);
        assert_eq!(deltas[0].delta, -2);
        assert_eq!(deltas[0].key.warehouse, Warehouse::Ostrava);
    }

    #[test]
    fn later_record_replaces_earlier() {
        let p = ProductId::new();
        let mut count = InventoryCount::new(Warehouse::Brno);
        count.record(p, Size::UNIVERSAL, 5).unwrap();
        count.record(p, Size::UNIVERSAL, 3).unwrap();

        let deltas = count.preview(|_| 0);
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].new, 3);
    }

    #[test]
    fn negative_count_is_rejected() {
        let mut count = InventoryCount::new(Warehouse::Brno);
        let err = count.record(ProductId::new(), Size::UNIVERSAL, -1).unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity(_)));
        assert!(count.is_empty());
    }

    #[test]
    fn count_above_quantity_limit_is_rejected() {
        let mut count = InventoryCount::new(Warehouse::Prague);
        let err = count.record(ProductId::new(), Size::UNIVERSAL, i64::MAX).unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity(_)));
        assert!(count.is_empty());
    }
}
