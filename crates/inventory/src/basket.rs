//! Transfer draft: the per-user basket a transfer is assembled in before it
//! is dispatched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use stockhouse_catalog::{Product, Size};
use stockhouse_core::{DomainError, DomainResult, ProductId, Warehouse, ensure_within_limit};

use crate::transfer::TransferItem;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeQuantity {
    pub size: Size,
    pub quantity: i64,
}

/// One product in the basket with a quantity slot per stocked size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftLine {
    pub product_id: ProductId,
    pub sizes: Vec<SizeQuantity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDraft {
    source: Warehouse,
    target: Warehouse,
    lines: BTreeMap<ProductId, BTreeMap<Size, i64>>,
}

impl TransferDraft {
    pub fn new(source: Warehouse, target: Warehouse) -> Self {
        Self {
            source,
            target,
            lines: BTreeMap::new(),
        }
    }

    pub fn source(&self) -> Warehouse {
        self.source
    }

    pub fn target(&self) -> Warehouse {
        self.target
    }

    pub fn set_route(&mut self, source: Warehouse, target: Warehouse) {
        self.source = source;
        self.target = target;
    }

    pub fn contains(&self, product_id: ProductId) -> bool {
        self.lines.contains_key(&product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add a product with every size at 0. Returns false if it was already there.
    pub fn add_product(&mut self, product: &Product) -> bool {
        if self.lines.contains_key(&product.id()) {
            return false;
        }
        let slots = product.sizes().into_iter().map(|s| (s, 0)).collect();
        self.lines.insert(product.id(), slots);
        true
    }

    pub fn set_quantity(&mut self, product_id: ProductId, size: Size, quantity: i64) -> DomainResult<()> {
        if quantity < 0 {
            return Err(DomainError::invalid_quantity(format!(
                "quantity cannot be negative (got {quantity})"
            )));
        }
        ensure_within_limit(quantity, "quantity")?;
        let line = self
            .lines
            .get_mut(&product_id)
            .ok_or_else(|| DomainError::not_found(format!("product {product_id} in transfer draft")))?;
        let slot = line.get_mut(&size).ok_or_else(|| {
            DomainError::validation(format!("size {size} is not stocked for product {product_id}"))
        })?;
        *slot = quantity;
        Ok(())
    }

    pub fn remove_product(&mut self, product_id: ProductId) -> bool {
        self.lines.remove(&product_id).is_some()
    }

    /// Drop products no longer in the catalog.
    pub fn retain_products(&mut self, known: impl Fn(ProductId) -> bool) {
        self.lines.retain(|id, _| known(*id));
    }

    /// Positive lines only, ready for dispatch.
    pub fn items(&self) -> Vec<TransferItem> {
        self.lines
            .iter()
            .flat_map(|(product_id, sizes)| {
                sizes
                    .iter()
                    .filter(|(_, q)| **q > 0)
                    .map(|(size, quantity)| TransferItem {
                        product_id: *product_id,
                        size: *size,
                        quantity: *quantity,
                    })
            })
            .collect()
    }

    pub fn lines(&self) -> Vec<DraftLine> {
        self.lines
            .iter()
            .map(|(product_id, sizes)| DraftLine {
                product_id: *product_id,
                sizes: sizes
                    .iter()
                    .map(|(size, quantity)| SizeQuantity {
                        size: *size,
                        quantity: *quantity,
                    })
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockhouse_catalog::{Category, NewProduct};

    fn shoe() -> Product {
        Product::create(
            ProductId::new(),
            NewProduct {
                name: "Stella".to_string(),
                category: Category::Shoe,
                color: None,
                back_solution: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn added_product_gets_a_zero_slot_per_size() {
        let p = shoe();
        let mut draft = TransferDraft::new(Warehouse::Pardubice, Warehouse::Brno);
        assert!(draft.add_product(&p));
        assert!(!draft.add_product(&p));

        let lines = draft.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].sizes.len(), 7);
        assert!(lines[0].sizes.iter().all(|s| s.quantity == 0));
        assert!(draft.items().is_empty());
    }

    #[test]
    fn items_contain_only_positive_quantities() {
        let p = shoe();
        let mut draft = TransferDraft::new(Warehouse::Pardubice, Warehouse::Brno);
        draft.add_product(&p);
        draft.set_quantity(p.id(), Size::from_raw(38), 2).unwrap();
        draft.set_quantity(p.id(), Size::from_raw(40), 0).unwrap();

        let items = draft.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].size, Size::from_raw(38));
    }

    #[test]
    fn set_quantity_validates_input() {
        let p = shoe();
        let mut draft = TransferDraft::new(Warehouse::Pardubice, Warehouse::Brno);

        let err = draft.set_quantity(p.id(), Size::from_raw(38), 1).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));

        draft.add_product(&p);
        let err = draft.set_quantity(p.id(), Size::from_raw(38), -1).unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity(_)));
        let err = draft.set_quantity(p.id(), Size::from_raw(50), 1).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        let err = draft.set_quantity(p.id(), Size::from_raw(38), i64::MAX).unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity(_)));
        assert!(draft.items().is_empty());
    }

    #[test]
    fn remove_and_retain_drop_lines() {
        let a = shoe();
        let b = shoe();
        let mut draft = TransferDraft::new(Warehouse::Pardubice, Warehouse::Brno);
        draft.add_product(&a);
        draft.add_product(&b);

        assert!(draft.remove_product(a.id()));
        assert!(!draft.remove_product(a.id()));
        draft.retain_products(|id| id != b.id());
        assert!(draft.is_empty());
    }
}
