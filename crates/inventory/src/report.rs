//! Read-only views over the ledger: the stock matrix (dashboard and inventory
//! sheet) and the transfer document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use stockhouse_catalog::{Category, Product, Size};
use stockhouse_core::{ProductId, TransferId, Warehouse};

use crate::basket::SizeQuantity;
use crate::stock::StockEntry;
use crate::transfer::{Transfer, TransferStatus};

/// Which warehouses a matrix covers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "warehouse", rename_all = "lowercase")]
pub enum StockScope {
    Warehouse(Warehouse),
    All,
}

impl StockScope {
    pub fn includes(&self, warehouse: Warehouse) -> bool {
        match self {
            StockScope::Warehouse(w) => *w == warehouse,
            StockScope::All => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRow {
    pub product_id: ProductId,
    pub label: String,
    pub name: String,
    pub color: Option<String>,
    pub back_solution: Option<String>,
    pub quantities: Vec<SizeQuantity>,
    pub total: i64,
    /// Product-level note; only for a single-warehouse matrix.
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySection {
    pub category: Category,
    pub sizes: Vec<Size>,
    pub rows: Vec<StockRow>,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMatrix {
    pub scope: StockScope,
    pub sections: Vec<CategorySection>,
    pub grand_total: i64,
}

impl StockMatrix {
    /// Group `products` by category with one quantity column per size.
    ///
    /// Entries outside `scope` are ignored; with [`StockScope::All`] the
    /// warehouses are summed. Categories without products are omitted and rows
    /// are sorted by label.
    pub fn build(scope: StockScope, products: &[Product], entries: &[StockEntry]) -> Self {
        let mut quantities: HashMap<(ProductId, Size), i64> = HashMap::new();
        let mut notes: HashMap<ProductId, &str> = HashMap::new();
        for entry in entries {
            let key = entry.key();
            if !scope.includes(key.warehouse) {
                continue;
            }
            *quantities.entry((key.product_id, key.size)).or_insert(0) += entry.quantity();
            if matches!(scope, StockScope::Warehouse(_)) && key.size.is_universal() {
                if let Some(note) = entry.note() {
                    notes.insert(key.product_id, note);
                }
            }
        }

        let mut sections = Vec::new();
        for category in Category::ALL {
            let mut members: Vec<&Product> =
                products.iter().filter(|p| p.category() == category).collect();
            if members.is_empty() {
                continue;
            }
            members.sort_by_key(|p| p.variant_label());

            let sizes = category.sizes();
            let rows: Vec<StockRow> = members
                .into_iter()
                .map(|p| {
                    let quantities: Vec<SizeQuantity> = sizes
                        .iter()
                        .map(|size| SizeQuantity {
                            size: *size,
                            quantity: quantities.get(&(p.id(), *size)).copied().unwrap_or(0),
                        })
                        .collect();
                    StockRow {
                        product_id: p.id(),
                        label: p.variant_label(),
                        name: p.name().to_string(),
                        color: p.color().map(str::to_string),
                        back_solution: p.back_solution().map(str::to_string),
                        total: quantities.iter().map(|q| q.quantity).sum(),
                        note: notes.get(&p.id()).map(|n| n.to_string()),
                        quantities,
                    }
                })
                .collect();

            sections.push(CategorySection {
                category,
                total: rows.iter().map(|r| r.total).sum(),
                sizes,
                rows,
            });
        }

        Self {
            scope,
            grand_total: sections.iter().map(|s| s.total).sum(),
            sections,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLine {
    pub product_id: ProductId,
    pub label: String,
    pub size: Size,
    pub size_label: String,
    pub quantity: i64,
}

/// Printable transfer: header plus one labelled line per item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDocument {
    pub transfer_id: TransferId,
    pub source: Warehouse,
    pub target: Warehouse,
    pub status: TransferStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub confirmed_by: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub lines: Vec<DocumentLine>,
    pub total_units: i64,
}

impl TransferDocument {
    /// Products missing from `products` (deleted since) keep their id as label.
    pub fn build(transfer: &Transfer, products: &HashMap<ProductId, Product>) -> Self {
        let mut lines: Vec<DocumentLine> = transfer
            .items()
            .iter()
            .map(|item| DocumentLine {
                product_id: item.product_id,
                label: products
                    .get(&item.product_id)
                    .map(Product::variant_label)
                    .unwrap_or_else(|| item.product_id.to_string()),
                size: item.size,
                size_label: item.size.label(),
                quantity: item.quantity,
            })
            .collect();
        lines.sort_by(|a, b| a.label.cmp(&b.label).then(a.size.cmp(&b.size)));

        Self {
            transfer_id: transfer.transfer_id(),
            source: transfer.source(),
            target: transfer.target(),
            status: transfer.status(),
            created_by: transfer.created_by().to_string(),
            created_at: transfer.created_at(),
            confirmed_by: transfer.confirmed_by().map(str::to_string),
            confirmed_at: transfer.confirmed_at(),
            total_units: transfer.total_units(),
            lines,
        }
    }
}
