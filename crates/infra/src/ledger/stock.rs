use tracing::{info, warn};

use stockhouse_auth::{Action, Actor, authorize};
use stockhouse_catalog::{ProductFilter, Size};
use stockhouse_core::{Aggregate, DomainError, HistoryEntryId, ProductId, Warehouse};
use stockhouse_inventory::{
    ChangeKind, HistoryEntry, HistoryFilter, SetNote, StockCommand, StockEntry, StockFilter,
    StockKey, StockMatrix, StockScope,
};

use crate::store::LedgerTx;

use super::{LedgerResult, LedgerService, Movement, apply_movement, require_product, stock_notice};

/// Address of one stock entry as it arrives from a caller (size not yet validated).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockTarget {
    pub product_id: ProductId,
    pub warehouse: Warehouse,
    pub size: i64,
}

impl LedgerService {
    /// Current quantity and note; an entry never written reads as 0.
    pub async fn stock(&self, target: StockTarget) -> LedgerResult<StockEntry> {
        let mut tx = self.begin().await?;
        let product = require_product(tx.as_mut(), target.product_id).await?;
        let size = product.validate_size(target.size)?;
        Ok(tx
            .stock(&StockKey::new(product.id(), target.warehouse, size))
            .await?)
    }

    /// Goods received into a warehouse.
    pub async fn receive(
        &self,
        actor: &Actor,
        target: StockTarget,
        quantity: i64,
        note: Option<String>,
    ) -> LedgerResult<HistoryEntry> {
        if quantity <= 0 {
            return Err(DomainError::invalid_quantity(format!(
                "received quantity must be positive (got {quantity})"
            ))
            .into());
        }
        self.adjust_as(actor, target, quantity, ChangeKind::Inbound, note)
            .await
    }

    /// Goods taken out of a warehouse (sold, damaged, ...).
    pub async fn issue(
        &self,
        actor: &Actor,
        target: StockTarget,
        quantity: i64,
        note: Option<String>,
    ) -> LedgerResult<HistoryEntry> {
        if quantity <= 0 {
            return Err(DomainError::invalid_quantity(format!(
                "issued quantity must be positive (got {quantity})"
            ))
            .into());
        }
        self.adjust_as(actor, target, -quantity, ChangeKind::Outbound, note)
            .await
    }

    /// Signed adjustment: a positive delta is logged as inbound, a negative one
    /// as outbound. Zero is rejected.
    pub async fn adjust(
        &self,
        actor: &Actor,
        target: StockTarget,
        delta: i64,
        note: Option<String>,
    ) -> LedgerResult<HistoryEntry> {
        let kind = match delta {
            0 => {
                return Err(DomainError::invalid_quantity("adjustment cannot be zero").into());
            }
            d if d > 0 => ChangeKind::Inbound,
            _ => ChangeKind::Outbound,
        };
        self.adjust_as(actor, target, delta, kind, note).await
    }

    async fn adjust_as(
        &self,
        actor: &Actor,
        target: StockTarget,
        delta: i64,
        kind: ChangeKind,
        note: Option<String>,
    ) -> LedgerResult<HistoryEntry> {
        authorize(actor, Action::OperateWarehouse(target.warehouse))?;
        let now = self.clock.now();

        let mut tx = self.begin().await?;
        let product = require_product(tx.as_mut(), target.product_id).await?;
        let size = product.validate_size(target.size)?;
        let (entry, record) = apply_movement(
            tx.as_mut(),
            actor,
            Movement {
                product: &product,
                warehouse: target.warehouse,
                size,
                delta,
                kind,
                note,
            },
            now,
        )
        .await
        .inspect_err(|e| warn!(warehouse = %target.warehouse, product_id = %target.product_id, error = %e, "adjustment rejected"))?;
        tx.commit().await?;

        self.publish([stock_notice(&entry, kind)]);
        Ok(record)
    }

    /// Store a free-text note on an entry (created at 0 when absent).
    pub async fn set_note(
        &self,
        actor: &Actor,
        target: StockTarget,
        note: String,
    ) -> LedgerResult<StockEntry> {
        authorize(actor, Action::OperateWarehouse(target.warehouse))?;

        let mut tx = self.begin().await?;
        let product = require_product(tx.as_mut(), target.product_id).await?;
        let size = product.validate_size(target.size)?;
        let key = StockKey::new(product.id(), target.warehouse, size);
        let entry = self.write_note(tx.as_mut(), actor, key, note).await?;
        tx.commit().await?;

        info!(warehouse = %key.warehouse, product_id = %key.product_id, size = %key.size, "stock note changed");
        Ok(entry)
    }

    /// Note for a product as a whole in one warehouse, independent of sizes.
    ///
    /// Kept on the product's universal-size entry, which for unsized goods is
    /// the stock entry itself.
    pub async fn set_product_note(
        &self,
        actor: &Actor,
        product_id: ProductId,
        warehouse: Warehouse,
        note: String,
    ) -> LedgerResult<StockEntry> {
        authorize(actor, Action::OperateWarehouse(warehouse))?;

        let mut tx = self.begin().await?;
        let product = require_product(tx.as_mut(), product_id).await?;
        let key = StockKey::new(product.id(), warehouse, Size::UNIVERSAL);
        let entry = self.write_note(tx.as_mut(), actor, key, note).await?;
        tx.commit().await?;

        info!(%warehouse, %product_id, "product note changed");
        Ok(entry)
    }

    pub async fn product_note(
        &self,
        product_id: ProductId,
        warehouse: Warehouse,
    ) -> LedgerResult<Option<String>> {
        let mut tx = self.begin().await?;
        let product = require_product(tx.as_mut(), product_id).await?;
        let entry = tx
            .stock(&StockKey::new(product.id(), warehouse, Size::UNIVERSAL))
            .await?;
        Ok(entry.note().map(str::to_string))
    }

    async fn write_note(
        &self,
        tx: &mut dyn LedgerTx,
        actor: &Actor,
        key: StockKey,
        note: String,
    ) -> LedgerResult<StockEntry> {
        let mut entry = tx.stock_for_update(&key).await?;
        let events = entry.execute(&StockCommand::SetNote(SetNote {
            key,
            actor: actor.username.clone(),
            note,
            occurred_at: self.clock.now(),
        }))?;
        tx.save_stock(&entry).await?;
        for event in &events {
            tx.append_history(&HistoryEntry::from_event(HistoryEntryId::new(), event))
                .await?;
        }
        Ok(entry)
    }

    /// History records, newest first.
    pub async fn history(&self, filter: &HistoryFilter) -> LedgerResult<Vec<HistoryEntry>> {
        let mut tx = self.begin().await?;
        Ok(tx.history(filter).await?)
    }

    /// Stock grouped by category for one warehouse or summed across all.
    pub async fn stock_matrix(
        &self,
        scope: StockScope,
        search: Option<String>,
    ) -> LedgerResult<StockMatrix> {
        let mut tx = self.begin().await?;
        let products = tx
            .products(&ProductFilter {
                category: None,
                search,
            })
            .await?;
        let warehouse = match scope {
            StockScope::Warehouse(w) => Some(w),
            StockScope::All => None,
        };
        let entries = tx
            .stock_entries(&StockFilter {
                warehouse,
                product_id: None,
            })
            .await?;
        Ok(StockMatrix::build(scope, &products, &entries))
    }

    /// The stock matrix of one warehouse, for printing or export.
    pub async fn inventory_sheet(
        &self,
        actor: &Actor,
        warehouse: Warehouse,
    ) -> LedgerResult<StockMatrix> {
        authorize(actor, Action::ExportInventory(warehouse))?;
        self.stock_matrix(StockScope::Warehouse(warehouse), None)
            .await
    }
}
