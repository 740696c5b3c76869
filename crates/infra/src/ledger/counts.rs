use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use stockhouse_auth::{Action, Actor, authorize};
use stockhouse_core::{DomainError, ProductId, Warehouse};
use stockhouse_inventory::{ChangeKind, CountDelta, InventoryCount, StockKey};

use crate::store::LedgerTx;

use super::{LedgerResult, LedgerService, Movement, apply_movement, require_product, stock_notice};

/// One observed quantity; the size is checked against the product's category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountLine {
    pub product_id: ProductId,
    pub size: i64,
    pub quantity: i64,
}

impl LedgerService {
    pub fn count_draft(&self, actor: &Actor) -> Option<InventoryCount> {
        self.counts.get(actor.user_id)
    }

    /// Record observed quantities into the actor's count draft.
    ///
    /// Admins pick the warehouse (falling back to the one already being
    /// counted); storekeepers always count their own. Switching warehouse
    /// starts a fresh draft.
    pub async fn record_count(
        &self,
        actor: &Actor,
        warehouse: Option<Warehouse>,
        lines: &[CountLine],
    ) -> LedgerResult<InventoryCount> {
        let existing = self.counts.get(actor.user_id);
        let warehouse = if actor.is_admin() {
            warehouse
                .or(existing.as_ref().map(InventoryCount::warehouse))
                .ok_or_else(|| DomainError::validation("choose a warehouse to count"))?
        } else {
            actor
                .warehouse
                .ok_or_else(|| DomainError::permission_denied("no warehouse assigned"))?
        };
        authorize(actor, Action::CountInventory(warehouse))?;

        let mut draft = match existing {
            Some(d) if d.warehouse() == warehouse => d,
            _ => InventoryCount::new(warehouse),
        };

        let mut tx = self.begin().await?;
        for line in lines {
            let product = require_product(tx.as_mut(), line.product_id).await?;
            let size = product.validate_size(line.size)?;
            draft.record(product.id(), size, line.quantity)?;
        }
        drop(tx);

        self.counts.upsert(actor.user_id, draft.clone());
        Ok(draft)
    }

    /// Differences between the draft and the ledger right now. Commits nothing.
    pub async fn preview_count(&self, actor: &Actor) -> LedgerResult<Vec<CountDelta>> {
        let draft = self.require_count(actor)?;
        let mut tx = self.begin().await?;
        let current = current_quantities(tx.as_mut(), &draft).await?;
        Ok(draft.preview(|key| current.get(key).copied().unwrap_or(0)))
    }

    /// Apply every non-zero difference as an inventory correction, then drop the draft.
    pub async fn confirm_count(&self, actor: &Actor) -> LedgerResult<Vec<CountDelta>> {
        let draft = self.require_count(actor)?;
        let now = self.clock.now();

        let mut tx = self.begin().await?;
        // Lock only keys that need a correction and recompute them under the
        // lock. An unchanged key gets no row.
        let mut current = current_quantities(tx.as_mut(), &draft).await?;
        for candidate in draft.preview(|key| current.get(key).copied().unwrap_or(0)) {
            let entry = tx.stock_for_update(&candidate.key).await?;
            current.insert(candidate.key, entry.quantity());
        }
        let deltas = draft.preview(|key| current.get(key).copied().unwrap_or(0));

        let mut notices = Vec::with_capacity(deltas.len());
        for delta in &deltas {
            let product = require_product(tx.as_mut(), delta.key.product_id).await?;
            let (entry, _) = apply_movement(
                tx.as_mut(),
                actor,
                Movement {
                    product: &product,
                    warehouse: delta.key.warehouse,
                    size: delta.key.size,
                    delta: delta.delta,
                    kind: ChangeKind::InventoryCorrection,
                    note: None,
                },
                now,
            )
            .await
            .inspect_err(|e| warn!(warehouse = %draft.warehouse(), error = %e, "inventory count rejected"))?;
            notices.push(stock_notice(&entry, ChangeKind::InventoryCorrection));
        }
        tx.commit().await?;

        self.counts.remove(actor.user_id);
        info!(warehouse = %draft.warehouse(), corrections = deltas.len(), "inventory count confirmed");
        self.publish(notices);
        Ok(deltas)
    }

    pub fn discard_count(&self, actor: &Actor) {
        self.counts.remove(actor.user_id);
    }

    fn require_count(&self, actor: &Actor) -> LedgerResult<InventoryCount> {
        let draft = self
            .counts
            .get(actor.user_id)
            .ok_or_else(|| DomainError::not_found("inventory count draft"))?;
        authorize(actor, Action::CountInventory(draft.warehouse()))?;
        Ok(draft)
    }
}

async fn current_quantities(
    tx: &mut dyn LedgerTx,
    draft: &InventoryCount,
) -> LedgerResult<HashMap<StockKey, i64>> {
    let mut out = HashMap::new();
    for (key, _) in draft.observed() {
        out.insert(key, tx.stock(&key).await?.quantity());
    }
    Ok(out)
}
