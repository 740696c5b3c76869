use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use stockhouse_auth::{Action, Actor, authorize};
use stockhouse_catalog::Product;
use stockhouse_core::{Aggregate, DomainError, ProductId, TransferId, Warehouse};
use stockhouse_inventory::{
    ChangeKind, ConfirmTransfer, DispatchTransfer, Transfer, TransferCommand, TransferDocument,
    TransferFilter, TransferItem, TransferStatus, merge_items,
};

use super::{
    LedgerNotice, LedgerResult, LedgerService, Movement, apply_movement, require_product,
    stock_notice,
};

/// One requested transfer line; the size is checked against the product's category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLine {
    pub product_id: ProductId,
    pub size: i64,
    pub quantity: i64,
}

impl LedgerService {
    /// Create a transfer and debit every line from the source.
    ///
    /// A shortage on any line aborts the whole transfer.
    pub async fn create_transfer(
        &self,
        actor: &Actor,
        source: Warehouse,
        target: Warehouse,
        lines: Vec<TransferLine>,
    ) -> LedgerResult<Transfer> {
        authorize(actor, Action::CreateTransfer)?;
        let now = self.clock.now();

        let mut tx = self.begin().await?;
        let mut products: HashMap<ProductId, Product> = HashMap::new();
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            if !products.contains_key(&line.product_id) {
                let product = require_product(tx.as_mut(), line.product_id).await?;
                products.insert(line.product_id, product);
            }
            let size = products[&line.product_id].validate_size(line.size)?;
            items.push(TransferItem {
                product_id: line.product_id,
                size,
                quantity: line.quantity,
            });
        }
        let items = merge_items(items)?;

        let mut transfer = Transfer::empty(TransferId::new());
        transfer.execute(&TransferCommand::Dispatch(DispatchTransfer {
            transfer_id: transfer.transfer_id(),
            source,
            target,
            created_by: actor.username.clone(),
            items: items.clone(),
            occurred_at: now,
        }))?;

        let mut notices = Vec::with_capacity(items.len() + 1);
        for item in &items {
            let (entry, _) = apply_movement(
                tx.as_mut(),
                actor,
                Movement {
                    product: &products[&item.product_id],
                    warehouse: source,
                    size: item.size,
                    delta: -item.quantity,
                    kind: ChangeKind::TransferOut,
                    note: None,
                },
                now,
            )
            .await
            .inspect_err(|e| warn!(%source, %target, error = %e, "transfer rejected"))?;
            notices.push(stock_notice(&entry, ChangeKind::TransferOut));
        }

        tx.insert_transfer(&transfer).await?;
        tx.commit().await?;

        info!(
            transfer_id = %transfer.transfer_id(),
            %source,
            %target,
            units = transfer.total_units(),
            "transfer dispatched"
        );
        notices.push(LedgerNotice::TransferDispatched {
            transfer_id: transfer.transfer_id(),
            source,
            target,
            units: transfer.total_units(),
        });
        self.publish(notices);
        Ok(transfer)
    }

    /// Credit the target and close the transfer.
    ///
    /// Returns `false` alongside the transfer when it was already confirmed;
    /// nothing is credited twice.
    pub async fn confirm_transfer(
        &self,
        actor: &Actor,
        id: TransferId,
    ) -> LedgerResult<(Transfer, bool)> {
        let now = self.clock.now();

        let mut tx = self.begin().await?;
        let mut transfer = tx
            .transfer_for_update(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("transfer {id}")))?;
        authorize(
            actor,
            Action::ConfirmTransfer {
                target: transfer.target(),
            },
        )?;

        let events = transfer.execute(&TransferCommand::Confirm(ConfirmTransfer {
            transfer_id: id,
            confirmed_by: actor.username.clone(),
            occurred_at: now,
        }))?;
        if events.is_empty() {
            return Ok((transfer, false));
        }

        let mut notices = Vec::with_capacity(transfer.items().len() + 1);
        for item in transfer.items() {
            let product = require_product(tx.as_mut(), item.product_id).await?;
            let (entry, _) = apply_movement(
                tx.as_mut(),
                actor,
                Movement {
                    product: &product,
                    warehouse: transfer.target(),
                    size: item.size,
                    delta: item.quantity,
                    kind: ChangeKind::TransferIn,
                    note: None,
                },
                now,
            )
            .await?;
            notices.push(stock_notice(&entry, ChangeKind::TransferIn));
        }

        tx.update_transfer(&transfer).await?;
        tx.commit().await?;

        info!(transfer_id = %id, target = %transfer.target(), "transfer confirmed");
        notices.push(LedgerNotice::TransferConfirmed {
            transfer_id: id,
            source: transfer.source(),
            target: transfer.target(),
        });
        self.publish(notices);
        Ok((transfer, true))
    }

    pub async fn transfer(&self, actor: &Actor, id: TransferId) -> LedgerResult<Transfer> {
        let mut tx = self.begin().await?;
        let transfer = tx
            .transfer(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("transfer {id}")))?;
        authorize(
            actor,
            Action::ViewTransfer {
                target: transfer.target(),
            },
        )?;
        Ok(transfer)
    }

    /// Printable delivery note: header plus labelled lines.
    pub async fn transfer_document(
        &self,
        actor: &Actor,
        id: TransferId,
    ) -> LedgerResult<TransferDocument> {
        let mut tx = self.begin().await?;
        let transfer = tx
            .transfer(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("transfer {id}")))?;
        authorize(
            actor,
            Action::ViewTransfer {
                target: transfer.target(),
            },
        )?;

        let mut products = HashMap::new();
        for item in transfer.items() {
            if products.contains_key(&item.product_id) {
                continue;
            }
            if let Some(p) = tx.product(item.product_id).await? {
                products.insert(item.product_id, p);
            }
        }
        Ok(TransferDocument::build(&transfer, &products))
    }

    /// In-transit transfers the actor is expected to receive.
    pub async fn pending_transfers(&self, actor: &Actor) -> LedgerResult<Vec<Transfer>> {
        let Some(filter) = pending_filter(actor) else {
            return Ok(Vec::new());
        };
        let mut tx = self.begin().await?;
        Ok(tx.transfers(&filter).await?)
    }

    pub async fn pending_count(&self, actor: &Actor) -> LedgerResult<usize> {
        Ok(self.pending_transfers(actor).await?.len())
    }

    /// Every transfer the actor may see, any status.
    pub async fn transfer_archive(&self, actor: &Actor) -> LedgerResult<Vec<Transfer>> {
        let filter = if actor.is_privileged() {
            TransferFilter::default()
        } else {
            match actor.warehouse {
                Some(w) => TransferFilter {
                    touching: Some(w),
                    ..TransferFilter::default()
                },
                None => return Ok(Vec::new()),
            }
        };
        let mut tx = self.begin().await?;
        Ok(tx.transfers(&filter).await?)
    }
}

fn pending_filter(actor: &Actor) -> Option<TransferFilter> {
    let base = TransferFilter {
        status: Some(TransferStatus::InTransit),
        ..TransferFilter::default()
    };
    if actor.is_privileged() {
        return Some(base);
    }
    actor.warehouse.map(|w| TransferFilter {
        target: Some(w),
        ..base
    })
}
