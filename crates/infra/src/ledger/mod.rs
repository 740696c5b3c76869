//! Ledger service: runs every ledger operation as one unit of work.
//!
//! ```text
//! request (actor, input)
//!   ↓
//! 1. authorize(actor, action)
//!   ↓
//! 2. begin unit of work; load (and lock) the rows involved
//!   ↓
//! 3. aggregate.handle(command) → events (pure decision)
//!   ↓
//! 4. apply events, save rows, append history
//!   ↓
//! 5. commit, then broadcast notices
//! ```
//!
//! Any error before commit drops the unit of work, so nothing is partially
//! applied.

mod basket;
mod catalog;
mod counts;
mod staff;
mod stock;
mod transfers;
mod users;

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::info;

use stockhouse_auth::{Actor, AuthzError};
use stockhouse_catalog::{Product, Size};
use stockhouse_core::{
    Aggregate, Clock, DomainError, HistoryEntryId, ProductId, SystemClock, TransferId, Warehouse,
};
use stockhouse_inventory::{
    AdjustStock, ChangeKind, HistoryEntry, InventoryCount, StockCommand, StockEntry, StockKey,
    TransferDraft,
};

use crate::drafts::{InMemorySessionStore, SessionStore};
use crate::store::{LedgerStore, LedgerTx, StoreError};

pub use counts::CountLine;
pub use staff::TallyTarget;
pub use stock::StockTarget;
pub use transfers::TransferLine;

/// Failure of a ledger operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<AuthzError> for LedgerError {
    fn from(value: AuthzError) -> Self {
        match value {
            AuthzError::Forbidden(msg) => LedgerError::Domain(DomainError::PermissionDenied(msg)),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Committed change broadcast to realtime subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LedgerNotice {
    StockChanged {
        warehouse: Warehouse,
        product_id: ProductId,
        size: Size,
        quantity: i64,
        kind: ChangeKind,
    },
    TransferDispatched {
        transfer_id: TransferId,
        source: Warehouse,
        target: Warehouse,
        units: i64,
    },
    TransferConfirmed {
        transfer_id: TransferId,
        source: Warehouse,
        target: Warehouse,
    },
}

impl LedgerNotice {
    pub fn topic(&self) -> &'static str {
        match self {
            LedgerNotice::StockChanged { .. } => "stock.changed",
            LedgerNotice::TransferDispatched { .. } => "transfer.dispatched",
            LedgerNotice::TransferConfirmed { .. } => "transfer.confirmed",
        }
    }

    /// Admins and hub staff see everything; others only their warehouse.
    pub fn concerns(&self, actor: &Actor) -> bool {
        if actor.is_privileged() {
            return true;
        }
        match self {
            LedgerNotice::StockChanged { warehouse, .. } => actor.is_assigned_to(*warehouse),
            LedgerNotice::TransferDispatched { source, target, .. }
            | LedgerNotice::TransferConfirmed { source, target, .. } => {
                actor.is_assigned_to(*source) || actor.is_assigned_to(*target)
            }
        }
    }
}

/// Application service over a [`LedgerStore`].
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    baskets: Arc<dyn SessionStore<TransferDraft>>,
    counts: Arc<dyn SessionStore<InventoryCount>>,
    notices: broadcast::Sender<LedgerNotice>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        // Lossy: slow subscribers miss notices rather than blocking commits.
        let (notices, _rx) = broadcast::channel(256);
        Self {
            store,
            clock,
            baskets: Arc::new(InMemorySessionStore::new()),
            counts: Arc::new(InMemorySessionStore::new()),
            notices,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerNotice> {
        self.notices.subscribe()
    }

    async fn begin(&self) -> LedgerResult<Box<dyn LedgerTx>> {
        Ok(self.store.begin().await?)
    }

    fn publish(&self, notices: impl IntoIterator<Item = LedgerNotice>) {
        for notice in notices {
            let _ = self.notices.send(notice);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared unit-of-work steps
// ─────────────────────────────────────────────────────────────────────────────

async fn require_product(tx: &mut dyn LedgerTx, id: ProductId) -> LedgerResult<Product> {
    tx.product(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("product {id}")).into())
}

/// One quantity movement on a locked entry, with its history record.
struct Movement<'a> {
    product: &'a Product,
    warehouse: Warehouse,
    size: Size,
    delta: i64,
    kind: ChangeKind,
    note: Option<String>,
}

/// Apply a movement inside `tx`: lock the entry, decide, save, log.
async fn apply_movement(
    tx: &mut dyn LedgerTx,
    actor: &Actor,
    movement: Movement<'_>,
    now: chrono::DateTime<chrono::Utc>,
) -> LedgerResult<(StockEntry, HistoryEntry)> {
    let key = StockKey::new(movement.product.id(), movement.warehouse, movement.size);
    let mut entry = tx.stock_for_update(&key).await?;

    let command = StockCommand::Adjust(AdjustStock {
        key,
        delta: movement.delta,
        kind: movement.kind,
        actor: actor.username.clone(),
        note: movement.note,
        occurred_at: now,
    });
    let events = entry
        .execute(&command)
        .map_err(|e| e.with_product_label(&movement.product.variant_label()))?;

    tx.save_stock(&entry).await?;

    let mut logged = None;
    for event in &events {
        let record = HistoryEntry::from_event(HistoryEntryId::new(), event);
        tx.append_history(&record).await?;
        logged = Some(record);
    }
    let record = logged.ok_or_else(|| DomainError::invalid_quantity("adjustment produced no change"))?;

    info!(
        warehouse = %key.warehouse,
        product_id = %key.product_id,
        size = %key.size,
        kind = %movement.kind,
        delta = movement.delta,
        quantity = entry.quantity(),
        "stock adjusted"
    );
    Ok((entry, record))
}

fn stock_notice(entry: &StockEntry, kind: ChangeKind) -> LedgerNotice {
    let key = entry.key();
    LedgerNotice::StockChanged {
        warehouse: key.warehouse,
        product_id: key.product_id,
        size: key.size,
        quantity: entry.quantity(),
        kind,
    }
}
