use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use stockhouse_catalog::Size;
use stockhouse_core::{
    Aggregate, AggregateRoot, DomainError, DomainEvent, DomainResult, ProductId, TransferId,
    Warehouse, ensure_within_limit,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransferStatus {
    InTransit,
    Confirmed,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::InTransit => "in-transit",
            TransferStatus::Confirmed => "confirmed",
        }
    }
}

impl core::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for TransferStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in-transit" => Ok(TransferStatus::InTransit),
            "confirmed" => Ok(TransferStatus::Confirmed),
            other => Err(DomainError::validation(format!("unknown transfer status '{other}'"))),
        }
    }
}

/// One line of a transfer: a quantity of one product in one size.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferItem {
    pub product_id: ProductId,
    pub size: Size,
    pub quantity: i64,
}

/// Normalize requested transfer lines.
///
/// Negative quantities are rejected, zero lines are skipped and duplicate
/// (product, size) lines are merged. Output is ordered by product then size.
pub fn merge_items(items: impl IntoIterator<Item = TransferItem>) -> DomainResult<Vec<TransferItem>> {
    let mut merged: BTreeMap<(ProductId, Size), i64> = BTreeMap::new();
    for item in items {
        if item.quantity < 0 {
            return Err(DomainError::invalid_quantity(format!(
                "transfer quantity cannot be negative (got {})",
                item.quantity
            )));
        }
        if item.quantity == 0 {
            continue;
        }
        let slot = merged.entry((item.product_id, item.size)).or_insert(0);
        let next = slot
            .checked_add(item.quantity)
            .ok_or_else(|| DomainError::invalid_quantity("quantity out of range"))?;
        *slot = ensure_within_limit(next, "transfer quantity")?;
    }

    Ok(merged
        .into_iter()
        .map(|((product_id, size), quantity)| TransferItem {
            product_id,
            size,
            quantity,
        })
        .collect())
}

/// Aggregate root: Transfer.
///
/// Creation debits the source (done by the ledger in the same unit of work);
/// confirmation credits the target exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    id: TransferId,
    source: Warehouse,
    target: Warehouse,
    created_by: String,
    created_at: DateTime<Utc>,
    status: TransferStatus,
    confirmed_by: Option<String>,
    confirmed_at: Option<DateTime<Utc>>,
    items: Vec<TransferItem>,
    #[serde(skip)]
    version: u64,
    #[serde(skip)]
    created: bool,
}

impl Transfer {
    /// Placeholder used before a dispatch event is applied.
    pub fn empty(id: TransferId) -> Self {
        Self {
            id,
            source: Warehouse::HUB,
            target: Warehouse::HUB,
            created_by: String::new(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            status: TransferStatus::InTransit,
            confirmed_by: None,
            confirmed_at: None,
            items: Vec::new(),
            version: 0,
            created: false,
        }
    }

    /// Rebuild from storage.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: TransferId,
        source: Warehouse,
        target: Warehouse,
        created_by: String,
        created_at: DateTime<Utc>,
        status: TransferStatus,
        confirmed_by: Option<String>,
        confirmed_at: Option<DateTime<Utc>>,
        items: Vec<TransferItem>,
    ) -> Self {
        Self {
            id,
            source,
            target,
            created_by,
            created_at,
            status,
            confirmed_by,
            confirmed_at,
            items,
            version: 1,
            created: true,
        }
    }

    pub fn transfer_id(&self) -> TransferId {
        self.id
    }

    pub fn source(&self) -> Warehouse {
        self.source
    }

    pub fn target(&self) -> Warehouse {
        self.target
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> TransferStatus {
        self.status
    }

    pub fn confirmed_by(&self) -> Option<&str> {
        self.confirmed_by.as_deref()
    }

    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }

    pub fn items(&self) -> &[TransferItem] {
        &self.items
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransferStatus::InTransit
    }

    /// Units moved by this transfer; equals the source debit.
    pub fn total_units(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn touches(&self, warehouse: Warehouse) -> bool {
        self.source == warehouse || self.target == warehouse
    }
}

impl AggregateRoot for Transfer {
    type Id = TransferId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: DispatchTransfer. Items should already be normalized with [`merge_items`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchTransfer {
    pub transfer_id: TransferId,
    pub source: Warehouse,
    pub target: Warehouse,
    pub created_by: String,
    pub items: Vec<TransferItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmTransfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmTransfer {
    pub transfer_id: TransferId,
    pub confirmed_by: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferCommand {
    Dispatch(DispatchTransfer),
    Confirm(ConfirmTransfer),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDispatched {
    pub transfer_id: TransferId,
    pub source: Warehouse,
    pub target: Warehouse,
    pub created_by: String,
    pub items: Vec<TransferItem>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferConfirmed {
    pub transfer_id: TransferId,
    pub confirmed_by: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferEvent {
    Dispatched(TransferDispatched),
    Confirmed(TransferConfirmed),
}

impl DomainEvent for TransferEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TransferEvent::Dispatched(_) => "transfer.dispatched",
            TransferEvent::Confirmed(_) => "transfer.confirmed",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            TransferEvent::Dispatched(e) => e.occurred_at,
            TransferEvent::Confirmed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Transfer {
    type Command = TransferCommand;
    type Event = TransferEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            TransferEvent::Dispatched(e) => {
                self.id = e.transfer_id;
                self.source = e.source;
                self.target = e.target;
                self.created_by = e.created_by.clone();
                self.created_at = e.occurred_at;
                self.status = TransferStatus::InTransit;
                self.items = e.items.clone();
                self.created = true;
            }
            TransferEvent::Confirmed(e) => {
                self.status = TransferStatus::Confirmed;
                self.confirmed_by = Some(e.confirmed_by.clone());
                self.confirmed_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            TransferCommand::Dispatch(cmd) => self.handle_dispatch(cmd),
            TransferCommand::Confirm(cmd) => self.handle_confirm(cmd),
        }
    }
}

impl Transfer {
    fn ensure_id(&self, transfer_id: TransferId) -> DomainResult<()> {
        if self.id != transfer_id {
            return Err(DomainError::invalid_id(format!(
                "transfer id mismatch: aggregate={}, command={}",
                self.id, transfer_id
            )));
        }
        Ok(())
    }

    fn handle_dispatch(&self, cmd: &DispatchTransfer) -> DomainResult<Vec<TransferEvent>> {
        self.ensure_id(cmd.transfer_id)?;

        if self.created {
            return Err(DomainError::conflict("transfer already exists"));
        }
        if cmd.source == cmd.target {
            return Err(DomainError::validation(
                "source and target warehouse must differ",
            ));
        }
        if cmd.items.is_empty() {
            return Err(DomainError::validation("transfer has no items"));
        }
        if let Some(bad) = cmd.items.iter().find(|i| i.quantity <= 0) {
            return Err(DomainError::invalid_quantity(format!(
                "transfer quantity must be positive (got {})",
                bad.quantity
            )));
        }

        Ok(vec![TransferEvent::Dispatched(TransferDispatched {
            transfer_id: cmd.transfer_id,
            source: cmd.source,
            target: cmd.target,
            created_by: cmd.created_by.clone(),
            items: cmd.items.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_confirm(&self, cmd: &ConfirmTransfer) -> DomainResult<Vec<TransferEvent>> {
        self.ensure_id(cmd.transfer_id)?;

        if !self.created {
            return Err(DomainError::not_found(format!("transfer {}", cmd.transfer_id)));
        }
        // Second confirmation is a no-op.
        if self.status == TransferStatus::Confirmed {
            return Ok(vec![]);
        }

        Ok(vec![TransferEvent::Confirmed(TransferConfirmed {
            transfer_id: cmd.transfer_id,
            confirmed_by: cmd.confirmed_by.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

/// Listing filter for transfers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferFilter {
    pub status: Option<TransferStatus>,
    pub source: Option<Warehouse>,
    pub target: Option<Warehouse>,
    /// Matches transfers whose source or target is this warehouse.
    pub touching: Option<Warehouse>,
}

impl TransferFilter {
    pub fn matches(&self, transfer: &Transfer) -> bool {
        self.status.is_none_or(|s| transfer.status() == s)
            && self.source.is_none_or(|w| transfer.source() == w)
            && self.target.is_none_or(|w| transfer.target() == w)
            && self.touching.is_none_or(|w| transfer.touches(w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product_id: ProductId, size: u16, quantity: i64) -> TransferItem {
        TransferItem {
            product_id,
            size: Size::from_raw(size),
            quantity,
        }
    }

    fn dispatch(id: TransferId, items: Vec<TransferItem>) -> TransferCommand {
        TransferCommand::Dispatch(DispatchTransfer {
            transfer_id: id,
            source: Warehouse::Prague,
            target: Warehouse::Brno,
            created_by: "jana".to_string(),
            items,
            occurred_at: Utc::now(),
        })
    }

    fn confirm(id: TransferId) -> TransferCommand {
        TransferCommand::Confirm(ConfirmTransfer {
            transfer_id: id,
            confirmed_by: "petr".to_string(),
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn merge_skips_zero_and_merges_duplicates() {
        let p = ProductId::new();
        let merged = merge_items(vec![item(p, 38, 2), item(p, 40, 0), item(p, 38, 3)]).unwrap();
        assert_eq!(merged, vec![item(p, 38, 5)]);
    }

    #[test]
    fn merge_rejects_negative() {
        let p = ProductId::new();
        let err = merge_items(vec![item(p, 38, 2), item(p, 40, -1)]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity(_)));
    }

    #[test]
    fn merge_rejects_lines_above_quantity_limit() {
        let p = ProductId::new();
        let max = stockhouse_core::MAX_QUANTITY;

        let merged = merge_items(vec![item(p, 38, max), item(p, 40, max)]).unwrap();
        assert_eq!(merged.len(), 2);

        let err = merge_items(vec![item(p, 38, max), item(p, 38, 1)]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity(_)));
        let err = merge_items(vec![item(p, 38, i64::MAX)]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity(_)));
    }

    #[test]
    fn dispatch_then_confirm_follows_state_machine() {
        let id = TransferId::new();
        let p = ProductId::new();
        let mut t = Transfer::empty(id);

        t.execute(&dispatch(id, vec![item(p, 38, 4)])).unwrap();
        assert!(t.is_pending());
        assert_eq!(t.total_units(), 4);
        assert_eq!(t.created_by(), "jana");

        let events = t.execute(&confirm(id)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(t.status(), TransferStatus::Confirmed);
        assert_eq!(t.confirmed_by(), Some("petr"));
        assert!(t.confirmed_at().is_some());
    }

    #[test]
    fn second_confirm_emits_nothing() {
        let id = TransferId::new();
        let mut t = Transfer::empty(id);
        t.execute(&dispatch(id, vec![item(ProductId::new(), 0, 1)])).unwrap();
        t.execute(&confirm(id)).unwrap();
        let version = t.version();

        let events = t.execute(&confirm(id)).unwrap();
        assert!(events.is_empty());
        assert_eq!(t.version(), version);
        assert_eq!(t.confirmed_by(), Some("petr"));
    }

    #[test]
    fn confirm_unknown_transfer_is_not_found() {
        let id = TransferId::new();
        let err = Transfer::empty(id).handle(&confirm(id)).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn dispatch_rejects_same_warehouse_and_empty_items() {
        let id = TransferId::new();
        let t = Transfer::empty(id);

        let err = t.handle(&dispatch(id, vec![])).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let cmd = TransferCommand::Dispatch(DispatchTransfer {
            transfer_id: id,
            source: Warehouse::Ostrava,
            target: Warehouse::Ostrava,
            created_by: "jana".to_string(),
            items: vec![item(ProductId::new(), 0, 1)],
            occurred_at: Utc::now(),
        });
        let err = t.handle(&cmd).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn dispatch_twice_is_conflict() {
        let id = TransferId::new();
        let mut t = Transfer::empty(id);
        t.execute(&dispatch(id, vec![item(ProductId::new(), 0, 1)])).unwrap();
        let err = t.handle(&dispatch(id, vec![item(ProductId::new(), 0, 1)])).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn filter_by_status_and_touching() {
        let id = TransferId::new();
        let mut t = Transfer::empty(id);
        t.execute(&dispatch(id, vec![item(ProductId::new(), 0, 1)])).unwrap();

        let pending_brno = TransferFilter {
            status: Some(TransferStatus::InTransit),
            touching: Some(Warehouse::Brno),
            ..TransferFilter::default()
        };
        assert!(pending_brno.matches(&t));
        assert!(!TransferFilter { touching: Some(Warehouse::Ostrava), ..TransferFilter::default() }.matches(&t));
        assert!(!TransferFilter { status: Some(TransferStatus::Confirmed), ..TransferFilter::default() }.matches(&t));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: merging preserves the total of non-negative requested units.
            #[test]
            fn merge_preserves_total(quantities in proptest::collection::vec((0u16..3, 0i64..10), 0..30)) {
                let products = [ProductId::new(), ProductId::new(), ProductId::new()];
                let items: Vec<TransferItem> = quantities
                    .iter()
                    .map(|(p, q)| item(products[*p as usize], 38, *q))
                    .collect();
                let expected: i64 = items.iter().map(|i| i.quantity).sum();

                let merged = merge_items(items).unwrap();
                prop_assert_eq!(merged.iter().map(|i| i.quantity).sum::<i64>(), expected);
                prop_assert!(merged.iter().all(|i| i.quantity > 0));
                prop_assert!(merged.len() <= 3);
            }
        }
    }
}
