use chrono::{DateTime, Utc};
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use stockhouse_catalog::Size;
use stockhouse_core::{
    Aggregate, AggregateRoot, DomainError, DomainEvent, DomainResult, ProductId, Warehouse,
    ensure_within_limit,
};

/// Ledger key: one product in one size at one warehouse.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StockKey {
    pub product_id: ProductId,
    pub warehouse: Warehouse,
    pub size: Size,
}

impl StockKey {
    pub fn new(product_id: ProductId, warehouse: Warehouse, size: Size) -> Self {
        Self {
            product_id,
            warehouse,
            size,
        }
    }
}

/// Why a stock entry changed. Recorded on every history entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    Inbound,
    Outbound,
    InventoryCorrection,
    TransferOut,
    TransferIn,
    /// Note edit; carries amount 0.
    Note,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Inbound => "inbound",
            ChangeKind::Outbound => "outbound",
            ChangeKind::InventoryCorrection => "inventory-correction",
            ChangeKind::TransferOut => "transfer-out",
            ChangeKind::TransferIn => "transfer-in",
            ChangeKind::Note => "note",
        }
    }

    /// Sign rule for quantity-bearing kinds.
    fn accepts(&self, delta: i64) -> bool {
        match self {
            ChangeKind::Inbound | ChangeKind::TransferIn => delta > 0,
            ChangeKind::Outbound | ChangeKind::TransferOut => delta < 0,
            ChangeKind::InventoryCorrection => delta != 0,
            ChangeKind::Note => false,
        }
    }
}

impl core::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbound" => Ok(ChangeKind::Inbound),
            "outbound" => Ok(ChangeKind::Outbound),
            "inventory-correction" => Ok(ChangeKind::InventoryCorrection),
            "transfer-out" => Ok(ChangeKind::TransferOut),
            "transfer-in" => Ok(ChangeKind::TransferIn),
            "note" => Ok(ChangeKind::Note),
            other => Err(DomainError::validation(format!("unknown change kind '{other}'"))),
        }
    }
}

/// Aggregate root: StockEntry.
///
/// Created lazily: a key that was never touched behaves as an entry with
/// quantity 0 and no note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEntry {
    key: StockKey,
    quantity: i64,
    note: Option<String>,
    #[serde(skip)]
    version: u64,
}

impl StockEntry {
    /// A zero entry for a key with no stored row yet.
    pub fn empty(key: StockKey) -> Self {
        Self {
            key,
            quantity: 0,
            note: None,
            version: 0,
        }
    }

    /// Rebuild from storage.
    pub fn restore(key: StockKey, quantity: i64, note: Option<String>) -> Self {
        Self {
            key,
            quantity,
            note,
            version: 0,
        }
    }

    pub fn key(&self) -> &StockKey {
        &self.key
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }
}

impl AggregateRoot for StockEntry {
    type Id = StockKey;

    fn id(&self) -> &Self::Id {
        &self.key
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: AdjustStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub key: StockKey,
    pub delta: i64,
    pub kind: ChangeKind,
    pub actor: String,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetNote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetNote {
    pub key: StockKey,
    pub actor: String,
    pub note: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockCommand {
    Adjust(AdjustStock),
    SetNote(SetNote),
}

/// Event: StockAdjusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjusted {
    pub key: StockKey,
    pub delta: i64,
    pub kind: ChangeKind,
    pub actor: String,
    pub note: Option<String>,
    pub quantity_after: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: NoteChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteChanged {
    pub key: StockKey,
    pub actor: String,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockEvent {
    Adjusted(StockAdjusted),
    NoteChanged(NoteChanged),
}

impl StockEvent {
    pub fn key(&self) -> &StockKey {
        match self {
            StockEvent::Adjusted(e) => &e.key,
            StockEvent::NoteChanged(e) => &e.key,
        }
    }
}

impl DomainEvent for StockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockEvent::Adjusted(_) => "stock.adjusted",
            StockEvent::NoteChanged(_) => "stock.note_changed",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockEvent::Adjusted(e) => e.occurred_at,
            StockEvent::NoteChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for StockEntry {
    type Command = StockCommand;
    type Event = StockEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StockEvent::Adjusted(e) => {
                self.quantity = e.quantity_after;
            }
            StockEvent::NoteChanged(e) => {
                self.note = e.note.clone();
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StockCommand::Adjust(cmd) => self.handle_adjust(cmd),
            StockCommand::SetNote(cmd) => self.handle_set_note(cmd),
        }
    }
}

impl StockEntry {
    fn ensure_key(&self, key: &StockKey) -> DomainResult<()> {
        if self.key != *key {
            return Err(DomainError::validation("stock key mismatch"));
        }
        Ok(())
    }

    fn handle_adjust(&self, cmd: &AdjustStock) -> DomainResult<Vec<StockEvent>> {
        self.ensure_key(&cmd.key)?;

        if cmd.delta == 0 {
            return Err(DomainError::invalid_quantity("delta cannot be zero"));
        }
        if !cmd.kind.accepts(cmd.delta) {
            return Err(DomainError::invalid_quantity(format!(
                "delta {} does not fit change kind {}",
                cmd.delta, cmd.kind
            )));
        }

        ensure_within_limit(cmd.delta, "change")?;
        let quantity_after = self
            .quantity
            .checked_add(cmd.delta)
            .ok_or_else(|| DomainError::invalid_quantity("quantity out of range"))?;
        ensure_within_limit(quantity_after, "resulting quantity")?;
        if quantity_after < 0 {
            return Err(DomainError::InsufficientStock {
                product: cmd.key.product_id.to_string(),
                size: cmd.key.size.label(),
                warehouse: cmd.key.warehouse,
                available: self.quantity,
                requested: -cmd.delta,
            });
        }

        Ok(vec![StockEvent::Adjusted(StockAdjusted {
            key: cmd.key,
            delta: cmd.delta,
            kind: cmd.kind,
            actor: cmd.actor.clone(),
            note: cmd.note.clone(),
            quantity_after,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_note(&self, cmd: &SetNote) -> DomainResult<Vec<StockEvent>> {
        self.ensure_key(&cmd.key)?;

        let trimmed = cmd.note.trim();
        let note = (!trimmed.is_empty()).then(|| trimmed.to_string());

        Ok(vec![StockEvent::NoteChanged(NoteChanged {
            key: cmd.key,
            actor: cmd.actor.clone(),
            note,
            occurred_at: cmd.occurred_at,
        })])
    }
}

/// Listing filter for stock entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StockFilter {
    pub warehouse: Option<Warehouse>,
    pub product_id: Option<ProductId>,
}

impl StockFilter {
    pub fn matches(&self, key: &StockKey) -> bool {
        self.warehouse.is_none_or(|w| key.warehouse == w)
            && self.product_id.is_none_or(|p| key.product_id == p)
    }
}
