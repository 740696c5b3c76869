use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockhouse_catalog::Size;
use stockhouse_core::{HistoryEntryId, ProductId, Warehouse};

use crate::stock::{ChangeKind, StockEvent};

/// One line of the append-only stock history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: HistoryEntryId,
    /// Username of whoever made the change.
    pub actor: String,
    pub warehouse: Warehouse,
    pub product_id: ProductId,
    pub size: Size,
    pub kind: ChangeKind,
    /// Signed quantity change; 0 for note edits.
    pub amount: i64,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn from_event(id: HistoryEntryId, event: &StockEvent) -> Self {
        match event {
            StockEvent::Adjusted(e) => Self {
                id,
                actor: e.actor.clone(),
                warehouse: e.key.warehouse,
                product_id: e.key.product_id,
                size: e.key.size,
                kind: e.kind,
                amount: e.delta,
                note: e.note.clone(),
                recorded_at: e.occurred_at,
            },
            StockEvent::NoteChanged(e) => Self {
                id,
                actor: e.actor.clone(),
                warehouse: e.key.warehouse,
                product_id: e.key.product_id,
                size: e.key.size,
                kind: ChangeKind::Note,
                amount: 0,
                note: e.note.clone(),
                recorded_at: e.occurred_at,
            },
        }
    }
}

/// History query. `from` is inclusive, `until` exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub actor: Option<String>,
    pub warehouse: Option<Warehouse>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl HistoryFilter {
    pub fn matches(&self, entry: &HistoryEntry) -> bool {
        self.actor.as_deref().is_none_or(|a| entry.actor == a)
            && self.warehouse.is_none_or(|w| entry.warehouse == w)
            && self.from.is_none_or(|from| entry.recorded_at >= from)
            && self.until.is_none_or(|until| entry.recorded_at < until)
    }
}
