use chrono::{Days, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use stockhouse_core::{DomainError, DomainResult, ProductId, Warehouse};
use stockhouse_infra::ledger::{CountLine, StockTarget, TransferLine};
use stockhouse_inventory::{HistoryFilter, InventoryCount, StockEntry, Transfer, TransferDraft};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

/// Receive/issue body. `size` defaults to the universal size.
#[derive(Debug, Deserialize)]
pub struct StockMovementRequest {
    pub product_id: ProductId,
    pub warehouse: Warehouse,
    #[serde(default)]
    pub size: i64,
    pub quantity: i64,
    pub note: Option<String>,
}

impl StockMovementRequest {
    pub fn target(&self) -> StockTarget {
        StockTarget {
            product_id: self.product_id,
            warehouse: self.warehouse,
            size: self.size,
        }
    }
}

/// Signed adjustment body: positive deltas are logged inbound, negative outbound.
#[derive(Debug, Deserialize)]
pub struct StockAdjustRequest {
    pub product_id: ProductId,
    pub warehouse: Warehouse,
    #[serde(default)]
    pub size: i64,
    pub delta: i64,
    pub note: Option<String>,
}

impl StockAdjustRequest {
    pub fn target(&self) -> StockTarget {
        StockTarget {
            product_id: self.product_id,
            warehouse: self.warehouse,
            size: self.size,
        }
    }
}

/// Without `size` the note belongs to the product as a whole.
#[derive(Debug, Deserialize)]
pub struct StockNoteRequest {
    pub product_id: ProductId,
    pub warehouse: Warehouse,
    pub size: Option<i64>,
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct MatrixQuery {
    /// A warehouse name, or `all` / absent for every warehouse.
    pub warehouse: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransferRequest {
    pub source: Warehouse,
    pub target: Warehouse,
    pub lines: Vec<TransferLine>,
}

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    pub source: Warehouse,
    pub target: Warehouse,
}

#[derive(Debug, Deserialize)]
pub struct SizeQuantityRequest {
    #[serde(default)]
    pub size: i64,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct BasketQuantitiesRequest {
    pub quantities: Vec<SizeQuantityRequest>,
}

#[derive(Debug, Deserialize)]
pub struct CountRequest {
    pub warehouse: Option<Warehouse>,
    #[serde(default)]
    pub lines: Vec<CountLine>,
}

/// `from` and `to` are calendar days (UTC), both inclusive.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub user: Option<String>,
    pub warehouse: Option<Warehouse>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl HistoryQuery {
    pub fn into_filter(self) -> DomainResult<HistoryFilter> {
        let until = match self.to {
            Some(day) => Some(
                day.checked_add_days(Days::new(1))
                    .ok_or_else(|| DomainError::validation("date out of range"))?,
            ),
            None => None,
        };
        Ok(HistoryFilter {
            actor: self.user.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()),
            warehouse: self.warehouse,
            from: self.from.map(start_of_day),
            until: until.map(start_of_day),
        })
    }
}

fn start_of_day(day: NaiveDate) -> chrono::DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(chrono::NaiveTime::MIN))
}

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SalesRequest {
    pub username: Option<String>,
    pub month: Option<u32>,
    #[serde(default)]
    pub tries: i64,
    #[serde(default)]
    pub sales: i64,
}

#[derive(Debug, Deserialize)]
pub struct OvertimeRequest {
    pub username: Option<String>,
    pub month: Option<u32>,
    #[serde(default)]
    pub classic: i64,
    #[serde(default)]
    pub deluxe: i64,
}

// -------------------------
// Response mapping
// -------------------------

pub fn stock_entry_to_json(entry: &StockEntry) -> Value {
    let key = entry.key();
    json!({
        "product_id": key.product_id,
        "warehouse": key.warehouse,
        "size": key.size,
        "size_label": key.size.label(),
        "quantity": entry.quantity(),
        "note": entry.note(),
    })
}

pub fn transfer_to_json(transfer: &Transfer) -> Value {
    json!({
        "id": transfer.transfer_id(),
        "source": transfer.source(),
        "target": transfer.target(),
        "status": transfer.status(),
        "created_by": transfer.created_by(),
        "created_at": transfer.created_at(),
        "confirmed_by": transfer.confirmed_by(),
        "confirmed_at": transfer.confirmed_at(),
        "items": transfer.items(),
        "total_units": transfer.total_units(),
    })
}

pub fn basket_to_json(draft: &TransferDraft) -> Value {
    json!({
        "source": draft.source(),
        "target": draft.target(),
        "lines": draft.lines(),
        "total_units": draft.items().iter().map(|i| i.quantity).sum::<i64>(),
    })
}

pub fn count_to_json(count: &InventoryCount) -> Value {
    let lines: Vec<Value> = count
        .observed()
        .map(|(key, quantity)| {
            json!({
                "product_id": key.product_id,
                "size": key.size,
                "quantity": quantity,
            })
        })
        .collect();
    json!({
        "warehouse": count.warehouse(),
        "lines": lines,
    })
}
