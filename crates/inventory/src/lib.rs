//! Inventory domain module: stock ledger entries, history, transfers, and
//! the drafts and reports built on top of them.
//!
//! Business rules only, implemented as deterministic domain logic (no IO, no
//! HTTP, no storage). The infra crate runs these inside units of work.

pub mod basket;
pub mod count;
pub mod history;
pub mod report;
pub mod stock;
pub mod transfer;

pub use basket::{DraftLine, SizeQuantity, TransferDraft};
pub use count::{CountDelta, InventoryCount};
pub use history::{HistoryEntry, HistoryFilter};
pub use report::{CategorySection, DocumentLine, StockMatrix, StockRow, StockScope, TransferDocument};
pub use stock::{
    AdjustStock, ChangeKind, NoteChanged, SetNote, StockAdjusted, StockCommand, StockEntry,
    StockEvent, StockFilter, StockKey,
};
pub use transfer::{
    ConfirmTransfer, DispatchTransfer, Transfer, TransferCommand, TransferConfirmed,
    TransferDispatched, TransferEvent, TransferFilter, TransferItem, TransferStatus, merge_items,
};
