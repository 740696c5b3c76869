//! Ledger persistence: a store hands out units of work.
//!
//! A [`LedgerTx`] sees a consistent snapshot and buffers its writes; they
//! become visible only on [`LedgerTx::commit`]. Dropping a unit of work
//! without committing rolls it back.

pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use stockhouse_auth::UserAccount;
use stockhouse_catalog::{Product, ProductFilter};
use stockhouse_core::{ProductId, TransferId, UserId};
use stockhouse_inventory::{
    HistoryEntry, HistoryFilter, StockEntry, StockFilter, StockKey, Transfer, TransferFilter,
};
use stockhouse_staff::{OvertimeTally, Period, SalesTally};

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;

/// Storage failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint was hit (duplicate username, concurrent insert).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored row could not be decoded.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// Connection, query or transaction failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One unit of work against the ledger.
///
/// Listing methods return transfers and history newest first, products by
/// name and users by username.
#[async_trait]
pub trait LedgerTx: Send {
    async fn product(&mut self, id: ProductId) -> StoreResult<Option<Product>>;
    async fn products(&mut self, filter: &ProductFilter) -> StoreResult<Vec<Product>>;
    async fn save_product(&mut self, product: &Product) -> StoreResult<()>;
    /// Removes the product together with its stock entries.
    async fn delete_product(&mut self, id: ProductId) -> StoreResult<()>;

    /// Current entry, or an empty one when the key was never touched.
    async fn stock(&mut self, key: &StockKey) -> StoreResult<StockEntry>;
    /// Like [`LedgerTx::stock`] but holds the entry until commit or rollback.
    async fn stock_for_update(&mut self, key: &StockKey) -> StoreResult<StockEntry>;
    async fn save_stock(&mut self, entry: &StockEntry) -> StoreResult<()>;
    async fn stock_entries(&mut self, filter: &StockFilter) -> StoreResult<Vec<StockEntry>>;

    async fn append_history(&mut self, entry: &HistoryEntry) -> StoreResult<()>;
    async fn history(&mut self, filter: &HistoryFilter) -> StoreResult<Vec<HistoryEntry>>;

    async fn insert_transfer(&mut self, transfer: &Transfer) -> StoreResult<()>;
    async fn transfer(&mut self, id: TransferId) -> StoreResult<Option<Transfer>>;
    async fn transfer_for_update(&mut self, id: TransferId) -> StoreResult<Option<Transfer>>;
    /// Persists status and confirmation fields; items never change.
    async fn update_transfer(&mut self, transfer: &Transfer) -> StoreResult<()>;
    async fn transfers(&mut self, filter: &TransferFilter) -> StoreResult<Vec<Transfer>>;

    async fn user(&mut self, id: UserId) -> StoreResult<Option<UserAccount>>;
    async fn user_by_username(&mut self, username: &str) -> StoreResult<Option<UserAccount>>;
    async fn users(&mut self) -> StoreResult<Vec<UserAccount>>;
    async fn save_user(&mut self, user: &UserAccount) -> StoreResult<()>;
    async fn delete_user(&mut self, id: UserId) -> StoreResult<()>;

    async fn sales_tally(&mut self, username: &str, period: Period) -> StoreResult<Option<SalesTally>>;
    async fn save_sales_tally(&mut self, tally: &SalesTally) -> StoreResult<()>;
    /// Tallies of `year`, optionally narrowed to one month.
    async fn sales_tallies(&mut self, year: i32, month: Option<u32>) -> StoreResult<Vec<SalesTally>>;

    async fn overtime_tally(&mut self, username: &str, period: Period) -> StoreResult<Option<OvertimeTally>>;
    async fn save_overtime_tally(&mut self, tally: &OvertimeTally) -> StoreResult<()>;
    async fn overtime_tallies(&mut self, year: i32, month: Option<u32>) -> StoreResult<Vec<OvertimeTally>>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Source of units of work.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>>;
}

#[async_trait]
impl<S> LedgerStore for std::sync::Arc<S>
where
    S: LedgerStore + ?Sized,
{
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>> {
        (**self).begin().await
    }
}
