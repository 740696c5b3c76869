use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use stockhouse_auth::UserAccount;
use stockhouse_catalog::{Product, ProductFilter};
use stockhouse_core::{AggregateRoot, ProductId, TransferId, UserId};
use stockhouse_inventory::{
    HistoryEntry, HistoryFilter, StockEntry, StockFilter, StockKey, Transfer, TransferFilter,
};
use stockhouse_staff::{OvertimeTally, Period, SalesTally};

use super::{LedgerStore, LedgerTx, StoreError, StoreResult};

#[derive(Debug, Clone, Default)]
struct LedgerState {
    products: HashMap<ProductId, Product>,
    stock: HashMap<StockKey, StockEntry>,
    history: Vec<HistoryEntry>,
    transfers: HashMap<TransferId, Transfer>,
    users: HashMap<UserId, UserAccount>,
    sales: HashMap<(String, Period), SalesTally>,
    overtime: HashMap<(String, Period), OvertimeTally>,
}

/// In-memory ledger store.
///
/// Intended for tests/dev. Units of work run one at a time: `begin` waits
/// for the previous unit to commit or drop.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(InMemoryTx { guard, work }))
    }
}

struct InMemoryTx {
    guard: OwnedMutexGuard<LedgerState>,
    work: LedgerState,
}

#[async_trait]
impl LedgerTx for InMemoryTx {
    async fn product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.work.products.get(&id).cloned())
    }

    async fn products(&mut self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let mut out: Vec<Product> = self
            .work
            .products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name().cmp(b.name()).then(a.id().cmp(&b.id())));
        Ok(out)
    }

    async fn save_product(&mut self, product: &Product) -> StoreResult<()> {
        self.work.products.insert(product.id(), product.clone());
        Ok(())
    }

    async fn delete_product(&mut self, id: ProductId) -> StoreResult<()> {
        self.work.products.remove(&id);
        self.work.stock.retain(|key, _| key.product_id != id);
        Ok(())
    }

    async fn stock(&mut self, key: &StockKey) -> StoreResult<StockEntry> {
        Ok(self
            .work
            .stock
            .get(key)
            .cloned()
            .unwrap_or_else(|| StockEntry::empty(*key)))
    }

    /// Materialises a zero row for an untouched key, as the Postgres store does.
    async fn stock_for_update(&mut self, key: &StockKey) -> StoreResult<StockEntry> {
        Ok(self
            .work
            .stock
            .entry(*key)
            .or_insert_with(|| StockEntry::empty(*key))
            .clone())
    }

    async fn save_stock(&mut self, entry: &StockEntry) -> StoreResult<()> {
        if entry.quantity() < 0 {
            return Err(StoreError::Conflict(format!(
                "negative quantity for {:?}",
                entry.key()
            )));
        }
        self.work.stock.insert(*entry.key(), entry.clone());
        Ok(())
    }

    async fn stock_entries(&mut self, filter: &StockFilter) -> StoreResult<Vec<StockEntry>> {
        let mut out: Vec<StockEntry> = self
            .work
            .stock
            .values()
            .filter(|e| filter.matches(e.key()))
            .cloned()
            .collect();
        out.sort_by_key(|e| *e.key());
        Ok(out)
    }

    async fn append_history(&mut self, entry: &HistoryEntry) -> StoreResult<()> {
        if self.work.history.iter().any(|h| h.id == entry.id) {
            return Err(StoreError::Conflict(format!("history entry {} exists", entry.id)));
        }
        self.work.history.push(entry.clone());
        Ok(())
    }

    async fn history(&mut self, filter: &HistoryFilter) -> StoreResult<Vec<HistoryEntry>> {
        let mut out: Vec<HistoryEntry> = self
            .work
            .history
            .iter()
            .filter(|h| filter.matches(h))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at).then(b.id.cmp(&a.id)));
        Ok(out)
    }

    async fn insert_transfer(&mut self, transfer: &Transfer) -> StoreResult<()> {
        let id = *transfer.id();
        if self.work.transfers.contains_key(&id) {
            return Err(StoreError::Conflict(format!("transfer {id} exists")));
        }
        self.work.transfers.insert(id, transfer.clone());
        Ok(())
    }

    async fn transfer(&mut self, id: TransferId) -> StoreResult<Option<Transfer>> {
        Ok(self.work.transfers.get(&id).cloned())
    }

    async fn transfer_for_update(&mut self, id: TransferId) -> StoreResult<Option<Transfer>> {
        self.transfer(id).await
    }

    async fn update_transfer(&mut self, transfer: &Transfer) -> StoreResult<()> {
        let id = *transfer.id();
        match self.work.transfers.get_mut(&id) {
            Some(slot) => {
                *slot = transfer.clone();
                Ok(())
            }
            None => Err(StoreError::Backend(format!("transfer {id} does not exist"))),
        }
    }

    async fn transfers(&mut self, filter: &TransferFilter) -> StoreResult<Vec<Transfer>> {
        let mut out: Vec<Transfer> = self
            .work
            .transfers
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then(b.transfer_id().cmp(&a.transfer_id()))
        });
        Ok(out)
    }

    async fn user(&mut self, id: UserId) -> StoreResult<Option<UserAccount>> {
        Ok(self.work.users.get(&id).cloned())
    }

    async fn user_by_username(&mut self, username: &str) -> StoreResult<Option<UserAccount>> {
        Ok(self
            .work
            .users
            .values()
            .find(|u| u.username() == username)
            .cloned())
    }

    async fn users(&mut self) -> StoreResult<Vec<UserAccount>> {
        let mut out: Vec<UserAccount> = self.work.users.values().cloned().collect();
        out.sort_by(|a, b| a.username().cmp(b.username()));
        Ok(out)
    }

    async fn save_user(&mut self, user: &UserAccount) -> StoreResult<()> {
        let taken = self
            .work
            .users
            .values()
            .any(|u| u.username() == user.username() && u.id() != user.id());
        if taken {
            return Err(StoreError::Conflict(format!(
                "username '{}' is taken",
                user.username()
            )));
        }
        self.work.users.insert(user.id(), user.clone());
        Ok(())
    }

    async fn delete_user(&mut self, id: UserId) -> StoreResult<()> {
        self.work.users.remove(&id);
        Ok(())
    }

    async fn sales_tally(&mut self, username: &str, period: Period) -> StoreResult<Option<SalesTally>> {
        Ok(self.work.sales.get(&(username.to_string(), period)).cloned())
    }

    async fn save_sales_tally(&mut self, tally: &SalesTally) -> StoreResult<()> {
        self.work
            .sales
            .insert((tally.username.clone(), tally.period), tally.clone());
        Ok(())
    }

    async fn sales_tallies(&mut self, year: i32, month: Option<u32>) -> StoreResult<Vec<SalesTally>> {
        let mut out: Vec<SalesTally> = self
            .work
            .sales
            .values()
            .filter(|t| in_period(t.period, year, month))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.period.cmp(&b.period).then(a.username.cmp(&b.username)));
        Ok(out)
    }

    async fn overtime_tally(&mut self, username: &str, period: Period) -> StoreResult<Option<OvertimeTally>> {
        Ok(self.work.overtime.get(&(username.to_string(), period)).cloned())
    }

    async fn save_overtime_tally(&mut self, tally: &OvertimeTally) -> StoreResult<()> {
        self.work
            .overtime
            .insert((tally.username.clone(), tally.period), tally.clone());
        Ok(())
    }

    async fn overtime_tallies(&mut self, year: i32, month: Option<u32>) -> StoreResult<Vec<OvertimeTally>> {
        let mut out: Vec<OvertimeTally> = self
            .work
            .overtime
            .values()
            .filter(|t| in_period(t.period, year, month))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.period.cmp(&b.period).then(a.username.cmp(&b.username)));
        Ok(out)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let InMemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}

fn in_period(period: Period, year: i32, month: Option<u32>) -> bool {
    period.year() == year && month.is_none_or(|m| period.month() == m)
}
