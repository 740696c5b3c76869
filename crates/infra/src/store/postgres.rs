//! Postgres-backed ledger store.
//!
//! Every unit of work is one database transaction. Stock and transfer rows
//! that are about to change are read with `SELECT ... FOR UPDATE`, so two
//! units of work touching the same key run one after the other while
//! disjoint keys proceed in parallel.
//!
//! ## Error Mapping
//!
//! | SQLx error                          | Code    | StoreError |
//! |-------------------------------------|---------|------------|
//! | Database (unique violation)         | `23505` | `Conflict` |
//! | Database (check violation)          | `23514` | `Conflict` |
//! | Database (other), pool, IO, ...     |         | `Backend`  |

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use tracing::instrument;
use uuid::Uuid;

use async_trait::async_trait;

use stockhouse_auth::{Role, UserAccount};
use stockhouse_catalog::{Category, Product, ProductFilter, Size};
use stockhouse_core::{AggregateRoot, HistoryEntryId, ProductId, TransferId, UserId, Warehouse};
use stockhouse_inventory::{
    ChangeKind, HistoryEntry, HistoryFilter, StockEntry, StockFilter, StockKey, Transfer,
    TransferFilter, TransferItem, TransferStatus,
};
use stockhouse_staff::{OvertimeTally, Period, SalesTally};

use super::{LedgerStore, LedgerTx, StoreError, StoreResult};

/// Embedded schema migrations (`crates/infra/migrations`).
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("migration failed: {e}")))
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    #[instrument(skip(self), err)]
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        Ok(Box::new(PostgresTx { tx }))
    }
}

struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Rows
// ─────────────────────────────────────────────────────────────────────────────

#[derive(FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    category: String,
    color: Option<String>,
    back_solution: Option<String>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let category: Category = parse(&row.category, "category")?;
        Ok(Product::restore(
            ProductId::from_uuid(row.id),
            row.name,
            category,
            row.color,
            row.back_solution,
        ))
    }
}

#[derive(FromRow)]
struct StockRow {
    product_id: Uuid,
    warehouse: String,
    size: i32,
    quantity: i64,
    note: Option<String>,
}

impl TryFrom<StockRow> for StockEntry {
    type Error = StoreError;

    fn try_from(row: StockRow) -> Result<Self, Self::Error> {
        let key = StockKey::new(
            ProductId::from_uuid(row.product_id),
            parse(&row.warehouse, "warehouse")?,
            size_from_db(row.size)?,
        );
        Ok(StockEntry::restore(key, row.quantity, row.note))
    }
}

#[derive(FromRow)]
struct HistoryRow {
    id: Uuid,
    actor: String,
    warehouse: String,
    product_id: Uuid,
    size: i32,
    kind: String,
    amount: i64,
    note: Option<String>,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = StoreError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        Ok(HistoryEntry {
            id: HistoryEntryId::from_uuid(row.id),
            actor: row.actor,
            warehouse: parse(&row.warehouse, "warehouse")?,
            product_id: ProductId::from_uuid(row.product_id),
            size: size_from_db(row.size)?,
            kind: parse::<ChangeKind>(&row.kind, "change kind")?,
            amount: row.amount,
            note: row.note,
            recorded_at: row.recorded_at,
        })
    }
}

#[derive(FromRow)]
struct TransferRow {
    id: Uuid,
    source: String,
    target: String,
    created_by: String,
    created_at: DateTime<Utc>,
    status: String,
    confirmed_by: Option<String>,
    confirmed_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct TransferItemRow {
    transfer_id: Uuid,
    product_id: Uuid,
    size: i32,
    quantity: i64,
}

impl TransferRow {
    fn into_transfer(self, items: Vec<TransferItem>) -> StoreResult<Transfer> {
        Ok(Transfer::restore(
            TransferId::from_uuid(self.id),
            parse(&self.source, "warehouse")?,
            parse(&self.target, "warehouse")?,
            self.created_by,
            self.created_at,
            parse::<TransferStatus>(&self.status, "transfer status")?,
            self.confirmed_by,
            self.confirmed_at,
            items,
        ))
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    role: String,
    warehouse: Option<String>,
}

impl TryFrom<UserRow> for UserAccount {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e: String| StoreError::Corrupt(e))?;
        let warehouse = row
            .warehouse
            .as_deref()
            .map(|w| parse::<Warehouse>(w, "warehouse"))
            .transpose()?;
        Ok(UserAccount::restore(
            UserId::from_uuid(row.id),
            row.username,
            role,
            warehouse,
        ))
    }
}

#[derive(FromRow)]
struct TallyRow {
    username: String,
    year: i32,
    month: i32,
    first: i64,
    second: i64,
}

impl TallyRow {
    fn period(&self) -> StoreResult<Period> {
        let month = u32::try_from(self.month)
            .map_err(|_| StoreError::Corrupt(format!("month {}", self.month)))?;
        Period::new(self.year, month).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    fn into_sales(self) -> StoreResult<SalesTally> {
        Ok(SalesTally {
            period: self.period()?,
            username: self.username,
            tries: self.first,
            sales: self.second,
        })
    }

    fn into_overtime(self) -> StoreResult<OvertimeTally> {
        Ok(OvertimeTally {
            period: self.period()?,
            username: self.username,
            classic: self.first,
            deluxe: self.second,
        })
    }
}

fn parse<T>(raw: &str, what: &str) -> StoreResult<T>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    raw.parse()
        .map_err(|e| StoreError::Corrupt(format!("{what} '{raw}': {e}")))
}

fn size_from_db(raw: i32) -> StoreResult<Size> {
    u16::try_from(raw)
        .map(Size::from_raw)
        .map_err(|_| StoreError::Corrupt(format!("size {raw}")))
}

fn size_to_db(size: Size) -> i32 {
    i32::from(size.value())
}

fn month_to_db(period: Period) -> i32 {
    // 1..=12 always fits
    period.month() as i32
}

// ─────────────────────────────────────────────────────────────────────────────
// Unit of work
// ─────────────────────────────────────────────────────────────────────────────

const PRODUCT_COLUMNS: &str = "id, name, category, color, back_solution";
const STOCK_COLUMNS: &str = "product_id, warehouse, size, quantity, note";
const HISTORY_COLUMNS: &str =
    "id, actor, warehouse, product_id, size, kind, amount, note, recorded_at";
const TRANSFER_COLUMNS: &str =
    "id, source, target, created_by, created_at, status, confirmed_by, confirmed_at";
const USER_COLUMNS: &str = "id, username, role, warehouse";

impl PostgresTx {
    async fn fetch_stock(&mut self, key: &StockKey, lock: bool) -> StoreResult<StockEntry> {
        let sql = format!(
            "SELECT {STOCK_COLUMNS} FROM stock_entries \
             WHERE product_id = $1 AND warehouse = $2 AND size = $3{}",
            if lock { " FOR UPDATE" } else { "" }
        );
        let row: Option<StockRow> = sqlx::query_as(&sql)
            .bind(key.product_id.as_uuid())
            .bind(key.warehouse.as_str())
            .bind(size_to_db(key.size))
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("stock", e))?;

        match row {
            Some(row) => row.try_into(),
            None => Ok(StockEntry::empty(*key)),
        }
    }

    async fn items_for(&mut self, ids: &[Uuid]) -> StoreResult<Vec<TransferItemRow>> {
        sqlx::query_as(
            "SELECT transfer_id, product_id, size, quantity FROM transfer_items \
             WHERE transfer_id = ANY($1) ORDER BY product_id, size",
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("transfer_items", e))
    }

    async fn assemble_transfers(&mut self, rows: Vec<TransferRow>) -> StoreResult<Vec<Transfer>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let items = self.items_for(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let mine = items
                    .iter()
                    .filter(|i| i.transfer_id == row.id)
                    .map(|i| {
                        Ok(TransferItem {
                            product_id: ProductId::from_uuid(i.product_id),
                            size: size_from_db(i.size)?,
                            quantity: i.quantity,
                        })
                    })
                    .collect::<StoreResult<Vec<_>>>()?;
                row.into_transfer(mine)
            })
            .collect()
    }

    async fn fetch_transfer(&mut self, id: TransferId, lock: bool) -> StoreResult<Option<Transfer>> {
        let sql = format!(
            "SELECT {TRANSFER_COLUMNS} FROM transfers WHERE id = $1{}",
            if lock { " FOR UPDATE" } else { "" }
        );
        let row: Option<TransferRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("transfer", e))?;

        match row {
            Some(row) => Ok(self.assemble_transfers(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn fetch_tallies(
        &mut self,
        table: &str,
        columns: &str,
        year: i32,
        month: Option<u32>,
    ) -> StoreResult<Vec<TallyRow>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT username, year, month, {columns} FROM {table} WHERE year = "
        ));
        qb.push_bind(year);
        if let Some(m) = month {
            qb.push(" AND month = ").push_bind(m as i32);
        }
        qb.push(" ORDER BY month, username");

        qb.build_query_as::<TallyRow>()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(table, e))
    }
}

#[async_trait]
impl LedgerTx for PostgresTx {
    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("product", e))?;
        row.map(Product::try_from).transpose()
    }

    #[instrument(skip(self), err)]
    async fn products(&mut self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE TRUE"));
        if let Some(category) = filter.category {
            qb.push(" AND category = ").push_bind(category.as_str());
        }
        if let Some(needle) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            qb.push(" AND position(lower(")
                .push_bind(needle.to_string())
                .push(") in lower(name)) > 0");
        }
        qb.push(" ORDER BY name, id");

        let rows: Vec<ProductRow> = qb
            .build_query_as()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("products", e))?;
        rows.into_iter().map(Product::try_from).collect()
    }

    #[instrument(skip(self, product), fields(product_id = %product.id()), err)]
    async fn save_product(&mut self, product: &Product) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO products (id, name, category, color, back_solution) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (id) DO UPDATE SET \
                name = EXCLUDED.name, color = EXCLUDED.color, back_solution = EXCLUDED.back_solution",
        )
        .bind(product.id().as_uuid())
        .bind(product.name())
        .bind(product.category().as_str())
        .bind(product.color())
        .bind(product.back_solution())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("save_product", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&mut self, id: ProductId) -> StoreResult<()> {
        // stock_entries cascade
        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(())
    }

    async fn stock(&mut self, key: &StockKey) -> StoreResult<StockEntry> {
        self.fetch_stock(key, false).await
    }

    #[instrument(skip(self), err)]
    async fn stock_for_update(&mut self, key: &StockKey) -> StoreResult<StockEntry> {
        // Materialise the row first so the lock also covers keys never touched before.
        sqlx::query(
            "INSERT INTO stock_entries (product_id, warehouse, size, quantity) \
             VALUES ($1, $2, $3, 0) ON CONFLICT DO NOTHING",
        )
        .bind(key.product_id.as_uuid())
        .bind(key.warehouse.as_str())
        .bind(size_to_db(key.size))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("stock_for_update", e))?;

        self.fetch_stock(key, true).await
    }

    #[instrument(skip(self, entry), fields(quantity = entry.quantity()), err)]
    async fn save_stock(&mut self, entry: &StockEntry) -> StoreResult<()> {
        let key = entry.key();
        sqlx::query(
            "INSERT INTO stock_entries (product_id, warehouse, size, quantity, note) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (product_id, warehouse, size) DO UPDATE SET \
                quantity = EXCLUDED.quantity, note = EXCLUDED.note",
        )
        .bind(key.product_id.as_uuid())
        .bind(key.warehouse.as_str())
        .bind(size_to_db(key.size))
        .bind(entry.quantity())
        .bind(entry.note())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("save_stock", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn stock_entries(&mut self, filter: &StockFilter) -> StoreResult<Vec<StockEntry>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {STOCK_COLUMNS} FROM stock_entries WHERE TRUE"));
        if let Some(w) = filter.warehouse {
            qb.push(" AND warehouse = ").push_bind(w.as_str());
        }
        if let Some(p) = filter.product_id {
            qb.push(" AND product_id = ").push_bind(*p.as_uuid());
        }
        qb.push(" ORDER BY product_id, warehouse, size");

        let rows: Vec<StockRow> = qb
            .build_query_as()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("stock_entries", e))?;
        rows.into_iter().map(StockEntry::try_from).collect()
    }

    #[instrument(skip(self, entry), fields(kind = %entry.kind, amount = entry.amount), err)]
    async fn append_history(&mut self, entry: &HistoryEntry) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO history (id, actor, warehouse, product_id, size, kind, amount, note, recorded_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(entry.id.as_uuid())
        .bind(&entry.actor)
        .bind(entry.warehouse.as_str())
        .bind(entry.product_id.as_uuid())
        .bind(size_to_db(entry.size))
        .bind(entry.kind.as_str())
        .bind(entry.amount)
        .bind(entry.note.as_deref())
        .bind(entry.recorded_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("append_history", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn history(&mut self, filter: &HistoryFilter) -> StoreResult<Vec<HistoryEntry>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {HISTORY_COLUMNS} FROM history WHERE TRUE"));
        if let Some(actor) = &filter.actor {
            qb.push(" AND actor = ").push_bind(actor.clone());
        }
        if let Some(w) = filter.warehouse {
            qb.push(" AND warehouse = ").push_bind(w.as_str());
        }
        if let Some(from) = filter.from {
            qb.push(" AND recorded_at >= ").push_bind(from);
        }
        if let Some(until) = filter.until {
            qb.push(" AND recorded_at < ").push_bind(until);
        }
        qb.push(" ORDER BY recorded_at DESC, id DESC");

        let rows: Vec<HistoryRow> = qb
            .build_query_as()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("history", e))?;
        rows.into_iter().map(HistoryEntry::try_from).collect()
    }

    #[instrument(skip(self, transfer), fields(transfer_id = %transfer.id()), err)]
    async fn insert_transfer(&mut self, transfer: &Transfer) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO transfers (id, source, target, created_by, created_at, status, confirmed_by, confirmed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(transfer.id().as_uuid())
        .bind(transfer.source().as_str())
        .bind(transfer.target().as_str())
        .bind(transfer.created_by())
        .bind(transfer.created_at())
        .bind(transfer.status().as_str())
        .bind(transfer.confirmed_by())
        .bind(transfer.confirmed_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_transfer", e))?;

        for item in transfer.items() {
            sqlx::query(
                "INSERT INTO transfer_items (transfer_id, product_id, size, quantity) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(transfer.id().as_uuid())
            .bind(item.product_id.as_uuid())
            .bind(size_to_db(item.size))
            .bind(item.quantity)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_transfer_item", e))?;
        }
        Ok(())
    }

    async fn transfer(&mut self, id: TransferId) -> StoreResult<Option<Transfer>> {
        self.fetch_transfer(id, false).await
    }

    #[instrument(skip(self), fields(transfer_id = %id), err)]
    async fn transfer_for_update(&mut self, id: TransferId) -> StoreResult<Option<Transfer>> {
        self.fetch_transfer(id, true).await
    }

    #[instrument(skip(self, transfer), fields(transfer_id = %transfer.id()), err)]
    async fn update_transfer(&mut self, transfer: &Transfer) -> StoreResult<()> {
        let done = sqlx::query(
            "UPDATE transfers SET status = $2, confirmed_by = $3, confirmed_at = $4 WHERE id = $1",
        )
        .bind(transfer.id().as_uuid())
        .bind(transfer.status().as_str())
        .bind(transfer.confirmed_by())
        .bind(transfer.confirmed_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_transfer", e))?;

        if done.rows_affected() != 1 {
            return Err(StoreError::Backend(format!(
                "transfer {} does not exist",
                transfer.id()
            )));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn transfers(&mut self, filter: &TransferFilter) -> StoreResult<Vec<Transfer>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {TRANSFER_COLUMNS} FROM transfers WHERE TRUE"));
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(w) = filter.source {
            qb.push(" AND source = ").push_bind(w.as_str());
        }
        if let Some(w) = filter.target {
            qb.push(" AND target = ").push_bind(w.as_str());
        }
        if let Some(w) = filter.touching {
            qb.push(" AND (source = ")
                .push_bind(w.as_str())
                .push(" OR target = ")
                .push_bind(w.as_str())
                .push(")");
        }
        qb.push(" ORDER BY created_at DESC, id DESC");

        let rows: Vec<TransferRow> = qb
            .build_query_as()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("transfers", e))?;
        self.assemble_transfers(rows).await
    }

    async fn user(&mut self, id: UserId) -> StoreResult<Option<UserAccount>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("user", e))?;
        row.map(UserAccount::try_from).transpose()
    }

    async fn user_by_username(&mut self, username: &str) -> StoreResult<Option<UserAccount>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(username)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("user_by_username", e))?;
        row.map(UserAccount::try_from).transpose()
    }

    async fn users(&mut self) -> StoreResult<Vec<UserAccount>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY username");
        let rows: Vec<UserRow> = sqlx::query_as(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("users", e))?;
        rows.into_iter().map(UserAccount::try_from).collect()
    }

    #[instrument(skip(self, user), fields(username = user.username()), err)]
    async fn save_user(&mut self, user: &UserAccount) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, username, role, warehouse) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE SET \
                username = EXCLUDED.username, role = EXCLUDED.role, warehouse = EXCLUDED.warehouse",
        )
        .bind(user.id().as_uuid())
        .bind(user.username())
        .bind(user.role().as_str())
        .bind(user.warehouse().map(|w| w.as_str()))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("save_user", e))?;
        Ok(())
    }

    async fn delete_user(&mut self, id: UserId) -> StoreResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        Ok(())
    }

    async fn sales_tally(&mut self, username: &str, period: Period) -> StoreResult<Option<SalesTally>> {
        let row: Option<TallyRow> = sqlx::query_as(
            "SELECT username, year, month, tries AS first, sales AS second FROM sales_tallies \
             WHERE username = $1 AND year = $2 AND month = $3 FOR UPDATE",
        )
        .bind(username)
        .bind(period.year())
        .bind(month_to_db(period))
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("sales_tally", e))?;
        row.map(TallyRow::into_sales).transpose()
    }

    async fn save_sales_tally(&mut self, tally: &SalesTally) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO sales_tallies (username, year, month, tries, sales) VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (username, year, month) DO UPDATE SET tries = EXCLUDED.tries, sales = EXCLUDED.sales",
        )
        .bind(&tally.username)
        .bind(tally.period.year())
        .bind(month_to_db(tally.period))
        .bind(tally.tries)
        .bind(tally.sales)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("save_sales_tally", e))?;
        Ok(())
    }

    async fn sales_tallies(&mut self, year: i32, month: Option<u32>) -> StoreResult<Vec<SalesTally>> {
        self.fetch_tallies("sales_tallies", "tries AS first, sales AS second", year, month)
            .await?
            .into_iter()
            .map(TallyRow::into_sales)
            .collect()
    }

    async fn overtime_tally(&mut self, username: &str, period: Period) -> StoreResult<Option<OvertimeTally>> {
        let row: Option<TallyRow> = sqlx::query_as(
            "SELECT username, year, month, classic AS first, deluxe AS second FROM overtime_tallies \
             WHERE username = $1 AND year = $2 AND month = $3 FOR UPDATE",
        )
        .bind(username)
        .bind(period.year())
        .bind(month_to_db(period))
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("overtime_tally", e))?;
        row.map(TallyRow::into_overtime).transpose()
    }

    async fn save_overtime_tally(&mut self, tally: &OvertimeTally) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO overtime_tallies (username, year, month, classic, deluxe) VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (username, year, month) DO UPDATE SET classic = EXCLUDED.classic, deluxe = EXCLUDED.deluxe",
        )
        .bind(&tally.username)
        .bind(tally.period.year())
        .bind(month_to_db(tally.period))
        .bind(tally.classic)
        .bind(tally.deluxe)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("save_overtime_tally", e))?;
        Ok(())
    }

    async fn overtime_tallies(&mut self, year: i32, month: Option<u32>) -> StoreResult<Vec<OvertimeTally>> {
        self.fetch_tallies("overtime_tallies", "classic AS first, deluxe AS second", year, month)
            .await?
            .into_iter()
            .map(TallyRow::into_overtime)
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23514") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
