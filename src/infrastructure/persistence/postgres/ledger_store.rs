//! # PostgreSQL Ledger Store
//!
//! PostgreSQL implementation of [`LedgerStore`] using sqlx.
//!
//! Each [`LedgerTransaction`] wraps one `sqlx::Transaction`. The isolation
//! level is set as the first statement. `lock_*` reads use
//! `SELECT ... FOR NO KEY UPDATE`, which blocks concurrent writers of the
//! same row without blocking foreign-key checks against it.
//! `lock_ownership` is the exception: it locks with a no-op `UPDATE`, so a
//! repeatable-read transaction whose snapshot predates a competing
//! seller-side commit fails with `40001` instead of reading stale sums.

use crate::domain::entities::{Account, Ask, Bid, Operation, OperationOrigin, Ownership, Share};
use crate::domain::value_objects::{
    AccountId, AskId, BidId, CardNumber, IsolationLevel, OperationId, OperationStatus,
    PaymentCode, Price, Quantity, ShareId, Timestamp,
};
use crate::infrastructure::persistence::traits::{
    LedgerStore, LedgerTransaction, RepositoryError, RepositoryResult,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use std::fmt::Display;
use std::str::FromStr;
use tracing::debug;

const ACCOUNT_COLUMNS: &str = "id, email, name, role, card_number, activated";
const SHARE_COLUMNS: &str = "id, issuer_id, ticker, name, price";
const ASK_COLUMNS: &str =
    "id, owner_id, share_id, amount, use_market_price, fixed_price, removed, created_at";
const BID_COLUMNS: &str =
    "id, creator_id, share_id, amount, price, payment_code, expires_at, removed, created_at";
const OPERATION_COLUMNS: &str = "id, seller_id, buyer_id, share_id, ask_id, bid_id, price, amount, status, created_at, updated_at";

/// PostgreSQL implementation of [`LedgerStore`].
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    /// Creates a store over `pool`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self, isolation: IsolationLevel) -> RepositoryResult<Box<dyn LedgerTransaction>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let statement = format!("SET TRANSACTION ISOLATION LEVEL {}", isolation.as_sql());
        sqlx::query(&statement)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        debug!(%isolation, "transaction started");
        Ok(Box::new(PgLedgerTransaction { tx }))
    }
}

/// One open PostgreSQL transaction.
struct PgLedgerTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PgLedgerTransaction {
    async fn fetch_account(&mut self, id: AccountId, lock: bool) -> RepositoryResult<Option<Account>> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1{}",
            lock_clause(lock)
        );
        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        row.map(AccountRow::try_into_account).transpose()
    }

    async fn fetch_share(&mut self, id: ShareId, lock: bool) -> RepositoryResult<Option<Share>> {
        let sql = format!(
            "SELECT {SHARE_COLUMNS} FROM shares WHERE id = $1{}",
            lock_clause(lock)
        );
        let row: Option<ShareRow> = sqlx::query_as(&sql)
            .bind(id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        row.map(ShareRow::try_into_share).transpose()
    }

    async fn fetch_ask(&mut self, id: AskId, lock: bool) -> RepositoryResult<Option<Ask>> {
        let sql = format!(
            "SELECT {ASK_COLUMNS} FROM asks WHERE id = $1{}",
            lock_clause(lock)
        );
        let row: Option<AskRow> = sqlx::query_as(&sql)
            .bind(id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        row.map(AskRow::try_into_ask).transpose()
    }

    async fn sum(&mut self, sql: &str, share_id: ShareId, account_id: AccountId) -> RepositoryResult<Quantity> {
        let (total,): (i64,) = sqlx::query_as(sql)
            .bind(share_id.to_string())
            .bind(account_id.to_string())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        to_quantity(total)
    }
}

#[async_trait]
impl LedgerTransaction for PgLedgerTransaction {
    // ========== Accounts ==========

    async fn find_account(&mut self, id: AccountId) -> RepositoryResult<Option<Account>> {
        self.fetch_account(id, false).await
    }

    async fn lock_account(&mut self, id: AccountId) -> RepositoryResult<Option<Account>> {
        self.fetch_account(id, true).await
    }

    async fn find_account_by_email(&mut self, email: &str) -> RepositoryResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1");
        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        row.map(AccountRow::try_into_account).transpose()
    }

    async fn find_account_by_card(
        &mut self,
        card_number: &CardNumber,
    ) -> RepositoryResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE card_number = $1");
        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(card_number.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        row.map(AccountRow::try_into_account).transpose()
    }

    async fn insert_account(&mut self, account: &Account) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, email, name, role, card_number, activated)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(account.id().to_string())
        .bind(account.email())
        .bind(account.name())
        .bind(account.role().as_str())
        .bind(account.card_number().map(CardNumber::as_str))
        .bind(account.is_activated())
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn update_account(&mut self, account: &Account) -> RepositoryResult<()> {
        let result = sqlx::query("UPDATE accounts SET card_number = $2, activated = $3 WHERE id = $1")
            .bind(account.id().to_string())
            .bind(account.card_number().map(CardNumber::as_str))
            .bind(account.is_activated())
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        require_row(result.rows_affected(), "account", account.id())
    }

    // ========== Shares ==========

    async fn find_share(&mut self, id: ShareId) -> RepositoryResult<Option<Share>> {
        self.fetch_share(id, false).await
    }

    async fn lock_share(&mut self, id: ShareId) -> RepositoryResult<Option<Share>> {
        self.fetch_share(id, true).await
    }

    async fn find_share_by_ticker(&mut self, ticker: &str) -> RepositoryResult<Option<Share>> {
        let sql = format!("SELECT {SHARE_COLUMNS} FROM shares WHERE ticker = $1");
        let row: Option<ShareRow> = sqlx::query_as(&sql)
            .bind(ticker)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        row.map(ShareRow::try_into_share).transpose()
    }

    async fn insert_share(&mut self, share: &Share) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO shares (id, issuer_id, ticker, name, price)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(share.id().to_string())
        .bind(share.issuer_id().to_string())
        .bind(share.ticker())
        .bind(share.name())
        .bind(share.price().get())
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn update_share(&mut self, share: &Share) -> RepositoryResult<()> {
        let result = sqlx::query("UPDATE shares SET price = $2 WHERE id = $1")
            .bind(share.id().to_string())
            .bind(share.price().get())
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        require_row(result.rows_affected(), "share", share.id())
    }

    // ========== Ownership ==========

    async fn lock_ownership(
        &mut self,
        account_id: AccountId,
        share_id: ShareId,
    ) -> RepositoryResult<Option<Ownership>> {
        // No-op update: a row lock that also conflicts under repeatable read
        let row: Option<OwnershipRow> = sqlx::query_as(
            r#"
            UPDATE ownerships SET amount = amount
            WHERE account_id = $1 AND share_id = $2
            RETURNING account_id, share_id, amount
            "#,
        )
        .bind(account_id.to_string())
        .bind(share_id.to_string())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        row.map(OwnershipRow::try_into_ownership).transpose()
    }

    async fn update_ownership(&mut self, ownership: &Ownership) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE ownerships SET amount = $3 WHERE account_id = $1 AND share_id = $2",
        )
        .bind(ownership.account_id().to_string())
        .bind(ownership.share_id().to_string())
        .bind(to_i64(ownership.amount())?)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        require_row(
            result.rows_affected(),
            "ownership",
            format!("{}/{}", ownership.account_id(), ownership.share_id()),
        )
    }

    async fn credit_ownership(
        &mut self,
        account_id: AccountId,
        share_id: ShareId,
        amount: Quantity,
    ) -> RepositoryResult<Ownership> {
        let row: OwnershipRow = sqlx::query_as(
            r#"
            INSERT INTO ownerships (account_id, share_id, amount)
            VALUES ($1, $2, $3)
            ON CONFLICT (account_id, share_id)
            DO UPDATE SET amount = ownerships.amount + EXCLUDED.amount
            RETURNING account_id, share_id, amount
            "#,
        )
        .bind(account_id.to_string())
        .bind(share_id.to_string())
        .bind(to_i64(amount)?)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        row.try_into_ownership()
    }

    async fn sum_listed_amount(
        &mut self,
        share_id: ShareId,
        owner_id: AccountId,
    ) -> RepositoryResult<Quantity> {
        self.sum(
            r#"
            SELECT COALESCE(SUM(amount), 0)::BIGINT FROM asks
            WHERE share_id = $1 AND owner_id = $2 AND NOT removed
            "#,
            share_id,
            owner_id,
        )
        .await
    }

    // ========== Asks ==========

    async fn find_ask(&mut self, id: AskId) -> RepositoryResult<Option<Ask>> {
        self.fetch_ask(id, false).await
    }

    async fn lock_ask(&mut self, id: AskId) -> RepositoryResult<Option<Ask>> {
        self.fetch_ask(id, true).await
    }

    async fn insert_ask(&mut self, ask: &Ask) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO asks (id, owner_id, share_id, amount, use_market_price, fixed_price, removed, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(ask.id().to_string())
        .bind(ask.owner_id().to_string())
        .bind(ask.share_id().to_string())
        .bind(to_i64(ask.amount())?)
        .bind(ask.uses_market_price())
        .bind(ask.fixed_price().map(Price::get))
        .bind(ask.is_removed())
        .bind(ask.created_at().timestamp_millis())
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn update_ask(&mut self, ask: &Ask) -> RepositoryResult<()> {
        let result = sqlx::query("UPDATE asks SET amount = $2, removed = $3 WHERE id = $1")
            .bind(ask.id().to_string())
            .bind(to_i64(ask.amount())?)
            .bind(ask.is_removed())
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        require_row(result.rows_affected(), "ask", ask.id())
    }

    // ========== Bids ==========

    async fn lock_bid(&mut self, id: BidId) -> RepositoryResult<Option<Bid>> {
        let sql = format!("SELECT {BID_COLUMNS} FROM bids WHERE id = $1 FOR NO KEY UPDATE");
        let row: Option<BidRow> = sqlx::query_as(&sql)
            .bind(id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        row.map(BidRow::try_into_bid).transpose()
    }

    async fn insert_bid(&mut self, bid: &Bid) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bids (id, creator_id, share_id, amount, price, payment_code, expires_at, removed, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(bid.id().to_string())
        .bind(bid.creator_id().to_string())
        .bind(bid.share_id().to_string())
        .bind(to_i64(bid.amount())?)
        .bind(bid.price().get())
        .bind(bid.payment_code().as_str())
        .bind(bid.expires_at().timestamp_millis())
        .bind(bid.is_removed())
        .bind(bid.created_at().timestamp_millis())
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn update_bid(&mut self, bid: &Bid) -> RepositoryResult<()> {
        let result = sqlx::query("UPDATE bids SET amount = $2, removed = $3 WHERE id = $1")
            .bind(bid.id().to_string())
            .bind(to_i64(bid.amount())?)
            .bind(bid.is_removed())
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        require_row(result.rows_affected(), "bid", bid.id())
    }

    async fn count_active_bids(
        &mut self,
        creator_id: AccountId,
        now: Timestamp,
    ) -> RepositoryResult<u64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM bids WHERE creator_id = $1 AND NOT removed AND expires_at > $2",
        )
        .bind(creator_id.to_string())
        .bind(now.timestamp_millis())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        u64::try_from(count).map_err(|e| RepositoryError::serialization(e.to_string()))
    }

    // ========== Operations ==========

    async fn find_operation(
        &mut self,
        id: OperationId,
        for_update: bool,
    ) -> RepositoryResult<Option<Operation>> {
        let sql = format!(
            "SELECT {OPERATION_COLUMNS} FROM operations WHERE id = $1{}",
            lock_clause(for_update)
        );
        let row: Option<OperationRow> = sqlx::query_as(&sql)
            .bind(id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        row.map(OperationRow::try_into_operation).transpose()
    }

    async fn insert_operation(&mut self, operation: &Operation) -> RepositoryResult<()> {
        let origin = operation.origin();
        sqlx::query(
            r#"
            INSERT INTO operations (
                id, seller_id, buyer_id, share_id, ask_id, bid_id,
                price, amount, status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(operation.id().to_string())
        .bind(operation.seller_id().to_string())
        .bind(operation.buyer_id().to_string())
        .bind(operation.share_id().to_string())
        .bind(origin.ask_id().map(|id| id.to_string()))
        .bind(origin.bid_id().map(|id| id.to_string()))
        .bind(operation.price().get())
        .bind(to_i64(operation.amount())?)
        .bind(operation.status().as_str())
        .bind(operation.created_at().timestamp_millis())
        .bind(operation.updated_at().timestamp_millis())
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn update_operation_status(
        &mut self,
        id: OperationId,
        status: OperationStatus,
    ) -> RepositoryResult<()> {
        let result = sqlx::query("UPDATE operations SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id.to_string())
            .bind(status.as_str())
            .bind(Timestamp::now().timestamp_millis())
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        require_row(result.rows_affected(), "operation", id)
    }

    async fn sum_pending_amount(
        &mut self,
        share_id: ShareId,
        seller_id: AccountId,
    ) -> RepositoryResult<Quantity> {
        self.sum(
            r#"
            SELECT COALESCE(SUM(amount), 0)::BIGINT FROM operations
            WHERE share_id = $1 AND seller_id = $2 AND status = 'PendingPayment'
            "#,
            share_id,
            seller_id,
        )
        .await
    }

    async fn find_pending_created_before(
        &mut self,
        cutoff: Timestamp,
    ) -> RepositoryResult<Vec<Operation>> {
        let sql = format!(
            "SELECT {OPERATION_COLUMNS} FROM operations \
             WHERE status = $1 AND created_at < $2 ORDER BY created_at"
        );
        let rows: Vec<OperationRow> = sqlx::query_as(&sql)
            .bind(OperationStatus::PendingPayment.as_str())
            .bind(cutoff.timestamp_millis())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        rows.into_iter().map(OperationRow::try_into_operation).collect()
    }

    // ========== Completion ==========

    async fn commit(self: Box<Self>) -> RepositoryResult<()> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }

    async fn rollback(self: Box<Self>) -> RepositoryResult<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)
    }
}

// ============================================================================
// Error and value mapping
// ============================================================================

/// Maps a sqlx error onto the store taxonomy.
///
/// Unique violations become `Conflict`; serialization failures and
/// deadlocks become `ConcurrentUpdate`.
fn map_sqlx_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            Some("23505") => return RepositoryError::conflict(db.message()),
            Some("40001" | "40P01") => return RepositoryError::concurrent_update(db.message()),
            _ => {}
        }
    }
    match &err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            RepositoryError::connection(err.to_string())
        }
        _ => RepositoryError::query(err.to_string()),
    }
}

const fn lock_clause(lock: bool) -> &'static str {
    if lock { " FOR NO KEY UPDATE" } else { "" }
}

fn require_row(rows: u64, entity: &'static str, id: impl ToString) -> RepositoryResult<()> {
    if rows == 0 {
        return Err(RepositoryError::not_found(entity, id));
    }
    Ok(())
}

fn serialization(err: impl Display) -> RepositoryError {
    RepositoryError::serialization(err.to_string())
}

fn parse<T>(value: &str) -> RepositoryResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    value.parse().map_err(serialization)
}

fn to_i64(amount: Quantity) -> RepositoryResult<i64> {
    i64::try_from(amount).map_err(serialization)
}

fn to_quantity(value: i64) -> RepositoryResult<Quantity> {
    Quantity::try_from(value).map_err(serialization)
}

fn to_price(value: Decimal) -> RepositoryResult<Price> {
    Price::new(value).map_err(serialization)
}

fn to_timestamp(millis: i64, column: &str) -> RepositoryResult<Timestamp> {
    Timestamp::from_millis(millis).ok_or_else(|| serialization(format!("invalid {column}")))
}

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: String,
    email: String,
    name: String,
    role: String,
    card_number: Option<String>,
    activated: bool,
}

impl AccountRow {
    fn try_into_account(self) -> RepositoryResult<Account> {
        let card_number = self
            .card_number
            .map(CardNumber::new)
            .transpose()
            .map_err(serialization)?;
        Ok(Account::from_parts(
            parse(&self.id)?,
            self.email,
            self.name,
            parse(&self.role)?,
            card_number,
            self.activated,
        ))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ShareRow {
    id: String,
    issuer_id: String,
    ticker: String,
    name: String,
    price: Decimal,
}

impl ShareRow {
    fn try_into_share(self) -> RepositoryResult<Share> {
        Ok(Share::from_parts(
            parse(&self.id)?,
            parse(&self.issuer_id)?,
            self.ticker,
            self.name,
            to_price(self.price)?,
        ))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OwnershipRow {
    account_id: String,
    share_id: String,
    amount: i64,
}

impl OwnershipRow {
    fn try_into_ownership(self) -> RepositoryResult<Ownership> {
        Ok(Ownership::new(
            parse(&self.account_id)?,
            parse(&self.share_id)?,
            to_quantity(self.amount)?,
        ))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AskRow {
    id: String,
    owner_id: String,
    share_id: String,
    amount: i64,
    use_market_price: bool,
    fixed_price: Option<Decimal>,
    removed: bool,
    created_at: i64,
}

impl AskRow {
    fn try_into_ask(self) -> RepositoryResult<Ask> {
        Ok(Ask::from_parts(
            parse(&self.id)?,
            parse(&self.owner_id)?,
            parse(&self.share_id)?,
            to_quantity(self.amount)?,
            self.use_market_price,
            self.fixed_price.map(to_price).transpose()?,
            self.removed,
            to_timestamp(self.created_at, "ask created_at")?,
        ))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BidRow {
    id: String,
    creator_id: String,
    share_id: String,
    amount: i64,
    price: Decimal,
    payment_code: String,
    expires_at: i64,
    removed: bool,
    created_at: i64,
}

impl BidRow {
    fn try_into_bid(self) -> RepositoryResult<Bid> {
        Ok(Bid::from_parts(
            parse(&self.id)?,
            parse(&self.creator_id)?,
            parse(&self.share_id)?,
            to_quantity(self.amount)?,
            to_price(self.price)?,
            PaymentCode::new(self.payment_code).map_err(serialization)?,
            to_timestamp(self.expires_at, "bid expires_at")?,
            self.removed,
            to_timestamp(self.created_at, "bid created_at")?,
        ))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OperationRow {
    id: String,
    seller_id: String,
    buyer_id: String,
    share_id: String,
    ask_id: Option<String>,
    bid_id: Option<String>,
    price: Decimal,
    amount: i64,
    status: String,
    created_at: i64,
    updated_at: i64,
}

impl OperationRow {
    fn try_into_operation(self) -> RepositoryResult<Operation> {
        let origin = match (self.ask_id.as_deref(), self.bid_id.as_deref()) {
            (Some(ask), None) => OperationOrigin::Ask(parse::<AskId>(ask)?),
            (None, Some(bid)) => OperationOrigin::Bid(parse::<BidId>(bid)?),
            _ => {
                return Err(serialization(format!(
                    "operation {} must reference exactly one of ask or bid",
                    self.id
                )));
            }
        };
        Ok(Operation::from_parts(
            parse(&self.id)?,
            parse(&self.seller_id)?,
            parse(&self.buyer_id)?,
            parse(&self.share_id)?,
            origin,
            to_price(self.price)?,
            to_quantity(self.amount)?,
            parse(&self.status)?,
            to_timestamp(self.created_at, "operation created_at")?,
            to_timestamp(self.updated_at, "operation updated_at")?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_clause_only_when_requested() {
        assert_eq!(lock_clause(true), " FOR NO KEY UPDATE");
        assert_eq!(lock_clause(false), "");
    }

    #[test]
    fn pool_errors_are_connection_errors() {
        let err = map_sqlx_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, RepositoryError::Connection(_)));
    }

    #[test]
    fn row_errors_are_query_errors() {
        let err = map_sqlx_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, RepositoryError::Query(_)));
    }

    #[test]
    fn operation_row_needs_exactly_one_origin() {
        let row = OperationRow {
            id: OperationId::new_v4().to_string(),
            seller_id: AccountId::new_v4().to_string(),
            buyer_id: AccountId::new_v4().to_string(),
            share_id: ShareId::new_v4().to_string(),
            ask_id: None,
            bid_id: None,
            price: Decimal::from(10),
            amount: 3,
            status: "PendingPayment".to_string(),
            created_at: 0,
            updated_at: 0,
        };
        assert!(matches!(
            row.try_into_operation(),
            Err(RepositoryError::Serialization(_))
        ));
    }

    #[test]
    fn negative_amount_is_rejected() {
        let row = OwnershipRow {
            account_id: AccountId::new_v4().to_string(),
            share_id: ShareId::new_v4().to_string(),
            amount: -1,
        };
        assert!(row.try_into_ownership().is_err());
    }
}
