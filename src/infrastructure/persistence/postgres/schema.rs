//! Ledger schema.
//!
//! Identifiers are stored as hyphenated UUID strings, share counts as
//! `BIGINT`, prices as `NUMERIC` and instants as epoch milliseconds.

use crate::infrastructure::persistence::traits::{RepositoryError, RepositoryResult};
use sqlx::PgPool;
use tracing::info;

/// DDL for every ledger table. Idempotent.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id VARCHAR(36) PRIMARY KEY,
    email VARCHAR(320) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    role VARCHAR(16) NOT NULL,
    card_number VARCHAR(19) UNIQUE,
    activated BOOLEAN NOT NULL DEFAULT FALSE
);

CREATE TABLE IF NOT EXISTS shares (
    id VARCHAR(36) PRIMARY KEY,
    issuer_id VARCHAR(36) NOT NULL REFERENCES accounts (id),
    ticker VARCHAR(12) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    price NUMERIC NOT NULL CHECK (price > 0)
);

CREATE TABLE IF NOT EXISTS ownerships (
    account_id VARCHAR(36) NOT NULL REFERENCES accounts (id),
    share_id VARCHAR(36) NOT NULL REFERENCES shares (id),
    amount BIGINT NOT NULL CHECK (amount >= 0),
    PRIMARY KEY (account_id, share_id)
);

CREATE TABLE IF NOT EXISTS asks (
    id VARCHAR(36) PRIMARY KEY,
    owner_id VARCHAR(36) NOT NULL REFERENCES accounts (id),
    share_id VARCHAR(36) NOT NULL REFERENCES shares (id),
    amount BIGINT NOT NULL CHECK (amount >= 0),
    use_market_price BOOLEAN NOT NULL,
    fixed_price NUMERIC CHECK (fixed_price > 0),
    removed BOOLEAN NOT NULL DEFAULT FALSE,
    created_at BIGINT NOT NULL
);
CREATE INDEX IF NOT EXISTS asks_owner_share ON asks (owner_id, share_id) WHERE NOT removed;

CREATE TABLE IF NOT EXISTS bids (
    id VARCHAR(36) PRIMARY KEY,
    creator_id VARCHAR(36) NOT NULL REFERENCES accounts (id),
    share_id VARCHAR(36) NOT NULL REFERENCES shares (id),
    amount BIGINT NOT NULL CHECK (amount >= 0),
    price NUMERIC NOT NULL CHECK (price > 0),
    payment_code VARCHAR(255) NOT NULL,
    expires_at BIGINT NOT NULL,
    removed BOOLEAN NOT NULL DEFAULT FALSE,
    created_at BIGINT NOT NULL
);
CREATE INDEX IF NOT EXISTS bids_creator ON bids (creator_id) WHERE NOT removed;

CREATE TABLE IF NOT EXISTS operations (
    id VARCHAR(36) PRIMARY KEY,
    seller_id VARCHAR(36) NOT NULL REFERENCES accounts (id),
    buyer_id VARCHAR(36) NOT NULL REFERENCES accounts (id),
    share_id VARCHAR(36) NOT NULL REFERENCES shares (id),
    ask_id VARCHAR(36) REFERENCES asks (id),
    bid_id VARCHAR(36) REFERENCES bids (id),
    price NUMERIC NOT NULL CHECK (price > 0),
    amount BIGINT NOT NULL CHECK (amount > 0),
    status VARCHAR(16) NOT NULL,
    created_at BIGINT NOT NULL,
    updated_at BIGINT NOT NULL,
    CHECK ((ask_id IS NULL) <> (bid_id IS NULL))
);
CREATE INDEX IF NOT EXISTS operations_pending
    ON operations (share_id, seller_id) WHERE status = 'PendingPayment';
CREATE INDEX IF NOT EXISTS operations_pending_age
    ON operations (created_at) WHERE status = 'PendingPayment';
"#;

/// Creates the ledger tables if they do not exist.
///
/// # Errors
///
/// Returns `RepositoryError::Query` if any statement fails.
pub async fn ensure_schema(pool: &PgPool) -> RepositoryResult<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| RepositoryError::query(e.to_string()))?;
    info!("ledger schema ready");
    Ok(())
}
