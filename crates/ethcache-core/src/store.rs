//! SQLite-backed durable cache of resolved transactions, users, and
//! user↔transaction links.
//!
//! The store is the correctness backstop for concurrent resolutions: the
//! `UNIQUE` constraint on `transactions.hash` guarantees at-most-once
//! persistence, and link rows are written with `ON CONFLICT DO NOTHING`
//! so re-linking is idempotent at the SQL level rather than through a
//! racy check-then-insert.

use std::collections::HashSet;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::CoreError;
use crate::types::{TxRecord, TxStatus, User};

const INIT_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    hash TEXT NOT NULL UNIQUE,
    status INTEGER NOT NULL,
    block_hash TEXT,
    block_number INTEGER,
    sender TEXT NOT NULL,
    recipient TEXT,
    contract_address TEXT,
    logs_count INTEGER NOT NULL DEFAULT 0,
    input TEXT NOT NULL,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users_transactions (
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    transaction_id INTEGER NOT NULL REFERENCES transactions(id) ON DELETE CASCADE,
    UNIQUE(user_id, transaction_id)
);

CREATE INDEX IF NOT EXISTS idx_users_transactions_user ON users_transactions(user_id);
"#;

/// Column list shared by every query that materializes a `TxRecord`.
const RECORD_COLUMNS: &str =
    "hash, status, block_hash, block_number, sender, recipient, contract_address, \
     logs_count, input, value";

// ==============================================================================
// Cache Hits
// ==============================================================================

/// Result of a hash lookup. The surrogate ids are returned in the parallel
/// `ids` vector for the linkage step and are never embedded in `records`.
#[derive(Debug, Default)]
pub struct CacheHits {
    pub records: Vec<TxRecord>,
    pub hashes: HashSet<String>,
    pub ids: Vec<i64>,
}

// ==============================================================================
// Store
// ==============================================================================

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if missing) the database, enable WAL mode and foreign
    /// keys, and apply the schema idempotently.
    pub async fn connect(database_url: &str) -> Result<Self, CoreError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(CoreError::Store)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        sqlx::raw_sql(INIT_SCHEMA).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Fetch every cached record whose hash is in `hashes` (set semantics;
    /// duplicates in the input collapse into one lookup key).
    pub async fn find_by_hashes(&self, hashes: &[String]) -> Result<CacheHits, CoreError> {
        if hashes.is_empty() {
            return Ok(CacheHits::default());
        }

        let placeholders = vec!["?"; hashes.len()].join(", ");
        let sql =
            format!("SELECT id, {RECORD_COLUMNS} FROM transactions WHERE hash IN ({placeholders})");
        let mut query = sqlx::query(&sql);
        for hash in hashes {
            query = query.bind(hash);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut hits = CacheHits::default();
        for row in rows {
            hits.ids.push(row.try_get("id")?);
            let record = record_from_row(&row)?;
            hits.hashes.insert(record.hash.clone());
            hits.records.push(record);
        }
        debug!(requested = hashes.len(), found = hits.records.len(), "cache lookup");
        Ok(hits)
    }

    /// Bulk-insert newly resolved records inside one SQL transaction and
    /// return their surrogate ids in input order. Any failure, including a
    /// `UNIQUE(hash)` violation from a lost insert race, rolls the whole
    /// call back.
    pub async fn insert_transactions(&self, records: &[TxRecord]) -> Result<Vec<i64>, CoreError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let row = sqlx::query(
                "INSERT INTO transactions \
                 (hash, status, block_hash, block_number, sender, recipient, \
                  contract_address, logs_count, input, value) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
                 RETURNING id",
            )
            .bind(&record.hash)
            .bind(record.status.code())
            .bind(&record.block_hash)
            .bind(record.block_number)
            .bind(&record.sender)
            .bind(&record.recipient)
            .bind(&record.contract_address)
            .bind(record.logs_count)
            .bind(&record.input)
            .bind(&record.value)
            .fetch_one(&mut *tx)
            .await?;
            ids.push(row.try_get("id")?);
        }
        tx.commit().await?;

        debug!(inserted = ids.len(), "persisted new transactions");
        Ok(ids)
    }

    /// Associate a user with the given transactions. Already-existing pairs
    /// are silently skipped by the composite unique key.
    pub async fn link_user(&self, user_id: i64, transaction_ids: &[i64]) -> Result<(), CoreError> {
        if transaction_ids.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for transaction_id in transaction_ids {
            sqlx::query(
                "INSERT INTO users_transactions (user_id, transaction_id) VALUES (?, ?) \
                 ON CONFLICT(user_id, transaction_id) DO NOTHING",
            )
            .bind(user_id)
            .bind(transaction_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!(user_id, links = transaction_ids.len(), "linked user to transactions");
        Ok(())
    }

    /// All records the given user has resolved, via the link table.
    pub async fn find_by_user(&self, user_id: i64) -> Result<Vec<TxRecord>, CoreError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM transactions \
             JOIN users_transactions ON users_transactions.transaction_id = transactions.id \
             WHERE users_transactions.user_id = ?"
        );
        let rows = sqlx::query(&sql).bind(user_id).fetch_all(&self.pool).await?;
        rows.iter().map(record_from_row).collect()
    }

    /// Every cached record.
    pub async fn find_all(&self) -> Result<Vec<TxRecord>, CoreError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM transactions");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(record_from_row).collect()
    }

    /// Create a user if the username is not taken; an existing username is
    /// left untouched (seed path).
    pub async fn insert_user(&self, username: &str, password_hash: &str) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO users (username, password_hash) VALUES (?, ?) \
             ON CONFLICT(username) DO NOTHING",
        )
        .bind(username)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, CoreError> {
        let row = sqlx::query("SELECT id, username, password_hash FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, CoreError> {
        let row = sqlx::query("SELECT id, username, password_hash FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }
}

// ==============================================================================
// Row Mapping
// ==============================================================================

fn record_from_row(row: &SqliteRow) -> Result<TxRecord, CoreError> {
    let status = TxStatus::from_code(row.try_get("status")?)
        .map_err(|msg| sqlx::Error::Decode(msg.into()))?;

    Ok(TxRecord {
        hash: row.try_get("hash")?,
        status,
        block_hash: row.try_get("block_hash")?,
        block_number: row.try_get("block_number")?,
        sender: row.try_get("sender")?,
        recipient: row.try_get("recipient")?,
        contract_address: row.try_get("contract_address")?,
        logs_count: row.try_get("logs_count")?,
        input: row.try_get("input")?,
        value: row.try_get("value")?,
    })
}

fn user_from_row(row: &SqliteRow) -> Result<User, CoreError> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
    })
}

// ==============================================================================
// Tests
// ==============================================================================
