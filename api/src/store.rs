//! Persistence for channel registrations.
//!
//! Both unique channel ids are enforced by the storage layer itself. The
//! admission pipeline's duplicate lookup is an early exit; the constraint
//! checked inside `insert` is the final word.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use shared::models::{ChannelRegistration, NewChannelRegistration};
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error};

pub const OPEN_CHANNEL_UNIQUE: &str = "idx_channel_registrations_open_channel_id";
pub const CLOSED_CHANNEL_UNIQUE: &str = "idx_channel_registrations_closed_channel_id";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }
}

#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Any registration whose open id equals `open_channel_id` or whose
    /// closed id equals `closed_channel_id`.
    async fn find_by_either_channel(
        &self,
        open_channel_id: &str,
        closed_channel_id: &str,
    ) -> Result<Option<ChannelRegistration>, StoreError>;

    /// Persist all-or-nothing and return the stored row.
    async fn insert(&self, new: &NewChannelRegistration) -> Result<ChannelRegistration, StoreError>;

    /// Cheap liveness check
    async fn ping(&self) -> Result<(), StoreError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Postgres
// ─────────────────────────────────────────────────────────────────────────────

pub struct PgRegistrationStore {
    pool: PgPool,
}

impl PgRegistrationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map a sqlx error, lifting unique violations into their own variant.
fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::UniqueViolation {
                constraint: db_err.constraint().unwrap_or("unknown").to_string(),
            };
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl RegistrationStore for PgRegistrationStore {
    async fn find_by_either_channel(
        &self,
        open_channel_id: &str,
        closed_channel_id: &str,
    ) -> Result<Option<ChannelRegistration>, StoreError> {
        sqlx::query_as::<_, ChannelRegistration>(
            r#"
            SELECT * FROM channel_registrations
            WHERE open_channel_id = $1 OR closed_channel_id = $2
            LIMIT 1
            "#,
        )
        .bind(open_channel_id)
        .bind(closed_channel_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to look up existing registration: {}", e);
            StoreError::Database(e)
        })
    }

    async fn insert(&self, new: &NewChannelRegistration) -> Result<ChannelRegistration, StoreError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, ChannelRegistration>(
            r#"
            INSERT INTO channel_registrations (
                open_channel_id, open_channel_title, open_channel_description,
                closed_channel_id, closed_channel_title, closed_channel_description,
                sub_1_price, sub_1_time, sub_2_price, sub_2_time, sub_3_price, sub_3_time,
                client_wallet_address, client_payout_currency, client_payout_network
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(&new.open_channel_id)
        .bind(&new.open_channel_title)
        .bind(&new.open_channel_description)
        .bind(&new.closed_channel_id)
        .bind(&new.closed_channel_title)
        .bind(&new.closed_channel_description)
        .bind(new.sub_1_price)
        .bind(new.sub_1_time)
        .bind(new.sub_2_price)
        .bind(new.sub_2_time)
        .bind(new.sub_3_price)
        .bind(new.sub_3_time)
        .bind(&new.client_wallet_address)
        .bind(&new.client_payout_currency)
        .bind(&new.client_payout_network)
        .fetch_one(&mut *tx)
        .await;

        let row = match inserted {
            Ok(row) => row,
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!("Rollback after failed insert also failed: {}", rollback_err);
                }
                return Err(classify(e));
            }
        };

        tx.commit().await.map_err(classify)?;
        debug!(id = row.id, "Inserted channel registration");
        Ok(row)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory
// ─────────────────────────────────────────────────────────────────────────────

/// Process-local store with the same uniqueness rules as the schema.
///
/// Check and insert happen under one write lock, so concurrent inserts of
/// the same channel id cannot both succeed.
#[derive(Default)]
pub struct InMemoryRegistrationStore {
    rows: RwLock<BTreeMap<i64, ChannelRegistration>>,
}

impl InMemoryRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    pub async fn all(&self) -> Vec<ChannelRegistration> {
        self.rows.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl RegistrationStore for InMemoryRegistrationStore {
    async fn find_by_either_channel(
        &self,
        open_channel_id: &str,
        closed_channel_id: &str,
    ) -> Result<Option<ChannelRegistration>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .find(|row| {
                row.open_channel_id == open_channel_id || row.closed_channel_id == closed_channel_id
            })
            .cloned())
    }

    async fn insert(&self, new: &NewChannelRegistration) -> Result<ChannelRegistration, StoreError> {
        let mut rows = self.rows.write().await;

        for row in rows.values() {
            if row.open_channel_id == new.open_channel_id {
                return Err(StoreError::UniqueViolation {
                    constraint: OPEN_CHANNEL_UNIQUE.to_string(),
                });
            }
            if row.closed_channel_id == new.closed_channel_id {
                return Err(StoreError::UniqueViolation {
                    constraint: CLOSED_CHANNEL_UNIQUE.to_string(),
                });
            }
        }

        let id = rows.keys().next_back().map_or(1, |last| last + 1);
        let row = ChannelRegistration::from_new(id, new.clone(), Utc::now());
        rows.insert(id, row.clone());
        Ok(row)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
