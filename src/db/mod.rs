// ============================================================================
// Persistence Gateway
// ============================================================================
//
// `OrderRepository` is the seam between ingestion / lookups and the relational
// store. The production implementation is `PgOrderRepository` (sqlx +
// PostgreSQL); tests use an in-memory double with the same transactional
// all-or-nothing behaviour.
//
// ============================================================================

mod postgres;
#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;

use crate::domain::order::Order;
use crate::utils::IsTransient;

pub use postgres::PgOrderRepository;

/// What happened to an order handed to `persist_order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// All rows were written and committed.
    Inserted,
    /// An order with the same `order_uid` already exists; nothing was written.
    Duplicate,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl IsTransient for StoreError {
    fn is_transient(&self) -> bool {
        match self {
            StoreError::Database(sqlx::Error::Database(db)) => {
                // SQLSTATE class 22 (data exception) and 23 (integrity
                // constraint violation) fail the same way on every attempt.
                db.code()
                    .map_or(true, |code| !(code.starts_with("22") || code.starts_with("23")))
            }
            StoreError::Database(
                sqlx::Error::RowNotFound
                | sqlx::Error::ColumnNotFound(_)
                | sqlx::Error::ColumnIndexOutOfBounds { .. }
                | sqlx::Error::ColumnDecode { .. }
                | sqlx::Error::Decode(_)
                | sqlx::Error::Encode(_)
                | sqlx::Error::TypeNotFound { .. },
            ) => false,
            StoreError::Database(_) => true,
            StoreError::Migration(_) => false,
        }
    }
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Write the header, delivery, payment and every item in one transaction.
    async fn persist_order(&self, order: &Order) -> Result<PersistOutcome, StoreError>;

    /// Load a full order aggregate, or `None` when no header row exists.
    async fn find_order(&self, order_uid: &str) -> Result<Option<Order>, StoreError>;

    /// The most recently stored orders, newest first.
    async fn recent_orders(&self, limit: i64) -> Result<Vec<Order>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
