use std::time::Duration;

use connect_common::PairKeyError;
use thiserror::Error;

use crate::db::traits::StoreError;

// SQLite primary result codes that indicate contention rather than a failed statement.
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Database query error: {0}")]
    QueryError(String),
    #[error("Transaction did not complete within {0:?}")]
    Timeout(Duration),
    #[error("Transaction failed after {attempts} attempts. Last error: {source}")]
    RetriesExhausted { attempts: u32, source: Box<SqliteDatabaseError> },
    #[error("Invalid user pair. {0}")]
    InvalidPair(#[from] PairKeyError),
    #[error("Could not decode profile for {0}: {1}")]
    ProfileDecodeError(String, String),
}

impl StoreError for SqliteDatabaseError {
    fn is_transient(&self) -> bool {
        match self {
            Self::DriverError(e) => is_transient_driver_error(e),
            Self::Timeout(_) | Self::RetriesExhausted { .. } => true,
            _ => false,
        }
    }
}

fn is_transient_driver_error(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db_err) => db_err
            .code()
            .and_then(|code| code.parse::<i64>().ok())
            // extended result codes carry the primary code in the low byte
            .map(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
            .unwrap_or(false),
        _ => false,
    }
}
