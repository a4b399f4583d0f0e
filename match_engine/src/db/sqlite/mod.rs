pub mod db;
mod errors;

pub mod ledger;
pub mod matches;
pub mod profiles;
pub mod queue;

use std::{str::FromStr, time::Duration};

pub use db::SqliteDatabase;
pub use errors::SqliteDatabaseError;
use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};

pub async fn new_pool(url: &str, max_connections: u32, busy_timeout: Duration) -> Result<SqlitePool, SqliteDatabaseError> {
    info!("🗃️ Opening database at {url} with up to {max_connections} connections");
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(busy_timeout);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

/// Runs the embedded migrations against the given pool.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteDatabaseError> {
    sqlx::migrate!("./src/db/sqlite/migrations").run(pool).await?;
    info!("🗃️ Migrations complete");
    Ok(())
}
