//! Connect matching engine
//!
//! The matching engine is the part of the Connect dating service that decides who sees whom, and turns mutual interest
//! into a match. It guarantees that a match between two users is created exactly once, even when both of them act at
//! the same moment from different processes.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@db`]). The SQLite backend is the only one at present. You should never
//!    need to access the database directly. Instead, use the public API. The exception is the data types used in the
//!    database, which are defined in the public `db_types` module.
//! 2. The matching engine public API ([`mod@me_api`]):
//!    * the action ledger records likes and passes, and detects mutual likes,
//!    * the match API creates a match together with its conversation,
//!    * the batch API generates each user's daily candidate batch,
//!    * the queue API hands out candidates and takes the user's decisions on them.
//!
//! The engine also publishes events (a new match, a closed match, a fresh daily batch) that collaborators such as the
//! notification service can subscribe to through [`events::EventHooks`].
mod db;

pub mod config;
pub mod db_types;
pub mod events;
pub mod helpers;
mod me_api;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use config::{ConfigError, EngineConfig, TransactionPolicy};
#[cfg(feature = "sqlite")]
pub use db::sqlite::{new_pool, run_migrations, SqliteDatabase, SqliteDatabaseError};
pub use db::traits::{
    InsertEntryResult,
    InsertMatchResult,
    LedgerManagement,
    MarkViewedOutcome,
    MatchManagement,
    ProfileStore,
    QueueManagement,
    RecordLikeResult,
    RecordPassResult,
    SafetyManagement,
    StatusUpdateResult,
    StoreError,
};
pub use me_api::{
    batch_api::BatchApi,
    errors::{MatchEngineError, StoreResultExt},
    ledger_api::LedgerApi,
    match_api::MatchApi,
    queue_api::QueueApi,
    queue_objects,
};
