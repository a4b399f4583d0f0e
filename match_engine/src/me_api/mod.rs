//! # Matching engine public API
//!
//! The `me_api` module exposes the programmatic API of the matching engine. Each API is created by supplying a
//! database backend that implements the backend traits it needs, plus the [`crate::events::EventProducers`] that
//! should be notified of what happens.
//!
//! * [`ledger_api`] records likes and passes, and detects mutual likes.
//! * [`match_api`] creates matches with their conversations, and applies unmatch / block / report transitions.
//! * [`batch_api`] generates the once-a-day candidate batch for each user.
//! * [`queue_api`] hands out undecided candidates and takes decisions on them.
//!
//! ```rust,ignore
//! use match_engine::{EngineConfig, QueueApi, SqliteDatabase};
//! let config = EngineConfig::from_env_or_default();
//! let db = SqliteDatabase::new_with_config(&config).await?;
//! let api = QueueApi::new(db, producers).with_pull_size(config.queue_pull_size);
//! let next = api.get_next(&user, None).await?;
//! ```

pub mod batch_api;
pub mod errors;
pub mod ledger_api;
pub mod match_api;
pub mod queue_api;
pub mod queue_objects;
