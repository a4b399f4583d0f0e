//! #  Database management and control.
//!
//! This module provides the interfaces that define the contracts of the matching engine database *backends*. The
//! public API in [`crate::me_api`] depends only on these traits, never on a specific store.
//!
//! ## Atomicity
//! Every mutating method must execute as a single atomic transaction: either all of its writes commit, or none of them
//! become visible to other readers. Backends retry transient failures (write conflicts, busy stores, timeouts) up to a
//! bounded number of attempts before giving up. A backend error reports whether it was transient via
//! [`StoreError::is_transient`], so that callers can surface a "try again" to their own clients.
//!
//! ## Traits
//! * [`LedgerManagement`] owns the per-user action ledger and performs atomic like/pass recording with mutual-match
//!   detection.
//! * [`MatchManagement`] materializes matches together with their conversations and performs status transitions.
//! * [`QueueManagement`] owns the per-user delivery queue of daily candidate batches.
//! * [`ProfileStore`] and [`SafetyManagement`] are the read-only views of the external profile and safety services
//!   consulted by the batch generator.
mod data_objects;
mod ledger_management;
mod match_management;
mod profile_store;
mod queue_management;

pub use data_objects::{
    InsertEntryResult,
    InsertMatchResult,
    MarkViewedOutcome,
    RecordLikeResult,
    RecordPassResult,
    StatusUpdateResult,
};
pub use ledger_management::LedgerManagement;
pub use match_management::MatchManagement;
pub use profile_store::{ProfileStore, SafetyManagement};
pub use queue_management::QueueManagement;

/// Errors returned by database backends.
pub trait StoreError: std::error::Error {
    /// Whether the failure was transient (conflict, busy store, timeout) and the operation may succeed if retried.
    fn is_transient(&self) -> bool;
}
