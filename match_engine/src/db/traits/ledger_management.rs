use std::collections::HashSet;

use crate::{
    db::traits::{RecordLikeResult, RecordPassResult, StoreError},
    db_types::{ActionLedgerRecord, ConnectId, LedgerRelation},
};

/// The `LedgerManagement` trait defines the behaviour of the per-user action ledger.
///
/// Ledger records are created lazily on the first action that touches a user, are only mutated through
/// [`Self::record_like`] and [`Self::record_pass`], and are never deleted.
#[allow(async_fn_in_trait)]
pub trait LedgerManagement: Clone {
    type Error: StoreError;

    /// Records that `user` likes `target`, in a single atomic transaction over both users' records:
    /// * load-or-initialize both ledger records,
    /// * add `target` to `user.likes` and `user` to `target.likedBy` (no-ops if already present),
    /// * if `target.likes` contains `user`, add each to the other's `matches`.
    ///
    /// If `user` previously passed on `target`, nothing is written and [`RecordLikeResult::PreviouslyPassed`] is
    /// returned.
    async fn record_like(&self, user: &ConnectId, target: &ConnectId) -> Result<RecordLikeResult, Self::Error>;

    /// Records that `user` passes on `target` in a single-record transaction. If `user` previously liked `target`,
    /// nothing is written and [`RecordPassResult::PreviouslyLiked`] is returned.
    async fn record_pass(&self, user: &ConnectId, target: &ConnectId) -> Result<RecordPassResult, Self::Error>;

    /// Fetches the full ledger record for `user`, or `None` if the user has never been touched by an action.
    async fn fetch_ledger(&self, user: &ConnectId) -> Result<Option<ActionLedgerRecord>, Self::Error>;

    /// Returns the peers in one of the ledger sets of `user`. Missing records yield an empty set.
    async fn fetch_peers(&self, user: &ConnectId, relation: LedgerRelation)
        -> Result<HashSet<ConnectId>, Self::Error>;

    /// Returns `likes ∪ passes` for `user`.
    async fn fetch_acted_on_peers(&self, user: &ConnectId) -> Result<HashSet<ConnectId>, Self::Error>;

    /// Whether `user` has liked or passed on `target`.
    async fn has_acted_on(&self, user: &ConnectId, target: &ConnectId) -> Result<bool, Self::Error>;
}
