use chrono::NaiveDate;

use crate::{
    db::traits::{InsertEntryResult, MarkViewedOutcome, StoreError},
    db_types::{ConnectId, DeliveryQueue, NewCandidate, PeerDecision, QueuedCandidate},
};

/// The `QueueManagement` trait defines the behaviour of the per-user delivery queue.
///
/// A queue holds one daily entry per calendar day. Candidates inside an entry only ever move from unviewed to viewed.
#[allow(async_fn_in_trait)]
pub trait QueueManagement: Clone {
    type Error: StoreError;

    /// Appends a daily entry for `date`, creating the queue if necessary. At most one entry per user per day is ever
    /// created; if one exists, nothing is written. An empty candidate list creates a valid, empty entry.
    async fn append_daily_entry(
        &self,
        user: &ConnectId,
        date: NaiveDate,
        candidates: &[NewCandidate],
    ) -> Result<InsertEntryResult, Self::Error>;

    async fn daily_entry_exists(&self, user: &ConnectId, date: NaiveDate) -> Result<bool, Self::Error>;

    /// Fetches the whole queue document for `user`, with entries in ascending date order.
    async fn fetch_queue(&self, user: &ConnectId) -> Result<Option<DeliveryQueue>, Self::Error>;

    /// Fetches every unviewed candidate in the queue, ordered by entry date and then by position within the entry.
    async fn fetch_unviewed_candidates(&self, user: &ConnectId) -> Result<Vec<QueuedCandidate>, Self::Error>;

    /// Marks the candidates named in `decisions` as viewed, in one transaction over the queue, and records the
    /// decision on each candidate. Outcomes are returned in the order of `decisions`.
    ///
    /// Returns `None` if the user has no queue.
    async fn mark_viewed(
        &self,
        user: &ConnectId,
        decisions: &[PeerDecision],
    ) -> Result<Option<Vec<MarkViewedOutcome>>, Self::Error>;
}
