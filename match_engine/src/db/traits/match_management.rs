use crate::{
    db::traits::{InsertMatchResult, StatusUpdateResult, StoreError},
    db_types::{ConnectId, Conversation, Match, MatchStatus, MatchTransition, PairKey},
};

/// The `MatchManagement` trait defines how matches and their conversations are persisted.
///
/// A match and its conversation share the deterministic [`PairKey`] of the two participants, and are always written
/// together.
#[allow(async_fn_in_trait)]
pub trait MatchManagement: Clone {
    type Error: StoreError;

    /// Creates the match and its conversation for the pair in one atomic transaction.
    ///
    /// * If an active match already exists, it is returned unchanged as [`InsertMatchResult::AlreadyExists`].
    /// * If a closed match exists, nothing is written and [`InsertMatchResult::Closed`] is returned.
    /// * If the match stored under the pair key has other participants, nothing is written and
    ///   [`InsertMatchResult::ParticipantMismatch`] is returned.
    /// * Concurrent calls for the same pair produce exactly one match; the losers observe `AlreadyExists`.
    async fn insert_match(&self, a: &ConnectId, b: &ConnectId) -> Result<InsertMatchResult, Self::Error>;

    async fn fetch_match(&self, id: &PairKey) -> Result<Option<Match>, Self::Error>;

    async fn fetch_conversation(&self, id: &PairKey) -> Result<Option<Conversation>, Self::Error>;

    /// Fetches the matches `user` participates in, optionally restricted to the given status, most recent first.
    async fn fetch_matches_for_user(
        &self,
        user: &ConnectId,
        status: Option<MatchStatus>,
    ) -> Result<Vec<Match>, Self::Error>;

    /// Applies a participant-requested status transition to the match and its conversation atomically. Reports are
    /// persisted alongside the status change.
    async fn update_match_status(
        &self,
        id: &PairKey,
        by: &ConnectId,
        transition: &MatchTransition,
    ) -> Result<StatusUpdateResult, Self::Error>;

    /// Returns the pair keys for which a match exists without a conversation, or a conversation without a match.
    async fn fetch_inconsistent_pairs(&self) -> Result<Vec<PairKey>, Self::Error>;
}
