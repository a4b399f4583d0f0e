use std::{collections::HashSet, fmt::Debug};

use log::*;

use crate::{
    db::traits::{InsertMatchResult, LedgerManagement, MatchManagement, RecordLikeResult, RecordPassResult},
    db_types::{ActionLedgerRecord, ConnectId, Decision, LedgerRelation, PairKey},
    events::EventProducers,
    me_api::{
        errors::{MatchEngineError, StoreResultExt},
        match_api::MatchApi,
        queue_objects::LikeOutcome,
    },
};

/// `LedgerApi` records likes and passes in the per-user action ledger.
///
/// The first decision a user makes on a peer is final: liking a peer you passed on, or passing on a peer you liked,
/// is rejected with [`MatchEngineError::ConflictingAction`]. Repeating a decision is a silent success.
///
/// When a like completes a mutual like, the match and its conversation are materialized through [`MatchApi`].
#[derive(Clone)]
pub struct LedgerApi<B> {
    db: B,
    matches: MatchApi<B>,
}

impl<B> Debug for LedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerApi")
    }
}

impl<B: Clone> LedgerApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        let matches = MatchApi::new(db.clone(), producers);
        Self { db, matches }
    }
}

impl<B> LedgerApi<B>
where B: LedgerManagement + MatchManagement
{
    /// Records that `user` likes `target`.
    ///
    /// Both ledger records are updated in one transaction. If `target` already likes `user`, the two become a
    /// mutual match and the match is created. `new_match` is only set in the outcome of the call that created it; a
    /// pair whose match was closed earlier is reported as mutual, but is never matched again.
    pub async fn record_like(&self, user: &ConnectId, target: &ConnectId) -> Result<LikeOutcome, MatchEngineError> {
        PairKey::new(user, target)?;
        let result = self.db.record_like(user, target).await.ledger_err()?;
        match result {
            RecordLikeResult::PreviouslyPassed => Err(MatchEngineError::ConflictingAction {
                user: user.clone(),
                target: target.clone(),
                previous: Decision::Pass,
            }),
            RecordLikeResult::Recorded { mutual: false } => {
                debug!("👍️ {user} likes {target}");
                Ok(LikeOutcome::one_sided())
            },
            RecordLikeResult::Recorded { mutual: true } => {
                debug!("👍️ {user} likes {target}, and it is mutual");
                let new_match = match self.matches.materialize(user, target).await? {
                    InsertMatchResult::Inserted(m) => Some(m),
                    InsertMatchResult::AlreadyExists(_) | InsertMatchResult::Closed(_) => None,
                    InsertMatchResult::ParticipantMismatch(m) => return Err(MatchEngineError::Inconsistent(m.id)),
                };
                Ok(LikeOutcome { is_mutual_match: true, new_match })
            },
        }
    }

    /// Records that `user` passes on `target`.
    pub async fn record_pass(&self, user: &ConnectId, target: &ConnectId) -> Result<(), MatchEngineError> {
        PairKey::new(user, target)?;
        match self.db.record_pass(user, target).await.ledger_err()? {
            RecordPassResult::Recorded => {
                debug!("👎️ {user} passes on {target}");
                Ok(())
            },
            RecordPassResult::PreviouslyLiked => Err(MatchEngineError::ConflictingAction {
                user: user.clone(),
                target: target.clone(),
                previous: Decision::Like,
            }),
        }
    }

    pub async fn record_decision(
        &self,
        user: &ConnectId,
        target: &ConnectId,
        decision: Decision,
    ) -> Result<LikeOutcome, MatchEngineError> {
        match decision {
            Decision::Like => self.record_like(user, target).await,
            Decision::Pass => self.record_pass(user, target).await.map(|_| LikeOutcome::one_sided()),
        }
    }

    pub async fn has_acted_on(&self, user: &ConnectId, target: &ConnectId) -> Result<bool, MatchEngineError> {
        self.db.has_acted_on(user, target).await.ledger_err()
    }

    pub async fn acted_on_peers(&self, user: &ConnectId) -> Result<HashSet<ConnectId>, MatchEngineError> {
        self.db.fetch_acted_on_peers(user).await.ledger_err()
    }

    pub async fn matches(&self, user: &ConnectId) -> Result<HashSet<ConnectId>, MatchEngineError> {
        self.db.fetch_peers(user, LedgerRelation::Match).await.ledger_err()
    }

    pub async fn liked_by(&self, user: &ConnectId) -> Result<HashSet<ConnectId>, MatchEngineError> {
        self.db.fetch_peers(user, LedgerRelation::LikedBy).await.ledger_err()
    }

    pub async fn ledger(&self, user: &ConnectId) -> Result<Option<ActionLedgerRecord>, MatchEngineError> {
        self.db.fetch_ledger(user).await.ledger_err()
    }
}
