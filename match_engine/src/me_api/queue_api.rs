use std::{collections::HashSet, fmt::Debug};

use chrono::NaiveDate;
use log::*;

use crate::{
    config::DEFAULT_QUEUE_PULL_SIZE,
    db::traits::{LedgerManagement, MarkViewedOutcome, MatchManagement, QueueManagement},
    db_types::{ConnectId, DeliveryQueue, PeerDecision, QueuedCandidate},
    events::EventProducers,
    me_api::{
        errors::{MatchEngineError, StoreResultExt},
        ledger_api::LedgerApi,
        queue_objects::{BatchResult, EntrySummary, HistoryPage, QueueStatus},
    },
};

/// `QueueApi` hands out the undecided candidates in a user's delivery queue and takes the user's decisions on them.
pub struct QueueApi<B> {
    db: B,
    ledger: LedgerApi<B>,
    pull_size: usize,
}

impl<B> Debug for QueueApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "QueueApi")
    }
}

impl<B: Clone> QueueApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        let ledger = LedgerApi::new(db.clone(), producers);
        Self { db, ledger, pull_size: DEFAULT_QUEUE_PULL_SIZE }
    }

    /// Sets the number of candidates [`Self::get_next`] returns when no limit is given.
    pub fn with_pull_size(mut self, pull_size: usize) -> Self {
        self.pull_size = pull_size.max(1);
        self
    }
}

impl<B> QueueApi<B>
where B: QueueManagement + LedgerManagement + MatchManagement
{
    /// Returns up to `limit` candidates the user has not seen or decided on yet, oldest entry first.
    ///
    /// A user without a queue simply has nothing to show.
    pub async fn get_next(
        &self,
        user: &ConnectId,
        limit: Option<usize>,
    ) -> Result<Vec<QueuedCandidate>, MatchEngineError> {
        let limit = limit.unwrap_or(self.pull_size);
        let unviewed = self.db.fetch_unviewed_candidates(user).await.store_err()?;
        if unviewed.is_empty() {
            return Ok(vec![]);
        }
        let acted_on = self.db.fetch_acted_on_peers(user).await.ledger_err()?;
        let mut seen = HashSet::new();
        let next = unviewed
            .into_iter()
            .filter(|c| !acted_on.contains(&c.peer_id) && seen.insert(c.peer_id.clone()))
            .take(limit)
            .collect::<Vec<_>>();
        trace!("📬️ {} candidates pulled for {user}", next.len());
        Ok(next)
    }

    /// Marks the candidates named in `decisions` as viewed, then records each decision in the ledger, in the order
    /// given.
    ///
    /// Decisions on peers that are not in the queue are skipped and listed in `not_found_peer_ids`. Decisions that
    /// contradict an earlier decision on the same peer are listed in `rejected_peer_ids`. If the ledger fails with a
    /// transient error part way through, the whole call fails as retryable: resubmitting the same decisions is safe.
    pub async fn submit_decisions(
        &self,
        user: &ConnectId,
        decisions: &[PeerDecision],
    ) -> Result<BatchResult, MatchEngineError> {
        let outcomes = self
            .db
            .mark_viewed(user, decisions)
            .await
            .store_err()?
            .ok_or_else(|| MatchEngineError::QueueNotFound(user.clone()))?;
        let mut result = BatchResult::default();
        for (decision, outcome) in decisions.iter().zip(outcomes) {
            let peer = &decision.peer_id;
            if let MarkViewedOutcome::NotFound = outcome {
                debug!("📬️ {peer} is not in the queue of {user}. Skipping the decision.");
                result.not_found_peer_ids.push(peer.clone());
                continue;
            }
            match self.ledger.record_decision(user, peer, decision.decision).await {
                Ok(like) => {
                    result.actions_processed += 1;
                    if like.is_mutual_match {
                        result.matched_peer_ids.push(peer.clone());
                    }
                    if like.new_match.is_some() {
                        result.new_matches += 1;
                    }
                },
                Err(MatchEngineError::ConflictingAction { previous, .. }) => {
                    debug!("📬️ {user} already decided {previous} on {peer}. {} is rejected.", decision.decision);
                    result.rejected_peer_ids.push(peer.clone());
                },
                Err(MatchEngineError::SelfAction(_) | MatchEngineError::InvalidPair(_)) => {
                    result.rejected_peer_ids.push(peer.clone())
                },
                Err(e) => {
                    warn!("📬️ Decision by {user} on {peer} could not be recorded. {e}");
                    return Err(e);
                },
            }
        }
        info!(
            "📬️ {user} submitted {} decisions. {} processed, {} new matches",
            decisions.len(),
            result.actions_processed,
            result.new_matches
        );
        Ok(result)
    }

    pub async fn fetch_queue(&self, user: &ConnectId) -> Result<Option<DeliveryQueue>, MatchEngineError> {
        self.db.fetch_queue(user).await.store_err()
    }

    /// Reports how far the user is through the batch for `date`. A user without a queue has no batch.
    pub async fn queue_status(&self, user: &ConnectId, date: NaiveDate) -> Result<QueueStatus, MatchEngineError> {
        let queue = self.db.fetch_queue(user).await.store_err()?;
        let status = match &queue {
            Some(q) => QueueStatus::new(user.clone(), date, q.entry_for(date), q.unviewed_count()),
            None => QueueStatus::new(user.clone(), date, None, 0),
        };
        trace!("📬️ {user} has {} of {} candidates left for {date}", status.remaining, status.candidates);
        Ok(status)
    }

    /// Returns page `page` (from zero) of the user's daily entries, newest first. `size` is at least one.
    pub async fn history(&self, user: &ConnectId, page: usize, size: usize) -> Result<HistoryPage, MatchEngineError> {
        let size = size.max(1);
        let Some(queue) = self.db.fetch_queue(user).await.store_err()? else {
            return Ok(HistoryPage { page, size, ..Default::default() });
        };
        let total_entries = queue.daily_entries.len();
        let entries = queue
            .daily_entries
            .iter()
            .rev()
            .skip(page.saturating_mul(size))
            .take(size)
            .map(EntrySummary::from)
            .collect();
        Ok(HistoryPage { entries, page, size, total_entries, total_pages: total_entries.div_ceil(size) })
    }
}
