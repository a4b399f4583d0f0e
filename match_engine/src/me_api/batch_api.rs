use std::{collections::HashSet, fmt::Debug};

use chrono::NaiveDate;
use log::*;

use crate::{
    config::{clamp_batch_size, DEFAULT_DAILY_BATCH_SIZE},
    db::traits::{InsertEntryResult, LedgerManagement, ProfileStore, QueueManagement, SafetyManagement},
    db_types::ConnectId,
    events::{BatchGeneratedEvent, EventProducers, EventType},
    helpers::rank_candidates,
    me_api::{
        errors::{MatchEngineError, StoreResultExt},
        queue_objects::{BatchOutcome, DailyRunSummary},
    },
};

/// `BatchApi` generates the daily candidate batch for a user and appends it to their delivery queue.
///
/// A user receives at most one batch per calendar day. Candidates the user already decided on, users blocked in
/// either direction, inactive profiles and peers still waiting unviewed in the queue are never offered.
pub struct BatchApi<B> {
    db: B,
    producers: EventProducers,
    batch_size: usize,
}

impl<B> Debug for BatchApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BatchApi (batch size {})", self.batch_size)
    }
}

impl<B> BatchApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, batch_size: DEFAULT_DAILY_BATCH_SIZE }
    }

    /// Sets the number of candidates per daily entry. Values outside `1..=50` are clamped.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = clamp_batch_size(batch_size);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl<B> BatchApi<B>
where B: ProfileStore + SafetyManagement + LedgerManagement + QueueManagement
{
    /// Generates the entry for `user` on `date`. Does nothing if the entry already exists.
    ///
    /// An entry with fewer candidates than the batch size, including none at all, is still appended.
    pub async fn generate_daily_batch(
        &self,
        user: &ConnectId,
        date: NaiveDate,
    ) -> Result<BatchOutcome, MatchEngineError> {
        if self.db.daily_entry_exists(user, date).await.store_err()? {
            trace!("📅️ {user} already has a batch for {date}");
            return Ok(BatchOutcome::AlreadyPresent);
        }
        let profile = self.db
            .find_profile(user)
            .await
            .store_err()?
            .ok_or_else(|| MatchEngineError::NotFound(format!("profile for {user}")))?;
        let excluding = self.excluded_peers(user).await?;
        let pool = self.db.list_candidates(&excluding).await.store_err()?;
        let candidates = rank_candidates(&profile, &pool, self.batch_size);
        trace!("📅️ {} of {} candidates selected for {user} on {date}", candidates.len(), pool.len());
        match self.db.append_daily_entry(user, date, &candidates).await.store_err()? {
            InsertEntryResult::Inserted(count) => {
                info!("📅️ Batch for {date} generated for {user} with {count} candidates");
                if count > 0 {
                    let event = BatchGeneratedEvent::new(user.clone(), date, count);
                    self.producers.publish(EventType::BatchGenerated(event));
                }
                Ok(BatchOutcome::Generated(count))
            },
            InsertEntryResult::AlreadyExists => {
                debug!("📅️ Another generator beat us to the {date} batch for {user}");
                Ok(BatchOutcome::AlreadyPresent)
            },
        }
    }

    async fn excluded_peers(&self, user: &ConnectId) -> Result<HashSet<ConnectId>, MatchEngineError> {
        let mut excluding = self.db.fetch_acted_on_peers(user).await.store_err()?;
        excluding.extend(self.db.fetch_blocked_peers(user).await.store_err()?);
        let queued = self.db.fetch_unviewed_candidates(user).await.store_err()?;
        excluding.extend(queued.into_iter().map(|c| c.peer_id));
        excluding.insert(user.clone());
        Ok(excluding)
    }

    /// Generates the batch for `date` for every active user.
    ///
    /// A failure for one user is logged and counted, and that user is simply retried on the next run. Only a failure
    /// to list the users is returned as an error.
    pub async fn run_daily_batches(&self, date: NaiveDate) -> Result<DailyRunSummary, MatchEngineError> {
        let users = self.db.list_candidates(&HashSet::new()).await.store_err()?;
        info!("📅️ Generating {date} batches for {} users", users.len());
        let mut summary = DailyRunSummary::default();
        for profile in users {
            match self.generate_daily_batch(&profile.user_id, date).await {
                Ok(BatchOutcome::Generated(_)) => summary.generated += 1,
                Ok(BatchOutcome::AlreadyPresent) => summary.already_present += 1,
                Err(e) => {
                    let user = &profile.user_id;
                    warn!("📅️ Could not generate the {date} batch for {user}. Skipping until the next run. {e}");
                    summary.failed += 1;
                },
            }
        }
        info!(
            "📅️ {date} batches done. {} generated, {} already present, {} failed",
            summary.generated, summary.already_present, summary.failed
        );
        Ok(summary)
    }
}
