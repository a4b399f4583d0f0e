use std::{collections::HashSet, fmt::Debug, future::Future, time::Duration};

use chrono::NaiveDate;
use log::*;
use rand::Rng;
use sqlx::SqlitePool;

use super::{ledger, matches, new_pool, profiles, queue, run_migrations, SqliteDatabaseError};
use crate::{
    config::{EngineConfig, TransactionPolicy},
    db::traits::{
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
    },
    db_types::{
        ActionLedgerRecord,
        ConnectId,
        Conversation,
        DeliveryQueue,
        LedgerRelation,
        Match,
        MatchStatus,
        MatchTransition,
        NewCandidate,
        PairKey,
        PeerDecision,
        Profile,
        QueuedCandidate,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
    policy: TransactionPolicy,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Opens (creating if necessary) the database at `url` with the default transaction policy.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let policy = TransactionPolicy::default();
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections, policy.timeout).await?;
        Ok(Self { url: url.to_string(), pool, policy })
    }

    /// Opens the database described by `config`, running the migrations first if `auto_migrate` is set.
    pub async fn new_with_config(config: &EngineConfig) -> Result<Self, SqliteDatabaseError> {
        let policy = config.transactions;
        let pool = new_pool(&config.database_url, config.max_connections, policy.timeout).await?;
        if config.auto_migrate {
            run_migrations(&pool).await?;
        }
        Ok(Self { url: config.database_url.clone(), pool, policy })
    }

    pub fn with_policy(mut self, policy: TransactionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn policy(&self) -> &TransactionPolicy {
        &self.policy
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Runs `op` until it succeeds, fails with a permanent error, or the policy's attempts are used up.
    ///
    /// Each attempt must open and commit its own transaction, and is bounded by the policy timeout. A timed-out
    /// attempt is dropped, which rolls its transaction back. Transient failures are retried after `n * backoff`
    /// plus up to one `backoff` of jitter, so that racing writers do not retry in lockstep.
    pub async fn run_atomic<T, F, Fut>(&self, label: &str, op: F) -> Result<T, SqliteDatabaseError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, SqliteDatabaseError>>,
    {
        let attempts = self.policy.max_attempts();
        let mut last_error = None;
        for attempt in 1..=attempts {
            let error = match tokio::time::timeout(self.policy.timeout, op()).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) if e.is_transient() => e,
                Ok(Err(e)) => return Err(e),
                Err(_) => SqliteDatabaseError::Timeout(self.policy.timeout),
            };
            warn!("🗃️ {label} failed on attempt {attempt}/{attempts}. {error}");
            last_error = Some(error);
            if attempt < attempts {
                tokio::time::sleep(self.backoff(attempt)).await;
            }
        }
        let source = last_error.unwrap_or(SqliteDatabaseError::Timeout(self.policy.timeout));
        error!("🗃️ {label} gave up after {attempts} attempts. {source}");
        Err(SqliteDatabaseError::RetriesExhausted { attempts, source: Box::new(source) })
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.policy.backoff.as_millis() as u64;
        let jitter = if base > 0 { rand::thread_rng().gen_range(0..=base) } else { 0 };
        Duration::from_millis(base * u64::from(attempt) + jitter)
    }

    /// Saves a profile into the local profile read model. Used for seeding and tests.
    pub async fn upsert_profile(&self, profile: &Profile) -> Result<(), SqliteDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        profiles::upsert_profile(profile, &mut conn).await
    }

    /// Records that `blocker` blocked `blocked` in the local safety read model. Used for seeding and tests.
    pub async fn block_user(&self, blocker: &ConnectId, blocked: &ConnectId) -> Result<(), SqliteDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        profiles::insert_block(blocker, blocked, &mut conn).await
    }

    /// The number of reports filed against a match.
    pub async fn count_reports(&self, id: &PairKey) -> Result<i64, SqliteDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        matches::count_reports(id, &mut conn).await
    }
}

impl LedgerManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn record_like(&self, user: &ConnectId, target: &ConnectId) -> Result<RecordLikeResult, Self::Error> {
        let pool = &self.pool;
        self.run_atomic("record_like", move || async move {
            let mut tx = pool.begin().await?;
            let result = ledger::record_like(user, target, &mut tx).await?;
            if let RecordLikeResult::Recorded { .. } = result {
                tx.commit().await?;
            }
            Ok::<_, SqliteDatabaseError>(result)
        })
        .await
    }

    async fn record_pass(&self, user: &ConnectId, target: &ConnectId) -> Result<RecordPassResult, Self::Error> {
        let pool = &self.pool;
        self.run_atomic("record_pass", move || async move {
            let mut tx = pool.begin().await?;
            let result = ledger::record_pass(user, target, &mut tx).await?;
            if result == RecordPassResult::Recorded {
                tx.commit().await?;
            }
            Ok::<_, SqliteDatabaseError>(result)
        })
        .await
    }

    async fn fetch_ledger(&self, user: &ConnectId) -> Result<Option<ActionLedgerRecord>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        ledger::fetch_ledger(user, &mut conn).await
    }

    async fn fetch_peers(
        &self,
        user: &ConnectId,
        relation: LedgerRelation,
    ) -> Result<HashSet<ConnectId>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        ledger::fetch_peers(user, &[relation], &mut conn).await
    }

    async fn fetch_acted_on_peers(&self, user: &ConnectId) -> Result<HashSet<ConnectId>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        ledger::fetch_peers(user, &[LedgerRelation::Like, LedgerRelation::Pass], &mut conn).await
    }

    async fn has_acted_on(&self, user: &ConnectId, target: &ConnectId) -> Result<bool, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        ledger::has_acted_on(user, target, &mut conn).await
    }
}

impl MatchManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn insert_match(&self, a: &ConnectId, b: &ConnectId) -> Result<InsertMatchResult, Self::Error> {
        let pool = &self.pool;
        self.run_atomic("insert_match", move || async move {
            let mut tx = pool.begin().await?;
            let result = matches::insert_match(a, b, &mut tx).await?;
            if let InsertMatchResult::Inserted(_) = result {
                tx.commit().await?;
            }
            Ok::<_, SqliteDatabaseError>(result)
        })
        .await
    }

    async fn fetch_match(&self, id: &PairKey) -> Result<Option<Match>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        matches::fetch_match(id, &mut conn).await
    }

    async fn fetch_conversation(&self, id: &PairKey) -> Result<Option<Conversation>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        matches::fetch_conversation(id, &mut conn).await
    }

    async fn fetch_matches_for_user(
        &self,
        user: &ConnectId,
        status: Option<MatchStatus>,
    ) -> Result<Vec<Match>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        matches::fetch_matches_for_user(user, status, &mut conn).await
    }

    async fn update_match_status(
        &self,
        id: &PairKey,
        by: &ConnectId,
        transition: &MatchTransition,
    ) -> Result<StatusUpdateResult, Self::Error> {
        let pool = &self.pool;
        self.run_atomic("update_match_status", move || async move {
            let mut tx = pool.begin().await?;
            let result = matches::update_match_status(id, by, transition, &mut tx).await?;
            if let StatusUpdateResult::Updated { .. } = result {
                tx.commit().await?;
            }
            Ok::<_, SqliteDatabaseError>(result)
        })
        .await
    }

    async fn fetch_inconsistent_pairs(&self) -> Result<Vec<PairKey>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        matches::fetch_inconsistent_pairs(&mut conn).await
    }
}

impl QueueManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn append_daily_entry(
        &self,
        user: &ConnectId,
        date: NaiveDate,
        candidates: &[NewCandidate],
    ) -> Result<InsertEntryResult, Self::Error> {
        let pool = &self.pool;
        self.run_atomic("append_daily_entry", move || async move {
            let mut tx = pool.begin().await?;
            let result = queue::append_daily_entry(user, date, candidates, &mut tx).await?;
            if let InsertEntryResult::Inserted(_) = result {
                tx.commit().await?;
            }
            Ok::<_, SqliteDatabaseError>(result)
        })
        .await
    }

    async fn daily_entry_exists(&self, user: &ConnectId, date: NaiveDate) -> Result<bool, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        queue::daily_entry_exists(user, date, &mut conn).await
    }

    async fn fetch_queue(&self, user: &ConnectId) -> Result<Option<DeliveryQueue>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        queue::fetch_queue(user, &mut conn).await
    }

    async fn fetch_unviewed_candidates(&self, user: &ConnectId) -> Result<Vec<QueuedCandidate>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        queue::fetch_unviewed_candidates(user, &mut conn).await
    }

    async fn mark_viewed(
        &self,
        user: &ConnectId,
        decisions: &[PeerDecision],
    ) -> Result<Option<Vec<MarkViewedOutcome>>, Self::Error> {
        let pool = &self.pool;
        self.run_atomic("mark_viewed", move || async move {
            let mut tx = pool.begin().await?;
            let outcomes = queue::mark_viewed(user, decisions, &mut tx).await?;
            if outcomes.is_some() {
                tx.commit().await?;
            }
            Ok::<_, SqliteDatabaseError>(outcomes)
        })
        .await
    }
}

impl ProfileStore for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn find_profile(&self, user: &ConnectId) -> Result<Option<Profile>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        profiles::fetch_profile(user, &mut conn).await
    }

    async fn list_candidates(&self, excluding: &HashSet<ConnectId>) -> Result<Vec<Profile>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        profiles::fetch_active_profiles(excluding, &mut conn).await
    }
}

impl SafetyManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn is_blocked(&self, user: &ConnectId, peer: &ConnectId) -> Result<bool, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        profiles::is_blocked(user, peer, &mut conn).await
    }

    async fn fetch_blocked_peers(&self, user: &ConnectId) -> Result<HashSet<ConnectId>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        profiles::fetch_blocked_peers(user, &mut conn).await
    }
}
