//! Delivery queue queries. A queue is one `delivery_queues` row, its `daily_entries` and their `queued_candidates`.
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db::{
        sqlite::SqliteDatabaseError,
        traits::{InsertEntryResult, MarkViewedOutcome},
    },
    db_types::{ConnectId, DailyEntry, Decision, DeliveryQueue, NewCandidate, PeerDecision, QueuedCandidate},
};

const CANDIDATE_COLUMNS: &str = "entry_date, peer_id, compatibility_score, stability_rank, viewed, decision";

/// Creates the queue for `user` if needed and sets its `updated_at` timestamp.
pub async fn touch_queue(
    user: &ConnectId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO delivery_queues (user_id, created_at, updated_at) VALUES ($1, $2, $2)
        ON CONFLICT (user_id) DO UPDATE SET updated_at = excluded.updated_at
        "#,
    )
    .bind(user)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

/// Appends the entry for `date`. Must run inside a transaction, which the caller commits only when the result is
/// [`InsertEntryResult::Inserted`].
pub async fn append_daily_entry(
    user: &ConnectId,
    date: NaiveDate,
    candidates: &[NewCandidate],
    conn: &mut SqliteConnection,
) -> Result<InsertEntryResult, SqliteDatabaseError> {
    let now = Utc::now();
    touch_queue(user, now, conn).await?;
    let result = sqlx::query(
        "INSERT INTO daily_entries (user_id, entry_date, created_at) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
    )
    .bind(user)
    .bind(date)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        trace!("📅️ {user} already has an entry for {date}");
        return Ok(InsertEntryResult::AlreadyExists);
    }
    let mut inserted = 0usize;
    for (position, candidate) in candidates.iter().enumerate() {
        let result = sqlx::query(
            r#"
            INSERT INTO queued_candidates (user_id, entry_date, position, peer_id, compatibility_score, stability_rank)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user)
        .bind(date)
        .bind(position as i64)
        .bind(&candidate.peer_id)
        .bind(candidate.compatibility_score)
        .bind(candidate.stability_rank)
        .execute(&mut *conn)
        .await?;
        inserted += result.rows_affected() as usize;
    }
    debug!("📅️ Entry for {date} appended to the queue of {user} with {inserted} candidates");
    Ok(InsertEntryResult::Inserted(inserted))
}

pub async fn daily_entry_exists(
    user: &ConnectId,
    date: NaiveDate,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM daily_entries WHERE user_id = $1 AND entry_date = $2")
        .bind(user)
        .bind(date)
        .fetch_optional(conn)
        .await?;
    Ok(found.is_some())
}

pub async fn fetch_queue(
    user: &ConnectId,
    conn: &mut SqliteConnection,
) -> Result<Option<DeliveryQueue>, SqliteDatabaseError> {
    let updated_at: Option<DateTime<Utc>> =
        sqlx::query_scalar("SELECT updated_at FROM delivery_queues WHERE user_id = $1")
            .bind(user)
            .fetch_optional(&mut *conn)
            .await?;
    let Some(updated_at) = updated_at else {
        return Ok(None);
    };
    let dates: Vec<NaiveDate> =
        sqlx::query_scalar("SELECT entry_date FROM daily_entries WHERE user_id = $1 ORDER BY entry_date")
            .bind(user)
            .fetch_all(&mut *conn)
            .await?;
    let candidates: Vec<QueuedCandidate> = sqlx::query_as(&format!(
        "SELECT {CANDIDATE_COLUMNS} FROM queued_candidates WHERE user_id = $1 ORDER BY entry_date, position"
    ))
    .bind(user)
    .fetch_all(conn)
    .await?;
    let mut daily_entries = dates.into_iter().map(|date| DailyEntry { date, candidates: vec![] }).collect::<Vec<_>>();
    for candidate in candidates {
        if let Some(entry) = daily_entries.iter_mut().find(|e| e.date == candidate.entry_date) {
            entry.candidates.push(candidate);
        }
    }
    Ok(Some(DeliveryQueue { user_id: user.clone(), daily_entries, updated_at }))
}

/// Unviewed candidates, oldest entry first, in ranked order within each entry.
pub async fn fetch_unviewed_candidates(
    user: &ConnectId,
    conn: &mut SqliteConnection,
) -> Result<Vec<QueuedCandidate>, SqliteDatabaseError> {
    let candidates = sqlx::query_as(&format!(
        "SELECT {CANDIDATE_COLUMNS} FROM queued_candidates WHERE user_id = $1 AND viewed = 0 ORDER BY entry_date, \
         position"
    ))
    .bind(user)
    .fetch_all(conn)
    .await?;
    Ok(candidates)
}

/// Marks the named candidates as viewed. Must run inside a transaction. Returns `None` if `user` has no queue.
pub async fn mark_viewed(
    user: &ConnectId,
    decisions: &[PeerDecision],
    conn: &mut SqliteConnection,
) -> Result<Option<Vec<MarkViewedOutcome>>, SqliteDatabaseError> {
    let now = Utc::now();
    let result = sqlx::query("UPDATE delivery_queues SET updated_at = $1 WHERE user_id = $2")
        .bind(now)
        .bind(user)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    let mut outcomes = Vec::with_capacity(decisions.len());
    for PeerDecision { peer_id, decision } in decisions {
        let result = sqlx::query(
            r#"
            UPDATE queued_candidates SET viewed = 1, viewed_at = $1, decision = $2
            WHERE user_id = $3 AND peer_id = $4 AND viewed = 0
            "#,
        )
        .bind(now)
        .bind(decision)
        .bind(user)
        .bind(peer_id)
        .execute(&mut *conn)
        .await?;
        let outcome = if result.rows_affected() > 0 {
            MarkViewedOutcome::Marked(*decision)
        } else {
            previous_decision(user, peer_id, conn)
                .await?
                .map(|previous| MarkViewedOutcome::AlreadyViewed(previous.unwrap_or(*decision)))
                .unwrap_or(MarkViewedOutcome::NotFound)
        };
        trace!("📬️ {user} -> {peer_id}: {outcome:?}");
        outcomes.push(outcome);
    }
    Ok(Some(outcomes))
}

/// `None` if the peer was never queued for `user`, otherwise the decision stored on the viewed candidate, if any.
async fn previous_decision(
    user: &ConnectId,
    peer: &ConnectId,
    conn: &mut SqliteConnection,
) -> Result<Option<Option<Decision>>, SqliteDatabaseError> {
    let decision: Option<Option<Decision>> = sqlx::query_scalar(
        "SELECT decision FROM queued_candidates WHERE user_id = $1 AND peer_id = $2 ORDER BY entry_date LIMIT 1",
    )
    .bind(user)
    .bind(peer)
    .fetch_optional(conn)
    .await?;
    Ok(decision)
}
