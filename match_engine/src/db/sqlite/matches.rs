//! Match and conversation persistence. A match and its conversation share the pair key of the two participants.
use chrono::{DateTime, Utc};
use log::{debug, error, trace};
use sqlx::SqliteConnection;

use crate::{
    db::{
        sqlite::SqliteDatabaseError,
        traits::{InsertMatchResult, StatusUpdateResult},
    },
    db_types::{ConnectId, Conversation, Match, MatchStatus, MatchTransition, PairKey},
};

/// Inserts the match for the pair together with its conversation. Must run inside a transaction.
///
/// The match insert comes first and is a no-op on conflict, so concurrent callers serialize on the write lock and
/// exactly one of them sees a new row.
pub async fn insert_match(
    a: &ConnectId,
    b: &ConnectId,
    conn: &mut SqliteConnection,
) -> Result<InsertMatchResult, SqliteDatabaseError> {
    let key = PairKey::new(a, b)?;
    let (user1, user2) = PairKey::ordered(a, b);
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO matches (id, user1_id, user2_id, status, conversation_id, matched_at, last_activity_at)
        VALUES ($1, $2, $3, 'ACTIVE', $1, $4, $4)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(&key)
    .bind(user1)
    .bind(user2)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() > 0 {
        insert_conversation(&key, user1, user2, now, conn).await?;
        let m = fetch_match(&key, conn)
            .await?
            .ok_or_else(|| SqliteDatabaseError::QueryError(format!("Match {key} vanished after insert")))?;
        debug!("💞️ Match {key} created between {user1} and {user2}");
        return Ok(InsertMatchResult::Inserted(m));
    }
    let existing = fetch_match(&key, conn)
        .await?
        .ok_or_else(|| SqliteDatabaseError::QueryError(format!("Match {key} exists but could not be read")))?;
    if (&existing.user1_id, &existing.user2_id) != (user1, user2) {
        error!(
            "💞️ Match {key} belongs to {} and {}, not to {user1} and {user2}",
            existing.user1_id, existing.user2_id
        );
        return Ok(InsertMatchResult::ParticipantMismatch(existing));
    }
    if existing.status.is_active() {
        trace!("💞️ Match {key} already exists");
        Ok(InsertMatchResult::AlreadyExists(existing))
    } else {
        debug!("💞️ Match {key} is {} and will not be re-created", existing.status);
        Ok(InsertMatchResult::Closed(existing))
    }
}

/// Writes the conversation for a new match. A conversation row left behind without its match is adopted and reset.
async fn insert_conversation(
    key: &PairKey,
    participant1: &ConnectId,
    participant2: &ConnectId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
        INSERT INTO conversations (id, match_id, participant1_id, participant2_id, status, unread_count, matched_at,
            updated_at)
        VALUES ($1, $1, $2, $3, 'ACTIVE', 0, $4, $4)
        ON CONFLICT (id) DO UPDATE SET
            status = 'ACTIVE',
            unread_count = 0,
            matched_at = excluded.matched_at,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(participant1)
    .bind(participant2)
    .bind(now)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        error!("💞️ Conversation for match {key} ({participant1}, {participant2}) could not be written");
        return Err(SqliteDatabaseError::QueryError(format!("Conversation {key} was not written")));
    }
    Ok(())
}

pub async fn fetch_match(id: &PairKey, conn: &mut SqliteConnection) -> Result<Option<Match>, SqliteDatabaseError> {
    let m = sqlx::query_as(
        r#"
        SELECT id, user1_id, user2_id, status, conversation_id, matched_at, last_activity_at
        FROM matches WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(m)
}

pub async fn fetch_conversation(
    id: &PairKey,
    conn: &mut SqliteConnection,
) -> Result<Option<Conversation>, SqliteDatabaseError> {
    let conversation = sqlx::query_as(
        r#"
        SELECT id, match_id, participant1_id, participant2_id, status, unread_count, matched_at, updated_at
        FROM conversations WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(conversation)
}

pub async fn fetch_matches_for_user(
    user: &ConnectId,
    status: Option<MatchStatus>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Match>, SqliteDatabaseError> {
    let matches = sqlx::query_as(
        r#"
        SELECT id, user1_id, user2_id, status, conversation_id, matched_at, last_activity_at
        FROM matches
        WHERE (user1_id = $1 OR user2_id = $1) AND ($2 IS NULL OR status = $2)
        ORDER BY matched_at DESC, id
        "#,
    )
    .bind(user)
    .bind(status)
    .fetch_all(conn)
    .await?;
    Ok(matches)
}

/// Applies `transition` on behalf of `by`. Must run inside a transaction, which the caller commits only when the
/// result is [`StatusUpdateResult::Updated`].
pub async fn update_match_status(
    id: &PairKey,
    by: &ConnectId,
    transition: &MatchTransition,
    conn: &mut SqliteConnection,
) -> Result<StatusUpdateResult, SqliteDatabaseError> {
    // Take the write lock before reading the current status
    sqlx::query("UPDATE matches SET last_activity_at = last_activity_at WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    let Some(current) = fetch_match(id, conn).await? else {
        return Ok(StatusUpdateResult::NotFound);
    };
    if !current.is_participant(by) {
        return Ok(StatusUpdateResult::NotParticipant);
    }
    let target = transition.target_status(&current, by);
    if current.status == target {
        return Ok(StatusUpdateResult::Unchanged(current));
    }
    if !current.status.is_active() {
        return Ok(StatusUpdateResult::Closed(current));
    }
    let now = Utc::now();
    sqlx::query("UPDATE matches SET status = $1, last_activity_at = $2 WHERE id = $3")
        .bind(target)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    let conversation_id = current.conversation_id.clone().unwrap_or_else(|| id.clone());
    let updated = sqlx::query("UPDATE conversations SET status = $1, updated_at = $2 WHERE id = $3")
        .bind(target.conversation_status())
        .bind(now)
        .bind(&conversation_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    if updated == 0 {
        error!(
            "💞️ Match {id} between {} and {} has no conversation. The status change is applied to the match only.",
            current.user1_id, current.user2_id
        );
    }
    if let MatchTransition::Report { reason } = transition {
        sqlx::query("INSERT INTO match_reports (match_id, reporter_id, reason, created_at) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(by)
            .bind(reason)
            .bind(now)
            .execute(&mut *conn)
            .await?;
    }
    let updated = fetch_match(id, conn)
        .await?
        .ok_or_else(|| SqliteDatabaseError::QueryError(format!("Match {id} vanished during update")))?;
    debug!("💞️ Match {id} moved from {} to {} by {by}", current.status, updated.status);
    Ok(StatusUpdateResult::Updated { old_status: current.status, updated })
}

pub async fn count_reports(id: &PairKey, conn: &mut SqliteConnection) -> Result<i64, SqliteDatabaseError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM match_reports WHERE match_id = $1")
        .bind(id)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

/// Pair keys with a match and no conversation, or a conversation and no match.
pub async fn fetch_inconsistent_pairs(conn: &mut SqliteConnection) -> Result<Vec<PairKey>, SqliteDatabaseError> {
    let keys = sqlx::query_scalar(
        r#"
        SELECT m.id FROM matches m LEFT JOIN conversations c ON c.id = m.conversation_id WHERE c.id IS NULL
        UNION
        SELECT c.id FROM conversations c LEFT JOIN matches m ON m.id = c.match_id WHERE m.id IS NULL
        ORDER BY 1
        "#,
    )
    .fetch_all(conn)
    .await?;
    Ok(keys)
}
