//! Action ledger queries. None of these functions are atomic on their own: call them inside a transaction and pass
//! `&mut *tx` as the connection when atomicity is required.
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db::{
        sqlite::SqliteDatabaseError,
        traits::{RecordLikeResult, RecordPassResult},
    },
    db_types::{ActionLedgerRecord, ConnectId, LedgerRelation},
};

#[derive(Debug, FromRow)]
struct LedgerPeerRow {
    relation: LedgerRelation,
    peer_id: ConnectId,
}

/// Creates the ledger for `user` if it does not exist, and sets its `last_updated` timestamp.
///
/// This is a write, so when it is the first statement of a transaction SQLite takes the write lock before anything is
/// read.
pub async fn touch_ledger(
    user: &ConnectId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO action_ledgers (user_id, created_at, last_updated) VALUES ($1, $2, $2)
        ON CONFLICT (user_id) DO UPDATE SET last_updated = excluded.last_updated
        "#,
    )
    .bind(user)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

/// Adds `peer` to the `relation` set of `user`. Returns `true` if the peer was not already in the set.
pub async fn add_peer(
    user: &ConnectId,
    relation: LedgerRelation,
    peer: &ConnectId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
        INSERT INTO ledger_peers (user_id, relation, peer_id, created_at) VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, relation, peer_id) DO NOTHING
        "#,
    )
    .bind(user)
    .bind(relation)
    .bind(peer)
    .bind(now)
    .execute(conn)
    .await?;
    let added = result.rows_affected() > 0;
    if added {
        trace!("👍️ {peer} added to the {relation} set of {user}");
    }
    Ok(added)
}

pub async fn contains_peer(
    user: &ConnectId,
    relation: LedgerRelation,
    peer: &ConnectId,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM ledger_peers WHERE user_id = $1 AND relation = $2 AND peer_id = $3")
            .bind(user)
            .bind(relation)
            .bind(peer)
            .fetch_optional(conn)
            .await?;
    Ok(found.is_some())
}

/// Records a like from `user` to `target` and detects a mutual like. See
/// [`crate::db::traits::LedgerManagement::record_like`] for the full contract.
///
/// If the result is [`RecordLikeResult::PreviouslyPassed`], the ledger rows touched by this call must not be
/// committed.
pub async fn record_like(
    user: &ConnectId,
    target: &ConnectId,
    conn: &mut SqliteConnection,
) -> Result<RecordLikeResult, SqliteDatabaseError> {
    let now = Utc::now();
    touch_ledger(user, now, conn).await?;
    touch_ledger(target, now, conn).await?;
    if contains_peer(user, LedgerRelation::Pass, target, conn).await? {
        debug!("👍️ {user} already passed on {target}. The like is not recorded.");
        return Ok(RecordLikeResult::PreviouslyPassed);
    }
    add_peer(user, LedgerRelation::Like, target, now, conn).await?;
    add_peer(target, LedgerRelation::LikedBy, user, now, conn).await?;
    let mutual = contains_peer(target, LedgerRelation::Like, user, conn).await?;
    if mutual {
        add_peer(user, LedgerRelation::Match, target, now, conn).await?;
        add_peer(target, LedgerRelation::Match, user, now, conn).await?;
        debug!("👍️ {user} and {target} like each other");
    }
    Ok(RecordLikeResult::Recorded { mutual })
}

/// Records a pass from `user` on `target`. If the result is [`RecordPassResult::PreviouslyLiked`], the ledger row
/// touched by this call must not be committed.
pub async fn record_pass(
    user: &ConnectId,
    target: &ConnectId,
    conn: &mut SqliteConnection,
) -> Result<RecordPassResult, SqliteDatabaseError> {
    let now = Utc::now();
    touch_ledger(user, now, conn).await?;
    if contains_peer(user, LedgerRelation::Like, target, conn).await? {
        debug!("👎️ {user} already liked {target}. The pass is not recorded.");
        return Ok(RecordPassResult::PreviouslyLiked);
    }
    add_peer(user, LedgerRelation::Pass, target, now, conn).await?;
    Ok(RecordPassResult::Recorded)
}

pub async fn fetch_ledger(
    user: &ConnectId,
    conn: &mut SqliteConnection,
) -> Result<Option<ActionLedgerRecord>, SqliteDatabaseError> {
    let last_updated: Option<DateTime<Utc>> =
        sqlx::query_scalar("SELECT last_updated FROM action_ledgers WHERE user_id = $1")
            .bind(user)
            .fetch_optional(&mut *conn)
            .await?;
    let Some(last_updated) = last_updated else {
        return Ok(None);
    };
    let rows: Vec<LedgerPeerRow> = sqlx::query_as("SELECT relation, peer_id FROM ledger_peers WHERE user_id = $1")
        .bind(user)
        .fetch_all(conn)
        .await?;
    let record = rows.into_iter().fold(ActionLedgerRecord::new(user.clone(), last_updated), |mut record, row| {
        record.set_mut(row.relation).insert(row.peer_id);
        record
    });
    Ok(Some(record))
}

pub async fn fetch_peers(
    user: &ConnectId,
    relations: &[LedgerRelation],
    conn: &mut SqliteConnection,
) -> Result<HashSet<ConnectId>, SqliteDatabaseError> {
    let mut peers = HashSet::new();
    for relation in relations {
        let rows: Vec<ConnectId> =
            sqlx::query_scalar("SELECT peer_id FROM ledger_peers WHERE user_id = $1 AND relation = $2")
                .bind(user)
                .bind(relation)
                .fetch_all(&mut *conn)
                .await?;
        peers.extend(rows);
    }
    Ok(peers)
}

pub async fn has_acted_on(
    user: &ConnectId,
    target: &ConnectId,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM ledger_peers WHERE user_id = $1 AND peer_id = $2 AND relation IN ('Like', 'Pass') LIMIT 1",
    )
    .bind(user)
    .bind(target)
    .fetch_optional(conn)
    .await?;
    Ok(found.is_some())
}
