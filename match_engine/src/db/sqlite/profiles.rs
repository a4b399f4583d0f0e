//! The local read model of the profile and safety services.
use std::collections::HashSet;

use chrono::Utc;
use log::trace;
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{ConnectId, Gender, Preferences, Profile},
};

#[derive(Debug, FromRow)]
struct ProfileRow {
    user_id: ConnectId,
    name: String,
    age: i64,
    gender: Gender,
    location: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    interests: String,
    preferred_gender: Option<Gender>,
    min_age: i64,
    max_age: i64,
    max_distance_km: Option<f64>,
    active: bool,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = SqliteDatabaseError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let interests = serde_json::from_str::<Vec<String>>(&row.interests)
            .map_err(|e| SqliteDatabaseError::ProfileDecodeError(row.user_id.to_string(), e.to_string()))?;
        Ok(Profile {
            user_id: row.user_id,
            name: row.name,
            age: row.age,
            gender: row.gender,
            location: row.location,
            latitude: row.latitude,
            longitude: row.longitude,
            interests,
            preferences: Preferences {
                preferred_gender: row.preferred_gender,
                min_age: row.min_age,
                max_age: row.max_age,
                max_distance_km: row.max_distance_km,
            },
            active: row.active,
        })
    }
}

const PROFILE_COLUMNS: &str = "user_id, name, age, gender, location, latitude, longitude, interests, \
                               preferred_gender, min_age, max_age, max_distance_km, active";

pub async fn upsert_profile(profile: &Profile, conn: &mut SqliteConnection) -> Result<(), SqliteDatabaseError> {
    let interests =
        serde_json::to_string(&profile.interests).map_err(|e| SqliteDatabaseError::QueryError(e.to_string()))?;
    sqlx::query(
        r#"
        INSERT INTO profiles (user_id, name, age, gender, location, latitude, longitude, interests, preferred_gender,
            min_age, max_age, max_distance_km, active, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        ON CONFLICT (user_id) DO UPDATE SET
            name = excluded.name,
            age = excluded.age,
            gender = excluded.gender,
            location = excluded.location,
            latitude = excluded.latitude,
            longitude = excluded.longitude,
            interests = excluded.interests,
            preferred_gender = excluded.preferred_gender,
            min_age = excluded.min_age,
            max_age = excluded.max_age,
            max_distance_km = excluded.max_distance_km,
            active = excluded.active,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&profile.user_id)
    .bind(&profile.name)
    .bind(profile.age)
    .bind(profile.gender)
    .bind(&profile.location)
    .bind(profile.latitude)
    .bind(profile.longitude)
    .bind(interests)
    .bind(profile.preferences.preferred_gender)
    .bind(profile.preferences.min_age)
    .bind(profile.preferences.max_age)
    .bind(profile.preferences.max_distance_km)
    .bind(profile.active)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    trace!("🧑️ Profile for {} saved", profile.user_id);
    Ok(())
}

pub async fn fetch_profile(
    user: &ConnectId,
    conn: &mut SqliteConnection,
) -> Result<Option<Profile>, SqliteDatabaseError> {
    let row: Option<ProfileRow> = sqlx::query_as(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"))
        .bind(user)
        .fetch_optional(conn)
        .await?;
    row.map(Profile::try_from).transpose()
}

/// Fetches all active profiles, except those in `excluding`, in ascending id order.
pub async fn fetch_active_profiles(
    excluding: &HashSet<ConnectId>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Profile>, SqliteDatabaseError> {
    let rows: Vec<ProfileRow> =
        sqlx::query_as(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE active = 1 ORDER BY user_id"))
            .fetch_all(conn)
            .await?;
    rows.into_iter().filter(|r| !excluding.contains(&r.user_id)).map(Profile::try_from).collect()
}

pub async fn insert_block(
    blocker: &ConnectId,
    blocked: &ConnectId,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        "INSERT INTO user_blocks (blocker_id, blocked_id, created_at) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
    )
    .bind(blocker)
    .bind(blocked)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    Ok(())
}

/// Whether either user has blocked the other.
pub async fn is_blocked(
    user: &ConnectId,
    peer: &ConnectId,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let found: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT 1 FROM user_blocks
        WHERE (blocker_id = $1 AND blocked_id = $2) OR (blocker_id = $2 AND blocked_id = $1)
        LIMIT 1
        "#,
    )
    .bind(user)
    .bind(peer)
    .fetch_optional(conn)
    .await?;
    Ok(found.is_some())
}

/// Every user that `user` blocked, or that blocked `user`.
pub async fn fetch_blocked_peers(
    user: &ConnectId,
    conn: &mut SqliteConnection,
) -> Result<HashSet<ConnectId>, SqliteDatabaseError> {
    let peers: Vec<ConnectId> = sqlx::query_scalar(
        r#"
        SELECT blocked_id FROM user_blocks WHERE blocker_id = $1
        UNION
        SELECT blocker_id FROM user_blocks WHERE blocked_id = $1
        "#,
    )
    .bind(user)
    .fetch_all(conn)
    .await?;
    Ok(peers.into_iter().collect())
}
