//! Candidate filtering and ranking for the daily batch.
//!
//! A candidate is compatible with a user when it sits inside the user's age range, has the preferred gender (if the
//! user has one), and, when both have coordinates and the user set a maximum distance, lives close enough. Compatible
//! candidates are scored in `[0, 1]` as a weighted sum of interest overlap, age proximity and location.
use std::collections::HashSet;

use crate::db_types::{NewCandidate, Profile};

pub const INTEREST_WEIGHT: f64 = 0.5;
pub const AGE_WEIGHT: f64 = 0.3;
pub const LOCATION_WEIGHT: f64 = 0.2;

/// An age gap of this many years or more scores zero for age proximity.
const AGE_GAP_CEILING: f64 = 10.0;
/// Distance scale used for the location score when the user has not set a maximum distance.
const DEFAULT_DISTANCE_SCALE_KM: f64 = 100.0;
const EARTH_RADIUS_KM: f64 = 6371.0;

pub fn is_compatible(user: &Profile, candidate: &Profile) -> bool {
    let prefs = &user.preferences;
    if candidate.age < prefs.min_age || candidate.age > prefs.max_age {
        return false;
    }
    if prefs.preferred_gender.is_some_and(|g| g != candidate.gender) {
        return false;
    }
    match (prefs.max_distance_km, user.coordinates(), candidate.coordinates()) {
        (Some(max), Some(a), Some(b)) => haversine_km(a, b) <= max,
        _ => true,
    }
}

/// Great-circle distance between two `(latitude, longitude)` points, in kilometres.
pub fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Jaccard similarity of the two interest lists, ignoring case and surrounding whitespace.
pub fn interest_overlap(a: &[String], b: &[String]) -> f64 {
    let normalize = |v: &[String]| -> HashSet<String> {
        v.iter().map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty()).collect()
    };
    let a: HashSet<String> = normalize(a);
    let b: HashSet<String> = normalize(b);
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

pub fn age_proximity(a: i64, b: i64) -> f64 {
    let gap = (a - b).abs() as f64;
    (1.0 - gap / AGE_GAP_CEILING).max(0.0)
}

/// Closeness by coordinates when both profiles have them, otherwise an exact (case-insensitive) match on the named
/// location.
pub fn location_score(user: &Profile, candidate: &Profile) -> f64 {
    if let (Some(a), Some(b)) = (user.coordinates(), candidate.coordinates()) {
        let scale = user.preferences.max_distance_km.filter(|d| *d > 0.0).unwrap_or(DEFAULT_DISTANCE_SCALE_KM);
        return (1.0 - haversine_km(a, b) / scale).max(0.0);
    }
    match (&user.location, &candidate.location) {
        (Some(a), Some(b)) if a.trim().eq_ignore_ascii_case(b.trim()) => 1.0,
        _ => 0.0,
    }
}

pub fn compatibility_score(user: &Profile, candidate: &Profile) -> f64 {
    INTEREST_WEIGHT * interest_overlap(&user.interests, &candidate.interests) +
        AGE_WEIGHT * age_proximity(user.age, candidate.age) +
        LOCATION_WEIGHT * location_score(user, candidate)
}

/// Filters, scores and ranks `candidates` for `user`, keeping the best `limit`.
///
/// Ties are broken by peer id, so the same inputs always produce the same ranking. `stability_rank` is the 1-based
/// position in the result.
pub fn rank_candidates(user: &Profile, candidates: &[Profile], limit: usize) -> Vec<NewCandidate> {
    let mut scored = candidates
        .iter()
        .filter(|c| c.user_id != user.user_id && c.active && is_compatible(user, c))
        .map(|c| (compatibility_score(user, c), c))
        .collect::<Vec<_>>();
    scored.sort_by(|(sa, a), (sb, b)| sb.total_cmp(sa).then_with(|| a.user_id.cmp(&b.user_id)));
    scored
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, (score, c))| NewCandidate {
            peer_id: c.user_id.clone(),
            compatibility_score: score,
            stability_rank: i as i64 + 1,
        })
        .collect()
}
