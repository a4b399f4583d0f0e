use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db_types::{ConnectId, Match, MatchStatus, PairKey};

/// Published once for each participant of a newly created match. `user_id` is the user to notify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCreatedEvent {
    pub user_id: ConnectId,
    pub peer_id: ConnectId,
    pub match_id: PairKey,
}

impl MatchCreatedEvent {
    pub fn new(user_id: ConnectId, peer_id: ConnectId, match_id: PairKey) -> Self {
        Self { user_id, peer_id, match_id }
    }

    /// One event per participant of `m`.
    pub fn for_participants(m: &Match) -> [Self; 2] {
        [
            Self::new(m.user1_id.clone(), m.user2_id.clone(), m.id.clone()),
            Self::new(m.user2_id.clone(), m.user1_id.clone(), m.id.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStatusChangedEvent {
    pub match_id: PairKey,
    pub changed_by: ConnectId,
    pub old_status: MatchStatus,
    pub new_status: MatchStatus,
}

impl MatchStatusChangedEvent {
    pub fn new(m: &Match, changed_by: ConnectId, old_status: MatchStatus) -> Self {
        Self { match_id: m.id.clone(), changed_by, old_status, new_status: m.status }
    }
}

/// A new daily entry with at least one candidate is waiting for `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchGeneratedEvent {
    pub user_id: ConnectId,
    pub date: NaiveDate,
    pub candidate_count: usize,
}

impl BatchGeneratedEvent {
    pub fn new(user_id: ConnectId, date: NaiveDate, candidate_count: usize) -> Self {
        Self { user_id, date, candidate_count }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    MatchCreated(MatchCreatedEvent),
    MatchStatusChanged(MatchStatusChangedEvent),
    BatchGenerated(BatchGeneratedEvent),
}
