use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db_types::{ConnectId, DailyEntry, Decision, Match};

/// The result of [`crate::QueueApi::submit_decisions`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Decisions that were located in the queue and recorded in the ledger
    pub actions_processed: usize,
    /// Matches created by this call
    pub new_matches: usize,
    /// Peers that like the user back, in the order the decisions were supplied
    pub matched_peer_ids: Vec<ConnectId>,
    /// Peers that are not in the user's queue. Their decisions were skipped.
    pub not_found_peer_ids: Vec<ConnectId>,
    /// Peers on which the user had already made the opposite decision
    pub rejected_peer_ids: Vec<ConnectId>,
}

/// The result of recording a like.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeOutcome {
    pub is_mutual_match: bool,
    /// Set only when this like created the match
    pub new_match: Option<Match>,
}

impl LikeOutcome {
    pub fn one_sided() -> Self {
        Self { is_mutual_match: false, new_match: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchOutcome {
    /// A new entry with this many candidates was appended
    Generated(usize),
    /// The user already has an entry for the date
    AlreadyPresent,
}

/// Totals from a [`crate::BatchApi::run_daily_batches`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRunSummary {
    pub generated: usize,
    pub already_present: usize,
    pub failed: usize,
}

/// Progress through one day's batch, from [`crate::QueueApi::queue_status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub user_id: ConnectId,
    pub date: NaiveDate,
    /// Whether an entry exists for `date`
    pub has_batch: bool,
    /// Every candidate of the entry has been viewed. Always false without an entry.
    pub completed: bool,
    pub candidates: usize,
    pub decided: usize,
    pub remaining: usize,
    /// Unviewed candidates across every entry in the queue
    pub pending_total: usize,
}

impl QueueStatus {
    pub fn new(user_id: ConnectId, date: NaiveDate, entry: Option<&DailyEntry>, pending_total: usize) -> Self {
        let candidates = entry.map(|e| e.candidates.len()).unwrap_or_default();
        let remaining = entry.map(|e| e.unviewed().count()).unwrap_or_default();
        Self {
            user_id,
            date,
            has_batch: entry.is_some(),
            completed: entry.is_some() && remaining == 0,
            candidates,
            decided: candidates - remaining,
            remaining,
            pending_total,
        }
    }
}

/// A summary of one daily entry in a user's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySummary {
    pub date: NaiveDate,
    pub candidates: usize,
    pub viewed: usize,
    pub likes: usize,
}

impl From<&DailyEntry> for EntrySummary {
    fn from(entry: &DailyEntry) -> Self {
        Self {
            date: entry.date,
            candidates: entry.candidates.len(),
            viewed: entry.candidates.iter().filter(|c| c.viewed).count(),
            likes: entry.candidates.iter().filter(|c| c.decision == Some(Decision::Like)).count(),
        }
    }
}

/// One page of a user's daily entries, newest first. Pages are numbered from zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub entries: Vec<EntrySummary>,
    pub page: usize,
    pub size: usize,
    pub total_entries: usize,
    pub total_pages: usize,
}
