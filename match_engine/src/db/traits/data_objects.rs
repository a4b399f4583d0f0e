use crate::db_types::{Decision, Match, MatchStatus};

/// The result of recording a like in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLikeResult {
    /// The like is recorded (or was already present). `mutual` is true if the target also likes the user.
    Recorded { mutual: bool },
    /// The user already passed on the target. Nothing was changed.
    PreviouslyPassed,
}

/// The result of recording a pass in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordPassResult {
    /// The pass is recorded (or was already present).
    Recorded,
    /// The user already liked the target. Nothing was changed.
    PreviouslyLiked,
}

/// The result of materializing a match and its conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertMatchResult {
    /// A new match and conversation were created in this call.
    Inserted(Match),
    /// An active match already existed for the pair and is returned unchanged.
    AlreadyExists(Match),
    /// A match exists for the pair, but it has been closed. No re-match is possible.
    Closed(Match),
    /// A match is stored under the pair key, but its participants are not the requested pair. Nothing was written.
    ParticipantMismatch(Match),
}

/// The result of a status transition on a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdateResult {
    /// The match moved from `old_status` to the status in the returned match.
    Updated { old_status: MatchStatus, updated: Match },
    /// The match already had the requested status. Nothing was changed.
    Unchanged(Match),
    /// The match is closed with a different status. Closed matches are terminal.
    Closed(Match),
    /// The requesting user is not one of the participants.
    NotParticipant,
    /// There is no match with the given id.
    NotFound,
}

/// The result of appending a daily entry to a delivery queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertEntryResult {
    /// The entry was created with the given number of candidates.
    Inserted(usize),
    /// An entry for the date already exists. Nothing was changed.
    AlreadyExists,
}

/// The per-decision outcome of marking candidates as viewed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkViewedOutcome {
    /// The candidate was flipped from unviewed to viewed
    Marked(Decision),
    /// The candidate had already been viewed. This is not an error.
    AlreadyViewed(Decision),
    /// The peer is not in the user's queue.
    NotFound,
}
