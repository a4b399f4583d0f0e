use std::{collections::BTreeSet, fmt::Display, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
pub use connect_common::{ConnectId, PairKey, PairKeyError};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {kind}: {value}")]
pub struct ConversionError {
    kind: &'static str,
    value: String,
}

impl ConversionError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

//--------------------------------------   LedgerRelation    ---------------------------------------------------------
/// The set inside an [`ActionLedgerRecord`] that a peer identifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type)]
pub enum LedgerRelation {
    /// The owner of the ledger liked the peer
    Like,
    /// The owner of the ledger passed on the peer
    Pass,
    /// The peer liked the owner of the ledger
    LikedBy,
    /// The owner and the peer like each other
    Match,
}

impl Display for LedgerRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerRelation::Like => write!(f, "Like"),
            LedgerRelation::Pass => write!(f, "Pass"),
            LedgerRelation::LikedBy => write!(f, "LikedBy"),
            LedgerRelation::Match => write!(f, "Match"),
        }
    }
}

impl FromStr for LedgerRelation {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Like" => Ok(Self::Like),
            "Pass" => Ok(Self::Pass),
            "LikedBy" => Ok(Self::LikedBy),
            "Match" => Ok(Self::Match),
            _ => Err(ConversionError::new("LedgerRelation", s)),
        }
    }
}

//--------------------------------------  ActionLedgerRecord  ---------------------------------------------------------
/// The per-user record of likes, passes, matches and incoming likes.
///
/// Invariants maintained by the ledger:
/// * `likes` and `passes` are disjoint.
/// * `matches` is a subset of `likes`.
/// * if B is in A's `matches`, A is in B's `matches`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLedgerRecord {
    pub user_id: ConnectId,
    pub likes: BTreeSet<ConnectId>,
    pub passes: BTreeSet<ConnectId>,
    pub liked_by: BTreeSet<ConnectId>,
    pub matches: BTreeSet<ConnectId>,
    pub last_updated: DateTime<Utc>,
}

impl ActionLedgerRecord {
    pub fn new(user_id: ConnectId, last_updated: DateTime<Utc>) -> Self {
        Self {
            user_id,
            likes: BTreeSet::new(),
            passes: BTreeSet::new(),
            liked_by: BTreeSet::new(),
            matches: BTreeSet::new(),
            last_updated,
        }
    }

    pub fn set_mut(&mut self, relation: LedgerRelation) -> &mut BTreeSet<ConnectId> {
        match relation {
            LedgerRelation::Like => &mut self.likes,
            LedgerRelation::Pass => &mut self.passes,
            LedgerRelation::LikedBy => &mut self.liked_by,
            LedgerRelation::Match => &mut self.matches,
        }
    }

    /// Every peer this user has decided on, i.e. `likes ∪ passes`.
    pub fn acted_on(&self) -> BTreeSet<ConnectId> {
        self.likes.union(&self.passes).cloned().collect()
    }

    pub fn has_acted_on(&self, peer: &ConnectId) -> bool {
        self.likes.contains(peer) || self.passes.contains(peer)
    }
}

//--------------------------------------      Decision       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum Decision {
    Like,
    Pass,
}

impl Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Like => write!(f, "LIKE"),
            Decision::Pass => write!(f, "PASS"),
        }
    }
}

impl FromStr for Decision {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LIKE" => Ok(Self::Like),
            "PASS" => Ok(Self::Pass),
            _ => Err(ConversionError::new("Decision", s)),
        }
    }
}

/// A decision made by the owner of a queue on one of the candidates offered to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerDecision {
    pub peer_id: ConnectId,
    pub decision: Decision,
}

impl PeerDecision {
    pub fn new<S: Into<ConnectId>>(peer_id: S, decision: Decision) -> Self {
        Self { peer_id: peer_id.into(), decision }
    }

    pub fn like<S: Into<ConnectId>>(peer_id: S) -> Self {
        Self::new(peer_id, Decision::Like)
    }

    pub fn pass<S: Into<ConnectId>>(peer_id: S) -> Self {
        Self::new(peer_id, Decision::Pass)
    }
}

//--------------------------------------     MatchStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum MatchStatus {
    #[sqlx(rename = "ACTIVE")]
    #[serde(rename = "ACTIVE")]
    Active,
    #[sqlx(rename = "UNMATCHED")]
    #[serde(rename = "UNMATCHED")]
    Unmatched,
    #[sqlx(rename = "BLOCKED_BY_USER1")]
    #[serde(rename = "BLOCKED_BY_USER1")]
    BlockedByUser1,
    #[sqlx(rename = "BLOCKED_BY_USER2")]
    #[serde(rename = "BLOCKED_BY_USER2")]
    BlockedByUser2,
    #[sqlx(rename = "REPORTED")]
    #[serde(rename = "REPORTED")]
    Reported,
}

impl MatchStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, MatchStatus::Active)
    }

    /// The status the conversation of a match takes when the match moves to this status.
    pub fn conversation_status(&self) -> ConversationStatus {
        match self {
            MatchStatus::Active => ConversationStatus::Active,
            MatchStatus::Unmatched => ConversationStatus::Unmatched,
            MatchStatus::BlockedByUser1 | MatchStatus::BlockedByUser2 | MatchStatus::Reported => {
                ConversationStatus::Blocked
            },
        }
    }
}

impl Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchStatus::Active => write!(f, "ACTIVE"),
            MatchStatus::Unmatched => write!(f, "UNMATCHED"),
            MatchStatus::BlockedByUser1 => write!(f, "BLOCKED_BY_USER1"),
            MatchStatus::BlockedByUser2 => write!(f, "BLOCKED_BY_USER2"),
            MatchStatus::Reported => write!(f, "REPORTED"),
        }
    }
}

impl FromStr for MatchStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "UNMATCHED" => Ok(Self::Unmatched),
            "BLOCKED_BY_USER1" => Ok(Self::BlockedByUser1),
            "BLOCKED_BY_USER2" => Ok(Self::BlockedByUser2),
            "REPORTED" => Ok(Self::Reported),
            _ => Err(ConversionError::new("MatchStatus", s)),
        }
    }
}

//--------------------------------------  ConversationStatus ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum ConversationStatus {
    Active,
    Unmatched,
    Blocked,
}

impl Display for ConversationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversationStatus::Active => write!(f, "ACTIVE"),
            ConversationStatus::Unmatched => write!(f, "UNMATCHED"),
            ConversationStatus::Blocked => write!(f, "BLOCKED"),
        }
    }
}

//--------------------------------------        Match        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Match {
    pub id: PairKey,
    /// The lexicographically smaller of the two participant ids
    pub user1_id: ConnectId,
    /// The lexicographically larger of the two participant ids
    pub user2_id: ConnectId,
    pub status: MatchStatus,
    pub conversation_id: Option<PairKey>,
    pub matched_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl Match {
    pub fn is_participant(&self, user: &ConnectId) -> bool {
        &self.user1_id == user || &self.user2_id == user
    }

    /// Returns the other participant, or `None` if `user` is not part of this match.
    pub fn other_participant(&self, user: &ConnectId) -> Option<&ConnectId> {
        if &self.user1_id == user {
            Some(&self.user2_id)
        } else if &self.user2_id == user {
            Some(&self.user1_id)
        } else {
            None
        }
    }
}

//--------------------------------------   MatchTransition   ---------------------------------------------------------
/// A status change on a match, requested by one of its participants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchTransition {
    Unmatch,
    Block,
    Report { reason: String },
}

impl MatchTransition {
    /// The status `m` ends up in when `by` requests this transition. `by` must be a participant of `m`.
    pub fn target_status(&self, m: &Match, by: &ConnectId) -> MatchStatus {
        match self {
            MatchTransition::Unmatch => MatchStatus::Unmatched,
            MatchTransition::Block if &m.user1_id == by => MatchStatus::BlockedByUser1,
            MatchTransition::Block => MatchStatus::BlockedByUser2,
            MatchTransition::Report { .. } => MatchStatus::Reported,
        }
    }
}

impl Display for MatchTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchTransition::Unmatch => write!(f, "unmatch"),
            MatchTransition::Block => write!(f, "block"),
            MatchTransition::Report { reason } => write!(f, "report ({reason})"),
        }
    }
}

//--------------------------------------    Conversation     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Conversation {
    pub id: PairKey,
    pub match_id: PairKey,
    pub participant1_id: ConnectId,
    pub participant2_id: ConnectId,
    pub status: ConversationStatus,
    pub unread_count: i64,
    pub matched_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn participant_ids(&self) -> [&ConnectId; 2] {
        [&self.participant1_id, &self.participant2_id]
    }
}

//--------------------------------------    Delivery queue   ---------------------------------------------------------
/// A ranked candidate, ready to be appended to a delivery queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCandidate {
    pub peer_id: ConnectId,
    pub compatibility_score: f64,
    pub stability_rank: i64,
}

/// A candidate as stored in a user's delivery queue.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct QueuedCandidate {
    pub entry_date: NaiveDate,
    pub peer_id: ConnectId,
    pub compatibility_score: f64,
    pub stability_rank: i64,
    pub viewed: bool,
    pub decision: Option<Decision>,
}

/// One day's worth of candidates for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyEntry {
    pub date: NaiveDate,
    pub candidates: Vec<QueuedCandidate>,
}

impl DailyEntry {
    pub fn unviewed(&self) -> impl Iterator<Item = &QueuedCandidate> {
        self.candidates.iter().filter(|c| !c.viewed)
    }
}

/// The delivery queue of a user: daily entries in ascending date order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryQueue {
    pub user_id: ConnectId,
    pub daily_entries: Vec<DailyEntry>,
    pub updated_at: DateTime<Utc>,
}

impl DeliveryQueue {
    pub fn entry_for(&self, date: NaiveDate) -> Option<&DailyEntry> {
        self.daily_entries.iter().find(|e| e.date == date)
    }

    pub fn unviewed_count(&self) -> usize {
        self.daily_entries.iter().map(|e| e.unviewed().count()).sum()
    }
}

//--------------------------------------       Profile       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    NonBinary,
}

impl Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gender::Male => write!(f, "MALE"),
            Gender::Female => write!(f, "FEMALE"),
            Gender::NonBinary => write!(f, "NON_BINARY"),
        }
    }
}

impl FromStr for Gender {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MALE" | "MAN" | "M" => Ok(Self::Male),
            "FEMALE" | "WOMAN" | "F" => Ok(Self::Female),
            "NON_BINARY" | "NONBINARY" | "NB" => Ok(Self::NonBinary),
            _ => Err(ConversionError::new("Gender", s)),
        }
    }
}

/// Who a user would like to be matched with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// `None` means any gender
    #[serde(default)]
    pub preferred_gender: Option<Gender>,
    pub min_age: i64,
    pub max_age: i64,
    #[serde(default)]
    pub max_distance_km: Option<f64>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self { preferred_gender: None, min_age: 18, max_age: 99, max_distance_km: None }
    }
}

/// The slice of a user profile the matching core reads. Profiles are owned by the profile service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: ConnectId,
    pub name: String,
    pub age: i64,
    pub gender: Gender,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Profile {
    pub fn new<S: Into<ConnectId>>(user_id: S, name: &str, age: i64, gender: Gender) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.to_string(),
            age,
            gender,
            location: None,
            latitude: None,
            longitude: None,
            interests: Vec::new(),
            preferences: Preferences::default(),
            active: true,
        }
    }

    pub fn with_location(mut self, location: &str) -> Self {
        self.location = Some(location.to_string());
        self
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn with_interests(mut self, interests: &[&str]) -> Self {
        self.interests = interests.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_match() -> Match {
        let now = Utc::now();
        Match {
            id: PairKey::from("alice_bob"),
            user1_id: "alice".into(),
            user2_id: "bob".into(),
            status: MatchStatus::Active,
            conversation_id: Some(PairKey::from("alice_bob")),
            matched_at: now,
            last_activity_at: now,
        }
    }

    #[test]
    fn block_status_depends_on_who_blocks() {
        let m = sample_match();
        assert_eq!(MatchTransition::Block.target_status(&m, &"alice".into()), MatchStatus::BlockedByUser1);
        assert_eq!(MatchTransition::Block.target_status(&m, &"bob".into()), MatchStatus::BlockedByUser2);
        assert_eq!(MatchTransition::Unmatch.target_status(&m, &"bob".into()), MatchStatus::Unmatched);
        let report = MatchTransition::Report { reason: "spam".into() };
        assert_eq!(report.target_status(&m, &"alice".into()), MatchStatus::Reported);
    }

    #[test]
    fn closed_matches_close_their_conversation() {
        assert_eq!(MatchStatus::Active.conversation_status(), ConversationStatus::Active);
        assert_eq!(MatchStatus::Unmatched.conversation_status(), ConversationStatus::Unmatched);
        assert_eq!(MatchStatus::BlockedByUser2.conversation_status(), ConversationStatus::Blocked);
        assert_eq!(MatchStatus::Reported.conversation_status(), ConversationStatus::Blocked);
    }

    #[test]
    fn participants() {
        let m = sample_match();
        assert!(m.is_participant(&"bob".into()));
        assert!(!m.is_participant(&"carol".into()));
        assert_eq!(m.other_participant(&"alice".into()), Some(&ConnectId::from("bob")));
        assert_eq!(m.other_participant(&"carol".into()), None);
    }

    #[test]
    fn match_status_round_trips_through_strings() {
        for s in ["ACTIVE", "UNMATCHED", "BLOCKED_BY_USER1", "BLOCKED_BY_USER2", "REPORTED"] {
            assert_eq!(MatchStatus::from_str(s).unwrap().to_string(), s);
        }
        assert!(MatchStatus::from_str("active").is_err());
    }

    #[test]
    fn decisions_parse_case_insensitively() {
        assert_eq!(Decision::from_str("like").unwrap(), Decision::Like);
        assert_eq!(Decision::from_str(" PASS ").unwrap(), Decision::Pass);
        assert!(Decision::from_str("superlike").is_err());
    }

    #[test]
    fn acted_on_is_union_of_likes_and_passes() {
        let mut record = ActionLedgerRecord::new("alice".into(), Utc::now());
        record.set_mut(LedgerRelation::Like).insert("bob".into());
        record.set_mut(LedgerRelation::Pass).insert("carol".into());
        record.set_mut(LedgerRelation::LikedBy).insert("dave".into());
        let acted = record.acted_on();
        assert_eq!(acted.len(), 2);
        assert!(record.has_acted_on(&"carol".into()));
        assert!(!record.has_acted_on(&"dave".into()));
    }
}
