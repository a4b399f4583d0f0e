use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::{InsertMatchResult, MatchManagement, StatusUpdateResult},
    db_types::{ConnectId, Conversation, Match, MatchStatus, MatchTransition, PairKey},
    events::{EventProducers, EventType, MatchCreatedEvent, MatchStatusChangedEvent},
    me_api::errors::{MatchEngineError, StoreResultExt},
};

/// `MatchApi` materializes matches together with their conversations, and applies participant-requested status
/// changes.
///
/// Matches are keyed by the [`PairKey`] of their participants, which is also the id of the conversation. Creating a
/// match for a pair that already has one is idempotent. A closed match is never reactivated.
#[derive(Clone)]
pub struct MatchApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for MatchApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MatchApi")
    }
}

impl<B> MatchApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> MatchApi<B>
where B: MatchManagement
{
    /// Creates the match and conversation for `a` and `b`, or returns the existing active match for the pair.
    ///
    /// Fails with [`MatchEngineError::MatchClosed`] if the pair was matched before and the match has since been
    /// closed.
    pub async fn create_match(&self, a: &ConnectId, b: &ConnectId) -> Result<Match, MatchEngineError> {
        match self.materialize(a, b).await? {
            InsertMatchResult::Inserted(m) | InsertMatchResult::AlreadyExists(m) => Ok(m),
            InsertMatchResult::Closed(m) => Err(MatchEngineError::MatchClosed { match_id: m.id, status: m.status }),
            InsertMatchResult::ParticipantMismatch(m) => Err(MatchEngineError::Inconsistent(m.id)),
        }
    }

    /// Writes the match and conversation for the pair, and notifies both participants if this call created them.
    pub async fn materialize(&self, a: &ConnectId, b: &ConnectId) -> Result<InsertMatchResult, MatchEngineError> {
        PairKey::new(a, b)?;
        let result = self.db.insert_match(a, b).await.store_err()?;
        match &result {
            InsertMatchResult::Inserted(m) => {
                info!("💞️ New match {} between {} and {}", m.id, m.user1_id, m.user2_id);
                self.notify_match(m);
            },
            InsertMatchResult::AlreadyExists(m) => trace!("💞️ Match {} already exists", m.id),
            InsertMatchResult::Closed(m) => debug!("💞️ Match {} is {}. It will not be re-created.", m.id, m.status),
            InsertMatchResult::ParticipantMismatch(m) => error!(
                "💞️ Match {} is stored for {} and {}, not for {a} and {b}. Operator reconciliation is required.",
                m.id, m.user1_id, m.user2_id
            ),
        }
        Ok(result)
    }

    fn notify_match(&self, m: &Match) {
        for event in MatchCreatedEvent::for_participants(m) {
            self.producers.publish(EventType::MatchCreated(event));
        }
    }

    pub async fn unmatch(&self, match_id: &PairKey, by: &ConnectId) -> Result<Match, MatchEngineError> {
        self.transition(match_id, by, MatchTransition::Unmatch).await
    }

    pub async fn block(&self, match_id: &PairKey, by: &ConnectId) -> Result<Match, MatchEngineError> {
        self.transition(match_id, by, MatchTransition::Block).await
    }

    pub async fn report(&self, match_id: &PairKey, by: &ConnectId, reason: &str) -> Result<Match, MatchEngineError> {
        self.transition(match_id, by, MatchTransition::Report { reason: reason.to_string() }).await
    }

    async fn transition(
        &self,
        match_id: &PairKey,
        by: &ConnectId,
        transition: MatchTransition,
    ) -> Result<Match, MatchEngineError> {
        let result = self.db.update_match_status(match_id, by, &transition).await.store_err()?;
        match result {
            StatusUpdateResult::Updated { old_status, updated } => {
                info!("💞️ {by} requested {transition} on match {match_id}. It is now {}.", updated.status);
                let event = MatchStatusChangedEvent::new(&updated, by.clone(), old_status);
                self.producers.publish(EventType::MatchStatusChanged(event));
                Ok(updated)
            },
            StatusUpdateResult::Unchanged(m) => {
                debug!("💞️ Match {match_id} is already {}. Nothing to do.", m.status);
                Ok(m)
            },
            StatusUpdateResult::Closed(m) => {
                Err(MatchEngineError::MatchClosed { match_id: match_id.clone(), status: m.status })
            },
            StatusUpdateResult::NotParticipant => {
                warn!("💞️ {by} tried to {transition} match {match_id} but is not one of its participants");
                Err(MatchEngineError::NotParticipant { match_id: match_id.clone(), user: by.clone() })
            },
            StatusUpdateResult::NotFound => Err(MatchEngineError::NotFound(format!("match {match_id}"))),
        }
    }

    pub async fn get_match(&self, match_id: &PairKey) -> Result<Match, MatchEngineError> {
        self.db
            .fetch_match(match_id)
            .await
            .store_err()?
            .ok_or_else(|| MatchEngineError::NotFound(format!("match {match_id}")))
    }

    /// Fetches the conversation with the given id. A match without its conversation is reported as
    /// [`MatchEngineError::Inconsistent`].
    pub async fn get_conversation(&self, conversation_id: &PairKey) -> Result<Conversation, MatchEngineError> {
        if let Some(conversation) = self.db.fetch_conversation(conversation_id).await.store_err()? {
            return Ok(conversation);
        }
        match self.db.fetch_match(conversation_id).await.store_err()? {
            Some(m) => {
                error!(
                    "💞️ Match {} between {} and {} has no conversation. Operator reconciliation is required.",
                    m.id, m.user1_id, m.user2_id
                );
                Err(MatchEngineError::Inconsistent(m.id))
            },
            None => Err(MatchEngineError::NotFound(format!("conversation {conversation_id}"))),
        }
    }

    pub async fn matches_for_user(
        &self,
        user: &ConnectId,
        status: Option<MatchStatus>,
    ) -> Result<Vec<Match>, MatchEngineError> {
        self.db.fetch_matches_for_user(user, status).await.store_err()
    }

    /// Lists pair keys that have a match without a conversation, or a conversation without a match.
    pub async fn audit_consistency(&self) -> Result<Vec<PairKey>, MatchEngineError> {
        let pairs = self.db.fetch_inconsistent_pairs().await.store_err()?;
        for pair in &pairs {
            error!("💞️ Pair {pair} has a match or a conversation, but not both. Operator reconciliation is required.");
        }
        if pairs.is_empty() {
            info!("💞️ All matches and conversations are consistent");
        }
        Ok(pairs)
    }
}
