use connect_common::PairKeyError;
use thiserror::Error;

use crate::{
    db::traits::StoreError,
    db_types::{ConnectId, Decision, MatchStatus, PairKey},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchEngineError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("{0} does not have a delivery queue")]
    QueueNotFound(ConnectId),
    #[error("{user} is not a participant of match {match_id}")]
    NotParticipant { match_id: PairKey, user: ConnectId },
    #[error("{0} cannot act on themselves")]
    SelfAction(ConnectId),
    #[error("Invalid user pair. {0}")]
    InvalidPair(PairKeyError),
    #[error("{user} already decided {previous} on {target}. The first decision is final.")]
    ConflictingAction { user: ConnectId, target: ConnectId, previous: Decision },
    #[error("Match {match_id} is {status} and cannot be changed or re-created")]
    MatchClosed { match_id: PairKey, status: MatchStatus },
    #[error("The action ledger is unavailable. The action was not recorded. {0}")]
    LedgerUnavailable(String),
    #[error("Temporary storage failure. Please try again. {0}")]
    TransientStoreError(String),
    #[error("Inconsistent state for pair {0}. Operator reconciliation is required.")]
    Inconsistent(PairKey),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl MatchEngineError {
    /// Whether the caller may retry the request unchanged. Every retried operation is idempotent.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LedgerUnavailable(_) | Self::TransientStoreError(_))
    }

    pub fn from_store<E: StoreError>(e: E) -> Self {
        if e.is_transient() {
            Self::TransientStoreError(e.to_string())
        } else {
            Self::DatabaseError(e.to_string())
        }
    }

    pub fn from_ledger_store<E: StoreError>(e: E) -> Self {
        if e.is_transient() {
            Self::LedgerUnavailable(e.to_string())
        } else {
            Self::DatabaseError(e.to_string())
        }
    }
}

impl From<PairKeyError> for MatchEngineError {
    fn from(e: PairKeyError) -> Self {
        match e {
            PairKeyError::SamePeer(user) => Self::SelfAction(user),
            e => Self::InvalidPair(e),
        }
    }
}

/// Maps backend errors into [`MatchEngineError`]s, keeping track of whether the failure was transient.
pub trait StoreResultExt<T> {
    fn store_err(self) -> Result<T, MatchEngineError>;

    /// Like [`Self::store_err`], but transient failures are reported as [`MatchEngineError::LedgerUnavailable`].
    fn ledger_err(self) -> Result<T, MatchEngineError>;
}

impl<T, E: StoreError> StoreResultExt<T> for Result<T, E> {
    fn store_err(self) -> Result<T, MatchEngineError> {
        self.map_err(MatchEngineError::from_store)
    }

    fn ledger_err(self) -> Result<T, MatchEngineError> {
        self.map_err(MatchEngineError::from_ledger_store)
    }
}

#[cfg(test)]
mod test {
    use std::fmt::Display;

    use super::*;

    #[derive(Debug)]
    struct FakeError(bool);

    impl Display for FakeError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "fake error (transient: {})", self.0)
        }
    }

    impl std::error::Error for FakeError {}

    impl StoreError for FakeError {
        fn is_transient(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn transient_store_errors_are_retryable() {
        let e = Err::<(), _>(FakeError(true)).store_err().unwrap_err();
        assert!(matches!(e, MatchEngineError::TransientStoreError(_)));
        assert!(e.is_retryable());
        let e = Err::<(), _>(FakeError(true)).ledger_err().unwrap_err();
        assert!(matches!(e, MatchEngineError::LedgerUnavailable(_)));
        assert!(e.is_retryable());
    }

    #[test]
    fn permanent_store_errors_are_not_retryable() {
        let e = Err::<(), _>(FakeError(false)).ledger_err().unwrap_err();
        assert!(matches!(e, MatchEngineError::DatabaseError(_)));
        assert!(!e.is_retryable());
        assert!(!MatchEngineError::SelfAction("alice".into()).is_retryable());
    }

    #[test]
    fn pair_key_errors_map_to_request_errors() {
        let e = MatchEngineError::from(PairKeyError::SamePeer("alice".into()));
        assert_eq!(e, MatchEngineError::SelfAction("alice".into()));
        let e = MatchEngineError::from(PairKeyError::ContainsSeparator("a_b".into()));
        assert_eq!(e, MatchEngineError::InvalidPair(PairKeyError::ContainsSeparator("a_b".into())));
        assert!(!e.is_retryable());
    }
}
