use std::fmt::Display;

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::ConnectId;

pub const PAIR_KEY_SEPARATOR: char = '_';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PairKeyError {
    #[error("A user cannot be paired with themselves ({0})")]
    SamePeer(ConnectId),
    #[error("Pair keys need two non-empty identifiers")]
    EmptyIdentifier,
    #[error("{0} contains the pair key separator '_'")]
    ContainsSeparator(ConnectId),
}

//--------------------------------------      PairKey        ---------------------------------------------------------
/// The deterministic identifier of an unordered pair of users.
///
/// The key is `min(a, b) + "_" + max(a, b)`, so `PairKey::new(a, b) == PairKey::new(b, a)`. It is used as the
/// identifier of both the `Match` and the `Conversation` for the pair, which makes re-creation checks a simple key
/// lookup. Identifiers containing the separator are rejected, otherwise `(a_b, c)` and `(a, b_c)` would share a key.
#[derive(Clone, Debug, Type, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct PairKey(String);

impl PairKey {
    pub fn new(a: &ConnectId, b: &ConnectId) -> Result<Self, PairKeyError> {
        if a.is_empty() || b.is_empty() {
            return Err(PairKeyError::EmptyIdentifier);
        }
        if let Some(id) = [a, b].into_iter().find(|id| id.as_str().contains(PAIR_KEY_SEPARATOR)) {
            return Err(PairKeyError::ContainsSeparator(id.clone()));
        }
        if a == b {
            return Err(PairKeyError::SamePeer(a.clone()));
        }
        let (first, second) = Self::ordered(a, b);
        Ok(Self(format!("{first}{PAIR_KEY_SEPARATOR}{second}")))
    }

    /// Returns the two identifiers in the order used to build the key: lexicographically smaller first.
    pub fn ordered<'a>(a: &'a ConnectId, b: &'a ConnectId) -> (&'a ConnectId, &'a ConnectId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for PairKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wraps an existing key, e.g. a match id supplied by a client. No validation is performed.
impl From<String> for PairKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PairKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
