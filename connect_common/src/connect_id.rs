use std::{borrow::Borrow, fmt::Display};

use serde::{Deserialize, Serialize};
use sqlx::Type;

//--------------------------------------     ConnectId       ---------------------------------------------------------
/// A lightweight wrapper around the string identifier of a Connect user.
#[derive(Clone, Debug, Default, Type, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct ConnectId(String);

impl ConnectId {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Display for ConnectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ConnectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ConnectId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&String> for ConnectId {
    fn from(value: &String) -> Self {
        Self(value.clone())
    }
}

impl Borrow<str> for ConnectId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for ConnectId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}
