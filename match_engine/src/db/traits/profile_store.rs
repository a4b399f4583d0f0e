use std::collections::HashSet;

use crate::{
    db::traits::StoreError,
    db_types::{ConnectId, Profile},
};

/// A read-only view of the profile service. Lookups have no side effects.
#[allow(async_fn_in_trait)]
pub trait ProfileStore: Clone {
    type Error: StoreError;

    async fn find_profile(&self, user: &ConnectId) -> Result<Option<Profile>, Self::Error>;

    /// Returns every active profile whose id is not in `excluding`.
    async fn list_candidates(&self, excluding: &HashSet<ConnectId>) -> Result<Vec<Profile>, Self::Error>;
}

/// A read-only view of the safety service's block list.
///
/// Blocking is symmetric for matching purposes: if either user blocked the other, they are never paired.
#[allow(async_fn_in_trait)]
pub trait SafetyManagement: Clone {
    type Error: StoreError;

    async fn is_blocked(&self, user: &ConnectId, peer: &ConnectId) -> Result<bool, Self::Error>;

    async fn fetch_blocked_peers(&self, user: &ConnectId) -> Result<HashSet<ConnectId>, Self::Error>;
}
