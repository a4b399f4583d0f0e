use std::path::Path;

use anyhow::{Context, Result};
use connect_common::ConnectId;
use match_engine::db_types::Profile;
use serde::{Deserialize, Serialize};

/// Test data for a local database: profiles, plus optional blocks between them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedFile {
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub blocks: Vec<SeedBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedBlock {
    pub blocker: ConnectId,
    pub blocked: ConnectId,
}

impl SeedFile {
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))?;
        let seed = serde_json::from_str(&data).with_context(|| format!("{} is not a valid seed file", path.display()))?;
        Ok(seed)
    }
}
