//! Combatant profiles and the oracle that resolves them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use rbc_core::stats::AggregateInput;

use crate::error::{EngineError, Result};
use crate::session::BeltItem;

/// Everything needed to seat a character in a session: identity plus the
/// persistent layers of the stat aggregation input.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatantProfile {
    pub char_id: i64,
    pub name: String,
    pub ai: bool,
    pub stat_input: AggregateInput,
    pub abilities: Vec<String>,
    pub belt: Vec<BeltItem>,
    /// Arena rating used by matchmaking.
    pub rating: f64,
}

/// Resolves a character id to a full profile.
///
/// Matchmaking-created sessions only know char ids; the oracle supplies the
/// rest from whatever system owns characters.
#[async_trait]
pub trait ProfileOracle: Send + Sync {
    async fn profile(&self, char_id: i64) -> Result<CombatantProfile>;
}

/// In-memory oracle for tests and local runs.
#[derive(Default)]
pub struct StaticProfiles {
    profiles: RwLock<HashMap<i64, CombatantProfile>>,
}

impl StaticProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, profile: CombatantProfile) {
        if let Ok(mut map) = self.profiles.write() {
            map.insert(profile.char_id, profile);
        }
    }
}

#[async_trait]
impl ProfileOracle for StaticProfiles {
    async fn profile(&self, char_id: i64) -> Result<CombatantProfile> {
        self.profiles
            .read()
            .ok()
            .and_then(|map| map.get(&char_id).cloned())
            .ok_or(EngineError::ProfileUnavailable(char_id))
    }
}
