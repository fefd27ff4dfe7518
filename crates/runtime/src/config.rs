//! Engine configuration shared across services and supervisors.

use std::time::Duration;

use rbc_core::CombatTables;

use crate::session::FighterState;

/// Optional per-exchange regeneration formula: returns (hp, energy) restored.
///
/// The exchange pipeline reserves a regeneration step; the formula is left to
/// configuration and defaults to none.
pub type RegenFormula = fn(&FighterState) -> (i64, i64);

/// Runtime configuration. `Default` reproduces the canonical balance.
#[derive(Clone)]
pub struct EngineConfig {
    /// Calculator caps and defaults.
    pub tables: CombatTables,

    /// Move deadline in seconds, indexed by AFK penalty level 0–4.
    pub move_timeouts: [u64; 5],

    /// Supervisor sleep after a cycle that resolved work.
    pub poll_busy: Duration,
    /// Supervisor sleep after an idle cycle.
    pub poll_idle: Duration,
    /// Supervisor sleep after an iteration error.
    pub error_backoff: Duration,

    /// Retention of meta/actors/logs keys after finalization.
    pub history_ttl: Duration,
    /// TTL of an arena match request record.
    pub request_ttl: Duration,
    /// Wait beyond which matchmaking falls back to a shadow opponent.
    pub matchmaking_timeout: Duration,

    /// Shadow opponent constants.
    pub shadow_hp: i64,
    pub shadow_energy: i64,

    /// Base tactical switch charges before the per-enemy bonus.
    pub base_switch_charges: u32,

    /// Per-exchange passive regeneration; none by default.
    pub regen: Option<RegenFormula>,

    /// Fixed RNG seed for new sessions; random when unset. Tests pin this.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tables: CombatTables::default(),
            move_timeouts: [60, 50, 40, 30, 20],
            poll_busy: Duration::from_millis(100),
            poll_idle: Duration::from_millis(500),
            error_backoff: Duration::from_secs(1),
            history_ttl: Duration::from_secs(86_400),
            request_ttl: Duration::from_secs(120),
            matchmaking_timeout: Duration::from_secs(45),
            shadow_hp: 150,
            shadow_energy: 50,
            base_switch_charges: 2,
            regen: None,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Move deadline for an AFK penalty level; levels past 4 stay at the
    /// tightest timeout.
    pub fn timeout_for(&self, afk_level: u8) -> u64 {
        self.move_timeouts[(afk_level as usize).min(self.move_timeouts.len() - 1)]
    }
}
