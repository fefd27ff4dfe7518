//! Wire DTOs exchanged with clients.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use rbc_core::Zone;

use super::participant::Participant;

/// A pending move intent, keyed in the store by `(actor, target)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombatMoveDTO {
    pub target_id: i64,
    pub attack_zones: Vec<Zone>,
    pub block_zones: Vec<Zone>,
    pub ability_key: Option<String>,
    /// Absolute deadline, epoch seconds.
    pub execute_at: i64,
}

/// Client-supplied portion of a move; target and deadline are added by the
/// engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveData {
    pub attack_zones: Vec<Zone>,
    pub block_zones: Vec<Zone>,
    pub ability_key: Option<String>,
}

/// Session status as seen by one caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    /// The caller's move is accepted and awaiting the supervisor.
    Waiting,
    Finished,
}

/// One combatant as rendered on a dashboard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActorSnapshot {
    pub char_id: i64,
    pub name: String,
    pub hp_current: i64,
    pub hp_max: i64,
    pub energy_current: i64,
    pub energy_max: i64,
    pub team: String,
    pub is_dead: bool,
    pub effects: Vec<String>,
    pub tokens: BTreeMap<String, u32>,
}

impl ActorSnapshot {
    pub fn of(participant: &Participant) -> Self {
        let state = &participant.state;
        let tokens = [
            ("hit", state.tokens.hit),
            ("crit", state.tokens.crit),
            ("block", state.tokens.block),
            ("parry", state.tokens.parry),
            ("counter", state.tokens.counter),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(name, count)| (name.to_string(), count))
        .collect();

        Self {
            char_id: participant.id,
            name: participant.name.clone(),
            hp_current: state.hp_current,
            hp_max: state.hp_max,
            energy_current: state.energy_current,
            energy_max: state.energy_max,
            team: participant.team.clone(),
            is_dead: participant.is_dead(),
            effects: state.effects.keys().cloned().collect(),
            tokens,
        }
    }
}

/// Snapshot returned by every consumer-facing RPC.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombatDashboardDTO {
    pub session_id: String,
    pub status: SessionStatus,
    pub player: ActorSnapshot,
    pub current_target: Option<ActorSnapshot>,
    pub enemies: Vec<ActorSnapshot>,
    pub allies: Vec<ActorSnapshot>,
    pub queue_count: usize,
    pub switch_charges: u32,
    pub last_logs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_team: Option<String>,
}

/// Reply of `get_next_target`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NextTarget {
    pub char_id: i64,
    pub hp_current: i64,
}

/// One exchange in the combat log: both directional narratives plus the
/// defenders' resulting HP/energy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub ts: i64,
    pub round: u64,
    pub names: [String; 2],
    pub lines: [String; 2],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_dto_json_shape() {
        let dto = CombatMoveDTO {
            target_id: 9,
            attack_zones: vec![Zone::Head],
            block_zones: vec![Zone::Chest, Zone::Belly],
            ability_key: None,
            execute_at: 1_700_000_000,
        };
        let json = serde_json::to_string(&dto).unwrap();
        assert!(json.contains("\"attack_zones\":[\"head\"]"));
        let parsed: CombatMoveDTO = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, dto);
    }
}
