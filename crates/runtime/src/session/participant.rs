//! Participant containers: the per-session record for one combatant.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use rbc_core::stats::{AggregateInput, Buff};
use rbc_core::{ItemKind, TokenCounts};

/// What backs a participant.
///
/// A `Player` is backed by a persistent character account; a `Shadow` is an
/// AI-only stand-in synthesised by matchmaking with no durable identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParticipantKind {
    Player { char_id: i64 },
    Shadow,
}

/// A quick-use consumable on the combat belt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeltItem {
    pub item_id: String,
    pub name: String,
    pub heal_hp: i64,
    pub heal_energy: i64,
    pub stock: u32,
}

/// A named timed stat effect (buff or debuff) on a fighter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectState {
    pub stat: String,
    pub amount: f64,
    pub rounds_left: u32,
}

/// Per-combat statistic counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FightCounters {
    pub damage_dealt: i64,
    pub damage_taken: i64,
    pub crits_landed: u32,
    pub blocks_success: u32,
    pub dodges_success: u32,
    pub healing_done: i64,
}

/// Volatile fighter state, mutated only by the session's supervisor except
/// for `targets[0]` (target switching) and the belt (consumables).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FighterState {
    pub hp_current: i64,
    pub hp_max: i64,
    /// Energy doubles as a damage shield: it absorbs before HP.
    pub energy_current: i64,
    pub energy_max: i64,
    /// Opposing ids; the head is the current target.
    pub targets: Vec<i64>,
    pub switch_charges: u32,
    pub max_switch_charges: u32,
    pub tokens: TokenCounts,
    pub effects: BTreeMap<String, EffectState>,
    pub exchange_count: u64,
    /// Skill family → pending XP, flushed to durable storage at finalization.
    pub xp_buffer: BTreeMap<String, u32>,
    pub counters: FightCounters,
    pub afk_penalty_level: u8,
    pub penalty_timer: i64,
}

impl Default for FighterState {
    fn default() -> Self {
        Self {
            hp_current: 1,
            hp_max: 1,
            energy_current: 0,
            energy_max: 0,
            targets: Vec::new(),
            switch_charges: 0,
            max_switch_charges: 0,
            tokens: TokenCounts::default(),
            effects: BTreeMap::new(),
            exchange_count: 0,
            xp_buffer: BTreeMap::new(),
            counters: FightCounters::default(),
            afk_penalty_level: 0,
            penalty_timer: 0,
        }
    }
}

impl FighterState {
    pub fn is_dead(&self) -> bool {
        self.hp_current <= 0
    }

    pub fn current_target(&self) -> Option<i64> {
        self.targets.first().copied()
    }

    /// Absorb an incoming hit: shield portion, then HP portion.
    pub fn apply_incoming(&mut self, shield_dmg: i64, hp_dmg: i64) {
        self.energy_current = (self.energy_current - shield_dmg).max(0);
        self.hp_current = (self.hp_current - hp_dmg).max(0);
    }

    /// Restore HP and energy, clamped to the maxima. Returns HP restored.
    pub fn heal(&mut self, hp: i64, energy: i64) -> i64 {
        let before = self.hp_current;
        self.hp_current = (self.hp_current + hp.max(0)).min(self.hp_max);
        self.energy_current = (self.energy_current + energy.max(0)).min(self.energy_max);
        self.hp_current - before
    }

    pub fn add_xp(&mut self, family: &str, amount: u32) {
        *self.xp_buffer.entry(family.to_string()).or_insert(0) += amount;
    }

    /// Decrement effect durations, dropping the expired ones.
    pub fn tick_effects(&mut self) {
        self.effects.retain(|_, effect| {
            effect.rounds_left = effect.rounds_left.saturating_sub(1);
            effect.rounds_left > 0
        });
    }

    pub fn raise_afk_penalty(&mut self) {
        self.afk_penalty_level = (self.afk_penalty_level + 1).min(4);
    }
}

/// The in-session container for one combatant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: i64,
    pub name: String,
    pub team: String,
    pub kind: ParticipantKind,
    /// AI-driven: shadows always, mobs when flagged at creation.
    pub ai: bool,
    /// Base stats, equipment, and trained skills - the persistent layers of
    /// the aggregation input. Live effects are appended per exchange.
    pub stat_input: AggregateInput,
    pub abilities: Vec<String>,
    pub belt: Vec<BeltItem>,
    pub state: FighterState,
}

impl Participant {
    pub fn char_id(&self) -> Option<i64> {
        match self.kind {
            ParticipantKind::Player { char_id } => Some(char_id),
            ParticipantKind::Shadow => None,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.state.is_dead()
    }

    /// Aggregation input including active effects as named flat buffs.
    pub fn aggregate_input(&self) -> AggregateInput {
        let mut input = self.stat_input.clone();
        for (name, effect) in &self.state.effects {
            input.buffs_flat.push(Buff {
                name: name.clone(),
                stat: effect.stat.clone(),
                amount: effect.amount,
            });
        }
        input
    }

    /// Subtype of the first equipped armour piece, for defensive skill XP.
    pub fn armor_subtype(&self) -> Option<&str> {
        self.stat_input.equipment.iter().find_map(|item| match &item.kind {
            ItemKind::Armor { subtype, .. } => Some(subtype.as_str()),
            _ => None,
        })
    }
}
