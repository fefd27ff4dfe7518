//! Stat key names.
//!
//! Stats are keyed by string so that damage-type-specific stats
//! (`fire_damage_power`, `anti_magical_crit_chance`) can be derived without
//! widening an enum for every new type.

use crate::damage::{DamageCategory, DamageType};

// Attributes
pub const STRENGTH: &str = "strength";
pub const AGILITY: &str = "agility";
pub const ENDURANCE: &str = "endurance";
pub const PERCEPTION: &str = "perception";
pub const INTELLECT: &str = "intellect";
pub const LUCK: &str = "luck";

// Resources
pub const HP_MAX: &str = "hp_max";
pub const ENERGY_MAX: &str = "energy_max";

// Avoidance and response
pub const PARRY_CHANCE: &str = "parry_chance";
pub const DODGE_CHANCE: &str = "dodge_chance";
pub const ANTI_DODGE_CHANCE: &str = "anti_dodge_chance";
pub const COUNTER_ATTACK_CHANCE: &str = "counter_attack_chance";
pub const SHIELD_BLOCK_CHANCE: &str = "shield_block_chance";
pub const SHIELD_BLOCK_POWER: &str = "shield_block_power";

// Crit
pub const CRIT_CHANCE: &str = "crit_chance";
pub const CRIT_POWER: &str = "crit_power";
pub const ANTI_CRIT_CHANCE: &str = "anti_crit_chance";

// Mitigation
pub const PHYSICAL_PIERCE_CHANCE: &str = "physical_pierce_chance";
pub const PENETRATION: &str = "penetration";
pub const RESISTANCE: &str = "resistance";
pub const DAMAGE_REDUCTION_FLAT: &str = "damage_reduction_flat";

// Post-effects
pub const VAMPIRIC_TRIGGER_CHANCE: &str = "vampiric_trigger_chance";
pub const VAMPIRIC_POWER: &str = "vampiric_power";
pub const THORNS_DAMAGE: &str = "thorns_damage";

// Core damage ranges
pub const PHYSICAL_DAMAGE_MIN: &str = "physical_damage_min";
pub const PHYSICAL_DAMAGE_MAX: &str = "physical_damage_max";
pub const MAGICAL_DAMAGE_MIN: &str = "magical_damage_min";
pub const MAGICAL_DAMAGE_MAX: &str = "magical_damage_max";

/// `{type}_damage_min`
pub fn damage_min_key(damage_type: DamageType) -> String {
    format!("{}_damage_min", damage_type.stat_prefix())
}

/// `{type}_damage_max`
pub fn damage_max_key(damage_type: DamageType) -> String {
    format!("{}_damage_max", damage_type.stat_prefix())
}

/// `{type}_damage_power`
pub fn damage_power_key(damage_type: DamageType) -> String {
    format!("{}_damage_power", damage_type.stat_prefix())
}

/// `{type}_damage_bonus`
pub fn damage_bonus_key(damage_type: DamageType) -> String {
    format!("{}_damage_bonus", damage_type.stat_prefix())
}

/// `{category}_damage_bonus` - fallback bonus for non-core types.
pub fn category_bonus_key(category: DamageCategory) -> String {
    format!("{}_damage_bonus", category.stat_prefix())
}

/// `anti_{category}_crit_chance`
pub fn anti_category_crit_key(category: DamageCategory) -> String {
    format!("anti_{}_crit_chance", category.stat_prefix())
}
