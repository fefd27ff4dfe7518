//! Static rule tables for stat combination, caps, and derived modifiers.

use crate::config::CombatTables;

use super::keys;

/// How the source layers of a stat fold into its total.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CombineRule {
    /// Sum the four flat layers, ignore percent bonuses.
    Flat,
    /// `flats × (1 + Σ percent)`.
    Additive,
    /// `flats × Π (1 + percent)`.
    Multiplicative,
}

/// Stats whose percent bonuses are ignored entirely.
const FLAT_KEYS: &[&str] = &[
    keys::STRENGTH,
    keys::AGILITY,
    keys::ENDURANCE,
    keys::PERCEPTION,
    keys::INTELLECT,
    keys::LUCK,
    keys::DAMAGE_REDUCTION_FLAT,
    keys::THORNS_DAMAGE,
];

/// Stats whose percent bonuses compound.
const MULTIPLICATIVE_KEYS: &[&str] = &[keys::CRIT_POWER, keys::VAMPIRIC_POWER];

/// Combination rule for a stat key. Unlisted keys are additive.
pub fn rule_for(key: &str) -> CombineRule {
    if FLAT_KEYS.contains(&key) {
        CombineRule::Flat
    } else if MULTIPLICATIVE_KEYS.contains(&key) {
        CombineRule::Multiplicative
    } else {
        CombineRule::Additive
    }
}

/// Declared cap for a capped stat, if any.
///
/// Capped stats are also floored at zero by the aggregator.
pub fn cap_for(key: &str, tables: &CombatTables) -> Option<f64> {
    match key {
        keys::PARRY_CHANCE => Some(tables.parry_cap),
        keys::DODGE_CHANCE => Some(tables.dodge_cap),
        keys::COUNTER_ATTACK_CHANCE => Some(tables.counter_attack_cap),
        keys::SHIELD_BLOCK_CHANCE => Some(tables.shield_block_cap),
        keys::CRIT_CHANCE => Some(tables.crit_cap),
        keys::RESISTANCE => Some(tables.resistance_cap),
        keys::PHYSICAL_PIERCE_CHANCE => Some(tables.pierce_cap),
        keys::VAMPIRIC_POWER => Some(tables.vampiric_power_cap),
        _ => None,
    }
}

/// Derived-modifier rules: stat key ← linear combination of attribute totals.
///
/// Applied to post-equipment attribute totals; the results populate the
/// `modifiers` sub-map of the aggregated record.
pub const MODIFIER_RULES: &[(&str, &[(&str, f64)])] = &[
    (keys::PARRY_CHANCE, &[(keys::AGILITY, 0.005), (keys::PERCEPTION, 0.002)]),
    (keys::DODGE_CHANCE, &[(keys::AGILITY, 0.006), (keys::LUCK, 0.001)]),
    (keys::CRIT_CHANCE, &[(keys::LUCK, 0.004), (keys::PERCEPTION, 0.003)]),
    (
        keys::COUNTER_ATTACK_CHANCE,
        &[(keys::AGILITY, 0.003), (keys::STRENGTH, 0.001)],
    ),
    (keys::SHIELD_BLOCK_CHANCE, &[(keys::ENDURANCE, 0.004)]),
    (keys::RESISTANCE, &[(keys::ENDURANCE, 0.002)]),
    ("physical_damage_bonus", &[(keys::STRENGTH, 0.01)]),
    ("magical_damage_bonus", &[(keys::INTELLECT, 0.01)]),
    (keys::HP_MAX, &[(keys::ENDURANCE, 5.0)]),
    (keys::ENERGY_MAX, &[(keys::INTELLECT, 3.0)]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_are_flat() {
        assert_eq!(rule_for(keys::STRENGTH), CombineRule::Flat);
        assert_eq!(rule_for(keys::THORNS_DAMAGE), CombineRule::Flat);
    }

    #[test]
    fn unlisted_keys_default_to_additive() {
        assert_eq!(rule_for("fire_damage_power"), CombineRule::Additive);
        assert_eq!(rule_for(keys::HP_MAX), CombineRule::Additive);
    }

    #[test]
    fn capped_stats_use_table_values() {
        let tables = CombatTables::default();
        assert_eq!(cap_for(keys::RESISTANCE, &tables), Some(0.85));
        assert_eq!(cap_for(keys::CRIT_CHANCE, &tables), Some(0.75));
        assert_eq!(cap_for(keys::HP_MAX, &tables), None);
    }
}
