//! Stat aggregation: layered sources → final stat map.

use std::collections::BTreeMap;

use crate::config::CombatTables;

use super::keys;
use super::rules;
use super::source::StatSourceData;

/// One worn item contributing to the stat set.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemSpec {
    pub name: String,
    pub kind: ItemKind,
    /// Explicit per-stat bonuses carried by the item.
    #[cfg_attr(feature = "serde", serde(default))]
    pub bonuses: BTreeMap<String, f64>,
}

/// Item intrinsics beyond the explicit bonus list.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum ItemKind {
    /// `base_power × (1 ± damage_spread)` into physical damage min/max.
    Weapon { base_power: f64, damage_spread: f64 },
    /// `base_power` into flat damage reduction. `subtype` names the armour
    /// family used for defensive skill XP (e.g. "leather", "plate").
    Armor { base_power: f64, subtype: String },
    /// Bonuses only.
    Trinket,
}

/// A named transient bonus targeting one stat.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Buff {
    pub name: String,
    pub stat: String,
    pub amount: f64,
}

/// Everything the aggregator reads for one combatant.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AggregateInput {
    pub base: BTreeMap<String, f64>,
    pub equipment: Vec<ItemSpec>,
    pub skills: BTreeMap<String, f64>,
    pub buffs_flat: Vec<Buff>,
    pub buffs_percent: Vec<Buff>,
}

/// A combined stat with its per-source breakdown.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatValue {
    pub total: f64,
    pub sources: BTreeMap<String, f64>,
}

/// The aggregated record: combined stats plus derived modifiers.
///
/// `BTreeMap` keeps key order stable so aggregating the same inputs twice
/// yields byte-identical serialized output.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AggregatedStats {
    pub stats: BTreeMap<String, StatValue>,
    pub modifiers: BTreeMap<String, StatValue>,
}

impl AggregatedStats {
    /// Final value of a stat: combined layers plus derived modifier.
    ///
    /// Absent keys read as zero, so the calculator can probe type-specific
    /// stats without existence checks.
    pub fn value(&self, key: &str) -> f64 {
        self.stats.get(key).map(|v| v.total).unwrap_or(0.0)
            + self.modifiers.get(key).map(|v| v.total).unwrap_or(0.0)
    }

    /// `value` truncated toward zero.
    pub fn value_i64(&self, key: &str) -> i64 {
        self.value(key) as i64
    }

    /// Overwrite a stat total, attributing the change to an ability.
    ///
    /// Used by ability pre-calc hooks on a scratch copy; never on the
    /// canonical aggregate.
    pub fn set(&mut self, key: &str, total: f64) {
        let entry = self.stats.entry(key.to_string()).or_default();
        let delta = total - entry.total;
        entry.total = total;
        if delta != 0.0 {
            *entry.sources.entry("ability".to_string()).or_insert(0.0) += delta;
        }
    }

    /// Add to a stat total, attributing the change to an ability.
    pub fn add(&mut self, key: &str, amount: f64) {
        let current = self.stats.get(key).map(|v| v.total).unwrap_or(0.0);
        self.set(key, current + amount);
    }
}

/// Assemble the final stat set for one combatant.
///
/// Pure over its inputs: no storage access, no randomness, identical inputs
/// produce identical output.
pub fn aggregate(input: &AggregateInput, tables: &CombatTables) -> AggregatedStats {
    let mut sources: BTreeMap<String, StatSourceData> = BTreeMap::new();

    for (key, amount) in &input.base {
        sources.entry(key.clone()).or_default().base += amount;
    }

    let mut has_weapon = false;
    for item in &input.equipment {
        for (key, amount) in &item.bonuses {
            sources
                .entry(key.clone())
                .or_default()
                .equipment
                .entry(item.name.clone())
                .and_modify(|v| *v += amount)
                .or_insert(*amount);
        }
        match &item.kind {
            ItemKind::Weapon { base_power, damage_spread } => {
                has_weapon = true;
                let min = base_power * (1.0 - damage_spread);
                let max = base_power * (1.0 + damage_spread);
                for (key, amount) in [(keys::PHYSICAL_DAMAGE_MIN, min), (keys::PHYSICAL_DAMAGE_MAX, max)] {
                    sources
                        .entry(key.to_string())
                        .or_default()
                        .equipment
                        .entry(item.name.clone())
                        .and_modify(|v| *v += amount)
                        .or_insert(amount);
                }
            }
            ItemKind::Armor { base_power, .. } => {
                sources
                    .entry(keys::DAMAGE_REDUCTION_FLAT.to_string())
                    .or_default()
                    .equipment
                    .entry(item.name.clone())
                    .and_modify(|v| *v += base_power)
                    .or_insert(*base_power);
            }
            ItemKind::Trinket => {}
        }
    }

    for (key, amount) in &input.skills {
        sources.entry(key.clone()).or_default().skills += amount;
    }
    for buff in &input.buffs_flat {
        *sources
            .entry(buff.stat.clone())
            .or_default()
            .buffs_flat
            .entry(buff.name.clone())
            .or_insert(0.0) += buff.amount;
    }
    for buff in &input.buffs_percent {
        *sources
            .entry(buff.stat.clone())
            .or_default()
            .buffs_percent
            .entry(buff.name.clone())
            .or_insert(0.0) += buff.amount;
    }

    let mut stats: BTreeMap<String, StatValue> = BTreeMap::new();
    for (key, data) in &sources {
        let mut total = data.combine(rules::rule_for(key));
        if let Some(cap) = rules::cap_for(key, tables) {
            total = total.clamp(0.0, cap);
        }
        stats.insert(
            key.clone(),
            StatValue { total, sources: data.labelled_sources() },
        );
    }

    // Bare hands widen the physical damage range the way a crude weapon would.
    if !has_weapon {
        apply_unarmed_spread(&mut stats, tables.unarmed_spread);
    }

    let mut modifiers: BTreeMap<String, StatValue> = BTreeMap::new();
    for (key, contributors) in rules::MODIFIER_RULES {
        let mut value = StatValue::default();
        for (attr, coeff) in *contributors {
            let contribution = stats.get(*attr).map(|v| v.total).unwrap_or(0.0) * coeff;
            if contribution != 0.0 {
                value.total += contribution;
                value.sources.insert((*attr).to_string(), contribution);
            }
        }
        if !value.sources.is_empty() {
            if let Some(cap) = rules::cap_for(key, tables) {
                value.total = value.total.clamp(0.0, cap);
            }
            modifiers.insert((*key).to_string(), value);
        }
    }

    AggregatedStats { stats, modifiers }
}

fn apply_unarmed_spread(stats: &mut BTreeMap<String, StatValue>, spread: f64) {
    for (key, factor) in [
        (keys::PHYSICAL_DAMAGE_MIN, 1.0 - spread),
        (keys::PHYSICAL_DAMAGE_MAX, 1.0 + spread),
    ] {
        if let Some(value) = stats.get_mut(key) {
            let adjusted = value.total * factor;
            let delta = adjusted - value.total;
            value.total = adjusted;
            if delta != 0.0 {
                value.sources.insert("unarmed".to_string(), delta);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn aggregation_is_idempotent() {
        let input = AggregateInput {
            base: base(&[(keys::STRENGTH, 12.0), (keys::AGILITY, 8.0), (keys::HP_MAX, 100.0)]),
            equipment: vec![ItemSpec {
                name: "iron sword".into(),
                kind: ItemKind::Weapon { base_power: 10.0, damage_spread: 0.25 },
                bonuses: base(&[(keys::CRIT_CHANCE, 0.05)]),
            }],
            skills: base(&[(keys::PARRY_CHANCE, 0.02)]),
            buffs_flat: vec![Buff { name: "war cry".into(), stat: keys::STRENGTH.into(), amount: 4.0 }],
            buffs_percent: vec![Buff { name: "frenzy".into(), stat: keys::HP_MAX.into(), amount: 0.1 }],
        };
        let tables = CombatTables::default();
        let a = aggregate(&input, &tables);
        let b = aggregate(&input, &tables);
        assert_eq!(a, b);
    }

    #[test]
    fn weapon_intrinsics_spread_damage() {
        let input = AggregateInput {
            equipment: vec![ItemSpec {
                name: "axe".into(),
                kind: ItemKind::Weapon { base_power: 20.0, damage_spread: 0.1 },
                bonuses: BTreeMap::new(),
            }],
            ..Default::default()
        };
        let out = aggregate(&input, &CombatTables::default());
        assert!((out.value(keys::PHYSICAL_DAMAGE_MIN) - 18.0).abs() < 1e-9);
        assert!((out.value(keys::PHYSICAL_DAMAGE_MAX) - 22.0).abs() < 1e-9);
    }

    #[test]
    fn armor_feeds_flat_reduction() {
        let input = AggregateInput {
            equipment: vec![ItemSpec {
                name: "leather vest".into(),
                kind: ItemKind::Armor { base_power: 3.0, subtype: "leather".into() },
                bonuses: BTreeMap::new(),
            }],
            ..Default::default()
        };
        let out = aggregate(&input, &CombatTables::default());
        assert!((out.value(keys::DAMAGE_REDUCTION_FLAT) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn unarmed_spread_widens_range() {
        let input = AggregateInput {
            base: base(&[(keys::PHYSICAL_DAMAGE_MIN, 10.0), (keys::PHYSICAL_DAMAGE_MAX, 10.0)]),
            ..Default::default()
        };
        let out = aggregate(&input, &CombatTables::default());
        assert!((out.value(keys::PHYSICAL_DAMAGE_MIN) - 8.0).abs() < 1e-9);
        assert!((out.value(keys::PHYSICAL_DAMAGE_MAX) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn unarmed_spread_on_zero_stays_zero() {
        let out = aggregate(&AggregateInput::default(), &CombatTables::default());
        assert_eq!(out.value(keys::PHYSICAL_DAMAGE_MIN), 0.0);
        assert_eq!(out.value(keys::PHYSICAL_DAMAGE_MAX), 0.0);
    }

    #[test]
    fn capped_stats_clamp_to_declared_caps() {
        let input = AggregateInput {
            base: base(&[(keys::RESISTANCE, 2.0), (keys::DODGE_CHANCE, -0.5)]),
            ..Default::default()
        };
        let out = aggregate(&input, &CombatTables::default());
        assert!((out.stats[keys::RESISTANCE].total - 0.85).abs() < 1e-9);
        assert_eq!(out.stats[keys::DODGE_CHANCE].total, 0.0);
    }

    #[test]
    fn derived_modifiers_follow_rule_table() {
        let input = AggregateInput {
            base: base(&[(keys::AGILITY, 10.0), (keys::PERCEPTION, 5.0)]),
            ..Default::default()
        };
        let out = aggregate(&input, &CombatTables::default());
        // parry_chance ← 0.005·agility + 0.002·perception
        let parry = out.modifiers.get(keys::PARRY_CHANCE).map(|v| v.total).unwrap_or(0.0);
        assert!((parry - 0.06).abs() < 1e-9);
        assert!((out.value(keys::PARRY_CHANCE) - 0.06).abs() < 1e-9);
    }

    #[test]
    fn percent_buff_scales_additive_stat() {
        let input = AggregateInput {
            base: base(&[(keys::HP_MAX, 100.0)]),
            buffs_percent: vec![Buff { name: "vigor".into(), stat: keys::HP_MAX.into(), amount: 0.2 }],
            ..Default::default()
        };
        let out = aggregate(&input, &CombatTables::default());
        assert!((out.stats[keys::HP_MAX].total - 120.0).abs() < 1e-9);
    }
}
