//! Balance tables: caps and default multipliers for the hit pipeline.

/// Caps and defaults consumed by the calculator and the stats aggregator.
///
/// Values are fractions unless stated otherwise. The defaults reproduce the
/// canonical balance; tests and tooling can override individual fields.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatTables {
    /// Upper bound on parry chance.
    pub parry_cap: f64,
    /// Upper bound on effective dodge chance.
    pub dodge_cap: f64,
    /// Upper bound on counter-attack chance after a dodge.
    pub counter_attack_cap: f64,
    /// Upper bound on passive shield block chance.
    pub shield_block_cap: f64,
    /// Fraction of damage absorbed by a passive block when the
    /// `shield_block_power` stat is absent.
    pub shield_block_power_default: f64,
    /// Upper bound on crit chance after anti-crit subtraction.
    pub crit_cap: f64,
    /// Crit damage multiplier when the `crit_power` stat is absent.
    pub crit_power_default: f64,
    /// Upper bound on physical pierce chance.
    pub pierce_cap: f64,
    /// Upper bound on net resistance (resistance − penetration).
    pub resistance_cap: f64,
    /// Upper bound on the vampiric damage fraction.
    pub vampiric_power_cap: f64,
    /// ± spread applied to bare-handed physical damage.
    pub unarmed_spread: f64,
    /// ± spread around `*_damage_power` for magical-category rolls.
    pub magical_spread: f64,
    /// Damage floor after mitigation of a nonzero roll.
    pub mitigated_minimum: i64,
}

impl Default for CombatTables {
    fn default() -> Self {
        Self {
            parry_cap: 0.5,
            dodge_cap: 0.75,
            counter_attack_cap: 0.5,
            shield_block_cap: 0.75,
            shield_block_power_default: 0.5,
            crit_cap: 0.75,
            crit_power_default: 1.5,
            pierce_cap: 0.3,
            resistance_cap: 0.85,
            vampiric_power_cap: 0.5,
            unarmed_spread: 0.2,
            magical_spread: 0.1,
            mitigated_minimum: 1,
        }
    }
}
