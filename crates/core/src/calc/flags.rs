//! Ability flags merged into a hit resolution.

use crate::damage::DamageType;

/// Modifiers an ability contributes to one calculator invocation.
///
/// Defaults are the identity: a flagless resolution behaves like a plain
/// weapon strike.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AbilityFlags {
    /// Multiplier applied to the raw damage roll.
    pub damage_mult: f64,
    /// Added to the attacker's crit chance before anti-crit subtraction.
    pub bonus_crit: f64,
    /// Skip the defender's parry stage.
    pub ignore_parry: bool,
    /// Skip the defender's dodge stage.
    pub ignore_dodge: bool,
    /// Skip the defender's passive shield block stage.
    pub ignore_block: bool,
    /// Replace the move's damage type before resolution.
    pub override_damage_type: Option<DamageType>,
}

impl Default for AbilityFlags {
    fn default() -> Self {
        Self {
            damage_mult: 1.0,
            bonus_crit: 0.0,
            ignore_parry: false,
            ignore_dodge: false,
            ignore_block: false,
            override_damage_type: None,
        }
    }
}

impl AbilityFlags {
    /// Merge another flag set on top of this one.
    ///
    /// Multipliers compound, bonuses add, booleans or, and a later type
    /// override wins.
    pub fn merge(&mut self, other: &AbilityFlags) {
        self.damage_mult *= other.damage_mult;
        self.bonus_crit += other.bonus_crit;
        self.ignore_parry |= other.ignore_parry;
        self.ignore_dodge |= other.ignore_dodge;
        self.ignore_block |= other.ignore_block;
        if other.override_damage_type.is_some() {
            self.override_damage_type = other.override_damage_type;
        }
    }
}
