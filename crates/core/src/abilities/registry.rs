//! The closed ability registry.

use crate::calc::AbilityFlags;
use crate::damage::DamageType;
use crate::stats::keys;
use crate::tokens::TokenKind;

use super::{AbilityCost, AbilitySpec, PostHook, PreHook};

const NO_FLAGS: AbilityFlags = AbilityFlags {
    damage_mult: 1.0,
    bonus_crit: 0.0,
    ignore_parry: false,
    ignore_dodge: false,
    ignore_block: false,
    override_damage_type: None,
};

static ABILITIES: &[AbilitySpec] = &[
    AbilitySpec {
        key: "power_strike",
        name: "Power Strike",
        flags: AbilityFlags { damage_mult: 1.5, ..NO_FLAGS },
        cost: AbilityCost { energy: 15, tokens: &[] },
        pre: &[],
        post: &[],
    },
    AbilitySpec {
        key: "true_strike",
        name: "True Strike",
        flags: AbilityFlags { ignore_dodge: true, bonus_crit: 0.15, ..NO_FLAGS },
        cost: AbilityCost { energy: 10, tokens: &[] },
        pre: &[],
        post: &[],
    },
    AbilitySpec {
        key: "shield_bash",
        name: "Shield Bash",
        flags: AbilityFlags { ignore_parry: true, ..NO_FLAGS },
        cost: AbilityCost { energy: 12, tokens: &[(TokenKind::Block, 1)] },
        pre: &[],
        post: &[PostHook::ApplyEffect {
            name: "stagger",
            stat: keys::DODGE_CHANCE,
            amount: -0.10,
            rounds: 2,
        }],
    },
    AbilitySpec {
        key: "drain_blade",
        name: "Drain Blade",
        flags: NO_FLAGS,
        cost: AbilityCost { energy: 20, tokens: &[(TokenKind::Hit, 2)] },
        pre: &[],
        post: &[PostHook::HealFraction { of_damage: 0.35 }],
    },
    AbilitySpec {
        key: "fire_lash",
        name: "Fire Lash",
        flags: AbilityFlags { override_damage_type: Some(DamageType::Fire), ..NO_FLAGS },
        cost: AbilityCost { energy: 18, tokens: &[] },
        pre: &[PreHook::FlatBonus { key: "fire_damage_power", amount: 10.0 }],
        post: &[],
    },
];

/// Every registered ability.
pub fn registry() -> &'static [AbilitySpec] {
    ABILITIES
}

/// Look an ability up by key.
pub fn find(key: &str) -> Option<&'static AbilitySpec> {
    ABILITIES.iter().find(|spec| spec.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_unique() {
        for (i, a) in registry().iter().enumerate() {
            for b in registry().iter().skip(i + 1) {
                assert_ne!(a.key, b.key);
            }
        }
    }

    #[test]
    fn unknown_key_is_none() {
        assert!(find("arcane_nonsense").is_none());
        assert!(find("power_strike").is_some());
    }
}
