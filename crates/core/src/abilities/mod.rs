//! Declarative ability records.
//!
//! Abilities are not bespoke code branches: each is a record of calculator
//! flags, a resource cost, and pre/post hooks drawn from a closed set. The
//! registry is the single source of truth for what effects exist; nothing is
//! resolved by reflection or open-world lookup.

mod registry;

pub use registry::{find, registry};

use crate::calc::AbilityFlags;
use crate::stats::AggregatedStats;
use crate::tokens::{TokenCounts, TokenKind};

/// Resources consumed when an ability is used.
///
/// Consumption happens after a successful exchange, not on pair-up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AbilityCost {
    pub energy: i64,
    pub tokens: &'static [(TokenKind, u32)],
}

/// Mutation applied to the attacker's scratch stat map before the calculator
/// runs. Hooks are pure over the map they are handed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PreHook {
    /// Add a flat amount to one stat.
    FlatBonus { key: &'static str, amount: f64 },
    /// Scale one stat by a factor.
    ScaleStat { key: &'static str, factor: f64 },
}

/// Secondary effect applied after the calculator has produced a result.
///
/// Interpreted by the exchange resolver in the originating side's context;
/// hooks see only the result and the two containers involved.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PostHook {
    /// Heal the user for a fraction of the damage dealt.
    HealFraction { of_damage: f64 },
    /// Put a named timed stat effect on the opponent. Negative amounts are
    /// debuffs.
    ApplyEffect {
        name: &'static str,
        stat: &'static str,
        amount: f64,
        rounds: u32,
    },
    /// Burn additional tokens from the user beyond the listed cost.
    SpendTokens { kind: TokenKind, count: u32 },
}

/// One ability: flags, cost, and hook pipeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AbilitySpec {
    pub key: &'static str,
    pub name: &'static str,
    pub flags: AbilityFlags,
    pub cost: AbilityCost,
    pub pre: &'static [PreHook],
    pub post: &'static [PostHook],
}

impl AbilitySpec {
    /// Whether the user can afford this ability right now.
    pub fn can_use(&self, energy: i64, tokens: &TokenCounts) -> bool {
        if energy < self.cost.energy {
            return false;
        }
        self.cost
            .tokens
            .iter()
            .all(|(kind, count)| tokens.get(*kind) >= *count)
    }

    /// Run the pre-calc hooks against a scratch stat map.
    pub fn apply_pre(&self, stats: &mut AggregatedStats) {
        for hook in self.pre {
            match hook {
                PreHook::FlatBonus { key, amount } => stats.add(key, *amount),
                PreHook::ScaleStat { key, factor } => {
                    let current = stats.value(key);
                    stats.set(key, current * factor);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::keys;

    #[test]
    fn can_use_checks_energy_and_tokens() {
        let spec = find("shield_bash").unwrap();
        let mut tokens = TokenCounts::new();
        assert!(!spec.can_use(100, &tokens));
        tokens.add(TokenKind::Block, 1);
        assert!(spec.can_use(100, &tokens));
        assert!(!spec.can_use(0, &tokens));
    }

    #[test]
    fn pre_hooks_mutate_scratch_stats() {
        let spec = find("fire_lash").unwrap();
        let mut stats = AggregatedStats::default();
        spec.apply_pre(&mut stats);
        assert!(stats.value("fire_damage_power") > 0.0);
        // the canonical aggregate passed in by value is untouched elsewhere
        assert!(AggregatedStats::default().value("fire_damage_power") == 0.0);
    }

    #[test]
    fn scale_hook_multiplies() {
        let mut stats = AggregatedStats::default();
        stats.add(keys::PHYSICAL_DAMAGE_MAX, 10.0);
        let spec = AbilitySpec {
            key: "test",
            name: "test",
            flags: AbilityFlags {
                damage_mult: 1.0,
                bonus_crit: 0.0,
                ignore_parry: false,
                ignore_dodge: false,
                ignore_block: false,
                override_damage_type: None,
            },
            cost: AbilityCost { energy: 0, tokens: &[] },
            pre: &[PreHook::ScaleStat { key: keys::PHYSICAL_DAMAGE_MAX, factor: 2.0 }],
            post: &[],
        };
        spec.apply_pre(&mut stats);
        assert!((stats.value(keys::PHYSICAL_DAMAGE_MAX) - 20.0).abs() < 1e-9);
    }
}
