//! The hit-resolution pipeline.
//!
//! A strict stage sequence: parry → dodge (+ counter) → passive shield block
//! → geo-block detection → damage roll + crit → geo demotion → pierce →
//! mitigation → vampirism → shield/HP distribution → token emission.
//! Early stages short-circuit the remainder; geo-block only flags and lets
//! the crit roll happen before demoting damage.
//!
//! The function is pure: inputs are never mutated, and with an identically
//! seeded [`CombatRng`] the output is identical.

use crate::config::CombatTables;
use crate::damage::{DamageCategory, DamageType};
use crate::rng::CombatRng;
use crate::stats::{AggregatedStats, keys};
use crate::tokens::TokenKind;
use crate::zones::{Zone, ZONES};

use super::flags::AbilityFlags;
use super::result::{BlockKind, HitResult};

/// Resolve one directional hit.
#[allow(clippy::too_many_arguments)]
pub fn resolve_hit(
    attacker: &AggregatedStats,
    defender: &AggregatedStats,
    defender_shield: i64,
    attack_zones: &[Zone],
    block_zones: &[Zone],
    damage_type: DamageType,
    flags: &AbilityFlags,
    tables: &CombatTables,
    rng: &mut CombatRng,
) -> HitResult {
    let damage_type = flags.override_damage_type.unwrap_or(damage_type);

    let mut res = HitResult {
        thorns_damage: defender.value_i64(keys::THORNS_DAMAGE).max(0),
        ..Default::default()
    };

    // Stage 1: parry (physical only).
    if damage_type.is_physical() && !flags.ignore_parry {
        let parry = defender.value(keys::PARRY_CHANCE).min(tables.parry_cap);
        if rng.chance(parry) {
            res.is_parried = true;
            res.tokens_def.add(TokenKind::Parry, 1);
            res.visual_bar = visual_bar(attack_zones, block_zones, true);
            res.logs.push("the strike was parried".to_string());
            return res;
        }
    }

    // Stage 2: dodge, with an immediate counter-attack roll on success.
    if !flags.ignore_dodge {
        let dodge = (defender.value(keys::DODGE_CHANCE)
            - attacker.value(keys::ANTI_DODGE_CHANCE))
        .clamp(0.0, tables.dodge_cap);
        if rng.chance(dodge) {
            res.is_dodged = true;
            let counter = defender
                .value(keys::COUNTER_ATTACK_CHANCE)
                .min(tables.counter_attack_cap);
            if rng.chance(counter) {
                res.is_counter = true;
                res.tokens_def.add(TokenKind::Counter, 1);
                res.logs.push("dodged and countered".to_string());
            } else {
                res.logs.push("the attack was dodged".to_string());
            }
            res.visual_bar = visual_bar(attack_zones, block_zones, true);
            return res;
        }
    }

    // Stage 3: passive shield block. Rolls raw damage, reduces it by block
    // power, and skips geo/pierce/mitigation/vampirism.
    if !flags.ignore_block {
        let block = defender
            .value(keys::SHIELD_BLOCK_CHANCE)
            .min(tables.shield_block_cap);
        if rng.chance(block) {
            res.is_blocked = true;
            res.block = Some(BlockKind::Passive);
            res.tokens_def.add(TokenKind::Block, 1);

            let (raw, is_crit) = roll_damage(attacker, defender, damage_type, flags, tables, rng);
            res.is_crit = is_crit;

            let mut power = defender.value(keys::SHIELD_BLOCK_POWER);
            if power <= 0.0 {
                power = tables.shield_block_power_default;
            }
            let damage = (raw * (1.0 - power.min(1.0))).floor().max(0.0) as i64;
            distribute(&mut res, damage, defender_shield);
            finish_tokens(&mut res);
            res.visual_bar = visual_bar(attack_zones, block_zones, false);
            res.logs.push("the shield soaked the blow".to_string());
            return res;
        }
    }

    // Stage 4: geo-block detection. Flags only; damage is demoted in stage 6
    // so the crit roll still happens.
    let geo = attack_zones.iter().any(|z| block_zones.contains(z));
    if geo {
        res.is_blocked = true;
        res.block = Some(BlockKind::Geo);
        res.tokens_def.add(TokenKind::Block, 1);
    }

    // Stage 5: damage roll and crit.
    let (raw, is_crit) = roll_damage(attacker, defender, damage_type, flags, tables, rng);
    res.is_crit = is_crit;
    let mut damage = raw;

    // Stage 6: geo-block damage adjustment.
    if geo {
        if is_crit {
            damage /= 2.0;
            res.logs.push("the block softened a critical strike".to_string());
        } else {
            damage = 0.0;
            res.logs.push("the attack was fully blocked".to_string());
        }
    }

    // Stage 7: piercing (physical only) bypasses mitigation.
    let pierced = damage_type.is_physical() && {
        let pierce = attacker
            .value(keys::PHYSICAL_PIERCE_CHANCE)
            .min(tables.pierce_cap);
        rng.chance(pierce)
    };
    if pierced && damage > 0.0 {
        res.logs.push("the strike pierced straight through".to_string());
    }

    // Stage 8: mitigation. A nonzero roll never mitigates below the floor.
    if !pierced && damage > 0.0 {
        let net_resist = (defender.value(keys::RESISTANCE)
            - attacker.value(keys::PENETRATION))
        .clamp(0.0, tables.resistance_cap);
        let reduced =
            damage * (1.0 - net_resist) - defender.value(keys::DAMAGE_REDUCTION_FLAT);
        damage = reduced.max(tables.mitigated_minimum as f64);
    }

    let damage = damage.floor().max(0.0) as i64;

    // Stage 9: vampirism.
    let trigger = attacker.value(keys::VAMPIRIC_TRIGGER_CHANCE).min(1.0);
    if rng.chance(trigger) {
        let power = attacker
            .value(keys::VAMPIRIC_POWER)
            .min(tables.vampiric_power_cap);
        res.lifesteal = (damage as f64 * power).floor().max(0.0) as i64;
    }

    // Stages 10–11: distribution and token emission.
    distribute(&mut res, damage, defender_shield);
    finish_tokens(&mut res);
    res.visual_bar = visual_bar(attack_zones, block_zones, false);
    if res.is_crit && res.landed() {
        res.logs.push(format!("critical hit for {}", res.damage_total));
    } else if res.landed() {
        res.logs.push(format!("hit for {}", res.damage_total));
    } else if res.logs.is_empty() {
        res.logs.push("the attack glanced off".to_string());
    }
    res
}

/// Stage 5: raw damage roll with type bonuses, ability multiplier, and the
/// crit roll folded in.
fn roll_damage(
    attacker: &AggregatedStats,
    defender: &AggregatedStats,
    damage_type: DamageType,
    flags: &AbilityFlags,
    tables: &CombatTables,
    rng: &mut CombatRng,
) -> (f64, bool) {
    let mut damage = if damage_type.is_physical() {
        let min = attacker.value(keys::PHYSICAL_DAMAGE_MIN).floor() as i64;
        let max = attacker.value(keys::PHYSICAL_DAMAGE_MAX).floor() as i64;
        rng.range_i64(min.max(0), max.max(0)) as f64
    } else {
        let power = typed_stat(attacker, damage_type, keys::damage_power_key);
        if power > 0.0 {
            let min = (power * (1.0 - tables.magical_spread)).floor() as i64;
            let max = (power * (1.0 + tables.magical_spread)).floor() as i64;
            rng.range_i64(min.max(0), max.max(0)) as f64
        } else {
            let min = typed_stat(attacker, damage_type, keys::damage_min_key).floor() as i64;
            let max = typed_stat(attacker, damage_type, keys::damage_max_key).floor() as i64;
            rng.range_i64(min.max(0), max.max(0)) as f64
        }
    };

    // Type-specific bonus, plus the category bonus for non-core types.
    let mut bonus = attacker.value(&keys::damage_bonus_key(damage_type));
    if damage_type.category() == DamageCategory::Magical && damage_type != DamageType::Magical {
        bonus += attacker.value(&keys::category_bonus_key(DamageCategory::Magical));
    }
    damage *= 1.0 + bonus;
    damage *= flags.damage_mult;

    let category = damage_type.category();
    let crit_chance = (attacker.value(keys::CRIT_CHANCE) + flags.bonus_crit
        - defender.value(keys::ANTI_CRIT_CHANCE)
        - defender.value(&keys::anti_category_crit_key(category)))
    .clamp(0.0, tables.crit_cap);

    let is_crit = rng.chance(crit_chance);
    if is_crit {
        let mut power = attacker.value(keys::CRIT_POWER);
        if power <= 0.0 {
            power = tables.crit_power_default;
        }
        damage *= power;
    }

    (damage.max(0.0), is_crit)
}

/// Read a type-prefixed stat, falling back to the magical-category stat for
/// non-core types.
fn typed_stat(
    stats: &AggregatedStats,
    damage_type: DamageType,
    key_fn: fn(DamageType) -> String,
) -> f64 {
    let specific = stats.value(&key_fn(damage_type));
    if specific != 0.0 || damage_type.category() == DamageCategory::Physical {
        return specific;
    }
    if damage_type == DamageType::Magical {
        return specific;
    }
    stats.value(&key_fn(DamageType::Magical))
}

/// Stage 10: absorb into the energy shield first, spill the rest into HP.
fn distribute(res: &mut HitResult, damage: i64, shield: i64) {
    res.damage_total = damage;
    res.shield_dmg = damage.min(shield.max(0));
    res.hp_dmg = damage - res.shield_dmg;
}

/// Stage 11: hit/crit tokens from the final outcome.
fn finish_tokens(res: &mut HitResult) {
    if res.landed() {
        res.tokens_atk.add(TokenKind::Hit, 1);
    }
    if res.is_crit {
        res.tokens_atk.add(TokenKind::Crit, 1);
    }
}

/// Five glyphs, head→feet: `#` attacked into a block, `x` attacked (`o` when
/// the whole attack was avoided), `=` covered, `-` untouched.
fn visual_bar(attack_zones: &[Zone], block_zones: &[Zone], avoided: bool) -> String {
    ZONES
        .iter()
        .map(|zone| {
            let attacked = attack_zones.contains(zone);
            let covered = block_zones.contains(zone);
            match (attacked, covered) {
                (true, true) => '#',
                (true, false) => {
                    if avoided {
                        'o'
                    } else {
                        'x'
                    }
                }
                (false, true) => '=',
                (false, false) => '-',
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::StatValue;

    fn stats_with(pairs: &[(&str, f64)]) -> AggregatedStats {
        let mut out = AggregatedStats::default();
        for (key, total) in pairs {
            out.stats.insert(
                key.to_string(),
                StatValue { total: *total, sources: [("base".to_string(), *total)].into() },
            );
        }
        out
    }

    fn uncapped() -> CombatTables {
        CombatTables {
            parry_cap: 1.0,
            dodge_cap: 1.0,
            counter_attack_cap: 1.0,
            crit_cap: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn purity_same_seed_same_result() {
        let attacker = stats_with(&[
            (keys::PHYSICAL_DAMAGE_MIN, 5.0),
            (keys::PHYSICAL_DAMAGE_MAX, 15.0),
            (keys::CRIT_CHANCE, 0.3),
        ]);
        let defender = stats_with(&[(keys::DODGE_CHANCE, 0.25), (keys::RESISTANCE, 0.2)]);
        let tables = CombatTables::default();
        let run = |seed| {
            resolve_hit(
                &attacker,
                &defender,
                20,
                &[Zone::Head],
                &[Zone::Chest, Zone::Belly],
                DamageType::Physical,
                &AbilityFlags::default(),
                &tables,
                &mut CombatRng::new(seed),
            )
        };
        assert_eq!(run(99), run(99));
    }

    #[test]
    fn zero_damage_attacker_deals_nothing() {
        let attacker = AggregatedStats::default();
        let defender = AggregatedStats::default();
        let res = resolve_hit(
            &attacker,
            &defender,
            0,
            &[Zone::Head],
            &[Zone::Legs, Zone::Feet],
            DamageType::Physical,
            &AbilityFlags::default(),
            &CombatTables::default(),
            &mut CombatRng::new(1),
        );
        assert_eq!(res.damage_total, 0);
        assert!(!res.landed());
        assert!(res.tokens_atk.is_empty());
    }

    #[test]
    fn flat_ten_damage_lands_exactly() {
        let attacker = stats_with(&[
            (keys::PHYSICAL_DAMAGE_MIN, 10.0),
            (keys::PHYSICAL_DAMAGE_MAX, 10.0),
        ]);
        let defender = AggregatedStats::default();
        let res = resolve_hit(
            &attacker,
            &defender,
            0,
            &[Zone::Head],
            &[Zone::Chest, Zone::Belly],
            DamageType::Physical,
            &AbilityFlags::default(),
            &CombatTables::default(),
            &mut CombatRng::new(3),
        );
        assert_eq!(res.damage_total, 10);
        assert_eq!(res.hp_dmg, 10);
        assert_eq!(res.shield_dmg, 0);
        assert_eq!(res.tokens_atk.get(TokenKind::Hit), 1);
    }

    #[test]
    fn geo_block_halves_a_crit() {
        let attacker = stats_with(&[
            (keys::PHYSICAL_DAMAGE_MIN, 100.0),
            (keys::PHYSICAL_DAMAGE_MAX, 100.0),
            (keys::CRIT_CHANCE, 1.0),
            (keys::CRIT_POWER, 2.0),
        ]);
        let defender = AggregatedStats::default();
        let res = resolve_hit(
            &attacker,
            &defender,
            0,
            &[Zone::Head],
            &[Zone::Head, Zone::Chest],
            DamageType::Physical,
            &AbilityFlags::default(),
            &uncapped(),
            &mut CombatRng::new(5),
        );
        assert!(res.is_crit);
        assert!(res.is_blocked);
        assert_eq!(res.block, Some(BlockKind::Geo));
        assert_eq!(res.damage_total, 100);
        assert_eq!(res.tokens_def.get(TokenKind::Block), 1);
        assert_eq!(res.tokens_atk.get(TokenKind::Crit), 1);
    }

    #[test]
    fn geo_block_without_crit_zeroes_damage() {
        let attacker = stats_with(&[
            (keys::PHYSICAL_DAMAGE_MIN, 40.0),
            (keys::PHYSICAL_DAMAGE_MAX, 40.0),
        ]);
        let defender = AggregatedStats::default();
        let res = resolve_hit(
            &attacker,
            &defender,
            0,
            &[Zone::Chest],
            &[Zone::Chest, Zone::Belly],
            DamageType::Physical,
            &AbilityFlags::default(),
            &CombatTables::default(),
            &mut CombatRng::new(5),
        );
        assert!(!res.is_crit);
        assert_eq!(res.block, Some(BlockKind::Geo));
        assert_eq!(res.damage_total, 0);
        assert!(res.tokens_atk.is_empty());
        assert_eq!(res.tokens_def.get(TokenKind::Block), 1);
    }

    #[test]
    fn dodge_with_counter_awards_counter_token() {
        let attacker = stats_with(&[
            (keys::PHYSICAL_DAMAGE_MIN, 10.0),
            (keys::PHYSICAL_DAMAGE_MAX, 10.0),
        ]);
        let defender = stats_with(&[
            (keys::DODGE_CHANCE, 1.0),
            (keys::COUNTER_ATTACK_CHANCE, 1.0),
        ]);
        let res = resolve_hit(
            &attacker,
            &defender,
            0,
            &[Zone::Head],
            &[Zone::Chest, Zone::Belly],
            DamageType::Physical,
            &AbilityFlags::default(),
            &uncapped(),
            &mut CombatRng::new(8),
        );
        assert!(res.is_dodged);
        assert!(res.is_counter);
        assert_eq!(res.damage_total, 0);
        assert_eq!(res.tokens_def.get(TokenKind::Counter), 1);
        assert!(res.tokens_atk.is_empty());
    }

    #[test]
    fn parry_short_circuits_physical_only() {
        let attacker = stats_with(&[
            (keys::PHYSICAL_DAMAGE_MIN, 10.0),
            (keys::PHYSICAL_DAMAGE_MAX, 10.0),
            ("magical_damage_power", 10.0),
        ]);
        let defender = stats_with(&[(keys::PARRY_CHANCE, 1.0)]);

        let physical = resolve_hit(
            &attacker,
            &defender,
            0,
            &[Zone::Head],
            &[Zone::Legs, Zone::Feet],
            DamageType::Physical,
            &AbilityFlags::default(),
            &uncapped(),
            &mut CombatRng::new(2),
        );
        assert!(physical.is_parried);
        assert_eq!(physical.tokens_def.get(TokenKind::Parry), 1);

        let magical = resolve_hit(
            &attacker,
            &defender,
            0,
            &[Zone::Head],
            &[Zone::Legs, Zone::Feet],
            DamageType::Magical,
            &AbilityFlags::default(),
            &uncapped(),
            &mut CombatRng::new(2),
        );
        assert!(!magical.is_parried);
        assert!(magical.landed());
    }

    #[test]
    fn ignore_flags_skip_their_stages() {
        let attacker = stats_with(&[
            (keys::PHYSICAL_DAMAGE_MIN, 10.0),
            (keys::PHYSICAL_DAMAGE_MAX, 10.0),
        ]);
        let defender = stats_with(&[(keys::PARRY_CHANCE, 1.0), (keys::DODGE_CHANCE, 1.0)]);
        let flags = AbilityFlags { ignore_parry: true, ignore_dodge: true, ..Default::default() };
        let res = resolve_hit(
            &attacker,
            &defender,
            0,
            &[Zone::Head],
            &[Zone::Legs, Zone::Feet],
            DamageType::Physical,
            &flags,
            &uncapped(),
            &mut CombatRng::new(4),
        );
        assert!(!res.is_parried);
        assert!(!res.is_dodged);
        assert_eq!(res.damage_total, 10);
    }

    #[test]
    fn passive_block_reduces_and_short_circuits() {
        let attacker = stats_with(&[
            (keys::PHYSICAL_DAMAGE_MIN, 100.0),
            (keys::PHYSICAL_DAMAGE_MAX, 100.0),
        ]);
        // High resistance must be ignored: the passive branch skips mitigation.
        let defender = stats_with(&[
            (keys::SHIELD_BLOCK_CHANCE, 1.0),
            (keys::RESISTANCE, 0.85),
        ]);
        let tables = CombatTables { shield_block_cap: 1.0, ..Default::default() };
        let res = resolve_hit(
            &attacker,
            &defender,
            0,
            &[Zone::Head],
            &[Zone::Legs, Zone::Feet],
            DamageType::Physical,
            &AbilityFlags::default(),
            &tables,
            &mut CombatRng::new(6),
        );
        assert_eq!(res.block, Some(BlockKind::Passive));
        // 100 × (1 − 0.5 default block power)
        assert_eq!(res.damage_total, 50);
        assert_eq!(res.tokens_def.get(TokenKind::Block), 1);
    }

    #[test]
    fn resistance_clamps_at_cap() {
        let attacker = stats_with(&[
            (keys::PHYSICAL_DAMAGE_MIN, 100.0),
            (keys::PHYSICAL_DAMAGE_MAX, 100.0),
        ]);
        let defender = stats_with(&[(keys::RESISTANCE, 5.0)]);
        let res = resolve_hit(
            &attacker,
            &defender,
            0,
            &[Zone::Head],
            &[Zone::Legs, Zone::Feet],
            DamageType::Physical,
            &AbilityFlags::default(),
            &CombatTables::default(),
            &mut CombatRng::new(10),
        );
        // 100 × (1 − 0.85) = 15
        assert_eq!(res.damage_total, 15);
    }

    #[test]
    fn penetration_floors_net_resist_at_zero() {
        let attacker = stats_with(&[
            (keys::PHYSICAL_DAMAGE_MIN, 50.0),
            (keys::PHYSICAL_DAMAGE_MAX, 50.0),
            (keys::PENETRATION, 0.9),
        ]);
        let defender = stats_with(&[(keys::RESISTANCE, 0.3)]);
        let res = resolve_hit(
            &attacker,
            &defender,
            0,
            &[Zone::Head],
            &[Zone::Legs, Zone::Feet],
            DamageType::Physical,
            &AbilityFlags::default(),
            &CombatTables::default(),
            &mut CombatRng::new(10),
        );
        assert_eq!(res.damage_total, 50);
    }

    #[test]
    fn mitigation_floors_nonzero_roll_at_one() {
        let attacker = stats_with(&[
            (keys::PHYSICAL_DAMAGE_MIN, 5.0),
            (keys::PHYSICAL_DAMAGE_MAX, 5.0),
        ]);
        let defender = stats_with(&[(keys::DAMAGE_REDUCTION_FLAT, 50.0)]);
        let res = resolve_hit(
            &attacker,
            &defender,
            0,
            &[Zone::Head],
            &[Zone::Legs, Zone::Feet],
            DamageType::Physical,
            &AbilityFlags::default(),
            &CombatTables::default(),
            &mut CombatRng::new(10),
        );
        assert_eq!(res.damage_total, 1);
    }

    #[test]
    fn shield_absorbs_before_hp() {
        let attacker = stats_with(&[
            (keys::PHYSICAL_DAMAGE_MIN, 30.0),
            (keys::PHYSICAL_DAMAGE_MAX, 30.0),
        ]);
        let res = resolve_hit(
            &attacker,
            &AggregatedStats::default(),
            12,
            &[Zone::Head],
            &[Zone::Legs, Zone::Feet],
            DamageType::Physical,
            &AbilityFlags::default(),
            &CombatTables::default(),
            &mut CombatRng::new(10),
        );
        assert_eq!(res.shield_dmg, 12);
        assert_eq!(res.hp_dmg, 18);
    }

    #[test]
    fn vampirism_caps_power() {
        let attacker = stats_with(&[
            (keys::PHYSICAL_DAMAGE_MIN, 100.0),
            (keys::PHYSICAL_DAMAGE_MAX, 100.0),
            (keys::VAMPIRIC_TRIGGER_CHANCE, 1.0),
            (keys::VAMPIRIC_POWER, 0.9),
        ]);
        let res = resolve_hit(
            &attacker,
            &AggregatedStats::default(),
            0,
            &[Zone::Head],
            &[Zone::Legs, Zone::Feet],
            DamageType::Physical,
            &AbilityFlags::default(),
            &CombatTables::default(),
            &mut CombatRng::new(10),
        );
        assert_eq!(res.lifesteal, 50);
    }

    #[test]
    fn thorns_applies_even_on_parry() {
        let defender = stats_with(&[(keys::PARRY_CHANCE, 1.0), (keys::THORNS_DAMAGE, 7.0)]);
        let res = resolve_hit(
            &AggregatedStats::default(),
            &defender,
            0,
            &[Zone::Head],
            &[Zone::Legs, Zone::Feet],
            DamageType::Physical,
            &AbilityFlags::default(),
            &uncapped(),
            &mut CombatRng::new(10),
        );
        assert!(res.is_parried);
        assert_eq!(res.thorns_damage, 7);
    }

    #[test]
    fn override_damage_type_switches_pathway() {
        // No physical damage; fire power via the magical fallback.
        let attacker = stats_with(&[("magical_damage_power", 50.0)]);
        let defender = stats_with(&[(keys::PARRY_CHANCE, 1.0)]);
        let flags = AbilityFlags {
            override_damage_type: Some(DamageType::Fire),
            ..Default::default()
        };
        let res = resolve_hit(
            &attacker,
            &defender,
            0,
            &[Zone::Head],
            &[Zone::Legs, Zone::Feet],
            DamageType::Physical,
            &flags,
            &uncapped(),
            &mut CombatRng::new(10),
        );
        // Fire is not parryable, and the fallback power produced a roll.
        assert!(!res.is_parried);
        assert!(res.damage_total >= 45 && res.damage_total <= 55);
    }

    #[test]
    fn visual_bar_is_five_glyphs() {
        let res = resolve_hit(
            &AggregatedStats::default(),
            &AggregatedStats::default(),
            0,
            &[Zone::Head],
            &[Zone::Chest, Zone::Belly],
            DamageType::Physical,
            &AbilityFlags::default(),
            &CombatTables::default(),
            &mut CombatRng::new(10),
        );
        assert_eq!(res.visual_bar.chars().count(), 5);
    }
}
