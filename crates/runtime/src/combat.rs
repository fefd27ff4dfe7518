//! Exchange resolution: applies calculator output to session state.

use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use rbc_core::abilities::{self, AbilitySpec, PostHook};
use rbc_core::stats::aggregate;
use rbc_core::zones::{ZONES, canonical_block_pair, is_valid_block_pair};
use rbc_core::{
    AbilityFlags, CombatRng, DamageType, HitResult, OFFENCE_FAMILY, SHIELD_FAMILY, XpOutcome,
    xp_amount,
};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::session::{CombatMoveDTO, EffectState, LogEntry, MoveData, Participant};
use crate::store::SessionRepo;

/// How a pair came to be resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExchangeKind {
    /// Both sides had reciprocal intents.
    Mutual,
    /// One intent expired; the named side was given a synthetic passive move
    /// and earns an AFK penalty step.
    ForcedPassive { idle_actor: i64 },
}

/// Victory state after an exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Ongoing,
    /// At most one team still stands. `winner` is `None` on a double KO.
    Finished { winner: Option<String> },
}

/// Resolves exchanges against the session store.
#[derive(Clone)]
pub struct CombatService {
    repo: SessionRepo,
    config: Arc<EngineConfig>,
}

impl CombatService {
    pub fn new(repo: SessionRepo, config: Arc<EngineConfig>) -> Self {
        Self { repo, config }
    }

    /// Auto-repair a malformed client move where safe: unknown/empty attack
    /// zones become one random zone, an invalid block set becomes the
    /// canonical pair. Returns whether anything was repaired.
    pub fn repair_move<R: Rng + ?Sized>(data: &mut MoveData, rng: &mut R) -> bool {
        let mut repaired = false;

        data.attack_zones.dedup();
        if data.attack_zones.is_empty() {
            data.attack_zones = vec![*ZONES.choose(rng).unwrap_or(&ZONES[0])];
            repaired = true;
        }
        if !is_valid_block_pair(&data.block_zones) {
            data.block_zones = canonical_block_pair().to_vec();
            repaired = true;
        }
        repaired
    }

    /// Resolve one exchange between a pair and persist every consequence.
    ///
    /// Atomic at the granularity of both-containers-persist plus log-append:
    /// nothing is written until both directions have been computed.
    #[allow(clippy::too_many_arguments)]
    pub async fn process_exchange(
        &self,
        session_id: &str,
        a_id: i64,
        move_a: &CombatMoveDTO,
        b_id: i64,
        move_b: &CombatMoveDTO,
        kind: ExchangeKind,
        rng: &mut CombatRng,
        now: i64,
    ) -> Result<Verdict> {
        let tables = &self.config.tables;

        // 1. Load both containers.
        let mut a = self
            .repo
            .participant(session_id, a_id)
            .await?
            .ok_or(EngineError::ActorNotFound { session: session_id.to_string(), actor: a_id })?;
        let mut b = self
            .repo
            .participant(session_id, b_id)
            .await?
            .ok_or(EngineError::ActorNotFound { session: session_id.to_string(), actor: b_id })?;

        // 2. Aggregate final stats, live effects included.
        let agg_a = aggregate(&a.aggregate_input(), tables);
        let agg_b = aggregate(&b.aggregate_input(), tables);

        // 3. Resolve ability flags; an unaffordable ability is dropped.
        let spec_a = usable_ability(&a, move_a.ability_key.as_deref());
        let spec_b = usable_ability(&b, move_b.ability_key.as_deref());
        let flags_a = merged_flags(spec_a);
        let flags_b = merged_flags(spec_b);

        // 4. Pre-calc hooks mutate scratch copies only.
        let mut scratch_a = agg_a;
        let mut scratch_b = agg_b;
        if let Some(spec) = spec_a {
            spec.apply_pre(&mut scratch_a);
        }
        if let Some(spec) = spec_b {
            spec.apply_pre(&mut scratch_b);
        }

        // 5. Calculator, both directions, from pre-exchange snapshots.
        let res_a = rbc_core::resolve_hit(
            &scratch_a,
            &scratch_b,
            b.state.energy_current,
            &move_a.attack_zones,
            &move_b.block_zones,
            DamageType::Physical,
            &flags_a,
            tables,
            rng,
        );
        let res_b = rbc_core::resolve_hit(
            &scratch_b,
            &scratch_a,
            a.state.energy_current,
            &move_b.attack_zones,
            &move_a.block_zones,
            DamageType::Physical,
            &flags_b,
            tables,
            rng,
        );

        // 6. Post-calc hooks, each in its originating side's context.
        if let Some(spec) = spec_a {
            apply_post_hooks(spec, &res_a, &mut a, &mut b);
        }
        if let Some(spec) = spec_b {
            apply_post_hooks(spec, &res_b, &mut b, &mut a);
        }

        // 7. Consume ability resources.
        if let Some(spec) = spec_a {
            consume_cost(spec, &mut a);
        }
        if let Some(spec) = spec_b {
            consume_cost(spec, &mut b);
        }

        // 8. XP events.
        credit_xp(&mut a, &res_a, &res_b);
        credit_xp(&mut b, &res_b, &res_a);

        // 9. Damage application: shield first, then HP; thorns and lifesteal.
        b.state.apply_incoming(res_a.shield_dmg, res_a.hp_dmg);
        a.state.apply_incoming(res_b.shield_dmg, res_b.hp_dmg);
        a.state.apply_incoming(0, res_a.thorns_damage);
        b.state.apply_incoming(0, res_b.thorns_damage);
        let restored = a.state.heal(res_a.lifesteal, 0);
        a.state.counters.healing_done += restored;
        let restored = b.state.heal(res_b.lifesteal, 0);
        b.state.counters.healing_done += restored;

        // 10. Passive regeneration hook.
        if let Some(regen) = self.config.regen {
            for side in [&mut a, &mut b] {
                if !side.is_dead() {
                    let (hp, energy) = regen(&side.state);
                    side.state.heal(hp, energy);
                }
            }
        }

        // 11–12. Exchange counters, stat counters, tokens, penalties, effects.
        a.state.exchange_count += 1;
        b.state.exchange_count += 1;
        update_counters(&mut a, &res_a, &res_b);
        update_counters(&mut b, &res_b, &res_a);
        a.state.tokens.merge(&res_a.tokens_atk);
        a.state.tokens.merge(&res_b.tokens_def);
        b.state.tokens.merge(&res_b.tokens_atk);
        b.state.tokens.merge(&res_a.tokens_def);

        match kind {
            ExchangeKind::Mutual => {
                a.state.afk_penalty_level = 0;
                b.state.afk_penalty_level = 0;
            }
            ExchangeKind::ForcedPassive { idle_actor } => {
                let (idle, active) = if idle_actor == b_id { (&mut b, &mut a) } else { (&mut a, &mut b) };
                idle.state.raise_afk_penalty();
                active.state.afk_penalty_level = 0;
            }
        }
        a.state.penalty_timer = self.config.timeout_for(a.state.afk_penalty_level) as i64;
        b.state.penalty_timer = self.config.timeout_for(b.state.afk_penalty_level) as i64;

        a.state.tick_effects();
        b.state.tick_effects();

        // 13–14. Persist both containers, then append the log entry.
        self.repo.put_participant(session_id, &a).await?;
        self.repo.put_participant(session_id, &b).await?;
        let entry = LogEntry {
            ts: now,
            round: a.state.exchange_count.max(b.state.exchange_count),
            names: [a.name.clone(), b.name.clone()],
            lines: [narrate(&a, &b, &res_a), narrate(&b, &a, &res_b)],
        };
        self.repo.append_log(session_id, &entry).await?;

        // 15. Queue rotation; dead opponents are not re-queued.
        self.repo.rotate_exchange(session_id, a_id, b_id, !b.is_dead()).await?;
        self.repo.rotate_exchange(session_id, b_id, a_id, !a.is_dead()).await?;

        debug!(
            session = session_id,
            a = a_id,
            b = b_id,
            dmg_a = res_a.damage_total,
            dmg_b = res_b.damage_total,
            "exchange resolved"
        );

        // 16. Victory check.
        self.victory_check(session_id, &[&a, &b]).await
    }

    /// Record deaths in the metadata and report the verdict.
    async fn victory_check(&self, session_id: &str, touched: &[&Participant]) -> Result<Verdict> {
        let Some(mut meta) = self.repo.meta(session_id).await? else {
            return Ok(Verdict::Ongoing);
        };

        let mut changed = false;
        for participant in touched {
            if participant.is_dead() && meta.dead_actors.insert(participant.id) {
                changed = true;
            }
        }
        if changed {
            self.repo.write_meta(&meta).await?;
        }

        let alive: Vec<String> = meta.alive_teams().iter().map(|t| t.to_string()).collect();
        match alive.len() {
            0 => Ok(Verdict::Finished { winner: None }),
            1 => Ok(Verdict::Finished { winner: alive.into_iter().next() }),
            _ => Ok(Verdict::Ongoing),
        }
    }
}

/// The ability spec for a move, if the key resolves and the actor can pay.
fn usable_ability(actor: &Participant, key: Option<&str>) -> Option<&'static AbilitySpec> {
    let key = key?;
    match abilities::find(key) {
        Some(spec) if spec.can_use(actor.state.energy_current, &actor.state.tokens) => Some(spec),
        Some(_) => {
            debug!(actor = actor.id, ability = key, "ability unaffordable; resolved without it");
            None
        }
        None => {
            warn!(actor = actor.id, ability = key, "unknown ability key on intent");
            None
        }
    }
}

fn merged_flags(spec: Option<&'static AbilitySpec>) -> AbilityFlags {
    let mut flags = AbilityFlags::default();
    if let Some(spec) = spec {
        flags.merge(&spec.flags);
    }
    flags
}

/// Interpret declarative post hooks: `user` cast the ability, `opponent` was
/// the target of its hit.
fn apply_post_hooks(
    spec: &AbilitySpec,
    result: &HitResult,
    user: &mut Participant,
    opponent: &mut Participant,
) {
    for hook in spec.post {
        match hook {
            PostHook::HealFraction { of_damage } => {
                let amount = (result.damage_total as f64 * of_damage).floor() as i64;
                let restored = user.state.heal(amount, 0);
                user.state.counters.healing_done += restored;
            }
            PostHook::ApplyEffect { name, stat, amount, rounds } => {
                opponent.state.effects.insert(
                    (*name).to_string(),
                    EffectState { stat: (*stat).to_string(), amount: *amount, rounds_left: *rounds },
                );
            }
            PostHook::SpendTokens { kind, count } => {
                user.state.tokens.spend(*kind, *count);
            }
        }
    }
}

fn consume_cost(spec: &AbilitySpec, user: &mut Participant) {
    user.state.energy_current = (user.state.energy_current - spec.cost.energy).max(0);
    for (kind, count) in spec.cost.tokens {
        user.state.tokens.spend(*kind, *count);
    }
}

/// XP signals for one side. `own` is this side attacking, `incoming` the
/// opponent's strike on them.
fn credit_xp(side: &mut Participant, own: &HitResult, incoming: &HitResult) {
    let offence = if own.is_parried || own.is_dodged {
        Some(XpOutcome::Miss)
    } else if own.is_crit && own.landed() {
        Some(XpOutcome::Crit)
    } else if own.is_blocked {
        Some(XpOutcome::Partial)
    } else if own.landed() {
        Some(XpOutcome::Success)
    } else {
        None
    };
    if let Some(outcome) = offence {
        side.state.add_xp(OFFENCE_FAMILY, xp_amount(outcome));
    }

    if incoming.landed()
        && let Some(subtype) = side.armor_subtype()
    {
        let family = subtype.to_string();
        side.state.add_xp(&family, xp_amount(XpOutcome::Success));
    }

    if incoming.is_blocked {
        side.state.add_xp(SHIELD_FAMILY, xp_amount(XpOutcome::Success));
    }
}

fn update_counters(side: &mut Participant, own: &HitResult, incoming: &HitResult) {
    let counters = &mut side.state.counters;
    counters.damage_dealt += own.damage_total;
    counters.damage_taken += incoming.damage_total;
    if own.is_crit {
        counters.crits_landed += 1;
    }
    if incoming.is_blocked {
        counters.blocks_success += 1;
    }
    if incoming.is_dodged {
        counters.dodges_success += 1;
    }
}

/// One directional log line: outcome plus the defender's resulting meters.
fn narrate(attacker: &Participant, defender: &Participant, result: &HitResult) -> String {
    let outcome = if result.logs.is_empty() {
        "no effect".to_string()
    } else {
        result.logs.join(", ")
    };
    format!(
        "{} → {} [{}]: {}; {} at {}/{} HP, {} EN",
        attacker.name,
        defender.name,
        result.visual_bar,
        outcome,
        defender.name,
        defender.state.hp_current,
        defender.state.hp_max,
        defender.state.energy_current,
    )
}
