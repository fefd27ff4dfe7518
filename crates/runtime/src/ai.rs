//! AI action picker for NPC participants.
//!
//! Target selection uses a threat heuristic: an enemy that has already
//! posted an intent against this actor is preferred, otherwise a uniform
//! random living enemy. Ability choice shuffles the active list and takes the
//! first affordable one.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;

use rbc_core::abilities;
use rbc_core::zones::{BLOCK_PAIRS, ZONES};

use crate::session::{CombatMoveDTO, Participant};

/// Decide one move for an AI actor. `None` when no living opponent remains.
pub fn pick_move<R: Rng + ?Sized>(
    actor: &Participant,
    opponents: &[&Participant],
    threats: &HashSet<i64>,
    now: i64,
    timeout_secs: u64,
    rng: &mut R,
) -> Option<CombatMoveDTO> {
    let alive_ids: Vec<i64> = opponents.iter().filter(|p| !p.is_dead()).map(|p| p.id).collect();
    if alive_ids.is_empty() {
        return None;
    }

    let threatening: Vec<i64> =
        alive_ids.iter().copied().filter(|id| threats.contains(id)).collect();
    let target_id = *threatening.choose(rng).or_else(|| alive_ids.choose(rng))?;

    let ability_key = pick_ability(actor, rng);

    let attack_zone = *ZONES.choose(rng).unwrap_or(&ZONES[0]);
    let block_pair = *BLOCK_PAIRS.choose(rng).unwrap_or(&BLOCK_PAIRS[0]);

    Some(CombatMoveDTO {
        target_id,
        attack_zones: vec![attack_zone],
        block_zones: block_pair.to_vec(),
        ability_key,
        execute_at: now + timeout_secs as i64,
    })
}

/// First affordable ability from a shuffled copy of the active list.
fn pick_ability<R: Rng + ?Sized>(actor: &Participant, rng: &mut R) -> Option<String> {
    let mut keys: Vec<&String> = actor.abilities.iter().collect();
    keys.shuffle(rng);
    keys.into_iter()
        .find(|key| {
            abilities::find(key).is_some_and(|spec| {
                spec.can_use(actor.state.energy_current, &actor.state.tokens)
            })
        })
        .cloned()
}
