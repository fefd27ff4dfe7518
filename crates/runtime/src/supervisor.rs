//! Per-session supervisor: the cooperative task that advances a session by
//! detecting resolvable pairs and driving the exchange resolver.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use rbc_core::CombatRng;
use rbc_core::zones::canonical_block_pair;

use crate::ai;
use crate::combat::{CombatService, ExchangeKind, Verdict};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::lifecycle::LifecycleService;
use crate::session::{CombatMoveDTO, Participant};
use crate::store::SessionRepo;

/// What one cycle accomplished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// At least one exchange was resolved; poll again soon.
    Worked,
    /// Nothing to do; back off to the idle interval.
    Idle,
    /// The session is over (or gone); the supervisor should exit.
    Finished,
}

/// The supervisor for one active session.
///
/// Owned by the session: it terminates when the session goes inactive.
/// The loop is resilient - an error inside an iteration is logged and the
/// loop continues after a backoff.
pub struct Supervisor {
    session_id: String,
    repo: SessionRepo,
    combat: CombatService,
    lifecycle: LifecycleService,
    config: Arc<EngineConfig>,
    /// Seeded per session; drives every calculator roll for replayability.
    rng: CombatRng,
    /// Drives AI move synthesis only.
    picker: StdRng,
}

impl Supervisor {
    pub fn new(
        session_id: String,
        repo: SessionRepo,
        combat: CombatService,
        lifecycle: LifecycleService,
        config: Arc<EngineConfig>,
        seed: u64,
    ) -> Self {
        Self {
            session_id,
            repo,
            combat,
            lifecycle,
            config,
            rng: CombatRng::new(seed),
            picker: StdRng::seed_from_u64(seed ^ 0x5eed),
        }
    }

    /// Run until the session finishes. Cancellation-safe: each cycle's
    /// writes are atomic at container+log granularity.
    pub async fn run(mut self) {
        loop {
            let now = Utc::now().timestamp();
            match self.run_cycle(now).await {
                Ok(CycleOutcome::Finished) => break,
                Ok(CycleOutcome::Worked) => tokio::time::sleep(self.config.poll_busy).await,
                Ok(CycleOutcome::Idle) => tokio::time::sleep(self.config.poll_idle).await,
                Err(error) => {
                    warn!(session = %self.session_id, %error, "supervisor iteration failed");
                    tokio::time::sleep(self.config.error_backoff).await;
                }
            }
        }
        debug!(session = %self.session_id, "supervisor exited");
    }

    /// One supervision cycle at an explicit wall-clock second.
    ///
    /// Public so tests can drive cycles with pinned time.
    pub async fn run_cycle(&mut self, now: i64) -> Result<CycleOutcome> {
        // 1. Re-read metadata; exit on missing or inactive session.
        let Some(meta) = self.repo.meta(&self.session_id).await? else {
            return Ok(CycleOutcome::Finished);
        };
        if !meta.active {
            return Ok(CycleOutcome::Finished);
        }

        // 2. Roster and liveness straight from the containers.
        let roster = self.repo.participants(&self.session_id).await?;
        let known: HashSet<i64> = roster.iter().map(|p| p.id).collect();
        let mut dead: HashSet<i64> = roster.iter().filter(|p| p.is_dead()).map(|p| p.id).collect();

        // 3. Victory check before doing any work.
        let alive_teams: HashSet<&str> = roster
            .iter()
            .filter(|p| !p.is_dead())
            .map(|p| p.team.as_str())
            .collect();
        if alive_teams.len() <= 1 {
            let winner = alive_teams.into_iter().next().map(str::to_string);
            self.lifecycle.finalize(&self.session_id, winner.as_deref(), now).await?;
            return Ok(CycleOutcome::Finished);
        }

        // 4. Collect outstanding intents; synthesize for idle AI actors.
        let mut intents: BTreeMap<i64, BTreeMap<i64, CombatMoveDTO>> = BTreeMap::new();
        for participant in &roster {
            intents.insert(
                participant.id,
                self.repo.intents_of(&self.session_id, participant.id).await?,
            );
        }

        for participant in roster.iter().filter(|p| p.ai && !p.is_dead()) {
            if !intents.get(&participant.id).is_none_or(|targets| targets.is_empty()) {
                continue;
            }
            let threats: HashSet<i64> = intents
                .iter()
                .filter(|(_, targets)| targets.contains_key(&participant.id))
                .map(|(actor, _)| *actor)
                .collect();
            let opponents: Vec<&Participant> = roster
                .iter()
                .filter(|p| p.team != participant.team)
                .collect();
            let timeout = self.config.timeout_for(participant.state.afk_penalty_level);
            if let Some(intent) =
                ai::pick_move(participant, &opponents, &threats, now, timeout, &mut self.picker)
            {
                debug!(session = %self.session_id, actor = participant.id, target = intent.target_id, "AI intent synthesized");
                self.repo.put_intent(&self.session_id, participant.id, &intent).await?;
                intents.entry(participant.id).or_default().insert(intent.target_id, intent);
            }
        }

        // 5. Single pass over pairs: drop stale intents, resolve mutual pairs
        //    first, then solo expiries. At most one exchange per pair per
        //    cycle, in participant-iteration order.
        let mut handled: HashSet<(i64, i64)> = HashSet::new();
        let mut worked = false;

        // Stale cleanup: dead actors and dead/vanished targets.
        for (actor, targets) in &intents {
            let actor_gone = !known.contains(actor) || dead.contains(actor);
            for target in targets.keys() {
                let target_gone = !known.contains(target) || dead.contains(target);
                if actor_gone || target_gone {
                    self.repo.remove_intent(&self.session_id, *actor, *target).await?;
                }
            }
        }

        // Mutual pairs take precedence over expiry for the same actor.
        for (actor, targets) in &intents {
            for (target, intent) in targets {
                if handled.contains(&pair_key(*actor, *target)) {
                    continue;
                }
                if !pair_available(&known, &dead, *actor, *target) {
                    continue;
                }
                let Some(reciprocal) = intents.get(target).and_then(|t| t.get(actor)) else {
                    continue;
                };
                handled.insert(pair_key(*actor, *target));
                let verdict = self
                    .combat
                    .process_exchange(
                        &self.session_id,
                        *actor,
                        intent,
                        *target,
                        reciprocal,
                        ExchangeKind::Mutual,
                        &mut self.rng,
                        now,
                    )
                    .await?;
                self.repo.remove_intent(&self.session_id, *actor, *target).await?;
                self.repo.remove_intent(&self.session_id, *target, *actor).await?;
                worked = true;
                self.note_deaths(&mut dead, &[*actor, *target]).await?;
                if let Verdict::Finished { winner } = verdict {
                    self.lifecycle
                        .finalize(&self.session_id, winner.as_deref(), now)
                        .await?;
                    return Ok(CycleOutcome::Finished);
                }
            }
        }

        // Expired intents resolve against a forced passive.
        for (actor, targets) in &intents {
            for (target, intent) in targets {
                if handled.contains(&pair_key(*actor, *target)) || intent.execute_at > now {
                    continue;
                }
                if !pair_available(&known, &dead, *actor, *target) {
                    continue;
                }
                handled.insert(pair_key(*actor, *target));
                let passive = CombatMoveDTO {
                    target_id: *actor,
                    attack_zones: Vec::new(),
                    block_zones: canonical_block_pair().to_vec(),
                    ability_key: None,
                    execute_at: now,
                };
                let verdict = self
                    .combat
                    .process_exchange(
                        &self.session_id,
                        *actor,
                        intent,
                        *target,
                        &passive,
                        ExchangeKind::ForcedPassive { idle_actor: *target },
                        &mut self.rng,
                        now,
                    )
                    .await?;
                self.repo.remove_intent(&self.session_id, *actor, *target).await?;
                worked = true;
                self.note_deaths(&mut dead, &[*actor, *target]).await?;
                if let Verdict::Finished { winner } = verdict {
                    self.lifecycle
                        .finalize(&self.session_id, winner.as_deref(), now)
                        .await?;
                    return Ok(CycleOutcome::Finished);
                }
            }
        }

        Ok(if worked { CycleOutcome::Worked } else { CycleOutcome::Idle })
    }

    /// Refresh the local dead-set for a just-resolved pair so later pairs in
    /// the same cycle never involve a corpse.
    async fn note_deaths(&self, dead: &mut HashSet<i64>, ids: &[i64]) -> Result<()> {
        for id in ids {
            if self
                .repo
                .participant(&self.session_id, *id)
                .await?
                .is_some_and(|p| p.is_dead())
            {
                dead.insert(*id);
            }
        }
        Ok(())
    }
}

fn pair_available(known: &HashSet<i64>, dead: &HashSet<i64>, actor: i64, target: i64) -> bool {
    known.contains(&actor)
        && known.contains(&target)
        && !dead.contains(&actor)
        && !dead.contains(&target)
}

fn pair_key(a: i64, b: i64) -> (i64, i64) {
    (a.min(b), a.max(b))
}

/// Handles of running supervisors, keyed by session id.
///
/// Single-writer discipline: only the engine inserts and removes entries.
#[derive(Clone, Default)]
pub struct SupervisorRegistry {
    inner: Arc<RwLock<HashMap<String, JoinHandle<()>>>>,
}

impl SupervisorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session_id: String, handle: JoinHandle<()>) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(session_id, handle);
        }
    }

    pub fn remove(&self, session_id: &str) {
        if let Ok(mut map) = self.inner.write() {
            map.remove(session_id);
        }
    }

    /// Whether a live supervisor task exists for the session.
    pub fn is_running(&self, session_id: &str) -> bool {
        self.inner
            .read()
            .map(|map| map.get(session_id).is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Cancel one supervisor. Session state stays consistent: every exchange
    /// is atomic at container+log granularity.
    pub fn cancel(&self, session_id: &str) {
        if let Ok(mut map) = self.inner.write()
            && let Some(handle) = map.remove(session_id)
        {
            handle.abort();
        }
    }

    /// Cancel every supervisor (shutdown path).
    pub fn cancel_all(&self) {
        if let Ok(mut map) = self.inner.write() {
            for (_, handle) in map.drain() {
                handle.abort();
            }
        }
    }
}
