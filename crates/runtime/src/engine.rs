//! The engine: owns the store, services, and supervisor registry, and
//! exposes the consumer-facing RPC surface.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::analytics::{AnalyticsEvent, AnalyticsSink};
use crate::combat::CombatService;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::lifecycle::LifecycleService;
use crate::matchmaking::MatchmakingService;
use crate::profile::{CombatantProfile, ProfileOracle, StaticProfiles};
use crate::session::{
    ActorSnapshot, CombatDashboardDTO, CombatMoveDTO, LogEntry, MoveData, NextTarget,
    SessionStatus,
};
use crate::store::{MemoryStore, SessionRepo, SessionStore};
use crate::supervisor::{Supervisor, SupervisorRegistry};

/// Per-battle knobs passed to `start_battle`.
#[derive(Clone, Debug)]
pub struct BattleConfig {
    pub mode: String,
    pub battle_type: String,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self { mode: "pve".to_string(), battle_type: "skirmish".to_string() }
    }
}

/// Cloneable engine façade.
///
/// All RPCs go straight to the store; they never require the supervisor's
/// cooperation beyond write-your-intent-then-read-your-snapshot.
#[derive(Clone)]
pub struct Engine {
    repo: SessionRepo,
    config: Arc<EngineConfig>,
    profiles: Arc<dyn ProfileOracle>,
    lifecycle: LifecycleService,
    combat: CombatService,
    matchmaking: MatchmakingService,
    supervisors: SupervisorRegistry,
    analytics: AnalyticsSink,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn repo(&self) -> &SessionRepo {
        &self.repo
    }

    pub fn subscribe_analytics(&self) -> broadcast::Receiver<AnalyticsEvent> {
        self.analytics.subscribe()
    }

    // ------------------------------------------------------------------
    // Battle creation and recovery
    // ------------------------------------------------------------------

    /// Create a session with the given sides, initialize battle state, and
    /// launch its supervisor. Returns the first player's dashboard.
    pub async fn start_battle(
        &self,
        players: &[CombatantProfile],
        enemies: &[CombatantProfile],
        battle: BattleConfig,
    ) -> Result<CombatDashboardDTO> {
        let first = players
            .first()
            .ok_or_else(|| EngineError::InvalidIntent("at least one player required".into()))?;

        let now = Utc::now().timestamp();
        let mut meta = self
            .lifecycle
            .create_session(&battle.mode, &battle.battle_type, now)
            .await?;
        for profile in players {
            self.lifecycle.add_participant(&mut meta, profile, "blue").await?;
        }
        for profile in enemies {
            self.lifecycle.add_participant(&mut meta, profile, "red").await?;
        }
        self.lifecycle.init_battle_state(&meta.session_id).await?;
        self.spawn_supervisor(&meta.session_id);

        self.dashboard(&meta.session_id, first.char_id).await
    }

    /// Relaunch supervisors for every session whose metadata still says
    /// `active = 1`. Call once after process restart.
    pub async fn recover(&self) -> Result<Vec<String>> {
        let sessions = self.lifecycle.recover_active_sessions().await?;
        for session_id in &sessions {
            info!(session = %session_id, "recovering active session");
            self.spawn_supervisor(session_id);
        }
        Ok(sessions)
    }

    /// Cancel every running supervisor. Session state stays consistent and
    /// recoverable.
    pub fn shutdown(&self) {
        self.supervisors.cancel_all();
    }

    fn spawn_supervisor(&self, session_id: &str) {
        if self.supervisors.is_running(session_id) {
            return;
        }
        let seed = self.config.seed.unwrap_or_else(rand::random);
        let supervisor = Supervisor::new(
            session_id.to_string(),
            self.repo.clone(),
            self.combat.clone(),
            self.lifecycle.clone(),
            Arc::clone(&self.config),
            seed,
        );
        let registry = self.supervisors.clone();
        let key = session_id.to_string();
        let handle = tokio::spawn(async move {
            let session = key.clone();
            supervisor.run().await;
            registry.remove(&session);
        });
        self.supervisors.insert(session_id.to_string(), handle);
    }

    // ------------------------------------------------------------------
    // Combat RPCs
    // ------------------------------------------------------------------

    /// Register a move intent. Repairs what it safely can, rejects the rest,
    /// and returns the caller's fresh dashboard.
    pub async fn register_move(
        &self,
        session_id: &str,
        char_id: i64,
        target_id: i64,
        mut data: MoveData,
    ) -> Result<CombatDashboardDTO> {
        let meta = self
            .repo
            .meta(session_id)
            .await?
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;
        if !meta.active {
            return self.dashboard(session_id, char_id).await;
        }

        let actor = self
            .repo
            .participant(session_id, char_id)
            .await?
            .ok_or(EngineError::ActorNotFound { session: session_id.to_string(), actor: char_id })?;
        if actor.is_dead() {
            return Err(EngineError::InvalidIntent("dead participants may not act".into()));
        }
        if !actor.state.targets.contains(&target_id) {
            return Err(EngineError::InvalidIntent(format!("{target_id} is not in your target list")));
        }
        let target = self
            .repo
            .participant(session_id, target_id)
            .await?
            .ok_or(EngineError::ActorNotFound { session: session_id.to_string(), actor: target_id })?;
        if target.is_dead() {
            return Err(EngineError::InvalidIntent("target is already down".into()));
        }

        if CombatService::repair_move(&mut data, &mut rand::thread_rng()) {
            warn!(session = session_id, char_id, "malformed move auto-repaired");
        }

        let timeout = self.config.timeout_for(actor.state.afk_penalty_level);
        let now = Utc::now().timestamp();
        let intent = CombatMoveDTO {
            target_id,
            attack_zones: data.attack_zones,
            block_zones: data.block_zones,
            ability_key: data.ability_key,
            execute_at: now + timeout as i64,
        };
        self.repo.put_intent(session_id, char_id, &intent).await?;

        // Submitting counts as participation: the penalty ladder resets for
        // subsequent intents.
        self.repo
            .update_participant(session_id, char_id, |p| {
                p.state.afk_penalty_level = 0;
            })
            .await?;

        self.dashboard(session_id, char_id).await
    }

    pub async fn get_dashboard_snapshot(
        &self,
        session_id: &str,
        char_id: i64,
    ) -> Result<CombatDashboardDTO> {
        self.dashboard(session_id, char_id).await
    }

    /// Promote a listed opponent to current target, spending one charge.
    /// Switching to the current head is a free no-op.
    pub async fn switch_target(
        &self,
        session_id: &str,
        char_id: i64,
        new_target_id: i64,
    ) -> Result<(bool, String)> {
        let target = self.repo.participant(session_id, new_target_id).await?;
        if target.is_none_or(|t| t.is_dead()) {
            return Ok((false, "that target is not available".to_string()));
        }

        let outcome = self
            .repo
            .update_participant(session_id, char_id, move |p| {
                let state = &mut p.state;
                if !state.targets.contains(&new_target_id) {
                    return (false, "not in your target list".to_string());
                }
                if state.current_target() == Some(new_target_id) {
                    return (true, "already your current target".to_string());
                }
                if state.switch_charges == 0 {
                    return (false, "no switch charges left".to_string());
                }
                state.targets.retain(|id| *id != new_target_id);
                state.targets.insert(0, new_target_id);
                state.switch_charges -= 1;
                (true, "target switched".to_string())
            })
            .await?;

        outcome.ok_or(EngineError::ActorNotFound {
            session: session_id.to_string(),
            actor: char_id,
        })
    }

    /// Drink from the belt. Stock and meters update under per-key
    /// serialization.
    pub async fn use_consumable(
        &self,
        session_id: &str,
        char_id: i64,
        item_id: &str,
    ) -> Result<(bool, String)> {
        let item_key = item_id.to_string();
        let outcome = self
            .repo
            .update_participant(session_id, char_id, move |p| {
                if p.is_dead() {
                    return (false, "you are down".to_string());
                }
                let Some(item) = p.belt.iter_mut().find(|i| i.item_id == item_key) else {
                    return (false, "no such item on your belt".to_string());
                };
                if item.stock == 0 {
                    return (false, format!("{} is out of stock", item.name));
                }
                item.stock -= 1;
                let (hp, energy, name) = (item.heal_hp, item.heal_energy, item.name.clone());
                let restored = p.state.heal(hp, energy);
                p.state.counters.healing_done += restored;
                (true, format!("used {name}"))
            })
            .await?;

        outcome.ok_or(EngineError::ActorNotFound {
            session: session_id.to_string(),
            actor: char_id,
        })
    }

    /// Peek the next live opponent in the caller's exchange queue.
    pub async fn get_next_target(
        &self,
        session_id: &str,
        char_id: i64,
    ) -> Result<Option<NextTarget>> {
        let queue = self.repo.exchange_queue(session_id, char_id).await?;
        for id in queue {
            if let Some(p) = self.repo.participant(session_id, id).await?
                && !p.is_dead()
            {
                return Ok(Some(NextTarget { char_id: p.id, hp_current: p.state.hp_current }));
            }
        }
        Ok(None)
    }

    /// Raw JSON log entries, oldest first, capped at `limit`.
    pub async fn get_logs(&self, session_id: &str, limit: usize) -> Result<Vec<String>> {
        self.repo.logs_tail(session_id, limit).await
    }

    // ------------------------------------------------------------------
    // 1v1 matchmaking RPCs
    // ------------------------------------------------------------------

    pub async fn join_queue(&self, mode: &str, char_id: i64) -> Result<()> {
        let profile = self.profiles.profile(char_id).await?;
        let now = Utc::now().timestamp();
        self.matchmaking.join_queue(mode, char_id, profile.rating, now).await
    }

    /// Timer-driven poll: try to match inside the widening band; past the
    /// configured wait, fall back to a shadow battle.
    pub async fn check_and_match(
        &self,
        mode: &str,
        char_id: i64,
        attempt: u32,
    ) -> Result<Option<String>> {
        if let Some(opponent) = self.matchmaking.find_opponent(mode, char_id, attempt).await? {
            return Ok(Some(self.create_pvp_battle(mode, char_id, opponent).await?));
        }

        let now = Utc::now().timestamp();
        let waited = self.matchmaking.elapsed(char_id, now).await?.unwrap_or(0);
        if waited >= self.config.matchmaking_timeout.as_secs() as i64 {
            return Ok(Some(self.create_shadow_battle(mode, char_id).await?));
        }
        Ok(None)
    }

    pub async fn cancel_queue(&self, mode: &str, char_id: i64) -> Result<()> {
        self.matchmaking.cancel(mode, char_id).await
    }

    /// Cancel the queue and spin up a solo session against an AI shadow of
    /// the caller.
    pub async fn create_shadow_battle(&self, mode: &str, char_id: i64) -> Result<String> {
        self.matchmaking.cancel(mode, char_id).await?;
        let profile = self.profiles.profile(char_id).await?;

        let now = Utc::now().timestamp();
        let mut meta = self.lifecycle.create_session(mode, "arena_shadow", now).await?;
        self.lifecycle.add_participant(&mut meta, &profile, "blue").await?;
        self.lifecycle
            .add_shadow(
                &mut meta,
                -1,
                &format!("Shadow of {}", profile.name),
                "red",
                profile.stat_input.clone(),
                profile.abilities.clone(),
            )
            .await?;
        self.lifecycle.init_battle_state(&meta.session_id).await?;
        self.spawn_supervisor(&meta.session_id);
        Ok(meta.session_id)
    }

    async fn create_pvp_battle(&self, mode: &str, char_a: i64, char_b: i64) -> Result<String> {
        let profile_a = self.profiles.profile(char_a).await?;
        let profile_b = self.profiles.profile(char_b).await?;

        let now = Utc::now().timestamp();
        let mut meta = self.lifecycle.create_session(mode, "arena_1v1", now).await?;
        self.lifecycle.add_participant(&mut meta, &profile_a, "blue").await?;
        self.lifecycle.add_participant(&mut meta, &profile_b, "red").await?;
        self.lifecycle.init_battle_state(&meta.session_id).await?;
        self.spawn_supervisor(&meta.session_id);
        Ok(meta.session_id)
    }

    // ------------------------------------------------------------------
    // Dashboard assembly
    // ------------------------------------------------------------------

    async fn dashboard(&self, session_id: &str, char_id: i64) -> Result<CombatDashboardDTO> {
        let meta = self
            .repo
            .meta(session_id)
            .await?
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;
        let roster = self.repo.participants(session_id).await?;
        let player = roster
            .iter()
            .find(|p| p.id == char_id)
            .ok_or(EngineError::ActorNotFound { session: session_id.to_string(), actor: char_id })?;

        let status = if !meta.active {
            SessionStatus::Finished
        } else if self.repo.has_intent(session_id, char_id).await? {
            SessionStatus::Waiting
        } else {
            SessionStatus::Active
        };

        let find = |id: i64| roster.iter().find(|p| p.id == id);
        let current_target = player.state.current_target().and_then(find).map(ActorSnapshot::of);

        let (mut enemies, mut allies) = (Vec::new(), Vec::new());
        for other in &roster {
            if other.id == player.id {
                continue;
            }
            if other.team == player.team {
                allies.push(ActorSnapshot::of(other));
            } else {
                enemies.push(ActorSnapshot::of(other));
            }
        }

        let last_logs = self
            .repo
            .logs_tail(session_id, 5)
            .await?
            .iter()
            .filter_map(|raw| serde_json::from_str::<LogEntry>(raw).ok())
            .flat_map(|entry| entry.lines)
            .collect();

        Ok(CombatDashboardDTO {
            session_id: session_id.to_string(),
            status,
            player: ActorSnapshot::of(player),
            current_target,
            enemies,
            allies,
            queue_count: self.repo.exchange_queue_len(session_id, char_id).await?,
            switch_charges: player.state.switch_charges,
            last_logs,
            winner_team: meta.winner.clone(),
        })
    }
}

/// Builder for [`Engine`] with flexible configuration.
#[derive(Default)]
pub struct EngineBuilder {
    store: Option<Arc<dyn SessionStore>>,
    config: EngineConfig,
    profiles: Option<Arc<dyn ProfileOracle>>,
}

impl EngineBuilder {
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn profiles(mut self, profiles: Arc<dyn ProfileOracle>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub fn build(self) -> Engine {
        let store = self.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let repo = SessionRepo::new(store);
        let config = Arc::new(self.config);
        let profiles = self.profiles.unwrap_or_else(|| Arc::new(StaticProfiles::new()));
        let analytics = AnalyticsSink::default();
        let lifecycle = LifecycleService::new(repo.clone(), Arc::clone(&config), analytics.clone());
        let combat = CombatService::new(repo.clone(), Arc::clone(&config));
        let matchmaking = MatchmakingService::new(repo.clone(), Arc::clone(&config));

        Engine {
            repo,
            config,
            profiles,
            lifecycle,
            combat,
            matchmaking,
            supervisors: SupervisorRegistry::new(),
            analytics,
        }
    }
}

impl Engine {
    /// Direct access to the lifecycle service (tests, admin tooling).
    pub fn lifecycle(&self) -> &LifecycleService {
        &self.lifecycle
    }

    /// Direct access to the combat service (tests, balance tooling).
    pub fn combat(&self) -> &CombatService {
        &self.combat
    }

    /// Build a supervisor for manual cycle driving (tests).
    pub fn manual_supervisor(&self, session_id: &str, seed: u64) -> Supervisor {
        Supervisor::new(
            session_id.to_string(),
            self.repo.clone(),
            self.combat.clone(),
            self.lifecycle.clone(),
            Arc::clone(&self.config),
            seed,
        )
    }

    /// The engine's config (read-only).
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
