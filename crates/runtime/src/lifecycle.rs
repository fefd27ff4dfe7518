//! Session life-cycle: creation, participant seating, battle-state
//! initialization, finalization, and crash recovery.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use rbc_core::stats::{aggregate, keys as stat_keys};

use crate::analytics::{AnalyticsEvent, AnalyticsSink, ParticipantReport, SessionReport};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::profile::CombatantProfile;
use crate::session::{FighterState, Participant, ParticipantKind, SessionMeta};
use crate::store::SessionRepo;

#[derive(Clone)]
pub struct LifecycleService {
    repo: SessionRepo,
    config: Arc<EngineConfig>,
    analytics: AnalyticsSink,
}

impl LifecycleService {
    pub fn new(repo: SessionRepo, config: Arc<EngineConfig>, analytics: AnalyticsSink) -> Self {
        Self { repo, config, analytics }
    }

    /// Allocate a session id and write initial metadata.
    pub async fn create_session(
        &self,
        mode: &str,
        battle_type: &str,
        now: i64,
    ) -> Result<SessionMeta> {
        let session_id = Uuid::new_v4().to_string();
        let meta = SessionMeta::new(session_id, now, mode.to_string(), battle_type.to_string());
        self.repo.write_meta(&meta).await?;
        info!(session = %meta.session_id, mode, "session created");
        Ok(meta)
    }

    /// Seat a character: aggregate full stats, build the container at full
    /// HP/energy, persist, and roster it on a team.
    pub async fn add_participant(
        &self,
        meta: &mut SessionMeta,
        profile: &CombatantProfile,
        team: &str,
    ) -> Result<Participant> {
        let agg = aggregate(&profile.stat_input, &self.config.tables);
        let hp_max = agg.value_i64(stat_keys::HP_MAX).max(1);
        let energy_max = agg.value_i64(stat_keys::ENERGY_MAX).max(0);

        let participant = Participant {
            id: profile.char_id,
            name: profile.name.clone(),
            team: team.to_string(),
            kind: ParticipantKind::Player { char_id: profile.char_id },
            ai: profile.ai,
            stat_input: profile.stat_input.clone(),
            abilities: profile.abilities.clone(),
            belt: profile.belt.clone(),
            state: FighterState {
                hp_current: hp_max,
                hp_max,
                energy_current: energy_max,
                energy_max,
                ..Default::default()
            },
        };

        self.seat(meta, participant).await
    }

    /// Seat an AI shadow: configured HP/energy constants, no durable backing.
    pub async fn add_shadow(
        &self,
        meta: &mut SessionMeta,
        id: i64,
        name: &str,
        team: &str,
        stat_input: rbc_core::stats::AggregateInput,
        abilities: Vec<String>,
    ) -> Result<Participant> {
        let participant = Participant {
            id,
            name: name.to_string(),
            team: team.to_string(),
            kind: ParticipantKind::Shadow,
            ai: true,
            stat_input,
            abilities,
            belt: Vec::new(),
            state: FighterState {
                hp_current: self.config.shadow_hp,
                hp_max: self.config.shadow_hp,
                energy_current: self.config.shadow_energy,
                energy_max: self.config.shadow_energy,
                ..Default::default()
            },
        };

        self.seat(meta, participant).await
    }

    async fn seat(&self, meta: &mut SessionMeta, participant: Participant) -> Result<Participant> {
        self.repo.put_participant(&meta.session_id, &participant).await?;
        meta.teams.entry(participant.team.clone()).or_default().push(participant.id);
        meta.actors_info.insert(participant.id, participant.name.clone());
        self.repo.write_meta(meta).await?;

        if !participant.ai
            && let Some(char_id) = participant.char_id()
        {
            self.repo.bind_account_session(char_id, &meta.session_id).await?;
        }
        Ok(participant)
    }

    /// Derive target lists, switch charges, and exchange queues for every
    /// participant.
    pub async fn init_battle_state(&self, session_id: &str) -> Result<()> {
        let meta = self
            .repo
            .meta(session_id)
            .await?
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;

        for mut participant in self.repo.participants(session_id).await? {
            let opponents = meta.opponents_of(participant.id);
            let enemies = opponents.len() as u32;
            let charges = (self.config.base_switch_charges + enemies / 2).min(enemies * 5);

            participant.state.targets = opponents.clone();
            participant.state.switch_charges = charges;
            participant.state.max_switch_charges = charges;
            participant.state.penalty_timer = self.config.timeout_for(0) as i64;

            self.repo.seed_exchanges(session_id, participant.id, &opponents).await?;
            self.repo.put_participant(session_id, &participant).await?;
        }
        Ok(())
    }

    /// Finalize a session. Idempotent: a second call is a no-op.
    ///
    /// `active` flips to 0 before any side effect, so a crash mid-finalize
    /// can never resurrect the session on recovery.
    pub async fn finalize(&self, session_id: &str, winner: Option<&str>, now: i64) -> Result<()> {
        let Some(mut meta) = self.repo.meta(session_id).await? else {
            return Err(EngineError::SessionNotFound(session_id.to_string()));
        };
        if !meta.active {
            return Ok(());
        }

        meta.active = false;
        meta.winner = winner.map(str::to_string);
        meta.end_time = Some(now);
        self.repo.write_meta(&meta).await?;
        info!(session = session_id, winner = winner.unwrap_or("none"), "session finalized");

        // Side effects are best-effort from here on.
        let participants = self.repo.participants(session_id).await?;
        for participant in &participants {
            if let Some(char_id) = participant.char_id() {
                for (family, amount) in &participant.state.xp_buffer {
                    if let Err(error) = self.repo.add_skill_xp(char_id, family, *amount).await {
                        warn!(char_id, %family, %error, "skill XP flush failed");
                    }
                }
                if let Err(error) = self
                    .repo
                    .write_back_account(
                        char_id,
                        participant.state.hp_current,
                        participant.state.energy_current,
                    )
                    .await
                {
                    warn!(char_id, %error, "account write-back failed");
                }
            }
        }

        self.analytics.publish(AnalyticsEvent::SessionFinished(SessionReport {
            session_id: session_id.to_string(),
            mode: meta.mode.clone(),
            winner: meta.winner.clone(),
            duration_secs: now - meta.start_time,
            participants: participants.iter().map(ParticipantReport::of).collect(),
        }));

        let ids: Vec<i64> = participants.iter().map(|p| p.id).collect();
        self.repo
            .retire_session_keys(session_id, &ids, self.config.history_ttl)
            .await?;
        Ok(())
    }

    /// Session ids that still claim `active = 1`, for supervisor relaunch
    /// after a process restart.
    pub async fn recover_active_sessions(&self) -> Result<Vec<String>> {
        self.repo.scan_active_sessions().await
    }
}
