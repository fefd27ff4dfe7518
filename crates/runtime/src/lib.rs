//! Runtime orchestration for the reactive burst combat engine.
//!
//! This crate wires the session store, the exchange resolver, per-session
//! supervisor tasks, and matchmaking into a cohesive API. Consumers embed
//! [`Engine`] to create battles, register move intents, and stream
//! dashboards; one cooperative task per active session drives resolution.
//!
//! Modules by responsibility:
//! - [`engine`] hosts the façade and builder
//! - [`store`] provides the key-value contract, reference backend, and repo
//! - [`session`] defines containers, metadata, and wire DTOs
//! - [`combat`] applies calculator output to session state
//! - [`supervisor`] advances sessions by detecting resolvable pairs
//! - [`lifecycle`] creates, finalizes, and recovers sessions
//! - [`matchmaking`] runs the 1v1 rating-band queue
//! - [`ai`] decides moves for NPC participants
//! - [`analytics`] publishes finalization reports, fire-and-forget

pub mod ai;
pub mod analytics;
pub mod combat;
pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod matchmaking;
pub mod profile;
pub mod session;
pub mod store;
pub mod supervisor;

pub use analytics::{AnalyticsEvent, AnalyticsSink, ParticipantReport, SessionReport};
pub use combat::{CombatService, ExchangeKind, Verdict};
pub use config::EngineConfig;
pub use engine::{BattleConfig, Engine, EngineBuilder};
pub use error::{EngineError, Result};
pub use lifecycle::LifecycleService;
pub use matchmaking::{MatchRequest, MatchmakingService};
pub use profile::{CombatantProfile, ProfileOracle, StaticProfiles};
pub use session::{
    ActorSnapshot, BeltItem, CombatDashboardDTO, CombatMoveDTO, EffectState, FightCounters,
    FighterState, LogEntry, MoveData, NextTarget, Participant, ParticipantKind, SessionMeta,
    SessionStatus,
};
pub use store::{MemoryStore, SessionRepo, SessionStore, StoreError};
pub use supervisor::{CycleOutcome, Supervisor, SupervisorRegistry};
