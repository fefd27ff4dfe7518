//! Session state types: metadata, participant containers, and wire DTOs.

mod dto;
mod meta;
mod participant;

pub use dto::{
    ActorSnapshot, CombatDashboardDTO, CombatMoveDTO, LogEntry, MoveData, NextTarget,
    SessionStatus,
};
pub use meta::SessionMeta;
pub use participant::{BeltItem, FightCounters, FighterState, EffectState, Participant, ParticipantKind};
