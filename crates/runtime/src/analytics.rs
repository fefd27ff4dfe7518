//! Session analytics: accumulated at finalization, dispatched fire-and-forget.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::session::{FightCounters, Participant};

/// Per-participant slice of a session report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParticipantReport {
    pub id: i64,
    pub name: String,
    pub team: String,
    pub ai: bool,
    pub counters: FightCounters,
    pub exchanges: u64,
    pub xp_total: u64,
}

impl ParticipantReport {
    pub fn of(participant: &Participant) -> Self {
        Self {
            id: participant.id,
            name: participant.name.clone(),
            team: participant.team.clone(),
            ai: participant.ai,
            counters: participant.state.counters,
            exchanges: participant.state.exchange_count,
            xp_total: participant.state.xp_buffer.values().map(|v| *v as u64).sum(),
        }
    }
}

/// The record emitted once per finalized session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: String,
    pub mode: String,
    pub winner: Option<String>,
    pub duration_secs: i64,
    pub participants: Vec<ParticipantReport>,
}

/// Events published on the analytics channel.
#[derive(Clone, Debug, PartialEq)]
pub enum AnalyticsEvent {
    SessionFinished(SessionReport),
}

/// Best-effort publisher. Send failures (no subscribers, lagging receivers)
/// never affect the session outcome.
#[derive(Clone)]
pub struct AnalyticsSink {
    tx: broadcast::Sender<AnalyticsEvent>,
}

impl AnalyticsSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AnalyticsEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: AnalyticsEvent) {
        if self.tx.send(event).is_err() {
            trace!("no analytics subscribers; event dropped");
        }
    }
}

impl Default for AnalyticsSink {
    fn default() -> Self {
        Self::new(64)
    }
}
