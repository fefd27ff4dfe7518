//! Session metadata, stored as a hash with JSON-valued roster fields.

use std::collections::{BTreeMap, BTreeSet};

/// Metadata for one combat session.
///
/// `active` is monotonic: it starts at 1 and finalization flips it to 0,
/// never back.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionMeta {
    pub session_id: String,
    pub start_time: i64,
    pub active: bool,
    pub mode: String,
    pub battle_type: String,
    pub winner: Option<String>,
    pub end_time: Option<i64>,
    /// Team tag → member participant ids.
    pub teams: BTreeMap<String, Vec<i64>>,
    /// Participant id → display name.
    pub actors_info: BTreeMap<i64, String>,
    pub dead_actors: BTreeSet<i64>,
}

impl SessionMeta {
    pub fn new(session_id: String, start_time: i64, mode: String, battle_type: String) -> Self {
        Self {
            session_id,
            start_time,
            active: true,
            mode,
            battle_type,
            winner: None,
            end_time: None,
            teams: BTreeMap::new(),
            actors_info: BTreeMap::new(),
            dead_actors: BTreeSet::new(),
        }
    }

    /// Teams that still have at least one living member.
    pub fn alive_teams(&self) -> Vec<&str> {
        self.teams
            .iter()
            .filter(|(_, members)| members.iter().any(|id| !self.dead_actors.contains(id)))
            .map(|(team, _)| team.as_str())
            .collect()
    }

    /// Team of a participant, if rostered.
    pub fn team_of(&self, id: i64) -> Option<&str> {
        self.teams
            .iter()
            .find(|(_, members)| members.contains(&id))
            .map(|(team, _)| team.as_str())
    }

    /// Ids on any team other than `id`'s, stable-sorted.
    pub fn opponents_of(&self, id: i64) -> Vec<i64> {
        let own = self.team_of(id);
        let mut out: Vec<i64> = self
            .teams
            .iter()
            .filter(|(team, _)| Some(team.as_str()) != own)
            .flat_map(|(_, members)| members.iter().copied())
            .collect();
        out.sort_unstable();
        out
    }

    /// Serialize into hash fields.
    pub fn to_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("start_time".to_string(), self.start_time.to_string()),
            ("active".to_string(), if self.active { "1" } else { "0" }.to_string()),
            ("mode".to_string(), self.mode.clone()),
            ("battle_type".to_string(), self.battle_type.clone()),
            ("teams".to_string(), serde_json::to_string(&self.teams).unwrap_or_default()),
            (
                "actors_info".to_string(),
                serde_json::to_string(&self.actors_info).unwrap_or_default(),
            ),
            (
                "dead_actors".to_string(),
                serde_json::to_string(&self.dead_actors).unwrap_or_default(),
            ),
        ];
        if let Some(winner) = &self.winner {
            fields.push(("winner".to_string(), winner.clone()));
        }
        if let Some(end_time) = self.end_time {
            fields.push(("end_time".to_string(), end_time.to_string()));
        }
        fields
    }

    /// Parse from hash fields. Roster fields are JSON values.
    pub fn from_fields(
        session_id: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<Self, serde_json::Error> {
        let get = |name: &str| fields.get(name).map(String::as_str).unwrap_or_default();
        Ok(Self {
            session_id: session_id.to_string(),
            start_time: get("start_time").parse().unwrap_or_default(),
            active: get("active") == "1",
            mode: get("mode").to_string(),
            battle_type: get("battle_type").to_string(),
            winner: fields.get("winner").cloned(),
            end_time: fields.get("end_time").and_then(|v| v.parse().ok()),
            teams: parse_or_default(get("teams"))?,
            actors_info: parse_or_default(get("actors_info"))?,
            dead_actors: parse_or_default(get("dead_actors"))?,
        })
    }
}

fn parse_or_default<T: Default + serde::de::DeserializeOwned>(
    raw: &str,
) -> Result<T, serde_json::Error> {
    if raw.is_empty() {
        Ok(T::default())
    } else {
        serde_json::from_str(raw)
    }
}
