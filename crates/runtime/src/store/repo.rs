//! Typed facade over the raw session store.
//!
//! Maps the key schema plus JSON payloads onto domain types, parsing once on
//! read. Corrupt records surface as [`EngineError::Corrupt`] from the
//! single-record getters; bulk getters skip them with a warning so one bad
//! blob cannot stall a session.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::warn;

use crate::error::{EngineError, Result};
use crate::session::{CombatMoveDTO, LogEntry, Participant, SessionMeta};

use super::keys;
use super::traits::SessionStore;

/// Cloneable handle to the session keyspace.
#[derive(Clone)]
pub struct SessionRepo {
    store: Arc<dyn SessionStore>,
}

impl SessionRepo {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Raw store access for callers with needs outside the typed surface.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    // ------------------------------------------------------------------
    // Session metadata
    // ------------------------------------------------------------------

    pub async fn meta(&self, session_id: &str) -> Result<Option<SessionMeta>> {
        let key = keys::meta(session_id);
        let fields = self.store.hash_get_all(&key).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        SessionMeta::from_fields(session_id, &fields)
            .map(Some)
            .map_err(|source| EngineError::Corrupt { key, source })
    }

    pub async fn write_meta(&self, meta: &SessionMeta) -> Result<()> {
        let key = keys::meta(&meta.session_id);
        for (field, value) in meta.to_fields() {
            self.store.hash_set(&key, &field, &value).await?;
        }
        Ok(())
    }

    pub async fn set_meta_field(&self, session_id: &str, field: &str, value: &str) -> Result<()> {
        self.store.hash_set(&keys::meta(session_id), field, value).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Participants
    // ------------------------------------------------------------------

    pub async fn participant(&self, session_id: &str, id: i64) -> Result<Option<Participant>> {
        let key = keys::actors(session_id);
        match self.store.hash_get(&key, &id.to_string()).await? {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| EngineError::Corrupt { key, source }),
        }
    }

    pub async fn put_participant(&self, session_id: &str, participant: &Participant) -> Result<()> {
        let raw = serde_json::to_string(participant)
            .map_err(|source| EngineError::Corrupt { key: keys::actors(session_id), source })?;
        self.store
            .hash_set(&keys::actors(session_id), &participant.id.to_string(), &raw)
            .await?;
        Ok(())
    }

    /// All containers, id-sorted. Corrupt blobs are skipped for this cycle.
    pub async fn participants(&self, session_id: &str) -> Result<Vec<Participant>> {
        let key = keys::actors(session_id);
        let fields = self.store.hash_get_all(&key).await?;
        let mut out = Vec::with_capacity(fields.len());
        for (field, raw) in fields {
            match serde_json::from_str::<Participant>(&raw) {
                Ok(participant) => out.push(participant),
                Err(error) => {
                    warn!(%key, %field, %error, "skipping unparseable participant container");
                }
            }
        }
        out.sort_unstable_by_key(|p| p.id);
        Ok(out)
    }

    /// Atomically read-modify-write one container. Returns the closure's
    /// output, or `None` when the container is missing or unparseable.
    pub async fn update_participant<T, F>(
        &self,
        session_id: &str,
        id: i64,
        f: F,
    ) -> Result<Option<T>>
    where
        F: FnOnce(&mut Participant) -> T + Send + 'static,
        T: Send + 'static,
    {
        let key = keys::actors(session_id);
        let outcome: Arc<Mutex<Option<T>>> = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&outcome);
        self.store
            .hash_update(
                &key,
                &id.to_string(),
                Box::new(move |current| {
                    let raw = current?;
                    match serde_json::from_str::<Participant>(&raw) {
                        Ok(mut participant) => {
                            let result = f(&mut participant);
                            if let Ok(mut slot) = sink.lock() {
                                *slot = Some(result);
                            }
                            serde_json::to_string(&participant).ok().or(Some(raw))
                        }
                        // Leave the blob as found; the bulk reader warns.
                        Err(_) => Some(raw),
                    }
                }),
            )
            .await?;
        let result = outcome.lock().map_err(|_| crate::store::StoreError::LockPoisoned)?.take();
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Intents
    // ------------------------------------------------------------------

    /// Outstanding intents of one actor, keyed by target. Corrupt intents
    /// are skipped with a warning.
    pub async fn intents_of(
        &self,
        session_id: &str,
        actor_id: i64,
    ) -> Result<BTreeMap<i64, CombatMoveDTO>> {
        let key = keys::moves(session_id, actor_id);
        let fields = self.store.hash_get_all(&key).await?;
        let mut out = BTreeMap::new();
        for (field, raw) in fields {
            let target: i64 = match field.parse() {
                Ok(id) => id,
                Err(_) => continue,
            };
            match serde_json::from_str::<CombatMoveDTO>(&raw) {
                Ok(intent) => {
                    out.insert(target, intent);
                }
                Err(error) => {
                    warn!(%key, %field, %error, "skipping unparseable intent");
                }
            }
        }
        Ok(out)
    }

    pub async fn put_intent(
        &self,
        session_id: &str,
        actor_id: i64,
        intent: &CombatMoveDTO,
    ) -> Result<()> {
        let key = keys::moves(session_id, actor_id);
        let raw = serde_json::to_string(intent)
            .map_err(|source| EngineError::Corrupt { key: key.clone(), source })?;
        self.store.hash_set(&key, &intent.target_id.to_string(), &raw).await?;
        Ok(())
    }

    pub async fn remove_intent(&self, session_id: &str, actor_id: i64, target_id: i64) -> Result<()> {
        self.store
            .hash_del(&keys::moves(session_id, actor_id), &target_id.to_string())
            .await?;
        Ok(())
    }

    pub async fn has_intent(&self, session_id: &str, actor_id: i64) -> Result<bool> {
        Ok(!self.intents_of(session_id, actor_id).await?.is_empty())
    }

    // ------------------------------------------------------------------
    // Exchange queues
    // ------------------------------------------------------------------

    pub async fn seed_exchanges(
        &self,
        session_id: &str,
        actor_id: i64,
        opponents: &[i64],
    ) -> Result<()> {
        let key = keys::exchanges(session_id, actor_id);
        self.store.delete(&key).await?;
        for id in opponents {
            self.store.list_push_back(&key, &id.to_string()).await?;
        }
        Ok(())
    }

    /// Round-robin rotation after an exchange: drop the opponent from the
    /// queue and, if still alive, re-queue them at the back.
    pub async fn rotate_exchange(
        &self,
        session_id: &str,
        actor_id: i64,
        opponent_id: i64,
        opponent_alive: bool,
    ) -> Result<()> {
        let key = keys::exchanges(session_id, actor_id);
        self.store.list_remove(&key, &opponent_id.to_string()).await?;
        if opponent_alive {
            self.store.list_push_back(&key, &opponent_id.to_string()).await?;
        }
        Ok(())
    }

    pub async fn exchange_queue(&self, session_id: &str, actor_id: i64) -> Result<Vec<i64>> {
        let raw = self.store.list_all(&keys::exchanges(session_id, actor_id)).await?;
        Ok(raw.into_iter().filter_map(|v| v.parse().ok()).collect())
    }

    pub async fn exchange_queue_len(&self, session_id: &str, actor_id: i64) -> Result<usize> {
        Ok(self.store.list_len(&keys::exchanges(session_id, actor_id)).await?)
    }

    // ------------------------------------------------------------------
    // Combat log
    // ------------------------------------------------------------------

    pub async fn append_log(&self, session_id: &str, entry: &LogEntry) -> Result<()> {
        let key = keys::logs(session_id);
        let raw = serde_json::to_string(entry)
            .map_err(|source| EngineError::Corrupt { key: key.clone(), source })?;
        self.store.list_push_back(&key, &raw).await?;
        Ok(())
    }

    /// Last `limit` raw log entries, oldest first.
    pub async fn logs_tail(&self, session_id: &str, limit: usize) -> Result<Vec<String>> {
        Ok(self.store.list_tail(&keys::logs(session_id), limit).await?)
    }

    pub async fn log_count(&self, session_id: &str) -> Result<usize> {
        Ok(self.store.list_len(&keys::logs(session_id)).await?)
    }

    // ------------------------------------------------------------------
    // Accounts, skills, status
    // ------------------------------------------------------------------

    pub async fn bind_account_session(&self, char_id: i64, session_id: &str) -> Result<()> {
        let key = keys::account(char_id);
        self.store.hash_set(&key, "combat_session_id", session_id).await?;
        self.store
            .set(&keys::player_status(char_id), &format!("combat:{session_id}"), None)
            .await?;
        Ok(())
    }

    /// Final HP/energy write-back, releasing the session binding.
    pub async fn write_back_account(&self, char_id: i64, hp: i64, energy: i64) -> Result<()> {
        let key = keys::account(char_id);
        self.store.hash_set(&key, "hp_current", &hp.to_string()).await?;
        self.store.hash_set(&key, "energy_current", &energy.to_string()).await?;
        self.store.hash_del(&key, "combat_session_id").await?;
        self.store.delete(&keys::player_status(char_id)).await?;
        Ok(())
    }

    pub async fn account_fields(&self, char_id: i64) -> Result<BTreeMap<String, String>> {
        Ok(self.store.hash_get_all(&keys::account(char_id)).await?)
    }

    pub async fn add_skill_xp(&self, char_id: i64, family: &str, amount: u32) -> Result<()> {
        self.store
            .hash_update(
                &keys::skills(char_id),
                family,
                Box::new(move |current| {
                    let total =
                        current.and_then(|v| v.parse::<u64>().ok()).unwrap_or(0) + amount as u64;
                    Some(total.to_string())
                }),
            )
            .await?;
        Ok(())
    }

    pub async fn skill_xp(&self, char_id: i64, family: &str) -> Result<u64> {
        Ok(self
            .store
            .hash_get(&keys::skills(char_id), family)
            .await?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0))
    }

    // ------------------------------------------------------------------
    // Matchmaking queue
    // ------------------------------------------------------------------

    pub async fn queue_add(&self, mode: &str, char_id: i64, score: f64) -> Result<()> {
        self.store.zset_add(&keys::arena_queue(mode), &char_id.to_string(), score).await?;
        Ok(())
    }

    /// Claim a queued character. True only for the caller that removed them.
    pub async fn queue_claim(&self, mode: &str, char_id: i64) -> Result<bool> {
        Ok(self.store.zset_remove(&keys::arena_queue(mode), &char_id.to_string()).await?)
    }

    pub async fn queue_band(&self, mode: &str, min: f64, max: f64) -> Result<Vec<(i64, f64)>> {
        let hits = self.store.zset_range_by_score(&keys::arena_queue(mode), min, max).await?;
        Ok(hits
            .into_iter()
            .filter_map(|(member, score)| member.parse().ok().map(|id| (id, score)))
            .collect())
    }

    pub async fn request_set(&self, char_id: i64, value: &str, ttl: Duration) -> Result<()> {
        self.store.set(&keys::arena_request(char_id), value, Some(ttl)).await?;
        Ok(())
    }

    pub async fn request_get(&self, char_id: i64) -> Result<Option<String>> {
        Ok(self.store.get(&keys::arena_request(char_id)).await?)
    }

    pub async fn request_delete(&self, char_id: i64) -> Result<()> {
        self.store.delete(&keys::arena_request(char_id)).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Retention and recovery
    // ------------------------------------------------------------------

    /// Put history keys on a TTL and eagerly drop per-actor intent and
    /// exchange-queue keys.
    pub async fn retire_session_keys(
        &self,
        session_id: &str,
        participant_ids: &[i64],
        ttl: Duration,
    ) -> Result<()> {
        self.store.expire(&keys::meta(session_id), ttl).await?;
        self.store.expire(&keys::actors(session_id), ttl).await?;
        self.store.expire(&keys::logs(session_id), ttl).await?;
        for id in participant_ids {
            self.store.delete(&keys::moves(session_id, *id)).await?;
            self.store.delete(&keys::exchanges(session_id, *id)).await?;
        }
        Ok(())
    }

    /// Session ids whose metadata still says `active = 1`.
    pub async fn scan_active_sessions(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for key in self.store.scan_prefix(keys::META_PREFIX).await? {
            let Some(session_id) = keys::session_of_meta_key(&key) else {
                continue;
            };
            if self.store.hash_get(&key, "active").await?.as_deref() == Some("1") {
                out.push(session_id.to_string());
            }
        }
        Ok(out)
    }
}
