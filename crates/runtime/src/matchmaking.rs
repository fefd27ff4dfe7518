//! 1v1 arena matchmaking: rating-banded queue with shadow fallback.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::store::SessionRepo;

/// Short-TTL record of one queued character.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchRequest {
    pub char_id: i64,
    pub start_time: i64,
    /// Rating score used for banding.
    pub gs: f64,
    pub mode: String,
}

/// Widening band fraction for the given attempt index.
fn band_range(attempt: u32) -> f64 {
    (0.05 * attempt as f64).min(0.30)
}

#[derive(Clone)]
pub struct MatchmakingService {
    repo: SessionRepo,
    config: Arc<EngineConfig>,
}

impl MatchmakingService {
    pub fn new(repo: SessionRepo, config: Arc<EngineConfig>) -> Self {
        Self { repo, config }
    }

    /// Enter the queue: write the request record, add to the rating set.
    pub async fn join_queue(&self, mode: &str, char_id: i64, gs: f64, now: i64) -> Result<()> {
        let request = MatchRequest { char_id, start_time: now, gs, mode: mode.to_string() };
        let raw = serde_json::to_string(&request)
            .map_err(|source| EngineError::Corrupt { key: format!("arena:req:{char_id}"), source })?;
        self.repo.request_set(char_id, &raw, self.config.request_ttl).await?;
        self.repo.queue_add(mode, char_id, gs).await?;
        self.repo
            .store()
            .set(&crate::store::keys::player_status(char_id), "arena:queue", Some(self.config.request_ttl))
            .await?;
        Ok(())
    }

    /// The caller's own request, if still on record.
    pub async fn request(&self, char_id: i64) -> Result<Option<MatchRequest>> {
        let Some(raw) = self.repo.request_get(char_id).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| EngineError::Corrupt { key: format!("arena:req:{char_id}"), source })
    }

    /// Scan the widening rating band and try to claim an opponent.
    ///
    /// The opponent is removed from the set *first*; a false claim means
    /// another caller already took them and the scan moves on. On success
    /// both sides' queue entries and requests are gone.
    pub async fn find_opponent(&self, mode: &str, char_id: i64, attempt: u32) -> Result<Option<i64>> {
        let request = self
            .request(char_id)
            .await?
            .ok_or(EngineError::NoMatchRequest(char_id))?;

        let range = band_range(attempt);
        let (min, max) = (request.gs * (1.0 - range), request.gs * (1.0 + range));
        for (candidate, score) in self.repo.queue_band(mode, min, max).await? {
            if candidate == char_id {
                continue;
            }
            if !self.repo.queue_claim(mode, candidate).await? {
                // Someone else matched them between scan and claim.
                continue;
            }
            debug!(mode, char_id, candidate, score, "opponent claimed");
            self.repo.queue_claim(mode, char_id).await?;
            self.repo.request_delete(char_id).await?;
            self.repo.request_delete(candidate).await?;
            return Ok(Some(candidate));
        }
        Ok(None)
    }

    /// Seconds the character has been waiting, if queued.
    pub async fn elapsed(&self, char_id: i64, now: i64) -> Result<Option<i64>> {
        Ok(self.request(char_id).await?.map(|r| now - r.start_time))
    }

    /// Leave the queue, removing both the rating entry and the request.
    pub async fn cancel(&self, mode: &str, char_id: i64) -> Result<()> {
        self.repo.queue_claim(mode, char_id).await?;
        self.repo.request_delete(char_id).await?;
        self.repo.store().delete(&crate::store::keys::player_status(char_id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_widens_and_caps() {
        assert_eq!(band_range(0), 0.0);
        assert!((band_range(1) - 0.05).abs() < 1e-9);
        assert!((band_range(4) - 0.20).abs() < 1e-9);
        assert!((band_range(10) - 0.30).abs() < 1e-9);
    }
}
