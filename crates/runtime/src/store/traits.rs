//! Session-store contract.
//!
//! The engine keeps all session state in a key-value store with per-key TTL.
//! The trait mirrors the primitive shapes the keyspace uses - strings,
//! hashes, lists, sorted sets - so a networked backend maps one-to-one and
//! the in-memory implementation stays honest about the same semantics.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store lock poisoned")]
    LockPoisoned,

    #[error("wrong value type at key {key}")]
    WrongType { key: String },

    #[error("backend failure: {0}")]
    Backend(String),
}

/// Closure applied atomically to one hash field by [`SessionStore::hash_update`].
///
/// Receives the current value (if any) and returns the replacement; `None`
/// deletes the field. The store guarantees no concurrent writer observes an
/// intermediate state - the per-key serialization required for consumable use
/// and target switching.
pub type FieldUpdate = Box<dyn FnOnce(Option<String>) -> Option<String> + Send>;

#[async_trait]
pub trait SessionStore: Send + Sync {
    // Strings
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;

    // Hashes
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>>;
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<()>;
    async fn hash_del(&self, key: &str, field: &str) -> Result<()>;
    async fn hash_get_all(&self, key: &str) -> Result<BTreeMap<String, String>>;
    /// Atomic read-modify-write of one field. Returns the new value.
    async fn hash_update(&self, key: &str, field: &str, f: FieldUpdate) -> Result<Option<String>>;

    // Lists (FIFO)
    async fn list_push_back(&self, key: &str, value: &str) -> Result<()>;
    async fn list_pop_front(&self, key: &str) -> Result<Option<String>>;
    async fn list_front(&self, key: &str) -> Result<Option<String>>;
    /// Remove the first occurrence of `value`; true if something was removed.
    async fn list_remove(&self, key: &str, value: &str) -> Result<bool>;
    async fn list_len(&self, key: &str) -> Result<usize>;
    async fn list_all(&self, key: &str) -> Result<Vec<String>>;
    /// Last `limit` entries, oldest first.
    async fn list_tail(&self, key: &str, limit: usize) -> Result<Vec<String>>;

    // Sorted sets
    async fn zset_add(&self, key: &str, member: &str, score: f64) -> Result<()>;
    /// True if the member existed - the claim primitive for matchmaking.
    async fn zset_remove(&self, key: &str, member: &str) -> Result<bool>;
    async fn zset_range_by_score(&self, key: &str, min: f64, max: f64)
    -> Result<Vec<(String, f64)>>;

    // Expiry and scanning
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}
