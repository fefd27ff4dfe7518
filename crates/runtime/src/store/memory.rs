//! In-memory SessionStore implementation for tests and local runs.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::traits::{FieldUpdate, Result, SessionStore, StoreError};

#[derive(Clone, Debug)]
enum Value {
    Str(String),
    Hash(BTreeMap<String, String>),
    List(VecDeque<String>),
    ZSet(BTreeMap<String, f64>),
}

#[derive(Clone, Debug)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn live(&self) -> bool {
        self.expires_at.is_none_or(|at| at > Instant::now())
    }
}

/// In-memory store with lazy TTL expiry.
///
/// Expired entries are dropped on the next access to their key. All
/// operations take the map lock for their full duration, which gives the
/// per-key serialization the trait promises.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

type Guard<'a> = std::sync::RwLockWriteGuard<'a, HashMap<String, Entry>>;

fn lock(store: &MemoryStore) -> Result<Guard<'_>> {
    store.entries.write().map_err(|_| StoreError::LockPoisoned)
}

/// Fetch a live entry, dropping it if expired.
fn live_entry<'a>(guard: &'a mut Guard<'_>, key: &str) -> Option<&'a mut Entry> {
    let expired = guard.get(key).is_some_and(|e| !e.live());
    if expired {
        guard.remove(key);
        return None;
    }
    guard.get_mut(key)
}

fn hash_of<'a>(guard: &'a mut Guard<'_>, key: &str) -> Result<&'a mut BTreeMap<String, String>> {
    let entry = guard
        .entry(key.to_string())
        .and_modify(|e| {
            if !e.live() {
                *e = Entry { value: Value::Hash(BTreeMap::new()), expires_at: None };
            }
        })
        .or_insert_with(|| Entry { value: Value::Hash(BTreeMap::new()), expires_at: None });
    match &mut entry.value {
        Value::Hash(map) => Ok(map),
        _ => Err(StoreError::WrongType { key: key.to_string() }),
    }
}

fn list_of<'a>(guard: &'a mut Guard<'_>, key: &str) -> Result<&'a mut VecDeque<String>> {
    let entry = guard
        .entry(key.to_string())
        .and_modify(|e| {
            if !e.live() {
                *e = Entry { value: Value::List(VecDeque::new()), expires_at: None };
            }
        })
        .or_insert_with(|| Entry { value: Value::List(VecDeque::new()), expires_at: None });
    match &mut entry.value {
        Value::List(list) => Ok(list),
        _ => Err(StoreError::WrongType { key: key.to_string() }),
    }
}

fn zset_of<'a>(guard: &'a mut Guard<'_>, key: &str) -> Result<&'a mut BTreeMap<String, f64>> {
    let entry = guard
        .entry(key.to_string())
        .and_modify(|e| {
            if !e.live() {
                *e = Entry { value: Value::ZSet(BTreeMap::new()), expires_at: None };
            }
        })
        .or_insert_with(|| Entry { value: Value::ZSet(BTreeMap::new()), expires_at: None });
    match &mut entry.value {
        Value::ZSet(set) => Ok(set),
        _ => Err(StoreError::WrongType { key: key.to_string() }),
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut guard = lock(self)?;
        match live_entry(&mut guard, key) {
            Some(Entry { value: Value::Str(s), .. }) => Ok(Some(s.clone())),
            Some(_) => Err(StoreError::WrongType { key: key.to_string() }),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut guard = lock(self)?;
        guard.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: ttl.map(|t| Instant::now() + t),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut guard = lock(self)?;
        guard.remove(key);
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut guard = lock(self)?;
        match live_entry(&mut guard, key) {
            Some(Entry { value: Value::Hash(map), .. }) => Ok(map.get(field).cloned()),
            Some(_) => Err(StoreError::WrongType { key: key.to_string() }),
            None => Ok(None),
        }
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut guard = lock(self)?;
        hash_of(&mut guard, key)?.insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hash_del(&self, key: &str, field: &str) -> Result<()> {
        let mut guard = lock(self)?;
        if let Some(Entry { value: Value::Hash(map), .. }) = live_entry(&mut guard, key) {
            map.remove(field);
        }
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<BTreeMap<String, String>> {
        let mut guard = lock(self)?;
        match live_entry(&mut guard, key) {
            Some(Entry { value: Value::Hash(map), .. }) => Ok(map.clone()),
            Some(_) => Err(StoreError::WrongType { key: key.to_string() }),
            None => Ok(BTreeMap::new()),
        }
    }

    async fn hash_update(&self, key: &str, field: &str, f: FieldUpdate) -> Result<Option<String>> {
        let mut guard = lock(self)?;
        let map = hash_of(&mut guard, key)?;
        let next = f(map.get(field).cloned());
        match &next {
            Some(value) => {
                map.insert(field.to_string(), value.clone());
            }
            None => {
                map.remove(field);
            }
        }
        Ok(next)
    }

    async fn list_push_back(&self, key: &str, value: &str) -> Result<()> {
        let mut guard = lock(self)?;
        list_of(&mut guard, key)?.push_back(value.to_string());
        Ok(())
    }

    async fn list_pop_front(&self, key: &str) -> Result<Option<String>> {
        let mut guard = lock(self)?;
        Ok(list_of(&mut guard, key)?.pop_front())
    }

    async fn list_front(&self, key: &str) -> Result<Option<String>> {
        let mut guard = lock(self)?;
        Ok(list_of(&mut guard, key)?.front().cloned())
    }

    async fn list_remove(&self, key: &str, value: &str) -> Result<bool> {
        let mut guard = lock(self)?;
        let list = list_of(&mut guard, key)?;
        if let Some(pos) = list.iter().position(|v| v == value) {
            list.remove(pos);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn list_len(&self, key: &str) -> Result<usize> {
        let mut guard = lock(self)?;
        Ok(list_of(&mut guard, key)?.len())
    }

    async fn list_all(&self, key: &str) -> Result<Vec<String>> {
        let mut guard = lock(self)?;
        Ok(list_of(&mut guard, key)?.iter().cloned().collect())
    }

    async fn list_tail(&self, key: &str, limit: usize) -> Result<Vec<String>> {
        let mut guard = lock(self)?;
        let list = list_of(&mut guard, key)?;
        let skip = list.len().saturating_sub(limit);
        Ok(list.iter().skip(skip).cloned().collect())
    }

    async fn zset_add(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let mut guard = lock(self)?;
        zset_of(&mut guard, key)?.insert(member.to_string(), score);
        Ok(())
    }

    async fn zset_remove(&self, key: &str, member: &str) -> Result<bool> {
        let mut guard = lock(self)?;
        Ok(zset_of(&mut guard, key)?.remove(member).is_some())
    }

    async fn zset_range_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<(String, f64)>> {
        let mut guard = lock(self)?;
        let set = zset_of(&mut guard, key)?;
        let mut hits: Vec<(String, f64)> = set
            .iter()
            .filter(|(_, score)| **score >= min && **score <= max)
            .map(|(member, score)| (member.clone(), *score))
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        Ok(hits)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut guard = lock(self)?;
        if let Some(entry) = live_entry(&mut guard, key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut guard = lock(self)?;
        let expired: Vec<String> = guard
            .iter()
            .filter(|(_, e)| !e.live())
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired {
            guard.remove(&key);
        }
        let mut keys: Vec<String> =
            guard.keys().filter(|k| k.starts_with(prefix)).cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn string_ttl_expires() {
        let store = MemoryStore::new();
        store.set("k", "v", Some(Duration::from_millis(5))).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_is_fifo_and_removable() {
        let store = MemoryStore::new();
        store.list_push_back("q", "1").await.unwrap();
        store.list_push_back("q", "2").await.unwrap();
        store.list_push_back("q", "3").await.unwrap();
        assert!(store.list_remove("q", "2").await.unwrap());
        assert!(!store.list_remove("q", "2").await.unwrap());
        assert_eq!(store.list_pop_front("q").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.list_front("q").await.unwrap().as_deref(), Some("3"));
        assert_eq!(store.list_len("q").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn zset_range_and_claim() {
        let store = MemoryStore::new();
        store.zset_add("z", "10", 1000.0).await.unwrap();
        store.zset_add("z", "20", 1100.0).await.unwrap();
        store.zset_add("z", "30", 2000.0).await.unwrap();
        let hits = store.zset_range_by_score("z", 900.0, 1200.0).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(store.zset_remove("z", "10").await.unwrap());
        assert!(!store.zset_remove("z", "10").await.unwrap());
    }

    #[tokio::test]
    async fn hash_update_is_atomic_read_modify_write() {
        let store = MemoryStore::new();
        store.hash_set("h", "n", "1").await.unwrap();
        let next = store
            .hash_update(
                "h",
                "n",
                Box::new(|cur| cur.and_then(|v| v.parse::<i64>().ok()).map(|n| (n + 1).to_string())),
            )
            .await
            .unwrap();
        assert_eq!(next.as_deref(), Some("2"));
        assert_eq!(store.hash_get("h", "n").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn wrong_type_is_an_error() {
        let store = MemoryStore::new();
        store.set("k", "v", None).await.unwrap();
        assert!(matches!(
            store.hash_get("k", "f").await,
            Err(StoreError::WrongType { .. })
        ));
    }
}
