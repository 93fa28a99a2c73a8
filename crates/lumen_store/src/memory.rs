//! In-process store backend.
//!
//! Implements the same contract as [`crate::RedisStore`] over a locked map.
//! Used by the test suites across the workspace and handy for running the
//! server without a Redis instance. List semantics follow the backend it
//! stands in for: LPUSH prepends, LRANGE/LTRIM use inclusive bounds with
//! negative tail indexes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::StoreError;
use crate::store::KeyValueStore;

#[derive(Debug, Clone)]
enum Entry {
    Value(String),
    Hash(HashMap<String, String>),
    List(Vec<String>),
}

impl Entry {
    fn kind(&self) -> &'static str {
        match self {
            Entry::Value(_) => "string",
            Entry::Hash(_) => "hash",
            Entry::List(_) => "list",
        }
    }
}

/// A [`KeyValueStore`] holding everything in process memory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn wrong_type(key: &str, found: &Entry, wanted: &'static str) -> StoreError {
        StoreError::WrongType {
            key: key.to_string(),
            message: format!("expected {} but found {}", wanted, found.kind()),
        }
    }

    /// Resolve an inclusive redis-style range against a list length.
    /// Returns `None` when the range selects nothing.
    fn resolve_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
        let len = len as isize;
        if len == 0 {
            return None;
        }

        let start = if start < 0 { (len + start).max(0) } else { start };
        if start >= len {
            return None;
        }

        let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
        if start > stop {
            return None;
        }

        Some((start as usize, stop as usize))
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap();
        match entries.get(key) {
            None => Ok(None),
            Some(Entry::Value(value)) => Ok(Some(value.clone())),
            Some(other) => Err(Self::wrong_type(key, other, "string")),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), Entry::Value(value.to_string()));
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap();
        match entries.get(key) {
            None => Ok(None),
            Some(Entry::Hash(hash)) => Ok(hash.get(field).cloned()),
            Some(other) => Err(Self::wrong_type(key, other, "hash")),
        }
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap();
        match entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Hash(HashMap::new()))
        {
            Entry::Hash(hash) => {
                hash.insert(field.to_string(), value.to_string());
                Ok(())
            }
            other => Err(Self::wrong_type(key, other, "hash")),
        }
    }

    async fn hmget(&self, key: &str, fields: &[&str]) -> Result<Vec<Option<String>>, StoreError> {
        let entries = self.entries.lock().unwrap();
        match entries.get(key) {
            None => Ok(fields.iter().map(|_| None).collect()),
            Some(Entry::Hash(hash)) => Ok(fields
                .iter()
                .map(|field| hash.get(*field).cloned())
                .collect()),
            Some(other) => Err(Self::wrong_type(key, other, "hash")),
        }
    }

    async fn hmset(&self, key: &str, values: &[(&str, &str)]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap();
        match entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Hash(HashMap::new()))
        {
            Entry::Hash(hash) => {
                for (field, value) in values {
                    hash.insert(field.to_string(), value.to_string());
                }
                Ok(())
            }
            other => Err(Self::wrong_type(key, other, "hash")),
        }
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap();
        match entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::List(Vec::new()))
        {
            Entry::List(list) => {
                list.insert(0, value.to_string());
                Ok(())
            }
            other => Err(Self::wrong_type(key, other, "list")),
        }
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, StoreError> {
        let entries = self.entries.lock().unwrap();
        match entries.get(key) {
            None => Ok(Vec::new()),
            Some(Entry::List(list)) => {
                let Some((start, stop)) = Self::resolve_range(list.len(), start, stop) else {
                    return Ok(Vec::new());
                };
                Ok(list[start..=stop].to_vec())
            }
            Some(other) => Err(Self::wrong_type(key, other, "list")),
        }
    }

    async fn ltrim(&self, key: &str, start: isize, stop: isize) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get_mut(key) {
            None => Ok(()),
            Some(Entry::List(list)) => {
                match Self::resolve_range(list.len(), start, stop) {
                    Some((start, stop)) => {
                        *list = list[start..=stop].to_vec();
                    }
                    None => list.clear(),
                }
                Ok(())
            }
            Some(other) => Err(Self::wrong_type(key, other, "list")),
        }
    }

    async fn lrem(&self, key: &str, count: isize, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get_mut(key) {
            None => Ok(()),
            Some(Entry::List(list)) => {
                let mut remaining = if count == 0 { usize::MAX } else { count.unsigned_abs() };
                list.retain(|entry| {
                    if remaining > 0 && entry == value {
                        remaining -= 1;
                        false
                    } else {
                        true
                    }
                });
                Ok(())
            }
            Some(other) => Err(Self::wrong_type(key, other, "list")),
        }
    }

    async fn llen(&self, key: &str) -> Result<usize, StoreError> {
        let entries = self.entries.lock().unwrap();
        match entries.get(key) {
            None => Ok(0),
            Some(Entry::List(list)) => Ok(list.len()),
            Some(other) => Err(Self::wrong_type(key, other, "list")),
        }
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.contains_key(key))
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let entries = self.entries.lock().unwrap();
        let matches: Vec<String> = match pattern.strip_suffix('*') {
            Some(prefix) => entries
                .keys()
                .filter(|key| key.starts_with(prefix))
                .cloned()
                .collect(),
            None => entries
                .keys()
                .filter(|key| key.as_str() == pattern)
                .cloned()
                .collect(),
        };
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_roundtrip() {
        let store = MemoryStore::new();
        store.hset("h", "a", "1").await.unwrap();
        store.hmset("h", &[("b", "2"), ("c", "3")]).await.unwrap();

        assert_eq!(store.hget("h", "a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(
            store.hmget("h", &["a", "b", "missing"]).await.unwrap(),
            vec![Some("1".to_string()), Some("2".to_string()), None]
        );
    }

    #[tokio::test]
    async fn lpush_prepends() {
        let store = MemoryStore::new();
        store.lpush("l", "first").await.unwrap();
        store.lpush("l", "second").await.unwrap();

        assert_eq!(
            store.lrange("l", 0, -1).await.unwrap(),
            vec!["second".to_string(), "first".to_string()]
        );
    }

    #[tokio::test]
    async fn ltrim_keeps_inclusive_slice() {
        let store = MemoryStore::new();
        for value in ["d", "c", "b", "a"] {
            store.lpush("l", value).await.unwrap();
        }
        // list is now [a, b, c, d]
        store.ltrim("l", 0, 2).await.unwrap();
        assert_eq!(
            store.lrange("l", 0, -1).await.unwrap(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert_eq!(store.llen("l").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn lrange_past_the_end_is_empty() {
        let store = MemoryStore::new();
        store.lpush("l", "only").await.unwrap();
        assert!(store.lrange("l", 5, 10).await.unwrap().is_empty());
        assert_eq!(store.lrange("l", 0, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lrem_removes_single_occurrence() {
        let store = MemoryStore::new();
        for value in ["x", "y", "x"] {
            store.lpush("l", value).await.unwrap();
        }
        store.lrem("l", 1, "x").await.unwrap();
        assert_eq!(
            store.lrange("l", 0, -1).await.unwrap(),
            vec!["y".to_string(), "x".to_string()]
        );
    }

    #[tokio::test]
    async fn keys_matches_prefix_patterns() {
        let store = MemoryStore::new();
        store.set("device:1", "a").await.unwrap();
        store.set("device:2", "b").await.unwrap();
        store.set("token:1", "c").await.unwrap();

        let mut found = store.keys("device:*").await.unwrap();
        found.sort();
        assert_eq!(found, vec!["device:1".to_string(), "device:2".to_string()]);
        assert!(store.keys("missing:*").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn type_mismatch_is_an_error() {
        let store = MemoryStore::new();
        store.set("k", "value").await.unwrap();
        assert!(matches!(
            store.lpush("k", "x").await,
            Err(StoreError::WrongType { .. })
        ));
    }
}
