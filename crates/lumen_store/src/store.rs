//! The storage trait the registry is written against.
//!
//! The method set mirrors the commands the registry actually issues; nothing
//! here is generic over value types — every stored value is a string, and
//! binary payloads are encoded before they reach the store.

use crate::error::StoreError;
use std::future::Future;

/// Hash + list + key primitives over a Redis-shaped backend.
///
/// All operations take `&self`; implementations are expected to multiplex or
/// pool connections internally so the store can be shared freely between the
/// HTTP handlers and the device control processor.
pub trait KeyValueStore: Send + Sync {
    /// Read a plain string key. `None` when the key is absent.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Write a plain string key.
    fn set(&self, key: &str, value: &str)
        -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Read one hash field. `None` when the key or field is absent.
    fn hget(
        &self,
        key: &str,
        field: &str,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Write one hash field.
    fn hset(
        &self,
        key: &str,
        field: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Read several hash fields at once; the result has one slot per
    /// requested field, `None` where the field is absent.
    fn hmget(
        &self,
        key: &str,
        fields: &[&str],
    ) -> impl Future<Output = Result<Vec<Option<String>>, StoreError>> + Send;

    /// Write several hash fields at once.
    fn hmset(
        &self,
        key: &str,
        entries: &[(&str, &str)],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Push a value onto the head of a list.
    fn lpush(&self, key: &str, value: &str)
        -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Read a list slice; `start`/`stop` are inclusive, negative indexes
    /// count from the tail (`-1` is the last element).
    fn lrange(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Trim a list down to the inclusive `start..=stop` slice.
    fn ltrim(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove up to `count` occurrences of `value` from the head of a list.
    fn lrem(
        &self,
        key: &str,
        count: isize,
        value: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Length of a list; absent keys count as empty.
    fn llen(&self, key: &str) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Delete a key of any type.
    fn del(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Whether a key exists.
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Keys matching a glob pattern. Only prefix patterns (`prefix*`) are
    /// required by callers.
    fn keys(&self, pattern: &str)
        -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;
}
