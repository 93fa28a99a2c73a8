//! Key-value store integration for lumen.
//!
//! This crate provides the hash + list primitives the registry is built on,
//! behind a trait so the backend can be swapped. Two implementations ship:
//!
//! - [`RedisStore`], the production backend over a multiplexed async
//!   connection with automatic reconnects
//! - [`MemoryStore`], an in-process backend used by tests and standalone runs
//!
//! # Example
//!
//! ```rust,no_run
//! use lumen_store::{KeyValueStore, RedisStore};
//!
//! async fn setup_store() -> Result<RedisStore, Box<dyn std::error::Error>> {
//!     let store = RedisStore::connect("redis://127.0.0.1/").await?;
//!     store.set("greeting", "hello").await?;
//!     Ok(store)
//! }
//! ```

pub mod error;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use store::KeyValueStore;
