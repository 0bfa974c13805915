//! # storage-adapters
//!
//! Implementations of the `domains` persistence ports: an in-memory store
//! for tests and dev mode, Postgres behind `db-postgres`, and a Redis
//! rate-limit store behind `redis`.

pub mod memory;

#[cfg(feature = "db-postgres")]
pub mod postgres;

#[cfg(feature = "redis")]
pub mod redis;

pub use memory::{MemoryRateLimitStore, MemorySessions, MemoryStore};

#[cfg(feature = "db-postgres")]
pub use postgres::PgStore;

#[cfg(feature = "redis")]
pub use redis::RedisRateLimitStore;
