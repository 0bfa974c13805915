//! # Redis rate-limit store
//!
//! Shared fixed-window counters for multi-instance deployments. Entries
//! expire with the window (PEXPIREAT), so this store also gets eviction the
//! process-local map deliberately skips.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use deadpool_redis::redis::cmd;
use deadpool_redis::Pool;
use std::collections::HashMap;

use domains::{AppError, RateLimitEntry, RateLimitStore, Result};

const KEY_PREFIX: &str = "ratelimit:";

pub struct RedisRateLimitStore {
    pool: Pool,
}

impl RedisRateLimitStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn key(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn get(&self, key: &str) -> Result<Option<RateLimitEntry>> {
        let mut conn = self.pool.get().await.map_err(AppError::internal)?;
        let fields: HashMap<String, String> = cmd("HGETALL")
            .arg(Self::key(key))
            .query_async(&mut conn)
            .await
            .map_err(AppError::internal)?;
        if fields.is_empty() {
            return Ok(None);
        }

        let count: u32 = fields
            .get("count")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| AppError::Internal("malformed rate limit entry".to_string()))?;
        let reset_ms: i64 = fields
            .get("reset_ms")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| AppError::Internal("malformed rate limit entry".to_string()))?;
        let reset_at = Utc
            .timestamp_millis_opt(reset_ms)
            .single()
            .ok_or_else(|| AppError::Internal("malformed rate limit entry".to_string()))?;

        Ok(Some(RateLimitEntry { count, reset_at }))
    }

    async fn put(&self, key: &str, entry: RateLimitEntry) -> Result<()> {
        let mut conn = self.pool.get().await.map_err(AppError::internal)?;
        let key = Self::key(key);
        let reset_ms = entry.reset_at.timestamp_millis();
        cmd("HSET")
            .arg(&key)
            .arg("count")
            .arg(entry.count)
            .arg("reset_ms")
            .arg(reset_ms)
            .query_async::<()>(&mut conn)
            .await
            .map_err(AppError::internal)?;
        cmd("PEXPIREAT")
            .arg(&key)
            .arg(reset_ms)
            .query_async::<()>(&mut conn)
            .await
            .map_err(AppError::internal)?;
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<()> {
        let mut conn = self.pool.get().await.map_err(AppError::internal)?;
        cmd("HINCRBY")
            .arg(Self::key(key))
            .arg("count")
            .arg(1)
            .query_async::<()>(&mut conn)
            .await
            .map_err(AppError::internal)?;
        Ok(())
    }
}
