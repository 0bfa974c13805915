//! # Security
//!
//! Rate limiting and ban enforcement. Both gates sit in front of every
//! content mutation; the rate limiter fails open so an unavailable store
//! never blocks legitimate traffic.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use domains::{AppError, Clock, CurrentUser, RateLimitEntry, RateLimitStore, Result, UserRepo};

/// A fixed-window budget for one guarded action.
#[derive(Debug, Clone, Copy)]
pub struct RateQuota {
    pub window_ms: u64,
    pub max_requests: u32,
}

impl RateQuota {
    pub const fn new(window_ms: u64, max_requests: u32) -> Self {
        Self { window_ms, max_requests }
    }
}

/// Per-action quotas. Overridable through configuration.
#[derive(Debug, Clone, Copy)]
pub struct RateQuotas {
    pub create_thread: RateQuota,
    pub create_post: RateQuota,
    pub toggle_reaction: RateQuota,
    pub file_report: RateQuota,
}

impl Default for RateQuotas {
    fn default() -> Self {
        Self {
            create_thread: RateQuota::new(5 * 60 * 1000, 5),
            create_post: RateQuota::new(60 * 1000, 10),
            toggle_reaction: RateQuota::new(60 * 1000, 30),
            file_report: RateQuota::new(10 * 60 * 1000, 5),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Set when denied, so the caller can tell the user when to retry.
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitDecision {
    fn allow() -> Self {
        Self { allowed: true, reset_at: None }
    }

    fn deny(reset_at: DateTime<Utc>) -> Self {
        Self { allowed: false, reset_at: Some(reset_at) }
    }
}

/// Ban state as observed at check time. Lazy expiry means this is only
/// guaranteed accurate at the moment of the check.
#[derive(Debug, Clone)]
pub struct BanStatus {
    pub banned: bool,
    pub reason: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl BanStatus {
    fn clear() -> Self {
        Self { banned: false, reason: None, expires_at: None }
    }
}

pub struct SecurityService {
    users: Arc<dyn UserRepo>,
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
}

impl SecurityService {
    pub fn new(
        users: Arc<dyn UserRepo>,
        store: Arc<dyn RateLimitStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { users, store, clock }
    }

    /// Fixed-window counter check. The client id is the explicit identifier
    /// if given, else the actor id, else `"anonymous"`.
    ///
    /// Any store failure is logged and the request is allowed through:
    /// availability wins over strict enforcement.
    pub async fn check_rate_limit(
        &self,
        action: &str,
        quota: RateQuota,
        identifier: Option<String>,
        actor: Option<Uuid>,
    ) -> RateLimitDecision {
        match self.window_check(action, quota, identifier, actor).await {
            Ok(decision) => decision,
            Err(err) => {
                tracing::warn!(action, error = %err, "rate limit check failed, failing open");
                RateLimitDecision::allow()
            }
        }
    }

    async fn window_check(
        &self,
        action: &str,
        quota: RateQuota,
        identifier: Option<String>,
        actor: Option<Uuid>,
    ) -> Result<RateLimitDecision> {
        let client_id = identifier
            .or_else(|| actor.map(|id| id.to_string()))
            .unwrap_or_else(|| "anonymous".to_string());
        let key = format!("{action}:{client_id}");
        let now = self.clock.now();

        match self.store.get(&key).await? {
            // Live window: deny at the cap, count the hit otherwise.
            Some(entry) if now <= entry.reset_at => {
                if entry.count >= quota.max_requests {
                    Ok(RateLimitDecision::deny(entry.reset_at))
                } else {
                    self.store.increment(&key).await?;
                    Ok(RateLimitDecision::allow())
                }
            }
            // Missing or elapsed: open a fresh window with this hit counted.
            _ => {
                let reset_at = now + Duration::milliseconds(quota.window_ms as i64);
                self.store.put(&key, RateLimitEntry { count: 1, reset_at }).await?;
                Ok(RateLimitDecision::allow())
            }
        }
    }

    /// Convenience for mutation entry points: converts a denial into the
    /// rate-limited error carrying the window reset time.
    pub async fn enforce_rate_limit(
        &self,
        action: &str,
        quota: RateQuota,
        actor: Option<Uuid>,
    ) -> Result<()> {
        let decision = self.check_rate_limit(action, quota, None, actor).await;
        if decision.allowed {
            Ok(())
        } else {
            let reset_at = decision.reset_at.unwrap_or_else(|| self.clock.now());
            Err(AppError::RateLimited { reset_at })
        }
    }

    /// Reads the user's ban state, lazily lifting time-boxed bans whose
    /// expiry has passed. An unknown user reads as not banned.
    pub async fn check_user_ban(&self, user_id: Uuid) -> Result<BanStatus> {
        let Some(user) = self.users.find(user_id).await? else {
            return Ok(BanStatus::clear());
        };

        if !user.banned {
            return Ok(BanStatus::clear());
        }

        if let Some(expires) = user.ban_expires {
            if expires <= self.clock.now() {
                // Auto-unban: the ban ran out, clear all three fields.
                self.users.clear_ban(user_id).await?;
                return Ok(BanStatus::clear());
            }
        }

        Ok(BanStatus { banned: true, reason: user.ban_reason, expires_at: user.ban_expires })
    }

    /// Uniform refusal for banned actors, applied at every mutation entry
    /// point.
    pub async fn ensure_not_banned(&self, user_id: Uuid) -> Result<()> {
        let status = self.check_user_ban(user_id).await?;
        if !status.banned {
            return Ok(());
        }
        let message = match status.reason {
            Some(reason) => format!("Your account is suspended: {reason}"),
            None => "Your account is suspended".to_string(),
        };
        Err(AppError::Forbidden(message))
    }

    /// Admin-only. No expiry means a permanent ban.
    pub async fn ban_user(
        &self,
        actor: &CurrentUser,
        user_id: Uuid,
        reason: String,
        expires: Option<DateTime<Utc>>,
    ) -> Result<()> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden(
                "Only administrators can ban users".to_string(),
            ));
        }
        if reason.trim().is_empty() {
            return Err(AppError::Validation("A ban reason is required".to_string()));
        }
        if self.users.find(user_id).await?.is_none() {
            return Err(AppError::not_found("User", user_id));
        }
        self.users.set_ban(user_id, reason, expires).await
    }

    /// Admin-only. Clears the ban fields regardless of expiry.
    pub async fn unban_user(&self, actor: &CurrentUser, user_id: Uuid) -> Result<()> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden(
                "Only administrators can unban users".to_string(),
            ));
        }
        if self.users.find(user_id).await?.is_none() {
            return Err(AppError::not_found("User", user_id));
        }
        self.users.clear_ban(user_id).await
    }
}
