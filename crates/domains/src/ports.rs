//! # Core Ports
//!
//! Persistence and collaborator contracts. Any adapter must implement these
//! traits to be wired into the services. With the `testing` feature enabled
//! each trait also exposes a mockall-generated `MockXxx` type.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Category, ContentRef, CurrentUser, Notification, Page, Post, RateLimitEntry, Reaction,
    ReactionKind, Report, ReportStatus, Thread, User,
};

/// Wall-clock source. Injected so window arithmetic and ban expiry are
/// testable without sleeping.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The production clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Accounts: ban state and reputation are the only writable parts here.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<User>>;

    async fn set_ban(
        &self,
        id: Uuid,
        reason: String,
        expires: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Clears `banned`, `ban_reason` and `ban_expires` in one statement.
    async fn clear_ban(&self, id: Uuid) -> Result<()>;

    async fn adjust_reputation(&self, id: Uuid, delta: i64) -> Result<()>;

    /// Every user with the Admin role, for report fan-out.
    async fn admin_ids(&self) -> Result<Vec<Uuid>>;
}

/// Categories and their moderator links.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CategoryRepo: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<Category>>;

    async fn moderator_ids(&self, category_id: Uuid) -> Result<Vec<Uuid>>;

    async fn is_moderator(&self, category_id: Uuid, user_id: Uuid) -> Result<bool>;

    /// Categories the user moderates, for scoping report listings.
    async fn moderated_category_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ThreadRepo: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<Thread>>;

    async fn create(&self, thread: Thread) -> Result<()>;

    async fn slug_in_use(&self, category_id: Uuid, slug: &str) -> Result<bool>;

    /// Refreshes `updated_at` (the activity bump on reply).
    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;

    async fn set_locked(&self, id: Uuid, locked: bool) -> Result<()>;

    async fn set_pinned(&self, id: Uuid, pinned: bool) -> Result<()>;

    async fn set_solution(&self, id: Uuid, post_id: Option<Uuid>) -> Result<()>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepo: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<Post>>;

    async fn create(&self, post: Post) -> Result<()>;

    /// Replaces the body and flips `is_edited`.
    async fn set_content(&self, id: Uuid, content: String, at: DateTime<Utc>) -> Result<()>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReactionRepo: Send + Sync {
    /// The unique reaction for (user, target, kind), if present.
    async fn find(
        &self,
        user_id: Uuid,
        target: ContentRef,
        kind: ReactionKind,
    ) -> Result<Option<Reaction>>;

    async fn create(&self, reaction: Reaction) -> Result<()>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Scope applied to report listings: admins see everything, moderators only
/// content reports inside categories they moderate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportScope {
    All,
    Categories(Vec<Uuid>),
}

#[derive(Debug, Clone)]
pub struct ReportQuery {
    pub status: Option<ReportStatus>,
    pub scope: ReportScope,
    pub page: u32,
    pub limit: u32,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReportRepo: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<Report>>;

    async fn create(&self, report: Report) -> Result<()>;

    async fn set_status(
        &self,
        id: Uuid,
        status: ReportStatus,
        resolution: Option<String>,
        closed_by: Uuid,
        at: DateTime<Utc>,
    ) -> Result<()>;

    async fn list(&self, query: ReportQuery) -> Result<Page<Report>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait NotificationRepo: Send + Sync {
    async fn create(&self, notification: Notification) -> Result<()>;

    async fn find(&self, id: Uuid) -> Result<Option<Notification>>;

    /// Newest-first page of the recipient's inbox.
    async fn list_for(&self, user_id: Uuid, page: u32, limit: u32) -> Result<Page<Notification>>;

    async fn unread_count(&self, user_id: Uuid) -> Result<u64>;

    async fn mark_read(&self, id: Uuid) -> Result<()>;

    /// Returns how many entries were flipped; zero on a repeat call.
    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64>;
}

/// Fixed-window counter storage. The window algorithm itself lives in the
/// security service; stores only get/put/increment so a shared cache can
/// stand in for the process-local map.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<RateLimitEntry>>;

    /// Creates or resets the entry for a fresh window.
    async fn put(&self, key: &str, entry: RateLimitEntry) -> Result<()>;

    async fn increment(&self, key: &str) -> Result<()>;
}

/// External auth collaborator: resolves an opaque session token to the
/// authenticated principal. This core never establishes identity itself.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_user(&self, token: &str) -> Result<Option<CurrentUser>>;
}
