//! # Domain Models
//!
//! These structs represent the core entities of the forum.
//! Ids are UUID v4; all timestamps are UTC.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Site-wide authority level. Category-scoped moderation rights are granted
/// separately through moderator links and do not require the Moderator role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Moderator => "MODERATOR",
            Role::Admin => "ADMIN",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "USER" => Some(Role::User),
            "MODERATOR" => Some(Role::Moderator),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// A registered account. Ban fields and reputation are the only parts this
/// core mutates; account lifecycle is handled elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub banned: bool,
    pub ban_reason: Option<String>,
    /// Absent while banned means a permanent ban.
    pub ban_expires: Option<DateTime<Utc>>,
    /// May go negative through like removals.
    pub reputation: i64,
    pub created_at: DateTime<Utc>,
}

/// A top-level grouping of threads (e.g. "General", "Support").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    /// The URL slug (e.g. "general")
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A discussion thread. The slug is unique within its category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: Uuid,
    pub category_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub is_locked: bool,
    pub is_pinned: bool,
    /// Post accepted as the answer, when the author or a moderator marked one.
    pub solution_post_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    /// Refreshed when a reply lands, so listings can sort by activity.
    pub updated_at: DateTime<Utc>,
}

/// A reply within a thread. `parent_id` points at another post of the same
/// thread for reply-to-reply nesting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub author_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub is_edited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Content a reaction or report can point at: exactly one of thread or post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentRef {
    Thread(Uuid),
    Post(Uuid),
}

impl ContentRef {
    pub fn id(&self) -> Uuid {
        match self {
            ContentRef::Thread(id) | ContentRef::Post(id) => *id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReactionKind {
    Like,
}

impl ReactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Like => "LIKE",
        }
    }

    pub fn parse(s: &str) -> Option<ReactionKind> {
        match s {
            "LIKE" => Some(ReactionKind::Like),
            _ => None,
        }
    }
}

/// At most one reaction of a given kind per (user, target); toggling flips
/// between presence and absence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub id: Uuid,
    pub kind: ReactionKind,
    pub target: ContentRef,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportKind {
    Spam,
    Harassment,
    Inappropriate,
    Misinformation,
    Other,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Spam => "SPAM",
            ReportKind::Harassment => "HARASSMENT",
            ReportKind::Inappropriate => "INAPPROPRIATE",
            ReportKind::Misinformation => "MISINFORMATION",
            ReportKind::Other => "OTHER",
        }
    }

    pub fn parse(s: &str) -> Option<ReportKind> {
        match s {
            "SPAM" => Some(ReportKind::Spam),
            "HARASSMENT" => Some(ReportKind::Harassment),
            "INAPPROPRIATE" => Some(ReportKind::Inappropriate),
            "MISINFORMATION" => Some(ReportKind::Misinformation),
            "OTHER" => Some(ReportKind::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Pending,
    InProgress,
    Resolved,
    Rejected,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "PENDING",
            ReportStatus::InProgress => "IN_PROGRESS",
            ReportStatus::Resolved => "RESOLVED",
            ReportStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<ReportStatus> {
        match s {
            "PENDING" => Some(ReportStatus::Pending),
            "IN_PROGRESS" => Some(ReportStatus::InProgress),
            "RESOLVED" => Some(ReportStatus::Resolved),
            "REJECTED" => Some(ReportStatus::Rejected),
            _ => None,
        }
    }
}

/// What a report points at: a thread, a post, or a user account. Reports
/// against a user carry no category context, so only admins handle them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportTarget {
    Thread(Uuid),
    Post(Uuid),
    User(Uuid),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub kind: ReportKind,
    pub reason: String,
    pub details: Option<String>,
    pub target: ReportTarget,
    pub reporter_id: Uuid,
    pub status: ReportStatus,
    pub resolution: Option<String>,
    pub closed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Reply,
    Like,
    Thread,
    Moderation,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Reply => "REPLY",
            NotificationKind::Like => "LIKE",
            NotificationKind::Thread => "THREAD",
            NotificationKind::Moderation => "MODERATION",
        }
    }

    pub fn parse(s: &str) -> Option<NotificationKind> {
        match s {
            "REPLY" => Some(NotificationKind::Reply),
            "LIKE" => Some(NotificationKind::Like),
            "THREAD" => Some(NotificationKind::Thread),
            "MODERATION" => Some(NotificationKind::Moderation),
            _ => None,
        }
    }
}

/// The entity a notification refers to, alongside `entity_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Thread,
    Post,
    Report,
    User,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Thread => "THREAD",
            EntityKind::Post => "POST",
            EntityKind::Report => "REPORT",
            EntityKind::User => "USER",
        }
    }

    pub fn parse(s: &str) -> Option<EntityKind> {
        match s {
            "THREAD" => Some(EntityKind::Thread),
            "POST" => Some(EntityKind::Post),
            "REPORT" => Some(EntityKind::Report),
            "USER" => Some(EntityKind::User),
            _ => None,
        }
    }
}

/// An inbox entry addressed to one recipient. Immutable after creation
/// except for the read flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    /// The recipient.
    pub user_id: Uuid,
    /// Who triggered it; absent for system-generated entries.
    pub actor_id: Option<Uuid>,
    pub entity_id: Uuid,
    pub entity_kind: EntityKind,
    pub title: Option<String>,
    pub message: Option<String>,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// The authenticated principal resolved by the session provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// One fixed-window counter, keyed by `"{action}:{client_id}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_at: DateTime<Utc>,
}

/// Pagination envelope returned by every listing operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total_count: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: u32, limit: u32, total_count: u64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total_count.div_ceil(u64::from(limit))
        };
        Self { items, page, limit, total_count, total_pages }
    }
}
