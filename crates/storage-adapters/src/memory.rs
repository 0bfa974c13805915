//! # In-memory adapters
//!
//! DashMap-backed implementations of every persistence port. Used by the
//! integration tests and the database-less dev mode. The same uniqueness
//! rules the Postgres schema enforces are enforced here, so services see
//! identical behavior against either backend.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use domains::{
    AppError, Category, CategoryRepo, ContentRef, CurrentUser, Notification, NotificationRepo,
    Page, Post, PostRepo, RateLimitEntry, RateLimitStore, Reaction, ReactionKind, ReactionRepo,
    Report, ReportQuery, ReportRepo, ReportScope, ReportStatus, ReportTarget, Result, Role,
    SessionProvider, Thread, ThreadRepo, User, UserRepo,
};

/// One store implementing all repository ports. Clone an `Arc<MemoryStore>`
/// once per port when wiring services.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    categories: DashMap<Uuid, Category>,
    /// (category_id, user_id) moderator links.
    moderators: DashMap<(Uuid, Uuid), ()>,
    threads: DashMap<Uuid, Thread>,
    posts: DashMap<Uuid, Post>,
    reactions: DashMap<Uuid, Reaction>,
    reports: DashMap<Uuid, Report>,
    notifications: DashMap<Uuid, Notification>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    // ── Seeding helpers for tests and dev mode ───────────────────────────

    pub fn seed_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    pub fn seed_category(&self, category: Category) {
        self.categories.insert(category.id, category);
    }

    pub fn seed_moderator(&self, category_id: Uuid, user_id: Uuid) {
        self.moderators.insert((category_id, user_id), ());
    }

    pub fn seed_thread(&self, thread: Thread) {
        self.threads.insert(thread.id, thread);
    }

    pub fn seed_post(&self, post: Post) {
        self.posts.insert(post.id, post);
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.users.get(&id).map(|u| u.clone())
    }

    pub fn thread(&self, id: Uuid) -> Option<Thread> {
        self.threads.get(&id).map(|t| t.clone())
    }

    pub fn notifications_for(&self, user_id: Uuid) -> Vec<Notification> {
        let mut out: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .map(|n| n.clone())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    fn category_of_report(&self, report: &Report) -> Option<Uuid> {
        match report.target {
            ReportTarget::Thread(id) => self.threads.get(&id).map(|t| t.category_id),
            ReportTarget::Post(id) => {
                let thread_id = self.posts.get(&id).map(|p| p.thread_id)?;
                self.threads.get(&thread_id).map(|t| t.category_id)
            }
            ReportTarget::User(_) => None,
        }
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn set_ban(
        &self,
        id: Uuid,
        reason: String,
        expires: Option<DateTime<Utc>>,
    ) -> Result<()> {
        if let Some(mut user) = self.users.get_mut(&id) {
            user.banned = true;
            user.ban_reason = Some(reason);
            user.ban_expires = expires;
        }
        Ok(())
    }

    async fn clear_ban(&self, id: Uuid) -> Result<()> {
        if let Some(mut user) = self.users.get_mut(&id) {
            user.banned = false;
            user.ban_reason = None;
            user.ban_expires = None;
        }
        Ok(())
    }

    async fn adjust_reputation(&self, id: Uuid, delta: i64) -> Result<()> {
        if let Some(mut user) = self.users.get_mut(&id) {
            user.reputation += delta;
        }
        Ok(())
    }

    async fn admin_ids(&self) -> Result<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = self
            .users
            .iter()
            .filter(|u| u.role == Role::Admin)
            .map(|u| u.id)
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl CategoryRepo for MemoryStore {
    async fn find(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(self.categories.get(&id).map(|c| c.clone()))
    }

    async fn moderator_ids(&self, category_id: Uuid) -> Result<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = self
            .moderators
            .iter()
            .filter(|entry| entry.key().0 == category_id)
            .map(|entry| entry.key().1)
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn is_moderator(&self, category_id: Uuid, user_id: Uuid) -> Result<bool> {
        Ok(self.moderators.contains_key(&(category_id, user_id)))
    }

    async fn moderated_category_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = self
            .moderators
            .iter()
            .filter(|entry| entry.key().1 == user_id)
            .map(|entry| entry.key().0)
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl ThreadRepo for MemoryStore {
    async fn find(&self, id: Uuid) -> Result<Option<Thread>> {
        Ok(self.threads.get(&id).map(|t| t.clone()))
    }

    async fn create(&self, thread: Thread) -> Result<()> {
        if self.slug_in_use(thread.category_id, &thread.slug).await? {
            return Err(AppError::Conflict(format!(
                "slug '{}' already exists in category",
                thread.slug
            )));
        }
        self.threads.insert(thread.id, thread);
        Ok(())
    }

    async fn slug_in_use(&self, category_id: Uuid, slug: &str) -> Result<bool> {
        Ok(self
            .threads
            .iter()
            .any(|t| t.category_id == category_id && t.slug == slug))
    }

    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        if let Some(mut thread) = self.threads.get_mut(&id) {
            thread.updated_at = at;
        }
        Ok(())
    }

    async fn set_locked(&self, id: Uuid, locked: bool) -> Result<()> {
        if let Some(mut thread) = self.threads.get_mut(&id) {
            thread.is_locked = locked;
        }
        Ok(())
    }

    async fn set_pinned(&self, id: Uuid, pinned: bool) -> Result<()> {
        if let Some(mut thread) = self.threads.get_mut(&id) {
            thread.is_pinned = pinned;
        }
        Ok(())
    }

    async fn set_solution(&self, id: Uuid, post_id: Option<Uuid>) -> Result<()> {
        if let Some(mut thread) = self.threads.get_mut(&id) {
            thread.solution_post_id = post_id;
        }
        Ok(())
    }
}

#[async_trait]
impl PostRepo for MemoryStore {
    async fn find(&self, id: Uuid) -> Result<Option<Post>> {
        Ok(self.posts.get(&id).map(|p| p.clone()))
    }

    async fn create(&self, post: Post) -> Result<()> {
        self.posts.insert(post.id, post);
        Ok(())
    }

    async fn set_content(&self, id: Uuid, content: String, at: DateTime<Utc>) -> Result<()> {
        if let Some(mut post) = self.posts.get_mut(&id) {
            post.content = content;
            post.is_edited = true;
            post.updated_at = at;
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.posts.remove(&id);
        // Mirror the schema's cascades: reactions go, children are orphaned
        // in place.
        let dangling: Vec<Uuid> = self
            .reactions
            .iter()
            .filter(|r| r.target == ContentRef::Post(id))
            .map(|r| r.id)
            .collect();
        for reaction_id in dangling {
            self.reactions.remove(&reaction_id);
        }
        let children: Vec<Uuid> = self
            .posts
            .iter()
            .filter(|p| p.parent_id == Some(id))
            .map(|p| p.id)
            .collect();
        for child in children {
            if let Some(mut post) = self.posts.get_mut(&child) {
                post.parent_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ReactionRepo for MemoryStore {
    async fn find(
        &self,
        user_id: Uuid,
        target: ContentRef,
        kind: ReactionKind,
    ) -> Result<Option<Reaction>> {
        Ok(self
            .reactions
            .iter()
            .find(|r| r.user_id == user_id && r.target == target && r.kind == kind)
            .map(|r| r.clone()))
    }

    async fn create(&self, reaction: Reaction) -> Result<()> {
        // The unique (user, target, kind) index, as the schema enforces it.
        let duplicate = self.reactions.iter().any(|r| {
            r.user_id == reaction.user_id && r.target == reaction.target && r.kind == reaction.kind
        });
        if duplicate {
            return Err(AppError::Conflict("reaction already exists".to_string()));
        }
        self.reactions.insert(reaction.id, reaction);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.reactions.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl ReportRepo for MemoryStore {
    async fn find(&self, id: Uuid) -> Result<Option<Report>> {
        Ok(self.reports.get(&id).map(|r| r.clone()))
    }

    async fn create(&self, report: Report) -> Result<()> {
        self.reports.insert(report.id, report);
        Ok(())
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: ReportStatus,
        resolution: Option<String>,
        closed_by: Uuid,
        at: DateTime<Utc>,
    ) -> Result<()> {
        if let Some(mut report) = self.reports.get_mut(&id) {
            report.status = status;
            report.resolution = resolution;
            report.closed_by = Some(closed_by);
            report.updated_at = at;
        }
        Ok(())
    }

    async fn list(&self, query: ReportQuery) -> Result<Page<Report>> {
        let mut matching: Vec<Report> = self
            .reports
            .iter()
            .filter(|r| query.status.is_none_or(|s| r.status == s))
            .filter(|r| match &query.scope {
                ReportScope::All => true,
                ReportScope::Categories(ids) => self
                    .category_of_report(r)
                    .is_some_and(|category| ids.contains(&category)),
            })
            .map(|r| r.clone())
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let offset = (query.page.saturating_sub(1) as usize) * query.limit as usize;
        let items: Vec<Report> = matching
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .collect();
        Ok(Page::new(items, query.page, query.limit, total))
    }
}

#[async_trait]
impl NotificationRepo for MemoryStore {
    async fn create(&self, notification: Notification) -> Result<()> {
        self.notifications.insert(notification.id, notification);
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Notification>> {
        Ok(self.notifications.get(&id).map(|n| n.clone()))
    }

    async fn list_for(&self, user_id: Uuid, page: u32, limit: u32) -> Result<Page<Notification>> {
        let all = self.notifications_for(user_id);
        let total = all.len() as u64;
        let offset = (page.saturating_sub(1) as usize) * limit as usize;
        let items: Vec<Notification> =
            all.into_iter().skip(offset).take(limit as usize).collect();
        Ok(Page::new(items, page, limit, total))
    }

    async fn unread_count(&self, user_id: Uuid) -> Result<u64> {
        Ok(self
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count() as u64)
    }

    async fn mark_read(&self, id: Uuid) -> Result<()> {
        if let Some(mut notification) = self.notifications.get_mut(&id) {
            notification.is_read = true;
        }
        Ok(())
    }

    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
        let unread: Vec<Uuid> = self
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .map(|n| n.id)
            .collect();
        let flipped = unread.len() as u64;
        for id in unread {
            if let Some(mut notification) = self.notifications.get_mut(&id) {
                notification.is_read = true;
            }
        }
        Ok(flipped)
    }
}

/// Process-local fixed-window counters. Entries are never evicted; stale
/// keys sit in the map until the window key is reused or the process exits.
#[derive(Default)]
pub struct MemoryRateLimitStore {
    entries: DashMap<String, RateLimitEntry>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn get(&self, key: &str) -> Result<Option<RateLimitEntry>> {
        Ok(self.entries.get(key).map(|e| *e))
    }

    async fn put(&self, key: &str, entry: RateLimitEntry) -> Result<()> {
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<()> {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.count += 1;
        }
        Ok(())
    }
}

/// Token-to-principal map standing in for the external auth provider.
#[derive(Default)]
pub struct MemorySessions {
    tokens: DashMap<String, CurrentUser>,
}

impl MemorySessions {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn issue(&self, token: impl Into<String>, user: CurrentUser) {
        self.tokens.insert(token.into(), user);
    }
}

#[async_trait]
impl SessionProvider for MemorySessions {
    async fn current_user(&self, token: &str) -> Result<Option<CurrentUser>> {
        Ok(self.tokens.get(token).map(|u| u.clone()))
    }
}
