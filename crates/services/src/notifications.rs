//! # Notification Dispatcher
//!
//! One logical domain event fans out into independent notification records,
//! one per recipient. Recipient resolution for every event kind lives in a
//! single function over a tagged event union, so the per-event rules are one
//! reviewable unit instead of logic scattered across call sites.
//!
//! Fan-out is fire-and-forget: a failed insert is logged and never fails or
//! rolls back the action that raised the event.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use domains::{
    AppError, CategoryRepo, Clock, ContentRef, CurrentUser, EntityKind, Notification,
    NotificationKind, NotificationRepo, Page, ReportStatus, ReportTarget, Result, UserRepo,
};

/// A domain event that may produce notifications.
#[derive(Debug, Clone)]
pub enum NotificationEvent {
    /// A post landed in a thread; may notify the thread author and the
    /// parent post's author.
    ReplyCreated {
        thread_id: Uuid,
        thread_author_id: Uuid,
        post_id: Uuid,
        post_author_id: Uuid,
        parent_author_id: Option<Uuid>,
    },
    /// A thread opened; notifies every moderator of its category, including
    /// the author if they happen to moderate it.
    ThreadCreated {
        thread_id: Uuid,
        category_id: Uuid,
        author_id: Uuid,
    },
    /// A like landed on a thread or post. Nothing fires on removal.
    LikeAdded {
        target: ContentRef,
        /// The thread the target belongs to (the target itself for thread
        /// likes), used to build the link.
        thread_id: Uuid,
        author_id: Uuid,
        actor_id: Uuid,
    },
    /// A report was filed; notifies category moderators and all admins,
    /// minus the reporter.
    ReportFiled {
        report_id: Uuid,
        reporter_id: Uuid,
        /// Absent for reports against a user account.
        category_id: Option<Uuid>,
    },
    /// A report changed status; notifies the original reporter.
    ReportClosed {
        report_id: Uuid,
        reporter_id: Uuid,
        status: ReportStatus,
        target: ReportTarget,
        /// The owning thread for post targets, used for the resolution link.
        thread_id: Option<Uuid>,
    },
}

impl NotificationEvent {
    fn actor_id(&self) -> Option<Uuid> {
        match self {
            NotificationEvent::ReplyCreated { post_author_id, .. } => Some(*post_author_id),
            NotificationEvent::ThreadCreated { author_id, .. } => Some(*author_id),
            NotificationEvent::LikeAdded { actor_id, .. } => Some(*actor_id),
            NotificationEvent::ReportFiled { reporter_id, .. } => Some(*reporter_id),
            // Moderation outcomes read as system-generated to the reporter.
            NotificationEvent::ReportClosed { .. } => None,
        }
    }
}

pub fn thread_link(thread_id: Uuid) -> String {
    format!("/threads/{thread_id}")
}

pub fn post_link(thread_id: Uuid, post_id: Uuid) -> String {
    format!("/threads/{thread_id}#post-{post_id}")
}

pub struct NotificationService {
    notifications: Arc<dyn NotificationRepo>,
    categories: Arc<dyn CategoryRepo>,
    users: Arc<dyn UserRepo>,
    clock: Arc<dyn Clock>,
}

impl NotificationService {
    pub fn new(
        notifications: Arc<dyn NotificationRepo>,
        categories: Arc<dyn CategoryRepo>,
        users: Arc<dyn UserRepo>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { notifications, categories, users, clock }
    }

    /// Fans the event out to its recipients. Never fails: resolution or
    /// insert errors are logged and swallowed.
    pub async fn dispatch(&self, event: NotificationEvent) {
        if let Err(err) = self.try_dispatch(&event).await {
            tracing::warn!(error = %err, ?event, "notification fan-out failed");
        }
    }

    async fn try_dispatch(&self, event: &NotificationEvent) -> Result<()> {
        let recipients = self.resolve_recipients(event).await?;
        if recipients.is_empty() {
            return Ok(());
        }

        let actor_name = match event.actor_id() {
            Some(id) => self
                .users
                .find(id)
                .await
                .ok()
                .flatten()
                .map(|u| u.username),
            None => None,
        };
        let actor_name = actor_name.unwrap_or_else(|| "Someone".to_string());
        let now = self.clock.now();

        for recipient in recipients {
            let notification = render(event, recipient, &actor_name, now);
            // Each insert stands alone; one failure must not starve the rest.
            if let Err(err) = self.notifications.create(notification).await {
                tracing::warn!(%recipient, error = %err, "failed to create notification");
            }
        }
        Ok(())
    }

    /// The complete recipient rules for every event kind. Returns a
    /// de-duplicated list in resolution order.
    pub async fn resolve_recipients(&self, event: &NotificationEvent) -> Result<Vec<Uuid>> {
        let mut recipients = Vec::new();

        match event {
            NotificationEvent::ReplyCreated {
                thread_author_id,
                post_author_id,
                parent_author_id,
                ..
            } => {
                if thread_author_id != post_author_id {
                    recipients.push(*thread_author_id);
                }
                if let Some(parent_author) = parent_author_id {
                    if parent_author != post_author_id {
                        recipients.push(*parent_author);
                    }
                }
            }
            NotificationEvent::ThreadCreated { category_id, .. } => {
                // Every category moderator, the author included if they
                // moderate it.
                recipients = self.categories.moderator_ids(*category_id).await?;
            }
            NotificationEvent::LikeAdded { author_id, actor_id, .. } => {
                if actor_id != author_id {
                    recipients.push(*author_id);
                }
            }
            NotificationEvent::ReportFiled { reporter_id, category_id, .. } => {
                if let Some(category_id) = category_id {
                    recipients.extend(self.categories.moderator_ids(*category_id).await?);
                }
                recipients.extend(self.users.admin_ids().await?);
                recipients.retain(|id| id != reporter_id);
            }
            NotificationEvent::ReportClosed { reporter_id, .. } => {
                recipients.push(*reporter_id);
            }
        }

        let mut seen = HashSet::new();
        recipients.retain(|id| seen.insert(*id));
        Ok(recipients)
    }

    // ── Read surface ─────────────────────────────────────────────────────

    pub async fn list(
        &self,
        user: &CurrentUser,
        page: u32,
        limit: u32,
    ) -> Result<Page<Notification>> {
        self.notifications.list_for(user.id, page, limit).await
    }

    pub async fn unread_count(&self, user: &CurrentUser) -> Result<u64> {
        self.notifications.unread_count(user.id).await
    }

    /// A notification owned by someone else reads as missing, so callers
    /// cannot probe for existence.
    pub async fn mark_read(&self, user: &CurrentUser, id: Uuid) -> Result<()> {
        match self.notifications.find(id).await? {
            Some(n) if n.user_id == user.id => self.notifications.mark_read(id).await,
            _ => Err(AppError::not_found("Notification", id)),
        }
    }

    /// Idempotent: a second call finds nothing unread and flips nothing.
    pub async fn mark_all_read(&self, user: &CurrentUser) -> Result<u64> {
        self.notifications.mark_all_read(user.id).await
    }
}

fn render(
    event: &NotificationEvent,
    recipient: Uuid,
    actor_name: &str,
    now: DateTime<Utc>,
) -> Notification {
    let (kind, entity_id, entity_kind, title, message, link) = match event {
        NotificationEvent::ReplyCreated {
            thread_id,
            thread_author_id,
            post_id,
            ..
        } => {
            let message = if recipient == *thread_author_id {
                format!("{actor_name} replied to your thread")
            } else {
                format!("{actor_name} replied to your post")
            };
            (
                NotificationKind::Reply,
                *post_id,
                EntityKind::Post,
                "New reply".to_string(),
                message,
                Some(post_link(*thread_id, *post_id)),
            )
        }
        NotificationEvent::ThreadCreated { thread_id, .. } => (
            NotificationKind::Thread,
            *thread_id,
            EntityKind::Thread,
            "New thread".to_string(),
            format!("{actor_name} started a thread in a category you moderate"),
            Some(thread_link(*thread_id)),
        ),
        NotificationEvent::LikeAdded { target, thread_id, .. } => {
            let (entity_kind, message, link) = match target {
                ContentRef::Thread(_) => (
                    EntityKind::Thread,
                    format!("{actor_name} liked your thread"),
                    thread_link(*thread_id),
                ),
                ContentRef::Post(post_id) => (
                    EntityKind::Post,
                    format!("{actor_name} liked your post"),
                    post_link(*thread_id, *post_id),
                ),
            };
            (
                NotificationKind::Like,
                target.id(),
                entity_kind,
                "New like".to_string(),
                message,
                Some(link),
            )
        }
        NotificationEvent::ReportFiled { report_id, .. } => (
            NotificationKind::Moderation,
            *report_id,
            EntityKind::Report,
            "New report".to_string(),
            "A new report was filed and needs review".to_string(),
            None,
        ),
        NotificationEvent::ReportClosed { report_id, status, target, thread_id, .. } => {
            let message = match status {
                ReportStatus::Resolved => "Your report has been resolved",
                ReportStatus::Rejected => "Your report has been reviewed and rejected",
                ReportStatus::InProgress => "Your report is being reviewed",
                ReportStatus::Pending => "Your report has been reopened",
            };
            // Only a resolved content report links back to the content.
            let link = match (status, target) {
                (ReportStatus::Resolved, ReportTarget::Thread(id)) => Some(thread_link(*id)),
                (ReportStatus::Resolved, ReportTarget::Post(post_id)) => {
                    thread_id.map(|tid| post_link(tid, *post_id))
                }
                _ => None,
            };
            (
                NotificationKind::Moderation,
                *report_id,
                EntityKind::Report,
                "Report update".to_string(),
                message.to_string(),
                link,
            )
        }
    };

    Notification {
        id: Uuid::new_v4(),
        kind,
        user_id: recipient,
        actor_id: event.actor_id(),
        entity_id,
        entity_kind,
        title: Some(title),
        message: Some(message),
        link,
        is_read: false,
        created_at: now,
    }
}
