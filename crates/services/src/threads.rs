//! # Threads
//!
//! Thread creation and the moderation toggles (lock, pin, solution). A new
//! thread is announced to every moderator of its category.

use std::sync::Arc;

use uuid::Uuid;

use domains::{
    AppError, CategoryRepo, Clock, CurrentUser, PostRepo, Result, Thread, ThreadRepo,
};

use crate::moderation::ModerationService;
use crate::notifications::{NotificationEvent, NotificationService};
use crate::security::{RateQuotas, SecurityService};

const TITLE_MIN: usize = 5;
const TITLE_MAX: usize = 150;

#[derive(Debug, Clone)]
pub struct NewThread {
    pub category_id: Uuid,
    pub title: String,
}

pub struct ThreadService {
    threads: Arc<dyn ThreadRepo>,
    categories: Arc<dyn CategoryRepo>,
    posts: Arc<dyn PostRepo>,
    security: Arc<SecurityService>,
    moderation: Arc<ModerationService>,
    notifications: Arc<NotificationService>,
    quotas: RateQuotas,
    clock: Arc<dyn Clock>,
}

impl ThreadService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        threads: Arc<dyn ThreadRepo>,
        categories: Arc<dyn CategoryRepo>,
        posts: Arc<dyn PostRepo>,
        security: Arc<SecurityService>,
        moderation: Arc<ModerationService>,
        notifications: Arc<NotificationService>,
        quotas: RateQuotas,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { threads, categories, posts, security, moderation, notifications, quotas, clock }
    }

    pub async fn create(&self, actor: &CurrentUser, input: NewThread) -> Result<Thread> {
        self.security.ensure_not_banned(actor.id).await?;
        self.security
            .enforce_rate_limit("thread:create", self.quotas.create_thread, Some(actor.id))
            .await?;

        let title = input.title.trim().to_string();
        let title_len = title.chars().count();
        if !(TITLE_MIN..=TITLE_MAX).contains(&title_len) {
            return Err(AppError::Validation(format!(
                "Title must be between {TITLE_MIN} and {TITLE_MAX} characters"
            )));
        }

        if self.categories.find(input.category_id).await?.is_none() {
            return Err(AppError::not_found("Category", input.category_id));
        }

        let slug = self.unique_slug(input.category_id, &slugify(&title)).await?;
        let now = self.clock.now();
        let thread = Thread {
            id: Uuid::new_v4(),
            category_id: input.category_id,
            author_id: actor.id,
            title,
            slug,
            is_locked: false,
            is_pinned: false,
            solution_post_id: None,
            created_at: now,
            updated_at: now,
        };
        self.threads.create(thread.clone()).await?;

        self.notifications
            .dispatch(NotificationEvent::ThreadCreated {
                thread_id: thread.id,
                category_id: thread.category_id,
                author_id: actor.id,
            })
            .await;

        Ok(thread)
    }

    /// Moderator tool; authorship grants nothing here.
    pub async fn set_locked(
        &self,
        actor: &CurrentUser,
        thread_id: Uuid,
        locked: bool,
    ) -> Result<()> {
        let thread = self.require(thread_id).await?;
        self.moderation.ensure_can_moderate(actor, thread.category_id).await?;
        self.threads.set_locked(thread_id, locked).await
    }

    /// Moderator tool; authorship grants nothing here.
    pub async fn set_pinned(
        &self,
        actor: &CurrentUser,
        thread_id: Uuid,
        pinned: bool,
    ) -> Result<()> {
        let thread = self.require(thread_id).await?;
        self.moderation.ensure_can_moderate(actor, thread.category_id).await?;
        self.threads.set_pinned(thread_id, pinned).await
    }

    /// Marks (or clears) the accepted answer. Open to the thread author as
    /// well as moderators and admins.
    pub async fn set_solution(
        &self,
        actor: &CurrentUser,
        thread_id: Uuid,
        post_id: Option<Uuid>,
    ) -> Result<()> {
        let thread = self.require(thread_id).await?;
        self.moderation
            .ensure_can_act_on(actor, thread.author_id, thread.category_id)
            .await?;

        if let Some(post_id) = post_id {
            let post = self
                .posts
                .find(post_id)
                .await?
                .ok_or_else(|| AppError::not_found("Post", post_id))?;
            if post.thread_id != thread_id {
                return Err(AppError::Validation(
                    "The solution must be a post in this thread".to_string(),
                ));
            }
        }

        self.threads.set_solution(thread_id, post_id).await
    }

    async fn require(&self, thread_id: Uuid) -> Result<Thread> {
        self.threads
            .find(thread_id)
            .await?
            .ok_or_else(|| AppError::not_found("Thread", thread_id))
    }

    /// Appends a numeric suffix until the slug is free within the category.
    async fn unique_slug(&self, category_id: Uuid, base: &str) -> Result<String> {
        if !self.threads.slug_in_use(category_id, base).await? {
            return Ok(base.to_string());
        }
        for n in 2..=50u32 {
            let candidate = format!("{base}-{n}");
            if !self.threads.slug_in_use(category_id, &candidate).await? {
                return Ok(candidate);
            }
        }
        Ok(format!("{base}-{}", Uuid::new_v4().simple()))
    }
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "thread".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_flattens_punctuation_and_case() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  How do I use async/await?  "), "how-do-i-use-async-await");
        assert_eq!(slugify("???"), "thread");
    }

    #[test]
    fn slugify_never_emits_leading_or_trailing_dashes() {
        assert_eq!(slugify("...spaced out..."), "spaced-out");
    }
}
