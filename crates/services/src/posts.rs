//! # Posts
//!
//! Reply creation with its side-effect chain (reputation, thread bump,
//! notification fan-out), plus edit and delete under the composite
//! permission rule. The post insert is the primary mutation; everything
//! after it is best-effort and never fails the reply.

use std::sync::Arc;

use uuid::Uuid;

use domains::{
    AppError, Clock, CurrentUser, Post, PostRepo, Result, ThreadRepo,
};

use crate::moderation::ModerationService;
use crate::notifications::{NotificationEvent, NotificationService};
use crate::reputation::ReputationLedger;
use crate::security::{RateQuotas, SecurityService};

const CONTENT_MAX: usize = 10_000;

#[derive(Debug, Clone)]
pub struct NewPost {
    pub thread_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
}

pub struct PostService {
    posts: Arc<dyn PostRepo>,
    threads: Arc<dyn ThreadRepo>,
    security: Arc<SecurityService>,
    moderation: Arc<ModerationService>,
    reputation: Arc<ReputationLedger>,
    notifications: Arc<NotificationService>,
    quotas: RateQuotas,
    clock: Arc<dyn Clock>,
}

impl PostService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        posts: Arc<dyn PostRepo>,
        threads: Arc<dyn ThreadRepo>,
        security: Arc<SecurityService>,
        moderation: Arc<ModerationService>,
        reputation: Arc<ReputationLedger>,
        notifications: Arc<NotificationService>,
        quotas: RateQuotas,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { posts, threads, security, moderation, reputation, notifications, quotas, clock }
    }

    pub async fn create(&self, actor: &CurrentUser, input: NewPost) -> Result<Post> {
        self.security.ensure_not_banned(actor.id).await?;
        self.security
            .enforce_rate_limit("post:create", self.quotas.create_post, Some(actor.id))
            .await?;

        let content = validate_content(&input.content)?;

        let thread = self
            .threads
            .find(input.thread_id)
            .await?
            .ok_or_else(|| AppError::not_found("Thread", input.thread_id))?;

        if thread.is_locked
            && !self.moderation.can_moderate_category(actor, thread.category_id).await?
        {
            return Err(AppError::Forbidden("This thread is locked".to_string()));
        }

        let parent_author_id = match input.parent_id {
            Some(parent_id) => {
                let parent = self
                    .posts
                    .find(parent_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Post", parent_id))?;
                if parent.thread_id != thread.id {
                    return Err(AppError::Validation(
                        "The parent post belongs to a different thread".to_string(),
                    ));
                }
                Some(parent.author_id)
            }
            None => None,
        };

        let now = self.clock.now();
        let post = Post {
            id: Uuid::new_v4(),
            thread_id: thread.id,
            author_id: actor.id,
            parent_id: input.parent_id,
            content,
            is_edited: false,
            created_at: now,
            updated_at: now,
        };
        self.posts.create(post.clone()).await?;

        // Side effects: each fails alone, the reply stands regardless.
        self.reputation.post_created(actor.id).await;
        if let Err(err) = self.threads.touch(thread.id, now).await {
            tracing::warn!(thread_id = %thread.id, error = %err, "thread bump failed");
        }
        self.notifications
            .dispatch(NotificationEvent::ReplyCreated {
                thread_id: thread.id,
                thread_author_id: thread.author_id,
                post_id: post.id,
                post_author_id: actor.id,
                parent_author_id,
            })
            .await;

        Ok(post)
    }

    pub async fn edit(&self, actor: &CurrentUser, post_id: Uuid, content: String) -> Result<Post> {
        let content = validate_content(&content)?;

        let mut post = self
            .posts
            .find(post_id)
            .await?
            .ok_or_else(|| AppError::not_found("Post", post_id))?;
        let thread = self
            .threads
            .find(post.thread_id)
            .await?
            .ok_or_else(|| AppError::not_found("Thread", post.thread_id))?;

        self.moderation
            .ensure_can_act_on(actor, post.author_id, thread.category_id)
            .await?;

        let now = self.clock.now();
        self.posts.set_content(post_id, content.clone(), now).await?;

        post.content = content;
        post.is_edited = true;
        post.updated_at = now;
        Ok(post)
    }

    pub async fn delete(&self, actor: &CurrentUser, post_id: Uuid) -> Result<()> {
        let post = self
            .posts
            .find(post_id)
            .await?
            .ok_or_else(|| AppError::not_found("Post", post_id))?;
        let thread = self
            .threads
            .find(post.thread_id)
            .await?
            .ok_or_else(|| AppError::not_found("Thread", post.thread_id))?;

        self.moderation
            .ensure_can_act_on(actor, post.author_id, thread.category_id)
            .await?;

        // A deleted post cannot stay the accepted answer.
        if thread.solution_post_id == Some(post_id) {
            self.threads.set_solution(thread.id, None).await?;
        }

        self.posts.delete(post_id).await
    }
}

fn validate_content(content: &str) -> Result<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Content cannot be empty".to_string()));
    }
    if trimmed.chars().count() > CONTENT_MAX {
        return Err(AppError::Validation(format!(
            "Content must be at most {CONTENT_MAX} characters"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_trimmed_and_bounded() {
        assert_eq!(validate_content("  hello  ").unwrap(), "hello");
        assert!(validate_content("   ").is_err());
        assert!(validate_content(&"x".repeat(10_001)).is_err());
    }
}
