//! # Moderator Resolver
//!
//! Maps content to the set of users authorized to moderate it (the owning
//! category's moderators plus site admins) and applies the composite
//! permission rule shared by edit, delete and report handling: the author,
//! a moderator of the owning category, or an admin.

use std::sync::Arc;

use uuid::Uuid;

use domains::{
    AppError, CategoryRepo, ContentRef, CurrentUser, PostRepo, Report, ReportTarget, Result,
    ThreadRepo,
};

/// Where a piece of content lives and who wrote it.
#[derive(Debug, Clone, Copy)]
pub struct ContentLocation {
    pub category_id: Uuid,
    pub thread_id: Uuid,
    pub author_id: Uuid,
}

pub struct ModerationService {
    categories: Arc<dyn CategoryRepo>,
    threads: Arc<dyn ThreadRepo>,
    posts: Arc<dyn PostRepo>,
}

impl ModerationService {
    pub fn new(
        categories: Arc<dyn CategoryRepo>,
        threads: Arc<dyn ThreadRepo>,
        posts: Arc<dyn PostRepo>,
    ) -> Self {
        Self { categories, threads, posts }
    }

    /// Resolves a thread or post to its category, owning thread and author.
    pub async fn locate(&self, target: ContentRef) -> Result<ContentLocation> {
        match target {
            ContentRef::Thread(id) => {
                let thread = self
                    .threads
                    .find(id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Thread", id))?;
                Ok(ContentLocation {
                    category_id: thread.category_id,
                    thread_id: thread.id,
                    author_id: thread.author_id,
                })
            }
            ContentRef::Post(id) => {
                let post = self
                    .posts
                    .find(id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Post", id))?;
                let thread = self
                    .threads
                    .find(post.thread_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Thread", post.thread_id))?;
                Ok(ContentLocation {
                    category_id: thread.category_id,
                    thread_id: thread.id,
                    author_id: post.author_id,
                })
            }
        }
    }

    /// User ids moderating the content's category.
    pub async fn moderators_for(&self, target: ContentRef) -> Result<Vec<Uuid>> {
        let location = self.locate(target).await?;
        self.categories.moderator_ids(location.category_id).await
    }

    pub async fn can_moderate_category(
        &self,
        user: &CurrentUser,
        category_id: Uuid,
    ) -> Result<bool> {
        if user.is_admin() {
            return Ok(true);
        }
        self.categories.is_moderator(category_id, user.id).await
    }

    /// The composite rule: the author, a moderator of the owning category,
    /// or an admin.
    pub async fn ensure_can_act_on(
        &self,
        user: &CurrentUser,
        author_id: Uuid,
        category_id: Uuid,
    ) -> Result<()> {
        if user.id == author_id || self.can_moderate_category(user, category_id).await? {
            return Ok(());
        }
        Err(AppError::Forbidden(
            "You do not have permission to manage this content".to_string(),
        ))
    }

    /// Moderator-only variant for lock/pin style tools, where authorship
    /// grants nothing.
    pub async fn ensure_can_moderate(
        &self,
        user: &CurrentUser,
        category_id: Uuid,
    ) -> Result<()> {
        if self.can_moderate_category(user, category_id).await? {
            return Ok(());
        }
        Err(AppError::Forbidden(
            "You do not have permission to moderate this category".to_string(),
        ))
    }

    /// Reports against a user carry no category context and are admin-only;
    /// content reports are open to moderators of the owning category.
    pub async fn ensure_can_handle_report(
        &self,
        user: &CurrentUser,
        report: &Report,
    ) -> Result<()> {
        if user.is_admin() {
            return Ok(());
        }
        let content = match report.target {
            ReportTarget::User(_) => {
                return Err(AppError::Forbidden(
                    "Only administrators can handle reports against users".to_string(),
                ));
            }
            ReportTarget::Thread(id) => ContentRef::Thread(id),
            ReportTarget::Post(id) => ContentRef::Post(id),
        };
        let location = self.locate(content).await?;
        if self.categories.is_moderator(location.category_id, user.id).await? {
            return Ok(());
        }
        Err(AppError::Forbidden(
            "You can only handle reports in categories you moderate".to_string(),
        ))
    }
}
