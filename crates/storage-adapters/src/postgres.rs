//! # Postgres adapters
//!
//! Maps the relational schema to the domain models. All statements are
//! runtime queries; the schema (including the unique indexes the services
//! lean on) lives in `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

use domains::{
    AppError, Category, CategoryRepo, ContentRef, CurrentUser, Notification, NotificationRepo,
    Page, Post, PostRepo, Reaction, ReactionKind, ReactionRepo, Report, ReportQuery, ReportRepo,
    ReportScope, ReportStatus, ReportTarget, Result, Role, SessionProvider, Thread, ThreadRepo,
    User, UserRepo,
};

/// One pool-backed store implementing every persistence port.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(AppError::internal)
    }
}

fn db_err(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(db.message().to_string())
        }
        _ => AppError::internal(err),
    }
}

fn parse_enum<T>(raw: &str, parse: fn(&str) -> Option<T>, what: &str) -> Result<T> {
    parse(raw).ok_or_else(|| AppError::Internal(format!("invalid {what} value '{raw}'")))
}

fn row_to_user(row: &sqlx::postgres::PgRow) -> Result<User> {
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        role: parse_enum(row.get::<&str, _>("role"), Role::parse, "role")?,
        banned: row.get("banned"),
        ban_reason: row.get("ban_reason"),
        ban_expires: row.get("ban_expires"),
        reputation: row.get("reputation"),
        created_at: row.get("created_at"),
    })
}

fn row_to_thread(row: &sqlx::postgres::PgRow) -> Thread {
    Thread {
        id: row.get("id"),
        category_id: row.get("category_id"),
        author_id: row.get("author_id"),
        title: row.get("title"),
        slug: row.get("slug"),
        is_locked: row.get("is_locked"),
        is_pinned: row.get("is_pinned"),
        solution_post_id: row.get("solution_post_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_post(row: &sqlx::postgres::PgRow) -> Post {
    Post {
        id: row.get("id"),
        thread_id: row.get("thread_id"),
        author_id: row.get("author_id"),
        parent_id: row.get("parent_id"),
        content: row.get("content"),
        is_edited: row.get("is_edited"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Maps the (thread_id, post_id) nullable pair to the typed target.
fn content_ref_from_row(row: &sqlx::postgres::PgRow) -> Result<ContentRef> {
    let thread_id: Option<Uuid> = row.get("thread_id");
    let post_id: Option<Uuid> = row.get("post_id");
    match (thread_id, post_id) {
        (Some(id), None) => Ok(ContentRef::Thread(id)),
        (None, Some(id)) => Ok(ContentRef::Post(id)),
        _ => Err(AppError::Internal("reaction row without a single target".to_string())),
    }
}

fn report_target_from_row(row: &sqlx::postgres::PgRow) -> Result<ReportTarget> {
    let thread_id: Option<Uuid> = row.get("thread_id");
    let post_id: Option<Uuid> = row.get("post_id");
    let reported_id: Option<Uuid> = row.get("reported_id");
    match (thread_id, post_id, reported_id) {
        (Some(id), None, None) => Ok(ReportTarget::Thread(id)),
        (None, Some(id), None) => Ok(ReportTarget::Post(id)),
        (None, None, Some(id)) => Ok(ReportTarget::User(id)),
        _ => Err(AppError::Internal("report row without a single target".to_string())),
    }
}

fn row_to_report(row: &sqlx::postgres::PgRow) -> Result<Report> {
    Ok(Report {
        id: row.get("id"),
        kind: parse_enum(row.get::<&str, _>("kind"), domains::ReportKind::parse, "report kind")?,
        reason: row.get("reason"),
        details: row.get("details"),
        target: report_target_from_row(row)?,
        reporter_id: row.get("reporter_id"),
        status: parse_enum(row.get::<&str, _>("status"), ReportStatus::parse, "report status")?,
        resolution: row.get("resolution"),
        closed_by: row.get("closed_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_notification(row: &sqlx::postgres::PgRow) -> Result<Notification> {
    Ok(Notification {
        id: row.get("id"),
        kind: parse_enum(
            row.get::<&str, _>("kind"),
            domains::NotificationKind::parse,
            "notification kind",
        )?,
        user_id: row.get("user_id"),
        actor_id: row.get("actor_id"),
        entity_id: row.get("entity_id"),
        entity_kind: parse_enum(
            row.get::<&str, _>("entity_kind"),
            domains::EntityKind::parse,
            "entity kind",
        )?,
        title: row.get("title"),
        message: row.get("message"),
        link: row.get("link"),
        is_read: row.get("is_read"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl UserRepo for PgStore {
    async fn find(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn set_ban(
        &self,
        id: Uuid,
        reason: String,
        expires: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE users SET banned = TRUE, ban_reason = $2, ban_expires = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(reason)
        .bind(expires)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn clear_ban(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE users SET banned = FALSE, ban_reason = NULL, ban_expires = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn adjust_reputation(&self, id: Uuid, delta: i64) -> Result<()> {
        sqlx::query("UPDATE users SET reputation = reputation + $2 WHERE id = $1")
            .bind(id)
            .bind(delta)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn admin_ids(&self) -> Result<Vec<Uuid>> {
        let rows = sqlx::query("SELECT id FROM users WHERE role = 'ADMIN' ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.iter().map(|row| row.get("id")).collect())
    }
}

#[async_trait]
impl CategoryRepo for PgStore {
    async fn find(&self, id: Uuid) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(|row| Category {
            id: row.get("id"),
            slug: row.get("slug"),
            name: row.get("name"),
            description: row.get("description"),
            created_at: row.get("created_at"),
        }))
    }

    async fn moderator_ids(&self, category_id: Uuid) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT user_id FROM category_moderators WHERE category_id = $1 ORDER BY user_id",
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.iter().map(|row| row.get("user_id")).collect())
    }

    async fn is_moderator(&self, category_id: Uuid, user_id: Uuid) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 AS present FROM category_moderators WHERE category_id = $1 AND user_id = $2",
        )
        .bind(category_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.is_some())
    }

    async fn moderated_category_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT category_id FROM category_moderators WHERE user_id = $1 ORDER BY category_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.iter().map(|row| row.get("category_id")).collect())
    }
}

#[async_trait]
impl ThreadRepo for PgStore {
    async fn find(&self, id: Uuid) -> Result<Option<Thread>> {
        let row = sqlx::query("SELECT * FROM threads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.as_ref().map(row_to_thread))
    }

    async fn create(&self, thread: Thread) -> Result<()> {
        sqlx::query(
            "INSERT INTO threads \
             (id, category_id, author_id, title, slug, is_locked, is_pinned, solution_post_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(thread.id)
        .bind(thread.category_id)
        .bind(thread.author_id)
        .bind(thread.title)
        .bind(thread.slug)
        .bind(thread.is_locked)
        .bind(thread.is_pinned)
        .bind(thread.solution_post_id)
        .bind(thread.created_at)
        .bind(thread.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn slug_in_use(&self, category_id: Uuid, slug: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 AS present FROM threads WHERE category_id = $1 AND slug = $2")
            .bind(category_id)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.is_some())
    }

    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE threads SET updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn set_locked(&self, id: Uuid, locked: bool) -> Result<()> {
        sqlx::query("UPDATE threads SET is_locked = $2 WHERE id = $1")
            .bind(id)
            .bind(locked)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn set_pinned(&self, id: Uuid, pinned: bool) -> Result<()> {
        sqlx::query("UPDATE threads SET is_pinned = $2 WHERE id = $1")
            .bind(id)
            .bind(pinned)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn set_solution(&self, id: Uuid, post_id: Option<Uuid>) -> Result<()> {
        sqlx::query("UPDATE threads SET solution_post_id = $2 WHERE id = $1")
            .bind(id)
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl PostRepo for PgStore {
    async fn find(&self, id: Uuid) -> Result<Option<Post>> {
        let row = sqlx::query("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.as_ref().map(row_to_post))
    }

    async fn create(&self, post: Post) -> Result<()> {
        sqlx::query(
            "INSERT INTO posts \
             (id, thread_id, author_id, parent_id, content, is_edited, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(post.id)
        .bind(post.thread_id)
        .bind(post.author_id)
        .bind(post.parent_id)
        .bind(post.content)
        .bind(post.is_edited)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn set_content(&self, id: Uuid, content: String, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE posts SET content = $2, is_edited = TRUE, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(content)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl ReactionRepo for PgStore {
    async fn find(
        &self,
        user_id: Uuid,
        target: ContentRef,
        kind: ReactionKind,
    ) -> Result<Option<Reaction>> {
        let query = match target {
            ContentRef::Thread(_) => {
                "SELECT * FROM reactions WHERE user_id = $1 AND thread_id = $2 AND kind = $3"
            }
            ContentRef::Post(_) => {
                "SELECT * FROM reactions WHERE user_id = $1 AND post_id = $2 AND kind = $3"
            }
        };
        let row = sqlx::query(query)
            .bind(user_id)
            .bind(target.id())
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(|row| {
            Ok(Reaction {
                id: row.get("id"),
                kind: parse_enum(row.get::<&str, _>("kind"), ReactionKind::parse, "reaction kind")?,
                target: content_ref_from_row(&row)?,
                user_id: row.get("user_id"),
                created_at: row.get("created_at"),
            })
        })
        .transpose()
    }

    async fn create(&self, reaction: Reaction) -> Result<()> {
        let (thread_id, post_id) = match reaction.target {
            ContentRef::Thread(id) => (Some(id), None),
            ContentRef::Post(id) => (None, Some(id)),
        };
        sqlx::query(
            "INSERT INTO reactions (id, kind, thread_id, post_id, user_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(reaction.id)
        .bind(reaction.kind.as_str())
        .bind(thread_id)
        .bind(post_id)
        .bind(reaction.user_id)
        .bind(reaction.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM reactions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl ReportRepo for PgStore {
    async fn find(&self, id: Uuid) -> Result<Option<Report>> {
        let row = sqlx::query("SELECT * FROM reports WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_report).transpose()
    }

    async fn create(&self, report: Report) -> Result<()> {
        let (thread_id, post_id, reported_id) = match report.target {
            ReportTarget::Thread(id) => (Some(id), None, None),
            ReportTarget::Post(id) => (None, Some(id), None),
            ReportTarget::User(id) => (None, None, Some(id)),
        };
        sqlx::query(
            "INSERT INTO reports \
             (id, kind, reason, details, thread_id, post_id, reported_id, reporter_id, status, resolution, closed_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(report.id)
        .bind(report.kind.as_str())
        .bind(report.reason)
        .bind(report.details)
        .bind(thread_id)
        .bind(post_id)
        .bind(reported_id)
        .bind(report.reporter_id)
        .bind(report.status.as_str())
        .bind(report.resolution)
        .bind(report.closed_by)
        .bind(report.created_at)
        .bind(report.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
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
        sqlx::query(
            "UPDATE reports SET status = $2, resolution = $3, closed_by = $4, updated_at = $5 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(resolution)
        .bind(closed_by)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn list(&self, query: ReportQuery) -> Result<Page<Report>> {
        // Content reports resolve their category through the owning thread
        // (directly, or via the post's thread); user reports have none and
        // only surface in the unscoped listing.
        const FROM: &str = "FROM reports r \
             LEFT JOIN threads t ON r.thread_id = t.id \
             LEFT JOIN posts p ON r.post_id = p.id \
             LEFT JOIN threads pt ON p.thread_id = pt.id";

        let status = query.status.map(|s| s.as_str().to_string());
        let (category_filter, categories) = match &query.scope {
            ReportScope::All => ("", None),
            ReportScope::Categories(ids) => (
                " AND COALESCE(t.category_id, pt.category_id) = ANY($2)",
                Some(ids.clone()),
            ),
        };

        let count_sql = format!(
            "SELECT COUNT(*) AS total {FROM} \
             WHERE ($1::text IS NULL OR r.status = $1){category_filter}"
        );
        let mut count_query = sqlx::query(&count_sql).bind(status.clone());
        if let Some(ids) = &categories {
            count_query = count_query.bind(ids.clone());
        }
        let total: i64 = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?
            .get("total");

        let offset = i64::from(query.page.saturating_sub(1)) * i64::from(query.limit);
        let list_sql = format!(
            "SELECT r.* {FROM} \
             WHERE ($1::text IS NULL OR r.status = $1){category_filter} \
             ORDER BY r.created_at DESC LIMIT {} OFFSET {}",
            query.limit, offset
        );
        let mut list_query = sqlx::query(&list_sql).bind(status);
        if let Some(ids) = &categories {
            list_query = list_query.bind(ids.clone());
        }
        let rows = list_query.fetch_all(&self.pool).await.map_err(db_err)?;

        let items = rows
            .iter()
            .map(row_to_report)
            .collect::<Result<Vec<Report>>>()?;
        Ok(Page::new(items, query.page, query.limit, total as u64))
    }
}

#[async_trait]
impl NotificationRepo for PgStore {
    async fn create(&self, notification: Notification) -> Result<()> {
        sqlx::query(
            "INSERT INTO notifications \
             (id, kind, user_id, actor_id, entity_id, entity_kind, title, message, link, is_read, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(notification.id)
        .bind(notification.kind.as_str())
        .bind(notification.user_id)
        .bind(notification.actor_id)
        .bind(notification.entity_id)
        .bind(notification.entity_kind.as_str())
        .bind(notification.title)
        .bind(notification.message)
        .bind(notification.link)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Notification>> {
        let row = sqlx::query("SELECT * FROM notifications WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_notification).transpose()
    }

    async fn list_for(&self, user_id: Uuid, page: u32, limit: u32) -> Result<Page<Notification>> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM notifications WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?
            .get("total");

        let offset = i64::from(page.saturating_sub(1)) * i64::from(limit);
        let rows = sqlx::query(
            "SELECT * FROM notifications WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let items = rows
            .iter()
            .map(row_to_notification)
            .collect::<Result<Vec<Notification>>>()?;
        Ok(Page::new(items, page, limit, total as u64))
    }

    async fn unread_count(&self, user_id: Uuid) -> Result<u64> {
        let total: i64 = sqlx::query(
            "SELECT COUNT(*) AS total FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?
        .get("total");
        Ok(total as u64)
    }

    async fn mark_read(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SessionProvider for PgStore {
    async fn current_user(&self, token: &str) -> Result<Option<CurrentUser>> {
        let row = sqlx::query(
            "SELECT u.id, u.username, u.role FROM sessions s \
             JOIN users u ON u.id = s.user_id \
             WHERE s.token = $1 AND s.expires_at > now()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(|row| {
            Ok(CurrentUser {
                id: row.get("id"),
                username: row.get("username"),
                role: parse_enum(row.get::<&str, _>("role"), Role::parse, "role")?,
            })
        })
        .transpose()
    }
}
