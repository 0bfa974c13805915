//! # Handlers
//!
//! Thin HTTP wrappers: resolve the session, call exactly one service, count
//! the outcome, and wrap the result in the uniform envelope. No business
//! rules live here.

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use domains::{
    AppError, ContentRef, CurrentUser, Notification, Page, Post, ReactionKind, Report, ReportKind,
    ReportStatus, Thread,
};
use services::{NewPost, NewReport, NewThread, ToggleOutcome};

use crate::response::{ActionResponse, ApiError};
use crate::AppState;

const MAX_PAGE_SIZE: u32 = 100;

/// Resolves the bearer token through the session provider. Absent or
/// unknown tokens read as unauthorized.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<CurrentUser, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    state
        .sessions
        .current_user(token)
        .await?
        .ok_or_else(|| AppError::Unauthorized.into())
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

impl PageQuery {
    fn resolve(&self) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(20).clamp(1, MAX_PAGE_SIZE);
        (page, limit)
    }
}

// ── Threads ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateThreadRequest {
    pub category_id: Uuid,
    pub title: String,
}

pub async fn create_thread(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateThreadRequest>,
) -> Result<Json<ActionResponse<Thread>>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    let result = state
        .threads
        .create(&user, NewThread { category_id: body.category_id, title: body.title })
        .await;
    state.metrics.record("thread:create", result.is_ok());
    Ok(ActionResponse::ok(result?))
}

#[derive(Debug, Deserialize)]
pub struct LockRequest {
    pub locked: bool,
}

pub async fn lock_thread(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(thread_id): Path<Uuid>,
    Json(body): Json<LockRequest>,
) -> Result<Json<ActionResponse<()>>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    let result = state.threads.set_locked(&user, thread_id, body.locked).await;
    state.metrics.record("thread:lock", result.is_ok());
    result?;
    Ok(ActionResponse::ok(()))
}

#[derive(Debug, Deserialize)]
pub struct PinRequest {
    pub pinned: bool,
}

pub async fn pin_thread(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(thread_id): Path<Uuid>,
    Json(body): Json<PinRequest>,
) -> Result<Json<ActionResponse<()>>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    let result = state.threads.set_pinned(&user, thread_id, body.pinned).await;
    state.metrics.record("thread:pin", result.is_ok());
    result?;
    Ok(ActionResponse::ok(()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    /// `null` clears the accepted answer.
    pub post_id: Option<Uuid>,
}

pub async fn solve_thread(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(thread_id): Path<Uuid>,
    Json(body): Json<SolveRequest>,
) -> Result<Json<ActionResponse<()>>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    let result = state.threads.set_solution(&user, thread_id, body.post_id).await;
    state.metrics.record("thread:solve", result.is_ok());
    result?;
    Ok(ActionResponse::ok(()))
}

// ── Posts ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub thread_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
}

pub async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreatePostRequest>,
) -> Result<Json<ActionResponse<Post>>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    let result = state
        .posts
        .create(
            &user,
            NewPost {
                thread_id: body.thread_id,
                parent_id: body.parent_id,
                content: body.content,
            },
        )
        .await;
    state.metrics.record("post:create", result.is_ok());
    Ok(ActionResponse::ok(result?))
}

#[derive(Debug, Deserialize)]
pub struct EditPostRequest {
    pub content: String,
}

pub async fn edit_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(post_id): Path<Uuid>,
    Json(body): Json<EditPostRequest>,
) -> Result<Json<ActionResponse<Post>>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    let result = state.posts.edit(&user, post_id, body.content).await;
    state.metrics.record("post:edit", result.is_ok());
    Ok(ActionResponse::ok(result?))
}

pub async fn delete_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(post_id): Path<Uuid>,
) -> Result<Json<ActionResponse<()>>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    let result = state.posts.delete(&user, post_id).await;
    state.metrics.record("post:delete", result.is_ok());
    result?;
    Ok(ActionResponse::ok(()))
}

// ── Reactions ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleReactionRequest {
    pub thread_id: Option<Uuid>,
    pub post_id: Option<Uuid>,
    #[serde(default = "default_reaction_kind")]
    pub kind: ReactionKind,
}

fn default_reaction_kind() -> ReactionKind {
    ReactionKind::Like
}

#[derive(Debug, Serialize)]
pub struct ToggleReactionData {
    pub reacted: bool,
}

pub async fn toggle_reaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ToggleReactionRequest>,
) -> Result<Json<ActionResponse<ToggleReactionData>>, ApiError> {
    let user = authenticate(&state, &headers).await?;

    let target = match (body.thread_id, body.post_id) {
        (Some(id), None) => ContentRef::Thread(id),
        (None, Some(id)) => ContentRef::Post(id),
        _ => {
            return Err(AppError::Validation(
                "You must specify exactly one of threadId or postId".to_string(),
            )
            .into());
        }
    };

    let result = state.reactions.toggle(&user, target, body.kind).await;
    state.metrics.record("reaction:toggle", result.is_ok());
    let outcome = result?;
    Ok(ActionResponse::ok(ToggleReactionData {
        reacted: outcome == ToggleOutcome::Added,
    }))
}

// ── Reports ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub kind: ReportKind,
    pub reason: String,
    pub details: Option<String>,
    pub thread_id: Option<Uuid>,
    pub post_id: Option<Uuid>,
    pub reported_id: Option<Uuid>,
}

pub async fn create_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateReportRequest>,
) -> Result<Json<ActionResponse<Report>>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    let result = state
        .reports
        .create_report(
            &user,
            NewReport {
                kind: body.kind,
                reason: body.reason,
                details: body.details,
                thread_id: body.thread_id,
                post_id: body.post_id,
                reported_user_id: body.reported_id,
            },
        )
        .await;
    state.metrics.record("report:create", result.is_ok());
    Ok(ActionResponse::ok(result?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateReportRequest {
    pub status: ReportStatus,
    pub resolution: Option<String>,
}

pub async fn update_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(report_id): Path<Uuid>,
    Json(body): Json<UpdateReportRequest>,
) -> Result<Json<ActionResponse<Report>>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    let result = state
        .reports
        .update_report_status(&user, report_id, body.status, body.resolution)
        .await;
    state.metrics.record("report:update", result.is_ok());
    Ok(ActionResponse::ok(result?))
}

#[derive(Debug, Deserialize)]
pub struct ReportListQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn list_reports(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ReportListQuery>,
) -> Result<Json<ActionResponse<Page<Report>>>, ApiError> {
    let user = authenticate(&state, &headers).await?;

    let status = match &query.status {
        Some(raw) => Some(
            ReportStatus::parse(raw)
                .ok_or_else(|| AppError::Validation(format!("Unknown report status '{raw}'")))?,
        ),
        None => None,
    };
    let (page, limit) =
        PageQuery { page: query.page, limit: query.limit }.resolve();

    let result = state.reports.get_reports(&user, status, page, limit).await;
    state.metrics.record("report:list", result.is_ok());
    Ok(ActionResponse::ok(result?))
}

// ── Notifications ────────────────────────────────────────────────────────

pub async fn list_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<Json<ActionResponse<Page<Notification>>>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    let (page, limit) = query.resolve();
    let result = state.notifications.list(&user, page, limit).await;
    Ok(ActionResponse::ok(result?))
}

#[derive(Debug, Serialize)]
pub struct UnreadCountData {
    pub count: u64,
}

pub async fn unread_count(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ActionResponse<UnreadCountData>>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    let count = state.notifications.unread_count(&user).await?;
    Ok(ActionResponse::ok(UnreadCountData { count }))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<ActionResponse<()>>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    state.notifications.mark_read(&user, notification_id).await?;
    Ok(ActionResponse::ok(()))
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadData {
    pub updated: u64,
}

pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ActionResponse<MarkAllReadData>>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    let updated = state.notifications.mark_all_read(&user).await?;
    Ok(ActionResponse::ok(MarkAllReadData { updated }))
}

// ── Admin ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanRequest {
    pub reason: String,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

pub async fn ban_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
    Json(body): Json<BanRequest>,
) -> Result<Json<ActionResponse<()>>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    let result = state
        .security
        .ban_user(&user, user_id, body.reason, body.expires_at)
        .await;
    state.metrics.record("user:ban", result.is_ok());
    result?;
    Ok(ActionResponse::ok(()))
}

pub async fn unban_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ActionResponse<()>>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    let result = state.security.unban_user(&user, user_id).await;
    state.metrics.record("user:unban", result.is_ok());
    result?;
    Ok(ActionResponse::ok(()))
}

// ── Observability ────────────────────────────────────────────────────────

pub async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}
