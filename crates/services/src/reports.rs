//! # Report Router
//!
//! Validates report submissions, persists them, and routes them to the
//! people who can act on them: moderators of the owning category plus all
//! admins on filing, and the original reporter on every status change.

use std::sync::Arc;

use uuid::Uuid;

use domains::{
    AppError, CategoryRepo, Clock, ContentRef, CurrentUser, Page, PostRepo, Report, ReportKind,
    ReportQuery, ReportRepo, ReportScope, ReportStatus, ReportTarget, Result, UserRepo,
};

use crate::moderation::ModerationService;
use crate::notifications::{NotificationEvent, NotificationService};
use crate::security::{RateQuotas, SecurityService};

const REASON_MIN: usize = 5;
const REASON_MAX: usize = 100;
const DETAILS_MAX: usize = 1000;

/// Raw report submission, one target field expected.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub kind: ReportKind,
    pub reason: String,
    pub details: Option<String>,
    pub thread_id: Option<Uuid>,
    pub post_id: Option<Uuid>,
    pub reported_user_id: Option<Uuid>,
}

pub struct ReportService {
    reports: Arc<dyn ReportRepo>,
    users: Arc<dyn UserRepo>,
    categories: Arc<dyn CategoryRepo>,
    posts: Arc<dyn PostRepo>,
    security: Arc<SecurityService>,
    moderation: Arc<ModerationService>,
    notifications: Arc<NotificationService>,
    quotas: RateQuotas,
    clock: Arc<dyn Clock>,
}

impl ReportService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reports: Arc<dyn ReportRepo>,
        users: Arc<dyn UserRepo>,
        categories: Arc<dyn CategoryRepo>,
        posts: Arc<dyn PostRepo>,
        security: Arc<SecurityService>,
        moderation: Arc<ModerationService>,
        notifications: Arc<NotificationService>,
        quotas: RateQuotas,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reports,
            users,
            categories,
            posts,
            security,
            moderation,
            notifications,
            quotas,
            clock,
        }
    }

    pub async fn create_report(&self, actor: &CurrentUser, input: NewReport) -> Result<Report> {
        self.security.ensure_not_banned(actor.id).await?;
        self.security
            .enforce_rate_limit("report:create", self.quotas.file_report, Some(actor.id))
            .await?;

        let target = validate_target(&input)?;
        validate_text(&input)?;

        // Resolve the target up front: a dangling report helps nobody, and
        // content targets pin down the category for the fan-out.
        let category_id = match target {
            ReportTarget::Thread(id) => {
                Some(self.moderation.locate(ContentRef::Thread(id)).await?.category_id)
            }
            ReportTarget::Post(id) => {
                Some(self.moderation.locate(ContentRef::Post(id)).await?.category_id)
            }
            ReportTarget::User(id) => {
                if self.users.find(id).await?.is_none() {
                    return Err(AppError::not_found("User", id));
                }
                None
            }
        };

        let now = self.clock.now();
        let report = Report {
            id: Uuid::new_v4(),
            kind: input.kind,
            reason: input.reason.trim().to_string(),
            details: input.details.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            target,
            reporter_id: actor.id,
            status: ReportStatus::Pending,
            resolution: None,
            closed_by: None,
            created_at: now,
            updated_at: now,
        };
        self.reports.create(report.clone()).await?;

        self.notifications
            .dispatch(NotificationEvent::ReportFiled {
                report_id: report.id,
                reporter_id: actor.id,
                category_id,
            })
            .await;

        Ok(report)
    }

    /// Moves a report to a new status, records who closed it, and tells the
    /// reporter what happened.
    pub async fn update_report_status(
        &self,
        actor: &CurrentUser,
        report_id: Uuid,
        status: ReportStatus,
        resolution: Option<String>,
    ) -> Result<Report> {
        let mut report = self
            .reports
            .find(report_id)
            .await?
            .ok_or_else(|| AppError::not_found("Report", report_id))?;

        self.moderation.ensure_can_handle_report(actor, &report).await?;

        let now = self.clock.now();
        self.reports
            .set_status(report_id, status, resolution.clone(), actor.id, now)
            .await?;

        // The resolution link needs the owning thread for post targets; a
        // missing post (already removed by moderation) just means no link.
        let thread_id = match report.target {
            ReportTarget::Post(post_id) => {
                self.posts.find(post_id).await.ok().flatten().map(|p| p.thread_id)
            }
            _ => None,
        };

        self.notifications
            .dispatch(NotificationEvent::ReportClosed {
                report_id,
                reporter_id: report.reporter_id,
                status,
                target: report.target,
                thread_id,
            })
            .await;

        report.status = status;
        report.resolution = resolution;
        report.closed_by = Some(actor.id);
        report.updated_at = now;
        Ok(report)
    }

    /// Admins see everything; moderators only content reports inside the
    /// categories they moderate; everyone else is refused.
    pub async fn get_reports(
        &self,
        actor: &CurrentUser,
        status: Option<ReportStatus>,
        page: u32,
        limit: u32,
    ) -> Result<Page<Report>> {
        let scope = if actor.is_admin() {
            ReportScope::All
        } else {
            let moderated = self.categories.moderated_category_ids(actor.id).await?;
            if moderated.is_empty() {
                return Err(AppError::Forbidden(
                    "Only moderators and administrators can view reports".to_string(),
                ));
            }
            ReportScope::Categories(moderated)
        };

        self.reports.list(ReportQuery { status, scope, page, limit }).await
    }
}

fn validate_target(input: &NewReport) -> Result<ReportTarget> {
    let targets = [
        input.thread_id.map(ReportTarget::Thread),
        input.post_id.map(ReportTarget::Post),
        input.reported_user_id.map(ReportTarget::User),
    ];
    let mut present = targets.into_iter().flatten();

    let Some(target) = present.next() else {
        return Err(AppError::Validation(
            "You must specify what you are reporting".to_string(),
        ));
    };
    if present.next().is_some() {
        return Err(AppError::Validation(
            "You can only report one thing at a time".to_string(),
        ));
    }
    Ok(target)
}

fn validate_text(input: &NewReport) -> Result<()> {
    let reason_len = input.reason.trim().chars().count();
    if !(REASON_MIN..=REASON_MAX).contains(&reason_len) {
        return Err(AppError::Validation(format!(
            "Reason must be between {REASON_MIN} and {REASON_MAX} characters"
        )));
    }
    if let Some(details) = &input.details {
        if details.chars().count() > DETAILS_MAX {
            return Err(AppError::Validation(format!(
                "Details must be at most {DETAILS_MAX} characters"
            )));
        }
    }
    Ok(())
}
