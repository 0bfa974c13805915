//! Report routing end to end: validation, fan-out to moderators and admins,
//! scoped listings, and the reporter notification on status changes.

mod fixtures;

use domains::{
    AppError, NotificationKind, ReportKind, ReportStatus, ReportTarget, Role,
};
use fixtures::TestForum;
use services::NewReport;

fn report_on_post(post_id: uuid::Uuid) -> NewReport {
    NewReport {
        kind: ReportKind::Spam,
        reason: "Repeated link spam".to_string(),
        details: None,
        thread_id: None,
        post_id: Some(post_id),
        reported_user_id: None,
    }
}

#[tokio::test]
async fn a_report_needs_exactly_one_target() {
    let forum = TestForum::new();
    let reporter = forum.member("ada", Role::User);

    let err = forum
        .reports
        .create_report(
            &reporter,
            NewReport {
                kind: ReportKind::Spam,
                reason: "Repeated link spam".to_string(),
                details: None,
                thread_id: None,
                post_id: None,
                reported_user_id: None,
            },
        )
        .await
        .unwrap_err();
    match err {
        AppError::Validation(message) => {
            assert_eq!(message, "You must specify what you are reporting");
        }
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[tokio::test]
async fn filing_fans_out_to_moderators_and_admins_minus_the_reporter_deduped() {
    let forum = TestForum::new();
    let category = forum.category("general");

    // One user is both a site admin and a category moderator.
    let admin_and_mod = forum.member("root", Role::Admin);
    forum.make_moderator(category, &admin_and_mod);
    let plain_admin = forum.member("aria", Role::Admin);
    let plain_mod = forum.member("mira", Role::Moderator);
    forum.make_moderator(category, &plain_mod);

    // The reporter is an admin too, and must still not be notified.
    let reporter = forum.member("ada", Role::Admin);
    let offender = forum.member("uli", Role::User);
    let thread = forum.thread(category, &offender, "Spammy thread");
    let post = forum.post(&thread, &offender);

    let report = forum
        .reports
        .create_report(&reporter, report_on_post(post.id))
        .await
        .unwrap();
    assert_eq!(report.status, ReportStatus::Pending);
    assert_eq!(report.target, ReportTarget::Post(post.id));

    // Dual-role recipient: exactly one notification, not two.
    assert_eq!(forum.inbox(admin_and_mod.id).len(), 1);
    assert_eq!(forum.inbox(plain_admin.id).len(), 1);
    assert_eq!(forum.inbox(plain_mod.id).len(), 1);
    assert!(forum.inbox(reporter.id).is_empty());
    assert!(forum.inbox(offender.id).is_empty());

    let note = &forum.inbox(plain_mod.id)[0];
    assert_eq!(note.kind, NotificationKind::Moderation);
    assert_eq!(note.entity_id, report.id);
}

#[tokio::test]
async fn user_reports_reach_only_admins() {
    let forum = TestForum::new();
    let category = forum.category("general");
    let moderator = forum.member("mira", Role::Moderator);
    forum.make_moderator(category, &moderator);
    let admin = forum.member("root", Role::Admin);
    let reporter = forum.member("ada", Role::User);
    let offender = forum.member("uli", Role::User);

    forum
        .reports
        .create_report(
            &reporter,
            NewReport {
                kind: ReportKind::Harassment,
                reason: "Abusive profile text".to_string(),
                details: None,
                thread_id: None,
                post_id: None,
                reported_user_id: Some(offender.id),
            },
        )
        .await
        .unwrap();

    assert_eq!(forum.inbox(admin.id).len(), 1);
    assert!(forum.inbox(moderator.id).is_empty());
}

#[tokio::test]
async fn moderators_only_see_reports_from_their_categories() {
    let forum = TestForum::new();
    let moderated = forum.category("general");
    let unmoderated = forum.category("offtopic");
    let moderator = forum.member("mira", Role::Moderator);
    forum.make_moderator(moderated, &moderator);
    let admin = forum.member("root", Role::Admin);
    let reporter = forum.member("ada", Role::User);
    let offender = forum.member("uli", Role::User);

    let in_scope = forum.thread(moderated, &offender, "Watched thread");
    let out_of_scope = forum.thread(unmoderated, &offender, "Elsewhere");

    let visible = forum
        .reports
        .create_report(
            &reporter,
            NewReport {
                kind: ReportKind::Spam,
                reason: "Repeated link spam".to_string(),
                details: None,
                thread_id: Some(in_scope.id),
                post_id: None,
                reported_user_id: None,
            },
        )
        .await
        .unwrap();
    forum
        .reports
        .create_report(
            &reporter,
            NewReport {
                kind: ReportKind::Spam,
                reason: "Repeated link spam".to_string(),
                details: None,
                thread_id: Some(out_of_scope.id),
                post_id: None,
                reported_user_id: None,
            },
        )
        .await
        .unwrap();
    forum
        .reports
        .create_report(
            &reporter,
            NewReport {
                kind: ReportKind::Harassment,
                reason: "Abusive profile text".to_string(),
                details: None,
                thread_id: None,
                post_id: None,
                reported_user_id: Some(offender.id),
            },
        )
        .await
        .unwrap();

    let mod_view = forum.reports.get_reports(&moderator, None, 1, 20).await.unwrap();
    assert_eq!(mod_view.total_count, 1);
    assert_eq!(mod_view.items[0].id, visible.id);

    let admin_view = forum.reports.get_reports(&admin, None, 1, 20).await.unwrap();
    assert_eq!(admin_view.total_count, 3);

    let filtered = forum
        .reports
        .get_reports(&admin, Some(ReportStatus::Pending), 1, 20)
        .await
        .unwrap();
    assert_eq!(filtered.total_count, 3);

    // Plain users have no report queue at all.
    let err = forum.reports.get_reports(&reporter, None, 1, 20).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn resolving_notifies_the_reporter_with_the_status_dependent_link() {
    let forum = TestForum::new();
    let category = forum.category("general");
    let moderator = forum.member("mira", Role::Moderator);
    forum.make_moderator(category, &moderator);
    let reporter = forum.member("ada", Role::User);
    let offender = forum.member("uli", Role::User);
    let thread = forum.thread(category, &offender, "Spammy thread");
    let post = forum.post(&thread, &offender);

    let report = forum
        .reports
        .create_report(&reporter, report_on_post(post.id))
        .await
        .unwrap();
    let before = forum.inbox(reporter.id).len();

    let updated = forum
        .reports
        .update_report_status(
            &moderator,
            report.id,
            ReportStatus::Resolved,
            Some("Removed the post".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(updated.status, ReportStatus::Resolved);
    assert_eq!(updated.closed_by, Some(moderator.id));

    let inbox = forum.inbox(reporter.id);
    assert_eq!(inbox.len(), before + 1);
    let note = &inbox[0];
    assert_eq!(note.kind, NotificationKind::Moderation);
    assert_eq!(note.link, Some(format!("/threads/{}#post-{}", thread.id, post.id)));
}

#[tokio::test]
async fn rejection_notifies_without_a_link() {
    let forum = TestForum::new();
    let category = forum.category("general");
    let admin = forum.member("root", Role::Admin);
    let reporter = forum.member("ada", Role::User);
    let offender = forum.member("uli", Role::User);
    let thread = forum.thread(category, &offender, "Borderline thread");

    let report = forum
        .reports
        .create_report(
            &reporter,
            NewReport {
                kind: ReportKind::Other,
                reason: "I just dislike it".to_string(),
                details: None,
                thread_id: Some(thread.id),
                post_id: None,
                reported_user_id: None,
            },
        )
        .await
        .unwrap();

    forum
        .reports
        .update_report_status(&admin, report.id, ReportStatus::Rejected, None)
        .await
        .unwrap();

    let note = &forum.inbox(reporter.id)[0];
    assert_eq!(note.kind, NotificationKind::Moderation);
    assert_eq!(note.link, None);
}

#[tokio::test]
async fn moderators_cannot_handle_reports_outside_their_categories_or_user_reports() {
    let forum = TestForum::new();
    let moderated = forum.category("general");
    let unmoderated = forum.category("offtopic");
    let moderator = forum.member("mira", Role::Moderator);
    forum.make_moderator(moderated, &moderator);
    let reporter = forum.member("ada", Role::User);
    let offender = forum.member("uli", Role::User);
    let elsewhere = forum.thread(unmoderated, &offender, "Out of reach");

    let content_report = forum
        .reports
        .create_report(
            &reporter,
            NewReport {
                kind: ReportKind::Spam,
                reason: "Repeated link spam".to_string(),
                details: None,
                thread_id: Some(elsewhere.id),
                post_id: None,
                reported_user_id: None,
            },
        )
        .await
        .unwrap();
    let err = forum
        .reports
        .update_report_status(&moderator, content_report.id, ReportStatus::Resolved, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let user_report = forum
        .reports
        .create_report(
            &reporter,
            NewReport {
                kind: ReportKind::Harassment,
                reason: "Abusive profile text".to_string(),
                details: None,
                thread_id: None,
                post_id: None,
                reported_user_id: Some(offender.id),
            },
        )
        .await
        .unwrap();
    let err = forum
        .reports
        .update_report_status(&moderator, user_report.id, ReportStatus::Resolved, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}
