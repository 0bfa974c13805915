//! Envelope and status-code contract of the JSON surface, driven through
//! the router with in-memory adapters.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use api_adapters::{metrics::ActionMetrics, router, AppState};
use domains::{
    Category, CategoryRepo, Clock, CurrentUser, NotificationRepo, PostRepo, RateLimitStore,
    ReactionRepo, ReportRepo, Role, SystemClock, ThreadRepo, User, UserRepo,
};
use services::{
    ModerationService, NotificationService, PostService, RateQuotas, ReactionService,
    ReportService, ReputationLedger, SecurityService, ThreadService,
};
use storage_adapters::{MemoryRateLimitStore, MemorySessions, MemoryStore};

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    sessions: Arc<MemorySessions>,
}

fn test_app() -> TestApp {
    let store = MemoryStore::new();
    let sessions = MemorySessions::new();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ratelimit: Arc<dyn RateLimitStore> = MemoryRateLimitStore::new();
    let quotas = RateQuotas::default();

    let users: Arc<dyn UserRepo> = store.clone();
    let categories: Arc<dyn CategoryRepo> = store.clone();
    let thread_repo: Arc<dyn ThreadRepo> = store.clone();
    let post_repo: Arc<dyn PostRepo> = store.clone();
    let reaction_repo: Arc<dyn ReactionRepo> = store.clone();
    let report_repo: Arc<dyn ReportRepo> = store.clone();
    let notification_repo: Arc<dyn NotificationRepo> = store.clone();

    let security = Arc::new(SecurityService::new(users.clone(), ratelimit, clock.clone()));
    let notifications = Arc::new(NotificationService::new(
        notification_repo,
        categories.clone(),
        users.clone(),
        clock.clone(),
    ));
    let moderation = Arc::new(ModerationService::new(
        categories.clone(),
        thread_repo.clone(),
        post_repo.clone(),
    ));
    let reputation = Arc::new(ReputationLedger::new(users.clone()));

    let state = AppState {
        sessions: sessions.clone(),
        security: security.clone(),
        notifications: notifications.clone(),
        threads: Arc::new(ThreadService::new(
            thread_repo.clone(),
            categories.clone(),
            post_repo.clone(),
            security.clone(),
            moderation.clone(),
            notifications.clone(),
            quotas,
            clock.clone(),
        )),
        posts: Arc::new(PostService::new(
            post_repo.clone(),
            thread_repo.clone(),
            security.clone(),
            moderation.clone(),
            reputation.clone(),
            notifications.clone(),
            quotas,
            clock.clone(),
        )),
        reactions: Arc::new(ReactionService::new(
            reaction_repo,
            security.clone(),
            moderation.clone(),
            reputation,
            notifications.clone(),
            quotas,
            clock.clone(),
        )),
        reports: Arc::new(ReportService::new(
            report_repo,
            users,
            categories,
            post_repo,
            security,
            moderation,
            notifications,
            quotas,
            clock,
        )),
        metrics: Arc::new(ActionMetrics::new()),
    };

    TestApp { router: router(state), store, sessions }
}

fn seed_session(app: &TestApp, username: &str, role: Role) -> (CurrentUser, String) {
    let id = Uuid::new_v4();
    app.store.seed_user(User {
        id,
        username: username.to_string(),
        role,
        banned: false,
        ban_reason: None,
        ban_expires: None,
        reputation: 0,
        created_at: chrono::Utc::now(),
    });
    let user = CurrentUser { id, username: username.to_string(), role };
    let token = format!("tok-{username}");
    app.sessions.issue(token.clone(), user.clone());
    (user, token)
}

fn seed_category(app: &TestApp) -> Uuid {
    let id = Uuid::new_v4();
    app.store.seed_category(Category {
        id,
        slug: "general".to_string(),
        name: "General".to_string(),
        description: None,
        created_at: chrono::Utc::now(),
    });
    id
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn missing_session_is_401_with_the_envelope() {
    let app = test_app();
    let category = seed_category(&app);

    let response = app
        .router
        .oneshot(post_json(
            "/threads",
            None,
            json!({ "categoryId": category, "title": "No session here" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("you must be logged in"));
}

#[tokio::test]
async fn thread_creation_round_trips_through_the_envelope() {
    let app = test_app();
    let category = seed_category(&app);
    let (_, token) = seed_session(&app, "ada", Role::User);

    let response = app
        .router
        .oneshot(post_json(
            "/threads",
            Some(&token),
            json!({ "categoryId": category, "title": "Hello from the API" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["slug"], json!("hello-from-the-api"));
    assert_eq!(body["data"]["isLocked"], json!(false));
}

#[tokio::test]
async fn validation_failures_are_422_with_the_first_violation() {
    let app = test_app();
    let category = seed_category(&app);
    let (_, token) = seed_session(&app, "ada", Role::User);

    let response = app
        .router
        .oneshot(post_json(
            "/threads",
            Some(&token),
            json!({ "categoryId": category, "title": "Hi" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("Title must be between 5 and 150 characters"));
}

#[tokio::test]
async fn reaction_target_must_be_exactly_one_of_thread_or_post() {
    let app = test_app();
    let (_, token) = seed_session(&app, "ada", Role::User);

    let response = app
        .router
        .oneshot(post_json("/reactions/toggle", Some(&token), json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["error"], json!("You must specify exactly one of threadId or postId"));
}

#[tokio::test]
async fn metrics_expose_action_counters() {
    let app = test_app();
    let category = seed_category(&app);
    let (_, token) = seed_session(&app, "ada", Role::User);

    let router = app.router.clone();
    router
        .oneshot(post_json(
            "/threads",
            Some(&token),
            json!({ "categoryId": category, "title": "Counted thread" }),
        ))
        .await
        .unwrap();

    let response = app
        .router
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("forum_actions"));
    assert!(text.contains("thread:create"));
}
