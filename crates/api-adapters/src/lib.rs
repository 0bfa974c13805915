//! # api-adapters
//!
//! The JSON action surface over the forum services. Enabled by the
//! `web-axum` feature; the metrics registry is available either way.

pub mod metrics;

#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod response;

#[cfg(feature = "web-axum")]
pub use router::{router, AppState};

#[cfg(feature = "web-axum")]
mod router {
    use std::sync::Arc;

    use axum::routing::{get, patch, post};
    use axum::Router;
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    use domains::SessionProvider;
    use services::{
        NotificationService, PostService, ReactionService, ReportService, SecurityService,
        ThreadService,
    };

    use crate::handlers;
    use crate::metrics::ActionMetrics;

    /// Everything a handler needs, shared across workers.
    #[derive(Clone)]
    pub struct AppState {
        pub sessions: Arc<dyn SessionProvider>,
        pub security: Arc<SecurityService>,
        pub notifications: Arc<NotificationService>,
        pub threads: Arc<ThreadService>,
        pub posts: Arc<PostService>,
        pub reactions: Arc<ReactionService>,
        pub reports: Arc<ReportService>,
        pub metrics: Arc<ActionMetrics>,
    }

    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/threads", post(handlers::create_thread))
            .route("/threads/{id}/lock", post(handlers::lock_thread))
            .route("/threads/{id}/pin", post(handlers::pin_thread))
            .route("/threads/{id}/solve", post(handlers::solve_thread))
            .route("/posts", post(handlers::create_post))
            .route("/posts/{id}", patch(handlers::edit_post).delete(handlers::delete_post))
            .route("/reactions/toggle", post(handlers::toggle_reaction))
            .route("/reports", post(handlers::create_report).get(handlers::list_reports))
            .route("/reports/{id}", patch(handlers::update_report))
            .route("/notifications", get(handlers::list_notifications))
            .route("/notifications/unread-count", get(handlers::unread_count))
            .route("/notifications/{id}/read", post(handlers::mark_notification_read))
            .route("/notifications/read-all", post(handlers::mark_all_notifications_read))
            .route("/admin/users/{id}/ban", post(handlers::ban_user))
            .route("/admin/users/{id}/unban", post(handlers::unban_user))
            .route("/metrics", get(handlers::metrics))
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(state)
    }
}
