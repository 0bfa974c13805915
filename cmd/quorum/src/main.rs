//! # Quorum Binary
//!
//! The entry point that assembles the forum: configuration, Postgres
//! adapters, the rate-limit store (in-memory, or Redis with the `redis`
//! feature), the service graph, and the axum router.

use std::sync::Arc;

use anyhow::Context;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use api_adapters::{metrics::ActionMetrics, router, AppState};
use configs::AppConfig;
use domains::{
    CategoryRepo, Clock, NotificationRepo, PostRepo, RateLimitStore, ReactionRepo, ReportRepo,
    SessionProvider, SystemClock, ThreadRepo, UserRepo,
};
use services::{
    ModerationService, NotificationService, PostService, RateQuota, RateQuotas, ReactionService,
    ReportService, ReputationLedger, SecurityService, ThreadService,
};
use storage_adapters::{MemoryRateLimitStore, PgStore};

fn quotas_from(config: &configs::RateLimitConfig) -> RateQuotas {
    RateQuotas {
        create_thread: RateQuota::new(
            config.create_thread.window_ms,
            config.create_thread.max_requests,
        ),
        create_post: RateQuota::new(
            config.create_post.window_ms,
            config.create_post.max_requests,
        ),
        toggle_reaction: RateQuota::new(
            config.toggle_reaction.window_ms,
            config.toggle_reaction.max_requests,
        ),
        file_report: RateQuota::new(
            config.file_report.window_ms,
            config.file_report.max_requests,
        ),
    }
}

fn rate_limit_store(config: &AppConfig) -> anyhow::Result<Arc<dyn RateLimitStore>> {
    #[cfg(feature = "redis")]
    if let Some(redis) = &config.redis {
        let pool = deadpool_redis::Config::from_url(&redis.url)
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))
            .context("failed to create redis pool")?;
        tracing::info!("rate limiting backed by redis");
        return Ok(Arc::new(storage_adapters::RedisRateLimitStore::new(pool)));
    }

    if config.redis.is_some() {
        tracing::warn!("redis configured but the binary was built without the redis feature");
    }
    tracing::info!("rate limiting backed by the in-process store");
    Ok(MemoryRateLimitStore::new())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(config.database.url.expose_secret())
        .await
        .context("failed to connect to postgres")?;

    let store = Arc::new(PgStore::new(pool));
    store.run_migrations().await.context("failed to run migrations")?;

    let users: Arc<dyn UserRepo> = store.clone();
    let categories: Arc<dyn CategoryRepo> = store.clone();
    let threads: Arc<dyn ThreadRepo> = store.clone();
    let posts: Arc<dyn PostRepo> = store.clone();
    let reactions: Arc<dyn ReactionRepo> = store.clone();
    let reports: Arc<dyn ReportRepo> = store.clone();
    let notifications_repo: Arc<dyn NotificationRepo> = store.clone();
    let sessions: Arc<dyn SessionProvider> = store.clone();

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let quotas = quotas_from(&config.rate_limit);

    let security = Arc::new(SecurityService::new(
        users.clone(),
        rate_limit_store(&config)?,
        clock.clone(),
    ));
    let notifications = Arc::new(NotificationService::new(
        notifications_repo,
        categories.clone(),
        users.clone(),
        clock.clone(),
    ));
    let moderation = Arc::new(ModerationService::new(
        categories.clone(),
        threads.clone(),
        posts.clone(),
    ));
    let reputation = Arc::new(ReputationLedger::new(users.clone()));

    let state = AppState {
        sessions,
        security: security.clone(),
        notifications: notifications.clone(),
        threads: Arc::new(ThreadService::new(
            threads.clone(),
            categories.clone(),
            posts.clone(),
            security.clone(),
            moderation.clone(),
            notifications.clone(),
            quotas,
            clock.clone(),
        )),
        posts: Arc::new(PostService::new(
            posts.clone(),
            threads.clone(),
            security.clone(),
            moderation.clone(),
            reputation.clone(),
            notifications.clone(),
            quotas,
            clock.clone(),
        )),
        reactions: Arc::new(ReactionService::new(
            reactions,
            security.clone(),
            moderation.clone(),
            reputation,
            notifications.clone(),
            quotas,
            clock.clone(),
        )),
        reports: Arc::new(ReportService::new(
            reports,
            users,
            categories,
            posts,
            security,
            moderation,
            notifications,
            quotas,
            clock,
        )),
        metrics: Arc::new(ActionMetrics::new()),
    };

    let app = router(state);
    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
            .await
            .context("failed to bind listener")?;
    tracing::info!(addr = %listener.local_addr()?, "quorum listening");
    axum::serve(listener, app).await.context("server error")
}
