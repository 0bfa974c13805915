//! Dev/demo seeding: an admin, a moderator, a regular user, two categories,
//! and ready-to-use session tokens printed to stdout.
//!
//! Usage: DATABASE_URL=postgres://... cargo run -p seed

use anyhow::Context;
use chrono::{Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

async fn seed_user(
    pool: &sqlx::PgPool,
    username: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO users (id, username, role, banned, reputation, created_at) \
         VALUES ($1, $2, $3, FALSE, 0, now()) \
         ON CONFLICT (username) DO NOTHING",
    )
    .bind(id)
    .bind(username)
    .bind(role)
    .execute(pool)
    .await?;

    let row: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE username = $1")
        .bind(username)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

async fn seed_session(pool: &sqlx::PgPool, user_id: Uuid, token: &str) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3) \
         ON CONFLICT (token) DO UPDATE SET expires_at = EXCLUDED.expires_at",
    )
    .bind(token)
    .bind(user_id)
    .bind(Utc::now() + Duration::days(30))
    .execute(pool)
    .await?;
    Ok(())
}

async fn seed_category(pool: &sqlx::PgPool, slug: &str, name: &str) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO categories (id, slug, name, created_at) VALUES ($1, $2, $3, now()) \
         ON CONFLICT (slug) DO NOTHING",
    )
    .bind(id)
    .bind(slug)
    .bind(name)
    .execute(pool)
    .await?;

    let row: (Uuid,) = sqlx::query_as("SELECT id FROM categories WHERE slug = $1")
        .bind(slug)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = PgPoolOptions::new().max_connections(2).connect(&url).await?;

    let admin = seed_user(&pool, "admin", "ADMIN").await?;
    let moderator = seed_user(&pool, "mira", "MODERATOR").await?;
    let user = seed_user(&pool, "uli", "USER").await?;

    let general = seed_category(&pool, "general", "General").await?;
    let support = seed_category(&pool, "support", "Support").await?;

    sqlx::query(
        "INSERT INTO category_moderators (category_id, user_id) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
    )
    .bind(general)
    .bind(moderator)
    .execute(&pool)
    .await?;
    sqlx::query(
        "INSERT INTO category_moderators (category_id, user_id) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
    )
    .bind(support)
    .bind(moderator)
    .execute(&pool)
    .await?;

    seed_session(&pool, admin, "token-admin").await?;
    seed_session(&pool, moderator, "token-mira").await?;
    seed_session(&pool, user, "token-uli").await?;

    println!("seeded users: admin={admin} mira={moderator} uli={user}");
    println!("session tokens: token-admin / token-mira / token-uli");
    Ok(())
}
