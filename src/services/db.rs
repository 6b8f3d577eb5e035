//! Schema bootstrap
//!
//! The original deployment relied on the ORM synchronizing the schema at
//! startup, so there is no migration tooling here: every table is created
//! idempotently when the process boots. Domain query functions stay
//! generic over `sqlx::Executor` so they accept both `&PgPool` and open
//! transactions.

use sqlx::PgPool;

/// Create all application tables if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            email TEXT UNIQUE,
            username TEXT UNIQUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pets (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            pet_type TEXT NOT NULL,
            gender TEXT,
            profile_image TEXT,
            voice_url TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS translations (
            id BIGSERIAL PRIMARY KEY,
            pet_id BIGINT NOT NULL REFERENCES pets(id) ON DELETE CASCADE,
            text TEXT NOT NULL,
            label TEXT,
            language_code TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reels (
            id BIGSERIAL PRIMARY KEY,
            title TEXT NOT NULL DEFAULT '',
            media_url TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One row per upstream account; cursor_token NULL means "start over"
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reel_cursors (
            account TEXT PRIMARY KEY,
            cursor_token TEXT,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
