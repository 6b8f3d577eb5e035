//! User domain - DB queries for accounts

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, Postgres};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: Option<String>,
    pub username: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

pub async fn create_user<'e, E>(
    executor: E,
    email: Option<&str>,
    username: Option<&str>,
) -> Result<User, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        INSERT INTO users (email, username)
        VALUES ($1, $2)
        RETURNING id, email, username, created_at
        "#,
    )
    .bind(email)
    .bind(username)
    .fetch_one(executor)
    .await
}

/// Look a user up by email when given, otherwise by username.
pub async fn find_by_email_or_username<'e, E>(
    executor: E,
    email: Option<&str>,
    username: Option<&str>,
) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, email, username, created_at
        FROM users
        WHERE ($1::text IS NOT NULL AND email = $1)
           OR ($1::text IS NULL AND username = $2)
        "#,
    )
    .bind(email)
    .bind(username)
    .fetch_optional(executor)
    .await
}

/// Update email/username, keeping the current value where None is given.
pub async fn update_user<'e, E>(
    executor: E,
    id: i64,
    email: Option<&str>,
    username: Option<&str>,
) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        UPDATE users
        SET email = COALESCE($2, email),
            username = COALESCE($3, username)
        WHERE id = $1
        RETURNING id, email, username, created_at
        "#,
    )
    .bind(id)
    .bind(email)
    .bind(username)
    .fetch_optional(executor)
    .await
}

/// True when another user already holds the given email or username.
pub async fn identity_taken<'e, E>(
    executor: E,
    id: i64,
    email: Option<&str>,
    username: Option<&str>,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT id FROM users
        WHERE id <> $1
          AND (($2::text IS NOT NULL AND email = $2)
            OR ($3::text IS NOT NULL AND username = $3))
        LIMIT 1
        "#,
    )
    .bind(id)
    .bind(email)
    .bind(username)
    .fetch_optional(executor)
    .await?;

    Ok(row.is_some())
}
