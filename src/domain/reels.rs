//! Reel domain - ingested reels and per-account pagination cursors

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::Serialize;
use sqlx::{Executor, PgPool, Postgres};

/// One ingested reel as stored and served
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Reel {
    pub id: i64,
    pub title: String,
    #[serde(rename = "reelUrl")]
    pub media_url: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// A reel mapped from an upstream item, not yet persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReel {
    pub title: String,
    pub media_url: String,
}

/// Stored continuation cursor for one upstream account.
/// `cursor_token` NULL means the next fetch starts from the beginning.
pub async fn get_cursor<'e, E>(executor: E, account: &str) -> Result<Option<String>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT cursor_token FROM reel_cursors WHERE account = $1")
            .bind(account)
            .fetch_optional(executor)
            .await?;

    Ok(row.and_then(|(token,)| token))
}

/// Upsert the cursor for an account, bumping `updated_at`.
pub async fn upsert_cursor<'e, E>(
    executor: E,
    account: &str,
    cursor: Option<&str>,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO reel_cursors (account, cursor_token, updated_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (account)
        DO UPDATE SET cursor_token = EXCLUDED.cursor_token, updated_at = NOW()
        "#,
    )
    .bind(account)
    .bind(cursor)
    .execute(executor)
    .await?;

    Ok(())
}

/// Append a batch of reels in one transaction. Ids and timestamps are
/// assigned by the store. Returns the number inserted.
pub async fn insert_reels(pool: &PgPool, reels: &[NewReel]) -> Result<u64, sqlx::Error> {
    if reels.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    for reel in reels {
        sqlx::query("INSERT INTO reels (title, media_url) VALUES ($1, $2)")
            .bind(&reel.title)
            .bind(&reel.media_url)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    Ok(reels.len() as u64)
}

/// Delete every reel created strictly before `cutoff`; returns count removed.
pub async fn delete_older_than<'e, E>(
    executor: E,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM reels WHERE created_at < $1")
        .bind(cutoff)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Fetch the full reel collection (the retrieval path samples in-process).
pub async fn list_reels<'e, E>(executor: E) -> Result<Vec<Reel>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as("SELECT id, title, media_url, created_at FROM reels")
        .fetch_all(executor)
        .await
}

/// Uniform random sample: shuffle then slice. Randomized order means
/// take/skip across calls is not a stable paging sequence; retrieval is
/// "show me some reels", not pagination.
pub fn sample_reels(mut reels: Vec<Reel>, take: Option<usize>, skip: usize) -> Vec<Reel> {
    reels.shuffle(&mut rand::rng());
    let take = take.unwrap_or(reels.len());
    reels.into_iter().skip(skip).take(take).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn reel(id: i64) -> Reel {
        Reel {
            id,
            title: format!("reel {}", id),
            media_url: format!("https://cdn/{}.mp4", id),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_sample_returns_exactly_take_distinct_members() {
        let stored: Vec<Reel> = (0..20).map(reel).collect();
        let sample = sample_reels(stored.clone(), Some(5), 0);

        assert_eq!(sample.len(), 5);
        let ids: HashSet<i64> = sample.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), 5, "sample contains duplicates");
        let stored_ids: HashSet<i64> = stored.iter().map(|r| r.id).collect();
        assert!(ids.is_subset(&stored_ids));
    }

    #[test]
    fn test_sample_without_limit_returns_all() {
        let sample = sample_reels((0..7).map(reel).collect(), None, 0);
        assert_eq!(sample.len(), 7);
    }

    #[test]
    fn test_sample_skip_reduces_result() {
        let sample = sample_reels((0..10).map(reel).collect(), Some(8), 6);
        assert_eq!(sample.len(), 4);
    }

    #[test]
    fn test_sample_take_beyond_set_is_clamped() {
        let sample = sample_reels((0..3).map(reel).collect(), Some(50), 0);
        assert_eq!(sample.len(), 3);
    }
}
