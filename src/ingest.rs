//! Reel ingestion pipeline: scheduled fetch cycle and expiration sweep.
//!
//! Two independent cron-driven apalis workers share one monitor: the daily
//! fetch cycle walks the configured accounts in order, one upstream page
//! per account, resuming each account from its stored cursor; the hourly
//! sweep deletes reels past the retention window. A failed account never
//! aborts the cycle and never moves its cursor.

use apalis::prelude::*;
use apalis_cron::{CronStream, Schedule};
use apalis_sql::postgres::PostgresStorage;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::constants::{DEFAULT_EXPIRE_CRON, DEFAULT_FETCH_CRON, REEL_ACCOUNTS, REEL_RETENTION_HOURS};
use crate::domain::reels::{self, NewReel};
use crate::services::scraper::{RawReelItem, ReelPage, ScrapeError, ScraperClient};

/// Upstream page source for one account at a time
#[allow(async_fn_in_trait)]
pub trait ReelSource {
    async fn fetch_page(&self, account: &str, cursor: Option<&str>)
    -> Result<ReelPage, ScrapeError>;
}

impl ReelSource for ScraperClient {
    async fn fetch_page(
        &self,
        account: &str,
        cursor: Option<&str>,
    ) -> Result<ReelPage, ScrapeError> {
        ScraperClient::fetch_page(self, account, cursor).await
    }
}

/// Durable reel and cursor storage used by both cycles
#[allow(async_fn_in_trait)]
pub trait ReelRepo {
    async fn cursor(&self, account: &str) -> Result<Option<String>, sqlx::Error>;
    async fn set_cursor(&self, account: &str, cursor: Option<&str>) -> Result<(), sqlx::Error>;
    async fn save_reels(&self, reels: &[NewReel]) -> Result<u64, sqlx::Error>;
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error>;
}

/// Postgres-backed repo delegating to the domain queries
#[derive(Clone)]
pub struct PgReelRepo {
    pool: PgPool,
}

impl PgReelRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ReelRepo for PgReelRepo {
    async fn cursor(&self, account: &str) -> Result<Option<String>, sqlx::Error> {
        reels::get_cursor(&self.pool, account).await
    }

    async fn set_cursor(&self, account: &str, cursor: Option<&str>) -> Result<(), sqlx::Error> {
        reels::upsert_cursor(&self.pool, account, cursor).await
    }

    async fn save_reels(&self, items: &[NewReel]) -> Result<u64, sqlx::Error> {
        reels::insert_reels(&self.pool, items).await
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        reels::delete_older_than(&self.pool, cutoff).await
    }
}

/// Map a raw upstream item to a persistable reel. Items without a usable
/// media URL are dropped; every stored reel has a non-empty media_url.
pub fn map_raw_item(item: &RawReelItem) -> Option<NewReel> {
    let media_url = item
        .video_url
        .clone()
        .or_else(|| item.display_url.clone())
        .filter(|url| !url.is_empty())?;

    let title = item
        .caption
        .as_ref()
        .and_then(|c| c.text.clone())
        .unwrap_or_default();

    Some(NewReel { title, media_url })
}

/// Outcome of one fetch cycle, for logging
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub accounts_ok: usize,
    pub accounts_failed: usize,
    pub reels_saved: u64,
}

/// One full sweep over the configured accounts, strictly sequential.
///
/// Per account: read cursor, fetch one page, persist mapped items, store
/// the returned cursor (None when upstream signalled the end, which makes
/// the account start from the top next cycle). Any failure skips to the
/// next account; the failed account's cursor is left untouched so the same
/// page is retried on the next cycle.
pub async fn run_fetch_cycle<S, R>(source: &S, repo: &R, accounts: &[&str]) -> CycleReport
where
    S: ReelSource,
    R: ReelRepo,
{
    let mut report = CycleReport::default();

    for account in accounts {
        let cursor = match repo.cursor(account).await {
            Ok(c) => c,
            Err(e) => {
                eprintln!("[reels] Cursor read failed for {}: {}", account, e);
                report.accounts_failed += 1;
                continue;
            }
        };

        let page = match source.fetch_page(account, cursor.as_deref()).await {
            Ok(p) => p,
            Err(e) => {
                eprintln!("[reels] Fetch failed for {}: {}", account, e);
                report.accounts_failed += 1;
                continue;
            }
        };

        let mapped: Vec<NewReel> = page.items.iter().filter_map(map_raw_item).collect();
        if !mapped.is_empty() {
            match repo.save_reels(&mapped).await {
                Ok(n) => {
                    println!("[reels] Saved {} reels for {}", n, account);
                    report.reels_saved += n;
                }
                Err(e) => {
                    eprintln!("[reels] Save failed for {}: {}", account, e);
                    report.accounts_failed += 1;
                    continue;
                }
            }
        }

        if let Err(e) = repo.set_cursor(account, page.next_cursor.as_deref()).await {
            eprintln!("[reels] Cursor write failed for {}: {}", account, e);
            report.accounts_failed += 1;
            continue;
        }

        report.accounts_ok += 1;
    }

    report
}

/// Delete reels older than the retention window; returns count removed.
pub async fn run_expiration_sweep<R: ReelRepo>(repo: &R) -> Result<u64, sqlx::Error> {
    let cutoff = Utc::now() - Duration::hours(REEL_RETENTION_HOURS);
    repo.delete_older_than(cutoff).await
}

// ---------------------------------------------------------------------------
// Scheduled workers
// ---------------------------------------------------------------------------

/// Cron tick marker for the fetch cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReelFetchJob {
    pub scheduled_at: DateTime<Utc>,
}

impl From<DateTime<Utc>> for ReelFetchJob {
    fn from(dt: DateTime<Utc>) -> Self {
        ReelFetchJob { scheduled_at: dt }
    }
}

/// Cron tick marker for the expiration sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReelExpireJob {
    pub scheduled_at: DateTime<Utc>,
}

impl From<DateTime<Utc>> for ReelExpireJob {
    fn from(dt: DateTime<Utc>) -> Self {
        ReelExpireJob { scheduled_at: dt }
    }
}

/// Shared context for the reel workers
#[derive(Clone)]
pub struct IngestContext {
    pub pool: PgPool,
    pub scraper: ScraperClient,
    /// Held for the duration of a fetch cycle; a tick (or manual trigger)
    /// that finds it taken skips instead of starting a second cycle.
    pub fetch_lock: Arc<Mutex<()>>,
}

/// Job handler - one fetch cycle per tick.
/// Always returns Ok: per-account failures are logged inside the cycle.
async fn process_fetch_job(_job: ReelFetchJob, ctx: Data<IngestContext>) -> Result<(), Error> {
    let Ok(_guard) = ctx.fetch_lock.try_lock() else {
        println!("[reels] Fetch cycle already running, skipping tick");
        return Ok(());
    };

    let repo = PgReelRepo::new(ctx.pool.clone());
    let report = run_fetch_cycle(&ctx.scraper, &repo, REEL_ACCOUNTS).await;
    println!(
        "[reels] Fetch cycle complete: {} accounts ok, {} failed, {} reels saved",
        report.accounts_ok, report.accounts_failed, report.reels_saved
    );
    Ok(())
}

/// Job handler - expiration sweep. Failures are logged, never retried
/// early; the next hourly tick catches up.
async fn process_expire_job(_job: ReelExpireJob, ctx: Data<IngestContext>) -> Result<(), Error> {
    let repo = PgReelRepo::new(ctx.pool.clone());
    match run_expiration_sweep(&repo).await {
        Ok(0) => {}
        Ok(n) => println!("[reels] Expired {} reels past retention", n),
        Err(e) => eprintln!("[reels] Expiration sweep failed: {}", e),
    }
    Ok(())
}

/// Start both recurring workers. Called once from main; runs forever.
pub async fn run_reel_workers(pool: PgPool, scraper: ScraperClient, fetch_lock: Arc<Mutex<()>>) {
    // Run apalis migrations
    PostgresStorage::setup(&pool)
        .await
        .expect("Failed to set up apalis storage");

    let fetch_storage: PostgresStorage<ReelFetchJob> = PostgresStorage::new(pool.clone());
    let expire_storage: PostgresStorage<ReelExpireJob> = PostgresStorage::new(pool.clone());

    let fetch_schedule = Schedule::from_str(&fetch_cron()).expect("Invalid reel fetch schedule");
    let expire_schedule =
        Schedule::from_str(&expire_cron()).expect("Invalid reel expiration schedule");

    let fetch_backend = CronStream::new(fetch_schedule).pipe_to_storage(fetch_storage);
    let expire_backend = CronStream::new(expire_schedule).pipe_to_storage(expire_storage);

    let ctx = IngestContext {
        pool,
        scraper,
        fetch_lock,
    };

    println!(
        "[reels] Workers starting (fetch '{}', expire '{}', {} accounts)",
        fetch_cron(),
        expire_cron(),
        REEL_ACCOUNTS.len()
    );

    let fetch_worker = WorkerBuilder::new("reel-fetch-worker")
        .data(ctx.clone())
        .backend(fetch_backend)
        .build_fn(process_fetch_job);

    let expire_worker = WorkerBuilder::new("reel-expire-worker")
        .data(ctx)
        .backend(expire_backend)
        .build_fn(process_expire_job);

    Monitor::new()
        .register(fetch_worker)
        .register(expire_worker)
        .run()
        .await
        .expect("Reel worker monitor failed");
}

fn fetch_cron() -> String {
    env::var("REEL_FETCH_CRON").unwrap_or_else(|_| DEFAULT_FETCH_CRON.to_string())
}

fn expire_cron() -> String {
    env::var("REEL_EXPIRE_CRON").unwrap_or_else(|_| DEFAULT_EXPIRE_CRON.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::scraper::RawCaption;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    fn raw(caption: Option<&str>, video: Option<&str>, display: Option<&str>) -> RawReelItem {
        RawReelItem {
            caption: caption.map(|t| RawCaption {
                text: Some(t.to_string()),
            }),
            video_url: video.map(String::from),
            display_url: display.map(String::from),
        }
    }

    /// Scripted upstream: per-account pages or failures, plus an event log
    /// shared with the fake repo for ordering assertions.
    struct FakeSource {
        pages: HashMap<String, Result<(Vec<RawReelItem>, Option<String>), String>>,
        events: Arc<StdMutex<Vec<String>>>,
    }

    impl ReelSource for FakeSource {
        async fn fetch_page(
            &self,
            account: &str,
            _cursor: Option<&str>,
        ) -> Result<ReelPage, ScrapeError> {
            self.events.lock().unwrap().push(format!("fetch:{}", account));
            match self.pages.get(account) {
                Some(Ok((items, next))) => Ok(ReelPage {
                    items: items.clone(),
                    next_cursor: next.clone(),
                }),
                Some(Err(msg)) => Err(ScrapeError::Api(msg.clone())),
                None => Ok(ReelPage {
                    items: Vec::new(),
                    next_cursor: None,
                }),
            }
        }
    }

    #[derive(Default)]
    struct FakeRepo {
        cursors: StdMutex<HashMap<String, Option<String>>>,
        saved: StdMutex<Vec<NewReel>>,
        events: Arc<StdMutex<Vec<String>>>,
        /// Saves whose first title contains this marker fail
        poison_title: Option<String>,
    }

    impl ReelRepo for FakeRepo {
        async fn cursor(&self, account: &str) -> Result<Option<String>, sqlx::Error> {
            self.events
                .lock()
                .unwrap()
                .push(format!("cursor_read:{}", account));
            Ok(self
                .cursors
                .lock()
                .unwrap()
                .get(account)
                .cloned()
                .flatten())
        }

        async fn set_cursor(&self, account: &str, cursor: Option<&str>) -> Result<(), sqlx::Error> {
            self.events
                .lock()
                .unwrap()
                .push(format!("cursor_write:{}", account));
            self.cursors
                .lock()
                .unwrap()
                .insert(account.to_string(), cursor.map(String::from));
            Ok(())
        }

        async fn save_reels(&self, items: &[NewReel]) -> Result<u64, sqlx::Error> {
            if let Some(poison) = &self.poison_title {
                if items.iter().any(|r| r.title.contains(poison.as_str())) {
                    return Err(sqlx::Error::Protocol("simulated insert failure".into()));
                }
            }
            self.saved.lock().unwrap().extend_from_slice(items);
            Ok(items.len() as u64)
        }

        async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
            // Fake items carry their timestamp in the title for this test
            let mut saved = self.saved.lock().unwrap();
            let before = saved.len();
            saved.retain(|r| {
                r.title
                    .parse::<DateTime<Utc>>()
                    .map(|created| created >= cutoff)
                    .unwrap_or(true)
            });
            Ok((before - saved.len()) as u64)
        }
    }

    fn page(items: Vec<RawReelItem>, next: Option<&str>) -> Result<(Vec<RawReelItem>, Option<String>), String> {
        Ok((items, next.map(String::from)))
    }

    #[test]
    fn test_map_raw_item_prefers_video_url() {
        let item = raw(Some("cat"), Some("https://cdn/v.mp4"), Some("https://cdn/d.jpg"));
        let reel = map_raw_item(&item).unwrap();
        assert_eq!(reel.media_url, "https://cdn/v.mp4");
        assert_eq!(reel.title, "cat");
    }

    #[test]
    fn test_map_raw_item_falls_back_to_display_url() {
        let reel = map_raw_item(&raw(None, None, Some("https://cdn/d.jpg"))).unwrap();
        assert_eq!(reel.media_url, "https://cdn/d.jpg");
        assert_eq!(reel.title, "");
    }

    #[test]
    fn test_map_raw_item_without_media_is_dropped() {
        assert!(map_raw_item(&raw(Some("no media"), None, None)).is_none());
        assert!(map_raw_item(&raw(None, Some(""), None)).is_none());
    }

    #[tokio::test]
    async fn test_cursor_round_trip_including_null() {
        let repo = FakeRepo::default();
        repo.set_cursor("pets", Some("tok-1")).await.unwrap();
        assert_eq!(repo.cursor("pets").await.unwrap().as_deref(), Some("tok-1"));

        repo.set_cursor("pets", None).await.unwrap();
        assert_eq!(repo.cursor("pets").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fetch_failure_isolated_per_account() {
        let events = Arc::new(StdMutex::new(Vec::new()));
        let source = FakeSource {
            pages: HashMap::from([
                ("bad_account".to_string(), Err("503 upstream down".to_string())),
                (
                    "good_account".to_string(),
                    page(vec![raw(Some("ok"), Some("https://cdn/1.mp4"), None)], Some("next-b")),
                ),
            ]),
            events: events.clone(),
        };
        let repo = FakeRepo {
            events: events.clone(),
            ..Default::default()
        };
        repo.set_cursor("bad_account", Some("stale")).await.unwrap();

        let report = run_fetch_cycle(&source, &repo, &["bad_account", "good_account"]).await;

        assert_eq!(report.accounts_ok, 1);
        assert_eq!(report.accounts_failed, 1);
        assert_eq!(report.reels_saved, 1);
        // B persisted and advanced despite A's failure
        assert_eq!(repo.saved.lock().unwrap().len(), 1);
        assert_eq!(
            repo.cursor("good_account").await.unwrap().as_deref(),
            Some("next-b")
        );
        // A's cursor untouched, retained for retry next cycle
        assert_eq!(repo.cursor("bad_account").await.unwrap().as_deref(), Some("stale"));
    }

    #[tokio::test]
    async fn test_save_failure_skips_account_without_advancing_cursor() {
        let events = Arc::new(StdMutex::new(Vec::new()));
        let source = FakeSource {
            pages: HashMap::from([
                (
                    "acct_a".to_string(),
                    page(vec![raw(Some("poison"), Some("https://cdn/a.mp4"), None)], Some("a-next")),
                ),
                (
                    "acct_b".to_string(),
                    page(vec![raw(Some("fine"), Some("https://cdn/b.mp4"), None)], None),
                ),
            ]),
            events: events.clone(),
        };
        let repo = FakeRepo {
            events,
            poison_title: Some("poison".to_string()),
            ..Default::default()
        };

        let report = run_fetch_cycle(&source, &repo, &["acct_a", "acct_b"]).await;

        assert_eq!(report.accounts_failed, 1);
        assert_eq!(report.accounts_ok, 1);
        // A's cursor never written; B was still attempted and saved
        assert_eq!(repo.cursor("acct_a").await.unwrap(), None);
        assert_eq!(repo.saved.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_accounts_visited_in_configured_order() {
        let events = Arc::new(StdMutex::new(Vec::new()));
        let source = FakeSource {
            pages: HashMap::from([
                ("x".to_string(), page(vec![raw(None, Some("https://cdn/x.mp4"), None)], Some("tx"))),
                ("y".to_string(), page(vec![], None)),
            ]),
            events: events.clone(),
        };
        let repo = FakeRepo {
            events: events.clone(),
            ..Default::default()
        };

        run_fetch_cycle(&source, &repo, &["x", "y"]).await;

        let log = events.lock().unwrap().clone();
        assert_eq!(
            log,
            vec![
                "cursor_read:x",
                "fetch:x",
                "cursor_write:x",
                "cursor_read:y",
                "fetch:y",
                "cursor_write:y",
            ]
        );
    }

    #[tokio::test]
    async fn test_wraparound_clears_cursor_when_no_continuation() {
        let source = FakeSource {
            pages: HashMap::from([(
                "pets".to_string(),
                page(vec![raw(None, Some("https://cdn/p.mp4"), None)], None),
            )]),
            events: Arc::new(StdMutex::new(Vec::new())),
        };
        let repo = FakeRepo::default();
        repo.set_cursor("pets", Some("deep-in-history")).await.unwrap();

        run_fetch_cycle(&source, &repo, &["pets"]).await;

        // Equivalent to a fresh account next cycle
        assert_eq!(repo.cursor("pets").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expiration_boundary_is_strictly_older() {
        let repo = FakeRepo::default();
        let now = Utc::now();
        let stamp = |delta: Duration| NewReel {
            title: (now - delta).to_rfc3339(),
            media_url: "https://cdn/r.mp4".to_string(),
        };
        repo.save_reels(&[
            stamp(Duration::hours(25)),
            stamp(Duration::hours(24) + Duration::seconds(1)),
            stamp(Duration::hours(23)),
        ])
        .await
        .unwrap();

        let removed = repo.delete_older_than(now - Duration::hours(24)).await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(repo.saved.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_page_still_updates_cursor() {
        let source = FakeSource {
            pages: HashMap::from([("quiet".to_string(), page(vec![], Some("still-going")))]),
            events: Arc::new(StdMutex::new(Vec::new())),
        };
        let repo = FakeRepo::default();

        let report = run_fetch_cycle(&source, &repo, &["quiet"]).await;

        assert_eq!(report.accounts_ok, 1);
        assert_eq!(report.reels_saved, 0);
        assert_eq!(repo.cursor("quiet").await.unwrap().as_deref(), Some("still-going"));
    }
}
