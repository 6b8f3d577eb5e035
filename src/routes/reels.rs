//! Reel retrieval and the manual fetch trigger (/reels/*)

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;
use crate::constants::REEL_ACCOUNTS;
use crate::domain::reels::{self, Reel};
use crate::ingest::{PgReelRepo, run_fetch_cycle};
use crate::services::error::LogErr;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reels", get(get_reels))
        .route("/reels/fetch", post(trigger_fetch))
}

#[derive(Deserialize)]
struct SampleParams {
    take: Option<usize>,
    skip: Option<usize>,
}

/// GET /reels?take=&skip= - random sample of stored reels
async fn get_reels(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SampleParams>,
) -> Result<Json<Vec<Reel>>, StatusCode> {
    let all = reels::list_reels(&state.db)
        .await
        .log_500("List reels error")?;

    Ok(Json(reels::sample_reels(
        all,
        params.take,
        params.skip.unwrap_or(0),
    )))
}

#[derive(Serialize)]
struct TriggerResponse {
    success: String,
}

/// POST /reels/fetch - run one fetch cycle immediately.
///
/// The recurring workers are registered once at startup; this endpoint
/// only kicks off an out-of-band cycle. The cycle lock makes repeated
/// calls a no-op while a cycle is in flight, so the trigger cannot stack
/// duplicate work.
async fn trigger_fetch(State(state): State<Arc<AppState>>) -> Json<TriggerResponse> {
    let Ok(guard) = state.fetch_lock.clone().try_lock_owned() else {
        return Json(TriggerResponse {
            success: "Fetch cycle already in progress".to_string(),
        });
    };

    let db = state.db.clone();
    let scraper = state.scraper.clone();
    tokio::spawn(async move {
        let _guard = guard;
        let repo = PgReelRepo::new(db);
        let report = run_fetch_cycle(&scraper, &repo, REEL_ACCOUNTS).await;
        println!(
            "[reels] Manual fetch cycle complete: {} accounts ok, {} failed, {} reels saved",
            report.accounts_ok, report.accounts_failed, report.reels_saved
        );
    });

    Json(TriggerResponse {
        success: "Fetch cycle started".to_string(),
    })
}
