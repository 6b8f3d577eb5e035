pub mod media;
pub mod pets;
pub mod reels;
pub mod users;

use axum::Router;
use std::sync::Arc;

use crate::AppState;

/// Build all routes for the API
pub fn build_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(media::routes())
        .merge(pets::routes())
        .merge(reels::routes())
        .merge(users::routes())
}
