//! Serve locally stored attachments (/media/*), local backend only

use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use std::sync::Arc;

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/media/{*path}", get(serve_media))
}

/// GET /media/*path - stream a file from the local storage directory
async fn serve_media(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    if state.storage.local_path().is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    // Keys never contain separators, so nested paths are rejected outright
    if path.contains("..") || path.contains('/') {
        return Err(StatusCode::BAD_REQUEST);
    }

    let data = state
        .storage
        .read_local(&path)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)?;

    let content_type = guess_content_type(&path);
    Ok(([(header::CONTENT_TYPE, content_type)], data))
}

fn guess_content_type(path: &str) -> &'static str {
    match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("wav") => "audio/wav",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("lingopet-aa-x.mp3"), "audio/mpeg");
        assert_eq!(guess_content_type("a.PNG"), "application/octet-stream");
        assert_eq!(guess_content_type("noext"), "application/octet-stream");
    }
}
