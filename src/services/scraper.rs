//! Upstream reel listing client (RapidAPI scraper)
//!
//! One GET per call, one page per account at a time. The shared API key is
//! rate limited upstream, so callers are expected to fetch sequentially.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::constants::{REELS_API_HOST, REELS_API_URL, REELS_FETCH_TIMEOUT_SECS};

#[derive(Debug)]
pub enum ScrapeError {
    Http(reqwest::Error),
    Api(String),
}

impl From<reqwest::Error> for ScrapeError {
    fn from(e: reqwest::Error) -> Self {
        ScrapeError::Http(e)
    }
}

impl std::fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScrapeError::Http(e) => write!(f, "HTTP error: {}", e),
            ScrapeError::Api(s) => write!(f, "Listing API error: {}", s),
        }
    }
}

impl std::error::Error for ScrapeError {}

/// One raw item as returned by the listing API
#[derive(Debug, Clone, Deserialize)]
pub struct RawReelItem {
    pub caption: Option<RawCaption>,
    pub video_url: Option<String>,
    pub display_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCaption {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    items: Vec<RawReelItem>,
}

#[derive(Debug, Deserialize)]
struct ListingResponse {
    data: Option<ListingData>,
    pagination_token: Option<String>,
}

/// One page of upstream results plus the continuation cursor
#[derive(Debug)]
pub struct ReelPage {
    pub items: Vec<RawReelItem>,
    pub next_cursor: Option<String>,
}

#[derive(Clone)]
pub struct ScraperClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl ScraperClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, REELS_API_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
            http: Client::builder()
                .timeout(Duration::from_secs(REELS_FETCH_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Fetch one page of reels for an account, resuming from `cursor` if present.
    pub async fn fetch_page(
        &self,
        account: &str,
        cursor: Option<&str>,
    ) -> Result<ReelPage, ScrapeError> {
        let mut params = vec![
            ("username_or_id_or_url", account),
            ("url_embed_safe", "true"),
        ];
        if let Some(token) = cursor {
            params.push(("pagination_token", token));
        }

        let resp = self
            .http
            .get(&self.base_url)
            .query(&params)
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", REELS_API_HOST)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(ScrapeError::Api(format!("{}: {}", status, text)));
        }

        let body: ListingResponse = resp.json().await?;
        Ok(ReelPage {
            items: body.data.map(|d| d.items).unwrap_or_default(),
            next_cursor: body.pagination_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listing_response() {
        let json = r#"{
            "data": {
                "items": [
                    {"caption": {"text": "good dog"}, "video_url": "https://cdn/v1.mp4"},
                    {"caption": null, "video_url": null, "display_url": "https://cdn/d1.jpg"}
                ]
            },
            "pagination_token": "abc123"
        }"#;
        let parsed: ListingResponse = serde_json::from_str(json).unwrap();
        let items = parsed.data.unwrap().items;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].caption.as_ref().unwrap().text.as_deref(), Some("good dog"));
        assert_eq!(items[1].display_url.as_deref(), Some("https://cdn/d1.jpg"));
        assert_eq!(parsed.pagination_token.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_parse_last_page_without_token() {
        let json = r#"{"data": {"items": []}, "pagination_token": null}"#;
        let parsed: ListingResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.data.unwrap().items.is_empty());
        assert!(parsed.pagination_token.is_none());
    }

    #[test]
    fn test_parse_malformed_data_section() {
        // Upstream occasionally omits the data envelope entirely
        let json = r#"{"pagination_token": "t"}"#;
        let parsed: ListingResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.data.is_none());
    }
}
