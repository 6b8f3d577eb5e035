//! Text-to-speech via the translate TTS endpoint
//!
//! The endpoint caps the query text per request, so longer inputs are
//! split on word boundaries and the MP3 segments concatenated. MPEG
//! frames are self-delimiting, so plain concatenation plays back fine.

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Client;

use crate::constants::{TTS_CHUNK_CHARS, TTS_URL};

#[derive(Debug)]
pub enum TtsError {
    Http(reqwest::Error),
    Api(String),
}

impl From<reqwest::Error> for TtsError {
    fn from(e: reqwest::Error) -> Self {
        TtsError::Http(e)
    }
}

impl std::fmt::Display for TtsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TtsError::Http(e) => write!(f, "HTTP error: {}", e),
            TtsError::Api(s) => write!(f, "TTS error: {}", s),
        }
    }
}

impl std::error::Error for TtsError {}

/// Synthesize `text` in `language_code`, returning raw MP3 bytes.
pub async fn synthesize(
    http: &Client,
    text: &str,
    language_code: &str,
) -> Result<Vec<u8>, TtsError> {
    let mut audio = Vec::new();
    for chunk in chunk_text(text, TTS_CHUNK_CHARS) {
        let url = segment_url(&chunk, language_code);
        let resp = http.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(TtsError::Api(format!("{} for segment", resp.status())));
        }
        audio.extend_from_slice(&resp.bytes().await?);
    }
    Ok(audio)
}

fn segment_url(chunk: &str, language_code: &str) -> String {
    format!(
        "{}?ie=UTF-8&client=tw-ob&tl={}&q={}",
        TTS_URL,
        language_code,
        utf8_percent_encode(chunk, NON_ALPHANUMERIC)
    )
}

/// Split on whitespace into chunks of at most `max_chars` characters.
/// A single over-long word becomes its own chunk rather than being dropped.
fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_short_text_single_chunk() {
        assert_eq!(chunk_text("good dog", 200), vec!["good dog"]);
    }

    #[test]
    fn test_chunk_splits_on_word_boundary() {
        let chunks = chunk_text("aaa bbb ccc", 7);
        assert_eq!(chunks, vec!["aaa bbb", "ccc"]);
    }

    #[test]
    fn test_chunk_empty_text() {
        assert!(chunk_text("   ", 10).is_empty());
    }

    #[test]
    fn test_chunk_overlong_word_kept() {
        let chunks = chunk_text("supercalifragilistic", 5);
        assert_eq!(chunks, vec!["supercalifragilistic"]);
    }

    #[test]
    fn test_segment_url_encodes_query() {
        let url = segment_url("hello world", "en");
        assert!(url.contains("tl=en"));
        assert!(url.contains("q=hello%20world"));
    }
}
