//! Chat-completion proxy client
//!
//! Wraps the hosted inference routers used for chat, text refinement,
//! image analysis and audio transcription. The primary endpoint gets a
//! short timeout; on timeout only, the request is retried once against
//! the fallback endpoint.

use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

use crate::constants::{
    CHAT_API_URL, CHAT_FALLBACK_MODEL, CHAT_FALLBACK_URL, CHAT_MODEL, CHAT_PRIMARY_TIMEOUT_SECS,
};

const SYSTEM_PROMPT: &str =
    "You are 'Vet 2' a pet expert with a PhD in veterinary medicine. powered by Mobinuity labs";

#[derive(Debug)]
pub enum AiError {
    Http(reqwest::Error),
    Api(String),
    EmptyResponse,
}

impl From<reqwest::Error> for AiError {
    fn from(e: reqwest::Error) -> Self {
        AiError::Http(e)
    }
}

impl std::fmt::Display for AiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AiError::Http(e) => write!(f, "HTTP error: {}", e),
            AiError::Api(s) => write!(f, "Inference API error: {}", s),
            AiError::EmptyResponse => write!(f, "Inference API returned no choices"),
        }
    }
}

impl std::error::Error for AiError {}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Clone)]
pub struct AiClient {
    token: String,
    transcribe_base_url: String,
    transcribe_key: String,
    http: Client,
}

impl AiClient {
    pub fn new(token: &str, transcribe_base_url: &str, transcribe_key: &str) -> Self {
        Self {
            token: token.to_string(),
            transcribe_base_url: transcribe_base_url.trim_end_matches('/').to_string(),
            transcribe_key: transcribe_key.to_string(),
            http: Client::new(),
        }
    }

    /// Free-form chat; the expert flag routes to the fallback provider's
    /// larger model directly.
    pub async fn chat(&self, text: &str, is_pet_expert: bool) -> Result<String, AiError> {
        let content = json!(text);
        if is_pet_expert {
            self.complete(CHAT_FALLBACK_URL, CHAT_FALLBACK_MODEL, &content)
                .await
        } else {
            self.complete_with_fallback(&content).await
        }
    }

    /// Expand a translation suggestion while keeping the caller's language.
    pub async fn refine_text(&self, text: &str, language_code: &str) -> Result<String, AiError> {
        let prompt = refine_prompt(text, language_code);
        self.complete_with_fallback(&json!(prompt)).await
    }

    /// Analyse an image supplied as a base64 data URL.
    pub async fn analyse_image(&self, data_url: &str, text: Option<&str>) -> Result<String, AiError> {
        let content = json!([
            {"type": "text", "text": text.unwrap_or("Please analyse this image")},
            {"type": "image_url", "image_url": {"url": data_url}}
        ]);
        self.complete(CHAT_API_URL, CHAT_MODEL, &content).await
    }

    /// Transcribe an audio file via the whisper-compatible endpoint.
    pub async fn transcribe(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, AiError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", "whisper-1");

        let resp = self
            .http
            .post(format!("{}/audio/transcriptions", self.transcribe_base_url))
            .header("Authorization", format!("Bearer {}", self.transcribe_key))
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(AiError::Api(format!("{}: {}", status, text)));
        }

        #[derive(Deserialize)]
        struct Transcription {
            text: String,
        }

        let body: Transcription = resp.json().await?;
        Ok(body.text)
    }

    /// Primary endpoint with a short timeout; on timeout only, retry once
    /// against the fallback endpoint with its model.
    async fn complete_with_fallback(&self, content: &Value) -> Result<String, AiError> {
        let primary = self.complete(CHAT_API_URL, CHAT_MODEL, content);
        match tokio::time::timeout(Duration::from_secs(CHAT_PRIMARY_TIMEOUT_SECS), primary).await {
            Ok(result) => result,
            Err(_elapsed) => {
                eprintln!("[ai] Primary endpoint timed out, trying fallback");
                self.complete(CHAT_FALLBACK_URL, CHAT_FALLBACK_MODEL, content)
                    .await
            }
        }
    }

    async fn complete(&self, url: &str, model: &str, content: &Value) -> Result<String, AiError> {
        let body = chat_request_body(model, content);

        let resp = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(AiError::Api(format!("{}: {}", status, text)));
        }

        let completion: ChatCompletion = resp.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(AiError::EmptyResponse)
    }
}

fn chat_request_body(model: &str, content: &Value) -> Value {
    json!({
        "messages": [
            {"role": "system", "content": SYSTEM_PROMPT},
            {"role": "user", "content": content}
        ],
        "stream": false,
        "model": model
    })
}

fn refine_prompt(text: &str, language_code: &str) -> String {
    format!(
        "Explain the following text in detail, maintaining the same Language Code: '{}': \n{}",
        language_code, text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_body_shape() {
        let body = chat_request_body("test-model", &json!("hello"));
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello");
    }

    #[test]
    fn test_refine_prompt_carries_language_code() {
        let prompt = refine_prompt("woof", "de");
        assert!(prompt.contains("'de'"));
        assert!(prompt.ends_with("woof"));
    }

    #[test]
    fn test_parse_completion() {
        let json = r#"{"choices": [{"message": {"role": "assistant", "content": "hi"}}]}"#;
        let parsed: ChatCompletion = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.choices[0].message.content, "hi");
    }
}
