use async_trait::async_trait;
use miette::{miette, Context, IntoDiagnostic, Result};
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use shared::Turn;

use crate::{
    config::EndpointConfig,
    fetcher::{Reply, ResponseFetcher, RoleVocabulary},
    http::{http_client, read_json},
};

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct Content {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl Content {
    fn text(role: &str, text: &str) -> Self {
        Self {
            role: Some(role.to_owned()),
            parts: vec![Part {
                text: Some(text.to_owned()),
            }],
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub(crate) struct GenerateContentRequest {
    contents: Vec<Content>,
}

impl GenerateContentRequest {
    /// Prior turns in Gemini's vocabulary, then the prompt as the last user turn.
    pub(crate) fn new(prompt: &str, history: &[Turn]) -> Self {
        let mut contents: Vec<Content> = RoleVocabulary::Gemini
            .roles(history)
            .map(|(role, text)| Content::text(role, text))
            .collect();
        contents.push(Content::text("user", prompt));

        Self { contents }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Joined text parts of the first candidate.
    pub(crate) fn into_text(self) -> Result<String> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no reason given".to_owned());
            return Err(miette!("Gemini returned no candidates ({reason})"));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .collect();

        if text.is_empty() {
            let reason = candidate.finish_reason.as_deref().unwrap_or("unknown");
            return Err(miette!("Gemini returned no text (finish reason: {reason})"));
        }

        Ok(text)
    }
}

/// Multi-turn chat against Gemini's `generateContent` endpoint.
pub struct GeminiChat {
    http: reqwest::Client,
    config: EndpointConfig,
}

impl GeminiChat {
    pub fn new(config: EndpointConfig) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            config,
        })
    }

    fn endpoint(&self) -> String {
        self.config
            .url(&format!("v1beta/models/{}:generateContent", self.config.model))
    }
}

#[async_trait]
impl ResponseFetcher for GeminiChat {
    async fn fetch(&self, prompt: &str, history: &[Turn]) -> Result<Reply> {
        let api_key = self.config.require_key()?;
        let mut key = HeaderValue::from_str(api_key)
            .into_diagnostic()
            .wrap_err("Could not create header value")?;
        key.set_sensitive(true);

        let request = GenerateContentRequest::new(prompt, history);
        let response = self
            .http
            .post(self.endpoint())
            .header(API_KEY_HEADER, key)
            .json(&request)
            .send()
            .await
            .into_diagnostic()
            .wrap_err("Gemini request failed")?;

        let response: GenerateContentResponse = read_json(response).await?;
        Ok(Reply::text(response.into_text()?))
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::fetch_reply;

    fn config(api_key: Option<&str>) -> EndpointConfig {
        EndpointConfig {
            // Nothing listens here; tests must never reach the network.
            base_url: "http://127.0.0.1:9".to_owned(),
            model: "gemini-pro".to_owned(),
            api_key: api_key.map(str::to_owned),
            key_var: "GOOGLE_API_KEY",
        }
    }

    #[test]
    fn request_maps_history_then_appends_prompt() {
        let history = vec![Turn::user("Hello"), Turn::assistant("Hi! How can I help?")];
        let request = GenerateContentRequest::new("Bye", &history);

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "Hello"}]},
                    {"role": "model", "parts": [{"text": "Hi! How can I help?"}]},
                    {"role": "user", "parts": [{"text": "Bye"}]}
                ]
            })
        );
    }

    #[test]
    fn endpoint_names_the_model() {
        let chat = GeminiChat::new(config(None)).unwrap();
        assert_eq!(
            chat.endpoint(),
            "http://127.0.0.1:9/v1beta/models/gemini-pro:generateContent"
        );
    }

    #[test]
    fn response_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Hello"}, {"text": ", world"}]},
                    "finishReason": "STOP",
                    "index": 0
                }],
                "usageMetadata": {"promptTokenCount": 2, "totalTokenCount": 5}
            }"#,
        )
        .unwrap();

        assert_eq!(response.into_text().unwrap(), "Hello, world");
    }

    #[test]
    fn blocked_prompt_is_an_error() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();

        let err = response.into_text().unwrap_err();
        assert_eq!(err.to_string(), "Gemini returned no candidates (SAFETY)");
    }

    #[test]
    fn empty_candidate_is_an_error() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"finishReason": "MAX_TOKENS"}]}"#,
        )
        .unwrap();

        assert!(response.into_text().is_err());
    }

    #[tokio::test]
    async fn missing_key_fails_when_called() {
        let chat = GeminiChat::new(config(None)).unwrap();

        let reply = fetch_reply(&chat, "Hello", &[]).await;
        assert_eq!(reply.text, "An error occurred: GOOGLE_API_KEY is not set");
    }
}
