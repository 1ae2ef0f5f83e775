use async_trait::async_trait;
use miette::{miette, Result};
use serde::{Deserialize, Serialize};
use shared::Turn;
use tracing::debug;

use super::Client;
use crate::{fetcher::RoleVocabulary, retrieval::ChatCompletion};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn from_turn(turn: &Turn) -> Self {
        Self {
            role: RoleVocabulary::OpenAi.role(turn.role()).to_string(),
            content: turn.content().to_string(),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub(crate) struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct CompletionChoice {
    #[serde(default)]
    finish_reason: Option<String>,
    pub message: Message,
}

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct CompletionUsage {
    completion_tokens: i64,
    prompt_tokens: i64,
    total_tokens: i64,
}

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct CompletionResponse {
    pub(crate) choices: Vec<CompletionChoice>,
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) usage: Option<CompletionUsage>,
}

impl CompletionResponse {
    fn into_text(self) -> Result<String> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| miette!("completion response contained no choices"))?;

        Ok(choice.message.content)
    }
}

impl Client {
    pub(crate) async fn completion(&self, messages: &[Message]) -> Result<CompletionResponse> {
        let request = CompletionRequest {
            model: self.model(),
            messages,
        };

        self.post("chat/completions", &request).await
    }
}

#[async_trait]
impl ChatCompletion for Client {
    async fn complete(&self, messages: Vec<Message>) -> Result<String> {
        let response = self.completion(&messages).await?;

        if let Some(usage) = &response.usage {
            debug!(
                id = response.id.as_deref().unwrap_or_default(),
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "completion finished"
            );
        }
        if let Some(reason) = response.choices.first().and_then(|c| c.finish_reason.as_deref()) {
            debug!(finish_reason = reason, "completion choice");
        }

        response.into_text()
    }
}
