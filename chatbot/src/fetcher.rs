use async_trait::async_trait;
use itertools::Itertools;
use miette::Result;
use shared::{Role, SourceDocument, Turn};
use tracing::warn;

/// Prefix of the assistant text recorded when a fetch fails.
pub const ERROR_PREFIX: &str = "An error occurred: ";

/// Role names a provider expects on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleVocabulary {
    /// `user` / `model`
    Gemini,
    /// `user` / `assistant`, shared by OpenAI-compatible APIs such as Groq.
    OpenAi,
}

impl RoleVocabulary {
    pub fn role(self, role: Role) -> &'static str {
        match (self, role) {
            (_, Role::User) => "user",
            (RoleVocabulary::Gemini, Role::Assistant) => "model",
            (RoleVocabulary::OpenAi, Role::Assistant) => "assistant",
        }
    }

    /// Maps every turn, in order.
    pub fn roles<'a>(self, history: &'a [Turn]) -> impl Iterator<Item = (&'static str, &'a str)> + 'a {
        history
            .iter()
            .map(move |turn| (self.role(turn.role()), turn.content()))
    }
}

/// What one fetch produced: the answer and whatever backed it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reply {
    pub text: String,
    pub sources: Vec<SourceDocument>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: Vec::new(),
        }
    }
}

/// Turns a prompt plus the turns before it into an answer from a remote model.
#[async_trait]
pub trait ResponseFetcher: Send + Sync {
    async fn fetch(&self, prompt: &str, history: &[Turn]) -> Result<Reply>;

    /// Short name of the model answering, for display.
    fn model(&self) -> &str;
}

/// Runs `fetcher`, folding any failure into a displayable reply.
pub async fn fetch_reply(fetcher: &dyn ResponseFetcher, prompt: &str, history: &[Turn]) -> Reply {
    match fetcher.fetch(prompt, history).await {
        Ok(reply) => reply,
        Err(report) => {
            let message = report.chain().map(|e| e.to_string()).join(": ");
            warn!(model = fetcher.model(), error = %message, "fetch failed");
            Reply::text(format!("{ERROR_PREFIX}{message}"))
        }
    }
}
