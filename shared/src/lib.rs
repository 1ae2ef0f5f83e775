use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod client;

/// Who spoke a [`Turn`].
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown role `{0}`")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    /// Accepts the aliases chat front-ends commonly use for each speaker.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" | "user" => Ok(Role::User),
            "ai" | "assistant" | "model" => Ok(Role::Assistant),
            _ => Err(ParseRoleError(s.to_owned())),
        }
    }
}

/// One message of a conversation. Immutable once built.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// A retrieved chunk backing an answer.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub source: String,
    pub content: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SessionResponse {
    pub slug: Uuid,
    pub turns: Vec<Turn>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ExchangeResponse {
    pub slug: Uuid,
    pub turns: Vec<Turn>,
    #[serde(default)]
    pub sources: Vec<SourceDocument>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct InfoResponse {
    pub mode: String,
    pub model: String,
    pub title: String,
    pub description: String,
    /// Where the data behind the answers can be browsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_url: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ApiErrorBody {
    pub error: String,
}
