use clap::ValueEnum;
use miette::{miette, IntoDiagnostic, Result, WrapErr};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GROQ_MODEL: &str = "mixtral-8x7b-32768";
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_EMBEDDINGS_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_EMBEDDINGS_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CORPUS_URL: &str = "https://docs.smith.langchain.com/";
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_TOP_K: usize = 4;

/// Which fetcher answers the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChatMode {
    /// Plain multi-turn chat against Gemini.
    Gemini,
    /// Groq chat grounded in chunks retrieved from a web corpus.
    Retrieval,
}

impl ChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Gemini => "gemini",
            ChatMode::Retrieval => "retrieval",
        }
    }
}

/// One remote HTTP API: where it lives, which model to ask for, and the key.
///
/// A missing key is not an error here; requests fail when they are made.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Env var the key is read from, for error messages.
    pub key_var: &'static str,
}

impl EndpointConfig {
    pub(crate) fn require_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| miette!("{} is not set", self.key_var))
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Clone)]
pub struct CorpusConfig {
    pub url: String,
    pub chunk_size: usize,
    pub top_k: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: ChatMode,
    pub gemini: EndpointConfig,
    pub groq: EndpointConfig,
    pub embeddings: EndpointConfig,
    pub corpus: CorpusConfig,
    /// Most recent prior turns sent with each prompt. `None` sends them all.
    pub max_history_turns: Option<usize>,
    /// Linked from the About panel.
    pub dataset_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let or = |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_owned());

        let mode = match var("CHATBOT_MODE") {
            Some(mode) => ChatMode::from_str(&mode, true)
                .map_err(|e| miette!(e))
                .wrap_err("Could not parse CHATBOT_MODE")?,
            None => ChatMode::Gemini,
        };

        let gemini = EndpointConfig {
            base_url: or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
            model: or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            api_key: var("GOOGLE_API_KEY"),
            key_var: "GOOGLE_API_KEY",
        };

        let groq = EndpointConfig {
            base_url: or("GROQ_BASE_URL", DEFAULT_GROQ_BASE_URL),
            model: or("GROQ_MODEL", DEFAULT_GROQ_MODEL),
            api_key: var("GROQ_API_KEY"),
            key_var: "GROQ_API_KEY",
        };

        let embeddings = EndpointConfig {
            base_url: or("EMBEDDINGS_BASE_URL", DEFAULT_EMBEDDINGS_BASE_URL),
            model: or("EMBEDDINGS_MODEL", DEFAULT_EMBEDDINGS_MODEL),
            api_key: var("EMBEDDINGS_API_KEY").or_else(|| var("OPENAI_API_KEY")),
            key_var: "EMBEDDINGS_API_KEY",
        };

        let corpus = CorpusConfig {
            url: or("CORPUS_URL", DEFAULT_CORPUS_URL),
            chunk_size: parse_positive("CHUNK_SIZE", var("CHUNK_SIZE"))?
                .unwrap_or(DEFAULT_CHUNK_SIZE),
            top_k: parse_positive("RETRIEVAL_TOP_K", var("RETRIEVAL_TOP_K"))?
                .unwrap_or(DEFAULT_TOP_K),
        };

        let max_history_turns = parse_positive("MAX_HISTORY_TURNS", var("MAX_HISTORY_TURNS"))?;
        let dataset_url = var("DATASET_URL");

        Ok(Self {
            mode,
            gemini,
            groq,
            embeddings,
            corpus,
            max_history_turns,
            dataset_url,
        })
    }

    /// Model name answering in the configured mode.
    pub fn active_model(&self) -> &str {
        match self.mode {
            ChatMode::Gemini => &self.gemini.model,
            ChatMode::Retrieval => &self.groq.model,
        }
    }
}

fn parse_positive(name: &str, value: Option<String>) -> Result<Option<usize>> {
    let Some(value) = value else {
        return Ok(None);
    };

    let parsed: usize = value
        .trim()
        .parse()
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not parse {name}={value:?}"))?;

    if parsed == 0 {
        return Err(miette!("{name} must be greater than zero"));
    }

    Ok(Some(parsed))
}
