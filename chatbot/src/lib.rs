use std::sync::Arc;

use miette::Result;
use tracing::info;

pub use crate::config::{ChatMode, Config, CorpusConfig, EndpointConfig};
pub use crate::corpus::{CorpusIndexer, DocumentSource, Embedder, TextSource, TextSplitter, WebLoader};
pub use crate::fetcher::{fetch_reply, Reply, ResponseFetcher, RoleVocabulary, ERROR_PREFIX};
pub use crate::gemini::GeminiChat;
pub use crate::history::History;
pub use crate::openai::{completion::Message, Client as OpenAiClient};
pub use crate::retrieval::{ChatCompletion, RetrievalChat};
pub use crate::session::{ChatController, ChatSession};

pub mod config;
pub mod corpus;
mod fetcher;
mod gemini;
mod history;
mod http;
pub mod openai;
mod retrieval;
mod session;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Corpus indexer reading from `source`, embedding with the configured API.
pub fn corpus_indexer(config: &Config, source: Arc<dyn DocumentSource>) -> Result<CorpusIndexer> {
    let embedder = OpenAiClient::new(config.embeddings.clone())?;

    Ok(CorpusIndexer::new(
        source,
        Arc::new(embedder),
        TextSplitter::new(config.corpus.chunk_size),
    ))
}

/// The fetcher for the configured mode. Nothing remote is contacted here.
pub fn build_fetcher(config: &Config) -> Result<Arc<dyn ResponseFetcher>> {
    let fetcher: Arc<dyn ResponseFetcher> = match config.mode {
        ChatMode::Gemini => Arc::new(GeminiChat::new(config.gemini.clone())?),
        ChatMode::Retrieval => {
            let source = Arc::new(WebLoader::new(config.corpus.url.clone())?);
            let retriever = Arc::new(corpus_indexer(config, source)?);
            let completion = Arc::new(OpenAiClient::new(config.groq.clone())?);

            Arc::new(RetrievalChat::new(
                retriever,
                completion,
                config.groq.model.clone(),
                config.corpus.top_k,
            ))
        }
    };

    info!(mode = config.mode.as_str(), model = fetcher.model(), "fetcher ready");
    Ok(fetcher)
}

pub fn build_controller(config: &Config) -> Result<ChatController> {
    Ok(ChatController::new(build_fetcher(config)?)
        .with_max_history_turns(config.max_history_turns))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mode: &str) -> Config {
        Config::from_lookup(|name| (name == "CHATBOT_MODE").then(|| mode.to_owned())).unwrap()
    }

    #[test]
    fn builds_without_keys() {
        let gemini = build_controller(&config("gemini")).unwrap();
        assert_eq!(gemini.model(), config::DEFAULT_GEMINI_MODEL);

        let retrieval = build_controller(&config("retrieval")).unwrap();
        assert_eq!(retrieval.model(), config::DEFAULT_GROQ_MODEL);
    }
}
