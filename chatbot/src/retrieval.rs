use std::sync::Arc;

use async_trait::async_trait;
use indoc::formatdoc;
use itertools::Itertools;
use miette::Result;
use shared::{SourceDocument, Turn};
use tracing::debug;

use crate::{
    corpus::{CorpusIndexer, ScoredChunk},
    fetcher::{Reply, ResponseFetcher},
    openai::completion::Message,
};

/// A chat completion endpoint taking a full message list.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, messages: Vec<Message>) -> Result<String>;
}

/// Answers from retrieved corpus chunks plus the conversation so far.
pub struct RetrievalChat {
    retriever: Arc<CorpusIndexer>,
    completion: Arc<dyn ChatCompletion>,
    model: String,
    top_k: usize,
}

impl RetrievalChat {
    pub fn new(
        retriever: Arc<CorpusIndexer>,
        completion: Arc<dyn ChatCompletion>,
        model: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            retriever,
            completion,
            model: model.into(),
            top_k,
        }
    }
}

fn system_prompt(context: &str) -> String {
    formatdoc!(
        "
        Answer the questions based on the provided context only.
        Please provide the most accurate response based on the question.
        If the context does not contain the answer, say that you do not know.

        <context>
        {context}
        </context>
        "
    )
}

/// System prompt carrying the chunks, then the history, then the question.
pub(crate) fn build_messages(prompt: &str, history: &[Turn], chunks: &[ScoredChunk]) -> Vec<Message> {
    let context = chunks.iter().map(|c| c.chunk.text.trim()).join("\n\n");

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(system_prompt(&context)));
    messages.extend(history.iter().map(Message::from_turn));
    messages.push(Message::user(prompt));
    messages
}

#[async_trait]
impl ResponseFetcher for RetrievalChat {
    async fn fetch(&self, prompt: &str, history: &[Turn]) -> Result<Reply> {
        let chunks = self.retriever.retrieve(prompt, self.top_k).await?;
        debug!(
            retrieved = chunks.len(),
            nearest = ?chunks.first().map(|c| c.distance),
            "context retrieved"
        );

        let messages = build_messages(prompt, history, &chunks);
        let text = self.completion.complete(messages).await?;

        let sources = chunks
            .into_iter()
            .map(|c| SourceDocument {
                source: c.chunk.source,
                content: c.chunk.text,
            })
            .collect();

        Ok(Reply { text, sources })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use miette::miette;

    use super::*;
    use crate::{
        corpus::{
            tests::{CountingSource, KeywordEmbedder, DOCS},
            TextSplitter,
        },
        fetcher::fetch_reply,
    };

    /// Answers with the last message and keeps every request.
    #[derive(Default)]
    struct Recorder {
        requests: Mutex<Vec<Vec<Message>>>,
    }

    #[async_trait]
    impl ChatCompletion for Recorder {
        async fn complete(&self, messages: Vec<Message>) -> Result<String> {
            let answer = format!("answer to {}", messages.last().unwrap().content);
            self.requests.lock().unwrap().push(messages);
            Ok(answer)
        }
    }

    struct Unavailable;

    #[async_trait]
    impl ChatCompletion for Unavailable {
        async fn complete(&self, _messages: Vec<Message>) -> Result<String> {
            Err(miette!("API returned 503 Service Unavailable: over capacity"))
        }
    }

    fn retriever() -> Arc<CorpusIndexer> {
        Arc::new(CorpusIndexer::new(
            Arc::new(CountingSource::new(DOCS)),
            Arc::new(KeywordEmbedder::default()),
            TextSplitter::new(40),
        ))
    }

    #[test]
    fn messages_carry_context_history_and_prompt() {
        let chunks = vec![ScoredChunk {
            chunk: crate::corpus::Chunk {
                id: 0,
                source: "s".to_owned(),
                text: " Tracing records runs. ".to_owned(),
            },
            distance: 0.1,
        }];
        let history = vec![Turn::user("Hi"), Turn::assistant("Hello!")];

        let messages = build_messages("What is tracing?", &history, &chunks);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0]
            .content
            .contains("<context>\nTracing records runs.\n</context>"));
        assert_eq!(messages[1], Message::user("Hi"));
        assert_eq!(messages[2].role, "assistant");
        assert_eq!(messages[3], Message::user("What is tracing?"));
    }

    #[tokio::test]
    async fn reply_includes_retrieved_sources() {
        let completion = Arc::new(Recorder::default());
        let chat = RetrievalChat::new(retriever(), completion.clone(), "mixtral", 1);

        let reply = chat.fetch("Tell me about prompts", &[]).await.unwrap();

        assert_eq!(reply.text, "answer to Tell me about prompts");
        assert_eq!(reply.sources.len(), 1);
        assert!(reply.sources[0].content.starts_with("Prompts"));
        assert_eq!(reply.sources[0].source, "https://docs.example.test/");

        let requests = completion.requests.lock().unwrap();
        assert!(requests[0][0].content.contains("Prompts are versioned"));
    }

    #[tokio::test]
    async fn completion_failure_becomes_error_text() {
        let chat = RetrievalChat::new(retriever(), Arc::new(Unavailable), "mixtral", 2);

        let reply = fetch_reply(&chat, "Tell me about tracing", &[]).await;

        assert_eq!(
            reply.text,
            "An error occurred: API returned 503 Service Unavailable: over capacity"
        );
        assert!(reply.sources.is_empty());
    }
}
