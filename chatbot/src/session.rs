use std::sync::Arc;

use shared::Turn;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    fetcher::{fetch_reply, Reply, ResponseFetcher},
    history::History,
};

/// One conversation. Owned by whoever drives it (a server session, the REPL).
#[derive(Debug, Clone)]
pub struct ChatSession {
    slug: Uuid,
    history: History,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::with_slug(Uuid::new_v4())
    }

    pub fn with_slug(slug: Uuid) -> Self {
        Self {
            slug,
            history: History::new(),
        }
    }

    pub fn slug(&self) -> Uuid {
        self.slug
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn turns(&self) -> &[Turn] {
        self.history.turns()
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives the user → model → assistant exchange for any session.
#[derive(Clone)]
pub struct ChatController {
    fetcher: Arc<dyn ResponseFetcher>,
    max_history_turns: Option<usize>,
}

impl ChatController {
    pub fn new(fetcher: Arc<dyn ResponseFetcher>) -> Self {
        Self {
            fetcher,
            max_history_turns: None,
        }
    }

    pub fn with_max_history_turns(mut self, max: Option<usize>) -> Self {
        self.max_history_turns = max;
        self
    }

    pub fn model(&self) -> &str {
        self.fetcher.model()
    }

    /// Records `input` and the answer to it. Blank input is ignored and
    /// returns `None`.
    ///
    /// The fetcher sees the turns that came before `input`; a failed fetch
    /// still records an assistant turn holding the error text.
    pub async fn submit(&self, session: &mut ChatSession, input: &str) -> Option<Reply> {
        if input.trim().is_empty() {
            return None;
        }

        let prior = session.history.window(self.max_history_turns).to_vec();
        session.history.push(Turn::user(input));

        debug!(slug = %session.slug, prior_turns = prior.len(), "fetching reply");
        let reply = fetch_reply(self.fetcher.as_ref(), input, &prior).await;

        session.history.push(Turn::assistant(reply.text.clone()));
        info!(
            slug = %session.slug,
            turns = session.history.len(),
            sources = reply.sources.len(),
            "exchange recorded"
        );

        Some(reply)
    }

    pub fn reset(&self, session: &mut ChatSession) {
        session.history.clear();
        info!(slug = %session.slug, "history cleared");
    }
}
