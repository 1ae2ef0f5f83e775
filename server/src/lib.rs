use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use chatbot::{ChatController, ChatMode, Config};
use shared::{client::INFO_ROUTE, client::SESSIONS_ROUTE, InfoResponse};

pub use crate::sessions::SessionStore;

pub mod rpc;
pub mod sessions;

pub const TITLE: &str = "AI Chatbot";

#[derive(Clone)]
pub struct AppState {
    pub controller: ChatController,
    pub sessions: SessionStore,
    pub info: Arc<InfoResponse>,
}

impl AppState {
    pub fn new(controller: ChatController, info: InfoResponse) -> Self {
        Self {
            controller,
            sessions: SessionStore::default(),
            info: Arc::new(info),
        }
    }
}

/// What the About panel shows for `config`.
pub fn info_for(config: &Config) -> InfoResponse {
    let description = match config.mode {
        ChatMode::Gemini => "This chatbot uses Google's Gemini model to generate responses.".to_owned(),
        ChatMode::Retrieval => format!(
            "This chatbot answers with Groq using passages retrieved from {}.",
            config.corpus.url
        ),
    };

    // Retrieval answers come from the corpus, so it doubles as the dataset.
    let dataset_url = config.dataset_url.clone().or_else(|| match config.mode {
        ChatMode::Gemini => None,
        ChatMode::Retrieval => Some(config.corpus.url.clone()),
    });

    InfoResponse {
        mode: config.mode.as_str().to_owned(),
        model: config.active_model().to_owned(),
        title: TITLE.to_owned(),
        description,
        dataset_url,
    }
}

/// The JSON API. Static files and middleware are added by the binary.
pub fn api(state: AppState) -> Router {
    Router::new()
        .route(INFO_ROUTE, get(rpc::info))
        .route(SESSIONS_ROUTE, post(rpc::create_session))
        .route(
            "/api/v0/sessions/:slug",
            get(rpc::get_session).delete(rpc::delete_session),
        )
        .route("/api/v0/sessions/:slug/messages", post(rpc::send_message))
        .route("/api/v0/sessions/:slug/reset", post(rpc::reset_session))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chatbot::{Reply, ResponseFetcher};
    use miette::{miette, Result};
    use serde::de::DeserializeOwned;
    use shared::{ExchangeResponse, SessionResponse, SourceDocument, Turn};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;

    struct Canned;

    #[async_trait]
    impl ResponseFetcher for Canned {
        async fn fetch(&self, prompt: &str, _history: &[Turn]) -> Result<Reply> {
            if prompt == "fail" {
                return Err(miette!("invalid API key"));
            }
            Ok(Reply {
                text: format!("You said {prompt}"),
                sources: vec![SourceDocument {
                    source: "https://docs.example.test/".to_owned(),
                    content: "context".to_owned(),
                }],
            })
        }

        fn model(&self) -> &str {
            "canned"
        }
    }

    fn app() -> Router {
        let controller = ChatController::new(Arc::new(Canned));
        let info = InfoResponse {
            mode: "gemini".to_owned(),
            model: "canned".to_owned(),
            title: TITLE.to_owned(),
            description: "test".to_owned(),
            dataset_url: Some("https://huggingface.co/datasets/example".to_owned()),
        };
        api(AppState::new(controller, info))
    }

    async fn call<T: DeserializeOwned>(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, Option<T>) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).ok())
    }

    async fn new_session(app: &Router) -> Uuid {
        let (status, session) = call::<SessionResponse>(app, "POST", "/api/v0/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        session.unwrap().slug
    }

    fn message(text: &str) -> Option<serde_json::Value> {
        Some(serde_json::json!({ "message": text }))
    }

    #[tokio::test]
    async fn exchange_then_reset() {
        let app = app();
        let slug = new_session(&app).await;
        let messages = format!("/api/v0/sessions/{slug}/messages");

        let (status, resp) = call::<ExchangeResponse>(&app, "POST", &messages, message("Hello")).await;
        assert_eq!(status, StatusCode::OK);
        let resp = resp.unwrap();
        assert_eq!(
            resp.turns,
            vec![Turn::user("Hello"), Turn::assistant("You said Hello")]
        );
        assert_eq!(resp.sources.len(), 1);

        let (_, resp) = call::<ExchangeResponse>(&app, "POST", &messages, message("Bye")).await;
        assert_eq!(resp.unwrap().turns.len(), 4);

        let (status, resp) = call::<SessionResponse>(
            &app,
            "POST",
            &format!("/api/v0/sessions/{slug}/reset"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(resp.unwrap().turns.is_empty());

        let (_, resp) =
            call::<SessionResponse>(&app, "GET", &format!("/api/v0/sessions/{slug}"), None).await;
        assert!(resp.unwrap().turns.is_empty());
    }

    #[tokio::test]
    async fn failures_are_recorded_as_turns() {
        let app = app();
        let slug = new_session(&app).await;

        let (status, resp) = call::<ExchangeResponse>(
            &app,
            "POST",
            &format!("/api/v0/sessions/{slug}/messages"),
            message("fail"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let resp = resp.unwrap();
        assert_eq!(
            resp.turns,
            vec![
                Turn::user("fail"),
                Turn::assistant("An error occurred: invalid API key")
            ]
        );
        assert!(resp.sources.is_empty());
    }

    #[tokio::test]
    async fn blank_message_changes_nothing() {
        let app = app();
        let slug = new_session(&app).await;

        let (status, resp) = call::<ExchangeResponse>(
            &app,
            "POST",
            &format!("/api/v0/sessions/{slug}/messages"),
            message("   "),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(resp.unwrap().turns.is_empty());
    }

    #[tokio::test]
    async fn sessions_do_not_share_history() {
        let app = app();
        let a = new_session(&app).await;
        let b = new_session(&app).await;

        call::<ExchangeResponse>(
            &app,
            "POST",
            &format!("/api/v0/sessions/{a}/messages"),
            message("Hello"),
        )
        .await;

        let (_, resp) =
            call::<SessionResponse>(&app, "GET", &format!("/api/v0/sessions/{b}"), None).await;
        assert!(resp.unwrap().turns.is_empty());
    }

    #[tokio::test]
    async fn deleted_sessions_are_gone() {
        let app = app();
        let slug = new_session(&app).await;
        let route = format!("/api/v0/sessions/{slug}");

        let (status, _) = call::<serde_json::Value>(&app, "DELETE", &route, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = call::<shared::ApiErrorBody>(&app, "GET", &route, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.unwrap().error, format!("session {slug} not found"));

        let (status, _) = call::<serde_json::Value>(&app, "DELETE", &route, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn info_describes_the_model() {
        let (status, info) = call::<InfoResponse>(&app(), "GET", "/api/v0/info", None).await;

        assert_eq!(status, StatusCode::OK);
        let info = info.unwrap();
        assert_eq!(info.model, "canned");
        assert_eq!(
            info.dataset_url.as_deref(),
            Some("https://huggingface.co/datasets/example")
        );
    }

    #[test]
    fn info_follows_mode() {
        let config = Config::from_lookup(|name| {
            (name == "CHATBOT_MODE").then(|| "retrieval".to_owned())
        })
        .unwrap();

        let info = info_for(&config);
        assert_eq!(info.mode, "retrieval");
        assert_eq!(info.model, chatbot::config::DEFAULT_GROQ_MODEL);
        assert!(info.description.contains(chatbot::config::DEFAULT_CORPUS_URL));
        assert_eq!(
            info.dataset_url.as_deref(),
            Some(chatbot::config::DEFAULT_CORPUS_URL)
        );
    }

    #[test]
    fn dataset_link_is_configurable() {
        let gemini = Config::from_lookup(|_| None).unwrap();
        assert_eq!(info_for(&gemini).dataset_url, None);

        let linked = Config::from_lookup(|name| {
            (name == "DATASET_URL").then(|| "https://huggingface.co/datasets/example".to_owned())
        })
        .unwrap();
        assert_eq!(
            info_for(&linked).dataset_url.as_deref(),
            Some("https://huggingface.co/datasets/example")
        );
    }
}
