use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use super::*;

pub const INFO_ROUTE: &str = "/api/v0/info";
pub const SESSIONS_ROUTE: &str = "/api/v0/sessions";

pub fn session_route(slug: Uuid) -> String {
    format!("{SESSIONS_ROUTE}/{slug}")
}

pub fn messages_route(slug: Uuid) -> String {
    format!("{SESSIONS_ROUTE}/{slug}/messages")
}

pub fn reset_route(slug: Uuid) -> String {
    format!("{SESSIONS_ROUTE}/{slug}/reset")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

/// Moves JSON between a client and the chat server.
///
/// The outer `Result` is the transport outcome, the inner one tells a
/// success body apart from an error body. A success without a body is
/// `Value::Null`.
#[allow(async_fn_in_trait)]
pub trait ClientTransport {
    type Error: std::error::Error + 'static;

    async fn send_request(
        &self,
        method: Method,
        route: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Result<serde_json::Value, serde_json::Value>, Self::Error>;
}

#[derive(Error, Debug)]
pub enum ClientError<TransportError>
where
    TransportError: std::fmt::Debug + std::error::Error,
{
    #[error(transparent)]
    Transport(TransportError),
    #[error(transparent)]
    Deserialization(serde_json::Error),
    #[error(transparent)]
    Serialization(serde_json::Error),
    #[error("server error: {}", .0.error)]
    Api(ApiErrorBody),
}

/// Typed calls for every chat server endpoint, over any transport.
pub struct ChatClient<T> {
    transport: T,
}

impl<T> ChatClient<T>
where
    T: ClientTransport,
{
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub async fn info(&self) -> Result<InfoResponse, ClientError<T::Error>> {
        self.call(Method::Get, INFO_ROUTE, None).await
    }

    pub async fn create_session(&self) -> Result<SessionResponse, ClientError<T::Error>> {
        self.call(Method::Post, SESSIONS_ROUTE, None).await
    }

    pub async fn get_session(&self, slug: Uuid) -> Result<SessionResponse, ClientError<T::Error>> {
        self.call(Method::Get, &session_route(slug), None).await
    }

    pub async fn send_message(
        &self,
        slug: Uuid,
        message: String,
    ) -> Result<ExchangeResponse, ClientError<T::Error>> {
        let body = serde_json::to_value(ChatRequest { message })
            .map_err(ClientError::Serialization)?;
        self.call(Method::Post, &messages_route(slug), Some(body))
            .await
    }

    pub async fn reset(&self, slug: Uuid) -> Result<SessionResponse, ClientError<T::Error>> {
        self.call(Method::Post, &reset_route(slug), None).await
    }

    pub async fn delete_session(&self, slug: Uuid) -> Result<(), ClientError<T::Error>> {
        self.call(Method::Delete, &session_route(slug), None).await
    }

    async fn call<R: DeserializeOwned>(
        &self,
        method: Method,
        route: &str,
        body: Option<serde_json::Value>,
    ) -> Result<R, ClientError<T::Error>> {
        let resp = self
            .transport
            .send_request(method, route, body)
            .await
            .map_err(ClientError::Transport)?;

        match resp {
            Ok(resp) => serde_json::from_value(resp).map_err(ClientError::Deserialization),
            Err(resp) => {
                let resp = serde_json::from_value(resp).map_err(ClientError::Deserialization)?;
                Err(ClientError::Api(resp))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use futures::executor::block_on;

    use super::*;

    #[derive(Error, Debug)]
    #[error("offline")]
    struct Offline;

    /// Replays one canned response and records what was sent.
    struct Canned {
        response: Result<serde_json::Value, serde_json::Value>,
        seen: RefCell<Vec<(Method, String, Option<serde_json::Value>)>>,
    }

    impl ClientTransport for Canned {
        type Error = Offline;

        async fn send_request(
            &self,
            method: Method,
            route: &str,
            body: Option<serde_json::Value>,
        ) -> Result<Result<serde_json::Value, serde_json::Value>, Self::Error> {
            self.seen
                .borrow_mut()
                .push((method, route.to_owned(), body));
            Ok(self.response.clone())
        }
    }

    #[test]
    fn send_message_posts_to_the_session_route() {
        let slug = Uuid::new_v4();
        let client = ChatClient::new(Canned {
            response: Ok(serde_json::json!({
                "slug": slug,
                "turns": [
                    {"role": "user", "content": "Hello"},
                    {"role": "assistant", "content": "Hi!"}
                ],
                "sources": []
            })),
            seen: RefCell::default(),
        });

        let resp = block_on(client.send_message(slug, "Hello".to_owned())).unwrap();
        assert_eq!(resp.turns, vec![Turn::user("Hello"), Turn::assistant("Hi!")]);

        let seen = client.transport.seen.borrow();
        assert_eq!(seen[0].0, Method::Post);
        assert_eq!(seen[0].1, format!("/api/v0/sessions/{slug}/messages"));
        assert_eq!(seen[0].2, Some(serde_json::json!({"message": "Hello"})));
    }

    #[test]
    fn delete_session_sends_delete_to_the_session_route() {
        let slug = Uuid::new_v4();
        let client = ChatClient::new(Canned {
            response: Ok(serde_json::Value::Null),
            seen: RefCell::default(),
        });

        block_on(client.delete_session(slug)).unwrap();

        let seen = client.transport.seen.borrow();
        assert_eq!(seen[0].0, Method::Delete);
        assert_eq!(seen[0].1, format!("/api/v0/sessions/{slug}"));
        assert_eq!(seen[0].2, None);
    }

    #[test]
    fn deleting_an_unknown_session_is_an_api_error() {
        let client = ChatClient::new(Canned {
            response: Err(serde_json::json!({"error": "session gone"})),
            seen: RefCell::default(),
        });

        let err = block_on(client.delete_session(Uuid::new_v4())).unwrap_err();
        assert!(matches!(err, ClientError::Api(body) if body.error == "session gone"));
    }

    #[test]
    fn error_bodies_become_api_errors() {
        let client = ChatClient::new(Canned {
            response: Err(serde_json::json!({"error": "session not found"})),
            seen: RefCell::default(),
        });

        let err = block_on(client.get_session(Uuid::new_v4())).unwrap_err();
        match err {
            ClientError::Api(body) => assert_eq!(body.error, "session not found"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
