use gloo_net::http::{Method as HttpMethod, Request};
use shared::client::{ChatClient, ClientTransport, Method};

/// Prefix for API routes; empty when the server also hosts this page.
const API_BASE: &str = match option_env!("CHATBOT_API_BASE") {
    Some(base) => base,
    None => "",
};

pub struct Client;

pub fn client() -> ChatClient<Client> {
    ChatClient::new(Client)
}

impl ClientTransport for Client {
    type Error = gloo_net::Error;

    async fn send_request(
        &self,
        method: Method,
        route: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Result<serde_json::Value, serde_json::Value>, Self::Error> {
        let method = match method {
            Method::Get => HttpMethod::GET,
            Method::Post => HttpMethod::POST,
            Method::Delete => HttpMethod::DELETE,
        };

        let url = format!("{API_BASE}{route}");
        let req = if let Some(body) = body {
            Request::new(&url).method(method).json(&body)?
        } else {
            Request::new(&url).method(method)
        };

        let resp = req.send().await?;
        let status = resp.status();
        if status == 204 {
            return Ok(Ok(serde_json::Value::Null));
        }
        let json = resp.json().await?;

        if (200..300).contains(&status) {
            Ok(Ok(json))
        } else {
            Ok(Err(json))
        }
    }
}
