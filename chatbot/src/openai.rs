use miette::{Context, IntoDiagnostic, Result};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;

use crate::{
    config::EndpointConfig,
    http::{http_client, read_json},
};

pub mod completion;
pub mod embeddings;

/// Client for an OpenAI-compatible HTTP API (Groq chat, OpenAI embeddings).
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    config: EndpointConfig,
}

impl Client {
    pub fn new(config: EndpointConfig) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            config,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn post<Req, Resp>(&self, path: &str, request: &Req) -> Result<Resp>
    where
        Req: serde::Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let api_key = self.config.require_key()?;

        let value = format!("Bearer {api_key}");
        let mut value = HeaderValue::from_str(&value)
            .into_diagnostic()
            .wrap_err("Could not create header value")?;
        value.set_sensitive(true);

        let url = self.config.url(path);
        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, value)
            .json(request)
            .send()
            .await
            .into_diagnostic()
            .wrap_err_with(|| format!("Request to {url} failed"))?;

        read_json(response).await
    }
}
