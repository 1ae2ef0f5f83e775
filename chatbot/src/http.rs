use miette::{Context, IntoDiagnostic, Result};
use serde::{de::DeserializeOwned, Deserialize};

use crate::APP_USER_AGENT;

pub(crate) fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(APP_USER_AGENT)
        .build()
        .into_diagnostic()
        .wrap_err("Could not build reqwest client")
}

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize, Debug)]
struct ErrorDetail {
    message: String,
}

/// Decodes a success body, or turns an error status into a report carrying
/// the provider's own message when it sent one.
pub(crate) async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .into_diagnostic()
        .wrap_err("Could not read response body")?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|envelope| envelope.error.message)
            .unwrap_or(body);
        return Err(miette::miette!("API returned {status}: {message}"));
    }

    serde_json::from_str(&body)
        .into_diagnostic()
        .wrap_err("Could not decode response body")
}
