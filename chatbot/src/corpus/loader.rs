use async_trait::async_trait;
use miette::{Context, IntoDiagnostic, Result};
use reqwest::header::CONTENT_TYPE;
use tracing::info;

use super::{Document, DocumentSource};
use crate::http::http_client;

const TEXT_WIDTH: usize = 120;

/// Fetches a page and keeps its readable text.
pub struct WebLoader {
    url: String,
    http: reqwest::Client,
}

impl WebLoader {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            url: url.into(),
            http: http_client()?,
        })
    }
}

#[async_trait]
impl DocumentSource for WebLoader {
    async fn load(&self) -> Result<Document> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not fetch {}", self.url))?;

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(true, |v| v.contains("html"));

        let body = response
            .text()
            .await
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not read {}", self.url))?;

        let text = if is_html { html_to_text(&body) } else { body };
        info!(url = %self.url, chars = text.len(), "document loaded");

        Ok(Document {
            source: self.url.clone(),
            text,
        })
    }
}

/// Already-loaded text, e.g. a local file.
pub struct TextSource {
    document: Document,
}

impl TextSource {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            document: Document {
                source: source.into(),
                text: text.into(),
            },
        }
    }
}

#[async_trait]
impl DocumentSource for TextSource {
    async fn load(&self) -> Result<Document> {
        Ok(self.document.clone())
    }
}

pub(crate) fn html_to_text(html: &str) -> String {
    html2text::from_read(html.as_bytes(), TEXT_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_markup_is_dropped() {
        let text = html_to_text(
            "<html><body><h1>LangSmith</h1><p>Trace <b>every</b> run.</p></body></html>",
        );

        assert!(text.contains("LangSmith"));
        assert!(text.contains("every"));
        assert!(!text.contains("<p>"));
        assert!(!text.contains("<b>"));
    }

    #[tokio::test]
    async fn text_source_returns_its_document() {
        let source = TextSource::new("notes.txt", "some notes");
        let document = source.load().await.unwrap();

        assert_eq!(document.source, "notes.txt");
        assert_eq!(document.text, "some notes");
    }
}
