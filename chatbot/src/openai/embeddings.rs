use async_trait::async_trait;
use miette::{miette, Result};
use serde::{Deserialize, Serialize};

use super::Client;
use crate::corpus::Embedder;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct EmbeddingsRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

impl EmbeddingResponse {
    /// Vectors in input order, whatever order the API listed them in.
    fn into_vectors(mut self, expected: usize) -> Result<Vec<Vec<f32>>> {
        if self.data.len() != expected {
            return Err(miette!(
                "embeddings response had {} vectors for {expected} inputs",
                self.data.len()
            ));
        }

        self.data.sort_by_key(|d| d.index);
        Ok(self.data.into_iter().map(|d| d.embedding).collect())
    }
}

impl Client {
    pub(crate) async fn embeddings(&self, input: &[String]) -> Result<EmbeddingResponse> {
        let request = EmbeddingsRequest {
            input,
            model: self.model(),
        };

        self.post("embeddings", &request).await
    }
}

#[async_trait]
impl Embedder for Client {
    async fn embed(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = inputs.len();
        self.embeddings(&inputs).await?.into_vectors(expected)
    }
}
