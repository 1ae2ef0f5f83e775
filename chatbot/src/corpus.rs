//! Load → split → embed → index, once per process.

use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use futures::{stream, StreamExt};
use miette::{miette, Context, Result};
use tokio::sync::OnceCell;
use tracing::{debug, info};

pub use self::index::{CorpusIndex, ScoredChunk};
pub use self::loader::{TextSource, WebLoader};
pub use self::splitter::TextSplitter;

mod index;
mod loader;
mod splitter;

pub const CONCURRENT_REQUESTS: usize = 5;
pub const EMBEDDING_BATCH_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub source: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: usize,
    pub source: String,
    pub text: String,
}

#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn load(&self) -> Result<Document>;
}

/// Turns texts into vectors, one per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>>;
}

/// Builds the corpus index on first use and hands out the same one after.
///
/// A failed build is not remembered; the next caller tries again.
pub struct CorpusIndexer {
    source: Arc<dyn DocumentSource>,
    embedder: Arc<dyn Embedder>,
    splitter: TextSplitter,
    index: OnceCell<Arc<CorpusIndex>>,
}

impl CorpusIndexer {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        embedder: Arc<dyn Embedder>,
        splitter: TextSplitter,
    ) -> Self {
        Self {
            source,
            embedder,
            splitter,
            index: OnceCell::new(),
        }
    }

    pub async fn index(&self) -> Result<Arc<CorpusIndex>> {
        self.index
            .get_or_try_init(|| self.build())
            .await
            .map(Arc::clone)
    }

    /// The `k` chunks nearest to `query`.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let index = self.index().await?;

        let mut vectors = self
            .embedder
            .embed(vec![query.to_owned()])
            .await
            .wrap_err("Could not embed query")?;
        let vector = vectors
            .pop()
            .ok_or_else(|| miette!("embedder returned no vector for the query"))?;

        index.search(&vector, k)
    }

    async fn build(&self) -> Result<Arc<CorpusIndex>> {
        let started = Instant::now();

        let document = self.source.load().await?;
        let chunks = self.splitter.split(&document);
        if chunks.is_empty() {
            return Err(miette!("{} contained no text to index", document.source));
        }
        debug!(source = %document.source, chunks = chunks.len(), "document split");

        let embeddings = embed_chunks(self.embedder.as_ref(), &chunks)
            .await
            .wrap_err("Could not embed corpus")?;
        let index = CorpusIndex::build(chunks, embeddings)?;

        info!(
            source = %document.source,
            chunks = index.len(),
            dimensions = index.dimensions(),
            elapsed = ?started.elapsed(),
            "corpus indexed"
        );

        Ok(Arc::new(index))
    }
}

async fn embed_chunks(embedder: &dyn Embedder, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
    let batches: Vec<Vec<String>> = chunks
        .chunks(EMBEDDING_BATCH_SIZE)
        .map(|batch| batch.iter().map(|c| c.text.clone()).collect())
        .collect();

    let results: Vec<Result<Vec<Vec<f32>>>> = stream::iter(batches)
        .map(|batch| embedder.embed(batch))
        .buffered(CONCURRENT_REQUESTS)
        .collect()
        .await;

    let mut embeddings = Vec::with_capacity(chunks.len());
    for batch in results {
        embeddings.extend(batch?);
    }
    Ok(embeddings)
}
