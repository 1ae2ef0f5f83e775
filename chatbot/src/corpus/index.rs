use std::fmt;

use instant_distance::{Builder, HnswMap, Point, Search};
use miette::{miette, Result};

use super::Chunk;

/// Embedding compared by cosine distance.
#[derive(Clone, Debug)]
pub struct EmbeddingPoint(Vec<f32>);

impl Point for EmbeddingPoint {
    fn distance(&self, other: &Self) -> f32 {
        let dot = self.0.iter().zip(&other.0).map(|(a, b)| a * b).sum::<f32>();
        let norm_a = self.0.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b = other.0.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            1.0
        } else {
            1.0 - dot / (norm_a * norm_b)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Cosine distance to the query; lower is closer.
    pub distance: f32,
}

/// Read-only similarity index over the chunks of one corpus.
pub struct CorpusIndex {
    chunks: Vec<Chunk>,
    map: HnswMap<EmbeddingPoint, usize>,
    dimensions: usize,
}

impl fmt::Debug for CorpusIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorpusIndex")
            .field("len", &self.len())
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

impl CorpusIndex {
    pub fn build(chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.is_empty() {
            return Err(miette!("cannot index an empty corpus"));
        }
        if chunks.len() != embeddings.len() {
            return Err(miette!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            ));
        }

        let dimensions = embeddings[0].len();
        if let Some(bad) = embeddings.iter().position(|e| e.len() != dimensions) {
            return Err(miette!(
                "embedding {bad} has {} dimensions, expected {dimensions}",
                embeddings[bad].len()
            ));
        }

        let points = embeddings.into_iter().map(EmbeddingPoint).collect();
        let values = (0..chunks.len()).collect();
        let map = Builder::default().build(points, values);

        Ok(Self {
            chunks,
            map,
            dimensions,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Up to `k` chunks closest to `query`, nearest first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if query.len() != self.dimensions {
            return Err(miette!(
                "query has {} dimensions, index has {}",
                query.len(),
                self.dimensions
            ));
        }

        let query = EmbeddingPoint(query.to_vec());
        let mut search = Search::default();
        Ok(self
            .map
            .search(&query, &mut search)
            .take(k)
            .map(|item| ScoredChunk {
                chunk: self.chunks[*item.value].clone(),
                distance: item.distance,
            })
            .collect())
    }
}
