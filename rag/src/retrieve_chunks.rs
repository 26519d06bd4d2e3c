use std::sync::Arc;

use tracing::debug;

use crate::chunk_text::{Chunk, Chunks};
use crate::embed_chunks::Embedder;
use crate::embed_query::embed_query;
use crate::error::Result;
use crate::token_budget::{TokenBudgeter, TruncationSide};
use crate::vector_index::{verify_pairing, FlatIndex};

#[derive(Clone, Debug)]
pub struct Hit {
    pub row: usize,
    pub distance: f32,
    pub chunk: Chunk,
}

/// Nearest-neighbour retrieval over a chunk sequence and its paired index.
pub struct Retriever {
    chunks: Chunks,
    index: FlatIndex,
    embedder: Arc<dyn Embedder>,
    budgeter: Arc<TokenBudgeter>,
    separator: String,
}

impl Retriever {
    /// Fails when the index rows, its encoder or its dimension disagree with the chunks
    /// and the configured embedder.
    pub fn new(
        chunks: Chunks,
        index: FlatIndex,
        embedder: Arc<dyn Embedder>,
        budgeter: Arc<TokenBudgeter>,
        separator: impl Into<String>,
    ) -> Result<Self> {
        verify_pairing(&index, &chunks, embedder.as_ref())?;
        Ok(Self {
            chunks,
            index,
            embedder,
            budgeter,
            separator: separator.into(),
        })
    }

    pub fn chunks(&self) -> &Chunks {
        &self.chunks
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    /// Top-`k` chunks, nearest first. No distance threshold is applied.
    pub async fn retrieve_top(&self, question: &str, top_k: usize) -> Result<Vec<Hit>> {
        let query = embed_query(self.embedder.as_ref(), question).await?;
        let neighbors = self.index.search(&query, top_k)?;
        let hits: Vec<Hit> = neighbors
            .into_iter()
            .filter_map(|n| {
                let row = n.row?;
                self.chunks.get(row).map(|chunk| Hit {
                    row,
                    distance: n.distance,
                    chunk: chunk.clone(),
                })
            })
            .collect();
        debug!(
            rows = ?hits.iter().map(|h| h.row).collect::<Vec<_>>(),
            distances = ?hits.iter().map(|h| h.distance).collect::<Vec<_>>(),
            "retrieved {} context chunks",
            hits.len()
        );
        Ok(hits)
    }

    pub async fn retrieve(&self, question: &str, top_k: usize, max_tokens: usize) -> Result<String> {
        let hits = self.retrieve_top(question, top_k).await?;
        let context = format_context_from_hits(&hits, &self.separator);
        let context = self
            .budgeter
            .count_or_truncate(&context, max_tokens, TruncationSide::End);
        debug!(chars = context.chars().count(), "final context length");
        Ok(context)
    }
}

pub fn format_context_from_hits(hits: &[Hit], separator: &str) -> String {
    hits.iter()
        .map(|hit| hit.chunk.text())
        .collect::<Vec<_>>()
        .join(separator)
}
