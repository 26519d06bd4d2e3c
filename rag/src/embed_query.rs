use crate::embed_chunks::Embedder;
use crate::error::{RagError, Result};

pub async fn embed_query(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    let vecs = embedder.embed(&[text.to_string()]).await?;
    vecs.into_iter()
        .next()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| RagError::Embedding("encoder returned no vector for the question".into()))
}
