//! Flat (brute-force) nearest-neighbour index over squared Euclidean distance.
//!
//! The corpus is small enough that exact search over every row is cheap, and the index
//! is never mutated after startup.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::info;

use crate::chunk_text::Chunks;
use crate::embed_chunks::{embed_texts, Embedder};
use crate::error::{RagError, Result};

const MAGIC: &[u8; 8] = b"RAGFLAT1";
const FORMAT_VERSION: u32 = 1;
const MAX_MODEL_ID_LEN: u32 = 4096;

/// One search result. `row` is `None` when fewer than `k` rows are stored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    pub distance: f32,
    pub row: Option<usize>,
}

impl Neighbor {
    const NOT_FOUND: Self = Self {
        distance: f32::INFINITY,
        row: None,
    };
}

#[derive(Clone, Debug)]
pub struct FlatIndex {
    dim: usize,
    model_id: String,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn from_vectors(model_id: impl Into<String>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        let dim = vectors.first().map(Vec::len).unwrap_or(0);
        if dim == 0 {
            return Err(RagError::Consistency("cannot build an index from empty vectors".into()));
        }
        let mut data = Vec::with_capacity(dim * vectors.len());
        for (row, vector) in vectors.into_iter().enumerate() {
            if vector.len() != dim {
                return Err(RagError::Consistency(format!(
                    "row {row} has dimension {}, expected {dim}",
                    vector.len()
                )));
            }
            data.extend(vector);
        }
        Ok(Self {
            dim,
            model_id: model_id.into(),
            data,
        })
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Returns exactly `k` entries ordered by ascending distance (ties by row);
    /// slots past the stored row count hold the not-found sentinel.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dim {
            return Err(RagError::Consistency(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                self.dim
            )));
        }
        let mut scored: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(row, vector)| Neighbor {
                distance: squared_l2(query, vector),
                row: Some(row),
            })
            .collect();
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.row.cmp(&b.row)));
        scored.truncate(k);
        scored.resize(k, Neighbor::NOT_FOUND);
        Ok(scored)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| RagError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)
            .and_then(|_| writer.flush())
            .map_err(|e| RagError::io(path, e))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| RagError::io(path, e))?;
        Self::read_from(&mut BufReader::new(file))
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_all(MAGIC)?;
        w.write_u32::<LittleEndian>(FORMAT_VERSION)?;
        w.write_u32::<LittleEndian>(self.dim as u32)?;
        w.write_u64::<LittleEndian>(self.len() as u64)?;
        w.write_u32::<LittleEndian>(self.model_id.len() as u32)?;
        w.write_all(self.model_id.as_bytes())?;
        for value in &self.data {
            w.write_f32::<LittleEndian>(*value)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mut magic = [0u8; 8];
        r.read_exact(&mut magic).map_err(truncated)?;
        if &magic != MAGIC {
            return Err(RagError::IndexFormat("bad magic".into()));
        }
        let version = r.read_u32::<LittleEndian>().map_err(truncated)?;
        if version != FORMAT_VERSION {
            return Err(RagError::IndexFormat(format!("unsupported version {version}")));
        }
        let dim = r.read_u32::<LittleEndian>().map_err(truncated)? as usize;
        let rows = r.read_u64::<LittleEndian>().map_err(truncated)? as usize;
        if dim == 0 || rows == 0 {
            return Err(RagError::IndexFormat("index is empty".into()));
        }
        let id_len = r.read_u32::<LittleEndian>().map_err(truncated)?;
        if id_len > MAX_MODEL_ID_LEN {
            return Err(RagError::IndexFormat(format!("model id length {id_len} too large")));
        }
        let mut id = vec![0u8; id_len as usize];
        r.read_exact(&mut id).map_err(truncated)?;
        let model_id = String::from_utf8(id)
            .map_err(|_| RagError::IndexFormat("model id is not UTF-8".into()))?;

        let len = rows
            .checked_mul(dim)
            .ok_or_else(|| RagError::IndexFormat("row count overflows".into()))?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| RagError::IndexFormat(format!("cannot allocate {rows}x{dim} index")))?;
        data.resize(len, 0.0);
        r.read_f32_into::<LittleEndian>(&mut data).map_err(truncated)?;

        let mut trailing = [0u8; 1];
        if r.read(&mut trailing).map_err(truncated)? != 0 {
            return Err(RagError::IndexFormat("trailing bytes after vectors".into()));
        }
        Ok(Self {
            dim,
            model_id,
            data,
        })
    }
}

/// Encodes every chunk and stores the vectors in chunk order.
pub async fn build_index(embedder: &dyn Embedder, chunks: &Chunks) -> Result<FlatIndex> {
    let vectors = embed_texts(embedder, &chunks.texts()).await?;
    let index = FlatIndex::from_vectors(embedder.model_id(), vectors)?;
    if let Some(expected) = embedder.dimension() {
        if expected != index.dimension() {
            return Err(RagError::Consistency(format!(
                "encoder reports dimension {expected}, produced {}",
                index.dimension()
            )));
        }
    }
    info!(rows = index.len(), dim = index.dimension(), model = index.model_id(), "built flat index");
    Ok(index)
}

/// Checks a loaded index against its paired chunk list and the configured encoder.
pub fn verify_pairing(index: &FlatIndex, chunks: &Chunks, embedder: &dyn Embedder) -> Result<()> {
    if index.len() != chunks.len() {
        return Err(RagError::Consistency(format!(
            "index has {} rows but chunk list has {} entries",
            index.len(),
            chunks.len()
        )));
    }
    let model_id = embedder.model_id();
    if index.model_id() != model_id {
        return Err(RagError::Consistency(format!(
            "index was built with `{}`, configured encoder is `{model_id}`",
            index.model_id()
        )));
    }
    if let Some(dim) = embedder.dimension() {
        if dim != index.dimension() {
            return Err(RagError::Consistency(format!(
                "index dimension {} does not match encoder dimension {dim}",
                index.dimension()
            )));
        }
    }
    Ok(())
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn truncated(err: std::io::Error) -> RagError {
    RagError::IndexFormat(format!("truncated or unreadable index: {err}"))
}
