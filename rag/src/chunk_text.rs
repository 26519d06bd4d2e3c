use std::fs;
use std::path::Path;
use std::sync::Arc;

use textwrap::{Options, WordSeparator, WordSplitter};

use crate::error::{RagError, Result};

/// Label prefixed to each fixed-width chunk, followed by its 1-based ordinal.
pub const SECTION_LABEL: &str = "Розділ";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChunkingPolicy {
    /// One chunk per blank-line separated segment.
    Paragraph,
    /// Greedy word wrap to at most `width` characters per chunk.
    FixedWidth { width: usize },
    /// Chunks and vectors loaded from a previously persisted pair.
    Precomputed,
}

impl ChunkingPolicy {
    pub fn parse(name: &str, width: usize) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "paragraph" => Ok(Self::Paragraph),
            "fixed" | "fixed-width" => Ok(Self::FixedWidth { width }),
            "precomputed" => Ok(Self::Precomputed),
            other => Err(RagError::Config(format!("unknown chunking policy `{other}`"))),
        }
    }
}

/// A unit of source text addressed by its row in the vector index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    position: usize,
    text: Arc<str>,
}

impl Chunk {
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Ordered chunk sequence; row `i` of the index maps to `chunks[i]`.
#[derive(Clone, Debug, Default)]
pub struct Chunks {
    items: Vec<Chunk>,
}

impl Chunks {
    pub fn new<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = texts
            .into_iter()
            .enumerate()
            .map(|(position, text)| Chunk {
                position,
                text: Arc::from(text.into()),
            })
            .collect();
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&Chunk> {
        self.items.get(row)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.items.iter()
    }

    pub fn texts(&self) -> Vec<String> {
        self.items.iter().map(|c| c.text().to_string()).collect()
    }

    /// Reads a chunk list persisted as an ordered JSON array of strings.
    pub fn load_json(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| RagError::io(path, e))?;
        let texts: Vec<String> = serde_json::from_str(&raw)
            .map_err(|e| RagError::Config(format!("{}: invalid chunk list: {e}", path.display())))?;
        if texts.is_empty() {
            return Err(RagError::Config(format!("{}: chunk list is empty", path.display())));
        }
        Ok(Self::new(texts))
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let body = serde_json::to_string(&self.texts())
            .map_err(|e| RagError::Decode(format!("chunk list encode failed: {e}")))?;
        fs::write(path, body).map_err(|e| RagError::io(path, e))
    }
}

/// Splits raw corpus text with a text-producing policy.
///
/// `Precomputed` is rejected here; those chunks come from [`Chunks::load_json`].
pub fn chunk_text(text: &str, policy: &ChunkingPolicy) -> Result<Chunks> {
    let chunks = match policy {
        ChunkingPolicy::Paragraph => split_paragraphs(text),
        ChunkingPolicy::FixedWidth { width } => wrap_fixed_width(text, *width),
        ChunkingPolicy::Precomputed => {
            return Err(RagError::Config(
                "precomputed chunks are loaded from disk, not split from text".into(),
            ));
        }
    };
    if chunks.is_empty() {
        return Err(RagError::Config("corpus produced no chunks".into()));
    }
    Ok(Chunks::new(chunks))
}

/// Every segment between blank-line separators is kept, empty ones included.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n").map(str::to_string).collect()
}

pub fn wrap_fixed_width(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return Vec::new();
    }

    // Break only at ASCII spaces so hyphenated terms stay whole; overlong words overflow.
    let options = Options::new(width)
        .break_words(false)
        .word_separator(WordSeparator::AsciiSpace)
        .word_splitter(WordSplitter::NoHyphenation);

    textwrap::wrap(&normalized, options)
        .into_iter()
        .enumerate()
        .map(|(i, line)| format!("{} {}:\n{}", SECTION_LABEL, i + 1, line))
        .collect()
}
