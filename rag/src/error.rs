use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid index file: {0}")]
    IndexFormat(String),

    #[error("index consistency error: {0}")]
    Consistency(String),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("backend reported an error: {0}")]
    Backend(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),
}

impl RagError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors that must stop the process before it serves any question.
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Io { .. } | Self::IndexFormat(_) | Self::Consistency(_)
        )
    }
}
