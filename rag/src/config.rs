use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::build_prompt::DEFAULT_PERSONA;
use crate::chunk_text::ChunkingPolicy;
use crate::embed_chunks::EmbedBackend;
use crate::error::{RagError, Result};
use crate::generate::ResponseShape;
use crate::token_budget::TruncationSide;

const DEFAULT_LOCAL_OLLAMA_URL: &str = "http://localhost:11434/api";

/// Historical client variants, kept as named starting points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preset {
    /// One-shot answers over the flat `/generate` contract.
    Classic,
    /// Interactive streaming with the markup format hint.
    Streaming,
    /// Chat contract with fewer neighbours and the action marker.
    Chat,
}

impl FromStr for Preset {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classic" => Ok(Self::Classic),
            "streaming" => Ok(Self::Streaming),
            "chat" => Ok(Self::Chat),
            other => Err(RagError::Config(format!("unknown preset `{other}`"))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub active_env: String,
    pub ollama_url: String,
    pub chat_model: String,
    pub response_shape: ResponseShape,
    pub embed_backend: EmbedBackend,
    pub embed_model: String,
    pub hashing_dim: usize,
    pub chunking: ChunkingPolicy,
    pub corpus_path: PathBuf,
    pub index_path: PathBuf,
    pub chunks_path: PathBuf,
    pub top_k: usize,
    pub max_context_tokens: usize,
    pub max_prompt_tokens: usize,
    pub truncation_side: TruncationSide,
    pub tokenizer: String,
    pub context_separator: String,
    pub system_prompt: String,
    pub include_format_hint: bool,
    pub include_action_instruction: bool,
    /// Maximum cached answers; zero means unbounded.
    pub cache_capacity: usize,
    pub request_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            active_env: "local".to_string(),
            ollama_url: DEFAULT_LOCAL_OLLAMA_URL.to_string(),
            chat_model: "phi:2".to_string(),
            response_shape: ResponseShape::Flat,
            embed_backend: EmbedBackend::Ollama,
            embed_model: "nomic-embed-text".to_string(),
            hashing_dim: 384,
            chunking: ChunkingPolicy::Paragraph,
            corpus_path: PathBuf::from("documents/university_texts.txt"),
            index_path: PathBuf::from("documents/index.flat"),
            chunks_path: PathBuf::from("documents/chunks.json"),
            top_k: 8,
            max_context_tokens: 1500,
            max_prompt_tokens: 2048,
            truncation_side: TruncationSide::End,
            tokenizer: "cl100k_base".to_string(),
            context_separator: "\n\n".to_string(),
            system_prompt: DEFAULT_PERSONA.to_string(),
            include_format_hint: true,
            include_action_instruction: false,
            cache_capacity: 1024,
            request_timeout: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env if present so backend and model config work without manual `source .env`.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, applying the preset first and
    /// individual variables on top of it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(preset) = var("RAG_PRESET") {
            cfg.apply_preset(preset.parse()?);
        }

        cfg.active_env = var("ACTIVE_ENV").unwrap_or_else(|| "local".to_string());
        let url_key = if cfg.active_env == "docker" {
            "DOCKER_OLLAMA_URL"
        } else {
            "LOCAL_OLLAMA_URL"
        };
        cfg.ollama_url = var(url_key).ok_or_else(|| {
            RagError::Config(format!(
                "{url_key} is not defined for ACTIVE_ENV={}",
                cfg.active_env
            ))
        })?;
        cfg.ollama_url = cfg.ollama_url.trim_end_matches('/').to_string();

        if let Some(v) = var("MODEL_NAME") {
            cfg.chat_model = v;
        }
        if let Some(v) = var("RAG_RESPONSE_SHAPE") {
            cfg.response_shape = v.parse()?;
        }
        if let Some(v) = var("RAG_EMBED_BACKEND") {
            cfg.embed_backend = v.parse()?;
        }
        if let Some(v) = var("OLLAMA_EMBED_MODEL") {
            cfg.embed_model = v;
        }
        cfg.hashing_dim = parse_or(var("RAG_HASHING_DIM"), "RAG_HASHING_DIM", cfg.hashing_dim)?;

        if let Some(v) = var("RAG_CHUNKING") {
            let width = parse_or(var("RAG_CHUNK_WIDTH"), "RAG_CHUNK_WIDTH", 500)?;
            cfg.chunking = ChunkingPolicy::parse(&v, width)?;
        }
        if let Some(v) = var("RAG_CORPUS_PATH") {
            cfg.corpus_path = PathBuf::from(v);
        }
        if let Some(v) = var("RAG_INDEX_PATH") {
            cfg.index_path = PathBuf::from(v);
        }
        if let Some(v) = var("RAG_CHUNKS_PATH") {
            cfg.chunks_path = PathBuf::from(v);
        }

        cfg.top_k = parse_or(var("RAG_TOP_K"), "RAG_TOP_K", cfg.top_k)?;
        cfg.max_context_tokens = parse_or(
            var("RAG_MAX_CONTEXT_TOKENS"),
            "RAG_MAX_CONTEXT_TOKENS",
            cfg.max_context_tokens,
        )?;
        cfg.max_prompt_tokens = parse_or(
            var("RAG_MAX_PROMPT_TOKENS"),
            "RAG_MAX_PROMPT_TOKENS",
            cfg.max_prompt_tokens,
        )?;
        if let Some(v) = var("RAG_TRUNCATION_SIDE") {
            cfg.truncation_side = v.parse()?;
        }
        if let Some(v) = var("RAG_TOKENIZER") {
            cfg.tokenizer = v;
        }
        if let Some(v) = lookup("RAG_CONTEXT_SEPARATOR").filter(|v| !v.is_empty()) {
            cfg.context_separator = v.replace("\\n", "\n");
        }
        if let Some(v) = var("RAG_SYSTEM_PROMPT") {
            cfg.system_prompt = v;
        }
        cfg.include_format_hint = parse_bool_or(
            var("RAG_FORMAT_HINT"),
            "RAG_FORMAT_HINT",
            cfg.include_format_hint,
        )?;
        cfg.include_action_instruction = parse_bool_or(
            var("RAG_ACTION_INSTRUCTION"),
            "RAG_ACTION_INSTRUCTION",
            cfg.include_action_instruction,
        )?;
        cfg.cache_capacity =
            parse_or(var("RAG_CACHE_CAPACITY"), "RAG_CACHE_CAPACITY", cfg.cache_capacity)?;
        cfg.request_timeout = var("RAG_REQUEST_TIMEOUT_SECS")
            .map(|v| {
                v.trim().parse::<u64>().map(Duration::from_secs).map_err(|_| {
                    RagError::Config(format!("RAG_REQUEST_TIMEOUT_SECS: invalid number `{v}`"))
                })
            })
            .transpose()?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_preset(&mut self, preset: Preset) {
        match preset {
            Preset::Classic => {
                self.response_shape = ResponseShape::Flat;
                self.top_k = 8;
                self.include_format_hint = false;
                self.include_action_instruction = false;
            }
            Preset::Streaming => {
                self.response_shape = ResponseShape::Flat;
                self.top_k = 8;
                self.include_format_hint = true;
                self.include_action_instruction = false;
            }
            Preset::Chat => {
                self.response_shape = ResponseShape::Chat;
                self.top_k = 5;
                self.include_format_hint = true;
                self.include_action_instruction = true;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ollama_url.is_empty() {
            return Err(RagError::Config("Ollama URL is not defined".into()));
        }
        if self.chat_model.trim().is_empty() {
            return Err(RagError::Config("MODEL_NAME must not be empty".into()));
        }
        if self.embed_backend == EmbedBackend::Ollama && self.embed_model.trim().is_empty() {
            return Err(RagError::Config("OLLAMA_EMBED_MODEL must not be empty".into()));
        }
        if self.embed_backend == EmbedBackend::Hashing && self.hashing_dim == 0 {
            return Err(RagError::Config("RAG_HASHING_DIM must be positive".into()));
        }
        if self.top_k == 0 {
            return Err(RagError::Config("RAG_TOP_K must be positive".into()));
        }
        if self.max_prompt_tokens <= self.max_context_tokens {
            return Err(RagError::Config(format!(
                "prompt budget ({}) must exceed context budget ({})",
                self.max_prompt_tokens, self.max_context_tokens
            )));
        }
        if let ChunkingPolicy::FixedWidth { width: 0 } = self.chunking {
            return Err(RagError::Config("RAG_CHUNK_WIDTH must be positive".into()));
        }
        Ok(())
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| RagError::Config(format!("{key}: invalid value `{v}`"))),
        None => Ok(default),
    }
}

fn parse_bool_or(value: Option<String>, key: &str, default: bool) -> Result<bool> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(RagError::Config(format!("{key}: expected a boolean, got `{v}`"))),
        },
    }
}
