mod answer_cache;
mod build_prompt;
mod chunk_text;
mod config;
mod embed_chunks;
mod embed_query;
mod error;
mod generate;
mod http;
mod retrieve_chunks;
mod scan_files;
mod service;
mod stream_decode;
mod token_budget;
mod vector_index;

pub use answer_cache::AnswerCache;
pub use build_prompt::{
    strip_action_marker, Message, PromptBuilder, PromptMode, ACTION_MARKER, ANSWER_HEADING,
    CONTEXT_HEADING, DEFAULT_PERSONA, FORMAT_HINT, GROUNDING_INSTRUCTION, QUESTION_HEADING,
};
pub use chunk_text::{
    chunk_text, split_paragraphs, wrap_fixed_width, Chunk, ChunkingPolicy, Chunks, SECTION_LABEL,
};
pub use config::{Config, Preset};
pub use embed_chunks::{
    build_embedder, embed_texts, parse_embeddings, EmbedBackend, Embedder, HashingEmbedder,
    OllamaEmbedder,
};
pub use embed_query::embed_query;
pub use error::{RagError, Result};
pub use generate::{GenerationClient, ResponseShape};
pub use http::build_client;
pub use retrieve_chunks::{format_context_from_hits, Hit, Retriever};
pub use scan_files::load_corpus;
pub use service::{index_corpus, load_chunks_and_index, warm_up, RagService};
pub use stream_decode::{decode_line, decode_stream, FragmentStream, StreamChunk};
pub use token_budget::{TokenBudgeter, TruncationSide};
pub use vector_index::{build_index, verify_pairing, FlatIndex, Neighbor};
