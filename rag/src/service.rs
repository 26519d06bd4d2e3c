use std::sync::Arc;

use tracing::{info, warn};

use crate::answer_cache::AnswerCache;
use crate::build_prompt::{PromptBuilder, PromptMode, GREETING_PROMPT};
use crate::chunk_text::{chunk_text, Chunks, ChunkingPolicy};
use crate::config::Config;
use crate::embed_chunks::{build_embedder, EmbedBackend, Embedder};
use crate::error::Result;
use crate::generate::GenerationClient;
use crate::http::build_client;
use crate::retrieve_chunks::{Hit, Retriever};
use crate::scan_files::load_corpus;
use crate::stream_decode::FragmentStream;
use crate::token_budget::{TokenBudgeter, TruncationSide};
use crate::vector_index::{build_index, FlatIndex};

/// Long-lived question answering service. Built once at startup and shared by handle.
pub struct RagService {
    config: Config,
    retriever: Retriever,
    budgeter: Arc<TokenBudgeter>,
    prompts: PromptBuilder,
    cache: AnswerCache,
    generator: GenerationClient,
}

impl RagService {
    /// Loads or builds the index. Every error here is a startup failure.
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate()?;
        let client = build_client(config.request_timeout)?;
        let embedder = build_embedder(&config, client.clone());
        let generator = GenerationClient::from_config(&config, client);
        Self::with_parts(config, embedder, generator).await
    }

    /// Like [`RagService::initialize`] with an explicit encoder and backend client.
    pub async fn with_parts(
        config: Config,
        embedder: Arc<dyn Embedder>,
        generator: GenerationClient,
    ) -> Result<Self> {
        let budgeter = Arc::new(TokenBudgeter::new(&config.tokenizer)?);
        let (chunks, index) = load_chunks_and_index(&config, embedder.as_ref()).await?;
        let retriever = Retriever::new(
            chunks,
            index,
            embedder,
            budgeter.clone(),
            config.context_separator.clone(),
        )?;
        info!(
            chunks = retriever.chunks().len(),
            dim = retriever.index().dimension(),
            model = %generator.model(),
            "rag service initialized"
        );
        Ok(Self {
            prompts: PromptBuilder::from_config(&config),
            cache: AnswerCache::new(config.cache_capacity),
            config,
            retriever,
            budgeter,
            generator,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn chunk_count(&self) -> usize {
        self.retriever.chunks().len()
    }

    pub async fn retrieve_top(&self, question: &str) -> Result<Vec<Hit>> {
        self.retriever.retrieve_top(question, self.config.top_k).await
    }

    /// Context for `question`, joined and cut to the context budget.
    pub async fn retrieve(&self, question: &str) -> Result<String> {
        self.retriever
            .retrieve(question, self.config.top_k, self.config.max_context_tokens)
            .await
    }

    /// The exact text sent to the backend for `question`.
    pub async fn prepare_prompt(&self, question: &str, mode: PromptMode) -> Result<String> {
        let context = self.retrieve(question).await?;
        Ok(self.budget_prompt(&context, question, mode))
    }

    fn budget_prompt(&self, context: &str, question: &str, mode: PromptMode) -> String {
        let prompt = self.prompts.build(context, question, mode);
        self.budgeter.count_or_truncate(
            &prompt,
            self.config.max_prompt_tokens,
            self.config.truncation_side,
        )
    }

    /// One-shot answer, memoized by the exact question text.
    pub async fn ask(&self, question: &str) -> Result<String> {
        self.cache
            .get_or_compute(question, || async {
                let prompt = self.prepare_prompt(question, PromptMode::OneShot).await?;
                self.generator.generate(&prompt).await
            })
            .await
    }

    /// Streamed answer. Never cached.
    pub async fn ask_stream(&self, question: &str) -> Result<FragmentStream> {
        let (_, stream) = self.ask_stream_with_context(question).await?;
        Ok(stream)
    }

    /// Streamed answer together with the context it was grounded on.
    pub async fn ask_stream_with_context(&self, question: &str) -> Result<(String, FragmentStream)> {
        let context = self.retrieve(question).await?;
        let prompt = self.budget_prompt(&context, question, PromptMode::Interactive);
        let stream = self.generator.generate_stream(&prompt).await?;
        Ok((context, stream))
    }

    /// Streams the persona greeting shown when a session opens.
    pub async fn greet_stream(&self) -> Result<FragmentStream> {
        let prompt = self.budgeter.count_or_truncate(
            GREETING_PROMPT,
            self.config.max_prompt_tokens,
            TruncationSide::End,
        );
        self.generator.generate_stream(&prompt).await
    }

    pub async fn warm_up(&self) {
        provision_models(&self.config, &self.generator).await;
    }

    pub async fn shutdown(self) {
        info!(cached_answers = self.cache.len().await, "rag service shutting down");
    }
}

/// Triggers model downloads on the backend. Failures are logged and ignored.
pub async fn warm_up(config: &Config) {
    match build_client(config.request_timeout) {
        Ok(client) => {
            let generator = GenerationClient::from_config(config, client);
            provision_models(config, &generator).await;
        }
        Err(err) => warn!(error = %err, "cannot warm up backend"),
    }
}

async fn provision_models(config: &Config, generator: &GenerationClient) {
    let mut models = vec![config.chat_model.as_str()];
    if config.embed_backend == EmbedBackend::Ollama {
        models.push(config.embed_model.as_str());
    }
    for model in models {
        if let Err(err) = generator.pull_model(model).await {
            warn!(model, error = %err, "failed to pull model");
        }
    }
}

/// Precomputed pairs come from disk; the other policies chunk and embed the corpus.
pub async fn load_chunks_and_index(
    config: &Config,
    embedder: &dyn Embedder,
) -> Result<(Chunks, FlatIndex)> {
    match config.chunking {
        ChunkingPolicy::Precomputed => {
            let chunks = Chunks::load_json(&config.chunks_path)?;
            let index = FlatIndex::load(&config.index_path)?;
            info!(
                rows = index.len(),
                path = %config.index_path.display(),
                "loaded persisted index"
            );
            Ok((chunks, index))
        }
        ref policy => {
            let text = load_corpus(&config.corpus_path)?;
            let chunks = chunk_text(&text, policy)?;
            info!(chunks = chunks.len(), "chunked corpus");
            let index = build_index(embedder, &chunks).await?;
            Ok((chunks, index))
        }
    }
}

/// Chunks and embeds the corpus with `policy`, then writes the persisted index pair.
/// Returns the number of rows written.
pub async fn index_corpus(config: &Config, policy: &ChunkingPolicy) -> Result<usize> {
    let client = build_client(config.request_timeout)?;
    let embedder = build_embedder(config, client);
    let text = load_corpus(&config.corpus_path)?;
    let chunks = chunk_text(&text, policy)?;
    let index = build_index(embedder.as_ref(), &chunks).await?;
    index.save(&config.index_path)?;
    chunks.save_json(&config.chunks_path)?;
    info!(
        rows = index.len(),
        index = %config.index_path.display(),
        chunks = %config.chunks_path.display(),
        "persisted index"
    );
    Ok(index.len())
}
