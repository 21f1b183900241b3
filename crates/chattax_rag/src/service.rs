use std::sync::Arc;

use chattax_core::config::Settings;
use chattax_core::error::AppError;

use crate::answer::AnswerStream;
use crate::corpus::{CorpusIndex, CorpusStats};
use crate::embeddings::OllamaEmbedder;
use crate::llm::{OllamaGenerator, TextGenerator};
use crate::ollama::OllamaClient;
use crate::retrieve::{Candidate, RerankConfig, RetrievalResult, Retriever};

/// Process-wide facade the API layer talks to.
///
/// Construction loads and validates the corpus; every failure there is a
/// fatal configuration error and the process should not start. After that the
/// service is read-only and safe to share across concurrent requests.
pub struct RagService {
    settings: Settings,
    retriever: Retriever,
    generator: Box<dyn TextGenerator>,
}

impl RagService {
    pub fn new(settings: Settings) -> Result<Self, AppError> {
        let index = Arc::new(CorpusIndex::load(
            settings.corpus_dir.clone(),
            &settings.embedding_model,
        )?);
        let client = OllamaClient::new(&settings.ollama_base_url)?;
        // Degraded, not fatal: the model server can come up after we do, and
        // every request surfaces its own transport error anyway.
        match client.health_check() {
            Ok(()) => tracing::info!(base_url = client.base_url(), "Ollama reachable"),
            Err(e) => tracing::warn!(
                error = %e,
                "Ollama not reachable at startup; requests will fail until it is up"
            ),
        }
        let embedder = Box::new(OllamaEmbedder::new(client.clone()));
        let generator = Box::new(OllamaGenerator::new(client));

        let retriever = Retriever::new(
            index,
            embedder,
            settings.embedding_model.clone(),
            RerankConfig {
                base_url: settings.rerank_base_url.clone(),
                model: settings.rerank_model.clone(),
            },
        );

        Ok(Self {
            settings,
            retriever,
            generator,
        })
    }

    /// Synchronous two-stage retrieval. `top_k` and `initial_retrieval_size`
    /// fall back to the configured defaults when not given.
    pub fn retrieve_documents(
        &self,
        query: &str,
        top_k: Option<usize>,
        use_reranking: bool,
        initial_retrieval_size: Option<usize>,
    ) -> Result<RetrievalResult, AppError> {
        let top_k = top_k.unwrap_or(self.settings.default_top_k);
        let initial =
            initial_retrieval_size.unwrap_or(self.settings.default_initial_retrieval_size);
        self.retriever.retrieve(query, top_k, use_reranking, initial)
    }

    /// Streamed answer for one chat turn over an already-retrieved result.
    pub fn stream_answer(&self, question: &str, candidates: &[Candidate]) -> AnswerStream {
        AnswerStream::new(
            self.generator.as_ref(),
            &self.settings.generation_model,
            question,
            candidates,
        )
    }

    pub fn get_stats(&self) -> CorpusStats {
        self.retriever.index().stats()
    }
}
