use std::sync::{Arc, OnceLock};

use chattax_core::error::{codes, AppError};
use serde::{Deserialize, Serialize};

use crate::confidence;
use crate::corpus::{similarity, ChunkRecord, CorpusIndex, DistanceMetric};
use crate::embeddings::Embedder;
use crate::rerank::RerankerService;

/// A chunk annotated with per-query relevance scores. Created per request,
/// discarded once the response is out; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    #[serde(flatten)]
    pub chunk: ChunkRecord,
    /// Bi-encoder similarity in [0, 1], comparable only within one query.
    pub similarity_score: f32,
    /// Cross-encoder score; unbounded, present only when stage 2 ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub candidates: Vec<Candidate>,
    pub confidence: f64,
}

impl RetrievalResult {
    pub fn empty() -> Self {
        Self {
            candidates: Vec::new(),
            confidence: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Endpoint configuration for the lazily-built reranker.
#[derive(Debug, Clone)]
pub struct RerankConfig {
    pub base_url: String,
    pub model: String,
}

/// Two-stage retrieval orchestrator: embedding-index search, then optional
/// cross-encoder reranking, then confidence scoring.
///
/// One instance serves the whole process. The index is read-only after load;
/// the reranker is built at most once on first use (`OnceLock`), so
/// concurrent first requests cannot load the model twice.
pub struct Retriever {
    index: Arc<CorpusIndex>,
    embedder: Box<dyn Embedder + Send + Sync>,
    embedding_model: String,
    rerank_config: RerankConfig,
    reranker: OnceLock<RerankerService>,
}

impl Retriever {
    pub fn new(
        index: Arc<CorpusIndex>,
        embedder: Box<dyn Embedder + Send + Sync>,
        embedding_model: impl Into<String>,
        rerank_config: RerankConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            embedding_model: embedding_model.into(),
            rerank_config,
            reranker: OnceLock::new(),
        }
    }

    /// Pre-install a reranker service instead of the lazily-built default.
    pub fn with_reranker(self, service: RerankerService) -> Self {
        let _ = self.reranker.set(service);
        self
    }

    pub fn index(&self) -> &CorpusIndex {
        &self.index
    }

    fn reranker(&self) -> &RerankerService {
        self.reranker.get_or_init(|| {
            RerankerService::from_settings(&self.rerank_config.base_url, &self.rerank_config.model)
        })
    }

    /// Two-stage retrieval.
    ///
    /// Stage-1 fetch size is `initial_candidates` when reranking is
    /// requested, else exactly `top_k`, clamped to the corpus size. An empty
    /// stage-1 result is a normal outcome: the caller gets an empty
    /// `RetrievalResult` with confidence 0 and answers with a fixed fallback.
    pub fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        use_reranking: bool,
        initial_candidates: usize,
    ) -> Result<RetrievalResult, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::new(
                codes::RETRIEVAL_FAILED,
                "Query must not be empty",
            ));
        }

        let fetch = if use_reranking { initial_candidates } else { top_k };
        let fetch = fetch.min(self.index.row_count());
        tracing::debug!(fetch, top_k, use_reranking, "running stage-1 retrieval");

        let mut query_vector = self.embedder.embed(&self.embedding_model, query)?;
        if self.index.metric() == DistanceMetric::NormalizedCosine {
            similarity::normalize(&mut query_vector);
        }

        let hits = self.index.search(&query_vector, fetch)?;

        let mut candidates: Vec<Candidate> = Vec::with_capacity(hits.len());
        for (row, distance) in hits {
            // Negative rows are "no result" sentinels, not errors.
            if row < 0 {
                continue;
            }
            let Some(chunk) = self.index.chunk_at(row as usize) else {
                continue;
            };
            candidates.push(Candidate {
                chunk: chunk.clone(),
                similarity_score: self.index.similarity_from_distance(distance),
                rerank_score: None,
            });
        }

        if candidates.is_empty() {
            tracing::info!("stage-1 retrieval matched nothing; returning empty result");
            return Ok(RetrievalResult::empty());
        }
        tracing::debug!(count = candidates.len(), "stage-1 candidates");

        let final_candidates = if use_reranking {
            self.reranker().rerank_documents(query, candidates, top_k)
        } else {
            let mut c = candidates;
            c.truncate(top_k);
            c
        };

        let confidence = confidence::score(&final_candidates);
        Ok(RetrievalResult {
            candidates: final_candidates,
            confidence,
        })
    }
}
