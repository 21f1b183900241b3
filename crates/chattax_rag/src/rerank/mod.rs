use std::sync::RwLock;

use chattax_core::error::AppError;

use crate::retrieve::Candidate;

pub mod http_scorer;

pub use http_scorer::HttpPairScorer;

/// Joint query/document scoring boundary (the expensive cross-encoder call).
/// Returns one score per input text, in input order.
pub trait PairScorer: Send + Sync {
    fn score(&self, query: &str, texts: &[&str]) -> Result<Vec<f32>, AppError>;
}

/// Precision reordering of a stage-1 candidate list.
///
/// Infallible by contract: a strategy that cannot score must degrade to the
/// stage-1 order internally rather than surface an error, so reranking is
/// never a single point of failure for answering.
pub trait RerankStrategy: Send + Sync {
    fn rerank(&self, query: &str, candidates: Vec<Candidate>, top_k: usize) -> Vec<Candidate>;
    fn name(&self) -> &'static str;
}

/// Cross-encoder reranking over a [`PairScorer`].
pub struct CrossEncoderReranker {
    scorer: Box<dyn PairScorer>,
}

impl CrossEncoderReranker {
    pub fn new(scorer: Box<dyn PairScorer>) -> Self {
        Self { scorer }
    }
}

impl RerankStrategy for CrossEncoderReranker {
    fn rerank(&self, query: &str, candidates: Vec<Candidate>, top_k: usize) -> Vec<Candidate> {
        if candidates.is_empty() {
            return candidates;
        }

        let texts: Vec<&str> = candidates.iter().map(|c| c.chunk.text.as_str()).collect();
        let scores = match self.scorer.score(query, &texts) {
            Ok(scores) if scores.len() == candidates.len() => scores,
            Ok(scores) => {
                tracing::error!(
                    expected = candidates.len(),
                    got = scores.len(),
                    "cross-encoder returned wrong score count; falling back to similarity order"
                );
                return truncate_in_stage1_order(candidates, top_k);
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "cross-encoder scoring failed; falling back to similarity order"
                );
                return truncate_in_stage1_order(candidates, top_k);
            }
        };

        let mut ranked = candidates;
        for (candidate, score) in ranked.iter_mut().zip(scores) {
            candidate.rerank_score = Some(score);
        }
        // Stable sort: ties keep their stage-1 rank.
        ranked.sort_by(|a, b| {
            b.rerank_score
                .partial_cmp(&a.rerank_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(top_k);
        tracing::debug!(returned = ranked.len(), "reranked candidates");
        ranked
    }

    fn name(&self) -> &'static str {
        "cross_encoder"
    }
}

/// Keeps the stage-1 similarity order and simply truncates.
pub struct PassThroughReranker;

impl RerankStrategy for PassThroughReranker {
    fn rerank(&self, _query: &str, candidates: Vec<Candidate>, top_k: usize) -> Vec<Candidate> {
        tracing::debug!(top_k, "pass-through reranker: keeping similarity order");
        truncate_in_stage1_order(candidates, top_k)
    }

    fn name(&self) -> &'static str {
        "pass_through"
    }
}

fn truncate_in_stage1_order(mut candidates: Vec<Candidate>, top_k: usize) -> Vec<Candidate> {
    candidates.truncate(top_k);
    candidates
}

/// Holds the active strategy. Read-mostly and shared across requests; the
/// lock exists only so the strategy can be swapped at runtime.
pub struct RerankerService {
    strategy: RwLock<Box<dyn RerankStrategy>>,
}

impl RerankerService {
    pub fn new(strategy: Box<dyn RerankStrategy>) -> Self {
        Self {
            strategy: RwLock::new(strategy),
        }
    }

    /// Build the default cross-encoder service, degrading to pass-through
    /// when the scoring endpoint is not reachable at construction time.
    pub fn from_settings(rerank_base_url: &str, rerank_model: &str) -> Self {
        match HttpPairScorer::new(rerank_base_url, rerank_model) {
            Ok(scorer) => {
                if let Err(e) = scorer.health_check() {
                    tracing::warn!(
                        error = %e,
                        "rerank endpoint unavailable; using pass-through reranker"
                    );
                    return Self::new(Box::new(PassThroughReranker));
                }
                tracing::info!(model = scorer.model(), "loaded cross-encoder reranker");
                Self::new(Box::new(CrossEncoderReranker::new(Box::new(scorer))))
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "invalid rerank endpoint; using pass-through reranker"
                );
                Self::new(Box::new(PassThroughReranker))
            }
        }
    }

    pub fn rerank_documents(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
        top_k: usize,
    ) -> Vec<Candidate> {
        let guard = self
            .strategy
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.rerank(query, candidates, top_k)
    }

    /// Swap the strategy at runtime.
    pub fn set_strategy(&self, strategy: Box<dyn RerankStrategy>) {
        tracing::info!(strategy = strategy.name(), "switched reranker strategy");
        let mut guard = self
            .strategy
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = strategy;
    }

    pub fn strategy_name(&self) -> &'static str {
        let guard = self
            .strategy
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.name()
    }
}
