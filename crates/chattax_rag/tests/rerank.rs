mod common;

use chattax_core::error::{codes, AppError};
use chattax_rag::rerank::{
    CrossEncoderReranker, PairScorer, PassThroughReranker, RerankStrategy, RerankerService,
};
use chattax_rag::retrieve::Candidate;
use common::chunk;
use pretty_assertions::assert_eq;

fn candidates(specs: &[(&str, f32)]) -> Vec<Candidate> {
    specs
        .iter()
        .map(|(id, sim)| Candidate {
            chunk: chunk(id, id, "https://www.ato.gov.au/x/y", &format!("text of {id}")),
            similarity_score: *sim,
            rerank_score: None,
        })
        .collect()
}

/// Returns a fixed score per call position.
struct FixedScorer(Vec<f32>);

impl PairScorer for FixedScorer {
    fn score(&self, _query: &str, texts: &[&str]) -> Result<Vec<f32>, AppError> {
        assert_eq!(texts.len(), self.0.len());
        Ok(self.0.clone())
    }
}

struct FailingScorer;

impl PairScorer for FailingScorer {
    fn score(&self, _query: &str, _texts: &[&str]) -> Result<Vec<f32>, AppError> {
        Err(AppError::new(codes::RERANK_FAILED, "inference error"))
    }
}

#[test]
fn rerank_orders_by_score_descending_and_truncates() {
    let reranker = CrossEncoderReranker::new(Box::new(FixedScorer(vec![0.1, 2.5, 1.3])));
    let ranked = reranker.rerank("q", candidates(&[("c1", 0.9), ("c2", 0.8), ("c3", 0.7)]), 2);

    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].chunk.chunk_id, "c2");
    assert_eq!(ranked[1].chunk.chunk_id, "c3");
    assert_eq!(ranked[0].rerank_score, Some(2.5));
    let scores: Vec<f32> = ranked.iter().map(|c| c.rerank_score.unwrap_or_default()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn ties_keep_the_stage1_order() {
    let reranker = CrossEncoderReranker::new(Box::new(FixedScorer(vec![1.0, 1.0, 1.0])));
    let ranked = reranker.rerank("q", candidates(&[("c1", 0.9), ("c2", 0.8), ("c3", 0.7)]), 3);

    let ids: Vec<&str> = ranked.iter().map(|c| c.chunk.chunk_id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c2", "c3"]);
}

#[test]
fn fewer_documents_than_top_k_scores_them_all() {
    let reranker = CrossEncoderReranker::new(Box::new(FixedScorer(vec![0.4, 0.6])));
    let ranked = reranker.rerank("q", candidates(&[("c1", 0.9), ("c2", 0.8)]), 5);

    assert_eq!(ranked.len(), 2);
    assert!(ranked.iter().all(|c| c.rerank_score.is_some()));
}

#[test]
fn scorer_failure_falls_back_to_stage1_truncation() {
    let reranker = CrossEncoderReranker::new(Box::new(FailingScorer));
    let ranked = reranker.rerank("q", candidates(&[("c1", 0.9), ("c2", 0.8), ("c3", 0.7)]), 2);

    let ids: Vec<&str> = ranked.iter().map(|c| c.chunk.chunk_id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c2"]);
    assert!(ranked.iter().all(|c| c.rerank_score.is_none()));
}

#[test]
fn empty_candidate_list_stays_empty() {
    let reranker = CrossEncoderReranker::new(Box::new(FailingScorer));
    assert!(reranker.rerank("q", Vec::new(), 5).is_empty());
}

#[test]
fn pass_through_preserves_order_and_truncates() {
    let reranker = PassThroughReranker;
    let ranked = reranker.rerank("q", candidates(&[("c1", 0.9), ("c2", 0.8), ("c3", 0.7)]), 2);

    let ids: Vec<&str> = ranked.iter().map(|c| c.chunk.chunk_id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c2"]);
    assert!(ranked.iter().all(|c| c.rerank_score.is_none()));
}

#[test]
fn service_swaps_strategies_at_runtime() {
    let service = RerankerService::new(Box::new(CrossEncoderReranker::new(Box::new(
        FixedScorer(vec![0.0, 5.0]),
    ))));
    assert_eq!(service.strategy_name(), "cross_encoder");

    let ranked = service.rerank_documents("q", candidates(&[("c1", 0.9), ("c2", 0.8)]), 2);
    assert_eq!(ranked[0].chunk.chunk_id, "c2");

    service.set_strategy(Box::new(PassThroughReranker));
    assert_eq!(service.strategy_name(), "pass_through");

    let ranked = service.rerank_documents("q", candidates(&[("c1", 0.9), ("c2", 0.8)]), 2);
    assert_eq!(ranked[0].chunk.chunk_id, "c1");
}
