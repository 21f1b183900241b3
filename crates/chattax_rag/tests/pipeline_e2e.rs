mod common;

use std::sync::Arc;

use chattax_core::config::Settings;
use chattax_core::error::{codes, AppError};
use chattax_rag::answer::{AnswerStream, FALLBACK_NO_CONTEXT};
use chattax_rag::RagService;
use chattax_rag::corpus::CorpusIndex;
use chattax_rag::llm::{FragmentStream, TextGenerator};
use chattax_rag::rerank::{CrossEncoderReranker, PairScorer, RerankerService};
use chattax_rag::retrieve::{RerankConfig, Retriever};
use common::{chunk, write_corpus, CountAbEmbedder};
use pretty_assertions::assert_eq;

struct OneShotGenerator;

impl TextGenerator for OneShotGenerator {
    fn stream(&self, _model: &str, _prompt: &str) -> Result<FragmentStream, AppError> {
        Ok(Box::new(std::iter::once(Ok(
            "Generated answer.".to_string()
        ))))
    }
}

struct FailingScorer;

impl PairScorer for FailingScorer {
    fn score(&self, _query: &str, _texts: &[&str]) -> Result<Vec<f32>, AppError> {
        Err(AppError::new(codes::RERANK_FAILED, "model unavailable"))
    }
}

fn rerank_config() -> RerankConfig {
    RerankConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        model: "cross-encoder/ms-marco-MiniLM-L-6-v2".to_string(),
    }
}

#[test]
fn empty_corpus_turn_is_exactly_one_fallback_fragment() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_corpus(dir.path(), "all-minilm", "normalized_cosine", 2, &[], &[]);
    let index = Arc::new(CorpusIndex::load(dir.path(), "all-minilm").expect("load"));
    let retriever = Retriever::new(index, Box::new(CountAbEmbedder), "all-minilm", rerank_config());

    let result = retriever.retrieve("aaaa", 5, true, 20).expect("retrieve");
    assert!(result.is_empty());
    assert_eq!(result.confidence, 0.0);

    let fragments: Vec<String> =
        AnswerStream::new(&OneShotGenerator, "llama3.1", "aaaa", &result.candidates).collect();
    // One fallback fragment, then the stream ends: no source block, no
    // confidence fragment.
    assert_eq!(fragments, vec![FALLBACK_NO_CONTEXT.to_string()]);
}

#[test]
fn throwing_reranker_displays_the_stage1_top_k() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_corpus(
        dir.path(),
        "all-minilm",
        "normalized_cosine",
        2,
        &[
            vec![1.0, 0.0],
            vec![0.98, 0.199],
            vec![0.6, 0.8],
            vec![0.28, 0.96],
            vec![0.0, 1.0],
        ],
        &[
            chunk("c1", "d1", "https://www.ato.gov.au/deductions-you-can-claim", "aaaa"),
            chunk("c2", "d2", "https://www.ato.gov.au/lodging-your-tax-return", "aaab"),
            chunk("c3", "d3", "https://www.ato.gov.au/your-notice-of-assessment", "aabb"),
            chunk("c4", "d4", "https://www.ato.gov.au/income-you-must-declare", "abbb"),
            chunk("c5", "d5", "https://www.ato.gov.au/gst", "bbbb"),
        ],
    );
    let index = Arc::new(CorpusIndex::load(dir.path(), "all-minilm").expect("load"));
    let retriever = Retriever::new(index, Box::new(CountAbEmbedder), "all-minilm", rerank_config())
        .with_reranker(RerankerService::new(Box::new(CrossEncoderReranker::new(
            Box::new(FailingScorer),
        ))));

    let result = retriever.retrieve("aaaa", 3, true, 5).expect("retrieve");

    // Five candidates survive stage 1; the reranker throws, so the displayed
    // result set is the first top_k of the similarity-ordered list.
    let ids: Vec<&str> = result
        .candidates
        .iter()
        .map(|c| c.chunk.chunk_id.as_str())
        .collect();
    assert_eq!(ids, vec!["c1", "c2", "c3"]);

    let fragments: Vec<String> =
        AnswerStream::new(&OneShotGenerator, "llama3.1", "aaaa", &result.candidates).collect();
    assert_eq!(fragments[0], "Generated answer.");
    assert!(fragments[2].contains("**Sources:**"));
    assert!(fragments
        .iter()
        .any(|f| f.starts_with("1. [Deductions You Can Claim](")));
    assert!(fragments
        .last()
        .map(|f| f.starts_with("\n*Confidence: "))
        .unwrap_or(false));
}

#[test]
fn service_starts_without_a_model_server_and_fails_per_request() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_corpus(
        dir.path(),
        "all-minilm",
        "normalized_cosine",
        2,
        &[vec![1.0, 0.0]],
        &[chunk("c1", "d1", "https://www.ato.gov.au/gst", "aaaa")],
    );

    let settings = Settings {
        corpus_dir: dir.path().to_path_buf(),
        ollama_base_url: "http://127.0.0.1:9".to_string(),
        rerank_base_url: "http://127.0.0.1:9".to_string(),
        ..Settings::default()
    };

    // An unreachable model server at startup is degraded, not fatal: the
    // corpus still loads and stats still serve.
    let service = RagService::new(settings).expect("service");
    assert_eq!(service.get_stats().vector_count, 1);

    // Each request then surfaces its own transport error.
    let err = service
        .retrieve_documents("gst", None, false, None)
        .expect_err("no embeddings server");
    assert!(err.is_code(codes::EMBEDDINGS_FAILED));
    assert!(err.retryable);
}
