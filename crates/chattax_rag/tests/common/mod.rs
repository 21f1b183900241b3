#![allow(dead_code)]

use std::fs;
use std::path::Path;

use chattax_core::error::AppError;
use chattax_rag::corpus::ChunkRecord;
use chattax_rag::embeddings::Embedder;
use serde_json::json;

/// Write a corpus directory (manifest + vectors + metadata) the way the
/// offline builder would. Vectors are expected pre-normalized when the
/// metric is `normalized_cosine`.
pub fn write_corpus(
    dir: &Path,
    model: &str,
    metric: &str,
    dimension: u32,
    vectors: &[Vec<f32>],
    chunks: &[ChunkRecord],
) {
    let manifest = json!({
        "embedding_model": model,
        "dimension": dimension,
        "metric": metric,
        "built_at": "2025-07-01T00:00:00Z",
    });
    fs::write(
        dir.join("manifest.json"),
        serde_json::to_string_pretty(&manifest).expect("manifest"),
    )
    .expect("write manifest");
    fs::write(
        dir.join("vectors.json"),
        serde_json::to_string(&vectors).expect("vectors"),
    )
    .expect("write vectors");
    fs::write(
        dir.join("metadata.json"),
        serde_json::to_string_pretty(&chunks).expect("metadata"),
    )
    .expect("write metadata");
}

pub fn chunk(chunk_id: &str, doc_id: &str, source_url: &str, text: &str) -> ChunkRecord {
    ChunkRecord {
        chunk_id: chunk_id.to_string(),
        doc_id: doc_id.to_string(),
        source_url: source_url.to_string(),
        section_heading: format!("Section for {chunk_id}"),
        text: text.to_string(),
        tokens_est: text.split_whitespace().count() as u32,
        is_table_summary: false,
        table_ref: None,
        provenance: "ato.gov.au crawl".to_string(),
        crawl_date: "2025-07-01".to_string(),
        last_updated_on_page: None,
    }
}

/// Deterministic 2-d embedder: counts of 'a' and 'b' in the input, so tests
/// control similarity exactly (the retriever normalizes for cosine corpora).
pub struct CountAbEmbedder;

impl Embedder for CountAbEmbedder {
    fn embed(&self, _model: &str, text: &str) -> Result<Vec<f32>, AppError> {
        let mut a = 0u32;
        let mut b = 0u32;
        for ch in text.chars() {
            if ch == 'a' {
                a += 1;
            } else if ch == 'b' {
                b += 1;
            }
        }
        Ok(vec![a as f32, b as f32])
    }
}

/// Embedder whose output dimension never matches any index.
pub struct WrongDimsEmbedder;

impl Embedder for WrongDimsEmbedder {
    fn embed(&self, _model: &str, _text: &str) -> Result<Vec<f32>, AppError> {
        Ok(vec![1.0, 0.0, 0.0])
    }
}
