use chattax_core::error::AppError;

/// Bi-encoder boundary: turns free text into a fixed-dimension vector.
///
/// Queries must be embedded with the exact model the corpus index was built
/// with; `CorpusIndex::load` rejects a mismatched model at startup.
pub trait Embedder {
    fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, AppError>;
}

pub mod ollama_embed;

pub use ollama_embed::OllamaEmbedder;
