use std::env;
use std::path::PathBuf;

/// Application settings, loaded from `CHATTAX_*` environment variables with
/// defaults suitable for a local dev setup.
///
/// The embedding model here must be the exact model the corpus index was
/// built with; `CorpusIndex::load` enforces that against the manifest.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory holding manifest.json, vectors.json and metadata.json.
    pub corpus_dir: PathBuf,
    /// Ollama server for embeddings and generation. Localhost only.
    pub ollama_base_url: String,
    pub embedding_model: String,
    pub generation_model: String,
    /// Cross-encoder scoring endpoint (text-embeddings-inference style).
    pub rerank_base_url: String,
    pub rerank_model: String,
    /// Final result size when the caller does not specify one.
    pub default_top_k: usize,
    /// Stage-1 fetch size when reranking is requested.
    pub default_initial_retrieval_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            corpus_dir: PathBuf::from("data/corpus_index"),
            ollama_base_url: "http://127.0.0.1:11434".to_string(),
            embedding_model: "all-minilm".to_string(),
            generation_model: "llama3.1".to_string(),
            rerank_base_url: "http://127.0.0.1:8087".to_string(),
            rerank_model: "cross-encoder/ms-marco-MiniLM-L-6-v2".to_string(),
            default_top_k: 5,
            default_initial_retrieval_size: 20,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let mut s = Self::default();
        if let Ok(v) = env::var("CHATTAX_CORPUS_DIR") {
            s.corpus_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("CHATTAX_OLLAMA_BASE_URL") {
            s.ollama_base_url = v;
        }
        if let Ok(v) = env::var("CHATTAX_EMBEDDING_MODEL") {
            s.embedding_model = v;
        }
        if let Ok(v) = env::var("CHATTAX_GENERATION_MODEL") {
            s.generation_model = v;
        }
        if let Ok(v) = env::var("CHATTAX_RERANK_BASE_URL") {
            s.rerank_base_url = v;
        }
        if let Ok(v) = env::var("CHATTAX_RERANK_MODEL") {
            s.rerank_model = v;
        }
        if let Ok(v) = env::var("CHATTAX_TOP_K") {
            if let Ok(n) = v.parse::<usize>() {
                s.default_top_k = n.max(1);
            }
        }
        if let Ok(v) = env::var("CHATTAX_INITIAL_RETRIEVAL_SIZE") {
            if let Ok(n) = v.parse::<usize>() {
                s.default_initial_retrieval_size = n.max(1);
            }
        }
        s
    }
}
