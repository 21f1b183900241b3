use serde::{Deserialize, Serialize};

/// One row of the corpus metadata table. Row `i` describes vector `i` of the
/// index; records are immutable at query time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub doc_id: String,
    pub source_url: String,
    pub section_heading: String,
    pub text: String,
    pub tokens_est: u32,
    pub is_table_summary: bool,
    pub table_ref: Option<String>,
    pub provenance: String,
    /// ISO date the page was crawled.
    pub crawl_date: String,
    /// Date shown on the page itself, when the crawler found one.
    pub last_updated_on_page: Option<String>,
}

/// Distance convention the index was built with. One convention per corpus;
/// the similarity formula depends on it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Vectors L2-normalized at build time; distance = 1 - dot, in [0, 2].
    NormalizedCosine,
    /// Plain Euclidean distance on raw vectors.
    L2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexManifest {
    /// Embedding model the vectors were built with. Queries must use the same.
    pub embedding_model: String,
    pub dimension: u32,
    pub metric: DistanceMetric,
    pub built_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrawlDateRange {
    pub earliest: String,
    pub latest: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusStats {
    pub status: String,
    pub vector_count: usize,
    pub metadata_count: usize,
    pub embedding_dimension: u32,
    pub unique_docs: usize,
    pub crawl_date_range: CrawlDateRange,
    pub index_path: String,
}
