use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chattax_core::error::{codes, AppError};
use time::format_description::well_known::Iso8601;
use time::Date;

use super::model::{ChunkRecord, CorpusStats, CrawlDateRange, DistanceMetric, IndexManifest};
use super::similarity;

/// In-memory embedding index plus its row-aligned metadata table.
///
/// Loaded once at startup from the directory the corpus builder produced and
/// never mutated afterwards, so a single instance is shared across concurrent
/// requests behind an `Arc` without locking.
#[derive(Debug)]
pub struct CorpusIndex {
    root: PathBuf,
    manifest: IndexManifest,
    vectors: Vec<Vec<f32>>,
    metadata: Vec<ChunkRecord>,
    /// Rows usable for search: `min(vectors, metadata)`. Differs from the
    /// file row counts only when the corpus build misaligned them.
    searchable_rows: usize,
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T, AppError> {
    if !path.exists() {
        return Err(AppError::config(format!(
            "Corpus {what} not found; ensure the corpus build output is in place"
        ))
        .with_details(format!("path={}", path.display())));
    }
    let bytes = fs::read(path).map_err(|e| {
        AppError::config(format!("Failed to read corpus {what}"))
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        AppError::config(format!("Failed to decode corpus {what}"))
            .with_details(format!("path={}; err={}", path.display(), e))
    })
}

impl CorpusIndex {
    /// Load and validate the corpus produced by the offline builder.
    ///
    /// All failure modes here are fatal configuration errors: a missing or
    /// undecodable file, a vector whose dimension disagrees with the
    /// manifest, or an index built with a different embedding model than the
    /// one configured for queries. A vector-count/metadata-row-count mismatch
    /// is logged and tolerated by restricting search to the aligned prefix.
    pub fn load(root: impl Into<PathBuf>, expected_model: &str) -> Result<Self, AppError> {
        let root = root.into();
        let manifest: IndexManifest = read_json_file(&root.join("manifest.json"), "manifest")?;
        let vectors: Vec<Vec<f32>> = read_json_file(&root.join("vectors.json"), "vectors")?;
        let metadata: Vec<ChunkRecord> = read_json_file(&root.join("metadata.json"), "metadata")?;

        if manifest.embedding_model != expected_model {
            return Err(AppError::config(
                "Corpus index was built with a different embedding model than configured",
            )
            .with_details(format!(
                "index_model={}; configured_model={}",
                manifest.embedding_model, expected_model
            )));
        }

        for (row, v) in vectors.iter().enumerate() {
            if v.len() as u32 != manifest.dimension {
                return Err(AppError::config("Corpus vector dimension mismatch")
                    .with_details(format!(
                        "row={row}; expected={}; got={}",
                        manifest.dimension,
                        v.len()
                    )));
            }
        }

        let searchable_rows = if vectors.len() != metadata.len() {
            tracing::warn!(
                vector_count = vectors.len(),
                metadata_count = metadata.len(),
                "corpus vectors and metadata rows are misaligned; searching the aligned prefix only"
            );
            vectors.len().min(metadata.len())
        } else {
            vectors.len()
        };

        tracing::info!(
            vector_count = vectors.len(),
            metadata_count = metadata.len(),
            model = %manifest.embedding_model,
            dimension = manifest.dimension,
            "loaded corpus index"
        );

        Ok(Self {
            root,
            manifest,
            vectors,
            metadata,
            searchable_rows,
        })
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn metric(&self) -> DistanceMetric {
        self.manifest.metric
    }

    /// Rows a search can return. Candidate counts are clamped to this.
    pub fn row_count(&self) -> usize {
        self.searchable_rows
    }

    pub fn chunk_at(&self, row: usize) -> Option<&ChunkRecord> {
        self.metadata.get(row)
    }

    /// Nearest-neighbor scan: returns up to `k` `(row, distance)` pairs in
    /// ascending distance order, ties broken by row index. `k` larger than
    /// the corpus returns every row.
    pub fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<(i64, f32)>, AppError> {
        if query_vector.len() as u32 != self.manifest.dimension {
            return Err(AppError::new(
                codes::RETRIEVAL_FAILED,
                "Query embedding dimension does not match the index",
            )
            .with_details(format!(
                "index_dims={}; query_dims={}",
                self.manifest.dimension,
                query_vector.len()
            )));
        }

        let mut hits: Vec<(i64, f32)> = Vec::with_capacity(self.searchable_rows);
        for (row, v) in self.vectors[..self.searchable_rows].iter().enumerate() {
            let distance = match self.manifest.metric {
                DistanceMetric::NormalizedCosine => 1.0 - similarity::dot(query_vector, v),
                DistanceMetric::L2 => similarity::euclidean(query_vector, v),
            };
            hits.push((row as i64, distance));
        }

        hits.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        hits.truncate(k.min(self.searchable_rows));
        Ok(hits)
    }

    /// Convert a search distance into a similarity in [0, 1] under the
    /// corpus metric convention.
    pub fn similarity_from_distance(&self, distance: f32) -> f32 {
        match self.manifest.metric {
            DistanceMetric::NormalizedCosine => (1.0 - distance).clamp(0.0, 1.0),
            DistanceMetric::L2 => 1.0 / (1.0 + distance.max(0.0)),
        }
    }

    pub fn stats(&self) -> CorpusStats {
        let unique_docs: BTreeSet<&str> =
            self.metadata.iter().map(|c| c.doc_id.as_str()).collect();

        CorpusStats {
            status: "initialized".to_string(),
            vector_count: self.vectors.len(),
            metadata_count: self.metadata.len(),
            embedding_dimension: self.manifest.dimension,
            unique_docs: unique_docs.len(),
            crawl_date_range: crawl_date_range(&self.metadata),
            index_path: self.root.display().to_string(),
        }
    }
}

/// Earliest and latest `crawl_date` across the metadata table. Dates are
/// compared as calendar dates when they parse as ISO-8601, lexicographically
/// otherwise.
fn crawl_date_range(metadata: &[ChunkRecord]) -> CrawlDateRange {
    if metadata.is_empty() {
        return CrawlDateRange {
            earliest: "unknown".to_string(),
            latest: "unknown".to_string(),
        };
    }

    let all_parse = metadata
        .iter()
        .all(|c| Date::parse(&c.crawl_date, &Iso8601::DEFAULT).is_ok());

    let (earliest, latest) = if all_parse {
        let mut dates: Vec<(Date, &str)> = metadata
            .iter()
            .map(|c| {
                // Checked above.
                let d = Date::parse(&c.crawl_date, &Iso8601::DEFAULT).unwrap_or(Date::MIN);
                (d, c.crawl_date.as_str())
            })
            .collect();
        dates.sort_by(|a, b| a.0.cmp(&b.0));
        (
            dates.first().map(|d| d.1).unwrap_or("unknown").to_string(),
            dates.last().map(|d| d.1).unwrap_or("unknown").to_string(),
        )
    } else {
        let mut raw: Vec<&str> = metadata.iter().map(|c| c.crawl_date.as_str()).collect();
        raw.sort();
        (
            raw.first().copied().unwrap_or("unknown").to_string(),
            raw.last().copied().unwrap_or("unknown").to_string(),
        )
    };

    CrawlDateRange { earliest, latest }
}
