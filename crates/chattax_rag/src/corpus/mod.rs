pub mod index;
pub mod model;
pub mod similarity;

pub use index::CorpusIndex;
pub use model::{ChunkRecord, CorpusStats, CrawlDateRange, DistanceMetric, IndexManifest};
