//! Semantic ranking infrastructure for card search.
//!
//! # Architecture
//!
//! - `store`: Locale-keyed embedding files (disk or HTTP)
//! - `cache`: Single-flight in-memory cache of loaded embedding tables
//! - `index`: Exhaustive cosine similarity ranking over candidates
//! - `lexical`: Keyword scoring over localized card text
//! - `hybrid`: Reciprocal Rank Fusion of the rankings above

pub mod cache;
pub mod hybrid;
pub mod index;
pub mod lexical;
pub mod store;

pub use cache::{EmbeddingCache, VectorUnavailable};
pub use hybrid::{rrf_fusion, FusedHit};
pub use index::rank_by_similarity;
pub use lexical::rank_lexical;
pub use store::{EmbeddingStore, EmbeddingTable, FileEmbeddingStore, HttpEmbeddingStore};

/// Default embedding dimensionality of the precomputed tables.
pub const DEFAULT_DIMENSIONS: usize = 1536;
