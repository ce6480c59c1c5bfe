//! Exhaustive cosine-similarity ranking over a candidate set.
//!
//! The catalog is small enough that every candidate is scored; there is no
//! approximate index.

use rayon::prelude::*;

use crate::catalog::Card;
use crate::semantic::store::EmbeddingTable;

/// Search result from the vector scorer.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Card ID
    pub id: String,
    /// Cosine similarity score
    pub score: f32,
}

/// Errors that make vector ranking impossible for a query.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Cannot search with zero-norm vector")]
    ZeroNormVector,
}

/// Compute L2 norm of a vector, accumulated in f64 so large components
/// do not overflow.
fn l2_norm(v: &[f32]) -> f64 {
    v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt()
}

/// Cosine similarity. Zero-norm or non-finite inputs score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm = l2_norm(a) * l2_norm(b);
    if !norm.is_finite() || norm < f64::from(f32::EPSILON) {
        return 0.0;
    }
    let dot_product: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum();
    let score = (dot_product / norm) as f32;
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

/// Score every candidate that has a stored vector.
///
/// Results are sorted by similarity (highest first); equal scores keep
/// candidate order. Candidates without a vector are left out.
pub fn search(
    query: &[f32],
    table: &EmbeddingTable,
    candidates: &[&Card],
) -> Result<Vec<SearchResult>, IndexError> {
    if query.len() != table.dimensions() {
        return Err(IndexError::DimensionMismatch {
            expected: table.dimensions(),
            got: query.len(),
        });
    }
    if l2_norm(query) < f64::from(f32::EPSILON) {
        return Err(IndexError::ZeroNormVector);
    }

    let mut results: Vec<SearchResult> = candidates
        .par_iter()
        .filter_map(|card| {
            let stored = table.get(&card.id)?;
            Some(SearchResult {
                id: card.id.clone(),
                score: cosine_similarity(query, stored),
            })
        })
        .collect();

    // stable: ties stay in candidate order
    results.sort_by(|a, b| b.score.total_cmp(&a.score));

    Ok(results)
}

/// Ids only, best first.
pub fn rank_by_similarity(
    query: &[f32],
    table: &EmbeddingTable,
    candidates: &[&Card],
) -> Result<Vec<String>, IndexError> {
    Ok(search(query, table, candidates)?
        .into_iter()
        .map(|r| r.id)
        .collect())
}
