//! Hybrid ranking via Reciprocal Rank Fusion (RRF).
//!
//! Merges any number of rankings (vector, lexical) into one:
//!   score(d) = Σ 1/(k + rank_i(d))
//! over every ranking `i` containing `d`, with 1-based ranks.
//!
//! Equal scores are ordered by first appearance: rankings are scanned in
//! argument order, each front to back, and an id keeps the position at which
//! it was first seen. Callers decide precedence by the order they pass
//! rankings in.

use std::collections::HashMap;

use serde::Serialize;

/// RRF constant (standard value from literature).
/// Higher k reduces the impact of high-ranking items.
pub const RRF_K: f64 = 60.0;

/// Result from hybrid fusion with combined score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedHit {
    /// Card ID
    pub id: String,
    /// RRF fusion score
    pub score: f64,
    /// 1-based rank in each input ranking, in argument order (None if absent)
    pub ranks: Vec<Option<usize>>,
}

/// Fuse rankings using Reciprocal Rank Fusion.
///
/// # Arguments
/// * `rankings` - Id lists, each ordered best first, without duplicates
///
/// # Returns
/// Every id that appears in at least one ranking, sorted by RRF score
/// (highest first).
pub fn rrf_fusion<S: AsRef<str>>(rankings: &[&[S]]) -> Vec<FusedHit> {
    let mut hits: Vec<FusedHit> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();

    for (list_idx, ranking) in rankings.iter().enumerate() {
        for (rank0, id) in ranking.iter().enumerate() {
            let id = id.as_ref();
            let rank = rank0 + 1;
            let contribution = 1.0 / (RRF_K + rank as f64);

            let idx = *position.entry(id).or_insert_with(|| {
                hits.push(FusedHit {
                    id: id.to_string(),
                    score: 0.0,
                    ranks: vec![None; rankings.len()],
                });
                hits.len() - 1
            });

            let hit = &mut hits[idx];
            // a duplicate within one ranking only counts at its first rank
            if hit.ranks[list_idx].is_none() {
                hit.ranks[list_idx] = Some(rank);
                hit.score += contribution;
            }
        }
    }

    // stable sort keeps first-appearance order among equal scores
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));

    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(hits: &[FusedHit]) -> Vec<&str> {
        hits.iter().map(|h| h.id.as_str()).collect()
    }

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn test_rrf_no_rankings() {
        let results = rrf_fusion::<String>(&[]);
        assert!(results.is_empty());
    }

    #[test]
    fn test_rrf_empty_rankings() {
        let empty: Vec<String> = vec![];
        let results = rrf_fusion(&[&empty[..], &empty[..]]);
        assert!(results.is_empty());
    }

    #[test]
    fn test_rrf_single_ranking_preserves_order() {
        let ranking = s(&["d", "a", "c", "b", "e"]);
        let results = rrf_fusion(&[&ranking[..]]);
        assert_eq!(ids(&results), vec!["d", "a", "c", "b", "e"]);
        assert_eq!(results[0].ranks, vec![Some(1)]);
    }

    #[test]
    fn test_rrf_top_in_all_scores_n_over_61() {
        let a = s(&["x", "y"]);
        let b = s(&["x", "z"]);
        let c = s(&["x"]);
        let results = rrf_fusion(&[&a[..], &b[..], &c[..]]);

        assert_eq!(results[0].id, "x");
        let expected = 3.0 * (1.0 / (RRF_K + 1.0));
        assert!((results[0].score - expected).abs() < 1e-12);
        assert_eq!(results[0].ranks, vec![Some(1), Some(1), Some(1)]);
    }

    #[test]
    fn test_rrf_declared_tie_break_lexical_first() {
        // lexical passed first, vector second
        let lexical = s(&["a", "b", "c"]);
        let vector = s(&["b", "a", "d"]);
        let results = rrf_fusion(&[&lexical[..], &vector[..]]);

        let score = |id: &str| results.iter().find(|h| h.id == id).unwrap().score;
        assert!((score("a") - (1.0 / 61.0 + 1.0 / 62.0)).abs() < 1e-12);
        assert!((score("b") - (1.0 / 62.0 + 1.0 / 61.0)).abs() < 1e-12);
        assert!((score("c") - 1.0 / 63.0).abs() < 1e-12);
        assert!((score("d") - 1.0 / 63.0).abs() < 1e-12);
        assert_eq!(score("a"), score("b"));

        assert_eq!(ids(&results), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_rrf_declared_tie_break_vector_first() {
        let lexical = s(&["a", "b", "c"]);
        let vector = s(&["b", "a", "d"]);
        let results = rrf_fusion(&[&vector[..], &lexical[..]]);
        assert_eq!(ids(&results), vec!["b", "a", "d", "c"]);
    }

    #[test]
    fn test_rrf_deterministic_across_runs() {
        let lexical = s(&["a", "b", "c", "e", "f"]);
        let vector = s(&["f", "e", "c", "b", "a"]);
        let first = rrf_fusion(&[&vector[..], &lexical[..]]);
        for _ in 0..20 {
            assert_eq!(rrf_fusion(&[&vector[..], &lexical[..]]), first);
        }
    }

    #[test]
    fn test_rrf_item_in_both_is_boosted() {
        let vector = s(&["1", "2"]);
        let lexical = s(&["3", "4", "1"]);
        let results = rrf_fusion(&[&vector[..], &lexical[..]]);

        assert_eq!(results[0].id, "1");
        assert_eq!(results[0].ranks, vec![Some(1), Some(3)]);

        let item3 = results.iter().find(|h| h.id == "3").unwrap();
        assert_eq!(item3.ranks, vec![None, Some(1)]);
    }

    #[test]
    fn test_rrf_union_of_ids() {
        let vector: Vec<String> = (1..=100).map(|i| i.to_string()).collect();
        let lexical: Vec<String> = (50..=150).map(|i| i.to_string()).collect();
        let results = rrf_fusion(&[&vector[..], &lexical[..]]);
        assert_eq!(results.len(), 150);
    }

    #[test]
    fn test_rrf_accepts_str_slices() {
        let results = rrf_fusion(&[&["p", "q"][..]]);
        assert_eq!(ids(&results), vec!["p", "q"]);
    }
}
