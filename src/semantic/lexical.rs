//! Lexical (keyword) scoring for hybrid search.
//!
//! Provides simple keyword matching against card text in the active locale.
//! Used alongside vector search for RRF fusion.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::catalog::{Card, Locale};

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "in", "on", "at",
        "to", "for", "of", "with", "by", "from", "as", "and", "or", "but", "not", "no", "so",
        "if", "then", "that", "which", "me", "show", "find", "card", "cards",
    ]
    .into_iter()
    .collect()
});

/// Name matches count double.
const NAME_WEIGHT: f32 = 2.0;
const TEXT_WEIGHT: f32 = 1.0;

/// Result of lexical scoring.
#[derive(Debug, Clone)]
pub struct LexicalResult {
    /// Card ID
    pub id: String,
    /// Number of distinct query terms matched
    pub matched_terms: usize,
    /// Weighted hits across all fields
    pub total_hits: f32,
}

/// Score candidates against a query using keyword matching.
///
/// Results are sorted by relevance (matched_terms DESC, total_hits DESC),
/// ties keep candidate order. Only cards with at least one match are
/// returned.
pub fn score_lexical(query: &str, candidates: &[&Card], locale: Locale) -> Vec<LexicalResult> {
    let query_terms = tokenize(query);
    if query_terms.is_empty() {
        return vec![];
    }

    let mut results: Vec<LexicalResult> = candidates
        .iter()
        .filter_map(|card| {
            let (matched_terms, total_hits) = count_matches(&query_terms, card, locale);
            (matched_terms > 0).then(|| LexicalResult {
                id: card.id.clone(),
                matched_terms,
                total_hits,
            })
        })
        .collect();

    results.sort_by(|a, b| {
        b.matched_terms
            .cmp(&a.matched_terms)
            .then_with(|| b.total_hits.total_cmp(&a.total_hits))
    });

    results
}

/// Ids only, best first.
pub fn rank_lexical(query: &str, candidates: &[&Card], locale: Locale) -> Vec<String> {
    score_lexical(query, candidates, locale)
        .into_iter()
        .map(|r| r.id)
        .collect()
}

/// Tokenize query into distinct lowercase terms.
/// Drops single ASCII characters and common stop words.
fn tokenize(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    query
        .split(|c: char| !c.is_alphanumeric())
        .map(|s| s.to_lowercase())
        .filter(|s| !s.is_empty() && !(s.len() == 1 && s.is_ascii()))
        .filter(|s| !STOP_WORDS.contains(s.as_str()))
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

/// Returns (unique_terms_matched, weighted hits).
fn count_matches(query_terms: &[String], card: &Card, locale: Locale) -> (usize, f32) {
    let name = card.name.get(locale).to_lowercase();
    let texts: Vec<String> = card
        .text_fields(locale)
        .into_iter()
        .map(str::to_lowercase)
        .collect();

    let mut matched_terms = 0;
    let mut total_hits = 0.0;

    for term in query_terms {
        let mut term_hits = 0.0;
        if name.contains(term.as_str()) {
            term_hits += NAME_WEIGHT;
        }
        term_hits += texts
            .iter()
            .filter(|t| t.contains(term.as_str()))
            .count() as f32
            * TEXT_WEIGHT;

        if term_hits > 0.0 {
            matched_terms += 1;
            total_hits += term_hits;
        }
    }

    (matched_terms, total_hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Ability, Attack, Localized};

    fn card(id: &str, name: &str, flavor: &str) -> Card {
        Card {
            id: id.to_string(),
            name: Localized::new(name, ""),
            flavor_text: Localized::new(flavor, ""),
            ..Default::default()
        }
    }

    fn ids(results: &[LexicalResult]) -> Vec<&str> {
        results.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_tokenize_basic() {
        assert_eq!(tokenize("sleepy water pokemon"), vec!["sleepy", "water", "pokemon"]);
    }

    #[test]
    fn test_tokenize_filters_stop_words_and_short() {
        assert_eq!(tokenize("show me the cards of a dragon"), vec!["dragon"]);
    }

    #[test]
    fn test_tokenize_handles_punctuation_and_case() {
        assert_eq!(tokenize("Fire-type, HEAL!"), vec!["fire", "type", "heal"]);
    }

    #[test]
    fn test_tokenize_dedupes() {
        assert_eq!(tokenize("fire fire FIRE"), vec!["fire"]);
    }

    #[test]
    fn test_tokenize_keeps_single_cjk_character() {
        assert_eq!(tokenize("炎"), vec!["炎"]);
    }

    #[test]
    fn test_empty_query_matches_nothing() {
        let cards = [card("a", "Pikachu", "")];
        let candidates: Vec<&Card> = cards.iter().collect();
        assert!(score_lexical("", &candidates, Locale::En).is_empty());
        assert!(score_lexical("the of", &candidates, Locale::En).is_empty());
    }

    #[test]
    fn test_zero_match_cards_excluded() {
        let cards = [card("a", "Pikachu", "electric mouse"), card("b", "Snorlax", "sleeps")];
        let candidates: Vec<&Card> = cards.iter().collect();
        let results = score_lexical("electric", &candidates, Locale::En);
        assert_eq!(ids(&results), vec!["a"]);
    }

    #[test]
    fn test_more_terms_rank_higher() {
        let cards = [
            card("a", "Magikarp", "splashes in water"),
            card("b", "Lapras", "ferries people across water while it sings"),
        ];
        let candidates: Vec<&Card> = cards.iter().collect();
        let results = score_lexical("water sings", &candidates, Locale::En);
        assert_eq!(ids(&results), vec!["b", "a"]);
        assert_eq!(results[0].matched_terms, 2);
    }

    #[test]
    fn test_name_match_outweighs_text_match() {
        let cards = [
            card("a", "Bulbasaur", "a seed grows like a charmander tail"),
            card("b", "Charmander", "tail flame"),
        ];
        let candidates: Vec<&Card> = cards.iter().collect();
        let results = score_lexical("charmander", &candidates, Locale::En);
        assert_eq!(ids(&results), vec!["b", "a"]);
    }

    #[test]
    fn test_ties_keep_candidate_order() {
        let cards = [card("z", "Z", "fire"), card("y", "Y", "fire"), card("x", "X", "fire")];
        let candidates: Vec<&Card> = cards.iter().collect();
        let results = score_lexical("fire", &candidates, Locale::En);
        assert_eq!(ids(&results), vec!["z", "y", "x"]);
    }

    #[test]
    fn test_searches_ability_and_attack_text() {
        let mut a = card("a", "Alakazam", "");
        a.ability = Some(Ability {
            name: Localized::new("Psychic Shield", ""),
            text: Localized::new("Prevents damage.", ""),
        });
        let mut b = card("b", "Machamp", "");
        b.attacks = vec![Attack {
            name: Localized::new("Seismic Toss", ""),
            text: Localized::new("Heavy damage.", ""),
            ..Default::default()
        }];
        let cards = [a, b];
        let candidates: Vec<&Card> = cards.iter().collect();

        assert_eq!(ids(&score_lexical("shield", &candidates, Locale::En)), vec!["a"]);
        assert_eq!(ids(&score_lexical("seismic", &candidates, Locale::En)), vec!["b"]);
        assert_eq!(
            ids(&score_lexical("damage", &candidates, Locale::En)),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_uses_active_locale_text() {
        let mut a = card("a", "Charizard", "");
        a.flavor_text = Localized::new("It spits fire", "口から炎を吐く");
        let cards = [a];
        let candidates: Vec<&Card> = cards.iter().collect();

        assert_eq!(rank_lexical("炎", &candidates, Locale::Ja), vec!["a"]);
        assert!(rank_lexical("炎", &candidates, Locale::En).is_empty());
    }
}
