//! Search orchestration.
//!
//! One query runs parse, filter, rank, fuse, answer. Every stage past the
//! filter is optional or fallible, and a failure only downgrades the result:
//! the caller always gets at least the filtered candidates back.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::catalog::{Card, Catalog, Locale};
use crate::config::SearchConfig;
use crate::filter::{self, ParsedQuery};
use crate::providers::{AnswerGenerator, Embedder, QueryParser};
use crate::semantic::{rank_by_similarity, rank_lexical, rrf_fusion, EmbeddingCache, FusedHit};

/// How the final order was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMode {
    /// Catalog order of the filtered candidates
    FilterOnly,
    Hybrid,
    LexicalOnly,
    VectorOnly,
}

/// A stage that could not run. The search still completed without it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Degradation {
    QueryParserFailed,
    EmbeddingUnavailable,
    VectorSearchUnavailable,
    AnswerUnavailable,
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Degradation::QueryParserFailed => {
                "query understanding unavailable, searched the raw text"
            }
            Degradation::EmbeddingUnavailable => "query embedding unavailable",
            Degradation::VectorSearchUnavailable => "semantic ranking unavailable",
            Degradation::AnswerUnavailable => "answer unavailable",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub query: String,
    pub locale: Locale,
    /// The parsed query the search actually ran with
    pub parsed: ParsedQuery,
    /// Filtered candidate ids in catalog order
    pub candidates: Vec<String>,
    /// Final ids, best first
    pub results: Vec<String>,
    /// Empty when fusion did not run
    pub fused: Vec<FusedHit>,
    pub mode: RankingMode,
    pub answer: Option<String>,
    pub degradations: Vec<Degradation>,
}

pub struct SearchService {
    catalog: Arc<Catalog>,
    config: SearchConfig,
    parser: Option<Arc<dyn QueryParser>>,
    embedder: Option<Arc<dyn Embedder>>,
    answerer: Option<Arc<dyn AnswerGenerator>>,
    embeddings: Option<Arc<EmbeddingCache>>,
}

impl SearchService {
    pub fn new(catalog: Arc<Catalog>, config: SearchConfig) -> Self {
        Self {
            catalog,
            config,
            parser: None,
            embedder: None,
            answerer: None,
            embeddings: None,
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn QueryParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_answerer(mut self, answerer: Arc<dyn AnswerGenerator>) -> Self {
        self.answerer = Some(answerer);
        self
    }

    pub fn with_embeddings(mut self, cache: Arc<EmbeddingCache>) -> Self {
        self.embeddings = Some(cache);
        self
    }

    /// Parse `raw` and run the full pipeline.
    ///
    /// Without a parser, or when parsing fails, the whole raw text becomes
    /// the semantic query and no structured filters apply.
    pub async fn search(&self, raw: &str, locale: Locale) -> SearchOutcome {
        let mut degradations = Vec::new();

        let parsed = match &self.parser {
            Some(parser) => match parser.parse(raw, locale).await {
                Ok(parsed) => parsed.normalized(),
                Err(e) => {
                    log::warn!("query parser failed, using raw text: {e}");
                    degradations.push(Degradation::QueryParserFailed);
                    ParsedQuery::fallback(raw)
                }
            },
            None => ParsedQuery::fallback(raw),
        };

        self.run(raw, parsed, locale, degradations).await
    }

    /// Run the pipeline for a query that is already parsed.
    pub async fn search_parsed(
        &self,
        raw: &str,
        parsed: ParsedQuery,
        locale: Locale,
    ) -> SearchOutcome {
        self.run(raw, parsed.normalized(), locale, Vec::new()).await
    }

    async fn run(
        &self,
        raw: &str,
        parsed: ParsedQuery,
        locale: Locale,
        mut degradations: Vec<Degradation>,
    ) -> SearchOutcome {
        let candidates = filter::apply(self.catalog.cards(), &parsed.filters, locale);
        log::debug!(
            "{} of {} cards passed filters",
            candidates.len(),
            self.catalog.len()
        );
        let candidate_ids: Vec<String> = candidates.iter().map(|c| c.id.clone()).collect();

        let (results, fused, mode) = match parsed.semantic_query.as_deref() {
            None => (candidate_ids.clone(), Vec::new(), RankingMode::FilterOnly),
            Some(query) => {
                self.rank(query, &candidates, &candidate_ids, locale, &mut degradations)
                    .await
            }
        };

        debug_assert!(
            {
                let allowed: HashSet<&str> = candidate_ids.iter().map(String::as_str).collect();
                results.iter().all(|id| allowed.contains(id.as_str()))
            },
            "ranking contains ids outside the candidate set"
        );

        // a pure filter query has nothing for the answer to address
        let answer = if parsed.semantic_query.is_some() {
            self.answer(raw, &results, locale, &mut degradations).await
        } else {
            None
        };

        let (mut results, mut fused) = (results, fused);
        if let Some(max) = self.config.max_results {
            results.truncate(max);
            fused.truncate(max);
        }

        SearchOutcome {
            query: raw.to_string(),
            locale,
            parsed,
            candidates: candidate_ids,
            results,
            fused,
            mode,
            answer,
            degradations,
        }
    }

    async fn rank(
        &self,
        query: &str,
        candidates: &[&Card],
        candidate_ids: &[String],
        locale: Locale,
        degradations: &mut Vec<Degradation>,
    ) -> (Vec<String>, Vec<FusedHit>, RankingMode) {
        let vector = self
            .vector_ranking(query, candidates, locale, degradations)
            .await
            .filter(|r| !r.is_empty());
        let lexical = Some(rank_lexical(query, candidates, locale)).filter(|r| !r.is_empty());
        log::debug!(
            "vector ranked {}, lexical ranked {}",
            vector.as_ref().map_or(0, Vec::len),
            lexical.as_ref().map_or(0, Vec::len)
        );

        let mode = match (&vector, &lexical) {
            (Some(_), Some(_)) => RankingMode::Hybrid,
            (Some(_), None) => RankingMode::VectorOnly,
            (None, Some(_)) => RankingMode::LexicalOnly,
            (None, None) => {
                return (candidate_ids.to_vec(), Vec::new(), RankingMode::FilterOnly);
            }
        };

        // vector first: its order wins RRF ties
        let rankings: Vec<&[String]> = [vector.as_deref(), lexical.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        let fused = rrf_fusion(&rankings);
        let results = fused.iter().map(|hit| hit.id.clone()).collect();

        (results, fused, mode)
    }

    /// `None` when vector search could not run for this query.
    async fn vector_ranking(
        &self,
        query: &str,
        candidates: &[&Card],
        locale: Locale,
        degradations: &mut Vec<Degradation>,
    ) -> Option<Vec<String>> {
        // both halves are needed to rank; the table stays unloaded otherwise
        let Some(embedder) = &self.embedder else {
            degradations.push(Degradation::EmbeddingUnavailable);
            return None;
        };
        let Some(cache) = &self.embeddings else {
            degradations.push(Degradation::VectorSearchUnavailable);
            return None;
        };

        let (embedding, table) = tokio::join!(embedder.embed(query, locale), cache.get(locale));

        let embedding = match embedding {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                log::warn!("query embedding failed: {e}");
                degradations.push(Degradation::EmbeddingUnavailable);
                None
            }
        };

        let table = match table {
            Ok(table) => Some(table),
            Err(e) => {
                log::warn!("{e}");
                degradations.push(Degradation::VectorSearchUnavailable);
                None
            }
        };

        let (embedding, table) = (embedding?, table?);
        match rank_by_similarity(&embedding, &table, candidates) {
            Ok(ranking) => Some(ranking),
            Err(e) => {
                log::warn!("vector ranking failed: {e}");
                degradations.push(Degradation::VectorSearchUnavailable);
                None
            }
        }
    }

    async fn answer(
        &self,
        raw: &str,
        results: &[String],
        locale: Locale,
        degradations: &mut Vec<Degradation>,
    ) -> Option<String> {
        let answerer = self.answerer.as_ref()?;
        if results.is_empty() {
            return None;
        }

        let top: Vec<Card> = results
            .iter()
            .take(self.config.answer_top_n)
            .filter_map(|id| self.catalog.get(id).cloned())
            .collect();

        match answerer.generate(raw, &top, locale).await {
            Ok(answer) => Some(answer),
            Err(e) => {
                log::warn!("answer generation failed: {e}");
                degradations.push(Degradation::AnswerUnavailable);
                None
            }
        }
    }
}
