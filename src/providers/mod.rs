//! Capability interfaces for the external collaborators of a search.
//!
//! The search pipeline only knows these traits; any provider (a hosted LLM,
//! a local model, a test double) plugs in behind them.

pub mod openai;

use async_trait::async_trait;

use crate::catalog::{Card, Locale};
use crate::filter::ParsedQuery;

/// Errors returned by external collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed provider output: {0}")]
    Malformed(String),

    #[error("api key not set (expected in ${0})")]
    MissingApiKey(String),
}

/// Turns raw natural-language text into structured filters plus a
/// semantic query.
#[async_trait]
pub trait QueryParser: Send + Sync {
    async fn parse(&self, text: &str, locale: Locale) -> Result<ParsedQuery, ProviderError>;
}

/// Embeds query text into the same space as the precomputed card vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str, locale: Locale) -> Result<Vec<f32>, ProviderError>;
}

/// Writes a natural-language answer about the top results.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(
        &self,
        query: &str,
        cards: &[Card],
        locale: Locale,
    ) -> Result<String, ProviderError>;
}
