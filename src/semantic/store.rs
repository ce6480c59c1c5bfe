//! Locale-keyed embedding store.
//!
//! File format: `embeddings.<locale>.json`, a JSON object mapping card id to
//! an array of floats. Files are produced offline and only ever read here.
//! A store may live on disk or behind a static HTTP origin.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::catalog::Locale;

/// Errors that can occur while fetching an embedding table.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Embedding store returned status {0}")]
    Status(u16),

    #[error("Invalid embedding file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Embedding file for locale '{0}' has no usable vectors")]
    Empty(Locale),
}

/// Card id -> vector for one locale. Immutable once built.
#[derive(Debug, Default)]
pub struct EmbeddingTable {
    vectors: HashMap<String, Vec<f32>>,
    dimensions: usize,
}

impl EmbeddingTable {
    /// Build a table, dropping vectors whose length is not `dimensions`.
    pub fn from_map(mut vectors: HashMap<String, Vec<f32>>, dimensions: usize) -> Self {
        let before = vectors.len();
        vectors.retain(|_, v| v.len() == dimensions);
        let dropped = before - vectors.len();
        if dropped > 0 {
            log::warn!(
                "dropped {} embeddings with dimension other than {}",
                dropped,
                dimensions
            );
        }
        Self {
            vectors,
            dimensions,
        }
    }

    pub fn from_json(bytes: &[u8], dimensions: usize) -> Result<Self, StoreError> {
        let map: HashMap<String, Vec<f32>> = serde_json::from_slice(bytes)?;
        Ok(Self::from_map(map, dimensions))
    }

    pub fn get(&self, id: &str) -> Option<&[f32]> {
        self.vectors.get(id).map(Vec::as_slice)
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Source of precomputed embedding tables.
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    async fn load(&self, locale: Locale) -> Result<EmbeddingTable, StoreError>;

    /// Where the store reads from, for logging.
    fn describe(&self) -> String;
}

fn file_name(locale: Locale) -> String {
    format!("embeddings.{}.json", locale)
}

/// Reads `embeddings.<locale>.json` from a directory.
pub struct FileEmbeddingStore {
    dir: PathBuf,
    dimensions: usize,
}

impl FileEmbeddingStore {
    pub fn new(dir: PathBuf, dimensions: usize) -> Self {
        Self { dir, dimensions }
    }
}

#[async_trait]
impl EmbeddingStore for FileEmbeddingStore {
    async fn load(&self, locale: Locale) -> Result<EmbeddingTable, StoreError> {
        let path = self.dir.join(file_name(locale));
        let bytes = tokio::fs::read(&path).await?;
        let table = EmbeddingTable::from_json(&bytes, self.dimensions)?;
        if table.is_empty() {
            return Err(StoreError::Empty(locale));
        }
        Ok(table)
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Fetches `<base_url>/embeddings.<locale>.json`.
pub struct HttpEmbeddingStore {
    client: reqwest::Client,
    base_url: String,
    dimensions: usize,
}

impl HttpEmbeddingStore {
    pub fn new(base_url: &str, dimensions: usize, timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingStore for HttpEmbeddingStore {
    async fn load(&self, locale: Locale) -> Result<EmbeddingTable, StoreError> {
        let url = format!("{}/{}", self.base_url, file_name(locale));
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status(status.as_u16()));
        }
        let bytes = response.bytes().await?;
        let table = EmbeddingTable::from_json(&bytes, self.dimensions)?;
        if table.is_empty() {
            return Err(StoreError::Empty(locale));
        }
        Ok(table)
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_drops_wrong_dimension() {
        let json = br#"{"a": [1.0, 0.0], "b": [1.0, 0.0, 0.0], "c": []}"#;
        let table = EmbeddingTable::from_json(json, 2).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.get("a").is_some());
        assert!(table.get("b").is_none());
    }

    #[test]
    fn test_table_rejects_malformed_json() {
        let result = EmbeddingTable::from_json(b"[1, 2, 3]", 2);
        assert!(matches!(result, Err(StoreError::Parse(_))));
    }

    #[tokio::test]
    async fn test_file_store_reads_locale_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("embeddings.ja.json"), r#"{"a1": [0.5, 0.5]}"#).unwrap();

        let store = FileEmbeddingStore::new(dir.path().to_path_buf(), 2);
        let table = store.load(Locale::Ja).await.unwrap();
        assert_eq!(table.get("a1"), Some(&[0.5, 0.5][..]));

        let missing = store.load(Locale::En).await;
        assert!(matches!(missing, Err(StoreError::Io(_))));
    }

    #[tokio::test]
    async fn test_file_store_empty_table_is_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("embeddings.en.json"), r#"{"a1": [0.5]}"#).unwrap();

        let store = FileEmbeddingStore::new(dir.path().to_path_buf(), 2);
        let result = store.load(Locale::En).await;
        assert!(matches!(result, Err(StoreError::Empty(Locale::En))));
    }
}
