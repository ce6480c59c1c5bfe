use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use homedir::my_home;
use serde::{Deserialize, Serialize};

use crate::catalog::Locale;
use crate::semantic::DEFAULT_DIMENSIONS;

const CONFIG_FILE: &str = "config.yaml";

const DEFAULT_CATALOG_PATH: &str = "cards.json";
const DEFAULT_EMBEDDINGS_SOURCE: &str = "embeddings";
/// Cards handed to the answer generator
const DEFAULT_ANSWER_TOP_N: usize = 10;
const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;

/// Where precomputed card embeddings come from
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    /// Directory holding `embeddings.<locale>.json`, or an http(s) base URL
    #[serde(default = "default_embeddings_source")]
    pub source: String,

    /// Vector dimensionality shared by the tables and the query embedder
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_EMBEDDINGS_SOURCE.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
        }
    }
}

impl EmbeddingsConfig {
    pub fn is_remote(&self) -> bool {
        self.source.starts_with("http://") || self.source.starts_with("https://")
    }
}

fn default_embeddings_source() -> String {
    DEFAULT_EMBEDDINGS_SOURCE.to_string()
}

fn default_dimensions() -> usize {
    DEFAULT_DIMENSIONS
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_answer_top_n")]
    pub answer_top_n: usize,

    /// Truncate results to this many cards. Unlimited when absent.
    #[serde(default)]
    pub max_results: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            answer_top_n: DEFAULT_ANSWER_TOP_N,
            max_results: None,
        }
    }
}

fn default_answer_top_n() -> usize {
    DEFAULT_ANSWER_TOP_N
}

/// OpenAI-compatible provider used for parsing, query embedding and answers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
        }
    }
}

fn default_llm_base_url() -> String {
    DEFAULT_LLM_BASE_URL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_chat_model() -> String {
    DEFAULT_CHAT_MODEL.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_llm_timeout_secs() -> u64 {
    DEFAULT_LLM_TIMEOUT_SECS
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,
    #[serde(default)]
    pub default_locale: Locale,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_path: DEFAULT_CATALOG_PATH.to_string(),
            default_locale: Locale::default(),
            embeddings: EmbeddingsConfig::default(),
            search: SearchConfig::default(),
            llm: LlmConfig::default(),
            base_path: PathBuf::new(),
        }
    }
}

fn default_catalog_path() -> String {
    DEFAULT_CATALOG_PATH.to_string()
}

impl Config {
    /// `$CARDEX_HOME`, else `~/.cardex`
    pub fn base_dir() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("CARDEX_HOME") {
            return Ok(PathBuf::from(path));
        }
        let home = my_home()
            .context("could not determine home directory")?
            .context("home directory path is empty")?;
        Ok(home.join(".cardex"))
    }

    pub fn load() -> Result<Self> {
        Self::load_with(&Self::base_dir()?)
    }

    pub fn load_with(base_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(base_path)
            .with_context(|| format!("failed to create {}", base_path.display()))?;

        let path = base_path.join(CONFIG_FILE);

        // create new if does not exist
        if !path.exists() {
            std::fs::write(&path, serde_yml::to_string(&Self::default())?)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }

        let config_str = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut config: Self = serde_yml::from_str(&config_str)
            .with_context(|| format!("config is malformed: {}", path.display()))?;

        config.base_path = base_path.to_path_buf();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = self.base_path.join(CONFIG_FILE);
        let config_str = serde_yml::to_string(&self)?;
        std::fs::write(&path, config_str)
            .with_context(|| format!("failed to write {}", path.display()))
    }

    fn validate(&mut self) -> Result<()> {
        if self.catalog_path.trim().is_empty() {
            bail!("catalog_path must not be empty");
        }
        if self.embeddings.source.trim().is_empty() {
            bail!("embeddings.source must not be empty");
        }
        if self.embeddings.dimensions == 0 {
            bail!("embeddings.dimensions must be greater than 0");
        }
        if self.search.answer_top_n == 0 {
            bail!("search.answer_top_n must be greater than 0");
        }
        if self.search.max_results == Some(0) {
            self.search.max_results = None;
        }

        let llm = &self.llm;
        if llm.timeout_secs == 0 {
            bail!("llm.timeout_secs must be greater than 0");
        }
        if llm.chat_model.trim().is_empty() || llm.embedding_model.trim().is_empty() {
            bail!("llm.chat_model and llm.embedding_model must not be empty");
        }
        if llm.enabled && llm.api_key_env.trim().is_empty() {
            bail!("llm.api_key_env must name an environment variable");
        }

        Ok(())
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.resolve(&self.catalog_path)
    }

    /// Embeddings directory resolved against the base path. Meaningless
    /// for remote sources.
    pub fn embeddings_dir(&self) -> PathBuf {
        self.resolve(&self.embeddings.source)
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_with(dir.path()).unwrap();

        assert!(dir.path().join(CONFIG_FILE).exists());
        assert_eq!(config.search.answer_top_n, DEFAULT_ANSWER_TOP_N);
        assert_eq!(config.embeddings.dimensions, DEFAULT_DIMENSIONS);
        assert_eq!(config.default_locale, Locale::En);
        assert!(!config.llm.enabled);
        assert_eq!(config.catalog_path(), dir.path().join(DEFAULT_CATALOG_PATH));
    }

    #[test]
    fn test_fills_missing_fields_and_resaves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "default_locale: ja\nsearch:\n  max_results: 5\n").unwrap();

        let config = Config::load_with(dir.path()).unwrap();
        assert_eq!(config.default_locale, Locale::Ja);
        assert_eq!(config.search.max_results, Some(5));
        assert_eq!(config.search.answer_top_n, DEFAULT_ANSWER_TOP_N);

        let resaved = std::fs::read_to_string(&path).unwrap();
        assert!(resaved.contains("answer_top_n"));
        assert!(resaved.contains("embedding_model"));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        std::fs::write(&path, "embeddings:\n  dimensions: 0\n").unwrap();
        assert!(Config::load_with(dir.path()).is_err());

        std::fs::write(&path, "search:\n  answer_top_n: 0\n").unwrap();
        assert!(Config::load_with(dir.path()).is_err());

        std::fs::write(&path, "llm:\n  timeout_secs: 0\n").unwrap();
        assert!(Config::load_with(dir.path()).is_err());

        std::fs::write(&path, "llm:\n  chat_model: ''\n").unwrap();
        assert!(Config::load_with(dir.path()).is_err());
    }

    #[test]
    fn test_rejects_unknown_locale() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "default_locale: fr\n").unwrap();
        assert!(Config::load_with(dir.path()).is_err());
    }

    #[test]
    fn test_zero_max_results_means_unlimited() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "search:\n  max_results: 0\n").unwrap();
        let config = Config::load_with(dir.path()).unwrap();
        assert_eq!(config.search.max_results, None);
    }

    #[test]
    fn test_resolves_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "catalog_path: /data/cards.json\nembeddings:\n  source: vectors\n",
        )
        .unwrap();
        let config = Config::load_with(dir.path()).unwrap();
        assert_eq!(config.catalog_path(), PathBuf::from("/data/cards.json"));
        assert_eq!(config.embeddings_dir(), dir.path().join("vectors"));
        assert!(!config.embeddings.is_remote());
    }

    #[test]
    fn test_remote_embeddings_source() {
        let embeddings = EmbeddingsConfig {
            source: "https://cdn.example.com/embeddings".to_string(),
            ..Default::default()
        };
        assert!(embeddings.is_remote());
    }
}
