//! Configuration model loaded from external sources.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming the YAML configuration file.
pub const CONFIG_PATH_ENV: &str = "RECOMMENDER_CONFIG";

/// Configuration file used when [`CONFIG_PATH_ENV`] is not set.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.yaml";

/// Prefix of environment variables overriding file values.
pub const ENV_PREFIX: &str = "RECOMMENDER";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
/// Top-level settings for a recommender run.
pub struct RecommenderConfig {
    /// Shopping site origin, without a trailing slash.
    pub origin: String,
    /// Path and query prefix the `+`-joined keywords are appended to.
    pub search_path: String,
    /// Maximum number of ranked URLs returned per search.
    pub top_k: usize,
    /// Maximum number of product detail pages fetched at the same time.
    pub concurrency: usize,
    pub page_shape: PageShape,
    pub normalizer: NormalizerConfig,
    pub embedding: EmbeddingSettings,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            origin: "https://www.amazon.in".to_string(),
            search_path: "/s?k=".to_string(),
            top_k: crate::TOP_K_RESULTS,
            concurrency: 5,
            page_shape: PageShape::default(),
            normalizer: NormalizerConfig::default(),
            embedding: EmbeddingSettings::default(),
        }
    }
}

impl RecommenderConfig {
    /// Loads the configuration from the file named by [`CONFIG_PATH_ENV`]
    /// (or [`DEFAULT_CONFIG_PATH`]) and `RECOMMENDER__*` environment variables.
    ///
    /// Missing files are not an error; every field falls back to its default.
    pub fn load() -> ConfigResult<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_file(Path::new(&path))
    }

    /// Loads the configuration from `path` layered under the environment.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("normalizer.stop_words")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
/// CSS selectors describing the markup of one shopping site at one point in
/// time.
///
/// Whenever the site changes its markup, bump `version` and adjust the
/// selectors in configuration instead of code.
pub struct PageShape {
    pub version: String,
    /// Matches one result card on the search-results page.
    pub card_selector: String,
    /// Matches the product link anchor inside a card.
    pub link_selector: String,
    /// Matches the bullet-point description block on a detail page.
    pub description_selector: String,
}

impl Default for PageShape {
    fn default() -> Self {
        Self {
            version: "amazon-in-2021".to_string(),
            card_selector: "div.sg-col-4-of-24.sg-col-4-of-12.s-result-item.s-asin.sg-col-4-of-16.sg-col.s-widget-spacing-small.sg-col-4-of-20".to_string(),
            link_selector: "a.a-link-normal.s-no-outline".to_string(),
            description_selector: "div#feature-bullets".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
/// Characters and words stripped by the text normalizer.
pub struct NormalizerConfig {
    /// Every character of this string is removed from the input.
    pub punctuation: String,
    /// Whole tokens dropped after lowercasing.
    pub stop_words: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            punctuation: r#"!()-[]{};:'"\,<>./?@#$%^&*_~"#.to_string(),
            stop_words: ["the", "a", "and", "is", "be", "will"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Sentence-embedding model name, e.g. `paraphrase-mpnet-base-v2`.
    pub model: String,
    pub show_download_progress: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "paraphrase-mpnet-base-v2".to_string(),
            show_download_progress: false,
        }
    }
}
