//! Free-text cleanup shared by search queries and scraped descriptions.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::config::NormalizerConfig;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+|www\.\S+").expect("valid url regex"));

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<.*?>").expect("valid tag regex"));

/// Strips markup, URLs, punctuation, stop words and digit-bearing tokens from
/// text.
#[derive(Clone, Debug)]
pub struct TextNormalizer {
    punctuation: HashSet<char>,
    stop_words: HashSet<String>,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new(&NormalizerConfig::default())
    }
}

impl TextNormalizer {
    pub fn new(config: &NormalizerConfig) -> Self {
        Self {
            punctuation: config.punctuation.chars().collect(),
            stop_words: config
                .stop_words
                .iter()
                .map(|word| word.to_lowercase())
                .collect(),
        }
    }

    /// Cleans `text` into lowercase, single-space separated tokens.
    ///
    /// Everything after the first `|` is dropped first, since listings append
    /// metadata after a pipe. The result may be empty.
    pub fn clean_text(&self, text: &str) -> String {
        let text = text.split('|').next().unwrap_or_default();
        let text = URL_RE.replace_all(text, "");
        let text = TAG_RE.replace_all(&text, "");
        let text: String = text
            .chars()
            .filter(|c| !self.punctuation.contains(c))
            .collect();
        let text = text.to_lowercase();

        text.split_whitespace()
            .filter(|token| !token.chars().any(char::is_numeric))
            .filter(|token| !self.stop_words.contains(*token))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Turns a search phrase into `tok1+tok2+...+tokN+`.
    ///
    /// Every token is followed by `+`, the last one included; strip it before
    /// putting the keywords into a URL. Returns an empty string when nothing
    /// survives cleaning.
    pub fn keyword_process(&self, keyword: &str) -> String {
        self.clean_text(keyword)
            .split(' ')
            .filter(|token| !token.is_empty())
            .map(|token| format!("{token}+"))
            .collect()
    }
}
