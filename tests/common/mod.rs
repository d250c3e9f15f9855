//! Helpers for integration tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use clothing_recommender::crawlers::{CrawlerError, CrawlerResult, PageFetcher};
use clothing_recommender::processing::embedding::{ScoringResult, SentenceEmbedder};

pub const CARD_CLASS: &str = "sg-col-4-of-24 sg-col-4-of-12 s-result-item s-asin sg-col-4-of-16 sg-col s-widget-spacing-small sg-col-4-of-20";

/// Serves canned pages and records every requested URL.
#[derive(Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn with_page(mut self, url: &str, body: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), body.into());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("requests mutex poisoned").clone()
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> CrawlerResult<String> {
        self.requests
            .lock()
            .expect("requests mutex poisoned")
            .push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| CrawlerError::Build(format!("no canned page for {url}")))
    }
}

/// Embeds text as counts over a fixed vocabulary.
pub struct BagOfWords {
    vocabulary: Vec<&'static str>,
}

impl BagOfWords {
    pub fn new(vocabulary: &[&'static str]) -> Self {
        Self {
            vocabulary: vocabulary.to_vec(),
        }
    }
}

impl SentenceEmbedder for BagOfWords {
    fn embed(&self, text: &str) -> ScoringResult<Vec<f32>> {
        Ok(self
            .vocabulary
            .iter()
            .map(|word| text.split_whitespace().filter(|t| t == word).count() as f32)
            .collect())
    }
}

pub fn results_page(hrefs: &[Option<&str>]) -> String {
    let cards: String = hrefs
        .iter()
        .map(|href| {
            let link = href
                .map(|href| {
                    format!(r#"<a class="a-link-normal s-no-outline" href="{href}"><img></a>"#)
                })
                .unwrap_or_else(|| r#"<span class="a-price">₹499</span>"#.to_string());
            format!(r#"<div class="{CARD_CLASS}">{link}</div>"#)
        })
        .collect();
    format!("<html><body><div class=\"s-main-slot\">{cards}</div></body></html>")
}

pub fn detail_page(bullets: &[&str]) -> String {
    let items: String = bullets
        .iter()
        .map(|b| format!("<li><span class=\"a-list-item\">{b}</span></li>"))
        .collect();
    format!(
        r#"<html><body><div id="feature-bullets"><ul class="a-unordered-list">{items}</ul></div></body></html>"#
    )
}
