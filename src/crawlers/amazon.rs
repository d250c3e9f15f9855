use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tokio::sync::Semaphore;
use url::Url;

use crate::crawlers::{CrawlerError, CrawlerResult, PageFetcher, WebstoreCrawler, fetch_html};
use crate::domain::product::{
    CardResult, ScrapeOutcome, ScrapedProduct, SkipReason, SkippedProduct,
};
use crate::models::config::{PageShape, RecommenderConfig};
use crate::processing::text::TextNormalizer;

fn parse_selector(selector: &str) -> CrawlerResult<Selector> {
    Selector::parse(selector).map_err(|e| CrawlerError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Selectors of a [`PageShape`], parsed once when the crawler is built.
struct CompiledShape {
    card: Selector,
    link: Selector,
    description: Selector,
}

impl CompiledShape {
    fn compile(shape: &PageShape) -> CrawlerResult<Self> {
        Ok(Self {
            card: parse_selector(&shape.card_selector)?,
            link: parse_selector(&shape.link_selector)?,
            description: parse_selector(&shape.description_selector)?,
        })
    }
}

/// Crawler for `amazon.in` search results which limits concurrent detail
/// page requests using a [`Semaphore`].
pub struct WebstoreCrawlerAmazon {
    base_url: Url,
    search_path: String,
    shape_version: String,
    shape: CompiledShape,
    normalizer: TextNormalizer,
    fetcher: Arc<dyn PageFetcher>,
    semaphore: Arc<Semaphore>,
}

impl WebstoreCrawlerAmazon {
    /// Creates a crawler for the origin and page shape in `config`.
    ///
    /// `config.concurrency` controls how many detail pages may be in flight
    /// at the same time. Every selector of the page shape is validated here.
    pub fn new(config: &RecommenderConfig, fetcher: Arc<dyn PageFetcher>) -> CrawlerResult<Self> {
        if config.concurrency == 0 {
            return Err(CrawlerError::Build("concurrency must be at least 1".to_string()));
        }
        Ok(Self {
            base_url: Url::parse(&config.origin)?,
            search_path: config.search_path.clone(),
            shape_version: config.page_shape.version.clone(),
            shape: CompiledShape::compile(&config.page_shape)?,
            normalizer: TextNormalizer::new(&config.normalizer),
            fetcher,
            semaphore: Arc::new(Semaphore::new(config.concurrency)),
        })
    }

    /// Builds the search-results URL, or `None` when the query has no
    /// keywords left after cleaning.
    pub fn search_url(&self, search_string: &str) -> CrawlerResult<Option<Url>> {
        let keywords = self.normalizer.keyword_process(search_string);
        let Some(keywords) = keywords.strip_suffix('+') else {
            return Ok(None);
        };
        let origin = self.base_url.as_str().trim_end_matches('/');
        let url = Url::parse(&format!("{origin}{}{keywords}", self.search_path))?;
        Ok(Some(url))
    }

    /// Returns the product href of every result card, in page order.
    ///
    /// Cards without a matching anchor (or whose anchor lacks an `href`)
    /// yield `None`.
    fn card_links(&self, document: &Html) -> Vec<Option<String>> {
        document
            .select(&self.shape.card)
            .map(|card| {
                card.select(&self.shape.link)
                    .next()
                    .and_then(|link| link.value().attr("href"))
                    .map(str::to_string)
            })
            .collect()
    }

    /// Resolves a card's href and scrapes the product behind it.
    async fn get_card(&self, card: usize, href: Option<String>) -> CardResult {
        let skip = move |url: Option<String>, reason| SkippedProduct { card, url, reason };
        let Some(href) = href else {
            return Err(skip(None, SkipReason::MissingLink));
        };
        log::debug!("Found product link {href}");
        let url = match self.base_url.join(&href) {
            Ok(url) => url.to_string(),
            Err(_) => return Err(skip(None, SkipReason::InvalidHref(href))),
        };
        match self.get_product(&url).await {
            Ok(description) => Ok(ScrapedProduct {
                card,
                url,
                description,
            }),
            Err(reason) => Err(skip(Some(url), reason)),
        }
    }

    /// Fetches one product detail page and returns its description text.
    ///
    /// Text nodes are joined with spaces so adjacent bullets stay separate
    /// words.
    ///
    /// A permit from the internal [`Semaphore`] is held for the duration of
    /// the request.
    async fn get_product(&self, url: &str) -> Result<String, SkipReason> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| SkipReason::FetchFailed(e.to_string()))?;
        let document = fetch_html(self.fetcher.as_ref(), url)
            .await
            .map_err(|e| SkipReason::FetchFailed(e.to_string()))?;

        document
            .select(&self.shape.description)
            .next()
            .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
            .ok_or(SkipReason::MissingDescription)
    }
}

#[async_trait]
impl WebstoreCrawler for WebstoreCrawlerAmazon {
    /// Loads the first search-results page and scrapes every card on it.
    ///
    /// Detail pages are fetched concurrently with `join_all`, which keeps the
    /// results in card order.
    async fn search_products(&self, search_string: &str) -> CrawlerResult<ScrapeOutcome> {
        let Some(url) = self.search_url(search_string)? else {
            log::warn!("Search string {search_string:?} has no keywords");
            return Ok(ScrapeOutcome::default());
        };

        let links = {
            let document = fetch_html(self.fetcher.as_ref(), url.as_str()).await?;
            self.card_links(&document)
        };
        if links.is_empty() {
            log::warn!(
                "No result cards found at {url} (page shape {})",
                self.shape_version
            );
        } else {
            log::info!("Found {} result cards at {url}", links.len());
        }

        let tasks = links
            .into_iter()
            .enumerate()
            .map(|(card, href)| self.get_card(card, href));
        let results = futures::future::join_all(tasks).await;

        let mut outcome = ScrapeOutcome::default();
        for result in results {
            outcome.push(result);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    const CARD_CLASS: &str = "sg-col-4-of-24 sg-col-4-of-12 s-result-item s-asin sg-col-4-of-16 sg-col s-widget-spacing-small sg-col-4-of-20";

    #[derive(Default)]
    struct FakeFetcher {
        pages: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn with_page(mut self, url: &str, body: impl Into<String>) -> Self {
            self.pages.insert(url.to_string(), body.into());
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().expect("requests mutex poisoned").clone()
        }
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> CrawlerResult<String> {
            self.requests
                .lock()
                .expect("requests mutex poisoned")
                .push(url.to_string());
            self.pages.get(url).cloned().ok_or_else(|| CrawlerError::Status {
                url: url.to_string(),
                status: reqwest::StatusCode::NOT_FOUND,
            })
        }
    }

    fn card(href: Option<&str>) -> String {
        let link = href
            .map(|href| format!(r#"<a class="a-link-normal s-no-outline" href="{href}">img</a>"#))
            .unwrap_or_default();
        format!(r#"<div class="{CARD_CLASS}"><span>Sponsored</span>{link}</div>"#)
    }

    fn results_page(cards: &[Option<&str>]) -> String {
        let cards: String = cards.iter().map(|href| card(*href)).collect();
        format!("<html><body><div class=\"s-main-slot\">{cards}</div></body></html>")
    }

    fn detail_page(bullets: &[&str]) -> String {
        let items: String = bullets
            .iter()
            .map(|b| format!("<li><span>{b}</span></li>"))
            .collect();
        format!(r#"<html><body><div id="feature-bullets"><ul>{items}</ul></div></body></html>"#)
    }

    fn crawler(fetcher: Arc<FakeFetcher>) -> WebstoreCrawlerAmazon {
        WebstoreCrawlerAmazon::new(&RecommenderConfig::default(), fetcher)
            .expect("default config builds a crawler")
    }

    const SEARCH_URL: &str = "https://www.amazon.in/s?k=red+cotton+shirt";

    #[test]
    fn search_url_strips_trailing_plus() {
        let crawler = crawler(Arc::new(FakeFetcher::default()));
        let url = crawler
            .search_url("The Red, Cotton shirt!")
            .expect("valid url")
            .expect("query has keywords");
        assert_eq!(url.as_str(), SEARCH_URL);
    }

    #[test]
    fn search_url_is_none_without_keywords() {
        let crawler = crawler(Arc::new(FakeFetcher::default()));
        assert!(crawler.search_url("  the  ").expect("valid url").is_none());
    }

    #[test]
    fn invalid_selector_is_rejected_at_build() {
        let mut config = RecommenderConfig::default();
        config.page_shape.link_selector = "a[".to_string();

        let result = WebstoreCrawlerAmazon::new(&config, Arc::new(FakeFetcher::default()));

        assert!(matches!(
            result,
            Err(CrawlerError::Selector { selector, .. }) if selector == "a["
        ));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let config = RecommenderConfig {
            concurrency: 0,
            ..Default::default()
        };
        let result = WebstoreCrawlerAmazon::new(&config, Arc::new(FakeFetcher::default()));
        assert!(matches!(result, Err(CrawlerError::Build(_))));
    }

    #[tokio::test]
    async fn scrapes_cards_in_page_order() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .with_page(SEARCH_URL, results_page(&[Some("/p/1"), Some("/p/2")]))
                .with_page("https://www.amazon.in/p/1", detail_page(&["Red cotton shirt"]))
                .with_page("https://www.amazon.in/p/2", detail_page(&["Blue denim jacket"])),
        );

        let outcome = crawler(fetcher.clone())
            .search_products("red cotton shirt")
            .await
            .expect("search should succeed");

        assert_eq!(
            outcome.products,
            vec![
                ScrapedProduct {
                    card: 0,
                    url: "https://www.amazon.in/p/1".to_string(),
                    description: "Red cotton shirt".to_string(),
                },
                ScrapedProduct {
                    card: 1,
                    url: "https://www.amazon.in/p/2".to_string(),
                    description: "Blue denim jacket".to_string(),
                },
            ]
        );
        assert!(outcome.skipped.is_empty());
        assert_eq!(fetcher.requests()[0], SEARCH_URL);
    }

    #[tokio::test]
    async fn skips_broken_cards_and_keeps_going() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .with_page(
                    SEARCH_URL,
                    results_page(&[
                        None,
                        Some("/p/missing"),
                        Some("/p/plain"),
                        Some("/p/ok"),
                    ]),
                )
                .with_page(
                    "https://www.amazon.in/p/plain",
                    "<html><body><p>No bullets here</p></body></html>",
                )
                .with_page("https://www.amazon.in/p/ok", detail_page(&["Slim fit"])),
        );

        let outcome = crawler(fetcher)
            .search_products("red cotton shirt")
            .await
            .expect("search should succeed");

        assert_eq!(outcome.products.len(), 1);
        assert_eq!(outcome.products[0].url, "https://www.amazon.in/p/ok");
        assert_eq!(outcome.skipped.len(), 3);
        assert_eq!(
            outcome.skipped[0],
            SkippedProduct {
                card: 0,
                url: None,
                reason: SkipReason::MissingLink,
            }
        );
        assert_eq!(outcome.skipped[1].card, 1);
        assert_eq!(
            outcome.skipped[1].url.as_deref(),
            Some("https://www.amazon.in/p/missing")
        );
        assert!(matches!(
            outcome.skipped[1].reason,
            SkipReason::FetchFailed(_)
        ));
        assert_eq!(outcome.skipped[2].reason, SkipReason::MissingDescription);
    }

    #[tokio::test]
    async fn no_cards_is_an_empty_result() {
        let fetcher = Arc::new(
            FakeFetcher::default().with_page(SEARCH_URL, "<html><body>Captcha</body></html>"),
        );

        let outcome = crawler(fetcher.clone())
            .search_products("red cotton shirt")
            .await
            .expect("search should succeed");

        assert_eq!(outcome, ScrapeOutcome::default());
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn results_page_failure_is_fatal() {
        let fetcher = Arc::new(FakeFetcher::default());

        let result = crawler(fetcher).search_products("red cotton shirt").await;

        assert!(matches!(result, Err(CrawlerError::Status { .. })));
    }

    #[tokio::test]
    async fn absolute_hrefs_are_kept() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .with_page(
                    SEARCH_URL,
                    results_page(&[Some("https://www.amazon.in/dp/B0X?ref=sr_1")]),
                )
                .with_page(
                    "https://www.amazon.in/dp/B0X?ref=sr_1",
                    detail_page(&["Linen shirt"]),
                ),
        );

        let outcome = crawler(fetcher)
            .search_products("red cotton shirt")
            .await
            .expect("search should succeed");

        assert_eq!(
            outcome.products[0].url,
            "https://www.amazon.in/dp/B0X?ref=sr_1"
        );
    }
}
