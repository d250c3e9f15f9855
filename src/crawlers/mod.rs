use async_trait::async_trait;
use scraper::Html;
use thiserror::Error;

use crate::domain::product::ScrapeOutcome;

pub mod amazon;

#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("failed to build crawler: {0}")]
    Build(String),
    #[error("invalid selector {selector:?}: {message}")]
    Selector { selector: String, message: String },
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to get URL {url}: {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

pub type CrawlerResult<T> = Result<T, CrawlerError>;

/// Builds the HTTP client shared by every request of a crawler.
pub fn build_reqwest_client() -> CrawlerResult<reqwest::Client> {
    reqwest::Client::builder()
        .build()
        .map_err(|e| CrawlerError::Build(e.to_string()))
}

/// Issues GET requests and hands back the response body.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url` and returns the body text.
    async fn fetch(&self, url: &str) -> CrawlerResult<String>;
}

/// Fetches a URL and parses it into [`Html`].
pub async fn fetch_html<F>(fetcher: &F, url: &str) -> CrawlerResult<Html>
where
    F: PageFetcher + ?Sized,
{
    let text = fetcher.fetch(url).await?;
    Ok(Html::parse_document(&text))
}

/// [`PageFetcher`] performing plain `reqwest` GET requests with the client's
/// default redirect policy.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> CrawlerResult<Self> {
        Ok(Self {
            client: build_reqwest_client()?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> CrawlerResult<String> {
        let res = self.client.get(url).send().await?;
        if !res.status().is_success() {
            return Err(CrawlerError::Status {
                url: url.to_string(),
                status: res.status(),
            });
        }
        Ok(res.text().await?)
    }
}

/// An abstraction over web store crawlers that turn a search string into
/// scraped products.
#[async_trait]
pub trait WebstoreCrawler: Send + Sync {
    /// Runs the site search for `search_string` and scrapes every result card.
    ///
    /// Only a failure to load the results page itself is an error; problems
    /// with individual cards end up in [`ScrapeOutcome::skipped`].
    async fn search_products(&self, search_string: &str) -> CrawlerResult<ScrapeOutcome>;
}
