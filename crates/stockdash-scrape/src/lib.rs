#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/stockdash/stockdash/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Finviz news scraper.
//!
//! # Example
//!
//! ```no_run
//! use stockdash_core::{QuoteProvider, Symbol};
//! use stockdash_http::RetryClient;
//! use stockdash_scrape::FinvizNewsProvider;
//!
//! # async fn example() -> stockdash_core::Result<()> {
//! let provider = FinvizNewsProvider::new(RetryClient::new()?);
//! let news = provider.get_news(&Symbol::new("AAPL"), 10).await?;
//! for item in news {
//!     println!("{} ({})", item.title, item.url);
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Url;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use scraper::{Html, Selector};
use stockdash_core::{DataError, DataProvider, NewsItem, QuoteProvider, Result, Symbol, parse};
use stockdash_http::RetryClient;
use tracing::debug;

/// Finviz site root. Relative links are resolved against it.
const FINVIZ_BASE_URL: &str = "https://finviz.com";

/// Headline anchors in the quote page news table.
const NEWS_LINK_SELECTOR: &str = "a.tab-link-news";

/// Source name stamped on every scraped item.
const SOURCE_NAME: &str = "Finviz";

/// Finviz blocks non-browser agents.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// News-only provider that scrapes the Finviz quote page.
#[derive(Debug, Clone)]
pub struct FinvizNewsProvider {
    client: RetryClient,
    base_url: String,
}

impl FinvizNewsProvider {
    /// Create a provider against finviz.com.
    #[must_use]
    pub fn new(client: RetryClient) -> Self {
        Self {
            client,
            base_url: FINVIZ_BASE_URL.to_string(),
        }
    }

    /// Point the provider at another site root (e.g. a test server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Extract headline links from a quote page, in page order.
///
/// Anchors without text or `href`, and links that cannot be resolved, are
/// skipped. Every item is stamped with `fetched_at`.
fn parse_news_page(
    html: &str,
    base: &Url,
    fetched_at: &str,
    limit: usize,
) -> Result<Vec<NewsItem>> {
    let selector =
        Selector::parse(NEWS_LINK_SELECTOR).map_err(|e| DataError::Parse(e.to_string()))?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&selector)
        .filter_map(|anchor| {
            let title = anchor.text().collect::<String>().trim().to_string();
            if title.is_empty() {
                return None;
            }
            let href = anchor.value().attr("href")?;
            let url = base.join(href.trim()).ok()?;
            Some(
                NewsItem::new(title, url.to_string())
                    .with_source(SOURCE_NAME)
                    .with_published_at(fetched_at),
            )
        })
        .take(limit)
        .collect())
}

impl DataProvider for FinvizNewsProvider {
    fn name(&self) -> &str {
        "Finviz"
    }

    fn label(&self) -> &str {
        "finviz"
    }

    fn description(&self) -> &str {
        "Finviz quote page scraper for news headlines"
    }
}

#[async_trait]
impl QuoteProvider for FinvizNewsProvider {
    async fn get_news(&self, symbol: &Symbol, limit: usize) -> Result<Vec<NewsItem>> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| DataError::InvalidParameter(format!("{}: {e}", self.base_url)))?;
        let page = base
            .join("/quote.ashx")
            .map_err(|e| DataError::InvalidParameter(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        debug!("Scraping news for {} from {}", symbol, page);
        let Some(html) = self
            .client
            .get_text(page.as_str(), &[("t", symbol.as_str())], Some(&headers))
            .await?
        else {
            return Ok(Vec::new());
        };

        let fetched_at = parse::format_utc(Utc::now());
        let items = parse_news_page(&html, &base, &fetched_at, limit)?;
        debug!("Scraped {} headlines for {}", items.len(), symbol);
        Ok(items)
    }
}
