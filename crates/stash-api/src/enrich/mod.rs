//! Best-effort link enrichment: page title and favicon from the page itself,
//! summary text from an external summarizer. Every failure turns into a
//! fallback value; nothing here returns an error to the request.

mod page;
mod summary;

use std::time::Duration;

use url::Url;

pub use page::{PageMeta, extract_meta};
pub use summary::{
    FALLBACK_SUMMARY, RATE_LIMITED_SUMMARY, REJECTED_URL_SUMMARY, SUMMARY_LIMIT, SummaryFailure,
    TIMED_OUT_SUMMARY, summarizer_target, truncate_summary,
};

pub const DEFAULT_SUMMARIZER_URL: &str = "https://r.jina.ai/";
pub const PAGE_TIMEOUT: Duration = Duration::from_secs(5);
pub const SUMMARY_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct EnricherConfig {
    /// Prefix the summarizer request is built on, e.g. `https://r.jina.ai/`.
    pub summarizer_url: String,
    pub page_timeout: Duration,
    pub summary_timeout: Duration,
}

impl Default for EnricherConfig {
    fn default() -> Self {
        Self {
            summarizer_url: DEFAULT_SUMMARIZER_URL.to_string(),
            page_timeout: PAGE_TIMEOUT,
            summary_timeout: SUMMARY_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrichment {
    pub title: String,
    pub favicon: String,
    pub summary: String,
}

#[derive(Clone)]
pub struct Enricher {
    client: reqwest::Client,
    config: EnricherConfig,
}

impl Enricher {
    pub fn new(config: EnricherConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("stash/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: EnricherConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &EnricherConfig {
        &self.config
    }

    /// Scrape the parsed `url` and summarize the `submitted` text, concurrently.
    pub async fn enrich(&self, submitted: &str, url: &Url) -> Enrichment {
        let (page, summary) = tokio::join!(self.scrape(url), self.summarize(submitted));
        Enrichment {
            title: page.title,
            favicon: page.favicon,
            summary,
        }
    }
}
