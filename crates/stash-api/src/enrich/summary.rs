use reqwest::StatusCode;
use tracing::{debug, warn};

use super::Enricher;

/// Summaries longer than this many characters are cut and suffixed with `...`.
pub const SUMMARY_LIMIT: usize = 500;

pub const FALLBACK_SUMMARY: &str = "Summary temporarily unavailable.";
pub const RATE_LIMITED_SUMMARY: &str =
    "Summary service temporarily busy (rate limit). Please try again later.";
pub const REJECTED_URL_SUMMARY: &str =
    "Could not summarize: Invalid URL provided to summarizer. Ensure it starts with http:// or https://";
pub const TIMED_OUT_SUMMARY: &str = "Summary generation timed out.";

#[derive(Debug, thiserror::Error)]
pub enum SummaryFailure {
    #[error("summarizer answered {0}")]
    Status(StatusCode),

    #[error("summarizer timed out")]
    Timeout,

    #[error("summarizer unreachable: {0}")]
    Transport(reqwest::Error),
}

impl From<reqwest::Error> for SummaryFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::Status(status)
        } else {
            Self::Transport(err)
        }
    }
}

impl SummaryFailure {
    /// Text stored in place of a summary for this kind of failure.
    pub fn fallback_text(&self) -> String {
        match self {
            Self::Status(StatusCode::TOO_MANY_REQUESTS) => RATE_LIMITED_SUMMARY.to_string(),
            Self::Status(StatusCode::BAD_REQUEST) => REJECTED_URL_SUMMARY.to_string(),
            Self::Status(status) => format!(
                "Summary API error: {} - {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown error")
            ),
            Self::Timeout => TIMED_OUT_SUMMARY.to_string(),
            Self::Transport(_) => FALLBACK_SUMMARY.to_string(),
        }
    }
}

impl Enricher {
    /// Summarize `submitted`, the URL exactly as the user gave it. Parsing
    /// would normalize it (trailing `/`, host case) and change the request.
    pub async fn summarize(&self, submitted: &str) -> String {
        let target = summarizer_target(&self.config.summarizer_url, submitted);
        debug!(%target, "Requesting summary");

        match self.fetch_summary(&target).await {
            Ok(text) if !text.trim().is_empty() => truncate_summary(text.trim()),
            Ok(_) => FALLBACK_SUMMARY.to_string(),
            Err(failure) => {
                warn!("Summarization failed for {}, using fallback: {}", submitted, failure);
                failure.fallback_text()
            }
        }
    }

    async fn fetch_summary(&self, target: &str) -> Result<String, SummaryFailure> {
        let resp = self
            .client
            .get(target)
            .timeout(self.config.summary_timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SummaryFailure::Status(status));
        }
        Ok(resp.text().await?)
    }
}

/// The summarizer takes the page as `http://<percent-encoded url>` appended
/// to its own base; the page's scheme is stripped first so it never doubles up.
pub fn summarizer_target(base: &str, url: &str) -> String {
    let stripped = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let separator = if base.ends_with('/') { "" } else { "/" };
    format!("{base}{separator}http://{}", urlencoding::encode(stripped))
}

pub fn truncate_summary(text: &str) -> String {
    match text.char_indices().nth(SUMMARY_LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
