use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{debug, warn};
use url::Url;

use super::Enricher;

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").expect("title regex"));
static META_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("meta regex"));
static LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<link\b[^>]*>").expect("link regex"));
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)([a-z_:.-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).expect("attr regex")
});
static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)&(#x[0-9a-f]+|#[0-9]+|[a-z]+);").expect("entity regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMeta {
    pub title: String,
    pub favicon: String,
}

impl PageMeta {
    /// Hostname as title, `/favicon.ico` on the page's origin.
    pub fn fallback(url: &Url) -> Self {
        Self {
            title: url.host_str().unwrap_or(url.as_str()).to_string(),
            favicon: url
                .join("/favicon.ico")
                .map(String::from)
                .unwrap_or_default(),
        }
    }
}

impl Enricher {
    pub async fn scrape(&self, url: &Url) -> PageMeta {
        match self.fetch_page(url).await {
            Ok(html) => {
                let meta = extract_meta(&html, url);
                debug!(title = %meta.title, favicon = %meta.favicon, "Scraped {}", url);
                meta
            }
            Err(e) => {
                warn!("Failed to scrape title/favicon for {}: {}", url, e);
                PageMeta::fallback(url)
            }
        }
    }

    async fn fetch_page(&self, url: &Url) -> reqwest::Result<String> {
        self.client
            .get(url.clone())
            .timeout(self.config.page_timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

/// Title: `<title>`, then `og:title`, then the hostname.
/// Favicon: `rel="icon"`, then `rel="shortcut icon"`, resolved against the
/// page URL, then `/favicon.ico`. A protocol-relative href (`//cdn/...`)
/// takes the page's own scheme.
pub fn extract_meta(html: &str, url: &Url) -> PageMeta {
    let fallback = PageMeta::fallback(url);

    let title = document_title(html)
        .or_else(|| og_title(html))
        .unwrap_or(fallback.title);

    let favicon = icon_href(html)
        .and_then(|href| url.join(&href).ok())
        .map(String::from)
        .unwrap_or(fallback.favicon);

    PageMeta { title, favicon }
}

fn document_title(html: &str) -> Option<String> {
    let raw = TITLE_RE.captures(html)?.get(1)?.as_str();
    non_empty(clean_text(raw))
}

fn og_title(html: &str) -> Option<String> {
    META_RE.find_iter(html).find_map(|tag| {
        let attrs = attributes(tag.as_str());
        let is_og_title = attr(&attrs, "property").is_some_and(|p| p.eq_ignore_ascii_case("og:title"));
        if is_og_title {
            attr(&attrs, "content").map(clean_text).and_then(non_empty)
        } else {
            None
        }
    })
}

fn icon_href(html: &str) -> Option<String> {
    let links: Vec<Vec<(String, String)>> = LINK_RE
        .find_iter(html)
        .map(|tag| attributes(tag.as_str()))
        .collect();

    ["icon", "shortcut icon"].iter().find_map(|wanted| {
        links.iter().find_map(|attrs| {
            let rel = attr(attrs, "rel")?;
            if !rel.trim().eq_ignore_ascii_case(wanted) {
                return None;
            }
            attr(attrs, "href").map(|h| h.trim().to_string()).and_then(non_empty)
        })
    })
}

/// Lower-cased attribute names with their raw values.
fn attributes(tag: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(tag)
        .map(|c| {
            let value = c
                .get(2)
                .or_else(|| c.get(3))
                .or_else(|| c.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();
            (c[1].to_ascii_lowercase(), value.to_string())
        })
        .collect()
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn clean_text(raw: &str) -> String {
    let decoded = decode_entities(raw);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(raw: &str) -> String {
    ENTITY_RE
        .replace_all(raw, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity.to_ascii_lowercase().as_str() {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ => None,
                }
            };
            decoded.map(String::from).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}
