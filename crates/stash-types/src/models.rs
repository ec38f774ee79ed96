use serde::{Deserialize, Serialize};

pub type UserId = u64;

/// Link ids are creation timestamps in milliseconds.
pub type LinkId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
}

/// A saved URL plus the metadata derived for it at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: LinkId,
    pub user_id: UserId,
    pub url: String,
    pub title: String,
    pub favicon: String,
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub order: u32,
}

impl Link {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Everything a store needs to persist a link; id and order are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLink {
    pub url: String,
    pub title: String,
    pub favicon: String,
    pub summary: String,
    pub tags: Vec<String>,
}

/// Trim tags, drop empty ones and duplicates. First occurrence wins.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Sorted distinct tags across a set of links.
pub fn distinct_tags<'a, I>(links: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Link>,
{
    let mut tags: Vec<String> = links
        .into_iter()
        .flat_map(|l| l.tags.iter().cloned())
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(id: LinkId, tags: &[&str]) -> Link {
        Link {
            id,
            user_id: 1,
            url: format!("https://example.com/{id}"),
            title: String::new(),
            favicon: String::new(),
            summary: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            order: 0,
        }
    }

    #[test]
    fn normalize_trims_and_dedups() {
        let tags = normalize_tags([" rust ", "", "news", "rust", "   "]);
        assert_eq!(tags, vec!["rust", "news"]);
    }

    #[test]
    fn distinct_tags_are_sorted() {
        let links = [link(1, &["web", "rust"]), link(2, &["rust", "async"])];
        assert_eq!(distinct_tags(&links), vec!["async", "rust", "web"]);
    }

    #[test]
    fn link_serializes_camel_case() {
        let json = serde_json::to_value(link(7, &["a"])).unwrap();
        assert_eq!(json["userId"], 1);
        assert_eq!(json["order"], 0);
        assert!(json.get("user_id").is_none());
    }
}
