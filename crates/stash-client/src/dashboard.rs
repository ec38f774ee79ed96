use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use stash_types::models::{Link, LinkId, normalize_tags};

use crate::api::{ApiClient, ClientError, Result};
use crate::board::Board;
use crate::session::TokenStore;

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(https?://[^\s$.?#].[^\s]*)$").expect("url regex"));

/// Board state kept in step with the server.
///
/// Local state changes first where that is safe (reorder); a failed server
/// call is repaired by refetching. A 401/403 ends the session and forgets
/// the stored token.
pub struct Dashboard {
    api: ApiClient,
    board: Board,
    tokens: TokenStore,
}

impl Dashboard {
    pub fn new(api: ApiClient, tokens: TokenStore) -> Self {
        Self {
            api,
            board: Board::new(),
            tokens,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub async fn refresh(&mut self) -> Result<()> {
        let result = self.api.list_links(None).await;
        let links = result.map_err(|e| self.end_session_on(e))?;
        self.board.replace(links);
        Ok(())
    }

    /// Every tag in use on the server, sorted.
    pub async fn tags(&mut self) -> Result<Vec<String>> {
        let result = self.api.tags().await;
        result.map_err(|e| self.end_session_on(e))
    }

    /// Validate and save a URL with comma-separated tags.
    pub async fn save(&mut self, url: &str, tags_input: &str) -> Result<Link> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ClientError::Invalid("URL cannot be empty.".into()));
        }
        if !is_valid_url(url) {
            return Err(ClientError::Invalid(
                "Please enter a valid URL starting with http:// or https://".into(),
            ));
        }

        let tags = parse_tags(tags_input);
        let result = self.api.create_link(url, &tags).await;
        let link = result.map_err(|e| self.end_session_on(e))?;
        self.board.push(link.clone());
        Ok(link)
    }

    pub async fn delete(&mut self, id: LinkId) -> Result<()> {
        let result = self.api.delete_link(id).await;
        result.map_err(|e| self.end_session_on(e))?;
        self.board.remove(id);
        Ok(())
    }

    /// Move the visible link at `from` to `to`. The board changes before the
    /// server answers; if the server rejects it the board is refetched.
    pub async fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        let ids = self
            .board
            .move_link(from, to)
            .ok_or_else(|| ClientError::Invalid(format!("No link at position {}.", from.max(to) + 1)))?;

        let result = self.api.reorder_links(&ids).await;
        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                let e = self.end_session_on(e);
                if !matches!(e, ClientError::SessionExpired) {
                    warn!("Failed to save new order, resyncing: {}", e);
                    if let Err(resync) = self.refresh().await {
                        warn!("Resync failed: {}", resync);
                    }
                }
                Err(e)
            }
        }
    }

    fn end_session_on(&mut self, err: ClientError) -> ClientError {
        if matches!(err, ClientError::SessionExpired) {
            self.api.set_token(None);
            if let Err(e) = self.tokens.clear() {
                warn!("Could not remove {}: {}", self.tokens.path().display(), e);
            }
        }
        err
    }
}

/// Split on commas, trim, drop empty entries.
pub fn parse_tags(input: &str) -> Vec<String> {
    normalize_tags(input.split(','))
}

pub fn is_valid_url(url: &str) -> bool {
    URL_RE.is_match(url.trim())
}
