pub mod json;
pub mod migrations;
pub mod queries;
pub mod sqlite;

use std::collections::HashSet;

use stash_types::models::{Link, LinkId, NewLink, User, UserId};

pub use json::JsonStore;
pub use sqlite::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email is already registered")]
    EmailTaken,

    #[error("ordered ids are not a permutation of the user's links")]
    InvalidOrder,

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store document is malformed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// User and link persistence. Handlers only ever see this trait.
///
/// Operations are synchronous; async callers run them on the blocking pool.
pub trait Repository: Send + Sync {
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Fails with [`StoreError::EmailTaken`] when the email exists.
    fn create_user(&self, email: &str, password_hash: &str) -> Result<User>;

    /// The user's links, ascending by order.
    fn links_for_user(&self, user_id: UserId) -> Result<Vec<Link>>;

    /// Assigns a fresh id and `order = number of links the user already has`.
    fn insert_link(&self, user_id: UserId, link: NewLink) -> Result<Link>;

    /// Returns false when the user owns no link with this id.
    fn delete_link(&self, user_id: UserId, link_id: LinkId) -> Result<bool>;

    /// `ordered` must be exactly a permutation of the user's link ids,
    /// otherwise [`StoreError::InvalidOrder`] and nothing changes.
    fn reorder_links(&self, user_id: UserId, ordered: &[LinkId]) -> Result<()>;
}

/// Millisecond timestamp id, bumped past the largest existing id so links
/// created in the same millisecond stay unique.
pub(crate) fn next_link_id(max_existing: Option<LinkId>) -> LinkId {
    let now = chrono::Utc::now().timestamp_millis();
    match max_existing {
        Some(max) if max >= now => max + 1,
        _ => now,
    }
}

pub(crate) fn is_permutation(owned: &[LinkId], ordered: &[LinkId]) -> bool {
    if owned.len() != ordered.len() {
        return false;
    }
    let owned: HashSet<LinkId> = owned.iter().copied().collect();
    let mut seen = HashSet::with_capacity(ordered.len());
    ordered.iter().all(|id| owned.contains(id) && seen.insert(*id))
}
