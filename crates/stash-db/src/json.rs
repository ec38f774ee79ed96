use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use stash_types::models::{Link, LinkId, NewLink, User, UserId};

use crate::{Repository, Result, StoreError, is_permutation, next_link_id};

/// On-disk shape of the flat-file store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub links: Vec<Link>,
}

/// Single JSON document holding every user and link.
///
/// The document is cached in memory. A mutation is applied to a copy,
/// written to `<path>.tmp`, renamed over the store file, and only then
/// published, so a failed write leaves both file and cache untouched.
pub struct JsonStore {
    path: PathBuf,
    doc: Mutex<Document>,
}

impl JsonStore {
    /// Load the store, creating an empty document if the file is missing.
    pub fn open(path: &Path) -> Result<Self> {
        let doc = match fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("{} not found, creating an empty store", path.display());
                let doc = Document::default();
                write_atomic(path, &doc)?;
                doc
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            "JSON store opened at {} ({} users, {} links)",
            path.display(),
            doc.users.len(),
            doc.links.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            doc: Mutex::new(doc),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Document>> {
        self.doc.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Run `f` against a copy of the document and persist it if `f` succeeds.
    fn update<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Document) -> Result<T>,
    {
        let mut guard = self.lock()?;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        self.publish(&mut guard, next)?;
        Ok(out)
    }

    fn publish(&self, guard: &mut MutexGuard<'_, Document>, next: Document) -> Result<()> {
        write_atomic(&self.path, &next)?;
        **guard = next;
        Ok(())
    }
}

fn write_atomic(path: &Path, doc: &Document) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let text = serde_json::to_string_pretty(doc)?;
    fs::write(&tmp, text)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn sorted_links_for(doc: &Document, user_id: UserId) -> Vec<Link> {
    let mut links: Vec<Link> = doc
        .links
        .iter()
        .filter(|l| l.user_id == user_id)
        .cloned()
        .collect();
    links.sort_by_key(|l| (l.order, l.id));
    links
}

impl Repository for JsonStore {
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let doc = self.lock()?;
        Ok(doc.users.iter().find(|u| u.email == email).cloned())
    }

    fn create_user(&self, email: &str, password_hash: &str) -> Result<User> {
        self.update(|doc| {
            if doc.users.iter().any(|u| u.email == email) {
                return Err(StoreError::EmailTaken);
            }
            let id = doc.users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
            let user = User {
                id,
                email: email.to_string(),
                password_hash: password_hash.to_string(),
            };
            doc.users.push(user.clone());
            Ok(user)
        })
    }

    fn links_for_user(&self, user_id: UserId) -> Result<Vec<Link>> {
        let doc = self.lock()?;
        Ok(sorted_links_for(&doc, user_id))
    }

    fn insert_link(&self, user_id: UserId, link: NewLink) -> Result<Link> {
        self.update(|doc| {
            let order = doc.links.iter().filter(|l| l.user_id == user_id).count() as u32;
            let id = next_link_id(doc.links.iter().map(|l| l.id).max());
            let link = Link {
                id,
                user_id,
                url: link.url,
                title: link.title,
                favicon: link.favicon,
                summary: link.summary,
                tags: link.tags,
                order,
            };
            doc.links.push(link.clone());
            Ok(link)
        })
    }

    fn delete_link(&self, user_id: UserId, link_id: LinkId) -> Result<bool> {
        let mut guard = self.lock()?;
        let Some(index) = guard
            .links
            .iter()
            .position(|l| l.id == link_id && l.user_id == user_id)
        else {
            return Ok(false);
        };

        let mut next = guard.clone();
        next.links.remove(index);
        self.publish(&mut guard, next)?;
        Ok(true)
    }

    fn reorder_links(&self, user_id: UserId, ordered: &[LinkId]) -> Result<()> {
        self.update(|doc| {
            let owned: Vec<LinkId> = doc
                .links
                .iter()
                .filter(|l| l.user_id == user_id)
                .map(|l| l.id)
                .collect();
            if !is_permutation(&owned, ordered) {
                return Err(StoreError::InvalidOrder);
            }

            for link in doc.links.iter_mut().filter(|l| l.user_id == user_id) {
                if let Some(position) = ordered.iter().position(|id| *id == link.id) {
                    link.order = position as u32;
                }
            }
            Ok(())
        })
    }
}
