use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};

use stash_types::models::{Link, LinkId, NewLink, User, UserId};

use crate::{Repository, Result, SqliteStore, StoreError, is_permutation, next_link_id};

impl Repository for SqliteStore {
    // -- Users --

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.with_conn(|conn| query_user_by_email(conn, email))
    }

    fn create_user(&self, email: &str, password_hash: &str) -> Result<User> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if query_user_by_email(&tx, email)?.is_some() {
                return Err(StoreError::EmailTaken);
            }
            tx.execute(
                "INSERT INTO users (email, password_hash) VALUES (?1, ?2)",
                (email, password_hash),
            )?;
            let id = tx.last_insert_rowid() as UserId;
            tx.commit()?;

            Ok(User {
                id,
                email: email.to_string(),
                password_hash: password_hash.to_string(),
            })
        })
    }

    // -- Links --

    fn links_for_user(&self, user_id: UserId) -> Result<Vec<Link>> {
        self.with_conn(|conn| query_links(conn, user_id))
    }

    fn insert_link(&self, user_id: UserId, link: NewLink) -> Result<Link> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM links WHERE user_id = ?1",
                [user_id as i64],
                |row| row.get(0),
            )?;
            let max_id: Option<i64> =
                tx.query_row("SELECT MAX(id) FROM links", [], |row| row.get(0))?;
            let id = next_link_id(max_id);
            let tags = serde_json::to_string(&link.tags)?;

            tx.execute(
                "INSERT INTO links (id, user_id, url, title, favicon, summary, tags, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    id,
                    user_id as i64,
                    &link.url,
                    &link.title,
                    &link.favicon,
                    &link.summary,
                    tags,
                    count
                ],
            )?;
            tx.commit()?;

            Ok(Link {
                id,
                user_id,
                url: link.url,
                title: link.title,
                favicon: link.favicon,
                summary: link.summary,
                tags: link.tags,
                order: count as u32,
            })
        })
    }

    fn delete_link(&self, user_id: UserId, link_id: LinkId) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM links WHERE id = ?1 AND user_id = ?2",
                rusqlite::params![link_id, user_id as i64],
            )?;
            Ok(removed > 0)
        })
    }

    fn reorder_links(&self, user_id: UserId, ordered: &[LinkId]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let owned: Vec<LinkId> = {
                let mut stmt = tx.prepare("SELECT id FROM links WHERE user_id = ?1")?;
                stmt.query_map([user_id as i64], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            };
            if !is_permutation(&owned, ordered) {
                return Err(StoreError::InvalidOrder);
            }

            {
                let mut stmt =
                    tx.prepare("UPDATE links SET position = ?1 WHERE id = ?2 AND user_id = ?3")?;
                for (position, id) in ordered.iter().enumerate() {
                    stmt.execute(rusqlite::params![position as i64, id, user_id as i64])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }
}

fn query_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let mut stmt = conn.prepare("SELECT id, email, password_hash FROM users WHERE email = ?1")?;

    let row = stmt
        .query_row([email], |row| {
            Ok(User {
                id: row.get::<_, i64>(0)? as UserId,
                email: row.get(1)?,
                password_hash: row.get(2)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_links(conn: &Connection, user_id: UserId) -> Result<Vec<Link>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, url, title, favicon, summary, tags, position
         FROM links
         WHERE user_id = ?1
         ORDER BY position ASC, id ASC",
    )?;

    let rows = stmt
        .query_map([user_id as i64], link_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn link_from_row(row: &Row<'_>) -> rusqlite::Result<Link> {
    let tags: String = row.get(6)?;
    let tags = serde_json::from_str(&tags)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

    Ok(Link {
        id: row.get(0)?,
        user_id: row.get::<_, i64>(1)? as UserId,
        url: row.get(2)?,
        title: row.get(3)?,
        favicon: row.get(4)?,
        summary: row.get(5)?,
        tags,
        order: row.get::<_, i64>(7)? as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_link(url: &str) -> NewLink {
        NewLink {
            url: url.to_string(),
            title: url.to_string(),
            favicon: String::new(),
            summary: String::new(),
            tags: vec!["t".to_string()],
        }
    }

    fn store_with_users() -> (SqliteStore, User, User) {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = store.create_user("a@example.com", "hash-a").unwrap();
        let b = store.create_user("b@example.com", "hash-b").unwrap();
        (store, a, b)
    }

    #[test]
    fn users_are_sequential_and_unique() {
        let (store, a, b) = store_with_users();
        assert_eq!((a.id, b.id), (1, 2));
        assert!(matches!(
            store.create_user("a@example.com", "x"),
            Err(StoreError::EmailTaken)
        ));
        assert_eq!(
            store.find_user_by_email("a@example.com").unwrap(),
            Some(a)
        );
    }

    #[test]
    fn links_round_trip_with_tags_and_order() {
        let (store, a, b) = store_with_users();
        let first = store.insert_link(a.id, new_link("https://one.dev")).unwrap();
        store.insert_link(b.id, new_link("https://other.dev")).unwrap();
        let second = store.insert_link(a.id, new_link("https://two.dev")).unwrap();
        assert_eq!((first.order, second.order), (0, 1));

        let links = store.links_for_user(a.id).unwrap();
        assert_eq!(links, vec![first, second]);
    }

    #[test]
    fn reorder_validates_in_a_transaction() {
        let (store, a, b) = store_with_users();
        let x = store.insert_link(a.id, new_link("https://x.dev")).unwrap();
        let y = store.insert_link(a.id, new_link("https://y.dev")).unwrap();
        let foreign = store.insert_link(b.id, new_link("https://z.dev")).unwrap();

        assert!(matches!(
            store.reorder_links(a.id, &[x.id, foreign.id]),
            Err(StoreError::InvalidOrder)
        ));
        let ids: Vec<LinkId> = store.links_for_user(a.id).unwrap().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![x.id, y.id]);

        store.reorder_links(a.id, &[y.id, x.id]).unwrap();
        let ids: Vec<LinkId> = store.links_for_user(a.id).unwrap().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![y.id, x.id]);
    }

    #[test]
    fn delete_requires_ownership() {
        let (store, a, b) = store_with_users();
        let x = store.insert_link(a.id, new_link("https://x.dev")).unwrap();
        assert!(!store.delete_link(b.id, x.id).unwrap());
        assert!(store.delete_link(a.id, x.id).unwrap());
        assert!(store.links_for_user(a.id).unwrap().is_empty());
    }
}
