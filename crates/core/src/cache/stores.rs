//! Store registry operations.
//!
//! Stores are created on demand and deleted as a whole; deleting a store
//! cascades to every entry it owns.

use super::connection::CacheDb;
use super::entries::Store;
use super::hash::compute_entry_key;
use crate::{Error, RequestIdentity, ResourceResponse};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

/// A store name with its entry count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoreSummary {
    pub name: String,
    pub entries: u64,
    pub created_at: String,
}

impl CacheDb {
    /// Open the named store, creating it if it doesn't exist.
    pub async fn ensure_store(&self, name: &str) -> Result<Store, Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let lookup = name.clone();
        let id = self
            .conn
            .call(move |conn| -> Result<i64, Error> {
                conn.execute(
                    "INSERT INTO stores (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
                    params![lookup, now],
                )?;
                let id = conn.query_row("SELECT id FROM stores WHERE name = ?1", params![lookup], |row| row.get(0))?;
                Ok(id)
            })
            .await
            .map_err(Error::from)?;

        Ok(Store::new(self.clone(), id, name))
    }

    /// Open the named store only if it already exists.
    pub async fn open_store(&self, name: &str) -> Result<Option<Store>, Error> {
        let name = name.to_string();
        let lookup = name.clone();
        let id = self
            .conn
            .call(move |conn| -> Result<Option<i64>, Error> {
                let id = conn
                    .query_row("SELECT id FROM stores WHERE name = ?1", params![lookup], |row| row.get(0))
                    .optional()?;
                Ok(id)
            })
            .await
            .map_err(Error::from)?;

        Ok(id.map(|id| Store::new(self.clone(), id, name)))
    }

    /// Names of every persisted store, stale versions included, in creation order.
    pub async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY id")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, rusqlite::Error>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Every store with its entry count, in creation order.
    pub async fn store_summaries(&self) -> Result<Vec<StoreSummary>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<StoreSummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT s.name, s.created_at, COUNT(e.key_hash)
                     FROM stores s LEFT JOIN entries e ON e.store_id = s.id
                     GROUP BY s.id ORDER BY s.id",
                )?;
                let summaries = stmt
                    .query_map([], |row| {
                        Ok(StoreSummary {
                            name: row.get(0)?,
                            created_at: row.get(1)?,
                            entries: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                Ok(summaries)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a store and all its entries.
    ///
    /// Returns whether the store existed.
    pub async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM stores WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Look an identity up across every store.
    ///
    /// Stores are searched in creation order and the first hit wins.
    pub async fn match_any(&self, identity: &RequestIdentity) -> Result<Option<ResourceResponse>, Error> {
        let key = compute_entry_key(identity);
        self.conn
            .call(move |conn| -> Result<Option<ResourceResponse>, Error> {
                let row = conn
                    .query_row(
                        "SELECT e.status, e.headers_json, e.body
                         FROM entries e JOIN stores s ON s.id = e.store_id
                         WHERE e.key_hash = ?1
                         ORDER BY s.id LIMIT 1",
                        params![key],
                        |row| Ok((row.get::<_, u16>(0)?, row.get::<_, String>(1)?, row.get::<_, Vec<u8>>(2)?)),
                    )
                    .optional()?;
                row.map(|(status, headers, body)| super::entries::decode_response(status, &headers, body))
                    .transpose()
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(body: &'static str) -> ResourceResponse {
        ResourceResponse::new(200, vec![("content-type".into(), "text/plain".into())], body)
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let first = db.ensure_store("gps-marker-v1").await.unwrap();
        let second = db.ensure_store("gps-marker-v1").await.unwrap();
        assert_eq!(first.id(), second.id());
        assert_eq!(db.store_names().await.unwrap(), vec!["gps-marker-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_open_store_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.open_store("map-tiles-v1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_names_creation_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.ensure_store("b").await.unwrap();
        db.ensure_store("a").await.unwrap();
        assert_eq!(db.store_names().await.unwrap(), vec!["b".to_string(), "a".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_store_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.ensure_store("map-tiles-v1").await.unwrap();
        let identity = RequestIdentity::get("https://tile.openstreetmap.org/1/0/0.png");
        store.put(&identity, &ok("tile")).await.unwrap();

        assert!(db.delete_store("map-tiles-v1").await.unwrap());
        assert!(db.store_names().await.unwrap().is_empty());
        assert!(db.match_any(&identity).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_store_is_noop() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(!db.delete_store("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_match_any_searches_all_stores() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let statics = db.ensure_store("gps-marker-v1").await.unwrap();
        let tiles = db.ensure_store("map-tiles-v1").await.unwrap();

        let page = RequestIdentity::get("http://localhost:8080/index.html");
        let tile = RequestIdentity::get("https://tile.openstreetmap.org/2/1/1.png");
        statics.put(&page, &ok("<html>")).await.unwrap();
        tiles.put(&tile, &ok("png")).await.unwrap();

        assert_eq!(db.match_any(&page).await.unwrap().unwrap().body, "<html>");
        assert_eq!(db.match_any(&tile).await.unwrap().unwrap().body, "png");
        assert!(db.match_any(&RequestIdentity::get("http://localhost:8080/app.js")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_match_any_prefers_oldest_store() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let older = db.ensure_store("gps-marker-v1").await.unwrap();
        let newer = db.ensure_store("gps-marker-v2").await.unwrap();
        let identity = RequestIdentity::get("http://localhost:8080/");
        newer.put(&identity, &ok("new")).await.unwrap();
        older.put(&identity, &ok("old")).await.unwrap();

        assert_eq!(db.match_any(&identity).await.unwrap().unwrap().body, "old");
    }

    #[tokio::test]
    async fn test_store_summaries_counts_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let tiles = db.ensure_store("map-tiles-v1").await.unwrap();
        db.ensure_store("gps-marker-v1").await.unwrap();
        tiles.put(&RequestIdentity::get("https://t/1.png"), &ok("1")).await.unwrap();
        tiles.put(&RequestIdentity::get("https://t/2.png"), &ok("2")).await.unwrap();

        let summaries = db.store_summaries().await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].name, "map-tiles-v1");
        assert_eq!(summaries[0].entries, 2);
        assert_eq!(summaries[1].entries, 0);
    }
}
