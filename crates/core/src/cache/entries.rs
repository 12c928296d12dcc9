//! Entry operations within a single store.
//!
//! A [`Store`] is a handle obtained from the registry. It never creates or
//! deletes stores; it only reads and writes the entries of the one it names.

use super::connection::CacheDb;
use super::hash::compute_entry_key;
use crate::{Error, RequestIdentity, ResourceResponse};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

/// Handle to one named store.
#[derive(Clone, Debug)]
pub struct Store {
    db: CacheDb,
    id: i64,
    name: String,
}

pub(crate) fn decode_response(status: u16, headers_json: &str, body: Vec<u8>) -> Result<ResourceResponse, Error> {
    let headers: Vec<(String, String)> = serde_json::from_str(headers_json)
        .map_err(|e| Error::InvalidInput(format!("corrupt headers for cached entry: {e}")))?;
    Ok(ResourceResponse::new(status, headers, body))
}

fn encode_headers(response: &ResourceResponse) -> Result<String, Error> {
    serde_json::to_string(&response.headers).map_err(|e| Error::InvalidInput(format!("failed to encode headers: {e}")))
}

/// A row ready to be written; built before entering the database thread.
struct PendingRow {
    key: String,
    method: String,
    url: String,
    status: u16,
    headers_json: String,
    body: Vec<u8>,
}

impl PendingRow {
    fn build(identity: &RequestIdentity, response: &ResourceResponse) -> Result<Self, Error> {
        if !response.is_success() {
            return Err(Error::InvalidInput(format!(
                "refusing to cache {} with status {}",
                identity.url, response.status
            )));
        }
        Ok(Self {
            key: compute_entry_key(identity),
            method: identity.method.clone(),
            url: identity.url.clone(),
            status: response.status,
            headers_json: encode_headers(response)?,
            body: response.body.to_vec(),
        })
    }

    fn insert(&self, conn: &rusqlite::Connection, store_id: i64, stored_at: &str) -> Result<(), rusqlite::Error> {
        conn.execute(
            "INSERT INTO entries (store_id, key_hash, method, url, status, headers_json, body, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(store_id, key_hash) DO UPDATE SET
                method = excluded.method,
                url = excluded.url,
                status = excluded.status,
                headers_json = excluded.headers_json,
                body = excluded.body,
                stored_at = excluded.stored_at",
            params![store_id, self.key, self.method, self.url, self.status, self.headers_json, self.body, stored_at],
        )?;
        Ok(())
    }
}

impl Store {
    pub(crate) fn new(db: CacheDb, id: i64, name: String) -> Self {
        Self { db, id, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// Look up the entry for `identity` in this store.
    pub async fn get(&self, identity: &RequestIdentity) -> Result<Option<ResourceResponse>, Error> {
        let key = compute_entry_key(identity);
        let store_id = self.id;
        self.db
            .conn
            .call(move |conn| -> Result<Option<ResourceResponse>, Error> {
                let row = conn
                    .query_row(
                        "SELECT status, headers_json, body FROM entries WHERE store_id = ?1 AND key_hash = ?2",
                        params![store_id, key],
                        |row| Ok((row.get::<_, u16>(0)?, row.get::<_, String>(1)?, row.get::<_, Vec<u8>>(2)?)),
                    )
                    .optional()?;
                row.map(|(status, headers, body)| decode_response(status, &headers, body))
                    .transpose()
            })
            .await
            .map_err(Error::from)
    }

    /// Write a successful response, replacing any existing entry for the key.
    ///
    /// Non-2xx responses are rejected with `Error::InvalidInput`.
    pub async fn put(&self, identity: &RequestIdentity, response: &ResourceResponse) -> Result<(), Error> {
        let row = PendingRow::build(identity, response)?;
        let store_id = self.id;
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                row.insert(conn, store_id, &stored_at)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Write every entry in one transaction: either all land or none do.
    pub async fn put_all(&self, entries: &[(RequestIdentity, ResourceResponse)]) -> Result<(), Error> {
        let rows = entries
            .iter()
            .map(|(identity, response)| PendingRow::build(identity, response))
            .collect::<Result<Vec<_>, _>>()?;
        let store_id = self.id;
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for row in &rows {
                    row.insert(&tx, store_id, &stored_at)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Remove one entry. Returns whether it existed.
    pub async fn delete(&self, identity: &RequestIdentity) -> Result<bool, Error> {
        let key = compute_entry_key(identity);
        let store_id = self.id;
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted =
                    conn.execute("DELETE FROM entries WHERE store_id = ?1 AND key_hash = ?2", params![store_id, key])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Identities of every entry in this store, oldest write first.
    pub async fn keys(&self) -> Result<Vec<RequestIdentity>, Error> {
        let store_id = self.id;
        self.db
            .conn
            .call(move |conn| -> Result<Vec<RequestIdentity>, Error> {
                let mut stmt =
                    conn.prepare("SELECT method, url FROM entries WHERE store_id = ?1 ORDER BY stored_at, rowid")?;
                let keys = stmt
                    .query_map(params![store_id], |row| {
                        Ok(RequestIdentity { method: row.get(0)?, url: row.get(1)? })
                    })?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn len(&self) -> Result<u64, Error> {
        let store_id = self.id;
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store_id = ?1", params![store_id], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(body: &'static [u8]) -> ResourceResponse {
        ResourceResponse::new(200, vec![("content-type".into(), "image/png".into())], body)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.ensure_store("map-tiles-v1").await.unwrap();
        let identity = RequestIdentity::get("https://tile.openstreetmap.org/3/4/2.png");

        store.put(&identity, &png(b"\x89PNG")).await.unwrap();

        let cached = store.get(&identity).await.unwrap().unwrap();
        assert_eq!(cached.status, 200);
        assert_eq!(cached.header("Content-Type"), Some("image/png"));
        assert_eq!(&cached.body[..], b"\x89PNG");
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.ensure_store("map-tiles-v1").await.unwrap();
        assert!(store.get(&RequestIdentity::get("https://x/1.png")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_rejects_non_success() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.ensure_store("map-tiles-v1").await.unwrap();
        let identity = RequestIdentity::get("https://x/1.png");

        let result = store.put(&identity, &ResourceResponse::not_found()).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_put_last_write_wins() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.ensure_store("map-tiles-v1").await.unwrap();
        let identity = RequestIdentity::get("https://x/1.png");

        store.put(&identity, &png(b"one")).await.unwrap();
        store.put(&identity, &png(b"two")).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 1);
        assert_eq!(&store.get(&identity).await.unwrap().unwrap().body[..], b"two");
    }

    #[tokio::test]
    async fn test_put_all_is_atomic() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.ensure_store("gps-marker-v1").await.unwrap();
        let entries = vec![
            (RequestIdentity::get("http://localhost/"), png(b"root")),
            (RequestIdentity::get("http://localhost/missing"), ResourceResponse::not_found()),
        ];

        assert!(store.put_all(&entries).await.is_err());
        assert_eq!(store.len().await.unwrap(), 0);

        store.put_all(&entries[..1]).await.unwrap();
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_entries_are_scoped_to_store() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let a = db.ensure_store("a").await.unwrap();
        let b = db.ensure_store("b").await.unwrap();
        let identity = RequestIdentity::get("https://x/1.png");

        a.put(&identity, &png(b"a")).await.unwrap();
        assert!(b.get(&identity).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_and_keys() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.ensure_store("map-tiles-v1").await.unwrap();
        let first = RequestIdentity::get("https://x/1.png");
        let second = RequestIdentity::get("https://x/2.png");
        store.put(&first, &png(b"1")).await.unwrap();
        store.put(&second, &png(b"2")).await.unwrap();

        assert_eq!(store.keys().await.unwrap(), vec![first.clone(), second.clone()]);
        assert!(store.delete(&first).await.unwrap());
        assert!(!store.delete(&first).await.unwrap());
        assert_eq!(store.keys().await.unwrap(), vec![second]);
    }

    #[tokio::test]
    async fn test_put_after_store_deleted_fails() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.ensure_store("map-tiles-v1").await.unwrap();
        db.delete_store("map-tiles-v1").await.unwrap();

        let result = store.put(&RequestIdentity::get("https://x/1.png"), &png(b"1")).await;
        assert!(matches!(result, Err(Error::Database(_))));
    }
}
