//! Response snapshot storage.
//!
//! Provides functions for reading and writing captured origin responses
//! within a generation.

use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::generations::Generation;
use super::hash::CacheKey;
use crate::Error;

/// An immutable copy of an origin response.
///
/// The body is a reference-counted buffer: cloning a snapshot hands out an
/// independent reader over the same bytes, so the copy given to the caller
/// and the copy written to the store never drain each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
    fetched_at: String,
}

impl ResponseSnapshot {
    /// Capture a response now.
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Bytes) -> Self {
        Self::from_parts(status, headers, body, chrono::Utc::now().to_rfc3339())
    }

    /// Rebuild a snapshot captured earlier.
    pub fn from_parts(status: u16, headers: Vec<(String, String)>, body: Bytes, fetched_at: String) -> Self {
        Self { status, headers, body, fetched_at }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// RFC 3339 timestamp of when the response was captured.
    pub fn fetched_at(&self) -> &str {
        &self.fetched_at
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Only complete `200 OK` responses that may be shared between clients
    /// are ever written to the cache.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.is_shareable()
    }

    /// False when the response carries per-client state: a `Set-Cookie`,
    /// `Cache-Control: private` or `no-store`, or a `Vary` on credentials.
    pub fn is_shareable(&self) -> bool {
        !self.headers.iter().any(|(name, value)| {
            let directives = || value.split(',').map(|d| d.trim().to_ascii_lowercase());
            if name.eq_ignore_ascii_case("set-cookie") {
                true
            } else if name.eq_ignore_ascii_case("cache-control") {
                directives().any(|d| PRIVATE_DIRECTIVES.contains(&d.split('=').next().unwrap_or_default().trim_end()))
            } else if name.eq_ignore_ascii_case("vary") {
                directives().any(|d| PRIVATE_VARY.contains(&d.as_str()))
            } else {
                false
            }
        })
    }
}

/// `Cache-Control` directives that forbid a shared cache from storing.
const PRIVATE_DIRECTIVES: &[&str] = &["private", "no-store"];

/// `Vary` values that make a response depend on who asked.
const PRIVATE_VARY: &[&str] = &["*", "cookie", "authorization"];

impl CacheDb {
    /// Insert or replace the snapshot stored for `key` in `generation`.
    ///
    /// The generation row and the snapshot are written in one transaction;
    /// the last writer for a key wins.
    pub async fn put_snapshot(
        &self, generation: &Generation, key: &CacheKey, snapshot: &ResponseSnapshot,
    ) -> Result<(), Error> {
        let generation = generation.to_string();
        let key = key.clone();
        let snapshot = snapshot.clone();
        let headers_json = serde_json::to_string(&snapshot.headers)?;
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO generations (id, created_at) VALUES (?1, ?2)",
                    params![generation, now],
                )?;
                tx.execute(
                    "INSERT INTO snapshots (
                    generation, key_hash, method, url, status_code, headers_json, body, fetched_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(generation, key_hash) DO UPDATE SET
                    method = excluded.method,
                    url = excluded.url,
                    status_code = excluded.status_code,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    fetched_at = excluded.fetched_at",
                    params![
                        &generation,
                        &key.hash,
                        &key.method,
                        &key.url,
                        snapshot.status as i64,
                        &headers_json,
                        &snapshot.body[..],
                        &snapshot.fetched_at,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get the snapshot stored for `key` in `generation`.
    ///
    /// Returns None if there is no entry; a miss is never an error.
    pub async fn get_snapshot(&self, generation: &Generation, key: &CacheKey) -> Result<Option<ResponseSnapshot>, Error> {
        let generation = generation.to_string();
        let key_hash = key.hash.clone();
        self.conn
            .call(move |conn| -> Result<Option<ResponseSnapshot>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status_code, headers_json, body, fetched_at
                FROM snapshots WHERE generation = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![generation, key_hash], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                });

                match result {
                    Ok((status, headers_json, body, fetched_at)) => {
                        let status = u16::try_from(status)
                            .map_err(|_| Error::Serialization(format!("invalid status code {status}")))?;
                        let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
                        Ok(Some(ResponseSnapshot::from_parts(status, headers, Bytes::from(body), fetched_at)))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Number of snapshots stored under a generation.
    pub async fn count_snapshots(&self, generation: &Generation) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM snapshots WHERE generation = ?1",
                    params![generation],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
