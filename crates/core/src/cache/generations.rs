//! Cache generations.
//!
//! A generation is the partition of the cache written by one deployed
//! proxy version. Reads and writes always name the generation explicitly;
//! older generations are removed wholesale, never entry by entry.

use std::collections::BTreeSet;
use std::fmt;

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// Identifier of a cache generation, compared by exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(String);

impl Generation {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Generation {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Generation {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl CacheDb {
    /// Create the generation's namespace if it does not exist yet.
    pub async fn open_generation(&self, generation: &Generation) -> Result<(), Error> {
        let id = generation.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (id, created_at) VALUES (?1, ?2)",
                    params![id, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// List every generation known to the store.
    pub async fn list_generations(&self) -> Result<BTreeSet<Generation>, Error> {
        self.conn
            .call(|conn| -> Result<BTreeSet<Generation>, Error> {
                let mut stmt = conn.prepare("SELECT id FROM generations")?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

                let mut generations = BTreeSet::new();
                for id in rows {
                    generations.insert(Generation::from(id?));
                }
                Ok(generations)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and every snapshot stored under it.
    ///
    /// Returns the number of deleted snapshots. Deleting an unknown
    /// generation is a no-op.
    pub async fn delete_generation(&self, generation: &Generation) -> Result<u64, Error> {
        let id = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                let deleted = tx.execute("DELETE FROM snapshots WHERE generation = ?1", params![id])?;
                tx.execute("DELETE FROM generations WHERE id = ?1", params![id])?;
                tx.commit()?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
