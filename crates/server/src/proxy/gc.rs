//! Removal of cache generations left behind by previous versions.

use std::sync::Arc;

use cachefront_core::{CacheStore, Generation};
use futures_util::future::join_all;

/// What an activation pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcReport {
    pub removed: Vec<Generation>,
    pub failed: Vec<Generation>,
}

pub struct GenerationGc {
    store: Arc<dyn CacheStore>,
}

impl GenerationGc {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Delete every generation except `current`.
    ///
    /// Deletions run concurrently and are all awaited. A failed deletion is
    /// logged and reported; it never stops the others.
    pub async fn run(&self, current: &Generation) -> GcReport {
        let generations = match self.store.list_generations().await {
            Ok(generations) => generations,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list cache generations");
                return GcReport::default();
            }
        };

        let stale: Vec<Generation> = generations.into_iter().filter(|g| g != current).collect();
        let results = join_all(stale.iter().map(|g| self.store.delete_generation(g))).await;

        let mut report = GcReport::default();
        for (generation, result) in stale.into_iter().zip(results) {
            match result {
                Ok(entries) => {
                    tracing::info!(generation = %generation, entries, "removed stale generation");
                    report.removed.push(generation);
                }
                Err(e) => {
                    tracing::warn!(generation = %generation, error = %e, "failed to remove stale generation");
                    report.failed.push(generation);
                }
            }
        }
        report
    }
}
