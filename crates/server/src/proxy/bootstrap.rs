//! Seeding the current generation at install time.

use cachefront_client::RevalidationEngine;
use cachefront_client::fetch::resolve;
use cachefront_core::{Error, RequestDescriptor};
use futures_util::future::join_all;
use http::Method;
use url::Url;

/// Result of an install pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Seed paths that were fetched.
    pub seeded: Vec<String>,
    /// Seed paths whose fetch failed.
    pub failed: Vec<String>,
    /// Activate without waiting for existing clients to go away.
    pub skip_waiting: bool,
}

pub struct Bootstrapper {
    engine: RevalidationEngine,
}

impl Bootstrapper {
    pub fn new(engine: RevalidationEngine) -> Self {
        Self { engine }
    }

    /// Revalidate every seed path against `origin`, concurrently.
    ///
    /// Each seed succeeds or fails on its own. Non-200 answers count as
    /// seeded even though the engine does not store them.
    pub async fn run(&self, origin: &Url, seed_paths: &[String]) -> InstallReport {
        if let Err(e) = self.engine.open_generation().await {
            tracing::warn!(generation = %self.engine.generation(), error = %e, "failed to open generation");
        }

        let results = join_all(seed_paths.iter().map(|path| self.seed(origin, path))).await;

        let mut report = InstallReport { seeded: Vec::new(), failed: Vec::new(), skip_waiting: true };
        for (path, result) in seed_paths.iter().zip(results) {
            match result {
                Ok(status) => {
                    tracing::debug!(path = %path, status, "seeded");
                    report.seeded.push(path.clone());
                }
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "failed to seed");
                    report.failed.push(path.clone());
                }
            }
        }

        tracing::info!(
            generation = %self.engine.generation(),
            seeded = report.seeded.len(),
            failed = report.failed.len(),
            "install complete"
        );
        report
    }

    async fn seed(&self, origin: &Url, path: &str) -> Result<u16, Error> {
        let url = resolve(origin, path).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let request = RequestDescriptor::new(Method::GET, url);
        let snapshot = self.engine.revalidate(&request).await?;
        Ok(snapshot.status())
    }
}
