//! cachefront server entry point.
//!
//! Boots the caching reverse proxy: installs the current generation, activates
//! it (removing older generations) and then serves requests over HTTP.
//! Logs are JSON on stderr.

use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use anyhow::Result;
use cachefront_client::{FetchClient, FetchConfig, fetch::canonicalize};
use cachefront_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod error;
mod host;
mod proxy;

use proxy::InterceptProxy;

#[actix_web::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let origin = canonicalize(&config.origin)?;

    tracing::info!(
        origin = %origin,
        listen = %config.listen,
        generation = %config.generation,
        db_path = %config.db_path.display(),
        "Starting cachefront"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let fetcher = FetchClient::new(FetchConfig::from(&config))?;
    let proxy = InterceptProxy::new(
        Arc::new(db),
        Arc::new(fetcher),
        config.generation.clone(),
        origin,
        config.seed_paths.clone(),
    );

    let install = proxy.on_install().await;
    if install.skip_waiting {
        let activation = proxy.on_activate().await;
        tracing::info!(
            removed = activation.removed.len(),
            failed = activation.failed.len(),
            "activated generation {}",
            proxy.generation()
        );
    }

    let proxy = web::Data::new(proxy);
    HttpServer::new(move || App::new().app_data(proxy.clone()).configure(host::configure))
        .bind(config.listen.as_str())?
        .run()
        .await?;

    Ok(())
}
