//! offcache server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use offcache_client::{FetchClient, FetchConfig, Interceptor};
use offcache_core::{AppConfig, CacheDb, CacheStore, FsCacheStore, StoreKind};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;

    let db = match config.store {
        StoreKind::Sqlite => Some(Arc::new(CacheDb::open(&config.db_path).await?)),
        StoreKind::Fs => None,
    };
    let store: Arc<dyn CacheStore> = match &db {
        Some(db) => db.clone(),
        None => Arc::new(FsCacheStore::open(config.cache_dir.clone()).await?),
    };

    let transport = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let interceptor = Interceptor::from_config(&config, store, transport);

    tracing::info!(
        store = ?config.store,
        policy = ?config.policy_signal(),
        schemes = ?interceptor.registry().supported_schemes(),
        "Starting offcache server on stdio transport"
    );

    let handler = handler::OffcacheServer::new(interceptor, db, config.policy_signal());
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
