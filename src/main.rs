use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use redis_server::{
    config::ServerConfig,
    server::{RedisRole, RedisServer},
};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::parse();
    info!("snapshot file: {}", config.rdb_path().display());

    let server = Arc::new(RedisServer::new(config));

    tokio::select! {
        result = Arc::clone(&server).run() => result,
        _ = signal::ctrl_c() => {
            info!("interrupted, shutting down");
            if server.role == RedisRole::Master {
                server.save().await;
            }
            Ok(())
        }
    }
}
