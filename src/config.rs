use std::{fmt, path::PathBuf, str::FromStr};

use clap::Parser;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum ConfigError {
    #[error("--replicaof expects \"<host> <port>\", got {0:?}")]
    InvalidReplicaOf(String),
    #[error("invalid leader port {0:?}")]
    InvalidReplicaPort(String),
}

/// Address of the leader a follower replicates from.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicaOf {
    pub host: String,
    pub port: u16,
}

impl FromStr for ReplicaOf {
    type Err = ConfigError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut parts = input.split_whitespace();

        let (Some(host), Some(port), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ConfigError::InvalidReplicaOf(input.to_string()));
        };

        let port = port
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidReplicaPort(port.to_string()))?;

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for ReplicaOf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Redis-compatible in-memory data server.
#[derive(Parser, Debug, Clone)]
#[command(name = "redis-server", version, about, long_about = None)]
pub struct ServerConfig {
    /// Directory holding the snapshot file
    #[arg(long, default_value = "/tmp/redis-files")]
    pub dir: PathBuf,

    /// Snapshot file name inside --dir
    #[arg(long, default_value = "dump.rdb")]
    pub dbfilename: String,

    /// Port to listen on (bound on 127.0.0.1)
    #[arg(long, default_value_t = 6379)]
    pub port: u16,

    /// Run as a follower of "<host> <port>"
    #[arg(long)]
    pub replicaof: Option<ReplicaOf>,
}

impl ServerConfig {
    pub fn rdb_path(&self) -> PathBuf {
        self.dir.join(&self.dbfilename)
    }

    pub fn bind_address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/tmp/redis-files"),
            dbfilename: "dump.rdb".to_string(),
            port: 6379,
            replicaof: None,
        }
    }
}
