use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tokio::{
    net::TcpListener,
    sync::Mutex,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{error, info, warn};

use crate::{
    config::{ReplicaOf, ServerConfig},
    connection::handle_connection,
    key_value_store::KeyValueStore,
    rdb::{load_rdb_file, save_rdb_file},
    replication::{ReplicationCoordinator, run_follower},
    state::State,
};

const SAVE_INTERVAL: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, PartialEq)]
pub enum RedisRole {
    Master,
    Replica(ReplicaOf),
}

impl RedisRole {
    pub fn as_string(&self) -> &'static str {
        match self {
            RedisRole::Master => "master",
            RedisRole::Replica(_) => "slave",
        }
    }
}

/// Everything shared between connections. Created once at startup.
#[derive(Debug)]
pub struct RedisServer {
    pub config: ServerConfig,
    pub role: RedisRole,
    pub store: Arc<Mutex<KeyValueStore>>,
    /// Open transactions per connection.
    pub state: Arc<Mutex<State>>,
    pub replication: Arc<ReplicationCoordinator>,
}

impl RedisServer {
    pub fn new(config: ServerConfig) -> Self {
        let role = match &config.replicaof {
            Some(leader) => RedisRole::Replica(leader.clone()),
            None => RedisRole::Master,
        };

        Self {
            config,
            role,
            store: Arc::new(Mutex::new(KeyValueStore::new())),
            state: Arc::new(Mutex::new(State::new())),
            replication: Arc::new(ReplicationCoordinator::new()),
        }
    }

    /// Loads the snapshot file into the store. Any failure leaves the store
    /// empty and is only logged.
    pub async fn restore(&self) -> bool {
        let path = self.config.rdb_path();

        match load_rdb_file(&self.store, &path).await {
            Ok(true) => true,
            Ok(false) => false,
            Err(e) => {
                warn!("could not read snapshot {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Writes the store to the snapshot file. Failures are logged and
    /// swallowed.
    pub async fn save(&self) {
        let path = self.config.rdb_path();

        if let Err(e) = save_rdb_file(&self.store, &path).await {
            error!("could not save snapshot to {}: {}", path.display(), e);
        }
    }

    /// Binds the configured port and serves it. A leader restores its
    /// snapshot first and saves periodically; a follower connects to its
    /// leader in the background.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        let address = self.config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .with_context(|| format!("failed to bind {}", address))?;

        info!("listening on {} as {}", address, self.role.as_string());

        match &self.role {
            RedisRole::Master => {
                self.restore().await;
                self.spawn_periodic_save();
            }
            RedisRole::Replica(_) => {
                self.spawn_follower();
            }
        }

        self.serve(listener).await
    }

    /// Accepts connections forever, one task each.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> anyhow::Result<()> {
        loop {
            let (stream, client_address) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("failed to accept connection: {}", e);
                    continue;
                }
            };

            tokio::spawn(handle_connection(
                Arc::clone(&self),
                stream,
                client_address.to_string(),
            ));
        }
    }

    pub fn spawn_periodic_save(self: &Arc<Self>) -> JoinHandle<()> {
        let server = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = interval(SAVE_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                server.save().await;
            }
        })
    }

    /// Starts replicating from the configured leader. Does nothing on a
    /// leader.
    pub fn spawn_follower(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let RedisRole::Replica(leader) = &self.role else {
            return None;
        };

        let server = Arc::clone(self);
        let leader = leader.clone();

        Some(tokio::spawn(async move {
            if let Err(e) = run_follower(server, leader).await {
                error!("replication stopped: {}", e);
            }
        }))
    }
}
