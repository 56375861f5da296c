use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use bytes::{Bytes, BytesMut};
use rand::Rng;
use tokio::{
    sync::{Mutex, OwnedMutexGuard},
    task::JoinHandle,
    time::{Instant, sleep},
};
use tracing::{debug, info};

use crate::{
    cancellation::Cancellation, connection::ClientSender, key_value_store::KeyValueStore,
    resp::RespValue,
};

const GETACK_DEBOUNCE: Duration = Duration::from_millis(300);
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Where a connection is in the leader side of the replication handshake.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HandshakeState {
    AwaitingReplconf,
    AwaitingPsync { listening_port: u16 },
    FullResyncSent,
}

#[derive(Debug)]
struct Replica {
    client_address: String,
    sender: ClientSender,
}

#[derive(Debug, Default)]
struct ReplicationState {
    /// Leader: number of writes propagated. Follower: number of leader
    /// writes applied.
    offset: u64,
    /// Keyed by the port the replica listens on.
    replicas: HashMap<u16, Replica>,
    handshakes: HashMap<String, HandshakeState>,
    /// Replica connections that acknowledged each offset.
    acks: HashMap<u64, HashSet<String>>,
    getack_timer: Option<JoinHandle<()>>,
}

/// Replica registry, write offset and acknowledgement tracking.
///
/// One instance exists per server and is shared by every connection.
///
/// Lock order is write order, then the store, then the registry.
#[derive(Debug)]
pub struct ReplicationCoordinator {
    repl_id: String,
    state: Mutex<ReplicationState>,
    write_order: Arc<Mutex<()>>,
}

/// A connection's claim on the leader's write order.
///
/// A write applies its change and forwards it to the replicas while the order
/// is held, so replicas see writes in the order the store saw them.
#[derive(Debug)]
pub struct WriteOrder {
    lock: Arc<Mutex<()>>,
    held: Option<OwnedMutexGuard<()>>,
}

impl WriteOrder {
    /// Waits for the order unless this claim already holds it.
    pub async fn acquire(&mut self) {
        if self.held.is_none() {
            self.held = Some(Arc::clone(&self.lock).lock_owned().await);
        }
    }

    pub fn release(&mut self) {
        self.held = None;
    }

    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }
}

pub fn generate_repl_id() -> String {
    let mut rng = rand::thread_rng();
    (0..40)
        .map(|_| char::from_digit(rng.gen_range(0..16), 16).unwrap_or('0'))
        .collect()
}

fn getack_command() -> Bytes {
    RespValue::array_of_bulk_strings(["REPLCONF", "GETACK", "*"]).to_bytes()
}

impl ReplicationCoordinator {
    pub fn new() -> Self {
        Self::with_repl_id(generate_repl_id())
    }

    pub fn with_repl_id(repl_id: String) -> Self {
        Self {
            repl_id,
            state: Mutex::new(ReplicationState::default()),
            write_order: Arc::new(Mutex::new(())),
        }
    }

    /// A claim on the write order, not yet held.
    pub fn write_order(&self) -> WriteOrder {
        WriteOrder {
            lock: Arc::clone(&self.write_order),
            held: None,
        }
    }

    pub fn repl_id(&self) -> &str {
        &self.repl_id
    }

    pub async fn offset(&self) -> u64 {
        self.state.lock().await.offset
    }

    pub async fn replica_count(&self) -> usize {
        self.state.lock().await.replicas.len()
    }

    pub async fn handshake_state(&self, client_address: &str) -> HandshakeState {
        self.state
            .lock()
            .await
            .handshakes
            .get(client_address)
            .copied()
            .unwrap_or(HandshakeState::AwaitingReplconf)
    }

    /// `REPLCONF listening-port <port>`
    pub async fn register_listening_port(&self, client_address: &str, listening_port: u16) {
        let mut state = self.state.lock().await;
        state.handshakes.insert(
            client_address.to_string(),
            HandshakeState::AwaitingPsync { listening_port },
        );
    }

    /// Answers `PSYNC ? -1`: sends `+FULLRESYNC <id> <offset>` and the
    /// snapshot framed as `$<len>\r\n<bytes>` without a trailing CRLF, then
    /// starts forwarding writes to the connection.
    ///
    /// The write order is held from the snapshot until the replica is
    /// registered: every write is either in the image or forwarded after it.
    pub async fn full_resync(
        &self,
        client_address: &str,
        sender: &ClientSender,
        store: &Arc<Mutex<KeyValueStore>>,
    ) {
        let _write_order = self.write_order.lock().await;
        let snapshot = store.lock().await.snapshot();

        let mut state = self.state.lock().await;
        let offset = state.offset;

        let header = RespValue::SimpleString(format!("FULLRESYNC {} {}", self.repl_id, offset));
        let mut payload = BytesMut::with_capacity(snapshot.len() + 16);
        payload.extend_from_slice(format!("${}\r\n", snapshot.len()).as_bytes());
        payload.extend_from_slice(&snapshot);

        if sender.send(header.to_bytes()).is_err() || sender.send(payload.freeze()).is_err() {
            debug!("replica {} went away during full resync", client_address);
            return;
        }

        let listening_port = match state.handshakes.get(client_address) {
            Some(HandshakeState::AwaitingPsync { listening_port }) => *listening_port,
            _ => client_address
                .rsplit_once(':')
                .and_then(|(_, port)| port.parse().ok())
                .unwrap_or(0),
        };

        state.replicas.insert(
            listening_port,
            Replica {
                client_address: client_address.to_string(),
                sender: sender.clone(),
            },
        );
        state
            .handshakes
            .insert(client_address.to_string(), HandshakeState::FullResyncSent);
        state
            .acks
            .entry(offset)
            .or_default()
            .insert(client_address.to_string());

        info!(
            "replica {} (listening on {}) synced at offset {}",
            client_address, listening_port, offset
        );
    }

    /// Forwards a write to every replica and bumps the offset. A GETACK is
    /// scheduled for when the writes stop coming for a while.
    ///
    /// Callers hold a [`WriteOrder`] from before the write touched the store.
    pub async fn propagate(self: &Arc<Self>, command: Bytes) {
        let mut state = self.state.lock().await;
        state.offset += 1;

        if state.replicas.is_empty() {
            return;
        }

        for replica in state.replicas.values() {
            if replica.sender.send(command.clone()).is_err() {
                debug!("replica {} is gone, skipping", replica.client_address);
            }
        }

        if let Some(timer) = state.getack_timer.take() {
            timer.abort();
        }

        let coordinator = Arc::clone(self);
        state.getack_timer = Some(tokio::spawn(async move {
            sleep(GETACK_DEBOUNCE).await;
            coordinator.getack_if_behind().await;
        }));
    }

    async fn getack_if_behind(&self) {
        let state = self.state.lock().await;

        if Self::acked_count(&state) < state.replicas.len() {
            Self::send_getack(&state);
        }
    }

    fn send_getack(state: &ReplicationState) {
        let getack = getack_command();
        for replica in state.replicas.values() {
            let _ = replica.sender.send(getack.clone());
        }
    }

    fn acked_count(state: &ReplicationState) -> usize {
        let Some(acked) = state.acks.get(&state.offset) else {
            return 0;
        };

        state
            .replicas
            .values()
            .filter(|replica| acked.contains(&replica.client_address))
            .count()
    }

    /// `REPLCONF ACK <offset>`. The value the replica reports is not used;
    /// the ack counts for the leader's current offset.
    pub async fn record_ack(&self, client_address: &str) {
        let mut state = self.state.lock().await;
        let offset = state.offset;

        state.acks.retain(|acked_offset, _| *acked_offset >= offset);
        state
            .acks
            .entry(offset)
            .or_default()
            .insert(client_address.to_string());
    }

    /// Follower side: one more leader write applied.
    pub async fn record_applied(&self) {
        self.state.lock().await.offset += 1;
    }

    /// Waits until at least `required` replicas acknowledged the current
    /// offset, or the timeout elapses (`None` waits forever).
    ///
    /// Returns the number of replicas in sync, or `None` if `cancellation`
    /// fired first.
    pub async fn wait(
        &self,
        required: usize,
        timeout: Option<Duration>,
        cancellation: &Cancellation,
    ) -> Option<usize> {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);

        {
            let state = self.state.lock().await;
            let acked = Self::acked_count(&state);
            if acked >= required || state.replicas.is_empty() {
                return Some(acked);
            }

            Self::send_getack(&state);
        }

        loop {
            tokio::select! {
                _ = sleep(WAIT_POLL_INTERVAL) => {}
                _ = cancellation.cancelled() => return None,
            }

            let state = self.state.lock().await;
            let acked = Self::acked_count(&state);

            if acked >= required || deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Some(acked);
            }
        }
    }

    /// Drops every trace of a connection that closed.
    pub async fn remove_client(&self, client_address: &str) {
        let mut state = self.state.lock().await;

        state.handshakes.remove(client_address);

        let before = state.replicas.len();
        state
            .replicas
            .retain(|_, replica| replica.client_address != client_address);
        if state.replicas.len() != before {
            info!("replica {} disconnected", client_address);
        }

        for acked in state.acks.values_mut() {
            acked.remove(client_address);
        }
    }
}

impl Default for ReplicationCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
