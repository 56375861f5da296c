mod coordinator;
mod follower;

pub use coordinator::{HandshakeState, ReplicationCoordinator, WriteOrder, generate_repl_id};
pub use follower::{ReplicationError, handshake, is_valid_repl_id, run_follower};
