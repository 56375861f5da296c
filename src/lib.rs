//! A Redis-compatible server.
//!
//! Supports strings with expiry (GET, SET, INCR, KEYS, TYPE), lists (LPUSH,
//! RPUSH, LPOP, BLPOP, LRANGE, LLEN), streams (XADD, XRANGE, XREAD), pub/sub,
//! MULTI/EXEC transactions, RDB snapshots and leader/follower replication
//! with WAIT. Clients speak RESP over TCP; every connection runs on its own
//! Tokio task.

pub mod cancellation;
pub mod commands;
pub mod config;
pub mod connection;
pub mod input;
pub mod key_value_store;
pub mod pub_sub;
pub mod rdb;
pub mod replication;
pub mod resp;
pub mod server;
pub mod state;
pub mod stream;
