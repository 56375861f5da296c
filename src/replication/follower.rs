//! Follower side of replication: handshake with the leader, load the
//! snapshot it sends, then apply its command stream.

use std::sync::Arc;

use bytes::BytesMut;
use regex::Regex;
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};
use tracing::{info, warn};

use crate::{
    config::ReplicaOf,
    connection::{ClientOrigin, run_connection},
    input::{CommandReadError, read_bulk_payload, read_frame},
    resp::RespValue,
    server::RedisServer,
};

#[derive(Error, Debug)]
pub enum ReplicationError {
    #[error("could not connect to leader {0}: {1}")]
    Connect(String, std::io::Error),
    #[error("failed to write to leader: {0}")]
    Write(#[from] std::io::Error),
    #[error("failed to read from leader: {0}")]
    Read(#[from] CommandReadError),
    #[error("leader did not accept PSYNC, replied {0:?}")]
    UnexpectedPsyncReply(RespValue),
}

pub fn is_valid_repl_id(repl_id: &str) -> bool {
    Regex::new(r"^[a-zA-Z0-9]{40}$").is_ok_and(|regex| regex.is_match(repl_id))
}

async fn send_command<W>(writer: &mut W, words: &[&str]) -> Result<(), ReplicationError>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(&RespValue::array_of_bulk_strings(words).to_bytes())
        .await?;
    writer.flush().await?;
    Ok(())
}

/// Sends one handshake step and waits for its reply. A reply other than the
/// expected one is logged and the handshake carries on.
async fn handshake_step<R, W>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut BytesMut,
    words: &[&str],
    expected: &str,
) -> Result<(), ReplicationError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    send_command(writer, words).await?;
    let reply = read_frame(reader, buffer).await?;

    if reply.value != RespValue::simple_string(expected) {
        warn!(
            "unexpected reply to {}: {:?}, continuing",
            words.join(" "),
            reply.value
        );
    }

    Ok(())
}

/// Runs `PING`, `REPLCONF listening-port`, `REPLCONF capa psync2` and
/// `PSYNC ? -1` in order, one reply at a time.
///
/// # Returns
///
/// * `Ok((replication_id, offset))` - Taken from the `+FULLRESYNC` reply
/// * `Err(ReplicationError::UnexpectedPsyncReply)` - No full resync offered
pub async fn handshake<R, W>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut BytesMut,
    listening_port: u16,
) -> Result<(String, u64), ReplicationError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    handshake_step(reader, writer, buffer, &["PING"], "PONG").await?;

    let port = listening_port.to_string();
    handshake_step(
        reader,
        writer,
        buffer,
        &["REPLCONF", "listening-port", port.as_str()],
        "OK",
    )
    .await?;

    handshake_step(reader, writer, buffer, &["REPLCONF", "capa", "psync2"], "OK").await?;

    send_command(writer, &["PSYNC", "?", "-1"]).await?;
    let reply = read_frame(reader, buffer).await?;

    let RespValue::SimpleString(line) = &reply.value else {
        return Err(ReplicationError::UnexpectedPsyncReply(reply.value.clone()));
    };

    let parts: Vec<&str> = line.split_whitespace().collect();
    let ["FULLRESYNC", repl_id, offset] = parts.as_slice() else {
        return Err(ReplicationError::UnexpectedPsyncReply(reply.value.clone()));
    };

    if !is_valid_repl_id(repl_id) {
        warn!("leader sent a malformed replication id {:?}", repl_id);
    }

    let offset = offset.parse::<u64>().unwrap_or_else(|_| {
        warn!("leader sent a malformed offset {:?}", offset);
        0
    });

    Ok((repl_id.to_string(), offset))
}

/// Connects to the leader, synchronises and then applies its write stream
/// until the connection drops.
///
/// Bytes that arrive together with the end of the snapshot stay in the read
/// buffer and are the first commands applied afterwards.
pub async fn run_follower(
    server: Arc<RedisServer>,
    leader: ReplicaOf,
) -> Result<(), ReplicationError> {
    let stream = TcpStream::connect((leader.host.as_str(), leader.port))
        .await
        .map_err(|e| ReplicationError::Connect(leader.to_string(), e))?;
    let (mut reader, mut writer) = stream.into_split();
    let mut buffer = BytesMut::new();

    let (repl_id, offset) =
        handshake(&mut reader, &mut writer, &mut buffer, server.config.port).await?;
    info!(
        "full resync with leader {} (replid {}, offset {})",
        leader, repl_id, offset
    );

    let snapshot = read_bulk_payload(&mut reader, &mut buffer).await?;
    let restored = server.store.lock().await.restore(&snapshot);
    if !restored {
        warn!("snapshot from leader could not be decoded, starting empty");
    }
    info!("loaded {} byte snapshot from leader", snapshot.len());

    run_connection(
        Arc::clone(&server),
        reader,
        writer,
        buffer,
        format!("leader {}", leader),
        ClientOrigin::Leader,
    )
    .await;

    warn!("connection to leader {} closed", leader);
    Ok(())
}
