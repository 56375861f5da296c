use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    sync::mpsc,
};
use tracing::{debug, info, warn};

use crate::{
    cancellation::{Cancellation, CancellationSource},
    commands::dispatch,
    input::{CommandReadError, read_frames},
    resp::RespFrame,
    server::RedisServer,
};

/// Encoded bytes queued for a connection's writer task.
pub type ClientSender = mpsc::UnboundedSender<Bytes>;

/// Who is on the other end of a connection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClientOrigin {
    /// A regular client, or a replica during and after its handshake.
    Client,
    /// The leader this server replicates from.
    Leader,
}

/// Per-connection handles passed down to commands.
#[derive(Debug, Clone)]
pub struct ClientContext {
    pub client_address: String,
    pub sender: ClientSender,
    /// Fires when the peer disconnects.
    pub cancellation: Cancellation,
    pub origin: ClientOrigin,
}

/// Serves an accepted client socket until it closes.
pub async fn handle_connection(server: Arc<RedisServer>, stream: TcpStream, client_address: String) {
    let (reader, writer) = stream.into_split();

    run_connection(
        server,
        reader,
        writer,
        BytesMut::new(),
        client_address,
        ClientOrigin::Client,
    )
    .await;
}

/// Drives one connection.
///
/// A reader task decodes records and cancels the connection's token when the
/// peer goes away, so blocked commands stop waiting. Records are dispatched
/// one at a time, in arrival order. Replies and pushed messages reach the
/// socket through a writer task fed by [`ClientSender`].
///
/// `buffer` may already hold bytes read from the socket, as it does for the
/// leader stream right after the snapshot transfer.
pub async fn run_connection<R, W>(
    server: Arc<RedisServer>,
    reader: R,
    writer: W,
    buffer: BytesMut,
    client_address: String,
    origin: ClientOrigin,
) where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    info!("connection from {} opened", client_address);

    let (sender, receiver) = mpsc::unbounded_channel::<Bytes>();
    let cancellation_source = CancellationSource::new();

    let context = ClientContext {
        client_address: client_address.clone(),
        sender,
        cancellation: cancellation_source.token(),
        origin,
    };

    let writer_task = tokio::spawn(write_loop(writer, receiver, client_address.clone()));

    let (frame_sender, mut frame_receiver) = mpsc::unbounded_channel::<RespFrame>();
    let reader_task = tokio::spawn(read_loop(
        reader,
        buffer,
        frame_sender,
        cancellation_source,
        client_address.clone(),
    ));

    while let Some(frame) = frame_receiver.recv().await {
        let outcome = dispatch(&server, &context, frame).await;

        for reply in outcome.replies {
            if context.sender.send(reply.to_bytes()).is_err() {
                debug!("writer for {} is gone", client_address);
            }
        }

        if outcome.close {
            break;
        }
    }

    reader_task.abort();
    cleanup(&server, &client_address).await;
    drop(context);

    if let Err(e) = writer_task.await {
        debug!("writer task for {} ended abnormally: {}", client_address, e);
    }

    info!("connection from {} closed", client_address);
}

async fn read_loop<R>(
    mut reader: R,
    mut buffer: BytesMut,
    frames: mpsc::UnboundedSender<RespFrame>,
    cancellation_source: CancellationSource,
    client_address: String,
) where
    R: AsyncRead + Unpin,
{
    loop {
        match read_frames(&mut reader, &mut buffer).await {
            Ok(batch) => {
                for frame in batch {
                    if frames.send(frame).is_err() {
                        return;
                    }
                }
            }
            Err(CommandReadError::ConnectionClosed) => break,
            Err(e) => {
                warn!("error reading from {}: {}", client_address, e);
                break;
            }
        }
    }

    cancellation_source.cancel();
}

async fn write_loop<W>(
    mut writer: W,
    mut receiver: mpsc::UnboundedReceiver<Bytes>,
    client_address: String,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(bytes) = receiver.recv().await {
        if let Err(e) = writer.write_all(&bytes).await {
            debug!("error writing to {}: {}", client_address, e);
            return;
        }
    }

    let _ = writer.shutdown().await;
}

/// Drops everything the server keeps for a closed connection.
async fn cleanup(server: &Arc<RedisServer>, client_address: &str) {
    let _ = server.state.lock().await.remove_transaction(client_address);
    server.store.lock().await.pub_sub.cleanup(client_address);
    server.replication.remove_client(client_address).await;
}
