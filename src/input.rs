//! Reading RESP records off a socket.
//!
//! Bytes accumulate in a `BytesMut` owned by the caller. Decoded records are
//! split off the front and anything that has not fully arrived stays in the
//! buffer for the next read.

use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::resp::{RespError, RespFrame, RespValue};

const READ_CHUNK: usize = 4096;

/// Errors that can occur while reading records from a stream.
#[derive(Error, Debug, PartialEq)]
pub enum CommandReadError {
    #[error("I/O error: {0}")]
    IoError(String),
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("RESP parse error: {0}")]
    RespParseError(#[from] RespError),
}

async fn fill_buffer<R>(reader: &mut R, buffer: &mut BytesMut) -> Result<(), CommandReadError>
where
    R: AsyncRead + Unpin,
{
    buffer.reserve(READ_CHUNK);

    let number_of_bytes = reader
        .read_buf(buffer)
        .await
        .map_err(|e| CommandReadError::IoError(e.to_string()))?;

    if number_of_bytes == 0 {
        return Err(CommandReadError::ConnectionClosed);
    }

    Ok(())
}

/// Reads until at least one complete record is buffered and returns every
/// complete record. Malformed elements are dropped by the decoder.
///
/// # Returns
///
/// * `Ok(Vec<RespFrame>)` - One or more records, in arrival order
/// * `Err(CommandReadError::ConnectionClosed)` - The peer closed the stream
/// * `Err(CommandReadError::IoError)` - Reading from the stream failed
pub async fn read_frames<R>(
    reader: &mut R,
    buffer: &mut BytesMut,
) -> Result<Vec<RespFrame>, CommandReadError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let (frames, consumed) = RespValue::decode(&buffer[..]);
        let _ = buffer.split_to(consumed);

        if !frames.is_empty() {
            return Ok(frames);
        }

        fill_buffer(reader, buffer).await?;
    }
}

/// Reads exactly one record, leaving any bytes after it in the buffer.
pub async fn read_frame<R>(
    reader: &mut R,
    buffer: &mut BytesMut,
) -> Result<RespFrame, CommandReadError>
where
    R: AsyncRead + Unpin,
{
    loop {
        if let Some((frame, consumed)) = RespValue::decode_first(&buffer[..])? {
            let _ = buffer.split_to(consumed);
            return Ok(frame);
        }

        fill_buffer(reader, buffer).await?;
    }
}

/// Reads a `$<len>\r\n<payload>` transfer that has no trailing CRLF and
/// returns the payload.
pub async fn read_bulk_payload<R>(
    reader: &mut R,
    buffer: &mut BytesMut,
) -> Result<Bytes, CommandReadError>
where
    R: AsyncRead + Unpin,
{
    loop {
        if let Some((payload, consumed)) = RespValue::decode_bulk_payload(&buffer[..])? {
            let _ = buffer.split_to(consumed);
            return Ok(payload);
        }

        fill_buffer(reader, buffer).await?;
    }
}
