use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, mpsc},
    time::{Instant, sleep_until},
};

use crate::{
    commands::{CommandError, CommandResult, stream_utils::entries_to_resp},
    connection::ClientContext,
    key_value_store::KeyValueStore,
    resp::RespValue,
    stream::StreamId,
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum ReadFrom {
    /// `$`: only entries added after the command started.
    Latest,
    After(StreamId),
}

/// Represents the parsed arguments for the XREAD command.
///
/// Format: `XREAD [COUNT count] [BLOCK milliseconds] STREAMS key1 key2 ... id1 id2 ...`
pub struct XreadArguments {
    /// Blocking duration in milliseconds. `Some(0)` blocks indefinitely.
    block: Option<u64>,
    count: Option<usize>,
    /// (stream key, exclusive start) pairs
    streams: Vec<(String, ReadFrom)>,
}

impl XreadArguments {
    /// Parses command arguments into structured XreadArguments.
    ///
    /// # Returns
    ///
    /// * `Ok(XreadArguments)` - Successfully parsed arguments
    /// * `Err(CommandError::WrongNumberOfArguments)` - Missing STREAMS group
    /// * `Err(CommandError::SyntaxError)` - Unknown option or uneven key/id lists
    /// * `Err(CommandError::NotAnInteger)` - BLOCK or COUNT is not a number
    /// * `Err(CommandError::InvalidStreamId)` - An id is malformed
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Blocking: XREAD BLOCK 1000 STREAMS mystream $
    /// let args = XreadArguments::parse(vec![
    ///     "BLOCK".to_string(),
    ///     "1000".to_string(),
    ///     "STREAMS".to_string(),
    ///     "mystream".to_string(),
    ///     "$".to_string()
    /// ])?;
    /// ```
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() < 3 {
            return Err(CommandError::arity("xread"));
        }

        let mut block = None;
        let mut count = None;
        let mut index = 0;

        loop {
            let Some(option) = arguments.get(index) else {
                return Err(CommandError::SyntaxError);
            };

            match option.to_uppercase().as_str() {
                "STREAMS" => {
                    index += 1;
                    break;
                }
                "BLOCK" | "COUNT" => {
                    let value = arguments
                        .get(index + 1)
                        .ok_or(CommandError::SyntaxError)?;
                    let value = value
                        .parse::<u64>()
                        .map_err(|_| CommandError::NotAnInteger)?;

                    if option.eq_ignore_ascii_case("block") {
                        block = Some(value);
                    } else {
                        count = Some(value as usize);
                    }
                    index += 2;
                }
                _ => return Err(CommandError::SyntaxError),
            }
        }

        let data = &arguments[index..];
        if data.is_empty() || data.len() % 2 != 0 {
            return Err(CommandError::SyntaxError);
        }

        let (keys, ids) = data.split_at(data.len() / 2);
        let streams = keys
            .iter()
            .zip(ids)
            .map(|(key, id)| {
                let from = match id.as_str() {
                    "$" => ReadFrom::Latest,
                    id => ReadFrom::After(id.parse::<StreamId>()?),
                };
                Ok((key.clone(), from))
            })
            .collect::<Result<Vec<_>, CommandError>>()?;

        Ok(Self {
            block,
            count,
            streams,
        })
    }
}

/// `[[key, [[id, [field, value, ...]], ...]], ...]` for the streams that have
/// entries after their position, or `None` if none do.
fn collect_new_entries(
    store: &KeyValueStore,
    positions: &[(String, StreamId)],
    count: Option<usize>,
) -> Option<RespValue> {
    let streams: Vec<RespValue> = positions
        .iter()
        .filter_map(|(key, after)| {
            let entries = store.stream(key)?.range_after(*after);
            let entries = match count {
                Some(count) => &entries[..count.min(entries.len())],
                None => entries,
            };

            (!entries.is_empty()).then(|| {
                RespValue::Array(vec![
                    RespValue::BulkString(key.clone()),
                    entries_to_resp(entries),
                ])
            })
        })
        .collect();

    (!streams.is_empty()).then_some(RespValue::Array(streams))
}

/// Handles the Redis XREAD command.
///
/// `$` ids are resolved to the stream's top entry when the command starts.
/// Without BLOCK the read is immediate. With BLOCK the command waits for an
/// append to any of the streams, re-checking after every wake-up, until
/// entries arrive or the block time runs out (null array).
pub async fn xread(
    store: Arc<Mutex<KeyValueStore>>,
    context: &ClientContext,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let xread_arguments = XreadArguments::parse(arguments)?;
    let deadline = match xread_arguments.block {
        Some(0) | None => None,
        Some(ms) => Some(Instant::now() + Duration::from_millis(ms)),
    };

    let positions: Vec<(String, StreamId)> = {
        let store_guard = store.lock().await;
        xread_arguments
            .streams
            .iter()
            .map(|(key, from)| {
                let after = match from {
                    ReadFrom::Latest => store_guard.latest_stream_id(key).unwrap_or(StreamId::MIN),
                    ReadFrom::After(id) => *id,
                };
                (key.clone(), after)
            })
            .collect()
    };

    let reply = read_or_wait(&store, context, &xread_arguments, &positions, deadline).await;

    if xread_arguments.block.is_some() {
        let mut store_guard = store.lock().await;
        for (key, _) in &positions {
            store_guard.forget_closed_observers(key);
        }
    }

    Ok(reply)
}

async fn read_or_wait(
    store: &Mutex<KeyValueStore>,
    context: &ClientContext,
    xread_arguments: &XreadArguments,
    positions: &[(String, StreamId)],
    deadline: Option<Instant>,
) -> CommandResult {
    let (observer, mut wake_ups) = mpsc::channel::<()>(1);

    loop {
        {
            let mut store_guard = store.lock().await;

            if let Some(reply) = collect_new_entries(&store_guard, positions, xread_arguments.count)
            {
                return CommandResult::Response(reply);
            }

            if xread_arguments.block.is_none()
                || deadline.is_some_and(|deadline| Instant::now() >= deadline)
            {
                return CommandResult::Response(RespValue::NullArray);
            }

            for (key, _) in positions {
                store_guard.observe_append(key, observer.clone());
            }
        }

        let timed_out = async {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = wake_ups.recv() => {}
            _ = timed_out => {}
            _ = context.cancellation.cancelled() => return CommandResult::NoResponse,
        }
    }
}
