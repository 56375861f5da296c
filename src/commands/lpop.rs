use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;

use crate::{
    commands::{CommandError, CommandResult},
    key_value_store::KeyValueStore,
    resp::RespValue,
};

pub struct LpopArguments {
    key: String,
    count: Option<usize>,
}

impl LpopArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        match arguments.as_slice() {
            [key] => Ok(Self {
                key: key.clone(),
                count: None,
            }),
            [key, count] => Ok(Self {
                key: key.clone(),
                count: Some(
                    count
                        .parse::<usize>()
                        .map_err(|_| CommandError::NotAnInteger)?,
                ),
            }),
            _ => Err(CommandError::arity("lpop")),
        }
    }
}

/// Handles the Redis LPOP command.
///
/// Without a count, replies with the popped element or a null bulk string.
/// With a count, replies with an array of at most `count` elements, or a null
/// array when the key does not exist. Only pops that removed something are
/// forwarded to replicas.
pub async fn lpop(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: Vec<String>,
    raw: &Bytes,
) -> Result<CommandResult, CommandError> {
    let lpop_arguments = LpopArguments::parse(arguments)?;

    let mut store_guard = store.lock().await;
    let mut popped = store_guard.pop(&lpop_arguments.key, lpop_arguments.count.unwrap_or(1))?;

    let reply = match lpop_arguments.count {
        None => match popped.pop() {
            Some(value) => RespValue::BulkString(value),
            None => RespValue::Null,
        },
        Some(_) if popped.is_empty() => RespValue::NullArray,
        Some(_) => RespValue::array_of_bulk_strings(popped),
    };

    match reply {
        RespValue::Null | RespValue::NullArray => Ok(CommandResult::Response(reply)),
        _ => Ok(CommandResult::Write(reply, raw.clone())),
    }
}
