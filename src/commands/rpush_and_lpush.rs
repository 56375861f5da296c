use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;

use crate::{
    commands::{CommandError, CommandResult},
    key_value_store::{KeyValueStore, ListEnd},
    resp::RespValue,
};

pub struct PushArrayOperations {
    key: String,
    values: Vec<String>,
}

impl PushArrayOperations {
    pub fn parse(arguments: Vec<String>, should_prepend: bool) -> Result<Self, CommandError> {
        if arguments.len() < 2 {
            return Err(CommandError::arity(if should_prepend {
                "lpush"
            } else {
                "rpush"
            }));
        }

        let mut arguments = arguments.into_iter();
        let key = arguments.next().unwrap_or_default();

        Ok(Self {
            key,
            values: arguments.collect(),
        })
    }
}

pub async fn rpush(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: Vec<String>,
    raw: &Bytes,
) -> Result<CommandResult, CommandError> {
    push_array_operations(store, arguments, raw, false).await
}

pub async fn lpush(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: Vec<String>,
    raw: &Bytes,
) -> Result<CommandResult, CommandError> {
    push_array_operations(store, arguments, raw, true).await
}

async fn push_array_operations(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: Vec<String>,
    raw: &Bytes,
    should_prepend: bool,
) -> Result<CommandResult, CommandError> {
    let push_array_arguments = PushArrayOperations::parse(arguments, should_prepend)?;
    let end = if should_prepend {
        ListEnd::Front
    } else {
        ListEnd::Back
    };

    let mut store_guard = store.lock().await;
    let list_length = store_guard.push(
        &push_array_arguments.key,
        &push_array_arguments.values,
        end,
    )?;

    Ok(CommandResult::Write(
        RespValue::Integer(list_length as i64),
        raw.clone(),
    ))
}
