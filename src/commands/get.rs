use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{CommandError, CommandResult},
    key_value_store::KeyValueStore,
    resp::RespValue,
};

/// Represents the parsed arguments for GET command
pub struct GetArguments {
    /// The key name to retrieve from the store
    key: String,
}

impl GetArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [key]: [String; 1] = arguments
            .try_into()
            .map_err(|_| CommandError::arity("get"))?;

        Ok(Self { key })
    }
}

/// Handles the Redis GET command.
///
/// Looks the key up in the string keyspace, deleting it first if its deadline
/// has passed.
///
/// # Returns
///
/// * `Ok(CommandResult::Response)` - The value as a bulk string, or a null
///   bulk string when the key is absent or expired
/// * `Err(CommandError::WrongType)` - If the key holds a list
/// * `Err(CommandError::WrongNumberOfArguments)` - If not given exactly one key
pub async fn get(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let get_arguments = GetArguments::parse(arguments)?;

    let mut store_guard = store.lock().await;
    let value = store_guard.get(&get_arguments.key)?;

    Ok(CommandResult::Response(match value {
        Some(value) => RespValue::BulkString(value),
        None => RespValue::Null,
    }))
}
