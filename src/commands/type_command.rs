use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{CommandError, CommandResult},
    key_value_store::KeyValueStore,
    resp::RespValue,
};

pub struct TypeArguments {
    key: String,
}

impl TypeArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [key]: [String; 1] = arguments
            .try_into()
            .map_err(|_| CommandError::arity("type"))?;

        Ok(Self { key })
    }
}

/// Handles the Redis TYPE command.
///
/// Replies with `string`, `list`, `stream` or `none` as a simple string.
pub async fn type_command(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let type_arguments = TypeArguments::parse(arguments)?;

    let mut store_guard = store.lock().await;
    let data_type = store_guard.key_type(&type_arguments.key);

    Ok(CommandResult::Response(RespValue::simple_string(data_type)))
}
