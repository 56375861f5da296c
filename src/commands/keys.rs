use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{CommandError, CommandResult},
    key_value_store::KeyValueStore,
    resp::RespValue,
};

pub struct KeysArguments {
    pattern: String,
}

impl KeysArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [pattern]: [String; 1] = arguments
            .try_into()
            .map_err(|_| CommandError::arity("keys"))?;

        Ok(Self { pattern })
    }
}

pub async fn keys(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let keys_arguments = KeysArguments::parse(arguments)?;

    let mut store_guard = store.lock().await;
    let keys = store_guard.keys(Some(&keys_arguments.pattern));

    Ok(CommandResult::Response(RespValue::array_of_bulk_strings(
        keys,
    )))
}
