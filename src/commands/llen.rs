use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{CommandError, CommandResult},
    key_value_store::KeyValueStore,
    resp::RespValue,
};

pub struct LlenArguments {
    key: String,
}

impl LlenArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [key]: [String; 1] = arguments
            .try_into()
            .map_err(|_| CommandError::arity("llen"))?;

        Ok(Self { key })
    }
}

pub async fn llen(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let llen_arguments = LlenArguments::parse(arguments)?;

    let mut store_guard = store.lock().await;
    let len = store_guard.len(&llen_arguments.key)?;

    Ok(CommandResult::Response(RespValue::Integer(len as i64)))
}
