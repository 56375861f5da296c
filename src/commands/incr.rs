use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;

use crate::{
    commands::{CommandError, CommandResult},
    key_value_store::KeyValueStore,
    resp::RespValue,
};

pub struct IncrArguments {
    key: String,
}

impl IncrArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [key]: [String; 1] = arguments
            .try_into()
            .map_err(|_| CommandError::arity("incr"))?;

        Ok(Self { key })
    }
}

/// `INCR key`: a missing key starts at 0, anything that is not a 64-bit
/// integer is rejected.
pub async fn incr(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: Vec<String>,
    raw: &Bytes,
) -> Result<CommandResult, CommandError> {
    let incr_arguments = IncrArguments::parse(arguments)?;

    let mut store_guard = store.lock().await;
    let value = store_guard.incr(&incr_arguments.key)?;

    Ok(CommandResult::Write(RespValue::Integer(value), raw.clone()))
}
