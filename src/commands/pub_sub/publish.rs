use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{CommandError, CommandResult},
    key_value_store::KeyValueStore,
    resp::RespValue,
};

pub struct PublishArguments {
    pub channel: String,
    pub message: String,
}

impl PublishArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [channel, message]: [String; 2] = arguments
            .try_into()
            .map_err(|_| CommandError::arity("publish"))?;

        Ok(Self { channel, message })
    }
}

/// Handles `PUBLISH channel message`.
///
/// The message is queued on every subscriber's connection before the reply
/// is produced. Replies with the number of subscribers that received it.
pub async fn publish(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let publish_arguments = PublishArguments::parse(arguments)?;

    let store_guard = store.lock().await;
    let receivers = store_guard
        .pub_sub
        .publish(&publish_arguments.channel, &publish_arguments.message);

    Ok(CommandResult::Response(RespValue::Integer(receivers as i64)))
}
