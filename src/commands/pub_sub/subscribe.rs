use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{CommandError, CommandResult},
    connection::ClientContext,
    key_value_store::KeyValueStore,
    resp::RespValue,
};

pub struct SubscribeArguments {
    pub channels: Vec<String>,
}

impl SubscribeArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.is_empty() {
            return Err(CommandError::arity("subscribe"));
        }

        Ok(Self {
            channels: arguments,
        })
    }
}

pub(crate) fn subscription_reply(kind: &str, channel: &str, count: usize) -> RespValue {
    RespValue::Array(vec![
        RespValue::bulk_string(kind),
        RespValue::bulk_string(channel),
        RespValue::Integer(count as i64),
    ])
}

/// Handles `SUBSCRIBE channel [channel ...]`.
///
/// Replies with one `["subscribe", channel, count]` array per channel, where
/// count is the number of channels the connection is subscribed to after
/// that step. Subscribing twice to the same channel is a no-op.
pub async fn subscribe(
    store: Arc<Mutex<KeyValueStore>>,
    context: &ClientContext,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let subscribe_arguments = SubscribeArguments::parse(arguments)?;

    let mut store_guard = store.lock().await;
    let replies = subscribe_arguments
        .channels
        .iter()
        .map(|channel| {
            let count = store_guard.pub_sub.subscribe(
                &context.client_address,
                &context.sender,
                channel,
            );
            subscription_reply("subscribe", channel, count)
        })
        .collect();

    Ok(CommandResult::Responses(replies))
}
