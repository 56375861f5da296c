use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{CommandError, CommandResult, pub_sub::subscribe::subscription_reply},
    connection::ClientContext,
    key_value_store::KeyValueStore,
    resp::RespValue,
};

pub struct UnsubscribeArguments {
    /// Empty means every channel the connection is subscribed to.
    pub channels: Vec<String>,
}

impl UnsubscribeArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        Ok(Self {
            channels: arguments,
        })
    }
}

/// Handles `UNSUBSCRIBE [channel ...]`.
///
/// Replies with one `["unsubscribe", channel, remaining]` array per channel.
/// Without subscriptions and without arguments the single reply carries a
/// null channel and a count of zero.
pub async fn unsubscribe(
    store: Arc<Mutex<KeyValueStore>>,
    context: &ClientContext,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let unsubscribe_arguments = UnsubscribeArguments::parse(arguments)?;

    let mut store_guard = store.lock().await;

    let channels = if unsubscribe_arguments.channels.is_empty() {
        store_guard.pub_sub.channels_of(&context.client_address)
    } else {
        unsubscribe_arguments.channels
    };

    if channels.is_empty() {
        return Ok(CommandResult::Response(RespValue::Array(vec![
            RespValue::bulk_string("unsubscribe"),
            RespValue::Null,
            RespValue::Integer(0),
        ])));
    }

    let replies = channels
        .iter()
        .map(|channel| {
            let remaining = store_guard
                .pub_sub
                .unsubscribe(&context.client_address, channel);
            subscription_reply("unsubscribe", channel, remaining)
        })
        .collect();

    Ok(CommandResult::Responses(replies))
}
