use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    commands::{CommandError, CommandResult, transactions::multi::expect_no_arguments},
    resp::RespValue,
    state::State,
};

pub struct DiscardArguments;

impl DiscardArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        expect_no_arguments("discard", &arguments).map(|_| DiscardArguments)
    }
}

/// Drops the connection's queued commands without running them.
pub async fn discard(
    client_address: &str,
    state: Arc<Mutex<State>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    DiscardArguments::parse(arguments)?;

    let dropped = state
        .lock()
        .await
        .remove_transaction(client_address)
        .map_err(|_| CommandError::DiscardWithoutMulti)?;
    debug!(
        "{} discarded {} queued commands",
        client_address,
        dropped.len()
    );

    Ok(CommandResult::Response(RespValue::simple_string("OK")))
}
