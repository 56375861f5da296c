use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{CommandError, CommandResult},
    resp::RespValue,
    state::State,
};

/// MULTI, EXEC and DISCARD take no arguments.
pub(crate) fn expect_no_arguments(command: &str, arguments: &[String]) -> Result<(), CommandError> {
    match arguments {
        [] => Ok(()),
        _ => Err(CommandError::arity(command)),
    }
}

pub struct MultiArguments;

impl MultiArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        expect_no_arguments("multi", &arguments).map(|_| MultiArguments)
    }
}

/// Opens an empty transaction queue for the connection. A second MULTI is
/// rejected and leaves the open queue untouched.
pub async fn multi(
    client_address: &str,
    state: Arc<Mutex<State>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    MultiArguments::parse(arguments)?;

    state.lock().await.start_transaction(client_address)?;

    Ok(CommandResult::Response(RespValue::simple_string("OK")))
}
