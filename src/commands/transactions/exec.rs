use std::sync::Arc;

use bytes::Bytes;

use crate::{
    commands::{
        CommandError, CommandHandler, CommandResult, transactions::multi::expect_no_arguments,
    },
    connection::ClientContext,
    resp::RespValue,
    server::RedisServer,
};

pub struct ExecArguments;

impl ExecArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        expect_no_arguments("exec", &arguments).map(|_| ExecArguments)
    }
}

/// Reply of an EXEC together with the writes it performed and forwarded, in
/// order.
#[derive(Debug, PartialEq)]
pub struct TransactionResult {
    pub reply: RespValue,
    pub propagate: Vec<Bytes>,
}

/// Handles the Redis EXEC command.
///
/// Drains the connection's queue and runs every command in the order it was
/// queued.
///
/// # Returns
///
/// * `Ok(TransactionResult)` - One reply per queued command in an array. A
///   transaction holding a single command that failed replies with that error
///   alone.
/// * `Err(CommandError::ExecWithoutMulti)` - No transaction is open
pub async fn exec(
    server: &Arc<RedisServer>,
    context: &ClientContext,
    arguments: Vec<String>,
) -> Result<TransactionResult, CommandError> {
    ExecArguments::parse(arguments)?;

    let commands = {
        let mut state_guard = server.state.lock().await;
        state_guard.remove_transaction(&context.client_address)?
    };

    Ok(run_transaction_commands(server, context, commands).await)
}

async fn run_transaction_commands(
    server: &Arc<RedisServer>,
    context: &ClientContext,
    commands: Vec<CommandHandler>,
) -> TransactionResult {
    let mut replies = Vec::with_capacity(commands.len());
    let mut propagate = Vec::new();
    let single_command = commands.len() == 1;

    for command in commands {
        match command.execute(server, context).await {
            Ok(CommandResult::NoResponse) => replies.push(RespValue::Null),
            Ok(CommandResult::Response(reply)) => replies.push(reply),
            Ok(CommandResult::Responses(batch)) => replies.push(RespValue::Array(batch)),
            Ok(CommandResult::Write(reply, bytes)) => {
                replies.push(reply);
                propagate.push(bytes);
            }
            Err(err) if single_command => {
                return TransactionResult {
                    reply: err.as_resp(),
                    propagate,
                };
            }
            Err(err) => replies.push(err.as_resp()),
        }
    }

    TransactionResult {
        reply: RespValue::Array(replies),
        propagate,
    }
}
