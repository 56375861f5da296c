use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::{
    commands::{
        CommandError, CommandHandler, CommandResult,
        transactions::{TransactionResult, discard, exec, multi},
    },
    connection::{ClientContext, ClientOrigin},
    resp::{RespFrame, RespValue},
    server::{RedisRole, RedisServer},
};

/// What the connection has to do after a command ran.
#[derive(Debug, Default, PartialEq)]
pub struct DispatchOutcome {
    /// Written to the client in order.
    pub replies: Vec<RespValue>,
    /// Writes the command applied, in order. Already forwarded to replicas
    /// unless they came from the leader.
    pub propagate: Vec<Bytes>,
    /// The client asked to close the connection.
    pub close: bool,
}

impl DispatchOutcome {
    fn reply(reply: RespValue) -> Self {
        Self {
            replies: vec![reply],
            ..Self::default()
        }
    }

    fn error(err: CommandError) -> Self {
        Self::reply(err.as_resp())
    }

    fn from_result(result: Result<CommandResult, CommandError>) -> Self {
        match result {
            Ok(CommandResult::NoResponse) => Self::default(),
            Ok(CommandResult::Response(reply)) => Self::reply(reply),
            Ok(CommandResult::Responses(replies)) => Self {
                replies,
                ..Self::default()
            },
            Ok(CommandResult::Write(reply, bytes)) => Self {
                replies: vec![reply],
                propagate: vec![bytes],
                close: false,
            },
            Err(err) => Self::error(err),
        }
    }
}

impl From<TransactionResult> for DispatchOutcome {
    fn from(result: TransactionResult) -> Self {
        Self {
            replies: vec![result.reply],
            propagate: result.propagate,
            close: false,
        }
    }
}

/// Runs one decoded frame for a connection.
///
/// Order of checks: subscribed mode, read-only replica, transaction control
/// and queueing, then execution. Commands that arrive from the leader are
/// applied without replies, except `REPLCONF GETACK`.
pub async fn dispatch(
    server: &Arc<RedisServer>,
    context: &ClientContext,
    frame: RespFrame,
) -> DispatchOutcome {
    let command = match CommandHandler::new(frame) {
        Ok(command) => command,
        Err(err) => {
            if context.origin == ClientOrigin::Leader {
                warn!("ignoring malformed command from leader: {}", err);
                return DispatchOutcome::default();
            }
            return DispatchOutcome::error(err);
        }
    };

    debug!(
        "{} -> {} {:?}",
        context.client_address, command.name, command.arguments
    );

    let outcome = dispatch_command(server, context, &command).await;

    if context.origin != ClientOrigin::Leader {
        return outcome;
    }

    let applied = outcome.propagate.len();
    for _ in 0..applied {
        server.replication.record_applied().await;
    }

    if command.name == "REPLCONF" {
        return DispatchOutcome {
            replies: outcome.replies,
            ..DispatchOutcome::default()
        };
    }

    DispatchOutcome::default()
}

async fn dispatch_command(
    server: &Arc<RedisServer>,
    context: &ClientContext,
    command: &CommandHandler,
) -> DispatchOutcome {
    let client_address = context.client_address.as_str();

    if !command.is_allowed_in_subscribed_mode() {
        let subscribed = server
            .store
            .lock()
            .await
            .pub_sub
            .is_subscribed(client_address);

        if subscribed {
            return DispatchOutcome::error(CommandError::NotAllowedInSubscribedMode(
                command.name.to_lowercase(),
            ));
        }
    }

    if command.name == "QUIT" {
        return DispatchOutcome {
            replies: vec![RespValue::simple_string("OK")],
            close: true,
            ..DispatchOutcome::default()
        };
    }

    if matches!(server.role, RedisRole::Replica(_))
        && context.origin == ClientOrigin::Client
        && command.is_write()
    {
        return DispatchOutcome::error(CommandError::ReadOnlyReplica);
    }

    match command.name.as_str() {
        "MULTI" => {
            let result = multi(
                client_address,
                Arc::clone(&server.state),
                command.arguments.clone(),
            )
            .await;
            return DispatchOutcome::from_result(result);
        }
        "EXEC" => {
            return match exec(server, context, command.arguments.clone()).await {
                Ok(result) => result.into(),
                Err(err) => DispatchOutcome::error(err),
            };
        }
        "DISCARD" => {
            let result = discard(
                client_address,
                Arc::clone(&server.state),
                command.arguments.clone(),
            )
            .await;
            return DispatchOutcome::from_result(result);
        }
        _ => {}
    }

    {
        let mut state_guard = server.state.lock().await;

        if state_guard.in_transaction(client_address) {
            if let Some(err) = command.validate_command_arguments() {
                return DispatchOutcome::error(err);
            }

            return match state_guard.add_to_transaction(client_address, command.clone()) {
                Ok(()) => DispatchOutcome::reply(RespValue::simple_string("QUEUED")),
                Err(err) => DispatchOutcome::error(err.into()),
            };
        }
    }

    DispatchOutcome::from_result(command.execute(server, context).await)
}
