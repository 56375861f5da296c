use std::{sync::Arc, time::Duration};

use crate::{
    commands::{CommandError, CommandResult},
    connection::ClientContext,
    resp::RespValue,
    server::{RedisRole, RedisServer},
};

pub struct WaitArguments {
    replicas: usize,
    /// `None` waits until enough replicas acknowledged.
    timeout: Option<Duration>,
}

impl WaitArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [replicas, timeout]: [String; 2] = arguments
            .try_into()
            .map_err(|_| CommandError::arity("wait"))?;

        let replicas = replicas
            .parse::<usize>()
            .map_err(|_| CommandError::NotAnInteger)?;

        let timeout = timeout
            .parse::<i64>()
            .map_err(|_| CommandError::NotAnInteger)?;

        if timeout < 0 {
            return Err(CommandError::NegativeTimeout);
        }

        Ok(Self {
            replicas,
            timeout: (timeout > 0).then(|| Duration::from_millis(timeout as u64)),
        })
    }
}

/// Handles `WAIT numreplicas timeout`.
///
/// # Returns
///
/// * `Ok(CommandResult::Response(Integer))` - Replicas that acknowledged the
///   current offset, once `numreplicas` is reached or the timeout elapsed
/// * `Ok(CommandResult::NoResponse)` - The client disconnected while waiting
/// * `Err(CommandError::WaitOnReplica)` - Sent to a replica
pub async fn wait(
    server: &Arc<RedisServer>,
    context: &ClientContext,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let wait_arguments = WaitArguments::parse(arguments)?;

    if let RedisRole::Replica(_) = server.role {
        return Err(CommandError::WaitOnReplica);
    }

    let acknowledged = server
        .replication
        .wait(
            wait_arguments.replicas,
            wait_arguments.timeout,
            &context.cancellation,
        )
        .await;

    Ok(match acknowledged {
        Some(count) => CommandResult::Response(RespValue::Integer(count as i64)),
        None => CommandResult::NoResponse,
    })
}
