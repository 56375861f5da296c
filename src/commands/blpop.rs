use std::{sync::Arc, time::Duration};

use tokio::sync::Mutex;

use crate::{
    commands::{CommandError, CommandResult},
    connection::ClientContext,
    key_value_store::KeyValueStore,
    replication::WriteOrder,
    resp::RespValue,
};

pub struct BlpopArguments {
    keys: Vec<String>,
    /// `None` blocks until an element arrives.
    timeout: Option<Duration>,
}

impl BlpopArguments {
    pub fn parse(mut arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() < 2 {
            return Err(CommandError::arity("blpop"));
        }

        let timeout = arguments
            .pop()
            .unwrap_or_default()
            .parse::<f64>()
            .map_err(|_| CommandError::InvalidTimeout)?;

        if !timeout.is_finite() {
            return Err(CommandError::InvalidTimeout);
        }

        if timeout < 0.0 {
            return Err(CommandError::NegativeTimeout);
        }

        Ok(Self {
            keys: arguments,
            timeout: (timeout > 0.0).then(|| Duration::from_secs_f64(timeout)),
        })
    }
}

/// Handles the Redis BLPOP command.
///
/// Pops from the first non-empty list among the keys, waiting up to the
/// timeout (in seconds, `0` meaning forever) for one to receive an element.
/// `write_order` is only taken for each attempt to pop, so other writers can
/// fill the lists in the meantime.
///
/// # Returns
///
/// * `Ok(CommandResult::Write)` - `[key, value]`, forwarded to replicas as
///   `LPOP key` so they pop the same element without blocking
/// * `Ok(CommandResult::Response(NullArray))` - The timeout elapsed
/// * `Ok(CommandResult::NoResponse)` - The client disconnected while waiting
pub async fn blpop(
    store: Arc<Mutex<KeyValueStore>>,
    context: &ClientContext,
    arguments: Vec<String>,
    write_order: &mut WriteOrder,
) -> Result<CommandResult, CommandError> {
    let blpop_arguments = BlpopArguments::parse(arguments)?;

    let popped = KeyValueStore::blocking_pop(
        &store,
        &blpop_arguments.keys,
        blpop_arguments.timeout,
        &context.cancellation,
        write_order,
    )
    .await?;

    match popped {
        Some((key, value)) => {
            let propagate = RespValue::array_of_bulk_strings(["LPOP", key.as_str()]).to_bytes();
            Ok(CommandResult::Write(
                RespValue::array_of_bulk_strings([key, value]),
                propagate,
            ))
        }
        None if context.cancellation.is_cancelled() => Ok(CommandResult::NoResponse),
        None => Ok(CommandResult::Response(RespValue::NullArray)),
    }
}
