use std::sync::Arc;

use crate::{
    commands::{CommandError, CommandResult},
    connection::ClientContext,
    server::RedisServer,
};

pub struct PsyncArguments;

impl PsyncArguments {
    /// Only a full resynchronisation is supported: `PSYNC ? -1`.
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [replication_id, offset]: [String; 2] = arguments
            .try_into()
            .map_err(|_| CommandError::arity("psync"))?;

        if replication_id != "?" || offset != "-1" {
            return Err(CommandError::UnsupportedPsync);
        }

        Ok(Self)
    }
}

/// Handles the Redis PSYNC command.
///
/// `+FULLRESYNC <id> <offset>` and the snapshot are written straight to the
/// connection, which from then on receives every propagated write.
pub async fn psync(
    server: &Arc<RedisServer>,
    context: &ClientContext,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    PsyncArguments::parse(arguments)?;

    server
        .replication
        .full_resync(&context.client_address, &context.sender, &server.store)
        .await;

    Ok(CommandResult::NoResponse)
}
