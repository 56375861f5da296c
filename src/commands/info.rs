use std::sync::Arc;

use crate::{
    commands::{CommandError, CommandResult},
    resp::RespValue,
    server::RedisServer,
};

pub struct InfoArguments;

impl InfoArguments {
    /// Only the replication section exists, so `INFO` and
    /// `INFO replication` are the same request.
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        match arguments.as_slice() {
            [] => Ok(InfoArguments),
            [section] if section.eq_ignore_ascii_case("replication") => Ok(InfoArguments),
            [_] => Err(CommandError::SyntaxError),
            _ => Err(CommandError::arity("info")),
        }
    }
}

/// Handles the Redis INFO command.
///
/// # Returns
///
/// * `Ok(CommandResult::Response)` - The `# Replication` section as a bulk
///   string: role, connected replicas, replication id and offset
pub async fn info(
    server: &Arc<RedisServer>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    InfoArguments::parse(arguments)?;

    let replication = [
        "# Replication".to_string(),
        format!("role:{}", server.role.as_string()),
        format!(
            "connected_slaves:{}",
            server.replication.replica_count().await
        ),
        format!("master_replid:{}", server.replication.repl_id()),
        format!("master_repl_offset:{}", server.replication.offset().await),
    ];

    Ok(CommandResult::Response(RespValue::BulkString(
        replication.join("\r\n"),
    )))
}
