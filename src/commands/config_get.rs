use std::sync::Arc;

use crate::{
    commands::{CommandError, CommandResult},
    resp::RespValue,
    server::RedisServer,
};

pub struct ConfigGetArguments {
    pub parameters: Vec<String>,
}

impl ConfigGetArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.is_empty() {
            return Err(CommandError::arity("config|get"));
        }

        Ok(ConfigGetArguments {
            parameters: arguments,
        })
    }
}

/// Handles `CONFIG GET parameter [parameter ...]`.
///
/// Replies with a flat `[name, value, ...]` array. Only `dir` and
/// `dbfilename` are known; other parameters are left out of the reply.
pub async fn config_get(
    server: &Arc<RedisServer>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let config_get_arguments = ConfigGetArguments::parse(arguments)?;
    let mut response = Vec::new();

    for parameter in config_get_arguments.parameters {
        let value = match parameter.to_lowercase().as_str() {
            "dir" => server.config.dir.display().to_string(),
            "dbfilename" => server.config.dbfilename.clone(),
            _ => continue,
        };

        response.push(RespValue::BulkString(parameter.to_lowercase()));
        response.push(RespValue::BulkString(value));
    }

    Ok(CommandResult::Response(RespValue::Array(response)))
}
