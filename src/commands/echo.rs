use crate::{
    commands::{CommandError, CommandResult},
    resp::RespValue,
};

pub struct EchoArguments {
    message: String,
}

impl EchoArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [message]: [String; 1] = arguments
            .try_into()
            .map_err(|_| CommandError::arity("echo"))?;

        Ok(Self { message })
    }
}

/// Handles the Redis ECHO command.
///
/// Returns the single argument unchanged as a bulk string.
///
/// # Examples
///
/// ```ignore
/// let result = echo(vec!["hello world".to_string()]);
/// // Returns: Ok(CommandResult::Response(RespValue::BulkString("hello world")))
/// ```
pub fn echo(arguments: Vec<String>) -> Result<CommandResult, CommandError> {
    let echo_arguments = EchoArguments::parse(arguments)?;

    Ok(CommandResult::Response(RespValue::BulkString(
        echo_arguments.message,
    )))
}
