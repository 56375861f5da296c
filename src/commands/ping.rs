use crate::{
    commands::{CommandError, CommandResult},
    resp::RespValue,
};

pub struct PingArguments {
    message: Option<String>,
}

impl PingArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() > 1 {
            return Err(CommandError::arity("ping"));
        }

        Ok(Self {
            message: arguments.into_iter().next(),
        })
    }
}

/// `PING [message]`: `+PONG`, or the message back as a bulk string.
pub fn ping(arguments: Vec<String>) -> Result<CommandResult, CommandError> {
    let ping_arguments = PingArguments::parse(arguments)?;

    Ok(CommandResult::Response(match ping_arguments.message {
        Some(message) => RespValue::BulkString(message),
        None => RespValue::simple_string("PONG"),
    }))
}

/// `PING [message]` while the connection is in subscribed mode:
/// `["pong", message]`, with an empty message when none was given.
pub fn subscribed_ping(arguments: Vec<String>) -> Result<CommandResult, CommandError> {
    let ping_arguments = PingArguments::parse(arguments)?;

    Ok(CommandResult::Response(RespValue::array_of_bulk_strings([
        "pong".to_string(),
        ping_arguments.message.unwrap_or_default(),
    ])))
}
