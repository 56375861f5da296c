//! REPLCONF, exchanged between leader and replica during and after the
//! replication handshake.

use std::sync::Arc;

use crate::{
    commands::{CommandError, CommandResult},
    connection::ClientContext,
    resp::RespValue,
    server::RedisServer,
};

#[derive(Debug, PartialEq)]
enum ReplconfConfiguration {
    /// `listening-port <port>`, sent by a replica before PSYNC.
    ListeningPort(u16),
    /// `capa <capability> [capa <capability> ...]`
    Capabilities,
    /// `GETACK *`, sent by the leader to a replica.
    GetAck,
    /// `ACK <offset>`, a replica's answer to GETACK.
    Ack,
}

pub struct ReplconfArguments {
    configuration: ReplconfConfiguration,
}

impl ReplconfArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() < 2 || arguments.len() % 2 != 0 {
            return Err(CommandError::arity("replconf"));
        }

        let option = arguments[0].to_lowercase();
        let configuration = match option.as_str() {
            "listening-port" => {
                let port = arguments[1]
                    .parse::<u16>()
                    .map_err(|_| CommandError::NotAnInteger)?;

                ReplconfConfiguration::ListeningPort(port)
            }
            "capa" => ReplconfConfiguration::Capabilities,
            "getack" => ReplconfConfiguration::GetAck,
            "ack" => {
                arguments[1]
                    .parse::<u64>()
                    .map_err(|_| CommandError::NotAnInteger)?;

                ReplconfConfiguration::Ack
            }
            _ => return Err(CommandError::UnknownReplconfOption(arguments[0].clone())),
        };

        Ok(Self { configuration })
    }
}

/// Handles the Redis REPLCONF command.
///
/// # Returns
///
/// * `+OK` for `listening-port` and `capa`
/// * `["REPLCONF", "ACK", offset]` for `GETACK`, where offset counts the
///   leader writes applied so far
/// * No reply for `ACK`, which is recorded against the leader's current offset
pub async fn replconf(
    server: &Arc<RedisServer>,
    context: &ClientContext,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let replconf_arguments = ReplconfArguments::parse(arguments)?;

    match replconf_arguments.configuration {
        ReplconfConfiguration::ListeningPort(port) => {
            server
                .replication
                .register_listening_port(&context.client_address, port)
                .await;

            Ok(CommandResult::Response(RespValue::simple_string("OK")))
        }
        ReplconfConfiguration::Capabilities => {
            Ok(CommandResult::Response(RespValue::simple_string("OK")))
        }
        ReplconfConfiguration::GetAck => {
            let offset = server.replication.offset().await;

            Ok(CommandResult::Response(RespValue::array_of_bulk_strings([
                "REPLCONF".to_string(),
                "ACK".to_string(),
                offset.to_string(),
            ])))
        }
        ReplconfConfiguration::Ack => {
            server
                .replication
                .record_ack(&context.client_address)
                .await;

            Ok(CommandResult::NoResponse)
        }
    }
}
