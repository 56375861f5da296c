use thiserror::Error;

use crate::{
    key_value_store::StoreError, resp::RespValue, state::StateError, stream::StreamError,
};

/// Semantic errors raised while parsing or running a command.
///
/// The display text of every variant is the exact message sent back to the
/// client as a simple error.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum CommandError {
    #[error("ERR Protocol error: expected an array of bulk strings")]
    InvalidCommand,
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),
    #[error("ERR unknown subcommand '{0}'. Try CONFIG HELP.")]
    UnknownSubcommand(String),
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongNumberOfArguments(String),
    #[error("ERR syntax error")]
    SyntaxError,
    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,
    #[error("ERR timeout is not a float or out of range")]
    InvalidTimeout,
    #[error("ERR timeout is negative")]
    NegativeTimeout,
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("ERR {0}")]
    InvalidStreamId(#[from] StreamError),
    #[error("ERR EXEC without MULTI")]
    ExecWithoutMulti,
    #[error("ERR DISCARD without MULTI")]
    DiscardWithoutMulti,
    #[error("ERR MULTI calls can not be nested")]
    NestedMulti,
    #[error(
        "ERR Can't execute '{0}': only (P|S)SUBSCRIBE / (P|S)UNSUBSCRIBE / PING / QUIT / RESET are allowed in this context"
    )]
    NotAllowedInSubscribedMode(String),
    #[error("READONLY You can't write against a read only replica.")]
    ReadOnlyReplica,
    #[error("ERR WAIT cannot be used with replica instances")]
    WaitOnReplica,
    #[error("ERR Unrecognized REPLCONF option: {0}")]
    UnknownReplconfOption(String),
    #[error("ERR unsupported PSYNC arguments, only 'PSYNC ? -1' is accepted")]
    UnsupportedPsync,
}

impl CommandError {
    pub fn arity(command: &str) -> Self {
        CommandError::WrongNumberOfArguments(command.to_lowercase())
    }

    pub fn as_resp(&self) -> RespValue {
        RespValue::Error(self.to_string())
    }

    pub fn as_string(&self) -> String {
        self.as_resp().encode()
    }
}

impl From<StoreError> for CommandError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::WrongType => CommandError::WrongType,
            StoreError::NotAnInteger => CommandError::NotAnInteger,
        }
    }
}

impl From<StateError> for CommandError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::TransactionAlreadyStarted => CommandError::NestedMulti,
            StateError::TransactionNotFound => CommandError::ExecWithoutMulti,
        }
    }
}
