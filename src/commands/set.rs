use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use tokio::sync::Mutex;

use crate::{
    commands::{CommandError, CommandResult},
    key_value_store::KeyValueStore,
    resp::RespValue,
};

/// Represents the parsed arguments for SET command
pub struct SetArguments {
    /// The key name to store the value under
    key: String,
    /// The value to be stored under the given key
    value: String,
    /// Time to live, relative to now
    ttl: Option<Duration>,
}

impl SetArguments {
    /// Parses command arguments into a SetArguments structure.
    ///
    /// # Arguments
    ///
    /// * `arguments` - Either `[key, value]` or `[key, value, "PX", milliseconds]`
    ///   (`EX seconds` is accepted as well). Option names are case-insensitive.
    ///
    /// # Returns
    ///
    /// * `Ok(SetArguments)` - Successfully parsed arguments. A TTL of zero
    ///   means the key never expires.
    /// * `Err(CommandError::WrongNumberOfArguments)` - Fewer than two arguments
    /// * `Err(CommandError::SyntaxError)` - Unknown option or missing option value
    /// * `Err(CommandError::NotAnInteger)` - The TTL is not a non-negative integer
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let result = SetArguments::parse(vec![
    ///     "mykey".to_string(),
    ///     "hello".to_string(),
    ///     "PX".to_string(),
    ///     "1000".to_string()
    /// ]);
    /// // Returns: Ok(SetArguments { key: "mykey", value: "hello", ttl: Some(1s) })
    /// ```
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() < 2 {
            return Err(CommandError::arity("set"));
        }

        let ttl = match &arguments[2..] {
            [] => None,
            [option, amount] => {
                let amount = amount
                    .parse::<u64>()
                    .map_err(|_| CommandError::NotAnInteger)?;

                match option.to_uppercase().as_str() {
                    "PX" => Some(Duration::from_millis(amount)),
                    "EX" => Some(Duration::from_secs(amount)),
                    _ => return Err(CommandError::SyntaxError),
                }
            }
            _ => return Err(CommandError::SyntaxError),
        };

        Ok(Self {
            key: arguments[0].clone(),
            value: arguments[1].clone(),
            ttl,
        })
    }
}

/// Handles the Redis SET command.
///
/// Stores a string under the key, replacing whatever was there, with an
/// optional expiration.
///
/// # Returns
///
/// * `Ok(CommandResult::Write)` - `+OK`, with the original command bytes to
///   forward to replicas
/// * `Err(CommandError)` - If the arguments do not parse
pub async fn set(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: Vec<String>,
    raw: &Bytes,
) -> Result<CommandResult, CommandError> {
    let set_arguments = SetArguments::parse(arguments)?;

    let mut store_guard = store.lock().await;
    store_guard.set(&set_arguments.key, &set_arguments.value, set_arguments.ttl);

    Ok(CommandResult::Write(
        RespValue::simple_string("OK"),
        raw.clone(),
    ))
}
