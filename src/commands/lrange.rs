use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{CommandError, CommandResult},
    key_value_store::KeyValueStore,
    resp::RespValue,
};

/// Represents the parsed arguments for the LRANGE command.
pub struct LrangeArguments {
    /// The key name to retrieve from the store
    key: String,
    /// The starting index for the range (can be negative to count from the end)
    start_index: i64,
    /// The ending index for the range, inclusive (can be negative to count from the end)
    end_index: i64,
}

impl LrangeArguments {
    /// Parses and validates the arguments for the LRANGE command.
    ///
    /// # Returns
    ///
    /// * `Ok(LrangeArguments)` - If the arguments are valid
    /// * `Err(CommandError::WrongNumberOfArguments)` - If the number of arguments is not exactly 3
    /// * `Err(CommandError::NotAnInteger)` - If start or end index is not a valid integer
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let args = LrangeArguments::parse(vec!["mylist".to_string(), "0".to_string(), "-1".to_string()]).unwrap();
    /// assert_eq!(args.start_index, 0);
    /// assert_eq!(args.end_index, -1);
    /// ```
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [key, start_index, end_index]: [String; 3] = arguments
            .try_into()
            .map_err(|_| CommandError::arity("lrange"))?;

        let start_index = start_index
            .parse::<i64>()
            .map_err(|_| CommandError::NotAnInteger)?;
        let end_index = end_index
            .parse::<i64>()
            .map_err(|_| CommandError::NotAnInteger)?;

        Ok(Self {
            key,
            start_index,
            end_index,
        })
    }
}

/// Handles the Redis LRANGE command.
///
/// Negative indices count from the end of the list (`-1` is the last
/// element). Out of range indices are clamped; a missing key is an empty list.
pub async fn lrange(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let lrange_arguments = LrangeArguments::parse(arguments)?;

    let mut store_guard = store.lock().await;
    let elements = store_guard.range(
        &lrange_arguments.key,
        lrange_arguments.start_index,
        lrange_arguments.end_index,
    )?;

    Ok(CommandResult::Response(RespValue::array_of_bulk_strings(
        elements,
    )))
}
