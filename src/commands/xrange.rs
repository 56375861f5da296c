use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{CommandError, CommandResult, stream_utils::entries_to_resp},
    key_value_store::KeyValueStore,
    resp::RespValue,
    stream::StreamId,
};

/// Represents the parsed arguments for `XRANGE key start end [COUNT count]`.
pub struct XrangeArguments {
    key: String,
    /// Inclusive lower bound, `-` for the start of the stream
    start: StreamId,
    /// Inclusive upper bound, `+` for the end of the stream
    end: StreamId,
    count: Option<usize>,
}

impl XrangeArguments {
    /// Parses the XRANGE arguments.
    ///
    /// An id without a sequence number covers the whole millisecond: `5` as a
    /// start means `5-0` and as an end means `5-<max>`.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let args = XrangeArguments::parse(vec!["s".to_string(), "-".to_string(), "1526985054079".to_string()])?;
    /// ```
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let count = match arguments.len() {
            3 => None,
            5 if arguments[3].eq_ignore_ascii_case("count") => Some(
                arguments[4]
                    .parse::<usize>()
                    .map_err(|_| CommandError::NotAnInteger)?,
            ),
            5 => return Err(CommandError::SyntaxError),
            _ => return Err(CommandError::arity("xrange")),
        };

        Ok(Self {
            key: arguments[0].clone(),
            start: StreamId::parse_range_bound(&arguments[1], false)?,
            end: StreamId::parse_range_bound(&arguments[2], true)?,
            count,
        })
    }
}

/// Handles the Redis XRANGE command.
///
/// Replies with every entry between the two bounds (inclusive) as
/// `[[id, [field, value, ...]], ...]`; a missing stream is an empty array.
pub async fn xrange(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let xrange_arguments = XrangeArguments::parse(arguments)?;

    let store_guard = store.lock().await;
    let Some(stream) = store_guard.stream(&xrange_arguments.key) else {
        return Ok(CommandResult::Response(RespValue::Array(vec![])));
    };

    let entries = stream.range(xrange_arguments.start, xrange_arguments.end);
    let entries = match xrange_arguments.count {
        Some(count) => &entries[..count.min(entries.len())],
        None => entries,
    };

    Ok(CommandResult::Response(entries_to_resp(entries)))
}
