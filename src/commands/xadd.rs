use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;

use crate::{
    commands::{CommandError, CommandResult},
    key_value_store::KeyValueStore,
    resp::RespValue,
    stream::RequestedId,
};

/// Parsed arguments for `XADD key id field value [field value ...]`.
pub struct XaddArguments {
    key: String,
    id: RequestedId,
    fields: Vec<(String, String)>,
}

impl XaddArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() < 4 || arguments.len() % 2 != 0 {
            return Err(CommandError::arity("xadd"));
        }

        let id = arguments[1].parse::<RequestedId>()?;
        let fields = arguments[2..]
            .chunks_exact(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();

        Ok(Self {
            key: arguments[0].clone(),
            id,
            fields,
        })
    }
}

/// Handles the Redis XADD command.
///
/// Appends an entry and replies with its id. When any part of the id was
/// generated here, replicas receive the command with the resolved id instead
/// of the original bytes so they store the same entry.
pub async fn xadd(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: Vec<String>,
    raw: &Bytes,
) -> Result<CommandResult, CommandError> {
    let xadd_arguments = XaddArguments::parse(arguments)?;

    let mut store_guard = store.lock().await;
    let id = store_guard
        .xadd(
            &xadd_arguments.key,
            xadd_arguments.id,
            xadd_arguments.fields.clone(),
        )?
        .to_string();

    let propagate = if xadd_arguments.id.is_explicit() {
        raw.clone()
    } else {
        let mut command = vec!["XADD", xadd_arguments.key.as_str(), id.as_str()];
        for (field, value) in &xadd_arguments.fields {
            command.push(field.as_str());
            command.push(value.as_str());
        }
        RespValue::array_of_bulk_strings(command).to_bytes()
    };

    Ok(CommandResult::Write(RespValue::BulkString(id), propagate))
}
