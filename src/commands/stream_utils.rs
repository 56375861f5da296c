use crate::{resp::RespValue, stream::StreamEntry};

/// Converts one stream entry to `[id, [field1, value1, field2, value2, ...]]`.
pub fn entry_to_resp(entry: &StreamEntry) -> RespValue {
    RespValue::Array(vec![
        RespValue::BulkString(entry.id.to_string()),
        RespValue::array_of_bulk_strings(
            entry
                .fields
                .iter()
                .flat_map(|(field, value)| [field.as_str(), value.as_str()]),
        ),
    ])
}

/// Converts stream entries to the RESP array shape shared by XRANGE and XREAD.
pub fn entries_to_resp(entries: &[StreamEntry]) -> RespValue {
    RespValue::Array(entries.iter().map(entry_to_resp).collect())
}
