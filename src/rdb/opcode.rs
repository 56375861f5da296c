use crate::rdb::{
    RdbError,
    encoding::{parse_length, parse_string, read_array, read_slice},
};

pub const MAGIC_STRING: &[u8] = b"REDIS";
pub const METADATA_OPCODE: u8 = 0xFA;
pub const RESIZE_DB_OPCODE: u8 = 0xFB;
pub const DATABASE_OPCODE: u8 = 0xFE;
pub const EXPIRATION_SECONDS_OPCODE: u8 = 0xFD;
pub const EXPIRATION_MILLISECONDS_OPCODE: u8 = 0xFC;
pub const END_OF_FILE_OPCODE: u8 = 0xFF;
pub const STRING_VALUE_TYPE: u8 = 0x00;

#[derive(Debug, PartialEq)]
pub enum OpCodeResponse {
    Metadata {
        key: String,
        value: String,
    },
    ResizeDb {
        key_count: usize,
        expire_count: usize,
    },
    Database {
        index: usize,
    },
    KeyValuePair {
        key: String,
        value: String,
        expires_at_ms: Option<i64>,
    },
    EndOfFile,
}

/// Reads `REDIS` plus the four digit version. Returns the version.
pub fn parse_magic_string(bytes: &[u8]) -> Result<(String, usize), RdbError> {
    let magic = read_slice(bytes, 0, MAGIC_STRING.len()).map_err(|_| RdbError::InvalidMagic)?;
    if magic != MAGIC_STRING {
        return Err(RdbError::InvalidMagic);
    }

    let version = read_slice(bytes, MAGIC_STRING.len(), 4)?;
    let version = std::str::from_utf8(version)
        .map_err(|_| RdbError::InvalidVersion(String::from_utf8_lossy(version).into_owned()))?;

    match version.parse::<u32>() {
        Ok(1..=12) => Ok((version.to_string(), MAGIC_STRING.len() + 4)),
        _ => Err(RdbError::InvalidVersion(version.to_string())),
    }
}

/// Parses the opcode at `cursor`. Returns the decoded element and the number
/// of bytes it spans.
pub fn parse_opcode(bytes: &[u8], cursor: usize) -> Result<(OpCodeResponse, usize), RdbError> {
    let [opcode] = read_array::<1>(bytes, cursor)?;
    let mut temp_cursor = cursor + 1;

    let response = match opcode {
        METADATA_OPCODE => {
            let (key, read) = parse_string(bytes, temp_cursor)?;
            temp_cursor += read;
            let (value, read) = parse_string(bytes, temp_cursor)?;
            temp_cursor += read;

            OpCodeResponse::Metadata { key, value }
        }
        RESIZE_DB_OPCODE => {
            let (key_count, read) = parse_length(bytes, temp_cursor)?;
            temp_cursor += read;
            let (expire_count, read) = parse_length(bytes, temp_cursor)?;
            temp_cursor += read;

            OpCodeResponse::ResizeDb {
                key_count,
                expire_count,
            }
        }
        DATABASE_OPCODE => {
            let (index, read) = parse_length(bytes, temp_cursor)?;
            temp_cursor += read;

            OpCodeResponse::Database { index }
        }
        EXPIRATION_SECONDS_OPCODE | EXPIRATION_MILLISECONDS_OPCODE => {
            let expires_at_ms = if opcode == EXPIRATION_SECONDS_OPCODE {
                let seconds = u32::from_le_bytes(read_array(bytes, temp_cursor)?);
                temp_cursor += 4;
                seconds as i64 * 1000
            } else {
                let milliseconds = u64::from_le_bytes(read_array(bytes, temp_cursor)?);
                temp_cursor += 8;
                i64::try_from(milliseconds).map_err(|_| RdbError::InvalidExpiry(i64::MAX))?
            };

            let record_start = temp_cursor;
            let (record, read) = parse_opcode(bytes, record_start)?;
            temp_cursor += read;

            match record {
                OpCodeResponse::KeyValuePair { key, value, .. } => OpCodeResponse::KeyValuePair {
                    key,
                    value,
                    expires_at_ms: Some(expires_at_ms),
                },
                _ => return Err(RdbError::UnsupportedValueType(bytes[record_start])),
            }
        }
        END_OF_FILE_OPCODE => OpCodeResponse::EndOfFile,
        STRING_VALUE_TYPE => {
            let (key, read) = parse_string(bytes, temp_cursor)?;
            temp_cursor += read;
            let (value, read) = parse_string(bytes, temp_cursor)?;
            temp_cursor += read;

            OpCodeResponse::KeyValuePair {
                key,
                value,
                expires_at_ms: None,
            }
        }
        other => return Err(RdbError::UnsupportedValueType(other)),
    };

    Ok((response, temp_cursor - cursor))
}
