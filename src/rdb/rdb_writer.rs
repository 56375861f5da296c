use crate::{
    key_value_store::StringEntry,
    rdb::{
        encoding::{write_length, write_string},
        opcode::{
            DATABASE_OPCODE, END_OF_FILE_OPCODE, EXPIRATION_MILLISECONDS_OPCODE, MAGIC_STRING,
            METADATA_OPCODE, RESIZE_DB_OPCODE, STRING_VALUE_TYPE,
        },
    },
};

const RDB_VERSION: &[u8] = b"0011";
const REDIS_VERSION: &str = "6.0.16";

/// Encodes string records into a snapshot image.
///
/// The database section is left out entirely when there are no records, and
/// the trailing checksum is written as zeros (checksum disabled).
#[derive(Debug)]
pub struct RdbWriter {
    entries: Vec<StringEntry>,
}

impl RdbWriter {
    pub fn new(entries: Vec<StringEntry>) -> Self {
        Self { entries }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC_STRING);
        out.extend_from_slice(RDB_VERSION);

        out.push(METADATA_OPCODE);
        write_string(&mut out, "redis-ver");
        write_string(&mut out, REDIS_VERSION);

        if !self.entries.is_empty() {
            let expire_count = self
                .entries
                .iter()
                .filter(|entry| entry.expires_at.is_some())
                .count();

            out.push(DATABASE_OPCODE);
            write_length(&mut out, 0);
            out.push(RESIZE_DB_OPCODE);
            write_length(&mut out, self.entries.len());
            write_length(&mut out, expire_count);

            for entry in &self.entries {
                if let Some(expires_at) = entry.expires_at {
                    out.push(EXPIRATION_MILLISECONDS_OPCODE);
                    out.extend_from_slice(&expires_at.as_millisecond().to_le_bytes());
                }

                out.push(STRING_VALUE_TYPE);
                write_string(&mut out, &entry.key);
                write_string(&mut out, &entry.value);
            }
        }

        out.push(END_OF_FILE_OPCODE);
        out.extend_from_slice(&[0; 8]);
        out
    }
}
