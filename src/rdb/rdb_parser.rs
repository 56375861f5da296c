use std::collections::HashMap;

use jiff::Timestamp;
use tracing::{debug, warn};

use crate::{
    key_value_store::StringEntry,
    rdb::{
        RdbError,
        opcode::{OpCodeResponse, parse_magic_string, parse_opcode},
    },
};

/// Decodes a snapshot image into string records.
///
/// A bad header or a record outside a database section fails the whole
/// image. A file cut short after the database section started yields the
/// records read so far.
#[derive(Debug)]
pub struct RdbParser<'a> {
    bytes: &'a [u8],
    cursor: usize,
    pub redis_version: Option<String>,
    pub metadata: HashMap<String, String>,
    pub database_index: Option<usize>,
    pub key_count: Option<usize>,
    pub expire_count: Option<usize>,
}

impl<'a> RdbParser<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            cursor: 0,
            redis_version: None,
            metadata: HashMap::new(),
            database_index: None,
            key_count: None,
            expire_count: None,
        }
    }

    pub fn parse(&mut self) -> Result<Vec<StringEntry>, RdbError> {
        let (version, read) = parse_magic_string(self.bytes)?;
        self.redis_version = Some(version);
        self.cursor = read;

        let mut entries = Vec::new();
        let mut expect_resize = false;

        loop {
            let (response, read) = match parse_opcode(self.bytes, self.cursor) {
                Ok(parsed) => parsed,
                Err(RdbError::UnexpectedEof(at)) if self.database_index.is_some() => {
                    warn!(
                        "snapshot truncated at byte {} after {} of {:?} records",
                        at,
                        entries.len(),
                        self.key_count
                    );
                    return Ok(entries);
                }
                Err(e) => return Err(e),
            };

            if self.metadata.is_empty() && !matches!(response, OpCodeResponse::Metadata { .. }) {
                return Err(RdbError::MissingSection("metadata"));
            }

            if expect_resize && !matches!(response, OpCodeResponse::ResizeDb { .. }) {
                return Err(RdbError::MissingSection("resize db"));
            }
            expect_resize = false;

            self.cursor += read;

            match response {
                OpCodeResponse::Metadata { key, value } => {
                    debug!("snapshot metadata {} = {}", key, value);
                    self.metadata.insert(key, value);
                }
                OpCodeResponse::Database { index } => {
                    self.database_index = Some(index);
                    expect_resize = true;
                }
                OpCodeResponse::ResizeDb {
                    key_count,
                    expire_count,
                } => {
                    self.key_count = Some(key_count);
                    self.expire_count = Some(expire_count);
                }
                OpCodeResponse::KeyValuePair {
                    key,
                    value,
                    expires_at_ms,
                } => {
                    if self.database_index.is_none() {
                        return Err(RdbError::MissingSection("database"));
                    }

                    let expires_at = expires_at_ms
                        .map(|ms| {
                            Timestamp::from_millisecond(ms).map_err(|_| RdbError::InvalidExpiry(ms))
                        })
                        .transpose()?;

                    entries.push(StringEntry {
                        key,
                        value,
                        expires_at,
                    });
                }
                OpCodeResponse::EndOfFile => break,
            }
        }

        if let Some(key_count) = self.key_count {
            if entries.len() < key_count {
                warn!(
                    "snapshot declared {} keys but only {} were present",
                    key_count,
                    entries.len()
                );
            }
        }

        Ok(entries)
    }
}
