mod encoding;
mod opcode;
mod rdb_file_operations;
mod rdb_parser;
mod rdb_writer;

use thiserror::Error;

pub use rdb_file_operations::{load_rdb_file, save_rdb_file};
pub use rdb_parser::RdbParser;
pub use rdb_writer::RdbWriter;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum RdbError {
    #[error("unexpected end of snapshot at byte {0}")]
    UnexpectedEof(usize),
    #[error("invalid magic string")]
    InvalidMagic,
    #[error("invalid snapshot version {0:?}")]
    InvalidVersion(String),
    #[error("missing {0} section")]
    MissingSection(&'static str),
    #[error("invalid length encoding 0x{0:02X}")]
    InvalidLengthEncoding(u8),
    #[error("LZF compressed strings are not supported")]
    CompressedString,
    #[error("unsupported value type 0x{0:02X}")]
    UnsupportedValueType(u8),
    #[error("invalid UTF-8 in snapshot string")]
    InvalidUtf8,
    #[error("invalid expiry timestamp {0}")]
    InvalidExpiry(i64),
}
