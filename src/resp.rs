//! RESP wire codec.
//!
//! Decoding works on a byte buffer that may hold several pipelined records and
//! reports how many bytes were consumed, so the caller can keep a trailing
//! partial record around until more data arrives. Encoding is driven entirely
//! by the explicit [`RespValue`] variant, so integer replies and bulk replies
//! never need to be inferred from the payload.

use std::fmt::Write;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};

const CRLF: &[u8] = b"\r\n";

/// Framing errors. None of them are fatal to a connection: the offending
/// element is dropped and decoding resumes after it.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum RespError {
    #[error("unknown RESP type prefix 0x{0:02X}")]
    UnknownPrefix(u8),
    #[error("invalid length '{0}'")]
    InvalidLength(String),
    #[error("invalid integer '{0}'")]
    InvalidInteger(String),
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,
    #[error("bulk string payload is not followed by CRLF")]
    MissingTerminator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(String),
    /// Null bulk string, `$-1\r\n`.
    Null,
    Array(Vec<RespValue>),
    /// Null array, `*-1\r\n`.
    NullArray,
}

/// A decoded top-level record together with the exact bytes it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct RespFrame {
    pub value: RespValue,
    pub raw: Bytes,
}

enum Parsed {
    Complete(RespValue, usize),
    Incomplete,
    Invalid(RespError, usize),
}

impl RespValue {
    /// Decodes every complete record available in `input`.
    ///
    /// Returns the decoded frames and the number of bytes consumed. Bytes past
    /// that count belong to a record that has not fully arrived yet.
    pub fn decode(input: &[u8]) -> (Vec<RespFrame>, usize) {
        let mut frames = Vec::new();
        let mut cursor = 0;

        while cursor < input.len() {
            match parse_element(input, cursor) {
                Parsed::Complete(value, end) => {
                    frames.push(RespFrame {
                        value,
                        raw: Bytes::copy_from_slice(&input[cursor..end]),
                    });
                    cursor = end;
                }
                Parsed::Incomplete => break,
                Parsed::Invalid(RespError::UnknownPrefix(byte), resume)
                    if byte == b'\r' || byte == b'\n' =>
                {
                    debug!("skipping stray line terminator");
                    cursor = resume;
                }
                Parsed::Invalid(err, resume) => {
                    warn!("discarding malformed RESP element: {}", err);
                    cursor = resume;
                }
            }
        }

        (frames, cursor)
    }

    /// Decodes only the record at the front of `input`, leaving whatever
    /// follows untouched. Returns `Ok(None)` until that record is complete.
    pub fn decode_first(input: &[u8]) -> Result<Option<(RespFrame, usize)>, RespError> {
        match parse_element(input, 0) {
            Parsed::Complete(value, end) => Ok(Some((
                RespFrame {
                    value,
                    raw: Bytes::copy_from_slice(&input[..end]),
                },
                end,
            ))),
            Parsed::Incomplete => Ok(None),
            Parsed::Invalid(err, _) => Err(err),
        }
    }

    /// Decodes a `$<len>\r\n<payload>` header and payload that is *not*
    /// followed by CRLF, as used by the snapshot transfer during a full resync.
    ///
    /// Returns `Ok(None)` until the whole payload is available.
    pub fn decode_bulk_payload(input: &[u8]) -> Result<Option<(Bytes, usize)>, RespError> {
        let Some(&prefix) = input.first() else {
            return Ok(None);
        };

        if prefix != b'$' {
            return Err(RespError::UnknownPrefix(prefix));
        }

        let Some(line_end) = find_crlf(input, 1) else {
            return Ok(None);
        };

        let length = parse_length(&input[1..line_end])?;
        let Ok(length) = usize::try_from(length) else {
            return Err(RespError::InvalidLength(length.to_string()));
        };

        let payload_start = line_end + CRLF.len();
        let payload_end = payload_start + length;

        if input.len() < payload_end {
            return Ok(None);
        }

        Ok(Some((
            Bytes::copy_from_slice(&input[payload_start..payload_end]),
            payload_end,
        )))
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        self.encode_into(&mut out);
        out
    }

    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.encode())
    }

    fn encode_into(&self, out: &mut String) {
        // Writing into a String cannot fail.
        let _ = match self {
            RespValue::SimpleString(s) => write!(out, "+{}\r\n", s),
            RespValue::Error(s) => write!(out, "-{}\r\n", s),
            RespValue::Integer(n) => write!(out, ":{}\r\n", n),
            RespValue::BulkString(s) => write!(out, "${}\r\n{}\r\n", s.len(), s),
            RespValue::Null => write!(out, "$-1\r\n"),
            RespValue::NullArray => write!(out, "*-1\r\n"),
            RespValue::Array(elements) => {
                let _ = write!(out, "*{}\r\n", elements.len());
                for element in elements {
                    element.encode_into(out);
                }
                Ok(())
            }
        };
    }

    pub fn simple_string(s: &str) -> Self {
        RespValue::SimpleString(s.to_string())
    }

    pub fn bulk_string(s: &str) -> Self {
        RespValue::BulkString(s.to_string())
    }

    /// Builds an array of bulk strings, the shape of every client command.
    pub fn array_of_bulk_strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        RespValue::Array(
            items
                .into_iter()
                .map(|item| RespValue::BulkString(item.as_ref().to_string()))
                .collect(),
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RespValue::SimpleString(s) | RespValue::BulkString(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }
}

fn find_crlf(input: &[u8], from: usize) -> Option<usize> {
    input
        .get(from..)?
        .windows(2)
        .position(|window| window == CRLF)
        .map(|position| from + position)
}

fn parse_length(bytes: &[u8]) -> Result<i64, RespError> {
    let text = std::str::from_utf8(bytes).map_err(|_| RespError::InvalidUtf8)?;
    text.parse::<i64>()
        .map_err(|_| RespError::InvalidLength(text.to_string()))
}

fn parse_line(bytes: &[u8]) -> Result<String, RespError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| RespError::InvalidUtf8)
}

fn parse_element(input: &[u8], start: usize) -> Parsed {
    let Some(&prefix) = input.get(start) else {
        return Parsed::Incomplete;
    };

    if !matches!(prefix, b'+' | b'-' | b':' | b'$' | b'*') {
        return Parsed::Invalid(RespError::UnknownPrefix(prefix), start + 1);
    }

    let Some(line_end) = find_crlf(input, start + 1) else {
        return Parsed::Incomplete;
    };
    let line = &input[start + 1..line_end];
    let after_line = line_end + CRLF.len();

    match prefix {
        b'+' => match parse_line(line) {
            Ok(s) => Parsed::Complete(RespValue::SimpleString(s), after_line),
            Err(e) => Parsed::Invalid(e, after_line),
        },
        b'-' => match parse_line(line) {
            Ok(s) => Parsed::Complete(RespValue::Error(s), after_line),
            Err(e) => Parsed::Invalid(e, after_line),
        },
        b':' => {
            let text = String::from_utf8_lossy(line);
            match text.parse::<i64>() {
                Ok(n) => Parsed::Complete(RespValue::Integer(n), after_line),
                Err(_) => Parsed::Invalid(RespError::InvalidInteger(text.to_string()), after_line),
            }
        }
        b'$' => {
            let length = match parse_length(line) {
                Ok(length) => length,
                Err(e) => return Parsed::Invalid(e, after_line),
            };

            if length == -1 {
                return Parsed::Complete(RespValue::Null, after_line);
            }

            let Ok(length) = usize::try_from(length) else {
                return Parsed::Invalid(RespError::InvalidLength(length.to_string()), after_line);
            };

            let payload_end = after_line + length;
            if input.len() < payload_end + CRLF.len() {
                return Parsed::Incomplete;
            }

            if &input[payload_end..payload_end + CRLF.len()] != CRLF {
                return Parsed::Invalid(RespError::MissingTerminator, payload_end);
            }

            match parse_line(&input[after_line..payload_end]) {
                Ok(s) => Parsed::Complete(RespValue::BulkString(s), payload_end + CRLF.len()),
                Err(e) => Parsed::Invalid(e, payload_end + CRLF.len()),
            }
        }
        _ => {
            let count = match parse_length(line) {
                Ok(count) => count,
                Err(e) => return Parsed::Invalid(e, after_line),
            };

            if count == -1 {
                return Parsed::Complete(RespValue::NullArray, after_line);
            }

            let Ok(count) = usize::try_from(count) else {
                return Parsed::Invalid(RespError::InvalidLength(count.to_string()), after_line);
            };

            let mut elements = Vec::with_capacity(count.min(1024));
            let mut cursor = after_line;

            for _ in 0..count {
                match parse_element(input, cursor) {
                    Parsed::Complete(value, end) => {
                        elements.push(value);
                        cursor = end;
                    }
                    other => return other,
                }
            }

            Parsed::Complete(RespValue::Array(elements), cursor)
        }
    }
}
