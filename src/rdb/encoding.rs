use crate::rdb::RdbError;

#[derive(Debug, PartialEq)]
enum LengthEncoding {
    Length(usize),
    Int8,
    Int16,
    Int32,
    LzfCompressedString,
}

/// Borrows `len` bytes at `cursor`.
pub fn read_slice(bytes: &[u8], cursor: usize, len: usize) -> Result<&[u8], RdbError> {
    cursor
        .checked_add(len)
        .and_then(|end| bytes.get(cursor..end))
        .ok_or(RdbError::UnexpectedEof(cursor))
}

pub fn read_array<const N: usize>(bytes: &[u8], cursor: usize) -> Result<[u8; N], RdbError> {
    read_slice(bytes, cursor, N)?
        .try_into()
        .map_err(|_| RdbError::UnexpectedEof(cursor))
}

fn parse_length_encoding(bytes: &[u8], cursor: usize) -> Result<(LengthEncoding, usize), RdbError> {
    let [first] = read_array::<1>(bytes, cursor)?;

    // The top two bits select the mode.
    let encoding = match first >> 6 {
        0b00 => (LengthEncoding::Length((first & 0b0011_1111) as usize), 1),
        0b01 => {
            let [second] = read_array::<1>(bytes, cursor + 1)?;
            let length = (((first & 0b0011_1111) as usize) << 8) | second as usize;
            (LengthEncoding::Length(length), 2)
        }
        0b10 => match first {
            0x80 => {
                let length = u32::from_be_bytes(read_array(bytes, cursor + 1)?);
                (LengthEncoding::Length(length as usize), 5)
            }
            0x81 => {
                let length = u64::from_be_bytes(read_array(bytes, cursor + 1)?);
                let length =
                    usize::try_from(length).map_err(|_| RdbError::InvalidLengthEncoding(first))?;
                (LengthEncoding::Length(length), 9)
            }
            _ => return Err(RdbError::InvalidLengthEncoding(first)),
        },
        _ => match first & 0b0011_1111 {
            0 => (LengthEncoding::Int8, 1),
            1 => (LengthEncoding::Int16, 1),
            2 => (LengthEncoding::Int32, 1),
            3 => (LengthEncoding::LzfCompressedString, 1),
            _ => return Err(RdbError::InvalidLengthEncoding(first)),
        },
    };

    Ok(encoding)
}

/// Reads a plain length (counts, database index). Returns the value and the
/// number of bytes read.
pub fn parse_length(bytes: &[u8], cursor: usize) -> Result<(usize, usize), RdbError> {
    match parse_length_encoding(bytes, cursor)? {
        (LengthEncoding::Length(length), read) => Ok((length, read)),
        _ => Err(RdbError::InvalidLengthEncoding(bytes[cursor])),
    }
}

/// Reads a string, expanding the integer-as-string forms. Returns the value
/// and the number of bytes read.
pub fn parse_string(bytes: &[u8], cursor: usize) -> Result<(String, usize), RdbError> {
    let (encoding, header) = parse_length_encoding(bytes, cursor)?;
    let body = cursor + header;

    let (value, body_len) = match encoding {
        LengthEncoding::Length(length) => {
            let slice = read_slice(bytes, body, length)?;
            let value = std::str::from_utf8(slice).map_err(|_| RdbError::InvalidUtf8)?;
            (value.to_string(), length)
        }
        LengthEncoding::Int8 => (i8::from_le_bytes(read_array(bytes, body)?).to_string(), 1),
        LengthEncoding::Int16 => (i16::from_le_bytes(read_array(bytes, body)?).to_string(), 2),
        LengthEncoding::Int32 => (i32::from_le_bytes(read_array(bytes, body)?).to_string(), 4),
        LengthEncoding::LzfCompressedString => return Err(RdbError::CompressedString),
    };

    Ok((value, header + body_len))
}

pub fn write_length(out: &mut Vec<u8>, length: usize) {
    if length < 1 << 6 {
        out.push(length as u8);
    } else if length < 1 << 14 {
        out.push(0b0100_0000 | (length >> 8) as u8);
        out.push((length & 0xFF) as u8);
    } else if let Ok(length) = u32::try_from(length) {
        out.push(0x80);
        out.extend_from_slice(&length.to_be_bytes());
    } else {
        out.push(0x81);
        out.extend_from_slice(&(length as u64).to_be_bytes());
    }
}

/// Writes a string, using the compact integer form when the value is the
/// canonical spelling of an integer that fits in 32 bits.
pub fn write_string(out: &mut Vec<u8>, value: &str) {
    let integer = value
        .parse::<i32>()
        .ok()
        .filter(|integer| integer.to_string() == value);

    match integer {
        Some(integer) => {
            if let Ok(small) = i8::try_from(integer) {
                out.push(0xC0);
                out.extend_from_slice(&small.to_le_bytes());
            } else if let Ok(medium) = i16::try_from(integer) {
                out.push(0xC1);
                out.extend_from_slice(&medium.to_le_bytes());
            } else {
                out.push(0xC2);
                out.extend_from_slice(&integer.to_le_bytes());
            }
        }
        None => {
            write_length(out, value.len());
            out.extend_from_slice(value.as_bytes());
        }
    }
}
