//! Append-only stream data type.

use std::{fmt, str::FromStr};

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum StreamError {
    #[error("The ID specified in XADD is equal or smaller than the target stream top item")]
    IdTooSmall,
    #[error("The ID specified in XADD must be greater than 0-0")]
    IdIsZero,
    #[error("Invalid stream ID specified as stream command argument")]
    InvalidId(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    pub const MIN: StreamId = StreamId { ms: 0, seq: 0 };
    pub const MAX: StreamId = StreamId {
        ms: u64::MAX,
        seq: u64::MAX,
    };

    pub fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }

    /// Parses an XRANGE bound. `-` and `+` are the open ends of the stream; an
    /// id without a sequence part covers the whole millisecond.
    pub fn parse_range_bound(input: &str, is_end: bool) -> Result<Self, StreamError> {
        match input {
            "-" => Ok(Self::MIN),
            "+" => Ok(Self::MAX),
            _ => match input.split_once('-') {
                Some(_) => input.parse(),
                None => {
                    let ms = parse_component(input, input)?;
                    let seq = if is_end { u64::MAX } else { 0 };
                    Ok(Self { ms, seq })
                }
            },
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

impl FromStr for StreamId {
    type Err = StreamError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.split_once('-') {
            Some((ms, seq)) => Ok(Self {
                ms: parse_component(ms, input)?,
                seq: parse_component(seq, input)?,
            }),
            None => Ok(Self {
                ms: parse_component(input, input)?,
                seq: 0,
            }),
        }
    }
}

fn parse_component(component: &str, whole: &str) -> Result<u64, StreamError> {
    component
        .parse::<u64>()
        .map_err(|_| StreamError::InvalidId(whole.to_string()))
}

/// The id an XADD caller asked for, before the stream resolves it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RequestedId {
    /// `*`
    Auto,
    /// `<ms>-*`
    AutoSequence(u64),
    Explicit(StreamId),
}

impl FromStr for RequestedId {
    type Err = StreamError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input == "*" {
            return Ok(RequestedId::Auto);
        }

        if let Some(ms) = input.strip_suffix("-*") {
            return Ok(RequestedId::AutoSequence(parse_component(ms, input)?));
        }

        Ok(RequestedId::Explicit(input.parse()?))
    }
}

impl RequestedId {
    pub fn is_explicit(&self) -> bool {
        matches!(self, RequestedId::Explicit(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry {
    pub id: StreamId,
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Stream {
    entries: Vec<StreamEntry>,
}

impl Stream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&StreamEntry> {
        self.entries.last()
    }

    /// Resolves the auto-generated parts of `requested` against the current
    /// top entry and checks it is strictly greater than that entry.
    pub fn resolve_id(&self, requested: RequestedId, now_ms: u64) -> Result<StreamId, StreamError> {
        let last = self.latest().map(|entry| entry.id);

        let id = match requested {
            RequestedId::Explicit(id) => id,
            RequestedId::AutoSequence(ms) => match last {
                Some(last) if last.ms == ms => StreamId::new(ms, last.seq.saturating_add(1)),
                _ => StreamId::new(ms, if ms == 0 { 1 } else { 0 }),
            },
            RequestedId::Auto => match last {
                Some(last) if last.ms >= now_ms => {
                    StreamId::new(last.ms, last.seq.saturating_add(1))
                }
                _ => StreamId::new(now_ms, if now_ms == 0 { 1 } else { 0 }),
            },
        };

        if id == StreamId::MIN {
            return Err(StreamError::IdIsZero);
        }

        if let Some(last) = last {
            if id <= last {
                return Err(StreamError::IdTooSmall);
            }
        }

        Ok(id)
    }

    /// Appends an entry. Nothing is mutated when the id is rejected.
    pub fn append(
        &mut self,
        requested: RequestedId,
        fields: Vec<(String, String)>,
        now_ms: u64,
    ) -> Result<StreamId, StreamError> {
        let id = self.resolve_id(requested, now_ms)?;
        self.entries.push(StreamEntry { id, fields });
        Ok(id)
    }

    /// Entries with `start <= id <= end`.
    pub fn range(&self, start: StreamId, end: StreamId) -> &[StreamEntry] {
        if start > end {
            return &[];
        }

        let from = self.entries.partition_point(|entry| entry.id < start);
        let to = self.entries.partition_point(|entry| entry.id <= end);
        &self.entries[from..to]
    }

    /// Entries with `id > after`.
    pub fn range_after(&self, after: StreamId) -> &[StreamEntry] {
        let from = self.entries.partition_point(|entry| entry.id <= after);
        &self.entries[from..]
    }
}
