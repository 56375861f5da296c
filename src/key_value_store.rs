use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};

use jiff::Timestamp;
use regex::Regex;
use thiserror::Error;
use tokio::{
    sync::{Mutex, mpsc},
    time::{Instant, sleep},
};
use tracing::warn;

use crate::{
    cancellation::Cancellation,
    pub_sub::SubscriptionIndex,
    rdb::{RdbParser, RdbWriter},
    replication::WriteOrder,
    stream::{RequestedId, Stream, StreamError, StreamId},
};

const BLOCKING_POP_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Error, Debug, PartialEq, Clone)]
pub enum StoreError {
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("value is not an integer or out of range")]
    NotAnInteger,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    String(String),
    List(VecDeque<String>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ListEnd {
    Front,
    Back,
}

/// A string key as seen by the snapshot codec.
#[derive(Debug, Clone, PartialEq)]
pub struct StringEntry {
    pub key: String,
    pub value: String,
    pub expires_at: Option<Timestamp>,
}

/// All mutable server data.
///
/// Strings and lists share one keyspace; streams live in their own map under
/// the same key names. Expiry applies to string keys only and is enforced
/// lazily on access.
#[derive(Debug, Default)]
pub struct KeyValueStore {
    data: HashMap<String, DataType>,
    expiry: HashMap<String, Timestamp>,
    streams: HashMap<String, Stream>,
    stream_observers: HashMap<String, Vec<mpsc::Sender<()>>>,
    pub pub_sub: SubscriptionIndex,
}

impl KeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn purge_if_expired(&mut self, key: &str) {
        let expired = self
            .expiry
            .get(key)
            .is_some_and(|deadline| *deadline <= Timestamp::now());

        if expired {
            self.expiry.remove(key);
            self.data.remove(key);
        }
    }

    fn purge_expired(&mut self) {
        let now = Timestamp::now();
        let expired: Vec<String> = self
            .expiry
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();

        for key in expired {
            self.expiry.remove(&key);
            self.data.remove(&key);
        }
    }

    /// Stores a string. A `ttl` of `None` or zero leaves the key without a
    /// deadline and clears any previous one.
    pub fn set(&mut self, key: &str, value: &str, ttl: Option<Duration>) {
        let deadline = ttl
            .filter(|ttl| !ttl.is_zero())
            .and_then(|ttl| Timestamp::now().checked_add(ttl).ok());
        self.set_with_deadline(key, value, deadline);
    }

    pub fn set_with_deadline(&mut self, key: &str, value: &str, deadline: Option<Timestamp>) {
        self.data
            .insert(key.to_string(), DataType::String(value.to_string()));

        match deadline {
            Some(deadline) => {
                self.expiry.insert(key.to_string(), deadline);
            }
            None => {
                self.expiry.remove(key);
            }
        }
    }

    pub fn get(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        self.purge_if_expired(key);

        match self.data.get(key) {
            Some(DataType::String(value)) => Ok(Some(value.clone())),
            Some(DataType::List(_)) => Err(StoreError::WrongType),
            None => Ok(None),
        }
    }

    pub fn expires_at(&self, key: &str) -> Option<Timestamp> {
        self.expiry.get(key).copied()
    }

    /// Increments the integer stored at `key`, creating it at 1. The key keeps
    /// its deadline.
    pub fn incr(&mut self, key: &str) -> Result<i64, StoreError> {
        self.purge_if_expired(key);

        let next = match self.data.get(key) {
            Some(DataType::String(value)) => value
                .parse::<i64>()
                .ok()
                .and_then(|current| current.checked_add(1))
                .ok_or(StoreError::NotAnInteger)?,
            Some(DataType::List(_)) => return Err(StoreError::WrongType),
            None => 1,
        };

        self.data
            .insert(key.to_string(), DataType::String(next.to_string()));

        Ok(next)
    }

    /// Keys matching a glob where `*` is the only wildcard. `None` matches
    /// everything.
    pub fn keys(&mut self, pattern: Option<&str>) -> Vec<String> {
        self.purge_expired();

        let pattern = pattern.unwrap_or("*");
        let regex_pattern = format!(
            "^{}$",
            pattern
                .split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*")
        );

        let regex = match Regex::new(&regex_pattern) {
            Ok(regex) => regex,
            Err(e) => {
                warn!("invalid KEYS pattern {:?}: {}", pattern, e);
                return Vec::new();
            }
        };

        let mut keys: Vec<String> = self
            .data
            .keys()
            .chain(self.streams.keys())
            .filter(|key| regex.is_match(key))
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    pub fn key_type(&mut self, key: &str) -> &'static str {
        self.purge_if_expired(key);

        match self.data.get(key) {
            Some(DataType::String(_)) => "string",
            Some(DataType::List(_)) => "list",
            None if self.streams.contains_key(key) => "stream",
            None => "none",
        }
    }

    fn list_mut(&mut self, key: &str) -> Result<Option<&mut VecDeque<String>>, StoreError> {
        self.purge_if_expired(key);

        match self.data.get_mut(key) {
            Some(DataType::List(list)) => Ok(Some(list)),
            Some(DataType::String(_)) => Err(StoreError::WrongType),
            None => Ok(None),
        }
    }

    /// Pushes `values` one at a time, so pushing `a b` to the front leaves `b`
    /// first. Returns the new length.
    pub fn push(&mut self, key: &str, values: &[String], end: ListEnd) -> Result<usize, StoreError> {
        if self.list_mut(key)?.is_none() {
            self.data
                .insert(key.to_string(), DataType::List(VecDeque::new()));
        }

        let Some(list) = self.list_mut(key)? else {
            return Ok(0);
        };

        for value in values {
            match end {
                ListEnd::Front => list.push_front(value.clone()),
                ListEnd::Back => list.push_back(value.clone()),
            }
        }

        Ok(list.len())
    }

    /// Removes up to `count` elements from the front. Empty lists are deleted.
    pub fn pop(&mut self, key: &str, count: usize) -> Result<Vec<String>, StoreError> {
        let Some(list) = self.list_mut(key)? else {
            return Ok(Vec::new());
        };

        let count = count.min(list.len());
        let popped: Vec<String> = list.drain(..count).collect();

        if list.is_empty() {
            self.data.remove(key);
        }

        Ok(popped)
    }

    /// Inclusive range; negative indices count from the end.
    pub fn range(&mut self, key: &str, start: i64, end: i64) -> Result<Vec<String>, StoreError> {
        let Some(list) = self.list_mut(key)? else {
            return Ok(Vec::new());
        };

        let len = list.len() as i64;
        let normalize = |index: i64| if index < 0 { (len + index).max(0) } else { index };
        let start = normalize(start);
        let end = normalize(end).min(len - 1);

        if start > end || start >= len {
            return Ok(Vec::new());
        }

        Ok(list
            .range(start as usize..=end as usize)
            .cloned()
            .collect())
    }

    pub fn len(&mut self, key: &str) -> Result<usize, StoreError> {
        Ok(self.list_mut(key)?.map_or(0, |list| list.len()))
    }

    /// Pops one element from the first non-empty list in `keys`, waiting for
    /// one to show up if they are all empty.
    ///
    /// The store lock and `write_order` are only held while checking, so many
    /// blocked callers on different keys can wait side by side. After a pop
    /// `write_order` stays held for the caller to forward the pop. Returns
    /// `Ok(None)` on timeout or when `cancellation` fires. A `timeout` of
    /// `None` waits forever.
    pub async fn blocking_pop(
        store: &Arc<Mutex<KeyValueStore>>,
        keys: &[String],
        timeout: Option<Duration>,
        cancellation: &Cancellation,
        write_order: &mut WriteOrder,
    ) -> Result<Option<(String, String)>, StoreError> {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);

        loop {
            write_order.acquire().await;
            {
                let mut store_guard = store.lock().await;
                for key in keys {
                    if let Some(value) = store_guard.pop(key, 1)?.pop() {
                        return Ok(Some((key.clone(), value)));
                    }
                }
            }
            write_order.release();

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Ok(None);
            }

            tokio::select! {
                _ = sleep(BLOCKING_POP_POLL_INTERVAL) => {}
                _ = cancellation.cancelled() => return Ok(None),
            }
        }
    }

    pub fn stream(&self, key: &str) -> Option<&Stream> {
        self.streams.get(key)
    }

    pub fn latest_stream_id(&self, key: &str) -> Option<StreamId> {
        self.streams
            .get(key)
            .and_then(Stream::latest)
            .map(|entry| entry.id)
    }

    /// Appends to a stream, creating it on first successful append, and wakes
    /// every pending observer of that key.
    pub fn xadd(
        &mut self,
        key: &str,
        requested: RequestedId,
        fields: Vec<(String, String)>,
    ) -> Result<StreamId, StreamError> {
        let now_ms = u64::try_from(Timestamp::now().as_millisecond()).unwrap_or(0);

        let id = match self.streams.get_mut(key) {
            Some(stream) => stream.append(requested, fields, now_ms)?,
            None => {
                let mut stream = Stream::new();
                let id = stream.append(requested, fields, now_ms)?;
                self.streams.insert(key.to_string(), stream);
                id
            }
        };

        if let Some(observers) = self.stream_observers.remove(key) {
            for observer in observers {
                let _ = observer.try_send(());
            }
        }

        Ok(id)
    }

    /// Registers a one-shot wake-up for the next append to `key`.
    pub fn observe_append(&mut self, key: &str, observer: mpsc::Sender<()>) {
        let observers = self.stream_observers.entry(key.to_string()).or_default();
        observers.retain(|observer| !observer.is_closed());
        observers.push(observer);
    }

    /// Drops wake-ups whose reader went away, and the key's entry with them
    /// once none are left.
    pub fn forget_closed_observers(&mut self, key: &str) {
        if let Some(observers) = self.stream_observers.get_mut(key) {
            observers.retain(|observer| !observer.is_closed());
            if observers.is_empty() {
                self.stream_observers.remove(key);
            }
        }
    }

    pub fn has_observers(&self, key: &str) -> bool {
        self.stream_observers.contains_key(key)
    }

    /// Live string keys, for the snapshot codec.
    pub fn string_entries(&mut self) -> Vec<StringEntry> {
        self.purge_expired();

        let mut entries: Vec<StringEntry> = self
            .data
            .iter()
            .filter_map(|(key, value)| match value {
                DataType::String(value) => Some(StringEntry {
                    key: key.clone(),
                    value: value.clone(),
                    expires_at: self.expiry.get(key).copied(),
                }),
                DataType::List(_) => None,
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    /// Serializes the string keyspace into a snapshot image.
    pub fn snapshot(&mut self) -> Vec<u8> {
        RdbWriter::new(self.string_entries()).encode()
    }

    /// Loads a snapshot image on top of the current data. Records whose
    /// deadline already passed are skipped. Returns `false` if the image is
    /// unusable, in which case nothing is changed.
    pub fn restore(&mut self, bytes: &[u8]) -> bool {
        let entries = match RdbParser::new(bytes).parse() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("discarding snapshot: {}", e);
                return false;
            }
        };

        let now = Timestamp::now();
        for entry in entries {
            if entry.expires_at.is_some_and(|deadline| deadline <= now) {
                continue;
            }
            self.set_with_deadline(&entry.key, &entry.value, entry.expires_at);
        }

        true
    }
}
