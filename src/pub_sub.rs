use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::{connection::ClientSender, resp::RespValue};

/// Channel subscriptions, indexed from both sides.
///
/// `by_connection` and `by_channel` always describe the same set of
/// (connection, channel) pairs; empty entries are removed on either side.
#[derive(Debug, Default)]
pub struct SubscriptionIndex {
    by_connection: HashMap<String, BTreeSet<String>>,
    by_channel: HashMap<String, HashMap<String, ClientSender>>,
}

impl SubscriptionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of channels the connection is subscribed to afterwards.
    pub fn subscribe(&mut self, client_address: &str, sender: &ClientSender, channel: &str) -> usize {
        self.by_channel
            .entry(channel.to_string())
            .or_default()
            .insert(client_address.to_string(), sender.clone());

        let channels = self
            .by_connection
            .entry(client_address.to_string())
            .or_default();
        channels.insert(channel.to_string());
        channels.len()
    }

    /// Returns the number of channels the connection is still subscribed to.
    pub fn unsubscribe(&mut self, client_address: &str, channel: &str) -> usize {
        if let Some(subscribers) = self.by_channel.get_mut(channel) {
            subscribers.remove(client_address);
            if subscribers.is_empty() {
                self.by_channel.remove(channel);
            }
        }

        let Some(channels) = self.by_connection.get_mut(client_address) else {
            return 0;
        };

        channels.remove(channel);
        let remaining = channels.len();
        if remaining == 0 {
            self.by_connection.remove(client_address);
        }

        remaining
    }

    pub fn channels_of(&self, client_address: &str) -> Vec<String> {
        self.by_connection
            .get(client_address)
            .map(|channels| channels.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn subscription_count(&self, client_address: &str) -> usize {
        self.by_connection
            .get(client_address)
            .map_or(0, BTreeSet::len)
    }

    pub fn is_subscribed(&self, client_address: &str) -> bool {
        self.subscription_count(client_address) > 0
    }

    /// Queues `["message", channel, message]` on every subscriber's connection
    /// and returns how many subscribers it was delivered to.
    pub fn publish(&self, channel: &str, message: &str) -> usize {
        let Some(subscribers) = self.by_channel.get(channel) else {
            return 0;
        };

        let payload =
            RespValue::array_of_bulk_strings(["message", channel, message]).to_bytes();

        subscribers
            .iter()
            .filter(|(client_address, sender)| {
                let delivered = sender.send(payload.clone()).is_ok();
                if !delivered {
                    debug!("subscriber {} is gone, skipping", client_address);
                }
                delivered
            })
            .count()
    }

    pub fn cleanup(&mut self, client_address: &str) {
        let Some(channels) = self.by_connection.remove(client_address) else {
            return;
        };

        for channel in channels {
            if let Some(subscribers) = self.by_channel.get_mut(&channel) {
                subscribers.remove(client_address);
                if subscribers.is_empty() {
                    self.by_channel.remove(&channel);
                }
            }
        }
    }
}
