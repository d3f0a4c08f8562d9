// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Realtime vote notifications, one broadcast channel per poll.
//!
//! Each open results view holds a [`VoteSubscription`]; a poll's channel is
//! dropped together with its last subscriber. Events come either from an
//! upstream [`VoteSource`] watching the store for inserts, or, without one,
//! from the store wrapper publishing accepted inserts directly.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::AbortHandle;

/// Buffered notifications per poll before slow subscribers start lagging.
const CHANNEL_CAPACITY: usize = 64;

/// Notification that a vote row was inserted for a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteInserted {
    pub option_index: u32,
}

/// Upstream feed of vote inserts for individual polls.
pub trait VoteSource: Send + Sync {
    /// Start forwarding inserts on `poll_id` into `sender`.
    ///
    /// The returned task is aborted once the poll has no subscribers left.
    fn watch(&self, poll_id: &str, sender: broadcast::Sender<VoteInserted>) -> AbortHandle;
}

struct Channel {
    sender: broadcast::Sender<VoteInserted>,
    upstream: Option<AbortHandle>,
}

impl Drop for Channel {
    fn drop(&mut self) {
        if let Some(upstream) = self.upstream.take() {
            upstream.abort();
        }
    }
}

/// Shared hub of per-poll channels.
#[derive(Clone, Default)]
pub struct VoteFeed {
    channels: Arc<DashMap<String, Channel>>,
    source: Option<Arc<dyn VoteSource>>,
}

impl VoteFeed {
    /// Hub fed only by [`VoteFeed::publish`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Hub that watches `source` for every poll with open subscriptions.
    pub fn with_source(source: Arc<dyn VoteSource>) -> Self {
        Self {
            channels: Arc::default(),
            source: Some(source),
        }
    }

    /// Whether inserts arrive from an upstream source rather than `publish`.
    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Open a channel for inserts on `poll_id`.
    pub fn subscribe(&self, poll_id: &str) -> VoteSubscription {
        let receiver = self
            .channels
            .entry(poll_id.to_string())
            .or_insert_with(|| {
                let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
                let upstream = self
                    .source
                    .as_ref()
                    .map(|source| source.watch(poll_id, sender.clone()));
                Channel { sender, upstream }
            })
            .sender
            .subscribe();

        tracing::debug!(poll_id, "Realtime subscription opened");

        VoteSubscription {
            poll_id: poll_id.to_string(),
            receiver: Some(receiver),
            feed: self.clone(),
        }
    }

    /// Notify subscribers of `poll_id`; returns how many were reached.
    pub fn publish(&self, poll_id: &str, event: VoteInserted) -> usize {
        let delivered = match self.channels.get(poll_id) {
            Some(channel) => channel.sender.send(event).unwrap_or(0),
            None => return 0,
        };

        if delivered == 0 {
            self.prune(poll_id);
        }
        delivered
    }

    /// Number of polls with at least one open channel.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Drop the poll's channel if nobody is listening.
    ///
    /// The check runs under the map's shard lock, so it cannot race a
    /// concurrent `subscribe` for the same poll.
    fn prune(&self, poll_id: &str) {
        self.channels
            .remove_if(poll_id, |_, channel| channel.sender.receiver_count() == 0);
    }
}

/// Receiving end of a poll's channel; closing it ends the subscription.
pub struct VoteSubscription {
    poll_id: String,
    receiver: Option<broadcast::Receiver<VoteInserted>>,
    feed: VoteFeed,
}

impl VoteSubscription {
    pub fn poll_id(&self) -> &str {
        &self.poll_id
    }

    /// Wait for the next insert.
    ///
    /// A lagged receiver still reports a notification since subscribers
    /// recount from the store anyway. Returns `None` once the channel closes.
    pub async fn next(&mut self) -> Option<Option<VoteInserted>> {
        let receiver = self.receiver.as_mut()?;
        match receiver.recv().await {
            Ok(event) => Some(Some(event)),
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(poll_id = %self.poll_id, skipped, "Realtime subscriber lagged");
                Some(None)
            }
            Err(RecvError::Closed) => None,
        }
    }
}

impl Drop for VoteSubscription {
    fn drop(&mut self) {
        // Release our receiver first so the count below excludes it.
        drop(self.receiver.take());
        self.feed.prune(&self.poll_id);
        tracing::debug!(poll_id = %self.poll_id, "Realtime subscription closed");
    }
}
