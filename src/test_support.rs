// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Test doubles shared by unit and integration tests.

use crate::services::realtime::{VoteInserted, VoteSource};
use chrono::{DateTime, Duration, Local, Utc};
use dashmap::DashMap;
use mockable::Clock;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tokio::task::AbortHandle;

/// Clock that only moves when told to.
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move the clock forward.
    pub fn advance(&self, delta: Duration) {
        *self.lock_clock() += delta;
    }

    fn lock_clock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Vote source driven by the test, standing in for the store's realtime feed.
#[derive(Default)]
pub struct ManualVoteSource {
    senders: DashMap<String, broadcast::Sender<VoteInserted>>,
}

impl ManualVoteSource {
    /// Deliver an insert for `poll_id`; returns how many subscribers saw it.
    pub fn emit(&self, poll_id: &str, event: VoteInserted) -> usize {
        self.senders
            .get(poll_id)
            .map(|sender| sender.send(event).unwrap_or(0))
            .unwrap_or(0)
    }

    /// Whether a watch was ever started for `poll_id`.
    pub fn is_watching(&self, poll_id: &str) -> bool {
        self.senders.contains_key(poll_id)
    }
}

impl VoteSource for ManualVoteSource {
    fn watch(&self, poll_id: &str, sender: broadcast::Sender<VoteInserted>) -> AbortHandle {
        self.senders.insert(poll_id.to_string(), sender);
        tokio::spawn(std::future::pending::<()>()).abort_handle()
    }
}
