// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed poll and vote operations over the configured backend.
//!
//! Provides high-level operations for:
//! - Polls (insert, select by id)
//! - Votes (insert, option indices per poll, per-voter lookup)
//! - Realtime notification of accepted vote inserts (memory backend)

use crate::db::memory::MemoryTables;
use crate::db::supabase::SupabaseClient;
use crate::db::tables;
use crate::error::AppError;
use crate::models::{NewPoll, NewVote, Poll};
use crate::services::realtime::{VoteFeed, VoteInserted};
use crate::time_utils::SharedClock;
use serde::de::IgnoredAny;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Clone)]
enum Backend {
    Remote(SupabaseClient),
    Memory(Arc<MemoryTables>),
    Offline,
}

/// Poll and vote store client.
#[derive(Clone)]
pub struct PollStore {
    backend: Backend,
    feed: VoteFeed,
}

#[derive(Deserialize)]
struct OptionIndexRow {
    option_index: u32,
}

impl PollStore {
    /// Connect to the hosted store.
    pub fn remote(project_url: &str, anon_key: String, feed: VoteFeed) -> Self {
        tracing::info!(url = project_url, "Using hosted poll store");
        Self {
            backend: Backend::Remote(SupabaseClient::new(project_url, anon_key)),
            feed,
        }
    }

    /// Keep polls in process memory.
    pub fn in_memory(clock: SharedClock, feed: VoteFeed) -> Self {
        tracing::info!("Using in-memory poll store");
        Self {
            backend: Backend::Memory(Arc::new(MemoryTables::new(clock))),
            feed,
        }
    }

    /// Create a store for testing failure paths (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self {
            backend: Backend::Offline,
            feed: VoteFeed::new(),
        }
    }

    /// Realtime notifications for vote inserts.
    pub fn feed(&self) -> &VoteFeed {
        &self.feed
    }

    fn offline() -> AppError {
        AppError::Database("Database not connected (offline mode)".to_string())
    }

    // ─── Poll Operations ─────────────────────────────────────────

    /// Insert a new poll. A taken id surfaces as `AppError::Conflict`.
    pub async fn insert_poll(&self, poll: &NewPoll) -> Result<Poll, AppError> {
        match &self.backend {
            Backend::Remote(client) => client.insert(tables::POLLS, poll).await,
            Backend::Memory(tables) => tables.insert_poll(poll),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Get a poll by id.
    pub async fn get_poll(&self, poll_id: &str) -> Result<Option<Poll>, AppError> {
        match &self.backend {
            Backend::Remote(client) => {
                let mut rows: Vec<Poll> = client
                    .select_eq(tables::POLLS, "*", &[("id", poll_id)], Some(1))
                    .await?;
                Ok(rows.pop())
            }
            Backend::Memory(tables) => Ok(tables.get_poll(poll_id)),
            Backend::Offline => Err(Self::offline()),
        }
    }

    // ─── Vote Operations ─────────────────────────────────────────

    /// Record a vote and notify realtime subscribers (directly, unless the
    /// feed has an upstream source).
    ///
    /// The store's unique (poll_id, voter_id) constraint is the source of
    /// truth for double votes; a violation maps to `AppError::AlreadyVoted`.
    pub async fn insert_vote(&self, vote: &NewVote) -> Result<(), AppError> {
        let result = match &self.backend {
            Backend::Remote(client) => client
                .insert::<_, IgnoredAny>(tables::VOTES, vote)
                .await
                .map(|_| ()),
            Backend::Memory(tables) => tables.insert_vote(vote).map(|_| ()),
            Backend::Offline => Err(Self::offline()),
        };

        match result {
            Ok(()) => {
                // With an upstream source the insert comes back through it.
                let notified = if self.feed.has_source() {
                    0
                } else {
                    self.feed.publish(
                        &vote.poll_id,
                        VoteInserted {
                            option_index: vote.option_index,
                        },
                    )
                };
                tracing::debug!(
                    poll_id = %vote.poll_id,
                    option_index = vote.option_index,
                    notified,
                    "Vote recorded"
                );
                Ok(())
            }
            Err(AppError::Conflict(_)) => Err(AppError::AlreadyVoted),
            Err(e) => Err(e),
        }
    }

    /// Option index of every vote cast on a poll.
    pub async fn vote_option_indices(&self, poll_id: &str) -> Result<Vec<u32>, AppError> {
        match &self.backend {
            Backend::Remote(client) => {
                let rows: Vec<OptionIndexRow> = client
                    .select_eq(tables::VOTES, "option_index", &[("poll_id", poll_id)], None)
                    .await?;
                Ok(rows.into_iter().map(|row| row.option_index).collect())
            }
            Backend::Memory(tables) => Ok(tables.vote_option_indices(poll_id)),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Whether `voter_id` already has a vote row for the poll.
    pub async fn has_voted(&self, poll_id: &str, voter_id: &str) -> Result<bool, AppError> {
        match &self.backend {
            Backend::Remote(client) => {
                let rows: Vec<IgnoredAny> = client
                    .select_eq(
                        tables::VOTES,
                        "id",
                        &[("poll_id", poll_id), ("voter_id", voter_id)],
                        Some(1),
                    )
                    .await?;
                Ok(!rows.is_empty())
            }
            Backend::Memory(tables) => Ok(tables.has_vote(poll_id, voter_id)),
            Backend::Offline => Err(Self::offline()),
        }
    }
}
