// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory tables with the same contract as the hosted store.
//!
//! Used for local development and tests. Enforces the constraints the hosted
//! schema declares: `polls.id` primary key, `votes.poll_id` foreign key and
//! the unique (`poll_id`, `voter_id`) pair.

use crate::error::AppError;
use crate::models::{NewPoll, NewVote, Poll, Vote};
use crate::time_utils::SharedClock;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Process-local `polls` and `votes` tables.
pub struct MemoryTables {
    polls: DashMap<String, Poll>,
    /// Vote rows grouped by poll id.
    votes: DashMap<String, Vec<Vote>>,
    clock: SharedClock,
}

impl MemoryTables {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            polls: DashMap::new(),
            votes: DashMap::new(),
            clock,
        }
    }

    pub fn insert_poll(&self, row: &NewPoll) -> Result<Poll, AppError> {
        match self.polls.entry(row.id.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "polls: duplicate key {}",
                row.id
            ))),
            Entry::Vacant(slot) => {
                let poll = Poll {
                    id: row.id.clone(),
                    question: row.question.clone(),
                    options: row.options.clone(),
                    created_at: self.clock.utc(),
                    expires_at: row.expires_at,
                    is_active: row.is_active,
                };
                slot.insert(poll.clone());
                Ok(poll)
            }
        }
    }

    pub fn get_poll(&self, id: &str) -> Option<Poll> {
        self.polls.get(id).map(|poll| poll.clone())
    }

    pub fn insert_vote(&self, row: &NewVote) -> Result<Vote, AppError> {
        if !self.polls.contains_key(&row.poll_id) {
            return Err(AppError::Database(format!(
                "votes: poll {} does not exist",
                row.poll_id
            )));
        }

        let mut rows = self.votes.entry(row.poll_id.clone()).or_default();
        if rows.iter().any(|vote| vote.voter_id == row.voter_id) {
            return Err(AppError::Conflict(format!(
                "votes: duplicate key ({}, {})",
                row.poll_id, row.voter_id
            )));
        }

        let vote = Vote {
            id: uuid::Uuid::new_v4().to_string(),
            poll_id: row.poll_id.clone(),
            option_index: row.option_index,
            voter_id: row.voter_id.clone(),
            created_at: self.clock.utc(),
        };
        rows.push(vote.clone());
        Ok(vote)
    }

    pub fn vote_option_indices(&self, poll_id: &str) -> Vec<u32> {
        self.votes
            .get(poll_id)
            .map(|rows| rows.iter().map(|vote| vote.option_index).collect())
            .unwrap_or_default()
    }

    pub fn has_vote(&self, poll_id: &str, voter_id: &str) -> bool {
        self.votes
            .get(poll_id)
            .is_some_and(|rows| rows.iter().any(|vote| vote.voter_id == voter_id))
    }
}
