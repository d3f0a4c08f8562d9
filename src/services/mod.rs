// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod identity;
pub mod polls;
pub mod realtime;
pub mod voting;

pub use identity::VoterId;
pub use polls::{CreatePollRequest, PollService};
pub use realtime::{VoteFeed, VoteSubscription};
pub use voting::{PollView, VoteOutcome, VoteState, VotingSession};
