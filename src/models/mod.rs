// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod poll;
pub mod tally;
pub mod vote;

pub use poll::{NewPoll, Poll};
pub use tally::VoteTally;
pub use vote::{NewVote, Vote};
