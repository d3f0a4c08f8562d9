// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Poll model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Longest accepted question, in characters.
pub const MAX_QUESTION_CHARS: u64 = 200;
/// Longest accepted option label, in characters.
pub const MAX_OPTION_CHARS: usize = 100;
/// Fewest non-empty options a poll may have.
pub const MIN_OPTIONS: usize = 2;
/// Most option entries a creation request may carry.
pub const MAX_OPTIONS: u64 = 6;
/// Expiry durations offered to poll creators, in hours.
pub const EXPIRY_CHOICES_HOURS: [u32; 3] = [1, 24, 168];

/// Poll row in the `polls` table.
///
/// Question and options never change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Poll {
    /// Short base-36 identifier (primary key)
    pub id: String,
    /// Question text
    pub question: String,
    /// Ordered option labels
    pub options: Vec<String>,
    /// Assigned by the store on insert
    pub created_at: DateTime<Utc>,
    /// Fixed at creation; `None` means the poll never expires
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl Poll {
    /// A poll is expired once `now` is past its expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }

    /// Whether `index` names one of this poll's options.
    pub fn has_option(&self, index: u32) -> bool {
        (index as usize) < self.options.len()
    }
}

/// Insert payload for the `polls` table (`created_at` is server-assigned).
#[derive(Debug, Clone, Serialize)]
pub struct NewPoll {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}
