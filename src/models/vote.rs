//! Vote model for storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Vote row in the `votes` table.
///
/// The store holds at most one row per (`poll_id`, `voter_id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Assigned by the store on insert
    pub id: String,
    /// References `polls.id`
    pub poll_id: String,
    /// Index into the poll's options
    pub option_index: u32,
    /// Per-browser voter identifier
    pub voter_id: String,
    /// Assigned by the store on insert
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the `votes` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewVote {
    pub poll_id: String,
    pub option_index: u32,
    pub voter_id: String,
}
