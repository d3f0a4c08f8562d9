//! Vote counts per option, recomputed from the `votes` rows of one poll.

use std::collections::BTreeMap;

/// Per-option vote counts for a single poll.
///
/// Built from scratch on every refresh; indices with no votes are absent
/// and count as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteTally {
    counts: BTreeMap<u32, u64>,
    total: u64,
}

impl VoteTally {
    /// Count a batch of option indices (one per vote row).
    pub fn from_indices<I>(indices: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        let mut tally = Self::default();
        for index in indices {
            tally.record(index);
        }
        tally
    }

    /// Add a single vote.
    pub fn record(&mut self, option_index: u32) {
        *self.counts.entry(option_index).or_insert(0) += 1;
        self.total += 1;
    }

    /// Votes cast for `option_index`.
    pub fn count(&self, option_index: u32) -> u64 {
        self.counts.get(&option_index).copied().unwrap_or(0)
    }

    /// Total votes recorded for the poll.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Share of the total for `option_index`, in percent (0 when no votes).
    pub fn percentage(&self, option_index: u32) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count(option_index) as f64 / self.total as f64 * 100.0
    }

    /// Percentage rounded to the nearest integer, as displayed.
    pub fn rounded_percentage(&self, option_index: u32) -> u32 {
        self.percentage(option_index).round() as u32
    }
}
