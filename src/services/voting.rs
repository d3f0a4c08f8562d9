// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Poll detail and voting flow.
//!
//! A [`VotingSession`] is one voter's view of one poll. It starts out
//! `NotVoted` or `Voted` depending on what the store already holds, accepts a
//! local option selection, submits the vote and recounts results on demand.
//! Expiry is never cached: it is recomputed from the clock on every read.

use crate::db::PollStore;
use crate::error::AppError;
use crate::models::{NewVote, Poll, VoteTally};
use crate::services::identity::VoterId;
use crate::services::realtime::VoteSubscription;
use crate::time_utils::{format_time_ago, format_utc_rfc3339, SharedClock};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Status line shown after voting.
pub const VOTED_MESSAGE: &str = "Thanks for voting! Results update in real-time.";
/// Status line shown once a poll has expired.
pub const EXPIRED_MESSAGE: &str = "This poll has expired.";

/// Voting state of a loaded view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum VoteState {
    NotVoted,
    Voted,
}

/// Result of a vote submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum VoteOutcome {
    /// The vote was stored.
    Recorded,
    /// The store already held a vote from this voter.
    AlreadyVoted,
    /// The store rejected the write; state is unchanged.
    Failed,
}

/// One option as rendered on the detail page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OptionView {
    pub index: u32,
    pub label: String,
    pub selected: bool,
    /// Only revealed once the voter has voted or the poll has expired.
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub count: Option<u64>,
    /// Rounded share of the total; revealed together with `count`.
    pub percentage: Option<u32>,
}

/// Poll detail page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PollView {
    pub id: String,
    pub question: String,
    pub options: Vec<OptionView>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_votes: u64,
    pub state: VoteState,
    pub is_expired: bool,
    pub can_vote: bool,
    pub expires_at: Option<String>,
    pub created_ago: String,
    pub share_url: String,
    /// Status lines in display order; a voter on an expired poll sees both.
    pub status_messages: Vec<String>,
}

/// One voter's view of one poll.
pub struct VotingSession {
    store: PollStore,
    clock: SharedClock,
    voter: VoterId,
    poll: Poll,
    tally: VoteTally,
    selected: Option<u32>,
    state: VoteState,
}

impl VotingSession {
    /// Load a poll, count its votes and look up this voter's vote.
    ///
    /// Returns `Ok(None)` when the poll does not exist.
    pub async fn load(
        store: PollStore,
        clock: SharedClock,
        poll_id: &str,
        voter: VoterId,
    ) -> Result<Option<Self>, AppError> {
        let Some(poll) = store.get_poll(poll_id).await? else {
            tracing::debug!(poll_id, "Poll not found");
            return Ok(None);
        };

        Ok(Some(Self::from_poll(store, clock, poll, voter).await))
    }

    /// Count votes and look up this voter for an already fetched poll.
    ///
    /// Failed lookups are logged and leave the counts empty and the state
    /// `NotVoted`, so the poll still renders; a later refresh can recover.
    async fn from_poll(store: PollStore, clock: SharedClock, poll: Poll, voter: VoterId) -> Self {
        let mut session = Self {
            store,
            clock,
            voter,
            poll,
            tally: VoteTally::default(),
            selected: None,
            state: VoteState::NotVoted,
        };
        if let Err(e) = session.refresh().await {
            tracing::warn!(poll_id = %session.poll.id, error = %e, "Vote count unavailable");
        }
        if let Err(e) = session.refresh_voter_state().await {
            tracing::warn!(poll_id = %session.poll.id, error = %e, "Voter lookup unavailable");
        }
        session
    }

    pub fn poll(&self) -> &Poll {
        &self.poll
    }

    pub fn tally(&self) -> &VoteTally {
        &self.tally
    }

    pub fn state(&self) -> VoteState {
        self.state
    }

    pub fn selected(&self) -> Option<u32> {
        self.selected
    }

    /// Derived from the clock on every call.
    pub fn is_expired(&self) -> bool {
        self.poll.is_expired(self.clock.utc())
    }

    /// Counts are shown once the voter has voted or voting has closed.
    pub fn results_visible(&self) -> bool {
        self.state == VoteState::Voted || self.is_expired()
    }

    /// Mark `option_index` as the local selection, replacing any previous one.
    ///
    /// Ignored (returns `false`) after voting, after expiry, or for an index
    /// outside the poll's options.
    pub fn select(&mut self, option_index: u32) -> bool {
        if self.state == VoteState::Voted || self.is_expired() || !self.poll.has_option(option_index)
        {
            return false;
        }
        self.selected = Some(option_index);
        true
    }

    /// Whether the vote action is enabled.
    pub fn can_vote(&self) -> bool {
        self.selected.is_some()
            && self.state == VoteState::NotVoted
            && !self.is_expired()
            && !self.voter.is_degraded()
    }

    /// Submit the selected option.
    ///
    /// A store failure is logged and reported as `VoteOutcome::Failed`
    /// without changing state. A uniqueness conflict means another request
    /// from this voter got there first, so the session moves to `Voted`.
    pub async fn vote(&mut self) -> Result<VoteOutcome, AppError> {
        if self.is_expired() {
            return Err(AppError::PollExpired);
        }
        if self.state == VoteState::Voted {
            return Ok(VoteOutcome::AlreadyVoted);
        }
        if self.voter.is_degraded() {
            return Err(AppError::BadRequest(
                "Voter identity unavailable; enable cookies to vote".to_string(),
            ));
        }
        let Some(option_index) = self.selected else {
            return Err(AppError::BadRequest("No option selected".to_string()));
        };

        let vote = NewVote {
            poll_id: self.poll.id.clone(),
            option_index,
            voter_id: self.voter.as_str().to_string(),
        };

        let outcome = match self.store.insert_vote(&vote).await {
            Ok(()) => VoteOutcome::Recorded,
            Err(AppError::AlreadyVoted) => VoteOutcome::AlreadyVoted,
            Err(e) => {
                tracing::warn!(poll_id = %self.poll.id, error = %e, "Vote submission failed");
                return Ok(VoteOutcome::Failed);
            }
        };

        self.state = VoteState::Voted;
        self.selected = None;
        if let Err(e) = self.refresh().await {
            tracing::warn!(poll_id = %self.poll.id, error = %e, "Recount after vote failed");
        }
        Ok(outcome)
    }

    /// Select and vote in one step, as the HTTP API does.
    pub async fn submit(&mut self, option_index: u32) -> Result<VoteOutcome, AppError> {
        if self.is_expired() {
            return Err(AppError::PollExpired);
        }
        if self.state == VoteState::Voted {
            return Ok(VoteOutcome::AlreadyVoted);
        }
        if !self.select(option_index) {
            return Err(AppError::BadRequest(format!(
                "Option {} does not exist on this poll",
                option_index
            )));
        }
        self.vote().await
    }

    /// Re-fetch every vote row and recount from scratch.
    pub async fn refresh(&mut self) -> Result<(), AppError> {
        let indices = self.store.vote_option_indices(&self.poll.id).await?;
        self.tally = VoteTally::from_indices(indices);
        Ok(())
    }

    /// Pick up a vote this voter cast elsewhere (another tab or request).
    pub async fn refresh_voter_state(&mut self) -> Result<(), AppError> {
        if self.state == VoteState::Voted || self.voter.is_degraded() {
            return Ok(());
        }
        if self
            .store
            .has_voted(&self.poll.id, self.voter.as_str())
            .await?
        {
            self.state = VoteState::Voted;
            self.selected = None;
        }
        Ok(())
    }

    /// Open the realtime channel for this poll's vote inserts.
    pub fn subscribe(&self) -> VoteSubscription {
        self.store.feed().subscribe(&self.poll.id)
    }

    /// Render the detail page.
    pub fn view(&self, public_url: &str) -> PollView {
        let now = self.clock.utc();
        let is_expired = self.poll.is_expired(now);
        let reveal = self.state == VoteState::Voted || is_expired;

        let options = self
            .poll
            .options
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let index = i as u32;
                OptionView {
                    index,
                    label: label.clone(),
                    selected: self.selected == Some(index),
                    count: reveal.then(|| self.tally.count(index)),
                    percentage: reveal.then(|| self.tally.rounded_percentage(index)),
                }
            })
            .collect();

        let mut status_messages = Vec::new();
        if self.state == VoteState::Voted {
            status_messages.push(VOTED_MESSAGE.to_string());
        }
        if is_expired {
            status_messages.push(EXPIRED_MESSAGE.to_string());
        }

        PollView {
            id: self.poll.id.clone(),
            question: self.poll.question.clone(),
            options,
            total_votes: self.tally.total(),
            state: self.state,
            is_expired,
            can_vote: self.can_vote(),
            expires_at: self.poll.expires_at.map(format_utc_rfc3339),
            created_ago: format_time_ago(self.poll.created_at, now),
            share_url: share_url(public_url, &self.poll.id),
            status_messages,
        }
    }
}

/// Absolute link to a poll's detail page.
pub fn share_url(public_url: &str, poll_id: &str) -> String {
    format!(
        "{}/polls/{}",
        public_url.trim_end_matches('/'),
        urlencoding::encode(poll_id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPoll;
    use crate::services::realtime::VoteFeed;
    use crate::test_support::ManualClock;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::Arc;

    const PUBLIC_URL: &str = "http://localhost:8080";

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
    }

    async fn setup(expires_at: Option<DateTime<Utc>>) -> (PollStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let store = PollStore::in_memory(clock.clone(), VoteFeed::new());
        store
            .insert_poll(&NewPoll {
                id: "coffee".to_string(),
                question: "Coffee or tea?".to_string(),
                options: vec!["Coffee".to_string(), "Tea".to_string()],
                expires_at,
                is_active: true,
            })
            .await
            .unwrap();
        (store, clock)
    }

    async fn session(store: &PollStore, clock: &Arc<ManualClock>, voter: &VoterId) -> VotingSession {
        VotingSession::load(store.clone(), clock.clone(), "coffee", voter.clone())
            .await
            .unwrap()
            .expect("poll should exist")
    }

    #[tokio::test]
    async fn test_missing_poll_loads_as_none() {
        let (store, clock) = setup(None).await;
        let loaded = VotingSession::load(store, clock, "nope", VoterId::generate())
            .await
            .unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_fresh_view_hides_results() {
        let (store, clock) = setup(None).await;
        let session = session(&store, &clock, &VoterId::generate()).await;

        let view = session.view(PUBLIC_URL);
        assert_eq!(view.state, VoteState::NotVoted);
        assert_eq!(view.total_votes, 0);
        assert!(view.options.iter().all(|o| o.count.is_none() && o.percentage.is_none()));
        assert!(!view.can_vote);
        assert_eq!(view.share_url, "http://localhost:8080/polls/coffee");
        assert!(view.status_messages.is_empty());
    }

    #[tokio::test]
    async fn test_select_replaces_previous_selection() {
        let (store, clock) = setup(None).await;
        let mut session = session(&store, &clock, &VoterId::generate()).await;

        assert!(session.select(0));
        assert!(session.select(1));
        assert_eq!(session.selected(), Some(1));
        assert!(!session.select(2));
        assert_eq!(session.selected(), Some(1));
        assert!(session.can_vote());
    }

    #[tokio::test]
    async fn test_vote_without_selection_is_rejected() {
        let (store, clock) = setup(None).await;
        let mut session = session(&store, &clock, &VoterId::generate()).await;

        assert!(matches!(session.vote().await, Err(AppError::BadRequest(_))));
        assert_eq!(session.state(), VoteState::NotVoted);
    }

    #[tokio::test]
    async fn test_vote_then_reload_stays_voted() {
        let (store, clock) = setup(None).await;
        let voter = VoterId::generate();
        let mut first = session(&store, &clock, &voter).await;

        first.select(0);
        assert_eq!(first.vote().await.unwrap(), VoteOutcome::Recorded);

        let view = first.view(PUBLIC_URL);
        assert_eq!(view.state, VoteState::Voted);
        assert_eq!(view.total_votes, 1);
        assert_eq!(view.options[0].count, Some(1));
        assert_eq!(view.options[0].percentage, Some(100));
        assert_eq!(view.options[1].count, Some(0));
        assert_eq!(view.options[1].percentage, Some(0));
        assert_eq!(view.status_messages, vec![VOTED_MESSAGE]);

        let reloaded = session(&store, &clock, &voter).await;
        assert_eq!(reloaded.state(), VoteState::Voted);
        assert!(reloaded.results_visible());
    }

    #[tokio::test]
    async fn test_concurrent_sessions_same_voter_single_row() {
        let (store, clock) = setup(None).await;
        let voter = VoterId::generate();
        let mut tab_a = session(&store, &clock, &voter).await;
        let mut tab_b = session(&store, &clock, &voter).await;

        assert_eq!(tab_a.submit(0).await.unwrap(), VoteOutcome::Recorded);
        assert_eq!(tab_b.submit(1).await.unwrap(), VoteOutcome::AlreadyVoted);

        assert_eq!(tab_b.state(), VoteState::Voted);
        assert_eq!(tab_b.tally().total(), 1);
        assert_eq!(tab_b.tally().count(0), 1);
    }

    fn coffee_poll(expires_at: Option<DateTime<Utc>>) -> Poll {
        Poll {
            id: "coffee".to_string(),
            question: "Coffee or tea?".to_string(),
            options: vec!["Coffee".to_string(), "Tea".to_string()],
            created_at: start(),
            expires_at,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_store_failure_keeps_not_voted() {
        let clock: SharedClock = Arc::new(ManualClock::new(start()));
        let mut session = VotingSession::from_poll(
            PollStore::new_mock(),
            clock,
            coffee_poll(None),
            VoterId::generate(),
        )
        .await;

        assert_eq!(session.submit(1).await.unwrap(), VoteOutcome::Failed);
        assert_eq!(session.state(), VoteState::NotVoted);
        assert_eq!(session.selected(), Some(1));
    }

    #[tokio::test]
    async fn test_failed_lookups_still_render_poll() {
        let clock: SharedClock = Arc::new(ManualClock::new(start()));
        let session = VotingSession::from_poll(
            PollStore::new_mock(),
            clock,
            coffee_poll(None),
            VoterId::generate(),
        )
        .await;

        let view = session.view(PUBLIC_URL);
        assert_eq!(view.question, "Coffee or tea?");
        assert_eq!(view.total_votes, 0);
        assert_eq!(view.state, VoteState::NotVoted);
        assert_eq!(view.options.len(), 2);
    }

    #[tokio::test]
    async fn test_expiry_blocks_voting_and_reveals_results() {
        let (store, clock) = setup(Some(start() + Duration::hours(1))).await;
        let mut session = session(&store, &clock, &VoterId::generate()).await;

        assert!(!session.is_expired());
        assert!(session.select(0));

        clock.advance(Duration::hours(1) + Duration::seconds(1));

        assert!(session.is_expired());
        assert!(!session.can_vote());
        assert!(!session.select(1));
        assert!(matches!(session.vote().await, Err(AppError::PollExpired)));

        let view = session.view(PUBLIC_URL);
        assert!(view.is_expired);
        assert_eq!(view.state, VoteState::NotVoted);
        assert_eq!(view.options[0].count, Some(0));
        assert_eq!(view.status_messages, vec![EXPIRED_MESSAGE]);
        assert_eq!(view.expires_at.as_deref(), Some("2026-06-01T10:00:00Z"));
    }

    #[tokio::test]
    async fn test_voted_then_expired_shows_both_lines_and_rejects() {
        let (store, clock) = setup(Some(start() + Duration::hours(1))).await;
        let voter = VoterId::generate();
        let mut session = session(&store, &clock, &voter).await;
        assert_eq!(session.submit(0).await.unwrap(), VoteOutcome::Recorded);

        clock.advance(Duration::hours(2));

        let view = session.view(PUBLIC_URL);
        assert_eq!(view.state, VoteState::Voted);
        assert!(view.is_expired);
        assert_eq!(view.status_messages, vec![VOTED_MESSAGE, EXPIRED_MESSAGE]);
        assert!(matches!(session.submit(1).await, Err(AppError::PollExpired)));
        assert_eq!(store.vote_option_indices("coffee").await.unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn test_degraded_voter_cannot_vote() {
        let (store, clock) = setup(None).await;
        let mut session = session(&store, &clock, &VoterId::degraded()).await;

        assert!(session.select(0));
        assert!(!session.can_vote());
        assert!(matches!(session.vote().await, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_refresh_recounts_from_store() {
        let (store, clock) = setup(None).await;
        let mut watcher = session(&store, &clock, &VoterId::generate()).await;

        for (voter, option) in [(VoterId::generate(), 1), (VoterId::generate(), 1)] {
            let mut other = session(&store, &clock, &voter).await;
            other.submit(option).await.unwrap();
        }

        assert_eq!(watcher.tally().total(), 0);
        watcher.refresh().await.unwrap();
        assert_eq!(watcher.tally().total(), 2);
        assert_eq!(watcher.tally().count(1), 2);
    }

    #[test]
    fn test_share_url_encodes_id() {
        assert_eq!(
            share_url("https://poll.example.com/", "a b"),
            "https://poll.example.com/polls/a%20b"
        );
    }
}
