// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Hosted store integration tests.
//!
//! Run against a real project with the `polls` and `votes` tables:
//! ```sh
//! SUPABASE_URL=https://xyz.supabase.co SUPABASE_ANON_KEY=... cargo test --test supabase_integration
//! ```
//! Without those variables every test is skipped.

use mockable::DefaultClock;
use quickpoll::db::{PollStore, RealtimeClient};
use quickpoll::error::AppError;
use quickpoll::models::NewVote;
use quickpoll::services::identity::VoterId;
use quickpoll::services::polls::{CreatePollRequest, PollService};
use quickpoll::services::voting::{VoteOutcome, VotingSession};
use quickpoll::services::realtime::VoteInserted;
use quickpoll::services::VoteFeed;
use quickpoll::time_utils::SharedClock;
use std::sync::Arc;

mod common;

fn remote_store() -> PollStore {
    let url = std::env::var("SUPABASE_URL").unwrap();
    let key = std::env::var("SUPABASE_ANON_KEY").unwrap();
    PollStore::remote(&url, key, VoteFeed::new())
}

fn clock() -> SharedClock {
    Arc::new(DefaultClock)
}

#[tokio::test]
async fn test_poll_round_trip() {
    require_store!();

    let store = remote_store();
    let service = PollService::new(store.clone(), clock());

    let poll = service
        .create_poll(&CreatePollRequest {
            question: "Integration: coffee or tea?".to_string(),
            options: vec!["Coffee".to_string(), "Tea".to_string()],
            expires_in_hours: Some(1),
        })
        .await
        .unwrap();

    let fetched = store.get_poll(&poll.id).await.unwrap().unwrap();
    assert_eq!(fetched.question, "Integration: coffee or tea?");
    assert_eq!(fetched.options, vec!["Coffee", "Tea"]);
    assert_eq!(fetched.expires_at, poll.expires_at);

    assert!(store.get_poll("zzzzzzzzzz").await.unwrap().is_none());
}

#[tokio::test]
async fn test_unique_vote_per_voter() {
    require_store!();

    let store = remote_store();
    let service = PollService::new(store.clone(), clock());
    let poll = service
        .create_poll(&CreatePollRequest {
            question: "Integration: one vote each?".to_string(),
            options: vec!["Yes".to_string(), "No".to_string()],
            expires_in_hours: None,
        })
        .await
        .unwrap();

    let voter = VoterId::generate();
    let mut session = VotingSession::load(store.clone(), clock(), &poll.id, voter.clone())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.submit(1).await.unwrap(), VoteOutcome::Recorded);

    // Bypass the session so the store constraint is what rejects it.
    let duplicate = store
        .insert_vote(&NewVote {
            poll_id: poll.id.clone(),
            option_index: 0,
            voter_id: voter.as_str().to_string(),
        })
        .await;
    assert!(matches!(duplicate, Err(AppError::AlreadyVoted)));

    assert_eq!(store.vote_option_indices(&poll.id).await.unwrap(), vec![1]);
    assert!(store.has_voted(&poll.id, voter.as_str()).await.unwrap());
}

#[tokio::test]
async fn test_vote_on_missing_poll_is_not_a_duplicate() {
    require_store!();

    let store = remote_store();
    let result = store
        .insert_vote(&NewVote {
            poll_id: "nosuchpoll".to_string(),
            option_index: 0,
            voter_id: VoterId::generate().as_str().to_string(),
        })
        .await;

    assert!(matches!(result, Err(AppError::Database(_))));
}

#[tokio::test]
async fn test_realtime_feed_sees_insert() {
    require_store!();

    let url = std::env::var("SUPABASE_URL").unwrap();
    let key = std::env::var("SUPABASE_ANON_KEY").unwrap();
    let realtime = RealtimeClient::new(&url, key.clone()).unwrap();
    let store = PollStore::remote(&url, key, VoteFeed::with_source(Arc::new(realtime)));
    let service = PollService::new(store.clone(), clock());
    let poll = service
        .create_poll(&CreatePollRequest {
            question: "Integration: live?".to_string(),
            options: vec!["Yes".to_string(), "No".to_string()],
            expires_in_hours: None,
        })
        .await
        .unwrap();

    let mut subscription = store.feed().subscribe(&poll.id);
    // Give the socket time to join before writing.
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;

    store
        .insert_vote(&NewVote {
            poll_id: poll.id.clone(),
            option_index: 1,
            voter_id: VoterId::generate().as_str().to_string(),
        })
        .await
        .unwrap();

    let event = tokio::time::timeout(std::time::Duration::from_secs(10), subscription.next())
        .await
        .expect("no realtime event within 10s");
    assert_eq!(event, Some(Some(VoteInserted { option_index: 1 })));
}
