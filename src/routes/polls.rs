// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Poll creation, detail, voting and live results routes.

use crate::error::{AppError, Result};
use crate::models::Poll;
use crate::services::identity::VoterId;
use crate::services::polls::CreatePollRequest;
use crate::services::voting::{share_url, PollView, VoteOutcome, VotingSession};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Redirect, Response,
    },
    routing::{get, post},
    Extension, Json, Router,
};
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Longest poll id accepted in a path.
const MAX_POLL_ID_LEN: usize = 64;

/// Poll routes (the voter middleware is applied in routes/mod.rs).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/polls", post(create_poll))
        .route("/api/polls/{id}", get(get_poll))
        .route("/api/polls/{id}/votes", post(submit_vote))
        .route("/api/polls/{id}/results/stream", get(results_stream))
        .route("/polls/{id}", get(poll_page))
}

/// Ids are short ASCII alphanumerics; anything else cannot exist.
fn is_valid_poll_id(poll_id: &str) -> bool {
    !poll_id.is_empty()
        && poll_id.len() <= MAX_POLL_ID_LEN
        && poll_id.bytes().all(|b| b.is_ascii_alphanumeric())
}

async fn load_session(
    state: &AppState,
    poll_id: &str,
    voter: VoterId,
) -> Result<Option<VotingSession>> {
    if !is_valid_poll_id(poll_id) {
        return Ok(None);
    }
    VotingSession::load(state.store.clone(), state.clock.clone(), poll_id, voter).await
}

fn poll_not_found(poll_id: &str) -> AppError {
    AppError::NotFound(format!("Poll {} not found", poll_id))
}

// ─── Creation ────────────────────────────────────────────────

/// Response for a newly created poll.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PollCreatedResponse {
    pub poll: Poll,
    /// Detail view to navigate to
    pub url: String,
    pub share_url: String,
}

/// Create a poll and point the client at its detail view.
async fn create_poll(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreatePollRequest>,
) -> Result<impl IntoResponse> {
    let poll = state.poll_service.create_poll(&request).await?;
    let url = format!("/polls/{}", poll.id);
    let share_url = share_url(&state.config.public_url, &poll.id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, url.clone())],
        Json(PollCreatedResponse {
            poll,
            url,
            share_url,
        }),
    ))
}

// ─── Detail ──────────────────────────────────────────────────

/// Detail view; unknown polls send the browser back home.
async fn poll_page(
    State(state): State<Arc<AppState>>,
    Path(poll_id): Path<String>,
    Extension(voter): Extension<VoterId>,
) -> Result<Response> {
    match load_session(&state, &poll_id, voter).await? {
        Some(session) => Ok(Json(session.view(&state.config.public_url)).into_response()),
        None => Ok(Redirect::to("/").into_response()),
    }
}

/// Detail view as plain JSON.
async fn get_poll(
    State(state): State<Arc<AppState>>,
    Path(poll_id): Path<String>,
    Extension(voter): Extension<VoterId>,
) -> Result<Json<PollView>> {
    let session = load_session(&state, &poll_id, voter)
        .await?
        .ok_or_else(|| poll_not_found(&poll_id))?;

    Ok(Json(session.view(&state.config.public_url)))
}

// ─── Voting ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct VoteRequest {
    option_index: u32,
}

/// Response for a vote submission.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VoteResponse {
    pub outcome: VoteOutcome,
    pub poll: PollView,
}

/// Vote for one option.
///
/// A failed store write is not an error for the client: the response
/// carries `outcome: "failed"` and the poll still in the `not_voted` state.
async fn submit_vote(
    State(state): State<Arc<AppState>>,
    Path(poll_id): Path<String>,
    Extension(voter): Extension<VoterId>,
    Json(request): Json<VoteRequest>,
) -> Result<Json<VoteResponse>> {
    let mut session = load_session(&state, &poll_id, voter)
        .await?
        .ok_or_else(|| poll_not_found(&poll_id))?;

    let outcome = session.submit(request.option_index).await?;
    tracing::info!(
        poll_id = %poll_id,
        option_index = request.option_index,
        outcome = ?outcome,
        "Vote submitted"
    );

    Ok(Json(VoteResponse {
        outcome,
        poll: session.view(&state.config.public_url),
    }))
}

// ─── Live Results ────────────────────────────────────────────

/// Server-Sent Events stream of the detail view.
///
/// Emits a `results` event on connect and another after every vote insert
/// on the poll, each one recounted from the store. Closing the connection
/// drops the realtime subscription.
async fn results_stream(
    State(state): State<Arc<AppState>>,
    Path(poll_id): Path<String>,
    Extension(voter): Extension<VoterId>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>>> {
    let session = load_session(&state, &poll_id, voter)
        .await?
        .ok_or_else(|| poll_not_found(&poll_id))?;

    // Subscribe before the first event so no insert slips between the two.
    let subscription = session.subscribe();
    let public_url = state.config.public_url.clone();

    let events = stream::unfold(
        (session, subscription, true),
        move |(mut session, mut subscription, first)| {
            let public_url = public_url.clone();
            async move {
                if !first {
                    subscription.next().await?;
                    if let Err(e) = session.refresh().await {
                        tracing::warn!(poll_id = %subscription.poll_id(), error = %e, "Recount failed");
                    }
                    if let Err(e) = session.refresh_voter_state().await {
                        tracing::warn!(poll_id = %subscription.poll_id(), error = %e, "Voter lookup failed");
                    }
                }
                let event = Event::default()
                    .event("results")
                    .json_data(session.view(&public_url));
                Some((event, (session, subscription, false)))
            }
        },
    );

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
