// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Poll creation: input validation, id generation and the store insert.

use crate::db::PollStore;
use crate::error::AppError;
use crate::models::poll::{
    EXPIRY_CHOICES_HOURS, MAX_OPTIONS, MAX_OPTION_CHARS, MAX_QUESTION_CHARS, MIN_OPTIONS,
};
use crate::models::{NewPoll, Poll};
use crate::time_utils::SharedClock;
use chrono::{DateTime, Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use serde::Deserialize;
use validator::Validate;

/// Characters in a generated poll id (about 51 bits of entropy).
const POLL_ID_LEN: usize = 10;
/// Attempts before giving up on poll id collisions.
const MAX_ID_ATTEMPTS: usize = 3;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
/// Largest multiple of 36 that fits in a byte; bytes at or above it are
/// rejected to keep the alphabet uniform.
const BASE36_REJECT_AT: u8 = 252;

/// Poll creation request as submitted by the form.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePollRequest {
    #[validate(length(
        max = MAX_QUESTION_CHARS,
        message = "Question must be at most 200 characters"
    ))]
    pub question: String,
    #[validate(length(max = MAX_OPTIONS, message = "A poll can have at most 6 options"))]
    pub options: Vec<String>,
    /// Hours until the poll closes; one of 1, 24 or 168.
    #[serde(default)]
    pub expires_in_hours: Option<u32>,
}

/// Creation input after trimming and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPoll {
    pub question: String,
    pub options: Vec<String>,
    pub expires_in_hours: Option<u32>,
}

/// Validate a creation request.
///
/// Question and options are trimmed; blank options are dropped while the
/// remaining ones keep their order.
pub fn validate_poll(request: &CreatePollRequest) -> Result<ValidatedPoll, AppError> {
    request
        .validate()
        .map_err(|errors| AppError::BadRequest(first_message(&errors)))?;

    if let Some(option) = request
        .options
        .iter()
        .find(|option| option.chars().count() > MAX_OPTION_CHARS)
    {
        return Err(AppError::BadRequest(format!(
            "Option \"{}…\" is longer than {} characters",
            option.chars().take(20).collect::<String>(),
            MAX_OPTION_CHARS
        )));
    }

    let question = request.question.trim();
    let options: Vec<String> = request
        .options
        .iter()
        .map(|option| option.trim())
        .filter(|option| !option.is_empty())
        .map(str::to_string)
        .collect();

    if question.is_empty() || options.len() < MIN_OPTIONS {
        return Err(AppError::BadRequest(AppError::INVALID_POLL.to_string()));
    }

    if let Some(hours) = request.expires_in_hours {
        if !EXPIRY_CHOICES_HOURS.contains(&hours) {
            return Err(AppError::BadRequest(
                "Expiry must be 1, 24 or 168 hours".to_string(),
            ));
        }
    }

    Ok(ValidatedPoll {
        question: question.to_string(),
        options,
        expires_in_hours: request.expires_in_hours,
    })
}

/// Flatten validator output into one user-facing message.
fn first_message(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(_, errs)| errs.iter())
        .find_map(|err| err.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| AppError::INVALID_POLL.to_string())
}

/// Absolute expiry instant for a poll created at `now`.
pub fn compute_expiry(now: DateTime<Utc>, hours: Option<u32>) -> Option<DateTime<Utc>> {
    hours.map(|h| now + Duration::hours(i64::from(h)))
}

/// Generate a random base-36 poll id.
pub fn generate_poll_id() -> Result<String, AppError> {
    let rng = SystemRandom::new();
    let mut id = String::with_capacity(POLL_ID_LEN);
    let mut buf = [0u8; 32];

    while id.len() < POLL_ID_LEN {
        rng.fill(&mut buf)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG unavailable")))?;
        id.extend(
            buf.iter()
                .filter(|b| **b < BASE36_REJECT_AT)
                .map(|b| BASE36[usize::from(*b % 36)] as char)
                .take(POLL_ID_LEN - id.len()),
        );
    }
    Ok(id)
}

/// Poll creation service.
#[derive(Clone)]
pub struct PollService {
    store: PollStore,
    clock: SharedClock,
}

impl PollService {
    pub fn new(store: PollStore, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// Validate and store a new poll.
    ///
    /// Validation failures are returned as `BadRequest` without touching the
    /// store. Any store failure collapses to `PollCreateFailed` so the client
    /// can show a generic retry message. An id collision regenerates the id.
    pub async fn create_poll(&self, request: &CreatePollRequest) -> Result<Poll, AppError> {
        let validated = validate_poll(request)?;
        let expires_at = compute_expiry(self.clock.utc(), validated.expires_in_hours);

        for attempt in 1..=MAX_ID_ATTEMPTS {
            let row = NewPoll {
                id: generate_poll_id()?,
                question: validated.question.clone(),
                options: validated.options.clone(),
                expires_at,
                is_active: true,
            };

            match self.store.insert_poll(&row).await {
                Ok(poll) => {
                    tracing::info!(
                        poll_id = %poll.id,
                        options = poll.options.len(),
                        expires_at = ?poll.expires_at,
                        "Poll created"
                    );
                    return Ok(poll);
                }
                Err(e) if e.is_conflict() => {
                    tracing::warn!(poll_id = %row.id, attempt, "Poll id collision, regenerating");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create poll");
                    return Err(AppError::PollCreateFailed);
                }
            }
        }

        tracing::error!(attempts = MAX_ID_ATTEMPTS, "Gave up after repeated poll id collisions");
        Err(AppError::PollCreateFailed)
    }
}
