// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error response mapping tests.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use quickpoll::error::AppError;

mod common;

async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    (status, common::body_json(response).await)
}

#[tokio::test]
async fn test_client_errors() {
    let (status, json) = render(AppError::NotFound("Poll abc not found".to_string())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
    assert_eq!(json["details"], "Poll abc not found");

    let (status, json) = render(AppError::BadRequest(AppError::INVALID_POLL.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["details"], AppError::INVALID_POLL);
}

#[tokio::test]
async fn test_conflicts() {
    let (status, json) = render(AppError::PollExpired).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "poll_expired");
    assert_eq!(json["details"], "This poll has expired.");

    let (status, json) = render(AppError::AlreadyVoted).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "already_voted");
    assert!(json.get("details").is_none());
}

#[tokio::test]
async fn test_server_errors_hide_details() {
    let (status, json) = render(AppError::Database("connection refused".to_string())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "database_error");
    assert!(json.get("details").is_none());

    let (status, json) = render(AppError::Internal(anyhow::anyhow!("boom"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "internal_error");

    let (status, json) = render(AppError::PollCreateFailed).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["details"], AppError::CREATE_FAILED);
}

#[test]
fn test_only_store_conflicts_are_conflicts() {
    assert!(AppError::Conflict("duplicate key".to_string()).is_conflict());
    assert!(!AppError::AlreadyVoted.is_conflict());
    assert!(!AppError::Database("fk".to_string()).is_conflict());
}
