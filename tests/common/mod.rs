// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use quickpoll::config::Config;
use quickpoll::db::PollStore;
use quickpoll::routes::create_router;
use quickpoll::services::identity::VOTER_COOKIE;
use quickpoll::services::VoteFeed;
use quickpoll::services::realtime::VoteSource;
use quickpoll::test_support::ManualClock;
use quickpoll::AppState;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Router plus handles the tests poke at directly.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub clock: Arc<ManualClock>,
}

/// Fixed starting instant for the manual clock.
#[allow(dead_code)]
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
}

/// Check if a hosted store is configured via environment variables.
#[allow(dead_code)]
pub fn store_available() -> bool {
    std::env::var("SUPABASE_URL").is_ok() && std::env::var("SUPABASE_ANON_KEY").is_ok()
}

/// Skip test with message if no hosted store is configured.
#[macro_export]
macro_rules! require_store {
    () => {
        if !crate::common::store_available() {
            eprintln!("⚠️  Skipping: SUPABASE_URL / SUPABASE_ANON_KEY not set");
            return;
        }
    };
}

fn build(config: Config, store: PollStore, clock: Arc<ManualClock>) -> TestApp {
    let state = Arc::new(AppState::new(config, store, clock.clone()));
    TestApp {
        router: create_router(state.clone()),
        state,
        clock,
    }
}

/// Create a test app backed by in-memory tables.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> TestApp {
    let clock = Arc::new(ManualClock::new(start_time()));
    let store = PollStore::in_memory(clock.clone(), VoteFeed::new());
    build(config, store, clock)
}

/// Create a test app whose live results come from `source` instead of the
/// store's own inserts, as with the hosted store.
#[allow(dead_code)]
pub fn create_test_app_with_source(source: Arc<dyn VoteSource>) -> TestApp {
    let clock = Arc::new(ManualClock::new(start_time()));
    let store = PollStore::in_memory(clock.clone(), VoteFeed::with_source(source));
    build(Config::test_default(), store, clock)
}

/// Create a test app whose store fails every call.
#[allow(dead_code)]
pub fn create_offline_test_app() -> TestApp {
    let clock = Arc::new(ManualClock::new(start_time()));
    build(Config::test_default(), PollStore::new_mock(), clock)
}

#[allow(dead_code)]
pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub fn post_json(uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// All `Set-Cookie` header values on a response.
#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

/// `name=value` pair of the voter cookie, if the response issued one.
#[allow(dead_code)]
pub fn voter_cookie(response: &Response) -> Option<String> {
    set_cookie_headers(response)
        .into_iter()
        .find(|value| value.starts_with(&format!("{VOTER_COOKIE}=")))
        .and_then(|value| value.split(';').next().map(str::to_string))
}

/// Create a poll through the API and return its id.
#[allow(dead_code)]
pub async fn create_poll(
    app: &TestApp,
    question: &str,
    options: &[&str],
    expires_in_hours: Option<u32>,
) -> String {
    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/polls",
            serde_json::json!({
                "question": question,
                "options": options,
                "expires_in_hours": expires_in_hours,
            }),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    json["poll"]["id"].as_str().unwrap().to_string()
}
