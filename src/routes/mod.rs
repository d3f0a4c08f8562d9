// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod polls;

use crate::middleware::voter::ensure_voter;
use crate::AppState;
use axum::http::{header, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Feature {
    pub title: &'static str,
    pub description: &'static str,
}

/// Landing page content.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HomeResponse {
    pub name: &'static str,
    pub tagline: &'static str,
    pub create_url: &'static str,
    pub features: Vec<Feature>,
}

const FEATURES: [(&str, &str); 4] = [
    (
        "Instant Creation",
        "Create a poll in seconds. No account needed.",
    ),
    (
        "Real-time Results",
        "Watch votes come in live as people respond.",
    ),
    ("Easy Sharing", "Share via link. Works on any device."),
    ("Auto Expiration", "Set polls to close automatically."),
];

/// Home view; missing polls redirect here.
async fn home() -> Json<HomeResponse> {
    Json(HomeResponse {
        name: "QuickPoll",
        tagline: "Create instant polls and get real-time feedback. No sign-up required.",
        create_url: "/api/polls",
        features: FEATURES
            .iter()
            .map(|&(title, description)| Feature { title, description })
            .collect(),
    })
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow requests from frontend URL and localhost (for dev)
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == frontend_url
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::LOCATION]);

    let public_routes = Router::new()
        .route("/", get(home))
        .route("/health", get(health_check));

    // Poll routes need the voter identity
    let poll_routes =
        polls::routes().route_layer(middleware::from_fn_with_state(state.clone(), ensure_voter));

    Router::new()
        .merge(public_routes)
        .merge(poll_routes)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
