// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! QuickPoll API Server
//!
//! Creates polls, records one vote per browser and streams live results.

use mockable::DefaultClock;
use quickpoll::{
    config::{Config, StoreConfig},
    db::{PollStore, RealtimeClient},
    services::VoteFeed,
    time_utils::SharedClock,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, public_url = %config.public_url, "Starting QuickPoll API");

    let clock: SharedClock = Arc::new(DefaultClock);

    let store = match &config.store {
        StoreConfig::Remote { url, anon_key } => {
            // Live results follow the store's own realtime feed
            let realtime = RealtimeClient::new(url, anon_key.clone())?;
            let feed = VoteFeed::with_source(Arc::new(realtime));
            PollStore::remote(url, anon_key.clone(), feed)
        }
        StoreConfig::Memory => {
            tracing::warn!("SUPABASE_URL not set, polls will not survive a restart");
            PollStore::in_memory(clock.clone(), VoteFeed::new())
        }
    };

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), store, clock));

    // Build router
    let app = quickpoll::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("quickpoll=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
