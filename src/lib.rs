// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! QuickPoll: instant polls with live results.
//!
//! This crate provides the backend API for creating polls, collecting one
//! vote per browser and streaming live results. Rows are persisted in a
//! hosted PostgREST store (or an in-memory stand-in for local development).

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

use config::Config;
use db::PollStore;
use services::PollService;
use time_utils::SharedClock;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: PollStore,
    pub poll_service: PollService,
    pub clock: SharedClock,
}

impl AppState {
    /// Wire the services on top of a store and a clock.
    pub fn new(config: Config, store: PollStore, clock: SharedClock) -> Self {
        let poll_service = PollService::new(store.clone(), clock.clone());
        Self {
            config,
            store,
            poll_service,
            clock,
        }
    }
}
