// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (voter identity, security headers).

pub mod security;
pub mod voter;

pub use voter::ensure_voter;
