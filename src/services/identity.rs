// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-browser voter identity.
//!
//! Each browser gets a random UUID on first contact, persisted in a
//! long-lived cookie and re-used for every poll it votes on. The identity is
//! an opaque deduplication key, not an authenticated user.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

/// Cookie holding the voter identifier.
pub const VOTER_COOKIE: &str = "quickpoll_voter";

/// Voter cookies effectively never expire.
const VOTER_COOKIE_MAX_AGE_DAYS: i64 = 3650;

/// Opaque voter identifier threaded through every vote-related call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VoterId(String);

impl VoterId {
    /// Mint a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Accept a previously issued identifier; anything but a UUID is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        uuid::Uuid::parse_str(raw.trim())
            .ok()
            .map(|id| Self(id.hyphenated().to_string()))
    }

    /// Identity used when nothing can be persisted for the client.
    ///
    /// It never matches a stored vote, so deduplication cannot work.
    pub fn degraded() -> Self {
        Self(String::new())
    }

    pub fn is_degraded(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VoterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the persistent cookie for `voter`.
pub fn voter_cookie(voter: &VoterId, secure: bool) -> Cookie<'static> {
    Cookie::build((VOTER_COOKIE, voter.as_str().to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::days(VOTER_COOKIE_MAX_AGE_DAYS))
        .build()
}

/// Return the browser's voter id, minting and persisting one on first use.
///
/// The returned jar only carries a `Set-Cookie` when a new id was minted.
pub fn get_voter_id(jar: CookieJar, secure: bool) -> (CookieJar, VoterId) {
    if let Some(voter) = jar
        .get(VOTER_COOKIE)
        .and_then(|cookie| VoterId::parse(cookie.value()))
    {
        return (jar, voter);
    }

    let voter = VoterId::generate();
    tracing::debug!(voter_id = %voter, "Issued new voter id");
    let jar = jar.add(voter_cookie(&voter, secure));
    (jar, voter)
}
