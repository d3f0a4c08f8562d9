// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Voter identity middleware.

use crate::services::identity::get_voter_id;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Attach the browser's `VoterId` to the request, issuing one if needed.
///
/// Handlers read it with `Extension<VoterId>`. A freshly minted id is
/// persisted through `Set-Cookie` on the response.
pub async fn ensure_voter(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let (jar, voter) = get_voter_id(jar, state.config.secure_cookies());
    request.extensions_mut().insert(voter);

    let response = next.run(request).await;
    (jar, response).into_response()
}
