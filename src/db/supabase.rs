// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PostgREST client for the hosted store.
//!
//! Handles:
//! - Row inserts with `Prefer: return=representation`
//! - Equality-filtered selects
//! - Mapping unique-constraint violations to `AppError::Conflict`

use crate::error::AppError;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// SQLSTATE reported by Postgres for unique-constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// Hosted store REST client.
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    rest_url: String,
    anon_key: String,
}

/// Error body returned by PostgREST.
#[derive(Debug, Default, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl SupabaseClient {
    /// Create a client for a project URL such as `https://xyz.supabase.co`.
    pub fn new(project_url: &str, anon_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            rest_url: format!("{}/rest/v1", project_url.trim_end_matches('/')),
            anon_key,
        }
    }

    /// Insert one row and return the stored representation.
    pub async fn insert<T, R>(&self, table: &str, row: &T) -> Result<R, AppError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await
            .map_err(|e| AppError::Database(format!("{} insert failed: {}", table, e)))?;

        let mut rows: Vec<R> = self.check_response_json(table, response).await?;
        if rows.is_empty() {
            return Err(AppError::Database(format!(
                "{} insert returned no representation",
                table
            )));
        }
        Ok(rows.swap_remove(0))
    }

    /// Select `columns` from `table` where every `(column, value)` matches.
    pub async fn select_eq<R>(
        &self,
        table: &str,
        columns: &str,
        filters: &[(&str, &str)],
        limit: Option<u32>,
    ) -> Result<Vec<R>, AppError>
    where
        R: DeserializeOwned,
    {
        let mut query: Vec<(String, String)> = filters
            .iter()
            .map(|(column, value)| (column.to_string(), eq(value)))
            .collect();
        query.push(("select".to_string(), columns.to_string()));
        if let Some(limit) = limit {
            query.push(("limit".to_string(), limit.to_string()));
        }

        let response = self
            .request(Method::GET, table)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::Database(format!("{} select failed: {}", table, e)))?;

        self.check_response_json(table, response).await
    }

    /// Request builder with the project key attached.
    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    /// Check response status and parse the JSON body.
    async fn check_response_json<R: DeserializeOwned>(
        &self,
        table: &str,
        response: reqwest::Response,
    ) -> Result<R, AppError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| AppError::Database(format!("{} JSON parse error: {}", table, e)));
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_error(table, status, &body))
    }
}

/// PostgREST equality filter value.
pub fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

/// Map a failed PostgREST response onto the application error type.
fn classify_error(table: &str, status: StatusCode, body: &str) -> AppError {
    let parsed: PostgrestError = serde_json::from_str(body).unwrap_or_default();
    let message = parsed.message.unwrap_or_else(|| body.to_string());

    if status == StatusCode::CONFLICT && parsed.code.as_deref() == Some(UNIQUE_VIOLATION) {
        return AppError::Conflict(format!("{}: {}", table, message));
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!(table, "Store rate limit hit (429)");
    }

    AppError::Database(format!("{} HTTP {}: {}", table, status, message))
}
