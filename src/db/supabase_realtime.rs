// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Hosted store realtime client.
//!
//! Joins one Phoenix channel per watched poll on the store's realtime
//! websocket, subscribed to `postgres_changes` INSERT events on `votes`
//! filtered by poll id, and forwards each insert to the local hub. Any
//! failure reconnects with exponential backoff.

use crate::db::tables;
use crate::services::realtime::{VoteInserted, VoteSource};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::AbortHandle;
use tokio_tungstenite::tungstenite::{self, Message};

/// Phoenix servers drop sockets that stay silent for longer than this.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
/// Realtime protocol version requested on connect.
const PROTOCOL_VSN: &str = "1.0.0";

/// Realtime failures; all of them end the current socket.
#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error("Unsupported store URL: {0}")]
    InvalidUrl(String),

    #[error("Websocket error: {0}")]
    Socket(#[from] tungstenite::Error),

    #[error("Channel join rejected: {0}")]
    Rejected(String),

    #[error("Realtime socket closed by server")]
    Closed,
}

/// Client for the store's realtime websocket.
#[derive(Clone)]
pub struct RealtimeClient {
    socket_url: String,
    anon_key: String,
}

/// Outgoing Phoenix frame.
#[derive(Serialize)]
struct OutgoingFrame<'a> {
    topic: &'a str,
    event: &'a str,
    payload: Value,
    #[serde(rename = "ref")]
    reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    join_ref: Option<String>,
}

/// Incoming Phoenix frame; fields this client ignores are skipped.
#[derive(Deserialize)]
struct IncomingFrame {
    topic: String,
    event: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Deserialize)]
struct ChangePayload {
    data: ChangeData,
}

#[derive(Deserialize)]
struct ChangeData {
    #[serde(rename = "type")]
    kind: String,
    record: VoteRecord,
}

#[derive(Deserialize)]
struct VoteRecord {
    option_index: u32,
}

/// What one incoming frame means for the watcher.
#[derive(Debug, PartialEq, Eq)]
enum Frame {
    Joined,
    Insert(VoteInserted),
    Rejected(String),
    Closed,
    Ignored,
}

impl RealtimeClient {
    /// Build a client for `project_url` (`https://...` or `http://...`).
    pub fn new(project_url: &str, anon_key: String) -> Result<Self, RealtimeError> {
        let socket_url = socket_url(project_url, &anon_key)?;
        Ok(Self {
            socket_url,
            anon_key,
        })
    }

    /// Forward inserts on `poll_id` until the task is aborted.
    async fn run(self, poll_id: String, sender: broadcast::Sender<VoteInserted>) {
        let mut backoff = INITIAL_BACKOFF;
        loop {
            let err = match self.session(&poll_id, &sender, &mut backoff).await {
                Ok(()) => RealtimeError::Closed,
                Err(e) => e,
            };
            tracing::warn!(
                poll_id = %poll_id,
                error = %err,
                retry_in_ms = backoff.as_millis() as u64,
                "Realtime connection lost"
            );
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }

    /// One socket lifetime: connect, join, then relay until it fails.
    async fn session(
        &self,
        poll_id: &str,
        sender: &broadcast::Sender<VoteInserted>,
        backoff: &mut Duration,
    ) -> Result<(), RealtimeError> {
        let (mut socket, _) = tokio_tungstenite::connect_async(self.socket_url.as_str()).await?;
        let topic = channel_topic(poll_id);
        let mut next_ref: u64 = 1;

        socket
            .send(Message::Text(
                join_frame(&topic, poll_id, &self.anon_key, next_ref).into(),
            ))
            .await?;

        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    next_ref += 1;
                    socket.send(Message::Text(heartbeat_frame(next_ref).into())).await?;
                }
                message = socket.next() => {
                    let Some(message) = message else {
                        return Ok(());
                    };
                    let text = match message? {
                        Message::Text(text) => text,
                        Message::Close(_) => return Ok(()),
                        _ => continue,
                    };
                    match parse_frame(text.as_str(), &topic) {
                        Frame::Joined => {
                            tracing::debug!(poll_id, "Realtime channel joined");
                            *backoff = INITIAL_BACKOFF;
                        }
                        Frame::Insert(event) => {
                            // No receivers only means the task is about to be aborted.
                            let _ = sender.send(event);
                        }
                        Frame::Rejected(reason) => return Err(RealtimeError::Rejected(reason)),
                        Frame::Closed => return Err(RealtimeError::Closed),
                        Frame::Ignored => {}
                    }
                }
            }
        }
    }
}

impl VoteSource for RealtimeClient {
    fn watch(&self, poll_id: &str, sender: broadcast::Sender<VoteInserted>) -> AbortHandle {
        tokio::spawn(self.clone().run(poll_id.to_string(), sender)).abort_handle()
    }
}

/// `https://x.supabase.co` -> `wss://x.supabase.co/realtime/v1/websocket?...`
fn socket_url(project_url: &str, anon_key: &str) -> Result<String, RealtimeError> {
    let base = project_url.trim_end_matches('/');
    let base = if let Some(host) = base.strip_prefix("https://") {
        format!("wss://{}", host)
    } else if let Some(host) = base.strip_prefix("http://") {
        format!("ws://{}", host)
    } else {
        return Err(RealtimeError::InvalidUrl(project_url.to_string()));
    };

    Ok(format!(
        "{}/realtime/v1/websocket?apikey={}&vsn={}",
        base,
        urlencoding::encode(anon_key),
        PROTOCOL_VSN
    ))
}

fn channel_topic(poll_id: &str) -> String {
    format!("realtime:votes:{}", poll_id)
}

fn join_frame(topic: &str, poll_id: &str, anon_key: &str, reference: u64) -> String {
    let frame = OutgoingFrame {
        topic,
        event: "phx_join",
        payload: json!({
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": [{
                    "event": "INSERT",
                    "schema": "public",
                    "table": tables::VOTES,
                    "filter": format!("poll_id=eq.{}", poll_id),
                }],
            },
            "access_token": anon_key,
        }),
        reference: reference.to_string(),
        join_ref: Some(reference.to_string()),
    };
    serde_json::to_string(&frame).unwrap_or_default()
}

fn heartbeat_frame(reference: u64) -> String {
    let frame = OutgoingFrame {
        topic: "phoenix",
        event: "heartbeat",
        payload: json!({}),
        reference: reference.to_string(),
        join_ref: None,
    };
    serde_json::to_string(&frame).unwrap_or_default()
}

fn parse_frame(text: &str, topic: &str) -> Frame {
    let Ok(frame) = serde_json::from_str::<IncomingFrame>(text) else {
        tracing::debug!(frame = text, "Unparseable realtime frame");
        return Frame::Ignored;
    };
    if frame.topic != topic {
        return Frame::Ignored;
    }

    match frame.event.as_str() {
        "postgres_changes" => match serde_json::from_value::<ChangePayload>(frame.payload) {
            Ok(change) if change.data.kind == "INSERT" => Frame::Insert(VoteInserted {
                option_index: change.data.record.option_index,
            }),
            Ok(_) => Frame::Ignored,
            Err(e) => {
                tracing::debug!(error = %e, "Unexpected postgres_changes payload");
                Frame::Ignored
            }
        },
        "phx_reply" => {
            let status = frame.payload["status"].as_str().unwrap_or_default();
            if status == "ok" {
                Frame::Joined
            } else {
                Frame::Rejected(frame.payload["response"].to_string())
            }
        }
        "system" if frame.payload["status"] == "error" => {
            Frame::Rejected(frame.payload["message"].to_string())
        }
        "phx_close" | "phx_error" => Frame::Closed,
        _ => Frame::Ignored,
    }
}
