//! Tagged-union event schema for HTTP, SSE, and WebSocket records.
//!
//! Every variant round-trips through the [`crate::Publisher`] contract
//! without field loss; the on-the-wire NDJSON shape is `{type, id, tWallMs,
//! tMonoNs, ...}` via `#[serde(tag = "type")]`.

use crate::ids::Id;
use serde::{Deserialize, Serialize};

/// A single request/response header, kept as an ordered pair rather than a
/// map so duplicate header names and declaration order survive capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

impl HeaderEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Looks up the first header matching `name`, case-insensitively.
pub fn find_header<'a>(headers: &'a [HeaderEntry], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

/// How a captured body is represented on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyEncoding {
    None,
    Base64,
}

/// `timings.totalMs` -- the only phase timing the core itself measures;
/// server-side phase breakdowns are out of scope (the host never supplies
/// DNS/connect/TLS timings to this core).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_ms: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamCloseReason {
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WsOpcode {
    Text,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloseInitiator {
    Client,
    Server,
}

// ---------------------------------------------------------------------------
// HTTP record family
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestWillBeSent {
    pub id: Id,
    pub t_wall_ms: i64,
    pub t_mono_ns: i64,
    pub method: String,
    pub url: String,
    pub headers: Vec<HeaderEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_encoding: Option<BodyEncoding>,
    pub body_truncated_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseReceived {
    pub id: Id,
    pub t_wall_ms: i64,
    pub t_mono_ns: i64,
    pub code: u16,
    pub headers: Vec<HeaderEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_encoding: Option<BodyEncoding>,
    pub body_truncated_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_size: Option<u64>,
    pub timings: Timings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseStreamEvent {
    pub id: Id,
    pub t_wall_ms: i64,
    pub t_mono_ns: i64,
    /// 1-based, strictly increasing per request.
    pub sequence: u64,
    pub raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseStreamClosed {
    pub id: Id,
    pub t_wall_ms: i64,
    pub t_mono_ns: i64,
    pub reason: StreamCloseReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub total_events: u64,
    pub total_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFailed {
    pub id: Id,
    pub t_wall_ms: i64,
    pub t_mono_ns: i64,
    pub error_kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timings: Timings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseFinished {
    pub id: Id,
    pub t_wall_ms: i64,
    pub t_mono_ns: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_size: Option<u64>,
}

// ---------------------------------------------------------------------------
// WebSocket record family
// ---------------------------------------------------------------------------

/// Shared shape for lifecycle records that carry no payload beyond identity
/// and timing: `WebSocketWillOpen`, `WebSocketClosing`, `WebSocketClosed`,
/// `WebSocketCancelled`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSocketLifecycle {
    pub id: Id,
    pub t_wall_ms: i64,
    pub t_mono_ns: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSocketOpened {
    pub id: Id,
    pub t_wall_ms: i64,
    pub t_mono_ns: i64,
    pub code: u16,
    pub headers: Vec<HeaderEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSocketMessage {
    pub id: Id,
    pub t_wall_ms: i64,
    pub t_mono_ns: i64,
    pub opcode: WsOpcode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    pub payload_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enqueued: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSocketCloseRequested {
    pub id: Id,
    pub t_wall_ms: i64,
    pub t_mono_ns: i64,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub initiated: CloseInitiator,
    pub accepted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSocketFailed {
    pub id: Id,
    pub t_wall_ms: i64,
    pub t_mono_ns: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Top-level sum type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Record {
    RequestWillBeSent(RequestWillBeSent),
    ResponseReceived(ResponseReceived),
    ResponseStreamEvent(ResponseStreamEvent),
    ResponseStreamClosed(ResponseStreamClosed),
    RequestFailed(RequestFailed),
    ResponseFinished(ResponseFinished),
    WebSocketWillOpen(WebSocketLifecycle),
    WebSocketOpened(WebSocketOpened),
    WebSocketMessageSent(WebSocketMessage),
    WebSocketMessageReceived(WebSocketMessage),
    WebSocketCloseRequested(WebSocketCloseRequested),
    WebSocketClosing(WebSocketLifecycle),
    WebSocketClosed(WebSocketLifecycle),
    WebSocketFailed(WebSocketFailed),
    WebSocketCancelled(WebSocketLifecycle),
}

impl Record {
    /// The id of the request/WebSocket this record belongs to.
    pub fn id(&self) -> Id {
        match self {
            Record::RequestWillBeSent(r) => r.id,
            Record::ResponseReceived(r) => r.id,
            Record::ResponseStreamEvent(r) => r.id,
            Record::ResponseStreamClosed(r) => r.id,
            Record::RequestFailed(r) => r.id,
            Record::ResponseFinished(r) => r.id,
            Record::WebSocketWillOpen(r) => r.id,
            Record::WebSocketOpened(r) => r.id,
            Record::WebSocketMessageSent(r) => r.id,
            Record::WebSocketMessageReceived(r) => r.id,
            Record::WebSocketCloseRequested(r) => r.id,
            Record::WebSocketClosing(r) => r.id,
            Record::WebSocketClosed(r) => r.id,
            Record::WebSocketFailed(r) => r.id,
            Record::WebSocketCancelled(r) => r.id,
        }
    }

    pub fn t_wall_ms(&self) -> i64 {
        match self {
            Record::RequestWillBeSent(r) => r.t_wall_ms,
            Record::ResponseReceived(r) => r.t_wall_ms,
            Record::ResponseStreamEvent(r) => r.t_wall_ms,
            Record::ResponseStreamClosed(r) => r.t_wall_ms,
            Record::RequestFailed(r) => r.t_wall_ms,
            Record::ResponseFinished(r) => r.t_wall_ms,
            Record::WebSocketWillOpen(r) => r.t_wall_ms,
            Record::WebSocketOpened(r) => r.t_wall_ms,
            Record::WebSocketMessageSent(r) => r.t_wall_ms,
            Record::WebSocketMessageReceived(r) => r.t_wall_ms,
            Record::WebSocketCloseRequested(r) => r.t_wall_ms,
            Record::WebSocketClosing(r) => r.t_wall_ms,
            Record::WebSocketClosed(r) => r.t_wall_ms,
            Record::WebSocketFailed(r) => r.t_wall_ms,
            Record::WebSocketCancelled(r) => r.t_wall_ms,
        }
    }
}
