//! WebSocket interceptor: wraps a socket factory, emitting lifecycle and
//! message records as the host's own WebSocket client is driven (§4.5).
//!
//! Structured the same way as `snapo_http`'s `HttpInterceptor`/`RequestObserver`
//! pair -- an observer the host calls at defined points -- rather than owning
//! any actual socket I/O itself.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use snapo_clock::Clock;
use snapo_protocol::{
    CloseInitiator, HeaderEntry, Id, IdGenerator, Publisher, Record, WebSocketCloseRequested,
    WebSocketFailed, WebSocketLifecycle, WebSocketMessage, WebSocketOpened, WsOpcode,
};

/// Tunables for message previews; constructed by the host and passed in.
#[derive(Debug, Clone, Copy)]
pub struct WsCaptureConfig {
    pub text_preview_chars: usize,
    pub binary_preview_bytes: usize,
}

impl Default for WsCaptureConfig {
    fn default() -> Self {
        Self {
            text_preview_chars: 2048,
            binary_preview_bytes: 2048,
        }
    }
}

/// A payload handed to the interceptor, already classified by the host as
/// the WebSocket opcode it arrived/is-being-sent as.
#[derive(Debug, Clone)]
pub enum WsPayload<'a> {
    Text(&'a str),
    Binary(&'a [u8]),
}

fn build_preview(payload: &WsPayload<'_>, config: WsCaptureConfig) -> (Option<String>, u64, WsOpcode) {
    match payload {
        WsPayload::Text(s) => {
            let payload_size = s.len() as u64;
            let preview: String = s.chars().take(config.text_preview_chars).collect();
            (Some(preview), payload_size, WsOpcode::Text)
        }
        WsPayload::Binary(b) => {
            let payload_size = b.len() as u64;
            let take = b.len().min(config.binary_preview_bytes);
            let preview = BASE64.encode(&b[..take]);
            (Some(preview), payload_size, WsOpcode::Binary)
        }
    }
}

/// Mints ids and owns the clock/publisher capabilities threaded through
/// every WebSocket it wraps.
pub struct WebSocketInterceptor {
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn Publisher>,
    ids: IdGenerator,
    config: WsCaptureConfig,
}

impl WebSocketInterceptor {
    pub fn new(clock: Arc<dyn Clock>, publisher: Arc<dyn Publisher>, config: WsCaptureConfig) -> Self {
        Self {
            clock,
            publisher,
            ids: IdGenerator::new(),
            config,
        }
    }

    /// `newWebSocket`: mint id, emit `WebSocketWillOpen`.
    pub fn new_websocket(&self) -> WsObserver {
        let id = self.ids.next();
        self.publish_lifecycle(id, Record::WebSocketWillOpen);
        tracing::debug!(ws_id = %id, "websocket observed");
        WsObserver {
            id,
            clock: self.clock.clone(),
            publisher: self.publisher.clone(),
            config: self.config,
        }
    }

    fn publish_lifecycle(&self, id: Id, wrap: impl FnOnce(WebSocketLifecycle) -> Record) {
        self.publisher.publish(wrap(WebSocketLifecycle {
            id,
            t_wall_ms: self.clock.wall_ms(),
            t_mono_ns: self.clock.mono_ns(),
        }));
    }
}

/// Observer for a single WebSocket's lifetime, from `WebSocketWillOpen`
/// through its terminal record.
pub struct WsObserver {
    id: Id,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn Publisher>,
    config: WsCaptureConfig,
}

impl WsObserver {
    pub fn id(&self) -> Id {
        self.id
    }

    fn lifecycle(&self) -> WebSocketLifecycle {
        WebSocketLifecycle {
            id: self.id,
            t_wall_ms: self.clock.wall_ms(),
            t_mono_ns: self.clock.mono_ns(),
        }
    }

    /// Listener-side: the peer accepted the upgrade.
    pub fn on_opened(&self, code: u16, headers: Vec<HeaderEntry>) {
        self.publisher.publish(Record::WebSocketOpened(WebSocketOpened {
            id: self.id,
            t_wall_ms: self.clock.wall_ms(),
            t_mono_ns: self.clock.mono_ns(),
            code,
            headers,
        }));
    }

    /// Interposed on `send`, called after the underlying call completes.
    pub fn on_message_sent(&self, payload: WsPayload<'_>, enqueued: Option<bool>) {
        let (preview, payload_size, opcode) = build_preview(&payload, self.config);
        self.publisher.publish(Record::WebSocketMessageSent(WebSocketMessage {
            id: self.id,
            t_wall_ms: self.clock.wall_ms(),
            t_mono_ns: self.clock.mono_ns(),
            opcode,
            preview,
            payload_size,
            enqueued,
        }));
    }

    /// Interposed on the listener's message callback.
    pub fn on_message_received(&self, payload: WsPayload<'_>) {
        let (preview, payload_size, opcode) = build_preview(&payload, self.config);
        self.publisher.publish(Record::WebSocketMessageReceived(WebSocketMessage {
            id: self.id,
            t_wall_ms: self.clock.wall_ms(),
            t_mono_ns: self.clock.mono_ns(),
            opcode,
            preview,
            payload_size,
            enqueued: None,
        }));
    }

    /// Interposed on `close`/`cancel`, called after the underlying call
    /// completes. `initiated = Client` for calls the host application made;
    /// the peer-driven close is observed separately via `on_closing`/
    /// `on_closed` on the listener side (see `s8_...` test for the ordering
    /// this pins).
    pub fn on_close_requested(&self, code: u16, reason: Option<String>, accepted: bool) {
        self.publisher
            .publish(Record::WebSocketCloseRequested(WebSocketCloseRequested {
                id: self.id,
                t_wall_ms: self.clock.wall_ms(),
                t_mono_ns: self.clock.mono_ns(),
                code,
                reason,
                initiated: CloseInitiator::Client,
                accepted,
            }));
    }

    /// A close frame/request observed from the peer side.
    pub fn on_server_close_requested(&self, code: u16, reason: Option<String>) {
        self.publisher
            .publish(Record::WebSocketCloseRequested(WebSocketCloseRequested {
                id: self.id,
                t_wall_ms: self.clock.wall_ms(),
                t_mono_ns: self.clock.mono_ns(),
                code,
                reason,
                initiated: CloseInitiator::Server,
                accepted: true,
            }));
    }

    pub fn on_closing(&self) {
        self.publisher.publish(Record::WebSocketClosing(self.lifecycle()));
    }

    pub fn on_closed(&self) {
        self.publisher.publish(Record::WebSocketClosed(self.lifecycle()));
    }

    pub fn on_cancelled(&self) {
        self.publisher.publish(Record::WebSocketCancelled(self.lifecycle()));
    }

    pub fn on_failed(&self, message: Option<String>) {
        self.publisher.publish(Record::WebSocketFailed(WebSocketFailed {
            id: self.id,
            t_wall_ms: self.clock.wall_ms(),
            t_mono_ns: self.clock.mono_ns(),
            message,
        }));
    }
}
