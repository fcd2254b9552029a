//! HTTP interceptor: an observer the host calls at defined points around an
//! exchange it owns (mint id -> observe request -> observe response headers
//! -> observe body bytes/stream events -> observe completion/failure).
//!
//! Modeled on `http::{Method, HeaderMap, StatusCode}` rather than one
//! concrete client so the host can wire it to whatever it already uses --
//! the same reasoning the teacher's `axum`/`reqwest` dependency pair reflects
//! (one crate family, two concrete users).

use std::sync::Arc;

use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, Method, StatusCode};
use snapo_body_capture::{capture_body, BodyAccumulator, Encoding as CaptureEncoding};
use snapo_clock::Clock;
use snapo_protocol::{
    BodyEncoding, HeaderEntry, Id, IdGenerator, Publisher, Record, RequestFailed,
    RequestWillBeSent, ResponseFinished, ResponseReceived, ResponseStreamClosed,
    ResponseStreamEvent, StreamCloseReason, Timings,
};
use snapo_sse::SseParser;

/// Flattens an `http::HeaderMap` into ordered `(name, value)` pairs,
/// preserving duplicates and declaration order the way `HeaderMap::iter`
/// already does.
fn headers_to_entries(headers: &HeaderMap) -> Vec<HeaderEntry> {
    headers
        .iter()
        .map(|(name, value)| HeaderEntry::new(name.as_str(), value.to_str().unwrap_or("")))
        .collect()
}

fn header_str<'a>(headers: &'a HeaderMap, name: http::header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Tunables for body capture; constructed by the host and passed in, never
/// read from environment state.
#[derive(Debug, Clone, Copy)]
pub struct CaptureConfig {
    pub max_bytes: usize,
    pub preview_bytes: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_bytes: 1024 * 1024,
            preview_bytes: 2048,
        }
    }
}

fn map_encoding(e: CaptureEncoding) -> BodyEncoding {
    match e {
        CaptureEncoding::None => BodyEncoding::None,
        CaptureEncoding::Base64 => BodyEncoding::Base64,
    }
}

/// Status codes that are by-protocol bodyless regardless of what the server
/// claims in its headers.
fn is_bodyless(method: &Method, status: StatusCode, headers: &HeaderMap) -> bool {
    if method == Method::HEAD {
        return true;
    }
    let code = status.as_u16();
    if (100..200).contains(&code) || matches!(code, 204 | 205 | 304) {
        return true;
    }
    header_str(headers, CONTENT_LENGTH) == Some("0")
}

fn is_event_stream(headers: &HeaderMap) -> bool {
    header_str(headers, CONTENT_TYPE)
        .map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or("")
                .trim()
                .eq_ignore_ascii_case("text/event-stream")
        })
        .unwrap_or(false)
}

fn total_ms(start_mono_ns: i64, end_mono_ns: i64) -> f64 {
    (end_mono_ns - start_mono_ns) as f64 / 1_000_000.0
}

/// Mints ids and owns the clock/publisher capabilities threaded through
/// every observer it creates.
pub struct HttpInterceptor {
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn Publisher>,
    ids: IdGenerator,
    config: CaptureConfig,
}

impl HttpInterceptor {
    pub fn new(clock: Arc<dyn Clock>, publisher: Arc<dyn Publisher>, config: CaptureConfig) -> Self {
        Self {
            clock,
            publisher,
            ids: IdGenerator::new(),
            config,
        }
    }

    /// Step 1: mint an id, capture start timestamps, body-capture the
    /// request body (if any), and emit `RequestWillBeSent`.
    pub fn start_request(
        &self,
        method: &Method,
        url: &str,
        headers: &HeaderMap,
        body: Option<&[u8]>,
    ) -> RequestObserver {
        let id = self.ids.next();
        let t_wall_ms = self.clock.wall_ms();
        let start_mono_ns = self.clock.mono_ns();

        let content_type = header_str(headers, CONTENT_TYPE).map(str::to_owned);
        let content_encoding = header_str(headers, CONTENT_ENCODING).map(str::to_owned);

        let captured = body.and_then(|bytes| {
            capture_body(
                content_type.as_deref(),
                content_encoding.as_deref(),
                bytes,
                bytes.len() as u64,
                self.config.preview_bytes,
            )
        });

        let (body_str, body_encoding, body_truncated_bytes, body_size) = match &captured {
            Some(c) => (
                Some(c.rendered.clone()),
                Some(map_encoding(c.encoding)),
                c.truncated_bytes,
                Some(body.map(|b| b.len() as u64).unwrap_or(0)),
            ),
            None => (None, None, 0, None),
        };

        tracing::debug!(request_id = %id, method = %method, url, "request observed");

        self.publisher.publish(Record::RequestWillBeSent(RequestWillBeSent {
            id,
            t_wall_ms,
            t_mono_ns: start_mono_ns,
            method: method.as_str().to_owned(),
            url: url.to_owned(),
            headers: headers_to_entries(headers),
            body: body_str,
            body_encoding,
            body_truncated_bytes,
            body_size,
        }));

        RequestObserver {
            id,
            method: method.clone(),
            start_mono_ns,
            clock: self.clock.clone(),
            publisher: self.publisher.clone(),
            config: self.config,
        }
    }
}

/// Observer for a single in-flight request, alive between `start_request`
/// and either `on_response_headers` or `on_failure`.
pub struct RequestObserver {
    id: Id,
    method: Method,
    start_mono_ns: i64,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn Publisher>,
    config: CaptureConfig,
}

impl RequestObserver {
    pub fn id(&self) -> Id {
        self.id
    }

    /// Step 3: response headers arrived. Dispatches to the SSE path, the
    /// bodyless fast-path, or the tee-and-capture path.
    pub fn on_response_headers(self, status: StatusCode, headers: &HeaderMap) -> ResponseObserver {
        let end_mono_ns = self.clock.mono_ns();
        let t_wall_ms = self.clock.wall_ms();
        let header_entries = headers_to_entries(headers);

        if is_bodyless(&self.method, status, headers) {
            self.publisher.publish(Record::ResponseReceived(ResponseReceived {
                id: self.id,
                t_wall_ms,
                t_mono_ns: end_mono_ns,
                code: status.as_u16(),
                headers: header_entries,
                body_preview: None,
                body: None,
                body_encoding: None,
                body_truncated_bytes: 0,
                body_size: Some(0),
                timings: Timings {
                    total_ms: Some(total_ms(self.start_mono_ns, end_mono_ns)),
                },
            }));
            self.publisher.publish(Record::ResponseFinished(ResponseFinished {
                id: self.id,
                t_wall_ms,
                t_mono_ns: end_mono_ns,
                body_size: Some(0),
            }));
            return ResponseObserver::Finished;
        }

        if is_event_stream(headers) {
            self.publisher.publish(Record::ResponseReceived(ResponseReceived {
                id: self.id,
                t_wall_ms,
                t_mono_ns: end_mono_ns,
                code: status.as_u16(),
                headers: header_entries,
                body_preview: None,
                body: None,
                body_encoding: None,
                body_truncated_bytes: 0,
                body_size: None,
                timings: Timings {
                    total_ms: Some(total_ms(self.start_mono_ns, end_mono_ns)),
                },
            }));
            return ResponseObserver::Sse(SseObserverState {
                id: self.id,
                start_mono_ns: self.start_mono_ns,
                clock: self.clock,
                publisher: self.publisher,
                parser: SseParser::new(),
            });
        }

        let content_type = header_str(headers, CONTENT_TYPE).map(str::to_owned);
        let content_encoding = header_str(headers, CONTENT_ENCODING).map(str::to_owned);

        ResponseObserver::Capturing(CapturingState {
            id: self.id,
            start_mono_ns: self.start_mono_ns,
            clock: self.clock,
            publisher: self.publisher,
            status: status.as_u16(),
            headers: header_entries,
            content_type,
            content_encoding,
            accumulator: BodyAccumulator::new(self.config.max_bytes),
            preview_bytes: self.config.preview_bytes,
        })
    }

    /// Step 4: the exchange failed before headers were ever observed.
    pub fn on_failure(self, error_kind: impl Into<String>, message: Option<String>) {
        let end_mono_ns = self.clock.mono_ns();
        let t_wall_ms = self.clock.wall_ms();
        tracing::debug!(request_id = %self.id, "request failed before response headers");
        self.publisher.publish(Record::RequestFailed(RequestFailed {
            id: self.id,
            t_wall_ms,
            t_mono_ns: end_mono_ns,
            error_kind: error_kind.into(),
            message,
            timings: Timings {
                total_ms: Some(total_ms(self.start_mono_ns, end_mono_ns)),
            },
        }));
    }
}

struct SseObserverState {
    id: Id,
    start_mono_ns: i64,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn Publisher>,
    parser: SseParser,
}

struct CapturingState {
    id: Id,
    start_mono_ns: i64,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn Publisher>,
    status: u16,
    headers: Vec<HeaderEntry>,
    content_type: Option<String>,
    content_encoding: Option<String>,
    accumulator: BodyAccumulator,
    preview_bytes: usize,
}

/// Observer for the response body phase, one variant per §4.4 step 3 path.
pub enum ResponseObserver {
    Sse(SseObserverState),
    Capturing(CapturingState),
    /// The bodyless fast-path already emitted everything; further calls are
    /// no-ops.
    Finished,
}

impl ResponseObserver {
    /// Feeds a chunk of response body bytes. For SSE this is decoded text
    /// (UTF-8 already assembled by the host); for the capturing path it's
    /// teed verbatim into the bounded accumulator.
    pub fn on_sse_chunk(&mut self, chunk: &str) {
        if let ResponseObserver::Sse(state) = self {
            let t_wall_ms = state.clock.wall_ms();
            let t_mono_ns = state.clock.mono_ns();
            for event in state.parser.push_chunk(chunk) {
                state.publisher.publish(Record::ResponseStreamEvent(ResponseStreamEvent {
                    id: state.id,
                    t_wall_ms,
                    t_mono_ns,
                    sequence: event.sequence,
                    raw: event.raw,
                    event: event.event,
                    data: event.data,
                    last_event_id: event.id,
                    retry_ms: event.retry_ms,
                    comment: event.comment,
                }));
            }
        }
    }

    pub fn on_body_chunk(&mut self, chunk: &[u8]) {
        if let ResponseObserver::Capturing(state) = self {
            state.accumulator.write(chunk);
        }
    }

    /// Step 3 closure: drains any residual SSE tail before emitting
    /// `ResponseStreamClosed` (Open Question 2: drain-then-close, never the
    /// reverse), or finalizes the captured body for the non-streaming path.
    pub fn on_close(self, reason: StreamCloseReason) {
        match self {
            ResponseObserver::Sse(mut state) => {
                let t_wall_ms = state.clock.wall_ms();
                let t_mono_ns = state.clock.mono_ns();
                if let Some(tail) = state.parser.finish() {
                    state.publisher.publish(Record::ResponseStreamEvent(ResponseStreamEvent {
                        id: state.id,
                        t_wall_ms,
                        t_mono_ns,
                        sequence: tail.sequence,
                        raw: tail.raw,
                        event: tail.event,
                        data: tail.data,
                        last_event_id: tail.id,
                        retry_ms: tail.retry_ms,
                        comment: tail.comment,
                    }));
                }
                state.publisher.publish(Record::ResponseStreamClosed(ResponseStreamClosed {
                    id: state.id,
                    t_wall_ms,
                    t_mono_ns,
                    reason,
                    message: None,
                    total_events: state.parser.total_events(),
                    total_bytes: state.parser.total_bytes(),
                }));
            }
            ResponseObserver::Capturing(state) => {
                let t_wall_ms = state.clock.wall_ms();
                let t_mono_ns = state.clock.mono_ns();
                let total_written = state.accumulator.total_written();
                let captured = state.accumulator.into_captured();
                let out = capture_body(
                    state.content_type.as_deref(),
                    state.content_encoding.as_deref(),
                    &captured,
                    total_written,
                    state.preview_bytes,
                );
                let (body, body_preview, body_encoding, truncated_bytes) = match &out {
                    Some(c) => (
                        Some(c.rendered.clone()),
                        c.preview.clone(),
                        Some(map_encoding(c.encoding)),
                        c.truncated_bytes,
                    ),
                    None => (None, None, None, 0),
                };
                self_publish_response_received(
                    &state.publisher,
                    state.id,
                    t_wall_ms,
                    t_mono_ns,
                    state.status,
                    state.headers,
                    body_preview,
                    body,
                    body_encoding,
                    truncated_bytes,
                    total_written,
                    state.start_mono_ns,
                );
                state.publisher.publish(Record::ResponseFinished(ResponseFinished {
                    id: state.id,
                    t_wall_ms,
                    t_mono_ns,
                    body_size: Some(total_written),
                }));
            }
            ResponseObserver::Finished => {}
        }
    }

    /// Step 4: the exchange failed after headers were already observed.
    pub fn on_failure(self, error_kind: impl Into<String>, message: Option<String>) {
        let (id, start_mono_ns, clock, publisher) = match self {
            ResponseObserver::Sse(s) => (s.id, s.start_mono_ns, s.clock, s.publisher),
            ResponseObserver::Capturing(s) => (s.id, s.start_mono_ns, s.clock, s.publisher),
            ResponseObserver::Finished => return,
        };
        let t_wall_ms = clock.wall_ms();
        let t_mono_ns = clock.mono_ns();
        publisher.publish(Record::RequestFailed(RequestFailed {
            id,
            t_wall_ms,
            t_mono_ns,
            error_kind: error_kind.into(),
            message,
            timings: Timings {
                total_ms: Some(total_ms(start_mono_ns, t_mono_ns)),
            },
        }));
    }
}

#[allow(clippy::too_many_arguments)]
fn self_publish_response_received(
    publisher: &Arc<dyn Publisher>,
    id: Id,
    t_wall_ms: i64,
    t_mono_ns: i64,
    status: u16,
    headers: Vec<HeaderEntry>,
    body_preview: Option<String>,
    body: Option<String>,
    body_encoding: Option<BodyEncoding>,
    body_truncated_bytes: u64,
    body_size: u64,
    _start_mono_ns: i64,
) {
    publisher.publish(Record::ResponseReceived(ResponseReceived {
        id,
        t_wall_ms,
        t_mono_ns,
        code: status,
        headers,
        body_preview,
        body,
        body_encoding,
        body_truncated_bytes,
        body_size: Some(body_size),
        timings: Timings {
            total_ms: Some(total_ms(_start_mono_ns, t_mono_ns)),
        },
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapo_clock::FakeClock;
    use std::sync::Mutex;

    struct RecordingPublisher {
        records: Mutex<Vec<Record>>,
    }

    impl RecordingPublisher {
        fn new() -> Self {
            Self {
                records: Mutex::new(Vec::new()),
            }
        }

        fn snapshot(&self) -> Vec<Record> {
            self.records.lock().unwrap().clone()
        }
    }

    impl Publisher for RecordingPublisher {
        fn publish(&self, record: Record) {
            self.records.lock().unwrap().push(record);
        }
    }

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(
                http::header::HeaderName::try_from(*k).unwrap(),
                http::header::HeaderValue::try_from(*v).unwrap(),
            );
        }
        map
    }

    #[test]
    fn plain_json_exchange_emits_request_then_response_then_finished() {
        let clock = Arc::new(FakeClock::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let interceptor =
            HttpInterceptor::new(clock.clone(), publisher.clone(), CaptureConfig::default());

        let req = interceptor.start_request(
            &Method::POST,
            "https://example.com/api",
            &headers(&[("content-type", "application/json")]),
            Some(b"{\"a\":1}"),
        );
        clock.advance_mono_ns(5_000_000);
        let mut resp = req.on_response_headers(
            StatusCode::OK,
            &headers(&[("content-type", "application/json")]),
        );
        resp.on_body_chunk(b"{\"ok\":true}");
        resp.on_close(StreamCloseReason::Completed);

        let records = publisher.snapshot();
        assert_eq!(records.len(), 3);
        match &records[0] {
            Record::RequestWillBeSent(r) => {
                assert_eq!(r.body.as_deref(), Some("{\"a\":1}"));
                assert_eq!(r.body_encoding, Some(BodyEncoding::None));
            }
            other => panic!("expected RequestWillBeSent, got {other:?}"),
        }
        match &records[1] {
            Record::ResponseReceived(r) => {
                assert_eq!(r.body.as_deref(), Some("{\"ok\":true}"));
                assert_eq!(r.code, 200);
                assert_eq!(r.timings.total_ms, Some(5.0));
            }
            other => panic!("expected ResponseReceived, got {other:?}"),
        }
        assert!(matches!(records[2], Record::ResponseFinished(_)));
    }

    #[test]
    fn head_response_skips_capture_and_emits_zero_size_finished() {
        let clock = Arc::new(FakeClock::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let interceptor =
            HttpInterceptor::new(clock, publisher.clone(), CaptureConfig::default());

        let req =
            interceptor.start_request(&Method::HEAD, "https://example.com", &HeaderMap::new(), None);
        let resp = req.on_response_headers(StatusCode::OK, &HeaderMap::new());
        resp.on_close(StreamCloseReason::Completed);

        let records = publisher.snapshot();
        assert_eq!(records.len(), 2);
        match &records[0] {
            Record::ResponseReceived(r) => assert_eq!(r.body_size, Some(0)),
            other => panic!("expected ResponseReceived, got {other:?}"),
        }
        match &records[1] {
            Record::ResponseFinished(r) => assert_eq!(r.body_size, Some(0)),
            other => panic!("expected ResponseFinished, got {other:?}"),
        }
    }

    #[test]
    fn status_204_is_bodyless_even_with_content_type() {
        let clock = Arc::new(FakeClock::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let interceptor =
            HttpInterceptor::new(clock, publisher.clone(), CaptureConfig::default());

        let req =
            interceptor.start_request(&Method::DELETE, "https://example.com", &HeaderMap::new(), None);
        let resp = req.on_response_headers(
            StatusCode::NO_CONTENT,
            &headers(&[("content-type", "application/json")]),
        );
        assert!(matches!(resp, ResponseObserver::Finished));
    }

    #[test]
    fn sse_response_emits_stream_events_then_closed_with_drain_then_close() {
        let clock = Arc::new(FakeClock::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let interceptor =
            HttpInterceptor::new(clock, publisher.clone(), CaptureConfig::default());

        let req = interceptor.start_request(
            &Method::GET,
            "https://example.com/events",
            &HeaderMap::new(),
            None,
        );
        let mut resp = req.on_response_headers(
            StatusCode::OK,
            &headers(&[("content-type", "text/event-stream")]),
        );
        resp.on_sse_chunk("data: a\n\n");
        resp.on_sse_chunk("data: b"); // no trailing blank line -- must surface on close
        resp.on_close(StreamCloseReason::Completed);

        let records = publisher.snapshot();
        // RequestWillBeSent, ResponseReceived(empty), stream event "a",
        // stream event "b" (drained on close), ResponseStreamClosed.
        assert_eq!(records.len(), 5);
        assert!(matches!(records[1], Record::ResponseReceived(_)));
        match &records[2] {
            Record::ResponseStreamEvent(e) => assert_eq!(e.data.as_deref(), Some("a")),
            other => panic!("expected ResponseStreamEvent, got {other:?}"),
        }
        match &records[3] {
            Record::ResponseStreamEvent(e) => assert_eq!(e.data.as_deref(), Some("b")),
            other => panic!("expected ResponseStreamEvent, got {other:?}"),
        }
        match &records[4] {
            Record::ResponseStreamClosed(c) => {
                assert_eq!(c.total_events, 2);
                assert_eq!(c.reason, StreamCloseReason::Completed);
            }
            other => panic!("expected ResponseStreamClosed, got {other:?}"),
        }
    }

    #[test]
    fn failure_before_headers_emits_request_failed_with_total_ms() {
        let clock = Arc::new(FakeClock::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let interceptor =
            HttpInterceptor::new(clock.clone(), publisher.clone(), CaptureConfig::default());

        let req =
            interceptor.start_request(&Method::GET, "https://example.com", &HeaderMap::new(), None);
        clock.advance_mono_ns(2_500_000);
        req.on_failure("ConnectionReset", Some("peer reset the connection".to_owned()));

        let records = publisher.snapshot();
        assert_eq!(records.len(), 2);
        match &records[1] {
            Record::RequestFailed(f) => {
                assert_eq!(f.error_kind, "ConnectionReset");
                assert_eq!(f.timings.total_ms, Some(2.5));
            }
            other => panic!("expected RequestFailed, got {other:?}"),
        }
    }

    #[test]
    fn failure_after_headers_emits_request_failed_not_response_finished() {
        let clock = Arc::new(FakeClock::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let interceptor =
            HttpInterceptor::new(clock, publisher.clone(), CaptureConfig::default());

        let req =
            interceptor.start_request(&Method::GET, "https://example.com", &HeaderMap::new(), None);
        let resp = req.on_response_headers(
            StatusCode::OK,
            &headers(&[("content-type", "text/plain")]),
        );
        resp.on_failure("Io", Some("connection dropped mid-body".to_owned()));

        let records = publisher.snapshot();
        assert_eq!(records.len(), 2);
        assert!(matches!(records[1], Record::RequestFailed(_)));
    }

    #[test]
    fn content_length_zero_header_marks_bodyless() {
        let clock = Arc::new(FakeClock::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let interceptor =
            HttpInterceptor::new(clock, publisher.clone(), CaptureConfig::default());

        let req =
            interceptor.start_request(&Method::POST, "https://example.com", &HeaderMap::new(), None);
        let resp = req.on_response_headers(
            StatusCode::OK,
            &headers(&[("content-length", "0")]),
        );
        assert!(matches!(resp, ResponseObserver::Finished));
    }
}
