//! Root facade: re-exports the public surface of every `snapo-*` crate so a
//! host application depends on one crate instead of wiring each component
//! itself. Cross-crate integration tests covering the §8 literal scenarios
//! live under `tests/integration/`.

pub use snapo_clock as clock;
pub use snapo_protocol as protocol;
pub use snapo_ring_buffer as ring_buffer;
pub use snapo_body_capture as body_capture;
pub use snapo_sse as sse;
pub use snapo_http as http_interceptor;
pub use snapo_ws as ws_interceptor;
pub use snapo_log_filter as log_filter;
pub use snapo_log_tab as log_tab;
pub use snapo_har as har;

pub use snapo_clock::{Clock, FakeClock, SystemClock};
pub use snapo_har::{default_filename, export_har, HarExportConfig};
pub use snapo_http::{CaptureConfig, HttpInterceptor, RequestObserver, ResponseObserver};
pub use snapo_log_filter::{DefaultRegexEngine, EvalOutcome, HighlightRange, RegexCache, RegexEngine};
pub use snapo_log_tab::{spawn as spawn_log_tab, LogTabConfig, LogTabHandle, TabUpdate, TabUpdateSink};
pub use snapo_protocol::{
    find_header, parse_threadtime_line, BodyEncoding, Clause, CloseInitiator, Color, Column,
    CoreWarning, Filter, FilterAction, FilterConfig, HeaderEntry, Id, IdGenerator, LogEntry,
    LogField, LogLevel, NullPublisher, Publisher, QuickFilter, Record, RequestFailed,
    RequestWillBeSent, ResponseFinished, ResponseReceived, ResponseStreamClosed,
    ResponseStreamEvent, StreamCloseReason, Timings, WebSocketCloseRequested, WebSocketFailed,
    WebSocketLifecycle, WebSocketMessage, WebSocketOpened, WsOpcode,
};
pub use snapo_ws::{WebSocketInterceptor, WsCaptureConfig, WsObserver, WsPayload};
