// snapo-protocol: the tagged-union event schema shared by every capture and
// processing component (HTTP, SSE, WebSocket, and device-log records), plus
// the filter configuration wire form and the publisher capability trait.

mod filter;
mod ids;
mod log;
mod publisher;
mod record;
mod warning;

pub use filter::{Clause, Color, Column, Condition, Filter, FilterAction, FilterConfig, QuickFilter};
pub use ids::{Id, IdGenerator};
pub use log::{parse_threadtime_line, LogEntry, LogField, LogLevel};
pub use publisher::{NullPublisher, Publisher};
pub use warning::CoreWarning;
pub use record::{
    find_header, BodyEncoding, CloseInitiator, HeaderEntry, Record, RequestFailed,
    RequestWillBeSent, ResponseFinished, ResponseReceived, ResponseStreamClosed,
    ResponseStreamEvent, StreamCloseReason, Timings, WebSocketCloseRequested, WebSocketFailed,
    WebSocketLifecycle, WebSocketMessage, WebSocketOpened, WsOpcode,
};
