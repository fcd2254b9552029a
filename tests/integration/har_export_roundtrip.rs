//! Exercises `export_har`/`default_filename` against a small multi-exchange
//! capture spanning a JSON request and a WebSocket connection, and asserts
//! the result parses back as valid HAR 1.2 JSON.

use std::sync::Arc;

use http::{HeaderMap, Method, StatusCode};
use snapo_core::{
    CaptureConfig, FakeClock, HttpInterceptor, StreamCloseReason, WebSocketInterceptor,
    WsCaptureConfig, WsPayload,
};
use snapo_test_utils::RecordingPublisher;

#[test]
fn multi_exchange_capture_exports_as_valid_har_document() {
    let clock = Arc::new(FakeClock::new());
    let publisher = Arc::new(RecordingPublisher::new());

    let http_interceptor =
        HttpInterceptor::new(clock.clone(), publisher.clone(), CaptureConfig::default());
    let req = http_interceptor.start_request(
        &Method::GET,
        "https://api.example.com/health",
        &HeaderMap::new(),
        None,
    );
    let resp = req.on_response_headers(StatusCode::OK, &HeaderMap::new());
    resp.on_close(StreamCloseReason::Completed);

    let ws_interceptor =
        WebSocketInterceptor::new(clock, publisher.clone(), WsCaptureConfig::default());
    let ws = ws_interceptor.new_websocket();
    ws.on_opened(101, Vec::new());
    ws.on_message_sent(WsPayload::Text("hi"), None);
    ws.on_closed();

    let records = publisher.snapshot();
    let config = snapo_core::HarExportConfig::default();
    let doc = snapo_core::export_har(&records, &config);

    assert_eq!(doc["log"]["version"], "1.2");
    assert_eq!(doc["log"]["creator"]["name"], "snapo");
    let entries = doc["log"]["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);

    let reparsed: serde_json::Value =
        serde_json::from_str(&serde_json::to_string(&doc).unwrap()).unwrap();
    assert_eq!(reparsed, doc);

    let name = snapo_core::default_filename(entries.len(), 1_700_000_000_000);
    assert_eq!(name, "snapo-requests-2-20231114-221320.har");
}
