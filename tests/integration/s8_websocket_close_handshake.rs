//! S8 (spec.md §8): a client-initiated WebSocket close handshake --
//! `WebSocketCloseRequested` (client) must precede `WebSocketClosing` then
//! `WebSocketClosed`, and the whole connection becomes one HAR entry.

use std::sync::Arc;

use snapo_core::{CloseInitiator, FakeClock, Record, WebSocketInterceptor, WsCaptureConfig, WsPayload};
use snapo_test_utils::RecordingPublisher;

#[test]
fn client_close_handshake_orders_records_and_exports_as_one_entry() {
    let clock = Arc::new(FakeClock::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let interceptor = WebSocketInterceptor::new(clock, publisher.clone(), WsCaptureConfig::default());

    let ws = interceptor.new_websocket();
    ws.on_opened(101, Vec::new());
    ws.on_message_sent(WsPayload::Text("ping"), Some(true));
    ws.on_message_received(WsPayload::Text("pong"));
    ws.on_close_requested(1000, Some("bye".to_owned()), true);
    ws.on_closing();
    ws.on_closed();

    let records = publisher.snapshot();
    assert!(matches!(records[0], Record::WebSocketWillOpen(_)));
    assert!(matches!(records[1], Record::WebSocketOpened(_)));
    assert!(matches!(records[2], Record::WebSocketMessageSent(_)));
    assert!(matches!(records[3], Record::WebSocketMessageReceived(_)));
    match &records[4] {
        Record::WebSocketCloseRequested(c) => {
            assert_eq!(c.initiated, CloseInitiator::Client);
            assert_eq!(c.code, 1000);
        }
        other => panic!("expected WebSocketCloseRequested, got {other:?}"),
    }
    assert!(matches!(records[5], Record::WebSocketClosing(_)));
    assert!(matches!(records[6], Record::WebSocketClosed(_)));

    let har = snapo_core::export_har(&records, &snapo_core::HarExportConfig::default());
    let entries = har["log"]["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    let messages = entries[0]["_webSocketMessages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["type"], "send");
    assert_eq!(messages[1]["type"], "receive");
}
