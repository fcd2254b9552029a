//! S1 (spec.md §8): a plain JSON POST/response exchange, end to end through
//! the facade crate -- interceptor -> records -> HAR export.

use std::sync::Arc;

use http::{HeaderMap, Method, StatusCode};
use snapo_core::{CaptureConfig, FakeClock, HttpInterceptor, Record, StreamCloseReason};
use snapo_test_utils::RecordingPublisher;

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
fn plain_json_exchange_produces_request_response_finished_and_one_har_entry() {
    let clock = Arc::new(FakeClock::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let interceptor = HttpInterceptor::new(clock.clone(), publisher.clone(), CaptureConfig::default());

    let req = interceptor.start_request(
        &Method::POST,
        "https://api.example.com/widgets",
        &headers(&[("content-type", "application/json")]),
        Some(b"{\"name\":\"thing\"}"),
    );
    clock.advance_mono_ns(8_000_000);
    let mut resp = req.on_response_headers(
        StatusCode::CREATED,
        &headers(&[("content-type", "application/json")]),
    );
    resp.on_body_chunk(b"{\"id\":1}");
    resp.on_close(StreamCloseReason::Completed);

    let records = publisher.snapshot();
    assert_eq!(records.len(), 3);
    assert!(matches!(records[0], Record::RequestWillBeSent(_)));
    assert!(matches!(records[1], Record::ResponseReceived(_)));
    assert!(matches!(records[2], Record::ResponseFinished(_)));

    let har = snapo_core::export_har(&records, &snapo_core::HarExportConfig::default());
    let entries = har["log"]["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["response"]["status"], 201);
    assert_eq!(entries[0]["response"]["content"]["text"], "{\"id\":1}");
}
