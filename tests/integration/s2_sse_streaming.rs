//! S2 (spec.md §8): an SSE response split across chunk boundaries, with a
//! residual tail drained on close before `ResponseStreamClosed` is emitted.

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
fn sse_stream_drains_tail_before_closing_and_rejoins_into_har_text() {
    let clock = Arc::new(FakeClock::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let interceptor = HttpInterceptor::new(clock, publisher.clone(), CaptureConfig::default());

    let req = interceptor.start_request(
        &Method::GET,
        "https://api.example.com/stream",
        &HeaderMap::new(),
        None,
    );
    let mut resp = req.on_response_headers(
        StatusCode::OK,
        &headers(&[("content-type", "text/event-stream")]),
    );

    resp.on_sse_chunk("data: one\n");
    resp.on_sse_chunk("\ndata: two\n\n");
    resp.on_sse_chunk("data: three"); // no trailing blank line; surfaces on close
    resp.on_close(StreamCloseReason::Completed);

    let records = publisher.snapshot();
    // RequestWillBeSent, ResponseReceived, 3 stream events, ResponseStreamClosed.
    assert_eq!(records.len(), 6);
    let events: Vec<&str> = records
        .iter()
        .filter_map(|r| match r {
            Record::ResponseStreamEvent(e) => e.data.as_deref(),
            _ => None,
        })
        .collect();
    assert_eq!(events, vec!["one", "two", "three"]);

    match records.last().unwrap() {
        Record::ResponseStreamClosed(c) => {
            assert_eq!(c.total_events, 3);
            assert_eq!(c.reason, StreamCloseReason::Completed);
        }
        other => panic!("expected ResponseStreamClosed, got {other:?}"),
    }

    let har = snapo_core::export_har(&records, &snapo_core::HarExportConfig::default());
    let text = har["log"]["entries"][0]["response"]["content"]["text"].as_str().unwrap();
    assert_eq!(text, "data: one\n\ndata: two\n\ndata: three\n\n");
}
