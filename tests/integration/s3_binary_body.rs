//! S3 (spec.md §8): a binary response body is captured as base64 and the HAR
//! export marks `content.encoding` accordingly.

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
fn binary_png_response_is_base64_encoded_in_record_and_har() {
    let clock = Arc::new(FakeClock::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let interceptor = HttpInterceptor::new(clock, publisher.clone(), CaptureConfig::default());

    let req = interceptor.start_request(
        &Method::GET,
        "https://cdn.example.com/logo.png",
        &HeaderMap::new(),
        None,
    );
    let mut resp = req.on_response_headers(
        StatusCode::OK,
        &headers(&[("content-type", "image/png")]),
    );
    let png_bytes: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3, 4];
    resp.on_body_chunk(png_bytes);
    resp.on_close(StreamCloseReason::Completed);

    let records = publisher.snapshot();
    match &records[1] {
        Record::ResponseReceived(r) => {
            assert_eq!(r.body_encoding, Some(snapo_core::BodyEncoding::Base64));
            assert_eq!(r.body_size, Some(png_bytes.len() as u64));
        }
        other => panic!("expected ResponseReceived, got {other:?}"),
    }

    let har = snapo_core::export_har(&records, &snapo_core::HarExportConfig::default());
    let content = &har["log"]["entries"][0]["response"]["content"];
    assert_eq!(content["encoding"], "base64");
    assert_eq!(content["mimeType"], "image/png");
}
