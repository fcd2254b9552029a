//! S6 (spec.md §8): a multipart/form-data request body is rendered
//! per-part (text parts decoded, binary parts base64'd with their mime
//! noted) rather than captured as a single opaque blob, through the real
//! `HttpInterceptor` dispatch path rather than calling the renderer
//! directly.

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

fn multipart_body(boundary: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"title\"\r\n\r\n");
    body.extend_from_slice(b"hello world\r\n");
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"x.bin\"\r\n\r\n",
    );
    body.push(0xFF);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

#[test]
fn multipart_request_body_is_rendered_per_part_not_opaque_blob() {
    let clock = Arc::new(FakeClock::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let interceptor = HttpInterceptor::new(clock, publisher.clone(), CaptureConfig::default());

    let boundary = "XYZ";
    let body = multipart_body(boundary);
    let _req = interceptor.start_request(
        &Method::POST,
        "https://example.com/upload",
        &headers(&[(
            "content-type",
            &format!("multipart/form-data; boundary={boundary}"),
        )]),
        Some(&body),
    );

    let records = publisher.snapshot();
    match &records[0] {
        Record::RequestWillBeSent(r) => {
            let rendered = r.body.as_deref().expect("multipart body must be captured");
            assert!(rendered.contains("Part name=\"title\"\nhello world"));
            assert!(rendered.contains("Part name=\"file\" filename=\"x.bin\" (application/octet-stream)"));
            assert_eq!(r.body_encoding, Some(snapo_core::BodyEncoding::None));
        }
        other => panic!("expected RequestWillBeSent, got {other:?}"),
    }
}

#[test]
fn multipart_response_body_is_rendered_per_part_through_capturing_dispatch() {
    let clock = Arc::new(FakeClock::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let interceptor = HttpInterceptor::new(clock, publisher.clone(), CaptureConfig::default());

    let req = interceptor.start_request(
        &Method::GET,
        "https://example.com/report",
        &HeaderMap::new(),
        None,
    );
    let boundary = "r3p0rt";
    let mut resp = req.on_response_headers(
        StatusCode::OK,
        &headers(&[(
            "content-type",
            &format!("multipart/form-data; boundary={boundary}"),
        )]),
    );
    resp.on_body_chunk(&multipart_body(boundary));
    resp.on_close(StreamCloseReason::Completed);

    let records = publisher.snapshot();
    match &records[1] {
        Record::ResponseReceived(r) => {
            let rendered = r.body.as_deref().expect("multipart body must be captured");
            assert!(rendered.contains("Part name=\"title\"\nhello world"));
            assert_eq!(r.body_encoding, Some(snapo_core::BodyEncoding::None));
        }
        other => panic!("expected ResponseReceived, got {other:?}"),
    }
}
