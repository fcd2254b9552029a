//! Per-exchange HAR entry construction (§4.8).

use std::collections::HashSet;

use serde_json::{json, Value};
use snapo_body_capture::is_likely_base64;
use snapo_protocol::{find_header, BodyEncoding, HeaderEntry};

use crate::group::{HttpExchange, WsExchange, WsMessageDirection};
use crate::percent::decode as percent_decode;
use crate::HarExportConfig;

fn headers_json(headers: &[HeaderEntry], redact: &HashSet<String>) -> Vec<Value> {
    headers
        .iter()
        .filter(|h| !redact.iter().any(|r| r.eq_ignore_ascii_case(&h.name)))
        .map(|h| json!({ "name": h.name, "value": h.value }))
        .collect()
}

fn query_string_json(url: &str) -> Vec<Value> {
    let Some((_, query)) = url.split_once('?') else {
        return Vec::new();
    };
    query
        .split('&')
        .filter(|tok| !tok.is_empty())
        .map(|tok| match tok.split_once('=') {
            Some((k, v)) => json!({ "name": percent_decode(k), "value": percent_decode(v) }),
            None => json!({ "name": percent_decode(tok), "value": "" }),
        })
        .collect()
}

fn mime_type(content_type: Option<&str>) -> String {
    content_type
        .map(|ct| ct.split(';').next().unwrap_or("").trim().to_owned())
        .unwrap_or_default()
}

fn is_text_like_mime(mime: &str) -> bool {
    let ct = snapo_body_capture::parse_content_type(mime);
    snapo_body_capture::is_text_like(&ct)
}

fn iso8601(t_wall_ms: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(t_wall_ms)
        .unwrap_or_default()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn fixed_timings(wait_ms: Option<f64>) -> Value {
    json!({
        "blocked": -1,
        "dns": -1,
        "connect": -1,
        "send": 0,
        "wait": wait_ms.unwrap_or(-1.0),
        "receive": 0,
        "ssl": -1,
    })
}

/// `durationMs`: `endMono - startMono` when an end event is known, else
/// `endWall - startWall` clamped to >= 0, else `0` (no end event observed).
fn duration_ms(ex: &HttpExchange) -> f64 {
    let Some(req) = &ex.will_be_sent else {
        return 0.0;
    };
    if let Some(rf) = &ex.failed {
        return rf
            .timings
            .total_ms
            .unwrap_or_else(|| (rf.t_wall_ms - req.t_wall_ms).max(0) as f64);
    }
    if let Some(rr) = &ex.response_received {
        return rr
            .timings
            .total_ms
            .unwrap_or_else(|| (rr.t_wall_ms - req.t_wall_ms).max(0) as f64);
    }
    if let Some(sc) = &ex.stream_closed {
        return (sc.t_wall_ms - req.t_wall_ms).max(0) as f64;
    }
    if let Some(fin) = &ex.finished {
        return (fin.t_wall_ms - req.t_wall_ms).max(0) as f64;
    }
    0.0
}

/// Joins streamed SSE frames back into one body text for the HAR export: all
/// `ResponseStreamEvent.raw` values, in `(sequence, tWallMs)` order, each
/// stripped of trailing `\n`s and rejoined with a single `\n\n` separator.
fn joined_stream_text(ex: &HttpExchange) -> Option<String> {
    if ex.stream_events.is_empty() {
        return None;
    }
    let mut events = ex.stream_events.clone();
    events.sort_by_key(|e| (e.sequence, e.t_wall_ms));
    let parts: Vec<&str> = events.iter().map(|e| e.raw.trim_end_matches('\n')).collect();
    Some(format!("{}\n\n", parts.join("\n\n")))
}

fn content_json(ex: &HttpExchange, mime: &str) -> Value {
    let rr = &ex.response_received;
    let body_text = rr.as_ref().and_then(|r| r.body.clone()).or_else(|| joined_stream_text(ex));
    let explicit_size = rr.as_ref().and_then(|r| r.body_size);
    let body_encoding = rr.as_ref().and_then(|r| r.body_encoding);

    let is_base64 = match body_encoding {
        Some(BodyEncoding::Base64) => true,
        Some(BodyEncoding::None) => false,
        None => body_text
            .as_deref()
            .map(|t| is_likely_base64(t) && !is_text_like_mime(mime))
            .unwrap_or(false),
    };

    let size: i64 = if let Some(explicit) = explicit_size {
        explicit as i64
    } else if let Some(text) = &body_text {
        if is_base64 {
            base64::Engine::decode(&base64::engine::general_purpose::STANDARD, text)
                .map(|d| d.len() as i64)
                .unwrap_or(-1)
        } else {
            text.len() as i64
        }
    } else if let Some(sc) = &ex.stream_closed {
        sc.total_bytes as i64
    } else {
        -1
    };

    let mut content = json!({ "size": size, "mimeType": mime });
    if let Some(obj) = content.as_object_mut() {
        if let Some(text) = body_text {
            obj.insert("text".to_owned(), json!(text));
        }
        if is_base64 {
            obj.insert("encoding".to_owned(), json!("base64"));
        }
    }
    content
}

/// Builds one HAR `entries[]` element for an HTTP exchange. Returns `None`
/// if the exchange never produced a `RequestWillBeSent` (shouldn't happen
/// per the §3 invariant, but the exporter must not panic on a malformed
/// input snapshot).
pub fn http_entry(ex: &HttpExchange, config: &HarExportConfig) -> Option<Value> {
    let req = ex.will_be_sent.as_ref()?;
    let mime = mime_type(find_header(&req.headers, "content-type"));

    let mut post_data = Value::Null;
    if let Some(body) = &req.body {
        post_data = json!({
            "mimeType": mime_type(find_header(&req.headers, "content-type")),
            "text": body,
        });
    }

    let request = {
        let mut r = json!({
            "method": req.method,
            "url": req.url,
            "httpVersion": "HTTP/1.1",
            "headers": headers_json(&req.headers, &config.redact_request_headers),
            "queryString": query_string_json(&req.url),
            "cookies": [],
            "headersSize": -1,
            "bodySize": req.body_size.map(|s| s as i64).unwrap_or(-1),
        });
        if !post_data.is_null() {
            r.as_object_mut().unwrap().insert("postData".to_owned(), post_data);
        }
        r
    };

    let response = if let Some(rr) = &ex.response_received {
        let redirect_url = find_header(&rr.headers, "location").unwrap_or("").to_owned();
        json!({
            "status": rr.code,
            "statusText": http::StatusCode::from_u16(rr.code)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("")
                .to_owned(),
            "httpVersion": "HTTP/1.1",
            "headers": headers_json(&rr.headers, &config.redact_response_headers),
            "cookies": [],
            "content": content_json(ex, &mime_type(find_header(&rr.headers, "content-type"))),
            "redirectURL": redirect_url,
            "headersSize": -1,
            "bodySize": rr.body_size.map(|s| s as i64).unwrap_or(-1),
        })
    } else if let Some(rf) = &ex.failed {
        json!({
            "status": 0,
            "statusText": "",
            "httpVersion": "HTTP/1.1",
            "headers": [],
            "cookies": [],
            "content": { "size": -1, "mimeType": "" },
            "redirectURL": "",
            "headersSize": -1,
            "bodySize": -1,
            "_error": rf.message.clone().unwrap_or_else(|| rf.error_kind.clone()),
        })
    } else {
        json!({
            "status": 0,
            "statusText": "",
            "httpVersion": "HTTP/1.1",
            "headers": [],
            "cookies": [],
            "content": { "size": -1, "mimeType": "" },
            "redirectURL": "",
            "headersSize": -1,
            "bodySize": -1,
        })
    };

    Some(json!({
        "startedDateTime": iso8601(req.t_wall_ms),
        "time": duration_ms(ex),
        "request": request,
        "response": response,
        "cache": {},
        "timings": fixed_timings(None),
    }))
}

fn ws_opcode_numeric(opcode: snapo_protocol::WsOpcode) -> u8 {
    match opcode {
        snapo_protocol::WsOpcode::Text => 1,
        snapo_protocol::WsOpcode::Binary => 2,
    }
}

/// Builds one HAR `entries[]` element for a WebSocket exchange.
pub fn ws_entry(ex: &WsExchange) -> Option<Value> {
    let will_open = ex.will_open.as_ref()?;
    let open_wall_ms = ex.opened.as_ref().map(|o| o.t_wall_ms).unwrap_or(will_open.t_wall_ms);

    let close_wall_ms = ex
        .closed
        .as_ref()
        .map(|l| l.t_wall_ms)
        .or_else(|| ex.failed.as_ref().map(|f| f.t_wall_ms))
        .or_else(|| ex.cancelled.as_ref().map(|l| l.t_wall_ms))
        .or_else(|| ex.messages.last().map(|(_, m)| m.t_wall_ms))
        .unwrap_or(open_wall_ms);

    let duration_ms = (close_wall_ms - open_wall_ms).max(0) as f64;

    let messages: Vec<Value> = ex
        .messages
        .iter()
        .map(|(dir, m)| {
            json!({
                "type": match dir { WsMessageDirection::Send => "send", WsMessageDirection::Receive => "receive" },
                "time": m.t_wall_ms as f64 / 1000.0,
                "opcode": ws_opcode_numeric(m.opcode),
                "data": m.preview.clone().unwrap_or_default(),
            })
        })
        .collect();

    let status = ex.opened.as_ref().map(|o| o.code).unwrap_or(0);
    let headers: Vec<Value> = ex
        .opened
        .as_ref()
        .map(|o| o.headers.iter().map(|h| json!({ "name": h.name, "value": h.value })).collect())
        .unwrap_or_default();

    Some(json!({
        "startedDateTime": iso8601(will_open.t_wall_ms),
        "time": duration_ms,
        "request": {
            "method": "GET",
            "url": "",
            "httpVersion": "HTTP/1.1",
            "headers": [],
            "queryString": [],
            "cookies": [],
            "headersSize": -1,
            "bodySize": -1,
        },
        "response": {
            "status": status,
            "statusText": "",
            "httpVersion": "HTTP/1.1",
            "headers": headers,
            "cookies": [],
            "content": { "size": 0, "mimeType": "" },
            "redirectURL": "",
            "headersSize": -1,
            "bodySize": -1,
        },
        "cache": {},
        "timings": fixed_timings(Some(duration_ms)),
        "_resourceType": "websocket",
        "_webSocketMessages": messages,
    }))
}
