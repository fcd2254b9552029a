//! HAR 1.2 export (§4.8): turns a flat slice of [`snapo_protocol::Record`]s
//! into a `log.har` document, one entry per HTTP exchange or WebSocket
//! connection, sorted by `startedDateTime`.

mod entries;
mod group;
mod percent;

use std::collections::HashSet;

use serde_json::json;
use snapo_protocol::Record;

/// Which headers get dropped from the exported document, and how the
/// `creator` block is filled in. The default redaction list matches what a
/// browser devtools HAR export withholds by convention: credentials headers
/// never leave the machine that captured them.
#[derive(Debug, Clone)]
pub struct HarExportConfig {
    pub redact_request_headers: HashSet<String>,
    pub redact_response_headers: HashSet<String>,
    pub creator_name: String,
    pub creator_version: String,
}

impl Default for HarExportConfig {
    fn default() -> Self {
        Self {
            redact_request_headers: ["authorization", "cookie"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            redact_response_headers: ["set-cookie"].into_iter().map(str::to_owned).collect(),
            creator_name: "snapo".to_owned(),
            creator_version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

/// Builds the full HAR JSON document for `records`. Entries are sorted by
/// `startedDateTime` ascending; HTTP exchanges with no `RequestWillBeSent`
/// (shouldn't occur, but a HAR exporter must be robust to a malformed
/// snapshot) are silently skipped rather than panicking.
pub fn export_har(records: &[Record], config: &HarExportConfig) -> serde_json::Value {
    let (http_exchanges, ws_exchanges) = group::group(records);

    let mut entries: Vec<serde_json::Value> = http_exchanges
        .iter()
        .filter_map(|ex| entries::http_entry(ex, config))
        .chain(ws_exchanges.iter().filter_map(entries::ws_entry))
        .collect();

    entries.sort_by(|a, b| {
        let a_time = a["startedDateTime"].as_str().unwrap_or("");
        let b_time = b["startedDateTime"].as_str().unwrap_or("");
        a_time.cmp(b_time)
    });

    json!({
        "log": {
            "version": "1.2",
            "creator": {
                "name": config.creator_name,
                "version": config.creator_version,
            },
            "entries": entries,
        }
    })
}

/// A reasonable default filename for a one-shot export: `snapo-request-<timestamp>.har`
/// for a single entry, `snapo-requests-<count>-<timestamp>.har` otherwise. `now_wall_ms`
/// is host-supplied so this stays deterministic and testable.
pub fn default_filename(entry_count: usize, now_wall_ms: i64) -> String {
    let stamp = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(now_wall_ms)
        .unwrap_or_default()
        .format("%Y%m%d-%H%M%S");
    if entry_count == 1 {
        format!("snapo-request-{stamp}.har")
    } else {
        format!("snapo-requests-{entry_count}-{stamp}.har")
    }
}
