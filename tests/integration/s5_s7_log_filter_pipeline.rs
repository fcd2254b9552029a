//! S5/S7 (spec.md §8): an include filter on tag plus a quick filter,
//! exercised both through the bare DNF evaluator and through the full
//! log-tab actor (ring buffer + coalesced flush) behind the facade crate.

use std::sync::Arc;
use std::time::Duration;

use snapo_core::{
    parse_threadtime_line, Color, Filter, FilterAction, FilterConfig, Id, LogTabConfig,
    TabUpdate, TabUpdateSink,
};

fn line(id: u64, level: &str, tag: &str, message: &str) -> snapo_core::LogEntry {
    parse_threadtime_line(
        Id(id),
        &format!("07-30 10:00:00.000 100 200 {level} {tag}: {message}"),
    )
}

fn include_tag_filter(tag: &str) -> FilterConfig {
    FilterConfig {
        columns: vec![vec![Filter {
            id: "f1".to_owned(),
            enabled: true,
            action: FilterAction::Include,
            highlight_enabled: true,
            color: Color::new(0, 255, 0, 255),
            condition: vec![snapo_core::Clause {
                field: snapo_core::LogField::Tag,
                pattern: tag.to_owned(),
                inverted: false,
                case_sensitive: false,
            }],
        }]],
        quick_filter: None,
    }
}

struct RecordingSink {
    updates: std::sync::Mutex<Vec<TabUpdate>>,
}

impl RecordingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self { updates: std::sync::Mutex::new(Vec::new()) })
    }

    fn snapshot(&self) -> Vec<TabUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

impl TabUpdateSink for RecordingSink {
    fn send(&self, update: TabUpdate) {
        self.updates.lock().unwrap().push(update);
    }
}

#[test]
fn bare_evaluator_includes_only_matching_tag_and_highlights_it() {
    use snapo_core::{DefaultRegexEngine, RegexCache};

    let config = include_tag_filter("Auth");
    let mut cache = RegexCache::new(DefaultRegexEngine);
    let mut warnings = Vec::new();

    let matching = line(1, "I", "Auth", "login ok");
    let outcome = snapo_log_filter::evaluate(&matching, &config, &mut cache, &mut warnings);
    assert!(outcome.accepted);
    assert!(outcome.field_highlights.contains_key(&snapo_core::LogField::Tag));

    let other = line(2, "I", "Network", "connected");
    let outcome = snapo_log_filter::evaluate(&other, &config, &mut cache, &mut warnings);
    assert!(!outcome.accepted);
    assert!(warnings.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn log_tab_actor_filters_and_coalesces_enqueued_entries() {
    let sink = RecordingSink::new();
    let handle = snapo_core::spawn_log_tab(LogTabConfig::default(), sink.clone());

    handle.enqueue(line(1, "I", "Auth", "login ok")).await;
    handle.enqueue(line(2, "I", "Network", "connected")).await;
    handle.enqueue(line(3, "W", "Auth", "retry")).await;
    tokio::time::sleep(Duration::from_millis(80)).await;

    handle.refresh_configuration(include_tag_filter("Auth")).await;
    tokio::time::sleep(Duration::from_millis(80)).await;

    let last = sink.snapshot().into_iter().last().unwrap();
    assert_eq!(last.rendered.len(), 2);
    assert!(last.rendered.iter().all(|r| r.entry.tag == "Auth"));
}
