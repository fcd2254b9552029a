//! Device log entries and the threadtime-format parser.
//!
//! Threadtime format (the adb logcat wire format this core accepts):
//! `MM-DD HH:MM:SS.mmm PID TID L TAG: MSG`.

use crate::ids::Id;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    #[serde(rename = "V")]
    Verbose,
    #[serde(rename = "D")]
    Debug,
    #[serde(rename = "I")]
    Info,
    #[serde(rename = "W")]
    Warn,
    #[serde(rename = "E")]
    Error,
    #[serde(rename = "F")]
    Fatal,
    #[serde(rename = "A")]
    Assert,
    #[serde(rename = "?")]
    Unknown,
}

impl LogLevel {
    fn from_char(c: char) -> LogLevel {
        match c {
            'V' => LogLevel::Verbose,
            'D' => LogLevel::Debug,
            'I' => LogLevel::Info,
            'W' => LogLevel::Warn,
            'E' => LogLevel::Error,
            'F' => LogLevel::Fatal,
            'A' => LogLevel::Assert,
            _ => LogLevel::Unknown,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            LogLevel::Verbose => 'V',
            LogLevel::Debug => 'D',
            LogLevel::Info => 'I',
            LogLevel::Warn => 'W',
            LogLevel::Error => 'E',
            LogLevel::Fatal => 'F',
            LogLevel::Assert => 'A',
            LogLevel::Unknown => '?',
        }
    }
}

/// A single device log entry, either parsed from a threadtime line or a stub
/// wrapping an unparseable one (`tag="unparsed"`, `message=raw`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: Id,
    pub timestamp_string: String,
    /// Resolved wall-clock milliseconds; `None` when the entry has no
    /// reference year to resolve `MM-DD` against (always `None` for stubs).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tid: Option<u32>,
    pub level: LogLevel,
    pub tag: String,
    pub message: String,
    pub raw: String,
}

/// Fields a filter clause can target; `Raw` is synthetic and reprojects
/// through every other field during highlight evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogField {
    Timestamp,
    Pid,
    Tid,
    Level,
    Tag,
    Message,
    Raw,
}

impl LogField {
    /// The non-synthetic fields, i.e. every field except [`LogField::Raw`].
    pub const ALL: [LogField; 6] = [
        LogField::Timestamp,
        LogField::Pid,
        LogField::Tid,
        LogField::Level,
        LogField::Tag,
        LogField::Message,
    ];

    /// The field's value rendered as the string form highlight ranges are
    /// measured over (UTF-16 code units, per the spec's highlight-range rule).
    pub fn extract(&self, entry: &LogEntry) -> String {
        match self {
            LogField::Timestamp => entry.timestamp_string.clone(),
            LogField::Pid => entry.pid.map(|p| p.to_string()).unwrap_or_default(),
            LogField::Tid => entry.tid.map(|t| t.to_string()).unwrap_or_default(),
            LogField::Level => entry.level.as_char().to_string(),
            LogField::Tag => entry.tag.clone(),
            LogField::Message => entry.message.clone(),
            LogField::Raw => entry.raw.clone(),
        }
    }
}

fn threadtime_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?x)
            ^\s*
            (?P<month>\d{2})-(?P<day>\d{2})\s+
            (?P<time>\d{2}:\d{2}:\d{2}\.\d{3})\s+
            (?P<pid>\d+)\s+
            (?P<tid>\d+)\s+
            (?P<level>[A-Z])\s+
            (?P<tag>.+?):\s+
            (?P<msg>.*)
            $",
        )
        .expect("threadtime regex is a fixed, known-valid pattern")
    })
}

/// Parses one line of threadtime-format logcat output. Lines that don't
/// match yield a stub entry (`tag = "unparsed"`, `message = raw`) rather
/// than an error -- malformed lines must never stop the stream.
pub fn parse_threadtime_line(id: Id, raw: &str) -> LogEntry {
    if let Some(caps) = threadtime_regex().captures(raw) {
        let timestamp_string = format!("{}-{} {}", &caps["month"], &caps["day"], &caps["time"]);
        return LogEntry {
            id,
            timestamp_string,
            timestamp: None,
            pid: caps["pid"].parse().ok(),
            tid: caps["tid"].parse().ok(),
            level: LogLevel::from_char(caps["level"].chars().next().unwrap_or('?')),
            tag: caps["tag"].to_owned(),
            message: caps["msg"].to_owned(),
            raw: raw.to_owned(),
        };
    }
    LogEntry {
        id,
        timestamp_string: String::new(),
        timestamp: None,
        pid: None,
        tid: None,
        level: LogLevel::Unknown,
        tag: "unparsed".to_owned(),
        message: raw.to_owned(),
        raw: raw.to_owned(),
    }
}
