//! DNF filter-configuration evaluator with cached regexes and per-field
//! highlight ranges (§4.6).
//!
//! Regex compilation goes through a [`RegexEngine`] capability trait (the
//! host-supplied regex engine per the core's capability list) rather than
//! hard-coding the `regex` crate at the call site, mirroring how
//! [`snapo_clock::Clock`] abstracts time. The cache itself -- keyed on
//! `(pattern, case_sensitive)` -- is owned by whoever evaluates entries (the
//! log-tab processor actor); this crate only defines the cache type and the
//! pure evaluation function.

use std::collections::HashMap;
use std::ops::Range;

use regex::Regex;
use snapo_protocol::{Color, CoreWarning, Filter, FilterAction, FilterConfig, LogEntry, LogField};

/// A compiled pattern, ready to search field text. Cheap to clone (the
/// underlying `regex::Regex` is itself `Arc`-backed).
#[derive(Debug, Clone)]
pub struct CompiledRegex(Regex);

impl CompiledRegex {
    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }

    /// Byte-offset match ranges within `text`.
    pub fn match_byte_ranges(&self, text: &str) -> Vec<Range<usize>> {
        self.0.find_iter(text).map(|m| m.range()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexError(pub String);

/// Capability the host supplies so filter-clause patterns compile through
/// whatever regex engine backs the inspector UI, per §1(ii).
pub trait RegexEngine: Send + Sync {
    fn compile(&self, pattern: &str, case_sensitive: bool) -> Result<CompiledRegex, RegexError>;
}

/// Default [`RegexEngine`] backed by the `regex` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRegexEngine;

impl RegexEngine for DefaultRegexEngine {
    fn compile(&self, pattern: &str, case_sensitive: bool) -> Result<CompiledRegex, RegexError> {
        let built = if case_sensitive {
            Regex::new(pattern)
        } else {
            regex::RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
        };
        built.map(CompiledRegex).map_err(|e| RegexError(e.to_string()))
    }
}

/// Owns the compiled-pattern cache ("owned by the log processor actor; no
/// external access", §5). Keyed on `(pattern, case_sensitive)`; a failed
/// compile is cached too so repeated evaluation of a broken pattern doesn't
/// retry the engine on every entry.
pub struct RegexCache<E: RegexEngine> {
    engine: E,
    entries: HashMap<(String, bool), Result<CompiledRegex, RegexError>>,
}

impl<E: RegexEngine> RegexCache<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            entries: HashMap::new(),
        }
    }

    /// Compiles `pattern` (or returns the cached result). Returns `None` and
    /// pushes a [`CoreWarning::RegexFailure`] onto `warnings` the first time
    /// a pattern fails to compile (cached failures don't re-warn).
    fn compile(
        &mut self,
        pattern: &str,
        case_sensitive: bool,
        warnings: &mut Vec<CoreWarning>,
    ) -> Option<CompiledRegex> {
        let key = (pattern.to_owned(), case_sensitive);
        let first_attempt = !self.entries.contains_key(&key);
        let result = self
            .entries
            .entry(key)
            .or_insert_with(|| self.engine.compile(pattern, case_sensitive))
            .clone();
        match result {
            Ok(re) => Some(re),
            Err(e) => {
                if first_attempt {
                    warnings.push(CoreWarning::RegexFailure {
                        pattern: pattern.to_owned(),
                        message: Some(e.0),
                    });
                }
                None
            }
        }
    }
}

/// A matched span within one log field, in UTF-16 code-unit offsets (the
/// spec mandates UTF-16 regardless of implementation language, to preserve
/// the original NSRange-based highlight semantics -- see §9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightRange {
    pub start: usize,
    pub end: usize,
    pub color: Color,
}

/// Result of evaluating one entry against a [`FilterConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvalOutcome {
    pub accepted: bool,
    pub row_color: Option<Color>,
    pub field_highlights: HashMap<LogField, Vec<HighlightRange>>,
}

fn byte_to_utf16_offset(s: &str, byte_idx: usize) -> usize {
    s[..byte_idx].encode_utf16().count()
}

fn push_highlight(
    out: &mut HashMap<LogField, Vec<HighlightRange>>,
    field: LogField,
    text: &str,
    ranges: &[Range<usize>],
    color: Color,
) {
    if ranges.is_empty() {
        return;
    }
    let entry = out.entry(field).or_default();
    for r in ranges {
        entry.push(HighlightRange {
            start: byte_to_utf16_offset(text, r.start),
            end: byte_to_utf16_offset(text, r.end),
            color,
        });
    }
}

const ROW_HIGHLIGHT_ALPHA: u8 = 20; // 8% of 255, rounded
const FIELD_HIGHLIGHT_ALPHA: u8 = 89; // 35% of 255, rounded

fn blend_row_colors(colors: &[Color]) -> Option<Color> {
    if colors.is_empty() {
        return None;
    }
    let n = colors.len() as u32;
    let (mut r, mut g, mut b) = (0u32, 0u32, 0u32);
    for c in colors {
        r += u32::from(c.r);
        g += u32::from(c.g);
        b += u32::from(c.b);
    }
    Some(Color::new(
        (r / n) as u8,
        (g / n) as u8,
        (b / n) as u8,
        ROW_HIGHLIGHT_ALPHA,
    ))
}

/// Evaluates whether `filter` passes against `entry`, returning the pass/fail
/// decision and, for each clause, the field(s) + byte ranges it matched (used
/// by the caller to build highlights only if `filter.highlight_enabled`).
fn evaluate_filter<E: RegexEngine>(
    filter: &Filter,
    entry: &LogEntry,
    cache: &mut RegexCache<E>,
    warnings: &mut Vec<CoreWarning>,
) -> Option<Vec<(LogField, Vec<Range<usize>>)>> {
    let mut matches_per_clause = Vec::with_capacity(filter.condition.len());

    for clause in &filter.condition {
        let Some(re) = cache.compile(&clause.pattern, clause.case_sensitive, warnings) else {
            // Failed to compile: clause is skipped (vacuously true), no
            // match data to contribute.
            continue;
        };

        if clause.field == LogField::Raw {
            let raw_text = LogField::Raw.extract(entry);
            let raw_ranges = re.match_byte_ranges(&raw_text);
            let raw_matched = !raw_ranges.is_empty();
            let effective = raw_matched != clause.inverted;
            if !effective {
                return None;
            }
            let mut per_field = vec![(LogField::Raw, raw_ranges)];
            for field in LogField::ALL {
                if field == LogField::Raw {
                    continue;
                }
                let text = field.extract(entry);
                per_field.push((field, re.match_byte_ranges(&text)));
            }
            matches_per_clause.push(per_field);
        } else {
            let text = clause.field.extract(entry);
            let ranges = re.match_byte_ranges(&text);
            let matched = !ranges.is_empty();
            let effective = matched != clause.inverted;
            if !effective {
                return None;
            }
            matches_per_clause.push(vec![(clause.field, ranges)]);
        }
    }

    Some(matches_per_clause.into_iter().flatten().collect())
}

/// Evaluates one entry against a configuration snapshot (§4.6). Deterministic:
/// the same `(cache state aside) config + entry` always yields the same
/// accept decision and field-range set (property 4).
pub fn evaluate<E: RegexEngine>(
    entry: &LogEntry,
    config: &FilterConfig,
    cache: &mut RegexCache<E>,
    warnings: &mut Vec<CoreWarning>,
) -> EvalOutcome {
    if let Some(quick) = &config.quick_filter {
        match cache.compile(&quick.pattern, false, warnings) {
            Some(re) => {
                if !re.is_match(&entry.raw) {
                    return EvalOutcome {
                        accepted: false,
                        ..Default::default()
                    };
                }
            }
            None => {
                // Quick filter pattern failed to compile: skip it (don't
                // reject on an unusable filter).
            }
        }
    }

    if config.columns.is_empty() {
        return EvalOutcome {
            accepted: true,
            row_color: None,
            field_highlights: HashMap::new(),
        };
    }

    let mut field_highlights: HashMap<LogField, Vec<HighlightRange>> = HashMap::new();
    let mut contributing_colors = Vec::new();

    for column in &config.columns {
        let mut column_satisfied = false;

        for filter in column {
            if !filter.enabled {
                continue;
            }
            let Some(field_matches) = evaluate_filter(filter, entry, cache, warnings) else {
                continue;
            };

            match filter.action {
                FilterAction::Exclude => {
                    return EvalOutcome {
                        accepted: false,
                        ..Default::default()
                    };
                }
                FilterAction::Include => column_satisfied = true,
                FilterAction::None => {}
            }

            if filter.highlight_enabled {
                contributing_colors.push(filter.color);
                for (field, ranges) in &field_matches {
                    let text = field.extract(entry);
                    push_highlight(&mut field_highlights, *field, &text, ranges, filter.color.with_alpha(FIELD_HIGHLIGHT_ALPHA));
                }
            }
        }

        if !column_satisfied {
            return EvalOutcome {
                accepted: false,
                ..Default::default()
            };
        }
    }

    EvalOutcome {
        accepted: true,
        row_color: blend_row_colors(&contributing_colors),
        field_highlights,
    }
}
