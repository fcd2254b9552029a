//! Filter configuration wire form.
//!
//! Structurally opaque beyond equality to this crate: an ordered list of
//! columns, each an ordered list of filters, each an ordered list of
//! clauses. Columns combine with AND, filters within a column with OR,
//! clauses within a filter with AND -- i.e. DNF (disjunction of conjunctions
//! read bottom-up, conjunction of disjunctions read top-down).

use crate::log::LogField;
use serde::{Deserialize, Serialize};

/// A single RGBA color, 0-255 per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// This color with `alpha` substituted for the existing alpha channel.
    pub fn with_alpha(self, alpha: u8) -> Self {
        Color { a: alpha, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterAction {
    Include,
    Exclude,
    None,
}

/// One predicate within a filter's condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clause {
    pub field: LogField,
    pub pattern: String,
    pub inverted: bool,
    pub case_sensitive: bool,
}

/// An ordered list of clauses, ANDed together. No effective clauses (empty
/// list) is vacuously true.
pub type Condition = Vec<Clause>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub id: String,
    pub enabled: bool,
    pub action: FilterAction,
    pub highlight_enabled: bool,
    pub color: Color,
    pub condition: Condition,
}

/// A column: filters within it combine with OR.
pub type Column = Vec<Filter>;

/// Single case-insensitive substring/regex applied to `raw` before filter
/// evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickFilter {
    pub pattern: String,
}

/// The immutable configuration snapshot the evaluator is given: columns
/// combine with AND, an optional quick filter gates everything upstream of
/// the DNF evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    pub columns: Vec<Column>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_filter: Option<QuickFilter>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            columns: Vec::new(),
            quick_filter: None,
        }
    }
}
