//! Non-fatal error kinds surfaced by the core (§7). None of these aborts the
//! pipeline; they are reported alongside normal output, never propagated as
//! a terminal `Result::Err`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CoreWarning {
    #[error("stream warning: {0}")]
    StreamWarning(String),

    #[error("regex failure for pattern {pattern:?}: {message:?}")]
    RegexFailure {
        pattern: String,
        message: Option<String>,
    },

    /// The log ring buffer evicted `n` entries this cycle; surfaced to the
    /// user once `n > 100`.
    #[error("log backlog dropped {0} entries")]
    BacklogDropped(u64),

    /// A batch of `n > 10` entries was processed in one cycle.
    #[error("slow processing: batch of {0}")]
    SlowProcessing(usize),

    /// A detected violation of the ordering invariants; self-healing (the
    /// caller performs a full recompute) but still surfaced.
    #[error("state inconsistency: {0}")]
    StateInconsistency(String),
}
