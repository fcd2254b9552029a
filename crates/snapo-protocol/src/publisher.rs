//! The out-of-band async sink the interception engine and the HAR exporter
//! consume. Fire-and-forget: the call must never block the host exchange.

use crate::record::Record;

/// Capability the host supplies so the interception engine can emit records
/// without owning the inspector channel's transport/framing/auth.
///
/// Implementations must not block: a saturated sink drops the record rather
/// than suspending the caller, per the concurrency model in the spec (§5).
pub trait Publisher: Send + Sync {
    fn publish(&self, record: Record);
}

/// A `Publisher` that discards everything, for call sites with no inspector
/// attached.
pub struct NullPublisher;

impl Publisher for NullPublisher {
    fn publish(&self, _record: Record) {}
}
