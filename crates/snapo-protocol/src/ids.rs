use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// An opaque identifier, unique within the process lifetime.
///
/// Generated by [`IdGenerator`]; requests, WebSockets, log entries, and
/// captured bodies each mint one. Serializes as a plain integer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(pub u64);

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mints fresh, strictly increasing [`Id`]s. Shared via `Arc` across the
/// interceptors and the log-tab processor that all mint ids from the same
/// process-wide sequence.
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next(&self) -> Id {
        Id(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_strictly_increasing() {
        let gen = IdGenerator::new();
        let a = gen.next();
        let b = gen.next();
        let c = gen.next();
        assert!(a.0 < b.0);
        assert!(b.0 < c.0);
    }

    #[test]
    fn id_serializes_as_plain_integer() {
        let id = Id(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");
    }
}
