//! Shared test doubles for the `snapo-*` crates: a recording [`Publisher`]
//! and the [`snapo_clock::FakeClock`] re-export every crate's test module
//! otherwise constructs by hand.

use std::sync::Mutex;

pub use snapo_clock::FakeClock;
use snapo_protocol::{Publisher, Record};

/// A [`Publisher`] that appends every record it receives to an in-memory
/// log, for assertions against emission order and field values.
#[derive(Default)]
pub struct RecordingPublisher {
    records: Mutex<Vec<Record>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clone of everything published so far, in publish order.
    pub fn snapshot(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&self, record: Record) {
        self.records.lock().unwrap().push(record);
    }
}
