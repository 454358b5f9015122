//! Paginated retrieval from the remote event store.
//!
//! The store is an external collaborator: pulsedeck issues time-range
//! plus exact-match filtered reads, paged by offset/limit, and hands
//! the aggregation engine one fully materialized, order-preserved
//! slice. The engine itself never sees pages.

mod client;

pub use client::FetchClient;

use crate::types::EventRecord;

/// Result of fetching a range of events.
///
/// Partial outcomes are first-class: a failed page halts pagination but
/// earlier pages are still delivered, and hitting the row cap raises
/// `truncated` instead of failing. Callers presenting aggregates built
/// from a partial outcome must surface that state alongside them.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Records in ascending time order, reassembled in page order
    pub records: Vec<EventRecord>,
    /// The hard row cap was hit before the range was exhausted
    pub truncated: bool,
    /// Verbatim message of the first failed page, if any
    pub error: Option<String>,
}

impl FetchOutcome {
    /// Whether aggregates over this slice must be labeled partial.
    pub fn is_partial(&self) -> bool {
        self.truncated || self.error.is_some()
    }
}
