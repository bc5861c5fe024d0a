//! FILENAME: core/insights-client/src/sequencer.rs
//! Request sequencing for overlapping fetches.
//!
//! Every fetch for a logical query takes a ticket. Only the newest ticket's
//! response may be applied; anything that resolves after a newer request was
//! issued is stale and gets dropped.

use std::sync::{Mutex, PoisonError};

use rustc_hash::FxHashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestTicket {
    query: String,
    seq: u64,
}

impl RequestTicket {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: Mutex<FxHashMap<String, u64>>,
}

impl RequestSequencer {
    pub fn new() -> Self {
        RequestSequencer::default()
    }

    /// Issues a ticket that supersedes every earlier ticket for `query`.
    pub fn issue(&self, query: &str) -> RequestTicket {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        let seq = latest.entry(query.to_string()).or_insert(0);
        *seq += 1;
        RequestTicket {
            query: query.to_string(),
            seq: *seq,
        }
    }

    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&ticket.query)
            .map_or(false, |seq| *seq == ticket.seq)
    }
}
