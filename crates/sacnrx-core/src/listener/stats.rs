use std::collections::BTreeMap;

use serde::Serialize;

use crate::protocols::sacn::RejectKind;
use crate::router::RouteOutcome;

/// Running totals since the listener was created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListenerStats {
    pub datagrams: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub rejected_by_kind: BTreeMap<RejectKind, u64>,
    /// Valid frames for a universe nobody listens to.
    pub unrouted: u64,
    pub preview_skipped: u64,
    pub stream_terminated: u64,
    pub deliveries: u64,
    pub insufficient_data: u64,
    pub timeouts: u64,
    pub streams_started: u64,
    pub streams_stopped: u64,
}

impl ListenerStats {
    pub(crate) fn record_reject(&mut self, kind: RejectKind) {
        self.rejected += 1;
        *self.rejected_by_kind.entry(kind).or_default() += 1;
    }

    pub(crate) fn record_route(&mut self, outcome: &RouteOutcome) {
        self.accepted += 1;
        if outcome.matched == 0 {
            self.unrouted += 1;
        }
        if outcome.preview_skipped {
            self.preview_skipped += 1;
        }
        if outcome.terminated > 0 {
            self.stream_terminated += 1;
        }
        self.deliveries += outcome.delivered as u64;
        self.insufficient_data += outcome.insufficient_data as u64;
    }
}

/// What one call to `tick` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub datagrams: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub delivered: usize,
    pub timeouts: usize,
}
