//! Thread-local aggregate counters for compile events.

use crate::obs::sink::CompileEvent;
use std::cell::Cell;

thread_local! {
    static COUNTERS: Cell<EventReport> = const { Cell::new(EventReport::new()) };
}

///
/// EventReport
///
/// Point-in-time snapshot of this thread's compile counters.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EventReport {
    pub joins_emitted: u64,
    pub joins_deduplicated: u64,
    pub params_bound: u64,
    pub nodes_skipped: u64,
    pub operator_fallbacks: u64,
}

impl EventReport {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            joins_emitted: 0,
            joins_deduplicated: 0,
            params_bound: 0,
            nodes_skipped: 0,
            operator_fallbacks: 0,
        }
    }
}

pub(crate) fn record(event: CompileEvent) {
    COUNTERS.with(|cell| {
        let mut report = cell.get();
        match event {
            CompileEvent::JoinEmitted => report.joins_emitted += 1,
            CompileEvent::JoinDeduplicated => report.joins_deduplicated += 1,
            CompileEvent::ParamBound => report.params_bound += 1,
            CompileEvent::NodeSkipped { .. } => report.nodes_skipped += 1,
            CompileEvent::OperatorFallback => report.operator_fallbacks += 1,
        }
        cell.set(report);
    });
}

pub(crate) fn report() -> EventReport {
    COUNTERS.with(Cell::get)
}

pub(crate) fn reset_all() {
    COUNTERS.with(|cell| cell.set(EventReport::new()));
}
