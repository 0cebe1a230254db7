//! Compile-metrics sink boundary.
//!
//! Compiler logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through CompileEvent and CompileSink.
//!
//! This module is the only allowed bridge between compilation logic
//! and the thread-local metrics state.
use crate::obs::metrics::{self, EventReport};
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn CompileSink>> = const { RefCell::new(None) };
}

///
/// SkipReason
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SkipReason {
    /// Sequence element was neither a named map nor a positional array.
    UnkeyedScalar,
    /// Positional array too short, or its head was not a field-path string.
    ShortClause,
    /// Logical-group marker whose second element was not a sequence.
    GroupBody,
    /// Operator slot held a non-string in a clause of three or more parts.
    OperatorName,
    /// Named value or clause value had an unrepresentable shape.
    ValueShape,
    /// Operator rejected the value arity (e.g. `between` without a pair).
    OperatorArity,
    /// Macro applied by name that no registry entry matches.
    MacroMissing,
}

///
/// CompileEvent
///

#[derive(Clone, Copy, Debug)]
pub enum CompileEvent {
    JoinEmitted,
    JoinDeduplicated,
    ParamBound,
    NodeSkipped { reason: SkipReason },
    OperatorFallback,
}

///
/// CompileSink
///
/// Receives every compile event on the current thread while installed.
/// Used by tests and embedders that want per-run event streams instead of
/// aggregate counters.
///

pub trait CompileSink {
    fn record(&self, event: CompileEvent);
}

/// Route an event to the installed sink, or to the aggregate counters.
pub(crate) fn emit(event: CompileEvent) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // - `ptr` was produced from a valid `&dyn CompileSink` in `with_sink`.
        // - `with_sink` always restores the previous pointer before
        //   returning, including unwind paths via `Guard::drop`.
        // - `emit` is synchronous and never stores `ptr` beyond this call.
        unsafe { (&*ptr).record(event) };
    } else {
        metrics::record(event);
    }
}

/// Run `f` with `sink` installed as this thread's event sink.
pub fn with_sink<R>(sink: &dyn CompileSink, f: impl FnOnce() -> R) -> R {
    struct Guard(Option<*const dyn CompileSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // - `sink_ptr` is installed only for this dynamic scope.
    // - `Guard` restores the previous slot on all exits, including panic.
    // - `emit` only dereferences synchronously and never persists the
    //   pointer.
    let sink_ptr =
        unsafe { std::mem::transmute::<&dyn CompileSink, *const dyn CompileSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| {
        let mut slot = cell.borrow_mut();
        slot.replace(sink_ptr)
    });
    let _guard = Guard(prev);

    f()
}

/// Snapshot this thread's aggregate counters.
#[must_use]
pub fn metrics_report() -> EventReport {
    metrics::report()
}

/// Zero this thread's aggregate counters.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Recorder(RefCell<Vec<CompileEvent>>);

    impl CompileSink for Recorder {
        fn record(&self, event: CompileEvent) {
            self.0.borrow_mut().push(event);
        }
    }

    #[test]
    fn sink_override_captures_events() {
        let recorder = Recorder(RefCell::new(Vec::new()));
        with_sink(&recorder, || {
            emit(CompileEvent::JoinEmitted);
            emit(CompileEvent::OperatorFallback);
        });

        let events = recorder.0.borrow();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], CompileEvent::JoinEmitted));
        assert!(matches!(events[1], CompileEvent::OperatorFallback));
    }

    #[test]
    fn counters_accumulate_without_sink() {
        metrics_reset_all();
        emit(CompileEvent::ParamBound);
        emit(CompileEvent::ParamBound);
        emit(CompileEvent::NodeSkipped {
            reason: SkipReason::ShortClause,
        });

        let report = metrics_report();
        assert_eq!(report.params_bound, 2);
        assert_eq!(report.nodes_skipped, 1);
    }
}
