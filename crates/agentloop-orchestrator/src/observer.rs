//! Progress callbacks. Grounded on `orchestrator.py`'s `on_status_change`/
//! `on_cycle_complete` constructor callbacks, expressed as a trait so a
//! caller can plug in a CLI printer, a log sink, or nothing at all.
//!
//! Calls are best-effort: a panic or slow observer must never interrupt a
//! cycle, so the controller treats these as synchronous, non-blocking
//! notifications rather than anything it awaits or retries.

use crate::controller::CycleOutcome;

pub trait Observer: Send + Sync {
    fn on_status_change(&self, _status: &str) {}
    fn on_cycle_complete(&self, _outcome: &CycleOutcome) {}
}

/// The default observer: discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl Observer for NullObserver {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_observer_accepts_calls_without_panicking() {
        let observer = NullObserver;
        observer.on_status_change("anything");
    }
}
