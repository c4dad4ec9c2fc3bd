//! Where the `submit_review` tool deposits its verdict, so the Reviewer
//! harness can read it back after the tool-calling round completes.

use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct SubmittedReview {
    pub score: u8,
    pub instructions: String,
}

/// Cloneable handle shared between a `ToolRegistry` and the harness that
/// owns it. `submit_review` writes once per cycle; the harness drains it
/// after the backend call returns.
#[derive(Debug, Clone, Default)]
pub struct ReviewSink {
    inner: Arc<Mutex<Option<SubmittedReview>>>,
}

impl ReviewSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&self, score: u8, instructions: String) {
        let mut guard = self.inner.lock().expect("review sink mutex poisoned");
        *guard = Some(SubmittedReview { score, instructions });
    }

    /// Takes the submitted review, if any, leaving the sink empty for reuse.
    pub fn take(&self) -> Option<SubmittedReview> {
        self.inner.lock().expect("review sink mutex poisoned").take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_then_take_round_trips() {
        let sink = ReviewSink::new();
        sink.submit(80, "do more".to_string());
        let taken = sink.take().unwrap();
        assert_eq!(taken.score, 80);
        assert_eq!(taken.instructions, "do more");
    }

    #[test]
    fn take_without_submit_is_none() {
        let sink = ReviewSink::new();
        assert!(sink.take().is_none());
    }

    #[test]
    fn take_clears_for_next_cycle() {
        let sink = ReviewSink::new();
        sink.submit(10, "x".to_string());
        sink.take();
        assert!(sink.take().is_none());
    }
}
