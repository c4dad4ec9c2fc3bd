//! Drives the implement/review cycle to completion: persists state between
//! cycles, decides when to commit, and reports progress to an observer.
//! Grounded on `orchestrator.py`'s `Orchestrator`.

pub mod commit_policy;
pub mod controller;
pub mod observer;
pub mod state;

pub use controller::{Controller, CycleOutcome, StatusReport};
pub use observer::{NullObserver, Observer};
pub use state::LoopState;
