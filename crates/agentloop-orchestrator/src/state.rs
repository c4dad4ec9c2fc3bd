//! Durable snapshot of loop progress. Grounded on `orchestrator.py`'s
//! `LoopState`/`_save_state`/`_load_state`, with one deliberate improvement:
//! writes go through a temp file plus `fs::rename` (the pattern
//! `csa-memory::MemoryStore::rewrite_all` uses) instead of truncating the
//! live file in place, so a crash mid-write can never leave a half-written
//! state file behind.

use std::path::{Path, PathBuf};

use agentloop_core::{AppError, CycleRecord, Phase, ReviewVerdict, TokenUsage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const STATE_FILE_NAME: &str = ".agentloop_state.json";

/// The on-disk schema names `started_at` as `float-seconds` (a Unix epoch
/// timestamp) rather than an RFC3339 string, so it round-trips through a
/// plain JSON number the way the rest of the stable field set does.
mod unix_seconds {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value
            .map(|dt| dt.timestamp() as f64 + dt.timestamp_subsec_nanos() as f64 / 1e9)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let seconds: Option<f64> = Option::deserialize(deserializer)?;
        Ok(seconds.and_then(|secs| {
            DateTime::from_timestamp(secs.trunc() as i64, (secs.fract() * 1e9) as u32)
        }))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopState {
    pub cycle_count: u32,
    #[serde(rename = "implementer_usage")]
    pub total_implementer_usage: TokenUsage,
    #[serde(rename = "reviewer_usage")]
    pub total_reviewer_usage: TokenUsage,
    #[serde(rename = "history")]
    pub completeness_history: Vec<CycleRecord>,
    #[serde(rename = "paused")]
    pub is_paused: bool,
    #[serde(rename = "complete")]
    pub is_complete: bool,
    #[serde(rename = "started_at", with = "unix_seconds")]
    pub start_time: Option<DateTime<Utc>>,
    /// Not part of the distilled schema's stable field list; carried
    /// alongside it so `resume` can pick the Reviewer's prompt up
    /// mid-conversation instead of restarting from `None`.
    pub last_verdict: Option<ReviewVerdict>,
    pub phase: Phase,
    /// Likewise not in the stable field list; mirrors `max_commits`'s status
    /// in the limits surface (see `config.rs`).
    pub commit_count: u32,
}

impl Default for LoopState {
    fn default() -> Self {
        Self {
            cycle_count: 0,
            total_implementer_usage: TokenUsage::default(),
            total_reviewer_usage: TokenUsage::default(),
            completeness_history: Vec::new(),
            is_paused: false,
            is_complete: false,
            start_time: None,
            last_verdict: None,
            phase: Phase::Implementation,
            commit_count: 0,
        }
    }
}

impl LoopState {
    pub fn latest_score(&self) -> u8 {
        self.completeness_history
            .last()
            .map(|record| record.score)
            .unwrap_or(0)
    }

    /// Atomically writes this snapshot to `<workspace>/.agentloop_state.json`.
    pub fn save(&self, workspace: &Path) -> Result<(), AppError> {
        let path = workspace.join(STATE_FILE_NAME);
        let tmp_path = workspace.join(format!("{STATE_FILE_NAME}.tmp"));
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::StateCorrupt(e.to_string()))?;
        std::fs::write(&tmp_path, contents)?;
        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Loads the snapshot at `<workspace>/.agentloop_state.json`, or `None`
    /// if no snapshot exists yet. A corrupt file is a hard error rather than
    /// a silent reset, unlike the original's bare `except Exception: pass`.
    pub fn load(workspace: &Path) -> Result<Option<Self>, AppError> {
        let path = workspace.join(STATE_FILE_NAME);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        let state: Self =
            serde_json::from_str(&contents).map_err(|e| AppError::StateCorrupt(e.to_string()))?;
        Ok(Some(state))
    }

    pub fn state_path(workspace: &Path) -> PathBuf {
        workspace.join(STATE_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_state_file_loads_as_none() {
        let dir = TempDir::new().unwrap();
        assert!(LoopState::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut state = LoopState::default();
        state.cycle_count = 3;
        state.phase = Phase::Testing;
        state.completeness_history.push(CycleRecord {
            cycle_number: 3,
            score: 80,
            phase: Phase::Testing,
            timestamp: Utc::now(),
        });
        state.save(dir.path()).unwrap();

        let loaded = LoopState::load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.cycle_count, 3);
        assert_eq!(loaded.phase, Phase::Testing);
        assert_eq!(loaded.latest_score(), 80);
    }

    #[test]
    fn no_tmp_file_survives_a_successful_save() {
        let dir = TempDir::new().unwrap();
        LoopState::default().save(dir.path()).unwrap();
        assert!(!dir.path().join(format!("{STATE_FILE_NAME}.tmp")).exists());
    }

    #[test]
    fn corrupt_state_file_is_a_hard_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(STATE_FILE_NAME), "{ not json").unwrap();
        assert!(LoopState::load(dir.path()).is_err());
    }

    #[test]
    fn latest_score_is_zero_with_no_history() {
        assert_eq!(LoopState::default().latest_score(), 0);
    }

    /// The on-disk JSON keys are a stable external contract, independent of
    /// the Rust field names chosen for readability.
    #[test]
    fn serialized_json_uses_the_stable_field_names() {
        let mut state = LoopState::default();
        state.cycle_count = 2;
        state.is_paused = true;
        state.is_complete = false;
        state.start_time = Some(DateTime::from_timestamp(1_700_000_000, 500_000_000).unwrap());
        state.completeness_history.push(CycleRecord {
            cycle_number: 2,
            score: 61,
            phase: Phase::Implementation,
            timestamp: Utc::now(),
        });

        let value: serde_json::Value = serde_json::from_str(&serde_json::to_string(&state).unwrap()).unwrap();
        assert!(value.get("implementer_usage").is_some());
        assert!(value.get("reviewer_usage").is_some());
        assert!(value.get("history").is_some());
        assert_eq!(value["paused"], true);
        assert_eq!(value["complete"], false);
        assert_eq!(value["started_at"], 1_700_000_000.5);
        assert_eq!(value["history"][0]["cycle"], 2);
        assert!(value.get("total_implementer_usage").is_none());
        assert!(value.get("is_paused").is_none());
    }

    #[test]
    fn started_at_round_trips_through_float_seconds() {
        let mut state = LoopState::default();
        state.start_time = Some(DateTime::from_timestamp(1_700_000_000, 250_000_000).unwrap());
        let json = serde_json::to_string(&state).unwrap();
        let loaded: LoopState = serde_json::from_str(&json).unwrap();
        let restored = loaded.start_time.unwrap();
        assert_eq!(restored.timestamp(), 1_700_000_000);
        assert_eq!(restored.timestamp_subsec_millis(), 250);
    }
}
