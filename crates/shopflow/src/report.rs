//! Run reports: per-scenario outcomes and their aggregation.

use crate::driver::BrowserEngine;
use crate::result::FlowResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Phase of a scenario execution in which a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Clearing the store
    Reset,
    /// Starting the browser
    Launch,
    /// Executing a step
    Step,
    /// Closing the browser
    Release,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Reset => "reset",
            Self::Launch => "launch",
            Self::Step => "step",
            Self::Release => "release",
        })
    }
}

/// Why a scenario failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    pub stage: Stage,
    /// Zero-based index of the failing step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_index: Option<usize>,
    /// Step description, e.g. `click .SubmitButton`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
    /// Error class, see [`crate::FlowError::kind`]
    pub kind: String,
    pub message: String,
}

impl fmt::Display for FailureDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.stage)?;
        if let Some(index) = self.step_index {
            write!(f, " #{index}")?;
        }
        write!(f, "] {}", self.message)
    }
}

/// Result of one scenario on one engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub scenario_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    pub engine: BrowserEngine,
    pub passed: bool,
    /// Steps that completed before the end or the failure
    pub steps_completed: usize,
    pub steps_total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureDetail>,
    pub duration_ms: u64,
    /// Snapshot files written during the run
    #[serde(default)]
    pub snapshots: Vec<PathBuf>,
}

impl ScenarioOutcome {
    /// Outcome for a scenario that has not run yet
    #[must_use]
    pub fn new(scenario_id: impl Into<String>, plan: Option<String>, engine: BrowserEngine) -> Self {
        Self {
            scenario_id: scenario_id.into(),
            plan,
            engine,
            passed: false,
            steps_completed: 0,
            steps_total: 0,
            failure: None,
            duration_ms: 0,
            snapshots: Vec::new(),
        }
    }

    /// `scenario_id [engine]`, used in logs and output
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} [{}]", self.scenario_id, self.engine)
    }
}

/// Every outcome of one harness run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<ScenarioOutcome>,
    pub duration_ms: u64,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    /// Empty report stamped with a fresh run id
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            outcomes: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Record an outcome
    pub fn push(&mut self, outcome: ScenarioOutcome) {
        self.outcomes.push(outcome);
    }

    /// Check if all scenarios passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    /// Count passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    /// Count failed scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.passed).count()
    }

    /// Get total scenario count
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Get failed scenarios
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioOutcome> {
        self.outcomes.iter().filter(|o| !o.passed).collect()
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> FlowResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON report to `path`, creating parent directories
    pub fn write_json(&self, path: &Path) -> FlowResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
