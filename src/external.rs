//! Collaborator seams: the external structural-analysis executable and the
//! metric extractor that reads its result database. Both are trait objects
//! so the evaluation pipeline can run against test doubles; the real
//! implementations live with the experiment harness, not in this crate.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const STATUS_SUCCESS: &str = "success";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl RunOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightSummary {
    pub status: String,
    pub total_weight_tonnes: f64,
    pub error: Option<String>,
}

impl WeightSummary {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UcSummary {
    pub status: String,
    pub max_uc: f64,
    pub axial_uc_max: f64,
    pub bending_uc_max: f64,
    pub message: Option<String>,
}

impl UcSummary {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// Blocking invocation of the structural-analysis tool against the live
/// deck under `project`. A timeout is an ordinary failed outcome; no
/// cancellation or retry happens at this level.
pub trait AnalysisRunner {
    fn run(&self, project: &Path, timeout: Duration) -> RunOutcome;
}

/// Reads physical results out of the analysis tool's output for `project`.
pub trait MetricExtractor {
    fn weight_summary(&self, project: &Path) -> WeightSummary;
    fn uc_summary(&self, project: &Path) -> UcSummary;
}
