//! Per-candidate evaluation orchestration.
//!
//! `RewardingSystem::evaluate` runs each candidate through the full cycle:
//! restore baseline, parse payload, filter to the variant's allow-list,
//! enforce coupling, apply edits, run the external analysis, extract
//! metrics, score. Any failing step turns into a penalty result with a
//! short machine-readable reason; nothing a candidate does can abort the
//! batch. Whenever the deck was actually written, the baseline is restored
//! again afterwards regardless of outcome, so no mutation leaks into the
//! next evaluation.

use crate::candidate::{extract_edit_blocks, Candidate, EvaluationResult, PayloadError};
use crate::config::{Config, ProblemVariant};
use crate::deck::coupling::CouplingEnforcer;
use crate::deck::workspace::Workspace;
use crate::external::{AnalysisRunner, MetricExtractor};
use crate::objective::ObjectiveTransformer;
use std::collections::{BTreeMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvalStats {
    pub invalid_num: usize,
    pub repeated_num: usize,
}

pub struct RewardingSystem {
    variant: ProblemVariant,
    workspace: Workspace,
    runner: Box<dyn AnalysisRunner>,
    metrics: Box<dyn MetricExtractor>,
    transformer: ObjectiveTransformer,
    enforcer: CouplingEnforcer,
    /// Joint keys the geometry variant accepts. Empty means any joint.
    allowed_joint_keys: HashSet<String>,
    project: PathBuf,
    timeout: Duration,
}

impl RewardingSystem {
    pub fn new(
        config: &Config,
        workspace: Workspace,
        runner: Box<dyn AnalysisRunner>,
        metrics: Box<dyn MetricExtractor>,
    ) -> Self {
        let enforcer = CouplingEnforcer::new(config.problem.get_coupled());

        let mut allowed_joint_keys = HashSet::new();
        for prefix in config.problem.get_optimizable() {
            if let Some(id) = prefix.strip_prefix("JOINT ") {
                let id = id.trim();
                allowed_joint_keys.insert(format!("JOINT_{}", id));
                if let Some(slave) = enforcer.slave_of(id) {
                    allowed_joint_keys.insert(format!("JOINT_{}", slave));
                }
            }
        }
        for key in enforcer.required_keys() {
            allowed_joint_keys.insert(key);
        }

        let mut transformer = ObjectiveTransformer::new(
            config.objectives.get_goals(),
            config.objectives.get_directions(),
            config.objectives.baseline_weight_tonnes,
            config.objectives.get_weight_ratio_bounds(),
            config.objectives.get_weight_bounds(),
        );

        let project = workspace
            .deck_path()
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        // Prefer the configured baseline weight; otherwise probe the result
        // database once. Failure here just means absolute bounds are used.
        if transformer.baseline_weight().is_none() {
            let summary = metrics.weight_summary(&project);
            if summary.is_success() {
                transformer.set_baseline_weight(summary.total_weight_tonnes);
                info!(
                    "Baseline weight for normalization: {:.3} tonnes",
                    summary.total_weight_tonnes
                );
            } else {
                warn!("Failed to read baseline weight for normalization");
            }
        }

        Self {
            variant: config.problem.variant,
            workspace,
            runner,
            metrics,
            transformer,
            enforcer,
            allowed_joint_keys,
            project,
            timeout: Duration::from_secs(config.problem.analysis_timeout_secs),
        }
    }

    pub fn transformer(&self) -> &ObjectiveTransformer {
        &self.transformer
    }

    /// Evaluates every candidate in order, fully, one at a time. Each gets
    /// exactly one result: genuine metrics or a well-formed penalty.
    pub fn evaluate(&mut self, items: &mut [Candidate]) -> EvalStats {
        let mut stats = EvalStats::default();

        for item in items.iter_mut() {
            let mut wrote = false;
            let payload = item.payload.clone();

            let outcome = catch_unwind(AssertUnwindSafe(|| {
                self.evaluate_one(&payload, &mut wrote)
            }))
            .unwrap_or_else(|panic| {
                error!("Unhandled panic during candidate evaluation");
                Err(format!("Critical_Eval_Error: {}", panic_message(&panic)))
            });

            if wrote {
                if let Err(e) = self.workspace.restore_baseline() {
                    error!("Failed to restore baseline after evaluation: {}", e);
                }
            }

            match outcome {
                Ok(result) => item.assign_result(result),
                Err(reason) => {
                    item.assign_result(self.transformer.penalty_result(&reason));
                    stats.invalid_num += 1;
                }
            }
        }

        stats
    }

    /// One full evaluation cycle. `wrote` flips to true the moment the live
    /// deck is modified so the caller can restore unconditionally.
    fn evaluate_one(
        &mut self,
        payload: &str,
        wrote: &mut bool,
    ) -> Result<EvaluationResult, String> {
        if let Err(e) = self.workspace.restore_baseline() {
            error!("Failed to restore baseline before evaluation: {}", e);
            return Err("Baseline_Restore_Fail".to_string());
        }

        let blocks = extract_edit_blocks(payload).map_err(|e| match e {
            PayloadError::Json(err) => {
                warn!("Could not parse candidate JSON: {}", err);
                "Invalid JSON format".to_string()
            }
            PayloadError::Structure => "Invalid candidate structure".to_string(),
        })?;

        let mut filtered = self.filter_blocks(blocks);
        if filtered.is_empty() {
            return Err("No valid blocks".to_string());
        }

        if self.variant == ProblemVariant::Geometry && !self.enforcer.is_empty() {
            let missing: Vec<String> = self
                .enforcer
                .required_keys()
                .into_iter()
                .filter(|k| !filtered.contains_key(k))
                .collect();
            let baseline = self
                .workspace
                .extract_by_keys(&missing)
                .unwrap_or_else(|e| {
                    warn!("Could not load baseline joint lines: {}", e);
                    BTreeMap::new()
                });
            self.enforcer.enforce(&mut filtered, &baseline);
        }

        if let Err(e) = self.workspace.replace_records(&filtered) {
            warn!("Deck modification failed: {}", e);
            if let Err(cleanup) = self.workspace.restore_baseline() {
                error!(
                    "Failed to restore baseline after modification failure: {}",
                    cleanup
                );
            }
            return Err("Deck_Modify_Fail".to_string());
        }
        *wrote = true;

        let run = self.runner.run(&self.project, self.timeout);
        if !run.success {
            let msg = run.error.unwrap_or_else(|| "Unknown analysis error".to_string());
            warn!("Analysis run failed: {}", msg);
            return Err(format!("Analysis_Run_Fail: {}", truncate(&msg, 100)));
        }

        let weight = self.metrics.weight_summary(&self.project);
        let uc = self.metrics.uc_summary(&self.project);
        if !(weight.is_success() && uc.is_success()) {
            warn!("Metric extraction failed after successful analysis run");
            let detail = format!(
                "W:{}|UC:{}",
                weight.error.as_deref().unwrap_or("OK"),
                uc.message.as_deref().unwrap_or("OK"),
            );
            return Err(format!("Metric_Extraction_Fail: {}", detail));
        }

        let mut raw = BTreeMap::new();
        raw.insert("weight".to_string(), weight.total_weight_tonnes);
        raw.insert("axial_uc_max".to_string(), uc.axial_uc_max);
        raw.insert("bending_uc_max".to_string(), uc.bending_uc_max);

        Ok(self.transformer.score(&raw, uc.max_uc))
    }

    /// Drops edits outside the variant's allow-list. Geometry accepts joint
    /// keys (restricted to the declared optimizable joints and their coupled
    /// partners when any are declared); section accepts group and plate
    /// group keys.
    fn filter_blocks(&self, blocks: BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut filtered = BTreeMap::new();
        for (key, value) in blocks {
            let keep = match self.variant {
                ProblemVariant::Geometry => {
                    if !key.starts_with("JOINT_") {
                        warn!("Filtering non-joint edit '{}' from geometry candidate", key);
                        false
                    } else if !self.allowed_joint_keys.is_empty()
                        && !self.allowed_joint_keys.contains(&key)
                    {
                        warn!("Filtering undeclared joint edit '{}'", key);
                        false
                    } else {
                        true
                    }
                }
                ProblemVariant::Section => {
                    let ok = key.starts_with("GRUP_") || key.starts_with("PGRUP_");
                    if !ok {
                        warn!("Filtering non-section edit '{}' from section candidate", key);
                    }
                    ok
                }
            };
            if keep {
                filtered.insert(key, value);
            }
        }
        filtered
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
