//! Raw physical metrics to bounded, comparable scores.
//!
//! Every objective is clipped to a known physical interval and mapped
//! linearly onto [0, 1] with "lower transformed = better" for minimization
//! goals (inverted for maximization). The overall score is
//! `1 - mean(transformed)`, so it also lives in [0, 1] and higher is better.
//! Penalized (failed) candidates sit at exactly -1.0, strictly below every
//! genuine score, which keeps hypervolume reference points meaningful.

use crate::candidate::EvaluationResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};
use tracing::warn;

/// Sentinel magnitude for raw values in a penalty result. Far outside any
/// physical bound so arithmetic consumers (hypervolume against a fixed
/// reference point) always see penalized candidates as dominated.
pub const PENALTY_SENTINEL: f64 = 99_999.0;

/// `max_uc` reported in a penalty result.
pub const PENALTY_MAX_UC: f64 = 999.0;

#[derive(Display, EnumString, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[strum(serialize = "min")]
    Min,
    #[strum(serialize = "max")]
    Max,
}

pub struct ObjectiveTransformer {
    goals: Vec<String>,
    directions: BTreeMap<String, Direction>,
    baseline_weight_tonnes: Option<f64>,
    weight_ratio_bounds: [f64; 2],
    weight_bounds: [f64; 2],
}

impl ObjectiveTransformer {
    pub fn new(
        goals: Vec<String>,
        directions: Vec<Direction>,
        baseline_weight_tonnes: Option<f64>,
        weight_ratio_bounds: [f64; 2],
        weight_bounds: [f64; 2],
    ) -> Self {
        let directions = goals.iter().cloned().zip(directions).collect();
        // A non-positive baseline cannot anchor a ratio; treat it as unset
        // so the caller falls back to probing or absolute bounds.
        let baseline_weight_tonnes = baseline_weight_tonnes.filter(|w| {
            if *w <= 0.0 {
                warn!("Ignoring non-positive baseline weight {}", w);
            }
            *w > 0.0
        });
        Self {
            goals,
            directions,
            baseline_weight_tonnes,
            weight_ratio_bounds,
            weight_bounds,
        }
    }

    pub fn goals(&self) -> &[String] {
        &self.goals
    }

    pub fn baseline_weight(&self) -> Option<f64> {
        self.baseline_weight_tonnes
    }

    /// Installs the probed baseline weight; clamped away from zero so the
    /// ratio normalization can never divide by it degenerately.
    pub fn set_baseline_weight(&mut self, tonnes: f64) {
        self.baseline_weight_tonnes = Some(tonnes.max(1e-6));
    }

    fn direction_of(&self, goal: &str) -> Direction {
        self.directions.get(goal).copied().unwrap_or(Direction::Min)
    }

    /// Full scoring of one successful analysis: infeasibility penalty,
    /// transformation, overall score, feasibility flag.
    pub fn score(&self, raw: &BTreeMap<String, f64>, max_uc: f64) -> EvaluationResult {
        let penalized = self.apply_uc_penalty(raw, max_uc);
        let transformed = self.transform(&penalized);
        let overall_score = self.overall_score(&transformed);
        EvaluationResult {
            raw: raw.clone(),
            transformed,
            overall_score,
            is_feasible: max_uc <= 1.0,
            max_uc,
            error_reason: None,
        }
    }

    /// Infeasible designs (max UC above 1.0) are penalized through weight
    /// alone: `weight *= 1 + (max_uc - 1) * 5`. UC objectives keep their
    /// physical values so diagnostics stay readable; they are clipped at
    /// transform time instead.
    pub fn apply_uc_penalty(
        &self,
        raw: &BTreeMap<String, f64>,
        max_uc: f64,
    ) -> BTreeMap<String, f64> {
        let mut penalized = raw.clone();
        if max_uc > 1.0 {
            let factor = 1.0 + (max_uc - 1.0) * 5.0;
            warn!(
                "Infeasible design: max_uc={:.3}, applying weight penalty factor {:.2}",
                max_uc, factor
            );
            if self.direction_of("weight") == Direction::Min {
                if let Some(w) = penalized.get_mut("weight") {
                    *w *= factor;
                }
            }
        }
        penalized
    }

    /// Maps each goal into [0, 1]. Weight goes through the ratio-to-baseline
    /// path when a baseline is known, the absolute-bounds path otherwise;
    /// every other goal is a utilization ratio clipped to [0, 1].
    pub fn transform(&self, penalized: &BTreeMap<String, f64>) -> BTreeMap<String, f64> {
        let mut transformed = BTreeMap::new();

        for goal in &self.goals {
            let norm = if goal == "weight" {
                self.normalize_weight(penalized.get(goal).copied())
            } else {
                // UC objectives: the feasible interval [0, 1] is the bound.
                // Values above 1.0 clamp to the worst boundary rather than
                // extrapolating.
                penalized.get(goal).copied().unwrap_or(1.0).clamp(0.0, 1.0)
            };

            let directed = match self.direction_of(goal) {
                Direction::Min => norm,
                Direction::Max => 1.0 - norm,
            };
            transformed.insert(goal.clone(), directed.clamp(0.0, 1.0));
        }

        transformed
    }

    fn normalize_weight(&self, weight: Option<f64>) -> f64 {
        if let Some(baseline) = self.baseline_weight_tonnes {
            let [min_ratio, max_ratio] = self.weight_ratio_bounds;
            let ratio = (weight.unwrap_or(baseline) / baseline).clamp(min_ratio, max_ratio);
            let denom = (max_ratio - min_ratio).max(1e-8);
            (ratio - min_ratio) / denom
        } else {
            let [w_min, w_max] = self.weight_bounds;
            let clipped = weight.unwrap_or(w_max).clamp(w_min, w_max);
            (clipped - w_min) / (w_max - w_min)
        }
    }

    pub fn overall_score(&self, transformed: &BTreeMap<String, f64>) -> f64 {
        if transformed.is_empty() {
            return 0.0;
        }
        let mean = transformed.values().sum::<f64>() / transformed.len() as f64;
        1.0 - mean
    }

    /// Synthetic worst-case result used when any evaluation step fails:
    /// signed sentinel raws, all transformed values at the worst boundary,
    /// overall score pinned below the genuine [0, 1] range.
    pub fn penalty_result(&self, reason: impl Into<String>) -> EvaluationResult {
        let raw = self
            .goals
            .iter()
            .map(|g| {
                let v = match self.direction_of(g) {
                    Direction::Min => PENALTY_SENTINEL,
                    Direction::Max => -PENALTY_SENTINEL,
                };
                (g.clone(), v)
            })
            .collect();
        let transformed = self.goals.iter().map(|g| (g.clone(), 1.0)).collect();

        EvaluationResult {
            raw,
            transformed,
            overall_score: -1.0,
            is_feasible: false,
            max_uc: PENALTY_MAX_UC,
            error_reason: Some(reason.into()),
        }
    }
}
