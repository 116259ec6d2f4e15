use crate::objective::Direction;
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

#[derive(Args, Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[command(flatten)]
    pub problem: ProblemParams,
    #[command(flatten)]
    pub objectives: ObjectiveParams,
    #[command(flatten)]
    pub mutation: MutationParams,
}

/// Which family of deck records a problem variant is allowed to touch.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProblemVariant {
    /// Joint coordinates only.
    #[default]
    Geometry,
    /// Member group / plate group sections only.
    Section,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProblemParams {
    /// Directory holding the live deck file and its backups.
    #[arg(long, default_value = ".")]
    pub project_path: String,

    #[arg(long, value_enum, default_value_t = ProblemVariant::Geometry)]
    pub variant: ProblemVariant,

    #[arg(long, default_value_t = 20)]
    pub pop_size: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Comma-separated record prefixes the optimizer may edit,
    /// e.g. "JOINT 101,JOINT 102" or "GRUP LG6,PGRUP P01".
    #[arg(long, default_value = "")]
    pub optimizable: String,

    /// Comma-separated master:slave joint pairs, e.g. "101:201,102:202".
    #[arg(long, default_value = "")]
    pub coupled: String,

    #[arg(long, default_value_t = 300)]
    pub analysis_timeout_secs: u64,
}

impl Default for ProblemParams {
    fn default() -> Self {
        Self {
            project_path: ".".to_string(),
            variant: ProblemVariant::Geometry,
            pop_size: 20,
            seed: 42,
            optimizable: String::new(),
            coupled: String::new(),
            analysis_timeout_secs: 300,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveParams {
    #[arg(long, default_value = "weight,axial_uc_max,bending_uc_max")]
    pub goals: String,

    #[arg(long, default_value = "min,min,min")]
    pub directions: String,

    /// Reference weight for ratio normalization. When absent, it is probed
    /// once from the metric extractor; if that also fails, absolute
    /// weight bounds are used instead.
    #[arg(long)]
    pub baseline_weight_tonnes: Option<f64>,

    #[arg(long, default_value = "0.5,2.0")]
    pub weight_ratio_bounds: String,

    #[arg(long, default_value = "50.0,5000.0")]
    pub weight_bounds: String,
}

impl Default for ObjectiveParams {
    fn default() -> Self {
        Self {
            goals: "weight,axial_uc_max,bending_uc_max".to_string(),
            directions: "min,min,min".to_string(),
            baseline_weight_tonnes: None,
            weight_ratio_bounds: "0.5,2.0".to_string(),
            weight_bounds: "50.0,5000.0".to_string(),
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationParams {
    /// Largest coordinate shift (deck length units) a single joint
    /// mutation may apply. Steps are quantized to 0.01.
    #[arg(long, default_value_t = 2.0)]
    pub joint_amplitude: f64,

    /// Largest number of positions an I-beam section may move within
    /// its size library per mutation.
    #[arg(long, default_value_t = 3)]
    pub max_section_step: usize,
}

impl Default for MutationParams {
    fn default() -> Self {
        Self {
            joint_amplitude: 2.0,
            max_section_step: 3,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        let content = fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("❌ Failed to read config file: {}", e));

        serde_json::from_str(&content)
            .unwrap_or_else(|e| panic!("❌ Failed to parse config JSON: {}", e))
    }
}

impl ProblemParams {
    pub fn get_optimizable(&self) -> Vec<String> {
        split_list(&self.optimizable)
    }

    /// Parses "master:slave" pairs; malformed entries are skipped with a
    /// warning rather than aborting startup.
    pub fn get_coupled(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for part in self.coupled.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match part.split_once(':') {
                Some((m, s)) if !m.trim().is_empty() && !s.trim().is_empty() => {
                    pairs.push((m.trim().to_string(), s.trim().to_string()));
                }
                _ => warn!("Ignoring malformed coupled pair '{}'", part),
            }
        }
        pairs
    }
}

impl ObjectiveParams {
    pub fn get_goals(&self) -> Vec<String> {
        split_list(&self.goals)
    }

    pub fn get_directions(&self) -> Vec<Direction> {
        let dirs: Vec<Direction> = self
            .directions
            .split(',')
            .map(|s| {
                Direction::from_str(s.trim())
                    .unwrap_or_else(|_| panic!("Invalid direction '{}' (want min|max)", s.trim()))
            })
            .collect();
        let goals = self.get_goals();
        if dirs.len() != goals.len() {
            panic!(
                "--directions requires {} values to match --goals",
                goals.len()
            );
        }
        dirs
    }

    pub fn get_weight_ratio_bounds(&self) -> [f64; 2] {
        parse_bounds(&self.weight_ratio_bounds, [0.5, 2.0], "weight_ratio_bounds")
    }

    pub fn get_weight_bounds(&self) -> [f64; 2] {
        parse_bounds(&self.weight_bounds, [50.0, 5000.0], "weight_bounds")
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Bounds fall back to their defaults when malformed or degenerate
/// (min >= max); a bad bound must not take down a whole experiment run.
fn parse_bounds(s: &str, default: [f64; 2], name: &str) -> [f64; 2] {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() == 2 {
        if let (Ok(lo), Ok(hi)) = (parts[0].parse::<f64>(), parts[1].parse::<f64>()) {
            if lo < hi {
                return [lo, hi];
            }
        }
    }
    warn!("Invalid {} '{}'; using default {:?}", name, s, default);
    default
}
