pub mod candidate;
pub mod config;
pub mod deck;
pub mod error;
pub mod evaluator;
pub mod external;
pub mod objective;
pub mod population;

pub use crate::candidate::{Candidate, EvaluationResult};
pub use crate::error::{JacketForgeError, JfResult};
pub use crate::evaluator::{EvalStats, RewardingSystem};
