//! Master/slave joint coincidence.
//!
//! Declared coupled joints must stay spatially identical no matter what the
//! optimizer proposes. After filtering a candidate's edits, every slave line
//! is rebuilt from its master's coordinates using the slave's own column
//! widths and precisions.

use crate::deck::record::{read_coords, scan_fields};
use std::collections::BTreeMap;
use tracing::warn;

pub struct CouplingEnforcer {
    pairs: Vec<(String, String)>,
}

impl CouplingEnforcer {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Canonical joint keys of every master and slave in the declared pairs.
    pub fn required_keys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(self.pairs.len() * 2);
        for (master, slave) in &self.pairs {
            keys.push(format!("JOINT_{}", master));
            keys.push(format!("JOINT_{}", slave));
        }
        keys
    }

    /// Slave identifier coupled to `master_id`, if any.
    pub fn slave_of(&self, master_id: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(m, _)| m == master_id)
            .map(|(_, s)| s.as_str())
    }

    /// Rewrites slave entries in `edits` so they coincide with their master.
    /// `baseline` supplies current deck lines for keys the edit set lacks.
    /// A pair whose master cannot be found or parsed is skipped with a
    /// warning; its slave edit (if any) passes through unchanged.
    pub fn enforce(
        &self,
        edits: &mut BTreeMap<String, String>,
        baseline: &BTreeMap<String, String>,
    ) {
        for (master_id, slave_id) in &self.pairs {
            let master_key = format!("JOINT_{}", master_id);
            let slave_key = format!("JOINT_{}", slave_id);

            let master_line = edits
                .get(&master_key)
                .or_else(|| baseline.get(&master_key))
                .cloned();
            let slave_line = edits
                .get(&slave_key)
                .or_else(|| baseline.get(&slave_key))
                .cloned();

            let Some(master_line) = master_line else {
                warn!("Missing master joint {}; cannot enforce coupling", master_key);
                continue;
            };
            let Some(coords) = read_coords(&master_line) else {
                warn!("Failed to parse coordinates for {}; skipping coupling", master_key);
                continue;
            };

            // The master line doubles as a template for a slave that exists
            // nowhere else; its formatting then becomes the slave's.
            let template = slave_line.unwrap_or_else(|| master_line.clone());
            edits.insert(slave_key, rebuild_slave_line(&template, coords));
        }
    }
}

/// Rewrites the first three coordinate fields of `slave_line` to `coords`,
/// right to left, each through the slave's own field metadata.
pub fn rebuild_slave_line(slave_line: &str, coords: [f64; 3]) -> String {
    let slave_line = slave_line.trim_end();
    let fields = scan_fields(slave_line);
    if fields.len() < 3 {
        warn!("Fewer than 3 coordinates in slave joint line: {}", slave_line);
        return slave_line.to_string();
    }

    let mut out = slave_line.to_string();
    for i in (0..3).rev() {
        out = fields[i].splice(&out, coords[i]);
    }
    out
}
