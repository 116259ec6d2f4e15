//! Seeded initial-population generation.
//!
//! Member 0 is always the unmodified baseline edit set. Further members are
//! built by mutating a random subset of the optimizable records, propagating
//! coupled-joint constraints, and rejecting exact duplicates by canonical
//! payload digest. Generation is deterministic for a fixed seed and gives up
//! after `10 * pop_size` attempts rather than looping forever.

use crate::candidate::{canonical_payload, payload_digest};
use crate::config::Config;
use crate::deck::coupling::CouplingEnforcer;
use crate::deck::mutator::mutate_record;
use crate::deck::record::RecordKey;
use crate::deck::workspace::Workspace;
use crate::error::{JacketForgeError, JfResult};
use fastrand::Rng;
use std::collections::HashSet;
use tracing::{info, warn};

pub fn generate_initial_population(
    config: &Config,
    workspace: &Workspace,
    seed: u64,
) -> JfResult<Vec<String>> {
    let mut rng = Rng::with_seed(seed);

    let pop_size = config.problem.pop_size;
    let optimizable = config.problem.get_optimizable();
    if optimizable.is_empty() {
        return Err(JacketForgeError::Config(
            "no optimizable records declared; cannot generate a population".to_string(),
        ));
    }

    let enforcer = CouplingEnforcer::new(config.problem.get_coupled());

    // Baseline lines for everything the optimizer may touch, plus the
    // coupled slaves it must keep in sync.
    let mut prefixes = optimizable.clone();
    for (_, slave) in enforcer.pairs() {
        let slave_prefix = format!("JOINT {}", slave);
        if !prefixes.contains(&slave_prefix) {
            prefixes.push(slave_prefix);
        }
    }
    let baseline_lines = workspace.extract_records(&prefixes)?;
    if baseline_lines.is_empty() {
        return Err(JacketForgeError::Validation(
            "could not load any baseline records from the deck".to_string(),
        ));
    }
    info!(
        "Loaded {} baseline record(s) for population seeding",
        baseline_lines.len()
    );

    // Canonical key + keyword for each mutable record.
    let mutable: Vec<RecordKey> = optimizable
        .iter()
        .filter_map(|p| RecordKey::from_prefix(p).ok())
        .filter(|k| baseline_lines.contains_key(&k.to_string()))
        .collect();
    if mutable.is_empty() {
        return Err(JacketForgeError::Validation(
            "none of the declared optimizable records exist in the deck".to_string(),
        ));
    }

    let mut population = Vec::with_capacity(pop_size);
    let mut seen = HashSet::new();

    let baseline_payload = canonical_payload(&baseline_lines);
    seen.insert(payload_digest(&baseline_payload));
    population.push(baseline_payload);

    let max_tries = pop_size * 10;
    let mut tries = 0;

    while population.len() < pop_size && tries < max_tries {
        tries += 1;

        let mut candidate = baseline_lines.clone();
        let num_mods = rng.usize(1..=(mutable.len() / 2).max(1));

        let mut order: Vec<usize> = (0..mutable.len()).collect();
        rng.shuffle(&mut order);

        for &idx in order.iter().take(num_mods) {
            let key = &mutable[idx];
            let key_text = key.to_string();
            if let Some(line) = candidate.get(&key_text) {
                let mutated = mutate_record(&mut rng, key.keyword, line, &config.mutation);
                candidate.insert(key_text, mutated);
            }
        }

        enforcer.enforce(&mut candidate, &baseline_lines);

        let payload = canonical_payload(&candidate);
        if seen.insert(payload_digest(&payload)) {
            population.push(payload);
        }
    }

    if population.len() < pop_size {
        warn!(
            "Only generated {}/{} initial candidates after {} attempts",
            population.len(),
            pop_size,
            tries
        );
    } else {
        info!("Generated {} initial candidates", population.len());
    }

    Ok(population)
}
