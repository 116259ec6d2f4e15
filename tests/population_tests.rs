use jacketforge::candidate::{extract_edit_blocks, payload_digest};
use jacketforge::config::Config;
use jacketforge::deck::record::read_coords;
use jacketforge::deck::workspace::Workspace;
use jacketforge::population::generate_initial_population;
use std::collections::HashSet;
use std::fs;
use tempfile::TempDir;

const DECK: &str = "\
LDOPT NF+Z 490.00 64.0490.00 -60.0 30.0GLOB
JOINT 101       10.000   20.000  -30.000
JOINT 201        10.00    20.00   -30.00
JOINT 301        5.000    5.000    0.000
GRUP LG6         36.000 0.750 29.0011.0036.00 1
END
";

fn setup() -> (TempDir, Workspace) {
    let dir = TempDir::new().unwrap();
    let deck = dir.path().join("sacinp.demo13");
    fs::write(&deck, DECK).unwrap();
    let ws = Workspace::with_deck_file(&deck).unwrap();
    (dir, ws)
}

fn config(pop_size: usize) -> Config {
    let mut config = Config::default();
    config.problem.pop_size = pop_size;
    config.problem.optimizable = "JOINT 101,JOINT 301".to_string();
    config.problem.coupled = "101:201".to_string();
    config
}

#[test]
fn test_same_seed_gives_identical_population() {
    let (_dir, ws) = setup();
    let cfg = config(8);
    let a = generate_initial_population(&cfg, &ws, 7).unwrap();
    let b = generate_initial_population(&cfg, &ws, 7).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), 8);
}

#[test]
fn test_different_seeds_diverge() {
    let (_dir, ws) = setup();
    let cfg = config(8);
    let a = generate_initial_population(&cfg, &ws, 7).unwrap();
    let b = generate_initial_population(&cfg, &ws, 8).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_member_zero_is_the_baseline() {
    let (_dir, ws) = setup();
    let population = generate_initial_population(&config(4), &ws, 1).unwrap();

    let blocks = extract_edit_blocks(&population[0]).unwrap();
    assert_eq!(
        blocks["JOINT_101"],
        "JOINT 101       10.000   20.000  -30.000"
    );
    // The coupled slave rides along even though it is not optimizable.
    assert!(blocks.contains_key("JOINT_201"));
    assert!(blocks.contains_key("JOINT_301"));
}

#[test]
fn test_no_duplicate_members() {
    let (_dir, ws) = setup();
    let population = generate_initial_population(&config(12), &ws, 3).unwrap();
    let digests: HashSet<String> = population.iter().map(|p| payload_digest(p)).collect();
    assert_eq!(digests.len(), population.len());
}

#[test]
fn test_coupled_slave_tracks_master_in_every_member() {
    let (_dir, ws) = setup();
    let population = generate_initial_population(&config(10), &ws, 5).unwrap();

    for payload in &population {
        let blocks = extract_edit_blocks(payload).unwrap();
        let master = read_coords(&blocks["JOINT_101"]).unwrap();
        let slave = read_coords(&blocks["JOINT_201"]).unwrap();
        assert_eq!(master, slave, "slave drifted in {}", payload);
    }
}

#[test]
fn test_errors_without_optimizable_records() {
    let (_dir, ws) = setup();
    let mut cfg = config(4);
    cfg.problem.optimizable = String::new();
    assert!(generate_initial_population(&cfg, &ws, 1).is_err());
}

#[test]
fn test_errors_when_optimizable_records_missing_from_deck() {
    let (_dir, ws) = setup();
    let mut cfg = config(4);
    cfg.problem.optimizable = "JOINT 888".to_string();
    cfg.problem.coupled = String::new();
    assert!(generate_initial_population(&cfg, &ws, 1).is_err());
}

#[test]
fn test_generation_attempts_are_bounded() {
    let (_dir, ws) = setup();
    // One mutable coordinate record and an oversized population: the
    // generator must return short rather than spin.
    let mut cfg = config(500);
    cfg.problem.optimizable = "JOINT 301".to_string();
    cfg.problem.coupled = String::new();
    cfg.mutation.joint_amplitude = 0.01;

    let population = generate_initial_population(&cfg, &ws, 2).unwrap();
    assert!(!population.is_empty());
    assert!(population.len() < 500);
}
