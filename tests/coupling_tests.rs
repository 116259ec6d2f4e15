use jacketforge::deck::coupling::{rebuild_slave_line, CouplingEnforcer};
use jacketforge::deck::record::{read_coords, scan_fields};
use std::collections::BTreeMap;

const MASTER: &str = "JOINT 101        0.000    0.000    5.000";
const SLAVE: &str = "JOINT 201         0.00     0.00     0.00";

fn edits(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_slave_follows_master_coordinates() {
    let enforcer = CouplingEnforcer::new(vec![("101".to_string(), "201".to_string())]);
    let mut pending = edits(&[("JOINT_101", MASTER)]);
    let baseline = edits(&[("JOINT_201", SLAVE)]);

    enforcer.enforce(&mut pending, &baseline);

    let slave = &pending["JOINT_201"];
    assert_eq!(read_coords(slave), Some([0.0, 0.0, 5.0]));
}

#[test]
fn test_slave_keeps_its_own_precision() {
    // Master carries 3 decimals, slave 2; the rebuilt slave must stay at 2.
    let rebuilt = rebuild_slave_line(SLAVE, [0.0, 0.0, 5.0]);
    assert_eq!(rebuilt.len(), SLAVE.len());
    assert!(rebuilt.ends_with("5.00"));
    assert!(!rebuilt.contains("5.000"));

    for field in scan_fields(&rebuilt) {
        assert_eq!(field.precision, 2);
    }
}

#[test]
fn test_missing_master_leaves_slave_untouched() {
    let enforcer = CouplingEnforcer::new(vec![("999".to_string(), "201".to_string())]);
    let mut pending = edits(&[("JOINT_201", SLAVE)]);
    let baseline = BTreeMap::new();

    enforcer.enforce(&mut pending, &baseline);

    assert_eq!(pending["JOINT_201"], SLAVE);
    assert_eq!(pending.len(), 1);
}

#[test]
fn test_master_read_from_baseline_when_not_edited() {
    let enforcer = CouplingEnforcer::new(vec![("101".to_string(), "201".to_string())]);
    // The optimizer edited only the slave; the master's baseline wins.
    let drifted = "JOINT 201         9.00     9.00     9.00";
    let mut pending = edits(&[("JOINT_201", drifted)]);
    let baseline = edits(&[("JOINT_101", MASTER), ("JOINT_201", SLAVE)]);

    enforcer.enforce(&mut pending, &baseline);

    assert_eq!(read_coords(&pending["JOINT_201"]), Some([0.0, 0.0, 5.0]));
}

#[test]
fn test_unparseable_slave_is_identity() {
    let rebuilt = rebuild_slave_line("JOINT 201", [1.0, 2.0, 3.0]);
    assert_eq!(rebuilt, "JOINT 201");
}

#[test]
fn test_required_keys_cover_both_sides() {
    let enforcer = CouplingEnforcer::new(vec![
        ("101".to_string(), "201".to_string()),
        ("102".to_string(), "202".to_string()),
    ]);
    let keys = enforcer.required_keys();
    assert_eq!(keys.len(), 4);
    assert!(keys.contains(&"JOINT_101".to_string()));
    assert!(keys.contains(&"JOINT_202".to_string()));
}
