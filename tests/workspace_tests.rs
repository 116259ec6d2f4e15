use jacketforge::deck::workspace::Workspace;
use std::collections::BTreeMap;
use std::fs;
use tempfile::TempDir;

const DECK: &str = "\
LDOPT NF+Z 490.00 64.0490.00 -60.0 30.0GLOB
JOINT 101       10.000   20.000  -30.000
JOINT 201        10.00    20.00   -30.00
JOINT 301        5.000    5.000    0.000
GRUP LG6         36.000 0.750 29.0011.0036.00 1
GRUP LG6 CONE   12.000 24.000 0.625
GRUP LG6         26.000 0.750 29.0011.6036.00 1
GRUP SK2 W8X24                29.0011.6036.00 1
PGRUP P01 0.3750I29.000 0.25036.000
END
";

fn setup() -> (TempDir, Workspace) {
    let dir = TempDir::new().unwrap();
    let deck = dir.path().join("sacinp.demo13");
    fs::write(&deck, DECK).unwrap();
    let ws = Workspace::with_deck_file(&deck).unwrap();
    (dir, ws)
}

fn edit(key: &str, line: &str) -> BTreeMap<String, String> {
    let mut m = BTreeMap::new();
    m.insert(key.to_string(), line.to_string());
    m
}

#[test]
fn test_open_detects_deck_in_project_dir() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("sacinp.demo06"), DECK).unwrap();
    let ws = Workspace::open(dir.path()).unwrap();
    assert!(ws.deck_path().ends_with("sacinp.demo06"));
}

#[test]
fn test_open_fails_without_deck() {
    let dir = TempDir::new().unwrap();
    assert!(Workspace::open(dir.path()).is_err());
}

#[test]
fn test_baseline_snapshot_created_on_open() {
    let (_dir, ws) = setup();
    assert!(ws.baseline_path().exists());
    assert_eq!(fs::read_to_string(ws.baseline_path()).unwrap(), DECK);
}

#[test]
fn test_restore_baseline_is_idempotent() {
    let (_dir, ws) = setup();

    fs::write(ws.deck_path(), "corrupted\n").unwrap();
    ws.restore_baseline().unwrap();
    ws.restore_baseline().unwrap();

    assert_eq!(fs::read_to_string(ws.deck_path()).unwrap(), DECK);
}

#[test]
fn test_restore_fails_when_snapshot_missing() {
    let (_dir, ws) = setup();
    fs::remove_file(ws.baseline_path()).unwrap();
    assert!(ws.restore_baseline().is_err());
}

#[test]
fn test_replace_single_record_preserves_everything_else() {
    let (_dir, ws) = setup();
    let new_line = "JOINT 101       11.000   20.000  -30.000";

    let report = ws.replace_records(&edit("JOINT_101", new_line)).unwrap();
    assert_eq!(report.replaced, 1);
    assert!(report.skipped.is_empty());

    let content = fs::read_to_string(ws.deck_path()).unwrap();
    assert!(content.contains(new_line));
    assert!(content.contains("JOINT 201"));
    assert!(content.ends_with("END\n"));

    // Every non-target line is byte-identical.
    let expected: Vec<&str> = DECK
        .lines()
        .map(|l| if l.starts_with("JOINT 101") { new_line } else { l })
        .collect();
    assert_eq!(content, format!("{}\n", expected.join("\n")));
}

#[test]
fn test_occurrence_disambiguation_skips_cone_rows() {
    let (_dir, ws) = setup();
    let new_line = "GRUP LG6         24.000 0.750 29.0011.6036.00 1";

    // Second non-CONE "GRUP LG6" is the 26.000 row.
    ws.replace_records(&edit("GRUP_LG6_2", new_line)).unwrap();

    let content = fs::read_to_string(ws.deck_path()).unwrap();
    assert!(content.contains("36.000 0.750"));
    assert!(content.contains("GRUP LG6 CONE"));
    assert!(content.contains("24.000 0.750"));
    assert!(!content.contains("26.000 0.750"));
}

#[test]
fn test_zero_matches_rolls_back() {
    let (_dir, ws) = setup();
    let result = ws.replace_records(&edit("JOINT_999", "JOINT 999 0.0 0.0 0.0"));
    assert!(result.is_err());
    assert_eq!(fs::read_to_string(ws.deck_path()).unwrap(), DECK);
}

#[test]
fn test_partial_match_succeeds_with_skips() {
    let (_dir, ws) = setup();
    let mut edits = edit("JOINT_101", "JOINT 101       11.000   20.000  -30.000");
    edits.insert("JOINT_999".to_string(), "JOINT 999 0.0".to_string());

    let report = ws.replace_records(&edits).unwrap();
    assert_eq!(report.replaced, 1);
    assert_eq!(report.skipped, vec!["JOINT_999".to_string()]);
}

#[test]
fn test_extract_records_by_prefix() {
    let (_dir, ws) = setup();
    let found = ws
        .extract_records(&["JOINT 101".to_string(), "JOINT 888".to_string()])
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found["JOINT_101"], "JOINT 101       10.000   20.000  -30.000");
}

#[test]
fn test_extract_by_canonical_keys() {
    let (_dir, ws) = setup();
    let found = ws
        .extract_by_keys(&["JOINT_201".to_string(), "PGRUP_P01".to_string()])
        .unwrap();
    assert_eq!(found.len(), 2);
    assert!(found["PGRUP_P01"].starts_with("PGRUP P01"));
}
