//! The live deck file as an explicit, transactional resource.
//!
//! One `Workspace` owns one on-disk deck. A master baseline snapshot is taken
//! when the workspace opens and is never touched again; every evaluation
//! restores from it before and after mutating. `replace_records` backs up the
//! live file first and rolls back whenever it ends up changing nothing.
//!
//! Single-writer discipline: the evaluation loop holds the workspace by
//! value (or `&mut`), so only one candidate can be in flight per deck.

use crate::deck::record::RecordKey;
use crate::error::{JacketForgeError, JfResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Deck file names probed inside a project directory, in priority order.
const DECK_NAMES: &[&str] = &["sacinp.demo13", "sacinp.demo06"];

#[derive(Debug)]
pub struct ReplaceReport {
    pub replaced: usize,
    pub skipped: Vec<String>,
}

pub struct Workspace {
    deck_file: PathBuf,
    backup_dir: PathBuf,
    baseline_path: PathBuf,
}

impl Workspace {
    /// Opens the deck auto-detected inside `project_path`.
    pub fn open<P: AsRef<Path>>(project_path: P) -> JfResult<Self> {
        let project = project_path.as_ref();
        let deck_file = DECK_NAMES
            .iter()
            .map(|name| project.join(name))
            .find(|p| p.exists())
            .ok_or_else(|| {
                JacketForgeError::Validation(format!(
                    "No deck file found in {} (looked for {:?})",
                    project.display(),
                    DECK_NAMES
                ))
            })?;
        Self::with_deck_file(deck_file)
    }

    /// Opens an explicit deck file, creating the backup directory and the
    /// master baseline snapshot if they do not exist yet.
    pub fn with_deck_file<P: Into<PathBuf>>(deck_file: P) -> JfResult<Self> {
        let deck_file = deck_file.into();
        if !deck_file.exists() {
            return Err(JacketForgeError::Validation(format!(
                "Deck input file not found: {}",
                deck_file.display()
            )));
        }

        let backup_dir = deck_file
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("backups");
        fs::create_dir_all(&backup_dir)?;

        let ext = extension_suffix(&deck_file);
        let baseline_path = backup_dir.join(format!("deck_master_baseline{}", ext));
        if !baseline_path.exists() {
            fs::copy(&deck_file, &baseline_path)?;
            info!(
                "Created master baseline snapshot: {}",
                baseline_path.display()
            );
        }

        Ok(Self {
            deck_file,
            backup_dir,
            baseline_path,
        })
    }

    pub fn deck_path(&self) -> &Path {
        &self.deck_file
    }

    pub fn baseline_path(&self) -> &Path {
        &self.baseline_path
    }

    /// Copies the master baseline over the live deck.
    pub fn restore_baseline(&self) -> JfResult<()> {
        if !self.baseline_path.exists() {
            return Err(JacketForgeError::BaselineRestore(format!(
                "{} is missing",
                self.baseline_path.display()
            )));
        }
        fs::copy(&self.baseline_path, &self.deck_file)
            .map_err(|e| JacketForgeError::BaselineRestore(e.to_string()))?;
        debug!("Restored deck from master baseline");
        Ok(())
    }

    fn create_backup(&self) -> JfResult<PathBuf> {
        let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let backup = self
            .backup_dir
            .join(format!("deck_pre_eval_{}{}", ts, extension_suffix(&self.deck_file)));
        fs::copy(&self.deck_file, &backup)?;
        debug!("Created backup: {}", backup.display());
        Ok(backup)
    }

    fn restore_from_backup(&self, backup: &Path) {
        if let Err(e) = fs::copy(backup, &self.deck_file) {
            warn!(
                "Failed to restore deck from backup {}: {}",
                backup.display(),
                e
            );
        } else {
            warn!("Restored deck from backup: {}", backup.display());
        }
    }

    /// Replaces whole deck lines keyed by canonical record keys
    /// (`JOINT_101`, `GRUP_LG6_2`, ...). Backs up first; rolls back and
    /// fails if nothing matched. Unmatched keys in a partially matching
    /// edit set are skipped with a warning.
    pub fn replace_records(&self, edits: &BTreeMap<String, String>) -> JfResult<ReplaceReport> {
        let backup = self.create_backup()?;

        let content = fs::read_to_string(&self.deck_file)?;
        let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();

        let mut replaced = 0;
        let mut skipped = Vec::new();

        for (key_text, new_line) in edits {
            let key = match RecordKey::parse(key_text) {
                Ok(k) => k,
                Err(e) => {
                    warn!("Skipping edit with bad key '{}': {}", key_text, e);
                    skipped.push(key_text.clone());
                    continue;
                }
            };

            match self.locate(&lines, &key) {
                Some(idx) => {
                    debug!(
                        "Replacing record '{}':\n  OLD: {}\n  NEW: {}",
                        key_text,
                        lines[idx].trim_end(),
                        new_line.trim_end()
                    );
                    lines[idx] = new_line.trim_end_matches('\n').to_string();
                    replaced += 1;
                }
                None => {
                    warn!("Record '{}' not found in deck; skipping", key_text);
                    skipped.push(key_text.clone());
                }
            }
        }

        fs::write(&self.deck_file, lines.join("\n"))?;

        if replaced == 0 {
            warn!("No records were replaced; rolling back");
            self.restore_from_backup(&backup);
            return Err(JacketForgeError::EditRejected(
                "no records matched the edit set".to_string(),
            ));
        }

        info!("Replaced {} record(s) in deck", replaced);
        Ok(ReplaceReport { replaced, skipped })
    }

    /// Line index for a key. Occurrence 0 takes the first match; indexed
    /// occurrences count across duplicate-identifier lines, skipping CONE
    /// rows (cone sections share group identifiers with tubular rows).
    fn locate(&self, lines: &[String], key: &RecordKey) -> Option<usize> {
        if key.occurrence == 0 {
            return lines.iter().position(|l| key.matches_line(l));
        }
        lines
            .iter()
            .enumerate()
            .filter(|(_, l)| key.matches_line(l) && !l.contains("CONE"))
            .map(|(i, _)| i)
            .nth(key.occurrence)
    }

    /// First matching line per space-separated prefix ("JOINT 101"), keyed
    /// by canonical record key. Missing prefixes are warned about, not fatal.
    pub fn extract_records(&self, prefixes: &[String]) -> JfResult<BTreeMap<String, String>> {
        let keys: Vec<RecordKey> = prefixes
            .iter()
            .filter_map(|p| match RecordKey::from_prefix(p) {
                Ok(k) => Some(k),
                Err(e) => {
                    warn!("Skipping bad record prefix '{}': {}", p, e);
                    None
                }
            })
            .collect();
        self.collect_lines(&keys)
    }

    /// Like [`Self::extract_records`] but for canonical key texts
    /// ("JOINT_101"); used to pull baseline lines for coupling enforcement.
    pub fn extract_by_keys(&self, key_texts: &[String]) -> JfResult<BTreeMap<String, String>> {
        let keys: Vec<RecordKey> = key_texts
            .iter()
            .filter_map(|t| match RecordKey::parse(t) {
                Ok(k) => Some(k),
                Err(e) => {
                    warn!("Skipping bad record key '{}': {}", t, e);
                    None
                }
            })
            .collect();
        self.collect_lines(&keys)
    }

    fn collect_lines(&self, keys: &[RecordKey]) -> JfResult<BTreeMap<String, String>> {
        let content = fs::read_to_string(&self.deck_file)?;
        let lines: Vec<&str> = content.lines().collect();

        let mut found = BTreeMap::new();
        for key in keys {
            match lines.iter().find(|l| key.matches_line(l)) {
                Some(line) => {
                    found.insert(key.to_string(), line.trim_end().to_string());
                }
                None => warn!("Could not find a deck record for '{}'", key),
            }
        }
        Ok(found)
    }
}

fn extension_suffix(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}
