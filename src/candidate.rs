//! Candidates and their evaluation results.
//!
//! A candidate's payload is free text carrying a JSON edit set:
//! `{"new_code_blocks": {"JOINT_101": "<replacement line>", ...}}`, possibly
//! wrapped in `<candidate>...</candidate>` delimiters or embedded in
//! surrounding prose. Extraction is tolerant of the wrapping but strict
//! about the structure inside.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub raw: BTreeMap<String, f64>,
    pub transformed: BTreeMap<String, f64>,
    pub overall_score: f64,
    pub is_feasible: bool,
    pub max_uc: f64,
    pub error_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Candidate {
    pub payload: String,
    result: Option<EvaluationResult>,
}

impl Candidate {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            result: None,
        }
    }

    pub fn result(&self) -> Option<&EvaluationResult> {
        self.result.as_ref()
    }

    /// Write-once: a second assignment is dropped with a warning so an
    /// already-scored candidate can never be silently rescored.
    pub fn assign_result(&mut self, result: EvaluationResult) {
        if self.result.is_some() {
            warn!("Candidate already has a result; ignoring reassignment");
            return;
        }
        self.result = Some(result);
    }
}

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload has no usable new_code_blocks object")]
    Structure,
}

#[derive(Serialize, Deserialize)]
struct PayloadEnvelope {
    new_code_blocks: BTreeMap<String, String>,
}

/// Extracts the edit set from a candidate payload.
///
/// `Json` means the text did not parse at all; everything that parses but
/// carries no usable `new_code_blocks` map of strings is `Structure`.
pub fn extract_edit_blocks(payload: &str) -> Result<BTreeMap<String, String>, PayloadError> {
    let json_text = if let Some(obj) = extract_json_object(payload) {
        obj
    } else if let Some(inner) = between_tags(payload, "<candidate>", "</candidate>") {
        inner.trim()
    } else {
        payload.trim()
    };

    let value: serde_json::Value = serde_json::from_str(json_text)?;
    let Some(entries) = value.get("new_code_blocks").and_then(|v| v.as_object()) else {
        return Err(PayloadError::Structure);
    };

    let mut blocks = BTreeMap::new();
    for (key, line) in entries {
        let Some(line) = line.as_str() else {
            return Err(PayloadError::Structure);
        };
        blocks.insert(key.clone(), line.to_string());
    }
    if blocks.is_empty() {
        return Err(PayloadError::Structure);
    }
    Ok(blocks)
}

/// Canonical text form of an edit set: stable key order, no extra whitespace.
/// Used for population deduplication and baseline seeding.
pub fn canonical_payload(blocks: &BTreeMap<String, String>) -> String {
    serde_json::to_string(&PayloadEnvelope {
        new_code_blocks: blocks.clone(),
    })
    .unwrap()
}

pub fn payload_digest(canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

fn between_tags<'a>(text: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = text.find(open)? + open.len();
    let end = text.rfind(close)?;
    (end >= start).then(|| &text[start..end])
}

/// Brace-matches the JSON object enclosing `"new_code_blocks"` inside
/// arbitrary surrounding text. String literals are skipped so braces inside
/// replacement lines cannot unbalance the scan.
fn extract_json_object(text: &str) -> Option<&str> {
    let anchor = text.find("\"new_code_blocks\"")?;
    let open = text[..anchor].rfind('{')?;

    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
