//! Fixed-column deck records.
//!
//! A record is one line of the structural input deck. Numeric fields are
//! located by scanning, carried around as `(start, end, precision)` spans,
//! and written back through [`NumField::splice`], which guarantees the
//! rewritten field occupies exactly the same bytes as the original.

use crate::error::{JacketForgeError, JfResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

/// Record categories the pipeline knows how to mutate.
#[derive(Display, EnumString, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Keyword {
    #[strum(serialize = "JOINT")]
    Joint,
    #[strum(serialize = "GRUP")]
    Grup,
    #[strum(serialize = "PGRUP")]
    Pgrup,
}

/// Byte span and decimal precision of one numeric field inside a record line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumField {
    pub start: usize,
    pub end: usize,
    pub precision: usize,
}

impl NumField {
    #[inline]
    pub fn width(&self) -> usize {
        self.end - self.start
    }

    pub fn parse(&self, line: &str) -> Option<f64> {
        // Trimmed: a respliced shorter value is right-justified into the
        // same span, so the span may carry leading padding.
        line.get(self.start..self.end)?.trim().parse().ok()
    }

    /// Formats `value` to this field's width and precision: right-justified,
    /// truncated (never widened) on overflow so adjacent columns hold still.
    pub fn format(&self, value: f64) -> String {
        let mut text = format!("{:>width$.prec$}", value, width = self.width(), prec = self.precision);
        if text.len() > self.width() {
            text.truncate(self.width());
        }
        text
    }

    /// Returns `line` with this field replaced by the formatted `value`.
    pub fn splice(&self, line: &str, value: f64) -> String {
        let mut out = String::with_capacity(line.len());
        out.push_str(&line[..self.start]);
        out.push_str(&self.format(value));
        out.push_str(&line[self.end..]);
        out
    }
}

/// Scans a line for decimal numeric fields: optional sign, digits, a decimal
/// point, optional fraction and exponent. Integer-only tokens are not fields;
/// the deck's column runs often concatenate values ("29.0011.6036.00") and
/// the decimal point is what anchors each one.
pub fn scan_fields(line: &str) -> Vec<NumField> {
    let bytes = line.as_bytes();
    let mut fields = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        let mut j = i;
        if bytes[j] == b'-' {
            j += 1;
        }
        let int_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j == int_start || j >= bytes.len() || bytes[j] != b'.' {
            i = if j > i { j } else { i + 1 };
            continue;
        }
        j += 1; // decimal point
        let frac_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        let precision = j - frac_start;

        // optional exponent
        if j < bytes.len() && (bytes[j] == b'e' || bytes[j] == b'E') {
            let mut k = j + 1;
            if k < bytes.len() && (bytes[k] == b'+' || bytes[k] == b'-') {
                k += 1;
            }
            let exp_start = k;
            while k < bytes.len() && bytes[k].is_ascii_digit() {
                k += 1;
            }
            if k > exp_start {
                j = k;
            }
        }

        fields.push(NumField {
            start,
            end: j,
            precision,
        });
        i = j;
    }

    fields
}

/// First three decimal fields of a joint line, in deck order (x, y, z).
pub fn read_coords(line: &str) -> Option<[f64; 3]> {
    let fields = scan_fields(line);
    if fields.len() < 3 {
        return None;
    }
    Some([
        fields[0].parse(line)?,
        fields[1].parse(line)?,
        fields[2].parse(line)?,
    ])
}

/// Composite key of one record: keyword, identifier, and a 0-based
/// occurrence index for decks where several lines share an identifier.
///
/// Canonical text form is `KEYWORD_ID` for the first occurrence and
/// `KEYWORD_ID_n` (n >= 2, 1-based) beyond it. A trailing numeric part is
/// only read as an occurrence when the identifier still has at least one
/// part left, so `JOINT_101` is the joint "101", not occurrence 101.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub keyword: Keyword,
    pub identifier: String,
    pub occurrence: usize,
}

impl RecordKey {
    pub fn new(keyword: Keyword, identifier: impl Into<String>) -> Self {
        Self {
            keyword,
            identifier: identifier.into(),
            occurrence: 0,
        }
    }

    /// Parses a canonical key like `JOINT_101` or `GRUP_LG6_2`.
    pub fn parse(text: &str) -> JfResult<Self> {
        let (kw_part, id_part) = text
            .split_once('_')
            .ok_or_else(|| JacketForgeError::Validation(format!("Bad record key '{}'", text)))?;
        let keyword = Keyword::from_str(kw_part).map_err(|_| {
            JacketForgeError::Validation(format!("Unknown record keyword in '{}'", text))
        })?;

        if id_part.is_empty() {
            return Err(JacketForgeError::Validation(format!(
                "Empty identifier in record key '{}'",
                text
            )));
        }

        if let Some((base, last)) = id_part.rsplit_once('_') {
            if !last.is_empty() && last.bytes().all(|b| b.is_ascii_digit()) {
                let n: usize = last.parse().map_err(|_| {
                    JacketForgeError::Validation(format!("Bad occurrence in '{}'", text))
                })?;
                if n >= 1 {
                    return Ok(Self {
                        keyword,
                        identifier: base.to_string(),
                        occurrence: n - 1,
                    });
                }
            }
        }

        Ok(Self {
            keyword,
            identifier: id_part.to_string(),
            occurrence: 0,
        })
    }

    /// Parses a space-separated deck prefix like `JOINT 101`.
    pub fn from_prefix(prefix: &str) -> JfResult<Self> {
        let mut parts = prefix.split_whitespace();
        let (Some(kw), Some(id), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(JacketForgeError::Validation(format!(
                "Bad record prefix '{}'",
                prefix
            )));
        };
        let keyword = Keyword::from_str(kw).map_err(|_| {
            JacketForgeError::Validation(format!("Unknown record keyword in '{}'", prefix))
        })?;
        Ok(Self::new(keyword, id))
    }

    /// True when `line` is this key's keyword + identifier (token match,
    /// ignoring the occurrence index).
    pub fn matches_line(&self, line: &str) -> bool {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(kw), Some(id)) => kw == self.keyword.to_string() && id == self.identifier,
            _ => false,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.occurrence == 0 {
            write!(f, "{}_{}", self.keyword, self.identifier)
        } else {
            write!(f, "{}_{}_{}", self.keyword, self.identifier, self.occurrence + 1)
        }
    }
}
