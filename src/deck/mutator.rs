//! Per-keyword mutation policies.
//!
//! Every function here returns a full replacement line and falls back to the
//! original text (an identity mutation, logged but not an error) whenever the
//! line does not parse the way its keyword promises. A bad line must never
//! abort population generation.

use crate::config::MutationParams;
use crate::deck::record::{scan_fields, Keyword};
use fastrand::Rng;
use tracing::warn;

/// Rolled I-beam size libraries, lightest to heaviest. Sections only ever
/// step within their own series.
pub const W8_SECTIONS: &[&str] = &[
    "W8X10", "W8X13", "W8X15", "W8X18", "W8X21", "W8X24", "W8X28", "W8X31", "W8X35", "W8X40",
    "W8X48", "W8X58", "W8X67",
];

pub const W12_SECTIONS: &[&str] = &[
    "W12X14", "W12X16", "W12X19", "W12X22", "W12X26", "W12X30", "W12X35", "W12X40", "W12X45",
    "W12X50", "W12X53", "W12X58", "W12X65", "W12X72", "W12X79", "W12X87", "W12X96", "W12X106",
    "W12X120", "W12X136", "W12X152", "W12X170", "W12X190", "W12X210", "W12X230", "W12X252",
    "W12X279", "W12X305", "W12X336",
];

pub const W24_SECTIONS: &[&str] = &[
    "W24X55", "W24X62", "W24X68", "W24X76", "W24X84", "W24X94", "W24X103", "W24X104", "W24X117",
    "W24X131", "W24X146", "W24X162", "W24X176", "W24X192", "W24X207", "W24X229",
];

fn library_for_series(series: &str) -> Option<&'static [&'static str]> {
    match series {
        "W8" => Some(W8_SECTIONS),
        "W12" => Some(W12_SECTIONS),
        "W24" => Some(W24_SECTIONS),
        _ => None,
    }
}

/// Locates a `W<n>X<m>` section token in `line`, returning its byte span.
fn find_section_token(line: &str) -> Option<(usize, usize)> {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'W' && (i == 0 || !bytes[i - 1].is_ascii_alphanumeric()) {
            let mut j = i + 1;
            let digits1 = j;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j > digits1 && j < bytes.len() && bytes[j] == b'X' {
                j += 1;
                let digits2 = j;
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                if j > digits2 {
                    return Some((i, j));
                }
            }
        }
        i += 1;
    }
    None
}

#[inline]
fn uniform(rng: &mut Rng, lo: f64, hi: f64) -> f64 {
    lo + rng.f64() * (hi - lo)
}

pub fn mutate_record(rng: &mut Rng, keyword: Keyword, line: &str, params: &MutationParams) -> String {
    match keyword {
        Keyword::Joint => mutate_joint(rng, line, params.joint_amplitude),
        Keyword::Grup => mutate_grup(rng, line, params.max_section_step),
        Keyword::Pgrup => mutate_pgrup(rng, line),
    }
}

/// Shifts one of x/y/z by a random multiple of 0.01 within `amplitude`,
/// preserving the coordinate's exact column width and precision.
pub fn mutate_joint(rng: &mut Rng, line: &str, amplitude: f64) -> String {
    let line = line.trim_end();
    let fields = scan_fields(line);
    if fields.len() < 3 {
        warn!("Fewer than 3 coordinates in joint line: {}", line);
        return line.to_string();
    }

    let max_steps = (amplitude / 0.01) as i64;
    let mut num_steps = if max_steps > 0 {
        rng.i64(-max_steps..=max_steps)
    } else {
        0
    };
    if num_steps == 0 {
        num_steps = 1; // a mutation must change something
    }
    let change = num_steps as f64 * 0.01;

    let target = fields[rng.usize(0..3)];
    let Some(value) = target.parse(line) else {
        warn!("Unparseable coordinate field in joint line: {}", line);
        return line.to_string();
    };

    target.splice(line, value + change)
}

/// Member group mutation. Rolled I-beam rows step within their size library;
/// tubular rows scale OD or WT by up to 10%. CONE rows are left untouched.
pub fn mutate_grup(rng: &mut Rng, line: &str, max_section_step: usize) -> String {
    let line = line.trim_end();
    if line.contains("CONE") {
        return line.to_string();
    }

    if let Some((start, end)) = find_section_token(line) {
        return step_section(rng, line, start, end, max_section_step);
    }

    // Tubular: OD lives in columns 18..24, WT in 25..30.
    if line.len() < 30 {
        warn!("Group line too short for OD/WT columns: {}", line);
        return line.to_string();
    }
    let (od_res, wt_res) = (
        line[18..24].trim().parse::<f64>(),
        line[25..30].trim().parse::<f64>(),
    );
    let (Ok(orig_od), Ok(orig_wt)) = (od_res, wt_res) else {
        warn!("Could not parse OD/WT for group line: {}", line);
        return line.to_string();
    };

    let mut od = orig_od;
    let mut wt = orig_wt;
    if rng.bool() {
        od *= uniform(rng, 0.9, 1.1);
    } else {
        wt *= uniform(rng, 0.9, 1.1);
    }
    od = od.clamp((orig_od * 0.5).max(2.0), (orig_od * 2.0).min(99.999));
    wt = wt.clamp((orig_wt * 0.5).max(0.25), (orig_wt * 2.0).min(9.999));

    format!("{}{:6.3} {:5.3}{}", &line[..18], od, wt, &line[30..])
}

fn step_section(rng: &mut Rng, line: &str, start: usize, end: usize, max_step: usize) -> String {
    let current = &line[start..end];
    let Some(x_pos) = current.find('X') else {
        return line.to_string();
    };
    let series = &current[..x_pos];

    let Some(library) = library_for_series(series) else {
        warn!("No section library for series '{}'", series);
        return line.to_string();
    };
    let Some(index) = library.iter().position(|s| *s == current) else {
        warn!("Section '{}' not in {} library", current, series);
        return line.to_string();
    };

    let magnitude = rng.usize(1..=max_step.max(1)) as i64;
    let step = if rng.bool() { magnitude } else { -magnitude };
    let new_index = (index as i64 + step).clamp(0, library.len() as i64 - 1) as usize;

    line.replacen(current, library[new_index], 1)
}

/// Plate group mutation: scales the first thickness field by up to 20%,
/// clamped to [0.250, 2.000], keeping the field's own precision and width.
pub fn mutate_pgrup(rng: &mut Rng, line: &str) -> String {
    let line = line.trim_end();
    let Some(field) = scan_fields(line).into_iter().find(|f| f.start >= 10) else {
        warn!("Cannot locate plate thickness field: {}", line);
        return line.to_string();
    };
    let Some(thick) = field.parse(line) else {
        warn!("Unparseable plate thickness field: {}", line);
        return line.to_string();
    };

    let scaled = (thick * uniform(rng, 0.8, 1.2)).clamp(0.250, 2.000);
    field.splice(line, scaled)
}
