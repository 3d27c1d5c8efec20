//! Senegalese vehicle-registration normalization
//!
//! Raw user input is canonicalized (uppercase, ASCII hyphens, no
//! whitespace), classified into exactly one of the ten recognized format
//! families, then reformatted to the dashed representation the insurer
//! API accepts verbatim.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Regional prefixes (one per administrative region)
const REGION_PREFIXES: [&str; 17] = [
    "AB", "AC", "DK", "TH", "SL", "DB", "LG", "TC", "KL", "KD", "ZG", "FK", "KF", "KG", "MT",
    "SD", "DL",
];

/// Registration format family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlateFormat {
    /// Regional: DK-0001-BB (suffix of 1 or 2 letters)
    Regional,
    /// Legacy series: AA-001-AA
    Ancien,
    /// Diplomatic in temporary transit: AD0001-TT-A
    AdTt,
    /// Diplomatic: AD-0001
    Ad,
    /// Export: 0001-EX
    Ex,
    /// Export-country then export: 0001-EP01-EX
    EpEx,
    /// Export-country: 0001-EP01
    Ep,
    /// Dealer (apporteur) series: 001-AP-0001
    Ap,
    /// Temporary transit: 0001-TT-A
    Tt,
    /// Foreign chassis: CH-000001
    Ch,
}

/// Classification table.
///
/// Order is the fixed match priority: patterns are tried top to bottom
/// against the full canonical string and the first full match wins.
/// The families are pairwise disjoint on canonical input (digit-group
/// widths and letter prefixes/suffixes never coincide), so the order is
/// a tie-break that can never fire; it is still fixed so behavior is
/// deterministic if a new family ever overlaps an existing one.
static PATTERNS: Lazy<Vec<(PlateFormat, Regex)>> = Lazy::new(|| {
    let regional = format!(r"^({})-?\d{{4}}-?[A-Z]{{1,2}}$", REGION_PREFIXES.join("|"));
    vec![
        (PlateFormat::Regional, Regex::new(&regional).unwrap()),
        (
            PlateFormat::Ancien,
            Regex::new(r"^[A-Z]{2}-?\d{3}-?[A-Z]{2}$").unwrap(),
        ),
        (
            PlateFormat::AdTt,
            Regex::new(r"^AD-?\d{4}-?TT-?[A-Z]$").unwrap(),
        ),
        (PlateFormat::Ad, Regex::new(r"^AD-?\d{4}$").unwrap()),
        (PlateFormat::Ex, Regex::new(r"^\d{4}-?EX$").unwrap()),
        (
            PlateFormat::EpEx,
            Regex::new(r"^\d{4}-?EP\d{2}-?EX$").unwrap(),
        ),
        (PlateFormat::Ep, Regex::new(r"^\d{4}-?EP\d{2}$").unwrap()),
        (PlateFormat::Ap, Regex::new(r"^\d{3}-?AP-?\d{4}$").unwrap()),
        (PlateFormat::Tt, Regex::new(r"^\d{4}-?TT-?[A-Z]$").unwrap()),
        (PlateFormat::Ch, Regex::new(r"^CH-?\d{6}$").unwrap()),
    ]
});

/// A registration number in the canonical dashed form consumed by the
/// insurer API, together with its detected format family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalPlate {
    formatted: String,
    format: PlateFormat,
}

impl CanonicalPlate {
    /// Canonical dashed representation (e.g. `DK-0001-BB`)
    pub fn as_str(&self) -> &str {
        &self.formatted
    }

    /// Detected format family
    pub fn format(&self) -> PlateFormat {
        self.format
    }
}

impl fmt::Display for CanonicalPlate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.formatted)
    }
}

/// Uppercase, unify dash variants, strip whitespace.
///
/// Rejects any remaining character outside `[A-Z0-9-]`.
fn canonicalize(raw: &str) -> Result<String> {
    let mut v = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\u{2013}' | '\u{2014}' => v.push('-'), // en dash, em dash
            c if c.is_whitespace() => {}
            c => v.extend(c.to_uppercase()),
        }
    }
    if v.chars().any(|c| !(c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')) {
        return Err(Error::InvalidFormat {
            input: raw.to_string(),
        });
    }
    Ok(v)
}

/// First full match in the fixed priority order
fn detect(canonical: &str) -> Option<PlateFormat> {
    PATTERNS
        .iter()
        .find(|(_, rx)| rx.is_match(canonical))
        .map(|(fmt, _)| *fmt)
}

/// Reconstruct the dashed form from the dash-stripped string.
///
/// Group widths are fixed per family, so byte slicing is safe: `detect`
/// already guaranteed the ASCII shape.
fn reformat(canonical: &str, format: PlateFormat) -> String {
    let raw: String = canonical.chars().filter(|c| *c != '-').collect();
    match format {
        // AB0000CD -> AB-0000-CD
        PlateFormat::Regional => format!("{}-{}-{}", &raw[..2], &raw[2..6], &raw[6..]),
        // AA001BB -> AA-001-BB
        PlateFormat::Ancien => format!("{}-{}-{}", &raw[..2], &raw[2..5], &raw[5..]),
        // AD0001TTA -> AD0001-TT-A
        PlateFormat::AdTt => format!("{}-TT-{}", &raw[..6], &raw[raw.len() - 1..]),
        // AD0001 -> AD-0001
        PlateFormat::Ad => format!("{}-{}", &raw[..2], &raw[2..]),
        // 0001EX -> 0001-EX
        PlateFormat::Ex => format!("{}-EX", &raw[..4]),
        // 0001EP01EX -> 0001-EP01-EX
        PlateFormat::EpEx => format!("{}-{}-EX", &raw[..4], &raw[4..8]),
        // 0001EP01 -> 0001-EP01
        PlateFormat::Ep => format!("{}-{}", &raw[..4], &raw[4..]),
        // 001AP0001 -> 001-AP-0001
        PlateFormat::Ap => format!("{}-AP-{}", &raw[..3], &raw[5..]),
        // 0001TTA -> 0001-TT-A
        PlateFormat::Tt => format!("{}-TT-{}", &raw[..4], &raw[raw.len() - 1..]),
        // CH000001 -> CH-000001
        PlateFormat::Ch => format!("{}-{}", &raw[..2], &raw[2..]),
    }
}

/// Normalize a raw registration string.
///
/// Fails with [`Error::InvalidFormat`] when the cleaned string contains
/// characters outside `[A-Z0-9-]` or matches none of the known families.
/// Idempotent: normalizing an already-canonical plate returns it
/// unchanged.
pub fn normalize(raw: &str) -> Result<CanonicalPlate> {
    if raw.trim().is_empty() {
        return Err(Error::Validation("registration number required".to_string()));
    }
    let canonical = canonicalize(raw)?;
    let format = detect(&canonical).ok_or_else(|| Error::InvalidFormat {
        input: raw.to_string(),
    })?;
    Ok(CanonicalPlate {
        formatted: reformat(&canonical, format),
        format,
    })
}
