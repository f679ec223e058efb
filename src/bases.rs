//! Home bases edited in the configuration pane.

use itertools::Itertools;

use crate::error::DeskError;

/// Splits the comma-separated bases text: trimmed, uppercased, no empties.
pub fn parse_bases(text: &str) -> Vec<String> {
    text.split(',')
        .map(|b| b.trim().to_uppercase())
        .filter(|b| !b.is_empty())
        .collect()
}

pub fn bases_text(bases: &[String]) -> String {
    bases.iter().join(", ")
}

/// A base is an ICAO airport code: exactly four ASCII letters.
pub fn validate_base(raw: &str) -> Result<String, DeskError> {
    let code = raw.trim().to_uppercase();
    if code.len() == 4 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(code)
    } else {
        Err(DeskError::Validation("Invalid ICAO code (4 letters)".into()))
    }
}

/// Appends a validated base unless it is already listed.
pub fn add_base(bases: &mut Vec<String>, raw: &str) -> Result<String, DeskError> {
    let code = validate_base(raw)?;
    if bases.contains(&code) {
        return Err(DeskError::Duplicate(format!("Base {} is already listed", code)));
    }
    bases.push(code.clone());
    Ok(code)
}
