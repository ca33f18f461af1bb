use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

lazy_static! {
    // Two letters, 1-2 digits, 1-2 letters, 1-4 digits: PB10BL2646.
    static ref PLATE_RE: Regex = Regex::new(r"^[A-Z]{2}[0-9]{1,2}[A-Z]{1,2}[0-9]{1,4}$").unwrap();
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Please enter a valid vehicle number (e.g., PB10BL2646)")]
pub struct InvalidPlate;

/// Registration number in canonical form: no whitespace, upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PlateNumber(String);

/// Drops every whitespace character and upper-cases the rest.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

pub fn is_valid(normalized: &str) -> bool {
    PLATE_RE.is_match(normalized)
}

impl PlateNumber {
    pub fn parse(raw: &str) -> Result<Self, InvalidPlate> {
        let normalized = normalize(raw);
        if is_valid(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(InvalidPlate)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlateNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
