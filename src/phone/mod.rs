//! Phone number metadata.
//!
//! Splits a full international number into calling code and national part
//! and attaches the country's mobile country code and ISO codes, using an
//! embedded table (`data/countries.csv`):
//!
//! ```text
//! country,cc,mcc[|mcc...],iso3166,iso639
//! Spain,34,214,ES,es
//! ```
//!
//! Rows are matched in order; the first calling code that prefixes the
//! number wins, so longer codes must come before shorter ones they extend.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{FunXmppError, Result};

const COUNTRIES_CSV: &str = include_str!("../../data/countries.csv");

lazy_static! {
    static ref INTL_PREFIX: Regex = Regex::new(r"^(?:\+|00)").expect("valid regex");
    static ref SEPARATORS: Regex = Regex::new(r"[\s\-().]").expect("valid regex");
    static ref DIGITS: Regex = Regex::new(r"^\d+$").expect("valid regex");
}

/// A phone number dissected into its parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phone {
    /// Full number with calling code, digits only.
    pub number: String,
    /// Country name.
    pub country: String,
    /// Calling code (`1` for all of North America).
    pub cc: String,
    /// Number without the calling code.
    pub national: String,
    /// Mobile country code.
    pub mcc: String,
    /// ISO 3166-1 alpha-2 country code.
    pub iso3166: Option<String>,
    /// ISO 639-1 language code.
    pub iso639: Option<String>,
}

impl Phone {
    /// Mobile country code left-padded with zeros to three digits.
    pub fn mcc_padded(&self) -> String {
        format!("{:0>3}", self.mcc)
    }
}

#[derive(Debug, Clone)]
struct CountryRow {
    country: String,
    cc: String,
    mcc: String,
    iso3166: Option<String>,
    iso639: Option<String>,
}

/// Number normalization: drop separators and a leading `+`/`00`.
pub fn normalize(number: &str) -> Result<String> {
    let stripped = SEPARATORS.replace_all(number.trim(), "");
    let stripped = INTL_PREFIX.replace(&stripped, "");
    if !DIGITS.is_match(&stripped) {
        return Err(FunXmppError::NotRecognized(number.to_string()));
    }
    Ok(stripped.into_owned())
}

/// Country lookup over an ordered calling-code table.
#[derive(Debug, Clone)]
pub struct LocalizationService {
    rows: Vec<CountryRow>,
}

impl Default for LocalizationService {
    fn default() -> Self {
        Self::from_csv(COUNTRIES_CSV)
    }
}

impl LocalizationService {
    /// Service over the embedded country table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Service over a custom table. Malformed rows are skipped.
    pub fn from_csv(csv: &str) -> Self {
        let rows = csv
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| {
                let fields: Vec<&str> = line.split(',').map(str::trim).collect();
                if fields.len() < 3 || fields[1].is_empty() {
                    tracing::warn!("Skipping malformed country row: {}", line);
                    return None;
                }
                let optional = |i: usize| {
                    fields
                        .get(i)
                        .filter(|s| !s.is_empty())
                        .map(|s| (*s).to_string())
                };
                Some(CountryRow {
                    country: fields[0].to_string(),
                    cc: fields[1].to_string(),
                    mcc: fields[2].split('|').next().unwrap_or_default().to_string(),
                    iso3166: optional(3),
                    iso639: optional(4),
                })
            })
            .collect();
        Self { rows }
    }

    /// Number of table rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Dissect a phone number. Unknown numbers fail with `NotRecognized`.
    pub fn dissect(&self, number: &str) -> Result<Phone> {
        let number = normalize(number)?;
        let row = self
            .rows
            .iter()
            .find(|row| number.starts_with(&row.cc))
            .ok_or_else(|| FunXmppError::NotRecognized(number.clone()))?;

        // North American numbering plan shares calling code 1
        let cc = if row.cc.starts_with('1') {
            "1".to_string()
        } else {
            row.cc.clone()
        };

        Ok(Phone {
            national: number[cc.len()..].to_string(),
            number,
            country: row.country.clone(),
            cc,
            mcc: row.mcc.clone(),
            iso3166: row.iso3166.clone(),
            iso639: row.iso639.clone(),
        })
    }
}
