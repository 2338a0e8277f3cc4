//! CUIL (Código Único de Identificación Laboral) computation.
//!
//! A CUIL is `PP-NNNNNNNN-C`: a two-digit category prefix, the DNI number
//! zero-padded to eight digits, and a modulo-11 check digit.
//!
//! # Algorithm (AFIP)
//!
//! 1. Prefix by category: male `20`, female `27`, entity/foreign `30`
//! 2. Weight the ten digits of prefix + number by `5,4,3,2,7,6,5,4,3,2` and sum
//! 3. `r = sum mod 11`
//! 4. `r == 0` → check digit `0`; `r == 1` → the prefix moves to `23`
//!    (`33` for entities) with a fixed check digit; otherwise `11 - r`

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::payload::{ParsedIdentity, TaxId};

const WEIGHTS: [u32; 10] = [5, 4, 3, 2, 7, 6, 5, 4, 3, 2];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidInputError {
    #[error("national id must have 7 or 8 digits, got {0}")]
    IdLength(usize),
    #[error("unrecognized sex code '{0}' (expected M, F or E)")]
    UnknownSexCode(String),
    #[error("malformed cuil: {0}")]
    Malformed(String),
    #[error("cuil check digit is {found}, expected {expected}")]
    BadCheckDigit { found: u8, expected: u8 },
}

/// CUIL category of the holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SexCode {
    /// `M`
    Male,
    /// `F`
    Female,
    /// `E`: foreign holders and non-person entities.
    Entity,
}

impl SexCode {
    fn prefix(self) -> u8 {
        match self {
            SexCode::Male => 20,
            SexCode::Female => 27,
            SexCode::Entity => 30,
        }
    }
}

impl FromStr for SexCode {
    type Err = InvalidInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "M" => Ok(SexCode::Male),
            "F" => Ok(SexCode::Female),
            "E" => Ok(SexCode::Entity),
            other => Err(InvalidInputError::UnknownSexCode(other.to_string())),
        }
    }
}

/// A CUIL whose check digit is known to be consistent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cuil {
    prefix: u8,
    number: String,
    check: u8,
}

impl Cuil {
    /// Compute the CUIL for a national id (non-digits ignored) and category.
    pub fn compute(national_id: &str, sex: SexCode) -> Result<Self, InvalidInputError> {
        let number = normalize_id(national_id)?;
        let prefix = sex.prefix();
        let (prefix, check) = match (weighted_remainder(prefix, &number), sex) {
            (0, _) => (prefix, 0),
            (1, SexCode::Male) => (23, 9),
            (1, SexCode::Female) => (23, 4),
            (1, SexCode::Entity) => (33, 9),
            (r, _) => (prefix, 11 - r),
        };
        Ok(Self {
            prefix,
            number,
            check,
        })
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// The zero-padded eight-digit DNI number.
    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn check_digit(&self) -> u8 {
        self.check
    }

    /// The eleven digits without separators, e.g. `20123456786`.
    pub fn digits(&self) -> String {
        format!("{:02}{}{}", self.prefix, self.number, self.check)
    }
}

impl fmt::Display for Cuil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{}-{}", self.prefix, self.number, self.check)
    }
}

/// Parse `20-12345678-6` or `20123456786`, verifying the check digit.
impl FromStr for Cuil {
    type Err = InvalidInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.trim().chars().filter(|c| *c != '-').collect();
        if digits.len() != 11 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidInputError::Malformed(s.to_string()));
        }

        let prefix: u8 = digits[..2]
            .parse()
            .map_err(|_| InvalidInputError::Malformed(s.to_string()))?;
        let number = digits[2..10].to_string();
        let found = digits.as_bytes()[10] - b'0';

        let expected = match weighted_remainder(prefix, &number) {
            0 => 0,
            // No single digit satisfies the checksum; AFIP reissues under another prefix.
            1 => return Err(InvalidInputError::Malformed(s.to_string())),
            r => 11 - r,
        };
        if found != expected {
            return Err(InvalidInputError::BadCheckDigit { found, expected });
        }

        Ok(Self {
            prefix,
            number,
            check: found,
        })
    }
}

/// Compute a CUIL from a national id and a single-letter sex code (`M`, `F` or `E`).
pub fn compute_cuil(national_id: &str, sex_code: &str) -> Result<Cuil, InvalidInputError> {
    normalize_id(national_id)?;
    let sex: SexCode = sex_code.parse()?;
    Cuil::compute(national_id, sex)
}

/// Outcome of cross-checking a scanned tax id against the computed CUIL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxIdCheck {
    Match,
    Mismatch { expected: Cuil },
    /// No tax id, an incomplete fragment, or inputs the checksum can't use.
    Unverifiable,
}

/// Compare the payload's embedded CUIL fragment with the one computed from
/// the same DNI number and sex.
pub fn verify_embedded(identity: &ParsedIdentity) -> TaxIdCheck {
    let fragment = match &identity.tax_id {
        Some(TaxId::Embedded(fragment)) => fragment,
        Some(TaxId::Computed(_)) => return TaxIdCheck::Match,
        None => return TaxIdCheck::Unverifiable,
    };
    let (Some(prefix), Some(suffix)) = (&fragment.prefix, &fragment.suffix) else {
        return TaxIdCheck::Unverifiable;
    };
    let Some(sex) = identity.sex.cuil_code() else {
        return TaxIdCheck::Unverifiable;
    };
    let Ok(expected) = Cuil::compute(&identity.national_id, sex) else {
        return TaxIdCheck::Unverifiable;
    };

    if *prefix == format!("{:02}", expected.prefix) && *suffix == expected.check.to_string() {
        TaxIdCheck::Match
    } else {
        TaxIdCheck::Mismatch { expected }
    }
}

/// Keep ASCII digits and left-pad to eight.
fn normalize_id(national_id: &str) -> Result<String, InvalidInputError> {
    let digits: String = national_id.chars().filter(char::is_ascii_digit).collect();
    if !(7..=8).contains(&digits.len()) {
        return Err(InvalidInputError::IdLength(digits.len()));
    }
    Ok(format!("{digits:0>8}"))
}

fn weighted_remainder(prefix: u8, number: &str) -> u8 {
    let base = format!("{prefix:02}{number}");
    let sum: u32 = base
        .bytes()
        .zip(WEIGHTS)
        .map(|(b, w)| u32::from(b - b'0') * w)
        .sum();
    (sum % 11) as u8
}
