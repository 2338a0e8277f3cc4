//! PDF417 payload parsing for Argentine DNI cards.
//!
//! The barcode on the back of a DNI decodes to a single line of
//! `@`-delimited fields:
//!
//! ```text
//! 00123456789@PEREZ@JUAN@M@12345678@A@01/02/1990@15/03/2015@200
//!  tramite    apellido nombre sexo dni ejemplar nacimiento emision cuil
//! ```
//!
//! The ninth segment is optional. When present it carries the two CUIL
//! prefix digits followed by the check digit.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::cuil::{Cuil, SexCode};

/// Segments every payload must carry (tramite through fecha de emision).
const BASE_SEGMENTS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("incomplete code: {found} segments, expected at least {required}")]
    Incomplete { found: usize, required: usize },
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("missing key fields: dni number, last name or first name")]
    MissingKeyFields,
}

/// Sex as printed on the card. Codes outside `M`/`F`/`E` are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sex {
    Male,
    Female,
    Foreign,
    Other(String),
}

impl Sex {
    pub fn from_code(code: &str) -> Self {
        match code {
            "M" => Sex::Male,
            "F" => Sex::Female,
            "E" => Sex::Foreign,
            other => Sex::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
            Sex::Foreign => "E",
            Sex::Other(code) => code,
        }
    }

    /// The CUIL category for this sex, if it has one.
    pub fn cuil_code(&self) -> Option<SexCode> {
        match self {
            Sex::Male => Some(SexCode::Male),
            Sex::Female => Some(SexCode::Female),
            Sex::Foreign => Some(SexCode::Entity),
            Sex::Other(_) => None,
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Raw CUIL pieces read from the ninth segment. Not verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxIdFragment {
    pub prefix: Option<String>,
    pub suffix: Option<String>,
}

impl TaxIdFragment {
    /// Slice a tax id segment into prefix (first two chars) and suffix (last char).
    ///
    /// Returns `None` for an empty segment.
    pub fn from_segment(segment: &str) -> Option<Self> {
        if segment.is_empty() {
            return None;
        }
        let prefix = (segment.chars().count() >= 2).then(|| segment.chars().take(2).collect());
        let suffix = segment.chars().last().map(String::from);
        Some(Self { prefix, suffix })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxId {
    /// Read from the payload's ninth segment.
    Embedded(TaxIdFragment),
    /// Calculated from the national id and sex.
    Computed(Cuil),
}

/// Where the parser takes the tax id from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaxIdSource {
    /// Read the ninth segment when it is present.
    #[default]
    Embedded,
    /// Require the ninth segment; 8-segment payloads are incomplete.
    Required,
    /// Ignore the payload and compute the CUIL.
    Computed,
}

impl TaxIdSource {
    fn min_segments(self) -> usize {
        match self {
            TaxIdSource::Required => BASE_SEGMENTS + 1,
            TaxIdSource::Embedded | TaxIdSource::Computed => BASE_SEGMENTS,
        }
    }
}

impl FromStr for TaxIdSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "embedded" => Ok(TaxIdSource::Embedded),
            "required" => Ok(TaxIdSource::Required),
            "computed" => Ok(TaxIdSource::Computed),
            other => Err(format!(
                "unknown tax id source '{other}' (expected embedded, required or computed)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ParserConfig {
    pub tax_id: TaxIdSource,
}

/// Identity fields decoded from one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedIdentity {
    pub transaction_number: String,
    pub last_name: String,
    pub first_name: String,
    pub sex: Sex,
    pub national_id: String,
    /// Ejemplar (copy letter).
    pub document_variant: String,
    /// `DD/MM/YYYY`.
    pub birth_date: String,
    /// `DD/MM/YYYY`.
    pub issue_date: String,
    pub tax_id: Option<TaxId>,
}

/// DNI payload parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse a decoded payload. All-or-nothing: any failure discards the scan.
    pub fn parse(&self, raw: &str) -> Result<ParsedIdentity, ParseError> {
        let fields: Vec<&str> = raw.split('@').collect();
        let required = self.config.tax_id.min_segments();
        if fields.len() < required {
            debug!(found = fields.len(), required, "incomplete payload");
            return Err(ParseError::Incomplete {
                found: fields.len(),
                required,
            });
        }

        let last_name = correct_special_chars(fields[1]);
        let first_name = correct_special_chars(fields[2]);
        let birth_date = validate_date(fields[6])?;
        let issue_date = validate_date(fields[7])?;
        let national_id = fields[4];

        if national_id.is_empty() || last_name.is_empty() || first_name.is_empty() {
            return Err(ParseError::MissingKeyFields);
        }

        let sex = Sex::from_code(fields[3]);
        let tax_id = match self.config.tax_id {
            TaxIdSource::Embedded | TaxIdSource::Required => fields
                .get(BASE_SEGMENTS)
                .and_then(|segment| TaxIdFragment::from_segment(segment))
                .map(TaxId::Embedded),
            TaxIdSource::Computed => sex.cuil_code().and_then(|code| {
                match Cuil::compute(national_id, code) {
                    Ok(cuil) => Some(TaxId::Computed(cuil)),
                    Err(e) => {
                        debug!(error = %e, "cuil not computable for scan");
                        None
                    }
                }
            }),
        };

        debug!(dni = national_id, segments = fields.len(), "parsed payload");
        Ok(ParsedIdentity {
            transaction_number: fields[0].to_string(),
            last_name,
            first_name,
            sex,
            national_id: national_id.to_string(),
            document_variant: fields[5].to_string(),
            birth_date: birth_date.to_string(),
            issue_date: issue_date.to_string(),
            tax_id,
        })
    }
}

/// Parse with the default configuration.
pub fn parse(raw: &str) -> Result<ParsedIdentity, ParseError> {
    Parser::new().parse(raw)
}

/// Undo the scanner's encoding of `Ñ` as `NXX` and `Ü` as `UXX`.
pub fn correct_special_chars(text: &str) -> String {
    text.replace("NXX", "Ñ").replace("UXX", "Ü")
}

/// Accept exactly `DD/MM/YYYY` with ASCII digits. Calendar validity is not checked.
pub(crate) fn validate_date(date: &str) -> Result<&str, ParseError> {
    let bytes = date.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            2 | 5 => *b == b'/',
            _ => b.is_ascii_digit(),
        });
    if shape_ok {
        Ok(date)
    } else {
        Err(ParseError::InvalidDate(date.to_string()))
    }
}
