//! Hand-typed entries for cards whose barcode will not read.

use thiserror::Error;

use crate::payload::{Sex, validate_date};
use crate::record::{PersistableRecord, iso_timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManualEntryError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("invalid date: {0}")]
    InvalidDate(String),
}

#[derive(Debug, Clone, Default)]
pub struct ManualEntry {
    pub last_name: String,
    pub first_name: String,
    pub national_id: String,
    /// `DD/MM/YYYY`.
    pub birth_date: String,
    /// `M` or `F`.
    pub sex: String,
}

impl ManualEntry {
    /// Every field must be filled and the birth date must be `DD/MM/YYYY`.
    pub fn validate(&self) -> Result<(), ManualEntryError> {
        let fields = [
            ("last name", &self.last_name),
            ("first name", &self.first_name),
            ("dni number", &self.national_id),
            ("birth date", &self.birth_date),
            ("sex", &self.sex),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ManualEntryError::MissingField(*name));
        }
        validate_date(&self.birth_date)
            .map_err(|_| ManualEntryError::InvalidDate(self.birth_date.clone()))?;
        Ok(())
    }

    /// Validate and build the row. Columns the form does not collect stay `None`.
    pub fn to_persistable(&self) -> Result<PersistableRecord, ManualEntryError> {
        self.validate()?;
        Ok(PersistableRecord {
            user_id: None,
            document_number: None,
            last_name: self.last_name.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            gender: Sex::from_code(self.sex.trim()).code().to_string(),
            dni_number: self.national_id.trim().to_string(),
            document_type: None,
            birth_date: iso_timestamp(&self.birth_date),
            issue_date: None,
            cuil_full: None,
        })
    }
}

/// Format typed digits as `DD/MM/YYYY`, dropping anything else.
///
/// `"01021990"` → `"01/02/1990"`, `"010"` → `"01/0"`. Digits past the
/// eighth are discarded.
pub fn mask_date_input(input: &str) -> String {
    let digits: Vec<char> = input
        .chars()
        .filter(char::is_ascii_digit)
        .take(8)
        .collect();
    let mut out = String::with_capacity(10);
    for (i, c) in digits.into_iter().enumerate() {
        if i == 2 || i == 4 {
            out.push('/');
        }
        out.push(c);
    }
    out
}
