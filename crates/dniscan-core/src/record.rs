//! Row types for the hosted `dni_data` and `users` tables.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::payload::{ParsedIdentity, TaxId};

/// A `dni_data` row ready for insert.
///
/// Column names are the table's; dates are ISO 8601 timestamp strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistableRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub document_number: Option<String>,
    pub last_name: String,
    pub first_name: String,
    pub gender: String,
    pub dni_number: String,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub issue_date: Option<String>,
    #[serde(default)]
    pub cuil_full: Option<String>,
}

impl PersistableRecord {
    /// Attach the owning user, as done on insert for the logged-in user.
    pub fn with_owner(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Birth date as `DD/MM/YYYY`, if stored and readable.
    pub fn birth_date_display(&self) -> Option<String> {
        self.birth_date.as_deref().and_then(display_date)
    }

    /// The block copied to the clipboard for a row: full name, gender, DNI, birth date.
    pub fn copy_block(&self) -> String {
        format!(
            "{} {}\n{}\n{}\n{}",
            self.first_name,
            self.last_name,
            self.gender,
            self.dni_number,
            self.birth_date_display().unwrap_or_default()
        )
    }
}

/// A `dni_data` row as returned by the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: i64,
    #[serde(flatten)]
    pub record: PersistableRecord,
}

/// A `users` row. Login is a lookup by `username`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}

/// Map a parsed scan to its `dni_data` row. Never fails: unreadable optional
/// values become `None`.
pub fn to_persistable(identity: &ParsedIdentity) -> PersistableRecord {
    let cuil_full = match &identity.tax_id {
        Some(TaxId::Embedded(fragment)) => match (&fragment.prefix, &fragment.suffix) {
            (Some(prefix), Some(suffix)) => {
                Some(format!("{prefix}{}{suffix}", identity.national_id))
            }
            _ => None,
        },
        Some(TaxId::Computed(cuil)) => Some(cuil.digits()),
        None => None,
    };

    PersistableRecord {
        user_id: None,
        document_number: Some(identity.transaction_number.clone()),
        last_name: identity.last_name.clone(),
        first_name: identity.first_name.clone(),
        gender: identity.sex.code().to_string(),
        dni_number: identity.national_id.clone(),
        document_type: Some(identity.document_variant.clone()),
        birth_date: iso_timestamp(&identity.birth_date),
        issue_date: iso_timestamp(&identity.issue_date),
        cuil_full,
    }
}

impl From<&ParsedIdentity> for PersistableRecord {
    fn from(identity: &ParsedIdentity) -> Self {
        to_persistable(identity)
    }
}

/// `DD/MM/YYYY` → midnight UTC, e.g. `1990-02-01T00:00:00.000Z`.
///
/// Returns `None` for dates that do not exist on the calendar. `31/02/1990`
/// is rejected rather than rolled over into March.
pub fn iso_timestamp(date: &str) -> Option<String> {
    let mut parts = date.split('/');
    let day: u32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    let year: i32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let midnight = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?;
    Some(
        midnight
            .and_utc()
            .to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

/// Render a stored timestamp as `DD/MM/YYYY`.
///
/// Accepts RFC 3339 (`timestamptz`), a bare `timestamp`, or a plain `date` column.
pub fn display_date(stored: &str) -> Option<String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(stored) {
        return Some(ts.with_timezone(&Utc).format("%d/%m/%Y").to_string());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(stored, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts.format("%d/%m/%Y").to_string());
    }
    NaiveDate::parse_from_str(stored, "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%d/%m/%Y").to_string())
}
