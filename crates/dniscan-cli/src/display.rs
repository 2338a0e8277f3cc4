//! Plain-text rendering for scans and stored rows.
//!
//! Everything writes to a caller-supplied `Write` so output can go to stdout
//! or be captured.

use std::io::{self, Write};

use dniscan_core::{ParsedIdentity, StoredRecord, TaxId, TaxIdCheck};

const LABEL_WIDTH: usize = 20;

// ── Scan card ──

/// Print a parsed scan as a vertical card.
pub fn write_identity<W: Write>(
    out: &mut W,
    identity: &ParsedIdentity,
    check: &TaxIdCheck,
) -> io::Result<()> {
    writeln!(out, "=== {}, {} ===", identity.last_name, identity.first_name)?;
    writeln!(out)?;

    writeln!(out, "Identity")?;
    field(out, "dni_number", &identity.national_id)?;
    field(out, "gender", identity.sex.code())?;
    field(out, "document_type", &identity.document_variant)?;
    field(out, "document_number", &identity.transaction_number)?;
    writeln!(out)?;

    writeln!(out, "Dates")?;
    field(out, "birth_date", &identity.birth_date)?;
    field(out, "issue_date", &identity.issue_date)?;
    writeln!(out)?;

    if let Some(tax_id) = &identity.tax_id {
        writeln!(out, "CUIL")?;
        match tax_id {
            TaxId::Embedded(fragment) => {
                let prefix = fragment.prefix.as_deref().unwrap_or("??");
                let suffix = fragment.suffix.as_deref().unwrap_or("?");
                field(
                    out,
                    "scanned",
                    &format!("{prefix}-{}-{suffix}", identity.national_id),
                )?;
            }
            TaxId::Computed(cuil) => field(out, "computed", &cuil.to_string())?,
        }
        match check {
            TaxIdCheck::Match => field(out, "checksum", "ok")?,
            TaxIdCheck::Mismatch { expected } => {
                field(out, "checksum", &format!("MISMATCH, expected {expected}"))?
            }
            TaxIdCheck::Unverifiable => field(out, "checksum", "not verifiable")?,
        }
        writeln!(out)?;
    }

    Ok(())
}

// ── Stored rows ──

/// Print stored rows as a table: id, full name, gender, DNI, birth date.
pub fn write_rows<W: Write>(out: &mut W, rows: &[StoredRecord]) -> io::Result<()> {
    if rows.is_empty() {
        writeln!(out, "No scanned DNIs yet.")?;
        return Ok(());
    }

    writeln!(
        out,
        "{:>6}  {:<32}  {:<6}  {:<10}  {}",
        "id", "name", "gender", "dni", "birth_date"
    )?;
    for row in rows {
        let r = &row.record;
        let name = format!("{} {}", r.first_name, r.last_name);
        writeln!(
            out,
            "{:>6}  {:<32}  {:<6}  {:<10}  {}",
            row.id,
            truncate(&name, 32),
            r.gender,
            r.dni_number,
            r.birth_date_display().unwrap_or_else(|| "-".into())
        )?;
    }
    Ok(())
}

/// Print each row's copy block, separated by blank lines.
pub fn write_copy_blocks<W: Write>(out: &mut W, rows: &[StoredRecord]) -> io::Result<()> {
    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "{}", row.record.copy_block())?;
    }
    Ok(())
}

// ── Helpers ──

fn field<W: Write>(out: &mut W, label: &str, value: &str) -> io::Result<()> {
    writeln!(out, "  {label:<LABEL_WIDTH$} {value}")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let kept: String = s.chars().take(max - 3).collect();
        format!("{kept}...")
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dniscan_core::{parse, to_persistable, verify_embedded};

    fn render(raw: &str) -> String {
        let id = parse(raw).unwrap();
        let mut out = Vec::new();
        write_identity(&mut out, &id, &verify_embedded(&id)).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn card_shows_corrected_name_and_checksum() {
        let text = render("123@PEREZNXX@JUAN@M@12345678@A@01/02/1990@15/03/2015@206");
        assert!(text.starts_with("=== PEREZÑ, JUAN ===\n"));
        assert!(text.contains("  dni_number           12345678\n"));
        assert!(text.contains("scanned              20-12345678-6"));
        assert!(text.contains("checksum             ok"));
    }

    #[test]
    fn card_flags_mismatch() {
        let text = render("123@PEREZ@JUAN@M@12345678@A@01/02/1990@15/03/2015@20");
        assert!(text.contains("MISMATCH, expected 20-12345678-6"));
    }

    #[test]
    fn card_without_tax_id_has_no_cuil_section() {
        let text = render("123@PEREZ@JUAN@M@12345678@A@01/02/1990@15/03/2015");
        assert!(!text.contains("CUIL"));
    }

    #[test]
    fn rows_table_and_copy_blocks() {
        let record = to_persistable(
            &parse("123@GOMEZ@ANA@F@28456789@B@10/10/1980@01/06/2019").unwrap(),
        );
        let rows = vec![StoredRecord { id: 5, record }];

        let mut out = Vec::new();
        write_rows(&mut out, &rows).unwrap();
        let table = String::from_utf8(out).unwrap();
        assert!(table.lines().nth(1).unwrap().contains("ANA GOMEZ"));
        assert!(table.contains("10/10/1980"));

        let mut out = Vec::new();
        write_copy_blocks(&mut out, &rows).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "ANA GOMEZ\nF\n28456789\n10/10/1980\n"
        );
    }

    #[test]
    fn empty_rows_message() {
        let mut out = Vec::new();
        write_rows(&mut out, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "No scanned DNIs yet.\n");
    }

    #[test]
    fn truncate_long_names() {
        assert_eq!(truncate("abcdef", 5), "ab...");
        assert_eq!(truncate("abc", 5), "abc");
    }
}
