//! Subcommand bodies. Each takes its collaborators explicitly so it can run
//! against any [`RecordStore`].

use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};
use dniscan_core::{
    ManualEntry, ParseError, ParsedIdentity, Parser, StoredRecord, User, to_persistable,
    verify_embedded,
};
use dniscan_store::RecordStore;
use tracing::{info, warn};

use crate::display;
use crate::session::SessionFile;

/// Counts from one `scan` run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub saved: usize,
    pub failed: usize,
}

/// Parse one scanner line. Keyboard-wedge scanners terminate with CR and/or LF.
pub fn parse_line(parser: &Parser, line: &str) -> Result<ParsedIdentity, ParseError> {
    parser.parse(line.trim_end_matches(['\r', '\n']))
}

pub async fn login(store: &dyn RecordStore, session: &SessionFile, username: &str) -> Result<User> {
    let Some(user) = store.find_user(username).await? else {
        bail!("user not found: {username}");
    };
    session.save(&user)?;
    info!(user = %user.username, id = user.id, "logged in");
    Ok(user)
}

/// Parse a payload and insert it under `user`.
pub async fn save_scan(
    store: &dyn RecordStore,
    user: &User,
    parser: &Parser,
    raw: &str,
) -> Result<(ParsedIdentity, StoredRecord)> {
    let identity = parse_line(parser, raw)?;
    let record = to_persistable(&identity).with_owner(user.id);
    let stored = store.insert(&record).await.context("saving scan")?;
    Ok((identity, stored))
}

pub async fn save_manual(
    store: &dyn RecordStore,
    user: &User,
    entry: &ManualEntry,
) -> Result<StoredRecord> {
    let record = entry.to_persistable()?.with_owner(user.id);
    let stored = store.insert(&record).await.context("saving manual entry")?;
    Ok(stored)
}

/// Read payloads line by line until EOF, saving each one that parses.
///
/// A bad scan (including a line that is not UTF-8) or a failed insert is
/// reported and the loop moves on to the next line.
pub async fn scan_loop<R: BufRead, W: Write>(
    store: &dyn RecordStore,
    user: &User,
    parser: &Parser,
    mut input: R,
    out: &mut W,
) -> Result<ScanSummary> {
    let mut summary = ScanSummary::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let n = input
            .read_until(b'\n', &mut buf)
            .context("reading scanner input")?;
        if n == 0 {
            break;
        }
        let Ok(line) = std::str::from_utf8(&buf) else {
            warn!(bytes = buf.len(), "scan rejected: not UTF-8");
            writeln!(out, "error: scanner sent bytes that are not UTF-8. Scan again.")?;
            summary.failed += 1;
            continue;
        };
        if line.trim().is_empty() {
            continue;
        }

        match save_scan(store, user, parser, line).await {
            Ok((identity, stored)) => {
                display::write_identity(out, &identity, &verify_embedded(&identity))?;
                writeln!(out, "saved as #{}", stored.id)?;
                writeln!(out)?;
                summary.saved += 1;
            }
            Err(e) => {
                warn!(error = %e, "scan rejected");
                writeln!(out, "error: {e:#}. Scan again.")?;
                summary.failed += 1;
            }
        }
    }

    info!(saved = summary.saved, failed = summary.failed, "scan session ended");
    Ok(summary)
}

pub async fn delete(store: &dyn RecordStore, id: i64) -> Result<()> {
    store
        .delete(id)
        .await
        .with_context(|| format!("deleting row {id}"))?;
    info!(id, "row deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dniscan_core::{ParserConfig, TaxIdSource};
    use dniscan_store::{MemoryStore, StoreError};

    fn user() -> User {
        User {
            id: 7,
            username: "recepcion".into(),
        }
    }

    fn store() -> MemoryStore {
        MemoryStore::with_users([user()])
    }

    #[tokio::test]
    async fn login_saves_session() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionFile::new(dir.path().join("session.json"));
        let store = store();

        let logged = login(&store, &session, "recepcion").await.unwrap();
        assert_eq!(logged, user());
        assert_eq!(session.require().unwrap(), user());
    }

    #[tokio::test]
    async fn login_unknown_user() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionFile::new(dir.path().join("session.json"));

        let err = login(&store(), &session, "nadie").await.unwrap_err();
        assert_eq!(err.to_string(), "user not found: nadie");
        assert_eq!(session.load().unwrap(), None);
    }

    #[tokio::test]
    async fn save_scan_attaches_owner() {
        let store = store();
        let (identity, stored) = save_scan(
            &store,
            &user(),
            &Parser::new(),
            "123@PEREZNXX@JUAN@M@12345678@A@01/02/1990@15/03/2015@20\r\n",
        )
        .await
        .unwrap();
        assert_eq!(identity.last_name, "PEREZÑ");
        assert_eq!(stored.record.user_id, Some(7));
        assert_eq!(stored.record.cuil_full.as_deref(), Some("20123456780"));
        assert_eq!(store.list_for_user(7).await.unwrap(), vec![stored]);
    }

    #[tokio::test]
    async fn save_scan_rejects_bad_payload() {
        let store = store();
        let err = save_scan(&store, &user(), &Parser::new(), "A@B").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ParseError>(),
            Some(ParseError::Incomplete { .. })
        ));
        assert_eq!(store.row_count().await, 0);
    }

    #[tokio::test]
    async fn computed_tax_id_flows_to_row() {
        let store = store();
        let parser = Parser::with_config(ParserConfig {
            tax_id: TaxIdSource::Computed,
        });
        let (_, stored) = save_scan(
            &store,
            &user(),
            &parser,
            "1@GOMEZ@ANA@F@28456789@B@10/10/1980@01/06/2019",
        )
        .await
        .unwrap();
        assert_eq!(stored.record.cuil_full.as_deref(), Some("27284567892"));
    }

    #[tokio::test]
    async fn scan_loop_continues_after_errors() {
        let store = store();
        let input = "\
123@PEREZ@JUAN@M@12345678@A@01/02/1990@15/03/2015@206
garbage

1@GOMEZ@ANA@F@28456789@B@31-12-2000@01/06/2019
1@GOMEZ@ANA@F@28456789@B@10/10/1980@01/06/2019
";
        let mut out = Vec::new();
        let summary = scan_loop(&store, &user(), &Parser::new(), input.as_bytes(), &mut out)
            .await
            .unwrap();

        assert_eq!(summary, ScanSummary { saved: 2, failed: 2 });
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("saved as #1"));
        assert!(text.contains("saved as #2"));
        assert!(text.contains("error: incomplete code"));
        assert!(text.contains("error: invalid date: 31-12-2000"));
        assert_eq!(store.row_count().await, 2);
    }

    #[tokio::test]
    async fn scan_loop_survives_non_utf8_line() {
        let store = store();
        let mut input = b"1@P\xd1EZ@ANA@F@28456789@B@10/10/1980@01/06/2019\n".to_vec();
        input.extend_from_slice(b"1@GOMEZ@ANA@F@28456789@B@10/10/1980@01/06/2019\n");
        let mut out = Vec::new();
        let summary = scan_loop(&store, &user(), &Parser::new(), input.as_slice(), &mut out)
            .await
            .unwrap();

        assert_eq!(summary, ScanSummary { saved: 1, failed: 1 });
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("not UTF-8"));
        assert!(text.contains("saved as #1"));
        assert_eq!(store.row_count().await, 1);
    }

    #[tokio::test]
    async fn manual_entry_saved() {
        let store = store();
        let entry = ManualEntry {
            last_name: "GOMEZ".into(),
            first_name: "ANA".into(),
            national_id: "28456789".into(),
            birth_date: "10/10/1980".into(),
            sex: "F".into(),
        };
        let stored = save_manual(&store, &user(), &entry).await.unwrap();
        assert_eq!(stored.record.user_id, Some(7));
        assert_eq!(stored.record.document_number, None);
    }

    #[tokio::test]
    async fn manual_entry_requires_fields() {
        let store = store();
        let err = save_manual(&store, &user(), &ManualEntry::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "last name is required");
        assert_eq!(store.row_count().await, 0);
    }

    #[tokio::test]
    async fn delete_missing_row() {
        let err = delete(&store(), 99).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::NotFound(99))
        ));
    }
}
