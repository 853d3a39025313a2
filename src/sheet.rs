//! Roster import from a published Google Sheet.
//!
//! The sheet is fetched through its CSV export URL (no OAuth dance for a
//! read-only roster), parsed as `Name, FIDE ID` rows, and swapped in as the
//! whole player set inside one transaction.

use crate::db::players::NewPlayer;
use crate::db::{self, Db};
use crate::providers::ProviderClient;
use crate::ranking;
use crate::retry;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// The sheet fetched fine but contained no usable player rows.
#[derive(Debug)]
pub struct EmptySheet;

impl fmt::Display for EmptySheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no player rows found in sheet")
    }
}

impl std::error::Error for EmptySheet {}

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct ImportSummary {
    pub success_count: usize,
    pub error_count: usize,
    pub total_rows: usize,
}

pub fn export_csv_url(spreadsheet_id: &str, gid: u64) -> String {
    format!(
        "https://docs.google.com/spreadsheets/d/{}/export?format=csv&gid={gid}",
        urlencoding::encode(spreadsheet_id)
    )
}

/// Parse `Name, FIDE ID` rows (header row expected). Returns the usable rows
/// plus how many rows were rejected (empty name, malformed id, bad record).
pub fn parse_roster(csv_text: &str) -> (Vec<NewPlayer>, usize) {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_text.as_bytes());

    let mut rows = Vec::new();
    let mut errors = 0usize;

    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "skipping malformed sheet record");
                errors += 1;
                continue;
            }
        };

        let name = record.get(0).map(str::trim).unwrap_or_default();
        if name.is_empty() {
            warn!("skipping sheet row with empty name");
            errors += 1;
            continue;
        }

        let raw_fide = record.get(1).map(str::trim).filter(|s| !s.is_empty());
        let fide_id = match raw_fide {
            None => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!(name, raw, "skipping sheet row with malformed FIDE ID");
                    errors += 1;
                    continue;
                }
            },
        };

        rows.push(NewPlayer {
            name: name.to_string(),
            fide_id,
            ..NewPlayer::default()
        });
    }

    (rows, errors)
}

/// Fetch, parse, and apply the sheet. Replaces the entire roster and
/// recomputes the ranking afterwards.
pub async fn import_from_sheet(
    db: &Db,
    providers: &ProviderClient,
    spreadsheet_id: &str,
    gid: u64,
) -> Result<ImportSummary> {
    let url = export_csv_url(spreadsheet_id, gid);
    info!(spreadsheet_id, gid, "starting sheet import");

    let body = retry::with_backoff(providers.retry(), "sheet export", || async {
        let resp = providers
            .http()
            .get(&url)
            .send()
            .await
            .context("sheet export request")?;
        if !resp.status().is_success() {
            bail!("sheet export returned HTTP {}", resp.status());
        }
        resp.text().await.context("reading sheet export body")
    })
    .await?;

    let (rows, parse_errors) = parse_roster(&body);
    if rows.is_empty() {
        return Err(EmptySheet.into());
    }

    let inserted = db::players::replace_all(db, &rows).await?;
    ranking::recompute(db).await?;

    let summary = ImportSummary {
        success_count: inserted,
        error_count: parse_errors + (rows.len() - inserted),
        total_rows: rows.len() + parse_errors,
    };
    info!(
        success = summary.success_count,
        errors = summary.error_count,
        total = summary.total_rows,
        "sheet import complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_and_fide_id_columns() {
        let csv = "Name,FIDE ID\nAlice,10297677\nBob,\nCarol,4100018\n";
        let (rows, errors) = parse_roster(csv);
        assert_eq!(errors, 0);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].name, "Alice");
        assert_eq!(rows[0].fide_id, Some(10_297_677));
        assert_eq!(rows[1].name, "Bob");
        assert_eq!(rows[1].fide_id, None);
    }

    #[test]
    fn rejects_empty_names_and_malformed_ids() {
        let csv = "Name,FIDE ID\n,123456\nAlice,not-a-number\nBob,777\n";
        let (rows, errors) = parse_roster(csv);
        assert_eq!(errors, 2);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Bob");
        assert_eq!(rows[0].fide_id, Some(777));
    }

    #[test]
    fn tolerates_short_rows_and_whitespace() {
        let csv = "Name,FIDE ID\n  Dana  \nEve , 555 \n";
        let (rows, errors) = parse_roster(csv);
        assert_eq!(errors, 0);
        assert_eq!(rows[0].name, "Dana");
        assert_eq!(rows[0].fide_id, None);
        assert_eq!(rows[1].name, "Eve");
        assert_eq!(rows[1].fide_id, Some(555));
    }

    #[test]
    fn header_only_sheet_yields_no_rows() {
        let (rows, errors) = parse_roster("Name,FIDE ID\n");
        assert!(rows.is_empty());
        assert_eq!(errors, 0);
    }

    #[test]
    fn export_url_encodes_the_spreadsheet_id() {
        let url = export_csv_url("abc 123", 7);
        assert_eq!(
            url,
            "https://docs.google.com/spreadsheets/d/abc%20123/export?format=csv&gid=7"
        );
    }
}
