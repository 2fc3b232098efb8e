//! Report output: the three CSV views of a reconciliation run.
//!
//! Each view is a directory holding a single `part-00000.csv`, matching
//! the partitioned layout downstream consumers already read. A view is
//! built in a staging directory and swapped into place, so a destination
//! only ever holds either the previous complete run or the new one.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::record::{ReconStatus, ReconciledRecord};

pub const FULL_REPORT: &str = "full_report";
pub const TAGGED: &str = "tagged_transactions";
pub const UNTAGGED: &str = "untagged_transactions";

const PART_FILE: &str = "part-00000.csv";
const HEADER: &[&str] = &[
    "transaction_id",
    "bank_amount",
    "db_amount",
    "transaction_date",
    "reconciliation_status",
];

/// Writes the full report plus the tagged (reconciled) and untagged
/// (everything else) views under `output_root`, replacing prior contents
/// of each destination.
pub fn write_reports(records: &[ReconciledRecord], output_root: &Path) -> Result<()> {
    fs::create_dir_all(output_root)
        .with_context(|| format!("creating output root {:?}", output_root))?;

    write_view(output_root, FULL_REPORT, records.iter())?;
    write_view(
        output_root,
        TAGGED,
        records.iter().filter(|r| r.status == ReconStatus::Reconciled),
    )?;
    write_view(
        output_root,
        UNTAGGED,
        records.iter().filter(|r| r.status != ReconStatus::Reconciled),
    )?;
    Ok(())
}

fn write_view<'a>(
    output_root: &Path,
    name: &str,
    records: impl Iterator<Item = &'a ReconciledRecord>,
) -> Result<()> {
    // Stage next to the destination so the final rename stays on one
    // filesystem.
    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(output_root)
        .with_context(|| format!("creating staging directory for {}", name))?;

    let part_path = staging.path().join(PART_FILE);
    let mut csv_wtr = csv::Writer::from_path(&part_path)
        .with_context(|| format!("creating {:?}", part_path))?;
    csv_wtr.write_record(HEADER)?;
    let mut rows = 0usize;
    for record in records {
        csv_wtr.write_record(&to_row(record))?;
        rows += 1;
    }
    csv_wtr.flush()?;
    drop(csv_wtr);

    let dest = output_root.join(name);
    if dest.exists() {
        fs::remove_dir_all(&dest).with_context(|| format!("clearing {:?}", dest))?;
    }
    // Keeps the staged directory from being deleted on drop.
    let staged = staging.into_path();
    fs::rename(&staged, &dest)
        .with_context(|| format!("moving staged view into {:?}", dest))?;
    log::info!("wrote {} rows to {:?}", rows, dest.join(PART_FILE));
    Ok(())
}

fn to_row(record: &ReconciledRecord) -> [String; 5] {
    [
        record.transaction_id.clone(),
        record.bank_amount.map(|a| a.to_string()).unwrap_or_default(),
        record.db_amount.map(|a| a.to_string()).unwrap_or_default(),
        record
            .transaction_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        record.status.as_str().to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn record(id: &str, status: ReconStatus) -> ReconciledRecord {
        ReconciledRecord {
            transaction_id: id.to_string(),
            bank_amount: Some("100.00".parse::<Decimal>().unwrap()),
            db_amount: Some("100.00".parse::<Decimal>().unwrap()),
            transaction_date: Some("2025-01-31".parse::<NaiveDate>().unwrap()),
            status,
        }
    }

    fn read_view(root: &Path, name: &str) -> Vec<String> {
        fs::read_to_string(root.join(name).join(PART_FILE))
            .expect("reading view")
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn writes_three_views_with_headers() {
        let dir = tempfile::tempdir().expect("temp dir");
        let records = vec![
            record("T1", ReconStatus::Reconciled),
            record("T2", ReconStatus::Discrepancy),
            record("T3", ReconStatus::MissingInBank),
        ];
        write_reports(&records, dir.path()).expect("expected success");

        let full = read_view(dir.path(), FULL_REPORT);
        assert_eq!(4, full.len());
        assert_eq!(
            "transaction_id,bank_amount,db_amount,transaction_date,reconciliation_status",
            full[0]
        );
        assert_eq!(
            "T1,100.00,100.00,2025-01-31,Reconciled",
            full[1]
        );

        let tagged = read_view(dir.path(), TAGGED);
        assert_eq!(2, tagged.len());
        assert!(tagged[1].starts_with("T1,"));

        let untagged = read_view(dir.path(), UNTAGGED);
        assert_eq!(3, untagged.len());
        assert!(untagged[1].ends_with("Discrepancy Found"));
        assert!(untagged[2].ends_with("Missing in Bank Statement"));
    }

    #[test]
    fn absent_side_fields_are_empty_cells() {
        let dir = tempfile::tempdir().expect("temp dir");
        let records = vec![ReconciledRecord {
            transaction_id: "T9".to_string(),
            bank_amount: None,
            db_amount: Some("12.50".parse::<Decimal>().unwrap()),
            transaction_date: None,
            status: ReconStatus::MissingInBank,
        }];
        write_reports(&records, dir.path()).expect("expected success");
        let full = read_view(dir.path(), FULL_REPORT);
        assert_eq!("T9,,12.50,,Missing in Bank Statement", full[1]);
    }

    #[test]
    fn rerun_replaces_previous_contents() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_reports(&[record("T1", ReconStatus::Reconciled)], dir.path())
            .expect("first run");
        // A stray file from the earlier run must not survive the rerun.
        fs::write(dir.path().join(FULL_REPORT).join("stale.csv"), "old\n")
            .expect("write stale");

        write_reports(&[record("T2", ReconStatus::Reconciled)], dir.path())
            .expect("second run");
        let full = read_view(dir.path(), FULL_REPORT);
        assert_eq!(2, full.len());
        assert!(full[1].starts_with("T2,"));
        assert!(!dir.path().join(FULL_REPORT).join("stale.csv").exists());
    }

    #[test]
    fn empty_view_still_has_header() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_reports(&[record("T1", ReconStatus::Discrepancy)], dir.path())
            .expect("expected success");
        let tagged = read_view(dir.path(), TAGGED);
        assert_eq!(1, tagged.len());
        assert_eq!(
            "transaction_id,bank_amount,db_amount,transaction_date,reconciliation_status",
            tagged[0]
        );
    }

    #[test]
    fn no_staging_leftovers() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_reports(&[record("T1", ReconStatus::Reconciled)], dir.path())
            .expect("expected success");
        let names: Vec<String> = fs::read_dir(dir.path())
            .expect("read dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        assert!(
            names.iter().all(|n| !n.starts_with(".staging-")),
            "staging dirs left behind: {:?}",
            names
        );
    }
}
