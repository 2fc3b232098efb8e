use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use itertools::Itertools;

mod acquire;
mod config;
mod reconcile;
mod record;
mod report;
mod session;
mod statement;
mod store;

use acquire::Acquisition;
use config::Config;
use session::Session;

#[derive(Debug, Parser)]
/// Reconciles a bank statement extract against an internal database
/// extract and writes the tagged reports.
struct Command {
    /// The reconciliation config file to read.
    #[arg(short = 'c', long = "config", default_value = "config/reconciliation.toml")]
    config: PathBuf,
    /// Reconcile the extracts for this date (YYYY-MM-DD) instead of the
    /// latest available ones.
    #[arg(long = "date")]
    date: Option<NaiveDate>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cmd = Command::parse();
    run(&cmd)
}

fn run(cmd: &Command) -> Result<()> {
    let config = Config::from_path(&cmd.config)?;
    let strategy = match cmd.date {
        Some(date) => Acquisition::ForDate(date),
        None => Acquisition::Latest,
    };
    log::info!("reconciling extracts for {}", strategy);

    let session = Session::open(&config)?;
    let bank_path = acquire::acquire(
        session.store(),
        &config.s3.bank_prefix,
        strategy,
        session.scratch_dir(),
    )
    .context("acquiring bank statement extract")?;
    let db_path = acquire::acquire(
        session.store(),
        &config.s3.db_prefix,
        strategy,
        session.scratch_dir(),
    )
    .context("acquiring db extract")?;

    let bank = statement::load_bank_statement(&bank_path)?;
    let db = statement::load_db_extract(&db_path)?;

    let reconciled = reconcile::reconcile(&bank, &db, &config.app);
    let by_status = reconciled.iter().map(|r| r.status).counts();
    log::info!(
        "reconciled {} transactions: {}",
        reconciled.len(),
        by_status
            .iter()
            .sorted_by_key(|(status, _)| status.as_str())
            .map(|(status, count)| format!("{}={}", status, count))
            .join(", ")
    );

    report::write_reports(&reconciled, &config.s3.output_root())
        .context("writing reconciliation reports")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn write_object(root: &Path, key: &str, content: &str) {
        let path = root.join(key);
        fs::create_dir_all(path.parent().unwrap()).expect("mkdir");
        fs::write(path, content).expect("write object");
    }

    /// End-to-end: fixture bucket mirror in, three report views out.
    #[test]
    fn pipeline_runs_against_fixture_bucket() {
        let dir = tempfile::tempdir().expect("temp dir");
        let bucket_root = dir.path().join("mirror").join("recon-data");
        write_object(
            &bucket_root,
            "bank_statements/date_init=2025-01-31/01-31-2025.csv",
            "Reference ID,Amount,Date,Transaction Type\n\
             T1,100.00,2025-01-31,SUCCESS\n\
             T2,50.00,2025-01-31,SUCCESS\n\
             T3,50.00,2025-01-31,SUCCESS\n",
        );
        write_object(
            &bucket_root,
            "db_extracts/date_init=2025-01-31/01-31-2025.csv",
            "Reference ID,Amount,Transaction Type\n\
             T1,100.00,SUCCESS\n\
             T3,52.00,SUCCESS\n\
             T4,10.00,SUCCESS\n",
        );

        let config_path = dir.path().join("reconciliation.toml");
        fs::write(
            &config_path,
            format!(
                r#"
                [s3]
                bucket = "recon-data"
                mirror_root = {mirror:?}
                bank_prefix = "bank_statements/date_init="
                db_prefix = "db_extracts/date_init="
                output_path = "reports"

                [app]
                common_id = "transaction_id"
                amount_tolerance = "1.0"

                [app.status_mapping]
                db_success = ["SUCCESS"]
                bank_success = ["SUCCESS"]
                "#,
                mirror = dir.path().join("mirror").display().to_string(),
            ),
        )
        .expect("write config");

        // Only this test touches the process environment.
        std::env::set_var(store::ACCESS_KEY_VAR, "AKIATEST");
        std::env::set_var(store::SECRET_KEY_VAR, "testsecret");

        let cmd = Command {
            config: config_path,
            date: Some("2025-01-31".parse().unwrap()),
        };
        run(&cmd).expect("expected success");

        let full = fs::read_to_string(
            bucket_root
                .join("reports")
                .join(report::FULL_REPORT)
                .join("part-00000.csv"),
        )
        .expect("reading full report");
        let lines: Vec<&str> = full.lines().collect();
        assert_eq!(
            vec![
                "transaction_id,bank_amount,db_amount,transaction_date,reconciliation_status",
                "T1,100.00,100.00,2025-01-31,Reconciled",
                "T2,50.00,,2025-01-31,Missing in DB Statement",
                "T3,50.00,52.00,2025-01-31,Discrepancy Found",
                "T4,,10.00,,Missing in Bank Statement",
            ],
            lines
        );

        let tagged = fs::read_to_string(
            bucket_root
                .join("reports")
                .join(report::TAGGED)
                .join("part-00000.csv"),
        )
        .expect("reading tagged report");
        assert_eq!(2, tagged.lines().count());

        let untagged = fs::read_to_string(
            bucket_root
                .join("reports")
                .join(report::UNTAGGED)
                .join("part-00000.csv"),
        )
        .expect("reading untagged report");
        assert_eq!(4, untagged.lines().count());
    }
}
