//! Extract discovery and download.
//!
//! Two deliberately separate strategies exist for selecting which extract
//! to pull from a date-partitioned prefix: a fixed date, or the latest
//! partition available. They share nothing beyond the [`ObjectStore`]
//! calls; the original selection logic for the two cases differed and is
//! kept distinct here rather than merged.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::store::{ObjectStore, StoreError};

/// Date layout used in extract file names (`01-31-2025.csv`).
const FILE_DATE_FORMAT: &str = "%m-%d-%Y";
/// Date layout used in partition directory names (`date_init=2025-01-31/`).
const PARTITION_DATE_FORMAT: &str = "%Y-%m-%d";

/// How to choose the extract under a prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Acquisition {
    /// The single object named after this date.
    ForDate(NaiveDate),
    /// The first object under the greatest date partition.
    Latest,
}

impl fmt::Display for Acquisition {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Acquisition::ForDate(date) => write!(f, "date {}", date),
            Acquisition::Latest => f.write_str("latest available date"),
        }
    }
}

/// Downloads one extract selected by `strategy` into `dest_dir`, returning
/// the local path. The local file name is `{dataset_type}_{date}.csv` so
/// the two sides never collide in a shared scratch directory.
pub fn acquire(
    store: &dyn ObjectStore,
    prefix: &str,
    strategy: Acquisition,
    dest_dir: &Path,
) -> Result<PathBuf, StoreError> {
    let (key, date) = match strategy {
        Acquisition::ForDate(date) => find_for_date(store, prefix, date)?,
        Acquisition::Latest => find_latest(store, prefix)?,
    };
    let local_name = format!(
        "{}_{}.csv",
        dataset_type(prefix),
        date.format(FILE_DATE_FORMAT)
    );
    let dest = dest_dir.join(local_name);
    store.fetch(&key, &dest)?;
    log::info!("downloaded {} to {:?}", key, dest);
    Ok(dest)
}

/// The dataset's name, taken from the first path segment of its prefix
/// (e.g. `bank_statements` from `bank_statements/date_init=`).
fn dataset_type(prefix: &str) -> &str {
    prefix.split('/').next().unwrap_or(prefix)
}

/// Fixed-date selection: exactly one object, named `{date}.csv` under the
/// prefix.
fn find_for_date(
    store: &dyn ObjectStore,
    prefix: &str,
    date: NaiveDate,
) -> Result<(String, NaiveDate), StoreError> {
    let file_name = format!("{}.csv", date.format(FILE_DATE_FORMAT));
    let keys = store.list(prefix)?;
    keys.into_iter()
        .find(|key| key.ends_with(&file_name))
        .map(|key| (key, date))
        .ok_or_else(|| StoreError::NotFound {
            prefix: prefix.to_string(),
            selector: format!("date {}", date),
        })
}

/// Latest-available selection: parse the partition date out of every key
/// under the prefix, pick the greatest, and take the first object inside
/// that partition.
fn find_latest(store: &dyn ObjectStore, prefix: &str) -> Result<(String, NaiveDate), StoreError> {
    let keys = store.list(prefix)?;
    let not_found = || StoreError::NotFound {
        prefix: prefix.to_string(),
        selector: "latest available date".to_string(),
    };

    let latest = keys
        .iter()
        .filter_map(|key| partition_date(prefix, key))
        .max()
        .ok_or_else(not_found)?;

    let partition = format!("{}{}/", prefix, latest.format(PARTITION_DATE_FORMAT));
    // Keys are listed sorted, so this picks a deterministic object.
    keys.into_iter()
        .find(|key| key.starts_with(&partition))
        .map(|key| (key, latest))
        .ok_or_else(not_found)
}

/// The partition date of `key`: the path segment immediately after the
/// prefix. Keys that do not carry a parsable date are skipped.
fn partition_date(prefix: &str, key: &str) -> Option<NaiveDate> {
    let rest = key.strip_prefix(prefix)?;
    let segment = rest.split('/').next()?;
    NaiveDate::parse_from_str(segment, PARTITION_DATE_FORMAT).ok()
}
