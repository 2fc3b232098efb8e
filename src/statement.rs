//! Reads the two CSV extracts and normalizes their fields into typed
//! records.
//!
//! Each side declares an explicit mapping from raw source headers to the
//! normalized field names the join runs on. The mapping is validated
//! against the actual header row before any row is parsed, so a renamed or
//! dropped source column surfaces as a schema error naming the missing
//! columns instead of a parse failure deep inside a row.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::StringRecord;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::record::{BankRecord, DbRecord};

/// Date representations accepted in the extracts, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m-%d-%Y"];

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("{side} extract: missing column(s): {}", columns.join(", "))]
    MissingColumns {
        side: &'static str,
        columns: Vec<String>,
    },
    #[error("{side} extract row {row}: bad {column} value {value:?}: {reason}")]
    BadCell {
        side: &'static str,
        row: usize,
        column: &'static str,
        value: String,
        reason: String,
    },
    #[error("{side} extract: duplicate transaction id {id:?}")]
    DuplicateId { side: &'static str, id: String },
}

/// Declared schema contract for one side: raw header name per normalized
/// field, in the order the loader consumes them.
struct FieldMap {
    side: &'static str,
    /// (raw source header, normalized field name)
    fields: &'static [(&'static str, &'static str)],
}

const BANK_FIELDS: FieldMap = FieldMap {
    side: "bank",
    fields: &[
        ("Reference ID", "transaction_id"),
        ("Amount", "bank_amount"),
        ("Date", "transaction_date"),
        ("Transaction Type", "transaction_type"),
    ],
};

const DB_FIELDS: FieldMap = FieldMap {
    side: "db",
    fields: &[
        ("Reference ID", "transaction_id"),
        ("Amount", "db_amount"),
        ("Transaction Type", "transaction_type"),
    ],
};

impl FieldMap {
    /// Resolves each declared field to its column index in `headers`.
    /// Collects every absent column into a single error.
    fn resolve(&self, headers: &StringRecord) -> Result<Vec<usize>, SchemaError> {
        let mut indices = Vec::with_capacity(self.fields.len());
        let mut missing = Vec::new();
        for (raw, _) in self.fields {
            match headers.iter().position(|h| h == *raw) {
                Some(i) => indices.push(i),
                None => missing.push(raw.to_string()),
            }
        }
        if missing.is_empty() {
            Ok(indices)
        } else {
            Err(SchemaError::MissingColumns {
                side: self.side,
                columns: missing,
            })
        }
    }
}

struct SideReader {
    map: &'static FieldMap,
    indices: Vec<usize>,
    seen_ids: HashSet<String>,
    row: usize,
}

impl SideReader {
    fn new(map: &'static FieldMap, headers: &StringRecord) -> Result<Self, SchemaError> {
        let indices = map.resolve(headers)?;
        Ok(SideReader {
            map,
            indices,
            seen_ids: HashSet::new(),
            row: 0,
        })
    }

    /// Cell of the `nth` declared field in the current record.
    fn cell<'a>(&self, record: &'a StringRecord, nth: usize) -> &'a str {
        record.get(self.indices[nth]).unwrap_or("")
    }

    fn bad_cell(&self, nth: usize, value: &str, reason: String) -> SchemaError {
        SchemaError::BadCell {
            side: self.map.side,
            row: self.row,
            column: self.map.fields[nth].1,
            value: value.to_string(),
            reason,
        }
    }

    /// Checks uniqueness of the join key. Duplicates would fan out the
    /// join, so they fail the load instead of reaching the reconciler.
    fn take_id(&mut self, record: &StringRecord, nth: usize) -> Result<String, SchemaError> {
        self.row += 1;
        let id = self.cell(record, nth);
        if id.is_empty() {
            return Err(self.bad_cell(nth, id, "empty transaction id".to_string()));
        }
        if !self.seen_ids.insert(id.to_string()) {
            return Err(SchemaError::DuplicateId {
                side: self.map.side,
                id: id.to_string(),
            });
        }
        Ok(id.to_string())
    }

    fn amount(&self, record: &StringRecord, nth: usize) -> Result<Decimal, SchemaError> {
        let value = self.cell(record, nth);
        value
            .parse()
            .map_err(|e: rust_decimal::Error| self.bad_cell(nth, value, e.to_string()))
    }

    fn date(&self, record: &StringRecord, nth: usize) -> Result<NaiveDate, SchemaError> {
        let value = self.cell(record, nth);
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
            .ok_or_else(|| {
                self.bad_cell(
                    nth,
                    value,
                    format!("expected a date in one of {:?}", DATE_FORMATS),
                )
            })
    }
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening extract {:?}", path))
}

/// Loads and normalizes the bank statement extract.
pub fn load_bank_statement(path: &Path) -> Result<Vec<BankRecord>> {
    let mut csv_rdr = open_reader(path)?;
    let headers = csv_rdr.headers()?.clone();
    let mut side = SideReader::new(&BANK_FIELDS, &headers)?;

    let mut records = Vec::new();
    for result in csv_rdr.records() {
        let record = result?;
        records.push(BankRecord {
            transaction_id: side.take_id(&record, 0)?,
            bank_amount: side.amount(&record, 1)?,
            transaction_date: side.date(&record, 2)?,
            transaction_type: side.cell(&record, 3).to_string(),
        });
    }
    log::info!("loaded {} bank statement records from {:?}", records.len(), path);
    Ok(records)
}

/// Loads and normalizes the internal database extract.
pub fn load_db_extract(path: &Path) -> Result<Vec<DbRecord>> {
    let mut csv_rdr = open_reader(path)?;
    let headers = csv_rdr.headers()?.clone();
    let mut side = SideReader::new(&DB_FIELDS, &headers)?;

    let mut records = Vec::new();
    for result in csv_rdr.records() {
        let record = result?;
        records.push(DbRecord {
            transaction_id: side.take_id(&record, 0)?,
            db_amount: side.amount(&record, 1)?,
            transaction_type: side.cell(&record, 2).to_string(),
        });
    }
    log::info!("loaded {} db extract records from {:?}", records.len(), path);
    Ok(records)
}
