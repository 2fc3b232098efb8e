//! Record types flowing through a reconciliation run.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Normalized name of the join key column. Both extracts rename their raw
/// reference-identifier column to this before the join.
pub const JOIN_KEY: &str = "transaction_id";

/// One row of the bank statement extract, after field normalization.
#[derive(Clone, Debug, PartialEq)]
pub struct BankRecord {
    pub transaction_id: String,
    pub bank_amount: Decimal,
    pub transaction_date: NaiveDate,
    pub transaction_type: String,
}

/// One row of the internal database extract, after field normalization.
#[derive(Clone, Debug, PartialEq)]
pub struct DbRecord {
    pub transaction_id: String,
    pub db_amount: Decimal,
    pub transaction_type: String,
}

/// Outcome assigned to every joined transaction. Exactly one of these four
/// applies to each row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReconStatus {
    Reconciled,
    MissingInBank,
    MissingInDb,
    Discrepancy,
}

impl ReconStatus {
    /// The label written to the report CSVs.
    pub fn as_str(self) -> &'static str {
        use ReconStatus::*;
        match self {
            Reconciled => "Reconciled",
            MissingInBank => "Missing in Bank Statement",
            MissingInDb => "Missing in DB Statement",
            Discrepancy => "Discrepancy Found",
        }
    }
}

impl fmt::Display for ReconStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        f.write_str(self.as_str())
    }
}

/// One row of the reconciliation output. Fields from an absent side are
/// `None`; `transaction_date` is sourced from the bank side only.
#[derive(Clone, Debug, PartialEq)]
pub struct ReconciledRecord {
    pub transaction_id: String,
    pub bank_amount: Option<Decimal>,
    pub db_amount: Option<Decimal>,
    pub transaction_date: Option<NaiveDate>,
    pub status: ReconStatus,
}
