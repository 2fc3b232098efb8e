//! The reconciliation core: full outer join of the two extracts and
//! first-match-wins status tagging.
//!
//! This is a pure transformation. It performs no I/O, raises no errors and
//! classifies each joined row independently of every other row, so the
//! output is invariant to input ordering.

use std::collections::BTreeMap;

use crate::config::AppConfig;
use crate::record::{BankRecord, DbRecord, ReconStatus, ReconciledRecord};

/// A transaction id paired with whichever sides carry it. At least one side
/// is always present.
struct JoinedRow<'a> {
    bank: Option<&'a BankRecord>,
    db: Option<&'a DbRecord>,
}

impl<'a> JoinedRow<'a> {
    fn unmatched() -> Self {
        JoinedRow {
            bank: None,
            db: None,
        }
    }
}

/// One status-tagging rule. Rules are evaluated in order; the first whose
/// predicate holds decides the row's status.
struct StatusRule {
    #[allow(dead_code)] // referenced from tests only
    name: &'static str,
    applies: fn(&JoinedRow, &AppConfig) -> bool,
    outcome: ReconStatus,
}

/// The tagging policy, in priority order. Absence on either side outranks
/// the matched check; the final rule is a catch-all so every row receives
/// a status.
const STATUS_RULES: &[StatusRule] = &[
    StatusRule {
        name: "missing-in-bank",
        applies: |row, _| row.bank.is_none(),
        outcome: ReconStatus::MissingInBank,
    },
    StatusRule {
        name: "missing-in-db",
        applies: |row, _| row.db.is_none(),
        outcome: ReconStatus::MissingInDb,
    },
    StatusRule {
        name: "matched",
        applies: is_matched,
        outcome: ReconStatus::Reconciled,
    },
    StatusRule {
        name: "discrepancy",
        applies: |_, _| true,
        outcome: ReconStatus::Discrepancy,
    },
];

/// Both sides present, both transaction types in their side's success
/// vocabulary, and the amount difference within tolerance (inclusive).
fn is_matched(row: &JoinedRow, params: &AppConfig) -> bool {
    let (bank, db) = match (row.bank, row.db) {
        (Some(bank), Some(db)) => (bank, db),
        _ => return false,
    };
    let status_cond = params.status_mapping.db_success.contains(&db.transaction_type)
        && params
            .status_mapping
            .bank_success
            .contains(&bank.transaction_type);
    let amount_cond = (bank.bank_amount - db.db_amount).abs() <= params.amount_tolerance;
    status_cond && amount_cond
}

fn classify(row: &JoinedRow, params: &AppConfig) -> ReconStatus {
    STATUS_RULES
        .iter()
        .find(|rule| (rule.applies)(row, params))
        .map(|rule| rule.outcome)
        // The catch-all rule always applies.
        .unwrap_or(ReconStatus::Discrepancy)
}

/// Classifies every transaction id present in either extract into exactly
/// one reconciliation outcome.
///
/// Output holds one record per distinct transaction id across both inputs,
/// in ascending id order. Inputs are assumed unique per id; the loaders
/// enforce that before records reach this function.
pub fn reconcile(
    bank: &[BankRecord],
    db: &[DbRecord],
    params: &AppConfig,
) -> Vec<ReconciledRecord> {
    let mut joined: BTreeMap<&str, JoinedRow> = BTreeMap::new();
    for record in bank {
        joined
            .entry(record.transaction_id.as_str())
            .or_insert_with(JoinedRow::unmatched)
            .bank = Some(record);
    }
    for record in db {
        joined
            .entry(record.transaction_id.as_str())
            .or_insert_with(JoinedRow::unmatched)
            .db = Some(record);
    }

    joined
        .into_iter()
        .map(|(transaction_id, row)| ReconciledRecord {
            transaction_id: transaction_id.to_string(),
            bank_amount: row.bank.map(|b| b.bank_amount),
            db_amount: row.db.map(|d| d.db_amount),
            transaction_date: row.bank.map(|b| b.transaction_date),
            status: classify(&row, params),
        })
        .collect()
}
