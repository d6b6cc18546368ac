//! CSV format handling for the ERP exchange
//!
//! This module centralizes all CSV format concerns, providing:
//! - the export of sync-ready transactions for the ERP
//! - `CodingCsvRecord` for bulk coding imports
//! - conversion from coding records to `TransactionCoding`
//!
//! All functions work on readers and writers handed in by the caller.

use serde::Deserialize;
use std::io::{Read, Write};

use crate::types::{LedgerError, Transaction, TransactionCoding, TransactionId};

/// Column order of the ERP export
pub const EXPORT_HEADER: [&str; 12] = [
    "id",
    "date",
    "vendor",
    "amount",
    "payment_method",
    "gl_account",
    "department",
    "cost_center",
    "memo",
    "receipt_url",
    "card_id",
    "invoice_id",
];

/// CSV record structure for coding imports
///
/// Matches the columns: id, gl_account, department, cost_center, memo,
/// receipt_url. Every column but `id` may be empty.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CodingCsvRecord {
    pub id: TransactionId,
    #[serde(default)]
    pub gl_account: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub cost_center: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub receipt_url: Option<String>,
}

/// Convert a coding record, dropping blank cells
pub fn convert_coding_record(record: CodingCsvRecord) -> (TransactionId, TransactionCoding) {
    let keep = |value: Option<String>| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    (
        record.id,
        TransactionCoding {
            gl_account: keep(record.gl_account),
            department: keep(record.department),
            cost_center: keep(record.cost_center),
            memo: keep(record.memo),
            receipt_url: keep(record.receipt_url),
        },
    )
}

/// Parse a coding import
///
/// # Returns
///
/// * `Ok(rows)` - every row converted, in file order
/// * `Err(LedgerError::Validation)` - the first malformed row, by 1-based data row number
pub fn read_coding_csv<R: Read>(input: R) -> Result<Vec<(TransactionId, TransactionCoding)>, LedgerError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input);

    reader
        .deserialize::<CodingCsvRecord>()
        .enumerate()
        .map(|(index, row)| {
            row.map(convert_coding_record).map_err(|e| {
                LedgerError::validation(format!("Invalid coding row {}: {}", index + 1, e))
            })
        })
        .collect()
}

/// Write transactions in the ERP export format
///
/// Rows are written in ascending id order so repeated exports diff cleanly.
///
/// # Arguments
///
/// * `transactions` - Rows to export
/// * `output` - Writer receiving the CSV
pub fn write_transactions_csv(
    transactions: &[Transaction],
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record(EXPORT_HEADER)
        .map_err(|e| LedgerError::persistence(format!("Failed to write CSV header: {}", e)))?;

    let mut sorted: Vec<&Transaction> = transactions.iter().collect();
    sorted.sort_by_key(|tx| tx.id);

    let cell = |value: &Option<String>| value.clone().unwrap_or_default();
    for tx in sorted {
        writer
            .write_record(&[
                tx.id.to_string(),
                tx.transaction_date.format("%Y-%m-%d").to_string(),
                tx.vendor_name.clone(),
                format!("{:.2}", tx.amount),
                tx.payment_method.to_string(),
                cell(&tx.gl_account),
                cell(&tx.department),
                cell(&tx.cost_center),
                cell(&tx.memo),
                cell(&tx.receipt_url),
                tx.card_id.map(|id| id.to_string()).unwrap_or_default(),
                tx.invoice_id.map(|id| id.to_string()).unwrap_or_default(),
            ])
            .map_err(|e| {
                LedgerError::persistence(format!("Failed to write transaction {}: {}", tx.id, e))
            })?;
    }

    writer
        .flush()
        .map_err(|e| LedgerError::persistence(format!("Failed to flush output: {}", e)))?;

    Ok(())
}
