//! I/O module
//!
//! Handles the CSV exchange with the ERP.
//!
//! # Components
//!
//! - `csv_format` - export of sync-ready transactions and coding imports

pub mod csv_format;

pub use csv_format::{
    convert_coding_record, read_coding_csv, write_transactions_csv, CodingCsvRecord, EXPORT_HEADER,
};
