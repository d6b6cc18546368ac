//! Transaction coding and ERP sync
//!
//! Posted transactions are completed after the fact: a receipt and the
//! GL account / department / cost center coding are attached, which moves the
//! derived status from Pending Receipt through Pending Coding to Ready to
//! Sync. Syncing stamps `synced_at` on every Ready-to-Sync row.

use chrono::{DateTime, Utc};
use std::io::{Read, Write};
use std::sync::Arc;

use super::traits::LedgerStore;
use crate::io::{read_coding_csv, write_transactions_csv};
use crate::types::{LedgerError, Transaction, TransactionCoding, TransactionId, TransactionStatus};

#[derive(Debug)]
pub struct TransactionLedger<S> {
    store: Arc<S>,
}

impl<S> Clone for TransactionLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LedgerStore> TransactionLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// All transactions, optionally restricted to one status
    pub fn transactions(&self, status: Option<TransactionStatus>) -> Vec<Transaction> {
        let mut rows = self.store.transactions();
        if let Some(status) = status {
            rows.retain(|tx| tx.status == status);
        }
        rows
    }

    pub fn transaction(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        self.store
            .transaction(id)
            .ok_or_else(|| LedgerError::not_found("Transaction", id))
    }

    /// Attach coding and receipt details; the status is re-derived
    pub fn code(&self, id: TransactionId, coding: TransactionCoding) -> Result<Transaction, LedgerError> {
        self.store.update_transaction(id, |tx| {
            if tx.synced_at.is_some() {
                return Err(LedgerError::conflict(format!(
                    "Transaction {} is already synced",
                    tx.id
                )));
            }
            coding.apply(tx);
            Ok(())
        })?;
        let transaction = self.transaction(id)?;
        tracing::debug!(transaction_id = id, status = transaction.status.label(), "Transaction coded");
        Ok(transaction)
    }

    /// Apply a CSV coding import
    ///
    /// Every referenced transaction must exist and be unsynced before any
    /// row is applied.
    pub fn import_coding<R: Read>(&self, input: R) -> Result<Vec<Transaction>, LedgerError> {
        let rows = read_coding_csv(input)?;
        for (id, _) in &rows {
            let transaction = self.transaction(*id)?;
            if transaction.synced_at.is_some() {
                return Err(LedgerError::conflict(format!(
                    "Transaction {} is already synced",
                    id
                )));
            }
        }

        let coded = rows
            .into_iter()
            .map(|(id, coding)| self.code(id, coding))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::info!(rows = coded.len(), "Coding import applied");
        Ok(coded)
    }

    pub fn ready_to_sync(&self) -> Vec<Transaction> {
        self.transactions(Some(TransactionStatus::ReadyToSync))
    }

    /// Mark every Ready-to-Sync transaction as synced
    pub fn sync_ready(&self) -> Result<Vec<Transaction>, LedgerError> {
        self.sync_ready_at(Utc::now())
    }

    pub fn sync_ready_at(&self, now: DateTime<Utc>) -> Result<Vec<Transaction>, LedgerError> {
        let mut synced = Vec::new();
        for candidate in self.ready_to_sync() {
            let marked = self.store.update_transaction(candidate.id, |tx| {
                if tx.status != TransactionStatus::ReadyToSync {
                    return Ok(false);
                }
                tx.synced_at = Some(now);
                Ok(true)
            })?;
            if marked {
                synced.push(self.transaction(candidate.id)?);
            }
        }
        tracing::info!(count = synced.len(), "Transactions synced to ERP");
        Ok(synced)
    }

    /// Write the Ready-to-Sync set as CSV
    pub fn export_ready(&self, output: &mut dyn Write) -> Result<usize, LedgerError> {
        let rows = self.ready_to_sync();
        write_transactions_csv(&rows, output)?;
        Ok(rows.len())
    }
}
