//! Ledger service bundle
//!
//! `Ledger` wires every service to one shared store. It is cheap to clone:
//! each service holds an `Arc` of the store, so clones share all state.

use std::sync::Arc;

use super::approval_workflow::ApprovalWorkflow;
use super::authorizer::TransactionAuthorizer;
use super::card_lifecycle::CardLifecycleManager;
use super::config::LedgerConfig;
use super::invoice_ledger::InvoiceLedger;
use super::invoice_payments::InvoicePaymentOrchestrator;
use super::ledger_store::InMemoryLedger;
use super::reports::{summarize, LedgerSummary};
use super::traits::LedgerStore;
use super::transaction_ledger::TransactionLedger;
use super::wallet_manager::WalletManager;
use crate::types::LedgerError;

#[derive(Debug)]
pub struct Ledger<S> {
    store: Arc<S>,
    pub cards: CardLifecycleManager<S>,
    pub authorizer: TransactionAuthorizer<S>,
    pub approvals: ApprovalWorkflow<S>,
    pub invoices: InvoiceLedger<S>,
    pub invoice_payments: InvoicePaymentOrchestrator<S>,
    pub transactions: TransactionLedger<S>,
    pub wallet: WalletManager<S>,
}

impl<S> Clone for Ledger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cards: self.cards.clone(),
            authorizer: self.authorizer.clone(),
            approvals: self.approvals.clone(),
            invoices: self.invoices.clone(),
            invoice_payments: self.invoice_payments.clone(),
            transactions: self.transactions.clone(),
            wallet: self.wallet.clone(),
        }
    }
}

impl<S: LedgerStore> Ledger<S> {
    pub fn new(store: Arc<S>, config: &LedgerConfig) -> Self {
        let cards = CardLifecycleManager::new(Arc::clone(&store));
        let authorizer = TransactionAuthorizer::new(Arc::clone(&store), config.auto_suspend);
        let invoices = InvoiceLedger::new(Arc::clone(&store));
        let invoice_payments = InvoicePaymentOrchestrator::new(
            Arc::clone(&store),
            cards.clone(),
            authorizer.clone(),
            invoices.clone(),
        );
        let approvals = ApprovalWorkflow::new(Arc::clone(&store), cards.clone());

        Self {
            transactions: TransactionLedger::new(Arc::clone(&store)),
            wallet: WalletManager::new(Arc::clone(&store)),
            store,
            cards,
            authorizer,
            approvals,
            invoices,
            invoice_payments,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn summary(&self) -> Result<LedgerSummary, LedgerError> {
        summarize(self.store.as_ref())
    }
}

impl Ledger<InMemoryLedger> {
    /// Ledger over a fresh in-memory store funded with the configured balance
    pub fn in_memory(config: &LedgerConfig) -> Self {
        Self::new(Arc::new(InMemoryLedger::new(config.opening_balance)), config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::authorizer::ChargeRequest;
    use crate::core::config::AutoSuspendPolicy;
    use crate::types::{CardStatus, NewCard};
    use rust_decimal::Decimal;

    #[test]
    fn test_clones_share_state() {
        let config = LedgerConfig::new(Decimal::new(100, 0), AutoSuspendPolicy::Advisory);
        let ledger = Ledger::in_memory(&config);
        let clone = ledger.clone();

        let card = ledger
            .cards
            .create_card(NewCard {
                cardholder_name: "Rae".to_string(),
                spend_limit: Decimal::new(50, 0),
                status: Some(CardStatus::Active),
                ..Default::default()
            })
            .unwrap();
        let result = clone
            .authorizer
            .authorize(ChargeRequest::new(card.id, Decimal::new(20, 0)))
            .unwrap();

        assert!(result.is_approved());
        assert_eq!(ledger.wallet.wallet().unwrap().balance, Decimal::new(80, 0));
        assert_eq!(ledger.summary().unwrap().total_card_spend, Decimal::new(20, 0));
    }
}
