//! Card lifecycle management
//!
//! This module provides `CardLifecycleManager`, which owns every card status
//! transition and its side effects:
//! - creating cards, either awaiting approval or pre-activated
//! - generating card number, CVV and expiry on first activation
//! - locking, unlocking and suspending cards
//! - refusing to suspend or delete cards that back an invoice
//! - evaluating the one-time-card auto-suspend predicate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use super::traits::LedgerStore;
use crate::types::{
    ApprovalDecision, ApprovalId, ApprovalStatus, Card, CardApproval, CardCredentials, CardId,
    CardStatus, CardUpdate, Invoice, LedgerError, LimitType, NewApproval, NewCard, Transaction,
    TransactionCount,
};

/// Why a one-time card should be retired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AutoSuspendReason {
    #[serde(rename = "Spend limit exhausted")]
    SpendLimitExhausted,
    #[serde(rename = "Single transaction consumed")]
    SingleTransactionConsumed,
}

impl fmt::Display for AutoSuspendReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutoSuspendReason::SpendLimitExhausted => f.write_str("Spend limit exhausted"),
            AutoSuspendReason::SingleTransactionConsumed => {
                f.write_str("Single transaction consumed")
            }
        }
    }
}

/// Auto-suspend verdict for a card given its completed charge count
///
/// Only one-time cards qualify. An exhausted limit takes priority over a
/// consumed single-transaction allowance.
pub fn auto_suspend_reason(card: &Card, completed_charges: usize) -> Option<AutoSuspendReason> {
    if card.limit_type != LimitType::OneTime {
        return None;
    }
    if card.current_spend >= card.spend_limit {
        return Some(AutoSuspendReason::SpendLimitExhausted);
    }
    if card.transaction_count == TransactionCount::One && completed_charges > 0 {
        return Some(AutoSuspendReason::SingleTransactionConsumed);
    }
    None
}

/// Auto-suspend verdict for a card given its posted transactions
pub fn evaluate_auto_suspend(card: &Card, transactions: &[Transaction]) -> Option<AutoSuspendReason> {
    let completed = transactions
        .iter()
        .filter(|tx| tx.card_id == Some(card.id))
        .count();
    auto_suspend_reason(card, completed)
}

/// Apply a status transition to a card row in place
///
/// `locked_invoice` is the invoice bound to this card, if any; it is only
/// consulted when suspending.
pub fn apply_transition(
    card: &mut Card,
    target: CardStatus,
    locked_invoice: Option<&Invoice>,
    now: DateTime<Utc>,
) -> Result<(), LedgerError> {
    if card.status == target {
        return Ok(());
    }
    if !card.status.can_transition_to(target) {
        return Err(LedgerError::conflict(format!(
            "Cannot change card {} from {} to {}",
            card.id, card.status, target
        )));
    }

    if target == CardStatus::Suspended {
        if let Some(invoice) = locked_invoice {
            if card.current_spend > Decimal::ZERO {
                return Err(LedgerError::conflict(format!(
                    "Card {} is locked to invoice {} with non-zero spend",
                    card.id, invoice.invoice_number
                )));
            }
        }
    }

    if card.status == CardStatus::PendingApproval && target == CardStatus::Active {
        card.issue_credentials(CardCredentials::generate(&mut rand::thread_rng(), now));
    }

    card.status = target;
    Ok(())
}

/// Governs card creation and status transitions
#[derive(Debug)]
pub struct CardLifecycleManager<S> {
    store: Arc<S>,
}

impl<S> Clone for CardLifecycleManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LedgerStore> CardLifecycleManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create a card in Pending Approval together with its level-1 approval
    ///
    /// The approver named in `approved_by` becomes the approval's approver;
    /// the card itself records an approver only once the request is decided.
    pub fn request_card(&self, mut new: NewCard) -> Result<(Card, CardApproval), LedgerError> {
        validate_new_card(&new)?;
        let approver_name = new
            .approved_by
            .take()
            .unwrap_or_else(|| "Unassigned".to_string());
        new.status = Some(CardStatus::PendingApproval);

        let card = self.store.insert_card(new)?;
        let approval = self.store.insert_approval(NewApproval {
            card_request_id: card.id,
            approver_name,
            approver_role: None,
            comments: None,
            approval_level: Some(1),
        })?;

        tracing::info!(
            card_id = card.id,
            approval_id = approval.id,
            spend_limit = %card.spend_limit,
            "Card requested"
        );
        Ok((card, approval))
    }

    /// Create a card that skips approval and is Active immediately
    pub fn issue_active_card(&self, mut new: NewCard) -> Result<Card, LedgerError> {
        validate_new_card(&new)?;
        new.status = Some(CardStatus::Active);

        let card = self.store.insert_card(new)?;
        let now = Utc::now();
        let card = self.store.update_card(card.id, |card| {
            card.issue_credentials(CardCredentials::generate(&mut rand::thread_rng(), now));
            Ok(card.clone())
        })?;

        tracing::info!(
            card_id = card.id,
            invoice_id = ?card.invoice_id,
            spend_limit = %card.spend_limit,
            "Card issued pre-activated"
        );
        Ok(card)
    }

    /// Create a card in the status the caller asked for
    ///
    /// Only Pending Approval (the default) and Active are accepted.
    pub fn create_card(&self, new: NewCard) -> Result<Card, LedgerError> {
        match new.status.unwrap_or(CardStatus::PendingApproval) {
            CardStatus::PendingApproval => self.request_card(new).map(|(card, _)| card),
            CardStatus::Active => self.issue_active_card(new),
            other => Err(LedgerError::validation(format!(
                "Cards cannot be created in status {}",
                other
            ))),
        }
    }

    pub fn card(&self, card_id: CardId) -> Result<Card, LedgerError> {
        self.store
            .card(card_id)
            .ok_or_else(|| LedgerError::not_found("Card", card_id))
    }

    pub fn cards(&self) -> Vec<Card> {
        self.store.cards()
    }

    /// Record an approver's decision and move the card accordingly
    ///
    /// Rejected retires the card at once. Approved activates it (generating
    /// its credentials) only once every approval level on the card is
    /// Approved. An approval is decided exactly once, and is restored to
    /// Pending if the card cannot follow the decision.
    pub fn decide_approval(
        &self,
        approval_id: ApprovalId,
        decision: ApprovalDecision,
        approver_name: &str,
        comments: Option<String>,
    ) -> Result<(CardApproval, Card), LedgerError> {
        let approval = self
            .store
            .approval(approval_id)
            .ok_or_else(|| LedgerError::not_found("Card approval", approval_id))?;
        let card = self.card(approval.card_request_id)?;
        if card.status != CardStatus::PendingApproval {
            return Err(LedgerError::conflict(format!(
                "Card {} is not awaiting approval (status {})",
                card.id, card.status
            )));
        }

        let now = Utc::now();
        let undecided = approval.clone();
        let approval = self.store.update_approval(approval_id, |approval| {
            if approval.is_decided() {
                return Err(LedgerError::conflict(format!(
                    "Approval {} was already {:?}",
                    approval.id, approval.status
                )));
            }
            approval.status = ApprovalStatus::from(decision);
            approval.approved_at = Some(now);
            if !approver_name.is_empty() {
                approval.approver_name = approver_name.to_string();
            }
            if comments.is_some() {
                approval.comments = comments;
            }
            Ok(approval.clone())
        })?;

        let target = match decision {
            ApprovalDecision::Rejected => CardStatus::Rejected,
            ApprovalDecision::Approved if self.all_levels_approved(card.id) => CardStatus::Active,
            ApprovalDecision::Approved => {
                tracing::info!(
                    approval_id,
                    card_id = card.id,
                    level = approval.approval_level,
                    "Approval level passed; card still awaiting other levels"
                );
                return Ok((approval, card));
            }
        };
        let updated = self.store.update_card(card.id, |card| {
            apply_transition(card, target, None, now)?;
            card.approved_by = Some(approval.approver_name.clone());
            Ok(card.clone())
        });
        let card = match updated {
            Ok(card) => card,
            Err(e) => {
                self.store.update_approval(approval_id, |approval| {
                    *approval = undecided;
                    Ok(())
                })?;
                tracing::warn!(approval_id, error = %e, "Card update failed; approval left pending");
                return Err(e);
            }
        };

        tracing::info!(
            approval_id,
            card_id = card.id,
            decision = ?decision,
            approver = %approval.approver_name,
            "Card approval decided"
        );
        Ok((approval, card))
    }

    fn all_levels_approved(&self, card_id: CardId) -> bool {
        self.store
            .approvals()
            .iter()
            .filter(|a| a.card_request_id == card_id)
            .all(|a| a.status == ApprovalStatus::Approved)
    }

    /// Move a card to `target`, enforcing the lifecycle and invoice-lock rules
    pub fn transition(&self, card_id: CardId, target: CardStatus) -> Result<Card, LedgerError> {
        let locked_invoice = self.locked_invoice_for(card_id, target);
        let now = Utc::now();
        let card = self.store.update_card(card_id, |card| {
            let from = card.status;
            apply_transition(card, target, locked_invoice.as_ref(), now)?;
            tracing::info!(card_id = card.id, from = %from, to = %target, "Card status changed");
            Ok(card.clone())
        })?;
        Ok(card)
    }

    /// Active → Locked
    pub fn lock_card(&self, card_id: CardId) -> Result<Card, LedgerError> {
        self.transition(card_id, CardStatus::Locked)
    }

    /// Locked → Active
    pub fn unlock_card(&self, card_id: CardId) -> Result<Card, LedgerError> {
        self.transition(card_id, CardStatus::Active)
    }

    /// Active or Locked → Suspended
    ///
    /// Fails while the card backs an invoice and has non-zero spend.
    pub fn suspend_card(&self, card_id: CardId) -> Result<Card, LedgerError> {
        self.transition(card_id, CardStatus::Suspended)
    }

    /// Generic partial update
    ///
    /// A card issued for an invoice only accepts status changes until it is
    /// suspended; any other field in the update rejects the whole update.
    pub fn update_card(&self, card_id: CardId, update: CardUpdate) -> Result<Card, LedgerError> {
        let current = self.card(card_id)?;
        if current.invoice_id.is_some() && current.status != CardStatus::Suspended {
            let blocked = update.non_status_fields();
            if !blocked.is_empty() {
                return Err(LedgerError::blocked_fields(
                    format!(
                        "Card {} is bound to an invoice; only status can be changed",
                        card_id
                    ),
                    blocked,
                ));
            }
        }
        if let Some(limit) = update.spend_limit {
            if limit <= Decimal::ZERO {
                return Err(LedgerError::validation("spendLimit must be greater than zero"));
            }
        }

        let locked_invoice = update
            .status
            .and_then(|target| self.locked_invoice_for(card_id, target));
        let now = Utc::now();
        self.store.update_card(card_id, |card| {
            if let Some(limit) = update.spend_limit {
                if limit < card.current_spend {
                    return Err(LedgerError::validation(format!(
                        "spendLimit {} is below the card's current spend {}",
                        limit, card.current_spend
                    )));
                }
            }
            if let Some(target) = update.status {
                apply_transition(card, target, locked_invoice.as_ref(), now)?;
            }
            update.apply_fields(card);
            Ok(card.clone())
        })
    }

    /// Hard-delete a card that no invoice is bound to
    pub fn delete_card(&self, card_id: CardId) -> Result<Card, LedgerError> {
        self.card(card_id)?;
        if let Some(invoice) = self.store.invoice_locked_to(card_id) {
            return Err(LedgerError::conflict(format!(
                "Card {} is locked to invoice {} and cannot be deleted",
                card_id, invoice.invoice_number
            )));
        }
        let card = self.store.remove_card(card_id)?;
        tracing::info!(card_id, "Card deleted");
        Ok(card)
    }

    /// Auto-suspend predicate for a stored card
    pub fn auto_suspend_status(
        &self,
        card_id: CardId,
    ) -> Result<(Card, Option<AutoSuspendReason>), LedgerError> {
        let card = self.card(card_id)?;
        let transactions = self.store.transactions_for_card(card_id);
        let reason = evaluate_auto_suspend(&card, &transactions);
        Ok((card, reason))
    }

    fn locked_invoice_for(&self, card_id: CardId, target: CardStatus) -> Option<Invoice> {
        if target == CardStatus::Suspended {
            self.store.invoice_locked_to(card_id)
        } else {
            None
        }
    }
}

fn validate_new_card(new: &NewCard) -> Result<(), LedgerError> {
    if new.cardholder_name.trim().is_empty() {
        return Err(LedgerError::validation("cardholderName is required"));
    }
    if new.spend_limit <= Decimal::ZERO {
        return Err(LedgerError::validation("spendLimit must be greater than zero"));
    }
    if let (Some(from), Some(until)) = (new.valid_from, new.valid_until) {
        if until <= from {
            return Err(LedgerError::validation("validUntil must be after validFrom"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger_store::InMemoryLedger;
    use crate::types::{NewInvoice, NewTransaction, PaymentMethod};
    use chrono::{Datelike, NaiveDate};
    use std::thread;

    fn setup() -> (Arc<InMemoryLedger>, CardLifecycleManager<InMemoryLedger>) {
        let store = Arc::new(InMemoryLedger::new(Decimal::new(1000, 0)));
        let manager = CardLifecycleManager::new(Arc::clone(&store));
        (store, manager)
    }

    fn new_card(limit: i64) -> NewCard {
        NewCard {
            cardholder_name: "Sam Field".to_string(),
            spend_limit: Decimal::new(limit, 0),
            purpose: "Conference travel".to_string(),
            requested_by: "sam".to_string(),
            approved_by: Some("Finance Lead".to_string()),
            ..Default::default()
        }
    }

    fn bind_invoice(store: &InMemoryLedger, card_id: CardId) -> Invoice {
        let invoice = store
            .insert_invoice(NewInvoice {
                invoice_number: "INV-42".to_string(),
                vendor_name: "Acme".to_string(),
                vendor_email: None,
                amount: Decimal::new(200, 0),
                due_date: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
                status: None,
                description: None,
                payment_method: None,
                payment_terms: Default::default(),
                approved_by: None,
            })
            .unwrap();
        store
            .update_invoice(invoice.id, |inv| {
                inv.locked_card_id = Some(card_id);
                Ok(inv.clone())
            })
            .unwrap()
    }

    fn set_spend(store: &InMemoryLedger, card_id: CardId, spend: Decimal) {
        store
            .update_card(card_id, |card| {
                card.current_spend = spend;
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_request_card_creates_pending_card_and_level_one_approval() {
        let (store, manager) = setup();

        let (card, approval) = manager.request_card(new_card(500)).unwrap();

        assert_eq!(card.status, CardStatus::PendingApproval);
        assert!(card.card_number.is_none());
        assert_eq!(approval.card_request_id, card.id);
        assert_eq!(approval.approval_level, 1);
        assert_eq!(approval.status, ApprovalStatus::Pending);
        assert_eq!(approval.approver_name, "Finance Lead");
        assert_eq!(store.approvals().len(), 1);
    }

    #[test]
    fn test_request_card_validates_input() {
        let (store, manager) = setup();
        let mut invalid = new_card(0);
        invalid.cardholder_name = "X".to_string();

        let result = manager.request_card(invalid);

        assert!(matches!(result, Err(LedgerError::Validation { .. })));
        assert!(store.cards().is_empty());
    }

    #[test]
    fn test_approval_generates_credentials_once() {
        let (_store, manager) = setup();
        let (card, approval) = manager.request_card(new_card(500)).unwrap();

        let (approval, card_after) = manager
            .decide_approval(approval.id, ApprovalDecision::Approved, "Alex CFO", None)
            .unwrap();

        assert_eq!(approval.status, ApprovalStatus::Approved);
        assert!(approval.approved_at.is_some());
        assert_eq!(card_after.id, card.id);
        assert_eq!(card_after.status, CardStatus::Active);
        assert_eq!(card_after.approved_by.as_deref(), Some("Alex CFO"));

        let number = card_after.card_number.clone().unwrap();
        assert_eq!(number.len(), 16);
        assert!(number.starts_with("4571"));
        assert!(number.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(card_after.last4.as_deref(), Some(&number[12..]));

        let now = Utc::now();
        let expected_expiry = format!("{:02}/{:02}", now.month(), (now.year() + 2) % 100);
        assert_eq!(card_after.expiry_date.as_deref(), Some(expected_expiry.as_str()));
        let cvv: u32 = card_after.cvv.unwrap().parse().unwrap();
        assert!((100..=999).contains(&cvv));
    }

    #[test]
    fn test_approval_is_terminal() {
        let (_store, manager) = setup();
        let (_, approval) = manager.request_card(new_card(500)).unwrap();
        manager
            .decide_approval(approval.id, ApprovalDecision::Rejected, "Alex CFO", None)
            .unwrap();

        let again =
            manager.decide_approval(approval.id, ApprovalDecision::Approved, "Alex CFO", None);

        assert!(matches!(again, Err(LedgerError::Conflict { .. })));
    }

    #[test]
    fn test_rejection_generates_no_credentials() {
        let (_store, manager) = setup();
        let (_, approval) = manager.request_card(new_card(500)).unwrap();

        let (_, card) = manager
            .decide_approval(
                approval.id,
                ApprovalDecision::Rejected,
                "Alex CFO",
                Some("Budget frozen".to_string()),
            )
            .unwrap();

        assert_eq!(card.status, CardStatus::Rejected);
        assert!(card.card_number.is_none());
        assert!(card.cvv.is_none());
    }

    #[test]
    fn test_decide_missing_approval_is_not_found() {
        let (_store, manager) = setup();
        let result = manager.decide_approval(9, ApprovalDecision::Approved, "x", None);
        assert_eq!(result.unwrap_err(), LedgerError::not_found("Card approval", 9));
    }

    #[test]
    fn test_lock_unlock_cycle() {
        let (_store, manager) = setup();
        let card = manager.issue_active_card(new_card(100)).unwrap();

        assert_eq!(manager.lock_card(card.id).unwrap().status, CardStatus::Locked);
        assert_eq!(manager.unlock_card(card.id).unwrap().status, CardStatus::Active);
    }

    #[test]
    fn test_unlock_does_not_regenerate_credentials() {
        let (_store, manager) = setup();
        let card = manager.issue_active_card(new_card(100)).unwrap();
        manager.lock_card(card.id).unwrap();

        let unlocked = manager.unlock_card(card.id).unwrap();

        assert_eq!(unlocked.card_number, card.card_number);
        assert_eq!(unlocked.cvv, card.cvv);
    }

    #[test]
    fn test_suspended_is_terminal() {
        let (_store, manager) = setup();
        let card = manager.issue_active_card(new_card(100)).unwrap();
        manager.suspend_card(card.id).unwrap();

        let result = manager.unlock_card(card.id);

        assert!(matches!(result, Err(LedgerError::Conflict { .. })));
    }

    #[test]
    fn test_lock_pending_card_is_rejected() {
        let (_store, manager) = setup();
        let (card, _) = manager.request_card(new_card(100)).unwrap();
        assert!(matches!(
            manager.lock_card(card.id),
            Err(LedgerError::Conflict { .. })
        ));
    }

    #[test]
    fn test_suspend_locked_to_invoice_with_spend_conflicts() {
        let (store, manager) = setup();
        let card = manager.issue_active_card(new_card(200)).unwrap();
        bind_invoice(&store, card.id);
        set_spend(&store, card.id, Decimal::new(50, 0));

        let result = manager.suspend_card(card.id);

        match result {
            Err(LedgerError::Conflict { message, .. }) => {
                assert!(message.contains("locked to invoice INV-42 with non-zero spend"));
            }
            other => panic!("Expected Conflict, got {:?}", other),
        }
        assert_eq!(store.card(card.id).unwrap().status, CardStatus::Active);
    }

    #[test]
    fn test_suspend_locked_to_invoice_without_spend_succeeds() {
        let (store, manager) = setup();
        let card = manager.issue_active_card(new_card(200)).unwrap();
        bind_invoice(&store, card.id);

        let suspended = manager.suspend_card(card.id).unwrap();

        assert_eq!(suspended.status, CardStatus::Suspended);
    }

    #[test]
    fn test_delete_card_locked_to_invoice_conflicts_regardless_of_spend() {
        let (store, manager) = setup();
        let card = manager.issue_active_card(new_card(200)).unwrap();
        bind_invoice(&store, card.id);

        assert!(matches!(
            manager.delete_card(card.id),
            Err(LedgerError::Conflict { .. })
        ));
        assert!(store.card(card.id).is_some());
    }

    #[test]
    fn test_delete_unbound_card() {
        let (store, manager) = setup();
        let card = manager.issue_active_card(new_card(200)).unwrap();

        manager.delete_card(card.id).unwrap();

        assert!(store.card(card.id).is_none());
    }

    #[test]
    fn test_invoice_card_accepts_status_only_updates() {
        let (_store, manager) = setup();
        let mut request = new_card(200);
        request.invoice_id = Some(1);
        let card = manager.issue_active_card(request).unwrap();

        let rejected = manager.update_card(
            card.id,
            CardUpdate {
                status: Some(CardStatus::Locked),
                spend_limit: Some(Decimal::new(900, 0)),
                purpose: Some("other".to_string()),
                ..Default::default()
            },
        );
        match rejected {
            Err(LedgerError::Conflict { blocked_fields, .. }) => {
                assert_eq!(blocked_fields, vec!["spendLimit", "purpose"]);
            }
            other => panic!("Expected Conflict, got {:?}", other),
        }
        assert_eq!(manager.card(card.id).unwrap().status, CardStatus::Active);

        let locked = manager
            .update_card(
                card.id,
                CardUpdate {
                    status: Some(CardStatus::Locked),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(locked.status, CardStatus::Locked);
    }

    #[test]
    fn test_spend_limit_below_current_spend_is_rejected() {
        let (store, manager) = setup();
        let card = manager.issue_active_card(new_card(500)).unwrap();
        set_spend(&store, card.id, Decimal::new(300, 0));

        let lowered = manager.update_card(
            card.id,
            CardUpdate {
                spend_limit: Some(Decimal::new(299, 0)),
                ..Default::default()
            },
        );
        assert!(matches!(lowered, Err(LedgerError::Validation { .. })));
        assert_eq!(manager.card(card.id).unwrap().spend_limit, Decimal::new(500, 0));

        let exact = manager
            .update_card(
                card.id,
                CardUpdate {
                    spend_limit: Some(Decimal::new(300, 0)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(exact.spend_limit, Decimal::new(300, 0));
    }

    #[test]
    fn test_approval_never_outlives_a_card_that_moved_on() {
        for _ in 0..50 {
            let (store, manager) = setup();
            let (card, approval) = manager.request_card(new_card(500)).unwrap();

            let approver = {
                let manager = manager.clone();
                thread::spawn(move || {
                    manager.decide_approval(approval.id, ApprovalDecision::Approved, "CFO", None)
                })
            };
            let rejecter = {
                let manager = manager.clone();
                thread::spawn(move || manager.transition(card.id, CardStatus::Rejected))
            };
            let approved = approver.join().unwrap();
            let _ = rejecter.join().unwrap();

            let approval = store.approval(approval.id).unwrap();
            let card = store.card(card.id).unwrap();
            match card.status {
                CardStatus::Active => {
                    assert!(approved.is_ok());
                    assert_eq!(approval.status, ApprovalStatus::Approved);
                }
                CardStatus::Rejected => {
                    assert!(approved.is_err());
                    assert_eq!(approval.status, ApprovalStatus::Pending);
                }
                other => panic!("Unexpected card status {}", other),
            }
        }
    }

    #[test]
    fn test_patch_to_active_generates_credentials() {
        let (_store, manager) = setup();
        let (card, _) = manager.request_card(new_card(200)).unwrap();

        let active = manager
            .update_card(
                card.id,
                CardUpdate {
                    status: Some(CardStatus::Active),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(active.card_number.is_some());
        assert!(active.expiry_date.is_some());
    }

    fn posted(card_id: CardId) -> Transaction {
        Transaction::from_new(
            1,
            NewTransaction {
                card_id: Some(card_id),
                invoice_id: None,
                amount: Decimal::new(10, 0),
                vendor_name: "Acme".to_string(),
                payment_method: PaymentMethod::Card,
                gl_account: None,
                department: None,
                cost_center: None,
                memo: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_auto_suspend_spend_limit_takes_priority() {
        let mut card = Card::from_new(1, new_card(100), Utc::now());
        card.transaction_count = TransactionCount::One;
        card.current_spend = Decimal::new(100, 0);

        let reason = evaluate_auto_suspend(&card, &[posted(1)]);

        assert_eq!(reason, Some(AutoSuspendReason::SpendLimitExhausted));
    }

    #[test]
    fn test_auto_suspend_single_transaction_consumed() {
        let mut card = Card::from_new(1, new_card(100), Utc::now());
        card.transaction_count = TransactionCount::One;
        card.current_spend = Decimal::new(10, 0);

        assert_eq!(evaluate_auto_suspend(&card, &[]), None);
        assert_eq!(
            evaluate_auto_suspend(&card, &[posted(1)]),
            Some(AutoSuspendReason::SingleTransactionConsumed)
        );
    }

    #[test]
    fn test_auto_suspend_ignores_recurring_cards() {
        let mut card = Card::from_new(1, new_card(100), Utc::now());
        card.limit_type = LimitType::Recurring;
        card.current_spend = Decimal::new(100, 0);

        assert_eq!(evaluate_auto_suspend(&card, &[posted(1)]), None);
    }
}
