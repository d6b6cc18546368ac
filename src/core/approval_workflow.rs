//! Card approval workflow
//!
//! Thin composition over [`CardLifecycleManager`]: it lists pending approvals
//! joined with their card and routes decisions to
//! [`CardLifecycleManager::decide_approval`].

use std::sync::Arc;

use super::card_lifecycle::CardLifecycleManager;
use super::traits::LedgerStore;
use crate::types::{
    ApprovalDecision, ApprovalId, ApprovalStatus, Card, CardApproval, CardStatus, LedgerError,
    NewApproval, PendingApproval,
};

#[derive(Debug)]
pub struct ApprovalWorkflow<S> {
    store: Arc<S>,
    cards: CardLifecycleManager<S>,
}

impl<S> Clone for ApprovalWorkflow<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cards: self.cards.clone(),
        }
    }
}

impl<S: LedgerStore> ApprovalWorkflow<S> {
    pub fn new(store: Arc<S>, cards: CardLifecycleManager<S>) -> Self {
        Self { store, cards }
    }

    /// Undecided approvals, each with the card it gates
    ///
    /// Approvals whose card has already left Pending Approval are dropped;
    /// they can no longer be decided.
    pub fn pending(&self) -> Vec<PendingApproval> {
        self.store
            .approvals()
            .into_iter()
            .filter(|approval| approval.status == ApprovalStatus::Pending)
            .filter_map(|approval| {
                let card = self.store.card(approval.card_request_id)?;
                (card.status == CardStatus::PendingApproval)
                    .then_some(PendingApproval { approval, card })
            })
            .collect()
    }

    pub fn approvals(&self) -> Vec<CardApproval> {
        self.store.approvals()
    }

    /// Add an approval record for a card still awaiting approval
    ///
    /// Used for second-level approvals; the level defaults to one above the
    /// highest existing level for the card.
    pub fn create_approval(&self, mut new: NewApproval) -> Result<CardApproval, LedgerError> {
        if new.approver_name.trim().is_empty() {
            return Err(LedgerError::validation("approverName is required"));
        }
        let card = self.cards.card(new.card_request_id)?;
        if card.status != CardStatus::PendingApproval {
            return Err(LedgerError::conflict(format!(
                "Card {} is not awaiting approval (status {})",
                card.id, card.status
            )));
        }
        if new.approval_level.is_none() {
            let highest = self
                .store
                .approvals()
                .iter()
                .filter(|approval| approval.card_request_id == card.id)
                .map(|approval| approval.approval_level)
                .max()
                .unwrap_or(0);
            new.approval_level = Some(highest + 1);
        }

        let approval = self.store.insert_approval(new)?;
        tracing::info!(
            approval_id = approval.id,
            card_id = card.id,
            level = approval.approval_level,
            "Approval record created"
        );
        Ok(approval)
    }

    pub fn decide(
        &self,
        approval_id: ApprovalId,
        decision: ApprovalDecision,
        approver_name: &str,
        comments: Option<String>,
    ) -> Result<(CardApproval, Card), LedgerError> {
        self.cards
            .decide_approval(approval_id, decision, approver_name, comments)
    }

    pub fn approve(
        &self,
        approval_id: ApprovalId,
        approver_name: &str,
    ) -> Result<(CardApproval, Card), LedgerError> {
        self.decide(approval_id, ApprovalDecision::Approved, approver_name, None)
    }

    pub fn reject(
        &self,
        approval_id: ApprovalId,
        approver_name: &str,
        comments: Option<String>,
    ) -> Result<(CardApproval, Card), LedgerError> {
        self.decide(approval_id, ApprovalDecision::Rejected, approver_name, comments)
    }
}
