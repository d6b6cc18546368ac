//! Transaction authorization
//!
//! This module decides whether a simulated charge against a card is approved
//! or declined, and applies every consequence of an approval as one unit.
//!
//! # Architecture
//!
//! The status, validity, restriction, wallet and limit checks all run inside
//! [`LedgerStore::charge_card`], which holds the card row and the wallet for
//! the whole decision. Two concurrent charges on the same card therefore
//! serialise on the card's spend counter, and every charge serialises on the
//! wallet. A decline stages nothing, so the store writes nothing.
//!
//! # Decline Order
//!
//! 1. Card status (locked, suspended, not yet active)
//! 2. Validity window and merchant/MCC/country/channel restrictions
//! 3. Wallet balance
//! 4. Spend limit, after any recurring renewal reset

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::card_lifecycle::{auto_suspend_reason, AutoSuspendReason};
use super::config::AutoSuspendPolicy;
use super::traits::{ChargeUnit, LedgerStore};
use crate::types::{
    require_positive, Card, CardId, CardStatus, ChannelRestriction, LedgerError, NewTransaction,
    PaymentMethod, Transaction,
};

/// Where a charge is being made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChargeChannel {
    Online,
    InStore,
}

/// A charge to authorize
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeRequest {
    pub card_id: CardId,
    pub amount: Decimal,
    /// Merchant name; a placeholder is generated when absent
    #[serde(default)]
    pub merchant: Option<String>,
    #[serde(default)]
    pub mcc: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub channel: Option<ChargeChannel>,
}

impl ChargeRequest {
    pub fn new(card_id: CardId, amount: Decimal) -> Self {
        Self {
            card_id,
            amount,
            merchant: None,
            mcc: None,
            country: None,
            channel: None,
        }
    }

    pub fn with_merchant(mut self, merchant: impl Into<String>) -> Self {
        self.merchant = Some(merchant.into());
        self
    }
}

/// Why a charge was declined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    CardLocked,
    CardSuspended,
    CardNotActive,
    OutsideValidity,
    MerchantNotAllowed,
    MccNotAllowed,
    CountryNotAllowed,
    ChannelNotAllowed,
    InsufficientFunds,
    SpendLimitExceeded,
}

impl fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            DeclineReason::CardLocked => "Card is temporarily locked",
            DeclineReason::CardSuspended => "Card is suspended",
            DeclineReason::CardNotActive => "Card is not active",
            DeclineReason::OutsideValidity => "Card is not valid at this time",
            DeclineReason::MerchantNotAllowed => "Merchant not allowed",
            DeclineReason::MccNotAllowed => "Merchant category not allowed",
            DeclineReason::CountryNotAllowed => "Country not allowed",
            DeclineReason::ChannelNotAllowed => "Channel not allowed",
            DeclineReason::InsufficientFunds => "Insufficient wallet funds",
            DeclineReason::SpendLimitExceeded => "Spend limit exceeded",
        };
        f.write_str(message)
    }
}

impl Serialize for DeclineReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Everything an approved charge changed
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovedCharge {
    pub transaction: Transaction,
    pub new_wallet_balance: Decimal,
    pub new_card_spend: Decimal,
    /// The charge opened a new renewal period and reset the spend counter
    pub monthly_reset: bool,
    /// Set when the charge made a one-time card eligible for suspension
    pub auto_suspend: Option<AutoSuspendReason>,
    /// The card was suspended as part of this charge
    pub suspended: bool,
}

/// Outcome of an authorization attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Authorization {
    Approved(ApprovedCharge),
    Declined { reason: DeclineReason },
}

impl Authorization {
    pub fn is_approved(&self) -> bool {
        matches!(self, Authorization::Approved(_))
    }

    pub fn decline_reason(&self) -> Option<DeclineReason> {
        match self {
            Authorization::Approved(_) => None,
            Authorization::Declined { reason } => Some(*reason),
        }
    }
}

/// Result of the closure run inside the charge unit
enum Decision {
    Approved {
        new_wallet_balance: Decimal,
        new_card_spend: Decimal,
        monthly_reset: bool,
        auto_suspend: Option<AutoSuspendReason>,
        suspended: bool,
    },
    Declined(DeclineReason),
}

/// Authorizes charges against cards and the company wallet
#[derive(Debug)]
pub struct TransactionAuthorizer<S> {
    store: Arc<S>,
    auto_suspend: AutoSuspendPolicy,
}

impl<S> Clone for TransactionAuthorizer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            auto_suspend: self.auto_suspend,
        }
    }
}

impl<S: LedgerStore> TransactionAuthorizer<S> {
    pub fn new(store: Arc<S>, auto_suspend: AutoSuspendPolicy) -> Self {
        Self {
            store,
            auto_suspend,
        }
    }

    /// Authorize a charge at the current time
    pub fn authorize(&self, request: ChargeRequest) -> Result<Authorization, LedgerError> {
        self.authorize_at(request, Utc::now())
    }

    /// Authorize a charge as if it happened at `now`
    ///
    /// # Returns
    ///
    /// * `Ok(Authorization)` - approved with the committed rows, or declined with a reason
    /// * `Err(LedgerError)` - invalid amount, missing card, or a store failure
    pub fn authorize_at(
        &self,
        request: ChargeRequest,
        now: DateTime<Utc>,
    ) -> Result<Authorization, LedgerError> {
        let amount = require_positive(request.amount, "amount")?;
        let card_id = request.card_id;
        let merchant = request
            .merchant
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(placeholder_merchant);
        let policy = self.auto_suspend;

        let (decision, transaction) = self.store.charge_card(card_id, |unit| {
            decide(unit, &request, amount, &merchant, policy, now)
        })?;

        match (decision, transaction) {
            (
                Decision::Approved {
                    new_wallet_balance,
                    new_card_spend,
                    monthly_reset,
                    auto_suspend,
                    suspended,
                },
                Some(transaction),
            ) => {
                tracing::info!(
                    card_id,
                    transaction_id = transaction.id,
                    amount = %amount,
                    new_card_spend = %new_card_spend,
                    monthly_reset,
                    "Charge approved"
                );
                if suspended {
                    tracing::info!(card_id, reason = ?auto_suspend, "Card auto-suspended");
                }
                Ok(Authorization::Approved(ApprovedCharge {
                    transaction,
                    new_wallet_balance,
                    new_card_spend,
                    monthly_reset,
                    auto_suspend,
                    suspended,
                }))
            }
            (Decision::Declined(reason), _) => {
                tracing::info!(card_id, amount = %amount, reason = %reason, "Charge declined");
                Ok(Authorization::Declined { reason })
            }
            (Decision::Approved { .. }, None) => Err(LedgerError::persistence(format!(
                "Charge on card {} approved without a transaction row",
                card_id
            ))),
        }
    }
}

fn decide(
    unit: &mut ChargeUnit,
    request: &ChargeRequest,
    amount: Decimal,
    merchant: &str,
    policy: AutoSuspendPolicy,
    now: DateTime<Utc>,
) -> Result<Decision, LedgerError> {
    if let Some(reason) = status_decline(unit.card.status) {
        return Ok(Decision::Declined(reason));
    }
    if let Some(reason) = restriction_decline(&unit.card, request, merchant, now) {
        return Ok(Decision::Declined(reason));
    }
    if unit.wallet.balance < amount {
        return Ok(Decision::Declined(DeclineReason::InsufficientFunds));
    }

    let card = &mut unit.card;
    let mut monthly_reset = false;
    if let Some(frequency) = card.renewal_frequency.filter(|_| card.is_recurring()) {
        if frequency.period_elapsed(card.last_reset_at, now) {
            card.current_spend = Decimal::ZERO;
            card.last_reset_at = now;
            monthly_reset = true;
        }
    }

    let new_card_spend = card
        .current_spend
        .checked_add(amount)
        .ok_or_else(|| LedgerError::arithmetic_overflow("card spend"))?;
    if new_card_spend > card.spend_limit {
        return Ok(Decision::Declined(DeclineReason::SpendLimitExceeded));
    }
    card.current_spend = new_card_spend;

    let auto_suspend = auto_suspend_reason(card, 1);
    let suspended = policy == AutoSuspendPolicy::Enforce
        && auto_suspend.is_some()
        && card.invoice_id.is_none();
    if suspended {
        card.status = CardStatus::Suspended;
    }

    let transaction = NewTransaction {
        card_id: Some(card.id),
        invoice_id: card.invoice_id,
        amount,
        vendor_name: merchant.to_string(),
        payment_method: PaymentMethod::Card,
        gl_account: card.gl_account_template.clone(),
        department: card.department_template.clone(),
        cost_center: card.cost_center_template.clone(),
        memo: None,
    };
    let new_wallet_balance = unit.wallet.debit(amount)?;
    unit.stage_transaction(transaction);

    Ok(Decision::Approved {
        new_wallet_balance,
        new_card_spend,
        monthly_reset,
        auto_suspend,
        suspended,
    })
}

fn status_decline(status: CardStatus) -> Option<DeclineReason> {
    match status {
        CardStatus::Active => None,
        CardStatus::Locked => Some(DeclineReason::CardLocked),
        CardStatus::Suspended => Some(DeclineReason::CardSuspended),
        CardStatus::PendingApproval | CardStatus::Rejected => Some(DeclineReason::CardNotActive),
    }
}

fn restriction_decline(
    card: &Card,
    request: &ChargeRequest,
    merchant: &str,
    now: DateTime<Utc>,
) -> Option<DeclineReason> {
    let before_start = card.valid_from.is_some_and(|from| now < from);
    let after_end = card.valid_until.is_some_and(|until| now > until);
    if before_start || after_end {
        return Some(DeclineReason::OutsideValidity);
    }

    if !allows(&card.allowed_merchants, Some(merchant)) {
        return Some(DeclineReason::MerchantNotAllowed);
    }
    if !allows(&card.allowed_mccs, request.mcc.as_deref()) {
        return Some(DeclineReason::MccNotAllowed);
    }
    if !allows(&card.allowed_countries, request.country.as_deref()) {
        return Some(DeclineReason::CountryNotAllowed);
    }

    let channel_ok = match (card.channel_restriction, request.channel) {
        (ChannelRestriction::Any, _) | (_, None) => true,
        (ChannelRestriction::Online, Some(channel)) => channel == ChargeChannel::Online,
        (ChannelRestriction::InStore, Some(channel)) => channel == ChargeChannel::InStore,
    };
    if !channel_ok {
        return Some(DeclineReason::ChannelNotAllowed);
    }

    None
}

/// An empty allow-list permits everything; an absent value is not checked
fn allows(allowed: &[String], value: Option<&str>) -> bool {
    match value {
        Some(value) if !allowed.is_empty() => allowed
            .iter()
            .any(|entry| entry.trim().eq_ignore_ascii_case(value.trim())),
        _ => true,
    }
}

fn placeholder_merchant() -> String {
    format!("Merchant #{}", rand::thread_rng().gen_range(1000..10000))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger_store::InMemoryLedger;
    use crate::types::{LimitType, NewCard, RenewalFrequency, TransactionCount, TransactionStatus};
    use chrono::{Duration, TimeZone};
    use rstest::rstest;
    use std::thread;

    fn dec(value: i64) -> Decimal {
        Decimal::new(value, 0)
    }

    fn setup(wallet: i64) -> (Arc<InMemoryLedger>, TransactionAuthorizer<InMemoryLedger>) {
        let store = Arc::new(InMemoryLedger::new(dec(wallet)));
        let authorizer = TransactionAuthorizer::new(Arc::clone(&store), AutoSuspendPolicy::Advisory);
        (store, authorizer)
    }

    fn active_card(store: &InMemoryLedger, limit: i64, spend: i64) -> Card {
        let card = store
            .insert_card(NewCard {
                cardholder_name: "Dana Ops".to_string(),
                spend_limit: dec(limit),
                status: Some(CardStatus::Active),
                purpose: "Software".to_string(),
                requested_by: "dana".to_string(),
                ..Default::default()
            })
            .unwrap();
        store
            .update_card(card.id, |card| {
                card.current_spend = dec(spend);
                Ok(card.clone())
            })
            .unwrap()
    }

    #[test]
    fn test_insufficient_wallet_funds_declines_without_mutation() {
        let (store, authorizer) = setup(100);
        let card = active_card(&store, 500, 0);

        let result = authorizer
            .authorize(ChargeRequest::new(card.id, dec(150)))
            .unwrap();

        assert_eq!(result.decline_reason(), Some(DeclineReason::InsufficientFunds));
        assert_eq!(store.wallet().unwrap().balance, dec(100));
        assert_eq!(store.card(card.id).unwrap().current_spend, Decimal::ZERO);
        assert!(store.transactions().is_empty());
    }

    #[test]
    fn test_spend_limit_exceeded_declines_without_mutation() {
        let (store, authorizer) = setup(500);
        let card = active_card(&store, 200, 150);

        let result = authorizer
            .authorize(ChargeRequest::new(card.id, dec(100)))
            .unwrap();

        assert_eq!(result.decline_reason(), Some(DeclineReason::SpendLimitExceeded));
        assert_eq!(store.wallet().unwrap().balance, dec(500));
        assert_eq!(store.card(card.id).unwrap().current_spend, dec(150));
        assert!(store.transactions().is_empty());
    }

    #[test]
    fn test_charge_up_to_limit_is_approved() {
        let (store, authorizer) = setup(500);
        let card = active_card(&store, 200, 150);

        let result = authorizer
            .authorize(ChargeRequest::new(card.id, dec(50)).with_merchant("Figma"))
            .unwrap();

        let Authorization::Approved(charge) = result else {
            panic!("Expected approval");
        };
        assert_eq!(charge.new_wallet_balance, dec(450));
        assert_eq!(charge.new_card_spend, dec(200));
        assert!(!charge.monthly_reset);
        assert_eq!(charge.transaction.status, TransactionStatus::PendingReceipt);
        assert_eq!(charge.transaction.vendor_name, "Figma");
        assert_eq!(store.wallet().unwrap().balance, dec(450));
        assert_eq!(store.card(card.id).unwrap().current_spend, dec(200));
        assert_eq!(store.transactions().len(), 1);
    }

    #[test]
    fn test_coding_templates_do_not_skip_receipt() {
        let (store, authorizer) = setup(500);
        let card = active_card(&store, 200, 0);
        store
            .update_card(card.id, |card| {
                card.gl_account_template = Some("6100".to_string());
                card.department_template = Some("Eng".to_string());
                card.cost_center_template = Some("CC-1".to_string());
                Ok(())
            })
            .unwrap();

        let result = authorizer
            .authorize(ChargeRequest::new(card.id, dec(10)))
            .unwrap();

        let Authorization::Approved(charge) = result else {
            panic!("Expected approval");
        };
        assert_eq!(charge.transaction.gl_account.as_deref(), Some("6100"));
        assert_eq!(charge.transaction.status, TransactionStatus::PendingReceipt);
    }

    #[rstest]
    #[case::locked(CardStatus::Locked, DeclineReason::CardLocked)]
    #[case::suspended(CardStatus::Suspended, DeclineReason::CardSuspended)]
    #[case::pending(CardStatus::PendingApproval, DeclineReason::CardNotActive)]
    #[case::rejected(CardStatus::Rejected, DeclineReason::CardNotActive)]
    fn test_inactive_cards_decline(#[case] status: CardStatus, #[case] expected: DeclineReason) {
        let (store, authorizer) = setup(500);
        let card = active_card(&store, 200, 0);
        store
            .update_card(card.id, |card| {
                card.status = status;
                Ok(())
            })
            .unwrap();

        let result = authorizer
            .authorize(ChargeRequest::new(card.id, dec(10)))
            .unwrap();

        assert_eq!(result.decline_reason(), Some(expected));
        assert_eq!(store.wallet().unwrap().balance, dec(500));
    }

    #[rstest]
    #[case::zero(Decimal::ZERO)]
    #[case::negative(dec(-5))]
    fn test_non_positive_amount_is_validation_error(#[case] amount: Decimal) {
        let (store, authorizer) = setup(500);
        let card = active_card(&store, 200, 0);

        let result = authorizer.authorize(ChargeRequest::new(card.id, amount));

        assert!(matches!(result, Err(LedgerError::Validation { .. })));
    }

    #[test]
    fn test_missing_card_is_not_found() {
        let (_store, authorizer) = setup(500);
        let result = authorizer.authorize(ChargeRequest::new(77, dec(1)));
        assert_eq!(result.unwrap_err(), LedgerError::not_found("Card", 77));
    }

    #[test]
    fn test_recurring_card_resets_in_new_period() {
        let (store, authorizer) = setup(500);
        let card = active_card(&store, 100, 90);
        let last_reset = Utc.with_ymd_and_hms(2026, 1, 20, 9, 0, 0).unwrap();
        store
            .update_card(card.id, |card| {
                card.limit_type = LimitType::Recurring;
                card.renewal_frequency = Some(RenewalFrequency::Month);
                card.last_reset_at = last_reset;
                Ok(())
            })
            .unwrap();

        let same_period = authorizer
            .authorize_at(ChargeRequest::new(card.id, dec(20)), last_reset + Duration::days(5))
            .unwrap();
        assert_eq!(same_period.decline_reason(), Some(DeclineReason::SpendLimitExceeded));

        let next_period = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 1).unwrap();
        let result = authorizer
            .authorize_at(ChargeRequest::new(card.id, dec(20)), next_period)
            .unwrap();

        let Authorization::Approved(charge) = result else {
            panic!("Expected approval after reset");
        };
        assert!(charge.monthly_reset);
        assert_eq!(charge.new_card_spend, dec(20));
        assert_eq!(store.card(card.id).unwrap().last_reset_at, next_period);
    }

    #[test]
    fn test_validity_window_declines() {
        let (store, authorizer) = setup(500);
        let card = active_card(&store, 100, 0);
        let now = Utc::now();
        store
            .update_card(card.id, |card| {
                card.valid_until = Some(now - Duration::days(1));
                Ok(())
            })
            .unwrap();

        let result = authorizer
            .authorize_at(ChargeRequest::new(card.id, dec(5)), now)
            .unwrap();

        assert_eq!(result.decline_reason(), Some(DeclineReason::OutsideValidity));
    }

    #[rstest]
    #[case::merchant_listed(Some("aws"), None, None, None)]
    #[case::merchant_blocked(Some("Uber"), None, None, Some(DeclineReason::MerchantNotAllowed))]
    #[case::mcc_blocked(Some("AWS"), Some("5812"), None, Some(DeclineReason::MccNotAllowed))]
    #[case::country_blocked(Some("AWS"), None, Some("FR"), Some(DeclineReason::CountryNotAllowed))]
    #[case::unchecked_when_absent(Some("AWS"), None, None, None)]
    fn test_restrictions(
        #[case] merchant: Option<&str>,
        #[case] mcc: Option<&str>,
        #[case] country: Option<&str>,
        #[case] expected: Option<DeclineReason>,
    ) {
        let (store, authorizer) = setup(500);
        let card = active_card(&store, 100, 0);
        store
            .update_card(card.id, |card| {
                card.allowed_merchants = vec!["AWS".to_string()];
                card.allowed_mccs = vec!["7372".to_string()];
                card.allowed_countries = vec!["US".to_string()];
                Ok(())
            })
            .unwrap();

        let request = ChargeRequest {
            merchant: merchant.map(str::to_string),
            mcc: mcc.map(str::to_string),
            country: country.map(str::to_string),
            ..ChargeRequest::new(card.id, dec(5))
        };
        let result = authorizer.authorize(request).unwrap();

        assert_eq!(result.decline_reason(), expected);
    }

    #[test]
    fn test_channel_restriction() {
        let (store, authorizer) = setup(500);
        let card = active_card(&store, 100, 0);
        store
            .update_card(card.id, |card| {
                card.channel_restriction = ChannelRestriction::Online;
                Ok(())
            })
            .unwrap();

        let in_store = ChargeRequest {
            channel: Some(ChargeChannel::InStore),
            ..ChargeRequest::new(card.id, dec(5))
        };
        let online = ChargeRequest {
            channel: Some(ChargeChannel::Online),
            ..ChargeRequest::new(card.id, dec(5))
        };

        assert_eq!(
            authorizer.authorize(in_store).unwrap().decline_reason(),
            Some(DeclineReason::ChannelNotAllowed)
        );
        assert!(authorizer.authorize(online).unwrap().is_approved());
    }

    #[test]
    fn test_enforced_auto_suspend_retires_single_use_card() {
        let store = Arc::new(InMemoryLedger::new(dec(500)));
        let authorizer = TransactionAuthorizer::new(Arc::clone(&store), AutoSuspendPolicy::Enforce);
        let card = active_card(&store, 100, 0);
        store
            .update_card(card.id, |card| {
                card.transaction_count = TransactionCount::One;
                Ok(())
            })
            .unwrap();

        let first = authorizer
            .authorize(ChargeRequest::new(card.id, dec(10)))
            .unwrap();
        let Authorization::Approved(charge) = first else {
            panic!("Expected approval");
        };
        assert!(charge.suspended);
        assert_eq!(charge.auto_suspend, Some(AutoSuspendReason::SingleTransactionConsumed));
        assert_eq!(store.card(card.id).unwrap().status, CardStatus::Suspended);

        let second = authorizer
            .authorize(ChargeRequest::new(card.id, dec(10)))
            .unwrap();
        assert_eq!(second.decline_reason(), Some(DeclineReason::CardSuspended));
    }

    #[test]
    fn test_advisory_auto_suspend_leaves_card_active() {
        let (store, authorizer) = setup(500);
        let card = active_card(&store, 100, 0);

        let result = authorizer
            .authorize(ChargeRequest::new(card.id, dec(100)))
            .unwrap();

        let Authorization::Approved(charge) = result else {
            panic!("Expected approval");
        };
        assert_eq!(charge.auto_suspend, Some(AutoSuspendReason::SpendLimitExhausted));
        assert!(!charge.suspended);
        assert_eq!(store.card(card.id).unwrap().status, CardStatus::Active);
    }

    #[test]
    fn test_concurrent_charges_never_exceed_limit() {
        let (store, authorizer) = setup(10_000);
        let card = active_card(&store, 1000, 0);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let authorizer = authorizer.clone();
                thread::spawn(move || {
                    (0..50)
                        .filter(|_| {
                            authorizer
                                .authorize(ChargeRequest::new(card.id, dec(7)))
                                .unwrap()
                                .is_approved()
                        })
                        .count()
                })
            })
            .collect();
        let approved: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        let spend = store.card(card.id).unwrap().current_spend;
        assert_eq!(approved, 142);
        assert_eq!(spend, dec(7 * 142));
        assert!(spend <= dec(1000));
        assert_eq!(store.wallet().unwrap().balance, dec(10_000 - 7 * 142));
        assert_eq!(store.transactions().len(), approved);
    }

    #[test]
    fn test_decline_reason_serializes_as_message() {
        let json = serde_json::to_string(&DeclineReason::CardLocked).unwrap();
        assert_eq!(json, "\"Card is temporarily locked\"");
    }
}
