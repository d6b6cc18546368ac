//! Card-related types
//!
//! A card is a virtual payment instrument with a spend limit, a lifecycle
//! status and optional usage restrictions. Card number, CVV and expiry are
//! populated exactly once, when the card first becomes Active.

use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::error::LedgerError;
use super::invoice::{merge_named, non_status_keys, InvoiceId};

/// Card identifier
pub type CardId = u64;

/// Issuer prefix for generated card numbers
pub const CARD_NUMBER_PREFIX: &str = "4571";

/// Lifecycle status of a card
///
/// ```text
/// PendingApproval ──► Active ◄──► Locked
///        │              │           │
///        ▼              └──► Suspended ◄──┘
///     Rejected
/// ```
///
/// Suspended and Rejected are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardStatus {
    #[serde(rename = "Pending Approval")]
    PendingApproval,
    Active,
    Locked,
    Suspended,
    Rejected,
}

impl CardStatus {
    /// Whether the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(self, next: CardStatus) -> bool {
        use CardStatus::*;
        matches!(
            (self, next),
            (PendingApproval, Active)
                | (PendingApproval, Rejected)
                | (Active, Locked)
                | (Active, Suspended)
                | (Locked, Active)
                | (Locked, Suspended)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CardStatus::Suspended | CardStatus::Rejected)
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CardStatus::PendingApproval => "Pending Approval",
            CardStatus::Active => "Active",
            CardStatus::Locked => "Locked",
            CardStatus::Suspended => "Suspended",
            CardStatus::Rejected => "Rejected",
        };
        f.write_str(label)
    }
}

/// How the spend limit behaves over time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LimitType {
    /// Limit is consumed once and never replenished
    #[default]
    OneTime,
    /// Spend counter resets every renewal period
    Recurring,
}

/// How many charges a one-time card accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionCount {
    #[serde(rename = "1")]
    One,
    #[default]
    Unlimited,
}

/// Renewal cadence of a recurring card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenewalFrequency {
    Month,
    Quarter,
    Year,
}

impl RenewalFrequency {
    /// Whether `now` falls in a later calendar period than `last_reset`
    pub fn period_elapsed(self, last_reset: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let period = |at: DateTime<Utc>| -> i64 {
            let year = i64::from(at.year());
            match self {
                RenewalFrequency::Month => year * 12 + i64::from(at.month0()),
                RenewalFrequency::Quarter => year * 4 + i64::from(at.month0() / 3),
                RenewalFrequency::Year => year,
            }
        };
        period(now) > period(last_reset)
    }
}

/// Where a card may be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelRestriction {
    #[default]
    Any,
    Online,
    InStore,
}

/// Sensitive card details generated on activation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardCredentials {
    pub card_number: String,
    pub last4: String,
    pub expiry_date: String,
    pub cvv: String,
}

impl CardCredentials {
    /// Generate a fresh card number, CVV and an expiry 24 months after `now`
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> Self {
        let mut card_number = String::with_capacity(16);
        card_number.push_str(CARD_NUMBER_PREFIX);
        for _ in 0..12 {
            let digit: u8 = rng.gen_range(0..10);
            card_number.push(char::from(b'0' + digit));
        }
        let last4 = card_number[card_number.len() - 4..].to_string();
        let expiry_date = format!("{:02}/{:02}", now.month(), (now.year() + 2).rem_euclid(100));
        let cvv = rng.gen_range(100..1000).to_string();

        CardCredentials {
            card_number,
            last4,
            expiry_date,
            cvv,
        }
    }
}

/// Virtual payment card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub cardholder_name: String,
    pub spend_limit: Decimal,
    pub current_spend: Decimal,
    pub status: CardStatus,
    pub purpose: String,
    /// Invoice this card was issued to pay, if any
    pub invoice_id: Option<InvoiceId>,
    pub requested_by: String,
    pub approved_by: Option<String>,
    pub card_number: Option<String>,
    pub last4: Option<String>,
    pub expiry_date: Option<String>,
    pub cvv: Option<String>,
    pub currency: String,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub allowed_merchants: Vec<String>,
    pub allowed_mccs: Vec<String>,
    pub allowed_countries: Vec<String>,
    pub channel_restriction: ChannelRestriction,
    pub gl_account_template: Option<String>,
    pub department_template: Option<String>,
    pub cost_center_template: Option<String>,
    pub limit_type: LimitType,
    pub transaction_count: TransactionCount,
    pub renewal_frequency: Option<RenewalFrequency>,
    /// Start of the current renewal period for recurring cards
    pub last_reset_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Card {
    /// Build a card row from a creation request
    pub fn from_new(id: CardId, new: NewCard, now: DateTime<Utc>) -> Self {
        Card {
            id,
            cardholder_name: new.cardholder_name,
            spend_limit: new.spend_limit,
            current_spend: Decimal::ZERO,
            status: new.status.unwrap_or(CardStatus::PendingApproval),
            purpose: new.purpose,
            invoice_id: new.invoice_id,
            requested_by: new.requested_by,
            approved_by: new.approved_by,
            card_number: None,
            last4: None,
            expiry_date: None,
            cvv: None,
            currency: new.currency.unwrap_or_else(|| "USD".to_string()),
            valid_from: new.valid_from,
            valid_until: new.valid_until,
            allowed_merchants: new.allowed_merchants,
            allowed_mccs: new.allowed_mccs,
            allowed_countries: new.allowed_countries,
            channel_restriction: new.channel_restriction,
            gl_account_template: new.gl_account_template,
            department_template: new.department_template,
            cost_center_template: new.cost_center_template,
            limit_type: new.limit_type,
            transaction_count: new.transaction_count,
            renewal_frequency: new.renewal_frequency,
            last_reset_at: now,
            created_at: now,
        }
    }

    /// Attach generated credentials unless the card already carries them
    ///
    /// Returns `true` when credentials were written.
    pub fn issue_credentials(&mut self, credentials: CardCredentials) -> bool {
        if self.card_number.is_some() {
            return false;
        }
        self.card_number = Some(credentials.card_number);
        self.last4 = Some(credentials.last4);
        self.expiry_date = Some(credentials.expiry_date);
        self.cvv = Some(credentials.cvv);
        true
    }

    pub fn is_recurring(&self) -> bool {
        self.limit_type == LimitType::Recurring
    }

    /// One-time card capped to a single charge
    pub fn is_one_time_use(&self) -> bool {
        self.limit_type == LimitType::OneTime && self.transaction_count == TransactionCount::One
    }

    /// Unspent portion of the limit, floored at zero
    pub fn remaining_limit(&self) -> Decimal {
        (self.spend_limit - self.current_spend).max(Decimal::ZERO)
    }
}

/// Request to create a card
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewCard {
    pub cardholder_name: String,
    pub spend_limit: Decimal,
    /// Initial status; Pending Approval when absent
    pub status: Option<CardStatus>,
    pub purpose: String,
    pub invoice_id: Option<InvoiceId>,
    pub requested_by: String,
    pub approved_by: Option<String>,
    pub currency: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub allowed_merchants: Vec<String>,
    pub allowed_mccs: Vec<String>,
    pub allowed_countries: Vec<String>,
    pub channel_restriction: ChannelRestriction,
    pub gl_account_template: Option<String>,
    pub department_template: Option<String>,
    pub cost_center_template: Option<String>,
    pub limit_type: LimitType,
    pub transaction_count: TransactionCount,
    pub renewal_frequency: Option<RenewalFrequency>,
}

/// Partial update of a card
///
/// Absent fields are left untouched. Used by the generic `PATCH /cards/:id`
/// route, which applies the invoice-lock allow-list before dispatching.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardUpdate {
    pub status: Option<CardStatus>,
    pub cardholder_name: Option<String>,
    pub spend_limit: Option<Decimal>,
    pub purpose: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub allowed_merchants: Option<Vec<String>>,
    pub allowed_mccs: Option<Vec<String>>,
    pub allowed_countries: Option<Vec<String>>,
    pub channel_restriction: Option<ChannelRestriction>,
    pub gl_account_template: Option<String>,
    pub department_template: Option<String>,
    pub cost_center_template: Option<String>,
    /// Every key the request body named other than `status`
    #[serde(skip)]
    pub named_fields: Vec<String>,
}

impl CardUpdate {
    /// Parse a request body, remembering every key it named
    pub fn from_body(body: Map<String, Value>) -> Result<Self, LedgerError> {
        let named_fields = non_status_keys(&body);
        let mut update: Self = serde_json::from_value(Value::Object(body))
            .map_err(|e| LedgerError::validation(format!("Invalid card update: {}", e)))?;
        update.named_fields = named_fields;
        Ok(update)
    }

    /// Names of the non-status fields in the update, as sent over the wire
    pub fn non_status_fields(&self) -> Vec<String> {
        let present = [
            ("cardholderName", self.cardholder_name.is_some()),
            ("spendLimit", self.spend_limit.is_some()),
            ("purpose", self.purpose.is_some()),
            ("validFrom", self.valid_from.is_some()),
            ("validUntil", self.valid_until.is_some()),
            ("allowedMerchants", self.allowed_merchants.is_some()),
            ("allowedMccs", self.allowed_mccs.is_some()),
            ("allowedCountries", self.allowed_countries.is_some()),
            ("channelRestriction", self.channel_restriction.is_some()),
            ("glAccountTemplate", self.gl_account_template.is_some()),
            ("departmentTemplate", self.department_template.is_some()),
            ("costCenterTemplate", self.cost_center_template.is_some()),
        ];
        let fields = present
            .iter()
            .filter(|(_, is_set)| *is_set)
            .map(|(name, _)| name.to_string())
            .collect();
        merge_named(fields, &self.named_fields)
    }

    /// Apply every present non-status field to `card`
    pub fn apply_fields(self, card: &mut Card) {
        if let Some(v) = self.cardholder_name {
            card.cardholder_name = v;
        }
        if let Some(v) = self.spend_limit {
            card.spend_limit = v;
        }
        if let Some(v) = self.purpose {
            card.purpose = v;
        }
        if let Some(v) = self.valid_from {
            card.valid_from = Some(v);
        }
        if let Some(v) = self.valid_until {
            card.valid_until = Some(v);
        }
        if let Some(v) = self.allowed_merchants {
            card.allowed_merchants = v;
        }
        if let Some(v) = self.allowed_mccs {
            card.allowed_mccs = v;
        }
        if let Some(v) = self.allowed_countries {
            card.allowed_countries = v;
        }
        if let Some(v) = self.channel_restriction {
            card.channel_restriction = v;
        }
        if let Some(v) = self.gl_account_template {
            card.gl_account_template = Some(v);
        }
        if let Some(v) = self.department_template {
            card.department_template = Some(v);
        }
        if let Some(v) = self.cost_center_template {
            card.cost_center_template = Some(v);
        }
    }
}
