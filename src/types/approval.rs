//! Card approval records
//!
//! One record exists per card request per approval level. A record is decided
//! exactly once; Approved and Rejected are terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::card::{Card, CardId};

/// Approval record identifier
pub type ApprovalId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// Outcome an approver can record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

impl From<ApprovalDecision> for ApprovalStatus {
    fn from(decision: ApprovalDecision) -> Self {
        match decision {
            ApprovalDecision::Approved => ApprovalStatus::Approved,
            ApprovalDecision::Rejected => ApprovalStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardApproval {
    pub id: ApprovalId,
    pub card_request_id: CardId,
    pub approver_name: String,
    pub approver_role: Option<String>,
    pub status: ApprovalStatus,
    pub comments: Option<String>,
    /// 1-based approval level
    pub approval_level: u32,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CardApproval {
    pub fn from_new(id: ApprovalId, new: NewApproval, now: DateTime<Utc>) -> Self {
        CardApproval {
            id,
            card_request_id: new.card_request_id,
            approver_name: new.approver_name,
            approver_role: new.approver_role,
            status: ApprovalStatus::Pending,
            comments: new.comments,
            approval_level: new.approval_level.unwrap_or(1),
            approved_at: None,
            created_at: now,
        }
    }

    pub fn is_decided(&self) -> bool {
        self.status != ApprovalStatus::Pending
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewApproval {
    pub card_request_id: CardId,
    pub approver_name: String,
    pub approver_role: Option<String>,
    pub comments: Option<String>,
    pub approval_level: Option<u32>,
}

/// Pending approval joined with the card it gates
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingApproval {
    #[serde(flatten)]
    pub approval: CardApproval,
    pub card: Card,
}
