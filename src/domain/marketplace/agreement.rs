//! Agreements between a seller and a counterparty.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AgreementId, UserIdentifier};

/// Lifecycle status of an agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementStatus {
    Active,
    Completed,
}

impl AgreementStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AgreementStatus::Active => "Active",
            AgreementStatus::Completed => "Completed",
        }
    }
}

/// A persisted agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agreement {
    pub id: AgreementId,
    pub owner: UserIdentifier,
    pub title: String,
    pub counterparty_phone: String,
    pub amount_cents: u64,
    pub due_date: NaiveDate,
    pub status: AgreementStatus,
}

impl Agreement {
    pub fn is_active(&self) -> bool {
        self.status == AgreementStatus::Active
    }
}

/// Command to create an agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAgreement {
    pub title: String,
    pub counterparty_phone: String,
    pub amount_cents: u64,
    pub due_date: NaiveDate,
}
