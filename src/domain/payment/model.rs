//! Payment domain entity

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::bill::Bill;
use crate::domain::tariff::UtilityType;

/// Identity recorded on payments settled by the online flow.
pub const SYSTEM_OPERATOR: &str = "SYSTEM";

/// How a payment was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMode {
    Online,
    Cash,
    Cheque,
}

impl std::fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => write!(f, "ONLINE"),
            Self::Cash => write!(f, "CASH"),
            Self::Cheque => write!(f, "CHEQUE"),
        }
    }
}

/// Payment settlement state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Awaiting OTP confirmation
    Initiated,
    /// Settled; terminal
    Success,
    /// Rejected; terminal
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Initiated)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initiated => write!(f, "INITIATED"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// One payment attempt against a bill.
///
/// Status moves `Initiated → Success` or `Initiated → Failed` exactly
/// once and is never reversed. Offline payments are born in `Success`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub bill_id: String,
    pub consumer_id: String,
    pub utility_type: UtilityType,
    pub amount: Decimal,
    pub mode: PaymentMode,
    pub status: PaymentStatus,
    pub otp: Option<String>,
    pub otp_expires_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub processed_by: String,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Online payment attempt awaiting OTP confirmation.
    pub fn new_online(
        bill: &Bill,
        otp: String,
        otp_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            bill_id: bill.id.clone(),
            consumer_id: bill.consumer_id.clone(),
            utility_type: bill.utility_type,
            amount: bill.total_amount,
            mode: PaymentMode::Online,
            status: PaymentStatus::Initiated,
            otp: Some(otp),
            otp_expires_at: Some(otp_expires_at),
            completed_at: None,
            processed_by: SYSTEM_OPERATOR.to_string(),
            created_at: now,
        }
    }

    /// Counter payment recorded by an operator, settled on creation.
    pub fn new_offline(
        bill: &Bill,
        mode: PaymentMode,
        processed_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            bill_id: bill.id.clone(),
            consumer_id: bill.consumer_id.clone(),
            utility_type: bill.utility_type,
            amount: bill.total_amount,
            mode,
            status: PaymentStatus::Success,
            otp: None,
            otp_expires_at: None,
            completed_at: Some(now),
            processed_by: processed_by.into(),
            created_at: now,
        }
    }

    /// Whether `code` matches the issued OTP and the OTP has not expired
    /// at `now`.
    pub fn otp_matches(&self, code: &str, now: DateTime<Utc>) -> bool {
        match (self.otp.as_deref(), self.otp_expires_at) {
            (Some(otp), Some(expires_at)) => otp == code && now <= expires_at,
            _ => false,
        }
    }

    pub fn succeed(&mut self, now: DateTime<Utc>) {
        self.status = PaymentStatus::Success;
        self.completed_at = Some(now);
    }

    pub fn fail(&mut self) {
        self.status = PaymentStatus::Failed;
    }
}

// ── Tests ──────────────────────────────────────────────────────
