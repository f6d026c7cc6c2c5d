//! Payout item model: the platform's liability to a merchant for one
//! redeemed voucher.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Payout item status. `pending -> paid` on batch payout,
/// `pending -> reversed` on chargeback or correction; both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutItemStatus {
    Pending,
    Paid,
    Reversed,
}

impl PayoutItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutItemStatus::Pending => "pending",
            PayoutItemStatus::Paid => "paid",
            PayoutItemStatus::Reversed => "reversed",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "paid" => PayoutItemStatus::Paid,
            "reversed" => PayoutItemStatus::Reversed,
            _ => PayoutItemStatus::Pending,
        }
    }
}

impl std::fmt::Display for PayoutItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One payout obligation, created at redemption time. At most one exists per
/// voucher.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PayoutItem {
    pub payout_item_id: Uuid,
    pub voucher_id: Uuid,
    pub merchant_id: Uuid,
    /// Net amount payable, fixed at creation: gross minus the two fee
    /// portions below. Historical fee-setting changes never alter it.
    pub amount_payable: Decimal,
    pub processor_fee: Decimal,
    pub platform_fee: Decimal,
    pub status: String,
    pub created_utc: DateTime<Utc>,
    pub paid_utc: Option<DateTime<Utc>>,
    /// External transfer identifier, stamped on transition to paid.
    pub transfer_reference: Option<String>,
}

impl PayoutItem {
    /// Get parsed status.
    pub fn parsed_status(&self) -> PayoutItemStatus {
        PayoutItemStatus::from_string(&self.status)
    }
}

/// Input for creating a payout item. Amounts are already rounded to the
/// currency minor unit and satisfy
/// `amount_payable = gross - processor_fee - platform_fee` exactly.
#[derive(Debug, Clone)]
pub struct CreatePayoutItem {
    pub voucher_id: Uuid,
    pub merchant_id: Uuid,
    pub amount_payable: Decimal,
    pub processor_fee: Decimal,
    pub platform_fee: Decimal,
}

/// Pending payout item joined with its voucher's redemption time, the input
/// to batch cutoff selection.
#[derive(Debug, Clone, FromRow)]
pub struct PendingPayoutItem {
    pub payout_item_id: Uuid,
    pub voucher_id: Uuid,
    pub merchant_id: Uuid,
    pub amount_payable: Decimal,
    pub redeemed_utc: Option<DateTime<Utc>>,
}

/// Merchant-grouped pending totals driving transfer execution.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PendingMerchantTotal {
    pub merchant_id: Uuid,
    pub display_name: String,
    pub item_count: i64,
    pub total_payable: Decimal,
}
