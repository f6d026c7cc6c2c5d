//! Voucher model: one purchased gift, redeemable in person at a partner cafe.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Voucher lifecycle status. Exactly one holds at a time; the matching
/// lifecycle timestamp is present if and only if the status is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherStatus {
    Pending,
    Issued,
    Unredeemed,
    Redeemed,
    Refunded,
    Expired,
}

impl VoucherStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoucherStatus::Pending => "pending",
            VoucherStatus::Issued => "issued",
            VoucherStatus::Unredeemed => "unredeemed",
            VoucherStatus::Redeemed => "redeemed",
            VoucherStatus::Refunded => "refunded",
            VoucherStatus::Expired => "expired",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "issued" => VoucherStatus::Issued,
            "unredeemed" => VoucherStatus::Unredeemed,
            "redeemed" => VoucherStatus::Redeemed,
            "refunded" => VoucherStatus::Refunded,
            "expired" => VoucherStatus::Expired,
            _ => VoucherStatus::Pending,
        }
    }
}

impl std::fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One purchased gift.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Voucher {
    pub voucher_id: Uuid,
    pub merchant_id: Uuid,
    pub gift_item_id: Uuid,
    pub product_name: String,
    /// Gift item price at purchase time; fallback when the payment record
    /// carries no gross amount.
    pub item_price: Decimal,
    pub amount_gross: Option<Decimal>,
    /// Processor fee as reported by the payment processor, when known.
    pub processor_fee: Option<Decimal>,
    pub status: String,
    /// Checkout payment reference; unique, making voucher creation
    /// idempotent per payment.
    pub payment_reference: String,
    pub sender_email: String,
    pub recipient_contact: Option<String>,
    /// Referral token identifying the gift recipient across vouchers.
    pub referral_token: Option<String>,
    /// Set once the recipient makes a purchase of their own.
    pub recipient_became_sender: bool,
    pub created_utc: DateTime<Utc>,
    pub issued_utc: Option<DateTime<Utc>>,
    pub redeemed_utc: Option<DateTime<Utc>>,
    pub refunded_utc: Option<DateTime<Utc>>,
    pub expired_utc: Option<DateTime<Utc>>,
}

impl Voucher {
    /// Get parsed status.
    pub fn parsed_status(&self) -> VoucherStatus {
        VoucherStatus::from_string(&self.status)
    }

    /// Effective gross amount: the captured payment amount, or the gift item
    /// price when the payment record carries none. This is the single place
    /// that fallback is resolved.
    pub fn effective_gross(&self) -> Decimal {
        self.amount_gross.unwrap_or(self.item_price)
    }
}

/// Filter parameters for listing vouchers. The creation-time bounds are a
/// superset filter: `created_from` inclusive, `created_to` exclusive; the
/// engine re-applies the exact classifier per voucher.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListVouchersFilter {
    pub merchant_id: Option<Uuid>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}
