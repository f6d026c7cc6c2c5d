//! Merchant model and fee settings.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Whole days a merchant must have existed before platform commission
/// applies, regardless of the fee-active flag.
pub const COMMISSION_GRACE_DAYS: i64 = 90;

/// Partner cafe receiving payouts.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Merchant {
    pub merchant_id: Uuid,
    pub display_name: String,
    pub contact_email: String,
    /// Whether platform commission is switched on for this merchant.
    pub fee_active: bool,
    /// Commission rate as a fraction; NULL falls back to the platform default.
    pub commission_rate: Option<Decimal>,
    pub created_utc: DateTime<Utc>,
}

impl Merchant {
    /// Platform default commission rate (10%).
    pub fn default_commission_rate() -> Decimal {
        Decimal::new(10, 2)
    }

    /// Effective commission rate: the stored rate, or the platform default
    /// when none is set.
    pub fn effective_commission_rate(&self) -> Decimal {
        self.commission_rate
            .unwrap_or_else(Self::default_commission_rate)
    }

    /// Whether commission applies at `as_of`: the fee flag must be active AND
    /// the merchant must have existed at least [`COMMISSION_GRACE_DAYS`]
    /// whole days.
    pub fn commission_applies(&self, as_of: DateTime<Utc>) -> bool {
        self.fee_active && (as_of - self.created_utc).num_days() >= COMMISSION_GRACE_DAYS
    }
}
