//! Fee and payout aggregation engine.
//!
//! Pure computation over voucher and merchant records fetched by the caller:
//! no I/O and no clock access (callers pass `as_of`). Monetary values
//! accumulate at full precision; rounding to the currency minor unit happens
//! only when a report is assembled.

pub mod fees;
pub mod funnel;
pub mod lifecycle;
pub mod product_mix;
pub mod redemption;
pub mod revenue;
pub mod viral;

pub use fees::{compute_fees, fee_totals, voucher_fees, FeeBreakdown, FeeTotalsReport};
pub use funnel::{funnel, BucketTotal, FunnelReport};
pub use lifecycle::{classify, Classification, EventBucket};
pub use product_mix::{product_mix, ProductMixEntry};
pub use redemption::{redemption_delay, DelayBucket, RedemptionDelayReport};
pub use revenue::{master_revenue, MerchantRevenue, RevenueReport, RevenueTotals};
pub use viral::{viral, CohortRow, SeriesPoint, ViralReport};

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{Merchant, Voucher};

/// Half-open UTC time range: `from` inclusive, `to` exclusive.
///
/// Either bound may be absent, in which case it passes every date. An
/// inverted range (`to <= from`) contains nothing, so aggregations over it
/// come out empty rather than erroring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    /// Unbounded range for global, all-time reports.
    pub fn all_time() -> Self {
        Self::default()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if to <= from {
                return false;
            }
        }
        if let Some(from) = self.from {
            if at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if at >= to {
                return false;
            }
        }
        true
    }

    /// Raise the lower bound to `min` when it is earlier or absent. Callers
    /// use this to clamp requested ranges to the platform's operational
    /// start date; the engine itself never does.
    pub fn clamp_from(mut self, min: DateTime<Utc>) -> Self {
        self.from = Some(self.from.map_or(min, |from| from.max(min)));
        self
    }
}

/// Round a monetary value to the currency minor unit.
pub(crate) fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Percentage of `part` in `whole`, rounded to 2 decimals; 0 when the
/// denominator is zero.
pub(crate) fn pct_of(part: Decimal, whole: Decimal) -> f64 {
    if whole.is_zero() {
        return 0.0;
    }
    round2(((part / whole) * Decimal::ONE_HUNDRED).to_f64().unwrap_or(0.0))
}

/// Count ratio as a percentage, rounded to 2 decimals; 0 when the
/// denominator is zero.
pub(crate) fn ratio_pct(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    round2(numerator as f64 / denominator as f64 * 100.0)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Composed dashboard report: every analytics view over one voucher
/// population. Route handlers for single views call the individual
/// functions; this is the one-stop shape the admin dashboard consumes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub funnel: FunnelReport,
    pub fees: FeeTotalsReport,
    pub product_mix: Vec<ProductMixEntry>,
    pub redemption_delay: RedemptionDelayReport,
    pub viral: ViralReport,
    pub revenue: RevenueReport,
}

pub fn build_report(
    vouchers: &[Voucher],
    merchants: &HashMap<Uuid, Merchant>,
    range: &DateRange,
    as_of: DateTime<Utc>,
) -> DashboardReport {
    DashboardReport {
        funnel: funnel(vouchers, range),
        fees: fee_totals(vouchers, merchants, range, as_of),
        product_mix: product_mix(vouchers, range),
        redemption_delay: redemption_delay(vouchers, range),
        viral: viral(vouchers, range),
        revenue: master_revenue(vouchers, merchants, range, as_of),
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::models::{Merchant, Voucher, VoucherStatus};

    pub fn ts(s: &str) -> DateTime<Utc> {
        s.parse().expect("valid RFC3339 timestamp")
    }

    pub fn dec(s: &str) -> Decimal {
        s.parse().expect("valid decimal")
    }

    pub fn range(from: &str, to: &str) -> DateRange {
        DateRange::new(Some(ts(from)), Some(ts(to)))
    }

    pub fn merchant(created: &str, fee_active: bool, rate: Option<&str>) -> Merchant {
        Merchant {
            merchant_id: Uuid::new_v4(),
            display_name: "Cafe Fixture".to_string(),
            contact_email: "owner@cafe.test".to_string(),
            fee_active,
            commission_rate: rate.map(dec),
            created_utc: ts(created),
        }
    }

    /// Issued voucher with the given gross, created (and issued) at `created`.
    pub fn voucher(merchant: &Merchant, gross: &str, created: &str) -> Voucher {
        Voucher {
            voucher_id: Uuid::new_v4(),
            merchant_id: merchant.merchant_id,
            gift_item_id: Uuid::new_v4(),
            product_name: "Flat White".to_string(),
            item_price: dec(gross),
            amount_gross: Some(dec(gross)),
            processor_fee: None,
            status: VoucherStatus::Issued.as_str().to_string(),
            payment_reference: Uuid::new_v4().to_string(),
            sender_email: "sender@example.com".to_string(),
            recipient_contact: None,
            referral_token: None,
            recipient_became_sender: false,
            created_utc: ts(created),
            issued_utc: Some(ts(created)),
            redeemed_utc: None,
            refunded_utc: None,
            expired_utc: None,
        }
    }

    pub fn redeemed(mut v: Voucher, at: &str) -> Voucher {
        v.status = VoucherStatus::Redeemed.as_str().to_string();
        v.redeemed_utc = Some(ts(at));
        v
    }

    pub fn refunded(mut v: Voucher, at: &str) -> Voucher {
        v.status = VoucherStatus::Refunded.as_str().to_string();
        v.refunded_utc = Some(ts(at));
        v
    }

    pub fn expired(mut v: Voucher, at: &str) -> Voucher {
        v.status = VoucherStatus::Expired.as_str().to_string();
        v.expired_utc = Some(ts(at));
        v
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::ts;
    use super::*;

    #[test]
    fn range_contains_half_open() {
        let r = DateRange::new(
            Some(ts("2024-01-01T00:00:00Z")),
            Some(ts("2024-02-01T00:00:00Z")),
        );
        assert!(r.contains(ts("2024-01-01T00:00:00Z")));
        assert!(r.contains(ts("2024-01-31T23:59:59Z")));
        assert!(!r.contains(ts("2024-02-01T00:00:00Z")));
        assert!(!r.contains(ts("2023-12-31T23:59:59Z")));
    }

    #[test]
    fn inverted_range_contains_nothing() {
        let r = DateRange::new(
            Some(ts("2024-02-01T00:00:00Z")),
            Some(ts("2024-01-01T00:00:00Z")),
        );
        assert!(!r.contains(ts("2024-01-15T00:00:00Z")));
        assert!(!r.contains(ts("2024-02-01T00:00:00Z")));
    }

    #[test]
    fn open_range_contains_everything() {
        let r = DateRange::all_time();
        assert!(r.contains(ts("1999-01-01T00:00:00Z")));
        assert!(r.contains(ts("2099-01-01T00:00:00Z")));
    }

    #[test]
    fn clamp_from_raises_earlier_or_absent_bound() {
        let min = ts("2023-09-01T00:00:00Z");
        let clamped = DateRange::new(Some(ts("2020-01-01T00:00:00Z")), None).clamp_from(min);
        assert_eq!(clamped.from, Some(min));

        let absent = DateRange::all_time().clamp_from(min);
        assert_eq!(absent.from, Some(min));

        let later = ts("2024-03-01T00:00:00Z");
        let kept = DateRange::new(Some(later), None).clamp_from(min);
        assert_eq!(kept.from, Some(later));
    }

    #[test]
    fn ratio_guards_zero_denominator() {
        assert_eq!(ratio_pct(5, 0), 0.0);
        assert_eq!(pct_of(Decimal::TEN, Decimal::ZERO), 0.0);
        assert_eq!(ratio_pct(3, 4), 75.0);
    }
}
