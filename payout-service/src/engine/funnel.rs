//! Funnel totals: per-bucket counts and gross sums plus the sold-to-redeemed
//! conversion rate.

use rust_decimal::Decimal;
use serde::Serialize;

use super::{classify, ratio_pct, round_money, DateRange, EventBucket};
use crate::models::Voucher;

/// Count and summed gross for one funnel bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketTotal {
    pub count: u64,
    pub amount: Decimal,
}

impl BucketTotal {
    fn add(&mut self, amount: Decimal) {
        self.count += 1;
        self.amount += amount;
    }

    fn rounded(mut self) -> Self {
        self.amount = round_money(self.amount);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelReport {
    pub total_sold: BucketTotal,
    pub total_redeemed: BucketTotal,
    pub total_refunded: BucketTotal,
    pub total_expired: BucketTotal,
    /// redeemed / sold as a percentage, 0 when nothing was sold.
    pub conversion_rate: f64,
}

pub fn funnel(vouchers: &[Voucher], range: &DateRange) -> FunnelReport {
    let mut sold = BucketTotal::default();
    let mut redeemed = BucketTotal::default();
    let mut refunded = BucketTotal::default();
    let mut expired = BucketTotal::default();

    for voucher in vouchers {
        let c = classify(voucher, range);
        let gross = voucher.effective_gross();
        if c.sold {
            sold.add(gross);
        }
        match c.event {
            Some(EventBucket::Redeemed) => redeemed.add(gross),
            Some(EventBucket::Refunded) => refunded.add(gross),
            Some(EventBucket::Expired) => expired.add(gross),
            None => {}
        }
    }

    FunnelReport {
        conversion_rate: ratio_pct(redeemed.count, sold.count),
        total_sold: sold.rounded(),
        total_redeemed: redeemed.rounded(),
        total_refunded: refunded.rounded(),
        total_expired: expired.rounded(),
    }
}
