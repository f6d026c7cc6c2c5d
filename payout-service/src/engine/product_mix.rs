//! Product mix: redeemed revenue grouped by product, with share percentages.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use super::{classify, pct_of, ratio_pct, round_money, DateRange, EventBucket};
use crate::models::Voucher;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductMixEntry {
    pub product_name: String,
    pub count: u64,
    pub revenue: Decimal,
    pub average_order_value: Decimal,
    /// Share of redeemed count, percent.
    pub market_share: f64,
    /// Share of redeemed revenue, percent.
    pub revenue_share: f64,
}

/// Group redeemed vouchers by product name. Entries sort descending by
/// count; equal counts fall back to the product name so output order is
/// reproducible.
pub fn product_mix(vouchers: &[Voucher], range: &DateRange) -> Vec<ProductMixEntry> {
    let mut groups: HashMap<&str, (u64, Decimal)> = HashMap::new();
    let mut total_count = 0u64;
    let mut total_revenue = Decimal::ZERO;

    for voucher in vouchers {
        if classify(voucher, range).event != Some(EventBucket::Redeemed) {
            continue;
        }
        let gross = voucher.effective_gross();
        let entry = groups.entry(voucher.product_name.as_str()).or_default();
        entry.0 += 1;
        entry.1 += gross;
        total_count += 1;
        total_revenue += gross;
    }

    let mut entries: Vec<ProductMixEntry> = groups
        .into_iter()
        .map(|(name, (count, revenue))| ProductMixEntry {
            product_name: name.to_string(),
            count,
            average_order_value: if count == 0 {
                Decimal::ZERO
            } else {
                round_money(revenue / Decimal::from(count))
            },
            market_share: ratio_pct(count, total_count),
            revenue_share: pct_of(revenue, total_revenue),
            revenue: round_money(revenue),
        })
        .collect();

    entries.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.product_name.cmp(&b.product_name))
    });
    entries
}
