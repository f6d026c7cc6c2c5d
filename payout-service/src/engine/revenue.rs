//! Master revenue view: per-merchant totals exposing all-voucher gross and
//! redeemed-only gross/fees/net side by side.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use super::{classify, round_money, voucher_fees, DateRange, EventBucket};
use crate::models::{Merchant, Voucher};

/// Revenue row for one merchant. `total_gross` covers every voucher sold in
/// range regardless of status; the redeemed columns cover realized, payable
/// activity only. The two numerators are deliberately side by side and must
/// not be conflated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantRevenue {
    pub merchant_id: Uuid,
    pub display_name: String,
    pub voucher_count: u64,
    pub total_gross: Decimal,
    pub redeemed_count: u64,
    pub redeemed_gross: Decimal,
    pub processor_fees: Decimal,
    pub platform_fees: Decimal,
    pub net_to_merchant: Decimal,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueTotals {
    pub voucher_count: u64,
    pub total_gross: Decimal,
    pub redeemed_count: u64,
    pub redeemed_gross: Decimal,
    pub processor_fees: Decimal,
    pub platform_fees: Decimal,
    pub net_to_merchant: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueReport {
    pub merchants: Vec<MerchantRevenue>,
    pub overall: RevenueTotals,
}

#[derive(Default)]
struct Accumulator {
    voucher_count: u64,
    total_gross: Decimal,
    redeemed_count: u64,
    redeemed_gross: Decimal,
    processor_fees: Decimal,
    platform_fees: Decimal,
    net_to_merchant: Decimal,
}

/// Aggregate per merchant. Rows sort by total gross descending with the
/// merchant id as the deterministic tiebreaker.
pub fn master_revenue(
    vouchers: &[Voucher],
    merchants: &HashMap<Uuid, Merchant>,
    range: &DateRange,
    as_of: DateTime<Utc>,
) -> RevenueReport {
    let mut per_merchant: HashMap<Uuid, Accumulator> = HashMap::new();
    let mut overall = RevenueTotals::default();

    for voucher in vouchers {
        let c = classify(voucher, range);
        if !c.sold {
            continue;
        }
        let acc = per_merchant.entry(voucher.merchant_id).or_default();
        let gross = voucher.effective_gross();
        acc.voucher_count += 1;
        acc.total_gross += gross;
        overall.voucher_count += 1;
        overall.total_gross += gross;

        if c.event == Some(EventBucket::Redeemed) {
            let fees = voucher_fees(voucher, merchants.get(&voucher.merchant_id), as_of);
            acc.redeemed_count += 1;
            acc.redeemed_gross += fees.gross;
            acc.processor_fees += fees.processor_fee;
            acc.platform_fees += fees.platform_fee;
            acc.net_to_merchant += fees.net_to_merchant;
            overall.redeemed_count += 1;
            overall.redeemed_gross += fees.gross;
            overall.processor_fees += fees.processor_fee;
            overall.platform_fees += fees.platform_fee;
            overall.net_to_merchant += fees.net_to_merchant;
        }
    }

    let mut rows: Vec<MerchantRevenue> = per_merchant
        .into_iter()
        .map(|(merchant_id, acc)| MerchantRevenue {
            merchant_id,
            display_name: merchants
                .get(&merchant_id)
                .map(|m| m.display_name.clone())
                .unwrap_or_else(|| merchant_id.to_string()),
            voucher_count: acc.voucher_count,
            total_gross: round_money(acc.total_gross),
            redeemed_count: acc.redeemed_count,
            redeemed_gross: round_money(acc.redeemed_gross),
            processor_fees: round_money(acc.processor_fees),
            platform_fees: round_money(acc.platform_fees),
            net_to_merchant: round_money(acc.net_to_merchant),
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_gross
            .cmp(&a.total_gross)
            .then_with(|| a.merchant_id.cmp(&b.merchant_id))
    });

    RevenueReport {
        merchants: rows,
        overall: RevenueTotals {
            total_gross: round_money(overall.total_gross),
            redeemed_gross: round_money(overall.redeemed_gross),
            processor_fees: round_money(overall.processor_fees),
            platform_fees: round_money(overall.platform_fees),
            net_to_merchant: round_money(overall.net_to_merchant),
            ..overall
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testutil::{dec, merchant, redeemed, ts, voucher};
    use crate::engine::DateRange;

    #[test]
    fn total_and_redeemed_gross_are_distinct() {
        let m = merchant("2024-01-01T00:00:00Z", false, None);
        let vouchers = vec![
            redeemed(
                voucher(&m, "10.00", "2024-03-01T10:00:00Z"),
                "2024-03-03T10:00:00Z",
            ),
            voucher(&m, "10.00", "2024-03-02T10:00:00Z"),
        ];
        let merchants = HashMap::from([(m.merchant_id, m.clone())]);
        let report = master_revenue(
            &vouchers,
            &merchants,
            &DateRange::all_time(),
            ts("2024-04-01T00:00:00Z"),
        );

        assert_eq!(report.merchants.len(), 1);
        let row = &report.merchants[0];
        assert_eq!(row.voucher_count, 2);
        assert_eq!(row.total_gross, dec("20.00"));
        assert_eq!(row.redeemed_count, 1);
        assert_eq!(row.redeemed_gross, dec("10.00"));
        assert_eq!(row.net_to_merchant, dec("9.61"));
        assert_eq!(report.overall.total_gross, dec("20.00"));
        assert_eq!(report.overall.redeemed_gross, dec("10.00"));
    }

    #[test]
    fn rows_sort_by_gross_descending() {
        let small = merchant("2024-01-01T00:00:00Z", false, None);
        let large = merchant("2024-01-01T00:00:00Z", false, None);
        let vouchers = vec![
            voucher(&small, "5.00", "2024-03-01T10:00:00Z"),
            voucher(&large, "50.00", "2024-03-01T10:00:00Z"),
        ];
        let merchants = HashMap::from([
            (small.merchant_id, small.clone()),
            (large.merchant_id, large.clone()),
        ]);
        let report = master_revenue(
            &vouchers,
            &merchants,
            &DateRange::all_time(),
            ts("2024-04-01T00:00:00Z"),
        );
        assert_eq!(report.merchants[0].merchant_id, large.merchant_id);
        assert_eq!(report.merchants[1].merchant_id, small.merchant_id);
    }

    #[test]
    fn unknown_merchant_gets_no_commission() {
        let m = merchant("2020-01-01T00:00:00Z", true, Some("0.10"));
        let vouchers = vec![redeemed(
            voucher(&m, "10.00", "2024-03-01T10:00:00Z"),
            "2024-03-02T10:00:00Z",
        )];
        // empty merchant map: fees fall back to processor-only
        let report = master_revenue(
            &vouchers,
            &HashMap::new(),
            &DateRange::all_time(),
            ts("2024-04-01T00:00:00Z"),
        );
        assert_eq!(report.merchants[0].platform_fees, Decimal::ZERO);
        assert_eq!(report.merchants[0].net_to_merchant, dec("9.61"));
    }
}
