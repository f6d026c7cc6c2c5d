//! Fee calculator: processor fee and platform commission for a single
//! monetary transaction, plus the aggregated fee breakdown over a voucher
//! population.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use super::{pct_of, round_money, DateRange, EventBucket};
use crate::models::{Merchant, Voucher};

/// Fee breakdown for one gross amount, at full precision.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeBreakdown {
    pub gross: Decimal,
    pub processor_fee: Decimal,
    pub platform_fee: Decimal,
    pub net_after_processor: Decimal,
    pub net_to_merchant: Decimal,
}

impl FeeBreakdown {
    /// Rounded to the currency minor unit for external reporting. The net is
    /// re-derived from the rounded parts so that
    /// `gross == processor_fee + platform_fee + net_to_merchant` holds
    /// exactly on the reported values.
    pub fn rounded(&self) -> FeeBreakdown {
        let gross = round_money(self.gross);
        let processor_fee = round_money(self.processor_fee);
        let platform_fee = round_money(self.platform_fee);
        FeeBreakdown {
            gross,
            processor_fee,
            platform_fee,
            net_after_processor: gross - processor_fee,
            net_to_merchant: gross - processor_fee - platform_fee,
        }
    }
}

/// Estimate the processor fee when the processor never reported one:
/// flat-rate-plus-percentage, 1.4% + 0.25.
pub fn estimate_processor_fee(gross: Decimal) -> Decimal {
    gross * Decimal::new(14, 3) + Decimal::new(25, 2)
}

/// Effective processor fee: the stored fee when present and non-zero,
/// otherwise the estimate. Real processor fees always take precedence.
pub fn effective_processor_fee(gross: Decimal, stored: Option<Decimal>) -> Decimal {
    match stored {
        Some(fee) if !fee.is_zero() => fee,
        _ => estimate_processor_fee(gross),
    }
}

/// Compute the fee breakdown for one transaction.
///
/// Negative gross amounts are clamped to zero before any fee is derived.
/// Commission is gated on merchant age and the fee-active flag; when either
/// condition fails the platform fee is zero. Outputs are full precision;
/// callers round via [`FeeBreakdown::rounded`] at the reporting boundary.
pub fn compute_fees(
    gross: Decimal,
    merchant: &Merchant,
    stored_processor_fee: Option<Decimal>,
    as_of: DateTime<Utc>,
) -> FeeBreakdown {
    let gross = gross.max(Decimal::ZERO);
    let processor_fee = effective_processor_fee(gross, stored_processor_fee);
    let net_after_processor = gross - processor_fee;
    let platform_fee = if merchant.commission_applies(as_of) {
        net_after_processor * merchant.effective_commission_rate()
    } else {
        Decimal::ZERO
    };
    FeeBreakdown {
        gross,
        processor_fee,
        platform_fee,
        net_after_processor,
        net_to_merchant: gross - processor_fee - platform_fee,
    }
}

/// Fee breakdown for a voucher's effective gross and stored processor fee.
/// A voucher whose merchant record is missing gets no platform commission.
pub fn voucher_fees(
    voucher: &Voucher,
    merchant: Option<&Merchant>,
    as_of: DateTime<Utc>,
) -> FeeBreakdown {
    match merchant {
        Some(merchant) => compute_fees(
            voucher.effective_gross(),
            merchant,
            voucher.processor_fee,
            as_of,
        ),
        None => {
            let gross = voucher.effective_gross().max(Decimal::ZERO);
            let processor_fee = effective_processor_fee(gross, voucher.processor_fee);
            FeeBreakdown {
                gross,
                processor_fee,
                platform_fee: Decimal::ZERO,
                net_after_processor: gross - processor_fee,
                net_to_merchant: gross - processor_fee,
            }
        }
    }
}

/// Aggregated fee breakdown over the redeemed vouchers of a population.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeTotalsReport {
    pub redeemed_count: u64,
    pub gross: Decimal,
    pub processor_fee: Decimal,
    pub platform_fee: Decimal,
    pub net_to_merchant: Decimal,
    pub processor_fee_pct: f64,
    pub platform_fee_pct: f64,
    pub net_pct: f64,
}

/// Restrict to redeemed vouchers (dual-timestamp rule), apply the fee
/// calculator per voucher, and sum at full precision; rounding and the
/// percentage-of-gross shares are computed on the sums.
pub fn fee_totals(
    vouchers: &[Voucher],
    merchants: &HashMap<Uuid, Merchant>,
    range: &DateRange,
    as_of: DateTime<Utc>,
) -> FeeTotalsReport {
    let mut redeemed_count = 0u64;
    let mut gross = Decimal::ZERO;
    let mut processor_fee = Decimal::ZERO;
    let mut platform_fee = Decimal::ZERO;
    let mut net_to_merchant = Decimal::ZERO;

    for voucher in vouchers {
        if super::classify(voucher, range).event != Some(EventBucket::Redeemed) {
            continue;
        }
        let fees = voucher_fees(voucher, merchants.get(&voucher.merchant_id), as_of);
        redeemed_count += 1;
        gross += fees.gross;
        processor_fee += fees.processor_fee;
        platform_fee += fees.platform_fee;
        net_to_merchant += fees.net_to_merchant;
    }

    FeeTotalsReport {
        redeemed_count,
        processor_fee_pct: pct_of(processor_fee, gross),
        platform_fee_pct: pct_of(platform_fee, gross),
        net_pct: pct_of(net_to_merchant, gross),
        gross: round_money(gross),
        processor_fee: round_money(processor_fee),
        platform_fee: round_money(platform_fee),
        net_to_merchant: round_money(net_to_merchant),
    }
}
