//! Payout batch manager: creation and settlement of payout items.
//!
//! The only component with write side effects. Payout items are created from
//! the set of redeemed vouchers that have none yet (at most once per
//! voucher), and settled in per-merchant batches: transfer first, then the
//! atomic pending-to-paid transition.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use service_core::error::AppError;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::engine::voucher_fees;
use crate::models::{CreatePayoutItem, PendingPayoutItem};
use crate::services::metrics::{
    ERRORS_TOTAL, PAYOUT_BATCHES_TOTAL, PAYOUT_ITEMS_MARKED_PAID, PAYOUT_ITEMS_TOTAL,
};
use crate::services::{Database, TransferClient};

/// Outcome of one merchant's mark-paid batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkPaidOutcome {
    pub merchant_id: Uuid,
    pub marked_as_paid: u64,
    pub cutoff_date: NaiveDate,
    pub total_amount: Decimal,
    pub transfer_reference: Option<String>,
}

/// Outcome of a backfill run over redeemed vouchers without payout items.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillSummary {
    pub created: u32,
    pub skipped: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRunFailure {
    pub merchant_id: Uuid,
    pub error: String,
}

/// Outcome of a multi-merchant payout run. Merchants are independent failure
/// domains: one failing batch never aborts the rest.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRunReport {
    pub cutoff_date: NaiveDate,
    pub merchants_processed: u32,
    pub merchants_succeeded: u32,
    pub merchants_failed: u32,
    pub outcomes: Vec<MarkPaidOutcome>,
    pub failures: Vec<PayoutRunFailure>,
}

/// Exclusive instant corresponding to "redeemed on or before `cutoff`".
pub fn cutoff_instant(cutoff: NaiveDate) -> DateTime<Utc> {
    let next_day = cutoff.succ_opt().unwrap_or(cutoff);
    next_day
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
        .and_utc()
}

/// Pending items whose voucher was redeemed before the exclusive cutoff
/// instant. Items with no redemption timestamp never qualify. This is the
/// selection the mark-paid write path persists.
pub fn eligible_items(
    items: &[PendingPayoutItem],
    cutoff_exclusive: DateTime<Utc>,
) -> Vec<&PendingPayoutItem> {
    items
        .iter()
        .filter(|item| {
            item.redeemed_utc
                .is_some_and(|redeemed| redeemed < cutoff_exclusive)
        })
        .collect()
}

/// Payout orchestration over the database and the transfer collaborator.
#[derive(Clone)]
pub struct PayoutService {
    db: Database,
    transfer: TransferClient,
}

impl PayoutService {
    pub fn new(db: Database, transfer: TransferClient) -> Self {
        Self { db, transfer }
    }

    /// Create payout items for redeemed vouchers that have none yet.
    ///
    /// Fees are computed once here and fixed on the item; later fee-setting
    /// changes do not touch existing items. Duplicate creation attempts are
    /// skipped, and a single item's failure never aborts the run.
    #[instrument(skip(self))]
    pub async fn backfill_payout_items(
        &self,
        as_of: DateTime<Utc>,
    ) -> Result<BackfillSummary, AppError> {
        let vouchers = self.db.redeemed_without_payout_item().await?;
        if vouchers.is_empty() {
            return Ok(BackfillSummary::default());
        }

        let merchants = self.db.merchants_by_id().await?;
        let mut summary = BackfillSummary::default();

        for voucher in &vouchers {
            let fees = voucher_fees(voucher, merchants.get(&voucher.merchant_id), as_of).rounded();
            let input = CreatePayoutItem {
                voucher_id: voucher.voucher_id,
                merchant_id: voucher.merchant_id,
                amount_payable: fees.net_to_merchant,
                processor_fee: fees.processor_fee,
                platform_fee: fees.platform_fee,
            };

            match self.db.insert_payout_item(&input).await {
                Ok(Some(_)) => {
                    summary.created += 1;
                    PAYOUT_ITEMS_TOTAL.with_label_values(&["created"]).inc();
                }
                Ok(None) => {
                    summary.skipped += 1;
                    PAYOUT_ITEMS_TOTAL.with_label_values(&["skipped"]).inc();
                }
                Err(e) => {
                    summary.failed += 1;
                    PAYOUT_ITEMS_TOTAL.with_label_values(&["failed"]).inc();
                    ERRORS_TOTAL.with_label_values(&["db_error"]).inc();
                    warn!(
                        voucher_id = %voucher.voucher_id,
                        error = %e,
                        "Failed to create payout item, continuing"
                    );
                }
            }
        }

        info!(
            created = summary.created,
            skipped = summary.skipped,
            failed = summary.failed,
            "Payout item backfill completed"
        );

        Ok(summary)
    }

    /// Settle one merchant's pending payout items up to the cutoff date.
    ///
    /// The transfer executes before the status transition and carries a
    /// deterministic idempotency key for the `(merchant, cutoff)` batch, so
    /// a retry after a crash between the two steps cannot move money twice;
    /// the pending-only update makes re-recording a no-op.
    #[instrument(skip(self), fields(merchant_id = %merchant_id, cutoff_date = %cutoff_date))]
    pub async fn mark_paid_up_to(
        &self,
        merchant_id: Uuid,
        cutoff_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<MarkPaidOutcome, AppError> {
        let pending = self.db.pending_items_for_merchant(merchant_id).await?;
        let eligible = eligible_items(&pending, cutoff_instant(cutoff_date));

        if eligible.is_empty() {
            PAYOUT_BATCHES_TOTAL.with_label_values(&["empty"]).inc();
            return Ok(MarkPaidOutcome {
                merchant_id,
                marked_as_paid: 0,
                cutoff_date,
                total_amount: Decimal::ZERO,
                transfer_reference: None,
            });
        }

        let total_amount: Decimal = eligible.iter().map(|item| item.amount_payable).sum();
        let item_ids: Vec<Uuid> = eligible.iter().map(|item| item.payout_item_id).collect();

        let receipt = self
            .transfer
            .create_transfer(merchant_id, total_amount, cutoff_date)
            .await
            .map_err(|e| {
                ERRORS_TOTAL.with_label_values(&["transfer_error"]).inc();
                PAYOUT_BATCHES_TOTAL.with_label_values(&["error"]).inc();
                AppError::BadGateway(format!("Transfer failed: {}", e))
            })?;

        let marked = self.db.mark_items_paid(&item_ids, &receipt.id, now).await?;

        PAYOUT_BATCHES_TOTAL.with_label_values(&["ok"]).inc();
        PAYOUT_ITEMS_MARKED_PAID
            .with_label_values(&["ok"])
            .inc_by(marked as f64);

        info!(
            marked_as_paid = marked,
            total_amount = %total_amount,
            transfer_reference = %receipt.id,
            "Merchant payout batch settled"
        );

        Ok(MarkPaidOutcome {
            merchant_id,
            marked_as_paid: marked,
            cutoff_date,
            total_amount,
            transfer_reference: Some(receipt.id),
        })
    }

    /// Settle every merchant with pending items redeemed up to the cutoff.
    /// One merchant's failure is recorded and the run continues.
    #[instrument(skip(self), fields(cutoff_date = %cutoff_date))]
    pub async fn run_payouts(
        &self,
        cutoff_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<PayoutRunReport, AppError> {
        let totals = self
            .db
            .pending_totals_by_merchant(None, Some(cutoff_instant(cutoff_date)))
            .await?;

        let mut report = PayoutRunReport {
            cutoff_date,
            merchants_processed: totals.len() as u32,
            merchants_succeeded: 0,
            merchants_failed: 0,
            outcomes: Vec::with_capacity(totals.len()),
            failures: Vec::new(),
        };

        for total in totals {
            match self.mark_paid_up_to(total.merchant_id, cutoff_date, now).await {
                Ok(outcome) => {
                    report.merchants_succeeded += 1;
                    report.outcomes.push(outcome);
                }
                Err(e) => {
                    report.merchants_failed += 1;
                    warn!(
                        merchant_id = %total.merchant_id,
                        error = %e,
                        "Merchant payout batch failed, continuing with remaining merchants"
                    );
                    report.failures.push(PayoutRunFailure {
                        merchant_id: total.merchant_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            merchants_processed = report.merchants_processed,
            merchants_succeeded = report.merchants_succeeded,
            merchants_failed = report.merchants_failed,
            "Payout run completed"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_item(redeemed: Option<&str>, amount: &str) -> PendingPayoutItem {
        PendingPayoutItem {
            payout_item_id: Uuid::new_v4(),
            voucher_id: Uuid::new_v4(),
            merchant_id: Uuid::new_v4(),
            amount_payable: amount.parse().unwrap(),
            redeemed_utc: redeemed.map(|s| s.parse().unwrap()),
        }
    }

    #[test]
    fn cutoff_selects_items_redeemed_on_or_before_the_date() {
        // redemptions on days 1, 2, 5; cutoff day 3 -> two eligible
        let items = vec![
            pending_item(Some("2024-03-01T14:00:00Z"), "4.50"),
            pending_item(Some("2024-03-02T09:30:00Z"), "3.80"),
            pending_item(Some("2024-03-05T18:00:00Z"), "5.20"),
        ];
        let cutoff = cutoff_instant(NaiveDate::from_ymd_opt(2024, 3, 3).unwrap());
        let eligible = eligible_items(&items, cutoff);
        assert_eq!(eligible.len(), 2);
        let total: Decimal = eligible.iter().map(|i| i.amount_payable).sum();
        assert_eq!(total, "8.30".parse::<Decimal>().unwrap());
    }

    #[test]
    fn cutoff_day_itself_is_included_entirely() {
        let items = vec![pending_item(Some("2024-03-03T23:59:59Z"), "4.50")];
        let cutoff = cutoff_instant(NaiveDate::from_ymd_opt(2024, 3, 3).unwrap());
        assert_eq!(eligible_items(&items, cutoff).len(), 1);
    }

    #[test]
    fn items_without_redemption_timestamp_never_qualify() {
        let items = vec![pending_item(None, "4.50")];
        let cutoff = cutoff_instant(NaiveDate::from_ymd_opt(2024, 3, 3).unwrap());
        assert!(eligible_items(&items, cutoff).is_empty());
    }

    #[test]
    fn second_pass_over_settled_batch_selects_nothing() {
        // once items leave pending they are no longer fetched; an empty
        // pending set means a repeated mark-paid call marks zero
        let settled: Vec<PendingPayoutItem> = Vec::new();
        let cutoff = cutoff_instant(NaiveDate::from_ymd_opt(2024, 3, 3).unwrap());
        assert!(eligible_items(&settled, cutoff).is_empty());
    }
}
