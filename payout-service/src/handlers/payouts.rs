//! Payout handlers: pending totals, audit listing, and the batch write
//! actions.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use service_core::error::AppError;
use validator::Validate;

use crate::dtos::{MarkPaidRequest, MarkPaidResponse, PendingQuery, RecentPaidQuery, RunPayoutsQuery};
use crate::services::payouts::{BackfillSummary, PayoutRunReport};
use crate::models::{PayoutItem, PendingMerchantTotal};
use crate::startup::AppState;

/// Merchant-grouped pending totals driving transfer execution.
pub async fn pending_totals(
    State(state): State<AppState>,
    Query(query): Query<PendingQuery>,
) -> Result<Json<Vec<PendingMerchantTotal>>, AppError> {
    let (from, to) = query.bounds();
    let totals = state.db.pending_totals_by_merchant(from, to).await?;
    Ok(Json(totals))
}

/// Most recently paid items, for display and audit.
pub async fn recent_paid(
    State(state): State<AppState>,
    Query(query): Query<RecentPaidQuery>,
) -> Result<Json<Vec<PayoutItem>>, AppError> {
    query.validate()?;
    let items = state.db.recent_paid(query.limit).await?;
    Ok(Json(items))
}

/// Create payout items for redeemed vouchers that have none yet.
pub async fn backfill(
    State(state): State<AppState>,
) -> Result<Json<BackfillSummary>, AppError> {
    let summary = state.payouts.backfill_payout_items(Utc::now()).await?;
    Ok(Json(summary))
}

/// Settle one merchant's pending items up to the cutoff date.
pub async fn mark_paid(
    State(state): State<AppState>,
    Json(payload): Json<MarkPaidRequest>,
) -> Result<Json<MarkPaidResponse>, AppError> {
    tracing::info!(
        merchant_id = %payload.merchant_id,
        paid_up_to_date = %payload.paid_up_to_date,
        "Marking payout batch as paid"
    );

    state
        .db
        .get_merchant(payload.merchant_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Merchant not found")))?;

    let outcome = state
        .payouts
        .mark_paid_up_to(payload.merchant_id, payload.paid_up_to_date, Utc::now())
        .await?;

    Ok(Json(MarkPaidResponse {
        marked_as_paid: outcome.marked_as_paid,
        cutoff_date: outcome.cutoff_date,
    }))
}

/// Settle every merchant with pending items up to the cutoff date.
pub async fn run_payouts(
    State(state): State<AppState>,
    Query(query): Query<RunPayoutsQuery>,
) -> Result<Json<PayoutRunReport>, AppError> {
    let now = Utc::now();
    let cutoff = query.cutoff_date.unwrap_or_else(|| now.date_naive());
    let report = state.payouts.run_payouts(cutoff, now).await?;
    Ok(Json(report))
}
