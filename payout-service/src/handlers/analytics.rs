//! Analytics handlers: read-only aggregation views over the voucher store.
//!
//! Every endpoint accepts `merchantId`/`dateFrom`/`dateTo` query parameters;
//! cafe-scoped sessions are resolved via the `X-Merchant-Id` header instead
//! of the explicit parameter.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use service_core::error::AppError;

use crate::dtos::{ReportParams, ReportQuery};
use crate::engine::{
    self, DashboardReport, FeeTotalsReport, FunnelReport, ProductMixEntry, RedemptionDelayReport,
    RevenueReport, ViralReport,
};
use crate::middleware::MerchantScope;
use crate::models::Voucher;
use crate::startup::AppState;

async fn fetch_vouchers(
    state: &AppState,
    params: &ReportParams,
) -> Result<Vec<Voucher>, AppError> {
    state.db.list_vouchers(&params.voucher_filter()).await
}

/// Funnel totals: sold/redeemed/refunded/expired counts and gross sums.
pub async fn funnel(
    State(state): State<AppState>,
    scope: MerchantScope,
    Query(query): Query<ReportQuery>,
) -> Result<Json<FunnelReport>, AppError> {
    let params = query.resolve(&scope, &state.config.reporting);
    let vouchers = fetch_vouchers(&state, &params).await?;
    Ok(Json(engine::funnel(&vouchers, &params.range)))
}

/// Fee breakdown over redeemed vouchers.
pub async fn fees(
    State(state): State<AppState>,
    scope: MerchantScope,
    Query(query): Query<ReportQuery>,
) -> Result<Json<FeeTotalsReport>, AppError> {
    let params = query.resolve(&scope, &state.config.reporting);
    let vouchers = fetch_vouchers(&state, &params).await?;
    let merchants = state.db.merchants_by_id().await?;
    Ok(Json(engine::fee_totals(
        &vouchers,
        &merchants,
        &params.range,
        Utc::now(),
    )))
}

/// Product mix over redeemed vouchers.
pub async fn products(
    State(state): State<AppState>,
    scope: MerchantScope,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<ProductMixEntry>>, AppError> {
    let params = query.resolve(&scope, &state.config.reporting);
    let vouchers = fetch_vouchers(&state, &params).await?;
    Ok(Json(engine::product_mix(&vouchers, &params.range)))
}

/// Redemption delay statistics and histogram.
pub async fn redemption_delay(
    State(state): State<AppState>,
    scope: MerchantScope,
    Query(query): Query<ReportQuery>,
) -> Result<Json<RedemptionDelayReport>, AppError> {
    let params = query.resolve(&scope, &state.config.reporting);
    let vouchers = fetch_vouchers(&state, &params).await?;
    Ok(Json(engine::redemption_delay(&vouchers, &params.range)))
}

/// Viral metrics, cohort table, and daily series.
pub async fn viral(
    State(state): State<AppState>,
    scope: MerchantScope,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ViralReport>, AppError> {
    let params = query.resolve(&scope, &state.config.reporting);
    let vouchers = fetch_vouchers(&state, &params).await?;
    Ok(Json(engine::viral(&vouchers, &params.range)))
}

/// Master revenue view: per-merchant totals plus the overall rollup.
pub async fn revenue(
    State(state): State<AppState>,
    scope: MerchantScope,
    Query(query): Query<ReportQuery>,
) -> Result<Json<RevenueReport>, AppError> {
    let params = query.resolve(&scope, &state.config.reporting);
    let vouchers = fetch_vouchers(&state, &params).await?;
    let merchants = state.db.merchants_by_id().await?;
    Ok(Json(engine::master_revenue(
        &vouchers,
        &merchants,
        &params.range,
        Utc::now(),
    )))
}

/// Composed dashboard report: every view over one voucher fetch.
pub async fn report(
    State(state): State<AppState>,
    scope: MerchantScope,
    Query(query): Query<ReportQuery>,
) -> Result<Json<DashboardReport>, AppError> {
    let params = query.resolve(&scope, &state.config.reporting);
    tracing::info!(
        merchant_id = ?params.merchant_id,
        "Building dashboard report"
    );
    let vouchers = fetch_vouchers(&state, &params).await?;
    let merchants = state.db.merchants_by_id().await?;
    Ok(Json(engine::build_report(
        &vouchers,
        &merchants,
        &params.range,
        Utc::now(),
    )))
}
