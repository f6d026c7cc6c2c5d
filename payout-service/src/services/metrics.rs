//! Prometheus metrics for payout-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "payout_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Payout item creation outcomes from the backfill path.
pub static PAYOUT_ITEMS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "payout_items_total",
        "Payout item creation attempts by outcome",
        &["outcome"] // created, skipped, failed
    )
    .expect("Failed to register payout_items_total")
});

/// Batch mark-paid outcomes.
pub static PAYOUT_BATCHES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "payout_batches_total",
        "Batch payout runs by status",
        &["status"] // ok, error, empty
    )
    .expect("Failed to register payout_batches_total")
});

/// Items transitioned to paid.
pub static PAYOUT_ITEMS_MARKED_PAID: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "payout_items_marked_paid_total",
        "Payout items transitioned to paid",
        &["status"] // ok - not merchant_id to avoid cardinality explosion
    )
    .expect("Failed to register payout_items_marked_paid")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "payout_errors_total",
        "Total number of errors by type",
        &["error_type"] // db_error, transfer_error, etc.
    )
    .expect("Failed to register errors_total")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&PAYOUT_ITEMS_TOTAL);
    Lazy::force(&PAYOUT_BATCHES_TOTAL);
    Lazy::force(&PAYOUT_ITEMS_MARKED_PAID);
    Lazy::force(&ERRORS_TOTAL);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
