//! Database service for payout-service.

use crate::models::{
    CreatePayoutItem, ListVouchersFilter, Merchant, PayoutItem, PendingMerchantTotal,
    PendingPayoutItem, Voucher,
};
use crate::services::metrics::DB_QUERY_DURATION;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "payout-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Merchant Operations
    // -------------------------------------------------------------------------

    /// Get a merchant by ID.
    #[instrument(skip(self), fields(merchant_id = %merchant_id))]
    pub async fn get_merchant(&self, merchant_id: Uuid) -> Result<Option<Merchant>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_merchant"])
            .start_timer();

        let merchant = sqlx::query_as::<_, Merchant>(
            r#"
            SELECT merchant_id, display_name, contact_email, fee_active, commission_rate, created_utc
            FROM merchants
            WHERE merchant_id = $1
            "#,
        )
        .bind(merchant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get merchant: {}", e)))?;

        timer.observe_duration();

        Ok(merchant)
    }

    /// Load all merchants keyed by ID, the lookup table the aggregation
    /// engine consumes.
    #[instrument(skip(self))]
    pub async fn merchants_by_id(&self) -> Result<HashMap<Uuid, Merchant>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["merchants_by_id"])
            .start_timer();

        let merchants = sqlx::query_as::<_, Merchant>(
            r#"
            SELECT merchant_id, display_name, contact_email, fee_active, commission_rate, created_utc
            FROM merchants
            ORDER BY merchant_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list merchants: {}", e)))?;

        timer.observe_duration();

        Ok(merchants
            .into_iter()
            .map(|m| (m.merchant_id, m))
            .collect())
    }

    // -------------------------------------------------------------------------
    // Voucher Operations
    // -------------------------------------------------------------------------

    /// List vouchers with optional merchant scope and creation-time bounds.
    /// The bounds are a superset filter; the engine applies the exact
    /// classifier per voucher.
    #[instrument(skip(self))]
    pub async fn list_vouchers(
        &self,
        filter: &ListVouchersFilter,
    ) -> Result<Vec<Voucher>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_vouchers"])
            .start_timer();

        let vouchers = sqlx::query_as::<_, Voucher>(
            r#"
            SELECT voucher_id, merchant_id, gift_item_id, product_name, item_price, amount_gross,
                   processor_fee, status, payment_reference, sender_email, recipient_contact,
                   referral_token, recipient_became_sender, created_utc, issued_utc, redeemed_utc,
                   refunded_utc, expired_utc
            FROM vouchers
            WHERE ($1::uuid IS NULL OR merchant_id = $1)
              AND ($2::timestamptz IS NULL OR created_utc >= $2)
              AND ($3::timestamptz IS NULL OR created_utc < $3)
            ORDER BY created_utc, voucher_id
            "#,
        )
        .bind(filter.merchant_id)
        .bind(filter.created_from)
        .bind(filter.created_to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list vouchers: {}", e)))?;

        timer.observe_duration();

        Ok(vouchers)
    }

    /// Redeemed vouchers that have no payout item yet: the set difference the
    /// backfill path turns into new payout items.
    #[instrument(skip(self))]
    pub async fn redeemed_without_payout_item(&self) -> Result<Vec<Voucher>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["redeemed_without_payout_item"])
            .start_timer();

        let vouchers = sqlx::query_as::<_, Voucher>(
            r#"
            SELECT v.voucher_id, v.merchant_id, v.gift_item_id, v.product_name, v.item_price,
                   v.amount_gross, v.processor_fee, v.status, v.payment_reference, v.sender_email,
                   v.recipient_contact, v.referral_token, v.recipient_became_sender, v.created_utc,
                   v.issued_utc, v.redeemed_utc, v.refunded_utc, v.expired_utc
            FROM vouchers v
            LEFT JOIN payout_items p ON p.voucher_id = v.voucher_id
            WHERE v.status = 'redeemed'
              AND p.payout_item_id IS NULL
            ORDER BY v.redeemed_utc, v.voucher_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to find unbilled redemptions: {}", e))
        })?;

        timer.observe_duration();

        Ok(vouchers)
    }

    // -------------------------------------------------------------------------
    // Payout Item Operations
    // -------------------------------------------------------------------------

    /// Insert a payout item, at most once per voucher. Returns `None` when an
    /// item for the voucher already exists (the insert is a no-op), so
    /// concurrent backfill runs cannot double-create.
    #[instrument(skip(self, input), fields(voucher_id = %input.voucher_id, merchant_id = %input.merchant_id))]
    pub async fn insert_payout_item(
        &self,
        input: &CreatePayoutItem,
    ) -> Result<Option<PayoutItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_payout_item"])
            .start_timer();

        let item = sqlx::query_as::<_, PayoutItem>(
            r#"
            INSERT INTO payout_items
                (payout_item_id, voucher_id, merchant_id, amount_payable, processor_fee, platform_fee, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending')
            ON CONFLICT (voucher_id) DO NOTHING
            RETURNING payout_item_id, voucher_id, merchant_id, amount_payable, processor_fee,
                      platform_fee, status, created_utc, paid_utc, transfer_reference
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.voucher_id)
        .bind(input.merchant_id)
        .bind(input.amount_payable)
        .bind(input.processor_fee)
        .bind(input.platform_fee)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to insert payout item: {}", e))
        })?;

        timer.observe_duration();

        if let Some(ref item) = item {
            info!(
                payout_item_id = %item.payout_item_id,
                amount_payable = %item.amount_payable,
                "Payout item created"
            );
        }

        Ok(item)
    }

    /// Pending payout items for a merchant, joined with the voucher's
    /// redemption time for cutoff selection.
    #[instrument(skip(self), fields(merchant_id = %merchant_id))]
    pub async fn pending_items_for_merchant(
        &self,
        merchant_id: Uuid,
    ) -> Result<Vec<PendingPayoutItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["pending_items_for_merchant"])
            .start_timer();

        let items = sqlx::query_as::<_, PendingPayoutItem>(
            r#"
            SELECT p.payout_item_id, p.voucher_id, p.merchant_id, p.amount_payable, v.redeemed_utc
            FROM payout_items p
            JOIN vouchers v ON v.voucher_id = p.voucher_id
            WHERE p.merchant_id = $1
              AND p.status = 'pending'
            ORDER BY v.redeemed_utc, p.payout_item_id
            "#,
        )
        .bind(merchant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list pending items: {}", e))
        })?;

        timer.observe_duration();

        Ok(items)
    }

    /// Transition the given payout items to paid, stamping the paid
    /// timestamp and the external transfer reference.
    ///
    /// A single statement, so the batch is atomic: either every selected row
    /// transitions or none does. The `status = 'pending'` predicate makes
    /// retries idempotent, since already-paid items no longer match.
    #[instrument(skip(self, item_ids), fields(item_count = item_ids.len(), transfer_reference = %transfer_reference))]
    pub async fn mark_items_paid(
        &self,
        item_ids: &[Uuid],
        transfer_reference: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_items_paid"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE payout_items
            SET status = 'paid', paid_utc = $2, transfer_reference = $3
            WHERE payout_item_id = ANY($1)
              AND status = 'pending'
            "#,
        )
        .bind(item_ids)
        .bind(paid_at)
        .bind(transfer_reference)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to mark items paid: {}", e))
        })?;

        timer.observe_duration();

        Ok(result.rows_affected())
    }

    /// Pending totals grouped by merchant, optionally filtered by the
    /// voucher redemption time.
    #[instrument(skip(self))]
    pub async fn pending_totals_by_merchant(
        &self,
        redeemed_from: Option<DateTime<Utc>>,
        redeemed_to: Option<DateTime<Utc>>,
    ) -> Result<Vec<PendingMerchantTotal>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["pending_totals_by_merchant"])
            .start_timer();

        let totals = sqlx::query_as::<_, PendingMerchantTotal>(
            r#"
            SELECT p.merchant_id,
                   m.display_name,
                   COUNT(*) AS item_count,
                   COALESCE(SUM(p.amount_payable), 0) AS total_payable
            FROM payout_items p
            JOIN vouchers v ON v.voucher_id = p.voucher_id
            JOIN merchants m ON m.merchant_id = p.merchant_id
            WHERE p.status = 'pending'
              AND ($1::timestamptz IS NULL OR v.redeemed_utc >= $1)
              AND ($2::timestamptz IS NULL OR v.redeemed_utc < $2)
            GROUP BY p.merchant_id, m.display_name
            ORDER BY total_payable DESC, p.merchant_id
            "#,
        )
        .bind(redeemed_from)
        .bind(redeemed_to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to group pending totals: {}", e))
        })?;

        timer.observe_duration();

        Ok(totals)
    }

    /// Most recently paid items, for display and audit.
    #[instrument(skip(self))]
    pub async fn recent_paid(&self, limit: i64) -> Result<Vec<PayoutItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["recent_paid"])
            .start_timer();

        let items = sqlx::query_as::<_, PayoutItem>(
            r#"
            SELECT payout_item_id, voucher_id, merchant_id, amount_payable, processor_fee,
                   platform_fee, status, created_utc, paid_utc, transfer_reference
            FROM payout_items
            WHERE status = 'paid'
            ORDER BY paid_utc DESC, payout_item_id
            LIMIT $1
            "#,
        )
        .bind(limit.clamp(1, 500))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list paid items: {}", e)))?;

        timer.observe_duration();

        Ok(items)
    }
}
