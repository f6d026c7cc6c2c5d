//! Common fixture builders for payout-service tests.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use payout_service::engine::DateRange;
use payout_service::models::{Merchant, Voucher, VoucherStatus};
use rust_decimal::Decimal;
use std::sync::Once;
use uuid::Uuid;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,payout_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn ts(s: &str) -> DateTime<Utc> {
    s.parse().expect("valid RFC3339 timestamp")
}

pub fn dec(s: &str) -> Decimal {
    s.parse().expect("valid decimal")
}

pub fn range(from: &str, to: &str) -> DateRange {
    DateRange::new(Some(ts(from)), Some(ts(to)))
}

pub fn merchant(name: &str, created: &str, fee_active: bool, rate: Option<&str>) -> Merchant {
    Merchant {
        merchant_id: Uuid::new_v4(),
        display_name: name.to_string(),
        contact_email: format!(
            "{}@example.com",
            name.to_lowercase().replace(' ', ".")
        ),
        fee_active,
        commission_rate: rate.map(dec),
        created_utc: ts(created),
    }
}

/// Issued voucher for the given merchant, created (and issued) at `created`.
pub fn voucher(merchant: &Merchant, product: &str, gross: &str, created: &str) -> Voucher {
    Voucher {
        voucher_id: Uuid::new_v4(),
        merchant_id: merchant.merchant_id,
        gift_item_id: Uuid::new_v4(),
        product_name: product.to_string(),
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

pub fn from_sender(mut v: Voucher, sender_email: &str) -> Voucher {
    v.sender_email = sender_email.to_string();
    v
}

pub fn with_referral(mut v: Voucher, token: &str, became_sender: bool) -> Voucher {
    v.referral_token = Some(token.to_string());
    v.recipient_became_sender = became_sender;
    v
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
