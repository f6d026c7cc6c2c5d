//! Voucher lifecycle classifier: maps a voucher and a query range to funnel
//! bucket membership.

use chrono::{DateTime, Utc};

use super::DateRange;
use crate::models::{Voucher, VoucherStatus};

/// Terminal event bucket a voucher may fall into for a query range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventBucket {
    Redeemed,
    Refunded,
    Expired,
}

/// Bucket membership of one voucher for a query range. A voucher is in at
/// most one event bucket, and independently in the sold bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Created in range, regardless of later fate: a voucher that was later
    /// redeemed still counts as sold.
    pub sold: bool,
    pub event: Option<EventBucket>,
}

fn in_range(at: Option<DateTime<Utc>>, range: &DateRange) -> bool {
    at.is_some_and(|at| range.contains(at))
}

/// Classify one voucher against a query range.
///
/// The sold bucket keys off the creation timestamp alone. The event buckets
/// apply the dual-timestamp rule: the event timestamp AND the creation
/// timestamp must both fall in range, so a voucher redeemed in-range but
/// created out-of-range is excluded, keeping cohorts consistent with the
/// report window. An unbounded range passes every date condition.
pub fn classify(voucher: &Voucher, range: &DateRange) -> Classification {
    let created_in_range = range.contains(voucher.created_utc);

    let event = if created_in_range {
        match voucher.parsed_status() {
            VoucherStatus::Redeemed if in_range(voucher.redeemed_utc, range) => {
                Some(EventBucket::Redeemed)
            }
            VoucherStatus::Refunded if in_range(voucher.refunded_utc, range) => {
                Some(EventBucket::Refunded)
            }
            VoucherStatus::Expired if in_range(voucher.expired_utc, range) => {
                Some(EventBucket::Expired)
            }
            _ => None,
        }
    } else {
        None
    };

    Classification {
        sold: created_in_range,
        event,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testutil::{expired, merchant, range, redeemed, refunded, voucher};
    use crate::engine::DateRange;

    fn march() -> DateRange {
        range("2024-03-01T00:00:00Z", "2024-04-01T00:00:00Z")
    }

    #[test]
    fn sold_is_independent_of_later_fate() {
        let m = merchant("2024-01-01T00:00:00Z", false, None);
        let v = redeemed(
            voucher(&m, "5.00", "2024-03-10T12:00:00Z"),
            "2024-05-02T09:00:00Z",
        );
        // redeemed after the window: still sold in March, no event bucket
        let c = classify(&v, &march());
        assert!(c.sold);
        assert_eq!(c.event, None);
    }

    #[test]
    fn redeemed_requires_both_timestamps_in_range() {
        let m = merchant("2024-01-01T00:00:00Z", false, None);

        let both_in = redeemed(
            voucher(&m, "5.00", "2024-03-10T12:00:00Z"),
            "2024-03-20T12:00:00Z",
        );
        assert_eq!(classify(&both_in, &march()).event, Some(EventBucket::Redeemed));

        // created before the window, redeemed inside it: excluded
        let created_out = redeemed(
            voucher(&m, "5.00", "2024-02-10T12:00:00Z"),
            "2024-03-20T12:00:00Z",
        );
        let c = classify(&created_out, &march());
        assert!(!c.sold);
        assert_eq!(c.event, None);
    }

    #[test]
    fn refunded_and_expired_are_symmetric() {
        let m = merchant("2024-01-01T00:00:00Z", false, None);
        let r = refunded(
            voucher(&m, "5.00", "2024-03-10T12:00:00Z"),
            "2024-03-15T12:00:00Z",
        );
        assert_eq!(classify(&r, &march()).event, Some(EventBucket::Refunded));

        let e = expired(
            voucher(&m, "5.00", "2024-03-10T12:00:00Z"),
            "2024-03-25T12:00:00Z",
        );
        assert_eq!(classify(&e, &march()).event, Some(EventBucket::Expired));
    }

    #[test]
    fn event_buckets_are_exclusive() {
        let m = merchant("2024-01-01T00:00:00Z", false, None);
        // status is a single value; a refunded voucher with a leftover
        // redeemed timestamp still lands only in the refunded bucket
        let mut v = redeemed(
            voucher(&m, "5.00", "2024-03-10T12:00:00Z"),
            "2024-03-12T12:00:00Z",
        );
        v = refunded(v, "2024-03-15T12:00:00Z");
        assert_eq!(classify(&v, &march()).event, Some(EventBucket::Refunded));
    }

    #[test]
    fn omitted_range_classifies_unconditionally() {
        let m = merchant("2024-01-01T00:00:00Z", false, None);
        let v = redeemed(
            voucher(&m, "5.00", "2019-06-10T12:00:00Z"),
            "2026-03-20T12:00:00Z",
        );
        let c = classify(&v, &DateRange::all_time());
        assert!(c.sold);
        assert_eq!(c.event, Some(EventBucket::Redeemed));
    }

    #[test]
    fn status_without_event_timestamp_has_no_bucket() {
        let m = merchant("2024-01-01T00:00:00Z", false, None);
        let mut v = voucher(&m, "5.00", "2024-03-10T12:00:00Z");
        v.status = "redeemed".to_string();
        assert_eq!(classify(&v, &march()).event, None);
    }
}
