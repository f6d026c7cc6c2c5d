//! Redemption delay statistics: how long vouchers sit between issue and
//! redemption.

use rust_decimal::Decimal;
use serde::Serialize;

use super::{classify, round2, round_money, DateRange, EventBucket};
use crate::models::Voucher;

const MS_PER_DAY: f64 = 86_400_000.0;

/// Day-boundary histogram buckets; lower bound inclusive, upper exclusive.
const DELAY_BUCKETS: [(f64, f64, &str); 9] = [
    (0.0, 1.0, "0-1"),
    (1.0, 3.0, "1-3"),
    (3.0, 7.0, "3-7"),
    (7.0, 14.0, "7-14"),
    (14.0, 30.0, "14-30"),
    (30.0, 60.0, "30-60"),
    (60.0, 90.0, "60-90"),
    (90.0, 365.0, "90-365"),
    (365.0, f64::INFINITY, "365+"),
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayBucket {
    pub label: String,
    pub count: u64,
    pub average_gross: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionDelayReport {
    pub count: u64,
    pub mean_days: f64,
    pub min_days: f64,
    pub max_days: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub histogram: Vec<DelayBucket>,
}

/// Percentile by sorting ascending and indexing at `floor(len * p)`.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64) * p).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Delay statistics over redeemed vouchers (dual-timestamp rule) carrying
/// both an issue and a redemption timestamp.
pub fn redemption_delay(vouchers: &[Voucher], range: &DateRange) -> RedemptionDelayReport {
    let mut samples: Vec<(f64, Decimal)> = Vec::new();

    for voucher in vouchers {
        if classify(voucher, range).event != Some(EventBucket::Redeemed) {
            continue;
        }
        let (Some(issued), Some(redeemed)) = (voucher.issued_utc, voucher.redeemed_utc) else {
            continue;
        };
        let delay_days = (redeemed - issued).num_milliseconds() as f64 / MS_PER_DAY;
        samples.push((delay_days, voucher.effective_gross()));
    }

    let mut delays: Vec<f64> = samples.iter().map(|(d, _)| *d).collect();
    delays.sort_by(|a, b| a.total_cmp(b));

    let count = delays.len() as u64;
    let (mean, min, max) = if delays.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        (
            delays.iter().sum::<f64>() / delays.len() as f64,
            delays[0],
            delays[delays.len() - 1],
        )
    };

    let histogram = DELAY_BUCKETS
        .iter()
        .map(|&(lo, hi, label)| {
            let mut bucket_count = 0u64;
            let mut gross_sum = Decimal::ZERO;
            for (delay, gross) in &samples {
                if *delay >= lo && *delay < hi {
                    bucket_count += 1;
                    gross_sum += *gross;
                }
            }
            DelayBucket {
                label: label.to_string(),
                count: bucket_count,
                average_gross: if bucket_count == 0 {
                    Decimal::ZERO
                } else {
                    round_money(gross_sum / Decimal::from(bucket_count))
                },
            }
        })
        .collect();

    RedemptionDelayReport {
        count,
        mean_days: round2(mean),
        min_days: round2(min),
        max_days: round2(max),
        p25: round2(percentile(&delays, 0.25)),
        p50: round2(percentile(&delays, 0.50)),
        p75: round2(percentile(&delays, 0.75)),
        p90: round2(percentile(&delays, 0.90)),
        histogram,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testutil::{dec, merchant, redeemed, voucher};
    use crate::engine::DateRange;

    fn redeemed_after_days(days: i64, gross: &str) -> Voucher {
        let m = merchant("2024-01-01T00:00:00Z", false, None);
        let v = voucher(&m, gross, "2024-03-01T00:00:00Z");
        let at = (v.created_utc + chrono::Duration::days(days)).to_rfc3339();
        redeemed(v, &at)
    }

    #[test]
    fn computes_basic_statistics() {
        let vouchers: Vec<Voucher> = [1, 2, 4, 8]
            .iter()
            .map(|d| redeemed_after_days(*d, "5.00"))
            .collect();
        let report = redemption_delay(&vouchers, &DateRange::all_time());
        assert_eq!(report.count, 4);
        assert_eq!(report.min_days, 1.0);
        assert_eq!(report.max_days, 8.0);
        assert_eq!(report.mean_days, 3.75);
        // floor(4 * 0.25) = 1 -> second-smallest sample
        assert_eq!(report.p25, 2.0);
    }

    #[test]
    fn percentiles_are_monotonic() {
        let vouchers: Vec<Voucher> = [0, 1, 2, 3, 5, 9, 13, 21, 40, 100]
            .iter()
            .map(|d| redeemed_after_days(*d, "5.00"))
            .collect();
        let r = redemption_delay(&vouchers, &DateRange::all_time());
        assert!(r.p25 <= r.p50);
        assert!(r.p50 <= r.p75);
        assert!(r.p75 <= r.p90);
        assert!(r.p90 <= r.max_days);
    }

    #[test]
    fn histogram_buckets_at_day_boundaries() {
        let vouchers = vec![
            redeemed_after_days(0, "4.00"),
            redeemed_after_days(2, "6.00"),
            redeemed_after_days(2, "8.00"),
            redeemed_after_days(400, "10.00"),
        ];
        let r = redemption_delay(&vouchers, &DateRange::all_time());
        let bucket = |label: &str| {
            r.histogram
                .iter()
                .find(|b| b.label == label)
                .expect("bucket exists")
                .clone()
        };
        assert_eq!(bucket("0-1").count, 1);
        assert_eq!(bucket("1-3").count, 2);
        assert_eq!(bucket("1-3").average_gross, dec("7.00"));
        assert_eq!(bucket("365+").count, 1);
        assert_eq!(bucket("7-14").count, 0);
        assert_eq!(bucket("7-14").average_gross, Decimal::ZERO);
    }

    #[test]
    fn empty_sample_reports_zeroes() {
        let r = redemption_delay(&[], &DateRange::all_time());
        assert_eq!(r.count, 0);
        assert_eq!(r.mean_days, 0.0);
        assert_eq!(r.p90, 0.0);
        assert!(r.histogram.iter().all(|b| b.count == 0));
    }

    #[test]
    fn vouchers_without_issue_timestamp_are_skipped() {
        let mut v = redeemed_after_days(3, "5.00");
        v.issued_utc = None;
        let r = redemption_delay(&[v], &DateRange::all_time());
        assert_eq!(r.count, 0);
    }
}
