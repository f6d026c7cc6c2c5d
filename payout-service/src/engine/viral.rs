//! Viral and cohort analytics over the recipient referral graph.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::{classify, ratio_pct, round2, DateRange};
use crate::models::Voucher;

/// One recipient cohort, keyed by the calendar month of the recipient's
/// first voucher.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortRow {
    /// `YYYY-MM`.
    pub cohort: String,
    pub recipients: u64,
    pub converted: u64,
    pub conversion_rate: f64,
}

/// Daily counterpart of [`CohortRow`] for trend charts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub recipients: u64,
    pub converted: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViralReport {
    pub total_recipients: u64,
    pub converted_recipients: u64,
    /// converted / total recipients, percent.
    pub viral_conversion_rate: f64,
    /// total recipients / distinct senders; 0 when there are no senders.
    pub viral_coefficient: f64,
    pub cohorts: Vec<CohortRow>,
    pub daily: Vec<SeriesPoint>,
}

struct Recipient {
    first_voucher_utc: DateTime<Utc>,
    converted: bool,
}

/// Group in-range vouchers by recipient referral token. A recipient converts
/// when any of their vouchers carries the became-sender flag; the viral
/// coefficient relates recipients reached to the distinct senders who
/// reached them.
pub fn viral(vouchers: &[Voucher], range: &DateRange) -> ViralReport {
    let mut recipients: HashMap<&str, Recipient> = HashMap::new();
    let mut senders: HashSet<&str> = HashSet::new();

    for voucher in vouchers {
        if !classify(voucher, range).sold {
            continue;
        }
        senders.insert(voucher.sender_email.as_str());
        let Some(token) = voucher.referral_token.as_deref() else {
            continue;
        };
        recipients
            .entry(token)
            .and_modify(|r| {
                r.first_voucher_utc = r.first_voucher_utc.min(voucher.created_utc);
                r.converted |= voucher.recipient_became_sender;
            })
            .or_insert(Recipient {
                first_voucher_utc: voucher.created_utc,
                converted: voucher.recipient_became_sender,
            });
    }

    let total_recipients = recipients.len() as u64;
    let converted_recipients = recipients.values().filter(|r| r.converted).count() as u64;

    // (recipients, converted) per calendar month and per calendar day of the
    // recipient's first voucher; BTreeMap keeps both series ordered
    let mut cohorts: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    let mut daily: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();
    for recipient in recipients.values() {
        let first = recipient.first_voucher_utc;
        let month = format!("{:04}-{:02}", first.year(), first.month());
        let converted = u64::from(recipient.converted);

        let m = cohorts.entry(month).or_default();
        m.0 += 1;
        m.1 += converted;

        let d = daily.entry(first.date_naive()).or_default();
        d.0 += 1;
        d.1 += converted;
    }

    let viral_coefficient = if senders.is_empty() {
        0.0
    } else {
        round2(total_recipients as f64 / senders.len() as f64)
    };

    ViralReport {
        total_recipients,
        converted_recipients,
        viral_conversion_rate: ratio_pct(converted_recipients, total_recipients),
        viral_coefficient,
        cohorts: cohorts
            .into_iter()
            .map(|(cohort, (recipients, converted))| CohortRow {
                conversion_rate: ratio_pct(converted, recipients),
                cohort,
                recipients,
                converted,
            })
            .collect(),
        daily: daily
            .into_iter()
            .map(|(date, (recipients, converted))| SeriesPoint {
                date,
                recipients,
                converted,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testutil::{merchant, voucher};
    use crate::engine::DateRange;

    #[test]
    fn conversion_rate_and_coefficient() {
        // 20 recipients reached by 4 distinct senders; 4 recipients convert
        let m = merchant("2024-01-01T00:00:00Z", false, None);
        let mut vouchers = Vec::new();
        for i in 0..20 {
            let mut v = voucher(&m, "5.00", "2024-03-05T10:00:00Z");
            v.sender_email = format!("sender{}@example.com", i % 4);
            v.referral_token = Some(format!("token-{}", i));
            v.recipient_became_sender = i < 4;
            vouchers.push(v);
        }

        let report = viral(&vouchers, &DateRange::all_time());
        assert_eq!(report.total_recipients, 20);
        assert_eq!(report.converted_recipients, 4);
        assert_eq!(report.viral_conversion_rate, 20.0);
        assert_eq!(report.viral_coefficient, 5.0);
    }

    #[test]
    fn recipient_converts_if_any_voucher_has_flag() {
        let m = merchant("2024-01-01T00:00:00Z", false, None);
        let mut first = voucher(&m, "5.00", "2024-03-05T10:00:00Z");
        first.referral_token = Some("tok".to_string());
        let mut second = voucher(&m, "5.00", "2024-04-02T10:00:00Z");
        second.referral_token = Some("tok".to_string());
        second.recipient_became_sender = true;

        let report = viral(&[first, second], &DateRange::all_time());
        assert_eq!(report.total_recipients, 1);
        assert_eq!(report.converted_recipients, 1);
        // cohort keyed by the first voucher's month
        assert_eq!(report.cohorts.len(), 1);
        assert_eq!(report.cohorts[0].cohort, "2024-03");
        assert_eq!(report.cohorts[0].conversion_rate, 100.0);
    }

    #[test]
    fn cohorts_and_series_are_ordered() {
        let m = merchant("2024-01-01T00:00:00Z", false, None);
        let mut vouchers = Vec::new();
        for (i, created) in ["2024-04-10T10:00:00Z", "2024-02-01T10:00:00Z"]
            .iter()
            .enumerate()
        {
            let mut v = voucher(&m, "5.00", created);
            v.referral_token = Some(format!("tok-{}", i));
            vouchers.push(v);
        }
        let report = viral(&vouchers, &DateRange::all_time());
        assert_eq!(report.cohorts[0].cohort, "2024-02");
        assert_eq!(report.cohorts[1].cohort, "2024-04");
        assert!(report.daily[0].date < report.daily[1].date);
    }

    #[test]
    fn no_recipients_yields_zeroes() {
        let m = merchant("2024-01-01T00:00:00Z", false, None);
        // sold vouchers without referral tokens: senders exist, recipients do not
        let vouchers = vec![voucher(&m, "5.00", "2024-03-05T10:00:00Z")];
        let report = viral(&vouchers, &DateRange::all_time());
        assert_eq!(report.total_recipients, 0);
        assert_eq!(report.viral_conversion_rate, 0.0);
        assert_eq!(report.viral_coefficient, 0.0);
    }
}
