//! Request and response DTOs for the HTTP surface.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::config::ReportingConfig;
use crate::engine::DateRange;
use crate::middleware::MerchantScope;
use crate::models::ListVouchersFilter;

/// Common analytics query parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub merchant_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// Resolved analytics parameters: effective merchant scope plus the clamped
/// query range.
#[derive(Debug, Clone, Copy)]
pub struct ReportParams {
    pub merchant_id: Option<Uuid>,
    pub range: DateRange,
}

impl ReportQuery {
    /// Resolve the effective merchant (the session header wins over the
    /// explicit parameter) and clamp the range's lower bound to the platform
    /// operational start date. `dateTo` is inclusive as a calendar date, so
    /// the range's exclusive upper bound is the following midnight.
    pub fn resolve(&self, scope: &MerchantScope, reporting: &ReportingConfig) -> ReportParams {
        let range = DateRange::new(
            self.date_from.map(start_of_day),
            self.date_to.map(day_after),
        )
        .clamp_from(start_of_day(reporting.min_report_date));

        ReportParams {
            merchant_id: scope.merchant_id.or(self.merchant_id),
            range,
        }
    }
}

impl ReportParams {
    /// Superset fetch filter matching this range; the engine re-applies the
    /// exact classifier per voucher.
    pub fn voucher_filter(&self) -> ListVouchersFilter {
        ListVouchersFilter {
            merchant_id: self.merchant_id,
            created_from: self.range.from,
            created_to: self.range.to,
        }
    }
}

pub(crate) fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
        .and_utc()
}

pub(crate) fn day_after(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date.succ_opt().unwrap_or(date))
}

/// Pending-totals query: optional redemption-time window.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingQuery {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl PendingQuery {
    pub fn bounds(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        (
            self.date_from.map(start_of_day),
            self.date_to.map(day_after),
        )
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecentPaidQuery {
    #[serde(default = "default_recent_limit")]
    #[validate(range(min = 1, max = 500))]
    pub limit: i64,
}

fn default_recent_limit() -> i64 {
    20
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkPaidRequest {
    pub merchant_id: Uuid,
    pub paid_up_to_date: NaiveDate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkPaidResponse {
    pub marked_as_paid: u64,
    pub cutoff_date: NaiveDate,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunPayoutsQuery {
    /// Defaults to today when absent.
    pub cutoff_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reporting() -> ReportingConfig {
        ReportingConfig {
            min_report_date: NaiveDate::from_ymd_opt(2023, 9, 1).unwrap(),
        }
    }

    #[test]
    fn resolve_clamps_early_date_from() {
        let query = ReportQuery {
            merchant_id: None,
            date_from: Some(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
            date_to: None,
        };
        let params = query.resolve(&MerchantScope::default(), &reporting());
        assert_eq!(
            params.range.from,
            Some(start_of_day(NaiveDate::from_ymd_opt(2023, 9, 1).unwrap()))
        );
    }

    #[test]
    fn resolve_makes_date_to_inclusive() {
        let query = ReportQuery {
            merchant_id: None,
            date_from: Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            date_to: Some(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()),
        };
        let params = query.resolve(&MerchantScope::default(), &reporting());
        assert!(params.range.contains("2024-03-31T23:00:00Z".parse().unwrap()));
        assert!(!params.range.contains("2024-04-01T00:00:00Z".parse().unwrap()));
    }

    #[test]
    fn session_scope_wins_over_query_parameter() {
        let session_merchant = Uuid::new_v4();
        let query = ReportQuery {
            merchant_id: Some(Uuid::new_v4()),
            date_from: None,
            date_to: None,
        };
        let scope = MerchantScope {
            merchant_id: Some(session_merchant),
        };
        let params = query.resolve(&scope, &reporting());
        assert_eq!(params.merchant_id, Some(session_merchant));
    }
}
