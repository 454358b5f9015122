//! Rate and share computations.
//!
//! Every value leaving this module is finite; downstream consumers
//! never see NaN or infinity. "Insufficient data" is a typed absence
//! (`None`), distinct from a genuine 0% rate.

use crate::types::EventRecord;

/// Division that can never produce NaN or infinity: a non-positive
/// denominator yields 0.
pub fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator <= 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Success/error shares over records with a boolean outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuccessRates {
    pub success_rate: f64,
    pub error_rate: f64,
}

/// Compute success and error rates.
///
/// Only records with `success = Some(..)` enter the denominator;
/// `success = None` means "not applicable" and is excluded. With zero
/// qualifying records the result is `None`: insufficient data, not 0%.
pub fn compute_success_rate(records: &[EventRecord]) -> Option<SuccessRates> {
    let mut succeeded: u64 = 0;
    let mut failed: u64 = 0;
    for record in records {
        match record.success {
            Some(true) => succeeded += 1,
            Some(false) => failed += 1,
            None => {}
        }
    }

    let total = succeeded + failed;
    if total == 0 {
        return None;
    }
    Some(SuccessRates {
        success_rate: succeeded as f64 / total as f64,
        error_rate: failed as f64 / total as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(success: Option<bool>) -> EventRecord {
        EventRecord {
            id: "evt".to_string(),
            occurred_at: None,
            event_name: "checkout".to_string(),
            feature: None,
            action_stage: None,
            success,
            user_id: None,
            anon_id: None,
            session_id: None,
            plan_tier: None,
            subscription_status: None,
            billing_period: None,
            route: None,
            section: None,
            device_type: None,
            os: None,
            browser: None,
            utm_source: None,
            utm_medium: None,
            utm_campaign: None,
            referrer: None,
            landing_page: None,
            properties: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_safe_divide_never_nan() {
        assert_eq!(safe_divide(10.0, 4.0), 2.5);
        assert_eq!(safe_divide(10.0, 0.0), 0.0);
        assert_eq!(safe_divide(10.0, -1.0), 0.0);
        assert_eq!(safe_divide(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_rate_sentinel_on_empty_input() {
        assert_eq!(compute_success_rate(&[]), None);
    }

    #[test]
    fn test_rate_sentinel_on_all_null_success() {
        let records = vec![record(None), record(None), record(None)];
        assert_eq!(compute_success_rate(&records), None);
    }

    #[test]
    fn test_null_success_excluded_from_denominator() {
        let records = vec![record(Some(true)), record(Some(false)), record(None)];
        let rates = compute_success_rate(&records).unwrap();
        assert_eq!(rates.success_rate, 0.5);
        assert_eq!(rates.error_rate, 0.5);
    }

    #[test]
    fn test_zero_percent_success_is_not_the_sentinel() {
        let records = vec![record(Some(false)), record(Some(false))];
        let rates = compute_success_rate(&records).unwrap();
        assert_eq!(rates.success_rate, 0.0);
        assert_eq!(rates.error_rate, 1.0);
    }
}
