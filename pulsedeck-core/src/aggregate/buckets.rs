//! Daily bucket builder and rolling distinct-user series.
//!
//! Buckets are derived, ephemeral values: built fresh from the current
//! in-memory record slice on every pass, never persisted, and owned
//! exclusively by the call that produced them.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use super::classify::{CategoryTable, EventCategory};
use super::rates::safe_divide;
use crate::types::{DateRange, EventRecord};

/// Payload key probed for a latency-like numeric measurement.
pub const LATENCY_PROPERTY: &str = "latency_ms";

/// Per-calendar-day aggregate over a record slice.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBucket {
    pub day: NaiveDate,
    /// Total events on this day
    pub events: u64,
    /// Distinct user ids seen this day
    pub users: BTreeSet<String>,
    /// Distinct session ids seen this day
    pub sessions: BTreeSet<String>,
    /// Events with `success = true`
    pub success_count: u64,
    /// Events with `success = false`
    pub failure_count: u64,
    /// Events with no user id but an anonymous id
    pub anon_events: u64,
    /// Events in the content group
    pub content_events: u64,
    /// Events attributed to an AI module
    pub ai_events: u64,
    /// Paywall-block events
    pub paywall_events: u64,
    /// Sum of the latency property across sampled events
    pub latency_sum_ms: f64,
    /// Number of events carrying the latency property
    pub latency_samples: u64,
}

impl DailyBucket {
    fn empty(day: NaiveDate) -> Self {
        Self {
            day,
            events: 0,
            users: BTreeSet::new(),
            sessions: BTreeSet::new(),
            success_count: 0,
            failure_count: 0,
            anon_events: 0,
            content_events: 0,
            ai_events: 0,
            paywall_events: 0,
            latency_sum_ms: 0.0,
            latency_samples: 0,
        }
    }

    pub fn distinct_users(&self) -> usize {
        self.users.len()
    }

    pub fn distinct_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Denominator for success/error rates: boolean outcomes only.
    pub fn outcome_total(&self) -> u64 {
        self.success_count + self.failure_count
    }

    /// Mean latency over sampled events; 0 with no samples.
    pub fn avg_latency_ms(&self) -> f64 {
        safe_divide(self.latency_sum_ms, self.latency_samples as f64)
    }

    fn accumulate(&mut self, record: &EventRecord, table: &CategoryTable) {
        self.events += 1;

        if let Some(user_id) = record.user_id.as_deref().filter(|u| !u.is_empty()) {
            self.users.insert(user_id.to_string());
        }
        if let Some(session_id) = record.session_id.as_deref().filter(|s| !s.is_empty()) {
            self.sessions.insert(session_id.to_string());
        }
        match record.success {
            Some(true) => self.success_count += 1,
            Some(false) => self.failure_count += 1,
            None => {}
        }
        if record.is_anonymous() {
            self.anon_events += 1;
        }
        match table.classify(record) {
            Some(EventCategory::Content) => self.content_events += 1,
            Some(EventCategory::Module(_)) => self.ai_events += 1,
            None => {}
        }
        if table.is_paywall(record) {
            self.paywall_events += 1;
        }
        if let Some(latency) = record.numeric_property(LATENCY_PROPERTY) {
            self.latency_sum_ms += latency;
            self.latency_samples += 1;
        }
    }
}

/// Build one bucket per calendar day, ascending.
///
/// With a valid `range`, the output covers every day in
/// `[range.start, range.end]` inclusive, zero-filled where no events
/// exist, and records falling outside the range are skipped. With
/// `range = None` (unparseable bounds upstream) the output degrades to
/// only the days actually present in the data, still ascending.
///
/// Records without a parseable timestamp are excluded: their day
/// membership cannot be determined.
pub fn build_daily_buckets(
    records: &[EventRecord],
    range: Option<&DateRange>,
    table: &CategoryTable,
) -> Vec<DailyBucket> {
    let mut by_day: BTreeMap<NaiveDate, DailyBucket> = BTreeMap::new();

    if let Some(range) = range {
        for day in range.days() {
            by_day.insert(day, DailyBucket::empty(day));
        }
    }

    for record in records {
        let Some(occurred_at) = record.occurred_at else {
            continue;
        };
        let day = occurred_at.date_naive();

        match range {
            Some(range) => {
                // Pre-seeded map doubles as the range membership check.
                if !range.contains(day) {
                    continue;
                }
                if let Some(bucket) = by_day.get_mut(&day) {
                    bucket.accumulate(record, table);
                }
            }
            None => {
                by_day
                    .entry(day)
                    .or_insert_with(|| DailyBucket::empty(day))
                    .accumulate(record, table);
            }
        }
    }

    by_day.into_values().collect()
}

/// One point of the trailing distinct-user series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollingPoint {
    pub day: NaiveDate,
    /// Size of the distinct-user union over the trailing window
    pub count: usize,
    /// Fewer than `window_days` buckets were available; the window is
    /// truncated and the value must be presented as partial
    pub partial: bool,
}

/// Trailing `window_days`-day distinct-user counts, one point per
/// bucket, same order as the input.
///
/// The point at index `i` unions the user sets of buckets
/// `[max(0, i - window_days + 1) ..= i]`. Points whose window extends
/// past the start of the series are flagged `partial`.
pub fn rolling_distinct_users(buckets: &[DailyBucket], window_days: usize) -> Vec<RollingPoint> {
    let window = window_days.max(1);

    buckets
        .iter()
        .enumerate()
        .map(|(i, bucket)| {
            let lo = (i + 1).saturating_sub(window);
            let mut union: BTreeSet<&str> = BTreeSet::new();
            for b in &buckets[lo..=i] {
                union.extend(b.users.iter().map(String::as_str));
            }
            RollingPoint {
                day: bucket.day,
                count: union.len(),
                partial: i + 1 < window,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use serde_json::json;

    fn record_at(ts: &str, user: Option<&str>, success: Option<bool>) -> EventRecord {
        EventRecord {
            id: format!("evt-{ts}"),
            occurred_at: ts.parse::<DateTime<Utc>>().ok(),
            event_name: "page_view".to_string(),
            feature: None,
            action_stage: None,
            success,
            user_id: user.map(str::to_string),
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

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::parse(start, end).unwrap()
    }

    #[test]
    fn test_zero_fill_invariant() {
        let table = CategoryTable::default();
        let r = range("2024-01-01", "2024-01-07");

        let buckets = build_daily_buckets(&[], Some(&r), &table);
        assert_eq!(buckets.len(), 7);
        assert!(buckets.windows(2).all(|w| w[0].day < w[1].day));
        assert!(buckets.iter().all(|b| b.events == 0));
        assert!(buckets.iter().all(|b| b.avg_latency_ms() == 0.0));
    }

    #[test]
    fn test_mixed_success_day() {
        let table = CategoryTable::default();
        let r = range("2024-01-01", "2024-01-01");
        let records = vec![
            record_at("2024-01-01T01:00:00Z", Some("u1"), Some(true)),
            record_at("2024-01-01T02:00:00Z", Some("u1"), Some(false)),
            record_at("2024-01-01T03:00:00Z", Some("u2"), None),
        ];

        let buckets = build_daily_buckets(&records, Some(&r), &table);
        assert_eq!(buckets.len(), 1);
        let day = &buckets[0];
        assert_eq!(day.events, 3);
        assert_eq!(day.success_count, 1);
        assert_eq!(day.failure_count, 1);
        // The null-success record never enters the denominator.
        assert_eq!(day.outcome_total(), 2);
        assert_eq!(day.distinct_users(), 2);
    }

    #[test]
    fn test_unparseable_timestamp_excluded() {
        let table = CategoryTable::default();
        let r = range("2024-01-01", "2024-01-01");
        let records = vec![
            record_at("2024-01-01T01:00:00Z", Some("u1"), None),
            record_at("garbage", Some("u2"), None),
        ];

        let buckets = build_daily_buckets(&records, Some(&r), &table);
        assert_eq!(buckets[0].events, 1);
        assert_eq!(buckets[0].distinct_users(), 1);
    }

    #[test]
    fn test_out_of_range_records_skipped() {
        let table = CategoryTable::default();
        let r = range("2024-01-02", "2024-01-03");
        let records = vec![
            record_at("2024-01-01T12:00:00Z", Some("u1"), None),
            record_at("2024-01-02T12:00:00Z", Some("u2"), None),
        ];

        let buckets = build_daily_buckets(&records, Some(&r), &table);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].events, 1);
        assert_eq!(buckets[1].events, 0);
    }

    #[test]
    fn test_degraded_mode_without_range() {
        let table = CategoryTable::default();
        let records = vec![
            record_at("2024-01-05T12:00:00Z", Some("u1"), None),
            record_at("2024-01-02T12:00:00Z", Some("u2"), None),
            record_at("2024-01-05T13:00:00Z", Some("u3"), None),
        ];

        let buckets = build_daily_buckets(&records, None, &table);
        // Only days present in the data, ascending, no zero-fill.
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].day.to_string(), "2024-01-02");
        assert_eq!(buckets[1].day.to_string(), "2024-01-05");
        assert_eq!(buckets[1].events, 2);
    }

    #[test]
    fn test_category_and_latency_counters() {
        let table = CategoryTable::default();
        let r = range("2024-01-01", "2024-01-01");

        let mut content = record_at("2024-01-01T01:00:00Z", Some("u1"), None);
        content.event_name = "report_viewed".to_string();

        let mut ai = record_at("2024-01-01T02:00:00Z", None, None);
        ai.event_name = "analysis_run".to_string();
        ai.anon_id = Some("anon-1".to_string());
        ai.properties.insert("latency_ms".to_string(), json!(200));

        let mut paywall = record_at("2024-01-01T03:00:00Z", Some("u1"), None);
        paywall.event_name = "paywall_blocked".to_string();
        paywall.properties.insert("latency_ms".to_string(), json!(100));

        let buckets = build_daily_buckets(&[content, ai, paywall], Some(&r), &table);
        let day = &buckets[0];
        assert_eq!(day.content_events, 1);
        assert_eq!(day.ai_events, 1);
        assert_eq!(day.paywall_events, 1);
        assert_eq!(day.anon_events, 1);
        assert_eq!(day.latency_samples, 2);
        assert_eq!(day.avg_latency_ms(), 150.0);
    }

    #[test]
    fn test_rolling_window_truncated_at_start() {
        let table = CategoryTable::default();
        let r = range("2024-01-01", "2024-01-05");
        // One brand-new user per day.
        let records: Vec<EventRecord> = (1..=5)
            .map(|d| {
                record_at(
                    &format!("2024-01-0{d}T12:00:00Z"),
                    Some(&format!("u{d}")),
                    None,
                )
            })
            .collect();

        let buckets = build_daily_buckets(&records, Some(&r), &table);
        let series = rolling_distinct_users(&buckets, 7);

        assert_eq!(series.len(), 5);
        // Index 0 reports 1, not 7: fewer than 7 days are available.
        assert_eq!(series[0].count, 1);
        assert!(series[0].partial);
        assert_eq!(series[4].count, 5);
        assert!(series[4].partial);
    }

    #[test]
    fn test_rolling_window_union_not_sum() {
        let table = CategoryTable::default();
        let r = range("2024-01-01", "2024-01-03");
        // Same user every day: the union stays at 1.
        let records: Vec<EventRecord> = (1..=3)
            .map(|d| record_at(&format!("2024-01-0{d}T12:00:00Z"), Some("u1"), None))
            .collect();

        let buckets = build_daily_buckets(&records, Some(&r), &table);
        let series = rolling_distinct_users(&buckets, 2);

        assert_eq!(series[0].count, 1);
        assert!(series[0].partial);
        assert_eq!(series[1].count, 1);
        assert!(!series[1].partial);
        assert_eq!(series[2].count, 1);
        assert!(!series[2].partial);
    }

    #[test]
    fn test_idempotence() {
        let table = CategoryTable::default();
        let r = range("2024-01-01", "2024-01-03");
        let records = vec![
            record_at("2024-01-01T01:00:00Z", Some("u1"), Some(true)),
            record_at("2024-01-02T01:00:00Z", Some("u2"), Some(false)),
        ];

        let first = build_daily_buckets(&records, Some(&r), &table);
        let second = build_daily_buckets(&records, Some(&r), &table);
        assert_eq!(first, second);
        assert_eq!(
            rolling_distinct_users(&first, 3),
            rolling_distinct_users(&second, 3)
        );
    }
}
