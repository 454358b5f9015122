//! Session reconstruction and per-day duration averages.
//!
//! Sessions are derived, never stored: for each `session_id` the
//! (start, end) pair is the min/max `occurred_at` across the loaded
//! slice. Records for the same session outside the loaded window are
//! invisible, so a reconstructed duration can be incomplete; that is an
//! accepted approximation of the loaded slice, not a bug.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;

use super::rates::safe_divide;
use crate::types::{DateRange, EventRecord};

/// Per-day session duration aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySessionStat {
    pub day: NaiveDate,
    /// Sessions whose earliest observation falls on this day
    pub session_count: u64,
    /// Mean duration in seconds; 0 with no sessions
    pub avg_duration_secs: f64,
}

/// A reconstructed session span within the loaded slice.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SessionSpan {
    earliest: DateTime<Utc>,
    latest: DateTime<Utc>,
}

impl SessionSpan {
    /// Duration in seconds, floored at 0. A session observed once has
    /// duration 0 and still counts with weight 1.
    fn duration_secs(&self) -> f64 {
        let ms = self
            .latest
            .signed_duration_since(self.earliest)
            .num_milliseconds()
            .max(0);
        ms as f64 / 1000.0
    }
}

/// Average session duration per calendar day.
///
/// A session is attributed to the day of its earliest timestamp, never
/// split across days. Output is zero-filled over the range (average 0,
/// not NaN); `range = None` degrades to days present in the data.
pub fn daily_session_durations(
    records: &[EventRecord],
    range: Option<&DateRange>,
) -> Vec<DailySessionStat> {
    // session_id -> observed (earliest, latest)
    let mut spans: BTreeMap<&str, SessionSpan> = BTreeMap::new();
    for record in records {
        let Some(session_id) = record.session_id.as_deref().filter(|s| !s.is_empty()) else {
            continue;
        };
        let Some(ts) = record.occurred_at else {
            continue;
        };
        spans
            .entry(session_id)
            .and_modify(|span| {
                span.earliest = span.earliest.min(ts);
                span.latest = span.latest.max(ts);
            })
            .or_insert(SessionSpan {
                earliest: ts,
                latest: ts,
            });
    }

    let mut by_day: BTreeMap<NaiveDate, (u64, f64)> = BTreeMap::new();
    if let Some(range) = range {
        for day in range.days() {
            by_day.insert(day, (0, 0.0));
        }
    }

    for span in spans.values() {
        let day = span.earliest.date_naive();
        match range {
            Some(range) => {
                if !range.contains(day) {
                    continue;
                }
                if let Some((count, sum)) = by_day.get_mut(&day) {
                    *count += 1;
                    *sum += span.duration_secs();
                }
            }
            None => {
                let (count, sum) = by_day.entry(day).or_insert((0, 0.0));
                *count += 1;
                *sum += span.duration_secs();
            }
        }
    }

    by_day
        .into_iter()
        .map(|(day, (session_count, duration_sum))| DailySessionStat {
            day,
            session_count,
            avg_duration_secs: safe_divide(duration_sum, session_count as f64),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn record(ts: &str, session: Option<&str>) -> EventRecord {
        EventRecord {
            id: format!("evt-{ts}"),
            occurred_at: ts.parse::<DateTime<Utc>>().ok(),
            event_name: "page_view".to_string(),
            feature: None,
            action_stage: None,
            success: None,
            user_id: None,
            anon_id: None,
            session_id: session.map(str::to_string),
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
    fn test_single_sighting_session_has_zero_duration() {
        let r = range("2024-01-01", "2024-01-01");
        let records = vec![record("2024-01-01T10:00:00Z", Some("s1"))];

        let stats = daily_session_durations(&records, Some(&r));
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].session_count, 1);
        assert_eq!(stats[0].avg_duration_secs, 0.0);
    }

    #[test]
    fn test_duration_is_min_max_span() {
        let r = range("2024-01-01", "2024-01-01");
        let records = vec![
            record("2024-01-01T10:00:00Z", Some("s1")),
            record("2024-01-01T10:05:00Z", Some("s1")),
            record("2024-01-01T10:02:00Z", Some("s1")),
        ];

        let stats = daily_session_durations(&records, Some(&r));
        assert_eq!(stats[0].session_count, 1);
        assert_eq!(stats[0].avg_duration_secs, 300.0);
    }

    #[test]
    fn test_session_attributed_to_start_day() {
        // Session spans midnight; all of it lands on the start day.
        let r = range("2024-01-01", "2024-01-02");
        let records = vec![
            record("2024-01-01T23:50:00Z", Some("s1")),
            record("2024-01-02T00:10:00Z", Some("s1")),
        ];

        let stats = daily_session_durations(&records, Some(&r));
        assert_eq!(stats[0].session_count, 1);
        assert_eq!(stats[0].avg_duration_secs, 1200.0);
        assert_eq!(stats[1].session_count, 0);
        assert_eq!(stats[1].avg_duration_secs, 0.0);
    }

    #[test]
    fn test_records_without_session_or_timestamp_ignored() {
        let r = range("2024-01-01", "2024-01-01");
        let records = vec![
            record("2024-01-01T10:00:00Z", None),
            record("garbage", Some("s1")),
        ];

        let stats = daily_session_durations(&records, Some(&r));
        assert_eq!(stats[0].session_count, 0);
        assert_eq!(stats[0].avg_duration_secs, 0.0);
    }

    #[test]
    fn test_per_day_average_over_multiple_sessions() {
        let r = range("2024-01-01", "2024-01-01");
        let records = vec![
            record("2024-01-01T10:00:00Z", Some("s1")),
            record("2024-01-01T10:01:00Z", Some("s1")),
            record("2024-01-01T12:00:00Z", Some("s2")),
            record("2024-01-01T12:03:00Z", Some("s2")),
        ];

        let stats = daily_session_durations(&records, Some(&r));
        assert_eq!(stats[0].session_count, 2);
        // (60 + 180) / 2
        assert_eq!(stats[0].avg_duration_secs, 120.0);
    }

    #[test]
    fn test_degraded_mode_without_range() {
        let records = vec![
            record("2024-01-03T10:00:00Z", Some("s1")),
            record("2024-01-01T10:00:00Z", Some("s2")),
        ];

        let stats = daily_session_durations(&records, None);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].day.to_string(), "2024-01-01");
        assert_eq!(stats[1].day.to_string(), "2024-01-03");
    }
}
