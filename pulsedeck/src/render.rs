//! Plain-text dashboard rendering.
//!
//! Pure projection of the fetch outcome and derived aggregates into a
//! printable report. When the outcome is partial (truncated or halted
//! by a failed page), the warning is printed with the aggregates, never
//! instead of them.

use std::fmt::Write;

use pulsedeck_core::aggregate::{
    build_daily_buckets, compute_success_rate, daily_session_durations, distinct_count,
    rolling_distinct_users, top_by_count, top_by_distinct_users, top_landing_pages, top_referrers,
    CategoryTable, TopEntry,
};
use pulsedeck_core::config::PlatformHost;
use pulsedeck_core::{DateRange, Dimension, FetchOutcome};

/// Label for the merged null/empty bucket in breakdowns.
const NOT_SET: &str = "(not set)";
/// Label for records with no referrer.
const DIRECT: &str = "direct";

pub fn render_dashboard(
    outcome: &FetchOutcome,
    range: &DateRange,
    table: &CategoryTable,
    platform_hosts: &[PlatformHost],
    window: usize,
    top: usize,
) -> String {
    let records = &outcome.records;
    let mut out = String::new();

    let _ = writeln!(out, "pulsedeck  {} .. {}", range.start, range.end);
    let _ = writeln!(out, "{}", "=".repeat(40));

    if outcome.truncated {
        let _ = writeln!(
            out,
            "WARNING: row cap reached; aggregates cover a truncated slice"
        );
    }
    if let Some(error) = &outcome.error {
        let _ = writeln!(
            out,
            "WARNING: fetch halted early ({}); aggregates cover the fetched prefix",
            error
        );
    }
    let _ = writeln!(out);

    // Totals
    let _ = writeln!(out, "Events:            {}", records.len());
    let _ = writeln!(
        out,
        "Distinct users:    {}",
        distinct_count(records, Dimension::UserId)
    );
    let _ = writeln!(
        out,
        "Distinct sessions: {}",
        distinct_count(records, Dimension::SessionId)
    );
    match compute_success_rate(records) {
        Some(rates) => {
            let _ = writeln!(
                out,
                "Success rate:      {:.1}%   Error rate: {:.1}%",
                rates.success_rate * 100.0,
                rates.error_rate * 100.0
            );
        }
        None => {
            let _ = writeln!(out, "Success rate:      n/a (no boolean outcomes)");
        }
    }
    let _ = writeln!(out);

    // Daily series
    let buckets = build_daily_buckets(records, Some(range), table);
    let _ = writeln!(
        out,
        "{:<12} {:>7} {:>6} {:>9} {:>8} {:>6} {:>8} {:>9}",
        "Day", "Events", "Users", "Sessions", "Content", "AI", "Paywall", "Avg ms"
    );
    for bucket in &buckets {
        let _ = writeln!(
            out,
            "{:<12} {:>7} {:>6} {:>9} {:>8} {:>6} {:>8} {:>9.0}",
            bucket.day,
            bucket.events,
            bucket.distinct_users(),
            bucket.distinct_sessions(),
            bucket.content_events,
            bucket.ai_events,
            bucket.paywall_events,
            bucket.avg_latency_ms()
        );
    }
    let _ = writeln!(out);

    // Rolling actives
    let _ = writeln!(out, "Rolling {}-day active users", window);
    for point in rolling_distinct_users(&buckets, window) {
        let marker = if point.partial { "  (partial window)" } else { "" };
        let _ = writeln!(out, "{:<12} {:>7}{}", point.day, point.count, marker);
    }
    let _ = writeln!(out);

    // Session durations
    let _ = writeln!(out, "Sessions per day");
    for stat in daily_session_durations(records, Some(range)) {
        let _ = writeln!(
            out,
            "{:<12} {:>7}   avg {:.0}s",
            stat.day, stat.session_count, stat.avg_duration_secs
        );
    }
    let _ = writeln!(out);

    render_breakdown(
        &mut out,
        "Top events",
        &top_by_count(records, Dimension::EventName, top, NOT_SET),
    );
    render_breakdown(
        &mut out,
        "Top features",
        &top_by_count(records, Dimension::Feature, top, NOT_SET),
    );
    render_breakdown(
        &mut out,
        "Top plan tiers (by users)",
        &top_by_distinct_users(records, Dimension::PlanTier, top, NOT_SET),
    );
    render_breakdown(
        &mut out,
        "Top routes",
        &top_by_count(records, Dimension::Route, top, NOT_SET),
    );
    render_breakdown(
        &mut out,
        "Top referrers",
        &top_referrers(records, top, DIRECT, platform_hosts),
    );
    render_breakdown(
        &mut out,
        "Top landing pages",
        &top_landing_pages(records, top, NOT_SET, platform_hosts),
    );

    out
}

fn render_breakdown(out: &mut String, title: &str, entries: &[TopEntry]) {
    let _ = writeln!(out, "{title}");
    if entries.is_empty() {
        let _ = writeln!(out, "  (no data)");
    }
    for entry in entries {
        let _ = writeln!(out, "  {:>7}  {}", entry.value, entry.label);
    }
    let _ = writeln!(out);
}
