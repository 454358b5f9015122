//! Distinct-value counts and top-N breakdowns.
//!
//! Records with a null/empty dimension value are never dropped from a
//! breakdown: they merge into one explicit fallback bucket that ranks
//! like any other entry and is flagged `is_fallback` so presentation
//! can distinguish it. Ordering is fully defined (count descending,
//! first-encounter ascending), so output is reproducible.

use std::collections::{BTreeSet, HashMap};

use url::Url;

use crate::config::PlatformHost;
use crate::types::{Dimension, EventRecord};

/// One row of a ranked breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopEntry {
    pub label: String,
    pub value: u64,
    /// True for the merged "value not set" bucket
    pub is_fallback: bool,
}

/// Count of non-empty distinct values of a dimension.
pub fn distinct_count(records: &[EventRecord], dimension: Dimension) -> usize {
    let values: BTreeSet<&str> = records
        .iter()
        .filter_map(|record| dimension.value(record))
        .collect();
    values.len()
}

struct Slot<T> {
    value: T,
    first_seen: usize,
}

/// Rank grouped labels by count. `None` labels merge into the fallback
/// bucket; ties break by first-encounter order.
fn ranked_counts(
    labels: impl Iterator<Item = Option<String>>,
    limit: usize,
    fallback_label: &str,
) -> Vec<TopEntry> {
    let mut groups: HashMap<Option<String>, Slot<u64>> = HashMap::new();
    for (index, label) in labels.enumerate() {
        let slot = groups.entry(label).or_insert(Slot {
            value: 0,
            first_seen: index,
        });
        slot.value += 1;
    }
    rank(groups, limit, fallback_label)
}

fn rank<T: Into<u64>>(
    groups: HashMap<Option<String>, Slot<T>>,
    limit: usize,
    fallback_label: &str,
) -> Vec<TopEntry> {
    let mut rows: Vec<(Option<String>, u64, usize)> = groups
        .into_iter()
        .map(|(label, slot)| (label, slot.value.into(), slot.first_seen))
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    rows.truncate(limit);
    rows.into_iter()
        .map(|(label, value, _)| match label {
            Some(label) => TopEntry {
                label,
                value,
                is_fallback: false,
            },
            None => TopEntry {
                label: fallback_label.to_string(),
                value,
                is_fallback: true,
            },
        })
        .collect()
}

/// Top dimension values by record count.
pub fn top_by_count(
    records: &[EventRecord],
    dimension: Dimension,
    limit: usize,
    fallback_label: &str,
) -> Vec<TopEntry> {
    ranked_counts(
        records
            .iter()
            .map(|record| dimension.value(record).map(str::to_string)),
        limit,
        fallback_label,
    )
}

/// Top dimension values by distinct-user count.
///
/// Same grouping and fallback rule as [`top_by_count`], but each group
/// is valued by how many distinct `user_id`s it contains, so an active
/// low-volume segment is not under-ranked against a noisy single user.
pub fn top_by_distinct_users(
    records: &[EventRecord],
    dimension: Dimension,
    limit: usize,
    fallback_label: &str,
) -> Vec<TopEntry> {
    let mut groups: HashMap<Option<String>, Slot<BTreeSet<String>>> = HashMap::new();
    for (index, record) in records.iter().enumerate() {
        let label = dimension.value(record).map(str::to_string);
        let slot = groups.entry(label).or_insert(Slot {
            value: BTreeSet::new(),
            first_seen: index,
        });
        if let Some(user_id) = Dimension::UserId.value(record) {
            slot.value.insert(user_id.to_string());
        }
    }

    let counted: HashMap<Option<String>, Slot<u64>> = groups
        .into_iter()
        .map(|(label, slot)| {
            (
                label,
                Slot {
                    value: slot.value.len() as u64,
                    first_seen: slot.first_seen,
                },
            )
        })
        .collect();
    rank(counted, limit, fallback_label)
}

/// Top string values of a payload property by occurrence count.
///
/// Records without a string-typed value at `property_key` are skipped;
/// there is no fallback bucket for payload probes.
pub fn top_by_string_property(
    records: &[EventRecord],
    property_key: &str,
    limit: usize,
) -> Vec<TopEntry> {
    ranked_counts(
        records
            .iter()
            .filter_map(|record| record.string_property(property_key))
            .map(|value| Some(value.to_string())),
        limit,
        "",
    )
}

/// Collapse a URL-like value to a short comparable label.
///
/// Missing schemes are tolerated by assuming `https://`; a leading
/// `www.` is stripped; the path collapses to `host`, `host/seg`, or
/// `host/seg/...`. Any configured platform-host marker collapses the
/// whole value to that marker's label, so a builder platform's many
/// subdomains do not fragment the breakdown.
pub fn normalize_url_label(raw: &str, platform_hosts: &[PlatformHost]) -> String {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).or_else(|_| Url::parse(&format!("https://{trimmed}")));
    let Ok(url) = parsed else {
        return trimmed.to_string();
    };
    let Some(host) = url.host_str() else {
        return trimmed.to_string();
    };
    let host = host.strip_prefix("www.").unwrap_or(host);

    for platform in platform_hosts {
        if host.contains(platform.marker.as_str()) {
            return platform.label.clone();
        }
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();
    match segments.len() {
        0 => host.to_string(),
        1 => format!("{}/{}", host, segments[0]),
        _ => format!("{}/{}/...", host, segments[0]),
    }
}

/// Top referrers by record count, URL-normalized before grouping.
pub fn top_referrers(
    records: &[EventRecord],
    limit: usize,
    fallback_label: &str,
    platform_hosts: &[PlatformHost],
) -> Vec<TopEntry> {
    top_by_url(records, Dimension::Referrer, limit, fallback_label, platform_hosts)
}

/// Top landing pages by record count, URL-normalized before grouping.
pub fn top_landing_pages(
    records: &[EventRecord],
    limit: usize,
    fallback_label: &str,
    platform_hosts: &[PlatformHost],
) -> Vec<TopEntry> {
    top_by_url(
        records,
        Dimension::LandingPage,
        limit,
        fallback_label,
        platform_hosts,
    )
}

fn top_by_url(
    records: &[EventRecord],
    dimension: Dimension,
    limit: usize,
    fallback_label: &str,
    platform_hosts: &[PlatformHost],
) -> Vec<TopEntry> {
    ranked_counts(
        records.iter().map(|record| {
            dimension
                .value(record)
                .map(|raw| normalize_url_label(raw, platform_hosts))
        }),
        limit,
        fallback_label,
    )
}
