//! Core domain types for pulsedeck
//!
//! These types describe the canonical shape of one ingested action (an
//! [`EventRecord`]), the day-granularity [`DateRange`] every query and
//! bucket boundary is expanded from, and the conjunctive [`FilterSet`]
//! applied to categorical dimensions.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Event Record** | One observed user/product action with timestamp, dimensions, and payload |
//! | **Dimension** | A categorical field an event can be filtered or grouped by |
//! | **Filter Set** | Exact-match constraints, one per dimension, applied conjunctively |
//! | **Not-set bucket** | The explicit grouping for records whose dimension value is null/empty |
//!
//! Null and empty-string dimension values are interchangeable: both read
//! as "not set". The absent predicate and the fallback bucket are typed
//! ([`FilterValue::Absent`], `is_fallback` on ranked rows), never string
//! sentinels, so a real value can never collide with them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// ============================================
// Event Record
// ============================================

/// One observed user/product action.
///
/// Every field other than `id` and `event_name` is optional; upstream
/// data quality varies and the aggregation engine degrades per-field
/// rather than rejecting records. A record whose timestamp did not parse
/// keeps `occurred_at = None`: it is excluded from time-bucketed views
/// but still participates in range-agnostic counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Opaque unique identifier
    pub id: String,
    /// When the action happened; `None` if the upstream value was missing
    /// or unparseable (expected data-quality noise, not an error)
    #[serde(default, deserialize_with = "lenient_instant")]
    pub occurred_at: Option<DateTime<Utc>>,
    /// Short key identifying the action type; never empty
    pub event_name: String,
    /// Product module the action belongs to
    #[serde(default)]
    pub feature: Option<String>,
    /// Lifecycle stage (start / success / error)
    #[serde(default)]
    pub action_stage: Option<String>,
    /// Tri-state outcome: `None` means "not applicable", not "failed"
    #[serde(default)]
    pub success: Option<bool>,
    /// Stable identifier of the acting principal; absent for anonymous activity
    #[serde(default)]
    pub user_id: Option<String>,
    /// Anonymous-session identifier used when `user_id` is absent
    #[serde(default)]
    pub anon_id: Option<String>,
    /// Identifier grouping a contiguous interaction; not guaranteed present
    #[serde(default)]
    pub session_id: Option<String>,

    // Attribution dimensions
    #[serde(default)]
    pub plan_tier: Option<String>,
    #[serde(default)]
    pub subscription_status: Option<String>,
    #[serde(default)]
    pub billing_period: Option<String>,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub browser: Option<String>,
    #[serde(default)]
    pub utm_source: Option<String>,
    #[serde(default)]
    pub utm_medium: Option<String>,
    #[serde(default)]
    pub utm_campaign: Option<String>,
    #[serde(default)]
    pub referrer: Option<String>,
    #[serde(default)]
    pub landing_page: Option<String>,

    /// Open event-specific payload; no fixed schema, probed defensively
    #[serde(default)]
    pub properties: serde_json::Map<String, Value>,
}

/// Tolerant timestamp deserializer: any value that is not an RFC 3339
/// string becomes `None` instead of failing the whole record.
fn lenient_instant<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match value {
        Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }))
}

impl EventRecord {
    /// Probe the payload for a numeric field.
    ///
    /// A value of any other JSON type reads as "field absent".
    pub fn numeric_property(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(Value::as_f64)
    }

    /// Probe the payload for a string field.
    ///
    /// A value of any other JSON type reads as "field absent".
    pub fn string_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// Whether this record carries no stable user but an anonymous id.
    pub fn is_anonymous(&self) -> bool {
        non_empty(&self.user_id).is_none() && non_empty(&self.anon_id).is_some()
    }
}

/// Normalize an optional string: empty reads the same as absent.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

// ============================================
// Dimensions
// ============================================

/// Categorical dimensions an event can be filtered or grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    EventName,
    Feature,
    ActionStage,
    PlanTier,
    SubscriptionStatus,
    BillingPeriod,
    Route,
    Section,
    DeviceType,
    Os,
    Browser,
    UtmSource,
    UtmMedium,
    UtmCampaign,
    Referrer,
    LandingPage,
    UserId,
    SessionId,
}

impl Dimension {
    /// Identifier used in query parameters and CLI flags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::EventName => "event_name",
            Dimension::Feature => "feature",
            Dimension::ActionStage => "action_stage",
            Dimension::PlanTier => "plan_tier",
            Dimension::SubscriptionStatus => "subscription_status",
            Dimension::BillingPeriod => "billing_period",
            Dimension::Route => "route",
            Dimension::Section => "section",
            Dimension::DeviceType => "device_type",
            Dimension::Os => "os",
            Dimension::Browser => "browser",
            Dimension::UtmSource => "utm_source",
            Dimension::UtmMedium => "utm_medium",
            Dimension::UtmCampaign => "utm_campaign",
            Dimension::Referrer => "referrer",
            Dimension::LandingPage => "landing_page",
            Dimension::UserId => "user_id",
            Dimension::SessionId => "session_id",
        }
    }

    /// Read this dimension's value from a record.
    ///
    /// Empty strings normalize to `None`, so null and empty are one
    /// "not set" bucket everywhere.
    pub fn value<'a>(&self, record: &'a EventRecord) -> Option<&'a str> {
        match self {
            Dimension::EventName => {
                if record.event_name.is_empty() {
                    None
                } else {
                    Some(record.event_name.as_str())
                }
            }
            Dimension::Feature => non_empty(&record.feature),
            Dimension::ActionStage => non_empty(&record.action_stage),
            Dimension::PlanTier => non_empty(&record.plan_tier),
            Dimension::SubscriptionStatus => non_empty(&record.subscription_status),
            Dimension::BillingPeriod => non_empty(&record.billing_period),
            Dimension::Route => non_empty(&record.route),
            Dimension::Section => non_empty(&record.section),
            Dimension::DeviceType => non_empty(&record.device_type),
            Dimension::Os => non_empty(&record.os),
            Dimension::Browser => non_empty(&record.browser),
            Dimension::UtmSource => non_empty(&record.utm_source),
            Dimension::UtmMedium => non_empty(&record.utm_medium),
            Dimension::UtmCampaign => non_empty(&record.utm_campaign),
            Dimension::Referrer => non_empty(&record.referrer),
            Dimension::LandingPage => non_empty(&record.landing_page),
            Dimension::UserId => non_empty(&record.user_id),
            Dimension::SessionId => non_empty(&record.session_id),
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "event_name" => Ok(Dimension::EventName),
            "feature" => Ok(Dimension::Feature),
            "action_stage" => Ok(Dimension::ActionStage),
            "plan_tier" => Ok(Dimension::PlanTier),
            "subscription_status" => Ok(Dimension::SubscriptionStatus),
            "billing_period" => Ok(Dimension::BillingPeriod),
            "route" => Ok(Dimension::Route),
            "section" => Ok(Dimension::Section),
            "device_type" => Ok(Dimension::DeviceType),
            "os" => Ok(Dimension::Os),
            "browser" => Ok(Dimension::Browser),
            "utm_source" => Ok(Dimension::UtmSource),
            "utm_medium" => Ok(Dimension::UtmMedium),
            "utm_campaign" => Ok(Dimension::UtmCampaign),
            "referrer" => Ok(Dimension::Referrer),
            "landing_page" => Ok(Dimension::LandingPage),
            "user_id" => Ok(Dimension::UserId),
            "session_id" => Ok(Dimension::SessionId),
            _ => Err(format!("unknown dimension: {}", s)),
        }
    }
}

// ============================================
// Date Range
// ============================================

/// A closed interval `[start, end]` at day granularity.
///
/// Expanded to `[start 00:00:00.000 UTC, end 23:59:59.999 UTC]` when
/// used as a query predicate or bucket boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range; `None` if the bounds are inverted.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Parse `YYYY-MM-DD` bounds; `None` if either fails to parse or the
    /// bounds are inverted. Callers falling through with `None` get the
    /// degraded bucket mode (days present in the data only).
    pub fn parse(start: &str, end: &str) -> Option<Self> {
        let start = NaiveDate::parse_from_str(start, "%Y-%m-%d").ok()?;
        let end = NaiveDate::parse_from_str(end, "%Y-%m-%d").ok()?;
        Self::new(start, end)
    }

    /// Inclusive lower bound instant (start day at midnight UTC).
    pub fn start_instant(&self) -> DateTime<Utc> {
        self.start.and_hms_milli_opt(0, 0, 0, 0).unwrap().and_utc()
    }

    /// Inclusive upper bound instant (end day at 23:59:59.999 UTC).
    pub fn end_instant(&self) -> DateTime<Utc> {
        self.end.and_hms_milli_opt(23, 59, 59, 999).unwrap().and_utc()
    }

    /// Number of calendar days in the range, inclusive.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Iterate every day in the range, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }

    /// Whether a day falls inside the range.
    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day <= self.end
    }
}

// ============================================
// Filter Set
// ============================================

/// One filter constraint on a dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// Dimension must equal this exact value
    Equals(String),
    /// Dimension must be absent (null or empty)
    Absent,
}

/// Conjunctive exact-match filters, one per dimension.
///
/// An explicit immutable value threaded into fetch and aggregation
/// calls; there is no ambient filter state anywhere in the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    entries: BTreeMap<Dimension, FilterValue>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrain a dimension to an exact value. An empty value means
    /// "unconstrained" and is dropped.
    pub fn equals(mut self, dimension: Dimension, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.entries.insert(dimension, FilterValue::Equals(value));
        }
        self
    }

    /// Constrain a dimension to be absent (null or empty string).
    pub fn absent(mut self, dimension: Dimension) -> Self {
        self.entries.insert(dimension, FilterValue::Absent);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate constraints in stable dimension order.
    pub fn iter(&self) -> impl Iterator<Item = (Dimension, &FilterValue)> {
        self.entries.iter().map(|(dim, value)| (*dim, value))
    }

    /// Whether a record satisfies every constraint.
    pub fn matches(&self, record: &EventRecord) -> bool {
        self.entries.iter().all(|(dimension, constraint)| {
            let actual = dimension.value(record);
            match constraint {
                FilterValue::Equals(expected) => actual == Some(expected.as_str()),
                FilterValue::Absent => actual.is_none(),
            }
        })
    }
}
