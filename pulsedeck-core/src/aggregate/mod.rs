//! Aggregation engine for pulsedeck
//!
//! A library of pure, stateless transform functions consuming an
//! in-memory slice of event records (plus a date range and category
//! table) and producing derived metrics:
//! - Daily buckets and rolling distinct-user windows ([`buckets`])
//! - Session reconstruction and duration averages ([`sessions`])
//! - Shared content/module classification ([`classify`])
//! - Distinct counts and top-N breakdowns ([`breakdown`])
//! - Rate and share computations ([`rates`])
//!
//! Every function is synchronous, side-effect free, and deterministic:
//! the same input slice and parameters reproduce the same output,
//! element order included. Derived structures are owned by the call
//! that produced them; there is no shared aggregate state.

pub mod breakdown;
pub mod buckets;
pub mod classify;
pub mod rates;
pub mod sessions;

pub use breakdown::{
    distinct_count, normalize_url_label, top_by_count, top_by_distinct_users,
    top_by_string_property, top_landing_pages, top_referrers, TopEntry,
};
pub use buckets::{
    build_daily_buckets, rolling_distinct_users, DailyBucket, RollingPoint, LATENCY_PROPERTY,
};
pub use classify::{CategoryTable, EventCategory};
pub use rates::{compute_success_rate, safe_divide, SuccessRates};
pub use sessions::{daily_session_durations, DailySessionStat};
