//! # pulsedeck-core
//!
//! Core library for pulsedeck - an event-log analytics dashboard.
//!
//! This library provides:
//! - Domain types for event records, date ranges, and filters
//! - A paginated fetch client for the remote event store
//! - The aggregation engine: pure transforms from a record slice to
//!   daily buckets, rolling windows, sessions, rates, and top-N
//!   breakdowns
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through three stages:
//! - **Fetch:** bounded, ordered pages from the remote store,
//!   reassembled into one in-memory slice (with truncation/error state)
//! - **Aggregate:** pure, deterministic transforms over the slice
//! - **Present:** read-only projection of the derived values; the
//!   engine exposes nothing mutable back to presentation
//!
//! ## Example
//!
//! ```rust,no_run
//! use pulsedeck_core::aggregate::{build_daily_buckets, CategoryTable};
//! use pulsedeck_core::{Config, DateRange, FetchClient, FilterSet};
//!
//! # async fn run() -> pulsedeck_core::Result<()> {
//! let config = Config::load()?;
//! let client = FetchClient::new(config.store.clone())?;
//!
//! let range = DateRange::parse("2024-01-01", "2024-01-31");
//! let filters = FilterSet::new();
//! let outcome = client
//!     .fetch_events(range.as_ref().expect("valid range"), &filters)
//!     .await;
//!
//! let table = CategoryTable::from_config(&config.categories);
//! let buckets = build_daily_buckets(&outcome.records, range.as_ref(), &table);
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use fetch::{FetchClient, FetchOutcome};
pub use types::*;

// Public modules
pub mod aggregate;
pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod types;
