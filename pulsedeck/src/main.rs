//! pulsedeck - event-log analytics dashboard
//!
//! Fetches a filtered date range of event records from the remote
//! store, runs the aggregation engine over the fetched slice, and
//! prints a plain-text dashboard.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/pulsedeck/config.toml (~/.config/pulsedeck/config.toml)
//! - Logs: $XDG_STATE_HOME/pulsedeck/ (~/.local/state/pulsedeck/)

mod render;

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;

use pulsedeck_core::aggregate::CategoryTable;
use pulsedeck_core::{Config, DateRange, Dimension, FetchClient, FilterSet};

#[derive(Parser)]
#[command(name = "pulsedeck")]
#[command(about = "Event-log analytics dashboard")]
#[command(version)]
struct Args {
    /// Start day, YYYY-MM-DD (inclusive)
    #[arg(long)]
    from: String,

    /// End day, YYYY-MM-DD (inclusive)
    #[arg(long)]
    to: String,

    /// Dimension filter, `dimension=value` or `dimension=@absent`; repeatable
    #[arg(long = "filter", value_name = "DIM=VALUE")]
    filters: Vec<String>,

    /// Rolling active-user window in days
    #[arg(long, default_value_t = 7)]
    window: usize,

    /// Rows per top-N breakdown
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Config file path (default: XDG config location)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Parse repeated `--filter dimension=value` flags into a filter set.
///
/// The literal value `@absent` selects the absent predicate instead of
/// an exact match, so "equals empty string" stays expressible.
fn parse_filters(raw: &[String]) -> Result<FilterSet> {
    let mut filters = FilterSet::new();
    for entry in raw {
        let (dim, value) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("invalid filter '{}': expected dimension=value", entry))?;
        let dimension: Dimension = dim.parse().map_err(|e: String| anyhow!(e))?;
        filters = if value == "@absent" {
            filters.absent(dimension)
        } else {
            filters.equals(dimension, value)
        };
    }
    Ok(filters)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let Some(range) = DateRange::parse(&args.from, &args.to) else {
        bail!("invalid date range: --from and --to must be YYYY-MM-DD with from <= to");
    };
    let filters = parse_filters(&args.filters)?;

    // Load configuration
    let config = match &args.config {
        Some(path) => Config::load_from(path).context("failed to load configuration")?,
        None => Config::load().context("failed to load configuration")?,
    };

    // Initialize logging (to file, not stdout; the dashboard owns stdout)
    let _log_guard = pulsedeck_core::logging::init(&config.logging)
        .context("failed to initialize logging")?;

    tracing::info!(
        from = %range.start,
        to = %range.end,
        filters = filters.len(),
        "pulsedeck starting"
    );

    let client =
        FetchClient::new(config.store.clone()).context("failed to create fetch client")?;
    let outcome = client.fetch_events(&range, &filters).await;
    if outcome.is_partial() {
        tracing::warn!(
            truncated = outcome.truncated,
            failed = outcome.error.is_some(),
            "Rendering dashboard over a partial fetch outcome"
        );
    }

    let table = CategoryTable::from_config(&config.categories);
    let dashboard = render::render_dashboard(
        &outcome,
        &range,
        &table,
        &config.urls.platform_hosts,
        args.window,
        args.top,
    );
    print!("{dashboard}");

    tracing::info!("pulsedeck done");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsedeck_core::FilterValue;

    #[test]
    fn test_parse_filters() {
        let filters = parse_filters(&[
            "plan_tier=pro".to_string(),
            "utm_source=@absent".to_string(),
        ])
        .unwrap();
        assert_eq!(filters.len(), 2);
        let entries: Vec<_> = filters.iter().collect();
        assert_eq!(
            entries[0],
            (
                Dimension::PlanTier,
                &FilterValue::Equals("pro".to_string())
            )
        );
        assert_eq!(entries[1], (Dimension::UtmSource, &FilterValue::Absent));
    }

    #[test]
    fn test_parse_filters_rejects_bad_input() {
        assert!(parse_filters(&["no-equals-sign".to_string()]).is_err());
        assert!(parse_filters(&["bogus_dimension=x".to_string()]).is_err());
    }
}
