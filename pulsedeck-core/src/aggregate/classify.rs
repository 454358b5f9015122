//! Shared event category classifier.
//!
//! One data-driven lookup table maps events to their content group or
//! product-module key. Every breakdown and series function consumes the
//! same table, so module attribution never drifts between call sites.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::CategoryConfig;
use crate::types::EventRecord;

/// Category an event resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventCategory {
    /// Report/content view or download
    Content,
    /// An AI product module, identified by its canonical key
    Module(String),
}

impl EventCategory {
    pub fn is_module(&self) -> bool {
        matches!(self, EventCategory::Module(_))
    }

    /// Canonical module key, if this is a module category.
    pub fn module_key(&self) -> Option<&str> {
        match self {
            EventCategory::Module(key) => Some(key),
            EventCategory::Content => None,
        }
    }
}

/// Data-driven classification table.
///
/// Built once from [`CategoryConfig`] and threaded as an argument into
/// every aggregation call that needs category attribution.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    content_events: BTreeSet<String>,
    module_events: BTreeMap<String, String>,
    generic_run_event: String,
    feature_aliases: BTreeMap<String, String>,
    module_keys: BTreeSet<String>,
    default_module: String,
    paywall_event: String,
}

impl CategoryTable {
    pub fn from_config(config: &CategoryConfig) -> Self {
        let module_events: BTreeMap<String, String> = config
            .module_events
            .iter()
            .map(|(event, module)| (event.clone(), module.clone()))
            .collect();

        let mut module_keys: BTreeSet<String> = module_events.values().cloned().collect();
        module_keys.insert(config.default_module.clone());

        // Alias keys are stored pre-normalized so lookups are a single probe.
        let feature_aliases: BTreeMap<String, String> = config
            .feature_aliases
            .iter()
            .map(|(alias, module)| (normalize_feature(alias), module.clone()))
            .collect();

        Self {
            content_events: config.content_events.iter().cloned().collect(),
            module_events,
            generic_run_event: config.generic_run_event.clone(),
            feature_aliases,
            module_keys,
            default_module: config.default_module.clone(),
            paywall_event: config.paywall_event.clone(),
        }
    }

    /// Known canonical module keys, sorted.
    pub fn module_keys(&self) -> impl Iterator<Item = &str> {
        self.module_keys.iter().map(String::as_str)
    }

    /// Classify a record into its content or module category.
    ///
    /// Generic analysis-run events resolve through the feature alias
    /// table; an unknown feature still attributes to the default module
    /// rather than dropping the event (widen-then-normalize).
    pub fn classify(&self, record: &EventRecord) -> Option<EventCategory> {
        if self.content_events.contains(&record.event_name) {
            return Some(EventCategory::Content);
        }
        if let Some(module) = self.module_events.get(&record.event_name) {
            return Some(EventCategory::Module(module.clone()));
        }
        if record.event_name == self.generic_run_event {
            return Some(EventCategory::Module(
                self.resolve_module(record.feature.as_deref()),
            ));
        }
        None
    }

    /// Whether a record is a paywall block.
    pub fn is_paywall(&self, record: &EventRecord) -> bool {
        record.event_name == self.paywall_event
    }

    fn resolve_module(&self, feature: Option<&str>) -> String {
        let Some(feature) = feature.filter(|f| !f.is_empty()) else {
            return self.default_module.clone();
        };
        let normalized = normalize_feature(feature);
        if let Some(module) = self.feature_aliases.get(&normalized) {
            return module.clone();
        }
        if self.module_keys.contains(&normalized) {
            return normalized;
        }
        self.default_module.clone()
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::from_config(&CategoryConfig::default())
    }
}

/// Case-normalize a feature name for alias lookup: lowercase, trimmed,
/// separators collapsed to underscores.
fn normalize_feature(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .collect()
}
