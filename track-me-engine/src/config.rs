//! Engine configuration types
//!
//! Configuration is fixed at attachment time, except for the default
//! category/action and the placeholder map which the host may change later
//! through the engine's setters.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for one engine instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Forward every dispatched triple to the debug presenter
    #[serde(default)]
    pub debug: bool,

    /// Suppress navigation of tracked links so the call can be observed
    #[serde(default)]
    pub debug_no_follow_links: bool,

    /// Default category when an element declares none
    #[serde(default)]
    pub category: Option<String>,

    /// Default action when an element declares none
    #[serde(default)]
    pub action: Option<String>,

    /// Values substituted for `{{token}}` placeholders in labels
    #[serde(default)]
    pub placeholders: HashMap<String, String>,

    /// Provider tag passed to the analytics sink
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Form-field completion tracking options
    #[serde(default)]
    pub form_tracking: FormTrackingConfig,
}

fn default_provider() -> String {
    "ga".to_string()
}

fn default_true() -> bool {
    true
}

/// Form-field completion tracking options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormTrackingConfig {
    /// Also report fields that were filled in correctly
    #[serde(default)]
    pub completed_events: bool,

    /// Report each required field at most once
    #[serde(default = "default_true")]
    pub one_time_only: bool,

    #[serde(default = "default_label_completed")]
    pub label_completed: String,

    #[serde(default = "default_label_not_valid")]
    pub label_not_valid: String,

    #[serde(default = "default_label_skipped")]
    pub label_skipped: String,

    /// Field names recognised as a privacy-consent checkbox
    #[serde(default = "default_consent_fields")]
    pub consent_fields: Vec<String>,
}

fn default_label_completed() -> String {
    "completed".to_string()
}

fn default_label_not_valid() -> String {
    "not valid".to_string()
}

fn default_label_skipped() -> String {
    "skipped".to_string()
}

fn default_consent_fields() -> Vec<String> {
    vec!["privacy".to_string(), "privacyConsent".to_string()]
}

impl Default for FormTrackingConfig {
    fn default() -> Self {
        Self {
            completed_events: false,
            one_time_only: true,
            label_completed: default_label_completed(),
            label_not_valid: default_label_not_valid(),
            label_skipped: default_label_skipped(),
            consent_fields: default_consent_fields(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debug: false,
            debug_no_follow_links: false,
            category: None,
            action: None,
            placeholders: HashMap::new(),
            provider: default_provider(),
            form_tracking: FormTrackingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create a new engine configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: enable or disable the debug presenter
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Builder method: suppress navigation of tracked links
    pub fn with_debug_no_follow_links(mut self, enabled: bool) -> Self {
        self.debug_no_follow_links = enabled;
        self
    }

    /// Builder method: set the default category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Builder method: set the default action
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Builder method: add a placeholder value
    pub fn add_placeholder(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.placeholders.insert(key.into(), value.into());
        self
    }

    /// Builder method: set the sink provider tag
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Builder method: replace the form tracking options
    pub fn with_form_tracking(mut self, form_tracking: FormTrackingConfig) -> Self {
        self.form_tracking = form_tracking;
        self
    }

    /// Check the configuration for values the engine cannot work with
    pub fn validate(&self) -> crate::types::Result<()> {
        if self.provider.trim().is_empty() {
            return Err(crate::types::TrackError::InvalidConfig(
                "provider tag must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl FormTrackingConfig {
    /// Builder method: report correctly completed fields too
    pub fn with_completed_events(mut self, enabled: bool) -> Self {
        self.completed_events = enabled;
        self
    }

    /// Builder method: allow a field to be reported on every blur
    pub fn with_one_time_only(mut self, enabled: bool) -> Self {
        self.one_time_only = enabled;
        self
    }

    pub fn is_consent_field(&self, name: &str) -> bool {
        self.consent_fields.iter().any(|field| field == name)
    }
}

/// Mutable per-instance defaults consulted during resolution
///
/// Seeded from [`EngineConfig`] at attachment time and owned by one engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackingDefaults {
    pub category: Option<String>,
    pub action: Option<String>,
    pub placeholders: HashMap<String, String>,
    pub form_tracking: FormTrackingConfig,
}

impl From<&EngineConfig> for TrackingDefaults {
    fn from(config: &EngineConfig) -> Self {
        Self {
            category: config.category.clone(),
            action: config.action.clone(),
            placeholders: config.placeholders.clone(),
            form_tracking: config.form_tracking.clone(),
        }
    }
}

/// Partial update applied with `update_tracking_data`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingDataUpdate {
    pub category: Option<String>,
    pub action: Option<String>,
    pub placeholders: HashMap<String, String>,
}

impl TrackingDefaults {
    /// Merge a partial update; absent fields keep their current value
    pub fn apply(&mut self, update: TrackingDataUpdate) {
        if let Some(category) = update.category {
            self.category = Some(category);
        }
        if let Some(action) = update.action {
            self.action = Some(action);
        }
        self.placeholders.extend(update.placeholders);
    }
}
