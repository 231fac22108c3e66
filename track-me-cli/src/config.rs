//! Scenario loading and parsing

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use track_me_engine::{ElementSpec, EngineConfig, TrackingDataUpdate, TriggerKind};

/// A page, an engine configuration and the steps to replay (loaded from TOML)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Scenario {
    /// Id of the element the engine attaches to (default: body)
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub page: Vec<ElementSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One scripted action; element targets are referenced by their `id`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Interact { trigger: TriggerKind, target: String },
    Trigger { event: String },
    TriggerWithDelay { event: String, delay_ms: u64 },
    Advance { ms: u64 },
    SetCategory { value: String },
    SetAction { value: String },
    AddPlaceholder { key: String, value: String },
    UpdateTrackingData {
        #[serde(flatten)]
        update: TrackingDataUpdate,
    },
    TrackUserEvent { category: String, action: String, label: String },
    TrackEvent {
        category: Option<String>,
        action: Option<String>,
        label: Option<String>,
    },
    SetFormValid { target: String, valid: bool },
    SetChecked { target: String, checked: bool },
    CheckRadio { target: String },
    SetValue { target: String, value: String },
    Select { target: String, option: String },
}

/// Parse a scenario from TOML text
pub fn parse_scenario(content: &str) -> Result<Scenario> {
    let scenario: Scenario = toml::from_str(content).context("Failed to parse scenario")?;
    scenario
        .engine
        .validate()
        .context("Invalid engine configuration")?;
    Ok(scenario)
}

/// Load a scenario from a TOML file
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file: {:?}", path))?;

    parse_scenario(&content).with_context(|| format!("Failed to load scenario file: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [engine]
        category = "shop"
        action = "home"

        [engine.placeholders]
        country = "IT"

        [engine.form_tracking]
        completed_events = true

        [[page]]
        tag = "a"
        id = "banner"
        classes = ["click-trigger"]
        data = { "tracking-label" = "banner-{{country}}" }

        [[steps]]
        step = "interact"
        trigger = "click"
        target = "banner"

        [[steps]]
        step = "trigger_with_delay"
        event = "ready"
        delay_ms = 250

        [[steps]]
        step = "update_tracking_data"
        action = "checkout"
    "#;

    #[test]
    fn test_scenario_deserialization() {
        let scenario = parse_scenario(SAMPLE).unwrap();
        assert_eq!(scenario.engine.category.as_deref(), Some("shop"));
        assert_eq!(scenario.engine.provider, "ga");
        assert!(scenario.engine.form_tracking.completed_events);
        assert!(scenario.engine.form_tracking.one_time_only);
        assert_eq!(scenario.page.len(), 1);
        assert_eq!(scenario.page[0].id.as_deref(), Some("banner"));
        assert_eq!(scenario.steps.len(), 3);
        assert!(matches!(
            &scenario.steps[0],
            Step::Interact { trigger: TriggerKind::Click, target } if target == "banner"
        ));
        match &scenario.steps[2] {
            Step::UpdateTrackingData { update } => {
                assert_eq!(update.action.as_deref(), Some("checkout"));
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_invalid_provider_rejected() {
        let result = parse_scenario("[engine]\nprovider = \"\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let scenario = load_scenario(file.path()).unwrap();
        assert_eq!(scenario.steps.len(), 3);

        assert!(load_scenario(Path::new("does-not-exist.toml")).is_err());
    }
}
