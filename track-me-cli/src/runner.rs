//! Scenario replay
//!
//! Builds the page, attaches an engine and runs every step in order. The
//! engine clock starts at a fixed instant so delayed triggers replay the
//! same way on every run.

use crate::config::{Scenario, Step};
use anyhow::{anyhow, Result};
use chrono::{TimeZone, Utc};
use track_me_engine::{
    Document, DispatchOutcome, ElementId, MemoryDocument, RecordingSink, SinkCall, TrackMe, TrackingEngine,
    TrackingRequest, ValidationRules,
};

/// What happened at one step
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub index: usize,
    pub description: String,
    pub outcomes: Vec<DispatchOutcome>,
    pub prevent_default: bool,
}

/// Everything a replay produced
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub steps: Vec<StepRecord>,
    pub calls: Vec<SinkCall>,
    /// Deferred dispatches still waiting at the end
    pub pending: Vec<String>,
}

pub struct ScenarioRunner {
    doc: MemoryDocument,
    registry: TrackMe,
    root: ElementId,
    sink: RecordingSink,
    rules: ValidationRules,
}

impl ScenarioRunner {
    pub fn new(scenario: &Scenario) -> Result<Self> {
        let doc = MemoryDocument::from_specs(&scenario.page);
        let root = match &scenario.root {
            Some(id) => element(&doc, id)?,
            None => doc.body(),
        };

        let sink = RecordingSink::new();
        let rules = ValidationRules::new();
        let start = Utc
            .with_ymd_and_hms(2015, 12, 23, 0, 0, 0)
            .single()
            .ok_or_else(|| anyhow!("Invalid start time"))?;

        let engine = TrackingEngine::new(root, scenario.engine.clone(), Box::new(sink.clone()))?
            .with_clock(start)
            .with_form_validator(Box::new(rules.clone()))
            .on_complete(|el| log::trace!("Interaction on {} complete", el));

        let mut registry = TrackMe::new().with_clock(start);
        registry.insert(engine)?;

        Ok(Self {
            doc,
            registry,
            root,
            sink,
            rules,
        })
    }

    fn engine(&mut self) -> Result<&mut TrackingEngine> {
        let root = self.root;
        self.registry
            .engine_mut(root)
            .ok_or_else(|| anyhow!("No engine attached to {}", root))
    }

    /// Replay every step
    pub fn run(mut self, steps: &[Step]) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for (index, step) in steps.iter().enumerate() {
            log::debug!("Step {}: {:?}", index + 1, step);
            let record = self.run_step(index, step)?;
            summary.steps.push(record);
        }

        summary.pending = self
            .engine()?
            .armed_events()
            .into_iter()
            .map(str::to_string)
            .collect();
        summary.calls = self.sink.calls();
        self.registry.detach(self.root)?;
        Ok(summary)
    }

    fn run_step(&mut self, index: usize, step: &Step) -> Result<StepRecord> {
        let mut record = StepRecord {
            index: index + 1,
            description: describe(step),
            outcomes: Vec::new(),
            prevent_default: false,
        };

        match step {
            Step::Interact { trigger, target } => {
                let target = element(&self.doc, target)?;
                for report in self.registry.handle(&mut self.doc, *trigger, target) {
                    record.prevent_default |= report.prevent_default;
                    record.outcomes.push(report.outcome);
                }
            }
            Step::Trigger { event } => {
                record.outcomes = self.registry.trigger(&self.doc, event);
            }
            Step::TriggerWithDelay { event, delay_ms } => {
                self.registry.trigger_with_delay(event, *delay_ms);
            }
            Step::Advance { ms } => {
                record.outcomes = self.registry.advance_by(&self.doc, *ms);
            }
            Step::SetCategory { value } => self.engine()?.set_tracking_category(value.clone()),
            Step::SetAction { value } => self.engine()?.set_tracking_action(value.clone()),
            Step::AddPlaceholder { key, value } => {
                let placeholders = [(key.clone(), value.clone())].into_iter().collect();
                self.engine()?.add_placeholders(placeholders);
            }
            Step::UpdateTrackingData { update } => self.engine()?.update_tracking_data(update.clone()),
            Step::TrackUserEvent {
                category,
                action,
                label,
            } => {
                let outcome = self.engine()?.track_user_event(category, action, label);
                record.outcomes.push(outcome);
            }
            Step::TrackEvent {
                category,
                action,
                label,
            } => {
                let request = TrackingRequest {
                    category: category.clone(),
                    action: action.clone(),
                    label: label.clone(),
                    ..Default::default()
                };
                let outcome = self.engine()?.track_event(&request);
                record.outcomes.push(outcome);
            }
            Step::SetFormValid { target, valid } => {
                let target = element(&self.doc, target)?;
                self.rules.set_valid(target, *valid);
            }
            Step::SetChecked { target, checked } => {
                let target = element(&self.doc, target)?;
                self.doc.set_checked(target, *checked)?;
            }
            Step::CheckRadio { target } => {
                let target = element(&self.doc, target)?;
                self.doc.check_radio(target)?;
            }
            Step::SetValue { target, value } => {
                let target = element(&self.doc, target)?;
                self.doc.set_value(target, value.clone())?;
            }
            Step::Select { target, option } => {
                let select = element(&self.doc, target)?;
                let option = element(&self.doc, option)?;
                self.doc.select_option(select, option)?;
            }
        }

        Ok(record)
    }
}

fn element(doc: &MemoryDocument, id: &str) -> Result<ElementId> {
    doc.element_by_id(id)
        .ok_or_else(|| anyhow!("No element with id '{}' in the page", id))
}

fn describe(step: &Step) -> String {
    match step {
        Step::Interact { trigger, target } => format!("{} #{}", trigger, target),
        Step::Trigger { event } => format!("trigger '{}'", event),
        Step::TriggerWithDelay { event, delay_ms } => format!("trigger '{}' in {} ms", event, delay_ms),
        Step::Advance { ms } => format!("advance {} ms", ms),
        Step::SetCategory { value } => format!("set category '{}'", value),
        Step::SetAction { value } => format!("set action '{}'", value),
        Step::AddPlaceholder { key, value } => format!("placeholder {} = '{}'", key, value),
        Step::UpdateTrackingData { .. } => "update tracking data".to_string(),
        Step::TrackUserEvent { .. } => "track user event".to_string(),
        Step::TrackEvent { .. } => "track event".to_string(),
        Step::SetFormValid { target, valid } => format!("#{} valid = {}", target, valid),
        Step::SetChecked { target, checked } => format!("#{} checked = {}", target, checked),
        Step::CheckRadio { target } => format!("check radio #{}", target),
        Step::SetValue { target, value } => format!("#{} value = '{}'", target, value),
        Step::Select { target, option } => format!("select #{} in #{}", option, target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_scenario;

    #[test]
    fn test_replay_scenario() {
        let scenario = parse_scenario(
            r#"
            [engine]
            category = "shop"
            action = "home"

            [engine.placeholders]
            country = "IT"

            [[page]]
            tag = "a"
            id = "banner"
            classes = ["click-trigger"]
            data = { "tracking-label" = "banner-{{country}}" }

            [[page]]
            tag = "button"
            id = "save"
            classes = ["click-trigger"]
            data = { "tracking-label" = "saved", "tracking-event" = "saveDone" }

            [[steps]]
            step = "interact"
            trigger = "click"
            target = "banner"

            [[steps]]
            step = "interact"
            trigger = "click"
            target = "save"

            [[steps]]
            step = "trigger_with_delay"
            event = "saveDone"
            delay_ms = 500

            [[steps]]
            step = "advance"
            ms = 500
            "#,
        )
        .unwrap();

        let summary = ScenarioRunner::new(&scenario).unwrap().run(&scenario.steps).unwrap();
        let labels: Vec<&str> = summary.calls.iter().map(|c| c.event.label.as_str()).collect();
        assert_eq!(labels, vec!["banner-IT", "saved"]);
        assert!(summary.pending.is_empty());
        assert_eq!(summary.steps.len(), 4);
        assert!(summary.steps[3].outcomes[0].is_dispatched());
    }

    #[test]
    fn test_bundled_checkout_scenario() {
        let scenario = parse_scenario(include_str!("../scenarios/checkout.toml")).unwrap();
        let summary = ScenarioRunner::new(&scenario).unwrap().run(&scenario.steps).unwrap();
        let labels: Vec<&str> = summary.calls.iter().map(|c| c.event.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "banner-IT",
                "newsletter on",
                "newsletter off",
                "standard shipping",
                "express shipping",
                "address form skipped zip",
                "submit address",
            ]
        );
        assert_eq!(summary.calls[5].event.action, "address");
        assert_eq!(summary.calls[5].event.category, "checkout");
    }

    #[test]
    fn test_unknown_target_fails() {
        let scenario = parse_scenario(
            r#"
            [[steps]]
            step = "interact"
            trigger = "click"
            target = "nowhere"
            "#,
        )
        .unwrap();
        let result = ScenarioRunner::new(&scenario).unwrap().run(&scenario.steps);
        assert!(result.is_err());
    }
}
