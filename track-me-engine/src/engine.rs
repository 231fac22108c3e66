//! Tracking engine
//!
//! One [`TrackingEngine`] is attached to one root element. It owns the
//! mutable defaults, the per-element state table, the deferred-dispatch
//! gate and the collaborators, and runs every interaction to completion
//! before returning.

use crate::config::{EngineConfig, TrackingDataUpdate, TrackingDefaults};
use crate::dom::Document;
use crate::form_tracking::{is_required_field, FormFieldTracker};
use crate::gate::{after_millis, DispatchGate, PendingDispatch};
use crate::markers;
use crate::placeholder;
use crate::policy::{classify, radio_group, Decision, InteractionPolicy};
use crate::resolver::TrackingDataResolver;
use crate::sink::{
    AnalyticsSink, CheckedConsent, ConsentValidator, DebugPresenter, FormValidator, LogPresenter,
    ValidationRules,
};
use crate::state::ElementStates;
use crate::types::{
    usable, DispatchOutcome, DropReason, ElementId, InteractionKind, Result, Timestamp,
    TrackedEvent, TrackingRequest, TriggerKind,
};
use std::collections::HashMap;

/// Everything the host needs to know after one interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionReport {
    /// Element that matched the trigger's delegate rule
    pub delegate: Option<ElementId>,
    pub kind: Option<InteractionKind>,
    pub outcome: DispatchOutcome,
    /// Host should suppress the element's default action (debug mode links)
    pub prevent_default: bool,
}

impl InteractionReport {
    fn ignored() -> Self {
        Self {
            delegate: None,
            kind: None,
            outcome: DispatchOutcome::Ignored,
            prevent_default: false,
        }
    }
}

type CompleteCallback = Box<dyn FnMut(ElementId)>;

/// Tracking engine bound to one root element
pub struct TrackingEngine {
    root: ElementId,
    config: EngineConfig,
    defaults: TrackingDefaults,
    states: ElementStates,
    gate: DispatchGate,
    clock: Timestamp,
    sink: Box<dyn AnalyticsSink>,
    presenter: Box<dyn DebugPresenter>,
    form_validator: Box<dyn FormValidator>,
    consent_validator: Box<dyn ConsentValidator>,
    on_complete: Option<CompleteCallback>,
}

impl TrackingEngine {
    /// Attach a new engine to `root`
    pub fn new(root: ElementId, config: EngineConfig, sink: Box<dyn AnalyticsSink>) -> Result<Self> {
        config.validate()?;
        log::info!(
            "Attaching tracking engine to {} (provider '{}', debug {})",
            root,
            config.provider,
            config.debug
        );

        Ok(Self {
            root,
            defaults: TrackingDefaults::from(&config),
            config,
            states: ElementStates::new(),
            gate: DispatchGate::new(),
            clock: chrono::Utc::now(),
            sink,
            presenter: Box::new(LogPresenter),
            form_validator: Box::new(ValidationRules::new()),
            consent_validator: Box::new(CheckedConsent),
            on_complete: None,
        })
    }

    /// Builder method: replace the debug presenter
    pub fn with_presenter(mut self, presenter: Box<dyn DebugPresenter>) -> Self {
        self.presenter = presenter;
        self
    }

    /// Builder method: replace the form validator
    pub fn with_form_validator(mut self, validator: Box<dyn FormValidator>) -> Self {
        self.form_validator = validator;
        self
    }

    /// Builder method: replace the consent validator
    pub fn with_consent_validator(mut self, validator: Box<dyn ConsentValidator>) -> Self {
        self.consent_validator = validator;
        self
    }

    /// Builder method: callback run after every handled interaction
    pub fn on_complete(mut self, callback: impl FnMut(ElementId) + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Builder method: start the engine clock at `now`
    pub fn with_clock(mut self, now: Timestamp) -> Self {
        self.clock = now;
        self
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn defaults(&self) -> &TrackingDefaults {
        &self.defaults
    }

    pub fn states(&self) -> &ElementStates {
        &self.states
    }

    /// Handle one DOM interaction on `target`
    pub fn handle(&mut self, doc: &mut dyn Document, trigger: TriggerKind, target: ElementId) -> InteractionReport {
        self.states.prune(doc, self.root);

        if !doc.contains(self.root, target) {
            log::trace!("{} on {} is outside root {}", trigger, target, self.root);
            return InteractionReport::ignored();
        }
        let Some(delegate) = self.delegate(doc, trigger, target) else {
            log::trace!("No tracked element for {} on {}", trigger, target);
            return InteractionReport::ignored();
        };

        let kind = classify(doc, delegate, trigger);
        log::debug!("{} on {} classified as {:?}", trigger, delegate, kind);

        let outcome = if trigger == TriggerKind::Keyup && self.states.is_tracked(delegate) {
            DispatchOutcome::Dropped(DropReason::AlreadyTracked)
        } else {
            let outcome = self.run(doc, kind, delegate);
            if trigger == TriggerKind::Keyup
                && matches!(outcome, DispatchOutcome::Dispatched(_) | DispatchOutcome::Armed(_))
            {
                self.states.get_mut(doc, delegate).already_tracked = true;
            }
            outcome
        };

        let prevent_default = self.config.debug_no_follow_links
            && doc.tag_name(delegate) == Some("a")
            && doc.attribute(delegate, "href").is_some();

        if let Some(callback) = self.on_complete.as_mut() {
            callback(delegate);
        }

        InteractionReport {
            delegate: Some(delegate),
            kind: Some(kind),
            outcome,
            prevent_default,
        }
    }

    /// Closest element inside the root that carries the trigger's marker
    fn delegate(&self, doc: &dyn Document, trigger: TriggerKind, target: ElementId) -> Option<ElementId> {
        match markers::trigger_class(trigger) {
            Some(class) => {
                let root = self.root;
                doc.closest(target, &|el| doc.has_class(el, class) && doc.contains(root, el))
            }
            None => Some(target).filter(|el| is_required_field(doc, *el)),
        }
    }

    fn run(&mut self, doc: &mut dyn Document, kind: InteractionKind, element: ElementId) -> DispatchOutcome {
        if kind == InteractionKind::FormField {
            return self.run_form_field(doc, element);
        }

        let decision = {
            let view: &dyn Document = &*doc;
            let resolver = TrackingDataResolver::new(view, &self.defaults);
            let request = match kind {
                InteractionKind::SelectChange => resolver.resolve_select(element),
                _ => resolver.resolve(element),
            };
            let policy = InteractionPolicy {
                doc: view,
                states: &self.states,
                form_validator: self.form_validator.as_ref(),
                consent_validator: self.consent_validator.as_ref(),
                form_tracking: &self.defaults.form_tracking,
            };
            policy.decide(kind, element, request)
        };

        match decision {
            Decision::Fire(request) => self.dispatch(&request),
            Decision::Defer { event, dispatch } => {
                self.gate.arm(&event, dispatch);
                DispatchOutcome::Armed(event)
            }
            Decision::SelectRadio { radio, request } => {
                self.select_radio(doc, radio);
                self.dispatch(&request)
            }
            Decision::Toggle { switch, on, request } => {
                self.states.get_mut(doc, switch).switch_on = on;
                doc.set_class(switch, markers::SWITCH_ON, on);
                self.dispatch(&request)
            }
            Decision::Drop(reason) => DispatchOutcome::Dropped(reason),
        }
    }

    fn run_form_field(&mut self, doc: &mut dyn Document, field: ElementId) -> DispatchOutcome {
        let blur = {
            let view: &dyn Document = &*doc;
            let resolved = TrackingDataResolver::new(view, &self.defaults).resolve_form_field(field);
            let tracker = FormFieldTracker {
                doc: view,
                validator: self.form_validator.as_ref(),
                config: &self.defaults.form_tracking,
            };
            tracker.on_blur(field, self.states.is_tracked(field), resolved)
        };

        if blur.mark_tracked {
            self.states.get_mut(doc, field).already_tracked = true;
        }
        match blur.report {
            Ok(request) => self.dispatch(&request),
            Err(reason) => DispatchOutcome::Dropped(reason),
        }
    }

    /// Move the radio group's guard to `radio`
    fn select_radio(&mut self, doc: &dyn Document, radio: ElementId) {
        for sibling in radio_group(doc, radio) {
            self.states.get_mut(doc, sibling).already_tracked = false;
        }
        self.states.get_mut(doc, radio).already_tracked = true;
    }

    fn dispatch(&mut self, request: &TrackingRequest) -> DispatchOutcome {
        self.send(
            request.category.as_deref(),
            request.action.as_deref(),
            request.label.as_deref(),
        )
    }

    /// Expand the label, check the triple and hand it to the sink
    fn send(&mut self, category: Option<&str>, action: Option<&str>, label: Option<&str>) -> DispatchOutcome {
        let label = label.map(|l| placeholder::expand(l, &self.defaults.placeholders));
        let (Some(category), Some(action), Some(label)) =
            (usable(category), usable(action), usable(label.as_deref()))
        else {
            log::debug!(
                "Dropping incomplete request: category {:?}, action {:?}, label {:?}",
                category,
                action,
                label
            );
            return DispatchOutcome::Dropped(DropReason::IncompleteRequest);
        };

        let event = TrackedEvent::new(category, action, label);
        if let Err(e) = self.sink.user_event(&self.config.provider, &event) {
            log::warn!("Analytics sink rejected {}: {}", event, e);
        } else {
            log::info!("Tracked event: {}", event);
        }
        if self.config.debug {
            self.presenter.present(&event);
        }
        DispatchOutcome::Dispatched(event)
    }

    /// Send a triple directly
    pub fn track_user_event(&mut self, category: &str, action: &str, label: &str) -> DispatchOutcome {
        self.send(Some(category), Some(action), Some(label))
    }

    /// Send a request, filling a missing category or action from the defaults
    pub fn track_event(&mut self, request: &TrackingRequest) -> DispatchOutcome {
        let category = usable(request.category.as_deref())
            .or_else(|| usable(self.defaults.category.as_deref()))
            .map(str::to_string);
        let action = usable(request.action.as_deref())
            .or_else(|| usable(self.defaults.action.as_deref()))
            .map(str::to_string);
        self.send(category.as_deref(), action.as_deref(), request.label.as_deref())
    }

    /// Broadcast `event`, running the dispatch armed for it
    pub fn trigger(&mut self, doc: &dyn Document, event: &str) -> DispatchOutcome {
        let Some(pending) = self.gate.take(event) else {
            log::trace!("Event '{}' broadcast with nothing armed", event);
            return DispatchOutcome::Ignored;
        };
        log::debug!("Event '{}' released a deferred dispatch", event);

        match pending {
            PendingDispatch::Track(request) => self.dispatch(&request),
            PendingDispatch::Radio {
                already_tracked: true,
                ..
            } => DispatchOutcome::Dropped(DropReason::AlreadyTracked),
            PendingDispatch::Radio { radio, request, .. } => {
                self.select_radio(doc, radio);
                self.dispatch(&request)
            }
        }
    }

    /// Schedule a broadcast of `event` after `delay_ms` on the engine clock
    pub fn trigger_with_delay(&mut self, event: &str, delay_ms: u64) {
        let due = after_millis(self.clock, delay_ms);
        log::debug!("Scheduled '{}' in {} ms", event, delay_ms);
        self.gate.schedule(event, due);
    }

    pub fn now(&self) -> Timestamp {
        self.clock
    }

    /// Move the engine clock to `now` and broadcast every due event
    pub fn advance_to(&mut self, doc: &dyn Document, now: Timestamp) -> Vec<DispatchOutcome> {
        if now > self.clock {
            self.clock = now;
        }
        let due = self.gate.due(self.clock);
        due.iter().map(|event| self.trigger(doc, event)).collect()
    }

    pub fn advance_by(&mut self, doc: &dyn Document, millis: u64) -> Vec<DispatchOutcome> {
        let now = after_millis(self.clock, millis);
        self.advance_to(doc, now)
    }

    pub fn is_armed(&self, event: &str) -> bool {
        self.gate.is_armed(event)
    }

    pub fn armed_events(&self) -> Vec<&str> {
        self.gate.armed_events()
    }

    pub fn set_tracking_category(&mut self, category: impl Into<String>) {
        self.defaults.category = Some(category.into());
    }

    pub fn set_tracking_action(&mut self, action: impl Into<String>) {
        self.defaults.action = Some(action.into());
    }

    pub fn current_tracking_category(&self) -> Option<&str> {
        self.defaults.category.as_deref()
    }

    pub fn current_tracking_action(&self) -> Option<&str> {
        self.defaults.action.as_deref()
    }

    pub fn update_tracking_data(&mut self, update: TrackingDataUpdate) {
        self.defaults.apply(update);
    }

    pub fn add_placeholders(&mut self, placeholders: HashMap<String, String>) {
        self.defaults.placeholders.extend(placeholders);
    }

    /// Drop all pending work and element state
    pub fn detach(mut self) {
        log::info!("Detaching tracking engine from {}", self.root);
        self.gate.clear();
        self.states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ElementSpec, MemoryDocument};
    use crate::sink::{RecordingSink, UnavailableSink};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn engine(config: EngineConfig) -> (TrackingEngine, RecordingSink) {
        let sink = RecordingSink::new();
        let engine = TrackingEngine::new(ElementId(0), config, Box::new(sink.clone())).unwrap();
        (engine, sink)
    }

    #[test]
    fn test_click_delegates_to_marked_ancestor() {
        let mut doc = MemoryDocument::from_specs(&[ElementSpec::new("a")
            .class("click-trigger")
            .data("tracking-label", "banner")
            .child(ElementSpec::new("span"))]);
        let link = doc.children(doc.body())[0];
        let span = doc.children(link)[0];
        let (mut engine, sink) = engine(EngineConfig::new().with_category("shop").with_action("home"));

        let report = engine.handle(&mut doc, TriggerKind::Click, span);
        assert_eq!(report.delegate, Some(link));
        assert_eq!(report.kind, Some(InteractionKind::Default));
        assert_eq!(sink.events(), vec![TrackedEvent::new("shop", "home", "banner")]);

        // Hover has no marker on this element
        let report = engine.handle(&mut doc, TriggerKind::Hover, span);
        assert_eq!(report.outcome, DispatchOutcome::Ignored);
    }

    #[test]
    fn test_placeholders_expanded_at_dispatch() {
        let (mut engine, sink) = engine(EngineConfig::new().add_placeholder("country", "IT"));
        engine.track_user_event("shop", "home", "banner-{{country}}-{{lang}}");
        assert_eq!(sink.events()[0].label, "banner-IT-");

        engine.add_placeholders([("lang".to_string(), "en".to_string())].into_iter().collect());
        engine.track_user_event("shop", "home", "{{lang}}");
        assert_eq!(sink.events()[1].label, "en");

        // Label expanding to nothing is incomplete
        let outcome = engine.track_user_event("shop", "home", "{{missing}}");
        assert_eq!(outcome, DispatchOutcome::Dropped(DropReason::IncompleteRequest));
    }

    #[test]
    fn test_track_event_uses_defaults() {
        let (mut engine, sink) = engine(EngineConfig::new().with_category("site"));
        let request = TrackingRequest {
            label: Some("hero".into()),
            ..Default::default()
        };
        assert_eq!(
            engine.track_event(&request),
            DispatchOutcome::Dropped(DropReason::IncompleteRequest)
        );

        engine.set_tracking_action("view");
        assert_eq!(engine.current_tracking_action(), Some("view"));
        assert!(engine.track_event(&request).is_dispatched());
        assert_eq!(sink.events(), vec![TrackedEvent::new("site", "view", "hero")]);
    }

    #[test]
    fn test_sink_failure_does_not_block() {
        let mut engine = TrackingEngine::new(ElementId(0), EngineConfig::new(), Box::new(UnavailableSink)).unwrap();
        assert!(engine.track_user_event("a", "b", "c").is_dispatched());
    }

    #[test]
    fn test_no_follow_links_and_on_complete() {
        let mut doc = MemoryDocument::from_specs(&[ElementSpec::new("a")
            .attr("href", "/next")
            .class("click-trigger")]);
        let link = doc.children(doc.body())[0];
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_cb = seen.clone();
        let (engine, _sink) = engine(EngineConfig::new().with_debug_no_follow_links(true));
        let mut engine = engine.on_complete(move |el| seen_cb.borrow_mut().push(el));

        let report = engine.handle(&mut doc, TriggerKind::Click, link);
        assert!(report.prevent_default);
        // Nothing declared, nothing sent, callback still runs
        assert_eq!(report.outcome, DispatchOutcome::Dropped(DropReason::IncompleteRequest));
        assert_eq!(*seen.borrow(), vec![link]);
    }

    #[test]
    fn test_delayed_trigger() {
        let mut doc = MemoryDocument::from_specs(&[ElementSpec::new("button")
            .class("click-trigger")
            .data("tracking-category", "c")
            .data("tracking-action", "a")
            .data("tracking-label", "l")
            .data("tracking-event", "ready")]);
        let button = doc.children(doc.body())[0];
        let (mut engine, sink) = engine(EngineConfig::new());

        let report = engine.handle(&mut doc, TriggerKind::Click, button);
        assert_eq!(report.outcome, DispatchOutcome::Armed("ready".to_string()));
        engine.trigger_with_delay("ready", 200);

        assert!(engine.advance_by(&doc, 100).is_empty());
        let outcomes = engine.advance_by(&doc, 100);
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_dispatched());
        assert_eq!(sink.events().len(), 1);
        assert!(!engine.is_armed("ready"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = TrackingEngine::new(
            ElementId(0),
            EngineConfig::new().with_provider(""),
            Box::new(RecordingSink::new()),
        );
        assert!(result.is_err());
    }
}
