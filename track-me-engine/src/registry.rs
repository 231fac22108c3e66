//! Attachment registry
//!
//! Keeps one engine per root element. Attaching to a root that already has
//! an engine returns the existing one untouched.
//!
//! Named broadcasts are shared by every attached engine, including the ones
//! scheduled with a delay on the registry clock.

use crate::config::EngineConfig;
use crate::dom::Document;
use crate::engine::{InteractionReport, TrackingEngine};
use crate::gate::{after_millis, TriggerSchedule};
use crate::sink::AnalyticsSink;
use crate::types::{DispatchOutcome, ElementId, Result, Timestamp, TrackError, TriggerKind};
use std::collections::BTreeMap;

pub struct TrackMe {
    engines: BTreeMap<ElementId, TrackingEngine>,
    schedule: TriggerSchedule,
    clock: Timestamp,
}

impl TrackMe {
    pub fn new() -> Self {
        Self {
            engines: BTreeMap::new(),
            schedule: TriggerSchedule::new(),
            clock: chrono::Utc::now(),
        }
    }

    /// Builder method: start the registry clock at `now`
    pub fn with_clock(mut self, now: Timestamp) -> Self {
        self.clock = now;
        self
    }

    /// Attach an engine to `root`, or return the one already attached
    pub fn attach(
        &mut self,
        root: ElementId,
        config: EngineConfig,
        sink: Box<dyn AnalyticsSink>,
    ) -> Result<&mut TrackingEngine> {
        if self.engines.contains_key(&root) {
            log::debug!("Root {} already has a tracking engine", root);
        } else {
            let engine = TrackingEngine::new(root, config, sink)?;
            self.engines.insert(root, engine);
        }
        self.engines.get_mut(&root).ok_or(TrackError::NotAttached(root))
    }

    /// Attach a fully built engine; fails if its root is taken
    pub fn insert(&mut self, engine: TrackingEngine) -> Result<&mut TrackingEngine> {
        let root = engine.root();
        if self.engines.contains_key(&root) {
            return Err(TrackError::AlreadyAttached(root));
        }
        Ok(self.engines.entry(root).or_insert(engine))
    }

    /// Remove the engine attached to `root`, dropping its pending work
    pub fn detach(&mut self, root: ElementId) -> Result<()> {
        let engine = self.engines.remove(&root).ok_or(TrackError::NotAttached(root))?;
        engine.detach();
        Ok(())
    }

    pub fn engine(&self, root: ElementId) -> Option<&TrackingEngine> {
        self.engines.get(&root)
    }

    pub fn engine_mut(&mut self, root: ElementId) -> Option<&mut TrackingEngine> {
        self.engines.get_mut(&root)
    }

    pub fn roots(&self) -> Vec<ElementId> {
        self.engines.keys().copied().collect()
    }

    /// Deliver an interaction to every engine whose root contains the target
    pub fn handle(&mut self, doc: &mut dyn Document, trigger: TriggerKind, target: ElementId) -> Vec<InteractionReport> {
        let mut reports = Vec::new();
        for engine in self.engines.values_mut() {
            if doc.contains(engine.root(), target) {
                reports.push(engine.handle(doc, trigger, target));
            }
        }
        reports
    }

    /// Broadcast a named event to every engine
    pub fn trigger(&mut self, doc: &dyn Document, event: &str) -> Vec<DispatchOutcome> {
        self.engines
            .values_mut()
            .map(|engine| engine.trigger(doc, event))
            .filter(|outcome| *outcome != DispatchOutcome::Ignored)
            .collect()
    }

    /// Schedule a broadcast to every engine after `delay_ms` on the registry clock
    pub fn trigger_with_delay(&mut self, event: &str, delay_ms: u64) {
        log::debug!("Scheduled shared broadcast '{}' in {} ms", event, delay_ms);
        self.schedule.schedule(event, after_millis(self.clock, delay_ms));
    }

    pub fn now(&self) -> Timestamp {
        self.clock
    }

    /// Move every clock to `now` and run the broadcasts that came due
    ///
    /// Shared broadcasts go first, then each engine's own delayed triggers.
    pub fn advance_to(&mut self, doc: &dyn Document, now: Timestamp) -> Vec<DispatchOutcome> {
        if now > self.clock {
            self.clock = now;
        }
        let mut outcomes = Vec::new();
        for event in self.schedule.due(self.clock) {
            outcomes.extend(self.trigger(doc, &event));
        }
        for engine in self.engines.values_mut() {
            outcomes.extend(
                engine
                    .advance_to(doc, now)
                    .into_iter()
                    .filter(|outcome| *outcome != DispatchOutcome::Ignored),
            );
        }
        outcomes
    }

    pub fn advance_by(&mut self, doc: &dyn Document, millis: u64) -> Vec<DispatchOutcome> {
        let now = after_millis(self.clock, millis);
        self.advance_to(doc, now)
    }
}

impl Default for TrackMe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ElementSpec, MemoryDocument};
    use crate::sink::RecordingSink;
    use crate::types::TrackedEvent;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_attach_is_idempotent() {
        let mut registry = TrackMe::new();
        let root = ElementId(0);
        registry
            .attach(root, EngineConfig::new().with_category("first"), Box::new(RecordingSink::new()))
            .unwrap();
        let engine = registry
            .attach(root, EngineConfig::new().with_category("second"), Box::new(RecordingSink::new()))
            .unwrap();
        assert_eq!(engine.current_tracking_category(), Some("first"));
        assert_eq!(registry.roots(), vec![root]);
    }

    #[test]
    fn test_detach() {
        let mut registry = TrackMe::new();
        let root = ElementId(0);
        registry
            .attach(root, EngineConfig::new(), Box::new(RecordingSink::new()))
            .unwrap();
        assert!(registry.detach(root).is_ok());
        assert!(matches!(registry.detach(root), Err(TrackError::NotAttached(_))));
    }

    #[test]
    fn test_insert_rejects_taken_root() {
        let mut registry = TrackMe::new();
        let root = ElementId(0);
        let first = TrackingEngine::new(root, EngineConfig::new(), Box::new(RecordingSink::new())).unwrap();
        let second = TrackingEngine::new(root, EngineConfig::new(), Box::new(RecordingSink::new())).unwrap();
        registry.insert(first).unwrap();
        assert!(matches!(registry.insert(second), Err(TrackError::AlreadyAttached(r)) if r == root));
    }

    #[test]
    fn test_delayed_broadcast_reaches_every_root() {
        let mut doc = MemoryDocument::from_specs(&[
            ElementSpec::new("section"),
            ElementSpec::new("section").child(
                ElementSpec::new("button")
                    .class("click-trigger")
                    .data("tracking-label", "saved")
                    .data("tracking-event", "done"),
            ),
        ]);
        let sections = doc.children(doc.body());
        let button = doc.children(sections[1])[0];
        let sink = RecordingSink::new();
        let start = Utc.with_ymd_and_hms(2015, 12, 23, 0, 0, 0).unwrap();

        let mut registry = TrackMe::new().with_clock(start);
        registry
            .attach(sections[0], EngineConfig::new(), Box::new(RecordingSink::new()))
            .unwrap();
        registry
            .attach(
                sections[1],
                EngineConfig::new().with_category("c").with_action("a"),
                Box::new(sink.clone()),
            )
            .unwrap();

        registry.handle(&mut doc, TriggerKind::Click, button);
        assert!(registry.engine(sections[1]).unwrap().is_armed("done"));

        registry.trigger_with_delay("done", 10);
        assert!(registry.advance_by(&doc, 5).is_empty());
        let outcomes = registry.advance_by(&doc, 5);

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_dispatched());
        assert_eq!(sink.events(), vec![TrackedEvent::new("c", "a", "saved")]);
        assert!(!registry.engine(sections[1]).unwrap().is_armed("done"));
        assert_eq!(registry.now(), start + chrono::Duration::milliseconds(10));
    }

    #[test]
    fn test_independent_roots() {
        let mut doc = MemoryDocument::from_specs(&[
            ElementSpec::new("section").child(
                ElementSpec::new("a")
                    .class("click-trigger")
                    .data("tracking-label", "left"),
            ),
            ElementSpec::new("section").child(
                ElementSpec::new("a")
                    .class("click-trigger")
                    .data("tracking-label", "right"),
            ),
        ]);
        let sections = doc.children(doc.body());
        let left_link = doc.children(sections[0])[0];
        let left_sink = RecordingSink::new();
        let right_sink = RecordingSink::new();

        let mut registry = TrackMe::new();
        registry
            .attach(
                sections[0],
                EngineConfig::new().with_category("l").with_action("a"),
                Box::new(left_sink.clone()),
            )
            .unwrap();
        registry
            .attach(
                sections[1],
                EngineConfig::new().with_category("r").with_action("a"),
                Box::new(right_sink.clone()),
            )
            .unwrap();

        let reports = registry.handle(&mut doc, TriggerKind::Click, left_link);
        assert_eq!(reports.len(), 1);
        assert_eq!(left_sink.events().len(), 1);
        assert!(right_sink.events().is_empty());

        registry.engine_mut(sections[1]).unwrap().set_tracking_category("changed");
        assert_eq!(
            registry.engine(sections[0]).unwrap().current_tracking_category(),
            Some("l")
        );
    }
}
