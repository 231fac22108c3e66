//! External collaborators
//!
//! The engine hands finished triples to an [`AnalyticsSink`], optionally
//! mirrors them to a [`DebugPresenter`], and asks a [`FormValidator`] and a
//! [`ConsentValidator`] for yes/no answers. Implementations here cover
//! recording (tests, scenario runner), logging and fixed validation rules.

use crate::dom::Document;
use crate::types::{ElementId, SinkError, TrackedEvent};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// Receives final (category, action, label) triples
pub trait AnalyticsSink {
    /// One call per tracked interaction; `provider` is the analytics tag
    fn user_event(&mut self, provider: &str, event: &TrackedEvent) -> Result<(), SinkError>;
}

/// Shows dispatched triples while debug mode is on
pub trait DebugPresenter {
    fn present(&mut self, event: &TrackedEvent);
}

/// Answers form and field validity queries
pub trait FormValidator {
    fn form_is_valid(&self, doc: &dyn Document, form: ElementId) -> bool;

    fn field_is_valid(&self, doc: &dyn Document, field: ElementId) -> bool;
}

/// Answers whether a privacy-consent field is in an acceptable state
pub trait ConsentValidator {
    fn consent_is_valid(&self, doc: &dyn Document, field: ElementId) -> bool;
}

/// One recorded sink call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkCall {
    pub provider: String,
    #[serde(flatten)]
    pub event: TrackedEvent,
}

/// Sink that records every call; clones share the same log
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    calls: Rc<RefCell<Vec<SinkCall>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all calls so far
    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.borrow().clone()
    }

    /// Events only, without provider tags
    pub fn events(&self) -> Vec<TrackedEvent> {
        self.calls.borrow().iter().map(|c| c.event.clone()).collect()
    }

    /// Drain the log
    pub fn take(&self) -> Vec<SinkCall> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }
}

impl AnalyticsSink for RecordingSink {
    fn user_event(&mut self, provider: &str, event: &TrackedEvent) -> Result<(), SinkError> {
        self.calls.borrow_mut().push(SinkCall {
            provider: provider.to_string(),
            event: event.clone(),
        });
        Ok(())
    }
}

/// Sink that forwards nothing and reports it
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSink;

impl AnalyticsSink for UnavailableSink {
    fn user_event(&mut self, provider: &str, _event: &TrackedEvent) -> Result<(), SinkError> {
        Err(SinkError(format!("provider '{}' not loaded", provider)))
    }
}

/// Debug presenter that writes the overlay text to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPresenter;

impl DebugPresenter for LogPresenter {
    fn present(&mut self, event: &TrackedEvent) {
        log::info!(
            "New Event: Category: {} | Action: {} | Label: {}",
            event.category,
            event.action,
            event.label
        );
    }
}

/// Presenter that keeps every shown event; clones share the same list
#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    shown: Rc<RefCell<Vec<TrackedEvent>>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<TrackedEvent> {
        self.shown.borrow().clone()
    }
}

impl DebugPresenter for RecordingPresenter {
    fn present(&mut self, event: &TrackedEvent) {
        self.shown.borrow_mut().push(event.clone());
    }
}

/// Validation with explicitly invalid elements; clones share state
///
/// A form or field is valid unless it was marked invalid. Required fields
/// are not checked for emptiness here; that is the engine's job.
#[derive(Debug, Clone, Default)]
pub struct ValidationRules {
    invalid: Rc<RefCell<HashSet<ElementId>>>,
}

impl ValidationRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_valid(&self, element: ElementId, valid: bool) {
        let mut invalid = self.invalid.borrow_mut();
        if valid {
            invalid.remove(&element);
        } else {
            invalid.insert(element);
        }
    }

    fn is_valid(&self, element: ElementId) -> bool {
        !self.invalid.borrow().contains(&element)
    }
}

impl FormValidator for ValidationRules {
    fn form_is_valid(&self, _doc: &dyn Document, form: ElementId) -> bool {
        self.is_valid(form)
    }

    fn field_is_valid(&self, _doc: &dyn Document, field: ElementId) -> bool {
        self.is_valid(field)
    }
}

/// Consent is given when the consent checkbox is checked
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckedConsent;

impl ConsentValidator for CheckedConsent {
    fn consent_is_valid(&self, doc: &dyn Document, field: ElementId) -> bool {
        doc.is_checked(field)
    }
}
