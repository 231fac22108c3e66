//! Per-element tracking state
//!
//! Side table owned by one engine, created lazily on first interaction with
//! an element. Entries for elements that left the document are pruned.

use crate::dom::Document;
use crate::markers;
use crate::types::ElementId;
use std::collections::HashMap;

/// Transient flags for one element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementTrackingState {
    /// One-shot guard for keyup, blur and radio tracking
    pub already_tracked: bool,
    /// Switch position, mirrored to the `switch-on` class
    pub switch_on: bool,
}

#[derive(Debug, Default)]
pub struct ElementStates {
    states: HashMap<ElementId, ElementTrackingState>,
}

impl ElementStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state, or the state a fresh entry would start with
    pub fn get(&self, doc: &dyn Document, element: ElementId) -> ElementTrackingState {
        self.states
            .get(&element)
            .copied()
            .unwrap_or_else(|| Self::initial(doc, element))
    }

    pub fn get_mut(&mut self, doc: &dyn Document, element: ElementId) -> &mut ElementTrackingState {
        self.states
            .entry(element)
            .or_insert_with(|| Self::initial(doc, element))
    }

    fn initial(doc: &dyn Document, element: ElementId) -> ElementTrackingState {
        ElementTrackingState {
            already_tracked: false,
            switch_on: doc.has_class(element, markers::SWITCH_ON),
        }
    }

    pub fn is_tracked(&self, element: ElementId) -> bool {
        self.states
            .get(&element)
            .map(|s| s.already_tracked)
            .unwrap_or(false)
    }

    /// Forget elements that are no longer inside `root`
    pub fn prune(&mut self, doc: &dyn Document, root: ElementId) {
        let before = self.states.len();
        self.states.retain(|element, _| doc.contains(root, *element));
        let removed = before - self.states.len();
        if removed > 0 {
            log::trace!("Pruned state of {} detached element(s)", removed);
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}
