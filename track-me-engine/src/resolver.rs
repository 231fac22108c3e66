//! Tracking data resolution
//!
//! Reads the declarative `data-tracking-*` attributes of an element and its
//! context (closest form, selected options, action source element) and
//! produces a [`TrackingRequest`]. Resolution never fails: every lookup
//! falls back to the engine defaults and finally to `None`.

use crate::config::TrackingDefaults;
use crate::dom::Document;
use crate::markers;
use crate::types::{usable, ElementId, TrackingRequest};

/// Request resolved for a required form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFieldRequest {
    /// Category/action of the form, label is the form's declared name
    pub request: TrackingRequest,
    /// Identifier of the field used in completion labels
    pub field_name: Option<String>,
    pub form: Option<ElementId>,
}

/// Resolves tracking requests against a document and the engine defaults
pub struct TrackingDataResolver<'a> {
    doc: &'a dyn Document,
    defaults: &'a TrackingDefaults,
}

impl<'a> TrackingDataResolver<'a> {
    pub fn new(doc: &'a dyn Document, defaults: &'a TrackingDefaults) -> Self {
        Self { doc, defaults }
    }

    /// Declared data attribute, ignoring empty and "undefined" values
    fn declared(&self, element: ElementId, name: &str) -> Option<String> {
        usable(self.doc.data(element, name)).map(str::to_string)
    }

    fn default_category(&self) -> Option<String> {
        usable(self.defaults.category.as_deref()).map(str::to_string)
    }

    fn default_action(&self) -> Option<String> {
        usable(self.defaults.action.as_deref()).map(str::to_string)
    }

    /// Element named by `tracking-action-from-id`, with or without a leading '#'
    fn action_source(&self, element: ElementId) -> Option<ElementId> {
        let reference = self.declared(element, markers::ACTION_FROM_ID)?;
        self.doc.element_by_id(reference.trim_start_matches('#'))
    }

    /// Resolve the request declared directly on a tracked element
    ///
    /// Action lookup order: the element itself, then the action source
    /// element, then the engine default.
    pub fn resolve(&self, element: ElementId) -> TrackingRequest {
        let mut action_source = None;
        let action = self.declared(element, markers::ACTION).or_else(|| {
            let source = self.action_source(element)?;
            let action = self.declared(source, markers::ACTION)?;
            action_source = Some(source);
            Some(action)
        });

        let request = TrackingRequest {
            category: self
                .declared(element, markers::CATEGORY)
                .or_else(|| self.default_category()),
            action: action.or_else(|| self.default_action()),
            label: self.declared(element, markers::LABEL),
            label_checked: self.declared(element, markers::LABEL_CHECKED),
            label_not_checked: self.declared(element, markers::LABEL_NOT_CHECKED),
            label_on: self.declared(element, markers::LABEL_ON),
            label_off: self.declared(element, markers::LABEL_OFF),
            defer_until_event: self.declared(element, markers::EVENT),
            form_gate_id: self.declared(element, markers::FORM_ID),
            action_source,
        };
        log::debug!("Resolved tracking data for {}: {:?}", element, request);
        request
    }

    /// Resolve a select change from its currently selected option
    ///
    /// With several selected options the first one in document order wins.
    pub fn resolve_select(&self, select: ElementId) -> TrackingRequest {
        let option = self.doc.selected_options(select).into_iter().next();
        let from_option = |name: &str| option.and_then(|o| self.declared(o, name));

        TrackingRequest {
            category: from_option(markers::CATEGORY).or_else(|| self.default_category()),
            action: from_option(markers::ACTION).or_else(|| self.default_action()),
            label: from_option(markers::LABEL),
            defer_until_event: from_option(markers::EVENT),
            ..Default::default()
        }
    }

    /// Resolve a required field against its closest form
    pub fn resolve_form_field(&self, field: ElementId) -> FormFieldRequest {
        let form = self.doc.closest_tag(field, "form");
        let from_form = |name: &str| form.and_then(|f| self.declared(f, name));

        let request = TrackingRequest {
            category: from_form(markers::CATEGORY).or_else(|| self.default_category()),
            action: from_form(markers::ACTION).or_else(|| self.default_action()),
            label: from_form(markers::FORM_NAME),
            ..Default::default()
        };
        let field_name = self
            .declared(field, markers::FIELD_NAME)
            .or_else(|| usable(self.doc.attribute(field, "name")).map(str::to_string));

        FormFieldRequest {
            request,
            field_name,
            form,
        }
    }
}
