//! Interaction classification and firing decisions
//!
//! [`classify`] picks the firing policy of a delegate element in a fixed
//! precedence order. [`InteractionPolicy::decide`] turns the resolved
//! request into a [`Decision`]. Deciding only reads state; the engine
//! carries out the effects (guards, switch classes, sink calls).

use crate::config::FormTrackingConfig;
use crate::dom::Document;
use crate::gate::PendingDispatch;
use crate::markers;
use crate::sink::{ConsentValidator, FormValidator};
use crate::state::ElementStates;
use crate::types::{usable, DropReason, ElementId, InteractionKind, TrackingRequest, TriggerKind};

/// Pick the firing policy for `element`; the first matching rule wins
///
/// Blur is only ever delegated to form fields, so it always classifies as
/// [`InteractionKind::FormField`].
pub fn classify(doc: &dyn Document, element: ElementId, trigger: TriggerKind) -> InteractionKind {
    if trigger == TriggerKind::Blur {
        return InteractionKind::FormField;
    }

    if doc.is_input_of_type(element, "checkbox")
        && usable(doc.data(element, markers::LABEL_CHECKED)).is_some()
    {
        InteractionKind::Checkbox
    } else if doc.is_input_of_type(element, "radio") {
        InteractionKind::Radio
    } else if doc.has_class(element, markers::SWITCH_STATE) {
        InteractionKind::Switch
    } else if usable(doc.data(element, markers::FORM_ID)).is_some() {
        InteractionKind::FormGated
    } else if trigger == TriggerKind::Change && doc.tag_name(element) == Some("select") {
        InteractionKind::SelectChange
    } else {
        InteractionKind::Default
    }
}

/// What the engine should do with one interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Dispatch now
    Fire(TrackingRequest),
    /// Park until `event` is broadcast
    Defer { event: String, dispatch: PendingDispatch },
    /// Radio selected: move the group guard to `radio`, then dispatch
    SelectRadio { radio: ElementId, request: TrackingRequest },
    /// Flip the switch to `on`, then dispatch
    Toggle {
        switch: ElementId,
        on: bool,
        request: TrackingRequest,
    },
    Drop(DropReason),
}

/// Read-only view of everything a decision depends on
pub struct InteractionPolicy<'a> {
    pub doc: &'a dyn Document,
    pub states: &'a ElementStates,
    pub form_validator: &'a dyn FormValidator,
    pub consent_validator: &'a dyn ConsentValidator,
    pub form_tracking: &'a FormTrackingConfig,
}

impl<'a> InteractionPolicy<'a> {
    pub fn decide(&self, kind: InteractionKind, element: ElementId, request: TrackingRequest) -> Decision {
        match kind {
            InteractionKind::Checkbox => {
                let label = if self.doc.is_checked(element) {
                    request.label_checked.clone()
                } else {
                    request.label_not_checked.clone()
                };
                Self::fire_or_defer(request.with_label(label))
            }
            InteractionKind::Radio => self.decide_radio(element, request),
            InteractionKind::Switch => {
                let on = !self.states.get(self.doc, element).switch_on;
                let label = if on {
                    request.label_on.clone()
                } else {
                    request.label_off.clone()
                };
                Decision::Toggle {
                    switch: element,
                    on,
                    request: request.with_label(label),
                }
            }
            InteractionKind::FormGated => {
                let form_id = request.form_gate_id.as_deref().unwrap_or_default();
                if self.form_passes(form_id) {
                    Decision::Fire(request)
                } else {
                    log::debug!("Form '{}' did not validate, dropping {}", form_id, element);
                    Decision::Drop(DropReason::GateFailed)
                }
            }
            // Form fields go through the completion tracker, not here
            InteractionKind::FormField => Decision::Drop(DropReason::NotReported),
            InteractionKind::SelectChange | InteractionKind::Default => Self::fire_or_defer(request),
        }
    }

    fn fire_or_defer(request: TrackingRequest) -> Decision {
        match request.defer_until_event.clone() {
            Some(event) => Decision::Defer {
                event,
                dispatch: PendingDispatch::Track(request),
            },
            None => Decision::Fire(request),
        }
    }

    fn decide_radio(&self, radio: ElementId, request: TrackingRequest) -> Decision {
        let already_tracked = self.states.is_tracked(radio);
        match request.defer_until_event.clone() {
            Some(event) => Decision::Defer {
                event,
                dispatch: PendingDispatch::Radio {
                    radio,
                    request,
                    already_tracked,
                },
            },
            None if already_tracked => Decision::Drop(DropReason::AlreadyTracked),
            None => Decision::SelectRadio { radio, request },
        }
    }

    /// Gating form validates, and consent is given if the form asks for it
    ///
    /// A form id that matches no element does not block tracking.
    fn form_passes(&self, form_id: &str) -> bool {
        let Some(form) = self.doc.element_by_id(form_id.trim_start_matches('#')) else {
            return true;
        };
        if !self.form_validator.form_is_valid(self.doc, form) {
            return false;
        }
        let consent_field = self.doc.descendants(form).into_iter().find(|el| {
            self.doc
                .attribute(*el, "name")
                .map(|name| self.form_tracking.is_consent_field(name))
                .unwrap_or(false)
        });
        match consent_field {
            Some(field) => self.consent_validator.consent_is_valid(self.doc, field),
            None => true,
        }
    }
}

/// Radios sharing the group container of `radio`, including itself
///
/// Without a group container the native grouping applies: radios with the
/// same `name` in the same form (or the same document when there is no
/// form). An unnamed radio forms a group of its own.
pub fn radio_group(doc: &dyn Document, radio: ElementId) -> Vec<ElementId> {
    if let Some(container) = doc.closest_with_class(radio, markers::RADIO_GROUP_CONTAINER) {
        return doc
            .descendants(container)
            .into_iter()
            .filter(|el| doc.is_input_of_type(*el, "radio"))
            .collect();
    }

    let Some(name) = usable(doc.attribute(radio, "name")) else {
        return vec![radio];
    };
    let form = doc.closest_tag(radio, "form");
    let scope = form.unwrap_or_else(|| {
        let mut top = radio;
        while let Some(parent) = doc.parent(top) {
            top = parent;
        }
        top
    });
    doc.descendants(scope)
        .into_iter()
        .filter(|el| {
            doc.is_input_of_type(*el, "radio")
                && doc.attribute(*el, "name") == Some(name)
                && doc.closest_tag(*el, "form") == form
        })
        .collect()
}
