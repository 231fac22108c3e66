//! Declarative markup surface
//!
//! Data attribute names (without the `data-` prefix) and the marker classes
//! that select which interactions are tracked.

use crate::types::TriggerKind;

// Data attributes
pub const CATEGORY: &str = "tracking-category";
pub const ACTION: &str = "tracking-action";
pub const ACTION_FROM_ID: &str = "tracking-action-from-id";
pub const LABEL: &str = "tracking-label";
pub const LABEL_CHECKED: &str = "tracking-label-checked";
pub const LABEL_NOT_CHECKED: &str = "tracking-label-not-checked";
pub const LABEL_ON: &str = "tracking-label-on";
pub const LABEL_OFF: &str = "tracking-label-off";
pub const EVENT: &str = "tracking-event";
pub const FORM_ID: &str = "tracking-form-id";
pub const FIELD_NAME: &str = "tracking-name";
pub const FORM_NAME: &str = "tracking-form-name";
pub const VAL_REQUIRED: &str = "val-required";

// Marker classes
pub const CLICK_TRIGGER: &str = "click-trigger";
pub const HOVER_TRIGGER: &str = "hover-trigger";
pub const FOCUS_TRIGGER: &str = "focus-trigger";
pub const KEYUP_TRIGGER: &str = "keyup-trigger";
pub const SELECT_CHANGE_TRIGGER: &str = "select-change-trigger";
pub const FORM_FIELD_CONTAINER: &str = "form-field-container";
pub const SWITCH_STATE: &str = "switch-state";
pub const SWITCH_ON: &str = "switch-on";
pub const RADIO_GROUP_CONTAINER: &str = "radio-group-container";

/// Marker class a delegate element must carry for this trigger
///
/// Blur is routed through form-field containers instead of a marker class.
pub fn trigger_class(trigger: TriggerKind) -> Option<&'static str> {
    match trigger {
        TriggerKind::Click => Some(CLICK_TRIGGER),
        TriggerKind::Hover => Some(HOVER_TRIGGER),
        TriggerKind::Focus => Some(FOCUS_TRIGGER),
        TriggerKind::Keyup => Some(KEYUP_TRIGGER),
        TriggerKind::Change => Some(SELECT_CHANGE_TRIGGER),
        TriggerKind::Blur => None,
    }
}

/// Tags that count as form fields for completion tracking
pub const FIELD_TAGS: [&str; 3] = ["input", "select", "textarea"];
