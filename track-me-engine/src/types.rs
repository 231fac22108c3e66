//! Core types for the tracking engine
//!
//! This module defines the values that flow through the engine: the resolved
//! tracking request, the final (category, action, label) triple handed to the
//! analytics sink, and the outcome of handling one interaction. Non-firing
//! outcomes are plain values, never errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type used by the engine clock
pub type Timestamp = DateTime<Utc>;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, TrackError>;

/// Opaque handle to an element in the host document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors raised by the engine API
///
/// These cover misuse of the API only. An interaction that does not produce
/// a tracking call is reported through [`DispatchOutcome`] instead.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("Unknown element: {0}")]
    UnknownElement(ElementId),

    #[error("No engine attached to root {0}")]
    NotAttached(ElementId),

    #[error("Root {0} already has a tracking engine")]
    AlreadyAttached(ElementId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Error reported by an analytics sink
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Sink unavailable: {0}")]
pub struct SinkError(pub String);

/// DOM interaction that can start a tracking call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Click,
    Hover,
    Focus,
    Blur,
    Keyup,
    Change,
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerKind::Click => write!(f, "click"),
            TriggerKind::Hover => write!(f, "hover"),
            TriggerKind::Focus => write!(f, "focus"),
            TriggerKind::Blur => write!(f, "blur"),
            TriggerKind::Keyup => write!(f, "keyup"),
            TriggerKind::Change => write!(f, "change"),
        }
    }
}

/// Firing policy chosen for an element, in precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Checkbox,
    Radio,
    Switch,
    FormGated,
    SelectChange,
    FormField,
    Default,
}

/// Tracking parameters resolved from an element and its context
///
/// Every field is optional at resolution time. `category`, `action` and
/// `label` are required only when the triple is about to reach the sink.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingRequest {
    pub category: Option<String>,
    pub action: Option<String>,
    pub label: Option<String>,
    pub label_checked: Option<String>,
    pub label_not_checked: Option<String>,
    pub label_on: Option<String>,
    pub label_off: Option<String>,
    /// Name of the broadcast event the call waits for
    pub defer_until_event: Option<String>,
    /// Id of the form whose validity gates the call
    pub form_gate_id: Option<String>,
    /// Element that supplied the action, when it came from elsewhere
    #[serde(skip)]
    pub action_source: Option<ElementId>,
}

impl TrackingRequest {
    /// Replace the label, keeping everything else
    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }

    /// Build the sink triple if category, action and label are all usable
    pub fn to_event(&self) -> Option<TrackedEvent> {
        Some(TrackedEvent {
            category: usable(self.category.as_deref())?.to_string(),
            action: usable(self.action.as_deref())?.to_string(),
            label: usable(self.label.as_deref())?.to_string(),
        })
    }
}

/// A value is usable when it is present, non-empty and not the text "undefined"
pub fn usable(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty() && *v != "undefined")
}

/// The final (category, action, label) triple sent to the analytics sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedEvent {
    pub category: String,
    pub action: String,
    pub label: String,
}

impl TrackedEvent {
    pub fn new(category: impl Into<String>, action: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            action: action.into(),
            label: label.into(),
        }
    }
}

impl fmt::Display for TrackedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.category, self.action, self.label)
    }
}

/// Why an interaction did not reach the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Category, action or label missing at dispatch time
    IncompleteRequest,
    /// Gating form or consent check failed
    GateFailed,
    /// One-shot guard already set
    AlreadyTracked,
    /// Field completed but completion events are disabled
    NotReported,
}

/// Result of handling one interaction or broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The triple was handed to the sink
    Dispatched(TrackedEvent),
    /// A deferred call is waiting for the named event
    Armed(String),
    /// Nothing was sent
    Dropped(DropReason),
    /// No delegate element matched the interaction
    Ignored,
}

impl DispatchOutcome {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, DispatchOutcome::Dispatched(_))
    }

    /// The dispatched triple, if any
    pub fn event(&self) -> Option<&TrackedEvent> {
        match self {
            DispatchOutcome::Dispatched(event) => Some(event),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usable_values() {
        assert_eq!(usable(Some("shop")), Some("shop"));
        assert_eq!(usable(Some("")), None);
        assert_eq!(usable(Some("undefined")), None);
        assert_eq!(usable(None), None);
    }

    #[test]
    fn test_request_to_event() {
        let request = TrackingRequest {
            category: Some("shop".into()),
            action: Some("home".into()),
            label: Some("banner".into()),
            ..Default::default()
        };
        assert_eq!(request.to_event(), Some(TrackedEvent::new("shop", "home", "banner")));

        let missing_label = request.clone().with_label(Some("undefined".into()));
        assert_eq!(missing_label.to_event(), None);
    }

    #[test]
    fn test_trigger_display() {
        assert_eq!(format!("{}", TriggerKind::Keyup), "keyup");
        assert_eq!(format!("{}", TrackedEvent::new("a", "b", "c")), "a / b / c");
    }
}
