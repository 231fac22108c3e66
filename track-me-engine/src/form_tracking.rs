//! Form-field completion tracking
//!
//! Every required field inside a form-field container runs its own small
//! state machine (Untouched -> Tracked) driven by blur:
//!
//! - empty value: report "<form name> <skipped> <field name>"
//! - invalid value: report "<form name> <not valid> <field name>"
//! - otherwise, if completion events are enabled: report "<form name> <completed> <field name>"
//!
//! With `one_time_only` the field moves to Tracked after the first blur,
//! whichever branch was taken.

use crate::config::FormTrackingConfig;
use crate::dom::Document;
use crate::markers;
use crate::resolver::FormFieldRequest;
use crate::sink::FormValidator;
use crate::types::{DropReason, ElementId, TrackingRequest};

/// Result of one blur on a required field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBlur {
    /// Request to dispatch, or why nothing is reported
    pub report: Result<TrackingRequest, DropReason>,
    /// Whether the field's one-shot guard must be set
    pub mark_tracked: bool,
}

/// True for a required `input`/`select`/`textarea` inside a form-field container
pub fn is_required_field(doc: &dyn Document, element: ElementId) -> bool {
    let is_field = doc
        .tag_name(element)
        .map(|tag| markers::FIELD_TAGS.contains(&tag))
        .unwrap_or(false);
    is_field
        && doc.data(element, markers::VAL_REQUIRED).is_some()
        && doc
            .closest_with_class(element, markers::FORM_FIELD_CONTAINER)
            .is_some()
}

pub struct FormFieldTracker<'a> {
    pub doc: &'a dyn Document,
    pub validator: &'a dyn FormValidator,
    pub config: &'a FormTrackingConfig,
}

impl<'a> FormFieldTracker<'a> {
    /// Evaluate a blur on `field`
    pub fn on_blur(&self, field: ElementId, already_tracked: bool, resolved: FormFieldRequest) -> FieldBlur {
        if already_tracked {
            return FieldBlur {
                report: Err(DropReason::AlreadyTracked),
                mark_tracked: false,
            };
        }

        let suffix = if self.is_empty(field) {
            Some(&self.config.label_skipped)
        } else if !self.validator.field_is_valid(self.doc, field) {
            Some(&self.config.label_not_valid)
        } else if self.config.completed_events {
            Some(&self.config.label_completed)
        } else {
            None
        };

        let report = match suffix {
            Some(suffix) => {
                let label = completion_label(
                    resolved.request.label.as_deref(),
                    suffix,
                    resolved.field_name.as_deref(),
                );
                Ok(resolved.request.with_label(label))
            }
            None => Err(DropReason::NotReported),
        };

        FieldBlur {
            report,
            mark_tracked: self.config.one_time_only,
        }
    }

    fn is_empty(&self, field: ElementId) -> bool {
        if self.doc.is_input_of_type(field, "checkbox") || self.doc.is_input_of_type(field, "radio") {
            return !self.doc.is_checked(field);
        }
        self.doc.value(field).map(str::trim).unwrap_or_default().is_empty()
    }
}

/// "<base> <suffix> <field>"; no base means no label
fn completion_label(base: Option<&str>, suffix: &str, field: Option<&str>) -> Option<String> {
    let base = base?;
    let parts: Vec<&str> = [Some(base), Some(suffix), field]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect();
    Some(parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ElementSpec, MemoryDocument};
    use crate::sink::ValidationRules;

    fn resolved(label: Option<&str>, field: Option<&str>) -> FormFieldRequest {
        FormFieldRequest {
            request: TrackingRequest {
                category: Some("c".into()),
                action: Some("a".into()),
                label: label.map(str::to_string),
                ..Default::default()
            },
            field_name: field.map(str::to_string),
            form: None,
        }
    }

    fn page() -> (MemoryDocument, Vec<ElementId>) {
        let doc = MemoryDocument::from_specs(&[ElementSpec::new("form").child(
            ElementSpec::new("div")
                .class("form-field-container")
                .child(ElementSpec::input("text").data("val-required", ""))
                .child(ElementSpec::input("text").data("val-required", "").value("x"))
                .child(ElementSpec::input("text")),
        )]);
        let fields = doc.descendants(doc.body())[2..].to_vec();
        (doc, fields)
    }

    #[test]
    fn test_required_detection() {
        let (doc, fields) = page();
        assert!(is_required_field(&doc, fields[0]));
        assert!(is_required_field(&doc, fields[1]));
        assert!(!is_required_field(&doc, fields[2]));
    }

    #[test]
    fn test_blur_branches() {
        let (doc, fields) = page();
        let rules = ValidationRules::new();
        let config = FormTrackingConfig::default();
        let tracker = FormFieldTracker {
            doc: &doc,
            validator: &rules,
            config: &config,
        };

        let skipped = tracker.on_blur(fields[0], false, resolved(Some("signup"), Some("email")));
        assert_eq!(skipped.report.unwrap().label.as_deref(), Some("signup skipped email"));
        assert!(skipped.mark_tracked);

        // Valid and non-empty, completion events disabled
        let silent = tracker.on_blur(fields[1], false, resolved(Some("signup"), Some("name")));
        assert_eq!(silent.report, Err(DropReason::NotReported));
        assert!(silent.mark_tracked);

        rules.set_valid(fields[1], false);
        let invalid = tracker.on_blur(fields[1], false, resolved(Some("signup"), Some("name")));
        assert_eq!(invalid.report.unwrap().label.as_deref(), Some("signup not valid name"));

        let again = tracker.on_blur(fields[0], true, resolved(Some("signup"), Some("email")));
        assert_eq!(again.report, Err(DropReason::AlreadyTracked));
    }

    #[test]
    fn test_completed_events() {
        let (doc, fields) = page();
        let rules = ValidationRules::new();
        let config = FormTrackingConfig::default()
            .with_completed_events(true)
            .with_one_time_only(false);
        let tracker = FormFieldTracker {
            doc: &doc,
            validator: &rules,
            config: &config,
        };

        let done = tracker.on_blur(fields[1], false, resolved(Some("signup"), None));
        assert_eq!(done.report.unwrap().label.as_deref(), Some("signup completed"));
        assert!(!done.mark_tracked);
    }

    #[test]
    fn test_completion_label() {
        assert_eq!(completion_label(None, "skipped", Some("email")), None);
        assert_eq!(
            completion_label(Some("form"), "skipped", Some("")),
            Some("form skipped".to_string())
        );
    }
}
