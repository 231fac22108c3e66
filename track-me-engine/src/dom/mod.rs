//! Host document abstraction
//!
//! The engine never talks to a browser directly. Everything it needs from
//! the page goes through the [`Document`] trait, which hands out opaque
//! [`ElementId`] handles. [`MemoryDocument`] is an in-memory implementation
//! used by tests and by the scenario runner.

pub mod memory;

pub use memory::{ElementSpec, MemoryDocument};

use crate::types::ElementId;

/// Read and (narrowly) mutate the host document
pub trait Document {
    /// Lowercase tag name, `None` for an unknown handle
    fn tag_name(&self, element: ElementId) -> Option<&str>;

    /// Native attribute such as `name`, `type`, `href` or `id`
    fn attribute(&self, element: ElementId, name: &str) -> Option<&str>;

    /// Declarative data attribute, looked up without the `data-` prefix
    fn data(&self, element: ElementId, name: &str) -> Option<&str>;

    fn has_class(&self, element: ElementId, class: &str) -> bool;

    /// Add or remove a class
    fn set_class(&mut self, element: ElementId, class: &str, present: bool);

    fn parent(&self, element: ElementId) -> Option<ElementId>;

    fn children(&self, element: ElementId) -> Vec<ElementId>;

    fn is_checked(&self, element: ElementId) -> bool;

    /// Selected state of an `option`
    fn is_selected(&self, element: ElementId) -> bool;

    /// Current value of a form control
    fn value(&self, element: ElementId) -> Option<&str>;

    fn element_by_id(&self, id: &str) -> Option<ElementId>;

    /// `type` of an `input`, lowercased by the implementation
    fn input_type(&self, element: ElementId) -> Option<&str> {
        match self.tag_name(element) {
            Some("input") => Some(self.attribute(element, "type").unwrap_or("text")),
            _ => None,
        }
    }

    fn is_input_of_type(&self, element: ElementId, kind: &str) -> bool {
        self.input_type(element)
            .map(|t| t.eq_ignore_ascii_case(kind))
            .unwrap_or(false)
    }

    /// Closest ancestor-or-self matching the predicate
    fn closest(&self, element: ElementId, matches: &dyn Fn(ElementId) -> bool) -> Option<ElementId> {
        let mut current = Some(element);
        while let Some(el) = current {
            if matches(el) {
                return Some(el);
            }
            current = self.parent(el);
        }
        None
    }

    fn closest_with_class(&self, element: ElementId, class: &str) -> Option<ElementId> {
        self.closest(element, &|el| self.has_class(el, class))
    }

    fn closest_tag(&self, element: ElementId, tag: &str) -> Option<ElementId> {
        self.closest(element, &|el| self.tag_name(el) == Some(tag))
    }

    /// True if `element` is `ancestor` or sits somewhere below it
    fn contains(&self, ancestor: ElementId, element: ElementId) -> bool {
        self.closest(element, &|el| el == ancestor).is_some()
    }

    /// All elements below `element` in document order
    fn descendants(&self, element: ElementId) -> Vec<ElementId> {
        let mut found = Vec::new();
        let mut stack: Vec<ElementId> = self.children(element).into_iter().rev().collect();
        while let Some(el) = stack.pop() {
            found.push(el);
            stack.extend(self.children(el).into_iter().rev());
        }
        found
    }

    /// Currently selected `option` elements inside a `select`
    fn selected_options(&self, select: ElementId) -> Vec<ElementId> {
        self.descendants(select)
            .into_iter()
            .filter(|el| self.tag_name(*el) == Some("option") && self.is_selected(*el))
            .collect()
    }
}
