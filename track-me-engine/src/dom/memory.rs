//! In-memory document
//!
//! Elements live in an arena indexed by [`ElementId`]. Handles are never
//! reused: removing an element only detaches it, so a replacement element
//! always gets a fresh handle.

use super::Document;
use crate::types::{ElementId, Result, TrackError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Declarative description of an element and its subtree
///
/// Doubles as a builder for tests and as the page format read by the
/// scenario runner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementSpec {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    /// Data attributes without the `data-` prefix
    pub data: BTreeMap<String, String>,
    pub attributes: BTreeMap<String, String>,
    pub checked: bool,
    pub selected: bool,
    pub value: Option<String>,
    pub children: Vec<ElementSpec>,
}

impl ElementSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Default::default()
        }
    }

    /// `<input type="...">`
    pub fn input(kind: &str) -> Self {
        Self::new("input").attr("type", kind)
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn data(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(name.into(), value.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn child(mut self, child: ElementSpec) -> Self {
        self.children.push(child);
        self
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attributes: BTreeMap<String, String>,
    data: BTreeMap<String, String>,
    classes: Vec<String>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    checked: bool,
    selected: bool,
    value: Option<String>,
}

/// Arena-backed document rooted at a `body` element
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    nodes: Vec<Node>,
    ids: HashMap<String, ElementId>,
}

impl MemoryDocument {
    /// Create a document holding only an empty `body`
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                tag: "body".to_string(),
                attributes: BTreeMap::new(),
                data: BTreeMap::new(),
                classes: Vec::new(),
                parent: None,
                children: Vec::new(),
                checked: false,
                selected: false,
                value: None,
            }],
            ids: HashMap::new(),
        }
    }

    /// Build a document whose `body` children are the given specs
    pub fn from_specs(specs: &[ElementSpec]) -> Self {
        let mut doc = Self::new();
        let body = doc.body();
        for spec in specs {
            doc.insert(body, spec);
        }
        doc
    }

    pub fn body(&self) -> ElementId {
        ElementId(0)
    }

    /// Append an element subtree under `parent`, returning the new element
    pub fn append(&mut self, parent: ElementId, spec: ElementSpec) -> Result<ElementId> {
        self.node(parent)?;
        Ok(self.insert(parent, &spec))
    }

    fn insert(&mut self, parent: ElementId, spec: &ElementSpec) -> ElementId {
        let handle = ElementId(self.nodes.len());
        let mut attributes = spec.attributes.clone();
        if let Some(id) = &spec.id {
            attributes.insert("id".to_string(), id.clone());
            self.ids.insert(id.clone(), handle);
        }
        self.nodes.push(Node {
            tag: spec.tag.to_ascii_lowercase(),
            attributes,
            data: spec.data.clone(),
            classes: spec.classes.clone(),
            parent: Some(parent),
            children: Vec::new(),
            checked: spec.checked,
            selected: spec.selected,
            value: spec.value.clone(),
        });
        self.nodes[parent.0].children.push(handle);

        for child in &spec.children {
            self.insert(handle, child);
        }
        handle
    }

    /// Detach an element from the tree; its handle stays valid but unreachable
    pub fn remove(&mut self, element: ElementId) -> Result<()> {
        let parent = self.node(element)?.parent;
        if let Some(parent) = parent {
            self.nodes[parent.0].children.retain(|c| *c != element);
        }
        self.nodes[element.0].parent = None;
        let body = self.body();
        let nodes = &self.nodes;
        self.ids.retain(|_, handle| Self::reaches(nodes, *handle, body));
        Ok(())
    }

    fn reaches(nodes: &[Node], mut element: ElementId, target: ElementId) -> bool {
        loop {
            if element == target {
                return true;
            }
            match nodes[element.0].parent {
                Some(parent) => element = parent,
                None => return false,
            }
        }
    }

    pub fn set_checked(&mut self, element: ElementId, checked: bool) -> Result<()> {
        self.node_mut(element)?.checked = checked;
        Ok(())
    }

    pub fn set_value(&mut self, element: ElementId, value: impl Into<String>) -> Result<()> {
        self.node_mut(element)?.value = Some(value.into());
        Ok(())
    }

    pub fn set_data(&mut self, element: ElementId, name: &str, value: impl Into<String>) -> Result<()> {
        self.node_mut(element)?.data.insert(name.to_string(), value.into());
        Ok(())
    }

    /// Select one option of a single-choice `select`, clearing the others
    pub fn select_option(&mut self, select: ElementId, option: ElementId) -> Result<()> {
        self.node(option)?;
        for el in self.descendants(select) {
            if self.nodes[el.0].tag == "option" {
                self.nodes[el.0].selected = el == option;
            }
        }
        Ok(())
    }

    /// Check a radio and uncheck every other radio sharing its `name`
    pub fn check_radio(&mut self, radio: ElementId) -> Result<()> {
        let name = self.node(radio)?.attributes.get("name").cloned();
        if let Some(name) = name {
            for node in self.nodes.iter_mut() {
                if node.tag == "input" && node.attributes.get("name") == Some(&name) {
                    node.checked = false;
                }
            }
        }
        self.node_mut(radio)?.checked = true;
        Ok(())
    }

    fn node(&self, element: ElementId) -> Result<&Node> {
        self.nodes.get(element.0).ok_or(TrackError::UnknownElement(element))
    }

    fn node_mut(&mut self, element: ElementId) -> Result<&mut Node> {
        self.nodes.get_mut(element.0).ok_or(TrackError::UnknownElement(element))
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl Document for MemoryDocument {
    fn tag_name(&self, element: ElementId) -> Option<&str> {
        self.nodes.get(element.0).map(|n| n.tag.as_str())
    }

    fn attribute(&self, element: ElementId, name: &str) -> Option<&str> {
        self.nodes.get(element.0)?.attributes.get(name).map(String::as_str)
    }

    fn data(&self, element: ElementId, name: &str) -> Option<&str> {
        self.nodes.get(element.0)?.data.get(name).map(String::as_str)
    }

    fn has_class(&self, element: ElementId, class: &str) -> bool {
        self.nodes
            .get(element.0)
            .map(|n| n.classes.iter().any(|c| c == class))
            .unwrap_or(false)
    }

    fn set_class(&mut self, element: ElementId, class: &str, present: bool) {
        if let Some(node) = self.nodes.get_mut(element.0) {
            let has = node.classes.iter().any(|c| c == class);
            if present && !has {
                node.classes.push(class.to_string());
            } else if !present && has {
                node.classes.retain(|c| c != class);
            }
        }
    }

    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.nodes.get(element.0)?.parent
    }

    fn children(&self, element: ElementId) -> Vec<ElementId> {
        self.nodes
            .get(element.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn is_checked(&self, element: ElementId) -> bool {
        self.nodes.get(element.0).map(|n| n.checked).unwrap_or(false)
    }

    fn is_selected(&self, element: ElementId) -> bool {
        self.nodes.get(element.0).map(|n| n.selected).unwrap_or(false)
    }

    fn value(&self, element: ElementId) -> Option<&str> {
        let node = self.nodes.get(element.0)?;
        if node.tag == "select" {
            let option = self.selected_options(element).into_iter().next()?;
            let option = &self.nodes[option.0];
            return option.value.as_deref().or(Some(""));
        }
        node.value.as_deref()
    }

    fn element_by_id(&self, id: &str) -> Option<ElementId> {
        self.ids.get(id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (MemoryDocument, ElementId, ElementId) {
        let mut doc = MemoryDocument::new();
        let body = doc.body();
        let form = doc
            .append(body, ElementSpec::new("form").id("signup").class("outer"))
            .unwrap();
        let input = doc
            .append(form, ElementSpec::input("text").attr("name", "email").value("a@b.c"))
            .unwrap();
        (doc, form, input)
    }

    #[test]
    fn test_traversal() {
        let (doc, form, input) = sample();
        assert_eq!(doc.parent(input), Some(form));
        assert_eq!(doc.closest_tag(input, "form"), Some(form));
        assert_eq!(doc.closest_with_class(input, "outer"), Some(form));
        assert!(doc.contains(doc.body(), input));
        assert_eq!(doc.descendants(doc.body()), vec![form, input]);
        assert_eq!(doc.element_by_id("signup"), Some(form));
        assert_eq!(doc.input_type(input), Some("text"));
        assert_eq!(doc.value(input), Some("a@b.c"));
    }

    #[test]
    fn test_class_mutation() {
        let (mut doc, form, _) = sample();
        doc.set_class(form, "switch-on", true);
        doc.set_class(form, "switch-on", true);
        assert!(doc.has_class(form, "switch-on"));
        doc.set_class(form, "switch-on", false);
        assert!(!doc.has_class(form, "switch-on"));
    }

    #[test]
    fn test_remove_detaches() {
        let (mut doc, form, input) = sample();
        doc.remove(form).unwrap();
        assert!(!doc.contains(doc.body(), input));
        assert_eq!(doc.element_by_id("signup"), None);
        assert!(doc.remove(ElementId(99)).is_err());
    }

    #[test]
    fn test_select_value() {
        let mut doc = MemoryDocument::new();
        let body = doc.body();
        let select = doc
            .append(
                body,
                ElementSpec::new("select")
                    .child(ElementSpec::new("option").value("a").selected(true))
                    .child(ElementSpec::new("option").value("b")),
            )
            .unwrap();
        let options = doc.children(select);
        assert_eq!(doc.value(select), Some("a"));

        doc.select_option(select, options[1]).unwrap();
        assert_eq!(doc.selected_options(select), vec![options[1]]);
        assert_eq!(doc.value(select), Some("b"));
    }
}
