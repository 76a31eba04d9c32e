//! Target label resolution
//!
//! Recorders reference elements by snapshot node id, by an inline descriptor
//! object, or by a ready-made label string. [`NodeRegistry`] keeps what the
//! full snapshot and later mutations revealed about each node so every form
//! can be turned into a short label such as `button "Sign up"` or
//! `input#email`.

use crate::session::types::{PAGE_TARGET, UNKNOWN_TARGET};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Element ancestors that receive a text node's content
const TEXT_ANCESTOR_DEPTH: usize = 3;

/// Upper bound on text collected per element before labels are truncated
const MAX_COLLECTED_TEXT_CHARS: usize = 200;

/// Snapshot node type codes
const NODE_DOCUMENT: u64 = 0;
const NODE_ELEMENT: u64 = 2;
const NODE_TEXT: u64 = 3;

/// What is known about one element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetDescriptor {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub text: Option<String>,
    pub aria_label: Option<String>,
    pub placeholder: Option<String>,
    pub name: Option<String>,
    pub input_type: Option<String>,
    pub role: Option<String>,
    pub alt: Option<String>,
    pub title: Option<String>,
}

impl TargetDescriptor {
    /// Build a descriptor from an inline `data.target` object
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        let text_field = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| obj.get(*k).and_then(Value::as_str))
                .map(collapse_whitespace)
                .filter(|s| !s.is_empty())
        };

        let classes = match obj.get("classes") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => text_field(&["className", "class"])
                .map(|c| c.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        };

        TargetDescriptor {
            tag: text_field(&["tag", "tagName"])
                .map(|t| t.to_lowercase())
                .unwrap_or_default(),
            id: text_field(&["id"]),
            classes,
            text: text_field(&["text", "textContent", "innerText"]),
            aria_label: text_field(&["ariaLabel", "aria-label", "label"]),
            placeholder: text_field(&["placeholder"]),
            name: text_field(&["name"]),
            input_type: text_field(&["type"]).map(|t| t.to_lowercase()),
            role: text_field(&["role"]),
            alt: text_field(&["alt"]),
            title: text_field(&["title"]),
        }
    }

    /// Build a descriptor from a snapshot element node
    fn from_element(node: &Value) -> Self {
        let mut descriptor = TargetDescriptor {
            tag: node
                .get("tagName")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_lowercase(),
            ..Default::default()
        };
        if let Some(attributes) = node.get("attributes").and_then(Value::as_object) {
            for (key, value) in attributes {
                descriptor.apply_attribute(key, value);
            }
        }
        descriptor
    }

    /// Apply one DOM attribute; `null` removes it
    fn apply_attribute(&mut self, key: &str, value: &Value) {
        let value = value
            .as_str()
            .map(collapse_whitespace)
            .filter(|s| !s.is_empty());
        match key {
            "id" => self.id = value,
            "class" => {
                self.classes = value
                    .map(|c| c.split_whitespace().map(str::to_string).collect())
                    .unwrap_or_default()
            }
            "aria-label" => self.aria_label = value,
            "placeholder" => self.placeholder = value,
            "name" => self.name = value,
            "type" => self.input_type = value.map(|t| t.to_lowercase()),
            "role" => self.role = value,
            "alt" => self.alt = value,
            "title" => self.title = value,
            _ => {}
        }
    }

    fn append_text(&mut self, text: &str) {
        let current = self.text.get_or_insert_with(String::new);
        if current.chars().count() >= MAX_COLLECTED_TEXT_CHARS {
            return;
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(text);
    }

    /// Human-facing role for the element
    fn role_name(&self) -> String {
        if let Some(role) = &self.role {
            return role.clone();
        }
        match self.tag.as_str() {
            "a" => "link".to_string(),
            "button" => "button".to_string(),
            "input" => match self.input_type.as_deref() {
                Some("submit") | Some("button") | Some("reset") | Some("image") => {
                    "button".to_string()
                }
                Some("checkbox") => "checkbox".to_string(),
                Some("radio") => "radio button".to_string(),
                _ => "input".to_string(),
            },
            "textarea" => "text area".to_string(),
            "select" => "dropdown".to_string(),
            "img" => "image".to_string(),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "heading".to_string(),
            "" => "element".to_string(),
            tag => tag.to_string(),
        }
    }

    /// Render the label, or `None` when nothing identifies the element
    ///
    /// Precedence: aria-label, visible text, placeholder, name, alt, title,
    /// then `tag#id`, `tag.class` and finally the bare tag.
    pub fn label(&self, max_chars: usize) -> Option<String> {
        let accessible_name = self
            .aria_label
            .as_ref()
            .or(self.text.as_ref())
            .or(self.placeholder.as_ref())
            .or(self.name.as_ref())
            .or(self.alt.as_ref())
            .or(self.title.as_ref());

        if let Some(name) = accessible_name {
            return Some(format!(
                "{} \"{}\"",
                self.role_name(),
                truncate_label(name, max_chars)
            ));
        }
        if self.tag.is_empty() {
            return None;
        }
        if let Some(id) = &self.id {
            return Some(format!("{}#{}", self.tag, id));
        }
        if let Some(class) = self.classes.first() {
            return Some(format!("{}.{}", self.tag, class));
        }
        Some(self.tag.clone())
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Document,
    Element(TargetDescriptor),
    Text,
}

#[derive(Debug, Clone)]
struct RegisteredNode {
    kind: NodeKind,
    parent: Option<u64>,
}

/// Registry of snapshot nodes, keyed by recorder node id
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: HashMap<u64, RegisteredNode>,
    page_title: Option<String>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes currently known
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Text of the document's `<title>`, if a snapshot carried one
    pub fn page_title(&self) -> Option<&str> {
        self.page_title.as_deref()
    }

    /// Replace the registry with the tree of a full snapshot (`data.node`)
    pub fn load_snapshot(&mut self, data: &Value) {
        self.nodes.clear();
        if let Some(root) = data.get("node") {
            self.register_tree(root, None);
        }
    }

    /// Apply an incremental mutation: added nodes, text and attribute changes
    pub fn apply_mutation(&mut self, data: &Value) {
        if let Some(adds) = data.get("adds").and_then(Value::as_array) {
            for add in adds {
                if let Some(node) = add.get("node") {
                    let parent = add.get("parentId").and_then(Value::as_u64);
                    self.register_tree(node, parent);
                }
            }
        }

        if let Some(texts) = data.get("texts").and_then(Value::as_array) {
            for change in texts {
                let (Some(id), Some(value)) = (
                    change.get("id").and_then(Value::as_u64),
                    change.get("value").and_then(Value::as_str),
                ) else {
                    continue;
                };
                let owner = match self.nodes.get(&id) {
                    Some(RegisteredNode {
                        kind: NodeKind::Text,
                        parent,
                    }) => *parent,
                    Some(_) => Some(id),
                    None => None,
                };
                if let Some(RegisteredNode {
                    kind: NodeKind::Element(descriptor),
                    ..
                }) = owner.and_then(|owner| self.nodes.get_mut(&owner))
                {
                    let text = collapse_whitespace(value);
                    descriptor.text = (!text.is_empty()).then_some(text);
                }
            }
        }

        if let Some(attributes) = data.get("attributes").and_then(Value::as_array) {
            for change in attributes {
                let Some(id) = change.get("id").and_then(Value::as_u64) else {
                    continue;
                };
                let Some(RegisteredNode {
                    kind: NodeKind::Element(descriptor),
                    ..
                }) = self.nodes.get_mut(&id)
                else {
                    continue;
                };
                if let Some(map) = change.get("attributes").and_then(Value::as_object) {
                    for (key, value) in map {
                        descriptor.apply_attribute(key, value);
                    }
                }
            }
        }
    }

    /// Label for a node id; the document itself is the page
    pub fn label_for_node(&self, id: u64, max_chars: usize) -> Option<String> {
        match &self.nodes.get(&id)?.kind {
            NodeKind::Document => Some(PAGE_TARGET.to_string()),
            NodeKind::Element(descriptor) => descriptor.label(max_chars),
            NodeKind::Text => None,
        }
    }

    /// Resolve the target referenced by an event payload
    ///
    /// A literal `target` string wins, then an inline descriptor object, then
    /// the node id. Anything else is the unknown-element placeholder.
    pub fn resolve(&self, data: &Value, max_chars: usize) -> String {
        match data.get("target") {
            Some(Value::String(label)) => {
                let label = collapse_whitespace(label);
                if !label.is_empty() {
                    return truncate_label(&label, max_chars);
                }
            }
            Some(Value::Object(obj)) => {
                if let Some(label) = TargetDescriptor::from_object(obj).label(max_chars) {
                    return label;
                }
            }
            _ => {}
        }

        data.get("id")
            .and_then(Value::as_u64)
            .and_then(|id| self.label_for_node(id, max_chars))
            .unwrap_or_else(|| UNKNOWN_TARGET.to_string())
    }

    /// Depth-first walk with an explicit stack; recorder trees can be deep
    fn register_tree(&mut self, root: &Value, parent: Option<u64>) {
        let mut stack = vec![(root, parent)];
        while let Some((node, parent)) = stack.pop() {
            let Some(id) = node.get("id").and_then(Value::as_u64) else {
                continue;
            };

            match node.get("type").and_then(Value::as_u64) {
                Some(NODE_DOCUMENT) => {
                    self.nodes.insert(
                        id,
                        RegisteredNode {
                            kind: NodeKind::Document,
                            parent: None,
                        },
                    );
                }
                Some(NODE_ELEMENT) => {
                    self.nodes.insert(
                        id,
                        RegisteredNode {
                            kind: NodeKind::Element(TargetDescriptor::from_element(node)),
                            parent,
                        },
                    );
                }
                Some(NODE_TEXT) => {
                    self.nodes.insert(
                        id,
                        RegisteredNode {
                            kind: NodeKind::Text,
                            parent,
                        },
                    );
                    if let Some(text) = node.get("textContent").and_then(Value::as_str) {
                        self.attribute_text(parent, text);
                    }
                }
                _ => {}
            }

            if let Some(children) = node.get("childNodes").and_then(Value::as_array) {
                // Reversed so children pop in document order
                for child in children.iter().rev() {
                    stack.push((child, Some(id)));
                }
            }
        }
    }

    /// Credit a text node's content to its nearest element ancestors
    fn attribute_text(&mut self, parent: Option<u64>, raw: &str) {
        let text = collapse_whitespace(raw);
        if text.is_empty() {
            return;
        }

        if let Some(RegisteredNode {
            kind: NodeKind::Element(descriptor),
            ..
        }) = parent.and_then(|id| self.nodes.get(&id))
        {
            match descriptor.tag.as_str() {
                "script" | "style" | "noscript" => return,
                "title" => {
                    if self.page_title.is_none() {
                        self.page_title = Some(text);
                    }
                    return;
                }
                _ => {}
            }
        }

        let mut current = parent;
        for _ in 0..TEXT_ANCESTOR_DEPTH {
            let Some(id) = current else { break };
            let Some(node) = self.nodes.get_mut(&id) else {
                break;
            };
            let NodeKind::Element(descriptor) = &mut node.kind else {
                break;
            };
            descriptor.append_text(&text);
            current = node.parent;
        }
    }
}

/// Collapse runs of whitespace into single spaces and trim
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to `max_chars` characters, marking the cut with an ellipsis
pub fn truncate_label(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars).collect();
    out = out.trim_end().to_string();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn snapshot() -> Value {
        json!({
            "node": {
                "type": 0, "id": 1, "childNodes": [
                    { "type": 2, "id": 2, "tagName": "html", "attributes": {}, "childNodes": [
                        { "type": 2, "id": 3, "tagName": "head", "attributes": {}, "childNodes": [
                            { "type": 2, "id": 4, "tagName": "title", "attributes": {}, "childNodes": [
                                { "type": 3, "id": 5, "textContent": "Acme Pricing" }
                            ]}
                        ]},
                        { "type": 2, "id": 6, "tagName": "body", "attributes": {}, "childNodes": [
                            { "type": 2, "id": 7, "tagName": "button", "attributes": { "class": "btn primary" }, "childNodes": [
                                { "type": 3, "id": 8, "textContent": "  Sign\n up " }
                            ]},
                            { "type": 2, "id": 9, "tagName": "input", "attributes": { "id": "email", "type": "email" }, "childNodes": [] },
                            { "type": 2, "id": 10, "tagName": "a", "attributes": { "href": "/pricing" }, "childNodes": [
                                { "type": 3, "id": 11, "textContent": "Pricing" }
                            ]},
                            { "type": 2, "id": 12, "tagName": "div", "attributes": { "class": "menu-icon x" }, "childNodes": [] },
                            { "type": 2, "id": 13, "tagName": "script", "attributes": {}, "childNodes": [
                                { "type": 3, "id": 14, "textContent": "var x = 1;" }
                            ]}
                        ]}
                    ]}
                ]
            }
        })
    }

    fn registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        registry.load_snapshot(&snapshot());
        registry
    }

    #[test]
    fn test_snapshot_labels() {
        let registry = registry();
        assert_eq!(registry.label_for_node(7, 40).as_deref(), Some("button \"Sign up\""));
        assert_eq!(registry.label_for_node(9, 40).as_deref(), Some("input#email"));
        assert_eq!(registry.label_for_node(10, 40).as_deref(), Some("link \"Pricing\""));
        assert_eq!(registry.label_for_node(12, 40).as_deref(), Some("div.menu-icon"));
        assert_eq!(registry.label_for_node(1, 40).as_deref(), Some("page"));
        assert_eq!(registry.page_title(), Some("Acme Pricing"));
    }

    #[test]
    fn test_script_text_not_used() {
        let registry = registry();
        assert_eq!(registry.label_for_node(13, 40).as_deref(), Some("script"));
    }

    #[test]
    fn test_resolve_precedence() {
        let registry = registry();
        assert_eq!(
            registry.resolve(&json!({ "id": 7, "target": "Submit button" }), 40),
            "Submit button"
        );
        assert_eq!(
            registry.resolve(&json!({ "target": { "tag": "BUTTON", "ariaLabel": "Close", "text": "X" } }), 40),
            "button \"Close\""
        );
        assert_eq!(registry.resolve(&json!({ "id": 7 }), 40), "button \"Sign up\"");
        assert_eq!(registry.resolve(&json!({ "id": 999 }), 40), UNKNOWN_TARGET);
        assert_eq!(registry.resolve(&json!({}), 40), UNKNOWN_TARGET);
    }

    #[test]
    fn test_mutation_adds_and_updates() {
        let mut registry = registry();
        registry.apply_mutation(&json!({
            "adds": [{
                "parentId": 6,
                "node": { "type": 2, "id": 20, "tagName": "div", "attributes": { "role": "dialog" }, "childNodes": [
                    { "type": 3, "id": 21, "textContent": "Saved" }
                ]}
            }],
            "texts": [{ "id": 11, "value": "Plans" }],
            "attributes": [{ "id": 9, "attributes": { "placeholder": "you@example.com" } }]
        }));

        assert_eq!(registry.label_for_node(20, 40).as_deref(), Some("dialog \"Saved\""));
        assert_eq!(registry.label_for_node(10, 40).as_deref(), Some("link \"Plans\""));
        assert_eq!(registry.label_for_node(9, 40).as_deref(), Some("input \"you@example.com\""));
    }

    #[test]
    fn test_truncation() {
        assert_eq!(truncate_label("short", 40), "short");
        assert_eq!(truncate_label("abcdefghij", 4), "abcd…");
        let descriptor = TargetDescriptor {
            tag: "button".to_string(),
            text: Some("Start your free fourteen day trial of the product today".to_string()),
            ..Default::default()
        };
        let label = descriptor.label(20).unwrap();
        assert_eq!(label, "button \"Start your free four…\"");
    }

    #[test]
    fn test_descriptor_without_tag_or_name() {
        let descriptor = TargetDescriptor::from_object(&Map::new());
        assert_eq!(descriptor.label(40), None);
    }
}
