use std::collections::HashMap;

const RED_ZONE: usize = 64 * 1024;
const STACK_GROWTH: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    pub(crate) attrs: HashMap<String, String>,
    pub(crate) classes: Vec<String>,
    pub(crate) style: HashMap<String, String>,
    pub(crate) value: String,
    pub(crate) checked: bool,
}

/// Arena-allocated document tree. Nodes are never freed; detached subtrees
/// simply become unreachable from the root.
#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<Node>,
    root: NodeId,
    id_index: HashMap<String, NodeId>,
}

impl Dom {
    pub(crate) fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            id_index: HashMap::new(),
        }
    }

    pub(crate) fn root(&self) -> NodeId {
        self.root
    }

    fn create_node(&mut self, parent: NodeId, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            node_type,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub(crate) fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: HashMap<String, String>,
    ) -> NodeId {
        let value = attrs.get("value").cloned().unwrap_or_default();
        let checked = attrs.contains_key("checked");
        let classes = attrs
            .get("class")
            .map(|raw| raw.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        let style = attrs
            .get("style")
            .map(|raw| parse_inline_style(raw))
            .unwrap_or_default();
        let element = Element {
            tag_name,
            attrs,
            classes,
            style,
            value,
            checked,
        };
        let id = self.create_node(parent, NodeType::Element(element));
        if let Some(id_attr) = self
            .element(id)
            .and_then(|element| element.attrs.get("id").cloned())
        {
            self.id_index.insert(id_attr, id);
        }
        id
    }

    pub(crate) fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(parent, NodeType::Text(text))
    }

    pub(crate) fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes.get(id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0)?.parent
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|element| element.tag_name.as_str())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attrs.get(name).map(String::as_str)
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|element| element.value.as_str())
    }

    pub fn set_value(&mut self, id: NodeId, value: &str) -> bool {
        match self.element_mut(id) {
            Some(element) => {
                element.value = value.to_string();
                true
            }
            None => false,
        }
    }

    pub fn checked(&self, id: NodeId) -> Option<bool> {
        self.element(id).map(|element| element.checked)
    }

    pub fn set_checked(&mut self, id: NodeId, checked: bool) -> bool {
        match self.element_mut(id) {
            Some(element) => {
                element.checked = checked;
                true
            }
            None => false,
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id)
            .is_some_and(|element| element.classes.iter().any(|existing| existing == class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        if let Some(element) = self.element_mut(id) {
            element.classes.push(class.to_string());
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(element) = self.element_mut(id) {
            element.classes.retain(|existing| existing != class);
        }
    }

    pub fn style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.element(id)?.style.get(property).map(String::as_str)
    }

    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) {
        if let Some(element) = self.element_mut(id) {
            element.style.insert(property.to_string(), value.to_string());
        }
    }

    /// Concatenated text of the node and its descendants, in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        stacker::maybe_grow(RED_ZONE, STACK_GROWTH, || {
            let Some(node) = self.nodes.get(id.0) else {
                return;
            };
            if let NodeType::Text(text) = &node.node_type {
                out.push_str(text);
            }
            for child in &node.children {
                self.collect_text(*child, out);
            }
        });
    }

    /// Replaces the node's children with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        let detached = match self.nodes.get_mut(id.0) {
            Some(node) => std::mem::take(&mut node.children),
            None => return,
        };
        for child in detached {
            if let Some(node) = self.nodes.get_mut(child.0) {
                node.parent = None;
            }
        }
        self.create_text(id, text.to_string());
    }

    /// All element nodes reachable from the root, in document order.
    pub fn elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(id.0) {
                if matches!(node.node_type, NodeType::Element(_)) {
                    out.push(id);
                }
                for child in node.children.iter().rev() {
                    stack.push(*child);
                }
            }
        }
        out
    }
}

fn parse_inline_style(raw: &str) -> HashMap<String, String> {
    let mut style = HashMap::new();
    for declaration in raw.split(';') {
        if let Some((property, value)) = declaration.split_once(':') {
            let property = property.trim();
            let value = value.trim();
            if !property.is_empty() && !value.is_empty() {
                style.insert(property.to_string(), value.to_string());
            }
        }
    }
    style
}
