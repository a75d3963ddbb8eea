use std::collections::{BTreeMap, HashMap};

use elementscan_core_types::{NodeId, Rect};

use crate::errors::DomError;
use crate::spec::ElementSpec;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    ShadowRoot,
    Element,
}

#[derive(Clone, Debug)]
pub(crate) struct NodeRecord {
    pub kind: NodeKind,
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub rect: Option<Rect>,
    pub style: BTreeMap<String, String>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub shadow_root: Option<NodeId>,
    pub content_document: Option<NodeId>,
    /// Set on shadow roots and frame documents.
    pub host: Option<NodeId>,
}

impl NodeRecord {
    fn scope_root(kind: NodeKind, host: Option<NodeId>) -> Self {
        let tag = match kind {
            NodeKind::Document => "#document",
            NodeKind::ShadowRoot => "#shadow-root",
            NodeKind::Element => "",
        };
        Self {
            kind,
            tag: tag.to_string(),
            attributes: BTreeMap::new(),
            text: String::new(),
            rect: None,
            style: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
            shadow_root: None,
            content_document: None,
            host,
        }
    }

    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Arena of nodes. Ids are handed out monotonically and never reused.
pub(crate) struct Tree {
    nodes: HashMap<NodeId, NodeRecord>,
    next_id: u64,
    root: NodeId,
}

impl Tree {
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: HashMap::new(),
            next_id: 0,
            root: NodeId(0),
        };
        tree.root = tree.insert(NodeRecord::scope_root(NodeKind::Document, None));
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn insert(&mut self, record: NodeRecord) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, record);
        id
    }

    pub fn get(&self, id: NodeId) -> Result<&NodeRecord, DomError> {
        self.nodes.get(&id).ok_or(DomError::NodeNotFound(id))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut NodeRecord, DomError> {
        self.nodes.get_mut(&id).ok_or(DomError::NodeNotFound(id))
    }

    pub fn element(&self, id: NodeId) -> Result<&NodeRecord, DomError> {
        let record = self.get(id)?;
        if record.is_element() {
            Ok(record)
        } else {
            Err(DomError::NotAnElement(id))
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Parent when it is an element; scope roots terminate the walk.
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get(&id)?.parent?;
        self.nodes
            .get(&parent)
            .filter(|record| record.is_element())
            .map(|_| parent)
    }

    pub fn scope_root_of(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let record = self.nodes.get(&current)?;
            if !record.is_element() {
                return Some(current);
            }
            current = record.parent?;
        }
    }

    /// Element ancestors inside the same scope, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent_element(id);
        while let Some(node) = current {
            out.push(node);
            current = self.parent_element(node);
        }
        out
    }

    /// Element descendants of `scope` in document order, not crossing scope boundaries.
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.nodes.get(&scope) {
            Some(record) => record.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(node) = stack.pop() {
            let Some(record) = self.nodes.get(&node) else {
                continue;
            };
            if record.is_element() {
                out.push(node);
            }
            stack.extend(record.children.iter().rev().copied());
        }
        out
    }

    /// 1-based position among same-tag element siblings, plus the size of that group.
    pub fn same_type_position(&self, id: NodeId) -> Result<(usize, usize), DomError> {
        let record = self.element(id)?;
        let Some(parent) = record.parent else {
            return Ok((1, 1));
        };
        let siblings = &self.get(parent)?.children;
        let mut index = 0;
        let mut count = 0;
        for sibling in siblings {
            let Some(other) = self.nodes.get(sibling) else {
                continue;
            };
            if other.is_element() && other.tag == record.tag {
                count += 1;
                if *sibling == id {
                    index = count;
                }
            }
        }
        Ok((index, count))
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        if let Some(record) = self.nodes.get(&id) {
            if !record.text.trim().is_empty() {
                parts.push(record.text.trim().to_string());
            }
        }
        for node in self.descendants(id) {
            if let Some(record) = self.nodes.get(&node) {
                let trimmed = record.text.trim();
                if !trimmed.is_empty() {
                    parts.push(trimmed.to_string());
                }
            }
        }
        parts
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Inserts `spec` as the last child of `parent`. Returns the new subtree root and every
    /// element created, in document order.
    pub fn append(
        &mut self,
        parent: NodeId,
        spec: &ElementSpec,
    ) -> Result<(NodeId, Vec<NodeId>), DomError> {
        self.get(parent)?;
        let mut created = Vec::new();
        let id = self.build(parent, spec, &mut created)?;
        self.get_mut(parent)?.children.push(id);
        Ok((id, created))
    }

    fn build(
        &mut self,
        parent: NodeId,
        spec: &ElementSpec,
        created: &mut Vec<NodeId>,
    ) -> Result<NodeId, DomError> {
        let id = self.insert(NodeRecord {
            kind: NodeKind::Element,
            tag: spec.tag.to_ascii_lowercase(),
            attributes: spec
                .attributes
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
                .collect(),
            text: spec.text.clone().unwrap_or_default(),
            rect: spec.rect,
            style: spec
                .style
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
                .collect(),
            parent: Some(parent),
            children: Vec::new(),
            shadow_root: None,
            content_document: None,
            host: None,
        });
        created.push(id);

        for child in &spec.children {
            let child_id = self.build(id, child, created)?;
            self.get_mut(id)?.children.push(child_id);
        }

        if let Some(shadow_children) = &spec.shadow_root {
            let root = self.insert(NodeRecord::scope_root(NodeKind::ShadowRoot, Some(id)));
            self.get_mut(id)?.shadow_root = Some(root);
            for child in shadow_children {
                let child_id = self.build(root, child, created)?;
                self.get_mut(root)?.children.push(child_id);
            }
        }

        if let Some(frame_root) = &spec.frame {
            let document = self.insert(NodeRecord::scope_root(NodeKind::Document, Some(id)));
            self.get_mut(id)?.content_document = Some(document);
            let child_id = self.build(document, frame_root, created)?;
            self.get_mut(document)?.children.push(child_id);
        }

        Ok(id)
    }

    /// Detaches `id` and drops its whole subtree, nested scopes included. Returns the
    /// removed elements in document order.
    pub fn remove(&mut self, id: NodeId) -> Result<Vec<NodeId>, DomError> {
        let record = self.element(id)?;
        let parent = record.parent;
        let mut removed = Vec::new();
        self.collect_subtree(id, &mut removed);
        if let Some(parent) = parent {
            if let Ok(parent_record) = self.get_mut(parent) {
                parent_record.children.retain(|child| *child != id);
            }
        }
        let elements: Vec<NodeId> = removed
            .iter()
            .copied()
            .filter(|node| self.nodes.get(node).map_or(false, NodeRecord::is_element))
            .collect();
        for node in removed {
            self.nodes.remove(&node);
        }
        Ok(elements)
    }

    fn collect_subtree(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let Some(record) = self.nodes.get(&id) else {
            return;
        };
        out.push(id);
        for child in &record.children {
            self.collect_subtree(*child, out);
        }
        if let Some(shadow) = record.shadow_root {
            self.collect_subtree(shadow, out);
        }
        if let Some(document) = record.content_document {
            self.collect_subtree(document, out);
        }
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let record = self.get_mut(id)?;
        if !record.is_element() {
            return Err(DomError::NotAnElement(id));
        }
        record
            .attributes
            .insert(name.to_ascii_lowercase(), value.to_string());
        Ok(())
    }

    pub fn set_rect(&mut self, id: NodeId, rect: Option<Rect>) -> Result<(), DomError> {
        let record = self.get_mut(id)?;
        if !record.is_element() {
            return Err(DomError::NotAnElement(id));
        }
        record.rect = rect;
        Ok(())
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<(), DomError> {
        let record = self.get_mut(id)?;
        if !record.is_element() {
            return Err(DomError::NotAnElement(id));
        }
        record.text = text.to_string();
        Ok(())
    }
}
