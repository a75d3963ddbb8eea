use std::collections::BTreeMap;

use elementscan_core_types::{NodeId, Rect, Viewport};
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::errors::DomError;
use crate::events::{mutation_bus, MutatedNode, MutationBus, MutationRecord, MutationStream};
use crate::selector::{self, matcher};
use crate::spec::{DocumentSnapshot, ElementSpec};
use crate::tree::{NodeKind, Tree};

const MUTATION_BUFFER: usize = 256;

/// Read-only copy of one element at the moment it was described.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeView {
    pub id: NodeId,
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub rect: Option<Rect>,
    pub style: BTreeMap<String, String>,
    pub parent: Option<NodeId>,
    pub scope_root: NodeId,
    pub shadow_root: Option<NodeId>,
    pub content_document: Option<NodeId>,
}

impl NodeView {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Shadow,
    Frame,
}

/// A shadow root or frame document hosted by an element of the enclosing scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NestedScope {
    pub host: NodeId,
    pub root: NodeId,
    pub kind: ScopeKind,
}

/// In-process stand-in for a rendered page: a scoped element tree with layout boxes, a
/// selector engine and a mutation feed.
pub struct InMemoryDocument {
    tree: RwLock<Tree>,
    viewport: RwLock<Viewport>,
    url: Option<String>,
    mutations: MutationBus,
}

impl InMemoryDocument {
    pub fn new(viewport: Viewport) -> Self {
        let (mutations, _) = mutation_bus(MUTATION_BUFFER);
        Self {
            tree: RwLock::new(Tree::new()),
            viewport: RwLock::new(viewport),
            url: None,
            mutations,
        }
    }

    pub fn from_snapshot(snapshot: &DocumentSnapshot) -> Result<Self, DomError> {
        let mut document = Self::new(snapshot.viewport);
        document.url = snapshot.url.clone();
        let root = document.root();
        document.tree.write().append(root, &snapshot.root)?;
        debug!(url = ?document.url, "document loaded from snapshot");
        Ok(document)
    }

    pub fn from_json(raw: &str) -> Result<Self, DomError> {
        Self::from_snapshot(&DocumentSnapshot::from_json(raw)?)
    }

    /// Builds `html > body > children` and returns the body id alongside the document.
    pub fn with_body(
        viewport: Viewport,
        children: impl IntoIterator<Item = ElementSpec>,
    ) -> Result<(Self, NodeId), DomError> {
        let document = Self::new(viewport);
        let root = document.root();
        let (html, _) = document
            .tree
            .write()
            .append(root, &ElementSpec::new("html").child(ElementSpec::new("body").children(children)))?;
        let body = document
            .tree
            .read()
            .get(html)?
            .children
            .first()
            .copied()
            .ok_or(DomError::NodeNotFound(html))?;
        Ok((document, body))
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn root(&self) -> NodeId {
        self.tree.read().root()
    }

    pub fn viewport(&self) -> Viewport {
        *self.viewport.read()
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        *self.viewport.write() = viewport;
    }

    pub fn subscribe(&self) -> MutationStream {
        self.mutations.subscribe()
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.tree.read().contains(node)
    }

    /// Element descendants of `scope` matching `selector`, in document order.
    pub fn query_selector_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let list = selector::parse(selector)?;
        let tree = self.tree.read();
        tree.get(scope)?;
        let matches: Vec<NodeId> = tree
            .descendants(scope)
            .into_iter()
            .filter(|node| matcher::matches_list(&tree, *node, &list))
            .collect();
        trace!(selector, count = matches.len(), "query_selector_all");
        Ok(matches)
    }

    pub fn query_selector(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>, DomError> {
        Ok(self.query_selector_all(scope, selector)?.into_iter().next())
    }

    /// `Element.matches` for a single node.
    pub fn matches(&self, node: NodeId, selector: &str) -> Result<bool, DomError> {
        let list = selector::parse(selector)?;
        let tree = self.tree.read();
        tree.element(node)?;
        Ok(matcher::matches_list(&tree, node, &list))
    }

    pub fn describe(&self, node: NodeId) -> Result<NodeView, DomError> {
        let tree = self.tree.read();
        let record = tree.element(node)?;
        Ok(NodeView {
            id: node,
            tag: record.tag.clone(),
            attributes: record.attributes.clone(),
            text: record.text.clone(),
            rect: record.rect,
            style: record.style.clone(),
            parent: tree.parent_element(node),
            scope_root: tree.scope_root_of(node).unwrap_or_else(|| tree.root()),
            shadow_root: record.shadow_root,
            content_document: record.content_document,
        })
    }

    pub fn ancestors(&self, node: NodeId) -> Result<Vec<NodeId>, DomError> {
        let tree = self.tree.read();
        tree.element(node)?;
        Ok(tree.ancestors(node))
    }

    pub fn same_type_position(&self, node: NodeId) -> Result<(usize, usize), DomError> {
        self.tree.read().same_type_position(node)
    }

    pub fn text_content(&self, node: NodeId) -> Result<String, DomError> {
        let tree = self.tree.read();
        tree.get(node)?;
        Ok(tree.text_content(node))
    }

    /// Host element of a shadow root or frame document; `None` for the main document.
    pub fn host_of(&self, scope_root: NodeId) -> Result<Option<NodeId>, DomError> {
        Ok(self.tree.read().get(scope_root)?.host)
    }

    /// Shadow roots and frame documents whose hosts live directly in `scope`.
    pub fn nested_scopes(&self, scope: NodeId) -> Result<Vec<NestedScope>, DomError> {
        let tree = self.tree.read();
        let scope_record = tree.get(scope)?;
        if scope_record.kind == NodeKind::Element {
            return Err(DomError::NotAnElement(scope));
        }
        let mut out = Vec::new();
        for node in tree.descendants(scope) {
            let record = tree.get(node)?;
            if let Some(root) = record.shadow_root {
                out.push(NestedScope {
                    host: node,
                    root,
                    kind: ScopeKind::Shadow,
                });
            }
            if let Some(root) = record.content_document {
                out.push(NestedScope {
                    host: node,
                    root,
                    kind: ScopeKind::Frame,
                });
            }
        }
        Ok(out)
    }

    pub fn append_child(&self, parent: NodeId, spec: ElementSpec) -> Result<NodeId, DomError> {
        let (id, added) = {
            let mut tree = self.tree.write();
            let (id, created) = tree.append(parent, &spec)?;
            (id, Self::mutated(&tree, &created))
        };
        self.publish(MutationRecord::ChildList {
            target: parent,
            added,
            removed: Vec::new(),
        });
        Ok(id)
    }

    pub fn remove_node(&self, node: NodeId) -> Result<(), DomError> {
        let (parent, removed) = {
            let mut tree = self.tree.write();
            let parent = tree.get(node)?.parent.unwrap_or_else(|| tree.root());
            let doomed = Self::subtree_tags(&tree, node);
            tree.remove(node)?;
            (parent, doomed)
        };
        self.publish(MutationRecord::ChildList {
            target: parent,
            added: Vec::new(),
            removed,
        });
        Ok(())
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.tree.write().set_attribute(node, name, value)?;
        self.publish(MutationRecord::Attributes {
            target: node,
            name: name.to_ascii_lowercase(),
        });
        Ok(())
    }

    pub fn set_text(&self, node: NodeId, text: &str) -> Result<(), DomError> {
        self.tree.write().set_text(node, text)?;
        self.publish(MutationRecord::CharacterData { target: node });
        Ok(())
    }

    /// Layout changes are not DOM mutations, so nothing is published.
    pub fn set_rect(&self, node: NodeId, rect: Option<Rect>) -> Result<(), DomError> {
        self.tree.write().set_rect(node, rect)
    }

    fn mutated(tree: &Tree, nodes: &[NodeId]) -> Vec<MutatedNode> {
        nodes
            .iter()
            .filter_map(|node| {
                tree.get(*node).ok().map(|record| MutatedNode {
                    node: *node,
                    tag: record.tag.clone(),
                })
            })
            .collect()
    }

    fn subtree_tags(tree: &Tree, node: NodeId) -> Vec<MutatedNode> {
        let mut nodes = vec![node];
        let mut frontier = vec![node];
        while let Some(current) = frontier.pop() {
            let Ok(record) = tree.get(current) else {
                continue;
            };
            let mut scoped = record.children.clone();
            scoped.extend(record.shadow_root);
            scoped.extend(record.content_document);
            for next in scoped {
                if tree.get(next).map_or(false, |r| r.is_element()) {
                    nodes.push(next);
                }
                frontier.push(next);
            }
        }
        Self::mutated(tree, &nodes)
    }

    fn publish(&self, record: MutationRecord) {
        // No receivers is the normal state before any observer attaches.
        let receivers = self.mutations.send(record).unwrap_or(0);
        trace!(receivers, "mutation published");
    }
}
