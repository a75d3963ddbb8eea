use elementscan_core_types::NodeId;
use tokio::sync::broadcast;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutatedNode {
    pub node: NodeId,
    pub tag: String,
}

/// Structural and attribute changes, shaped after `MutationRecord`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationRecord {
    /// `added`/`removed` list every element of the affected subtrees, nested scopes
    /// included.
    ChildList {
        target: NodeId,
        added: Vec<MutatedNode>,
        removed: Vec<MutatedNode>,
    },
    Attributes {
        target: NodeId,
        name: String,
    },
    CharacterData {
        target: NodeId,
    },
}

impl MutationRecord {
    pub fn target(&self) -> NodeId {
        match self {
            MutationRecord::ChildList { target, .. }
            | MutationRecord::Attributes { target, .. }
            | MutationRecord::CharacterData { target } => *target,
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, MutationRecord::ChildList { .. })
    }

    /// Tags of every added or removed element.
    pub fn touched_tags(&self) -> impl Iterator<Item = &str> {
        let nodes: &[MutatedNode] = &[];
        let (added, removed) = match self {
            MutationRecord::ChildList { added, removed, .. } => (added.as_slice(), removed.as_slice()),
            _ => (nodes, nodes),
        };
        added.iter().chain(removed.iter()).map(|node| node.tag.as_str())
    }
}

pub type MutationBus = broadcast::Sender<MutationRecord>;
pub type MutationStream = broadcast::Receiver<MutationRecord>;

pub fn mutation_bus(buffer: usize) -> (MutationBus, MutationStream) {
    broadcast::channel(buffer.max(1))
}
