use std::sync::Arc;

use async_trait::async_trait;
use dom_adapter::{InMemoryDocument, MutationStream, NestedScope, NodeView};
use elementscan_core_types::{NodeId, Viewport};

use crate::errors::ScanError;

/// Everything the scanner needs from the live document.
///
/// Query scopes are scope roots (the document, a shadow root or a frame document);
/// queries never cross into nested scopes.
#[async_trait]
pub trait DocumentPort: Send + Sync {
    fn document_root(&self) -> NodeId;
    fn subscribe(&self) -> MutationStream;
    async fn viewport(&self) -> Result<Viewport, ScanError>;
    async fn query_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, ScanError>;
    async fn matches(&self, node: NodeId, selector: &str) -> Result<bool, ScanError>;
    async fn describe(&self, node: NodeId) -> Result<NodeView, ScanError>;
    /// Element ancestors within the node's scope, nearest first.
    async fn ancestors(&self, node: NodeId) -> Result<Vec<NodeId>, ScanError>;
    /// 1-based index among same-tag siblings and the sibling group size.
    async fn same_type_position(&self, node: NodeId) -> Result<(usize, usize), ScanError>;
    async fn text_content(&self, node: NodeId) -> Result<String, ScanError>;
    async fn nested_scopes(&self, scope: NodeId) -> Result<Vec<NestedScope>, ScanError>;
    async fn is_connected(&self, node: NodeId) -> bool;
}

/// [`DocumentPort`] over an [`InMemoryDocument`].
pub struct DocumentAdapterPort {
    document: Arc<InMemoryDocument>,
}

impl DocumentAdapterPort {
    pub fn new(document: Arc<InMemoryDocument>) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &Arc<InMemoryDocument> {
        &self.document
    }
}

#[async_trait]
impl DocumentPort for DocumentAdapterPort {
    fn document_root(&self) -> NodeId {
        self.document.root()
    }

    fn subscribe(&self) -> MutationStream {
        self.document.subscribe()
    }

    async fn viewport(&self) -> Result<Viewport, ScanError> {
        Ok(self.document.viewport())
    }

    async fn query_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, ScanError> {
        Ok(self.document.query_selector_all(scope, selector)?)
    }

    async fn matches(&self, node: NodeId, selector: &str) -> Result<bool, ScanError> {
        Ok(self.document.matches(node, selector)?)
    }

    async fn describe(&self, node: NodeId) -> Result<NodeView, ScanError> {
        Ok(self.document.describe(node)?)
    }

    async fn ancestors(&self, node: NodeId) -> Result<Vec<NodeId>, ScanError> {
        Ok(self.document.ancestors(node)?)
    }

    async fn same_type_position(&self, node: NodeId) -> Result<(usize, usize), ScanError> {
        Ok(self.document.same_type_position(node)?)
    }

    async fn text_content(&self, node: NodeId) -> Result<String, ScanError> {
        Ok(self.document.text_content(node)?)
    }

    async fn nested_scopes(&self, scope: NodeId) -> Result<Vec<NestedScope>, ScanError> {
        Ok(self.document.nested_scopes(scope)?)
    }

    async fn is_connected(&self, node: NodeId) -> bool {
        self.document.is_connected(node)
    }
}
