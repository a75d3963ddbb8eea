use elementscan_core_types::NodeId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomError {
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("node is not an element: {0}")]
    NotAnElement(NodeId),
    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl DomError {
    pub fn invalid_selector(selector: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.into(),
        }
    }
}
