use dom_adapter::DomError;
use elementscan_core_types::NodeId;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ScanError {
    #[error("invalid selector `{0}`")]
    InvalidSelector(String),
    #[error("element detached: {0}")]
    Detached(NodeId),
    #[error("invalid heuristic pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("document error: {0}")]
    Document(String),
}

impl From<DomError> for ScanError {
    fn from(err: DomError) -> Self {
        match err {
            DomError::InvalidSelector { selector, .. } => Self::InvalidSelector(selector),
            DomError::NodeNotFound(node) => Self::Detached(node),
            other => Self::Document(other.to_string()),
        }
    }
}
