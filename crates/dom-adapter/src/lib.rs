//! In-memory live document used by the element scanner.
//!
//! The crate plays the part a rendering engine plays in a browser: it owns the element
//! tree and its layout boxes, answers selector queries per scope (main document, shadow
//! roots, frame documents) and publishes mutation records on a broadcast bus.

pub mod document;
pub mod errors;
pub mod events;
pub mod selector;
pub mod spec;
mod tree;

pub use document::{InMemoryDocument, NestedScope, NodeView, ScopeKind};
pub use errors::DomError;
pub use events::{mutation_bus, MutatedNode, MutationBus, MutationRecord, MutationStream};
pub use spec::{DocumentSnapshot, ElementSpec};
pub use tree::NodeKind;
