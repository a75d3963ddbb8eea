//! Interactive element scanning.
//!
//! [`ElementScanner`] collects candidate controls from a [`DocumentPort`], keeps the
//! visible ones, gives each a selector that finds it again and ranks them by priority.
//! Results are cached per option set until the TTL runs out or the document gains or
//! loses an interactive element.

pub mod cache;
pub mod collect;
pub mod errors;
pub mod events;
pub mod judges;
pub mod lifecycle;
pub mod metrics;
pub mod model;
pub mod policy;
pub mod ports;
pub mod priority;
pub mod role;
pub mod scanner;
pub mod selector;
pub mod text;

pub use collect::CollectStrategy;
pub use errors::ScanError;
pub use model::{CacheState, HopKind, JudgeReport, ScannedElement, ScopeHop, SelectorSource};
pub use policy::{HeuristicPatterns, PriorityMode, ScanOptions, ScannerPolicy};
pub use ports::{DocumentAdapterPort, DocumentPort};
pub use scanner::ElementScanner;
