use elementscan_core_types::{NodeId, Rect};
use serde::{Deserialize, Serialize};

/// Which selector rule produced [`ScannedElement::selector`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorSource {
    TestId,
    Id,
    AriaLabel,
    Name,
    StableClass,
    Positional,
    Tag,
}

impl SelectorSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectorSource::TestId => "test_id",
            SelectorSource::Id => "id",
            SelectorSource::AriaLabel => "aria_label",
            SelectorSource::Name => "name",
            SelectorSource::StableClass => "stable_class",
            SelectorSource::Positional => "positional",
            SelectorSource::Tag => "tag",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HopKind {
    Shadow,
    Frame,
}

/// One step from an enclosing scope into a shadow root or frame document.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeHop {
    /// Selector for the host element, relative to the enclosing scope.
    pub host: String,
    pub kind: HopKind,
}

/// One interactive element found by a scan.
///
/// Owned by the caller. `node` is a best-effort hint; use
/// [`crate::ElementScanner::relocate`] to get back to the live element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScannedElement {
    pub id: String,
    pub selector: String,
    pub selector_source: SelectorSource,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scope: Vec<ScopeHop>,
    pub tag: String,
    pub text: String,
    pub role: String,
    pub visible: bool,
    pub position: Rect,
    pub priority: i32,
    #[serde(skip)]
    pub node: Option<NodeId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    Cold,
    Warm,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JudgeReport {
    pub ok: bool,
    pub reason: String,
}
