//! Candidate collection: which nodes are worth scanning at all.

use std::collections::{HashMap, HashSet};

use elementscan_core_types::{NodeId, Viewport};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::judges;
use crate::model::ScopeHop;
use crate::policy::CompiledHeuristics;
use crate::ports::DocumentPort;

pub const SEMANTIC_SELECTORS: &[&str] = &[
    "button",
    "a[href]",
    "input:not([type=\"hidden\"])",
    "select",
    "textarea",
    "summary",
];

pub const INTERACTIVE_ROLES: &[&str] = &[
    "button",
    "link",
    "checkbox",
    "radio",
    "tab",
    "menuitem",
    "menuitemcheckbox",
    "menuitemradio",
    "switch",
    "option",
    "textbox",
    "searchbox",
    "combobox",
    "slider",
    "spinbutton",
    "treeitem",
];

/// Tags whose insertion or removal can change a scan result.
pub const INTERACTIVE_TAGS: &[&str] = &["button", "a", "input", "select", "textarea", "summary"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectStrategy {
    Semantic,
    AriaRole,
    ClickHandler,
    ClassHeuristic,
}

impl CollectStrategy {
    fn selectors(&self) -> Vec<String> {
        match self {
            CollectStrategy::Semantic => SEMANTIC_SELECTORS.iter().map(|s| s.to_string()).collect(),
            CollectStrategy::AriaRole => INTERACTIVE_ROLES
                .iter()
                .map(|role| format!("[role~=\"{role}\"]"))
                .collect(),
            CollectStrategy::ClickHandler => vec!["[onclick]".to_string()],
            CollectStrategy::ClassHeuristic => vec!["[class]".to_string()],
        }
    }
}

/// A query scope: the main document, a shadow root or a frame document.
#[derive(Clone, Debug)]
pub struct ScopeTarget {
    pub root: NodeId,
    /// Host selectors leading from the main document to `root`.
    pub path: Vec<ScopeHop>,
}

#[derive(Clone, Debug)]
pub struct Candidate {
    pub node: NodeId,
    /// Index into the scope list handed to [`collect`].
    pub scope: usize,
    pub strategy: CollectStrategy,
    /// Position in first-discovery order across all strategies and scopes.
    pub discovery: usize,
    /// Nearest ancestor that is itself a candidate and can wrap it (see [`resolve_nesting`]).
    pub nested_in: Option<NodeId>,
}

/// Runs `strategies` over every scope and returns the candidates deduplicated by node,
/// first discovery wins.
pub async fn collect<P: DocumentPort + ?Sized>(
    port: &P,
    scopes: &[ScopeTarget],
    strategies: &[CollectStrategy],
    heuristics: &CompiledHeuristics,
) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (scope_index, scope) in scopes.iter().enumerate() {
        for strategy in strategies {
            for selector in strategy.selectors() {
                let nodes = match port.query_all(scope.root, &selector).await {
                    Ok(nodes) => nodes,
                    Err(err) => {
                        debug!(target: "elementscan.collect", %selector, %err, "strategy selector failed");
                        continue;
                    }
                };
                for node in nodes {
                    if seen.contains(&node) {
                        continue;
                    }
                    if *strategy == CollectStrategy::ClassHeuristic
                        && !passes_class_heuristic(port, node, heuristics).await
                    {
                        continue;
                    }
                    seen.insert(node);
                    out.push(Candidate {
                        node,
                        scope: scope_index,
                        strategy: *strategy,
                        discovery: out.len(),
                        nested_in: None,
                    });
                }
            }
        }
    }
    trace!(target: "elementscan.collect", count = out.len(), "candidates collected");
    out
}

async fn passes_class_heuristic<P: DocumentPort + ?Sized>(
    port: &P,
    node: NodeId,
    heuristics: &CompiledHeuristics,
) -> bool {
    match port.describe(node).await {
        Ok(view) => judges::looks_interactive(&view, heuristics).ok,
        Err(_) => false,
    }
}

/// Viewport an ancestor must be visible in before it counts as a wrapper.
#[derive(Clone, Copy, Debug)]
pub struct VisibleWrappers<'a> {
    pub viewport: &'a Viewport,
    pub margin: f64,
}

/// Fills in `nested_in`, then drops nested candidates when `collapse` is set.
/// Candidates whose ancestry cannot be read are dropped.
///
/// With `visible_wrappers` set, a hidden ancestor is not a wrapper: a visible link inside
/// a zero-area button stays in the result while the button itself is later filtered out.
pub async fn resolve_nesting<P: DocumentPort + ?Sized>(
    port: &P,
    candidates: Vec<Candidate>,
    collapse: bool,
    visible_wrappers: Option<VisibleWrappers<'_>>,
) -> Vec<Candidate> {
    let nodes: HashSet<NodeId> = candidates.iter().map(|candidate| candidate.node).collect();
    let mut wrapper_visible: HashMap<NodeId, bool> = HashMap::new();
    let mut out = Vec::with_capacity(candidates.len());
    for mut candidate in candidates {
        let ancestors = match port.ancestors(candidate.node).await {
            Ok(ancestors) => ancestors,
            Err(err) => {
                debug!(target: "elementscan.collect", node = %candidate.node, %err, "ancestry unavailable");
                continue;
            }
        };
        candidate.nested_in = None;
        for ancestor in ancestors {
            if !nodes.contains(&ancestor) {
                continue;
            }
            let wraps = match visible_wrappers {
                None => true,
                Some(filter) => match wrapper_visible.get(&ancestor) {
                    Some(visible) => *visible,
                    None => {
                        let visible = port.describe(ancestor).await.map_or(false, |view| {
                            judges::visible(&view, filter.viewport, filter.margin).ok
                        });
                        wrapper_visible.insert(ancestor, visible);
                        visible
                    }
                },
            };
            if wraps {
                candidate.nested_in = Some(ancestor);
                break;
            }
        }
        if collapse && candidate.nested_in.is_some() {
            continue;
        }
        out.push(candidate);
    }
    out
}
