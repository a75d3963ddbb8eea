use dom_adapter::NodeView;
use elementscan_core_types::NodeId;
use tracing::trace;

use super::escape::{attr_equals, escape_ident};
use super::stability::is_stable_class;
use crate::errors::ScanError;
use crate::model::SelectorSource;
use crate::policy::{CompiledHeuristics, ScannerPolicy};
use crate::ports::DocumentPort;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedSelector {
    pub selector: String,
    pub source: SelectorSource,
}

enum Resolve {
    /// Any result set containing the element.
    Contains,
    /// Exactly the element.
    Unique,
}

/// Walks the selector rules in order and returns the first candidate the document
/// confirms. The returned selector always parses and, evaluated in the element's scope,
/// always matches the element.
pub struct SelectorGenerator<'a, P: DocumentPort + ?Sized> {
    port: &'a P,
    policy: &'a ScannerPolicy,
    heuristics: &'a CompiledHeuristics,
}

impl<'a, P: DocumentPort + ?Sized> SelectorGenerator<'a, P> {
    pub fn new(port: &'a P, policy: &'a ScannerPolicy, heuristics: &'a CompiledHeuristics) -> Self {
        Self {
            port,
            policy,
            heuristics,
        }
    }

    pub async fn generate(&self, view: &NodeView) -> GeneratedSelector {
        let scope = view.scope_root;
        let tag = escape_ident(&view.tag);

        if let Some((name, value)) = self.policy.test_id_of(view) {
            let candidate = attr_equals(None, name, value);
            if self.confirms(scope, &candidate, view.id, Resolve::Contains).await {
                return found(candidate, SelectorSource::TestId);
            }
        }

        if let Some(id) = non_empty(view.attr("id")) {
            let candidate = format!("#{}", escape_ident(id));
            if self.confirms(scope, &candidate, view.id, Resolve::Unique).await {
                return found(candidate, SelectorSource::Id);
            }
        }

        if let Some(label) = non_empty(view.attr("aria-label")) {
            if label.chars().count() <= self.policy.label_limit {
                let candidate = attr_equals(Some(&view.tag), "aria-label", label);
                if self.confirms(scope, &candidate, view.id, Resolve::Contains).await {
                    return found(candidate, SelectorSource::AriaLabel);
                }
            }
        }

        if let Some(name) = non_empty(view.attr("name")) {
            let candidate = attr_equals(Some(&view.tag), "name", name);
            if self.confirms(scope, &candidate, view.id, Resolve::Contains).await {
                return found(candidate, SelectorSource::Name);
            }
        }

        for class in view.classes() {
            if !is_stable_class(class, self.heuristics) {
                continue;
            }
            let candidate = format!("{}.{}", tag, escape_ident(class));
            if self.confirms(scope, &candidate, view.id, Resolve::Unique).await {
                return found(candidate, SelectorSource::StableClass);
            }
        }

        match self.positional_path(view).await {
            Ok(candidate) => {
                if self.confirms(scope, &candidate, view.id, Resolve::Contains).await {
                    return found(candidate, SelectorSource::Positional);
                }
            }
            Err(err) => {
                trace!(target: "elementscan.selector", node = %view.id, %err, "positional path unavailable");
            }
        }

        found(tag, SelectorSource::Tag)
    }

    /// `tag:nth-of-type(k)` segments joined by `>` from the element up to the scope root,
    /// cut short at the nearest ancestor with a unique id.
    async fn positional_path(&self, view: &NodeView) -> Result<String, ScanError> {
        let mut segments = Vec::new();
        let mut current = view.clone();
        loop {
            let (index, count) = self.port.same_type_position(current.id).await?;
            let mut segment = escape_ident(&current.tag);
            if count > 1 {
                segment.push_str(&format!(":nth-of-type({index})"));
            }
            segments.push(segment);

            let Some(parent) = current.parent else {
                break;
            };
            let parent_view = self.port.describe(parent).await?;
            if let Some(id) = non_empty(parent_view.attr("id")) {
                let anchor = format!("#{}", escape_ident(id));
                if self
                    .confirms(view.scope_root, &anchor, parent, Resolve::Unique)
                    .await
                {
                    segments.push(anchor);
                    break;
                }
            }
            current = parent_view;
        }
        segments.reverse();
        Ok(segments.join(" > "))
    }

    async fn confirms(&self, scope: NodeId, candidate: &str, node: NodeId, mode: Resolve) -> bool {
        match self.port.query_all(scope, candidate).await {
            Ok(found) => match mode {
                Resolve::Contains => found.contains(&node),
                Resolve::Unique => found.len() == 1 && found[0] == node,
            },
            Err(err) => {
                trace!(target: "elementscan.selector", candidate, %err, "candidate rejected");
                false
            }
        }
    }
}

fn found(selector: String, source: SelectorSource) -> GeneratedSelector {
    GeneratedSelector { selector, source }
}

/// The raw value, unless it is blank. Selectors must carry the value exactly as stored.
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}
