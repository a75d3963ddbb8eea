use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use dom_adapter::{NodeView, ScopeKind};
use elementscan_core_types::{NodeId, ScanId, Viewport};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::cache::ScanCache;
use crate::collect::{self, Candidate, ScopeTarget, VisibleWrappers, SEMANTIC_SELECTORS};
use crate::errors::ScanError;
use crate::events;
use crate::judges;
use crate::lifecycle::MutationWatcher;
use crate::model::{CacheState, HopKind, ScannedElement, ScopeHop};
use crate::policy::{CompiledHeuristics, ScanOptions, ScannerPolicy};
use crate::ports::DocumentPort;
use crate::priority::{self, PriorityInputs};
use crate::role;
use crate::selector::SelectorGenerator;
use crate::text;

/// Shadow roots and frames nested deeper than this are not scanned.
const MAX_SCOPE_DEPTH: usize = 8;

/// Finds, ranks and describes the interactive elements of one document.
///
/// Each scanner owns its cache and, from the first scan on, one mutation watcher. Call
/// [`ElementScanner::shutdown`] (or drop the scanner) when the document goes away.
pub struct ElementScanner<P>
where
    P: DocumentPort + 'static,
{
    port: Arc<P>,
    policy: ScannerPolicy,
    heuristics: CompiledHeuristics,
    cache: Arc<ScanCache>,
    watcher: Mutex<Option<MutationWatcher>>,
}

struct Visited {
    candidate: Candidate,
    view: NodeView,
    visible: bool,
}

impl<P> ElementScanner<P>
where
    P: DocumentPort + 'static,
{
    pub fn new(port: Arc<P>) -> Result<Self, ScanError> {
        Self::with_policy(port, ScannerPolicy::default())
    }

    /// Fails only when a heuristic pattern does not compile.
    pub fn with_policy(port: Arc<P>, policy: ScannerPolicy) -> Result<Self, ScanError> {
        let heuristics = policy.heuristics.compile()?;
        let cache = Arc::new(ScanCache::new(policy.cache_ttl()));
        Ok(Self {
            port,
            policy,
            heuristics,
            cache,
            watcher: Mutex::new(None),
        })
    }

    pub fn policy(&self) -> &ScannerPolicy {
        &self.policy
    }

    pub fn port(&self) -> &Arc<P> {
        &self.port
    }

    pub fn cache_state(&self) -> CacheState {
        self.cache.state()
    }

    pub fn is_observing(&self) -> bool {
        self.watcher
            .lock()
            .as_ref()
            .map_or(false, MutationWatcher::is_running)
    }

    /// Drops every cached result.
    pub fn invalidate(&self) {
        let generation = self.cache.clear();
        events::emit_invalidation("manual", generation);
    }

    /// Detaches the mutation watcher and clears the cache. A later scan re-attaches.
    pub async fn shutdown(&self) {
        let watcher = self.watcher.lock().take();
        if let Some(mut watcher) = watcher {
            watcher.stop().await;
        }
        self.cache.clear();
        debug!(target: "elementscan.watcher", "scanner shut down");
    }

    /// Ranked interactive elements of the document.
    ///
    /// Never fails: unreadable elements are skipped and an empty document yields an
    /// empty list.
    pub async fn scan(&self, options: &ScanOptions) -> Vec<ScannedElement> {
        let scan_id = ScanId::new();
        let started = Instant::now();
        self.ensure_watcher();

        let key = options.cache_key();
        if options.use_cache {
            if let Some(hit) = self.cache.get(&key) {
                events::emit_scan(&scan_id, true, hit.len(), hit.len(), started.elapsed());
                return hit;
            }
        }
        if options.max_elements == 0 {
            self.cache.put(key, Vec::new(), self.cache.generation());
            events::emit_scan(&scan_id, false, 0, 0, started.elapsed());
            return Vec::new();
        }

        if let Some(limit) = options.wait_for_content() {
            self.wait_for_content(limit).await;
        }
        let generation = self.cache.generation();

        let scopes = self.resolve_scopes(options).await;
        let candidates = collect::collect(
            self.port.as_ref(),
            &scopes,
            options.priority_mode.strategies(),
            &self.heuristics,
        )
        .await;
        let candidate_count = candidates.len();

        let viewport = match self.port.viewport().await {
            Ok(viewport) => viewport,
            Err(err) => {
                warn!(target: "elementscan.events", %err, "viewport unavailable, using default");
                Viewport::default()
            }
        };
        // hidden wrappers are dropped later, so they must not absorb visible children
        let wrappers = (!options.include_invisible).then_some(VisibleWrappers {
            viewport: &viewport,
            margin: self.policy.viewport_margin,
        });
        let mut candidates = collect::resolve_nesting(
            self.port.as_ref(),
            candidates,
            options.collapse_nested,
            wrappers,
        )
        .await;
        candidates.truncate(options.max_elements);
        let visited = self
            .judge_visibility(&scan_id, candidates, &viewport, options.include_invisible)
            .await;

        let mut elements = Vec::with_capacity(visited.len());
        for item in visited {
            let scope = &scopes[item.candidate.scope];
            match self.build_element(&item, scope).await {
                Ok(element) => elements.push(element),
                Err(err) => events::emit_element_skipped(&scan_id, item.candidate.node, &err),
            }
        }
        dedupe_ids(&mut elements);
        // stable: equal priorities keep discovery order
        elements.sort_by(|a, b| b.priority.cmp(&a.priority));

        if !self.cache.put(key, elements.clone(), generation) {
            debug!(target: "elementscan.events", %scan_id, "document changed during scan, result not cached");
        }
        events::emit_scan(
            &scan_id,
            false,
            candidate_count,
            elements.len(),
            started.elapsed(),
        );
        elements
    }

    /// Finds the live element behind `element`.
    ///
    /// The node hint is trusted only while it is still connected and still matched by the
    /// selector; otherwise the selector is evaluated again in the element's scope.
    pub async fn relocate(&self, element: &ScannedElement) -> Option<NodeId> {
        let scope_root = self.resolve_scope_path(&element.scope).await?;
        if let Some(hint) = element.node {
            if self.port.is_connected(hint).await
                && matches!(self.port.matches(hint, &element.selector).await, Ok(true))
                && self
                    .port
                    .describe(hint)
                    .await
                    .map_or(false, |view| view.scope_root == scope_root)
            {
                return Some(hint);
            }
        }
        match self.port.query_all(scope_root, &element.selector).await {
            Ok(nodes) => nodes.into_iter().next(),
            Err(err) => {
                debug!(target: "elementscan.events", selector = %element.selector, %err, "relocation failed");
                None
            }
        }
    }

    /// Attaches the watcher on first use; afterwards applies any mutation it has not
    /// processed yet, so a cache hit never predates a published change.
    fn ensure_watcher(&self) {
        let mut slot = self.watcher.lock();
        if let Some(watcher) = slot.as_ref().filter(|watcher| watcher.is_running()) {
            watcher.catch_up();
            return;
        }
        let mut watcher = MutationWatcher::new(Arc::clone(&self.cache));
        watcher.start(self.port.subscribe());
        *slot = Some(watcher);
        info!(target: "elementscan.watcher", "mutation watcher attached");
    }

    /// Polls the main document until a semantic control appears or `limit` elapses.
    async fn wait_for_content(&self, limit: std::time::Duration) {
        let deadline = Instant::now() + limit;
        let probe = SEMANTIC_SELECTORS.join(", ");
        let root = self.port.document_root();
        loop {
            let ready = self
                .port
                .query_all(root, &probe)
                .await
                .map_or(false, |nodes| !nodes.is_empty());
            if ready {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                debug!(target: "elementscan.events", "no interactive content before deadline");
                return;
            }
            tokio::time::sleep(self.policy.wait_poll().min(deadline - now)).await;
        }
    }

    /// The main document plus, when enabled, every reachable shadow root and frame
    /// document, breadth first.
    async fn resolve_scopes(&self, options: &ScanOptions) -> Vec<ScopeTarget> {
        let mut scopes = vec![ScopeTarget {
            root: self.port.document_root(),
            path: Vec::new(),
        }];
        if !options.include_shadow_dom && !options.include_iframes {
            return scopes;
        }
        let generator = SelectorGenerator::new(self.port.as_ref(), &self.policy, &self.heuristics);
        let mut index = 0;
        while index < scopes.len() {
            let parent = scopes[index].clone();
            index += 1;
            if parent.path.len() >= MAX_SCOPE_DEPTH {
                continue;
            }
            let nested = match self.port.nested_scopes(parent.root).await {
                Ok(nested) => nested,
                Err(err) => {
                    debug!(target: "elementscan.events", %err, "nested scopes unavailable");
                    continue;
                }
            };
            for scope in nested {
                let kind = match scope.kind {
                    ScopeKind::Shadow if options.include_shadow_dom => HopKind::Shadow,
                    ScopeKind::Frame if options.include_iframes => HopKind::Frame,
                    _ => continue,
                };
                let Ok(host) = self.port.describe(scope.host).await else {
                    continue;
                };
                let host_selector = generator.generate(&host).await.selector;
                let mut path = parent.path.clone();
                path.push(ScopeHop {
                    host: host_selector,
                    kind,
                });
                scopes.push(ScopeTarget {
                    root: scope.root,
                    path,
                });
            }
        }
        scopes
    }

    /// Follows host selectors from the main document into nested scopes.
    async fn resolve_scope_path(&self, path: &[ScopeHop]) -> Option<NodeId> {
        let mut root = self.port.document_root();
        for hop in path {
            let hosts = self.port.query_all(root, &hop.host).await.ok()?;
            let mut next = None;
            for host in hosts {
                let Ok(view) = self.port.describe(host).await else {
                    continue;
                };
                next = match hop.kind {
                    HopKind::Shadow => view.shadow_root,
                    HopKind::Frame => view.content_document,
                };
                if next.is_some() {
                    break;
                }
            }
            root = next?;
        }
        Some(root)
    }

    /// Visibility in batches of `batch_size`, yielding to the runtime between batches.
    async fn judge_visibility(
        &self,
        scan_id: &ScanId,
        candidates: Vec<Candidate>,
        viewport: &Viewport,
        include_invisible: bool,
    ) -> Vec<Visited> {
        let batch_size = self.policy.batch_size.max(1);
        let mut out = Vec::with_capacity(candidates.len());
        for (batch, chunk) in candidates.chunks(batch_size).enumerate() {
            if batch > 0 {
                tokio::task::yield_now().await;
            }
            for candidate in chunk {
                let view = match self.port.describe(candidate.node).await {
                    Ok(view) => view,
                    Err(err) => {
                        events::emit_element_skipped(scan_id, candidate.node, &err);
                        continue;
                    }
                };
                let visible = judges::visible(&view, viewport, self.policy.viewport_margin).ok;
                if visible || include_invisible {
                    out.push(Visited {
                        candidate: candidate.clone(),
                        view,
                        visible,
                    });
                }
            }
        }
        out
    }

    async fn build_element(
        &self,
        item: &Visited,
        scope: &ScopeTarget,
    ) -> Result<ScannedElement, ScanError> {
        let view = &item.view;
        let content = self.port.text_content(view.id).await?;
        let generator = SelectorGenerator::new(self.port.as_ref(), &self.policy, &self.heuristics);
        let generated = generator.generate(view).await;
        let (role, explicit_role) = role::infer_role(view);
        let test_id = self.policy.test_id_of(view).map(|(_, value)| value);
        let priority = priority::score(
            view,
            PriorityInputs {
                explicit_role,
                has_test_id: test_id.is_some(),
                nested: item.candidate.nested_in.is_some(),
            },
            &self.heuristics,
        );

        Ok(ScannedElement {
            id: element_id(view, test_id, item.candidate.discovery),
            selector: generated.selector,
            selector_source: generated.source,
            scope: scope.path.clone(),
            tag: view.tag.clone(),
            text: text::display_text(view, &content, self.policy.text_limit),
            role,
            visible: item.visible,
            position: view.rect.unwrap_or_default(),
            priority,
            node: Some(view.id),
        })
    }
}

impl<P> Drop for ElementScanner<P>
where
    P: DocumentPort + 'static,
{
    fn drop(&mut self) {
        // the watcher's own Drop cancels its task
        self.watcher.get_mut().take();
    }
}

/// Test identifier, then DOM id, then `name`, then `{tag}-{discovery index}`.
fn element_id(view: &NodeView, test_id: Option<&str>, discovery: usize) -> String {
    [test_id, view.attr("id"), view.attr("name")]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}-{}", view.tag, discovery))
}

/// Suffixes repeated ids with `-2`, `-3`, ... in discovery order. A suffix never takes an
/// id that some element in the scan already carries.
fn dedupe_ids(elements: &mut [ScannedElement]) {
    let reserved: HashSet<String> = elements.iter().map(|element| element.id.clone()).collect();
    let mut issued: HashSet<String> = HashSet::with_capacity(elements.len());
    let mut next_suffix: HashMap<String, usize> = HashMap::new();
    for element in elements.iter_mut() {
        if issued.insert(element.id.clone()) {
            continue;
        }
        let suffix = next_suffix.entry(element.id.clone()).or_insert(2);
        let id = loop {
            let candidate = format!("{}-{}", element.id, suffix);
            *suffix += 1;
            if !reserved.contains(&candidate) && !issued.contains(&candidate) {
                break candidate;
            }
        };
        issued.insert(id.clone());
        element.id = id;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use elementscan_core_types::Rect;

    use super::*;
    use crate::model::SelectorSource;

    fn element(id: &str) -> ScannedElement {
        ScannedElement {
            id: id.into(),
            selector: "button".into(),
            selector_source: SelectorSource::Tag,
            scope: Vec::new(),
            tag: "button".into(),
            text: String::new(),
            role: "button".into(),
            visible: true,
            position: Rect::default(),
            priority: 100,
            node: None,
        }
    }

    #[test]
    fn repeated_ids_get_suffixes() {
        let mut elements = vec![element("save"), element("save"), element("other"), element("save")];
        dedupe_ids(&mut elements);
        let ids: Vec<_> = elements.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["save", "save-2", "other", "save-3"]);

        let mut elements = vec![element("save"), element("save"), element("save-2")];
        dedupe_ids(&mut elements);
        let ids: Vec<_> = elements.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["save", "save-3", "save-2"]);
    }

    #[test]
    fn id_sources_in_order() {
        let mut attributes = BTreeMap::new();
        attributes.insert("name".to_string(), "email".to_string());
        let view = NodeView {
            id: NodeId(4),
            tag: "input".into(),
            attributes,
            text: String::new(),
            rect: None,
            style: BTreeMap::new(),
            parent: None,
            scope_root: NodeId(0),
            shadow_root: None,
            content_document: None,
        };
        assert_eq!(element_id(&view, Some("login"), 0), "login");
        assert_eq!(element_id(&view, None, 0), "email");

        let mut bare = view.clone();
        bare.attributes.clear();
        assert_eq!(element_id(&bare, None, 7), "input-7");

        let mut padded = view.clone();
        padded.attributes.insert("id".to_string(), "  ".to_string());
        assert_eq!(element_id(&padded, Some(" pay "), 0), "pay");
        assert_eq!(element_id(&padded, None, 0), "email", "blank id falls through to name");
    }
}
