//! End-to-end scanner behavior against an in-memory document.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dom_adapter::{ElementSpec, InMemoryDocument, MutationStream, NestedScope, NodeView};
use element_scanner::{
    metrics, CacheState, DocumentAdapterPort, DocumentPort, ElementScanner, HeuristicPatterns,
    HopKind, PriorityMode, ScanError, ScanOptions, ScannedElement, ScannerPolicy, SelectorSource,
};
use elementscan_core_types::{NodeId, Viewport};
use tokio::time::sleep;

type Scanner = ElementScanner<DocumentAdapterPort>;

fn button(label: &str, row: usize) -> ElementSpec {
    ElementSpec::new("button")
        .text(label)
        .rect(10.0, 10.0 + row as f64 * 30.0, 120.0, 24.0)
}

fn page(children: Vec<ElementSpec>) -> (Arc<InMemoryDocument>, NodeId) {
    let (doc, body) = InMemoryDocument::with_body(Viewport::default(), children).unwrap();
    (Arc::new(doc), body)
}

fn scanner_for(doc: &Arc<InMemoryDocument>) -> Scanner {
    ElementScanner::new(Arc::new(DocumentAdapterPort::new(Arc::clone(doc)))).unwrap()
}

/// Evaluates the selector in the element's own scope.
fn resolves_to_origin(doc: &InMemoryDocument, element: &ScannedElement) -> bool {
    let node = element.node.expect("fresh scan keeps node hints");
    let scope = doc.describe(node).unwrap().scope_root;
    doc.query_selector_all(scope, &element.selector)
        .map_or(false, |nodes| nodes.contains(&node))
}

fn rich_page() -> Vec<ElementSpec> {
    vec![
        ElementSpec::new("nav").children(vec![
            ElementSpec::new("a").attr("href", "/").class("css-1x2y3z").text("Home").rect(0.0, 0.0, 60.0, 20.0),
            ElementSpec::new("a").attr("href", "/about").class("css-1x2y3z").text("About").rect(70.0, 0.0, 60.0, 20.0),
        ]),
        ElementSpec::new("button").id("login:btn").text("Log in").rect(10.0, 40.0, 80.0, 24.0),
        ElementSpec::new("button").id("dup").text("One").rect(10.0, 70.0, 80.0, 24.0),
        ElementSpec::new("button").id("dup").text("Two").rect(100.0, 70.0, 80.0, 24.0),
        ElementSpec::new("button")
            .attr("data-testid", "say \"hi\"")
            .text("Greet")
            .rect(10.0, 100.0, 80.0, 24.0),
        ElementSpec::new("input")
            .attr("name", "q[]")
            .attr("placeholder", "Search")
            .rect(10.0, 130.0, 200.0, 24.0),
        ElementSpec::new("div")
            .attr("role", "button")
            .attr("aria-label", "Open [menu]")
            .rect(10.0, 160.0, 30.0, 30.0),
        ElementSpec::new("div").attr("onclick", "go()").text("Go").rect(10.0, 200.0, 30.0, 30.0),
        ElementSpec::new("div").id("widget").rect(300.0, 300.0, 200.0, 100.0).shadow(vec![
            ElementSpec::new("button").class("inner").text("Shadow action").rect(310.0, 310.0, 80.0, 24.0),
        ]),
        ElementSpec::new("iframe").attr("title", "checkout").rect(0.0, 420.0, 400.0, 200.0).frame(
            ElementSpec::new("html").child(ElementSpec::new("body").child(
                ElementSpec::new("button").attr("data-testid", "pay").text("Pay").rect(20.0, 440.0, 80.0, 24.0),
            )),
        ),
    ]
}

#[tokio::test]
async fn every_selector_resolves_to_its_origin() {
    let (doc, _) = page(rich_page());
    let scanner = scanner_for(&doc);
    let options = ScanOptions {
        include_shadow_dom: true,
        include_iframes: true,
        priority_mode: PriorityMode::Completeness,
        ..ScanOptions::default()
    };
    let elements = scanner.scan(&options).await;
    assert_eq!(elements.len(), 11);
    for element in &elements {
        assert!(
            resolves_to_origin(&doc, element),
            "{} ({:?}) does not resolve",
            element.selector,
            element.selector_source
        );
        assert!(dom_adapter::selector::validate(&element.selector).is_ok());
    }
}

#[tokio::test]
async fn escaped_id_still_yields_usable_selector() {
    let (doc, _) = page(vec![ElementSpec::new("button")
        .id("login:btn")
        .text("Log in")
        .rect(0.0, 0.0, 80.0, 24.0)]);
    let scanner = scanner_for(&doc);
    let elements = scanner.scan(&ScanOptions::default()).await;
    assert_eq!(elements.len(), 1);
    assert_eq!(elements[0].id, "login:btn");
    assert_eq!(elements[0].selector, "#login\\:btn");
    assert_eq!(elements[0].selector_source, SelectorSource::Id);
    assert!(resolves_to_origin(&doc, &elements[0]));
}

#[tokio::test]
async fn cached_scans_of_unchanged_document_are_identical() {
    let (doc, _) = page(rich_page());
    let scanner = scanner_for(&doc);
    assert_eq!(scanner.cache_state(), CacheState::Cold);

    let first = scanner.scan(&ScanOptions::default()).await;
    assert_eq!(scanner.cache_state(), CacheState::Warm);
    let second = scanner.scan(&ScanOptions::default()).await;
    assert_eq!(first, second);

    let uncached = scanner
        .scan(&ScanOptions {
            use_cache: false,
            ..ScanOptions::default()
        })
        .await;
    assert_eq!(first, uncached);
}

#[tokio::test]
async fn adding_interactive_element_invalidates_cache() {
    let (doc, body) = page(vec![button("Existing", 0)]);
    let scanner = scanner_for(&doc);
    let before = scanner.scan(&ScanOptions::default()).await;
    assert_eq!(before.len(), 1);

    doc.append_child(body, button("Fresh", 1)).unwrap();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(scanner.cache_state(), CacheState::Cold);

    let after = scanner.scan(&ScanOptions::default()).await;
    assert_eq!(after.len(), 2);
    assert!(after.iter().any(|element| element.text == "Fresh"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scan_right_after_a_mutation_never_hits_a_stale_entry() {
    let (doc, body) = page(vec![button("Existing", 0)]);
    let scanner = scanner_for(&doc);
    assert_eq!(scanner.scan(&ScanOptions::default()).await.len(), 1);

    for round in 1..=20 {
        doc.append_child(body, button(&format!("Fresh {round}"), round)).unwrap();
        let after = scanner.scan(&ScanOptions::default()).await;
        assert_eq!(after.len(), round + 1, "round {round}");
    }
}

#[tokio::test]
async fn non_interactive_mutations_keep_cache() {
    let (doc, body) = page(vec![button("Existing", 0)]);
    let scanner = scanner_for(&doc);
    let before = scanner.scan(&ScanOptions::default()).await;

    doc.append_child(body, ElementSpec::new("p").text("just prose")).unwrap();
    let node = before[0].node.unwrap();
    doc.set_attribute(node, "title", "tooltip").unwrap();
    sleep(Duration::from_millis(50)).await;

    assert_eq!(scanner.cache_state(), CacheState::Warm);
    assert_eq!(scanner.scan(&ScanOptions::default()).await, before);
}

#[tokio::test]
async fn equal_priority_keeps_discovery_order() {
    let (doc, _) = page(vec![button("Alpha", 0), button("Bravo", 1), button("Charlie", 2)]);
    let scanner = scanner_for(&doc);
    let elements = scanner.scan(&ScanOptions::default()).await;
    let texts: Vec<_> = elements.iter().map(|element| element.text.as_str()).collect();
    assert_eq!(texts, vec!["Alpha", "Bravo", "Charlie"]);
    assert!(elements.windows(2).all(|pair| pair[0].priority == pair[1].priority));
}

#[tokio::test]
async fn zero_limit_and_empty_documents_yield_nothing() {
    let (doc, _) = page(vec![button("Only", 0)]);
    let scanner = scanner_for(&doc);
    let none = scanner
        .scan(&ScanOptions {
            max_elements: 0,
            ..ScanOptions::default()
        })
        .await;
    assert!(none.is_empty());

    let (doc, _) = page(vec![
        ElementSpec::new("p").text("Nothing to click").rect(0.0, 0.0, 200.0, 20.0),
        ElementSpec::new("input").attr("type", "hidden").attr("name", "csrf"),
    ]);
    let scanner = scanner_for(&doc);
    assert!(scanner.scan(&ScanOptions::default()).await.is_empty());
}

#[tokio::test]
async fn limit_truncates_then_ranks() {
    let buttons: Vec<ElementSpec> = (0..150)
        .map(|index| {
            let spec = ElementSpec::new("button")
                .text(format!("Button {index}"))
                .rect(10.0, index as f64 * 5.0, 100.0, 4.0);
            if index % 10 == 0 {
                spec.class("btn-primary")
            } else {
                spec
            }
        })
        .collect();
    let (doc, _) = page(buttons);
    let scanner = scanner_for(&doc);
    let elements = scanner
        .scan(&ScanOptions {
            max_elements: 100,
            ..ScanOptions::default()
        })
        .await;

    assert_eq!(elements.len(), 100);
    assert!(elements.windows(2).all(|pair| pair[0].priority >= pair[1].priority));
    let leaders: Vec<_> = elements[..10].iter().map(|element| element.text.clone()).collect();
    let expected: Vec<_> = (0..100).step_by(10).map(|index| format!("Button {index}")).collect();
    assert_eq!(leaders, expected);
    assert!(elements.iter().all(|element| element.text != "Button 120"));
}

#[tokio::test]
async fn anchor_inside_button_collapses_to_outer() {
    let (doc, _) = page(vec![ElementSpec::new("button")
        .text("Outer")
        .rect(0.0, 0.0, 120.0, 30.0)
        .child(ElementSpec::new("a").attr("href", "/inner").text("inner").rect(5.0, 5.0, 40.0, 20.0))]);
    let scanner = scanner_for(&doc);

    let collapsed = scanner.scan(&ScanOptions::default()).await;
    assert_eq!(collapsed.len(), 1);
    assert_eq!(collapsed[0].tag, "button");

    let expanded = scanner
        .scan(&ScanOptions {
            collapse_nested: false,
            ..ScanOptions::default()
        })
        .await;
    assert_eq!(expanded.len(), 2);
    assert_eq!(expanded[0].tag, "button");
    assert_eq!(expanded[1].tag, "a");
    assert!(expanded[1].priority < expanded[0].priority);
}

#[tokio::test]
async fn link_inside_zero_area_wrapper_survives_collapse() {
    let (doc, _) = page(vec![ElementSpec::new("button")
        .rect(0.0, 0.0, 0.0, 0.0)
        .child(ElementSpec::new("a").attr("href", "/inner").text("Inner").rect(5.0, 5.0, 40.0, 20.0))]);
    let scanner = scanner_for(&doc);

    let elements = scanner.scan(&ScanOptions::default()).await;
    assert_eq!(elements.len(), 1);
    assert_eq!(elements[0].tag, "a");
    assert_eq!(elements[0].text, "Inner");

    let with_hidden = scanner
        .scan(&ScanOptions {
            include_invisible: true,
            ..ScanOptions::default()
        })
        .await;
    assert_eq!(with_hidden.len(), 1, "a kept wrapper still absorbs its children");
    assert_eq!(with_hidden[0].tag, "button");
    assert!(!with_hidden[0].visible);
}

#[tokio::test]
async fn invisible_elements_need_opt_in() {
    let (doc, _) = page(vec![
        button("Shown", 0),
        ElementSpec::new("button").text("No box"),
        ElementSpec::new("button").text("Hidden").attr("hidden", "").rect(0.0, 60.0, 80.0, 24.0),
        ElementSpec::new("button").text("Far away").rect(0.0, 5000.0, 80.0, 24.0),
    ]);
    let scanner = scanner_for(&doc);

    let visible = scanner.scan(&ScanOptions::default()).await;
    assert_eq!(visible.len(), 1);
    assert!(visible[0].visible);

    let all = scanner
        .scan(&ScanOptions {
            include_invisible: true,
            ..ScanOptions::default()
        })
        .await;
    assert_eq!(all.len(), 4);
    assert_eq!(all.iter().filter(|element| !element.visible).count(), 3);
}

#[tokio::test]
async fn shadow_and_frame_scopes_are_opt_in() {
    let (doc, _) = page(rich_page());
    let scanner = scanner_for(&doc);

    let flat = scanner.scan(&ScanOptions::default()).await;
    assert!(flat.iter().all(|element| element.scope.is_empty()));
    assert!(flat.iter().all(|element| element.text != "Shadow action" && element.text != "Pay"));

    let shadow = scanner
        .scan(&ScanOptions {
            include_shadow_dom: true,
            ..ScanOptions::default()
        })
        .await;
    let inner = shadow
        .iter()
        .find(|element| element.text == "Shadow action")
        .expect("shadow button scanned");
    assert_eq!(inner.scope.len(), 1);
    assert_eq!(inner.scope[0].host, "#widget");
    assert_eq!(inner.scope[0].kind, HopKind::Shadow);
    assert!(shadow.iter().all(|element| element.text != "Pay"));

    let framed = scanner
        .scan(&ScanOptions {
            include_iframes: true,
            ..ScanOptions::default()
        })
        .await;
    let pay = framed
        .iter()
        .find(|element| element.text == "Pay")
        .expect("frame button scanned");
    assert_eq!(pay.id, "pay");
    assert_eq!(pay.selector, "[data-testid=\"pay\"]");
    assert_eq!(pay.scope[0].kind, HopKind::Frame);
    assert_eq!(scanner.relocate(pay).await, pay.node);
}

#[tokio::test]
async fn relocate_prefers_selector_when_hint_is_stale() {
    let (doc, body) = page(vec![ElementSpec::new("button")
        .attr("data-testid", "checkout")
        .text("Checkout")
        .rect(0.0, 0.0, 80.0, 24.0)]);
    let scanner = scanner_for(&doc);
    let elements = scanner.scan(&ScanOptions::default()).await;
    let original = elements[0].node.unwrap();
    assert_eq!(scanner.relocate(&elements[0]).await, Some(original));

    doc.remove_node(original).unwrap();
    assert_eq!(scanner.relocate(&elements[0]).await, None);

    let replacement = doc
        .append_child(
            body,
            ElementSpec::new("button")
                .attr("data-testid", "checkout")
                .text("Checkout")
                .rect(0.0, 0.0, 80.0, 24.0),
        )
        .unwrap();
    assert_eq!(scanner.relocate(&elements[0]).await, Some(replacement));

    let mut detached = elements[0].clone();
    detached.node = None;
    assert_eq!(scanner.relocate(&detached).await, Some(replacement));
}

#[tokio::test]
async fn waits_for_late_content() {
    let (doc, body) = page(Vec::new());
    let scanner = scanner_for(&doc);

    let late = Arc::clone(&doc);
    tokio::spawn(async move {
        sleep(Duration::from_millis(30)).await;
        late.append_child(body, button("Late", 0)).unwrap();
    });

    let elements = scanner
        .scan(&ScanOptions {
            wait_for_content_ms: Some(1_000),
            ..ScanOptions::default()
        })
        .await;
    assert_eq!(elements.len(), 1);
    assert_eq!(elements[0].text, "Late");
}

#[tokio::test]
async fn ttl_expiry_and_manual_invalidation() {
    let (doc, _) = page(vec![button("One", 0)]);
    let policy = ScannerPolicy {
        cache_ttl_ms: 30,
        ..ScannerPolicy::default()
    };
    let scanner =
        ElementScanner::with_policy(Arc::new(DocumentAdapterPort::new(Arc::clone(&doc))), policy)
            .unwrap();

    scanner.scan(&ScanOptions::default()).await;
    assert_eq!(scanner.cache_state(), CacheState::Warm);
    sleep(Duration::from_millis(60)).await;
    assert_eq!(scanner.cache_state(), CacheState::Cold);

    scanner.scan(&ScanOptions::default()).await;
    scanner.invalidate();
    assert_eq!(scanner.cache_state(), CacheState::Cold);
}

#[tokio::test]
async fn shutdown_detaches_observer() {
    let (doc, _) = page(vec![button("One", 0)]);
    let scanner = scanner_for(&doc);
    assert!(!scanner.is_observing());
    scanner.scan(&ScanOptions::default()).await;
    scanner.scan(&ScanOptions::default()).await;
    assert!(scanner.is_observing());

    scanner.shutdown().await;
    assert!(!scanner.is_observing());
    assert_eq!(scanner.cache_state(), CacheState::Cold);
}

#[test]
fn invalid_heuristic_pattern_is_rejected() {
    let (doc, _) = page(Vec::new());
    let policy = ScannerPolicy {
        heuristics: HeuristicPatterns {
            generated_class_patterns: vec!["[".into()],
            ..HeuristicPatterns::default()
        },
        ..ScannerPolicy::default()
    };
    let result = ElementScanner::with_policy(Arc::new(DocumentAdapterPort::new(doc)), policy);
    assert!(matches!(result, Err(ScanError::InvalidPattern { .. })));
}

#[tokio::test]
async fn scanned_elements_serialize_without_node_hint() {
    let (doc, _) = page(vec![button("Save", 0)]);
    let scanner = scanner_for(&doc);
    let elements = scanner.scan(&ScanOptions::default()).await;
    let json = serde_json::to_value(&elements[0]).unwrap();
    assert_eq!(json["selector"], "html > body > button");
    assert_eq!(json["selector_source"], "positional");
    assert_eq!(json["role"], "button");
    assert!(json.get("node").is_none());
    assert!(json.get("scope").is_none());
}

/// Fails `describe` for one node and `text_content` for another.
struct FlakyPort {
    inner: DocumentAdapterPort,
    fail_describe: NodeId,
    fail_text: NodeId,
}

#[async_trait]
impl DocumentPort for FlakyPort {
    fn document_root(&self) -> NodeId {
        self.inner.document_root()
    }

    fn subscribe(&self) -> MutationStream {
        self.inner.subscribe()
    }

    async fn viewport(&self) -> Result<Viewport, ScanError> {
        self.inner.viewport().await
    }

    async fn query_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, ScanError> {
        self.inner.query_all(scope, selector).await
    }

    async fn matches(&self, node: NodeId, selector: &str) -> Result<bool, ScanError> {
        self.inner.matches(node, selector).await
    }

    async fn describe(&self, node: NodeId) -> Result<NodeView, ScanError> {
        if node == self.fail_describe {
            return Err(ScanError::Document("describe failed".into()));
        }
        self.inner.describe(node).await
    }

    async fn ancestors(&self, node: NodeId) -> Result<Vec<NodeId>, ScanError> {
        self.inner.ancestors(node).await
    }

    async fn same_type_position(&self, node: NodeId) -> Result<(usize, usize), ScanError> {
        self.inner.same_type_position(node).await
    }

    async fn text_content(&self, node: NodeId) -> Result<String, ScanError> {
        if node == self.fail_text {
            return Err(ScanError::Detached(node));
        }
        self.inner.text_content(node).await
    }

    async fn nested_scopes(&self, scope: NodeId) -> Result<Vec<NestedScope>, ScanError> {
        self.inner.nested_scopes(scope).await
    }

    async fn is_connected(&self, node: NodeId) -> bool {
        self.inner.is_connected(node).await
    }
}

#[tokio::test]
async fn unreadable_elements_are_skipped_and_counted() {
    let (doc, _) = page(vec![
        button("First", 0),
        button("Second", 1),
        button("Third", 2),
        button("Fourth", 3),
    ]);
    let buttons = doc.query_selector_all(doc.root(), "button").unwrap();
    assert_eq!(buttons.len(), 4);
    let port = FlakyPort {
        inner: DocumentAdapterPort::new(Arc::clone(&doc)),
        fail_describe: buttons[1],
        fail_text: buttons[3],
    };
    let scanner = ElementScanner::new(Arc::new(port)).unwrap();

    let skipped_before = metrics::snapshot().elements_skipped;
    let elements = scanner.scan(&ScanOptions::default()).await;

    let texts: Vec<&str> = elements.iter().map(|element| element.text.as_str()).collect();
    assert_eq!(texts, vec!["First", "Third"]);
    // counters are process-wide and other tests run concurrently
    assert!(metrics::snapshot().elements_skipped >= skipped_before + 2);
}
