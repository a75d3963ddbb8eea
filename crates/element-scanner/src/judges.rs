use std::collections::BTreeMap;

use dom_adapter::NodeView;
use elementscan_core_types::Viewport;

use crate::model::JudgeReport;
use crate::policy::CompiledHeuristics;

/// Geometry plus the usual hiding mechanisms. `viewport_margin` widens the viewport on
/// every side so near-offscreen elements still count.
pub fn visible(view: &NodeView, viewport: &Viewport, viewport_margin: f64) -> JudgeReport {
    let mut issues = Vec::new();

    match &view.rect {
        Some(rect) => {
            if !rect.has_extent() {
                issues.push("zero_area".to_string());
            } else if !rect.intersects(viewport, viewport_margin) {
                issues.push("offscreen".to_string());
            }
        }
        None => issues.push("missing_geometry".to_string()),
    }

    if attr_flag_true(&view.attributes, "hidden") {
        issues.push("hidden_attribute".into());
    }
    if view
        .attr("aria-hidden")
        .map_or(false, |value| value.trim().eq_ignore_ascii_case("true"))
    {
        issues.push("aria_hidden".into());
    }

    let hints = style_hints(view);
    if hints.hides {
        issues.push("style_hidden".into());
    }
    if hints.zero_opacity {
        issues.push("opacity_zero".into());
    }

    let ok = issues.is_empty();
    JudgeReport {
        ok,
        reason: format_reason(if ok { "visible" } else { "not_visible" }, &issues),
    }
}

/// Gate for class-heuristic candidates: the class must follow a button/action naming
/// convention and the element must carry some other interaction signal.
pub fn looks_interactive(view: &NodeView, heuristics: &CompiledHeuristics) -> JudgeReport {
    let mut issues = Vec::new();

    if !view.classes().any(|class| heuristics.is_interactive_class(class)) {
        issues.push("no_interactive_class".to_string());
    }

    let hints = style_hints(view);
    if hints.pointer_blocked {
        issues.push("pointer_events_none".into());
    }
    if is_disabled(view) {
        issues.push("disabled".into());
    }

    let focusable = view
        .attr("tabindex")
        .and_then(|value| value.trim().parse::<i32>().ok())
        .map_or(false, |index| index >= 0);
    let has_extent = view.rect.map_or(false, |rect| rect.has_extent());
    if !(hints.cursor_pointer || focusable || has_extent) {
        issues.push("no_interaction_signal".into());
    }

    let ok = issues.is_empty();
    JudgeReport {
        ok,
        reason: format_reason(if ok { "interactive" } else { "not_interactive" }, &issues),
    }
}

pub fn is_disabled(view: &NodeView) -> bool {
    attr_flag_true(&view.attributes, "disabled")
        || view
            .attr("aria-disabled")
            .map_or(false, |value| value.trim().eq_ignore_ascii_case("true"))
}

/// Boolean attribute semantics: present means true unless spelled as an explicit false.
fn attr_flag_true(attrs: &BTreeMap<String, String>, key: &str) -> bool {
    attrs.get(key).map_or(false, |value| {
        !matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "false" | "0" | "no" | "off"
        )
    })
}

fn format_reason(base: &str, issues: &[String]) -> String {
    if issues.is_empty() {
        base.to_string()
    } else {
        format!("{}({})", base, issues.join(","))
    }
}

#[derive(Default)]
struct StyleHints {
    hides: bool,
    zero_opacity: bool,
    pointer_blocked: bool,
    cursor_pointer: bool,
}

impl StyleHints {
    fn apply(&mut self, property: &str, value: &str) {
        let value = value.trim().to_ascii_lowercase();
        match property.trim().to_ascii_lowercase().as_str() {
            "display" if value == "none" => self.hides = true,
            "visibility" if value == "hidden" || value == "collapse" => self.hides = true,
            "opacity" => {
                if value.parse::<f32>().map_or(false, |opacity| opacity <= 0.0) {
                    self.zero_opacity = true;
                }
            }
            "pointer-events" if value == "none" => self.pointer_blocked = true,
            "cursor" if value == "pointer" => self.cursor_pointer = true,
            _ => {}
        }
    }
}

/// Computed style first, then the inline `style` attribute.
fn style_hints(view: &NodeView) -> StyleHints {
    let mut hints = StyleHints::default();
    for (property, value) in &view.style {
        hints.apply(property, value);
    }
    if let Some(inline) = view.attr("style") {
        for declaration in inline.split(';') {
            if let Some((property, value)) = declaration.split_once(':') {
                let value = value.trim().trim_end_matches("!important");
                hints.apply(property, value);
            }
        }
    }
    hints
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::HeuristicPatterns;
    use elementscan_core_types::{NodeId, Rect};

    fn view(tag: &str, attrs: &[(&str, &str)], rect: Option<Rect>) -> NodeView {
        NodeView {
            id: NodeId(1),
            tag: tag.into(),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            text: String::new(),
            rect,
            style: BTreeMap::new(),
            parent: None,
            scope_root: NodeId(0),
            shadow_root: None,
            content_document: None,
        }
    }

    fn on_screen() -> Option<Rect> {
        Some(Rect::new(10.0, 10.0, 80.0, 24.0))
    }

    #[test]
    fn visible_requires_extent_and_viewport_overlap() {
        let viewport = Viewport::default();
        assert!(visible(&view("button", &[], on_screen()), &viewport, 0.0).ok);

        let zero = visible(&view("button", &[], Some(Rect::new(0.0, 0.0, 0.0, 20.0))), &viewport, 0.0);
        assert!(!zero.ok);
        assert!(zero.reason.contains("zero_area"));

        let below = Some(Rect::new(10.0, 850.0, 80.0, 24.0));
        assert!(!visible(&view("button", &[], below), &viewport, 0.0).ok);
        assert!(visible(&view("button", &[], below), &viewport, 100.0).ok);

        let missing = visible(&view("button", &[], None), &viewport, 0.0);
        assert_eq!(missing.reason, "not_visible(missing_geometry)");
    }

    #[test]
    fn hiding_attributes_and_styles() {
        let viewport = Viewport::default();
        for attrs in [
            vec![("hidden", "")],
            vec![("aria-hidden", "true")],
            vec![("style", "display: none")],
            vec![("style", "color: red; visibility:hidden !important")],
            vec![("style", "opacity:0")],
        ] {
            let report = visible(&view("button", &attrs, on_screen()), &viewport, 0.0);
            assert!(!report.ok, "{attrs:?} should hide");
        }
        assert!(visible(&view("button", &[("aria-hidden", "false")], on_screen()), &viewport, 0.0).ok);

        let mut styled = view("button", &[], on_screen());
        styled.style.insert("display".into(), "none".into());
        assert!(!visible(&styled, &viewport, 0.0).ok);
    }

    #[test]
    fn looks_interactive_needs_class_and_signal() {
        let heuristics = HeuristicPatterns::default().compile().unwrap();
        assert!(looks_interactive(&view("div", &[("class", "btn")], on_screen()), &heuristics).ok);
        assert!(!looks_interactive(&view("div", &[("class", "card")], on_screen()), &heuristics).ok);
        assert!(!looks_interactive(&view("div", &[("class", "btn")], None), &heuristics).ok);
        assert!(
            looks_interactive(
                &view("div", &[("class", "btn"), ("style", "cursor: pointer")], None),
                &heuristics
            )
            .ok
        );
        let disabled = looks_interactive(
            &view("div", &[("class", "btn"), ("aria-disabled", "true")], on_screen()),
            &heuristics,
        );
        assert!(!disabled.ok);
        assert!(disabled.reason.contains("disabled"));
    }
}
