use dom_adapter::NodeView;

use crate::policy::CompiledHeuristics;

pub const EXPLICIT_ROLE_BONUS: i32 = 10;
pub const TEST_ID_BONUS: i32 = 15;
pub const LABEL_BONUS: i32 = 10;
pub const PRIMARY_ACTION_BONUS: i32 = 20;
pub const NESTED_PENALTY: i32 = 30;

/// Facts about one element that feed its score.
#[derive(Clone, Copy, Debug, Default)]
pub struct PriorityInputs {
    pub explicit_role: bool,
    pub has_test_id: bool,
    pub nested: bool,
}

/// Natively interactive tags outrank generically clickable ones.
pub fn base_score(view: &NodeView) -> i32 {
    match view.tag.as_str() {
        "button" => 100,
        "input" => match view.attr("type").map(str::to_ascii_lowercase).as_deref() {
            Some("submit") | Some("button") | Some("reset") | Some("image") => 100,
            _ => 90,
        },
        "select" | "textarea" => 85,
        "a" if view.has_attr("href") => 80,
        "summary" => 70,
        _ if view.has_attr("role") => 60,
        _ if view.has_attr("onclick") => 50,
        _ => 40,
    }
}

pub fn score(view: &NodeView, inputs: PriorityInputs, heuristics: &CompiledHeuristics) -> i32 {
    let mut score = base_score(view);
    if inputs.explicit_role {
        score += EXPLICIT_ROLE_BONUS;
    }
    if inputs.has_test_id {
        score += TEST_ID_BONUS;
    }
    if has_accessible_label(view) {
        score += LABEL_BONUS;
    }
    if view.classes().any(|class| heuristics.is_primary_class(class)) {
        score += PRIMARY_ACTION_BONUS;
    }
    if inputs.nested {
        score -= NESTED_PENALTY;
    }
    score
}

fn has_accessible_label(view: &NodeView) -> bool {
    ["aria-label", "aria-labelledby"]
        .iter()
        .any(|name| view.attr(name).map_or(false, |value| !value.trim().is_empty()))
}
