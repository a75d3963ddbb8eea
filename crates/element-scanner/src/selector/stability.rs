use crate::policy::CompiledHeuristics;

const MAX_CLASS_LEN: usize = 48;

/// A class token worth anchoring a selector on: short, human-authored and not a
/// transient state class.
pub fn is_stable_class(token: &str, heuristics: &CompiledHeuristics) -> bool {
    !token.is_empty()
        && token.chars().count() <= MAX_CLASS_LEN
        && !token.chars().any(char::is_control)
        && !heuristics.is_generated_class(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::HeuristicPatterns;

    #[test]
    fn filters_generated_tokens() {
        let heuristics = HeuristicPatterns::default().compile().unwrap();
        assert!(is_stable_class("checkout-button", &heuristics));
        assert!(is_stable_class("nav:item", &heuristics));
        assert!(!is_stable_class("css-19kzrtu", &heuristics));
        assert!(!is_stable_class("selected", &heuristics));
        assert!(!is_stable_class("", &heuristics));
        assert!(!is_stable_class(&"x".repeat(80), &heuristics));
    }
}
