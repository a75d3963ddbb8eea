use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::collect::CollectStrategy;
use crate::errors::ScanError;

/// How many collection strategies a scan runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityMode {
    Speed,
    #[default]
    Balanced,
    Completeness,
}

impl PriorityMode {
    pub fn strategies(&self) -> &'static [CollectStrategy] {
        match self {
            PriorityMode::Speed => &[CollectStrategy::Semantic, CollectStrategy::AriaRole],
            PriorityMode::Balanced => &[
                CollectStrategy::Semantic,
                CollectStrategy::AriaRole,
                CollectStrategy::ClickHandler,
            ],
            PriorityMode::Completeness => &[
                CollectStrategy::Semantic,
                CollectStrategy::AriaRole,
                CollectStrategy::ClickHandler,
                CollectStrategy::ClassHeuristic,
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityMode::Speed => "speed",
            PriorityMode::Balanced => "balanced",
            PriorityMode::Completeness => "completeness",
        }
    }
}

impl fmt::Display for PriorityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriorityMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "speed" => Ok(PriorityMode::Speed),
            "balanced" => Ok(PriorityMode::Balanced),
            "completeness" => Ok(PriorityMode::Completeness),
            other => Err(format!(
                "unknown priority mode `{other}` (expected speed, balanced or completeness)"
            )),
        }
    }
}

/// Per-call scan options. Everything except `use_cache` is part of the cache key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    pub max_elements: usize,
    pub use_cache: bool,
    pub priority_mode: PriorityMode,
    pub include_invisible: bool,
    pub include_shadow_dom: bool,
    pub include_iframes: bool,
    /// Drop candidates that sit inside another candidate.
    pub collapse_nested: bool,
    /// Poll for up to this long for interactive content to show up before collecting.
    pub wait_for_content_ms: Option<u64>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_elements: 100,
            use_cache: true,
            priority_mode: PriorityMode::Balanced,
            include_invisible: false,
            include_shadow_dom: false,
            include_iframes: false,
            collapse_nested: true,
            wait_for_content_ms: None,
        }
    }
}

impl ScanOptions {
    pub fn cache_key(&self) -> String {
        format!(
            "scan:{}:{}:inv={}:shadow={}:frames={}:collapse={}:wait={}",
            self.max_elements,
            self.priority_mode,
            self.include_invisible,
            self.include_shadow_dom,
            self.include_iframes,
            self.collapse_nested,
            self.wait_for_content_ms.unwrap_or(0),
        )
    }

    pub fn wait_for_content(&self) -> Option<Duration> {
        self.wait_for_content_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

/// Regex pattern lists used by the heuristic checks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicPatterns {
    /// Class tokens that suggest a clickable control.
    pub interactive_class_patterns: Vec<String>,
    /// Class tokens produced by CSS-in-JS or module bundlers, or transient state classes.
    pub generated_class_patterns: Vec<String>,
    /// Class tokens that mark the main call to action.
    pub primary_action_patterns: Vec<String>,
}

impl Default for HeuristicPatterns {
    fn default() -> Self {
        Self {
            interactive_class_patterns: vec![
                r"(?i)(^|[-_])btn([-_]|$)".into(),
                r"(?i)button".into(),
                r"(?i)(^|[-_])(action|clickable|cta|link|toggle|menu-item)([-_]|$)".into(),
            ],
            generated_class_patterns: vec![
                r"^(css|sc|jsx|emotion|styled)-[A-Za-z0-9_-]+$".into(),
                r"^[A-Za-z][A-Za-z0-9]*_[A-Za-z0-9]+__[A-Za-z0-9_-]{4,}$".into(),
                r"^_?[A-Za-z]{0,3}[0-9][A-Za-z0-9]{4,}$".into(),
                r"[0-9a-f]{8,}".into(),
                r"^(is-|has-)?(active|hover|focus|focused|selected|disabled|open|hidden|visible)$"
                    .into(),
            ],
            primary_action_patterns: vec![
                r"(?i)(^|[-_])(primary|cta|submit|main-action)([-_]|$)".into(),
            ],
        }
    }
}

impl HeuristicPatterns {
    pub fn compile(&self) -> Result<CompiledHeuristics, ScanError> {
        Ok(CompiledHeuristics {
            interactive: compile_all(&self.interactive_class_patterns)?,
            generated: compile_all(&self.generated_class_patterns)?,
            primary: compile_all(&self.primary_action_patterns)?,
        })
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, ScanError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|err| ScanError::InvalidPattern {
                pattern: pattern.clone(),
                reason: err.to_string(),
            })
        })
        .collect()
}

#[derive(Clone, Debug)]
pub struct CompiledHeuristics {
    interactive: Vec<Regex>,
    generated: Vec<Regex>,
    primary: Vec<Regex>,
}

impl CompiledHeuristics {
    pub fn is_interactive_class(&self, token: &str) -> bool {
        self.interactive.iter().any(|re| re.is_match(token))
    }

    pub fn is_generated_class(&self, token: &str) -> bool {
        self.generated.iter().any(|re| re.is_match(token))
    }

    pub fn is_primary_class(&self, token: &str) -> bool {
        self.primary.iter().any(|re| re.is_match(token))
    }
}

/// Scanner-wide tuning, fixed for the lifetime of one scanner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerPolicy {
    pub cache_ttl_ms: u64,
    /// Tolerance around the viewport for near-offscreen elements, in CSS pixels.
    pub viewport_margin: f64,
    pub text_limit: usize,
    /// Longest `aria-label` still used as a selector.
    pub label_limit: usize,
    /// Visibility checks between cooperative yields.
    pub batch_size: usize,
    pub wait_poll_ms: u64,
    /// Checked in order; the first one present wins.
    pub test_id_attributes: Vec<String>,
    pub heuristics: HeuristicPatterns,
}

impl Default for ScannerPolicy {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 2_000,
            viewport_margin: 100.0,
            text_limit: 100,
            label_limit: 60,
            batch_size: 25,
            wait_poll_ms: 50,
            test_id_attributes: vec![
                "data-testid".into(),
                "data-test-id".into(),
                "data-test".into(),
                "data-cy".into(),
                "data-qa".into(),
            ],
            heuristics: HeuristicPatterns::default(),
        }
    }
}

impl ScannerPolicy {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn wait_poll(&self) -> Duration {
        Duration::from_millis(self.wait_poll_ms.max(1))
    }

    pub fn test_id_of<'a>(&self, view: &'a dom_adapter::NodeView) -> Option<(&str, &'a str)> {
        self.test_id_attributes.iter().find_map(|name| {
            view.attr(name)
                .filter(|value| !value.trim().is_empty())
                .map(|value| (name.as_str(), value))
        })
    }
}
