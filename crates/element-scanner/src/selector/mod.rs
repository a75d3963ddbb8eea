//! Selector generation: escaping, class stability and the rule chain.

pub mod escape;
pub mod generate;
pub mod stability;

pub use escape::{attr_equals, escape_ident, escape_string};
pub use generate::{GeneratedSelector, SelectorGenerator};
pub use stability::is_stable_class;
