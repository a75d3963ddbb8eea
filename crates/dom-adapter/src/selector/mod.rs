//! Selector subset: type, universal, id, class, attribute operators, `:not()`,
//! `:nth-of-type()`, `:first-of-type`, `:last-of-type`, descendant and child combinators,
//! and comma lists.

pub mod ast;
pub(crate) mod matcher;
pub mod parser;

pub use ast::SelectorList;
pub use parser::parse;

/// Returns the parse error for `selector`, if any, without touching a document.
pub fn validate(selector: &str) -> Result<(), crate::errors::DomError> {
    parse(selector).map(|_| ())
}
