use elementscan_core_types::NodeId;

use super::ast::{AttrOp, Combinator, ComplexSelector, Compound, SelectorList, Simple};
use crate::tree::{NodeRecord, Tree};

pub(crate) fn matches_list(tree: &Tree, node: NodeId, list: &SelectorList) -> bool {
    list.0
        .iter()
        .any(|complex| matches_complex(tree, node, complex, complex.compounds.len() - 1))
}

/// Right-to-left match of `complex.compounds[..=index]` ending at `node`.
fn matches_complex(tree: &Tree, node: NodeId, complex: &ComplexSelector, index: usize) -> bool {
    if !matches_compound(tree, node, &complex.compounds[index]) {
        return false;
    }
    if index == 0 {
        return true;
    }
    match complex.combinators[index - 1] {
        Combinator::Child => tree
            .parent_element(node)
            .map_or(false, |parent| matches_complex(tree, parent, complex, index - 1)),
        Combinator::Descendant => {
            let mut current = tree.parent_element(node);
            while let Some(ancestor) = current {
                if matches_complex(tree, ancestor, complex, index - 1) {
                    return true;
                }
                current = tree.parent_element(ancestor);
            }
            false
        }
    }
}

fn matches_compound(tree: &Tree, node: NodeId, compound: &Compound) -> bool {
    let Ok(record) = tree.element(node) else {
        return false;
    };
    if let Some(tag) = &compound.tag {
        if &record.tag != tag {
            return false;
        }
    }
    compound
        .simple
        .iter()
        .all(|simple| matches_simple(tree, node, record, simple))
}

fn matches_simple(tree: &Tree, node: NodeId, record: &NodeRecord, simple: &Simple) -> bool {
    match simple {
        Simple::Id(id) => record.attr("id") == Some(id.as_str()),
        Simple::Class(class) => record
            .attr("class")
            .map_or(false, |value| value.split_whitespace().any(|token| token == class)),
        Simple::Attr { name, matcher } => match (record.attr(name), matcher) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(actual), Some((op, expected))) => attr_matches(actual, *op, expected),
        },
        Simple::Not(inner) => !inner
            .iter()
            .any(|compound| matches_compound(tree, node, compound)),
        Simple::NthOfType(nth) => tree
            .same_type_position(node)
            .map_or(false, |(index, _)| nth.matches(index)),
        Simple::FirstOfType => tree
            .same_type_position(node)
            .map_or(false, |(index, _)| index == 1),
        Simple::LastOfType => tree
            .same_type_position(node)
            .map_or(false, |(index, count)| index == count),
    }
}

fn attr_matches(actual: &str, op: AttrOp, expected: &str) -> bool {
    match op {
        AttrOp::Equals => actual == expected,
        AttrOp::Includes => {
            !expected.is_empty()
                && !expected.contains(char::is_whitespace)
                && actual.split_whitespace().any(|token| token == expected)
        }
        AttrOp::DashMatch => {
            actual == expected
                || actual
                    .strip_prefix(expected)
                    .map_or(false, |rest| rest.starts_with('-'))
        }
        AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected),
        AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected),
        AttrOp::Substring => !expected.is_empty() && actual.contains(expected),
    }
}
