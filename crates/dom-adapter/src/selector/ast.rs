/// A comma separated selector list. Matches when any member matches.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectorList(pub Vec<ComplexSelector>);

/// Compounds joined by combinators, left to right as written.
///
/// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct ComplexSelector {
    pub compounds: Vec<Compound>,
    pub combinators: Vec<Combinator>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Compound {
    /// Lowercased type selector; `None` for `*` or an implicit universal.
    pub tag: Option<String>,
    pub simple: Vec<Simple>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Simple {
    Id(String),
    Class(String),
    Attr {
        name: String,
        matcher: Option<(AttrOp, String)>,
    },
    Not(Vec<Compound>),
    NthOfType(Nth),
    FirstOfType,
    LastOfType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttrOp {
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

/// The `an+b` microsyntax.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nth {
    pub a: i64,
    pub b: i64,
}

impl Nth {
    /// Whether the 1-based `position` is produced by some `n >= 0`.
    pub fn matches(&self, position: usize) -> bool {
        let position = position as i64;
        if self.a == 0 {
            return position == self.b;
        }
        let diff = position - self.b;
        diff % self.a == 0 && diff / self.a >= 0
    }
}
