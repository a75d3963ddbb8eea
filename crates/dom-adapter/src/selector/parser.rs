//! Parser for the selector subset understood by the in-memory document.
//!
//! Anything outside the subset is rejected with [`DomError::InvalidSelector`], the same
//! way `querySelectorAll` throws on a syntax error.

use super::ast::{AttrOp, Combinator, ComplexSelector, Compound, Nth, SelectorList, Simple};
use crate::errors::DomError;

pub fn parse(selector: &str) -> Result<SelectorList, DomError> {
    let mut parser = Parser::new(selector);
    parser.parse_list()
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl AsRef<str>) -> DomError {
        DomError::invalid_selector(
            self.source,
            format!("{} at offset {}", reason.as_ref(), self.pos),
        )
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if is_whitespace(c)) {
            self.pos += 1;
        }
        self.pos != start
    }

    fn expect(&mut self, expected: char) -> Result<(), DomError> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!("expected '{expected}', found '{c}'"))),
            None => Err(self.error(format!("expected '{expected}', found end of input"))),
        }
    }

    fn parse_list(&mut self) -> Result<SelectorList, DomError> {
        let mut selectors = Vec::new();
        loop {
            self.skip_ws();
            selectors.push(self.parse_complex()?);
            self.skip_ws();
            match self.peek() {
                None => break,
                Some(',') => {
                    self.bump();
                }
                Some(c) => return Err(self.error(format!("unexpected '{c}'"))),
            }
        }
        Ok(SelectorList(selectors))
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector, DomError> {
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_ws = self.skip_ws();
            match self.peek() {
                None | Some(',') | Some(')') => break,
                Some('>') => {
                    self.bump();
                    self.skip_ws();
                    combinators.push(Combinator::Child);
                }
                Some('+') | Some('~') => {
                    return Err(self.error("sibling combinators are not supported"))
                }
                Some(_) if had_ws => combinators.push(Combinator::Descendant),
                Some(c) => return Err(self.error(format!("unexpected '{c}'"))),
            }
            compounds.push(self.parse_compound()?);
        }
        Ok(ComplexSelector {
            compounds,
            combinators,
        })
    }

    fn parse_compound(&mut self) -> Result<Compound, DomError> {
        let mut compound = Compound::default();
        let mut consumed = false;

        match self.peek() {
            Some('*') => {
                self.bump();
                consumed = true;
            }
            Some(_) if self.starts_ident() => {
                compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
                consumed = true;
            }
            _ => {}
        }

        loop {
            let simple = match self.peek() {
                Some('#') => {
                    self.bump();
                    Simple::Id(self.parse_ident()?)
                }
                Some('.') => {
                    self.bump();
                    Simple::Class(self.parse_ident()?)
                }
                Some('[') => self.parse_attribute()?,
                Some(':') => self.parse_pseudo()?,
                _ => break,
            };
            compound.simple.push(simple);
            consumed = true;
        }

        if consumed {
            Ok(compound)
        } else {
            match self.peek() {
                Some(c) => Err(self.error(format!("unexpected '{c}'"))),
                None => Err(self.error("expected a selector")),
            }
        }
    }

    fn parse_attribute(&mut self) -> Result<Simple, DomError> {
        self.expect('[')?;
        self.skip_ws();
        if !self.starts_ident() {
            return Err(self.error("expected attribute name"));
        }
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_ws();

        let op = match (self.peek(), self.peek_at(1)) {
            (Some(']'), _) => None,
            (Some('='), _) => {
                self.bump();
                Some(AttrOp::Equals)
            }
            (Some(c), Some('=')) => {
                let op = match c {
                    '~' => AttrOp::Includes,
                    '|' => AttrOp::DashMatch,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    '*' => AttrOp::Substring,
                    other => return Err(self.error(format!("unknown attribute operator '{other}='"))),
                };
                self.bump();
                self.bump();
                Some(op)
            }
            (Some(c), _) => return Err(self.error(format!("unexpected '{c}' in attribute selector"))),
            (None, _) => return Err(self.error("unterminated attribute selector")),
        };

        let matcher = match op {
            Some(op) => {
                self.skip_ws();
                let value = match self.peek() {
                    Some(quote @ ('"' | '\'')) => self.parse_string(quote)?,
                    Some(_) if self.starts_ident() => self.parse_ident()?,
                    _ => return Err(self.error("expected attribute value")),
                };
                self.skip_ws();
                Some((op, value))
            }
            None => None,
        };

        self.expect(']')?;
        Ok(Simple::Attr { name, matcher })
    }

    fn parse_pseudo(&mut self) -> Result<Simple, DomError> {
        self.expect(':')?;
        if self.peek() == Some(':') {
            return Err(self.error("pseudo-elements are not supported"));
        }
        let name = self.parse_ident()?.to_ascii_lowercase();
        match name.as_str() {
            "not" => {
                self.expect('(')?;
                self.skip_ws();
                let mut inner = Vec::new();
                loop {
                    inner.push(self.parse_compound()?);
                    self.skip_ws();
                    match self.bump() {
                        Some(',') => {
                            self.skip_ws();
                        }
                        Some(')') => break,
                        _ => return Err(self.error("unterminated :not()")),
                    }
                }
                Ok(Simple::Not(inner))
            }
            "nth-of-type" => {
                self.expect('(')?;
                let mut argument = String::new();
                loop {
                    match self.bump() {
                        Some(')') => break,
                        Some(c) => argument.push(c),
                        None => return Err(self.error("unterminated :nth-of-type()")),
                    }
                }
                let nth = parse_nth(&argument).ok_or_else(|| {
                    self.error(format!("invalid :nth-of-type argument '{}'", argument.trim()))
                })?;
                Ok(Simple::NthOfType(nth))
            }
            "first-of-type" => Ok(Simple::FirstOfType),
            "last-of-type" => Ok(Simple::LastOfType),
            other => Err(self.error(format!("unsupported pseudo-class ':{other}'"))),
        }
    }

    fn starts_ident(&self) -> bool {
        let first = self.peek();
        let second = self.peek_at(1);
        let third = self.peek_at(2);
        match first {
            Some('-') => match second {
                Some(c) if is_name_start(c) || c == '-' => true,
                Some('\\') => third.map_or(false, |c| c != '\n'),
                _ => false,
            },
            Some('\\') => second.map_or(false, |c| c != '\n'),
            Some(c) => is_name_start(c),
            None => false,
        }
    }

    fn parse_ident(&mut self) -> Result<String, DomError> {
        if !self.starts_ident() {
            return Err(match self.peek() {
                Some(c) => self.error(format!("expected identifier, found '{c}'")),
                None => self.error("expected identifier, found end of input"),
            });
        }
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                if self.peek_at(1) == Some('\n') {
                    break;
                }
                self.bump();
                out.push(self.consume_escape());
            } else if is_name_char(c) {
                self.bump();
                out.push(c);
            } else {
                break;
            }
        }
        Ok(out)
    }

    fn parse_string(&mut self, quote: char) -> Result<String, DomError> {
        self.expect(quote)?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => break,
                Some('\n') => return Err(self.error("newline in string")),
                Some('\\') => match self.peek() {
                    None => {}
                    Some('\n') => {
                        self.bump();
                    }
                    Some(_) => out.push(self.consume_escape()),
                },
                Some(c) => out.push(c),
            }
        }
        Ok(out)
    }

    /// Called with the backslash already consumed.
    fn consume_escape(&mut self) -> char {
        let Some(first) = self.bump() else {
            return char::REPLACEMENT_CHARACTER;
        };
        if !first.is_ascii_hexdigit() {
            return first;
        }
        let mut hex = String::from(first);
        while hex.len() < 6 {
            match self.peek() {
                Some(c) if c.is_ascii_hexdigit() => {
                    hex.push(c);
                    self.bump();
                }
                _ => break,
            }
        }
        if matches!(self.peek(), Some(c) if is_whitespace(c)) {
            self.bump();
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .filter(|code| *code != 0)
            .and_then(char::from_u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER)
    }
}

fn parse_nth(argument: &str) -> Option<Nth> {
    let compact: String = argument
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    match compact.as_str() {
        "" => return None,
        "odd" => return Some(Nth { a: 2, b: 1 }),
        "even" => return Some(Nth { a: 2, b: 0 }),
        _ => {}
    }
    match compact.split_once('n') {
        Some((a, b)) => {
            let a = match a {
                "" | "+" => 1,
                "-" => -1,
                other => other.parse().ok()?,
            };
            let b = if b.is_empty() { 0 } else { b.parse().ok()? };
            Some(Nth { a, b })
        }
        None => compact.parse().ok().map(|b| Nth { a: 0, b }),
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\u{c}')
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit() || c == '-'
}
