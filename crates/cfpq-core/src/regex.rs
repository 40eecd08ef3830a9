//! Regular expressions over symbol alphabets, compiled to automata.
//!
//! | Syntax | Meaning |
//! |--------|---------|
//! | `a`, `B`, `7`, `_` | single-character symbol |
//! | `"subClassOf"` | multi-character symbol |
//! | `$` | the empty word |
//! | `x y`, `x.y` | concatenation |
//! | `x \| y` | union |
//! | `x*`, `x+`, `x?` | star, plus, optional |
//! | `x^{m}`, `x^{m,}`, `x^{m,n}` | bounded repetition |
//!
//! Whitespace is insignificant. An empty pattern (or an empty branch such as
//! the right side of `a|`) denotes the empty word.

use crate::error::{CfpqError, Result};
use crate::fsa::Fsa;
use crate::minimize::minimize;

/// Parsed regular expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Regex {
    Epsilon,
    Symbol(String),
    Concat(Vec<Regex>),
    Union(Vec<Regex>),
    Star(Box<Regex>),
    Repeat {
        inner: Box<Regex>,
        min: u32,
        max: Option<u32>,
    },
}

impl Regex {
    pub fn parse(pattern: &str) -> Result<Regex> {
        let mut parser = Parser {
            chars: pattern.char_indices().collect(),
            pos: 0,
            len: pattern.len(),
        };
        let re = parser.union()?;
        parser.skip_ws();
        if let Some((at, c)) = parser.peek_raw() {
            return Err(CfpqError::regex(at, format!("unexpected '{c}'")));
        }
        Ok(re)
    }

    pub fn symbol(s: impl Into<String>) -> Regex {
        Regex::Symbol(s.into())
    }

    /// Thompson construction: an epsilon-NFA with one start and one final
    /// state.
    pub fn to_nfa(&self) -> Fsa {
        let mut nfa = Fsa::new();
        let (start, accept) = self.compile(&mut nfa);
        nfa.start = vec![start];
        nfa.stop = vec![accept];
        nfa
    }

    /// Minimal DFA for this expression.
    pub fn to_min_dfa(&self) -> Fsa {
        minimize(&self.to_nfa())
    }

    /// Returns the fragment's (start, accept) states.
    fn compile(&self, nfa: &mut Fsa) -> (u32, u32) {
        match self {
            Regex::Epsilon => {
                let (s, a) = (nfa.add_state(), nfa.add_state());
                nfa.add_epsilon(s, a);
                (s, a)
            }
            Regex::Symbol(x) => {
                let (s, a) = (nfa.add_state(), nfa.add_state());
                nfa.add_symbol_arc(s, x, a);
                (s, a)
            }
            Regex::Concat(parts) => {
                let Some((first, rest)) = parts.split_first() else {
                    return Regex::Epsilon.compile(nfa);
                };
                let (start, mut accept) = first.compile(nfa);
                for part in rest {
                    let (s, a) = part.compile(nfa);
                    nfa.add_epsilon(accept, s);
                    accept = a;
                }
                (start, accept)
            }
            Regex::Union(parts) => {
                let (s, a) = (nfa.add_state(), nfa.add_state());
                for part in parts {
                    let (ps, pa) = part.compile(nfa);
                    nfa.add_epsilon(s, ps);
                    nfa.add_epsilon(pa, a);
                }
                (s, a)
            }
            Regex::Star(inner) => {
                let (s, a) = (nfa.add_state(), nfa.add_state());
                let (is, ia) = inner.compile(nfa);
                nfa.add_epsilon(s, a);
                nfa.add_epsilon(s, is);
                nfa.add_epsilon(ia, is);
                nfa.add_epsilon(ia, a);
                (s, a)
            }
            Regex::Repeat { inner, min, max } => {
                let mut parts: Vec<Regex> = (0..*min).map(|_| (**inner).clone()).collect();
                match max {
                    None => parts.push(Regex::Star(inner.clone())),
                    Some(max) => {
                        let optional = Regex::Union(vec![(**inner).clone(), Regex::Epsilon]);
                        parts.extend((*min..*max).map(|_| optional.clone()));
                    }
                }
                Regex::Concat(parts).compile(nfa)
            }
        }
    }
}

/// Parse `pattern` and build its minimal DFA.
pub fn regex_to_min_dfa(pattern: &str) -> Result<Fsa> {
    Ok(Regex::parse(pattern)?.to_min_dfa())
}

struct Parser {
    chars: Vec<(usize, char)>,
    pos: usize,
    len: usize,
}

impl Parser {
    fn skip_ws(&mut self) {
        while self.chars.get(self.pos).is_some_and(|(_, c)| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek_raw(&self) -> Option<(usize, char)> {
        self.chars.get(self.pos).copied()
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.peek_raw().map(|(_, c)| c)
    }

    /// Byte offset of the next significant character (or end of input).
    fn offset(&mut self) -> usize {
        self.skip_ws();
        self.peek_raw().map_or(self.len, |(at, _)| at)
    }

    fn expect(&mut self, want: char) -> Result<()> {
        let at = self.offset();
        match self.peek() {
            Some(c) if c == want => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(CfpqError::regex(at, format!("expected '{want}', found '{c}'"))),
            None => Err(CfpqError::regex(at, format!("expected '{want}', found end of pattern"))),
        }
    }

    fn union(&mut self) -> Result<Regex> {
        let mut branches = vec![self.concat()?];
        while self.peek() == Some('|') {
            self.pos += 1;
            branches.push(self.concat()?);
        }
        Ok(if branches.len() == 1 {
            branches.pop().unwrap_or(Regex::Epsilon)
        } else {
            Regex::Union(branches)
        })
    }

    fn starts_atom(c: char) -> bool {
        c.is_alphanumeric() || c == '_' || c == '"' || c == '$' || c == '('
    }

    fn concat(&mut self) -> Result<Regex> {
        let mut parts = Vec::new();
        loop {
            match self.peek() {
                Some('.') => {
                    let at = self.offset();
                    self.pos += 1;
                    if parts.is_empty() || !self.peek().is_some_and(Self::starts_atom) {
                        return Err(CfpqError::regex(at, "'.' needs an operand on both sides"));
                    }
                }
                Some(c) if Self::starts_atom(c) => parts.push(self.postfix()?),
                Some(c @ ('*' | '+' | '?' | '^')) => {
                    let at = self.offset();
                    return Err(CfpqError::regex(at, format!("'{c}' has nothing to repeat")));
                }
                _ => break,
            }
        }
        Ok(match parts.len() {
            0 => Regex::Epsilon,
            1 => parts.pop().unwrap_or(Regex::Epsilon),
            _ => Regex::Concat(parts),
        })
    }

    fn postfix(&mut self) -> Result<Regex> {
        let mut re = self.atom()?;
        loop {
            match self.peek() {
                Some('*') => {
                    self.pos += 1;
                    re = Regex::Star(Box::new(re));
                }
                Some('+') => {
                    self.pos += 1;
                    re = Regex::Repeat { inner: Box::new(re), min: 1, max: None };
                }
                Some('?') => {
                    self.pos += 1;
                    re = Regex::Repeat { inner: Box::new(re), min: 0, max: Some(1) };
                }
                Some('^') => {
                    self.pos += 1;
                    let (min, max) = self.bounds()?;
                    re = Regex::Repeat { inner: Box::new(re), min, max };
                }
                _ => return Ok(re),
            }
        }
    }

    /// `{m}`, `{m,}` or `{m,n}` after a `^`.
    fn bounds(&mut self) -> Result<(u32, Option<u32>)> {
        self.expect('{')?;
        let min = self.number()?;
        let max = if self.peek() == Some(',') {
            self.pos += 1;
            if self.peek() == Some('}') {
                None
            } else {
                let at = self.offset();
                let max = self.number()?;
                if max < min {
                    return Err(CfpqError::regex(at, format!("invalid range {min}..{max}")));
                }
                Some(max)
            }
        } else {
            Some(min)
        };
        self.expect('}')?;
        Ok((min, max))
    }

    fn number(&mut self) -> Result<u32> {
        let at = self.offset();
        let mut digits = String::new();
        while let Some((_, c)) = self.peek_raw().filter(|(_, c)| c.is_ascii_digit()) {
            digits.push(c);
            self.pos += 1;
        }
        digits
            .parse()
            .map_err(|_| CfpqError::regex(at, "expected a repetition count"))
    }

    fn atom(&mut self) -> Result<Regex> {
        let at = self.offset();
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                let inner = self.union()?;
                self.expect(')').map_err(|_| CfpqError::regex(at, "unclosed group '('"))?;
                Ok(inner)
            }
            Some('$') => {
                self.pos += 1;
                Ok(Regex::Epsilon)
            }
            Some('"') => {
                self.pos += 1;
                let mut name = String::new();
                loop {
                    match self.peek_raw() {
                        Some((_, '"')) => {
                            self.pos += 1;
                            break;
                        }
                        Some((_, c)) => {
                            name.push(c);
                            self.pos += 1;
                        }
                        None => return Err(CfpqError::regex(at, "unterminated quoted symbol")),
                    }
                }
                if name.is_empty() {
                    return Err(CfpqError::regex(at, "empty quoted symbol"));
                }
                Ok(Regex::Symbol(name))
            }
            Some(c) if c.is_alphanumeric() || c == '_' => {
                self.pos += 1;
                Ok(Regex::Symbol(c.to_string()))
            }
            Some(c) => Err(CfpqError::regex(at, format!("unexpected '{c}'"))),
            None => Err(CfpqError::regex(at, "unexpected end of pattern")),
        }
    }
}
