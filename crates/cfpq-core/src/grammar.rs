//! Context-free grammars, raw and in weak normal form.

use crate::error::{CfpqError, Result};
use crate::matrix::BoolMatrix;
use rustc_hash::FxHashSet;
use std::collections::BTreeSet;
use std::fmt;

/// One symbol of a production body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GrammarSymbol {
    Terminal(String),
    Variable(String),
}

impl GrammarSymbol {
    pub fn terminal(s: impl Into<String>) -> Self {
        GrammarSymbol::Terminal(s.into())
    }

    pub fn variable(s: impl Into<String>) -> Self {
        GrammarSymbol::Variable(s.into())
    }

    pub fn name(&self) -> &str {
        match self {
            GrammarSymbol::Terminal(s) | GrammarSymbol::Variable(s) => s,
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, GrammarSymbol::Variable(_))
    }
}

/// `head → body`; an empty body is the ε-production.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Production {
    pub head: String,
    pub body: Vec<GrammarSymbol>,
}

impl Production {
    pub fn new(head: impl Into<String>, body: Vec<GrammarSymbol>) -> Self {
        Production {
            head: head.into(),
            body,
        }
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ->", self.head)?;
        if self.body.is_empty() {
            return write!(f, " $");
        }
        for s in &self.body {
            match s {
                GrammarSymbol::Terminal(t) => write!(f, " '{t}'")?,
                GrammarSymbol::Variable(v) => write!(f, " {v}")?,
            }
        }
        Ok(())
    }
}

/// Context-free grammar with an arbitrary production shape.
///
/// Productions are kept in insertion order without duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    start: String,
    productions: Vec<Production>,
}

impl Grammar {
    pub fn new(start: impl Into<String>) -> Self {
        Grammar {
            start: start.into(),
            productions: Vec::new(),
        }
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn is_empty(&self) -> bool {
        self.productions.is_empty()
    }

    /// Add `head → body`. Returns false if the production already exists.
    pub fn add_production(&mut self, head: impl Into<String>, body: Vec<GrammarSymbol>) -> bool {
        let p = Production::new(head, body);
        if self.productions.contains(&p) {
            return false;
        }
        self.productions.push(p);
        true
    }

    pub fn push(&mut self, production: Production) -> bool {
        self.add_production(production.head, production.body)
    }

    pub fn has_productions_for(&self, variable: &str) -> bool {
        self.productions.iter().any(|p| p.head == variable)
    }

    /// Start symbol, heads, and every variable mentioned in a body.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        out.insert(self.start.clone());
        for p in &self.productions {
            out.insert(p.head.clone());
            for s in &p.body {
                if let GrammarSymbol::Variable(v) = s {
                    out.insert(v.clone());
                }
            }
        }
        out
    }

    pub fn terminals(&self) -> BTreeSet<String> {
        self.productions
            .iter()
            .flat_map(|p| p.body.iter())
            .filter_map(|s| match s {
                GrammarSymbol::Terminal(t) => Some(t.clone()),
                GrammarSymbol::Variable(_) => None,
            })
            .collect()
    }

    /// Membership test that works on any production shape.
    ///
    /// For each variable keeps an `(n+1) × (n+1)` span matrix, where `[i, j]`
    /// means the variable derives `word[i..j]`. A body's spans are the product
    /// of its symbols' span matrices; heads absorb their bodies until nothing
    /// changes.
    pub fn contains(&self, word: &[&str]) -> bool {
        let n = word.len() + 1;
        let vars: Vec<String> = self.variables().into_iter().collect();
        let var_id = |v: &str| vars.binary_search_by(|x| x.as_str().cmp(v)).ok();
        let mut spans: Vec<BoolMatrix> = vec![BoolMatrix::square(n); vars.len()];

        let terminal_spans = |t: &str| {
            let mut m = BoolMatrix::square(n);
            for (i, w) in word.iter().enumerate() {
                if *w == t {
                    m.set(i as u32, i as u32 + 1);
                }
            }
            m
        };

        loop {
            let mut changed = false;
            for p in &self.productions {
                let Some(head) = var_id(&p.head) else { continue };
                let mut acc = BoolMatrix::identity(n);
                for s in &p.body {
                    let step = match s {
                        GrammarSymbol::Terminal(t) => terminal_spans(t),
                        GrammarSymbol::Variable(v) => match var_id(v) {
                            Some(id) => spans[id].clone(),
                            None => BoolMatrix::square(n),
                        },
                    };
                    acc = match acc.multiply(&step) {
                        Ok(m) => m,
                        Err(_) => return false,
                    };
                    if acc.is_empty() {
                        break;
                    }
                }
                if let Ok(added) = spans[head].union_with(&acc) {
                    changed |= added > 0;
                }
            }
            if !changed {
                break;
            }
        }

        var_id(&self.start).is_some_and(|s| spans[s].get(0, word.len() as u32))
    }
}

/// Body of a weak-normal-form rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Body {
    Epsilon,
    Terminal(String),
    Pair(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalRule {
    pub head: String,
    pub body: Body,
}

impl NormalRule {
    pub fn to_production(&self) -> Production {
        let body = match &self.body {
            Body::Epsilon => vec![],
            Body::Terminal(t) => vec![GrammarSymbol::terminal(t.clone())],
            Body::Pair(b, c) => vec![
                GrammarSymbol::variable(b.clone()),
                GrammarSymbol::variable(c.clone()),
            ],
        };
        Production::new(self.head.clone(), body)
    }
}

impl fmt::Display for NormalRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_production(), f)
    }
}

impl TryFrom<&Production> for NormalRule {
    type Error = CfpqError;

    fn try_from(p: &Production) -> Result<Self> {
        let body = match p.body.as_slice() {
            [] => Body::Epsilon,
            [GrammarSymbol::Terminal(t)] => Body::Terminal(t.clone()),
            [GrammarSymbol::Variable(b), GrammarSymbol::Variable(c)] => {
                Body::Pair(b.clone(), c.clone())
            }
            _ => return Err(CfpqError::grammar_form(p.to_string())),
        };
        Ok(NormalRule {
            head: p.head.clone(),
            body,
        })
    }
}

/// Grammar in weak normal form: every rule is `A → ε`, `A → a` or `A → BC`.
///
/// The body shape is fixed at construction; engines match on [`Body`] and
/// never look at raw productions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalGrammar {
    start: String,
    rules: Vec<NormalRule>,
}

impl NormalGrammar {
    pub fn new(start: impl Into<String>, rules: Vec<NormalRule>) -> Self {
        NormalGrammar {
            start: start.into(),
            rules,
        }
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn rules(&self) -> &[NormalRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Start symbol plus every variable named by a rule, sorted.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        out.insert(self.start.clone());
        for r in &self.rules {
            out.insert(r.head.clone());
            if let Body::Pair(b, c) = &r.body {
                out.insert(b.clone());
                out.insert(c.clone());
            }
        }
        out
    }

    pub fn to_grammar(&self) -> Grammar {
        let mut g = Grammar::new(self.start.clone());
        for r in &self.rules {
            g.push(r.to_production());
        }
        g
    }

    pub fn contains(&self, word: &[&str]) -> bool {
        self.to_grammar().contains(word)
    }
}

impl TryFrom<&Grammar> for NormalGrammar {
    type Error = CfpqError;

    /// Accepts a grammar that is already in weak normal form.
    fn try_from(g: &Grammar) -> Result<Self> {
        let rules = g
            .productions()
            .iter()
            .map(NormalRule::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(NormalGrammar::new(g.start(), rules))
    }
}

/// Fresh variable names that collide with nothing already in use.
pub(crate) struct NameSupply {
    taken: FxHashSet<String>,
    counter: usize,
}

impl NameSupply {
    pub(crate) fn new<'a>(taken: impl IntoIterator<Item = &'a str>) -> Self {
        NameSupply {
            taken: taken.into_iter().map(str::to_string).collect(),
            counter: 0,
        }
    }

    pub(crate) fn fresh(&mut self, hint: &str) -> String {
        loop {
            self.counter += 1;
            let name = format!("{hint}#{}", self.counter);
            if self.taken.insert(name.clone()) {
                return name;
            }
        }
    }
}
