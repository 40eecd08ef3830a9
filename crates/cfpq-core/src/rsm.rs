//! Recursive state machines: one minimal DFA ("box") per nonterminal.
//!
//! A box's alphabet mixes terminals and calls, kept apart by [`RsmLabel`]:
//! box automata store [`RsmLabel::key`]s, so a terminal `S` and a call to box
//! `S` are different symbols. Graph edge labels are always terminals.

use crate::automaton::MatrixAutomaton;
use crate::error::Result;
use crate::fsa::Fsa;
use crate::grammar::{Grammar, GrammarSymbol, NameSupply};
use crate::index::StateIndex;
use crate::regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

/// One symbol of a box alphabet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RsmLabel {
    /// Matched against a graph edge label.
    Term(String),
    /// Traversal of the named box.
    Call(String),
}

impl RsmLabel {
    const TERM_TAG: char = '\'';
    const CALL_TAG: char = '@';

    pub fn term(name: impl Into<String>) -> Self {
        RsmLabel::Term(name.into())
    }

    pub fn call(name: impl Into<String>) -> Self {
        RsmLabel::Call(name.into())
    }

    /// Transition key: the name behind a one-character kind tag.
    pub fn key(&self) -> String {
        match self {
            RsmLabel::Term(t) => format!("{}{t}", Self::TERM_TAG),
            RsmLabel::Call(c) => format!("{}{c}", Self::CALL_TAG),
        }
    }

    /// Inverse of [`key`](Self::key); `None` for an untagged string.
    pub fn from_key(key: &str) -> Option<Self> {
        if let Some(t) = key.strip_prefix(Self::TERM_TAG) {
            Some(RsmLabel::term(t))
        } else {
            key.strip_prefix(Self::CALL_TAG).map(|c| RsmLabel::call(c))
        }
    }
}

impl From<&GrammarSymbol> for RsmLabel {
    fn from(s: &GrammarSymbol) -> Self {
        match s {
            GrammarSymbol::Terminal(t) => RsmLabel::term(t.as_str()),
            GrammarSymbol::Variable(v) => RsmLabel::call(v.as_str()),
        }
    }
}

/// Relabel `fsa`'s alphabet. `tag` is injective, so label ids are kept.
fn tag_labels(mut fsa: Fsa, tag: impl Fn(&str) -> RsmLabel) -> Fsa {
    fsa.symbols = fsa.symbols.states().iter().map(|s| tag(s.as_str()).key()).collect();
    fsa
}

/// A state of one box inside the combined automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RsmState {
    pub box_id: u32,
    pub state: u32,
}

#[derive(Debug, Clone)]
pub struct Rsm {
    start: String,
    boxes: BTreeMap<String, Fsa>,
}

impl Rsm {
    pub fn new(start: impl Into<String>) -> Self {
        Rsm {
            start: start.into(),
            boxes: BTreeMap::new(),
        }
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Install `fsa` as the box for `name`, minimizing it first. Arc labels
    /// are [`RsmLabel::key`]s; untagged labels match nothing.
    pub fn add_box(&mut self, name: impl Into<String>, fsa: &Fsa) {
        self.boxes.insert(name.into(), crate::minimize::minimize(fsa));
    }

    pub fn get_box(&self, name: &str) -> Option<&Fsa> {
        self.boxes.get(name)
    }

    pub fn has_box(&self, name: &str) -> bool {
        self.boxes.contains_key(name)
    }

    /// Boxes in name order; a box's position is its `box_id`.
    pub fn boxes(&self) -> impl Iterator<Item = (&str, &Fsa)> + '_ {
        self.boxes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Name of the box at `box_id`. Walks the map; callers in loops should
    /// collect [`boxes`](Self::boxes) once instead.
    pub fn box_name(&self, box_id: u32) -> Option<&str> {
        self.boxes.keys().nth(box_id as usize).map(String::as_str)
    }

    pub fn box_id(&self, name: &str) -> Option<u32> {
        self.boxes.keys().position(|k| k == name).map(|i| i as u32)
    }

    /// One box per variable; its DFA accepts the union of the variable's
    /// production bodies, read as words over terminals and variables.
    pub fn from_grammar(grammar: &Grammar) -> Self {
        let mut alternatives: BTreeMap<&str, Vec<Regex>> = BTreeMap::new();
        for p in grammar.productions() {
            let body = match p.body.as_slice() {
                [] => Regex::Epsilon,
                [s] => Regex::symbol(RsmLabel::from(s).key()),
                many => Regex::Concat(
                    many.iter()
                        .map(|s| Regex::symbol(RsmLabel::from(s).key()))
                        .collect(),
                ),
            };
            alternatives.entry(&p.head).or_default().push(body);
        }

        let mut rsm = Rsm::new(grammar.start());
        for (head, mut alts) in alternatives {
            let re = if alts.len() == 1 {
                alts.remove(0)
            } else {
                Regex::Union(alts)
            };
            rsm.boxes.insert(head.to_string(), re.to_min_dfa());
        }
        rsm
    }

    /// Boxes from `(name, pattern)` pairs in the syntax of [`Regex`]. A
    /// pattern symbol that names one of the boxes is a call; any other symbol
    /// is a terminal.
    pub fn from_regex_boxes<'a>(
        start: &str,
        boxes: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self> {
        let boxes: Vec<(&str, &str)> = boxes.into_iter().collect();
        let names: BTreeSet<&str> = boxes.iter().map(|&(name, _)| name).collect();
        let mut rsm = Rsm::new(start);
        for (name, pattern) in boxes {
            let dfa = tag_labels(Regex::parse(pattern)?.to_min_dfa(), |sym| {
                if names.contains(sym) {
                    RsmLabel::call(sym)
                } else {
                    RsmLabel::term(sym)
                }
            });
            rsm.boxes.insert(name.to_string(), dfa);
        }
        Ok(rsm)
    }

    /// Single-box machine for `pattern` named `start`.
    pub fn from_regex(pattern: &str, start: &str) -> Result<Self> {
        Self::from_regex_boxes(start, [(start, pattern)])
    }

    /// Boxes whose automaton accepts the empty word.
    pub fn nullable_symbols(&self) -> BTreeSet<String> {
        self.boxes
            .iter()
            .filter(|(_, fsa)| fsa.start.iter().any(|s| fsa.stop.contains(s)))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// All boxes side by side in one automaton over disjoint states.
    ///
    /// Start indices are the box start states and final indices the box
    /// final states, so a closure path from a start to a final of the same
    /// box is one complete traversal of that box. Transitions are keyed by
    /// [`RsmLabel::key`].
    pub fn to_matrix_automaton(&self) -> MatrixAutomaton<RsmState> {
        let states: StateIndex<RsmState> = self
            .boxes
            .values()
            .enumerate()
            .flat_map(|(b, fsa)| {
                (0..fsa.num_states).map(move |q| RsmState {
                    box_id: b as u32,
                    state: q,
                })
            })
            .collect();
        let mut fa = MatrixAutomaton::new(states);

        for (b, fsa) in self.boxes.values().enumerate() {
            let at = |q: u32| RsmState {
                box_id: b as u32,
                state: q,
            };
            for i in 0..fsa.num_arcs() {
                let (Some(sym), Some(src), Some(dst)) = (
                    fsa.symbol(fsa.arc_lbl[i]),
                    fa.index_of(&at(fsa.arc_src[i])),
                    fa.index_of(&at(fsa.arc_dst[i])),
                ) else {
                    continue;
                };
                let sym = sym.to_string();
                fa.add_transition(src, &sym, dst);
            }
            for &q in &fsa.start {
                if let Some(i) = fa.index_of(&at(q)) {
                    fa.mark_start(i);
                }
            }
            for &q in &fsa.stop {
                if let Some(i) = fa.index_of(&at(q)) {
                    fa.mark_final(i);
                }
            }
        }
        fa
    }

    /// Equivalent grammar with one variable per box state.
    ///
    /// `q --x--> q'` becomes `[q] → x [q']`, a final `q` gets `[q] → ε`, and
    /// each box name derives its start state's variable.
    pub fn to_grammar(&self) -> Grammar {
        let mut names = NameSupply::new(self.boxes.keys().map(String::as_str));
        let mut g = Grammar::new(self.start.clone());
        for (name, fsa) in &self.boxes {
            let vars: Vec<String> = (0..fsa.num_states)
                .map(|q| names.fresh(&format!("{name}@{q}")))
                .collect();
            for &q in &fsa.start {
                g.add_production(name.clone(), vec![GrammarSymbol::variable(vars[q as usize].clone())]);
            }
            for &q in &fsa.stop {
                g.add_production(vars[q as usize].clone(), vec![]);
            }
            for i in 0..fsa.num_arcs() {
                let Some(sym) = fsa.symbol(fsa.arc_lbl[i]) else {
                    continue;
                };
                let label = match RsmLabel::from_key(sym) {
                    Some(RsmLabel::Term(t)) => GrammarSymbol::terminal(t),
                    Some(RsmLabel::Call(c)) => GrammarSymbol::variable(c),
                    None => continue,
                };
                let head = vars[fsa.arc_src[i] as usize].clone();
                let next = GrammarSymbol::variable(vars[fsa.arc_dst[i] as usize].clone());
                g.add_production(head, vec![label, next]);
            }
        }
        g
    }
}
