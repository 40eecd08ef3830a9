#![allow(dead_code)]

use cfpq_core::{Grammar, GrammarSymbol, LabeledGraph};
use proptest::prelude::*;

/// Grammar from `(head, body)` pairs. Body tokens are whitespace separated;
/// a token starting with an uppercase letter is a variable, `$` alone is ε.
pub fn grammar(start: &str, rules: &[(&str, &str)]) -> Grammar {
    let mut g = Grammar::new(start);
    for (head, body) in rules {
        let body: Vec<GrammarSymbol> = body
            .split_whitespace()
            .filter(|tok| *tok != "$")
            .map(|tok| {
                if tok.starts_with(|c: char| c.is_ascii_uppercase()) {
                    GrammarSymbol::variable(tok)
                } else {
                    GrammarSymbol::terminal(tok)
                }
            })
            .collect();
        g.add_production(*head, body);
    }
    g
}

pub const VARIABLES: [&str; 3] = ["S", "A", "B"];
pub const TERMINALS: [&str; 2] = ["a", "b"];

fn symbol_strategy() -> impl Strategy<Value = GrammarSymbol> {
    prop_oneof![
        4 => (0..VARIABLES.len()).prop_map(|i| GrammarSymbol::variable(VARIABLES[i])),
        4 => (0..TERMINALS.len()).prop_map(|i| GrammarSymbol::terminal(TERMINALS[i])),
        // A terminal spelled like a variable.
        1 => Just(GrammarSymbol::terminal("S")),
    ]
}

fn production_strategy() -> impl Strategy<Value = (usize, Vec<GrammarSymbol>)> {
    (0..VARIABLES.len(), prop::collection::vec(symbol_strategy(), 0..=3))
}

/// Small grammars over `S, A, B` and `a, b` that always define `S`.
pub fn grammar_strategy() -> impl Strategy<Value = Grammar> {
    (
        prop::collection::vec(symbol_strategy(), 0..=3),
        prop::collection::vec(production_strategy(), 0..6),
    )
        .prop_map(|(start_body, rest)| {
            let mut g = Grammar::new("S");
            g.add_production("S", start_body);
            for (head, body) in rest {
                g.add_production(VARIABLES[head], body);
            }
            g
        })
}

/// Edge labels: mostly terminals, sometimes a variable's name, which must
/// still only match terminals.
fn edge_label_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        4 => (0..TERMINALS.len()).prop_map(|i| TERMINALS[i]),
        1 => (0..VARIABLES.len()).prop_map(|i| VARIABLES[i]),
    ]
}

/// Graphs on nodes `0..6`.
pub fn graph_strategy() -> impl Strategy<Value = LabeledGraph> {
    prop::collection::vec((0u32..6, edge_label_strategy(), 0u32..6), 0..10).prop_map(|edges| {
        let mut g = LabeledGraph::new();
        for (src, label, dst) in edges {
            g.add_edge(src, label, dst);
        }
        g
    })
}

/// Every word over `alphabet` up to `max_len` symbols.
pub fn words(alphabet: &[&'static str], max_len: usize) -> Vec<Vec<&'static str>> {
    let mut all: Vec<Vec<&'static str>> = vec![vec![]];
    let mut layer: Vec<Vec<&'static str>> = vec![vec![]];
    for _ in 0..max_len {
        let next: Vec<Vec<&'static str>> = layer
            .iter()
            .flat_map(|w| {
                alphabet.iter().map(move |a| {
                    let mut w2 = w.clone();
                    w2.push(*a);
                    w2
                })
            })
            .collect();
        all.extend(next.iter().cloned());
        layer = next;
    }
    all
}
