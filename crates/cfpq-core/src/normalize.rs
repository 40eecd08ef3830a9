use crate::error::Result;
use crate::grammar::{Grammar, GrammarSymbol, NameSupply, NormalGrammar, Production};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use tracing::debug;

/// Rewrite `grammar` into weak normal form without changing its language.
///
/// Passes run in order: unit elimination, useless-symbol removal, terminal
/// isolation inside long bodies, binary decomposition. A rule that still has
/// an illegal shape afterwards is reported as `GrammarForm`.
pub fn normalize(grammar: &Grammar) -> Result<NormalGrammar> {
    let productions = eliminate_units(grammar.productions());
    let productions = remove_useless(grammar.start(), productions);

    let mut names = NameSupply::new(
        grammar
            .variables()
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>(),
    );
    let productions = isolate_terminals(productions, &mut names);
    let productions = binarize(productions, &mut names);

    let mut out = Grammar::new(grammar.start());
    for p in productions {
        out.push(p);
    }
    let normal = NormalGrammar::try_from(&out)?;
    debug!(
        before = grammar.productions().len(),
        after = normal.rules().len(),
        "normalized grammar"
    );
    Ok(normal)
}

/// Alias of [`normalize`].
pub fn normalize_grammar(grammar: &Grammar) -> Result<NormalGrammar> {
    normalize(grammar)
}

fn unit_target(p: &Production) -> Option<&str> {
    match p.body.as_slice() {
        [GrammarSymbol::Variable(b)] => Some(b),
        _ => None,
    }
}

/// Replace `A → B` chains: for every unit pair `(A, B)` (reflexive,
/// transitive) copy `B`'s non-unit bodies to `A`.
fn eliminate_units(productions: &[Production]) -> Vec<Production> {
    let mut units: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
    let mut heads: Vec<&str> = Vec::new();
    for p in productions {
        if !heads.contains(&p.head.as_str()) {
            heads.push(&p.head);
        }
        if let Some(b) = unit_target(p) {
            units.entry(&p.head).or_default().push(b);
        }
    }

    let mut out: Vec<Production> = Vec::new();
    let mut seen: FxHashSet<Production> = FxHashSet::default();
    for &a in &heads {
        // BFS over the unit relation from `a`.
        let mut reach: Vec<&str> = vec![a];
        let mut queue: VecDeque<&str> = VecDeque::from([a]);
        while let Some(x) = queue.pop_front() {
            for &y in units.get(x).map(Vec::as_slice).unwrap_or_default() {
                if !reach.contains(&y) {
                    reach.push(y);
                    queue.push_back(y);
                }
            }
        }
        for &b in &reach {
            for p in productions.iter().filter(|p| p.head == b && unit_target(p).is_none()) {
                let q = Production::new(a, p.body.clone());
                if seen.insert(q.clone()) {
                    out.push(q);
                }
            }
        }
    }
    out
}

/// Drop productions that mention a non-generating variable, then those whose
/// head is unreachable from `start`.
fn remove_useless(start: &str, productions: Vec<Production>) -> Vec<Production> {
    let mut generating: FxHashSet<String> = FxHashSet::default();
    loop {
        let before = generating.len();
        for p in &productions {
            if generating.contains(&p.head) {
                continue;
            }
            let all = p.body.iter().all(|s| match s {
                GrammarSymbol::Terminal(_) => true,
                GrammarSymbol::Variable(v) => generating.contains(v),
            });
            if all {
                generating.insert(p.head.clone());
            }
        }
        if generating.len() == before {
            break;
        }
    }
    if !generating.contains(start) {
        return Vec::new();
    }

    let productions: Vec<Production> = productions
        .into_iter()
        .filter(|p| {
            generating.contains(&p.head)
                && p.body.iter().all(|s| match s {
                    GrammarSymbol::Terminal(_) => true,
                    GrammarSymbol::Variable(v) => generating.contains(v),
                })
        })
        .collect();

    let mut reachable: FxHashSet<&str> = FxHashSet::default();
    reachable.insert(start);
    let mut stack = vec![start];
    while let Some(x) = stack.pop() {
        for p in productions.iter().filter(|p| p.head == x) {
            for s in &p.body {
                if let GrammarSymbol::Variable(v) = s {
                    if reachable.insert(v) {
                        stack.push(v);
                    }
                }
            }
        }
    }
    let keep: FxHashSet<String> = reachable.into_iter().map(str::to_string).collect();
    productions
        .into_iter()
        .filter(|p| keep.contains(&p.head))
        .collect()
}

/// In bodies of length two or more, replace each terminal `t` by a fresh
/// variable with the single rule `T → t`.
fn isolate_terminals(productions: Vec<Production>, names: &mut NameSupply) -> Vec<Production> {
    let mut wrapper: FxHashMap<String, String> = FxHashMap::default();
    let mut extra: Vec<Production> = Vec::new();
    let mut out: Vec<Production> = productions
        .into_iter()
        .map(|mut p| {
            if p.body.len() < 2 {
                return p;
            }
            for s in p.body.iter_mut() {
                if let GrammarSymbol::Terminal(t) = s {
                    let var = wrapper
                        .entry(t.clone())
                        .or_insert_with(|| {
                            let v = names.fresh(&format!("T[{t}]"));
                            extra.push(Production::new(
                                v.clone(),
                                vec![GrammarSymbol::terminal(t.clone())],
                            ));
                            v
                        })
                        .clone();
                    *s = GrammarSymbol::Variable(var);
                }
            }
            p
        })
        .collect();
    out.extend(extra);
    out
}

/// Split `A → X1 X2 … Xk` (k > 2) into a right-leaning chain of pairs.
fn binarize(productions: Vec<Production>, names: &mut NameSupply) -> Vec<Production> {
    let mut out = Vec::with_capacity(productions.len());
    for p in productions {
        if p.body.len() <= 2 {
            out.push(p);
            continue;
        }
        let mut head = p.head.clone();
        let k = p.body.len();
        for sym in &p.body[..k - 2] {
            let rest = names.fresh(&p.head);
            out.push(Production::new(
                head,
                vec![sym.clone(), GrammarSymbol::Variable(rest.clone())],
            ));
            head = rest;
        }
        out.push(Production::new(head, p.body[k - 2..].to_vec()));
    }
    out
}
