mod common;

use cfpq_core::{
    build_automaton_from_graph, build_automaton_from_regex, cfpq, intersect_automata,
    transitive_closure, Algorithm, BoolMatrix, CfpqConfig, CfpqError, Grammar, LabeledGraph,
    Rsm, SelfPairs,
};
use common::grammar;
use proptest::prelude::*;
use std::collections::BTreeSet;

fn pairs(xs: &[(u32, u32)]) -> BTreeSet<(u32, u32)> {
    xs.iter().copied().collect()
}

fn anbn() -> Grammar {
    grammar("S", &[("S", "a S b"), ("S", "a b")])
}

fn square() -> LabeledGraph {
    LabeledGraph::from_edges([(0, "a", 1), (1, "a", 2), (2, "b", 3), (3, "b", 0)])
}

#[test]
fn balanced_words_on_a_square() {
    for a in Algorithm::ALL {
        let got = cfpq(&anbn(), &square(), None, None, &CfpqConfig::new(a)).unwrap();
        // 0 -a-> 1 -a-> 2 -b-> 3 -b-> 0 spells aabb
        assert!(got.contains(&(0, 0)), "{a}");
        // 1 -a-> 2 -b-> 3 spells ab
        assert!(got.contains(&(1, 3)), "{a}");
        // 0 -a-> 1 -a-> 2 spells aa
        assert!(!got.contains(&(0, 2)), "{a}");
        assert_eq!(got, pairs(&[(0, 0), (1, 3)]), "{a}");
    }
}

#[test]
fn epsilon_grammar_is_reflexive() {
    let g = grammar("S", &[("S", "$")]);
    let graph = LabeledGraph::from_edges([(0, "a", 1), (1, "b", 2), (5, "c", 5)]);
    for a in Algorithm::ALL {
        let got = cfpq(&g, &graph, None, None, &CfpqConfig::new(a)).unwrap();
        assert_eq!(got, pairs(&[(0, 0), (1, 1), (2, 2), (5, 5)]), "{a}");
        let excluded = cfpq(
            &g,
            &graph,
            None,
            None,
            &CfpqConfig::new(a).with_self_pairs(SelfPairs::Exclude),
        )
        .unwrap();
        assert!(excluded.is_empty(), "{a}");
    }
}

#[test]
fn empty_inputs_give_empty_answers() {
    let empty_graph = LabeledGraph::new();
    let empty_grammar = Grammar::new("S");
    for a in Algorithm::ALL {
        let config = CfpqConfig::new(a);
        assert!(cfpq(&anbn(), &empty_graph, None, None, &config).unwrap().is_empty());
        assert!(cfpq(&empty_grammar, &square(), None, None, &config).unwrap().is_empty());
        assert!(cfpq(&Rsm::new("S"), &square(), None, None, &config).unwrap().is_empty());
    }
}

#[test]
fn missing_start_symbol_is_an_error() {
    let g = grammar("S", &[("A", "a")]);
    for a in Algorithm::ALL {
        assert_eq!(
            cfpq(&g, &square(), None, None, &CfpqConfig::new(a)),
            Err(CfpqError::UndefinedSymbol("S".into()))
        );
    }
}

#[test]
fn same_generation_on_two_cycles() {
    let g = grammar("S", &[("S", "a S b"), ("S", "a b")]);
    let graph = cfpq_core::labeled_two_cycles(2, 1, ("a", "b"));
    // a-cycle 0 -> 1 -> 2 -> 0, b-cycle 0 -> 3 -> 0
    let want = pairs(&[(0, 0), (0, 3), (1, 0), (1, 3), (2, 0), (2, 3)]);
    for a in Algorithm::ALL {
        assert_eq!(cfpq(&g, &graph, None, None, &CfpqConfig::new(a)).unwrap(), want, "{a}");
    }
}

#[test]
fn intersection_of_a_star_and_a_star_b() {
    let a_star = build_automaton_from_regex("a*").unwrap();
    let a_star_b = build_automaton_from_regex("a* b").unwrap();
    let both = intersect_automata(&a_star, &a_star_b).unwrap();
    assert!(both.is_empty());
    let samples: [&[&str]; 5] = [&[], &["a"], &["b"], &["a", "b"], &["a", "a", "b"]];
    for w in samples {
        assert_eq!(both.accepts(w), a_star.accepts(w) && a_star_b.accepts(w), "{w:?}");
    }

    let any = build_automaton_from_regex("(a | b)*").unwrap();
    let narrowed = intersect_automata(&any, &a_star_b).unwrap();
    let samples: [&[&str]; 6] = [&[], &["a"], &["b"], &["a", "b"], &["a", "a", "b"], &["b", "a"]];
    for w in samples {
        assert_eq!(narrowed.accepts(w), a_star_b.accepts(w), "{w:?}");
    }
}

#[test]
fn regular_query_through_graph_automaton() {
    let graph = LabeledGraph::from_edges([(0, "a", 1), (1, "b", 2), (2, "c", 3)]);
    let fa = build_automaton_from_graph(&graph, None, None);
    let re = build_automaton_from_regex("a b c | b").unwrap();
    let product = intersect_automata(&re, &fa).unwrap();
    assert!(!product.is_empty());
    assert!(product.accepts(&["a", "b", "c"]));
    assert!(!product.accepts(&["a", "b"]));
}

fn matrix_strategy() -> impl Strategy<Value = BoolMatrix> {
    (1usize..7).prop_flat_map(|n| {
        prop::collection::vec((0..n as u32, 0..n as u32), 0..12).prop_map(move |entries| {
            let mut m = BoolMatrix::square(n);
            for (i, j) in entries {
                m.set(i, j);
            }
            m
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn closure_is_reflexive_transitive_and_idempotent(m in matrix_strategy()) {
        let c = transitive_closure(&m).unwrap();
        let (n, _) = m.shape();
        for i in 0..n as u32 {
            prop_assert!(c.get(i, i));
        }
        for (i, j) in m.iter() {
            prop_assert!(c.get(i, j));
        }
        prop_assert_eq!(&c.multiply(&c).unwrap().difference(&c).unwrap(), &BoolMatrix::square(n));
        prop_assert_eq!(transitive_closure(&c).unwrap(), c);
    }
}
