//! Grammar analyses checked against what the engine actually does.

use pretty_assertions::assert_eq;
use smallvec::SmallVec;
use strata::analysis::{GrammarMetrics, compute_nullability, reachable};
use strata::expr::{GrammarBuilder, Peg};
use strata::testing::{arithmetic_cluster, arithmetic_left_recursive, left_recursive_sum};
use strata::walk::{GraphWalker, Visit, Visitor};
use strata::{ExprId, ExprKind, Grammar, GrammarError, LeftRecursionOptions, Parser, ParserConfig, PrepareOptions};

fn nullable_rules() -> GrammarBuilder {
    GrammarBuilder::new()
        .rule("S", Peg::seq([Peg::rule("Maybe"), Peg::rule("Both"), Peg::rule("Word")]))
        .rule("Maybe", Peg::opt(Peg::lit("a")))
        .rule("Both", Peg::seq([Peg::rule("Maybe"), Peg::star(Peg::lit("b"))]))
        .rule("Word", Peg::plus(Peg::range('a', 'z')))
        .rule("Empty", Peg::lit(""))
        .rule("Guard", Peg::not(Peg::lit("x")))
}

#[test]
fn nullability_agrees_with_matching_empty_input() {
    let expected = [
        ("S", false),
        ("Maybe", true),
        ("Both", true),
        ("Word", false),
        ("Empty", true),
        ("Guard", true),
    ];
    for (name, nullable) in expected {
        let grammar = nullable_rules().root(name).build().expect("valid grammar");
        let analysis = compute_nullability(&grammar);
        let root = grammar.root().unwrap();
        assert_eq!(analysis.is_nullable(root), nullable, "{name}");

        let result = Parser::new(&grammar, ParserConfig::default())
            .unwrap()
            .parse("")
            .unwrap();
        assert_eq!(result.matched, nullable, "{name} on empty input");
    }
}

#[test]
fn copied_grammar_parses_the_same() {
    let mut grammar = left_recursive_sum();
    let root = grammar.root().unwrap();
    let copy = grammar.deep_copy(root);
    assert_ne!(copy, root);
    assert!(matches!(grammar.kind(copy), ExprKind::LeftRecursive { .. }));

    grammar.set_root(copy);
    assert!(!grammar.is_prepared());
    let report = grammar.prepare(&PrepareOptions::default()).unwrap();
    assert!(report.left_recursive.is_empty(), "the copied cycle keeps its boundary");

    let result = strata::parse(&grammar, "1+2+3", ParserConfig::default()).unwrap();
    assert_eq!(result.sexpr(), "(_ (+ (+ 1 2) 3))");
}

struct Counter<'g> {
    grammar: &'g Grammar,
    visits: usize,
    cutoffs: usize,
}

impl Visitor for Counter<'_> {
    type Output = ();

    fn children(&mut self, id: ExprId) -> SmallVec<[ExprId; 4]> {
        self.grammar.children(id)
    }

    fn before(&mut self, _id: ExprId, _depth: usize) {
        self.visits += 1;
    }

    fn cutoff(&mut self, _parent: ExprId, _child: ExprId, _depth: usize) {
        self.cutoffs += 1;
    }

    fn after(&mut self, _id: ExprId, _depth: usize, _edges: &[(ExprId, Visit<()>)]) {}
}

#[test]
fn walker_visits_each_node_once() {
    let grammar = left_recursive_sum();
    let root = grammar.root().unwrap();
    let mut counter = Counter {
        grammar: &grammar,
        visits: 0,
        cutoffs: 0,
    };
    let mut walker = GraphWalker::new();

    assert!(!walker.walk(&mut counter, root).is_cutoff());
    assert_eq!(counter.visits, reachable(&grammar).len());
    assert!(counter.cutoffs >= 1);

    let visits = counter.visits;
    assert!(!walker.walk(&mut counter, root).is_cutoff());
    assert_eq!(counter.visits, visits);
}

#[test]
fn detection_without_rewriting_is_an_error() {
    let options = PrepareOptions {
        left_recursion: LeftRecursionOptions {
            in_place: false,
            left_associative: false,
        },
        ..PrepareOptions::default()
    };
    let err = GrammarBuilder::new()
        .rule(
            "E",
            Peg::choice([Peg::seq([Peg::rule("E"), Peg::lit("+"), Peg::lit("n")]), Peg::lit("n")]),
        )
        .options(options)
        .build()
        .unwrap_err();
    assert_eq!(err, GrammarError::UnbrokenLeftRecursion("E".to_string()));
}

#[test]
fn undefined_rules_are_reported() {
    let err = GrammarBuilder::new()
        .rule("A", Peg::seq([Peg::lit("a"), Peg::rule("Missing")]))
        .build()
        .unwrap_err();
    assert_eq!(err, GrammarError::UnresolvedReference("Missing".to_string()));
}

#[test]
fn metrics_describe_the_sample_grammars() {
    let cluster = GrammarMetrics::compute(&arithmetic_cluster());
    assert_eq!(cluster.rule_count, 1);
    assert_eq!(cluster.cluster_count, 1);
    assert_eq!(cluster.left_recursive_count, 0);

    let rules = GrammarMetrics::compute(&arithmetic_left_recursive());
    assert_eq!(rules.rule_count, 3);
    assert_eq!(rules.cluster_count, 0);
    assert_eq!(rules.left_recursive_count, 2);
    assert!(rules.reachable_count <= rules.expression_count);
}
