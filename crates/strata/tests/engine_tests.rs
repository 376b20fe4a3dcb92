//! End-to-end matching behaviour: combinators, backtracking, left recursion,
//! precedence clusters, captures, errors and limits.

use pretty_assertions::assert_eq;
use strata::expr::{CaptureMode, GrammarBuilder, GroupKind, Peg, PegGroup};
use strata::testing::{arithmetic_cluster, arithmetic_left_recursive, left_recursive_sum, right_recursive_sum};
use strata::{EngineError, Error, Grammar, GrammarError, MemoStrategy, ParseResult, Parser, ParserConfig};

fn parse(grammar: &Grammar, input: &str) -> ParseResult {
    Parser::new(grammar, ParserConfig::default())
        .expect("prepared grammar")
        .parse(input)
        .expect("no engine error")
}

fn sexpr(grammar: &Grammar, input: &str) -> String {
    let result = parse(grammar, input);
    assert!(result.matched, "{input:?} did not match: {:?}", result.error);
    result.sexpr()
}

fn grammar(rule: Peg) -> Grammar {
    GrammarBuilder::new().rule("S", rule).build().expect("valid grammar")
}

#[test]
fn ordered_choice_commits_to_first_match() {
    let g = grammar(Peg::choice([Peg::lit("a"), Peg::lit("ab")]));
    let result = parse(&g, "ab");
    assert!(result.succeeded);
    assert!(!result.matched);
    assert_eq!(result.end_position, 1);

    let error = result.error.expect("partial match is reported");
    assert_eq!(error.position, 1);
    assert_eq!(error.expected, vec!["end of input".to_string()]);
}

#[test]
fn failed_alternative_leaves_no_captures() {
    let g = grammar(Peg::choice([
        Peg::seq([Peg::lit("a").text("first"), Peg::lit("b")]),
        Peg::seq([Peg::lit("a"), Peg::lit("c").text("second")]),
    ]));
    let result = parse(&g, "ac");
    assert!(result.matched);
    assert!(result.tree.get("first").is_none());
    assert_eq!(result.tree.get("second").and_then(|n| n.text()), Some("c"));
    assert_eq!(result.tree.children.len(), 1);
}

#[test]
fn predicates_consume_nothing() {
    let g = grammar(Peg::seq([Peg::and(Peg::lit("ab")), Peg::lit("a"), Peg::lit("b")]));
    assert!(parse(&g, "ab").matched);

    let g = grammar(Peg::seq([Peg::not(Peg::lit("x")), Peg::any()]));
    assert!(parse(&g, "y").matched);
    assert!(!parse(&g, "x").succeeded);
}

#[test]
fn repetition_is_greedy() {
    let g = grammar(Peg::seq([Peg::star(Peg::lit("a")), Peg::lit("b")]));
    assert!(parse(&g, "aaab").matched);
    assert!(parse(&g, "b").matched);

    let g = grammar(Peg::plus(Peg::range('a', 'z')));
    assert!(!parse(&g, "").succeeded);
    assert_eq!(parse(&g, "abc1").end_position, 3);
}

#[test]
fn left_recursion_nests_left() {
    assert_eq!(sexpr(&left_recursive_sum(), "1+2+3"), "(_ (+ (+ 1 2) 3))");
    assert_eq!(sexpr(&left_recursive_sum(), "7"), "(_ 7)");
}

#[test]
fn right_recursion_nests_right() {
    assert_eq!(sexpr(&right_recursive_sum(), "1+2+3"), "(_ (+ 1 (+ 2 3)))");
}

#[test]
fn mutual_left_recursion() {
    let g = GrammarBuilder::new()
        .rule(
            "A",
            Peg::choice([Peg::seq([Peg::rule("B"), Peg::lit("a")]), Peg::lit("x")]),
        )
        .rule(
            "B",
            Peg::choice([Peg::seq([Peg::rule("A"), Peg::lit("b")]), Peg::lit("y")]),
        )
        .build()
        .expect("recursion is broken during preparation");
    for input in ["x", "xba", "xbaba", "ya", "yaba"] {
        assert!(parse(&g, input).matched, "{input}");
    }
    assert!(!parse(&g, "xb").matched);
}

#[test]
fn tighter_operators_bind_first() {
    let g = arithmetic_cluster();
    assert_eq!(sexpr(&g, "1 + 2 * 3"), "(_ (+ 1 (* 2 3)))");
    assert_eq!(sexpr(&g, "1 * 2 + 3"), "(_ (+ (* 1 2) 3))");
    assert_eq!(sexpr(&g, "1 - 2 - 3"), "(_ (- (- 1 2) 3))");
    assert_eq!(sexpr(&g, "1*2+3*4"), "(_ (+ (* 1 2) (* 3 4)))");
}

#[test]
fn parentheses_reset_precedence() {
    let g = arithmetic_cluster();
    assert_eq!(sexpr(&g, "(1 + 2) * 3"), "(_ (* (+ 1 2) 3))");
    assert_eq!(sexpr(&g, "2 * (3 - (4 / 5))"), "(_ (* 2 (- 3 (/ 4 5))))");
}

#[test]
fn recursive_level_nests_right() {
    let expr = || Peg::rule("expr");
    let binary = |op: &str| Peg::seq([expr(), Peg::lit(op), expr()]).node(op);
    let g = GrammarBuilder::new()
        .rule(
            "expr",
            Peg::cluster([
                PegGroup::new(3, GroupKind::None, [Peg::plus(Peg::range('0', '9')).text("num")]),
                PegGroup::new(2, GroupKind::LeftRecursive, [binary("^")]),
                PegGroup::new(1, GroupKind::LeftAssociative, [binary("+")]),
            ]),
        )
        .build()
        .expect("valid cluster");
    for memoization in [MemoStrategy::None, MemoStrategy::Rules, MemoStrategy::All] {
        let parse = |input: &str| {
            let result = Parser::new(&g, ParserConfig::default().with_memoization(memoization))
                .unwrap()
                .parse(input)
                .unwrap();
            assert!(result.matched, "{input:?}: {:?}", result.error);
            result.sexpr()
        };
        assert_eq!(parse("2^3^4"), "(_ (^ 2 (^ 3 4)))");
        assert_eq!(parse("1+2^3+4"), "(_ (+ (+ 1 (^ 2 3)) 4))");
    }
}

#[test]
fn cluster_matches_rule_per_tier_grammar() {
    let cluster = arithmetic_cluster();
    let rules = arithmetic_left_recursive();
    for input in ["1", "1 + 2 * 3 - 4", "(1 + 2) * (3 + 4) / 5", "9 - 8 - 7 * 6 * 5"] {
        assert_eq!(sexpr(&cluster, input), sexpr(&rules, input), "{input}");
    }
}

#[test]
fn whitespace_follows_tokens() {
    let g = arithmetic_cluster();
    assert!(parse(&g, "1 \t+\n2 ").matched);
    assert!(!parse(&g, " 1").succeeded);
}

#[test]
fn captures_groups_and_tags() {
    let item = Peg::plus(Peg::range('0', '9')).capture(CaptureMode::text("item").multiple().tag("number"));
    let g = grammar(Peg::seq([
        Peg::lit("["),
        Peg::opt(Peg::seq([
            item.clone(),
            Peg::star(Peg::seq([Peg::lit(","), item])),
        ])),
        Peg::lit("]"),
    ]));
    let result = parse(&g, "[1,22,333]");
    assert!(result.matched);

    let items = result.tree.group("item");
    let texts: Vec<_> = items.iter().filter_map(|n| n.text()).collect();
    assert_eq!(texts, vec!["1", "22", "333"]);
    assert_eq!(items[1].span, 3..5);
    assert!(result.tree.get("item").is_none());
    assert_eq!(result.tree.tagged("number").count(), 3);
}

#[test]
fn decoration_renames_without_nesting() {
    let word = || Peg::plus(Peg::range('a', 'z'));
    let g = grammar(Peg::seq([
        word().text("key"),
        Peg::lit("="),
        word().text("word").capture(CaptureMode::decorate("value")),
    ]));
    let result = parse(&g, "a=bc");
    assert!(result.matched);
    assert_eq!(result.tree.get("key").and_then(|n| n.text()), Some("a"));
    assert_eq!(result.tree.get("value").and_then(|n| n.text()), Some("bc"));
    assert!(result.tree.get("word").is_none());
    assert_eq!(result.tree.children.len(), 2);
}

#[test]
fn farthest_failure_is_reported() {
    let digit = || Peg::range('0', '9');
    let g = grammar(Peg::seq([
        Peg::lit("["),
        Peg::opt(Peg::seq([digit(), Peg::star(Peg::seq([Peg::lit(","), digit()]))])),
        Peg::lit("]"),
    ]));
    let result = parse(&g, "[1,2,x]");
    assert!(!result.succeeded);
    assert_eq!(result.end_position, 0);

    let error = result.error.expect("failure is reported");
    assert_eq!(error.position, 5);
    assert_eq!((error.line, error.column), (1, 6));
    assert_eq!(error.expected, vec!["['0'-'9']".to_string()]);
}

#[test]
fn incomplete_expression_reports_operands() {
    let result = parse(&arithmetic_cluster(), "1 +");
    assert!(result.succeeded);
    assert_eq!(result.end_position, 2);

    let error = result.error.expect("failure is reported");
    assert_eq!(error.position, 3);
    assert_eq!(error.expected, vec!["\"(\"", "['0'-'9']", "expr", "num"]);
}

#[test]
fn failures_inside_negation_are_not_reported() {
    let g = grammar(Peg::seq([
        Peg::not(Peg::seq([Peg::lit("a"), Peg::lit("bcd")])),
        Peg::lit("a"),
        Peg::lit("z"),
    ]));
    let error = parse(&g, "ax").error.expect("failure is reported");
    assert_eq!(error.position, 1);
    assert_eq!(error.expected, vec!["\"z\"".to_string()]);
}

#[test]
fn depth_limit_aborts() {
    let g = right_recursive_sum();
    let input = vec!["1"; 200].join("+");
    let config = ParserConfig::default().with_max_depth(32);
    let err = Parser::new(&g, config).unwrap().parse(&input).unwrap_err();
    assert!(matches!(err, EngineError::RecursionLimit { limit: 32, .. }), "{err}");
}

#[test]
fn step_limit_aborts() {
    let g = arithmetic_cluster();
    let config = ParserConfig::default().with_max_steps(5);
    let err = Parser::new(&g, config).unwrap().parse("1 + 2 + 3").unwrap_err();
    assert!(matches!(err, EngineError::StepLimit { limit: 5, .. }), "{err}");
}

#[test]
fn unprepared_grammars_are_refused() {
    let g = GrammarBuilder::new()
        .rule("A", Peg::lit("a"))
        .build_unprepared()
        .unwrap();
    assert_eq!(
        Parser::new(&g, ParserConfig::default()).unwrap_err(),
        GrammarError::Unprepared
    );
    assert_eq!(
        strata::parse(&g, "a", ParserConfig::default()).unwrap_err(),
        Error::Grammar(GrammarError::Unprepared)
    );
}

#[test]
fn metrics_are_collected() {
    let result = parse(&arithmetic_left_recursive(), "1 + 2 * 3");
    assert!(result.matched);
    assert!(result.metrics.invocations > 0);
    assert!(result.metrics.seed_iterations > 0);
}
