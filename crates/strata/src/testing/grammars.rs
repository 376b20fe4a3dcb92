//! # Sample Grammars
//!
//! Small prepared grammars shared by tests, benchmarks and the fuzz target.
//! Numbers capture as `num` leaves and every binary operator as a node named
//! after the operator, so `ParseResult::sexpr` shows the nesting directly.

use crate::expr::{Grammar, GrammarBuilder, GroupKind, Peg, PegGroup};
use crate::{LeftRecursionOptions, PrepareOptions};

fn number() -> Peg {
    Peg::plus(Peg::range('0', '9')).text("num").token()
}

fn whitespace() -> Peg {
    Peg::star(Peg::set(" \t\r\n"))
}

fn binary(left: Peg, op: &str, right: Peg) -> Peg {
    Peg::seq([left, Peg::lit(op).token(), right]).node(op)
}

fn build(builder: GrammarBuilder) -> Grammar {
    builder
        .build()
        .unwrap_or_else(|e| panic!("sample grammar is invalid: {e}"))
}

/// Four-operator arithmetic as a single precedence cluster.
///
/// `*` and `/` bind tighter than `+` and `-`; all four are left-associative.
/// Parentheses reset the precedence floor.
#[must_use]
pub fn arithmetic_cluster() -> Grammar {
    let expr = || Peg::rule("expr");
    let parens = Peg::seq([
        Peg::lit("(").token(),
        Peg::drop_precedence(expr()),
        Peg::lit(")").token(),
    ]);
    build(
        GrammarBuilder::new()
            .rule(
                "expr",
                Peg::cluster([
                    PegGroup::new(3, GroupKind::None, [number(), parens]),
                    PegGroup::new(
                        2,
                        GroupKind::LeftAssociative,
                        [binary(expr(), "*", expr()), binary(expr(), "/", expr())],
                    ),
                    PegGroup::new(
                        1,
                        GroupKind::LeftAssociative,
                        [binary(expr(), "+", expr()), binary(expr(), "-", expr())],
                    ),
                ]),
            )
            .whitespace(whitespace()),
    )
}

/// The same language written with one left-recursive rule per tier. The
/// recursion is broken automatically by preparation.
#[must_use]
pub fn arithmetic_left_recursive() -> Grammar {
    build(
        GrammarBuilder::new()
            .rule(
                "sum",
                Peg::choice([
                    binary(Peg::rule("sum"), "+", Peg::rule("product")),
                    binary(Peg::rule("sum"), "-", Peg::rule("product")),
                    Peg::rule("product"),
                ]),
            )
            .rule(
                "product",
                Peg::choice([
                    binary(Peg::rule("product"), "*", Peg::rule("atom")),
                    binary(Peg::rule("product"), "/", Peg::rule("atom")),
                    Peg::rule("atom"),
                ]),
            )
            .rule(
                "atom",
                Peg::choice([
                    number(),
                    Peg::seq([Peg::lit("(").token(), Peg::rule("sum"), Peg::lit(")").token()]),
                ]),
            )
            .whitespace(whitespace()),
    )
}

/// `E = E '+' num / num`: sums nest to the left.
#[must_use]
pub fn left_recursive_sum() -> Grammar {
    build(GrammarBuilder::new().rule(
        "E",
        Peg::choice([binary(Peg::rule("E"), "+", number()), number()]),
    ))
}

/// `E = num '+' E / num`: sums nest to the right.
#[must_use]
pub fn right_recursive_sum() -> Grammar {
    build(GrammarBuilder::new().rule(
        "E",
        Peg::choice([binary(number(), "+", Peg::rule("E")), number()]),
    ))
}

/// `E = E '+' E / '(' E ')' / num`, with the automatically inserted boundary
/// marked left-associative.
#[must_use]
pub fn ambiguous_sum() -> Grammar {
    let options = PrepareOptions {
        left_recursion: LeftRecursionOptions {
            in_place: true,
            left_associative: true,
        },
        ..PrepareOptions::default()
    };
    build(
        GrammarBuilder::new()
            .rule(
                "E",
                Peg::choice([
                    binary(Peg::rule("E"), "+", Peg::rule("E")),
                    Peg::seq([Peg::lit("(").token(), Peg::rule("E"), Peg::lit(")").token()]),
                    number(),
                ]),
            )
            .options(options),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Parser, ParserConfig};

    fn sexpr(grammar: &Grammar, input: &str) -> String {
        let result = Parser::new(grammar, ParserConfig::default())
            .unwrap()
            .parse(input)
            .unwrap();
        assert!(result.matched, "{input:?} did not match: {:?}", result.error);
        result.sexpr()
    }

    #[test]
    fn sample_grammars_prepare() {
        for grammar in [
            arithmetic_cluster(),
            arithmetic_left_recursive(),
            left_recursive_sum(),
            right_recursive_sum(),
            ambiguous_sum(),
        ] {
            assert!(grammar.is_prepared());
        }
    }

    #[test]
    fn cluster_and_rules_agree() {
        let input = "8 / 4 / 2 - (1 + 2) * 3";
        assert_eq!(
            sexpr(&arithmetic_cluster(), input),
            sexpr(&arithmetic_left_recursive(), input)
        );
    }

    #[test]
    fn ambiguous_sum_nests_left() {
        assert_eq!(
            sexpr(&ambiguous_sum(), "1+(2+3)+4"),
            "(_ (+ (+ 1 (+ 2 3)) 4))"
        );
    }
}
