//! Calculator example
//!
//! Parses arithmetic with the sample precedence cluster and evaluates the
//! capture tree. Pass an expression as the first argument.

use strata::testing::arithmetic_cluster;
use strata::{CaptureNode, Parser, ParserConfig};

fn evaluate(node: &CaptureNode) -> Option<f64> {
    match node.accessor.as_deref() {
        Some("num") => node.text()?.parse().ok(),
        Some(op) => {
            let left = evaluate(node.child(0)?)?;
            let right = evaluate(node.child(1)?)?;
            match op {
                "+" => Some(left + right),
                "-" => Some(left - right),
                "*" => Some(left * right),
                "/" => Some(left / right),
                _ => None,
            }
        }
        None => evaluate(node.child(0)?),
    }
}

fn main() {
    let input = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "2 * (3 + 4) - 10 / 4".to_string());

    let grammar = arithmetic_cluster();
    let parser = Parser::new(&grammar, ParserConfig::default()).expect("sample grammar is prepared");
    let result = match parser.parse(&input) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("parse aborted: {e}");
            std::process::exit(2);
        }
    };

    if let Some(error) = &result.error {
        eprintln!("{input}");
        eprintln!("{:>width$}", "^", width = error.column);
        eprintln!("expected {}", error.expected_phrase());
        std::process::exit(1);
    }

    println!("{}", result.sexpr());
    match evaluate(&result.tree) {
        Some(value) => println!("= {value}"),
        None => eprintln!("could not evaluate"),
    }
    println!(
        "{} invocations, {} memo hits, {:?}",
        result.metrics.invocations, result.metrics.memo_hits, result.metrics.parse_time
    );
}
