#![no_main]
use libfuzzer_sys::fuzz_target;
use strata::testing::{ambiguous_sum, arithmetic_cluster, arithmetic_left_recursive};
use strata::{MemoStrategy, Parser, ParserConfig};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    // keep nesting within the default depth limit
    if input.len() > 256 {
        return;
    }

    for grammar in [arithmetic_cluster(), arithmetic_left_recursive(), ambiguous_sum()] {
        let memoized = Parser::new(&grammar, ParserConfig::default())
            .unwrap()
            .parse(input);
        let plain = Parser::new(&grammar, ParserConfig::default().with_memoization(MemoStrategy::None))
            .unwrap()
            .parse(input);
        match (memoized, plain) {
            (Ok(a), Ok(b)) => {
                assert_eq!(a.matched, b.matched);
                assert_eq!(a.end_position, b.end_position);
                assert_eq!(a.sexpr(), b.sexpr());
                assert_eq!(a.error, b.error);
                assert!(a.end_position <= input.chars().count());
                assert_eq!(a.error.is_some(), !a.matched);
            }
            (Err(_), _) | (_, Err(_)) => {}
        }
    }
});
