//! # Input Generators
//!
//! Random text derived from a grammar graph, for property tests and fuzzing.
//!
//! The generator follows the expressions top-down: literals are emitted
//! verbatim, character classes pick a member, choices and clusters pick an
//! alternative. Ordered choice and predicates mean the output is not
//! guaranteed to be accepted, only to be close to the language.
//!
//! ## Usage
//!
//! ```rust
//! use strata::testing::{GeneratorConfig, InputGenerator, arithmetic_cluster};
//!
//! let grammar = arithmetic_cluster();
//! let generator = InputGenerator::new(&grammar, GeneratorConfig { seed: Some(7), ..GeneratorConfig::default() });
//! let inputs: Vec<String> = (0..4).map(|_| generator.generate()).collect();
//! assert_eq!(inputs.len(), 4);
//! ```

use crate::expr::{ExprId, ExprKind, Grammar};
use std::cell::RefCell;

/// Configuration for grammar-based input generation
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Nesting depth after which choices and clusters take their shallowest
    /// alternative and optional parts are left out
    pub max_depth: usize,
    /// Maximum number of repetitions for `*` and `+`
    pub max_repetitions: usize,
    /// Probability of taking optional elements (0.0 to 1.0)
    pub optional_probability: f64,
    /// Seed for reproducible generation
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            max_repetitions: 3,
            optional_probability: 0.5,
            seed: None,
        }
    }
}

/// Generator for grammar-derived input text
pub struct InputGenerator<'g> {
    grammar: &'g Grammar,
    config: GeneratorConfig,
    heights: Vec<usize>,
    rng: RefCell<SimpleRng>,
}

impl<'g> InputGenerator<'g> {
    #[must_use]
    pub fn new(grammar: &'g Grammar, config: GeneratorConfig) -> Self {
        let rng = config.seed.map_or_else(SimpleRng::new, SimpleRng::with_seed);
        Self {
            grammar,
            config,
            heights: min_heights(grammar),
            rng: RefCell::new(rng),
        }
    }

    /// Generate one input from the grammar's root.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut out = String::new();
        if let Some(root) = self.grammar.root() {
            self.emit(root, 0, &mut out);
        }
        out
    }

    /// Generate an input, then apply `mutations` random character edits.
    #[must_use]
    pub fn generate_mutated(&self, mutations: usize) -> String {
        let mut chars: Vec<char> = self.generate().chars().collect();
        let mut rng = self.rng.borrow_mut();
        for _ in 0..mutations {
            if chars.is_empty() {
                chars.push('?');
                continue;
            }
            let index = rng.below(chars.len());
            match rng.below(4) {
                0 => {
                    chars.remove(index);
                }
                1 => chars.insert(index, '?'),
                2 => {
                    let other = rng.below(chars.len());
                    chars.swap(index, other);
                }
                _ => {
                    let c = chars[index];
                    chars.insert(index, c);
                }
            }
        }
        chars.into_iter().collect()
    }

    fn below(&self, n: usize) -> usize {
        self.rng.borrow_mut().below(n)
    }

    fn shallowest(&self, candidates: impl Iterator<Item = ExprId>) -> Option<ExprId> {
        candidates.min_by_key(|id| self.heights[id.index()])
    }

    fn emit(&self, id: ExprId, depth: usize, out: &mut String) {
        let deep = depth > self.config.max_depth;
        match self.grammar.kind(id) {
            ExprKind::Literal(text) => out.push_str(text),
            ExprKind::Any => out.push('x'),
            ExprKind::CharRange(lo, hi) => {
                let span = (*hi as u32).saturating_sub(*lo as u32) as usize + 1;
                let offset = u32::try_from(self.below(span)).unwrap_or(0);
                out.push(char::from_u32(*lo as u32 + offset).unwrap_or(*lo));
            }
            ExprKind::CharSet(chars) => {
                if !chars.is_empty() {
                    out.push(chars[self.below(chars.len())]);
                }
            }
            ExprKind::Sequence(items) => {
                for &item in items {
                    self.emit(item, depth + 1, out);
                }
            }
            ExprKind::Choice(items) => {
                let pick = if deep {
                    self.shallowest(items.iter().copied())
                } else {
                    items.get(self.below(items.len())).copied()
                };
                if let Some(pick) = pick {
                    self.emit(pick, depth + 1, out);
                }
            }
            ExprKind::Optional(operand) => {
                if !deep && self.rng.borrow_mut().next_f64() < self.config.optional_probability {
                    self.emit(*operand, depth + 1, out);
                }
            }
            ExprKind::ZeroMore(operand) | ExprKind::OneMore(operand) => {
                let min = usize::from(matches!(self.grammar.kind(id), ExprKind::OneMore(_)));
                let reps = if deep {
                    min
                } else {
                    min + self.below(self.config.max_repetitions.saturating_sub(min) + 1)
                };
                for _ in 0..reps {
                    self.emit(*operand, depth + 1, out);
                }
            }
            ExprKind::Lookahead(_) | ExprKind::Not(_) | ExprKind::Custom(_) => {}
            ExprKind::Token(operand) => {
                self.emit(*operand, depth + 1, out);
                if self.grammar.whitespace().is_some() && self.below(2) == 0 {
                    out.push(' ');
                }
            }
            ExprKind::Capture { operand, .. }
            | ExprKind::LeftRecursive { operand, .. }
            | ExprKind::WithMinPrecedence { operand, .. } => self.emit(*operand, depth + 1, out),
            ExprKind::Cluster(groups) => {
                let pick = if deep {
                    self.shallowest(groups.iter().flat_map(|g| g.alternatives.iter().copied()))
                } else {
                    groups
                        .get(self.below(groups.len()))
                        .and_then(|g| g.alternatives.get(self.below(g.alternatives.len())))
                        .copied()
                };
                if let Some(pick) = pick {
                    self.emit(pick, depth + 1, out);
                }
            }
            ExprKind::Reference(name) => {
                if let Some(target) = self.grammar.rule(name) {
                    self.emit(target, depth + 1, out);
                }
            }
        }
    }
}

/// Smallest derivation height of every expression, so that generation past
/// `max_depth` can always pick a branch that terminates.
fn min_heights(grammar: &Grammar) -> Vec<usize> {
    let mut heights = vec![usize::MAX; grammar.len()];
    loop {
        let mut changed = false;
        for id in grammar.ids() {
            let height = height(grammar, &heights, id);
            if height < heights[id.index()] {
                heights[id.index()] = height;
                changed = true;
            }
        }
        if !changed {
            return heights;
        }
    }
}

fn height(grammar: &Grammar, heights: &[usize], id: ExprId) -> usize {
    let of = |child: &ExprId| heights[child.index()];
    let height = match grammar.kind(id) {
        ExprKind::Literal(_)
        | ExprKind::Any
        | ExprKind::CharRange(..)
        | ExprKind::CharSet(_)
        | ExprKind::Optional(_)
        | ExprKind::ZeroMore(_)
        | ExprKind::Lookahead(_)
        | ExprKind::Not(_)
        | ExprKind::Custom(_) => 0,
        ExprKind::Sequence(items) => items.iter().map(of).max().unwrap_or(0),
        ExprKind::Choice(items) => items.iter().map(of).min().unwrap_or(0),
        ExprKind::OneMore(operand)
        | ExprKind::Token(operand)
        | ExprKind::Capture { operand, .. }
        | ExprKind::LeftRecursive { operand, .. }
        | ExprKind::WithMinPrecedence { operand, .. } => of(operand),
        ExprKind::Cluster(groups) => groups
            .iter()
            .flat_map(|g| g.alternatives.iter())
            .map(of)
            .min()
            .unwrap_or(0),
        ExprKind::Reference(name) => grammar.rule(name).map_or(0, |target| of(&target)),
    };
    height.saturating_add(1)
}

/// Simple RNG for deterministic testing
#[derive(Debug, Clone)]
struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    const fn new() -> Self {
        Self {
            state: 0x853c_49e6_748f_ea9b,
        }
    }

    const fn with_seed(seed: u64) -> Self {
        // xorshift never leaves zero
        Self { state: seed | 1 }
    }

    fn next_u64(&mut self) -> u64 {
        // XorShift algorithm
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    #[allow(clippy::cast_precision_loss)]
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() as f64) / (u64::MAX as f64)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn below(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        (self.next_u64() % n as u64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{arithmetic_cluster, right_recursive_sum};

    #[test]
    fn test_rng_determinism() {
        let mut rng1 = SimpleRng::with_seed(12345);
        let mut rng2 = SimpleRng::with_seed(12345);
        assert_eq!(rng1.next_u64(), rng2.next_u64());
        assert_eq!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn same_seed_same_inputs() {
        let grammar = arithmetic_cluster();
        let config = GeneratorConfig {
            seed: Some(99),
            ..GeneratorConfig::default()
        };
        let a = InputGenerator::new(&grammar, config.clone());
        let b = InputGenerator::new(&grammar, config);
        for _ in 0..10 {
            assert_eq!(a.generate(), b.generate());
        }
    }

    #[test]
    fn deep_generation_terminates() {
        let grammar = crate::testing::arithmetic_left_recursive();
        let generator = InputGenerator::new(
            &grammar,
            GeneratorConfig {
                max_depth: 0,
                seed: Some(11),
                ..GeneratorConfig::default()
            },
        );
        let heights = min_heights(&grammar);
        let root = grammar.root().unwrap();
        assert!(heights[root.index()] < usize::MAX);
        for _ in 0..10 {
            let input = generator.generate();
            assert!(input.trim_end().chars().all(|c| c.is_ascii_digit()), "{input:?}");
        }
    }

    #[test]
    fn right_recursive_sums_are_generated() {
        let grammar = right_recursive_sum();
        let generator = InputGenerator::new(
            &grammar,
            GeneratorConfig {
                seed: Some(3),
                ..GeneratorConfig::default()
            },
        );
        for _ in 0..20 {
            let input = generator.generate();
            assert!(!input.is_empty());
            assert!(input.chars().all(|c| c.is_ascii_digit() || c == '+'), "{input:?}");
        }
    }
}
