//! # Testing Utilities
//!
//! Sample grammars and grammar-driven input generation, shared by the unit
//! tests, the integration tests, the benchmarks and the fuzz target.
//!
//! ## Property-Based Testing
//!
//! [`InputGenerator`] walks a grammar and emits text that is close to its
//! language. Seeded generation is reproducible, which pairs well with
//! `proptest` strategies that only pick the seed.

pub mod generators;
pub mod grammars;

pub use generators::{GeneratorConfig, InputGenerator};
pub use grammars::*;
