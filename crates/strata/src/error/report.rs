use crate::expr::{ExprId, Grammar};
use crate::text::Text;
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::fmt;

/// Receives the failures of error-recording expressions during a parse.
pub trait ErrorHandler {
    /// `expr` failed when invoked at `position`.
    fn record(&mut self, expr: ExprId, position: usize);

    /// Summarize what was recorded, or `None` if nothing was.
    fn report(&self, grammar: &Grammar, text: &Text) -> Option<ErrorReport>;
}

/// Keeps the failures at the farthest position reached.
#[derive(Debug, Clone, Default)]
pub struct FarthestErrors {
    position: Option<usize>,
    failed: SmallVec<[ExprId; 8]>,
}

impl FarthestErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn position(&self) -> Option<usize> {
        self.position
    }

    #[must_use]
    pub fn failed(&self) -> &[ExprId] {
        &self.failed
    }
}

impl ErrorHandler for FarthestErrors {
    fn record(&mut self, expr: ExprId, position: usize) {
        match self.position {
            Some(farthest) if position < farthest => {}
            Some(farthest) if position == farthest => {
                if !self.failed.contains(&expr) {
                    self.failed.push(expr);
                }
            }
            _ => {
                self.position = Some(position);
                self.failed.clear();
                self.failed.push(expr);
            }
        }
    }

    fn report(&self, grammar: &Grammar, text: &Text) -> Option<ErrorReport> {
        let position = self.position?;
        let expected = self.failed.iter().map(|&id| grammar.describe(id));
        Some(ErrorReport::new(text, position, expected))
    }
}

/// Farthest failure of a parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    /// Character offset.
    pub position: usize,
    /// 1-based line.
    pub line: usize,
    /// 1-based column, in characters.
    pub column: usize,
    /// Descriptions of the expressions that failed there, sorted and deduplicated.
    pub expected: Vec<String>,
}

impl ErrorReport {
    pub fn new(text: &Text, position: usize, expected: impl IntoIterator<Item = String>) -> Self {
        let (line, column) = text.line_col(position);
        let expected: BTreeSet<String> = expected.into_iter().collect();
        Self {
            position,
            line,
            column,
            expected: expected.into_iter().collect(),
        }
    }

    /// The expected set as prose, e.g. `"a", "b", or num`.
    #[must_use]
    pub fn expected_phrase(&self) -> String {
        super::format_expected_list(&self.expected)
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to match any of: {{{}}} at line {}, column {} (offset {})",
            self.expected.join(", "),
            self.line,
            self.column,
            self.position
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Peg;

    #[test]
    fn keeps_only_the_farthest_position() {
        let mut g = Grammar::new();
        let a = g.insert(Peg::lit("a"));
        let b = g.insert(Peg::lit("b"));
        let c = g.insert(Peg::lit("c"));

        let mut errors = FarthestErrors::new();
        errors.record(a, 1);
        errors.record(b, 3);
        errors.record(a, 2);
        errors.record(c, 3);
        errors.record(b, 3);

        assert_eq!(errors.position(), Some(3));
        assert_eq!(errors.failed(), &[b, c]);
    }

    #[test]
    fn report_display() {
        let mut g = Grammar::new();
        let b = g.insert(Peg::lit("b"));
        let digit = g.insert(Peg::range('0', '9'));
        let text = Text::new("ab\nx");
        let mut errors = FarthestErrors::new();
        errors.record(digit, 4);
        errors.record(b, 4);
        let report = errors.report(&g, &text).unwrap();
        assert_eq!((report.line, report.column), (2, 2));
        assert_eq!(
            report.to_string(),
            "failed to match any of: {\"b\", ['0'-'9']} at line 2, column 2 (offset 4)"
        );
    }

    #[test]
    fn empty_handler_has_no_report() {
        let g = Grammar::new();
        assert!(FarthestErrors::new().report(&g, &Text::new("")).is_none());
    }
}
