//! Random-access input text. Positions are character indices.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Text {
    chars: Vec<char>,
    line_starts: Vec<usize>,
}

impl Text {
    #[must_use]
    pub fn new(source: &str) -> Self {
        let chars: Vec<char> = source.chars().collect();
        let line_starts = std::iter::once(0)
            .chain(chars.iter().enumerate().filter(|(_, c)| **c == '\n').map(|(i, _)| i + 1))
            .collect();
        Self { chars, line_starts }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Character at `position`, or `None` at the end of input.
    #[inline]
    #[must_use]
    pub fn at(&self, position: usize) -> Option<char> {
        self.chars.get(position).copied()
    }

    /// Whether `literal` occurs at `position`; returns the position after it.
    #[must_use]
    pub fn match_literal(&self, position: usize, literal: &str) -> Option<usize> {
        let mut end = position;
        for c in literal.chars() {
            if self.at(end)? != c {
                return None;
            }
            end += 1;
        }
        Some(end)
    }

    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> String {
        let end = range.end.min(self.chars.len());
        let start = range.start.min(end);
        self.chars[start..end].iter().collect()
    }

    /// 1-based line and column of `position`.
    #[must_use]
    pub fn line_col(&self, position: usize) -> (usize, usize) {
        let line = self.line_starts.partition_point(|&start| start <= position);
        let line_start = self.line_starts[line.saturating_sub(1)];
        (line, position - line_start + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_characters() {
        let text = Text::new("héllo");
        assert_eq!(text.len(), 5);
        assert_eq!(text.at(1), Some('é'));
        assert_eq!(text.at(5), None);
        assert_eq!(text.match_literal(1, "llo"), None);
        assert_eq!(text.match_literal(1, "éll"), Some(4));
        assert_eq!(text.slice(1..3), "él");
    }

    #[test]
    fn line_and_column() {
        let text = Text::new("ab\ncd\n");
        assert_eq!(text.line_col(0), (1, 1));
        assert_eq!(text.line_col(2), (1, 3));
        assert_eq!(text.line_col(3), (2, 1));
        assert_eq!(text.line_col(6), (3, 1));
    }
}
