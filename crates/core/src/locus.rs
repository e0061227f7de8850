//! Source positions.
//!
//! A `Locus` is attached to tokens, AST nodes and emitted instructions so
//! that compile and runtime diagnostics can point back into the source.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A (line, column) source position. Both components are 1-based; the
/// tokenizer assigns column 1 to the first character of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Locus {
    pub line: u32,
    pub column: u32,
}

impl Locus {
    pub fn new(line: u32, column: u32) -> Self {
        Locus { line, column }
    }
}

impl fmt::Display for Locus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_line_colon_column() {
        assert_eq!(Locus::new(3, 14).to_string(), "3:14");
    }
}
