//! Compile-time errors.
//!
//! Lexical, syntactic and semantic failures all collapse into
//! `CompileError`: a formatted message plus the locus it points at.
//! Compilation yields no program when the error list is non-empty.

use crate::parser::ParseError;
use crate::tokenizer::LexError;
use basil_core::Locus;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    /// Fully formatted message, locus included.
    pub message: String,
    pub locus: Locus,
}

impl CompileError {
    /// Semantic error: the locus is appended to the message.
    pub fn new(message: impl AsRef<str>, locus: Locus) -> Self {
        CompileError { message: format!("{} at {}", message.as_ref(), locus), locus }
    }

    /// An error whose message already carries its position (tokenizer
    /// and parser messages are specified verbatim).
    pub fn preformatted(message: String, locus: Locus) -> Self {
        CompileError { message, locus }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CompileError {}

impl From<LexError> for CompileError {
    fn from(e: LexError) -> Self {
        CompileError::preformatted(e.to_string(), e.locus())
    }
}

impl From<ParseError> for CompileError {
    fn from(e: ParseError) -> Self {
        let locus = e.locus;
        CompileError::preformatted(e.message, locus)
    }
}
