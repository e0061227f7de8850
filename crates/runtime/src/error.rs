//! Runtime errors.
//!
//! Every trap the VM can raise carries a numeric code, a message and the
//! locus of the instruction that raised it. The dispatch loop decorates
//! errors with the locus, hands them to the host's error hook and
//! suspends the machine; it never panics across the host boundary.

use basil_core::{Locus, ValueError};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    DivisionByZero,
    SubscriptOutOfRange,
    TypeMismatch,
    StackOverflow,
    StackUnderflow,
    UnknownSyscall,
    IoError,
}

impl ErrorCode {
    /// The numeric code surfaced through the error event.
    pub fn code(self) -> u16 {
        match self {
            ErrorCode::DivisionByZero => 101,
            ErrorCode::SubscriptOutOfRange => 102,
            ErrorCode::TypeMismatch => 103,
            ErrorCode::StackOverflow => 201,
            ErrorCode::StackUnderflow => 202,
            ErrorCode::UnknownSyscall => 301,
            ErrorCode::IoError => 401,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub code: ErrorCode,
    pub message: String,
    pub locus: Locus,
}

impl RuntimeError {
    /// A fresh error; the dispatch loop fills in the locus.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        RuntimeError { code, message: message.into(), locus: Locus::default() }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "runtime error {}: {} at {}", self.code.code(), self.message, self.locus)
    }
}

impl std::error::Error for RuntimeError {}

impl From<ValueError> for RuntimeError {
    fn from(e: ValueError) -> Self {
        let code = match &e {
            ValueError::TypeMismatch { .. } | ValueError::NoSuchField { .. } => {
                ErrorCode::TypeMismatch
            }
            ValueError::Subscript { .. } | ValueError::DimensionCount { .. } => {
                ErrorCode::SubscriptOutOfRange
            }
        };
        RuntimeError::new(code, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_the_documented_taxonomy() {
        assert_eq!(ErrorCode::DivisionByZero.code(), 101);
        assert_eq!(ErrorCode::StackOverflow.code(), 201);
        assert_eq!(ErrorCode::StackUnderflow.code(), 202);
        assert_eq!(ErrorCode::UnknownSyscall.code(), 301);
        assert_eq!(ErrorCode::IoError.code(), 401);
    }
}
