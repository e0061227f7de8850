//! Basil Compiler Library
//!
//! Compiles the Basil QBasic dialect to stack bytecode:
//!
//! 1. `tokenizer` turns source text into a restartable token stream.
//! 2. `syntax` declares the dialect grammar (productions with semantic
//!    actions); `parser` runs it as a generalized LR parse and evaluates
//!    the forest into the `ast` types.
//! 3. `codegen` resolves declarations, pools DATA, lowers statements and
//!    links labels into a [`basil_core::Program`] the VM executes.
//!
//! ```rust
//! let program = basilc::compile("PRINT 1 + 2\n").expect("compiles");
//! assert!(!program.instructions.is_empty());
//! ```

pub mod ast;
pub mod codegen;
pub mod config;
pub mod error;
pub mod grammar;
pub mod parser;
pub mod syntax;
pub mod tokenizer;

pub use codegen::CodeGen;
pub use config::CompilerConfig;
pub use error::CompileError;
pub use parser::{ParseError, Parser};
pub use tokenizer::{LexError, Token, Tokenizer};

use crate::ast::Stmt;
use crate::syntax::SemValue;
use basil_core::{Locus, Program};

/// Compile a program with the default configuration.
pub fn compile(source: &str) -> Result<Program, Vec<CompileError>> {
    compile_with_config(source, &CompilerConfig::default())
}

/// Compile a program for tests: deterministic devices, immediate input.
pub fn compile_for_test(source: &str) -> Result<Program, Vec<CompileError>> {
    compile_with_config(source, &CompilerConfig::new().with_test_mode(true))
}

pub fn compile_with_config(
    source: &str,
    config: &CompilerConfig,
) -> Result<Program, Vec<CompileError>> {
    let stmts = parse_program(source)?;
    CodeGen::new(config).compile(&stmts)
}

/// Front half of the pipeline only: tokens, parse forest, AST.
pub fn parse_program(source: &str) -> Result<Vec<Stmt>, Vec<CompileError>> {
    let tokens = Tokenizer::new(source)
        .tokenize()
        .map_err(|e| vec![CompileError::from(e)])?;
    let rules = syntax::grammar();
    let parser = Parser::new(&rules);
    match parser.parse(&tokens).map_err(|e| vec![CompileError::from(e)])? {
        SemValue::Stmts(stmts) => Ok(stmts),
        other => Err(vec![CompileError::preformatted(
            format!("internal error: parse produced {:?}", other),
            Locus::new(1, 1),
        )]),
    }
}
