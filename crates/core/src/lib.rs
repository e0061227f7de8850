//! Basil Core: shared foundation for the Basil BASIC engine
//!
//! This crate holds the types the compiler and the virtual machine
//! exchange: source positions, the dialect's type system, runtime values
//! and variable cells, and the bytecode `Program` object.
//!
//! Key design principles:
//! - Value: the tagged variant everything on the operand stack is
//!   (scalars, record instances, references into variable cells)
//! - Variables: boxed `Rc<RefCell<_>>` cells, so BYREF argument passing
//!   and SHARED bindings are plain cell identity
//! - Program: immutable after compilation, serializable, the only form
//!   handed from the code generator to the VM
//!
//! # Modules
//!
//! - `locus`: (line, column) source positions
//! - `types`: scalar kinds, sigil derivation, user-defined records
//! - `value`: runtime values, variable cells, reference paths
//! - `program`: the instruction set and the compiled program object
//! - `syscall`: the signature tables for the system routine layer

pub mod locus;
pub mod program;
pub mod syscall;
pub mod types;
pub mod value;

// Re-export key types
pub use locus::Locus;
pub use program::{Instr, Instruction, Literal, Program};
pub use syscall::{ArgMode, ArgType, SyscallArg, SyscallSig};
pub use types::{RecordField, RecordType, ScalarKind, TypeDesc};
pub use value::{
    Access, ArrayVariable, RecordValue, ScalarVariable, Value, ValueError, VarCell, VarRef,
    Variable, new_array_cell, new_scalar_cell,
};
