//! Basil Runtime: the stack virtual machine for compiled Basil programs.
//!
//! The VM executes the instruction stream of a [`basil_core::Program`]
//! against three device interfaces (console, audio, file system) and
//! nothing else; hosts supply real devices, tests use the bundled
//! in-memory doubles.
//!
//! ```rust
//! use basil_runtime::Vm;
//!
//! let program = basilc::compile_for_test("PRINT 1 + 2\n").expect("compiles");
//! let (mut vm, console, _audio, _files) = Vm::for_test(program);
//! vm.run().expect("runs");
//! assert_eq!(console.output(), "3\n");
//! ```
//!
//! # Modules
//!
//! - `vm`: dispatch loop, frames, suspension, run/tick/reset
//! - `syscalls`: the system routine layer
//! - `devices`: console/audio/file-system traits and test doubles
//! - `format`: PRINT display rules and `PRINT USING`
//! - `error`: runtime error codes and the error event payload

pub mod devices;
pub mod error;
pub mod format;
mod syscalls;
pub mod vm;

pub use devices::{
    Audio, Console, FileMode, FileSystem, LocalFileSystem, MemoryFileSystem, Request, TestAudio,
    TestConsole,
};
pub use error::{ErrorCode, RuntimeError};
pub use vm::{DEFAULT_QUANTUM, Tick, Vm, Waiting};
