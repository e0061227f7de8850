//! Syscall signatures.
//!
//! System routines come in two tables: functions (push a result) and
//! subroutines (may not). Each entry declares its argument types and
//! modes so the code generator can type-check call sites and decide
//! which arguments are passed by reference; the VM consults the same
//! table when dispatching.
//!
//! Variadic entries (optional or repeating arguments) receive the actual
//! argument count as an extra `pushconst` on top of the stack.

use crate::types::ScalarKind;
use std::collections::HashMap;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    Numeric,
    String,
    /// Wildcard: any scalar.
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgMode {
    ByVal,
    /// The caller pushes a variable reference; the routine writes back.
    ByRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallArg {
    pub ty: ArgType,
    pub mode: ArgMode,
}

const fn val(ty: ArgType) -> SyscallArg {
    SyscallArg { ty, mode: ArgMode::ByVal }
}

const fn by_ref(ty: ArgType) -> SyscallArg {
    SyscallArg { ty, mode: ArgMode::ByRef }
}

use ArgType::{Any, Numeric, String as Str};

/// One syscall signature.
#[derive(Debug, Clone, Copy)]
pub struct SyscallSig {
    pub name: &'static str,
    /// `Some` marks a function (a result is pushed), `None` a subroutine.
    pub ret: Option<ScalarKind>,
    pub args: &'static [SyscallArg],
    pub min_args: usize,
    /// The last argument may repeat without bound.
    pub repeats: bool,
    /// Whether this routine can suspend the VM awaiting the host.
    pub suspends: bool,
}

impl SyscallSig {
    pub fn is_function(&self) -> bool {
        self.ret.is_some()
    }

    /// Variadic routines get the actual argument count pushed last.
    pub fn is_variadic(&self) -> bool {
        self.repeats || self.min_args < self.args.len()
    }

    pub fn max_args(&self) -> Option<usize> {
        if self.repeats { None } else { Some(self.args.len()) }
    }

    /// Declared argument at position `i` (repeating the last entry for
    /// open-ended routines).
    pub fn arg_at(&self, i: usize) -> Option<&'static SyscallArg> {
        match self.args.get(i) {
            Some(a) => Some(a),
            None if self.repeats => self.args.last(),
            None => None,
        }
    }

    /// Does a call with `count` arguments satisfy this signature?
    pub fn accepts_count(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args().map(|m| count <= m).unwrap_or(true)
    }
}

const fn func(
    name: &'static str,
    ret: ScalarKind,
    args: &'static [SyscallArg],
    min_args: usize,
) -> SyscallSig {
    SyscallSig { name, ret: Some(ret), args, min_args, repeats: false, suspends: false }
}

const fn sub(name: &'static str, args: &'static [SyscallArg], min_args: usize) -> SyscallSig {
    SyscallSig { name, ret: None, args, min_args, repeats: false, suspends: false }
}

const fn suspending(sig: SyscallSig) -> SyscallSig {
    SyscallSig { suspends: true, ..sig }
}

const fn repeating(sig: SyscallSig) -> SyscallSig {
    SyscallSig { repeats: true, ..sig }
}

/// The function table (every entry pushes a result).
pub static FUNCTIONS: &[SyscallSig] = &[
    // numeric
    func("RND", ScalarKind::Single, &[val(Numeric)], 0),
    func("INT", ScalarKind::Long, &[val(Numeric)], 1),
    func("VAL", ScalarKind::Double, &[val(Str)], 1),
    func("TIMER", ScalarKind::Double, &[], 0),
    func("PEEK", ScalarKind::Integer, &[val(Numeric)], 1),
    // string
    func("CHR$", ScalarKind::String, &[val(Numeric)], 1),
    func("STR$", ScalarKind::String, &[val(Numeric)], 1),
    func("SPACE$", ScalarKind::String, &[val(Numeric)], 1),
    func("LEN", ScalarKind::Integer, &[val(Str)], 1),
    func("LEFT$", ScalarKind::String, &[val(Str), val(Numeric)], 2),
    func("RIGHT$", ScalarKind::String, &[val(Str), val(Numeric)], 2),
    func("MID$", ScalarKind::String, &[val(Str), val(Numeric), val(Numeric)], 2),
    func("LCASE$", ScalarKind::String, &[val(Str)], 1),
    func("UCASE$", ScalarKind::String, &[val(Str)], 1),
    func("INKEY$", ScalarKind::String, &[], 0),
];

/// The subroutine table.
pub static SUBROUTINES: &[SyscallSig] = &[
    // console
    sub("CLS", &[], 0),
    sub("LOCATE", &[val(Numeric), val(Numeric)], 2),
    sub("COLOR", &[val(Numeric), val(Numeric), val(Numeric)], 1),
    sub("SCREEN", &[val(Numeric)], 1),
    sub("WIDTH", &[val(Numeric), val(Numeric)], 2),
    suspending(sub("INPUT", &[by_ref(Any)], 1)),
    repeating(sub("READ", &[by_ref(Any)], 1)),
    sub("SWAP", &[by_ref(Any), by_ref(Any)], 2),
    // flow
    suspending(sub("SLEEP", &[val(Numeric)], 0)),
    suspending(sub("YIELD", &[], 0)),
    sub("SYSTEM", &[], 0),
    sub("BEEP", &[], 0),
    sub("RANDOMIZE", &[val(Numeric)], 0),
    // audio
    suspending(sub("PLAY", &[val(Str), val(Numeric)], 1)),
    sub("BGMPLAY", &[val(Str), val(Numeric)], 1),
    sub("BGMSTOP", &[], 0),
    // sprites
    suspending(sub("SPSET", &[val(Numeric), val(Numeric), val(Numeric)], 2)),
    sub("SPOFS", &[val(Numeric), val(Numeric), val(Numeric)], 3),
    sub("SPSCALE", &[val(Numeric), val(Numeric), val(Numeric)], 3),
    sub("SPROT", &[val(Numeric), val(Numeric)], 2),
    sub("SPHOME", &[val(Numeric), val(Numeric), val(Numeric)], 3),
    sub("SPHIDE", &[val(Numeric)], 1),
    sub("SPSHOW", &[val(Numeric)], 1),
    sub("SPANIM", &[val(Numeric), val(Numeric), val(Numeric), val(Numeric)], 3),
    sub("SPCLR", &[val(Numeric)], 1),
    // internal opcodes exposed as syscalls
    sub("print", &[val(Any)], 1),
    sub("print_comma", &[], 0),
    sub("print_tab", &[val(Numeric)], 1),
    repeating(sub("print_using", &[val(Str), val(Any)], 2)),
    sub("alloc_scalar", &[val(Str), val(Str)], 2),
    repeating(sub("alloc_array", &[val(Str), val(Str), val(Numeric)], 3)),
    // file I/O
    sub("open", &[val(Str), val(Str), val(Numeric)], 3),
    sub("close", &[val(Numeric)], 0),
    repeating(sub("write", &[val(Numeric), val(Any)], 1)),
    repeating(sub("input_file", &[val(Numeric), by_ref(Any)], 2)),
];

static FUNCTION_INDEX: LazyLock<HashMap<&'static str, &'static SyscallSig>> =
    LazyLock::new(|| FUNCTIONS.iter().map(|s| (s.name, s)).collect());

static SUBROUTINE_INDEX: LazyLock<HashMap<&'static str, &'static SyscallSig>> =
    LazyLock::new(|| SUBROUTINES.iter().map(|s| (s.name, s)).collect());

/// Look up a system function by name.
pub fn function(name: &str) -> Option<&'static SyscallSig> {
    FUNCTION_INDEX.get(name).copied()
}

/// Look up a system subroutine by name.
pub fn subroutine(name: &str) -> Option<&'static SyscallSig> {
    SUBROUTINE_INDEX.get(name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_disjoint_and_indexed() {
        assert!(function("RND").is_some());
        assert!(subroutine("RND").is_none());
        assert!(subroutine("CLS").is_some());
        assert!(function("CLS").is_none());
    }

    #[test]
    fn optional_arguments_make_a_signature_variadic() {
        let mid = function("MID$").unwrap();
        assert!(mid.is_variadic());
        assert!(mid.accepts_count(2));
        assert!(mid.accepts_count(3));
        assert!(!mid.accepts_count(4));

        let cls = subroutine("CLS").unwrap();
        assert!(!cls.is_variadic());
        assert!(!cls.accepts_count(1));
    }

    #[test]
    fn repeating_signatures_are_unbounded() {
        let read = subroutine("READ").unwrap();
        assert!(read.accepts_count(7));
        assert_eq!(read.arg_at(6).map(|a| a.mode), Some(ArgMode::ByRef));
    }
}
