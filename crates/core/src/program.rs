//! The bytecode instruction set and the compiled program object.
//!
//! A `Program` is the only artifact exchanged between the compiler and the
//! VM, and it is immutable after compilation. Instructions are records of
//! `{ opcode, arg?, locus }`; the textual `Display` form uses the opcode
//! names the VM documentation speaks in (`pushconst`, `bz`, `forloop`, ...).

use crate::locus::Locus;
use crate::types::{RecordType, ScalarKind};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A literal pooled by the compiler: `pushconst` payloads and DATA items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Integer(i32),
    Long(i64),
    Single(f32),
    Double(f64),
    Str(String),
}

impl Literal {
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Integer(n) => Value::Integer(*n),
            Literal::Long(n) => Value::Long(*n),
            Literal::Single(x) => Value::Single(*x),
            Literal::Double(x) => Value::Double(*x),
            Literal::Str(s) => Value::Str(s.clone()),
        }
    }

    pub fn kind(&self) -> ScalarKind {
        match self {
            Literal::Integer(_) => ScalarKind::Integer,
            Literal::Long(_) => ScalarKind::Long,
            Literal::Single(_) => ScalarKind::Single,
            Literal::Double(_) => ScalarKind::Double,
            Literal::Str(_) => ScalarKind::String,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Long(n) => write!(f, "{}", n),
            Literal::Single(x) => write!(f, "{}", x),
            Literal::Double(x) => write!(f, "{}", x),
            Literal::Str(s) => write!(f, "{:?}", s),
        }
    }
}

/// One opcode with its argument. Address arguments are instruction
/// indices; the code generator emits symbolic labels and a link pass
/// substitutes the final values before a `Program` is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instr {
    // Constants and variable access
    PushConst(Literal),
    PushRef(String),
    PushValue(String),
    PopVar(String),
    PopVal(String),

    // Control
    Jmp(usize),
    Bz(usize),
    Bnz(usize),
    Call(usize),
    Gosub(usize),
    Ret,
    ForLoop(usize),

    // Arithmetic and logic (binary ops pop RHS first)
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Neg,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,

    // Aggregates
    Assign,
    ArrayDeref { as_ref: bool },
    MemberDeref(String),
    MemberValue(String),

    // DATA
    Restore(usize),

    // System routines, by name; functions push a result, subroutines don't
    Syscall(String),
}

impl Instr {
    /// True when the argument is an instruction address (patched by the
    /// linker's label-fixup pass).
    pub fn is_addr_label(&self) -> bool {
        matches!(
            self,
            Instr::Jmp(_)
                | Instr::Bz(_)
                | Instr::Bnz(_)
                | Instr::Call(_)
                | Instr::Gosub(_)
                | Instr::ForLoop(_)
        )
    }

    /// True when the argument indexes the DATA pool.
    pub fn is_data_label(&self) -> bool {
        matches!(self, Instr::Restore(_))
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::PushConst(l) => write!(f, "pushconst {}", l),
            Instr::PushRef(n) => write!(f, "pushref {}", n),
            Instr::PushValue(n) => write!(f, "pushvalue {}", n),
            Instr::PopVar(n) => write!(f, "popvar {}", n),
            Instr::PopVal(n) => write!(f, "popval {}", n),
            Instr::Jmp(a) => write!(f, "jmp {}", a),
            Instr::Bz(a) => write!(f, "bz {}", a),
            Instr::Bnz(a) => write!(f, "bnz {}", a),
            Instr::Call(a) => write!(f, "call {}", a),
            Instr::Gosub(a) => write!(f, "gosub {}", a),
            Instr::Ret => write!(f, "ret"),
            Instr::ForLoop(a) => write!(f, "forloop {}", a),
            Instr::Add => write!(f, "add"),
            Instr::Sub => write!(f, "sub"),
            Instr::Mul => write!(f, "mul"),
            Instr::Div => write!(f, "div"),
            Instr::Mod => write!(f, "mod"),
            Instr::Pow => write!(f, "pow"),
            Instr::Neg => write!(f, "neg"),
            Instr::Eq => write!(f, "="),
            Instr::Ne => write!(f, "<>"),
            Instr::Lt => write!(f, "<"),
            Instr::Le => write!(f, "<="),
            Instr::Gt => write!(f, ">"),
            Instr::Ge => write!(f, ">="),
            Instr::And => write!(f, "and"),
            Instr::Or => write!(f, "or"),
            Instr::Not => write!(f, "not"),
            Instr::Assign => write!(f, "assign"),
            Instr::ArrayDeref { as_ref } => write!(f, "array_deref {}", u8::from(*as_ref)),
            Instr::MemberDeref(n) => write!(f, "member_deref {}", n),
            Instr::MemberValue(n) => write!(f, "member_value {}", n),
            Instr::Restore(i) => write!(f, "restore {}", i),
            Instr::Syscall(n) => write!(f, "syscall {}", n),
        }
    }
}

/// An instruction with the source position it was lowered from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub instr: Instr,
    pub locus: Locus,
}

/// A compiled program: instructions, user type table, shared-name set,
/// pooled DATA literals (`None` for empty entries), the default scalar
/// type for bare identifiers, and the test-mode flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    pub types: HashMap<String, RecordType>,
    pub shared: HashSet<String>,
    pub data: Vec<Option<Literal>>,
    pub default_type: ScalarKind,
    pub test_mode: bool,
}

impl Program {
    /// Serialize for exchange with an external host.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Program, bincode::Error> {
        bincode::deserialize(bytes)
    }

    /// Human-readable listing, one instruction per line.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        for (pc, ins) in self.instructions.iter().enumerate() {
            out.push_str(&format!("{:4}  {}\n", pc, ins.instr));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Program {
        Program {
            instructions: vec![
                Instruction {
                    instr: Instr::PushConst(Literal::Integer(1)),
                    locus: Locus::new(1, 7),
                },
                Instruction { instr: Instr::Syscall("print".to_string()), locus: Locus::new(1, 1) },
            ],
            types: HashMap::new(),
            shared: HashSet::new(),
            data: vec![Some(Literal::Integer(1)), None],
            default_type: ScalarKind::Single,
            test_mode: true,
        }
    }

    #[test]
    fn instructions_display_with_spec_opcode_names() {
        assert_eq!(Instr::PushConst(Literal::Str("HI".to_string())).to_string(), "pushconst \"HI\"");
        assert_eq!(Instr::ArrayDeref { as_ref: true }.to_string(), "array_deref 1");
        assert_eq!(Instr::ForLoop(9).to_string(), "forloop 9");
    }

    #[test]
    fn address_and_data_label_flags() {
        assert!(Instr::Jmp(0).is_addr_label());
        assert!(Instr::Gosub(0).is_addr_label());
        assert!(!Instr::Ret.is_addr_label());
        assert!(Instr::Restore(0).is_data_label());
        assert!(!Instr::Jmp(0).is_data_label());
    }

    #[test]
    fn programs_round_trip_through_bytes() {
        let p = sample();
        let q = Program::from_bytes(&p.to_bytes().unwrap()).unwrap();
        assert_eq!(p, q);
    }
}
