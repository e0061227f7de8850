//! The stack virtual machine.
//!
//! A dispatch loop over `instructions[pc]`. The operand stack holds
//! [`Value`]s (references included); the call stack holds frames whose
//! variable maps are `Rc`-shared for GOSUB and fresh for CALL. Names in
//! the program's shared set always resolve in the main frame.
//!
//! Execution modes follow the cooperative model:
//! - [`Vm::run`] executes to completion (tests, batch programs);
//!   a suspending syscall in this mode is a host-contract violation.
//! - [`Vm::tick`] executes a bounded quantum for a ~50 ms host scheduler
//!   tick and stops early on suspension.
//! - A suspending syscall parks a [`Waiting`] value; the host completes
//!   it with [`Vm::resume`] or [`Vm::provide_input`].
//!
//! Any error raised inside dispatch is decorated with the instruction's
//! locus, handed to the error hook, and suspends the machine.

use crate::devices::{Audio, Console, FileSystem, MemoryFileSystem, TestAudio, TestConsole};
use crate::error::{ErrorCode, RuntimeError};
use crate::format::parse_leading_number;
use crate::syscalls;
use basil_core::{
    Instr, Literal, Program, RecordType, ScalarKind, TypeDesc, Value, VarRef, Variable,
    new_scalar_cell,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Operand stack bound; exceeding it traps STACK_OVERFLOW.
pub const OPERAND_STACK_LIMIT: usize = 16 * 1024;
/// Call stack bound (recursion depth).
pub const CALL_STACK_LIMIT: usize = 512;
/// Instructions per scheduler tick unless the host asks otherwise.
pub const DEFAULT_QUANTUM: usize = 2048;

/// What a suspended VM is waiting for.
#[derive(Debug)]
pub enum Waiting {
    /// INPUT: a line of text for this target.
    Input { target: VarRef },
    /// SLEEP: a delay, or a key press when `seconds` is `None`.
    Sleep { seconds: Option<f64> },
    /// YIELD: the next animation frame.
    Frame,
    /// PLAY: the foreground piece finishing.
    Music,
    /// SPSET: sprite asset loading.
    Sprite,
}

/// Outcome of one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// pc ran off the end of the program.
    Halted,
    /// A syscall suspended the VM.
    Suspended,
    /// The quantum was exhausted; call again next tick.
    Budget,
}

/// One call-stack entry. GOSUB frames share the caller's variable map;
/// CALL frames get a fresh one.
pub(crate) struct Frame {
    pub return_pc: usize,
    pub vars: Rc<RefCell<HashMap<String, VarRef>>>,
}

type ErrorHook = Box<dyn FnMut(&RuntimeError)>;

pub struct Vm {
    pub(crate) program: Rc<Program>,
    record_types: HashMap<String, Rc<RecordType>>,

    stack: Vec<Value>,
    frames: Vec<Frame>,
    pub(crate) pc: usize,
    pub(crate) data_ptr: usize,

    suspended: bool,
    pub(crate) waiting: Option<Waiting>,

    pub(crate) rng: StdRng,
    pub(crate) last_random: f64,
    pub(crate) test_timer: f64,

    pub(crate) console: Box<dyn Console>,
    pub(crate) audio: Box<dyn Audio>,
    pub(crate) files: Box<dyn FileSystem>,
    /// BASIC channel number -> file system handle.
    pub(crate) channels: HashMap<i64, u32>,

    on_error: Option<ErrorHook>,
}

impl Vm {
    /// A VM over host-provided devices.
    pub fn new(
        program: Program,
        console: Box<dyn Console>,
        audio: Box<dyn Audio>,
        files: Box<dyn FileSystem>,
    ) -> Self {
        let mut vm = Vm {
            program: Rc::new(Program {
                instructions: Vec::new(),
                types: HashMap::new(),
                shared: Default::default(),
                data: Vec::new(),
                default_type: ScalarKind::Single,
                test_mode: false,
            }),
            record_types: HashMap::new(),
            stack: Vec::new(),
            frames: Vec::new(),
            pc: 0,
            data_ptr: 0,
            suspended: false,
            waiting: None,
            rng: StdRng::seed_from_u64(0),
            last_random: 0.0,
            test_timer: 0.0,
            console,
            audio,
            files,
            channels: HashMap::new(),
            on_error: None,
        };
        vm.reset(program);
        vm
    }

    /// A VM wired to the in-memory test devices.
    pub fn for_test(program: Program) -> (Self, TestConsole, TestAudio, MemoryFileSystem) {
        let console = TestConsole::new();
        let audio = TestAudio::new();
        let files = MemoryFileSystem::new();
        let vm = Vm::new(
            program,
            Box::new(console.clone()),
            Box::new(audio.clone()),
            Box::new(files.clone()),
        );
        (vm, console, audio, files)
    }

    /// Halt anything in flight and start the program over. The program
    /// object is stable across resets.
    pub fn reset(&mut self, program: Program) {
        self.record_types = program
            .types
            .iter()
            .map(|(name, ty)| (name.clone(), Rc::new(ty.clone())))
            .collect();
        let test_mode = program.test_mode;
        self.program = Rc::new(program);
        self.stack.clear();
        self.frames.clear();
        self.frames.push(Frame { return_pc: 0, vars: Rc::new(RefCell::new(HashMap::new())) });
        self.pc = 0;
        self.data_ptr = 0;
        self.suspended = false;
        self.waiting = None;
        self.channels.clear();
        self.rng = if test_mode {
            StdRng::seed_from_u64(0)
        } else {
            StdRng::seed_from_u64(rand::random())
        };
        self.last_random = self.rng.r#gen();
        self.test_timer = 0.0;
        self.console.reset(test_mode);
    }

    /// Register the error event hook.
    pub fn on_error(&mut self, hook: impl FnMut(&RuntimeError) + 'static) {
        self.on_error = Some(Box::new(hook));
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    /// Synchronous execution to the end of the program. Suspending
    /// syscalls must not occur in this mode; one raises IO_ERROR.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        while self.pc < self.program.instructions.len() {
            self.step()?;
            if self.suspended {
                let locus = self.current_locus();
                let mut err = RuntimeError::new(
                    ErrorCode::IoError,
                    "suspending syscall invoked in synchronous run",
                );
                err.locus = locus;
                self.fire_error(&err);
                return Err(err);
            }
        }
        Ok(())
    }

    /// One bounded scheduler quantum.
    pub fn tick(&mut self, quantum: usize) -> Result<Tick, RuntimeError> {
        if self.suspended {
            return Ok(Tick::Suspended);
        }
        for _ in 0..quantum {
            if self.pc >= self.program.instructions.len() {
                return Ok(Tick::Halted);
            }
            self.step()?;
            if self.suspended {
                return Ok(Tick::Suspended);
            }
        }
        if self.pc >= self.program.instructions.len() {
            return Ok(Tick::Halted);
        }
        Ok(Tick::Budget)
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn is_halted(&self) -> bool {
        self.pc >= self.program.instructions.len()
    }

    /// Complete the pending external operation (SLEEP, YIELD, PLAY,
    /// sprite load). For INPUT use [`Vm::provide_input`].
    pub fn resume(&mut self) {
        self.waiting = None;
        self.suspended = false;
    }

    /// Complete a pending INPUT with a line of text.
    pub fn provide_input(&mut self, line: &str) -> Result<(), RuntimeError> {
        match self.waiting.take() {
            Some(Waiting::Input { target }) => {
                self.assign_input(&target, line)?;
                self.suspended = false;
                Ok(())
            }
            other => {
                self.waiting = other;
                Err(RuntimeError::new(ErrorCode::IoError, "no INPUT is pending"))
            }
        }
    }

    /// Assign a host-supplied input line into an INPUT target, numeric
    /// targets via the VAL parse.
    pub(crate) fn assign_input(&mut self, target: &VarRef, line: &str) -> Result<(), RuntimeError> {
        let value = match target.slot_type().map_err(RuntimeError::from)? {
            TypeDesc::Scalar(ScalarKind::String) => Value::Str(line.to_string()),
            _ => Value::Double(parse_leading_number(line)),
        };
        target.write(&value).map_err(RuntimeError::from)
    }

    fn step(&mut self) -> Result<(), RuntimeError> {
        let program = Rc::clone(&self.program);
        let ins = &program.instructions[self.pc];
        self.pc += 1;
        match self.exec(&ins.instr) {
            Ok(()) => Ok(()),
            Err(mut err) => {
                err.locus = ins.locus;
                self.suspended = true;
                self.fire_error(&err);
                Err(err)
            }
        }
    }

    fn fire_error(&mut self, err: &RuntimeError) {
        tracing::debug!("runtime trap: {}", err);
        if let Some(hook) = &mut self.on_error {
            hook(err);
        }
    }

    fn current_locus(&self) -> basil_core::Locus {
        let idx = self.pc.saturating_sub(1);
        self.program
            .instructions
            .get(idx)
            .map(|i| i.locus)
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    fn exec(&mut self, instr: &Instr) -> Result<(), RuntimeError> {
        match instr {
            Instr::PushConst(lit) => self.push(lit.to_value()),
            Instr::PushRef(name) => {
                let r = self.resolve(name);
                self.push(Value::Ref(r))
            }
            Instr::PushValue(name) => {
                let r = self.resolve(name);
                let v = r.read()?;
                self.push(v)
            }
            Instr::PopVar(name) => {
                let v = self.pop()?;
                let r = match v {
                    Value::Ref(r) => r,
                    plain => {
                        let cell = self.cell_for_value(&plain)?;
                        let r = VarRef::whole(cell);
                        r.write(&plain)?;
                        r
                    }
                };
                self.bind(name, r);
                Ok(())
            }
            Instr::PopVal(name) => {
                let v = self.pop()?;
                let r = self.resolve(name);
                r.write(&v).map_err(RuntimeError::from)
            }
            Instr::Jmp(a) => {
                self.pc = *a;
                Ok(())
            }
            Instr::Bz(a) => {
                let v = self.pop_numeric()?;
                if v == 0.0 {
                    self.pc = *a;
                }
                Ok(())
            }
            Instr::Bnz(a) => {
                let v = self.pop_numeric()?;
                if v != 0.0 {
                    self.pc = *a;
                }
                Ok(())
            }
            Instr::Call(a) => {
                self.push_frame(Rc::new(RefCell::new(HashMap::new())))?;
                self.pc = *a;
                Ok(())
            }
            Instr::Gosub(a) => {
                // GOSUB shares the caller's variable map by reference.
                let vars = Rc::clone(&self.top_frame().vars);
                self.push_frame(vars)?;
                self.pc = *a;
                Ok(())
            }
            Instr::Ret => {
                if self.frames.len() <= 1 {
                    return Err(RuntimeError::new(
                        ErrorCode::StackUnderflow,
                        "RETURN without GOSUB or CALL",
                    ));
                }
                let frame = self.frames.pop().ok_or_else(|| {
                    RuntimeError::new(ErrorCode::StackUnderflow, "empty call stack")
                })?;
                self.pc = frame.return_pc;
                Ok(())
            }
            Instr::ForLoop(a) => self.exec_forloop(*a),

            Instr::Add => self.exec_add(),
            Instr::Sub => self.numeric_binop(|x, y| x - y),
            Instr::Mul => self.numeric_binop(|x, y| x * y),
            Instr::Div => {
                let rhs = self.pop_numeric()?;
                let lhs = self.pop_numeric()?;
                if rhs == 0.0 {
                    return Err(RuntimeError::new(ErrorCode::DivisionByZero, "division by zero"));
                }
                self.push(Value::Double(lhs / rhs))
            }
            Instr::Mod => {
                let rhs = self.pop_i64()?;
                let lhs = self.pop_i64()?;
                if rhs == 0 {
                    return Err(RuntimeError::new(ErrorCode::DivisionByZero, "division by zero"));
                }
                self.push(Value::Long(lhs % rhs))
            }
            Instr::Pow => {
                let rhs = self.pop_numeric()?;
                let lhs = self.pop_numeric()?;
                self.push(Value::Double(lhs.powf(rhs)))
            }
            Instr::Neg => {
                let v = self.pop()?;
                match v {
                    Value::Integer(n) => self.push(Value::Integer(-n)),
                    Value::Long(n) => self.push(Value::Long(-n)),
                    Value::Single(x) => self.push(Value::Single(-x)),
                    Value::Double(x) => self.push(Value::Double(-x)),
                    other => Err(self.type_error("numeric operand", &other)),
                }
            }

            Instr::Eq => self.compare(|o| o == std::cmp::Ordering::Equal, true),
            Instr::Ne => self.compare(|o| o != std::cmp::Ordering::Equal, true),
            Instr::Lt => self.compare(|o| o == std::cmp::Ordering::Less, false),
            Instr::Le => self.compare(|o| o != std::cmp::Ordering::Greater, false),
            Instr::Gt => self.compare(|o| o == std::cmp::Ordering::Greater, false),
            Instr::Ge => self.compare(|o| o != std::cmp::Ordering::Less, false),

            Instr::And => self.bitwise(|x, y| x & y),
            Instr::Or => self.bitwise(|x, y| x | y),
            Instr::Not => {
                let v = self.pop_i64()?;
                self.push(Value::Long(!v))
            }

            Instr::Assign => {
                let target = self.pop_ref()?;
                let value = self.pop()?;
                target.write(&value).map_err(RuntimeError::from)
            }
            Instr::ArrayDeref { as_ref } => self.exec_array_deref(*as_ref),
            Instr::MemberDeref(field) => {
                let r = self.member_ref(field)?;
                self.push(Value::Ref(r))
            }
            Instr::MemberValue(field) => {
                let r = self.member_ref(field)?;
                let v = r.read()?;
                self.push(v)
            }

            Instr::Restore(k) => {
                self.data_ptr = *k;
                Ok(())
            }
            Instr::Syscall(name) => syscalls::dispatch(self, name),
        }
    }

    /// `forloop end`: stack is (end, step, counter). The counter is
    /// always popped; on termination step and end go too and control
    /// transfers to `end`.
    fn exec_forloop(&mut self, end_addr: usize) -> Result<(), RuntimeError> {
        let counter = self.pop_numeric()?;
        let step = self.peek_numeric(0)?;
        let end = self.peek_numeric(1)?;
        if (step > 0.0 && counter > end) || (step < 0.0 && counter < end) {
            self.pop()?;
            self.pop()?;
            self.pc = end_addr;
        }
        Ok(())
    }

    fn exec_add(&mut self) -> Result<(), RuntimeError> {
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        match (&lhs, &rhs) {
            (Value::Str(a), Value::Str(b)) => {
                let mut s = a.clone();
                s.push_str(b);
                self.push(Value::Str(s))
            }
            _ => match (lhs.as_f64(), rhs.as_f64()) {
                (Some(_), Some(_)) => {
                    self.push_arith(&lhs, &rhs, |x, y| x + y)
                }
                _ => Err(self.type_error("matching operands for +", &rhs)),
            },
        }
    }

    fn numeric_binop(&mut self, op: impl Fn(f64, f64) -> f64) -> Result<(), RuntimeError> {
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        if lhs.as_f64().is_none() || rhs.as_f64().is_none() {
            return Err(self.type_error("numeric operands", &rhs));
        }
        self.push_arith(&lhs, &rhs, op)
    }

    /// Integer-pair operations stay integral; anything touching a float
    /// widens to DOUBLE.
    fn push_arith(
        &mut self,
        lhs: &Value,
        rhs: &Value,
        op: impl Fn(f64, f64) -> f64,
    ) -> Result<(), RuntimeError> {
        let integral = matches!(lhs, Value::Integer(_) | Value::Long(_))
            && matches!(rhs, Value::Integer(_) | Value::Long(_));
        let x = op(lhs.as_f64().unwrap_or(0.0), rhs.as_f64().unwrap_or(0.0));
        if integral && x.fract() == 0.0 && x.abs() < i64::MAX as f64 {
            self.push(Value::Long(x as i64))
        } else {
            self.push(Value::Double(x))
        }
    }

    /// Comparisons return the dialect's booleans: −1 true, 0 false.
    fn compare(
        &mut self,
        accept: impl Fn(std::cmp::Ordering) -> bool,
        equality: bool,
    ) -> Result<(), RuntimeError> {
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        let ordering = match (&lhs, &rhs) {
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            _ => match (lhs.as_f64(), rhs.as_f64()) {
                (Some(x), Some(y)) => {
                    x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal)
                }
                _ => {
                    let what = if equality { "comparable operands" } else { "ordered operands" };
                    return Err(self.type_error(what, &rhs));
                }
            },
        };
        self.push(Value::Integer(if accept(ordering) { -1 } else { 0 }))
    }

    fn bitwise(&mut self, op: impl Fn(i64, i64) -> i64) -> Result<(), RuntimeError> {
        let rhs = self.pop_i64()?;
        let lhs = self.pop_i64()?;
        self.push(Value::Long(op(lhs, rhs)))
    }

    fn exec_array_deref(&mut self, as_ref: bool) -> Result<(), RuntimeError> {
        let r = self.pop_ref()?;
        if !r.path.is_empty() {
            return Err(RuntimeError::new(
                ErrorCode::TypeMismatch,
                "array_deref expects a whole-array reference",
            ));
        }
        let ndims = match &*r.cell.borrow() {
            Variable::Array(a) => a.dims.len(),
            Variable::Scalar(s) => {
                return Err(RuntimeError::new(
                    ErrorCode::TypeMismatch,
                    format!("{} is not an array", s.ty),
                ));
            }
        };
        // Topmost pop is the rightmost index.
        let mut indices = Vec::with_capacity(ndims);
        for _ in 0..ndims {
            indices.push(self.pop_i64()?);
        }
        indices.reverse();
        let offset = match &*r.cell.borrow() {
            Variable::Array(a) => a.offset(&indices)?,
            Variable::Scalar(_) => unreachable!("checked above"),
        };
        let elem = VarRef::element(r.cell, offset);
        if as_ref {
            self.push(Value::Ref(elem))
        } else {
            let v = elem.read()?;
            self.push(v)
        }
    }

    fn member_ref(&mut self, field: &str) -> Result<VarRef, RuntimeError> {
        let r = self.pop_ref()?;
        let rt = match r.slot_type()? {
            TypeDesc::Record(rt) => rt,
            TypeDesc::Scalar(k) => {
                return Err(RuntimeError::new(
                    ErrorCode::TypeMismatch,
                    format!("{} has no members", k),
                ));
            }
        };
        let index = rt.field_index(field).ok_or_else(|| {
            RuntimeError::new(
                ErrorCode::TypeMismatch,
                format!("record {} has no member {}", rt.name, field),
            )
        })?;
        Ok(r.field(index))
    }

    // ------------------------------------------------------------------
    // Variables and frames
    // ------------------------------------------------------------------

    /// Resolve a name to its reference: the shared set binds in the main
    /// frame, everything else in the current frame; unbound names get a
    /// fresh scalar of the sigil-derived (or default) type.
    pub(crate) fn resolve(&mut self, name: &str) -> VarRef {
        let frame_idx =
            if self.program.shared.contains(name) { 0 } else { self.frames.len() - 1 };
        let vars = Rc::clone(&self.frames[frame_idx].vars);
        let mut map = vars.borrow_mut();
        if let Some(r) = map.get(name) {
            return r.clone();
        }
        let kind = ScalarKind::of_name(name).unwrap_or(self.program.default_type);
        let r = VarRef::whole(new_scalar_cell(TypeDesc::Scalar(kind)));
        map.insert(name.to_string(), r.clone());
        r
    }

    /// (Re)bind a name, honoring the shared set.
    pub(crate) fn bind(&mut self, name: &str, r: VarRef) {
        let frame_idx =
            if self.program.shared.contains(name) { 0 } else { self.frames.len() - 1 };
        self.frames[frame_idx].vars.borrow_mut().insert(name.to_string(), r);
    }

    /// A fresh cell shaped like the given plain value (used when a value
    /// rather than a reference reaches `popvar`).
    fn cell_for_value(&self, value: &Value) -> Result<basil_core::VarCell, RuntimeError> {
        let desc = match value {
            Value::Integer(_) => TypeDesc::Scalar(ScalarKind::Integer),
            Value::Long(_) => TypeDesc::Scalar(ScalarKind::Long),
            Value::Single(_) => TypeDesc::Scalar(ScalarKind::Single),
            Value::Double(_) => TypeDesc::Scalar(ScalarKind::Double),
            Value::Str(_) => TypeDesc::Scalar(ScalarKind::String),
            Value::Record(rv) => TypeDesc::Record(Rc::clone(&rv.ty)),
            Value::Ref(_) => {
                return Err(RuntimeError::new(
                    ErrorCode::TypeMismatch,
                    "nested reference on the stack",
                ));
            }
        };
        Ok(new_scalar_cell(desc))
    }

    fn top_frame(&self) -> &Frame {
        // The call stack is never empty: frame 0 is main.
        &self.frames[self.frames.len() - 1]
    }

    fn push_frame(
        &mut self,
        vars: Rc<RefCell<HashMap<String, VarRef>>>,
    ) -> Result<(), RuntimeError> {
        if self.frames.len() >= CALL_STACK_LIMIT {
            return Err(RuntimeError::new(ErrorCode::StackOverflow, "call stack overflow"));
        }
        self.frames.push(Frame { return_pc: self.pc, vars });
        Ok(())
    }

    /// Call stack depth; 1 means only the main frame is live.
    pub fn call_depth(&self) -> usize {
        self.frames.len()
    }

    /// Current DATA pointer (next READ offset).
    pub fn data_pointer(&self) -> usize {
        self.data_ptr
    }

    // ------------------------------------------------------------------
    // Operand stack access (also used by syscall handlers)
    // ------------------------------------------------------------------

    pub(crate) fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.stack.len() >= OPERAND_STACK_LIMIT {
            return Err(RuntimeError::new(ErrorCode::StackOverflow, "operand stack overflow"));
        }
        self.stack.push(value);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or_else(|| {
            RuntimeError::new(ErrorCode::StackUnderflow, "operand stack underflow")
        })
    }

    pub(crate) fn pop_numeric(&mut self) -> Result<f64, RuntimeError> {
        let v = self.pop()?;
        v.as_f64().ok_or_else(|| self.type_error("a number", &v))
    }

    pub(crate) fn pop_i64(&mut self) -> Result<i64, RuntimeError> {
        let v = self.pop()?;
        v.as_i64().ok_or_else(|| self.type_error("a number", &v))
    }

    pub(crate) fn pop_string(&mut self) -> Result<String, RuntimeError> {
        let v = self.pop()?;
        match v {
            Value::Str(s) => Ok(s),
            other => Err(self.type_error("a string", &other)),
        }
    }

    pub(crate) fn pop_ref(&mut self) -> Result<VarRef, RuntimeError> {
        let v = self.pop()?;
        match v {
            Value::Ref(r) => Ok(r),
            other => Err(self.type_error("a variable reference", &other)),
        }
    }

    fn peek_numeric(&self, depth: usize) -> Result<f64, RuntimeError> {
        let v = self
            .stack
            .len()
            .checked_sub(depth + 1)
            .and_then(|i| self.stack.get(i))
            .ok_or_else(|| {
                RuntimeError::new(ErrorCode::StackUnderflow, "operand stack underflow")
            })?;
        v.as_f64().ok_or_else(|| {
            RuntimeError::new(ErrorCode::TypeMismatch, "expected a number on the stack")
        })
    }

    /// Operand stack depth; 0 at halt for every well-formed program.
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Mark the VM suspended on an external operation.
    pub(crate) fn suspend(&mut self, waiting: Waiting) {
        self.waiting = Some(waiting);
        self.suspended = true;
    }

    /// Jump past the last instruction (SYSTEM, END).
    pub(crate) fn halt(&mut self) {
        self.pc = self.program.instructions.len();
    }

    pub(crate) fn record_type(&self, name: &str) -> Option<Rc<RecordType>> {
        self.record_types.get(name).cloned()
    }

    pub(crate) fn type_error(&self, expected: &str, found: &Value) -> RuntimeError {
        RuntimeError::new(
            ErrorCode::TypeMismatch,
            format!("expected {}, found {}", expected, found.type_name()),
        )
    }

    /// Next DATA literal; `None` marks an empty entry whose READ target
    /// keeps its default.
    pub(crate) fn next_data(&mut self) -> Result<Option<Literal>, RuntimeError> {
        if self.data_ptr >= self.program.data.len() {
            return Err(RuntimeError::new(ErrorCode::IoError, "out of DATA"));
        }
        let item = self.program.data[self.data_ptr].clone();
        self.data_ptr += 1;
        Ok(item)
    }
}
