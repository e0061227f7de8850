//! Bytecode generation.
//!
//! The code generator runs three passes over the parsed program:
//!
//! 1. **Declarations**: TYPE definitions, SUB/FUNCTION signatures,
//!    DECLAREs, DIM SHARED and SHARED names, DEF* defaults, OPTION BASE.
//! 2. **DATA and labels**: DATA literals are pooled in source order and
//!    every label records the pool offset current at its position, which
//!    is what RESTORE jumps to. Labels are bare-identifier statements
//!    that name neither a SUB nor a system subroutine.
//! 3. **Emission**: main statements, an implicit jump to the halt
//!    address, then every SUB/FUNCTION body behind its label. Branch
//!    targets are emitted as symbolic label ids; `link` substitutes
//!    final instruction indices and verifies every label was placed.
//!
//! System routine calls are type-checked against the signature tables in
//! `basil_core::syscall`; by-reference argument positions require lvalue
//! shapes and compile to `pushref`/`array_deref`/`member_deref`.
//!
//! # Module structure
//!
//! - `statements.rs`: statement lowering
//! - `expressions.rs`: expression lowering, lvalue references, static
//!   type derivation

mod expressions;
mod statements;

use crate::ast::{Param, Stmt, StmtKind, SubDef};
use crate::config::CompilerConfig;
use crate::error::CompileError;
use basil_core::{
    Instr, Instruction, Literal, Locus, Program, RecordField, RecordType, ScalarKind, syscall,
};
use std::collections::{HashMap, HashSet};

/// What the static checker knows about an expression's type. `Unknown`
/// suppresses checking (record members, ANY positions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StaticType {
    Num,
    Str,
    Unknown,
}

impl StaticType {
    pub(crate) fn of_kind(kind: ScalarKind) -> StaticType {
        if kind == ScalarKind::String { StaticType::Str } else { StaticType::Num }
    }
}

/// A SUB or FUNCTION known to the program.
#[derive(Debug, Clone)]
pub(crate) struct RoutineInfo {
    pub label: usize,
    pub params: Vec<Param>,
    pub is_function: bool,
    /// DECLARE seen but no body yet.
    pub defined: bool,
}

/// What DIM told us about an array.
#[derive(Debug, Clone)]
pub(crate) struct ArrayInfo {
    pub ndims: usize,
    pub elem: StaticType,
    /// Record type name when the element type is a user record.
    pub record: Option<String>,
}

pub struct CodeGen {
    pub(crate) default_type: ScalarKind,
    pub(crate) option_base: i64,
    test_mode: bool,

    pub(crate) instrs: Vec<Instruction>,
    /// Label id -> placed instruction index.
    label_addrs: Vec<Option<usize>>,
    label_names: HashMap<usize, String>,
    named_labels: HashMap<String, usize>,

    pub(crate) data: Vec<Option<Literal>>,
    data_offsets: HashMap<String, usize>,
    pub(crate) labels_defined: HashSet<String>,

    pub(crate) types: HashMap<String, RecordType>,
    pub(crate) shared: HashSet<String>,
    pub(crate) routines: HashMap<String, RoutineInfo>,
    pub(crate) arrays: HashMap<String, ArrayInfo>,
    /// Scalar variables DIM'd with a record type, by record name.
    pub(crate) record_vars: HashMap<String, String>,

    end_label: usize,
    pub(crate) errors: Vec<CompileError>,
}

impl CodeGen {
    pub fn new(config: &CompilerConfig) -> Self {
        let mut cg = CodeGen {
            default_type: config.default_type,
            option_base: i64::from(config.option_base),
            test_mode: config.test_mode,
            instrs: Vec::new(),
            label_addrs: Vec::new(),
            label_names: HashMap::new(),
            named_labels: HashMap::new(),
            data: Vec::new(),
            data_offsets: HashMap::new(),
            labels_defined: HashSet::new(),
            types: HashMap::new(),
            shared: HashSet::new(),
            routines: HashMap::new(),
            arrays: HashMap::new(),
            record_vars: HashMap::new(),
            end_label: 0,
            errors: Vec::new(),
        };
        cg.end_label = cg.new_label("(end)");
        cg
    }

    /// Lower a parsed program to bytecode.
    pub fn compile(mut self, stmts: &[Stmt]) -> Result<Program, Vec<CompileError>> {
        self.scan_declarations(stmts);
        self.scan_data_and_labels(stmts);

        let mut halt_locus = Locus::new(1, 1);
        for stmt in stmts {
            if !matches!(stmt.kind, StmtKind::Sub(_) | StmtKind::Function(_)) {
                self.emit_stmt(stmt);
            }
            halt_locus = stmt.locus;
        }
        self.emit(Instr::Jmp(self.end_label), halt_locus);

        for stmt in stmts {
            match &stmt.kind {
                StmtKind::Sub(def) => self.emit_routine(def, false, stmt.locus),
                StmtKind::Function(def) => self.emit_routine(def, true, stmt.locus),
                _ => {}
            }
        }
        self.place(self.end_label);

        self.link();

        if self.errors.is_empty() {
            Ok(Program {
                instructions: self.instrs,
                types: self.types,
                shared: self.shared,
                data: self.data,
                default_type: self.default_type,
                test_mode: self.test_mode,
            })
        } else {
            Err(self.errors)
        }
    }

    // ------------------------------------------------------------------
    // Pass 1: declarations
    // ------------------------------------------------------------------

    fn scan_declarations(&mut self, stmts: &[Stmt]) {
        // Top-level only: routine and type definitions.
        for stmt in stmts {
            match &stmt.kind {
                StmtKind::TypeDef { name, fields } => self.declare_type(name, fields, stmt.locus),
                StmtKind::Declare { is_function, name, params } => {
                    self.declare_routine(name, params.clone(), *is_function, false, stmt.locus);
                }
                StmtKind::Sub(def) => {
                    self.declare_routine(&def.name, def.params.clone(), false, true, stmt.locus);
                }
                StmtKind::Function(def) => {
                    self.declare_routine(&def.name, def.params.clone(), true, true, stmt.locus);
                }
                _ => {}
            }
        }
        // Everywhere, in source order: DIM shapes, SHARED names, defaults.
        walk(stmts, &mut |stmt| match &stmt.kind {
            StmtKind::Dim { shared, decls } => {
                for decl in decls {
                    if *shared {
                        self.shared.insert(decl.name.clone());
                    }
                    let record = decl
                        .as_type
                        .as_ref()
                        .filter(|ty| ScalarKind::from_keyword(ty).is_none())
                        .cloned();
                    if decl.bounds.is_empty() {
                        if let Some(rt) = record {
                            self.record_vars.insert(decl.name.clone(), rt);
                        }
                    } else {
                        let elem = self.dim_elem_type(decl);
                        let info = ArrayInfo { ndims: decl.bounds.len(), elem, record };
                        self.arrays.insert(decl.name.clone(), info);
                    }
                }
            }
            StmtKind::Shared { names } => {
                for name in names {
                    self.shared.insert(name.clone());
                }
            }
            StmtKind::DefType(kind) => self.default_type = *kind,
            StmtKind::OptionBase(base) => self.option_base = *base,
            StmtKind::Sub(_) | StmtKind::Function(_) => {}
            _ => {}
        });
        // Routine definitions are only legal at the top level.
        for stmt in stmts {
            nested_defs(&mut self.errors, &stmt.kind, stmt.locus);
        }
    }

    fn declare_type(&mut self, name: &str, fields: &[(String, String)], locus: Locus) {
        if self.types.contains_key(name) {
            self.error(format!("duplicate TYPE {}", name), locus);
            return;
        }
        let mut seen = HashSet::new();
        let mut record = RecordType { name: name.to_string(), fields: Vec::new() };
        for (field, ty) in fields {
            if !seen.insert(field.clone()) {
                self.error(format!("duplicate member {} in TYPE {}", field, name), locus);
                continue;
            }
            match ScalarKind::from_keyword(ty) {
                Some(kind) => {
                    record.fields.push(RecordField { name: field.clone(), kind });
                }
                None => {
                    self.error(
                        format!("unknown type {} for member {} in TYPE {}", ty, field, name),
                        locus,
                    );
                }
            }
        }
        self.types.insert(name.to_string(), record);
    }

    fn declare_routine(
        &mut self,
        name: &str,
        params: Vec<Param>,
        is_function: bool,
        defined: bool,
        locus: Locus,
    ) {
        if !self.routines.contains_key(name) {
            let label = self.new_label(name);
            self.routines
                .insert(name.to_string(), RoutineInfo { label, params, is_function, defined });
            return;
        }
        let mut duplicate = false;
        let mut kind_conflict = false;
        if let Some(existing) = self.routines.get_mut(name) {
            if existing.defined && defined {
                duplicate = true;
            } else {
                kind_conflict = existing.is_function != is_function;
                if defined {
                    existing.params = params;
                    existing.defined = true;
                }
            }
        }
        if duplicate {
            self.error(format!("duplicate definition of {}", name), locus);
        }
        if kind_conflict {
            self.error(format!("{} declared as both SUB and FUNCTION", name), locus);
        }
    }

    // ------------------------------------------------------------------
    // Pass 2: DATA pooling and label discovery
    // ------------------------------------------------------------------

    fn scan_data_and_labels(&mut self, stmts: &[Stmt]) {
        let mut duplicate_labels = Vec::new();
        walk(stmts, &mut |stmt| match &stmt.kind {
            StmtKind::Data(items) => self.data.extend(items.iter().cloned()),
            StmtKind::Call { name, args } if args.is_empty() => {
                let is_label = !self.routines.contains_key(name)
                    && syscall::subroutine(name).is_none()
                    && syscall::function(name).is_none();
                if is_label {
                    if self.labels_defined.insert(name.clone()) {
                        self.data_offsets.insert(name.clone(), self.data.len());
                    } else {
                        duplicate_labels.push((name.clone(), stmt.locus));
                    }
                }
            }
            _ => {}
        });
        for (name, locus) in duplicate_labels {
            self.error(format!("duplicate label {}", name), locus);
        }
    }

    // ------------------------------------------------------------------
    // Routine bodies
    // ------------------------------------------------------------------

    fn emit_routine(&mut self, def: &SubDef, is_function: bool, locus: Locus) {
        let label = match self.routines.get(&def.name) {
            Some(info) => info.label,
            None => return, // declaration pass already reported
        };
        self.place(label);
        // The caller pushed arguments left to right; bind them in
        // reverse. `popvar` aliases references (BYREF) and boxes plain
        // values into fresh cells.
        for param in def.params.iter().rev() {
            self.emit(Instr::PopVar(param.name.clone()), locus);
        }
        for stmt in &def.body {
            self.emit_stmt(stmt);
        }
        let end_locus = def.body.last().map(|s| s.locus).unwrap_or(locus);
        if is_function {
            // The function's value lives in a variable named after it.
            self.emit(Instr::PushValue(def.name.clone()), end_locus);
        }
        self.emit(Instr::Ret, end_locus);
    }

    // ------------------------------------------------------------------
    // Emission helpers
    // ------------------------------------------------------------------

    pub(crate) fn emit(&mut self, instr: Instr, locus: Locus) {
        self.instrs.push(Instruction { instr, locus });
    }

    pub(crate) fn new_label(&mut self, name: &str) -> usize {
        let id = self.label_addrs.len();
        self.label_addrs.push(None);
        self.label_names.insert(id, name.to_string());
        id
    }

    pub(crate) fn place(&mut self, label: usize) {
        self.label_addrs[label] = Some(self.instrs.len());
    }

    /// Label id for a user GOTO/GOSUB target or label definition.
    pub(crate) fn named_label(&mut self, name: &str) -> usize {
        if let Some(&id) = self.named_labels.get(name) {
            return id;
        }
        let id = self.new_label(name);
        self.named_labels.insert(name.to_string(), id);
        id
    }

    pub(crate) fn data_offset_of(&self, name: &str) -> Option<usize> {
        self.data_offsets.get(name).copied()
    }

    pub(crate) fn halt_label(&self) -> usize {
        self.end_label
    }

    pub(crate) fn error(&mut self, message: String, locus: Locus) {
        self.errors.push(CompileError::new(message, locus));
    }

    /// The element type a DIM declarator gives its array.
    fn dim_elem_type(&self, decl: &crate::ast::DimDecl) -> StaticType {
        match &decl.as_type {
            Some(ty) => match ScalarKind::from_keyword(ty) {
                Some(kind) => StaticType::of_kind(kind),
                None => StaticType::Unknown, // record array
            },
            None => StaticType::of_kind(
                ScalarKind::of_name(&decl.name).unwrap_or(self.default_type),
            ),
        }
    }

    // ------------------------------------------------------------------
    // Link pass: substitute label ids with instruction indices
    // ------------------------------------------------------------------

    fn link(&mut self) {
        let mut unresolved: Vec<(usize, Locus)> = Vec::new();
        for ins in &mut self.instrs {
            let target = match &mut ins.instr {
                Instr::Jmp(a)
                | Instr::Bz(a)
                | Instr::Bnz(a)
                | Instr::Call(a)
                | Instr::Gosub(a)
                | Instr::ForLoop(a) => a,
                _ => continue,
            };
            match self.label_addrs.get(*target).copied().flatten() {
                Some(pc) => *target = pc,
                None => unresolved.push((*target, ins.locus)),
            }
        }
        for (label, locus) in unresolved {
            let name = self
                .label_names
                .get(&label)
                .cloned()
                .unwrap_or_else(|| format!("#{}", label));
            self.error(format!("unresolved reference to {}", name), locus);
        }
        debug_assert!(
            self.instrs
                .iter()
                .filter(|i| i.instr.is_addr_label())
                .all(|i| match i.instr {
                    Instr::Jmp(a)
                    | Instr::Bz(a)
                    | Instr::Bnz(a)
                    | Instr::Call(a)
                    | Instr::Gosub(a)
                    | Instr::ForLoop(a) => a <= self.instrs.len(),
                    _ => true,
                })
                || !self.errors.is_empty()
        );
    }
}

/// Visit statements recursively in source order, bodies included.
fn walk<'a>(stmts: &'a [Stmt], visit: &mut impl FnMut(&'a Stmt)) {
    for stmt in stmts {
        visit(stmt);
        match &stmt.kind {
            StmtKind::If { arms, alt } => {
                for arm in arms {
                    walk(&arm.body, visit);
                }
                walk(alt, visit);
            }
            StmtKind::For { body, .. }
            | StmtKind::While { body, .. }
            | StmtKind::DoLoop { body, .. } => walk(body, visit),
            StmtKind::Sub(def) | StmtKind::Function(def) => walk(&def.body, visit),
            _ => {}
        }
    }
}

/// Report SUB/FUNCTION definitions nested inside other statements.
fn nested_defs(errors: &mut Vec<CompileError>, kind: &StmtKind, locus: Locus) {
    let check = |errors: &mut Vec<CompileError>, body: &[Stmt]| {
        walk(body, &mut |stmt| {
            if matches!(stmt.kind, StmtKind::Sub(_) | StmtKind::Function(_)) {
                errors.push(CompileError::new(
                    "SUB and FUNCTION definitions must be top-level".to_string(),
                    stmt.locus,
                ));
            }
        });
    };
    match kind {
        StmtKind::If { arms, alt } => {
            for arm in arms {
                check(errors, &arm.body);
            }
            check(errors, alt);
        }
        StmtKind::For { body, .. }
        | StmtKind::While { body, .. }
        | StmtKind::DoLoop { body, .. } => check(errors, body),
        StmtKind::Sub(def) | StmtKind::Function(def) => check(errors, &def.body),
        _ => {
            let _ = locus;
        }
    }
}
