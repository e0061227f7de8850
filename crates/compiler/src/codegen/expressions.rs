//! Expression lowering and static type derivation.
//!
//! Expressions compile post-order: operands first, operator instruction
//! last. Variable references resolve at this level: a name can mean a
//! local/shared variable, a DIM'd array, a user FUNCTION, or a system
//! function, in that order of precedence for the ambiguous `NAME(args)`
//! shape.

use super::{CodeGen, RoutineInfo, StaticType};
use crate::ast::{BinOp, Expr, ExprKind, Param, UnaryOp};
use basil_core::{ArgMode, ArgType, Instr, Literal, Locus, ScalarKind, SyscallSig, syscall};

impl CodeGen {
    pub(crate) fn emit_expr(&mut self, e: &Expr) {
        match &e.kind {
            ExprKind::Lit(lit) => self.emit(Instr::PushConst(lit.clone()), e.locus),
            ExprKind::Var(name) => {
                if let Some(info) = self.routines.get(name).cloned() {
                    if info.is_function {
                        self.emit_user_call(&info, &[], name, e.locus);
                        return;
                    }
                    self.error(format!("SUB {} used in an expression", name), e.locus);
                    return;
                }
                if let Some(sig) = syscall::function(name) {
                    self.emit_syscall(sig, &[], e.locus);
                    return;
                }
                self.emit(Instr::PushValue(name.clone()), e.locus);
            }
            ExprKind::Apply { name, args } => {
                if let Some(info) = self.routines.get(name).cloned() {
                    if info.is_function {
                        self.emit_user_call(&info, args, name, e.locus);
                    } else {
                        self.error(format!("SUB {} used in an expression", name), e.locus);
                    }
                    return;
                }
                if self.arrays.contains_key(name) {
                    self.emit_array_access(name, args, false, e.locus);
                    return;
                }
                if let Some(sig) = syscall::function(name) {
                    self.emit_syscall(sig, args, e.locus);
                    return;
                }
                self.error(format!("undeclared array or function {}", name), e.locus);
            }
            ExprKind::Member { base, field } => {
                self.emit_ref(base);
                self.emit(Instr::MemberValue(field.clone()), e.locus);
            }
            ExprKind::Unary { op, operand } => {
                if self.type_of(operand) == StaticType::Str {
                    self.error("Type mismatch: numeric operand expected".to_string(), e.locus);
                }
                self.emit_expr(operand);
                let instr = match op {
                    UnaryOp::Neg => Instr::Neg,
                    UnaryOp::Not => Instr::Not,
                };
                self.emit(instr, e.locus);
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.check_binary(*op, lhs, rhs, e.locus);
                self.emit_expr(lhs);
                self.emit_expr(rhs);
                let instr = match op {
                    BinOp::Add => Instr::Add,
                    BinOp::Sub => Instr::Sub,
                    BinOp::Mul => Instr::Mul,
                    BinOp::Div => Instr::Div,
                    BinOp::Mod => Instr::Mod,
                    BinOp::Pow => Instr::Pow,
                    BinOp::Eq => Instr::Eq,
                    BinOp::Ne => Instr::Ne,
                    BinOp::Lt => Instr::Lt,
                    BinOp::Le => Instr::Le,
                    BinOp::Gt => Instr::Gt,
                    BinOp::Ge => Instr::Ge,
                    BinOp::And => Instr::And,
                    BinOp::Or => Instr::Or,
                };
                self.emit(instr, e.locus);
            }
        }
    }

    /// Push a reference for an lvalue-shaped expression. Shapes that turn
    /// out to be function calls (or arbitrary expressions passed to a
    /// BYREF parameter) evaluate to a value instead; `popvar` boxes such
    /// values into fresh cells on the callee side.
    pub(crate) fn emit_ref(&mut self, e: &Expr) {
        match &e.kind {
            ExprKind::Var(name) => {
                let is_function = self
                    .routines
                    .get(name)
                    .map(|info| info.is_function)
                    .unwrap_or(false)
                    || syscall::function(name).is_some();
                if is_function {
                    self.emit_expr(e);
                } else {
                    self.emit(Instr::PushRef(name.clone()), e.locus);
                }
            }
            ExprKind::Apply { name, args } => {
                if self.arrays.contains_key(name) {
                    self.emit_array_access(name, args, true, e.locus);
                } else {
                    self.emit_expr(e);
                }
            }
            ExprKind::Member { base, field } => {
                self.emit_ref(base);
                self.emit(Instr::MemberDeref(field.clone()), e.locus);
            }
            _ => self.emit_expr(e),
        }
    }

    /// Argument to a user SUB/FUNCTION: BYREF when the shape allows it.
    pub(crate) fn emit_arg(&mut self, e: &Expr) {
        self.emit_ref(e);
    }

    fn emit_array_access(&mut self, name: &str, args: &[Expr], as_ref: bool, locus: Locus) {
        if let Some(info) = self.arrays.get(name).cloned() {
            if args.len() != info.ndims {
                self.error(
                    format!(
                        "wrong number of subscripts for {}: expected {}, got {}",
                        name,
                        info.ndims,
                        args.len()
                    ),
                    locus,
                );
                return;
            }
        }
        for index in args {
            if self.type_of(index) == StaticType::Str {
                self.error("array subscript must be numeric".to_string(), index.locus);
            }
            self.emit_expr(index);
        }
        self.emit(Instr::PushRef(name.to_string()), locus);
        self.emit(Instr::ArrayDeref { as_ref }, locus);
    }

    fn emit_user_call(&mut self, info: &RoutineInfo, args: &[Expr], name: &str, locus: Locus) {
        if !info.defined {
            self.error(format!("FUNCTION {} declared but never defined", name), locus);
            return;
        }
        self.check_user_call(info, args, name, locus);
        for arg in args {
            self.emit_arg(arg);
        }
        self.emit(Instr::Call(info.label), locus);
    }

    /// Arity and scalar-kind check for a user routine call.
    pub(crate) fn check_user_call(
        &mut self,
        info: &RoutineInfo,
        args: &[Expr],
        name: &str,
        locus: Locus,
    ) {
        if args.len() != info.params.len() {
            self.error(
                format!(
                    "wrong number of arguments to {}: expected {}, got {}",
                    name,
                    info.params.len(),
                    args.len()
                ),
                locus,
            );
            return;
        }
        for (arg, param) in args.iter().zip(&info.params) {
            let Some(kind) = self.param_kind(param) else { continue };
            let expected = StaticType::of_kind(kind);
            let found = self.type_of(arg);
            if matches!(
                (expected, found),
                (StaticType::Num, StaticType::Str) | (StaticType::Str, StaticType::Num)
            ) {
                self.error(
                    format!("type mismatch in argument {} to {}", param.name, name),
                    arg.locus,
                );
            }
        }
    }

    /// Emit a system routine call: typed arguments, by-ref positions,
    /// the actual-count push for variadic entries, then the syscall.
    pub(crate) fn emit_syscall(&mut self, sig: &'static SyscallSig, args: &[Expr], locus: Locus) {
        if !sig.accepts_count(args.len()) {
            self.error(
                format!(
                    "wrong number of arguments to {}: expected at least {}, got {}",
                    sig.name,
                    sig.min_args,
                    args.len()
                ),
                locus,
            );
            return;
        }
        for (i, arg) in args.iter().enumerate() {
            let Some(spec) = sig.arg_at(i) else { break };
            let found = self.type_of(arg);
            let ok = match spec.ty {
                ArgType::Any => true,
                ArgType::Numeric => found != StaticType::Str,
                ArgType::String => found != StaticType::Num,
            };
            if !ok {
                self.error(
                    format!("type mismatch in argument {} to {}", i + 1, sig.name),
                    arg.locus,
                );
            }
            match spec.mode {
                ArgMode::ByVal => self.emit_expr(arg),
                ArgMode::ByRef => {
                    if arg.is_lvalue() {
                        self.emit_ref(arg);
                    } else {
                        self.error(
                            format!("argument {} to {} must be a variable", i + 1, sig.name),
                            arg.locus,
                        );
                    }
                }
            }
        }
        if sig.is_variadic() {
            self.emit(Instr::PushConst(Literal::Integer(args.len() as i32)), locus);
        }
        self.emit(Instr::Syscall(sig.name.to_string()), locus);
    }

    // ------------------------------------------------------------------
    // Static types
    // ------------------------------------------------------------------

    pub(crate) fn type_of(&self, e: &Expr) -> StaticType {
        match &e.kind {
            ExprKind::Lit(lit) => StaticType::of_kind(lit.kind()),
            ExprKind::Var(name) => {
                if let Some(sig) = syscall::function(name) {
                    return sig.ret.map(StaticType::of_kind).unwrap_or(StaticType::Unknown);
                }
                self.name_type(name)
            }
            ExprKind::Apply { name, args: _ } => {
                if self.routines.get(name).map(|i| i.is_function).unwrap_or(false) {
                    return self.name_type(name);
                }
                if let Some(info) = self.arrays.get(name) {
                    return info.elem;
                }
                if let Some(sig) = syscall::function(name) {
                    return sig.ret.map(StaticType::of_kind).unwrap_or(StaticType::Unknown);
                }
                StaticType::Unknown
            }
            ExprKind::Member { base, field } => {
                // Field kinds are known when the base is a DIM'd record
                // variable or record array; anything else is checked at
                // runtime through the slot's own type.
                let record = match &base.kind {
                    ExprKind::Var(name) => self.record_vars.get(name).cloned(),
                    ExprKind::Apply { name, .. } => {
                        self.arrays.get(name).and_then(|info| info.record.clone())
                    }
                    _ => None,
                };
                record
                    .and_then(|rt| {
                        let rt = self.types.get(&rt)?;
                        let index = rt.field_index(field)?;
                        Some(StaticType::of_kind(rt.fields[index].kind))
                    })
                    .unwrap_or(StaticType::Unknown)
            }
            ExprKind::Unary { .. } => StaticType::Num,
            ExprKind::Binary { op, lhs, rhs } => match op {
                BinOp::Add => {
                    if self.type_of(lhs) == StaticType::Str
                        || self.type_of(rhs) == StaticType::Str
                    {
                        StaticType::Str
                    } else {
                        StaticType::Num
                    }
                }
                _ => StaticType::Num,
            },
        }
    }

    /// Sigil-derived type of a plain name, defaulting to the program's
    /// default scalar type.
    fn name_type(&self, name: &str) -> StaticType {
        StaticType::of_kind(ScalarKind::of_name(name).unwrap_or(self.default_type))
    }

    fn param_kind(&self, param: &Param) -> Option<ScalarKind> {
        match &param.as_type {
            Some(ty) => ScalarKind::from_keyword(ty),
            None => Some(ScalarKind::of_name(&param.name).unwrap_or(self.default_type)),
        }
    }

    fn check_binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr, locus: Locus) {
        let lt = self.type_of(lhs);
        let rt = self.type_of(rhs);
        match op {
            BinOp::Add => {
                // `+` concatenates strings but never mixes them with
                // numbers.
                if matches!(
                    (lt, rt),
                    (StaticType::Num, StaticType::Str) | (StaticType::Str, StaticType::Num)
                ) {
                    self.error("Type mismatch: cannot add string and number".to_string(), locus);
                }
            }
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                if matches!(
                    (lt, rt),
                    (StaticType::Num, StaticType::Str) | (StaticType::Str, StaticType::Num)
                ) {
                    self.error(
                        "Type mismatch: cannot compare string and number".to_string(),
                        locus,
                    );
                }
            }
            _ => {
                if lt == StaticType::Str || rt == StaticType::Str {
                    self.error("Type mismatch: numeric operands expected".to_string(), locus);
                }
            }
        }
    }
}
