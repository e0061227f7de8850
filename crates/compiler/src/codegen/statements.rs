//! Statement lowering.

use super::{CodeGen, StaticType};
use crate::ast::{DimDecl, Expr, FileMode, IfArm, LoopCond, PrintItem, Stmt, StmtKind};
use basil_core::{Instr, Literal, Locus, ScalarKind, syscall};

impl CodeGen {
    pub(crate) fn emit_stmt(&mut self, stmt: &Stmt) {
        let locus = stmt.locus;
        match &stmt.kind {
            StmtKind::Assign { target, value } => self.emit_assign(target, value, locus),
            StmtKind::Print { using, items } => self.emit_print(using.as_ref(), items, locus),
            StmtKind::Input { prompt, question, targets } => {
                self.emit_input(prompt.as_deref(), *question, targets, locus)
            }
            StmtKind::If { arms, alt } => self.emit_if(arms, alt),
            StmtKind::For { var, from, to, step, body, next_var } => {
                self.emit_for(var, from, to, step.as_ref(), body, next_var.as_deref(), locus)
            }
            StmtKind::While { cond, body } => self.emit_while(cond, body, locus),
            StmtKind::DoLoop { pre, post, body } => {
                self.emit_do_loop(pre.as_ref(), post.as_ref(), body, locus)
            }
            StmtKind::Goto(name) => self.emit_jump(name, false, locus),
            StmtKind::Gosub(name) => self.emit_jump(name, true, locus),
            StmtKind::Return => self.emit(Instr::Ret, locus),
            StmtKind::Call { name, args } => self.emit_call_stmt(name, args, locus),
            StmtKind::Dim { decls, .. } => self.emit_dim(decls),
            StmtKind::Read(targets) => self.emit_read(targets, locus),
            StmtKind::Restore(target) => self.emit_restore(target.as_deref(), locus),
            StmtKind::Open { path, mode, channel } => self.emit_open(path, *mode, channel, locus),
            StmtKind::Close { channel } => self.emit_close(channel.as_ref(), locus),
            StmtKind::WriteFile { channel, items } => self.emit_write(channel, items, locus),
            StmtKind::InputFile { channel, targets } => {
                self.emit_input_file(channel, targets, locus)
            }
            StmtKind::End => {
                let halt = self.halt_label();
                self.emit(Instr::Jmp(halt), locus);
            }
            // Handled by the declaration and data passes.
            StmtKind::Shared { .. }
            | StmtKind::TypeDef { .. }
            | StmtKind::Declare { .. }
            | StmtKind::Data(_)
            | StmtKind::OptionBase(_)
            | StmtKind::DefType(_) => {}
            // Top-level routine bodies are emitted separately; nested
            // ones were reported by the declaration pass.
            StmtKind::Sub(_) | StmtKind::Function(_) => {}
        }
    }

    fn emit_assign(&mut self, target: &Expr, value: &Expr, locus: Locus) {
        let value_ty = self.type_of(value);
        let target_ty = self.type_of(target);
        if matches!(
            (target_ty, value_ty),
            (StaticType::Num, StaticType::Str) | (StaticType::Str, StaticType::Num)
        ) {
            self.error("Type mismatch in assignment".to_string(), locus);
            return;
        }
        if !target.is_lvalue() {
            self.error("cannot assign to this expression".to_string(), locus);
            return;
        }
        self.emit_expr(value);
        match &target.kind {
            crate::ast::ExprKind::Var(name) => {
                self.emit(Instr::PopVal(name.clone()), locus);
            }
            _ => {
                self.emit_ref(target);
                self.emit(Instr::Assign, locus);
            }
        }
    }

    fn emit_print(&mut self, using: Option<&Expr>, items: &[PrintItem], locus: Locus) {
        if let Some(format) = using {
            if self.type_of(format) == StaticType::Num {
                self.error("PRINT USING format must be a string".to_string(), locus);
            }
            self.emit_expr(format);
            let mut count = 1;
            for item in items {
                match item {
                    PrintItem::Expr(e) => {
                        self.emit_expr(e);
                        count += 1;
                    }
                    PrintItem::Tab(_) => {
                        self.error("TAB is not valid in PRINT USING".to_string(), locus);
                    }
                    PrintItem::Comma | PrintItem::Semicolon => {}
                }
            }
            let terminator = match items.last() {
                Some(PrintItem::Comma) => ",",
                Some(PrintItem::Semicolon) => ";",
                _ => "",
            };
            self.emit(Instr::PushConst(Literal::Str(terminator.to_string())), locus);
            count += 1;
            self.emit(Instr::PushConst(Literal::Integer(count)), locus);
            self.emit(Instr::Syscall("print_using".to_string()), locus);
            return;
        }

        for (i, item) in items.iter().enumerate() {
            match item {
                PrintItem::Expr(e) => {
                    // Numeric items get a separating space from earlier
                    // values on the line; strings abut.
                    let follows_output =
                        items[..i].iter().any(|it| matches!(it, PrintItem::Expr(_)));
                    if follows_output && self.type_of(e) == StaticType::Num {
                        self.emit(Instr::PushConst(Literal::Str(" ".to_string())), locus);
                        self.emit(Instr::Syscall("print".to_string()), locus);
                    }
                    self.emit_expr(e);
                    self.emit(Instr::Syscall("print".to_string()), locus);
                }
                PrintItem::Tab(e) => {
                    self.emit_expr(e);
                    self.emit(Instr::Syscall("print_tab".to_string()), locus);
                }
                PrintItem::Comma => {
                    self.emit(Instr::Syscall("print_comma".to_string()), locus);
                }
                PrintItem::Semicolon => {}
            }
        }
        let suppress_newline =
            matches!(items.last(), Some(PrintItem::Comma) | Some(PrintItem::Semicolon));
        if !suppress_newline {
            self.emit(Instr::PushConst(Literal::Str("\n".to_string())), locus);
            self.emit(Instr::Syscall("print".to_string()), locus);
        }
    }

    fn emit_input(
        &mut self,
        prompt: Option<&str>,
        question: bool,
        targets: &[Expr],
        locus: Locus,
    ) {
        if let Some(p) = prompt {
            self.emit(Instr::PushConst(Literal::Str(p.to_string())), locus);
            self.emit(Instr::Syscall("print".to_string()), locus);
        }
        if question {
            self.emit(Instr::PushConst(Literal::Str("? ".to_string())), locus);
            self.emit(Instr::Syscall("print".to_string()), locus);
        }
        if targets.len() != 1 {
            self.error("INPUT reads a single variable".to_string(), locus);
            return;
        }
        self.emit_ref(&targets[0]);
        self.emit(Instr::Syscall("INPUT".to_string()), locus);
    }

    fn emit_if(&mut self, arms: &[IfArm], alt: &[Stmt]) {
        let end = self.new_label("(endif)");
        for arm in arms {
            let next = self.new_label("(elseif)");
            self.emit_expr(&arm.cond);
            self.emit(Instr::Bz(next), arm.cond.locus);
            for stmt in &arm.body {
                self.emit_stmt(stmt);
            }
            self.emit(Instr::Jmp(end), arm.cond.locus);
            self.place(next);
        }
        for stmt in alt {
            self.emit_stmt(stmt);
        }
        self.place(end);
    }

    /// FOR lowers onto the dedicated `forloop` instruction, which keeps
    /// (end, step) parked on the operand stack for the whole loop and
    /// pops the counter it inspects each iteration.
    #[allow(clippy::too_many_arguments)]
    fn emit_for(
        &mut self,
        var: &str,
        from: &Expr,
        to: &Expr,
        step: Option<&Expr>,
        body: &[Stmt],
        next_var: Option<&str>,
        locus: Locus,
    ) {
        if let Some(nv) = next_var {
            if nv != var {
                self.error(format!("NEXT {} does not match FOR {}", nv, var), locus);
            }
        }
        for bound in [Some(from), Some(to), step].into_iter().flatten() {
            if self.type_of(bound) == StaticType::Str {
                self.error("FOR bounds must be numeric".to_string(), bound.locus);
            }
        }
        let top = self.new_label("(for)");
        let end = self.new_label("(next)");

        self.emit_expr(to);
        match step {
            Some(s) => self.emit_expr(s),
            None => self.emit(Instr::PushConst(Literal::Integer(1)), locus),
        }
        self.emit_expr(from);
        self.emit(Instr::PopVal(var.to_string()), locus);

        self.place(top);
        self.emit(Instr::PushValue(var.to_string()), locus);
        self.emit(Instr::ForLoop(end), locus);
        for stmt in body {
            self.emit_stmt(stmt);
        }
        // NEXT: counter = counter + step, back to the test.
        self.emit(Instr::PushValue(var.to_string()), locus);
        match step {
            Some(s) => self.emit_expr(s),
            None => self.emit(Instr::PushConst(Literal::Integer(1)), locus),
        }
        self.emit(Instr::Add, locus);
        self.emit(Instr::PopVal(var.to_string()), locus);
        self.emit(Instr::Jmp(top), locus);
        self.place(end);
    }

    fn emit_while(&mut self, cond: &Expr, body: &[Stmt], locus: Locus) {
        let top = self.new_label("(while)");
        let end = self.new_label("(wend)");
        self.place(top);
        self.emit_expr(cond);
        self.emit(Instr::Bz(end), locus);
        for stmt in body {
            self.emit_stmt(stmt);
        }
        self.emit(Instr::Jmp(top), locus);
        self.place(end);
    }

    fn emit_do_loop(
        &mut self,
        pre: Option<&LoopCond>,
        post: Option<&LoopCond>,
        body: &[Stmt],
        locus: Locus,
    ) {
        let top = self.new_label("(do)");
        let end = self.new_label("(loop)");
        self.place(top);
        if let Some(cond) = pre {
            self.emit_expr(&cond.expr);
            let branch = if cond.until { Instr::Bnz(end) } else { Instr::Bz(end) };
            self.emit(branch, locus);
        }
        for stmt in body {
            self.emit_stmt(stmt);
        }
        match post {
            Some(cond) => {
                self.emit_expr(&cond.expr);
                let branch = if cond.until { Instr::Bz(top) } else { Instr::Bnz(top) };
                self.emit(branch, locus);
            }
            None => self.emit(Instr::Jmp(top), locus),
        }
        self.place(end);
    }

    fn emit_jump(&mut self, name: &str, is_gosub: bool, locus: Locus) {
        if !self.labels_defined.contains(name) {
            self.error(format!("undefined label {}", name), locus);
            return;
        }
        let label = self.named_label(name);
        let instr = if is_gosub { Instr::Gosub(label) } else { Instr::Jmp(label) };
        self.emit(instr, locus);
    }

    fn emit_call_stmt(&mut self, name: &str, args: &[Expr], locus: Locus) {
        if let Some(info) = self.routines.get(name).cloned() {
            if info.is_function {
                self.error(format!("FUNCTION {} used as a statement", name), locus);
                return;
            }
            if !info.defined {
                self.error(format!("SUB {} declared but never defined", name), locus);
                return;
            }
            self.check_user_call(&info, args, name, locus);
            for arg in args {
                self.emit_arg(arg);
            }
            self.emit(Instr::Call(info.label), locus);
            return;
        }
        if let Some(sig) = syscall::subroutine(name) {
            self.emit_syscall(sig, args, locus);
            return;
        }
        if syscall::function(name).is_some() {
            self.error(format!("FUNCTION {} used as a statement", name), locus);
            return;
        }
        if args.is_empty() && self.labels_defined.contains(name) {
            // A bare identifier naming no routine defines a label here.
            let label = self.named_label(name);
            self.place(label);
            return;
        }
        self.error(format!("undeclared subroutine {}", name), locus);
    }

    fn emit_dim(&mut self, decls: &[DimDecl]) {
        for decl in decls {
            let type_name = match &decl.as_type {
                Some(ty) => {
                    if ScalarKind::from_keyword(ty).is_none() && !self.types.contains_key(ty) {
                        self.error(format!("unknown type {}", ty), decl.locus);
                        continue;
                    }
                    ty.clone()
                }
                None => ScalarKind::of_name(&decl.name)
                    .unwrap_or(self.default_type)
                    .keyword()
                    .to_string(),
            };
            self.emit(Instr::PushConst(Literal::Str(decl.name.clone())), decl.locus);
            self.emit(Instr::PushConst(Literal::Str(type_name)), decl.locus);
            if decl.bounds.is_empty() {
                self.emit(Instr::Syscall("alloc_scalar".to_string()), decl.locus);
            } else {
                for (first, second) in &decl.bounds {
                    match second {
                        Some(upper) => {
                            self.emit_expr(first);
                            self.emit_expr(upper);
                        }
                        None => {
                            let base = Literal::Integer(self.option_base as i32);
                            self.emit(Instr::PushConst(base), decl.locus);
                            self.emit_expr(first);
                        }
                    }
                }
                let count = 2 + 2 * decl.bounds.len();
                self.emit(Instr::PushConst(Literal::Integer(count as i32)), decl.locus);
                self.emit(Instr::Syscall("alloc_array".to_string()), decl.locus);
            }
        }
    }

    fn emit_read(&mut self, targets: &[Expr], locus: Locus) {
        for target in targets {
            if !target.is_lvalue() {
                self.error("READ target must be a variable".to_string(), target.locus);
                return;
            }
            self.emit_ref(target);
        }
        self.emit(Instr::PushConst(Literal::Integer(targets.len() as i32)), locus);
        self.emit(Instr::Syscall("READ".to_string()), locus);
    }

    fn emit_restore(&mut self, target: Option<&str>, locus: Locus) {
        match target {
            None => self.emit(Instr::Restore(0), locus),
            Some(name) => match self.data_offset_of(name) {
                Some(offset) => self.emit(Instr::Restore(offset), locus),
                None => self.error(format!("undefined label {}", name), locus),
            },
        }
    }

    fn emit_open(&mut self, path: &Expr, mode: FileMode, channel: &Expr, locus: Locus) {
        if self.type_of(path) == StaticType::Num {
            self.error("OPEN path must be a string".to_string(), path.locus);
        }
        self.emit_expr(path);
        let mode_tag = match mode {
            FileMode::Input => "I",
            FileMode::Output => "O",
            FileMode::Append => "A",
        };
        self.emit(Instr::PushConst(Literal::Str(mode_tag.to_string())), locus);
        self.emit_expr(channel);
        self.emit(Instr::Syscall("open".to_string()), locus);
    }

    fn emit_close(&mut self, channel: Option<&Expr>, locus: Locus) {
        let count = match channel {
            Some(ch) => {
                self.emit_expr(ch);
                1
            }
            None => 0,
        };
        self.emit(Instr::PushConst(Literal::Integer(count)), locus);
        self.emit(Instr::Syscall("close".to_string()), locus);
    }

    fn emit_write(&mut self, channel: &Expr, items: &[Expr], locus: Locus) {
        self.emit_expr(channel);
        for item in items {
            self.emit_expr(item);
        }
        self.emit(Instr::PushConst(Literal::Integer(1 + items.len() as i32)), locus);
        self.emit(Instr::Syscall("write".to_string()), locus);
    }

    fn emit_input_file(&mut self, channel: &Expr, targets: &[Expr], locus: Locus) {
        self.emit_expr(channel);
        for target in targets {
            if !target.is_lvalue() {
                self.error("INPUT # target must be a variable".to_string(), target.locus);
                return;
            }
            self.emit_ref(target);
        }
        self.emit(Instr::PushConst(Literal::Integer(1 + targets.len() as i32)), locus);
        self.emit(Instr::Syscall("input_file".to_string()), locus);
    }
}
