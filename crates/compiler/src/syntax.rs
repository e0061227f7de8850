//! The Basil dialect grammar.
//!
//! Productions are declared in priority order: when the GLR parser packs
//! more than one derivation of a node, the earliest-declared rule wins.
//! That ordering carries the dialect's disambiguation decisions, e.g.
//! ELSE binding to the nearest single-line IF.
//!
//! Two shapes the grammar deliberately does NOT distinguish are settled
//! later by the code generator: `NAME(args)` (array access vs function
//! call) and a bare `NAME` statement (sub call vs label definition).

use crate::ast::{
    BinOp, DimDecl, Expr, ExprKind, FileMode, IfArm, LoopCond, Param, PrintItem, Stmt, StmtKind,
    SubDef, UnaryOp,
};
use crate::grammar::{RuleSet, SemanticValue, Sym};
use crate::tokenizer::Token;
use basil_core::{Literal, Locus, ScalarKind};

/// Semantic values flowing through the parse forest.
#[derive(Debug)]
pub enum SemValue {
    Empty,
    Tok(Token),
    Expr(Expr),
    Exprs(Vec<Expr>),
    Stmt(Stmt),
    Stmts(Vec<Stmt>),
    Item(PrintItem),
    Items(Vec<PrintItem>),
    Param(Param),
    Params(Vec<Param>),
    Dim(DimDecl),
    Dims(Vec<DimDecl>),
    Bound((Expr, Option<Expr>)),
    Bounds(Vec<(Expr, Option<Expr>)>),
    Field((String, String)),
    Fields(Vec<(String, String)>),
    Datum(Option<Literal>),
    Data(Vec<Option<Literal>>),
    Names(Vec<String>),
    TypeName(String),
    Mode(FileMode),
    IfTail { arms: Vec<IfArm>, alt: Vec<Stmt> },
    ForTail { body: Vec<Stmt>, next_var: Option<String> },
}

impl SemanticValue for SemValue {
    fn from_token(token: &Token) -> Self {
        SemValue::Tok(token.clone())
    }
    fn empty() -> Self {
        SemValue::Empty
    }
}

// ----------------------------------------------------------------------
// Extraction helpers. A mismatch here is a grammar bug; it surfaces as a
// parse error rather than a panic.
// ----------------------------------------------------------------------

fn take(children: &mut Vec<SemValue>, index: usize) -> SemValue {
    match children.get_mut(index) {
        Some(slot) => std::mem::replace(slot, SemValue::Empty),
        None => SemValue::Empty,
    }
}

fn tok(v: SemValue) -> Result<Token, String> {
    match v {
        SemValue::Tok(t) => Ok(t),
        other => Err(format!("grammar slot mismatch: expected token, got {:?}", other)),
    }
}

fn expr(v: SemValue) -> Result<Expr, String> {
    match v {
        SemValue::Expr(e) => Ok(e),
        other => Err(format!("grammar slot mismatch: expected expression, got {:?}", other)),
    }
}

fn exprs(v: SemValue) -> Result<Vec<Expr>, String> {
    match v {
        SemValue::Exprs(e) => Ok(e),
        other => Err(format!("grammar slot mismatch: expected expression list, got {:?}", other)),
    }
}

fn stmt(v: SemValue) -> Result<Stmt, String> {
    match v {
        SemValue::Stmt(s) => Ok(s),
        other => Err(format!("grammar slot mismatch: expected statement, got {:?}", other)),
    }
}

fn stmts(v: SemValue) -> Result<Vec<Stmt>, String> {
    match v {
        SemValue::Stmts(s) => Ok(s),
        other => Err(format!("grammar slot mismatch: expected statement list, got {:?}", other)),
    }
}

fn items(v: SemValue) -> Result<Vec<PrintItem>, String> {
    match v {
        SemValue::Items(i) => Ok(i),
        other => Err(format!("grammar slot mismatch: expected print list, got {:?}", other)),
    }
}

fn item(v: SemValue) -> Result<PrintItem, String> {
    match v {
        SemValue::Item(i) => Ok(i),
        other => Err(format!("grammar slot mismatch: expected print item, got {:?}", other)),
    }
}

fn params(v: SemValue) -> Result<Vec<Param>, String> {
    match v {
        SemValue::Params(p) => Ok(p),
        SemValue::Empty => Ok(Vec::new()),
        other => Err(format!("grammar slot mismatch: expected parameters, got {:?}", other)),
    }
}

fn type_name(v: SemValue) -> Result<String, String> {
    match v {
        SemValue::TypeName(t) => Ok(t),
        other => Err(format!("grammar slot mismatch: expected type name, got {:?}", other)),
    }
}

fn name(v: SemValue) -> Result<String, String> {
    tok(v).map(|t| canon(&t.text))
}

/// Identifier canonicalization: the dialect is case-insensitive.
fn canon(text: &str) -> String {
    text.to_ascii_uppercase()
}

fn number_literal(text: &str, float: bool) -> Result<Literal, String> {
    if float {
        let x: f32 =
            text.parse().map_err(|_| format!("invalid numeric literal '{}'", text))?;
        Ok(Literal::Single(x))
    } else {
        let n: i64 = text.parse().map_err(|_| format!("invalid integer literal '{}'", text))?;
        if let Ok(small) = i32::try_from(n) {
            Ok(Literal::Integer(small))
        } else {
            Ok(Literal::Long(n))
        }
    }
}

fn t(name: &'static str) -> Sym {
    Sym::T(name)
}

fn n(name: &'static str) -> Sym {
    Sym::N(name)
}

fn binary(op: BinOp) -> impl Fn(Vec<SemValue>, Locus) -> Result<SemValue, String> {
    move |mut c, loc| {
        let lhs = expr(take(&mut c, 0))?;
        let rhs = expr(take(&mut c, 2))?;
        Ok(SemValue::Expr(Expr::new(
            ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) },
            loc,
        )))
    }
}

/// Build the dialect grammar. The start symbol is `program`; its value is
/// the statement list of the whole compilation unit.
pub fn grammar() -> RuleSet<SemValue> {
    let mut g = RuleSet::<SemValue>::builder();

    // ------------------------------------------------------------------
    // Program structure: statements separated by `:` or newlines.
    // ------------------------------------------------------------------
    g.act("program", vec![n("opt_sep"), n("stmt_seq"), n("opt_sep")], |mut c, _| {
        Ok(take(&mut c, 1))
    });
    g.act("program", vec![n("opt_sep")], |_, _| Ok(SemValue::Stmts(Vec::new())));

    g.add("opt_sep", vec![]);
    g.add("opt_sep", vec![n("sep")]);
    g.add("sep", vec![t(":")]);
    g.add("sep", vec![t("newline")]);
    g.add("sep", vec![n("sep"), t(":")]);
    g.add("sep", vec![n("sep"), t("newline")]);

    g.act("stmt_seq", vec![n("statement")], |mut c, _| {
        Ok(SemValue::Stmts(vec![stmt(take(&mut c, 0))?]))
    });
    g.act("stmt_seq", vec![n("stmt_seq"), n("sep"), n("statement")], |mut c, _| {
        let mut list = stmts(take(&mut c, 0))?;
        list.push(stmt(take(&mut c, 2))?);
        Ok(SemValue::Stmts(list))
    });

    // A block body: the separated statements between a block head and its
    // terminator. Shared by IF/DO/WHILE/SUB/FUNCTION.
    g.act("block_body", vec![n("sep")], |_, _| Ok(SemValue::Stmts(Vec::new())));
    g.act("block_body", vec![n("sep"), n("stmt_seq"), n("sep")], |mut c, _| {
        Ok(take(&mut c, 1))
    });

    // Statements on one line, `:`-separated (single-line IF bodies).
    g.act("line_stmts", vec![n("statement")], |mut c, _| {
        Ok(SemValue::Stmts(vec![stmt(take(&mut c, 0))?]))
    });
    g.act("line_stmts", vec![n("line_stmts"), t(":"), n("statement")], |mut c, _| {
        let mut list = stmts(take(&mut c, 0))?;
        list.push(stmt(take(&mut c, 2))?);
        Ok(SemValue::Stmts(list))
    });

    // ------------------------------------------------------------------
    // Statement alternatives (declaration order = disambiguation order).
    // ------------------------------------------------------------------
    for alt in [
        "assign_stmt",
        "let_stmt",
        "print_stmt",
        "if_stmt",
        "for_stmt",
        "while_stmt",
        "do_stmt",
        "goto_stmt",
        "gosub_stmt",
        "return_stmt",
        "dim_stmt",
        "shared_stmt",
        "type_stmt",
        "declare_stmt",
        "sub_stmt",
        "function_stmt",
        "data_stmt",
        "read_stmt",
        "restore_stmt",
        "input_file_stmt",
        "input_stmt",
        "open_stmt",
        "close_stmt",
        "write_stmt",
        "end_stmt",
        "option_stmt",
        "deftype_stmt",
        "call_stmt",
    ] {
        g.add("statement", vec![n(alt)]);
    }

    // ------------------------------------------------------------------
    // Assignment and variables
    // ------------------------------------------------------------------
    g.act("assign_stmt", vec![n("variable"), t("="), n("expr")], |mut c, loc| {
        let target = expr(take(&mut c, 0))?;
        let value = expr(take(&mut c, 2))?;
        Ok(SemValue::Stmt(Stmt::new(StmtKind::Assign { target, value }, loc)))
    });
    g.act("let_stmt", vec![t("LET"), n("variable"), t("="), n("expr")], |mut c, loc| {
        let target = expr(take(&mut c, 1))?;
        let value = expr(take(&mut c, 3))?;
        Ok(SemValue::Stmt(Stmt::new(StmtKind::Assign { target, value }, loc)))
    });

    g.act("variable", vec![t("identifier")], |mut c, loc| {
        let id = name(take(&mut c, 0))?;
        Ok(SemValue::Expr(Expr::new(ExprKind::Var(id), loc)))
    });
    g.act("variable", vec![t("identifier"), t("("), n("expr_list"), t(")")], |mut c, loc| {
        let id = name(take(&mut c, 0))?;
        let args = exprs(take(&mut c, 2))?;
        Ok(SemValue::Expr(Expr::new(ExprKind::Apply { name: id, args }, loc)))
    });
    g.act("variable", vec![n("variable"), t("."), t("identifier")], |mut c, loc| {
        let base = expr(take(&mut c, 0))?;
        let field = name(take(&mut c, 2))?;
        Ok(SemValue::Expr(Expr::new(ExprKind::Member { base: Box::new(base), field }, loc)))
    });

    // ------------------------------------------------------------------
    // Expressions, lowest precedence first
    // ------------------------------------------------------------------
    g.add("expr", vec![n("or_expr")]);

    g.act("or_expr", vec![n("or_expr"), t("OR"), n("and_expr")], binary(BinOp::Or));
    g.add("or_expr", vec![n("and_expr")]);

    g.act("and_expr", vec![n("and_expr"), t("AND"), n("not_expr")], binary(BinOp::And));
    g.add("and_expr", vec![n("not_expr")]);

    g.act("not_expr", vec![t("NOT"), n("not_expr")], |mut c, loc| {
        let operand = expr(take(&mut c, 1))?;
        Ok(SemValue::Expr(Expr::new(
            ExprKind::Unary { op: UnaryOp::Not, operand: Box::new(operand) },
            loc,
        )))
    });
    g.add("not_expr", vec![n("rel_expr")]);

    g.act("rel_expr", vec![n("rel_expr"), n("relop"), n("add_expr")], |mut c, loc| {
        let lhs = expr(take(&mut c, 0))?;
        let op_tok = tok(take(&mut c, 1))?;
        let rhs = expr(take(&mut c, 2))?;
        let op = match op_tok.id {
            "=" => BinOp::Eq,
            "<>" => BinOp::Ne,
            "<" => BinOp::Lt,
            "<=" => BinOp::Le,
            ">" => BinOp::Gt,
            ">=" => BinOp::Ge,
            other => return Err(format!("unexpected relational operator '{}'", other)),
        };
        Ok(SemValue::Expr(Expr::new(
            ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) },
            loc,
        )))
    });
    g.add("rel_expr", vec![n("add_expr")]);
    for op in ["=", "<>", "<", "<=", ">", ">="] {
        g.add("relop", vec![t(op)]);
    }

    g.act("add_expr", vec![n("add_expr"), t("+"), n("mul_expr")], binary(BinOp::Add));
    g.act("add_expr", vec![n("add_expr"), t("-"), n("mul_expr")], binary(BinOp::Sub));
    g.add("add_expr", vec![n("mul_expr")]);

    g.act("mul_expr", vec![n("mul_expr"), t("*"), n("unary_expr")], binary(BinOp::Mul));
    g.act("mul_expr", vec![n("mul_expr"), t("/"), n("unary_expr")], binary(BinOp::Div));
    g.act("mul_expr", vec![n("mul_expr"), t("MOD"), n("unary_expr")], binary(BinOp::Mod));
    g.add("mul_expr", vec![n("unary_expr")]);

    g.act("unary_expr", vec![t("-"), n("unary_expr")], |mut c, loc| {
        let operand = expr(take(&mut c, 1))?;
        Ok(SemValue::Expr(Expr::new(
            ExprKind::Unary { op: UnaryOp::Neg, operand: Box::new(operand) },
            loc,
        )))
    });
    g.add("unary_expr", vec![n("pow_expr")]);

    g.act("pow_expr", vec![n("pow_expr"), t("^"), n("primary")], binary(BinOp::Pow));
    g.add("pow_expr", vec![n("primary")]);

    g.add("primary", vec![n("variable")]);
    g.add("primary", vec![n("number")]);
    g.act("primary", vec![t("string")], |mut c, loc| {
        let s = tok(take(&mut c, 0))?;
        Ok(SemValue::Expr(Expr::new(ExprKind::Lit(Literal::Str(s.text)), loc)))
    });
    g.act("primary", vec![t("("), n("expr"), t(")")], |mut c, _| Ok(take(&mut c, 1)));

    g.act("number", vec![t("integer")], |mut c, loc| {
        let num = tok(take(&mut c, 0))?;
        Ok(SemValue::Expr(Expr::new(ExprKind::Lit(number_literal(&num.text, false)?), loc)))
    });
    g.act("number", vec![t("float")], |mut c, loc| {
        let num = tok(take(&mut c, 0))?;
        Ok(SemValue::Expr(Expr::new(ExprKind::Lit(number_literal(&num.text, true)?), loc)))
    });

    g.act("expr_list", vec![n("expr")], |mut c, _| {
        Ok(SemValue::Exprs(vec![expr(take(&mut c, 0))?]))
    });
    g.act("expr_list", vec![n("expr_list"), t(","), n("expr")], |mut c, _| {
        let mut list = exprs(take(&mut c, 0))?;
        list.push(expr(take(&mut c, 2))?);
        Ok(SemValue::Exprs(list))
    });

    // ------------------------------------------------------------------
    // PRINT
    // ------------------------------------------------------------------
    g.act("print_stmt", vec![t("PRINT")], |_, loc| {
        Ok(SemValue::Stmt(Stmt::new(StmtKind::Print { using: None, items: Vec::new() }, loc)))
    });
    g.act("print_stmt", vec![t("PRINT"), n("print_list")], |mut c, loc| {
        let list = items(take(&mut c, 1))?;
        Ok(SemValue::Stmt(Stmt::new(StmtKind::Print { using: None, items: list }, loc)))
    });
    g.act(
        "print_stmt",
        vec![t("PRINT"), t("USING"), n("expr"), t(";"), n("print_list")],
        |mut c, loc| {
            let format = expr(take(&mut c, 2))?;
            let list = items(take(&mut c, 4))?;
            Ok(SemValue::Stmt(Stmt::new(
                StmtKind::Print { using: Some(format), items: list },
                loc,
            )))
        },
    );

    g.act("print_list", vec![n("print_term")], |mut c, _| {
        Ok(SemValue::Items(vec![item(take(&mut c, 0))?]))
    });
    g.act("print_list", vec![n("print_sep")], |mut c, _| {
        Ok(SemValue::Items(vec![item(take(&mut c, 0))?]))
    });
    g.act("print_list", vec![n("print_list"), n("print_sep"), n("print_term")], |mut c, _| {
        let mut list = items(take(&mut c, 0))?;
        list.push(item(take(&mut c, 1))?);
        list.push(item(take(&mut c, 2))?);
        Ok(SemValue::Items(list))
    });
    g.act("print_list", vec![n("print_list"), n("print_sep")], |mut c, _| {
        let mut list = items(take(&mut c, 0))?;
        list.push(item(take(&mut c, 1))?);
        Ok(SemValue::Items(list))
    });

    g.act("print_term", vec![n("expr")], |mut c, _| {
        Ok(SemValue::Item(PrintItem::Expr(expr(take(&mut c, 0))?)))
    });
    g.act("print_term", vec![t("TAB"), t("("), n("expr"), t(")")], |mut c, _| {
        Ok(SemValue::Item(PrintItem::Tab(expr(take(&mut c, 2))?)))
    });
    g.act("print_sep", vec![t(",")], |_, _| Ok(SemValue::Item(PrintItem::Comma)));
    g.act("print_sep", vec![t(";")], |_, _| Ok(SemValue::Item(PrintItem::Semicolon)));

    // ------------------------------------------------------------------
    // IF: single-line forms first (ELSE binds to the nearest IF), then
    // the block form with ELSEIF chains.
    // ------------------------------------------------------------------
    g.act("if_stmt", vec![t("IF"), n("expr"), t("THEN"), n("line_stmts")], |mut c, loc| {
        let cond = expr(take(&mut c, 1))?;
        let body = stmts(take(&mut c, 3))?;
        Ok(SemValue::Stmt(Stmt::new(
            StmtKind::If { arms: vec![IfArm { cond, body }], alt: Vec::new() },
            loc,
        )))
    });
    g.act(
        "if_stmt",
        vec![t("IF"), n("expr"), t("THEN"), n("line_stmts"), t("ELSE"), n("line_stmts")],
        |mut c, loc| {
            let cond = expr(take(&mut c, 1))?;
            let body = stmts(take(&mut c, 3))?;
            let alt = stmts(take(&mut c, 5))?;
            Ok(SemValue::Stmt(Stmt::new(
                StmtKind::If { arms: vec![IfArm { cond, body }], alt },
                loc,
            )))
        },
    );
    g.act(
        "if_stmt",
        vec![t("IF"), n("expr"), t("THEN"), n("block_body"), n("if_tail")],
        |mut c, loc| {
            let cond = expr(take(&mut c, 1))?;
            let body = stmts(take(&mut c, 3))?;
            match take(&mut c, 4) {
                SemValue::IfTail { mut arms, alt } => {
                    arms.insert(0, IfArm { cond, body });
                    Ok(SemValue::Stmt(Stmt::new(StmtKind::If { arms, alt }, loc)))
                }
                other => Err(format!("grammar slot mismatch: expected IF tail, got {:?}", other)),
            }
        },
    );

    g.act("if_tail", vec![t("END"), t("IF")], |_, _| {
        Ok(SemValue::IfTail { arms: Vec::new(), alt: Vec::new() })
    });
    g.act("if_tail", vec![t("ELSE"), n("block_body"), t("END"), t("IF")], |mut c, _| {
        Ok(SemValue::IfTail { arms: Vec::new(), alt: stmts(take(&mut c, 1))? })
    });
    g.act(
        "if_tail",
        vec![t("ELSEIF"), n("expr"), t("THEN"), n("block_body"), n("if_tail")],
        |mut c, _| {
            let cond = expr(take(&mut c, 1))?;
            let body = stmts(take(&mut c, 3))?;
            match take(&mut c, 4) {
                SemValue::IfTail { mut arms, alt } => {
                    arms.insert(0, IfArm { cond, body });
                    Ok(SemValue::IfTail { arms, alt })
                }
                other => Err(format!("grammar slot mismatch: expected IF tail, got {:?}", other)),
            }
        },
    );

    // ------------------------------------------------------------------
    // Loops
    // ------------------------------------------------------------------
    g.act(
        "for_stmt",
        vec![t("FOR"), t("identifier"), t("="), n("expr"), t("TO"), n("expr"), n("for_body")],
        |mut c, loc| {
            let var = name(take(&mut c, 1))?;
            let from = expr(take(&mut c, 3))?;
            let to = expr(take(&mut c, 5))?;
            match take(&mut c, 6) {
                SemValue::ForTail { body, next_var } => Ok(SemValue::Stmt(Stmt::new(
                    StmtKind::For { var, from, to, step: None, body, next_var },
                    loc,
                ))),
                other => Err(format!("grammar slot mismatch: expected FOR tail, got {:?}", other)),
            }
        },
    );
    g.act(
        "for_stmt",
        vec![
            t("FOR"),
            t("identifier"),
            t("="),
            n("expr"),
            t("TO"),
            n("expr"),
            t("STEP"),
            n("expr"),
            n("for_body"),
        ],
        |mut c, loc| {
            let var = name(take(&mut c, 1))?;
            let from = expr(take(&mut c, 3))?;
            let to = expr(take(&mut c, 5))?;
            let step = expr(take(&mut c, 7))?;
            match take(&mut c, 8) {
                SemValue::ForTail { body, next_var } => Ok(SemValue::Stmt(Stmt::new(
                    StmtKind::For { var, from, to, step: Some(step), body, next_var },
                    loc,
                ))),
                other => Err(format!("grammar slot mismatch: expected FOR tail, got {:?}", other)),
            }
        },
    );

    g.act("for_body", vec![n("sep"), t("NEXT")], |_, _| {
        Ok(SemValue::ForTail { body: Vec::new(), next_var: None })
    });
    g.act("for_body", vec![n("sep"), t("NEXT"), t("identifier")], |mut c, _| {
        Ok(SemValue::ForTail { body: Vec::new(), next_var: Some(name(take(&mut c, 2))?) })
    });
    g.act("for_body", vec![n("sep"), n("stmt_seq"), n("sep"), t("NEXT")], |mut c, _| {
        Ok(SemValue::ForTail { body: stmts(take(&mut c, 1))?, next_var: None })
    });
    g.act(
        "for_body",
        vec![n("sep"), n("stmt_seq"), n("sep"), t("NEXT"), t("identifier")],
        |mut c, _| {
            Ok(SemValue::ForTail {
                body: stmts(take(&mut c, 1))?,
                next_var: Some(name(take(&mut c, 4))?),
            })
        },
    );

    g.act("while_stmt", vec![t("WHILE"), n("expr"), n("block_body"), t("WEND")], |mut c, loc| {
        let cond = expr(take(&mut c, 1))?;
        let body = stmts(take(&mut c, 2))?;
        Ok(SemValue::Stmt(Stmt::new(StmtKind::While { cond, body }, loc)))
    });

    g.act("do_stmt", vec![t("DO"), n("block_body"), t("LOOP")], |mut c, loc| {
        let body = stmts(take(&mut c, 1))?;
        Ok(SemValue::Stmt(Stmt::new(StmtKind::DoLoop { pre: None, post: None, body }, loc)))
    });
    g.act(
        "do_stmt",
        vec![t("DO"), n("block_body"), t("LOOP"), t("WHILE"), n("expr")],
        |mut c, loc| {
            let body = stmts(take(&mut c, 1))?;
            let cond = expr(take(&mut c, 4))?;
            Ok(SemValue::Stmt(Stmt::new(
                StmtKind::DoLoop {
                    pre: None,
                    post: Some(LoopCond { until: false, expr: cond }),
                    body,
                },
                loc,
            )))
        },
    );
    g.act(
        "do_stmt",
        vec![t("DO"), n("block_body"), t("LOOP"), t("UNTIL"), n("expr")],
        |mut c, loc| {
            let body = stmts(take(&mut c, 1))?;
            let cond = expr(take(&mut c, 4))?;
            Ok(SemValue::Stmt(Stmt::new(
                StmtKind::DoLoop {
                    pre: None,
                    post: Some(LoopCond { until: true, expr: cond }),
                    body,
                },
                loc,
            )))
        },
    );
    g.act(
        "do_stmt",
        vec![t("DO"), t("WHILE"), n("expr"), n("block_body"), t("LOOP")],
        |mut c, loc| {
            let cond = expr(take(&mut c, 2))?;
            let body = stmts(take(&mut c, 3))?;
            Ok(SemValue::Stmt(Stmt::new(
                StmtKind::DoLoop {
                    pre: Some(LoopCond { until: false, expr: cond }),
                    post: None,
                    body,
                },
                loc,
            )))
        },
    );
    g.act(
        "do_stmt",
        vec![t("DO"), t("UNTIL"), n("expr"), n("block_body"), t("LOOP")],
        |mut c, loc| {
            let cond = expr(take(&mut c, 2))?;
            let body = stmts(take(&mut c, 3))?;
            Ok(SemValue::Stmt(Stmt::new(
                StmtKind::DoLoop {
                    pre: Some(LoopCond { until: true, expr: cond }),
                    post: None,
                    body,
                },
                loc,
            )))
        },
    );

    // ------------------------------------------------------------------
    // Jumps
    // ------------------------------------------------------------------
    g.act("goto_stmt", vec![t("GOTO"), t("identifier")], |mut c, loc| {
        Ok(SemValue::Stmt(Stmt::new(StmtKind::Goto(name(take(&mut c, 1))?), loc)))
    });
    g.act("gosub_stmt", vec![t("GOSUB"), t("identifier")], |mut c, loc| {
        Ok(SemValue::Stmt(Stmt::new(StmtKind::Gosub(name(take(&mut c, 1))?), loc)))
    });
    g.act("return_stmt", vec![t("RETURN")], |_, loc| {
        Ok(SemValue::Stmt(Stmt::new(StmtKind::Return, loc)))
    });
    g.act("end_stmt", vec![t("END")], |_, loc| {
        Ok(SemValue::Stmt(Stmt::new(StmtKind::End, loc)))
    });

    // ------------------------------------------------------------------
    // Calls. The parenthesized form is declared before the bare
    // expression-list form so `S(1)` resolves to it deterministically.
    // ------------------------------------------------------------------
    g.act("call_stmt", vec![t("CALL"), t("identifier")], |mut c, loc| {
        let callee = name(take(&mut c, 1))?;
        Ok(SemValue::Stmt(Stmt::new(StmtKind::Call { name: callee, args: Vec::new() }, loc)))
    });
    g.act(
        "call_stmt",
        vec![t("CALL"), t("identifier"), t("("), n("expr_list"), t(")")],
        |mut c, loc| {
            let callee = name(take(&mut c, 1))?;
            let args = exprs(take(&mut c, 3))?;
            Ok(SemValue::Stmt(Stmt::new(StmtKind::Call { name: callee, args }, loc)))
        },
    );
    g.act(
        "call_stmt",
        vec![t("identifier"), t("("), n("expr_list"), t(")")],
        |mut c, loc| {
            let callee = name(take(&mut c, 0))?;
            let args = exprs(take(&mut c, 2))?;
            Ok(SemValue::Stmt(Stmt::new(StmtKind::Call { name: callee, args }, loc)))
        },
    );
    g.act("call_stmt", vec![t("identifier")], |mut c, loc| {
        let callee = name(take(&mut c, 0))?;
        Ok(SemValue::Stmt(Stmt::new(StmtKind::Call { name: callee, args: Vec::new() }, loc)))
    });
    g.act("call_stmt", vec![t("identifier"), n("expr_list")], |mut c, loc| {
        let callee = name(take(&mut c, 0))?;
        let args = exprs(take(&mut c, 1))?;
        Ok(SemValue::Stmt(Stmt::new(StmtKind::Call { name: callee, args }, loc)))
    });

    // ------------------------------------------------------------------
    // Declarations: DIM, SHARED, TYPE, DECLARE, SUB, FUNCTION
    // ------------------------------------------------------------------
    g.act("dim_stmt", vec![t("DIM"), n("dim_list")], |mut c, loc| {
        match take(&mut c, 1) {
            SemValue::Dims(decls) => {
                Ok(SemValue::Stmt(Stmt::new(StmtKind::Dim { shared: false, decls }, loc)))
            }
            other => Err(format!("grammar slot mismatch: expected DIM list, got {:?}", other)),
        }
    });
    g.act("dim_stmt", vec![t("DIM"), t("SHARED"), n("dim_list")], |mut c, loc| {
        match take(&mut c, 2) {
            SemValue::Dims(decls) => {
                Ok(SemValue::Stmt(Stmt::new(StmtKind::Dim { shared: true, decls }, loc)))
            }
            other => Err(format!("grammar slot mismatch: expected DIM list, got {:?}", other)),
        }
    });

    g.act("dim_list", vec![n("dim_decl")], |mut c, _| match take(&mut c, 0) {
        SemValue::Dim(d) => Ok(SemValue::Dims(vec![d])),
        other => Err(format!("grammar slot mismatch: expected DIM declarator, got {:?}", other)),
    });
    g.act("dim_list", vec![n("dim_list"), t(","), n("dim_decl")], |mut c, _| {
        match (take(&mut c, 0), take(&mut c, 2)) {
            (SemValue::Dims(mut list), SemValue::Dim(d)) => {
                list.push(d);
                Ok(SemValue::Dims(list))
            }
            other => Err(format!("grammar slot mismatch in DIM list: {:?}", other)),
        }
    });

    g.act("dim_decl", vec![t("identifier")], |mut c, loc| {
        let id = name(take(&mut c, 0))?;
        Ok(SemValue::Dim(DimDecl { name: id, bounds: Vec::new(), as_type: None, locus: loc }))
    });
    g.act("dim_decl", vec![t("identifier"), n("as_type")], |mut c, loc| {
        let id = name(take(&mut c, 0))?;
        let ty = type_name(take(&mut c, 1))?;
        Ok(SemValue::Dim(DimDecl { name: id, bounds: Vec::new(), as_type: Some(ty), locus: loc }))
    });
    g.act("dim_decl", vec![t("identifier"), t("("), n("bounds"), t(")")], |mut c, loc| {
        let id = name(take(&mut c, 0))?;
        match take(&mut c, 2) {
            SemValue::Bounds(bounds) => {
                Ok(SemValue::Dim(DimDecl { name: id, bounds, as_type: None, locus: loc }))
            }
            other => Err(format!("grammar slot mismatch: expected bounds, got {:?}", other)),
        }
    });
    g.act(
        "dim_decl",
        vec![t("identifier"), t("("), n("bounds"), t(")"), n("as_type")],
        |mut c, loc| {
            let id = name(take(&mut c, 0))?;
            let bounds = match take(&mut c, 2) {
                SemValue::Bounds(b) => b,
                other => {
                    return Err(format!("grammar slot mismatch: expected bounds, got {:?}", other));
                }
            };
            let ty = type_name(take(&mut c, 4))?;
            Ok(SemValue::Dim(DimDecl { name: id, bounds, as_type: Some(ty), locus: loc }))
        },
    );

    g.act("as_type", vec![t("AS"), n("type_name")], |mut c, _| Ok(take(&mut c, 1)));
    for kw in ["INTEGER", "LONG", "SINGLE", "DOUBLE", "STRING"] {
        g.act("type_name", vec![t(kw)], move |_, _| Ok(SemValue::TypeName(kw.to_string())));
    }
    g.act("type_name", vec![t("identifier")], |mut c, _| {
        Ok(SemValue::TypeName(name(take(&mut c, 0))?))
    });

    g.act("bounds", vec![n("bound")], |mut c, _| match take(&mut c, 0) {
        SemValue::Bound(b) => Ok(SemValue::Bounds(vec![b])),
        other => Err(format!("grammar slot mismatch: expected bound, got {:?}", other)),
    });
    g.act("bounds", vec![n("bounds"), t(","), n("bound")], |mut c, _| {
        match (take(&mut c, 0), take(&mut c, 2)) {
            (SemValue::Bounds(mut list), SemValue::Bound(b)) => {
                list.push(b);
                Ok(SemValue::Bounds(list))
            }
            other => Err(format!("grammar slot mismatch in bounds: {:?}", other)),
        }
    });
    g.act("bound", vec![n("expr")], |mut c, _| {
        Ok(SemValue::Bound((expr(take(&mut c, 0))?, None)))
    });
    g.act("bound", vec![n("expr"), t("TO"), n("expr")], |mut c, _| {
        let lo = expr(take(&mut c, 0))?;
        let hi = expr(take(&mut c, 2))?;
        Ok(SemValue::Bound((lo, Some(hi))))
    });

    g.act("shared_stmt", vec![t("SHARED"), n("name_list")], |mut c, loc| {
        match take(&mut c, 1) {
            SemValue::Names(names) => {
                Ok(SemValue::Stmt(Stmt::new(StmtKind::Shared { names }, loc)))
            }
            other => Err(format!("grammar slot mismatch: expected name list, got {:?}", other)),
        }
    });
    g.act("name_list", vec![t("identifier")], |mut c, _| {
        Ok(SemValue::Names(vec![name(take(&mut c, 0))?]))
    });
    g.act("name_list", vec![n("name_list"), t(","), t("identifier")], |mut c, _| {
        match take(&mut c, 0) {
            SemValue::Names(mut list) => {
                list.push(name(take(&mut c, 2))?);
                Ok(SemValue::Names(list))
            }
            other => Err(format!("grammar slot mismatch: expected name list, got {:?}", other)),
        }
    });

    g.act(
        "type_stmt",
        vec![t("TYPE"), t("identifier"), n("sep"), n("type_fields"), n("sep"), t("END"), t("TYPE")],
        |mut c, loc| {
            let id = name(take(&mut c, 1))?;
            match take(&mut c, 3) {
                SemValue::Fields(fields) => {
                    Ok(SemValue::Stmt(Stmt::new(StmtKind::TypeDef { name: id, fields }, loc)))
                }
                other => Err(format!("grammar slot mismatch: expected fields, got {:?}", other)),
            }
        },
    );
    g.act("type_fields", vec![n("type_field")], |mut c, _| match take(&mut c, 0) {
        SemValue::Field(f) => Ok(SemValue::Fields(vec![f])),
        other => Err(format!("grammar slot mismatch: expected field, got {:?}", other)),
    });
    g.act("type_fields", vec![n("type_fields"), n("sep"), n("type_field")], |mut c, _| {
        match (take(&mut c, 0), take(&mut c, 2)) {
            (SemValue::Fields(mut list), SemValue::Field(f)) => {
                list.push(f);
                Ok(SemValue::Fields(list))
            }
            other => Err(format!("grammar slot mismatch in fields: {:?}", other)),
        }
    });
    g.act("type_field", vec![t("identifier"), t("AS"), n("type_name")], |mut c, _| {
        let field = name(take(&mut c, 0))?;
        let ty = type_name(take(&mut c, 2))?;
        Ok(SemValue::Field((field, ty)))
    });

    for (kw, is_function) in [("SUB", false), ("FUNCTION", true)] {
        g.act(
            "declare_stmt",
            vec![t("DECLARE"), t(kw), t("identifier")],
            move |mut c, loc| {
                let id = name(take(&mut c, 2))?;
                Ok(SemValue::Stmt(Stmt::new(
                    StmtKind::Declare { is_function, name: id, params: Vec::new() },
                    loc,
                )))
            },
        );
        g.act(
            "declare_stmt",
            vec![t("DECLARE"), t(kw), t("identifier"), t("("), t(")")],
            move |mut c, loc| {
                let id = name(take(&mut c, 2))?;
                Ok(SemValue::Stmt(Stmt::new(
                    StmtKind::Declare { is_function, name: id, params: Vec::new() },
                    loc,
                )))
            },
        );
        g.act(
            "declare_stmt",
            vec![t("DECLARE"), t(kw), t("identifier"), t("("), n("params"), t(")")],
            move |mut c, loc| {
                let id = name(take(&mut c, 2))?;
                let ps = params(take(&mut c, 4))?;
                Ok(SemValue::Stmt(Stmt::new(
                    StmtKind::Declare { is_function, name: id, params: ps },
                    loc,
                )))
            },
        );
    }

    g.act("params", vec![n("param")], |mut c, _| match take(&mut c, 0) {
        SemValue::Param(p) => Ok(SemValue::Params(vec![p])),
        other => Err(format!("grammar slot mismatch: expected parameter, got {:?}", other)),
    });
    g.act("params", vec![n("params"), t(","), n("param")], |mut c, _| {
        match (take(&mut c, 0), take(&mut c, 2)) {
            (SemValue::Params(mut list), SemValue::Param(p)) => {
                list.push(p);
                Ok(SemValue::Params(list))
            }
            other => Err(format!("grammar slot mismatch in parameters: {:?}", other)),
        }
    });
    g.act("param", vec![t("identifier")], |mut c, _| {
        Ok(SemValue::Param(Param { name: name(take(&mut c, 0))?, as_type: None }))
    });
    g.act("param", vec![t("identifier"), n("as_type")], |mut c, _| {
        let id = name(take(&mut c, 0))?;
        let ty = type_name(take(&mut c, 1))?;
        Ok(SemValue::Param(Param { name: id, as_type: Some(ty) }))
    });

    for (kw, is_function) in [("SUB", false), ("FUNCTION", true)] {
        let wrap = move |def: SubDef, loc: Locus| {
            let kind =
                if is_function { StmtKind::Function(def) } else { StmtKind::Sub(def) };
            SemValue::Stmt(Stmt::new(kind, loc))
        };
        let stmt_name = if is_function { "function_stmt" } else { "sub_stmt" };
        g.act(
            stmt_name,
            vec![t(kw), t("identifier"), n("block_body"), t("END"), t(kw)],
            move |mut c, loc| {
                let id = name(take(&mut c, 1))?;
                let body = stmts(take(&mut c, 2))?;
                Ok(wrap(SubDef { name: id, params: Vec::new(), body }, loc))
            },
        );
        g.act(
            stmt_name,
            vec![t(kw), t("identifier"), t("("), t(")"), n("block_body"), t("END"), t(kw)],
            move |mut c, loc| {
                let id = name(take(&mut c, 1))?;
                let body = stmts(take(&mut c, 4))?;
                Ok(wrap(SubDef { name: id, params: Vec::new(), body }, loc))
            },
        );
        g.act(
            stmt_name,
            vec![
                t(kw),
                t("identifier"),
                t("("),
                n("params"),
                t(")"),
                n("block_body"),
                t("END"),
                t(kw),
            ],
            move |mut c, loc| {
                let id = name(take(&mut c, 1))?;
                let ps = params(take(&mut c, 3))?;
                let body = stmts(take(&mut c, 5))?;
                Ok(wrap(SubDef { name: id, params: ps, body }, loc))
            },
        );
    }

    // ------------------------------------------------------------------
    // DATA / READ / RESTORE
    // ------------------------------------------------------------------
    g.act("data_stmt", vec![t("DATA"), n("data_list")], |mut c, loc| {
        match take(&mut c, 1) {
            SemValue::Data(items) => Ok(SemValue::Stmt(Stmt::new(StmtKind::Data(items), loc))),
            other => Err(format!("grammar slot mismatch: expected DATA list, got {:?}", other)),
        }
    });
    g.act("data_list", vec![n("datum")], |mut c, _| match take(&mut c, 0) {
        SemValue::Datum(d) => Ok(SemValue::Data(vec![d])),
        other => Err(format!("grammar slot mismatch: expected DATA item, got {:?}", other)),
    });
    g.act("data_list", vec![n("data_list"), t(","), n("datum")], |mut c, _| {
        match (take(&mut c, 0), take(&mut c, 2)) {
            (SemValue::Data(mut list), SemValue::Datum(d)) => {
                list.push(d);
                Ok(SemValue::Data(list))
            }
            other => Err(format!("grammar slot mismatch in DATA list: {:?}", other)),
        }
    });
    g.act("datum", vec![], |_, _| Ok(SemValue::Datum(None)));
    g.act("datum", vec![t("integer")], |mut c, _| {
        let num = tok(take(&mut c, 0))?;
        Ok(SemValue::Datum(Some(number_literal(&num.text, false)?)))
    });
    g.act("datum", vec![t("float")], |mut c, _| {
        let num = tok(take(&mut c, 0))?;
        Ok(SemValue::Datum(Some(number_literal(&num.text, true)?)))
    });
    g.act("datum", vec![t("-"), t("integer")], |mut c, _| {
        let num = tok(take(&mut c, 1))?;
        Ok(SemValue::Datum(Some(match number_literal(&num.text, false)? {
            Literal::Integer(v) => Literal::Integer(-v),
            Literal::Long(v) => Literal::Long(-v),
            other => other,
        })))
    });
    g.act("datum", vec![t("-"), t("float")], |mut c, _| {
        let num = tok(take(&mut c, 1))?;
        Ok(SemValue::Datum(Some(match number_literal(&num.text, true)? {
            Literal::Single(v) => Literal::Single(-v),
            other => other,
        })))
    });
    g.act("datum", vec![t("string")], |mut c, _| {
        let s = tok(take(&mut c, 0))?;
        Ok(SemValue::Datum(Some(Literal::Str(s.text))))
    });

    g.act("read_stmt", vec![t("READ"), n("lvalue_list")], |mut c, loc| {
        Ok(SemValue::Stmt(Stmt::new(StmtKind::Read(exprs(take(&mut c, 1))?), loc)))
    });
    g.act("restore_stmt", vec![t("RESTORE")], |_, loc| {
        Ok(SemValue::Stmt(Stmt::new(StmtKind::Restore(None), loc)))
    });
    g.act("restore_stmt", vec![t("RESTORE"), t("identifier")], |mut c, loc| {
        Ok(SemValue::Stmt(Stmt::new(StmtKind::Restore(Some(name(take(&mut c, 1))?)), loc)))
    });

    g.act("lvalue_list", vec![n("variable")], |mut c, _| {
        Ok(SemValue::Exprs(vec![expr(take(&mut c, 0))?]))
    });
    g.act("lvalue_list", vec![n("lvalue_list"), t(","), n("variable")], |mut c, _| {
        let mut list = exprs(take(&mut c, 0))?;
        list.push(expr(take(&mut c, 2))?);
        Ok(SemValue::Exprs(list))
    });

    // ------------------------------------------------------------------
    // INPUT and file I/O
    // ------------------------------------------------------------------
    g.act("input_stmt", vec![t("INPUT"), n("lvalue_list")], |mut c, loc| {
        let targets = exprs(take(&mut c, 1))?;
        Ok(SemValue::Stmt(Stmt::new(
            StmtKind::Input { prompt: None, question: true, targets },
            loc,
        )))
    });
    g.act("input_stmt", vec![t("INPUT"), t("string"), t(";"), n("lvalue_list")], |mut c, loc| {
        let prompt = tok(take(&mut c, 1))?.text;
        let targets = exprs(take(&mut c, 3))?;
        Ok(SemValue::Stmt(Stmt::new(
            StmtKind::Input { prompt: Some(prompt), question: true, targets },
            loc,
        )))
    });
    g.act("input_stmt", vec![t("INPUT"), t("string"), t(","), n("lvalue_list")], |mut c, loc| {
        let prompt = tok(take(&mut c, 1))?.text;
        let targets = exprs(take(&mut c, 3))?;
        Ok(SemValue::Stmt(Stmt::new(
            StmtKind::Input { prompt: Some(prompt), question: false, targets },
            loc,
        )))
    });

    g.act(
        "open_stmt",
        vec![t("OPEN"), n("expr"), t("FOR"), n("file_mode"), t("AS"), n("channel")],
        |mut c, loc| {
            let path = expr(take(&mut c, 1))?;
            let mode = match take(&mut c, 3) {
                SemValue::Mode(m) => m,
                other => {
                    return Err(format!("grammar slot mismatch: expected file mode, got {:?}", other));
                }
            };
            let channel = expr(take(&mut c, 5))?;
            Ok(SemValue::Stmt(Stmt::new(StmtKind::Open { path, mode, channel }, loc)))
        },
    );
    g.act("file_mode", vec![t("INPUT")], |_, _| Ok(SemValue::Mode(FileMode::Input)));
    g.act("file_mode", vec![t("OUTPUT")], |_, _| Ok(SemValue::Mode(FileMode::Output)));
    g.act("file_mode", vec![t("APPEND")], |_, _| Ok(SemValue::Mode(FileMode::Append)));
    g.act("channel", vec![t("#"), n("expr")], |mut c, _| Ok(take(&mut c, 1)));
    g.add("channel", vec![n("expr")]);

    g.act("close_stmt", vec![t("CLOSE")], |_, loc| {
        Ok(SemValue::Stmt(Stmt::new(StmtKind::Close { channel: None }, loc)))
    });
    g.act("close_stmt", vec![t("CLOSE"), n("channel")], |mut c, loc| {
        Ok(SemValue::Stmt(Stmt::new(
            StmtKind::Close { channel: Some(expr(take(&mut c, 1))?) },
            loc,
        )))
    });

    g.act("write_stmt", vec![t("WRITE"), t("#"), n("expr")], |mut c, loc| {
        let channel = expr(take(&mut c, 2))?;
        Ok(SemValue::Stmt(Stmt::new(StmtKind::WriteFile { channel, items: Vec::new() }, loc)))
    });
    g.act(
        "write_stmt",
        vec![t("WRITE"), t("#"), n("expr"), t(","), n("expr_list")],
        |mut c, loc| {
            let channel = expr(take(&mut c, 2))?;
            let list = exprs(take(&mut c, 4))?;
            Ok(SemValue::Stmt(Stmt::new(StmtKind::WriteFile { channel, items: list }, loc)))
        },
    );
    g.act(
        "input_file_stmt",
        vec![t("INPUT"), t("#"), n("expr"), t(","), n("lvalue_list")],
        |mut c, loc| {
            let channel = expr(take(&mut c, 2))?;
            let targets = exprs(take(&mut c, 4))?;
            Ok(SemValue::Stmt(Stmt::new(StmtKind::InputFile { channel, targets }, loc)))
        },
    );

    // ------------------------------------------------------------------
    // OPTION BASE and DEF* defaults
    // ------------------------------------------------------------------
    g.act("option_stmt", vec![t("OPTION"), t("BASE"), t("integer")], |mut c, loc| {
        let base = tok(take(&mut c, 2))?;
        match base.text.as_str() {
            "0" => Ok(SemValue::Stmt(Stmt::new(StmtKind::OptionBase(0), loc))),
            "1" => Ok(SemValue::Stmt(Stmt::new(StmtKind::OptionBase(1), loc))),
            other => Err(format!("OPTION BASE must be 0 or 1, got {}", other)),
        }
    });

    for (kw, kind) in [
        ("DEFINT", ScalarKind::Integer),
        ("DEFLNG", ScalarKind::Long),
        ("DEFSNG", ScalarKind::Single),
        ("DEFDBL", ScalarKind::Double),
        ("DEFSTR", ScalarKind::String),
    ] {
        g.act("deftype_stmt", vec![t(kw), n("letter_ranges")], move |_, loc| {
            Ok(SemValue::Stmt(Stmt::new(StmtKind::DefType(kind), loc)))
        });
    }
    g.add("letter_ranges", vec![n("letter_range")]);
    g.add("letter_ranges", vec![n("letter_ranges"), t(","), n("letter_range")]);
    g.act("letter_range", vec![t("identifier")], |mut c, _| {
        let id = name(take(&mut c, 0))?;
        if id.len() == 1 && id.chars().all(|ch| ch.is_ascii_alphabetic()) {
            Ok(SemValue::Empty)
        } else {
            Err(format!("expected a single letter in DEF range, got '{}'", id))
        }
    });
    g.act("letter_range", vec![t("identifier"), t("-"), t("identifier")], |mut c, _| {
        let lo = name(take(&mut c, 0))?;
        let hi = name(take(&mut c, 2))?;
        if lo.len() == 1 && hi.len() == 1 {
            Ok(SemValue::Empty)
        } else {
            Err(format!("expected single letters in DEF range, got '{}-{}'", lo, hi))
        }
    });

    g.finish("program")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::tokenizer::Tokenizer;

    fn parse(src: &str) -> Vec<Stmt> {
        let tokens = Tokenizer::new(src).tokenize().expect("tokenize");
        let g = grammar();
        let p = Parser::new(&g);
        match p.parse(&tokens).expect("parse") {
            SemValue::Stmts(s) => s,
            other => panic!("expected statements, got {:?}", other),
        }
    }

    #[test]
    fn parses_a_print_expression() {
        let prog = parse("PRINT 1 + 2\n");
        assert_eq!(prog.len(), 1);
        match &prog[0].kind {
            StmtKind::Print { items, .. } => {
                assert_eq!(items.len(), 1);
                match &items[0] {
                    PrintItem::Expr(e) => {
                        assert!(matches!(e.kind, ExprKind::Binary { op: BinOp::Add, .. }))
                    }
                    other => panic!("unexpected item {:?}", other),
                }
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn single_line_if_with_else_keeps_assignments() {
        // Despite sharing a prefix with the block form, the single-line
        // IF parses without error and both branches are assignments.
        let prog = parse("IF A THEN B = 1 ELSE B = 2\n");
        assert_eq!(prog.len(), 1);
        match &prog[0].kind {
            StmtKind::If { arms, alt } => {
                assert_eq!(arms.len(), 1);
                assert!(matches!(arms[0].body[0].kind, StmtKind::Assign { .. }));
                assert!(matches!(alt[0].kind, StmtKind::Assign { .. }));
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn block_if_with_elseif_chain() {
        let src = "IF A THEN\nPRINT 1\nELSEIF B THEN\nPRINT 2\nELSE\nPRINT 3\nEND IF\n";
        let prog = parse(src);
        match &prog[0].kind {
            StmtKind::If { arms, alt } => {
                assert_eq!(arms.len(), 2);
                assert_eq!(alt.len(), 1);
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn colon_separated_for_loop_on_one_line() {
        let prog = parse("FOR I = 1 TO 3: PRINT I: NEXT I\n");
        assert_eq!(prog.len(), 1);
        match &prog[0].kind {
            StmtKind::For { var, body, next_var, step, .. } => {
                assert_eq!(var, "I");
                assert_eq!(body.len(), 1);
                assert_eq!(next_var.as_deref(), Some("I"));
                assert!(step.is_none());
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn gosub_label_and_return_on_one_line() {
        let prog = parse("GOSUB L: END: L: PRINT \"HI\": RETURN\n");
        assert_eq!(prog.len(), 5);
        assert!(matches!(&prog[0].kind, StmtKind::Gosub(l) if l == "L"));
        assert!(matches!(prog[1].kind, StmtKind::End));
        // `L` parses as a bare call; codegen turns it into a label.
        assert!(matches!(&prog[2].kind, StmtKind::Call { name, args } if name == "L" && args.is_empty()));
        assert!(matches!(prog[3].kind, StmtKind::Print { .. }));
        assert!(matches!(prog[4].kind, StmtKind::Return));
    }

    #[test]
    fn sub_definition_with_colon_body() {
        let prog = parse("SUB S(): X = 5: END SUB\nS\nPRINT X\n");
        assert_eq!(prog.len(), 3);
        match &prog[0].kind {
            StmtKind::Sub(def) => {
                assert_eq!(def.name, "S");
                assert!(def.params.is_empty());
                assert_eq!(def.body.len(), 1);
            }
            other => panic!("unexpected statement {:?}", other),
        }
        assert!(matches!(&prog[1].kind, StmtKind::Call { name, .. } if name == "S"));
    }

    #[test]
    fn data_with_holes_and_negative_numbers() {
        let prog = parse("DATA 1, -2, , \"X\"\n");
        match &prog[0].kind {
            StmtKind::Data(items) => {
                assert_eq!(items.len(), 4);
                assert_eq!(items[0], Some(Literal::Integer(1)));
                assert_eq!(items[1], Some(Literal::Integer(-2)));
                assert_eq!(items[2], None);
                assert_eq!(items[3], Some(Literal::Str("X".to_string())));
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn dim_with_bounds_and_record_types() {
        let prog = parse("DIM A(1 TO 3), B(10) AS INTEGER, P AS POINT\n");
        match &prog[0].kind {
            StmtKind::Dim { shared, decls } => {
                assert!(!shared);
                assert_eq!(decls.len(), 3);
                assert_eq!(decls[0].bounds.len(), 1);
                assert!(decls[0].bounds[0].1.is_some());
                assert_eq!(decls[1].as_type.as_deref(), Some("INTEGER"));
                assert_eq!(decls[2].as_type.as_deref(), Some("POINT"));
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn member_access_parses_left_to_right() {
        let prog = parse("P.X = A(2).Y\n");
        match &prog[0].kind {
            StmtKind::Assign { target, value } => {
                assert!(matches!(&target.kind, ExprKind::Member { field, .. } if field == "X"));
                match &value.kind {
                    ExprKind::Member { base, field } => {
                        assert_eq!(field, "Y");
                        assert!(matches!(&base.kind, ExprKind::Apply { name, .. } if name == "A"));
                    }
                    other => panic!("unexpected value {:?}", other),
                }
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn implicit_call_with_arguments() {
        let prog = parse("LOCATE 1, 2\n");
        assert!(
            matches!(&prog[0].kind, StmtKind::Call { name, args } if name == "LOCATE" && args.len() == 2)
        );
    }

    #[test]
    fn print_separators_are_preserved() {
        let prog = parse("PRINT X; Y; Z\n");
        match &prog[0].kind {
            StmtKind::Print { items, .. } => {
                assert_eq!(items.len(), 5);
                assert!(matches!(items[1], PrintItem::Semicolon));
                assert!(matches!(items[3], PrintItem::Semicolon));
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn parse_is_deterministic_across_runs() {
        let src = "IF A THEN B = 1 ELSE B = 2\nPRINT B\n";
        assert_eq!(parse(src), parse(src));
    }

    #[test]
    fn while_and_do_loops() {
        let prog = parse("WHILE X < 3\nX = X + 1\nWEND\nDO\nX = X - 1\nLOOP UNTIL X = 0\n");
        assert!(matches!(prog[0].kind, StmtKind::While { .. }));
        match &prog[1].kind {
            StmtKind::DoLoop { pre, post, .. } => {
                assert!(pre.is_none());
                assert!(matches!(post, Some(LoopCond { until: true, .. })));
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn type_block_declares_fields() {
        let prog = parse("TYPE POINT\nX AS SINGLE\nY AS SINGLE\nEND TYPE\n");
        match &prog[0].kind {
            StmtKind::TypeDef { name, fields } => {
                assert_eq!(name, "POINT");
                assert_eq!(fields.len(), 2);
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn open_write_input_close_round() {
        let src = "OPEN \"f.txt\" FOR OUTPUT AS #1\nWRITE #1, A, B\nCLOSE #1\n";
        let prog = parse(src);
        assert!(matches!(prog[0].kind, StmtKind::Open { mode: FileMode::Output, .. }));
        assert!(matches!(&prog[1].kind, StmtKind::WriteFile { items, .. } if items.len() == 2));
        assert!(matches!(prog[2].kind, StmtKind::Close { channel: Some(_) }));
    }
}
