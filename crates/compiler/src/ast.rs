//! Abstract syntax tree for the Basil dialect.
//!
//! Nodes carry the locus of the token that introduced them so that the
//! code generator can attach positions to emitted instructions and
//! diagnostics. Identifier names are stored canonicalized (uppercase,
//! sigil kept); the dialect is case-insensitive.

use basil_core::{Literal, Locus, ScalarKind};

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub locus: Locus,
}

impl Expr {
    pub fn new(kind: ExprKind, locus: Locus) -> Self {
        Expr { kind, locus }
    }

    /// True for the shapes that can stand on the left of `=` or be passed
    /// by reference: variables, array elements, record members.
    pub fn is_lvalue(&self) -> bool {
        matches!(self.kind, ExprKind::Var(_) | ExprKind::Apply { .. } | ExprKind::Member { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Numeric or string literal.
    Lit(Literal),
    /// A bare identifier: variable, or a no-argument function call.
    Var(String),
    /// `NAME(args)`: array access and function call share this syntax;
    /// the code generator disambiguates from the declaration tables.
    Apply { name: String, args: Vec<Expr> },
    /// `base.FIELD` record member access.
    Member { base: Box<Expr>, field: String },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// One item of a PRINT statement, separators included: the code
/// generator needs to see trailing `;`/`,` to pick the end behaviour.
#[derive(Debug, Clone, PartialEq)]
pub enum PrintItem {
    Expr(Expr),
    /// `TAB(n)`
    Tab(Expr),
    Comma,
    Semicolon,
}

/// One declarator of a DIM statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DimDecl {
    pub name: String,
    /// Per-dimension bounds: `(upper)` or `(lower TO upper)`.
    pub bounds: Vec<(Expr, Option<Expr>)>,
    /// `AS` type: scalar keyword or user record name.
    pub as_type: Option<String>,
    pub locus: Locus,
}

/// A SUB/FUNCTION parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub as_type: Option<String>,
}

/// A SUB or FUNCTION definition (functions are distinguished by the
/// statement kind wrapping this).
#[derive(Debug, Clone, PartialEq)]
pub struct SubDef {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Input,
    Output,
    Append,
}

/// One arm of an IF: condition plus body.
#[derive(Debug, Clone, PartialEq)]
pub struct IfArm {
    pub cond: Expr,
    pub body: Vec<Stmt>,
}

/// DO/LOOP condition: WHILE or UNTIL.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopCond {
    pub until: bool,
    pub expr: Expr,
}

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub locus: Locus,
}

impl Stmt {
    pub fn new(kind: StmtKind, locus: Locus) -> Self {
        Stmt { kind, locus }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `target = value` (LET optional).
    Assign { target: Expr, value: Expr },
    Print { using: Option<Expr>, items: Vec<PrintItem> },
    Input { prompt: Option<String>, question: bool, targets: Vec<Expr> },
    If { arms: Vec<IfArm>, alt: Vec<Stmt> },
    For {
        var: String,
        from: Expr,
        to: Expr,
        step: Option<Expr>,
        body: Vec<Stmt>,
        next_var: Option<String>,
    },
    While { cond: Expr, body: Vec<Stmt> },
    DoLoop { pre: Option<LoopCond>, post: Option<LoopCond>, body: Vec<Stmt> },
    Goto(String),
    Gosub(String),
    Return,
    /// Explicit CALL, an implicit `NAME args` statement, or a bare
    /// identifier (which may turn out to be a label definition).
    Call { name: String, args: Vec<Expr> },
    Dim { shared: bool, decls: Vec<DimDecl> },
    Shared { names: Vec<String> },
    TypeDef { name: String, fields: Vec<(String, String)> },
    Declare { is_function: bool, name: String, params: Vec<Param> },
    Sub(SubDef),
    Function(SubDef),
    Data(Vec<Option<Literal>>),
    Read(Vec<Expr>),
    Restore(Option<String>),
    Open { path: Expr, mode: FileMode, channel: Expr },
    Close { channel: Option<Expr> },
    WriteFile { channel: Expr, items: Vec<Expr> },
    InputFile { channel: Expr, targets: Vec<Expr> },
    End,
    OptionBase(i64),
    DefType(ScalarKind),
}
