//! # Filter AST
//!
//! Parsed form of a filter expression.

use serde_json::Value;

/// Binary operators, excluding the short-circuiting `and`/`or`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }
}

/// Key of an object construction entry
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKey {
    /// `name:` or `"name":`
    Literal(String),
    /// `(expr):`; every output must be a string
    Computed(Expr),
}

/// Filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `.`
    Identity,

    /// `target.name`
    Field { target: Box<Expr>, name: String },

    /// `target[index]`; index is evaluated against the original input
    Index { target: Box<Expr>, index: Box<Expr> },

    /// `target[]`
    Iterate { target: Box<Expr> },

    /// `expr?`; errors raised by `expr` produce no output
    Try(Box<Expr>),

    /// JSON literal
    Literal(Value),

    /// `[expr]` collects every output; `[]` is an empty array
    Array(Option<Box<Expr>>),

    /// `{k: v, ...}`
    Object(Vec<(ObjectKey, Expr)>),

    /// `lhs | rhs`
    Pipe(Box<Expr>, Box<Expr>),

    /// `lhs, rhs`
    Comma(Box<Expr>, Box<Expr>),

    /// `lhs and rhs`
    And(Box<Expr>, Box<Expr>),

    /// `lhs or rhs`
    Or(Box<Expr>, Box<Expr>),

    /// `-expr`
    Neg(Box<Expr>),

    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// Builtin call; arity checked at parse time
    Call { name: String, args: Vec<Expr> },
}
