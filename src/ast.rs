//! The template AST consumed by the interpreter.
//!
//! The lexer and parser that produce these nodes live outside this crate;
//! hosts (or a front end) construct the tree and hand it to
//! [`Interpreter::run`](crate::Interpreter::run).  Nodes own their data so
//! a parsed program can outlive whatever source buffer produced it.

use std::fmt;

use crate::value::Value;

/// Root template node.
#[derive(Debug, Clone)]
pub struct Program {
    pub children: Vec<Stmt>,
}

/// A statement node.
///
/// Raw template text arrives as [`Stmt::Emit`] wrapping a string constant;
/// `{{ expr }}` blocks arrive as [`Stmt::Emit`] wrapping the expression.
#[derive(Debug, Clone)]
pub enum Stmt {
    Emit(Expr),
    If(Box<IfCond>),
    For(Box<ForLoop>),
    Set(Box<Set>),
    Macro(Box<Macro>),
    CallBlock(Box<CallBlock>),
    FilterBlock(Box<FilterBlock>),
    Break,
    Continue,
    Comment,
}

/// An if/elif/else condition.
///
/// `elif` chains nest: the next branch is a single [`Stmt::If`] in
/// `false_body`.
#[derive(Debug, Clone)]
pub struct IfCond {
    pub expr: Expr,
    pub true_body: Vec<Stmt>,
    pub false_body: Vec<Stmt>,
}

/// A for loop.
///
/// An inline condition (`{% for x in xs if cond %}`) is carried by making
/// `iter` an [`Expr::IfExpr`] without an else branch; the loop prefilters
/// candidates through it.
#[derive(Debug, Clone)]
pub struct ForLoop {
    pub target: Expr,
    pub iter: Expr,
    pub body: Vec<Stmt>,
    pub else_body: Vec<Stmt>,
}

/// A `{% set %}` statement.
///
/// When `value` is `None` the rendered `body` becomes the assigned string
/// (`{% set x %}...{% endset %}`).
#[derive(Debug, Clone)]
pub struct Set {
    pub target: Expr,
    pub value: Option<Expr>,
    pub body: Vec<Stmt>,
}

/// A macro declaration.
///
/// Parameters are [`Expr::Var`] nodes, or [`Expr::Kwarg`] nodes when the
/// parameter declares a default.
#[derive(Debug, Clone)]
pub struct Macro {
    pub name: String,
    pub args: Vec<Expr>,
    pub body: Vec<Stmt>,
}

/// A `{% call %}` block invoking a macro with a `caller` body.
#[derive(Debug, Clone)]
pub struct CallBlock {
    pub call: Call,
    pub caller_args: Vec<Expr>,
    pub body: Vec<Stmt>,
}

/// A `{% filter %}` block.
#[derive(Debug, Clone)]
pub struct FilterBlock {
    pub name: String,
    pub args: Vec<Expr>,
    pub body: Vec<Stmt>,
}

/// An expression node.
#[derive(Debug, Clone)]
pub enum Expr {
    Const(Box<Const>),
    Var(Box<Var>),
    List(Box<List>),
    Tuple(Box<Tuple>),
    Map(Box<Map>),
    UnaryOp(Box<UnaryOp>),
    BinOp(Box<BinOp>),
    IfExpr(Box<IfExpr>),
    Filter(Box<Filter>),
    Test(Box<Test>),
    GetAttr(Box<GetAttr>),
    GetItem(Box<GetItem>),
    Slice(Box<Slice>),
    Call(Box<Call>),
    Kwarg(Box<Kwarg>),
    Spread(Box<Spread>),
}

/// Loads a constant (integer, float, string or boolean literal).
#[derive(Debug, Clone)]
pub struct Const {
    pub value: Value,
}

/// Looks up a variable.
#[derive(Debug, Clone)]
pub struct Var {
    pub id: String,
}

/// Creates an array of values.
#[derive(Debug, Clone)]
pub struct List {
    pub items: Vec<Expr>,
}

/// Creates a tuple of values.  Also appears as a destructuring target.
#[derive(Debug, Clone)]
pub struct Tuple {
    pub items: Vec<Expr>,
}

/// Creates an object from key/value expression pairs.
#[derive(Debug, Clone)]
pub struct Map {
    pub keys: Vec<Expr>,
    pub values: Vec<Expr>,
}

/// A kind of unary operator.
#[derive(Debug, Clone, Copy)]
pub enum UnaryOpKind {
    Not,
}

/// An unary operator expression.
#[derive(Debug, Clone)]
pub struct UnaryOp {
    pub op: UnaryOpKind,
    pub expr: Expr,
}

/// A kind of binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOpKind {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    ScAnd,
    ScOr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Concat,
    In,
    NotIn,
}

impl fmt::Display for BinOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinOpKind::Eq => "==",
            BinOpKind::Ne => "!=",
            BinOpKind::Lt => "<",
            BinOpKind::Lte => "<=",
            BinOpKind::Gt => ">",
            BinOpKind::Gte => ">=",
            BinOpKind::ScAnd => "and",
            BinOpKind::ScOr => "or",
            BinOpKind::Add => "+",
            BinOpKind::Sub => "-",
            BinOpKind::Mul => "*",
            BinOpKind::Div => "/",
            BinOpKind::Rem => "%",
            BinOpKind::Concat => "~",
            BinOpKind::In => "in",
            BinOpKind::NotIn => "not in",
        })
    }
}

/// A binary operator expression.
#[derive(Debug, Clone)]
pub struct BinOp {
    pub op: BinOpKind,
    pub left: Expr,
    pub right: Expr,
}

/// A conditional expression.
///
/// With `false_expr` present this is the ternary `A if C else B`; without
/// it, the select form `A if C` that yields undefined when the condition
/// does not hold.
#[derive(Debug, Clone)]
pub struct IfExpr {
    pub test_expr: Expr,
    pub true_expr: Expr,
    pub false_expr: Option<Expr>,
}

/// A filter expression.
///
/// The identifier form (`x | upper`) has no args; the call form may mix
/// positional expressions and [`Expr::Kwarg`] nodes.
#[derive(Debug, Clone)]
pub struct Filter {
    pub name: String,
    pub expr: Expr,
    pub args: Vec<Expr>,
}

/// A test expression (`x is odd`, `x is not eq(3)`).
#[derive(Debug, Clone)]
pub struct Test {
    pub name: String,
    pub expr: Expr,
    pub args: Vec<Expr>,
    pub negated: bool,
}

/// An attribute lookup expression (`user.name`).
#[derive(Debug, Clone)]
pub struct GetAttr {
    pub expr: Expr,
    pub name: String,
}

/// A subscript lookup expression (`seq[idx]`).
#[derive(Debug, Clone)]
pub struct GetItem {
    pub expr: Expr,
    pub subscript_expr: Expr,
}

/// A slice expression (`seq[start:stop:step]`); all bounds optional.
#[derive(Debug, Clone)]
pub struct Slice {
    pub expr: Expr,
    pub start: Option<Expr>,
    pub stop: Option<Expr>,
    pub step: Option<Expr>,
}

/// Calls something.
#[derive(Debug, Clone)]
pub struct Call {
    pub expr: Expr,
    pub args: Vec<Expr>,
}

/// A keyword argument in a call or macro signature.
#[derive(Debug, Clone)]
pub struct Kwarg {
    pub key: String,
    pub value: Expr,
}

/// Splices a sequence into a call's positional arguments (`f(*seq)`).
#[derive(Debug, Clone)]
pub struct Spread {
    pub expr: Expr,
}
