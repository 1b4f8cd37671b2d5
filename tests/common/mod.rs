#![allow(dead_code)]
//! Shared helpers for building template programs by hand.  The parser
//! lives outside this crate, so tests assemble the AST directly; these
//! builders keep that readable.

use chatjinja::ast::*;
use chatjinja::{setup_globals, EnvRef, Environment, Error, Interpreter, Value};

pub fn lit<V: Into<Value>>(v: V) -> Expr {
    Expr::Const(Box::new(Const { value: v.into() }))
}

pub fn var(id: &str) -> Expr {
    Expr::Var(Box::new(Var { id: id.into() }))
}

pub fn emit(expr: Expr) -> Stmt {
    Stmt::Emit(expr)
}

pub fn text(s: &str) -> Stmt {
    emit(lit(s))
}

pub fn list(items: Vec<Expr>) -> Expr {
    Expr::List(Box::new(List { items }))
}

pub fn tuple(items: Vec<Expr>) -> Expr {
    Expr::Tuple(Box::new(Tuple { items }))
}

pub fn binop(op: BinOpKind, left: Expr, right: Expr) -> Expr {
    Expr::BinOp(Box::new(BinOp { op, left, right }))
}

pub fn not(expr: Expr) -> Expr {
    Expr::UnaryOp(Box::new(UnaryOp {
        op: UnaryOpKind::Not,
        expr,
    }))
}

pub fn filter(expr: Expr, name: &str, args: Vec<Expr>) -> Expr {
    Expr::Filter(Box::new(Filter {
        name: name.into(),
        expr,
        args,
    }))
}

pub fn is_test(expr: Expr, name: &str, args: Vec<Expr>, negated: bool) -> Expr {
    Expr::Test(Box::new(Test {
        name: name.into(),
        expr,
        args,
        negated,
    }))
}

pub fn getattr(expr: Expr, name: &str) -> Expr {
    Expr::GetAttr(Box::new(GetAttr {
        expr,
        name: name.into(),
    }))
}

pub fn getitem(expr: Expr, subscript_expr: Expr) -> Expr {
    Expr::GetItem(Box::new(GetItem {
        expr,
        subscript_expr,
    }))
}

pub fn slice(expr: Expr, start: Option<Expr>, stop: Option<Expr>, step: Option<Expr>) -> Expr {
    Expr::Slice(Box::new(Slice {
        expr,
        start,
        stop,
        step,
    }))
}

pub fn call(expr: Expr, args: Vec<Expr>) -> Expr {
    Expr::Call(Box::new(Call { expr, args }))
}

pub fn kwarg(key: &str, value: Expr) -> Expr {
    Expr::Kwarg(Box::new(Kwarg {
        key: key.into(),
        value,
    }))
}

pub fn spread(expr: Expr) -> Expr {
    Expr::Spread(Box::new(Spread { expr }))
}

pub fn ternary(test_expr: Expr, true_expr: Expr, false_expr: Option<Expr>) -> Expr {
    Expr::IfExpr(Box::new(IfExpr {
        test_expr,
        true_expr,
        false_expr,
    }))
}

pub fn if_stmt(expr: Expr, true_body: Vec<Stmt>, false_body: Vec<Stmt>) -> Stmt {
    Stmt::If(Box::new(IfCond {
        expr,
        true_body,
        false_body,
    }))
}

pub fn for_stmt(target: Expr, iter: Expr, body: Vec<Stmt>, else_body: Vec<Stmt>) -> Stmt {
    Stmt::For(Box::new(ForLoop {
        target,
        iter,
        body,
        else_body,
    }))
}

pub fn set_stmt(target: Expr, value: Expr) -> Stmt {
    Stmt::Set(Box::new(Set {
        target,
        value: Some(value),
        body: vec![],
    }))
}

pub fn set_block(target: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::Set(Box::new(Set {
        target,
        value: None,
        body,
    }))
}

pub fn macro_stmt(name: &str, args: Vec<Expr>, body: Vec<Stmt>) -> Stmt {
    Stmt::Macro(Box::new(Macro {
        name: name.into(),
        args,
        body,
    }))
}

pub fn program(children: Vec<Stmt>) -> Program {
    Program { children }
}

pub fn fresh_env() -> EnvRef {
    let env = Environment::new();
    setup_globals(&env);
    env
}

pub fn render_with(env: EnvRef, children: Vec<Stmt>) -> Result<String, Error> {
    Interpreter::new(Some(env))
        .run(&program(children))
        .map(|value| value.to_string())
}

pub fn render(children: Vec<Stmt>) -> String {
    render_with(fresh_env(), children).expect("render failed")
}
