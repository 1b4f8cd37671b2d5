//! The tree-walking evaluator.
//!
//! [`Interpreter::run`] walks a [`Program`] and accumulates the rendered
//! output; the program's value is always a string for well-formed
//! templates.  Statements evaluate against an [`Environment`] chain:
//! the program body gets a fresh global scope, and further scopes are
//! opened for every `for` body, macro call and `call` block.
//!
//! `break` and `continue` are not errors but signals: the block
//! evaluator returns a [`Control`] and only the innermost `for` loop
//! consumes the loop signals.  A signal escaping every loop is a syntax
//! error in the template.

use std::fmt::Write;

use crate::ast::{self, Expr, Stmt};
use crate::environment::{self, EnvRef, Environment};
use crate::error::{Error, ErrorKind};
use crate::value::{ops, RcType, Value, ValueKind, ValueMap};

/// Outcome of evaluating a statement or block.
enum Control {
    Normal,
    Break,
    Continue,
}

/// Evaluates template programs against an environment.
pub struct Interpreter {
    env: EnvRef,
}

impl Interpreter {
    /// Creates an interpreter over the given environment, or a fresh one.
    pub fn new(env: Option<EnvRef>) -> Interpreter {
        Interpreter {
            env: env.unwrap_or_else(Environment::new),
        }
    }

    /// Returns the interpreter's root environment.
    pub fn env(&self) -> &EnvRef {
        &self.env
    }

    /// Runs a program and returns the rendered string value.
    pub fn run(&self, program: &ast::Program) -> Result<Value, Error> {
        let scope = Environment::child(&self.env);
        render_block(&program.children, &scope).map(Value::from)
    }
}

// renders a statement list into a fresh buffer.  Loop signals must not
// escape a block rendered this way (program body, macro body, set body,
// filter block, caller body).
fn render_block(stmts: &[Stmt], env: &EnvRef) -> Result<String, Error> {
    let mut out = String::new();
    match ok!(eval_block(stmts, env, &mut out)) {
        Control::Normal => Ok(out),
        Control::Break => Err(Error::new(ErrorKind::SyntaxError, "break outside of loop")),
        Control::Continue => Err(Error::new(
            ErrorKind::SyntaxError,
            "continue outside of loop",
        )),
    }
}

fn eval_block(stmts: &[Stmt], env: &EnvRef, out: &mut String) -> Result<Control, Error> {
    for stmt in stmts {
        match ok!(eval_stmt(stmt, env, out)) {
            Control::Normal => {}
            control => return Ok(control),
        }
    }
    Ok(Control::Normal)
}

fn eval_stmt(stmt: &Stmt, env: &EnvRef, out: &mut String) -> Result<Control, Error> {
    match stmt {
        Stmt::Emit(expr) => {
            // none and undefined produce no output
            let value = ok!(eval_expr(expr, env));
            ok!(write!(out, "{value}").map_err(Error::from));
            Ok(Control::Normal)
        }
        Stmt::If(cond) => {
            if ok!(eval_expr(&cond.expr, env)).is_true() {
                eval_block(&cond.true_body, env, out)
            } else {
                eval_block(&cond.false_body, env, out)
            }
        }
        Stmt::For(for_loop) => eval_for(for_loop, env, out),
        Stmt::Set(set) => {
            ok!(eval_set(set, env));
            Ok(Control::Normal)
        }
        Stmt::Macro(decl) => {
            env.set_value(&decl.name, make_macro_fn(RcType::new((**decl).clone())));
            Ok(Control::Normal)
        }
        Stmt::CallBlock(call_block) => {
            let value = ok!(eval_call_block(call_block, env));
            ok!(write!(out, "{value}").map_err(Error::from));
            Ok(Control::Normal)
        }
        Stmt::FilterBlock(filter_block) => {
            let body = ok!(render_block(&filter_block.body, env));
            let args = ok!(eval_args(&filter_block.args, env));
            let value = ok!(environment::apply_filter(
                env,
                &filter_block.name,
                Value::from(body),
                &args
            ));
            ok!(write!(out, "{value}").map_err(Error::from));
            Ok(Control::Normal)
        }
        Stmt::Break => Ok(Control::Break),
        Stmt::Continue => Ok(Control::Continue),
        Stmt::Comment => Ok(Control::Normal),
    }
}

fn eval_set(set: &ast::Set, env: &EnvRef) -> Result<(), Error> {
    let value = match set.value {
        Some(ref expr) => ok!(eval_expr(expr, env)),
        None => Value::from(ok!(render_block(&set.body, env))),
    };
    match &set.target {
        Expr::Var(var) => {
            env.set_value(&var.id, value);
            Ok(())
        }
        Expr::Tuple(_) => bind_target(&set.target, &value, env),
        Expr::GetAttr(attr) => {
            let object = ok!(eval_expr(&attr.expr, env));
            object.set_attr(&attr.name, value)
        }
        _ => Err(Error::new(
            ErrorKind::SyntaxError,
            "cannot assign to this expression",
        )),
    }
}

// binds a loop or destructuring target in the given scope
fn bind_target(target: &Expr, value: &Value, scope: &EnvRef) -> Result<(), Error> {
    match target {
        Expr::Var(var) => {
            scope.set_value(&var.id, value.clone());
            Ok(())
        }
        Expr::Tuple(tuple) => {
            let items = value.as_seq_items().ok_or_else(|| {
                Error::new(
                    ErrorKind::CannotUnpack,
                    format!("cannot unpack {}", value.kind()),
                )
            })?;
            if items.len() != tuple.items.len() {
                return Err(Error::new(
                    ErrorKind::CannotUnpack,
                    format!(
                        "expected {} values to unpack, got {}",
                        tuple.items.len(),
                        items.len()
                    ),
                ));
            }
            for (target, item) in tuple.items.iter().zip(items.iter()) {
                match target {
                    Expr::Var(var) => scope.set_value(&var.id, item.clone()),
                    _ => {
                        return Err(Error::new(
                            ErrorKind::SyntaxError,
                            "destructuring targets must be identifiers",
                        ))
                    }
                }
            }
            Ok(())
        }
        _ => Err(Error::new(
            ErrorKind::SyntaxError,
            "cannot bind to this expression",
        )),
    }
}

fn eval_for(for_loop: &ast::ForLoop, env: &EnvRef, out: &mut String) -> Result<Control, Error> {
    // `for x in xs if cond` arrives as a select expression: pull the
    // iterable out and keep the condition for prefiltering
    let (iter_expr, cond_expr) = match &for_loop.iter {
        Expr::IfExpr(if_expr) if if_expr.false_expr.is_none() => {
            (&if_expr.true_expr, Some(&if_expr.test_expr))
        }
        other => (other, None),
    };

    let iterable = ok!(eval_expr(iter_expr, env));
    let candidates: Vec<Value> = match iterable.kind() {
        ValueKind::Array | ValueKind::Tuple => iterable.as_seq_items().unwrap_or_default(),
        ValueKind::Object | ValueKind::Kwargs => iterable
            .as_map_entries()
            .unwrap_or_default()
            .into_iter()
            .map(|(key, _)| Value::from(key))
            .collect(),
        ValueKind::String => iterable
            .as_str()
            .unwrap_or_default()
            .chars()
            .map(|c| Value::from(c.to_string()))
            .collect(),
        _ => {
            return Err(Error::new(
                ErrorKind::InvalidOperation,
                format!("value of type {} is not iterable", iterable.kind()),
            ))
        }
    };

    let items = match cond_expr {
        Some(cond) => {
            let mut rv = Vec::with_capacity(candidates.len());
            for candidate in candidates {
                let subscope = Environment::child(env);
                ok!(bind_target(&for_loop.target, &candidate, &subscope));
                if ok!(eval_expr(cond, &subscope)).is_true() {
                    rv.push(candidate);
                }
            }
            rv
        }
        None => candidates,
    };

    let scope = Environment::child(env);
    if items.is_empty() {
        return eval_block(&for_loop.else_body, &scope, out);
    }

    for (idx, item) in items.iter().enumerate() {
        ok!(bind_target(&for_loop.target, item, &scope));
        scope.set_value("loop", make_loop_object(&items, idx));
        match ok!(eval_block(&for_loop.body, &scope, out)) {
            Control::Normal => {}
            Control::Break => break,
            Control::Continue => continue,
        }
    }
    Ok(Control::Normal)
}

fn make_loop_object(items: &[Value], idx: usize) -> Value {
    let len = items.len();
    let mut map = ValueMap::new();
    map.insert("index".into(), Value::from(idx + 1));
    map.insert("index0".into(), Value::from(idx));
    map.insert("revindex".into(), Value::from(len - idx));
    map.insert("revindex0".into(), Value::from(len - idx - 1));
    map.insert("first".into(), Value::from(idx == 0));
    map.insert("last".into(), Value::from(idx == len - 1));
    map.insert("length".into(), Value::from(len));
    map.insert(
        "previtem".into(),
        if idx > 0 {
            items[idx - 1].clone()
        } else {
            Value::UNDEFINED
        },
    );
    map.insert(
        "nextitem".into(),
        items.get(idx + 1).cloned().unwrap_or(Value::UNDEFINED),
    );
    map.insert(
        "cycle".into(),
        Value::from_func(Some("cycle".into()), move |args, _env| {
            if args.is_empty() {
                Ok(Value::UNDEFINED)
            } else {
                Ok(args[idx % args.len()].clone())
            }
        }),
    );
    Value::from_map(map)
}

fn make_macro_fn(decl: RcType<ast::Macro>) -> Value {
    let name = decl.name.clone();
    // macros close over nothing: the body runs in a child of whatever
    // environment the call happens in
    Value::from_func(Some(name), move |args, call_env| {
        let scope = Environment::child(call_env);
        ok!(bind_params(&decl.name, &decl.args, args, &scope));
        render_block(&decl.body, &scope).map(Value::from)
    })
}

// binds declared parameters (identifiers, or kwargs nodes carrying a
// default expression) from the call arguments: positional first, then
// keyword, then the declared default
fn bind_params(
    what: &str,
    params: &[Expr],
    args: &[Value],
    scope: &EnvRef,
) -> Result<(), Error> {
    let (positional, kwargs) = match args.last() {
        Some(last) if last.is_kwargs() => (
            &args[..args.len() - 1],
            last.as_map_entries().unwrap_or_default(),
        ),
        _ => (args, Vec::new()),
    };
    let by_keyword = |name: &str| {
        kwargs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, val)| val.clone())
    };

    for (idx, param) in params.iter().enumerate() {
        match param {
            Expr::Var(var) => {
                let value = positional
                    .get(idx)
                    .cloned()
                    .or_else(|| by_keyword(&var.id))
                    .ok_or_else(|| {
                        Error::new(
                            ErrorKind::MissingArgument,
                            format!("{} is missing the argument {:?}", what, var.id),
                        )
                    })?;
                scope.set_value(&var.id, value);
            }
            Expr::Kwarg(kwarg) => {
                let value = match positional.get(idx).cloned().or_else(|| by_keyword(&kwarg.key)) {
                    Some(value) => value,
                    None => ok!(eval_expr(&kwarg.value, scope)),
                };
                scope.set_value(&kwarg.key, value);
            }
            _ => {
                return Err(Error::new(
                    ErrorKind::SyntaxError,
                    format!("{what} has an invalid parameter declaration"),
                ))
            }
        }
    }
    Ok(())
}

fn eval_call_block(call_block: &ast::CallBlock, env: &EnvRef) -> Result<Value, Error> {
    let shared = RcType::new(call_block.clone());
    let caller_env = env.clone();
    let caller = Value::from_func(Some("caller".into()), move |args, _call_env| {
        let scope = Environment::child(&caller_env);
        ok!(bind_params("caller", &shared.caller_args, args, &scope));
        render_block(&shared.body, &scope).map(Value::from)
    });

    let scope = Environment::child(env);
    scope.set_value("caller", caller);
    eval_call(&call_block.call, &scope)
}

fn eval_call(call: &ast::Call, env: &EnvRef) -> Result<Value, Error> {
    let callee = ok!(eval_expr(&call.expr, env));
    let args = ok!(eval_args(&call.args, env));
    callee.call(&args, env)
}

// evaluates call arguments into positional values; keyword arguments
// collect into a single trailing kwargs payload
fn eval_args(args: &[Expr], env: &EnvRef) -> Result<Vec<Value>, Error> {
    let mut positional = Vec::new();
    let mut kwargs = ValueMap::new();
    for arg in args {
        match arg {
            Expr::Kwarg(kwarg) => {
                kwargs.insert(kwarg.key.clone(), ok!(eval_expr(&kwarg.value, env)));
            }
            Expr::Spread(spread) => {
                if !kwargs.is_empty() {
                    return Err(positional_after_keyword());
                }
                let value = ok!(eval_expr(&spread.expr, env));
                match value.as_seq_items() {
                    Some(items) => positional.extend(items),
                    None => {
                        return Err(Error::new(
                            ErrorKind::InvalidOperation,
                            format!("can only spread arrays, got {}", value.kind()),
                        ))
                    }
                }
            }
            _ => {
                if !kwargs.is_empty() {
                    return Err(positional_after_keyword());
                }
                positional.push(ok!(eval_expr(arg, env)));
            }
        }
    }
    if !kwargs.is_empty() {
        positional.push(Value::from_kwargs(kwargs));
    }
    Ok(positional)
}

fn positional_after_keyword() -> Error {
    Error::new(
        ErrorKind::InvalidArguments,
        "positional argument follows keyword argument",
    )
}

fn eval_expr(expr: &Expr, env: &EnvRef) -> Result<Value, Error> {
    match expr {
        Expr::Const(constant) => Ok(constant.value.clone()),
        Expr::Var(var) => Ok(env.lookup(&var.id)),
        Expr::List(list) => {
            let mut items = Vec::with_capacity(list.items.len());
            for item in &list.items {
                items.push(ok!(eval_expr(item, env)));
            }
            Ok(Value::from_items(items))
        }
        Expr::Tuple(tuple) => {
            let mut items = Vec::with_capacity(tuple.items.len());
            for item in &tuple.items {
                items.push(ok!(eval_expr(item, env)));
            }
            Ok(Value::from_tuple(items))
        }
        Expr::Map(map) => {
            let mut rv = ValueMap::new();
            for (key, value) in map.keys.iter().zip(map.values.iter()) {
                let key = ok!(eval_expr(key, env));
                let key = key.as_str().ok_or_else(|| {
                    Error::new(
                        ErrorKind::InvalidOperation,
                        format!("object keys must be strings, got {}", key.kind()),
                    )
                })?;
                rv.insert(key.into(), ok!(eval_expr(value, env)));
            }
            Ok(Value::from_map(rv))
        }
        Expr::UnaryOp(unary) => match unary.op {
            ast::UnaryOpKind::Not => {
                Ok(Value::from(!ok!(eval_expr(&unary.expr, env)).is_true()))
            }
        },
        Expr::BinOp(binop) => {
            let left = ok!(eval_expr(&binop.left, env));
            match binop.op {
                // Python semantics: `and`/`or` return an operand, not a
                // coerced boolean
                ast::BinOpKind::ScAnd => {
                    if left.is_true() {
                        eval_expr(&binop.right, env)
                    } else {
                        Ok(left)
                    }
                }
                ast::BinOpKind::ScOr => {
                    if left.is_true() {
                        Ok(left)
                    } else {
                        eval_expr(&binop.right, env)
                    }
                }
                op => {
                    let right = ok!(eval_expr(&binop.right, env));
                    ops::binary_op(op, &left, &right)
                }
            }
        }
        Expr::IfExpr(if_expr) => {
            if ok!(eval_expr(&if_expr.test_expr, env)).is_true() {
                eval_expr(&if_expr.true_expr, env)
            } else {
                match if_expr.false_expr {
                    Some(ref false_expr) => eval_expr(false_expr, env),
                    None => Ok(Value::UNDEFINED),
                }
            }
        }
        Expr::Filter(filter) => {
            let value = ok!(eval_expr(&filter.expr, env));
            let args = ok!(eval_args(&filter.args, env));
            environment::apply_filter(env, &filter.name, value, &args)
        }
        Expr::Test(test) => {
            let value = ok!(eval_expr(&test.expr, env));
            let args = ok!(eval_args(&test.args, env));
            let rv = ok!(environment::perform_test(env, &test.name, value, &args));
            Ok(Value::from(rv != test.negated))
        }
        Expr::GetAttr(attr) => {
            let value = ok!(eval_expr(&attr.expr, env));
            Ok(value.get_attr(&attr.name))
        }
        Expr::GetItem(item) => {
            let value = ok!(eval_expr(&item.expr, env));
            let subscript = ok!(eval_expr(&item.subscript_expr, env));
            value.get_item(&subscript)
        }
        Expr::Slice(slice) => {
            let value = ok!(eval_expr(&slice.expr, env));
            let start = ok!(eval_opt_expr(&slice.start, env));
            let stop = ok!(eval_opt_expr(&slice.stop, env));
            let step = ok!(eval_opt_expr(&slice.step, env));
            ops::slice(&value, &start, &stop, &step)
        }
        Expr::Call(call) => eval_call(call, env),
        Expr::Kwarg(_) | Expr::Spread(_) => Err(Error::new(
            ErrorKind::SyntaxError,
            "argument expression outside of a call",
        )),
    }
}

fn eval_opt_expr(expr: &Option<Expr>, env: &EnvRef) -> Result<Value, Error> {
    match expr {
        Some(expr) => eval_expr(expr, env),
        None => Ok(Value::UNDEFINED),
    }
}
