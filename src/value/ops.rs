use crate::ast::BinOpKind;
use crate::error::{Error, ErrorKind};
use crate::value::{Value, ValueKind, ValueRepr};

enum CoerceResult {
    I64(i64, i64),
    F64(f64, f64),
}

fn as_f64(value: &Value) -> Option<f64> {
    Some(match value.0 {
        ValueRepr::Int(x) => x as f64,
        ValueRepr::Float(x) => x,
        _ => return None,
    })
}

// numeric coercion for arithmetic and ordering.  Only integers and
// floats participate; booleans intentionally do not.
fn coerce(a: &Value, b: &Value) -> Option<CoerceResult> {
    match (&a.0, &b.0) {
        (ValueRepr::Int(a), ValueRepr::Int(b)) => Some(CoerceResult::I64(*a, *b)),
        (ValueRepr::Float(a), _) => Some(CoerceResult::F64(*a, some!(as_f64(b)))),
        (_, ValueRepr::Float(b)) => Some(CoerceResult::F64(some!(as_f64(a)), *b)),
        _ => None,
    }
}

// scalar view for loose equality, where booleans do coerce (`1 == true`)
fn as_eq_f64(value: &Value) -> Option<f64> {
    Some(match value.0 {
        ValueRepr::Bool(x) => x as i64 as f64,
        ValueRepr::Int(x) => x as f64,
        ValueRepr::Float(x) => x,
        _ => return None,
    })
}

/// Loose equality: scalar values compare across integer, float and bool;
/// sequences compare elementwise, objects keywise, strings by content.
pub fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    match (&lhs.0, &rhs.0) {
        (ValueRepr::Undefined, ValueRepr::Undefined) => true,
        (ValueRepr::None, ValueRepr::None) => true,
        (ValueRepr::String(a), ValueRepr::String(b)) => a == b,
        (ValueRepr::Func(a), ValueRepr::Func(b)) => std::rc::Rc::ptr_eq(a, b),
        (
            ValueRepr::Seq(_) | ValueRepr::Tuple(_),
            ValueRepr::Seq(_) | ValueRepr::Tuple(_),
        ) => {
            let a = lhs.as_seq_items().unwrap_or_default();
            let b = rhs.as_seq_items().unwrap_or_default();
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| loose_eq(x, y))
        }
        (
            ValueRepr::Map(_) | ValueRepr::Kwargs(_),
            ValueRepr::Map(_) | ValueRepr::Kwargs(_),
        ) => {
            let a = lhs.as_map_entries().unwrap_or_default();
            let b = rhs.as_map_entries().unwrap_or_default();
            a.len() == b.len()
                && a.iter().all(|(key, val)| {
                    b.iter()
                        .any(|(other_key, other_val)| key == other_key && loose_eq(val, other_val))
                })
        }
        _ => match (as_eq_f64(lhs), as_eq_f64(rhs)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

fn unknown_op(op: BinOpKind, lhs: &Value, rhs: &Value) -> Error {
    Error::new(
        ErrorKind::InvalidOperation,
        format!(
            "unknown operator {} between {} and {}",
            op,
            lhs.kind(),
            rhs.kind()
        ),
    )
}

fn failed_op(op: BinOpKind, lhs: &Value, rhs: &Value) -> Error {
    Error::new(
        ErrorKind::InvalidOperation,
        format!("unable to calculate {lhs} {op} {rhs}"),
    )
}

/// Applies a binary operator to two evaluated operands.
///
/// `and`/`or` never reach this point; the evaluator short-circuits them
/// on the truthiness of the left operand.
pub fn binary_op(op: BinOpKind, lhs: &Value, rhs: &Value) -> Result<Value, Error> {
    // equality is defined for every pair of values, undefined included
    match op {
        BinOpKind::Eq => return Ok(Value::from(loose_eq(lhs, rhs))),
        BinOpKind::Ne => return Ok(Value::from(!loose_eq(lhs, rhs))),
        _ => {}
    }

    // an undefined container cannot hold anything; all other uses of
    // undefined operands are errors
    if lhs.is_undefined() || rhs.is_undefined() {
        return match op {
            BinOpKind::In if rhs.is_undefined() => Ok(Value::from(false)),
            BinOpKind::NotIn if rhs.is_undefined() => Ok(Value::from(true)),
            _ => Err(unknown_op(op, lhs, rhs)),
        };
    }
    if lhs.is_none() || rhs.is_none() {
        return Err(unknown_op(op, lhs, rhs));
    }

    match op {
        BinOpKind::Concat => Ok(Value::from(format!("{lhs}{rhs}"))),
        BinOpKind::In => contains(rhs, lhs).map(Value::from),
        BinOpKind::NotIn => contains(rhs, lhs).map(|rv| Value::from(!rv)),
        BinOpKind::Lt | BinOpKind::Lte | BinOpKind::Gt | BinOpKind::Gte => {
            let (a, b) = match coerce(lhs, rhs) {
                Some(CoerceResult::I64(a, b)) => (a as f64, b as f64),
                Some(CoerceResult::F64(a, b)) => (a, b),
                None => return Err(unknown_op(op, lhs, rhs)),
            };
            Ok(Value::from(match op {
                BinOpKind::Lt => a < b,
                BinOpKind::Lte => a <= b,
                BinOpKind::Gt => a > b,
                _ => a >= b,
            }))
        }
        BinOpKind::Add => add(lhs, rhs),
        BinOpKind::Sub => match coerce(lhs, rhs) {
            Some(CoerceResult::I64(a, b)) => a
                .checked_sub(b)
                .map(Value::from)
                .ok_or_else(|| failed_op(op, lhs, rhs)),
            Some(CoerceResult::F64(a, b)) => Ok(Value::from(a - b)),
            None => Err(unknown_op(op, lhs, rhs)),
        },
        BinOpKind::Mul => match coerce(lhs, rhs) {
            Some(CoerceResult::I64(a, b)) => a
                .checked_mul(b)
                .map(Value::from)
                .ok_or_else(|| failed_op(op, lhs, rhs)),
            Some(CoerceResult::F64(a, b)) => Ok(Value::from(a * b)),
            None => Err(unknown_op(op, lhs, rhs)),
        },
        // true division: the result is always a float
        BinOpKind::Div => match coerce(lhs, rhs) {
            Some(CoerceResult::I64(a, b)) => Ok(Value::from(a as f64 / b as f64)),
            Some(CoerceResult::F64(a, b)) => Ok(Value::from(a / b)),
            None => Err(unknown_op(op, lhs, rhs)),
        },
        BinOpKind::Rem => match coerce(lhs, rhs) {
            Some(CoerceResult::I64(a, b)) => a
                .checked_rem_euclid(b)
                .map(Value::from)
                .ok_or_else(|| failed_op(op, lhs, rhs)),
            Some(CoerceResult::F64(a, b)) => Ok(Value::from(a.rem_euclid(b))),
            None => Err(unknown_op(op, lhs, rhs)),
        },
        BinOpKind::Eq | BinOpKind::Ne | BinOpKind::ScAnd | BinOpKind::ScOr => {
            Err(unknown_op(op, lhs, rhs))
        }
    }
}

fn add(lhs: &Value, rhs: &Value) -> Result<Value, Error> {
    if let Some(rv) = coerce(lhs, rhs) {
        return match rv {
            CoerceResult::I64(a, b) => a
                .checked_add(b)
                .map(Value::from)
                .ok_or_else(|| failed_op(BinOpKind::Add, lhs, rhs)),
            CoerceResult::F64(a, b) => Ok(Value::from(a + b)),
        };
    }
    let seqish = |v: &Value| matches!(v.0, ValueRepr::Seq(_) | ValueRepr::Tuple(_));
    if seqish(lhs) && seqish(rhs) {
        let mut items = lhs.as_seq_items().unwrap_or_default();
        items.extend(rhs.as_seq_items().unwrap_or_default());
        return Ok(Value::from_items(items));
    }
    if lhs.kind() == ValueKind::String || rhs.kind() == ValueKind::String {
        return Ok(Value::from(format!("{lhs}{rhs}")));
    }
    Err(unknown_op(BinOpKind::Add, lhs, rhs))
}

/// Implements a containment check on values.
pub fn contains(container: &Value, value: &Value) -> Result<bool, Error> {
    match &container.0 {
        ValueRepr::String(s) => Ok(match value.as_str() {
            Some(needle) => s.contains(needle),
            None => s.contains(&value.to_string()),
        }),
        ValueRepr::Seq(_) | ValueRepr::Tuple(_) => {
            let items = container.as_seq_items().unwrap_or_default();
            Ok(items.iter().any(|item| loose_eq(item, value)))
        }
        ValueRepr::Map(map) | ValueRepr::Kwargs(map) => Ok(match value.as_str() {
            Some(key) => map.borrow().contains_key(key),
            None => false,
        }),
        _ => Err(Error::new(
            ErrorKind::InvalidOperation,
            format!(
                "cannot perform a containment check on {}",
                container.kind()
            ),
        )),
    }
}

// CPython slice index resolution: bounds are clamped relative to the
// step direction so that any start/stop/step combination is valid.
fn slice_bounds(
    start: Option<i64>,
    stop: Option<i64>,
    step: i64,
    len: usize,
) -> (i64, i64) {
    let len = len as i64;
    let (lower, upper) = if step < 0 { (-1, len - 1) } else { (0, len) };
    let start = match start {
        None => if step < 0 { upper } else { lower },
        Some(x) if x < 0 => x.saturating_add(len).max(lower),
        Some(x) => x.min(upper),
    };
    let stop = match stop {
        None => if step < 0 { lower } else { upper },
        Some(x) if x < 0 => x.saturating_add(len).max(lower),
        Some(x) => x.min(upper),
    };
    (start, stop)
}

fn slice_indices(
    start: Option<i64>,
    stop: Option<i64>,
    step: i64,
    len: usize,
) -> impl Iterator<Item = usize> {
    let (mut i, stop) = slice_bounds(start, stop, step, len);
    std::iter::from_fn(move || {
        if (step > 0 && i < stop) || (step < 0 && i > stop) {
            let rv = i as usize;
            i = i.saturating_add(step);
            Some(rv)
        } else {
            None
        }
    })
}

fn slice_bound_arg(value: &Value) -> Result<Option<i64>, Error> {
    match value.0 {
        ValueRepr::Undefined | ValueRepr::None => Ok(None),
        ValueRepr::Int(x) => Ok(Some(x)),
        _ => Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("slice bounds must be integers, got {}", value.kind()),
        )),
    }
}

/// Slices arrays and strings with Python semantics: negative indices
/// count from the end, a negative step walks backwards, strings slice by
/// code point.
pub fn slice(value: &Value, start: &Value, stop: &Value, step: &Value) -> Result<Value, Error> {
    let start = ok!(slice_bound_arg(start));
    let stop = ok!(slice_bound_arg(stop));
    let step = ok!(slice_bound_arg(step)).unwrap_or(1);
    if step == 0 {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            "cannot slice by step size of 0",
        ));
    }

    match &value.0 {
        ValueRepr::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(Value::from(
                slice_indices(start, stop, step, chars.len())
                    .map(|i| chars[i])
                    .collect::<String>(),
            ))
        }
        ValueRepr::Seq(_) | ValueRepr::Tuple(_) => {
            let items = value.as_seq_items().unwrap_or_default();
            Ok(Value::from_items(
                slice_indices(start, stop, step, items.len())
                    .map(|i| items[i].clone())
                    .collect(),
            ))
        }
        _ => Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("value of type {} cannot be sliced", value.kind()),
        )),
    }
}
