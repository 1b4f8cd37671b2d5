//! Built in filters and filter abstraction.
//!
//! Filters appear in two surface forms: the identifier form (`x | upper`)
//! and the call form (`x | indent(width=2)`).  Dispatch is by receiver
//! type inside each filter; a filter applied to a receiver it does not
//! support fails with a message naming both.

use std::collections::BTreeMap;

use crate::environment::{self, EnvRef};
use crate::error::{Error, ErrorKind};
use crate::value::args::{int_arg, str_arg, CallArgs};
use crate::value::{builtins, json, ops, Value, ValueKind, ValueRepr};

type FilterFunc = dyn Fn(&EnvRef, Value, &[Value]) -> Result<Value, Error>;

pub(crate) struct BoxedFilter(Box<FilterFunc>);

impl BoxedFilter {
    /// Creates a new boxed filter.
    pub fn new<F>(f: F) -> BoxedFilter
    where
        F: Fn(&EnvRef, Value, &[Value]) -> Result<Value, Error> + 'static,
    {
        BoxedFilter(Box::new(f))
    }

    /// Applies the filter to a value and arguments.
    pub fn apply(&self, env: &EnvRef, value: Value, args: &[Value]) -> Result<Value, Error> {
        (self.0)(env, value, args)
    }
}

fn unsupported(filter: &str, value: &Value) -> Error {
    Error::new(
        ErrorKind::InvalidOperation,
        format!("cannot apply filter {} to {}", filter, value.kind()),
    )
}

/// Renders a value as JSON, optionally indented.
pub fn tojson(_env: &EnvRef, v: Value, args: &[Value]) -> Result<Value, Error> {
    let args = CallArgs::new(args);
    ok!(args.expect("tojson", &["indent"]));
    let indent = match args.get(0, "indent") {
        Some(val) if !val.is_none() && !val.is_undefined() => {
            Some(ok!(int_arg("tojson", "indent", &val)).max(0) as usize)
        }
        _ => None,
    };
    json::to_json(&v, indent).map(Value::from)
}

/// Returns the fallback when the value is undefined (or falsy, when the
/// `boolean` argument is true).
pub fn default(_env: &EnvRef, v: Value, args: &[Value]) -> Result<Value, Error> {
    let args = CallArgs::new(args);
    ok!(args.expect("default", &["value", "boolean"]));
    let fallback = args.get(0, "value").unwrap_or_else(|| Value::from(""));
    let boolean = args.get(1, "boolean").map_or(false, |val| val.is_true());
    Ok(if v.is_undefined() || (boolean && !v.is_true()) {
        fallback
    } else {
        v
    })
}

/// Returns the length of a string, sequence or object.
pub fn length(_env: &EnvRef, v: Value, _args: &[Value]) -> Result<Value, Error> {
    v.len()
        .map(Value::from)
        .ok_or_else(|| unsupported("length", &v))
}

/// Converts a sequence into an array; strings become arrays of their
/// code points.
pub fn list(_env: &EnvRef, v: Value, _args: &[Value]) -> Result<Value, Error> {
    match &v.0 {
        ValueRepr::Seq(_) | ValueRepr::Tuple(_) => {
            Ok(Value::from_items(v.as_seq_items().unwrap_or_default()))
        }
        ValueRepr::String(s) => Ok(Value::from_items(
            s.chars().map(|c| Value::from(c.to_string())).collect(),
        )),
        _ => Err(unsupported("list", &v)),
    }
}

/// Returns the first element of a sequence or string.
pub fn first(_env: &EnvRef, v: Value, _args: &[Value]) -> Result<Value, Error> {
    match &v.0 {
        ValueRepr::Seq(_) | ValueRepr::Tuple(_) => Ok(v
            .as_seq_items()
            .unwrap_or_default()
            .first()
            .cloned()
            .unwrap_or(Value::UNDEFINED)),
        ValueRepr::String(s) => Ok(s
            .chars()
            .next()
            .map(|c| Value::from(c.to_string()))
            .unwrap_or(Value::UNDEFINED)),
        _ => Err(unsupported("first", &v)),
    }
}

/// Returns the last element of a sequence or string.
pub fn last(_env: &EnvRef, v: Value, _args: &[Value]) -> Result<Value, Error> {
    match &v.0 {
        ValueRepr::Seq(_) | ValueRepr::Tuple(_) => Ok(v
            .as_seq_items()
            .unwrap_or_default()
            .last()
            .cloned()
            .unwrap_or(Value::UNDEFINED)),
        ValueRepr::String(s) => Ok(s
            .chars()
            .last()
            .map(|c| Value::from(c.to_string()))
            .unwrap_or(Value::UNDEFINED)),
        _ => Err(unsupported("last", &v)),
    }
}

/// Reverses an array or string.
pub fn reverse(_env: &EnvRef, v: Value, _args: &[Value]) -> Result<Value, Error> {
    match &v.0 {
        ValueRepr::Seq(_) | ValueRepr::Tuple(_) => {
            let mut items = v.as_seq_items().unwrap_or_default();
            items.reverse();
            Ok(Value::from_items(items))
        }
        ValueRepr::String(s) => Ok(Value::from(s.chars().rev().collect::<String>())),
        _ => Err(unsupported("reverse", &v)),
    }
}

/// Sorts an array of numbers or an array of strings.
pub fn sort(_env: &EnvRef, v: Value, _args: &[Value]) -> Result<Value, Error> {
    let mut items = v.as_seq_items().ok_or_else(|| unsupported("sort", &v))?;
    let all_numeric = items
        .iter()
        .all(|x| matches!(x.kind(), ValueKind::Int | ValueKind::Float));
    if all_numeric {
        items.sort_by(|a, b| {
            let a = a.as_int().map(|x| x as f64).or_else(|| float_of(a));
            let b = b.as_int().map(|x| x as f64).or_else(|| float_of(b));
            a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
        });
        return Ok(Value::from_items(items));
    }
    if items.iter().all(|x| x.kind() == ValueKind::String) {
        items.sort_by(|a, b| a.as_str().cmp(&b.as_str()));
        return Ok(Value::from_items(items));
    }
    Err(Error::new(
        ErrorKind::InvalidOperation,
        "cannot sort an array of mixed element types",
    ))
}

fn float_of(v: &Value) -> Option<f64> {
    match v.0 {
        ValueRepr::Float(x) => Some(x),
        _ => None,
    }
}

/// Joins a sequence (or a string's code points) with a separator.
pub fn join(_env: &EnvRef, v: Value, args: &[Value]) -> Result<Value, Error> {
    let args = CallArgs::new(args);
    ok!(args.expect("join", &["sep"]));
    let sep = match args.get(0, "sep") {
        Some(val) => ok!(str_arg("join", "sep", &val)),
        None => String::new(),
    };
    match &v.0 {
        ValueRepr::Seq(_) | ValueRepr::Tuple(_) => {
            let rv: Vec<String> = v
                .as_seq_items()
                .unwrap_or_default()
                .iter()
                .map(|item| item.to_string())
                .collect();
            Ok(Value::from(rv.join(&sep)))
        }
        ValueRepr::String(s) => {
            let rv: Vec<String> = s.chars().map(|c| c.to_string()).collect();
            Ok(Value::from(rv.join(&sep)))
        }
        _ => Err(unsupported("join", &v)),
    }
}

/// Removes duplicate elements, keeping first occurrences in order.
pub fn unique(_env: &EnvRef, v: Value, _args: &[Value]) -> Result<Value, Error> {
    let items = v.as_seq_items().ok_or_else(|| unsupported("unique", &v))?;
    let mut rv: Vec<Value> = Vec::new();
    for item in items {
        if !rv.iter().any(|seen| ops::loose_eq(seen, &item)) {
            rv.push(item);
        }
    }
    Ok(Value::from_items(rv))
}

/// Converts a value to a string; arrays and objects render as JSON.
pub fn string(_env: &EnvRef, v: Value, _args: &[Value]) -> Result<Value, Error> {
    match &v.0 {
        ValueRepr::String(_) => Ok(v),
        ValueRepr::Seq(_)
        | ValueRepr::Tuple(_)
        | ValueRepr::Map(_)
        | ValueRepr::Kwargs(_) => json::to_json(&v, None).map(Value::from),
        ValueRepr::Func(_) => Err(unsupported("string", &v)),
        _ => Ok(Value::from(v.to_string())),
    }
}

fn attr_projection(
    filter: &'static str,
    env: &EnvRef,
    v: Value,
    args: &[Value],
    keep_matching: bool,
) -> Result<Value, Error> {
    let items = v.as_seq_items().ok_or_else(|| unsupported(filter, &v))?;
    let args = CallArgs::new(args);
    ok!(args.expect(filter, &["attr", "test", "value"]));
    let attr = ok!(str_arg(
        filter,
        "attr",
        &ok!(args.require(filter, 0, "attr"))
    ));
    let test = match args.get(1, "test") {
        Some(val) => Some(ok!(str_arg(filter, "test", &val))),
        None => None,
    };
    let test_args: Vec<Value> = args.get(2, "value").into_iter().collect();

    let mut rv = Vec::new();
    for item in items {
        if !matches!(item.kind(), ValueKind::Object | ValueKind::Kwargs) {
            return Err(Error::new(
                ErrorKind::InvalidOperation,
                format!("{} items must be objects, got {}", filter, item.kind()),
            ));
        }
        let attr_value = item.get_attr(&attr);
        let selected = match test {
            Some(ref name) => ok!(environment::perform_test(
                env,
                name,
                attr_value,
                &test_args
            )),
            None => attr_value.is_true(),
        };
        if selected == keep_matching {
            rv.push(item);
        }
    }
    Ok(Value::from_items(rv))
}

/// Keeps the objects whose attribute passes the test.
pub fn selectattr(env: &EnvRef, v: Value, args: &[Value]) -> Result<Value, Error> {
    attr_projection("selectattr", env, v, args, true)
}

/// Drops the objects whose attribute passes the test.
pub fn rejectattr(env: &EnvRef, v: Value, args: &[Value]) -> Result<Value, Error> {
    attr_projection("rejectattr", env, v, args, false)
}

/// Extracts an attribute from every object in an array.
pub fn map(_env: &EnvRef, v: Value, args: &[Value]) -> Result<Value, Error> {
    let items = v.as_seq_items().ok_or_else(|| unsupported("map", &v))?;
    let args = CallArgs::new(args);
    ok!(args.expect("map", &["attribute", "default"]));
    let attribute = ok!(str_arg(
        "map",
        "attribute",
        &ok!(args.require("map", 0, "attribute"))
    ));
    let fallback = args.get(1, "default");
    let mut rv = Vec::with_capacity(items.len());
    for item in items {
        let mut attr_value = item.get_attr(&attribute);
        if attr_value.is_undefined() {
            if let Some(ref fallback) = fallback {
                attr_value = fallback.clone();
            }
        }
        rv.push(attr_value);
    }
    Ok(Value::from_items(rv))
}

/// Trims surrounding whitespace (or the given characters).
pub fn trim(_env: &EnvRef, v: Value, args: &[Value]) -> Result<Value, Error> {
    let s = v.as_str().ok_or_else(|| unsupported("trim", &v))?;
    let args = CallArgs::new(args);
    ok!(args.expect("trim", &["chars"]));
    Ok(Value::from(match args.get(0, "chars") {
        Some(chars) if !chars.is_none() && !chars.is_undefined() => {
            let chars: Vec<char> = ok!(str_arg("trim", "chars", &chars)).chars().collect();
            s.trim_matches(&chars[..]).to_string()
        }
        _ => s.trim().to_string(),
    }))
}

/// Indents every line of a string.
///
/// The first line is only indented when `first` is true, blank lines
/// only when `blank` is true.
pub fn indent(_env: &EnvRef, v: Value, args: &[Value]) -> Result<Value, Error> {
    let s = v.as_str().ok_or_else(|| unsupported("indent", &v))?;
    let args = CallArgs::new(args);
    ok!(args.expect("indent", &["width", "first", "blank"]));
    let width = match args.get(0, "width") {
        Some(val) => ok!(int_arg("indent", "width", &val)).max(0) as usize,
        None => 4,
    };
    let first = args.get(1, "first").map_or(false, |val| val.is_true());
    let blank = args.get(2, "blank").map_or(false, |val| val.is_true());

    let pad = " ".repeat(width);
    let rv: Vec<String> = s
        .split('\n')
        .enumerate()
        .map(|(idx, line)| {
            if (idx == 0 && !first) || (line.is_empty() && !blank) {
                line.to_string()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect();
    Ok(Value::from(rv.join("\n")))
}

/// Replaces occurrences of a substring.
pub fn replace(_env: &EnvRef, v: Value, args: &[Value]) -> Result<Value, Error> {
    let s = v.as_str().ok_or_else(|| unsupported("replace", &v))?;
    let args = CallArgs::new(args);
    ok!(args.expect("replace", &["old", "new", "count"]));
    let old = ok!(str_arg(
        "replace",
        "old",
        &ok!(args.require("replace", 0, "old"))
    ));
    let new = ok!(str_arg(
        "replace",
        "new",
        &ok!(args.require("replace", 1, "new"))
    ));
    let count = args.get(2, "count").unwrap_or(Value::NONE);
    Ok(Value::from(ok!(builtins::str_replace(
        s, &old, &new, &count
    ))))
}

/// Converts a value to an integer, flooring floats and parsing strings.
pub fn int(_env: &EnvRef, v: Value, args: &[Value]) -> Result<Value, Error> {
    let args = CallArgs::new(args);
    ok!(args.expect("int", &["default"]));
    let fallback = || {
        args.get(0, "default")
            .and_then(|val| val.as_int())
            .unwrap_or(0)
    };
    Ok(Value::from(match &v.0 {
        ValueRepr::Int(x) => *x,
        ValueRepr::Float(x) => x.floor() as i64,
        ValueRepr::Bool(x) => *x as i64,
        ValueRepr::String(s) => match s.trim().parse::<i64>() {
            Ok(x) => x,
            Err(_) => match s.trim().parse::<f64>() {
                Ok(x) => x.floor() as i64,
                Err(_) => fallback(),
            },
        },
        _ => return Err(unsupported("int", &v)),
    }))
}

/// Converts a value to a float, parsing strings.
pub fn float(_env: &EnvRef, v: Value, args: &[Value]) -> Result<Value, Error> {
    let args = CallArgs::new(args);
    ok!(args.expect("float", &["default"]));
    Ok(Value::from(match &v.0 {
        ValueRepr::Int(x) => *x as f64,
        ValueRepr::Float(x) => *x,
        ValueRepr::Bool(x) => *x as i64 as f64,
        ValueRepr::String(s) => match s.trim().parse::<f64>() {
            Ok(x) => x,
            Err(_) => args
                .get(0, "default")
                .and_then(|val| float_of(&val).or_else(|| val.as_int().map(|x| x as f64)))
                .unwrap_or(0.0),
        },
        _ => return Err(unsupported("float", &v)),
    }))
}

/// Returns the absolute value of a number.
pub fn abs(_env: &EnvRef, v: Value, _args: &[Value]) -> Result<Value, Error> {
    match v.0 {
        ValueRepr::Int(x) => x
            .checked_abs()
            .map(Value::from)
            .ok_or_else(|| Error::new(ErrorKind::InvalidOperation, "integer overflow in abs")),
        ValueRepr::Float(x) => Ok(Value::from(x.abs())),
        _ => Err(unsupported("abs", &v)),
    }
}

/// Returns an object's entries as an array of `[key, value]` arrays.
pub fn items(_env: &EnvRef, v: Value, _args: &[Value]) -> Result<Value, Error> {
    match v.kind() {
        ValueKind::Object | ValueKind::Kwargs => Ok(builtins::object_items(&v)),
        _ => Err(unsupported("items", &v)),
    }
}

/// Converts a value to a boolean via its truthiness.
pub fn bool(_env: &EnvRef, v: Value, _args: &[Value]) -> Result<Value, Error> {
    Ok(Value::from(v.is_true()))
}

/// Converts a string to uppercase.
pub fn upper(_env: &EnvRef, v: Value, _args: &[Value]) -> Result<Value, Error> {
    let s = v.as_str().ok_or_else(|| unsupported("upper", &v))?;
    Ok(Value::from(s.to_uppercase()))
}

/// Converts a string to lowercase.
pub fn lower(_env: &EnvRef, v: Value, _args: &[Value]) -> Result<Value, Error> {
    let s = v.as_str().ok_or_else(|| unsupported("lower", &v))?;
    Ok(Value::from(s.to_lowercase()))
}

/// Title-cases each word of a string.
pub fn title(_env: &EnvRef, v: Value, _args: &[Value]) -> Result<Value, Error> {
    let s = v.as_str().ok_or_else(|| unsupported("title", &v))?;
    Ok(Value::from(builtins::str_title(s)))
}

/// Capitalizes the first character of a string.
pub fn capitalize(_env: &EnvRef, v: Value, _args: &[Value]) -> Result<Value, Error> {
    let s = v.as_str().ok_or_else(|| unsupported("capitalize", &v))?;
    Ok(Value::from(builtins::str_capitalize(s)))
}

pub(crate) fn get_builtin_filters() -> BTreeMap<&'static str, BoxedFilter> {
    let mut rv = BTreeMap::new();
    rv.insert("tojson", BoxedFilter::new(tojson));
    rv.insert("default", BoxedFilter::new(default));
    rv.insert("d", BoxedFilter::new(default));
    rv.insert("length", BoxedFilter::new(length));
    rv.insert("count", BoxedFilter::new(length));
    rv.insert("list", BoxedFilter::new(list));
    rv.insert("first", BoxedFilter::new(first));
    rv.insert("last", BoxedFilter::new(last));
    rv.insert("reverse", BoxedFilter::new(reverse));
    rv.insert("sort", BoxedFilter::new(sort));
    rv.insert("join", BoxedFilter::new(join));
    rv.insert("unique", BoxedFilter::new(unique));
    rv.insert("string", BoxedFilter::new(string));
    rv.insert("selectattr", BoxedFilter::new(selectattr));
    rv.insert("rejectattr", BoxedFilter::new(rejectattr));
    rv.insert("map", BoxedFilter::new(map));
    rv.insert("trim", BoxedFilter::new(trim));
    rv.insert("indent", BoxedFilter::new(indent));
    rv.insert("replace", BoxedFilter::new(replace));
    rv.insert("int", BoxedFilter::new(int));
    rv.insert("float", BoxedFilter::new(float));
    rv.insert("abs", BoxedFilter::new(abs));
    rv.insert("items", BoxedFilter::new(items));
    rv.insert("bool", BoxedFilter::new(bool));
    rv.insert("upper", BoxedFilter::new(upper));
    rv.insert("lower", BoxedFilter::new(lower));
    rv.insert("title", BoxedFilter::new(title));
    rv.insert("capitalize", BoxedFilter::new(capitalize));
    rv
}

#[cfg(test)]
mod test_filters {
    use super::*;
    use crate::environment::Environment;
    use crate::value::builtins::map_of;

    use similar_asserts::assert_eq;

    fn int_array(items: &[i64]) -> Value {
        Value::from_items(items.iter().map(|&x| Value::from(x)).collect())
    }

    #[test]
    fn test_default() {
        let env = Environment::new();
        assert_eq!(
            default(&env, Value::UNDEFINED, &[Value::from("-")]).unwrap(),
            Value::from("-")
        );
        assert_eq!(
            default(&env, Value::from(0), &[Value::from("-")]).unwrap(),
            Value::from(0)
        );
        assert_eq!(
            default(&env, Value::from(0), &[Value::from("-"), Value::from(true)]).unwrap(),
            Value::from("-")
        );
    }

    #[test]
    fn test_unique_idempotent() {
        let env = Environment::new();
        let v = int_array(&[1, 2, 1, 3, 2]);
        let once = unique(&env, v, &[]).unwrap();
        assert_eq!(once, int_array(&[1, 2, 3]));
        let twice = unique(&env, once.clone(), &[]).unwrap();
        assert_eq!(twice, once);
    }

    #[test]
    fn test_join_stringifies() {
        let env = Environment::new();
        let v = Value::from(vec![Value::from(1), Value::from("a"), Value::from(2.0)]);
        assert_eq!(
            join(&env, v, &[Value::from("-")]).unwrap(),
            Value::from("1-a-2.0")
        );
        assert_eq!(
            join(&env, Value::from("abc"), &[Value::from(".")]).unwrap(),
            Value::from("a.b.c")
        );
    }

    #[test]
    fn test_sort_rejects_mixed() {
        let env = Environment::new();
        let v = Value::from(vec![Value::from(1), Value::from("a")]);
        assert!(sort(&env, v, &[]).is_err());
        let v = Value::from(vec![Value::from(3), Value::from(1.5), Value::from(2)]);
        assert_eq!(
            sort(&env, v, &[]).unwrap(),
            Value::from(vec![Value::from(1.5), Value::from(2), Value::from(3)])
        );
    }

    #[test]
    fn test_indent() {
        let env = Environment::new();
        let v = Value::from("a\n\nb");
        assert_eq!(
            indent(&env, v.clone(), &[Value::from(2)]).unwrap(),
            Value::from("a\n\n  b")
        );
        let mut kwargs = crate::value::ValueMap::new();
        kwargs.insert("first".into(), Value::from(true));
        kwargs.insert("blank".into(), Value::from(true));
        assert_eq!(
            indent(&env, v, &[Value::from(2), Value::from_kwargs(kwargs)]).unwrap(),
            Value::from("  a\n  \n  b")
        );
    }

    #[test]
    fn test_selectattr_with_test() {
        let env = Environment::new();
        let v = Value::from_items(vec![
            map_of(&[("n", Value::from(1))]),
            map_of(&[("n", Value::from(2))]),
            map_of(&[("n", Value::from(3))]),
        ]);
        let rv = selectattr(&env, v, &[Value::from("n"), Value::from("odd")]).unwrap();
        assert_eq!(rv.len(), Some(2));
        let rv = rv.as_seq_items().unwrap();
        assert_eq!(rv[0].get_attr("n"), Value::from(1));
        assert_eq!(rv[1].get_attr("n"), Value::from(3));
    }

    #[test]
    fn test_map_with_default() {
        let env = Environment::new();
        let v = Value::from_items(vec![
            map_of(&[("name", Value::from("a"))]),
            map_of(&[]),
        ]);
        let mut kwargs = crate::value::ValueMap::new();
        kwargs.insert("default".into(), Value::from("?"));
        let rv = map(
            &env,
            v,
            &[Value::from("name"), Value::from_kwargs(kwargs)],
        )
        .unwrap();
        assert_eq!(
            rv,
            Value::from(vec![Value::from("a"), Value::from("?")])
        );
    }

    #[test]
    fn test_int_parsing() {
        let env = Environment::new();
        assert_eq!(int(&env, Value::from("42"), &[]).unwrap(), Value::from(42));
        assert_eq!(int(&env, Value::from(2.7), &[]).unwrap(), Value::from(2));
        assert_eq!(int(&env, Value::from(-2.7), &[]).unwrap(), Value::from(-3));
        assert_eq!(
            int(&env, Value::from("x"), &[Value::from(7)]).unwrap(),
            Value::from(7)
        );
    }

    #[test]
    fn test_string_of_array_is_json() {
        let env = Environment::new();
        let v = Value::from(vec![Value::from(1), Value::from("a")]);
        assert_eq!(
            string(&env, v, &[]).unwrap(),
            Value::from(r#"[1, "a"]"#)
        );
    }

    #[test]
    fn test_unknown_receiver_fails() {
        let env = Environment::new();
        let err = upper(&env, Value::from(1), &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid operation: cannot apply filter upper to integer"
        );
    }
}
